//! Session coordination.
//!
//! `SessionCoordinator` owns every buffer in a session together with the
//! session-wide mode flags and the single countdown timer. All state changes
//! happen synchronously inside [`SessionCoordinator::handle`], so a keystroke
//! and the decay interruption it causes are never split by a tick.
//!
//! Keys go to the focused buffer only. Fade ticks advance the decay engine of
//! every buffer, so a buffer keeps fading while another one has focus.

use std::time::Duration;

use smol_str::SmolStr;
use web_time::Instant;

use crate::config::EngineConfig;
use crate::context::SessionContext;
use crate::countdown::{CountdownTimer, TimerEvent};
use crate::decay::{DecayEngine, DecayEvent, DecayState};
use crate::document::Document;
use crate::error::{BufferError, ConfigError};
use crate::events::{BufferId, Inbound, ModeChange, Outbound};
use crate::format::{FormatSpan, overlay_fade};
use crate::gate::{EditGate, EditOp};
use crate::types::{CursorState, EditInfo};

/// Title given to buffers that have not been named.
pub const UNTITLED: &str = "Untitled";

/// What the caller should do after the timer shortcut fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerShortcut {
    /// Show the preset picker, then call `start_timer`.
    ChoosePreset,
    /// Second press within the double-tap window; the timer was stopped.
    Reset,
}

struct BufferSlot {
    id: BufferId,
    title: SmolStr,
    doc: Document,
    cursor: CursorState,
    decay: DecayEngine,
}

pub struct SessionCoordinator {
    config: EngineConfig,
    ctx: SessionContext,
    timer: CountdownTimer,
    buffers: Vec<BufferSlot>,
    focused: usize,
    next_id: u32,
    last_shortcut: Option<Instant>,
}

impl SessionCoordinator {
    /// Start a session with one focused buffer holding `initial_text`.
    pub fn new(config: EngineConfig, initial_text: &str) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut session = Self {
            ctx: SessionContext::from_config(&config),
            config,
            timer: CountdownTimer::new(),
            buffers: Vec::new(),
            focused: 0,
            next_id: 0,
            last_shortcut: None,
        };
        session.open_buffer(initial_text);
        Ok(session)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    /// Process one inbound event and collect the resulting notifications.
    pub fn handle(&mut self, event: Inbound) -> Vec<Outbound> {
        match event {
            Inbound::Key { op } => self.handle_key(op),
            Inbound::Tick1s => match self.timer.tick() {
                Some(TimerEvent::Tick { remaining }) => vec![Outbound::TimerTick { remaining }],
                Some(TimerEvent::Expired) => vec![Outbound::TimerExpired],
                None => Vec::new(),
            },
            Inbound::TickFade => self.handle_fade_tick(),
            Inbound::ModeChange { change } => self.handle_mode_change(change),
            Inbound::FocusChange { buffer_id } => {
                if !self.focus(buffer_id) {
                    tracing::warn!(%buffer_id, "focus change to unknown buffer ignored");
                }
                Vec::new()
            }
            Inbound::TimerStart { duration } => {
                self.start_timer(duration);
                Vec::new()
            }
            Inbound::TimerStop => {
                self.stop_timer();
                Vec::new()
            }
            Inbound::TimerRestart => {
                self.timer.restart_last();
                Vec::new()
            }
            Inbound::TimerAck => {
                self.timer.acknowledge();
                Vec::new()
            }
        }
    }

    fn handle_key(&mut self, op: EditOp) -> Vec<Outbound> {
        if !EditGate::allow(&self.ctx, &op) {
            return Vec::new();
        }

        let slot = &mut self.buffers[self.focused];
        let mut out = Vec::new();
        // Interrupt before touching the text so a half-faded char survives.
        if slot.decay.record_activity() {
            out.push(Outbound::DecayInterrupted { buffer_id: slot.id });
        }

        match apply_op(slot, &op) {
            Ok(Some(edit)) => out.extend(spans_changed(slot, &edit)),
            Ok(None) => {}
            Err(err) => tracing::warn!(?op, %err, "edit rejected by buffer"),
        }
        out
    }

    fn handle_fade_tick(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        for slot in &mut self.buffers {
            let events = match slot.decay.tick(&self.ctx, &mut slot.doc) {
                Ok(events) => events,
                Err(err) => {
                    tracing::warn!(buffer_id = %slot.id, %err, "decay step failed, disarming");
                    slot.decay.disarm();
                    continue;
                }
            };
            for event in events {
                match event {
                    DecayEvent::Started { .. } => {}
                    DecayEvent::Dimmed { offset, alpha } => out.push(Outbound::FadeStep {
                        buffer_id: slot.id,
                        offset,
                        alpha,
                    }),
                    DecayEvent::Erased { edit, .. } => {
                        shift_cursor(&mut slot.cursor, &edit);
                        out.extend(spans_changed(slot, &edit));
                        out.push(Outbound::DecayProgressed { buffer_id: slot.id });
                    }
                    DecayEvent::Trimmed { edit, .. } => {
                        shift_cursor(&mut slot.cursor, &edit);
                        out.extend(spans_changed(slot, &edit));
                    }
                    DecayEvent::Completed => {
                        out.push(Outbound::DecayCompleted { buffer_id: slot.id })
                    }
                    DecayEvent::Interrupted => {
                        slot.cursor.clamp(slot.doc.len_chars());
                        out.push(Outbound::DecayInterrupted { buffer_id: slot.id })
                    }
                }
            }
        }
        out
    }

    fn handle_mode_change(&mut self, change: ModeChange) -> Vec<Outbound> {
        tracing::debug!(?change, "mode change");
        match change {
            ModeChange::RestrictedEdit(on) => {
                self.ctx.restricted_edit = on;
                Vec::new()
            }
            ModeChange::DecayEnabled(on) => {
                if self.ctx.decay_enabled == on {
                    return Vec::new();
                }
                self.ctx.decay_enabled = on;
                let mut out = Vec::new();
                for slot in &mut self.buffers {
                    if on {
                        slot.decay.arm();
                    } else if slot.decay.disarm() {
                        out.push(Outbound::DecayInterrupted { buffer_id: slot.id });
                    }
                }
                out
            }
            ModeChange::DecayPaused(paused) => {
                self.ctx.decay_paused_by_visibility = paused;
                Vec::new()
            }
        }
    }

    /// Open a buffer and give it focus.
    pub fn open_buffer(&mut self, initial_text: &str) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        let doc = Document::from_text(initial_text);
        let cursor = CursorState::new(doc.len_chars());
        let mut decay = DecayEngine::new(&self.config);
        if self.ctx.decay_enabled {
            decay.arm();
        }
        self.buffers.push(BufferSlot {
            id,
            title: SmolStr::new_static(UNTITLED),
            doc,
            cursor,
            decay,
        });
        self.focused = self.buffers.len() - 1;
        tracing::debug!(%id, "buffer opened");
        id
    }

    /// Close a buffer. Closing the last one leaves a fresh empty buffer in
    /// its place. Returns false for an unknown id.
    pub fn close_buffer(&mut self, id: BufferId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.buffers.remove(index);
        tracing::debug!(%id, "buffer closed");
        if self.buffers.is_empty() {
            self.open_buffer("");
        } else if index < self.focused || self.focused >= self.buffers.len() {
            self.focused -= 1;
        }
        true
    }

    pub fn focus(&mut self, id: BufferId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.focused = index;
                true
            }
            None => false,
        }
    }

    /// Focus the next buffer in creation order. Does not wrap.
    pub fn focus_next(&mut self) -> bool {
        if self.focused + 1 >= self.buffers.len() {
            return false;
        }
        self.focused += 1;
        true
    }

    /// Focus the previous buffer in creation order. Does not wrap.
    pub fn focus_prev(&mut self) -> bool {
        if self.focused == 0 {
            return false;
        }
        self.focused -= 1;
        true
    }

    pub fn focused(&self) -> BufferId {
        self.buffers[self.focused].id
    }

    pub fn buffer_ids(&self) -> Vec<BufferId> {
        self.buffers.iter().map(|slot| slot.id).collect()
    }

    pub fn title(&self, id: BufferId) -> Option<&str> {
        self.slot(id).map(|slot| slot.title.as_str())
    }

    pub fn set_title(&mut self, id: BufferId, title: impl Into<SmolStr>) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.title = title.into();
                true
            }
            None => false,
        }
    }

    /// Flip restricted-edit mode for every buffer, returning the new state.
    pub fn toggle_restricted(&mut self) -> bool {
        let on = !self.ctx.restricted_edit;
        self.handle_mode_change(ModeChange::RestrictedEdit(on));
        on
    }

    pub fn start_timer(&mut self, duration: Duration) {
        self.timer.start(duration);
    }

    pub fn stop_timer(&mut self) -> bool {
        self.timer.stop()
    }

    /// The timer shortcut was pressed at `now`.
    ///
    /// A second press strictly within the double-tap window stops the timer.
    pub fn timer_shortcut(&mut self, now: Instant) -> TimerShortcut {
        let window = self.config.double_tap_window;
        let double_tap = self
            .last_shortcut
            .is_some_and(|prev| now.saturating_duration_since(prev) < window);
        if double_tap {
            self.last_shortcut = None;
            self.timer.stop();
            TimerShortcut::Reset
        } else {
            self.last_shortcut = Some(now);
            TimerShortcut::ChoosePreset
        }
    }

    /// Spans to draw for one line, with the fade overlay merged in.
    pub fn spans_for_line(&self, id: BufferId, line_no: usize) -> Option<Vec<FormatSpan>> {
        let slot = self.slot(id)?;
        let mut spans = slot.doc.line_spans(line_no)?.to_vec();
        if let Some((offset, alpha)) = slot.decay.overlay() {
            let (line, col) = slot.doc.line_col(offset);
            if line == line_no {
                overlay_fade(&mut spans, col, alpha);
            }
        }
        Some(spans)
    }

    pub fn full_text(&self, id: BufferId) -> Option<String> {
        self.slot(id).map(|slot| slot.doc.full_text())
    }

    /// Text of the focused buffer.
    pub fn focused_text(&self) -> String {
        self.buffers[self.focused].doc.full_text()
    }

    pub fn document(&self, id: BufferId) -> Option<&Document> {
        self.slot(id).map(|slot| &slot.doc)
    }

    pub fn cursor(&self, id: BufferId) -> Option<CursorState> {
        self.slot(id).map(|slot| slot.cursor)
    }

    pub fn decay_state(&self, id: BufferId) -> Option<&DecayState> {
        self.slot(id).map(|slot| slot.decay.state())
    }

    fn index_of(&self, id: BufferId) -> Option<usize> {
        self.buffers.iter().position(|slot| slot.id == id)
    }

    fn slot(&self, id: BufferId) -> Option<&BufferSlot> {
        self.buffers.iter().find(|slot| slot.id == id)
    }

    fn slot_mut(&mut self, id: BufferId) -> Option<&mut BufferSlot> {
        self.buffers.iter_mut().find(|slot| slot.id == id)
    }
}

/// Apply an allowed key to a buffer, returning the edit if text changed.
fn apply_op(slot: &mut BufferSlot, op: &EditOp) -> Result<Option<EditInfo>, BufferError> {
    let doc = &mut slot.doc;
    let cursor = &mut slot.cursor;
    let len = doc.len_chars();
    match op {
        EditOp::Insert(text) => {
            let edit = doc.insert(cursor.offset, text)?;
            cursor.move_to(cursor.offset + edit.inserted_len);
            Ok(Some(edit))
        }
        EditOp::DeleteBackward => {
            if cursor.offset == 0 {
                return Ok(None);
            }
            let edit = doc.delete_range(cursor.offset - 1, cursor.offset)?;
            cursor.move_to(cursor.offset - 1);
            Ok(Some(edit))
        }
        EditOp::DeleteForward => {
            if cursor.offset >= len {
                return Ok(None);
            }
            doc.delete_range(cursor.offset, cursor.offset + 1).map(Some)
        }
        EditOp::CursorLeft => {
            cursor.move_to(cursor.offset.saturating_sub(1));
            Ok(None)
        }
        EditOp::CursorRight => {
            cursor.move_to((cursor.offset + 1).min(len));
            Ok(None)
        }
        EditOp::CursorUp | EditOp::CursorDown => {
            let (line, col) = doc.line_col(cursor.offset);
            let target = match op {
                EditOp::CursorUp => line.checked_sub(1),
                _ => Some(line + 1),
            };
            let goal = cursor.goal_column.unwrap_or(col);
            if let Some(offset) = target.and_then(|line| doc.offset_of(line, goal)) {
                cursor.offset = offset;
                cursor.goal_column = Some(goal);
            }
            Ok(None)
        }
    }
}

/// Keep the cursor on the same text after a deletion elsewhere.
fn shift_cursor(cursor: &mut CursorState, edit: &EditInfo) {
    let start = edit.edit_char_pos;
    if cursor.offset >= start + edit.deleted_len {
        cursor.offset -= edit.deleted_len;
    } else if cursor.offset > start {
        cursor.offset = start;
    }
    cursor.clamp(edit.doc_len_after);
}

fn spans_changed(slot: &BufferSlot, edit: &EditInfo) -> Vec<Outbound> {
    edit.changed_lines
        .clone()
        .filter_map(|line_no| {
            let spans = slot.doc.line_spans(line_no)?.to_vec();
            Some(Outbound::SpansChanged {
                buffer_id: slot.id,
                line_no,
                spans,
            })
        })
        .collect()
}
