//! Idle-triggered fading of trailing words.
//!
//! Each buffer owns one `DecayEngine`. The engine is driven by fade ticks
//! and moves between two phases:
//!
//! - **Watching**: an idle countdown (in fade ticks) runs down after the last
//!   accepted edit. When it reaches zero and the trimmed buffer is not empty,
//!   the trailing word is selected and the engine starts fading.
//! - **Fading**: the last character of the trailing word dims through
//!   `fade_steps` opacity levels, one per tick, and is deleted when its
//!   opacity reaches zero. When a word runs out, one adjacent whitespace char
//!   is trimmed and the next trailing word is selected. When nothing but
//!   whitespace is left, the engine goes back to watching.
//!
//! Any accepted edit interrupts a fade before the partially dimmed char is
//! deleted, so an interrupted fade never loses that char.

use std::ops::Range;

use crate::config::EngineConfig;
use crate::context::SessionContext;
use crate::document::Document;
use crate::error::BufferError;
use crate::text::TextBuffer;
use crate::types::EditInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayPhase {
    Watching,
    Fading,
}

/// Observable decay state of one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayState {
    /// Fade ticks left before decay starts. `None` when disarmed.
    pub idle_ticks_left: Option<u32>,
    /// The trailing word being erased. Set only while fading.
    pub active_word_range: Option<Range<usize>>,
    /// Index within the active word of the char being dimmed.
    pub cursor_within_word: Option<usize>,
    /// Opacity of the char being dimmed, 1.0 when nothing is fading.
    pub alpha: f64,
}

impl Default for DecayState {
    fn default() -> Self {
        Self {
            idle_ticks_left: None,
            active_word_range: None,
            cursor_within_word: None,
            alpha: 1.0,
        }
    }
}

/// What a decay tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum DecayEvent {
    /// The idle countdown ran out and fading began on `word`.
    Started { word: Range<usize> },
    /// The char at `offset` dropped to opacity `alpha`.
    Dimmed { offset: usize, alpha: f64 },
    /// The char at `offset` faded out and was deleted.
    Erased { offset: usize, ch: char, edit: EditInfo },
    /// A word ran out and the whitespace before it was removed.
    Trimmed { offset: usize, edit: EditInfo },
    /// Everything but whitespace is gone.
    Completed,
    /// A fade in progress was abandoned with all remaining text at full opacity.
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct DecayEngine {
    fade_steps: u32,
    idle_ticks: u32,
    /// Opacity level of the char being dimmed, `fade_steps` down to 0.
    level: u32,
    state: DecayState,
}

impl DecayEngine {
    /// A disarmed engine.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fade_steps: config.fade_steps.max(1),
            idle_ticks: config.idle_ticks(),
            level: config.fade_steps.max(1),
            state: DecayState::default(),
        }
    }

    pub fn state(&self) -> &DecayState {
        &self.state
    }

    pub fn phase(&self) -> DecayPhase {
        if self.state.active_word_range.is_some() {
            DecayPhase::Fading
        } else {
            DecayPhase::Watching
        }
    }

    pub fn is_fading(&self) -> bool {
        self.phase() == DecayPhase::Fading
    }

    pub fn is_armed(&self) -> bool {
        self.state.idle_ticks_left.is_some()
    }

    /// Start the idle countdown from the full timeout.
    pub fn arm(&mut self) {
        self.state.idle_ticks_left = Some(self.idle_ticks);
    }

    /// Cancel any fade and stop watching until the next `arm`.
    pub fn disarm(&mut self) -> bool {
        let interrupted = self.interrupt();
        self.state.idle_ticks_left = None;
        interrupted
    }

    /// Abandon a fade in progress, restoring full opacity.
    ///
    /// Idempotent: returns false if nothing was fading.
    pub fn interrupt(&mut self) -> bool {
        if !self.is_fading() {
            return false;
        }
        self.reset_fade();
        tracing::debug!("decay interrupted");
        true
    }

    /// An accepted edit happened: interrupt any fade and re-arm.
    pub fn record_activity(&mut self) -> bool {
        let interrupted = self.interrupt();
        self.arm();
        interrupted
    }

    /// Absolute offset and opacity of the char currently fading, if any.
    pub fn overlay(&self) -> Option<(usize, f64)> {
        let word = self.state.active_word_range.as_ref()?;
        let index = self.state.cursor_within_word?;
        Some((word.start + index, self.state.alpha))
    }

    /// Advance by one fade tick.
    pub fn tick<T: TextBuffer>(
        &mut self,
        ctx: &SessionContext,
        doc: &mut Document<T>,
    ) -> Result<Vec<DecayEvent>, BufferError> {
        if !ctx.decay_running() {
            return Ok(Vec::new());
        }
        match self.phase() {
            DecayPhase::Watching => Ok(self.tick_watching(doc)),
            DecayPhase::Fading => self.tick_fading(doc),
        }
    }

    fn tick_watching<T: TextBuffer>(&mut self, doc: &Document<T>) -> Vec<DecayEvent> {
        let Some(left) = self.state.idle_ticks_left else {
            return Vec::new();
        };
        let left = left.saturating_sub(1);
        if left > 0 {
            self.state.idle_ticks_left = Some(left);
            return Vec::new();
        }

        match trailing_word(doc) {
            Some(word) => {
                tracing::debug!(?word, "idle timeout reached, fading trailing word");
                self.state.idle_ticks_left = None;
                self.select_word(word.clone());
                vec![DecayEvent::Started { word }]
            }
            None => {
                // Nothing to fade; wait for the next edit.
                self.state.idle_ticks_left = None;
                Vec::new()
            }
        }
    }

    fn tick_fading<T: TextBuffer>(
        &mut self,
        doc: &mut Document<T>,
    ) -> Result<Vec<DecayEvent>, BufferError> {
        let end = doc.trimmed_len();
        if end == 0 {
            // Emptied from outside while fading.
            self.reset_fade();
            self.state.idle_ticks_left = None;
            tracing::debug!("buffer emptied during fade");
            return Ok(vec![DecayEvent::Interrupted]);
        }

        let offset = end - 1;
        if self.overlay().map(|(at, _)| at) != Some(offset) {
            // The text moved under us; re-target the current trailing word.
            if let Some(word) = trailing_word(doc) {
                self.select_word(word);
            }
        }

        self.level = self.level.saturating_sub(1);
        self.state.alpha = f64::from(self.level) / f64::from(self.fade_steps);
        if self.level > 0 {
            tracing::trace!(offset, alpha = self.state.alpha, "dimmed");
            return Ok(vec![DecayEvent::Dimmed {
                offset,
                alpha: self.state.alpha,
            }]);
        }

        let mut events = Vec::with_capacity(3);
        let ch = doc.char_at(offset).unwrap_or_default();
        let edit = doc.delete_range(offset, offset + 1)?;
        events.push(DecayEvent::Erased { offset, ch, edit });

        let word_exhausted = offset == 0
            || doc
                .char_at(offset - 1)
                .is_some_and(char::is_whitespace);
        if word_exhausted && offset > 0 {
            let edit = doc.delete_range(offset - 1, offset)?;
            events.push(DecayEvent::Trimmed {
                offset: offset - 1,
                edit,
            });
        }

        match trailing_word(doc) {
            Some(word) if word_exhausted => self.select_word(word),
            Some(word) => {
                // Same word, one char shorter.
                self.state.active_word_range = Some(word.clone());
                self.state.cursor_within_word = Some(word.len() - 1);
                self.level = self.fade_steps;
                self.state.alpha = 1.0;
            }
            None => {
                self.reset_fade();
                self.arm();
                tracing::debug!("decay completed");
                events.push(DecayEvent::Completed);
            }
        }
        Ok(events)
    }

    fn select_word(&mut self, word: Range<usize>) {
        self.state.cursor_within_word = Some(word.len() - 1);
        self.state.active_word_range = Some(word);
        self.state.alpha = 1.0;
        self.level = self.fade_steps;
    }

    fn reset_fade(&mut self) {
        self.state.active_word_range = None;
        self.state.cursor_within_word = None;
        self.state.alpha = 1.0;
        self.level = self.fade_steps;
    }
}

/// The run of non-whitespace chars ending the trimmed buffer, or None if the
/// buffer is blank.
pub fn trailing_word<T: TextBuffer>(doc: &Document<T>) -> Option<Range<usize>> {
    let end = doc.trimmed_len();
    if end == 0 {
        return None;
    }
    let mut start = end;
    while start > 0 && doc.char_at(start - 1).is_some_and(|c| !c.is_whitespace()) {
        start -= 1;
    }
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(steps: u32, idle_ticks: u64) -> EngineConfig {
        EngineConfig {
            fade_steps: steps,
            fade_interval: Duration::from_millis(10),
            idle_timeout: Duration::from_millis(10 * idle_ticks),
            decay_enabled: true,
            ..Default::default()
        }
    }

    fn running() -> SessionContext {
        SessionContext {
            decay_enabled: true,
            ..Default::default()
        }
    }

    fn run(engine: &mut DecayEngine, doc: &mut Document, ticks: usize) -> Vec<DecayEvent> {
        let ctx = running();
        (0..ticks)
            .flat_map(|_| engine.tick(&ctx, &mut *doc).unwrap())
            .collect()
    }

    #[test]
    fn test_trailing_word() {
        assert_eq!(trailing_word(&Document::from_text("hello world  ")), Some(6..11));
        assert_eq!(trailing_word(&Document::from_text("solo")), Some(0..4));
        assert_eq!(trailing_word(&Document::from_text("a\nline")), Some(2..6));
        assert_eq!(trailing_word(&Document::from_text(" \n ")), None);
    }

    #[test]
    fn test_idle_countdown_starts_fade() {
        let mut doc = Document::from_text("hi there");
        let mut engine = DecayEngine::new(&config(4, 3));
        engine.arm();

        assert!(run(&mut engine, &mut doc, 2).is_empty());
        assert_eq!(engine.phase(), DecayPhase::Watching);
        assert_eq!(
            run(&mut engine, &mut doc, 1),
            vec![DecayEvent::Started { word: 3..8 }]
        );
        assert_eq!(engine.state().cursor_within_word, Some(4));
        assert_eq!(engine.overlay(), Some((7, 1.0)));
        assert!(!engine.is_armed());
    }

    #[test]
    fn test_disarmed_engine_never_fades() {
        let mut doc = Document::from_text("text");
        let mut engine = DecayEngine::new(&config(2, 1));
        assert!(run(&mut engine, &mut doc, 10).is_empty());
        assert_eq!(doc.full_text(), "text");
    }

    #[test]
    fn test_erases_word_then_word() {
        let mut doc = Document::from_text("hello world");
        let steps = 3;
        let mut engine = DecayEngine::new(&config(steps, 1));
        engine.arm();

        let events = run(&mut engine, &mut doc, 1 + 10 * steps as usize);
        let erased: String = events
            .iter()
            .filter_map(|e| match e {
                DecayEvent::Erased { ch, .. } => Some(*ch),
                _ => None,
            })
            .collect();
        assert_eq!(erased, "dlrowolleh");
        let trims = events
            .iter()
            .filter(|e| matches!(e, DecayEvent::Trimmed { .. }))
            .count();
        assert_eq!(trims, 1);
        assert_eq!(events.last(), Some(&DecayEvent::Completed));
        assert_eq!(doc.full_text(), "");
        assert_eq!(engine.phase(), DecayPhase::Watching);
        assert!(engine.is_armed());

        // "world" is gone before "hello" is touched.
        let hello_starts = events
            .iter()
            .position(|e| matches!(e, DecayEvent::Erased { ch: 'o', offset: 4, .. }))
            .unwrap();
        let world_ends = events
            .iter()
            .position(|e| matches!(e, DecayEvent::Trimmed { offset: 5, .. }))
            .unwrap();
        assert!(world_ends < hello_starts);
    }

    #[test]
    fn test_dims_before_erasing() {
        let mut doc = Document::from_text("ab");
        let mut engine = DecayEngine::new(&config(4, 1));
        engine.arm();
        let events = run(&mut engine, &mut doc, 4);
        assert_eq!(
            &events[1..],
            &[
                DecayEvent::Dimmed { offset: 1, alpha: 0.75 },
                DecayEvent::Dimmed { offset: 1, alpha: 0.5 },
                DecayEvent::Dimmed { offset: 1, alpha: 0.25 },
            ]
        );
        assert_eq!(doc.full_text(), "ab");
        let events = run(&mut engine, &mut doc, 1);
        assert!(matches!(events[0], DecayEvent::Erased { offset: 1, ch: 'b', .. }));
        assert_eq!(doc.full_text(), "a");
        assert_eq!(engine.overlay(), Some((0, 1.0)));
    }

    #[test]
    fn test_fade_follows_text_changed_underneath() {
        let mut doc = Document::from_text("hello world");
        let mut engine = DecayEngine::new(&config(4, 1));
        engine.arm();
        assert_eq!(
            run(&mut engine, &mut doc, 2)[1],
            DecayEvent::Dimmed { offset: 10, alpha: 0.75 }
        );

        // Text appended behind the engine's back restarts the fade on the new
        // last char instead of erasing the old one.
        doc.insert(11, "s").unwrap();
        assert_eq!(
            run(&mut engine, &mut doc, 1),
            vec![DecayEvent::Dimmed { offset: 11, alpha: 0.75 }]
        );
        assert_eq!(engine.state().active_word_range, Some(6..12));
        let events = run(&mut engine, &mut doc, 2);
        assert!(events.iter().all(|e| matches!(e, DecayEvent::Dimmed { offset: 11, .. })));
        assert_eq!(engine.overlay(), Some((11, 0.25)));
        assert_eq!(doc.full_text(), "hello worlds");

        // Same when the tail is cut short.
        doc.delete_range(9, 12).unwrap();
        assert_eq!(
            run(&mut engine, &mut doc, 1),
            vec![DecayEvent::Dimmed { offset: 8, alpha: 0.75 }]
        );
        assert_eq!(engine.state().active_word_range, Some(6..9));
        assert_eq!(doc.full_text(), "hello wor");
    }

    #[test]
    fn test_interrupt_mid_char_keeps_text() {
        let mut doc = Document::from_text("keep me");
        let mut engine = DecayEngine::new(&config(10, 1));
        engine.arm();
        run(&mut engine, &mut doc, 6);
        assert!(engine.is_fading());
        assert!(engine.state().alpha < 1.0);

        assert!(engine.record_activity());
        assert_eq!(doc.full_text(), "keep me");
        assert_eq!(engine.state().alpha, 1.0);
        assert_eq!(engine.state().active_word_range, None);
        assert_eq!(engine.state().cursor_within_word, None);
        assert_eq!(engine.state().idle_ticks_left, Some(1));
        assert_eq!(engine.overlay(), None);

        // A second interrupt is a no-op.
        assert!(!engine.interrupt());
    }

    #[test]
    fn test_external_clear_while_fading() {
        let mut doc = Document::from_text("gone soon");
        let mut engine = DecayEngine::new(&config(5, 1));
        engine.arm();
        run(&mut engine, &mut doc, 2);
        assert!(engine.is_fading());

        doc.clear().unwrap();
        assert_eq!(
            run(&mut engine, &mut doc, 1),
            vec![DecayEvent::Interrupted]
        );
        assert_eq!(engine.phase(), DecayPhase::Watching);
        assert!(!engine.is_armed());
    }

    #[test]
    fn test_paused_by_visibility_holds_state() {
        let mut doc = Document::from_text("word");
        let mut engine = DecayEngine::new(&config(5, 1));
        engine.arm();
        run(&mut engine, &mut doc, 3);
        let before = engine.state().clone();

        let paused = SessionContext {
            decay_enabled: true,
            decay_paused_by_visibility: true,
            ..Default::default()
        };
        for _ in 0..20 {
            assert!(engine.tick(&paused, &mut doc).unwrap().is_empty());
        }
        assert_eq!(engine.state(), &before);
        assert_eq!(doc.full_text(), "word");
    }

    #[test]
    fn test_trailing_whitespace_is_left_alone() {
        let mut doc = Document::from_text("end \n");
        let mut engine = DecayEngine::new(&config(1, 1));
        engine.arm();
        let events = run(&mut engine, &mut doc, 4);
        assert_eq!(events.last(), Some(&DecayEvent::Completed));
        assert_eq!(doc.full_text(), " \n");
    }

    #[test]
    fn test_blank_buffer_disarms_on_timeout() {
        let mut doc = Document::from_text("   ");
        let mut engine = DecayEngine::new(&config(2, 2));
        engine.arm();
        assert!(run(&mut engine, &mut doc, 2).is_empty());
        assert!(!engine.is_armed());
        assert!(!engine.is_fading());
    }
}
