//! Events crossing the session boundary.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::format::FormatSpan;
use crate::gate::EditOp;

/// Identifies one buffer within a session. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A mode flag flip requested by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeChange {
    RestrictedEdit(bool),
    DecayEnabled(bool),
    /// The writing surface was hidden (`true`) or shown again.
    DecayPaused(bool),
}

/// Everything the session reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Inbound {
    /// A keystroke for the focused buffer.
    Key { op: EditOp },
    /// One second of wall time.
    Tick1s,
    /// One fade interval of wall time.
    TickFade,
    ModeChange { change: ModeChange },
    FocusChange { buffer_id: BufferId },
    TimerStart { duration: Duration },
    TimerStop,
    TimerRestart,
    /// The UI has shown the expiry notice.
    TimerAck,
}

/// Notifications for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Outbound {
    /// Freshly derived spans for one line.
    SpansChanged {
        buffer_id: BufferId,
        line_no: usize,
        spans: Vec<FormatSpan>,
    },
    TimerTick { remaining: u64 },
    TimerExpired,
    /// Decay erased one char.
    DecayProgressed { buffer_id: BufferId },
    DecayCompleted { buffer_id: BufferId },
    /// A fade was cancelled and the remaining text is back at full opacity.
    DecayInterrupted { buffer_id: BufferId },
    /// The char at `offset` dimmed to `alpha`.
    FadeStep {
        buffer_id: BufferId,
        offset: usize,
        alpha: f64,
    },
}

impl From<EditOp> for Inbound {
    fn from(op: EditOp) -> Self {
        Inbound::Key { op }
    }
}

impl From<ModeChange> for Inbound {
    fn from(change: ModeChange) -> Self {
        Inbound::ModeChange { change }
    }
}
