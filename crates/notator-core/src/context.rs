//! Session-wide mode flags.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// Mode flags shared by every buffer in a session.
///
/// Set by external UI actions and passed by reference into the gate and the
/// decay engines on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionContext {
    /// Forward-only writing: backward movement and deletion keys are dropped.
    pub restricted_edit: bool,
    /// Idle-triggered fading of trailing words.
    pub decay_enabled: bool,
    /// The surface is hidden; decay holds its state without advancing.
    pub decay_paused_by_visibility: bool,
}

impl SessionContext {
    /// Initial flags taken from configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            restricted_edit: config.restricted_edit,
            decay_enabled: config.decay_enabled,
            decay_paused_by_visibility: false,
        }
    }

    /// Whether decay engines should advance on a fade tick.
    pub fn decay_running(&self) -> bool {
        self.decay_enabled && !self.decay_paused_by_visibility
    }
}
