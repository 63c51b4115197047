//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for the timer and decay engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period after the last accepted edit before decay starts.
    pub idle_timeout: Duration,
    /// Opacity levels a character passes through before it is erased.
    pub fade_steps: u32,
    /// Period of the fade tick, i.e. the inverse of the erasure speed.
    pub fade_interval: Duration,
    /// Quick-pick countdown durations.
    pub timer_presets: Vec<Duration>,
    /// Two timer shortcuts within this window reset the timer.
    pub double_tap_window: Duration,
    /// Initial state of the decay toggle.
    pub decay_enabled: bool,
    /// Initial state of restricted-edit mode.
    pub restricted_edit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            fade_steps: 10,
            fade_interval: Duration::from_millis(50),
            timer_presets: [5, 15, 25]
                .into_iter()
                .map(|minutes| Duration::from_secs(minutes * 60))
                .collect(),
            double_tap_window: Duration::from_secs(1),
            decay_enabled: false,
            restricted_edit: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables.
    ///
    /// Optional env vars:
    /// - `NOTATOR_IDLE_TIMEOUT_MS`: idle period before decay starts
    /// - `NOTATOR_FADE_STEPS`: opacity levels per erased character
    /// - `NOTATOR_FADE_INTERVAL_MS`: fade tick period
    /// - `NOTATOR_DECAY`: `true`/`false`, start with decay enabled
    /// - `NOTATOR_RESTRICTED`: `true`/`false`, start in restricted mode
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self) {
        if let Some(ms) = env_parse::<u64>("NOTATOR_IDLE_TIMEOUT_MS") {
            self.idle_timeout = Duration::from_millis(ms);
        }
        if let Some(steps) = env_parse("NOTATOR_FADE_STEPS") {
            self.fade_steps = steps;
        }
        if let Some(ms) = env_parse::<u64>("NOTATOR_FADE_INTERVAL_MS") {
            self.fade_interval = Duration::from_millis(ms);
        }
        if let Some(on) = env_parse("NOTATOR_DECAY") {
            self.decay_enabled = on;
        }
        if let Some(on) = env_parse("NOTATOR_RESTRICTED") {
            self.restricted_edit = on;
        }
    }

    /// Reject values the engines cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fade_steps == 0 {
            return Err(ConfigError::ZeroFadeSteps);
        }
        if self.fade_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "fade-interval",
            });
        }
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::ZeroInterval {
                field: "idle-timeout",
            });
        }
        if self.timer_presets.is_empty() {
            return Err(ConfigError::NoPresets);
        }
        Ok(())
    }

    /// The idle timeout expressed in fade ticks, rounded up, at least one.
    pub fn idle_ticks(&self) -> u32 {
        let interval = self.fade_interval.as_millis().max(1);
        let ticks = self.idle_timeout.as_millis().div_ceil(interval);
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.idle_ticks(), 200);
        assert_eq!(config.timer_presets[1], Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_idle_ticks_rounds_up() {
        let config = EngineConfig {
            idle_timeout: Duration::from_millis(120),
            fade_interval: Duration::from_millis(50),
            ..Default::default()
        };
        assert_eq!(config.idle_ticks(), 3);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let config = EngineConfig {
            fade_steps: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroFadeSteps));

        let config = EngineConfig {
            fade_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroInterval { .. })
        ));

        let config = EngineConfig {
            timer_presets: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPresets));
    }
}
