//! KDL config file loading.
//!
//! ```kdl
//! idle-timeout-ms 10000
//! fade-steps 10
//! fade-interval-ms 50
//! timer-presets 5 15 25
//! double-tap-ms 1000
//! decay false
//! restricted false
//! ```
//!
//! Every node is optional. Environment variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kdl::{KdlDocument, KdlValue};
use miette::{IntoDiagnostic, Result};
use notator_core::EngineConfig;

/// `<config dir>/notator/config.kdl`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("notator").join("config.kdl"))
}

/// Load the engine config from `path` (or the default location), then apply
/// environment overrides and validate.
///
/// A missing default file is not an error; a missing explicit one is.
pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => parse(&std::fs::read_to_string(path).into_diagnostic()?)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                parse(&std::fs::read_to_string(&path).into_diagnostic()?)?
            }
            None => EngineConfig::default(),
        },
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Parse config nodes over the defaults.
pub fn parse(source: &str) -> Result<EngineConfig> {
    let doc: KdlDocument = source.parse().into_diagnostic()?;
    let mut config = EngineConfig::default();

    if let Some(ms) = first_u64(&doc, "idle-timeout-ms") {
        config.idle_timeout = Duration::from_millis(ms);
    }
    if let Some(steps) = first_u64(&doc, "fade-steps") {
        config.fade_steps = u32::try_from(steps).unwrap_or(u32::MAX);
    }
    if let Some(ms) = first_u64(&doc, "fade-interval-ms") {
        config.fade_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = first_u64(&doc, "double-tap-ms") {
        config.double_tap_window = Duration::from_millis(ms);
    }
    if let Some(node) = doc.get("timer-presets") {
        config.timer_presets = node
            .entries()
            .iter()
            .filter_map(|entry| as_u64(entry.value()))
            .filter(|&minutes| minutes > 0)
            .filter_map(|minutes| {
                let secs = minutes.checked_mul(60);
                if secs.is_none() {
                    tracing::warn!(minutes, "timer preset too large, ignoring");
                }
                secs.map(Duration::from_secs)
            })
            .collect();
    }
    if let Some(on) = first_value(&doc, "decay").and_then(KdlValue::as_bool) {
        config.decay_enabled = on;
    }
    if let Some(on) = first_value(&doc, "restricted").and_then(KdlValue::as_bool) {
        config.restricted_edit = on;
    }
    Ok(config)
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)?.entries().first().map(|entry| entry.value())
}

fn first_u64(doc: &KdlDocument, name: &str) -> Option<u64> {
    let value = first_value(doc, name)?;
    let parsed = as_u64(value);
    if parsed.is_none() {
        tracing::warn!(node = name, %value, "expected a non-negative integer, ignoring");
    }
    parsed
}

fn as_u64(value: &KdlValue) -> Option<u64> {
    value.as_i64().and_then(|n| u64::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides_defaults() {
        let config = parse(
            "idle-timeout-ms 3000\nfade-steps 4\ntimer-presets 10 20\ndecay true\n",
        )
        .unwrap();
        assert_eq!(config.idle_timeout, Duration::from_secs(3));
        assert_eq!(config.fade_steps, 4);
        assert_eq!(
            config.timer_presets,
            vec![Duration::from_secs(600), Duration::from_secs(1200)]
        );
        assert!(config.decay_enabled);
        assert!(!config.restricted_edit);
        assert_eq!(config.fade_interval, EngineConfig::default().fade_interval);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        assert_eq!(parse("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_bad_values_are_skipped() {
        let config = parse("fade-steps \"many\"\n").unwrap();
        assert_eq!(config.fade_steps, EngineConfig::default().fade_steps);
    }

    #[test]
    fn test_oversized_preset_is_skipped() {
        let config = parse("timer-presets 9223372036854775807 5\n").unwrap();
        assert_eq!(config.timer_presets, vec![Duration::from_secs(300)]);
    }

    #[test]
    fn test_malformed_kdl_is_an_error() {
        let err = parse("node \"unterminated\n").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
