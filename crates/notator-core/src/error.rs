//! Error types for notator-core.
//!
//! Only genuine precondition violations are errors. Policy rejections (a
//! keystroke dropped in restricted mode, a malformed duration typed by the
//! user) are reported through `bool`/`Option` returns instead.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by text buffer mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum BufferError {
    /// An offset or range fell outside the buffer.
    #[error("offset {offset} is out of range for a buffer of {len} chars")]
    #[diagnostic(code(notator::buffer::out_of_range))]
    OutOfRange { offset: usize, len: usize },
}

/// Errors raised when validating an [`EngineConfig`](crate::EngineConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("fade-steps must be at least 1")]
    #[diagnostic(code(notator::config::fade_steps))]
    ZeroFadeSteps,

    #[error("{field} must be greater than zero")]
    #[diagnostic(code(notator::config::zero_interval))]
    ZeroInterval { field: &'static str },

    #[error("at least one timer preset is required")]
    #[diagnostic(
        code(notator::config::presets),
        help("add a `timer-presets 5 15 25` line to the config file")
    )]
    NoPresets,
}
