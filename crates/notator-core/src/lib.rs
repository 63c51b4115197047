//! notator-core: the behaviour engine of a distraction-reduced writing surface.
//!
//! This crate provides:
//! - `TextBuffer` trait for text storage abstraction
//! - `EditorRope` - ropey-backed implementation
//! - `Document<T>` - text plus per-line Markdown spans, re-derived per edited line
//! - `EditGate` - restricted-edit (forward-only) key filtering
//! - `CountdownTimer` - tick-driven writing timer
//! - `DecayEngine` - idle-triggered fading of trailing words
//! - `SessionCoordinator` - sequences all of the above across buffers
//!
//! Nothing here reads a clock or spawns a thread: callers deliver ticks as
//! events and render whatever comes back.

pub mod config;
pub mod context;
pub mod countdown;
pub mod decay;
pub mod document;
pub mod error;
pub mod events;
pub mod format;
pub mod gate;
pub mod session;
pub mod text;
pub mod types;

pub use config::EngineConfig;
pub use context::SessionContext;
pub use countdown::{CountdownTimer, TimerEvent, TimerPhase, format_remaining, parse_custom_minutes};
pub use decay::{DecayEngine, DecayEvent, DecayPhase, DecayState};
pub use document::Document;
pub use error::{BufferError, ConfigError};
pub use events::{BufferId, Inbound, ModeChange, Outbound};
pub use format::{FormatSpan, SpanKind, derive_spans, heading_scale};
pub use gate::{EditGate, EditOp};
pub use session::{SessionCoordinator, TimerShortcut};
pub use smol_str::SmolStr;
pub use text::{EditorRope, TextBuffer};
pub use types::{CursorState, EditInfo};
