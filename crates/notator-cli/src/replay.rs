//! Deterministic event scripts.
//!
//! One command per line; blank lines and `#` comments are skipped.
//!
//! ```text
//! type Hello, world\n     # insert text (\n and \t escapes)
//! backspace | delete | left | right | up | down
//! tick [n]                # n one-second ticks
//! fade [n]                # n fade ticks
//! restricted on|off
//! decay on|off
//! hidden on|off
//! open [text]             # new focused buffer
//! focus <id>
//! timer <minutes> | timer stop | timer restart | timer ack
//! ```

use miette::{Diagnostic, NamedSource, SourceSpan};
use notator_core::{
    BufferId, EditOp, Inbound, ModeChange, Outbound, SessionCoordinator, parse_custom_minutes,
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(notator::replay::syntax))]
pub struct ScriptError {
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Event { event: Inbound, repeat: usize },
    Open(String),
}

/// Parse a whole script, reporting the first bad line.
pub fn parse_script(name: &str, source: &str) -> Result<Vec<Step>, ScriptError> {
    let mut steps = Vec::new();
    let mut line_start = 0;
    for line in source.split_inclusive('\n') {
        let content = strip_comment(line).trim();
        if !content.is_empty() {
            let step = parse_line(content).map_err(|message| {
                let indent = line.len() - line.trim_start().len();
                ScriptError {
                    message,
                    src: NamedSource::new(name, source.to_string()),
                    span: (line_start + indent, content.len()).into(),
                }
            })?;
            steps.push(step);
        }
        line_start += line.len();
    }
    Ok(steps)
}

/// Run a script against `session`, returning every outbound event in order.
pub fn run(session: &mut SessionCoordinator, steps: Vec<Step>) -> Vec<Outbound> {
    let mut out = Vec::new();
    for step in steps {
        match step {
            Step::Event { event, repeat } => {
                for _ in 0..repeat {
                    out.extend(session.handle(event.clone()));
                }
            }
            Step::Open(text) => {
                let id = session.open_buffer(&text);
                tracing::debug!(%id, "script opened buffer");
            }
        }
    }
    out
}

fn strip_comment(line: &str) -> &str {
    // `type` keeps its `#` so headings can be typed.
    if line.trim_start().starts_with("type ") {
        return line.trim_end_matches(['\n', '\r']);
    }
    line.split('#').next().unwrap_or_default()
}

fn parse_line(line: &str) -> Result<Step, String> {
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let event = |event: Inbound| -> Result<Step, String> { Ok(Step::Event { event, repeat: 1 }) };
    let key = |op: EditOp| event(op.into());

    match word {
        "type" => key(EditOp::Insert(unescape(rest).into())),
        "backspace" => key(EditOp::DeleteBackward),
        "delete" => key(EditOp::DeleteForward),
        "left" => key(EditOp::CursorLeft),
        "right" => key(EditOp::CursorRight),
        "up" => key(EditOp::CursorUp),
        "down" => key(EditOp::CursorDown),
        "tick" => Ok(Step::Event {
            event: Inbound::Tick1s,
            repeat: count(rest)?,
        }),
        "fade" => Ok(Step::Event {
            event: Inbound::TickFade,
            repeat: count(rest)?,
        }),
        "restricted" => event(ModeChange::RestrictedEdit(switch(rest)?).into()),
        "decay" => event(ModeChange::DecayEnabled(switch(rest)?).into()),
        "hidden" => event(ModeChange::DecayPaused(switch(rest)?).into()),
        "open" => Ok(Step::Open(unescape(rest))),
        "focus" => {
            let id = rest
                .parse()
                .map_err(|_| format!("expected a buffer id, got {rest:?}"))?;
            event(Inbound::FocusChange {
                buffer_id: BufferId(id),
            })
        }
        "timer" => match rest {
            "stop" => event(Inbound::TimerStop),
            "restart" => event(Inbound::TimerRestart),
            "ack" => event(Inbound::TimerAck),
            minutes => match parse_custom_minutes(minutes) {
                Some(duration) => event(Inbound::TimerStart { duration }),
                None => Err(format!("expected minutes or stop/restart/ack, got {minutes:?}")),
            },
        },
        other => Err(format!("unknown command {other:?}")),
    }
}

fn count(arg: &str) -> Result<usize, String> {
    if arg.is_empty() {
        return Ok(1);
    }
    arg.parse()
        .map_err(|_| format!("expected a repeat count, got {arg:?}"))
}

fn switch(arg: &str) -> Result<bool, String> {
    match arg {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("expected on or off, got {other:?}")),
    }
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use notator_core::EngineConfig;

    use super::*;

    #[test]
    fn test_parse_script() {
        let steps = parse_script(
            "demo",
            "# warm up\ntype # Title\\n\nfade 3   # wait\ndecay on\n\ntimer 5\n",
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Event {
                    event: EditOp::Insert("# Title\n".into()).into(),
                    repeat: 1,
                },
                Step::Event {
                    event: Inbound::TickFade,
                    repeat: 3,
                },
                Step::Event {
                    event: ModeChange::DecayEnabled(true).into(),
                    repeat: 1,
                },
                Step::Event {
                    event: Inbound::TimerStart {
                        duration: std::time::Duration::from_secs(300),
                    },
                    repeat: 1,
                },
            ]
        );
    }

    #[test]
    fn test_bad_line_is_reported() {
        let err = parse_script("demo", "tick\n  decay maybe\n").unwrap_err();
        assert_eq!(err.to_string(), "expected on or off, got \"maybe\"");
        assert_eq!(err.span.offset(), 7);
        assert_eq!(err.span.len(), 11);
    }

    #[test]
    fn test_run_restricted_script() {
        let steps = parse_script(
            "demo",
            "type abc\nrestricted on\nbackspace\nleft\ntype d\nrestricted off\nbackspace\n",
        )
        .unwrap();
        let mut session = SessionCoordinator::new(EngineConfig::default(), "").unwrap();
        let out = run(&mut session, steps);
        assert_eq!(session.focused_text(), "abc");
        assert_eq!(out.len(), 3);
    }
}
