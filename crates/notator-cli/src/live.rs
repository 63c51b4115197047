//! Interactive line-mode writing session.
//!
//! Tick sources run as tasks and stdin is read on its own thread; everything
//! they produce is funnelled through one channel into the loop that owns the
//! session, so the session itself is only ever touched from one place.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{IntoDiagnostic, Result};
use notator_core::{
    BufferId, EditOp, EngineConfig, Inbound, ModeChange, Outbound, SessionCoordinator,
    TimerShortcut, format_remaining, parse_custom_minutes,
};
use tokio::sync::mpsc;

const HELP: &str = "commands: :t [minutes]  :r restricted  :d decay  :n new  :c close  \
                    :< :> switch  :w [file] save  :q quit";

#[derive(Debug, PartialEq)]
enum Msg {
    Line(String),
    Second,
    Fade,
    Eof,
}

/// What the loop should do after a stdin line.
#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

/// The session plus the file each buffer saves to.
struct Live {
    session: SessionCoordinator,
    paths: HashMap<BufferId, PathBuf>,
}

pub async fn run(config: EngineConfig, file: Option<PathBuf>) -> Result<()> {
    let initial = match &file {
        Some(path) if path.exists() => {
            tokio::fs::read_to_string(path).await.into_diagnostic()?
        }
        _ => String::new(),
    };
    let fade_interval = config.fade_interval;
    let mut live = Live::new(SessionCoordinator::new(config, &initial)?);
    if let Some(path) = file {
        let id = live.session.focused();
        live.attach(id, path);
    }

    let (tx, mut rx) = mpsc::channel::<Msg>(64);
    spawn_ticker(tx.clone(), Duration::from_secs(1), || Msg::Second);
    spawn_ticker(tx.clone(), fade_interval, || Msg::Fade);
    spawn_line_reader(std::io::BufReader::new(std::io::stdin()), tx);

    println!("writing to {}", live.focused_title());
    println!("{HELP}");

    while let Some(msg) = rx.recv().await {
        let events = match msg {
            Msg::Second => live.session.handle(Inbound::Tick1s),
            Msg::Fade => live.session.handle(Inbound::TickFade),
            Msg::Eof => break,
            Msg::Line(line) => match line.strip_prefix(':') {
                Some(command) => match live.command(command).await {
                    (Flow::Quit, _) => break,
                    (Flow::Continue, events) => events,
                },
                None => live
                    .session
                    .handle(EditOp::Insert(format!("{line}\n").into()).into()),
            },
        };
        report(&mut live.session, &events);
    }

    live.save_all().await
}

fn spawn_ticker(tx: mpsc::Sender<Msg>, period: Duration, make: fn() -> Msg) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if tx.send(make()).await.is_err() {
                break;
            }
        }
    });
}

/// Read lines on a plain thread. A blocked read there never holds up runtime
/// shutdown after `:q`.
fn spawn_line_reader<R>(reader: R, tx: mpsc::Sender<Msg>) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in reader.lines() {
            let msg = match line {
                Ok(line) => Msg::Line(line),
                Err(err) => {
                    tracing::warn!(%err, "stdin read failed");
                    break;
                }
            };
            if tx.blocking_send(msg).is_err() {
                return;
            }
        }
        let _closed = tx.blocking_send(Msg::Eof);
    })
}

impl Live {
    fn new(session: SessionCoordinator) -> Self {
        Self {
            session,
            paths: HashMap::new(),
        }
    }

    /// Bind a buffer to a file, titling it after the file name.
    fn attach(&mut self, id: BufferId, path: PathBuf) {
        if let Some(name) = path.file_name() {
            self.session.set_title(id, name.to_string_lossy().into_owned());
        }
        self.paths.insert(id, path);
    }

    fn focused_title(&self) -> String {
        let id = self.session.focused();
        format!("{id} {}", self.session.title(id).unwrap_or_default())
    }

    async fn command(&mut self, command: &str) -> (Flow, Vec<Outbound>) {
        let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
        let (name, arg) = (name.trim(), arg.trim());
        let events = match name {
            "q" => return (Flow::Quit, Vec::new()),
            "r" => {
                let on = self.session.toggle_restricted();
                println!("restricted mode {}", if on { "on" } else { "off" });
                Vec::new()
            }
            "d" => {
                let on = !self.session.context().decay_enabled;
                println!("decay {}", if on { "on" } else { "off" });
                self.session.handle(ModeChange::DecayEnabled(on).into())
            }
            "t" if arg.is_empty() => {
                match self.session.timer_shortcut(web_time::Instant::now()) {
                    TimerShortcut::Reset => println!("timer reset"),
                    TimerShortcut::ChoosePreset => {
                        let presets: Vec<_> = self
                            .session
                            .config()
                            .timer_presets
                            .iter()
                            .map(|d| (d.as_secs() / 60).to_string())
                            .collect();
                        println!("presets: {} (minutes, use :t <n>)", presets.join(" "));
                    }
                }
                Vec::new()
            }
            "t" => {
                match parse_custom_minutes(arg) {
                    Some(duration) => {
                        self.session.start_timer(duration);
                        println!("timer {}", format_remaining(duration.as_secs()));
                    }
                    None => println!("not a number of minutes: {arg}"),
                }
                Vec::new()
            }
            "n" => {
                self.session.open_buffer("");
                println!("{}", self.focused_title());
                Vec::new()
            }
            "c" => {
                let id = self.session.focused();
                self.session.close_buffer(id);
                self.paths.remove(&id);
                println!("closed {id}, now on {}", self.focused_title());
                Vec::new()
            }
            "<" | ">" => {
                let moved = if name == "<" {
                    self.session.focus_prev()
                } else {
                    self.session.focus_next()
                };
                if moved {
                    println!("{}", self.focused_title());
                } else {
                    println!("no buffer that way");
                }
                Vec::new()
            }
            "w" => {
                let id = self.session.focused();
                if !arg.is_empty() {
                    self.attach(id, PathBuf::from(arg));
                }
                match self.save(id).await {
                    Ok(Some(path)) => println!("saved {}", path.display()),
                    Ok(None) => println!("no file for {id}, use :w <file>"),
                    Err(err) => println!("save failed: {err}"),
                }
                Vec::new()
            }
            other => {
                println!("unknown command :{other}");
                Vec::new()
            }
        };
        (Flow::Continue, events)
    }

    /// Write one buffer to its file. `None` if the buffer has no file.
    async fn save(&self, id: BufferId) -> Result<Option<&Path>> {
        let (Some(path), Some(text)) = (self.paths.get(&id), self.session.full_text(id)) else {
            return Ok(None);
        };
        tokio::fs::write(path, text).await.into_diagnostic()?;
        tracing::info!(%id, path = %path.display(), "saved");
        Ok(Some(path))
    }

    async fn save_all(&self) -> Result<()> {
        for id in self.session.buffer_ids() {
            self.save(id).await?;
        }
        Ok(())
    }
}

fn report(session: &mut SessionCoordinator, events: &[Outbound]) {
    for event in events {
        match event {
            Outbound::TimerTick { remaining } if remaining % 60 == 0 => {
                println!("[{} left]", format_remaining(*remaining));
            }
            Outbound::TimerExpired => {
                println!("[time is up]");
                session.handle(Inbound::TimerAck);
            }
            Outbound::DecayProgressed { buffer_id } if *buffer_id == session.focused() => {
                let text = session.focused_text();
                let tail = text.lines().last().unwrap_or_default();
                if let Err(err) = redraw_tail(&mut std::io::stdout(), tail) {
                    tracing::warn!(%err, "redrawing the fading line failed");
                }
            }
            Outbound::DecayCompleted { .. } => println!("\r\x1b[2K[faded away]"),
            Outbound::DecayInterrupted { .. } => println!(),
            _ => {}
        }
    }
}

/// Overwrite the current terminal line with `tail`.
fn redraw_tail(out: &mut impl Write, tail: &str) -> std::io::Result<()> {
    write!(out, "\r\x1b[2K{tail}")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(text: &str) -> Live {
        Live::new(SessionCoordinator::new(EngineConfig::default(), text).unwrap())
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("notator-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn test_line_reader_runs_off_the_runtime() {
        let (tx, mut rx) = mpsc::channel(4);
        let reader = spawn_line_reader(std::io::Cursor::new("one\n:q\n"), tx);
        assert_eq!(rx.recv().await, Some(Msg::Line("one".into())));
        assert_eq!(rx.recv().await, Some(Msg::Line(":q".into())));
        assert_eq!(rx.recv().await, Some(Msg::Eof));
        assert_eq!(rx.recv().await, None);
        assert!(reader.join().is_ok());
    }

    #[test]
    fn test_line_reader_stops_when_loop_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let reader = spawn_line_reader(std::io::Cursor::new("a\nb\nc\n"), tx);
        assert!(reader.join().is_ok());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn test_redraw_tail() {
        let mut out = Vec::new();
        redraw_tail(&mut out, "fadin").unwrap();
        assert_eq!(out, b"\r\x1b[2Kfadin");

        let err = redraw_tail(&mut BrokenPipe, "x").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_buffer_commands() {
        let mut live = live("first");
        let first = live.session.focused();

        assert_eq!(live.command("n").await.0, Flow::Continue);
        let second = live.session.focused();
        assert_ne!(first, second);
        assert_eq!(live.session.buffer_ids(), vec![first, second]);

        live.command("<").await;
        assert_eq!(live.session.focused(), first);
        // Focus does not wrap.
        live.command("<").await;
        assert_eq!(live.session.focused(), first);
        live.command(">").await;
        assert_eq!(live.session.focused(), second);

        live.command("c").await;
        assert_eq!(live.session.buffer_ids(), vec![first]);
        assert_eq!(live.session.focused_text(), "first");
        assert_eq!(live.command("q").await.0, Flow::Quit);
    }

    #[tokio::test]
    async fn test_write_command_saves_focused_buffer() {
        let path = scratch("write.md");
        let mut live = live("draft");

        // No file yet: nothing is written.
        live.command("w").await;
        assert!(live.paths.is_empty());

        live.command(&format!("w {}", path.display())).await;
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "draft");
        let id = live.session.focused();
        assert_eq!(
            live.session.title(id),
            path.file_name().and_then(|n| n.to_str())
        );

        live.session.handle(EditOp::Insert(" two".into()).into());
        live.command("w").await;
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "draft two");
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_exit_saves_every_bound_buffer() {
        let (one, two) = (scratch("one.md"), scratch("two.md"));
        let mut live = live("alpha");
        let first = live.session.focused();
        live.attach(first, one.clone());
        live.command("n").await;
        live.session.handle(EditOp::Insert("beta".into()).into());
        live.command(&format!("w {}", two.display())).await;
        live.command("n").await;

        live.save_all().await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&one).await.unwrap(), "alpha");
        assert_eq!(tokio::fs::read_to_string(&two).await.unwrap(), "beta");
        tokio::fs::remove_file(&one).await.unwrap();
        tokio::fs::remove_file(&two).await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_buffer_forgets_its_file() {
        let mut live = live("");
        let id = live.session.focused();
        live.attach(id, scratch("closed.md"));
        live.command("c").await;
        assert!(!live.paths.contains_key(&id));
    }
}
