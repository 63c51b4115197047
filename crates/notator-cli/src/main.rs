use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use notator_core::{SessionCoordinator, derive_spans};

mod config;
mod live;
mod replay;

#[derive(Parser)]
#[command(version, about = "Notator - a writing surface that only moves forward", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a KDL config file (defaults to <config dir>/notator/config.kdl)
    #[arg(long, global = true, env = "NOTATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log engine transitions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the formatting spans of every line in a file
    Spans {
        file: PathBuf,

        /// One JSON object per line instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run an event script against a fresh session
    Replay {
        script: PathBuf,

        /// Text the first buffer starts with
        #[arg(long, default_value = "")]
        initial: String,
    },
    /// Write interactively, saving to FILE on exit
    Write { file: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Spans { file, json } => print_spans(file, json)?,
        Commands::Replay { script, initial } => {
            let config = config::load(cli.config.as_deref())?;
            replay_script(config, script, &initial)?;
        }
        Commands::Write { file } => {
            let config = config::load(cli.config.as_deref())?;
            live::run(config, file).await?;
        }
    }

    Ok(())
}

fn print_spans(file: PathBuf, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(&file).into_diagnostic()?;
    for (line_no, line) in text.lines().enumerate() {
        let spans = derive_spans(line);
        if json {
            let record = serde_json::json!({ "line": line_no, "spans": spans });
            println!("{record}");
        } else if !spans.is_empty() {
            let described: Vec<_> = spans
                .iter()
                .map(|s| format!("{}..{} {:?} {:.2}", s.start, s.end(), s.kind, s.weight))
                .collect();
            println!("{line_no}: {}", described.join(", "));
        }
    }
    Ok(())
}

fn replay_script(
    config: notator_core::EngineConfig,
    script: PathBuf,
    initial: &str,
) -> Result<()> {
    let source = std::fs::read_to_string(&script).into_diagnostic()?;
    let steps = replay::parse_script(&script.display().to_string(), &source)?;
    let mut session = SessionCoordinator::new(config, initial)?;

    for event in replay::run(&mut session, steps) {
        println!("{}", serde_json::to_string(&event).into_diagnostic()?);
    }
    for id in session.buffer_ids() {
        let text = session.full_text(id).unwrap_or_default();
        println!("--- buffer {id} ---");
        print!("{text}");
        if !text.is_empty() && !text.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
