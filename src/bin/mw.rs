//! mw interactive shell
//!
//! # Usage
//!
//! ```bash
//! # Open two clips and edit interactively
//! mw drums.wav vocals.flac
//!
//! # Run commands before the prompt appears
//! mw take1.wav -e "100,2500 crop" -e "export trimmed.wav"
//!
//! # Run a command file
//! mw take1.wav --script edit.mw
//!
//! # Print parsed commands as JSON without executing them
//! echo "100,-20 export clip.wav" | mw --parse-only
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use mw::config::{SessionConfig, DEFAULT_SAMPLE_RATE};
use mw::display::DEFAULT_WIDTH;
use mw::{completion_target, LineOutcome, Registry, Session};
use mw_core::CommandParser;

#[derive(Parser)]
#[command(name = "mw")]
#[command(version)]
#[command(about = "Stack-based audio editing shell")]
#[command(long_about = None)]
struct Cli {
    /// Audio files to push onto the stack, first file at the bottom
    files: Vec<PathBuf>,

    /// Command to run before the prompt (repeatable)
    #[arg(short = 'e', long = "exec", value_name = "COMMAND")]
    exec: Vec<String>,

    /// File of newline-separated commands, run after --exec (repeatable)
    #[arg(short = 'f', long = "script", value_name = "FILE")]
    script: Vec<PathBuf>,

    /// Display width in columns
    #[arg(long, env = "MW_DISPLAY_WIDTH", default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Line-editor history file
    #[arg(long, env = "MW_HISTORY")]
    history: Option<PathBuf>,

    /// Sample rate for clips created with `new`
    #[arg(long, env = "MW_SAMPLE_RATE", default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Print each line's parsed command as JSON instead of running it
    #[arg(long)]
    parse_only: bool,

    /// Skip the startup banner
    #[arg(long)]
    no_banner: bool,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            display_width: self.width,
            sample_rate: self.sample_rate,
            history: self.history.clone(),
        }
    }
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mw=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.session_config();

    let scripts = cli
        .script
        .iter()
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    if cli.parse_only {
        return run_parse_only(&cli.exec, &scripts);
    }

    if !cli.no_banner {
        println!("{} {}", "mw".green().bold(), env!("CARGO_PKG_VERSION"));
    }

    let mut session = Session::stdout(&config);
    session.set_error_label("Error:".red().bold().to_string());

    for file in &cli.files {
        if let Err(e) = session.load(file) {
            eprintln!("{} {}: {e}", "Error:".red().bold(), file.display());
        }
    }

    for command in &cli.exec {
        if session.handle_line(command) == LineOutcome::Exit {
            return Ok(());
        }
    }
    for script in &scripts {
        session.run_script(script);
        if session.is_exited() {
            return Ok(());
        }
    }

    run_interactive(&mut session, &config)
}

// =============================================================================
// MODES
// =============================================================================

fn run_interactive(session: &mut Session, config: &SessionConfig) -> Result<()> {
    let mut rl: Editor<ActionHelper, DefaultHistory> =
        Editor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
    rl.set_helper(Some(ActionHelper::new(session.registry())));

    if let Some(path) = &config.history {
        if let Err(e) = rl.load_history(path) {
            debug!(path = %path.display(), error = %e, "no history loaded");
        }
    }

    session.print_stack()?;

    loop {
        let line = match rl.readline(&session.prompt()) {
            Ok(line) => line,
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };

        if !line.trim().is_empty() {
            rl.add_history_entry(line.as_str())
                .map_err(|e| anyhow!("failed to record history: {e}"))?;
        }

        if session.handle_line(&line) == LineOutcome::Exit {
            break;
        }
    }

    if let Some(path) = &config.history {
        if let Err(e) = rl.save_history(path) {
            warn!(path = %path.display(), error = %e, "could not save history");
        }
    }

    Ok(())
}

/// Parse every line from --exec and --script (or stdin when neither is
/// given), printing one JSON object per line
fn run_parse_only(exec: &[String], scripts: &[String]) -> Result<()> {
    let parser = CommandParser::new();
    let from_stdin = if exec.is_empty() && scripts.is_empty() {
        std::io::stdin()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    let lines = exec
        .iter()
        .map(String::as_str)
        .chain(scripts.iter().flat_map(|s| s.lines()))
        .chain(from_stdin.iter().map(String::as_str));

    for line in lines {
        match parser.parse(line) {
            Ok(command) => println!("{}", serde_json::to_string(&command)?),
            Err(e) => {
                let output = serde_json::json!({
                    "line": line,
                    "error": e.to_string(),
                    "column": e.column,
                });
                println!("{}", serde_json::to_string(&output)?);
            }
        }
    }

    Ok(())
}

// =============================================================================
// COMPLETION
// =============================================================================

struct ActionHelper {
    registry: &'static Registry,
}

impl ActionHelper {
    fn new(registry: &'static Registry) -> Self {
        Self { registry }
    }
}

impl Helper for ActionHelper {}

impl Highlighter for ActionHelper {}

impl Validator for ActionHelper {}

impl Hinter for ActionHelper {
    type Hint = String;
}

impl Completer for ActionHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some((start, partial)) = completion_target(line, pos) else {
            return Ok((pos, Vec::new()));
        };
        let candidates = self
            .registry
            .complete(partial)
            .into_iter()
            .map(|name| Pair {
                display: name.to_string(),
                replacement: format!("{name} "),
            })
            .collect();
        Ok((start, candidates))
    }
}
