//! Read-eval session
//!
//! One line at a time: parse, dispatch, report. A session is single
//! threaded and owns its editor outright.
//!
//! ```text
//! Idle ─► Parsing ─┬─► Dispatching ─┬─► Idle
//!                  │                └─► Exited   (q)
//!                  └─► ParseError ─────► Idle
//! ```

use std::io::{self, Stdout, Write};
use std::path::Path;

use mw_core::CommandParser;
use tracing::{debug, info, warn};

use crate::actions::Flow;
use crate::audio;
use crate::config::SessionConfig;
use crate::display;
use crate::editor::Editor;
use crate::error::{CommandError, CommandResult};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Parsing,
    Dispatching,
    ParseError,
    Exited,
}

/// Outcome of one line, after any error has been reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Done,
    Failed,
    Exit,
}

pub struct Session<W: Write = Stdout> {
    editor: Editor,
    registry: &'static Registry,
    parser: CommandParser,
    state: SessionState,
    error_label: String,
    out: W,
}

impl Session<Stdout> {
    pub fn stdout(config: &SessionConfig) -> Self {
        Self::with_output(config, io::stdout())
    }
}

impl<W: Write> Session<W> {
    pub fn with_output(config: &SessionConfig, out: W) -> Self {
        Self {
            editor: Editor::new(config),
            registry: Registry::global(),
            parser: CommandParser::new(),
            state: SessionState::Idle,
            error_label: "Error:".to_string(),
            out,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_exited(&self) -> bool {
        self.state == SessionState::Exited
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn prompt(&self) -> String {
        display::prompt(&self.editor.stack)
    }

    /// Prefix for reported errors, `Error:` unless replaced
    pub fn set_error_label(&mut self, label: impl Into<String>) {
        self.error_label = label.into();
    }

    pub fn print_stack(&mut self) -> CommandResult<()> {
        writeln!(self.out, "{}", self.editor.display.render_stack(&self.editor.stack))?;
        Ok(())
    }

    /// Decode `path` and push it onto the stack
    pub fn load(&mut self, path: impl AsRef<Path>) -> CommandResult<()> {
        let path = path.as_ref();
        writeln!(self.out, "Reading audio file {}...", path.display())?;
        let segment = audio::decode_file(path)?;
        info!(path = %path.display(), ms = segment.len_ms(), "loaded clip");
        writeln!(self.out, "Pushing audio ({} ms) onto stack...", segment.len_ms())?;
        self.editor.stack.push(segment);
        Ok(())
    }

    /// Parse and run one line without reporting
    pub fn execute_line(&mut self, line: &str) -> CommandResult<Flow> {
        if self.is_exited() {
            return Ok(Flow::Exit);
        }

        self.state = SessionState::Parsing;
        let command = match self.parser.parse(line) {
            Ok(command) => command,
            Err(e) => {
                self.state = SessionState::ParseError;
                return Err(e.into());
            }
        };
        debug!(line, %command, "parsed");

        self.state = SessionState::Dispatching;
        self.registry
            .dispatch(&mut self.editor, &command, &mut self.out)
    }

    /// Run one line and report any failure to the output
    ///
    /// Never fails: every error returns the session to `Idle`.
    pub fn handle_line(&mut self, line: &str) -> LineOutcome {
        let result = self.execute_line(line);
        let outcome = match result {
            Ok(Flow::Continue) => LineOutcome::Done,
            Ok(Flow::Exit) => LineOutcome::Exit,
            Err(e) => {
                self.report(line, &e);
                LineOutcome::Failed
            }
        };
        self.state = match outcome {
            LineOutcome::Exit => SessionState::Exited,
            LineOutcome::Done | LineOutcome::Failed => SessionState::Idle,
        };
        outcome
    }

    /// Run newline-separated commands until the text ends or `q` is reached
    pub fn run_script(&mut self, script: &str) {
        for line in script.lines() {
            if self.handle_line(line) == LineOutcome::Exit {
                break;
            }
        }
    }

    fn report(&mut self, line: &str, error: &CommandError) {
        warn!(kind = ?error.kind(), %error, "command failed");
        let text = match error {
            CommandError::Parse(parse) => {
                format!(
                    "{} command could not be parsed.\n{}",
                    self.error_label,
                    parse.render(line)
                )
            }
            other => format!("{} {other}", self.error_label),
        };
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!(error = %e, "could not write report");
        }
    }
}
