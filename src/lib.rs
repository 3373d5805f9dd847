//! mw: a stack-based audio editing shell
//!
//! Clips live on a stack; one-line commands select ranges by millisecond
//! address and edit, combine or export the top clip.
//!
//! - `mw_core` parses lines into `Command`s and resolves addresses
//! - `registry` maps action names to implementations and checks arity
//! - `session` drives parse → dispatch → report for each line
//! - `audio` decodes, edits, plays and writes clips

pub mod actions;
pub mod audio;
pub mod config;
pub mod display;
pub mod editor;
pub mod error;
pub mod registry;
pub mod session;
pub mod stack;

pub use actions::Flow;
pub use audio::AudioSegment;
pub use config::SessionConfig;
pub use display::prompt;
pub use editor::Editor;
pub use error::{CommandError, CommandResult, ErrorKind};
pub use registry::{completion_target, Action, ActionSpec, Registry};
pub use session::{LineOutcome, Session, SessionState};
pub use stack::{Frame, Stack};
