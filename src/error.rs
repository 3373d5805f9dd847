//! Error handling for the mw shell
//!
//! Every failure a command line can produce is a [`CommandError`]. The
//! session renders it and returns to the prompt; nothing here terminates the
//! process.

use thiserror::Error;

use mw_core::{NumericTokenError, ParseError};

use crate::audio::AudioError;

/// Failure of one command line
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("action {0} is not recognized")]
    UnknownAction(String),

    #[error("action {action} called with incorrect argument count: expected {expected}, found {found}")]
    Arity {
        action: String,
        expected: String,
        found: usize,
    },

    #[error("parse error: {0}")]
    InvalidNumber(#[from] NumericTokenError),

    #[error("{what} {value} is out of range (at most {max})")]
    OutOfRange {
        what: &'static str,
        value: u64,
        max: u64,
    },

    #[error("stack empty")]
    StackEmpty,

    #[error("{action} needs {needed} sounds on the stack, found {found}")]
    NotEnoughClips {
        action: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    pub fn invalid_selection(message: impl Into<String>) -> Self {
        CommandError::InvalidSelection(message.into())
    }

    /// Broad category, for logging
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Parse(_) => ErrorKind::Parse,
            CommandError::UnknownAction(_) => ErrorKind::UnknownAction,
            CommandError::Arity { .. } => ErrorKind::Arity,
            CommandError::InvalidNumber(_) | CommandError::OutOfRange { .. } => {
                ErrorKind::InvalidNumber
            }
            CommandError::StackEmpty
            | CommandError::NotEnoughClips { .. }
            | CommandError::InvalidSelection(_) => ErrorKind::State,
            CommandError::Audio(_) | CommandError::Io(_) => ErrorKind::Io,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    UnknownAction,
    Arity,
    InvalidNumber,
    State,
    Io,
}

pub type CommandResult<T> = Result<T, CommandError>;
