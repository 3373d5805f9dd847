//! Error types for the command language

use nom::error::{VerboseError, VerboseErrorKind};
use thiserror::Error;

/// A line that does not match the command grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at column {column}: {message}")]
pub struct ParseError {
    /// 1-based character column where parsing stopped making progress
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(column: usize, message: impl Into<String>) -> Self {
        Self {
            column,
            message: message.into(),
        }
    }

    /// Build from nom's verbose error, choosing the entry that got furthest
    pub(crate) fn from_verbose(line: &str, error: VerboseError<&str>) -> Self {
        let furthest = error
            .errors
            .iter()
            .min_by_key(|(remaining, _)| remaining.len());

        let Some((remaining, kind)) = furthest else {
            return Self::new(1, "command could not be parsed");
        };

        let consumed = &line[..line.len() - remaining.len()];
        let column = consumed.chars().count() + 1;

        let message = match kind {
            VerboseErrorKind::Context(ctx) => format!("expected {ctx}"),
            VerboseErrorKind::Char(c) => format!("expected '{c}'"),
            VerboseErrorKind::Nom(_) => match remaining.chars().next() {
                Some(c) => format!("unexpected '{c}'"),
                None => "unexpected end of line".to_string(),
            },
        };

        Self::new(column, message)
    }

    /// Render the source line with a caret under the failing column
    pub fn render(&self, line: &str) -> String {
        let pad = " ".repeat(self.column.saturating_sub(1));
        format!("{line}\n{pad}^ {}", self.message)
    }
}

/// A numeric argument that is neither `N`, `+N` nor `-N`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{token}\" is not a number")]
pub struct NumericTokenError {
    pub token: String,
}

impl NumericTokenError {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}
