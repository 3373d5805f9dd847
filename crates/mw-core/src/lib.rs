//! mw-core: the command language of the mw audio shell
//!
//! This crate contains the pure command logic with NO audio dependencies:
//! - `Command` - the flat record a line parses into
//! - Nom-based line grammar
//! - Address normalization and selection resolution
//! - Relative/absolute numeric token rules
//!
//! The editing stack and the registered actions live in the `mw` crate.

pub mod address;
pub mod ast;
pub mod error;
pub mod parser;

pub use address::{normalize, parse_numeric, resolve_bounds, EffectiveBounds, Millis, Selection};
pub use ast::Command;
pub use error::{NumericTokenError, ParseError};
pub use parser::{parse_command, CommandParser};
