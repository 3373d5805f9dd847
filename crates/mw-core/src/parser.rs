//! Command line parser
//!
//! Grammar (whitespace-separated, one command per line):
//!
//! ```text
//! command  := start? ("," end)? (ws? action arglist)? (ws? "#" comment)?
//! arglist  := (ws argument)*
//! argument := '"' literal '"' | bareword
//! action   := letter (letter | digit | "-")*
//! start    := "-"? digit+
//! end      := "-"? digit+
//! ```
//!
//! The grammar is ordered choice: a quoted argument is tried first, and an
//! unterminated quote falls back to being read as a bareword. Quoted literals
//! cannot contain `"` or `#`; there is no escape mechanism.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize, rest},
    error::{context, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use tracing::trace;

use crate::ast::Command;
use crate::error::ParseError;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

// ============================================================================
// Public API
// ============================================================================

/// Parse one command line
///
/// An empty or comment-only line yields an empty [`Command`].
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    match all_consuming(command)(line) {
        Ok((_, cmd)) => {
            trace!(line, ?cmd, "parsed command");
            Ok(cmd)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(ParseError::from_verbose(line, e))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new(
            line.chars().count() + 1,
            "incomplete input",
        )),
    }
}

/// The command grammar as a shareable, immutable value
///
/// Holds no state; a session constructs one at startup and reuses it for
/// every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, line: &str) -> Result<Command, ParseError> {
        parse_command(line)
    }
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn command(input: &str) -> Res<'_, Command> {
    let (input, start_address) = opt(address)(input)?;
    let (input, end_address) = opt(preceded(char(','), context("address", address)))(input)?;
    let (input, imperative) = opt(preceded(ws0, pair(action, arglist)))(input)?;
    let (input, _) = opt(preceded(ws0, comment))(input)?;
    let (input, _) = ws0(input)?;

    let (action, arguments) = match imperative {
        Some((action, arguments)) => (Some(action.to_string()), arguments),
        None => (None, Vec::new()),
    };

    Ok((
        input,
        Command {
            start_address,
            end_address,
            action,
            arguments,
        },
    ))
}

fn address(input: &str) -> Res<'_, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i64>)(input)
}

fn action(input: &str) -> Res<'_, &str> {
    context(
        "action",
        recognize(pair(
            satisfy(|c| c.is_ascii_alphabetic()),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '-'),
        )),
    )(input)
}

fn arglist(input: &str) -> Res<'_, Vec<String>> {
    many0(preceded(ws1, argument))(input)
}

fn argument(input: &str) -> Res<'_, String> {
    alt((quoted, map(bareword, str::to_string)))(input)
}

fn quoted(input: &str) -> Res<'_, String> {
    map(
        delimited(
            char('"'),
            take_while(|c: char| c != '"' && c != '#'),
            char('"'),
        ),
        str::to_string,
    )(input)
}

fn bareword(input: &str) -> Res<'_, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != '#')(input)
}

fn comment(input: &str) -> Res<'_, &str> {
    map(tuple((char('#'), rest)), |(_, text)| text)(input)
}

fn ws0(input: &str) -> Res<'_, &str> {
    take_while(char::is_whitespace)(input)
}

fn ws1(input: &str) -> Res<'_, &str> {
    take_while1(char::is_whitespace)(input)
}
