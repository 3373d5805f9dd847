//! Parsed command record
//!
//! A command line is flat: an optional address pair, an optional action and
//! the action's arguments. Absence is meaningful everywhere, so every field
//! that the grammar may omit is an `Option` rather than a zero value.
//!
//! ```text
//! 100,101 a9 -x +10 "new file.wav"   # comment
//! ^^^ ^^^ ^^ ^^^^^^^^^^^^^^^^^^^^^
//! start end action   arguments
//! ```

use serde::{Deserialize, Serialize};

/// A single parsed command line
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Command {
    /// Leading address, as written (may be negative or past the clip end)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_address: Option<i64>,
    /// Address after the comma
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_address: Option<i64>,
    /// Action name, verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Arguments in input order, quotes stripped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
}

impl Command {
    /// True when the line carried nothing at all (blank or comment-only)
    pub fn is_empty(&self) -> bool {
        self.start_address.is_none()
            && self.end_address.is_none()
            && self.action.is_none()
            && self.arguments.is_empty()
    }

    /// True when the line only moves the selection
    pub fn is_address_only(&self) -> bool {
        self.action.is_none() && (self.start_address.is_some() || self.end_address.is_some())
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Render the command back to the line syntax
    ///
    /// Arguments containing whitespace are re-quoted. The result parses back
    /// to an equal command.
    pub fn to_line(&self) -> String {
        let mut line = String::new();
        if let Some(start) = self.start_address {
            line.push_str(&start.to_string());
        }
        if let Some(end) = self.end_address {
            line.push(',');
            line.push_str(&end.to_string());
        }
        if let Some(action) = &self.action {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(action);
            for arg in &self.arguments {
                line.push(' ');
                if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                    line.push('"');
                    line.push_str(arg);
                    line.push('"');
                } else {
                    line.push_str(arg);
                }
            }
        }
        line
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_line())
    }
}
