//! Session configuration
//!
//! The binary fills this from its command line, which also reads the
//! `MW_*` environment variables; tests build it directly.

use std::path::PathBuf;

use crate::display::DEFAULT_WIDTH;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Columns available to the text display
    pub display_width: usize,
    /// Sample rate for clips synthesised by `new`
    pub sample_rate: u32,
    /// Line-editor history file
    pub history: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_width: DEFAULT_WIDTH,
            sample_rate: DEFAULT_SAMPLE_RATE,
            history: None,
        }
    }
}
