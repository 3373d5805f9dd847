//! Editing state owned by one session

use mw_core::{resolve_bounds, Command, EffectiveBounds};

use crate::config::SessionConfig;
use crate::display::Display;
use crate::stack::Stack;

/// Everything an action may read or mutate
#[derive(Debug, Clone, PartialEq)]
pub struct Editor {
    pub stack: Stack,
    pub display: Display,
    /// Sample rate of clips created by `new`
    pub new_clip_rate: u32,
}

impl Editor {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            stack: Stack::new(),
            display: Display::new(config.display_width),
            new_clip_rate: config.sample_rate,
        }
    }

    /// Effective bounds of `command` on the top clip
    ///
    /// Explicit addresses are persisted on the top frame. With an empty
    /// stack both bounds are absent.
    pub fn resolve(&mut self, command: &Command) -> EffectiveBounds {
        match self.stack.top_mut() {
            Some(frame) => {
                let len = frame.len_ms();
                resolve_bounds(command, &mut frame.selection, len)
            }
            None => EffectiveBounds::default(),
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}
