//! Text rendering of the stack, the top clip and the prompt
//!
//! Every function returns a `String`; the session decides where it goes.

use mw_core::Millis;

use crate::stack::{Frame, Stack};

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const STACK_ROWS: usize = 3;
const HEAD_HEIGHT: usize = 4;

pub const DEFAULT_WIDTH: usize = 80;
pub const MIN_WIDTH: usize = 10;
pub const MAX_WIDTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Display {
    pub width: usize,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
        }
    }
}

impl Display {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.clamp(MIN_WIDTH, MAX_WIDTH),
        }
    }

    fn waveform_width(&self) -> usize {
        self.width.saturating_sub(5).max(1)
    }

    /// The top few frames, newest first, scaled against the longest clip
    pub fn render_stack(&self, stack: &Stack) -> String {
        if stack.is_empty() {
            return "Stack empty".to_string();
        }
        let total = stack.total_length().max(1);
        let max_cols = self.waveform_width();
        let mut lines: Vec<String> = stack
            .frames()
            .iter()
            .rev()
            .take(STACK_ROWS)
            .enumerate()
            .map(|(i, frame)| {
                let cols = ((frame.len_ms() * max_cols as u64) / total).max(1) as usize;
                let wave = waveform_row(&frame.segment.peaks(cols));
                format!(
                    "{wave:<max_cols$} {i:02}  {} ms, {} Hz, {} ch",
                    frame.len_ms(),
                    frame.segment.sample_rate(),
                    frame.segment.channels()
                )
            })
            .collect();
        if stack.len() > STACK_ROWS {
            lines.push(format!("... {} more", stack.len() - STACK_ROWS));
        }
        lines.push(format!(
            "Session length {} sec",
            stack.total_length() as f64 / 1000.0
        ));
        lines.join("\n")
    }

    /// The top frame as a tall waveform with its selection ruler
    pub fn render_head(&self, stack: &Stack) -> String {
        let Some(frame) = stack.top() else {
            return "Stack empty".to_string();
        };
        let cols = self.waveform_width();
        let peaks = frame.segment.peaks(cols);
        let mut lines = waveform_rows(&peaks, HEAD_HEIGHT);
        lines.push(self.ruler(frame));
        lines.join("\n")
    }

    /// `[`, `]` and `^` markers for in, out and cursor
    pub fn ruler(&self, frame: &Frame) -> String {
        let cols = self.waveform_width();
        let len = frame.len_ms();
        let col = |ms: Millis| -> usize {
            if len == 0 {
                0
            } else {
                ((ms.min(len) * (cols as u64 - 1)) / len) as usize
            }
        };

        let mut slug = vec![' '; cols];
        let in_col = frame.in_point().map(col);
        let out_col = frame.out_point().map(col);
        if let (Some(a), Some(b)) = (in_col, out_col) {
            for c in slug.iter_mut().take(b.max(a)).skip(a.min(b) + 1) {
                *c = '─';
            }
        }
        if let Some(a) = in_col {
            slug[a] = '[';
        }
        if let Some(b) = out_col {
            slug[b] = ']';
        }
        slug[col(frame.cursor())] = '^';
        slug.into_iter().collect::<String>().trim_end().to_string()
    }

    pub fn render_view_info(&self, stack: &Stack) -> String {
        let len = stack.top().map(Frame::len_ms).unwrap_or(0);
        format!(
            "Display width: {} cols\nView: 0 - {} ms\nms/col: {}",
            self.width,
            len,
            len / self.waveform_width() as u64
        )
    }
}

/// Prompt text: `<cursor>ms [<in>→<out>]> `, or `- > ` with no clip
pub fn prompt(stack: &Stack) -> String {
    let Some(top) = stack.top() else {
        return "- > ".to_string();
    };
    let mut selection = Vec::new();
    if let Some(in_point) = top.in_point() {
        selection.push(format!("[{in_point}"));
    }
    if let Some(out_point) = top.out_point() {
        selection.push(format!("{out_point}]"));
    }
    if selection.is_empty() {
        format!("{}ms > ", top.cursor())
    } else {
        format!("{}ms {}> ", top.cursor(), selection.join("→"))
    }
}

fn level_index(level: f32) -> usize {
    ((level.clamp(0.0, 1.0) * (BLOCKS.len() - 1) as f32).round()) as usize
}

fn waveform_row(peaks: &[f32]) -> String {
    peaks.iter().map(|p| BLOCKS[level_index(*p)]).collect()
}

fn waveform_rows(peaks: &[f32], height: usize) -> Vec<String> {
    (0..height)
        .rev()
        .map(|row| {
            peaks
                .iter()
                .map(|p| {
                    let fill = p.clamp(0.0, 1.0) * height as f32 - row as f32;
                    if fill >= 1.0 {
                        '█'
                    } else if fill > 0.0 {
                        BLOCKS[level_index(fill)]
                    } else {
                        ' '
                    }
                })
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}
