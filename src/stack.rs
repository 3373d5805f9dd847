//! The editing stack
//!
//! An ordered sequence of clip frames; the last frame is the top and is the
//! clip every addressed command works on. Each frame carries its own cursor
//! and selection.

use mw_core::{Millis, Selection};
use tracing::debug;

use crate::audio::AudioSegment;
use crate::error::{CommandError, CommandResult};

/// One clip on the stack with its cursor and selection
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub segment: AudioSegment,
    pub selection: Selection,
}

impl Frame {
    pub fn new(segment: AudioSegment) -> Self {
        Self {
            segment,
            selection: Selection::default(),
        }
    }

    pub fn len_ms(&self) -> Millis {
        self.segment.len_ms()
    }

    pub fn cursor(&self) -> Millis {
        self.selection.cursor
    }

    pub fn in_point(&self) -> Option<Millis> {
        self.selection.in_point
    }

    pub fn out_point(&self) -> Option<Millis> {
        self.selection.out_point
    }

    /// Replace the audio, clamping cursor and points to the new length
    pub fn replace_segment(&mut self, segment: AudioSegment) {
        self.segment = segment;
        let len = self.len_ms();
        let sel = &mut self.selection;
        sel.cursor = sel.cursor.min(len);
        sel.in_point = sel.in_point.map(|p| p.min(len));
        sel.out_point = sel.out_point.map(|p| p.min(len));
    }

    /// Keep only `[start, end)` and reset the selection
    pub fn crop(&mut self, start: Millis, end: Millis) -> CommandResult<()> {
        if end <= start {
            return Err(CommandError::invalid_selection(format!(
                "crop end ({end} ms) must be after crop start ({start} ms)"
            )));
        }
        self.segment = self.segment.slice(start, end);
        self.selection.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: AudioSegment) {
        debug!(ms = segment.len_ms(), depth = self.frames.len() + 1, "push");
        self.frames.push(Frame::new(segment));
    }

    pub fn pop(&mut self) -> CommandResult<Frame> {
        self.frames.pop().ok_or(CommandError::StackEmpty)
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Top frame or `StackEmpty`
    pub fn require_top(&mut self) -> CommandResult<&mut Frame> {
        self.frames.last_mut().ok_or(CommandError::StackEmpty)
    }

    /// Frames bottom to top
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn require(&self, action: &'static str, needed: usize) -> CommandResult<()> {
        if self.frames.len() < needed {
            return Err(CommandError::NotEnoughClips {
                action,
                needed,
                found: self.frames.len(),
            });
        }
        Ok(())
    }

    /// Longest clip on the stack
    pub fn total_length(&self) -> Millis {
        self.frames.iter().map(Frame::len_ms).max().unwrap_or(0)
    }

    pub fn swap(&mut self) -> CommandResult<()> {
        self.require("swap", 2)?;
        let n = self.frames.len();
        self.frames.swap(n - 1, n - 2);
        Ok(())
    }

    /// Rotate so the top frame moves to the bottom `count` times
    ///
    /// Negative counts rotate the other way.
    pub fn roll(&mut self, count: i64) -> CommandResult<()> {
        if self.frames.is_empty() {
            return Err(CommandError::StackEmpty);
        }
        let len = self.frames.len() as i64;
        let k = count.rem_euclid(len) as usize;
        self.frames.rotate_right(k);
        Ok(())
    }

    /// Replace the top frame with its halves `[0, at)` and `[at, end)`
    pub fn split(&mut self, at: Millis) -> CommandResult<()> {
        let top = self.pop()?;
        let len = top.len_ms();
        self.push(top.segment.slice(0, at));
        self.push(top.segment.slice(at, len));
        Ok(())
    }

    /// The top two segments, top first
    fn top_two(&self) -> (&AudioSegment, &AudioSegment) {
        let n = self.frames.len();
        (&self.frames[n - 1].segment, &self.frames[n - 2].segment)
    }

    /// Replace the top two frames with one, leaving them in place on error
    fn combine_top_two(
        &mut self,
        action: &'static str,
        combine: impl FnOnce(&AudioSegment, &AudioSegment) -> CommandResult<AudioSegment>,
    ) -> CommandResult<()> {
        self.require(action, 2)?;
        let (top, below) = self.top_two();
        let combined = combine(top, below)?;
        self.frames.truncate(self.frames.len() - 2);
        self.push(combined);
        Ok(())
    }

    /// Replace the top two frames with `below + top`
    pub fn append(&mut self) -> CommandResult<()> {
        self.combine_top_two("append", |top, below| Ok(below.concat(top)?))
    }

    /// Replace the top two frames with `top + below`
    pub fn prepend(&mut self) -> CommandResult<()> {
        self.combine_top_two("prepend", |top, below| Ok(top.concat(below)?))
    }

    /// Mix the top two frames; the longer clip sets the length and format
    pub fn bounce(&mut self) -> CommandResult<()> {
        self.combine_top_two("bounce", |top, below| {
            let (a, b) = if top.len_ms() < below.len_ms() {
                (below, top)
            } else {
                (top, below)
            };
            Ok(a.overlay(b)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn clip(ms: Millis) -> AudioSegment {
        AudioSegment::silent(ms, 1000, 1).unwrap()
    }

    fn lengths(stack: &Stack) -> Vec<Millis> {
        stack.frames().iter().map(Frame::len_ms).collect()
    }

    fn stack_of(lens: &[Millis]) -> Stack {
        let mut stack = Stack::new();
        for ms in lens {
            stack.push(clip(*ms));
        }
        stack
    }

    #[test]
    fn test_push_pop() {
        let mut stack = stack_of(&[10, 20]);
        assert_eq!(stack.top().unwrap().len_ms(), 20);
        assert_eq!(stack.pop().unwrap().len_ms(), 20);
        assert_eq!(stack.pop().unwrap().len_ms(), 10);
        assert!(matches!(stack.pop(), Err(CommandError::StackEmpty)));
    }

    #[test]
    fn test_swap_needs_two() {
        let mut stack = stack_of(&[10]);
        assert!(matches!(
            stack.swap(),
            Err(CommandError::NotEnoughClips { needed: 2, found: 1, .. })
        ));
        stack.push(clip(20));
        stack.swap().unwrap();
        assert_eq!(lengths(&stack), vec![20, 10]);
    }

    #[test]
    fn test_roll() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.roll(1).unwrap();
        assert_eq!(lengths(&stack), vec![3, 1, 2]);
        stack.roll(-1).unwrap();
        assert_eq!(lengths(&stack), vec![1, 2, 3]);
        stack.roll(5).unwrap();
        assert_eq!(lengths(&stack), vec![2, 3, 1]);
        assert!(Stack::new().roll(1).is_err());
    }

    #[test]
    fn test_split() {
        let mut stack = stack_of(&[100]);
        stack.split(30).unwrap();
        assert_eq!(lengths(&stack), vec![30, 70]);
    }

    #[test]
    fn test_append_prepend() {
        let mut stack = stack_of(&[10, 20]);
        stack.append().unwrap();
        assert_eq!(lengths(&stack), vec![30]);

        let tone = AudioSegment::new(1000, 1, vec![1.0; 5]).unwrap();
        let mut stack = stack_of(&[10]);
        stack.push(tone);
        stack.prepend().unwrap();
        let top = &stack.top().unwrap().segment;
        assert_eq!(top.len_ms(), 15);
        assert_eq!(top.samples()[0], 1.0);
        assert_eq!(top.samples()[14], 0.0);
    }

    #[test]
    fn test_bounce_keeps_longest() {
        let mut stack = stack_of(&[50, 80]);
        stack.bounce().unwrap();
        assert_eq!(lengths(&stack), vec![80]);
        let mut stack = stack_of(&[80, 50]);
        stack.bounce().unwrap();
        assert_eq!(lengths(&stack), vec![80]);
    }

    #[test]
    fn test_crop_resets_selection() {
        let mut frame = Frame::new(clip(100));
        frame.selection.cursor = 40;
        frame.selection.in_point = Some(20);
        frame.crop(20, 60).unwrap();
        assert_eq!(frame.len_ms(), 40);
        assert_eq!(frame.selection, Selection::default());
        assert!(frame.crop(10, 10).is_err());
    }

    #[test]
    fn test_replace_segment_clamps_selection() {
        let mut frame = Frame::new(clip(100));
        frame.selection.cursor = 90;
        frame.selection.out_point = Some(95);
        frame.replace_segment(clip(50));
        assert_eq!(frame.cursor(), 50);
        assert_eq!(frame.out_point(), Some(50));
    }

    #[test]
    fn test_total_length() {
        assert_eq!(stack_of(&[10, 300, 20]).total_length(), 300);
        assert_eq!(Stack::new().total_length(), 0);
    }

    #[test]
    fn test_failed_combine_keeps_both_clips() {
        // 1000 frames at 1 Hz would need 4e12 frames at u32::MAX Hz
        let mut stack = Stack::new();
        stack.push(AudioSegment::new(u32::MAX, 1, vec![]).unwrap());
        stack.push(AudioSegment::new(1, 1, vec![0.0; 1000]).unwrap());
        let before = stack.clone();

        assert!(matches!(stack.append(), Err(CommandError::Audio(_))));
        assert_eq!(stack, before);
        stack.swap().unwrap();
        assert!(matches!(stack.prepend(), Err(CommandError::Audio(_))));
        assert_eq!(stack.len(), 2);
    }

    proptest! {
        #[test]
        fn roll_then_unroll_is_identity(
            lens in prop::collection::vec(0u64..50, 1..8),
            count in -1000i64..1000,
        ) {
            let mut stack = stack_of(&lens);
            let before = lengths(&stack);
            stack.roll(count).unwrap();
            prop_assert_eq!(stack.len(), before.len());
            stack.roll(-count).unwrap();
            prop_assert_eq!(lengths(&stack), before);
        }
    }
}
