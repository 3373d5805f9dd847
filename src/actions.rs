//! Action implementations
//!
//! Each action receives the editor, the command's effective bounds and its
//! bound arguments. Preconditions are checked before any mutation, so a
//! failing action leaves the editor as it was.

use std::io::Write;

use mw_core::{parse_numeric, EffectiveBounds, Millis, NumericTokenError};
use tracing::info;

use crate::audio::{self, AudioSegment};
use crate::display::{Display, MAX_WIDTH};
use crate::editor::Editor;
use crate::error::{CommandError, CommandResult};
use crate::registry::{Action, Arguments, Registry};
use crate::stack::Frame;

/// What the session does after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub fn execute<W: Write>(
    registry: &Registry,
    action: Action,
    editor: &mut Editor,
    bounds: EffectiveBounds,
    args: Arguments<'_>,
    out: &mut W,
) -> CommandResult<Flow> {
    match action {
        Action::Quit => return Ok(Flow::Exit),
        Action::Help => writeln!(out, "{}", registry.help_table())?,
        Action::Stack => show_stack(editor, out)?,
        Action::Show => show_head(editor, out)?,
        Action::View => writeln!(out, "{}", editor.display.render_view_info(&editor.stack))?,
        Action::Length => {
            let top = editor.stack.require_top()?;
            writeln!(out, "{} ms", top.len_ms())?;
        }

        // -- cursor and selection --
        Action::Cursor => {
            let top = editor.stack.require_top()?;
            let token = args.get(0).unwrap_or("0");
            let moved = parse_numeric(top.cursor() as i64, token)?;
            top.selection.cursor = clamp_to(moved, top.len_ms());
            show_head(editor, out)?;
        }
        Action::CursorBegin => {
            editor.stack.require_top()?.selection.cursor = 0;
            show_head(editor, out)?;
        }
        Action::CursorEnd => {
            let top = editor.stack.require_top()?;
            top.selection.cursor = top.len_ms();
            show_head(editor, out)?;
        }
        Action::SetIn => {
            let top = editor.stack.require_top()?;
            let at = point_from(top, top.in_point(), args.get(0))?;
            top.selection.in_point = Some(at);
            show_head(editor, out)?;
        }
        Action::SetOut => {
            let top = editor.stack.require_top()?;
            let at = point_from(top, top.out_point(), args.get(0))?;
            top.selection.out_point = Some(at);
            show_head(editor, out)?;
        }
        Action::ClearIn => {
            editor.stack.require_top()?.selection.in_point = None;
            show_head(editor, out)?;
        }
        Action::ClearOut => {
            editor.stack.require_top()?.selection.out_point = None;
            show_head(editor, out)?;
        }
        Action::SetWidth => {
            let width = parse_count(args.get(0).unwrap_or("80"))?;
            if width > MAX_WIDTH as u64 {
                return Err(CommandError::OutOfRange {
                    what: "display width",
                    value: width,
                    max: MAX_WIDTH as u64,
                });
            }
            editor.display = Display::new(width as usize);
            show_head(editor, out)?;
        }

        // -- stack --
        Action::New => {
            let length = parse_count(args.get(0).unwrap_or("1000"))?;
            let segment = AudioSegment::silent(length, editor.new_clip_rate, 1)?;
            editor.stack.push(segment);
            show_stack(editor, out)?;
        }
        Action::Dup => {
            let copy = editor.stack.require_top()?.segment.clone();
            editor.stack.push(copy);
            show_stack(editor, out)?;
        }
        Action::Pop => {
            editor.stack.pop()?;
            show_stack(editor, out)?;
        }
        Action::Swap => {
            editor.stack.swap()?;
            show_stack(editor, out)?;
        }
        Action::Roll => {
            let count = parse_numeric(0, args.get(0).unwrap_or("1"))?;
            editor.stack.roll(count)?;
            show_stack(editor, out)?;
        }
        Action::Append => {
            editor.stack.append()?;
            show_stack(editor, out)?;
        }
        Action::Prepend => {
            editor.stack.prepend()?;
            show_stack(editor, out)?;
        }
        Action::Bounce => {
            editor.stack.bounce()?;
            show_stack(editor, out)?;
        }

        // -- editing the top clip --
        Action::Crop => {
            let (start, end) = span(bounds)?;
            editor.stack.require_top()?.crop(start, end)?;
            show_head(editor, out)?;
        }
        Action::Split => {
            editor.stack.require_top()?;
            let (start, _) = span(bounds)?;
            editor.stack.split(start)?;
            show_stack(editor, out)?;
        }
        Action::Silence => {
            let top = editor.stack.require_top()?;
            let (start, end) = span(bounds)?;
            if start >= top.len_ms() {
                return Err(CommandError::invalid_selection(format!(
                    "insertion point {start} ms is past the end of the sound"
                )));
            }
            let segment = top.segment.insert_silence(start, end - start)?;
            top.replace_segment(segment);
            show_head(editor, out)?;
        }
        Action::Bloop => {
            let top = editor.stack.require_top()?;
            let (start, end) = span(bounds)?;
            let segment = top.segment.replace_with_silence(start, end - start);
            top.replace_segment(segment);
            show_head(editor, out)?;
        }
        Action::Loop => {
            let count = parse_count(args.get(0).unwrap_or("2"))?;
            if count == 0 {
                return Err(CommandError::invalid_selection("loop count must be at least 1"));
            }
            let top = editor.stack.require_top()?;
            let segment = top.segment.repeat(count)?;
            top.replace_segment(segment);
            show_head(editor, out)?;
        }
        Action::Normalize => {
            let token = args.get(0).unwrap_or("0.0");
            let level: f64 = token
                .parse()
                .map_err(|_| NumericTokenError::new(token))?;
            if !level.is_finite() {
                return Err(NumericTokenError::new(token).into());
            }
            let top = editor.stack.require_top()?;
            let (start, end) = span(bounds)?;
            let segment = top.segment.normalize_range(start, end, level)?;
            top.replace_segment(segment);
            show_head(editor, out)?;
        }
        Action::FadeIn => {
            let top = editor.stack.require_top()?;
            let (start, _) = span(bounds)?;
            let segment = top.segment.fade_in(start);
            top.replace_segment(segment);
            show_head(editor, out)?;
        }
        Action::FadeOut => {
            let top = editor.stack.require_top()?;
            let (_, end) = span(bounds)?;
            let segment = top.segment.fade_out(top.len_ms() - end);
            top.replace_segment(segment);
            show_head(editor, out)?;
        }

        // -- output --
        Action::Play => {
            let top = editor.stack.require_top()?;
            audio::play(&top.segment)?;
        }
        Action::Export => {
            let name = args.get(0).unwrap_or("out.wav");
            let top = editor.stack.require_top()?;
            audio::write_wav(&top.segment, name)?;
            info!(name, "export complete");
            writeln!(out, "Exported {} ms to {}", top.len_ms(), name)?;
        }
    }
    Ok(Flow::Continue)
}

fn show_stack<W: Write>(editor: &Editor, out: &mut W) -> CommandResult<()> {
    writeln!(out, "{}", editor.display.render_stack(&editor.stack))?;
    Ok(())
}

fn show_head<W: Write>(editor: &Editor, out: &mut W) -> CommandResult<()> {
    writeln!(out, "{}", editor.display.render_head(&editor.stack))?;
    Ok(())
}

fn span(bounds: EffectiveBounds) -> CommandResult<(Millis, Millis)> {
    bounds.span().ok_or(CommandError::StackEmpty)
}

fn clamp_to(value: i64, len: Millis) -> Millis {
    (value.max(0) as u64).min(len)
}

/// New in/out point: the cursor when no token is given, otherwise the token
/// applied to the current point (or 0)
fn point_from(frame: &Frame, current: Option<Millis>, token: Option<&str>) -> CommandResult<Millis> {
    let Some(token) = token else {
        return Ok(frame.cursor());
    };
    let moved = parse_numeric(current.unwrap_or(0) as i64, token)?;
    Ok(clamp_to(moved, frame.len_ms()))
}

/// A plain non-negative integer
fn parse_count(token: &str) -> Result<u64, NumericTokenError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NumericTokenError::new(token));
    }
    token.parse().map_err(|_| NumericTokenError::new(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1000"), Ok(1000));
        assert!(parse_count("+3").is_err());
        assert!(parse_count("-3").is_err());
        assert!(parse_count("").is_err());
        assert!(parse_count("1e3").is_err());
    }

    #[test]
    fn test_clamp_to() {
        assert_eq!(clamp_to(-5, 100), 0);
        assert_eq!(clamp_to(50, 100), 50);
        assert_eq!(clamp_to(500, 100), 100);
    }
}
