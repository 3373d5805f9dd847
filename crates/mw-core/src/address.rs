//! Address arithmetic
//!
//! Addresses are millisecond offsets into the active clip. A negative
//! address counts back from the end of the clip and every address is clamped
//! into `[0, clip_length]`.
//!
//! ```text
//! normalize(r, L) = r               if 0 <= r <= L
//!                 = L               if r > L
//!                 = max(L - |r|, 0) if r < 0
//! ```

use serde::{Deserialize, Serialize};

use crate::ast::Command;
use crate::error::NumericTokenError;

/// Milliseconds on a clip's timeline
pub type Millis = u64;

/// Resolve a raw user address against a clip length
pub fn normalize(raw: i64, clip_length: Millis) -> Millis {
    if raw < 0 {
        clip_length.saturating_sub(raw.unsigned_abs())
    } else {
        (raw as u64).min(clip_length)
    }
}

/// Apply a free-form numeric token to `base`
///
/// `+N`/`-N` nudge `base` by a signed delta, bare `N` replaces it. Anything
/// else is an error and the caller keeps `base`.
pub fn parse_numeric(base: i64, token: &str) -> Result<i64, NumericTokenError> {
    let invalid = || NumericTokenError::new(token);

    if let Some(sign) = token.chars().next().filter(|c| *c == '+' || *c == '-') {
        let digits = &token[1..];
        if !is_digits(digits) {
            return Err(invalid());
        }
        let delta: i64 = digits.parse().map_err(|_| invalid())?;
        let delta = if sign == '-' { -delta } else { delta };
        base.checked_add(delta).ok_or_else(invalid)
    } else if is_digits(token) {
        token.parse().map_err(|_| invalid())
    } else {
        Err(invalid())
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Cursor and selection state of one clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub cursor: Millis,
    pub in_point: Option<Millis>,
    pub out_point: Option<Millis>,
}

impl Selection {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The `(in, out)` pair handed to an operation for one command
///
/// Never persisted. When both ends are known `effective_in <= effective_out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectiveBounds {
    pub effective_in: Option<Millis>,
    pub effective_out: Option<Millis>,
}

impl EffectiveBounds {
    /// Both ends, or `None` when there was no clip to resolve against
    pub fn span(&self) -> Option<(Millis, Millis)> {
        Some((self.effective_in?, self.effective_out?))
    }

    /// Length of the resolved selection
    pub fn duration(&self) -> Option<Millis> {
        self.span().map(|(start, end)| end - start)
    }
}

/// Resolve a command's addresses against the active clip
///
/// Explicit addresses are normalized and written back to `selection`;
/// omitted ones are read from it without modification (`in` falls back to
/// the clip start, `out` to the clip end). The result is swap-corrected.
pub fn resolve_bounds(
    command: &Command,
    selection: &mut Selection,
    clip_length: Millis,
) -> EffectiveBounds {
    let effective_in = match command.start_address {
        Some(raw) => {
            let at = normalize(raw, clip_length);
            selection.in_point = Some(at);
            at
        }
        None => selection.in_point.unwrap_or(0).min(clip_length),
    };

    let effective_out = match command.end_address {
        Some(raw) => {
            let at = normalize(raw, clip_length);
            selection.out_point = Some(at);
            at
        }
        None => selection.out_point.unwrap_or(clip_length).min(clip_length),
    };

    let (effective_in, effective_out) = if effective_out < effective_in {
        (effective_out, effective_in)
    } else {
        (effective_in, effective_out)
    };

    EffectiveBounds {
        effective_in: Some(effective_in),
        effective_out: Some(effective_out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn cmd(start: Option<i64>, end: Option<i64>) -> Command {
        Command {
            start_address: start,
            end_address: end,
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize(0, 1000), 0);
        assert_eq!(normalize(1000, 1000), 1000);
        assert_eq!(normalize(1500, 1000), 1000);
        assert_eq!(normalize(-200, 1000), 800);
        assert_eq!(normalize(-2000, 1000), 0);
        assert_eq!(normalize(-1, 0), 0);
        assert_eq!(normalize(i64::MIN, 10), 0);
    }

    #[test]
    fn test_parse_numeric_rules() {
        assert_eq!(parse_numeric(100, "+25"), Ok(125));
        assert_eq!(parse_numeric(100, "-25"), Ok(75));
        assert_eq!(parse_numeric(100, "40"), Ok(40));
        assert_eq!(parse_numeric(0, "-5"), Ok(-5));
    }

    #[test]
    fn test_parse_numeric_rejects_other_tokens() {
        for token in ["", "+", "-", "1.5", "+1x", "abc", "--3", "+-3", " 4", "٣"] {
            assert_eq!(
                parse_numeric(7, token),
                Err(NumericTokenError::new(token)),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_parse_numeric_overflow_is_error() {
        assert!(parse_numeric(i64::MAX, "+1").is_err());
        assert!(parse_numeric(0, "99999999999999999999").is_err());
    }

    #[test]
    fn test_explicit_start_persists() {
        let mut sel = Selection::default();
        let bounds = resolve_bounds(&cmd(Some(250), None), &mut sel, 1000);
        assert_eq!(sel.in_point, Some(250));
        assert_eq!(sel.out_point, None);
        assert_eq!(bounds.span(), Some((250, 1000)));
    }

    #[test]
    fn test_omitted_addresses_are_transient() {
        let mut sel = Selection {
            cursor: 5,
            in_point: Some(100),
            out_point: None,
        };
        let before = sel;
        let bounds = resolve_bounds(&Command::default(), &mut sel, 400);
        assert_eq!(sel, before);
        assert_eq!(bounds.span(), Some((100, 400)));
    }

    #[test]
    fn test_negative_end_counts_from_clip_end() {
        let mut sel = Selection::default();
        let bounds = resolve_bounds(&cmd(None, Some(-100)), &mut sel, 1000);
        assert_eq!(sel.out_point, Some(900));
        assert_eq!(bounds.span(), Some((0, 900)));
    }

    #[test]
    fn test_inverted_selection_is_swapped() {
        let mut sel = Selection::default();
        let bounds = resolve_bounds(&cmd(Some(800), Some(200)), &mut sel, 1000);
        assert_eq!(
            bounds,
            EffectiveBounds {
                effective_in: Some(200),
                effective_out: Some(800),
            }
        );
        // persisted points keep what the user wrote
        assert_eq!(sel.in_point, Some(800));
        assert_eq!(sel.out_point, Some(200));
    }

    #[test]
    fn test_stale_points_are_clamped_after_clip_shrinks() {
        let mut sel = Selection {
            cursor: 0,
            in_point: Some(900),
            out_point: Some(950),
        };
        let bounds = resolve_bounds(&Command::default(), &mut sel, 500);
        assert_eq!(bounds.span(), Some((500, 500)));
        assert_eq!(bounds.duration(), Some(0));
    }

    proptest! {
        #[test]
        fn normalize_stays_in_range(raw in any::<i64>(), len in 0u64..10_000_000) {
            let n = normalize(raw, len);
            prop_assert!(n <= len);
        }

        #[test]
        fn normalize_is_identity_in_range(len in 0u64..10_000_000, frac in 0.0f64..=1.0) {
            let raw = (len as f64 * frac) as u64;
            prop_assert_eq!(normalize(raw as i64, len), raw);
        }

        #[test]
        fn normalize_negative_counts_from_end(k in 0i64..20_000_000, len in 0u64..10_000_000) {
            prop_assert_eq!(normalize(-k, len), len.saturating_sub(k as u64));
        }

        #[test]
        fn normalize_past_end_clamps(len in 0u64..10_000_000, extra in 1u64..1_000_000) {
            prop_assert_eq!(normalize((len + extra) as i64, len), len);
        }

        #[test]
        fn resolved_bounds_are_ordered_and_in_range(
            start in proptest::option::of(any::<i64>()),
            end in proptest::option::of(any::<i64>()),
            len in 0u64..100_000,
        ) {
            let mut sel = Selection::default();
            let bounds = resolve_bounds(&cmd(start, end), &mut sel, len);
            let (lo, hi) = bounds.span().unwrap();
            prop_assert!(lo <= hi);
            prop_assert!(hi <= len);
        }
    }
}
