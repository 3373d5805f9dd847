//! Action registry and dispatcher
//!
//! A closed table mapping action names to [`Action`] variants, with the
//! parameter names and one-line description used for help and arity checks.
//! The table is static; nothing registers actions at runtime.
//!
//! # Dispatch
//!
//! ```text
//! Command ─► no action?        ─► resolve addresses, done
//!         ─► unknown name?     ─► UnknownAction   (no mutation)
//!         ─► bad arg count?    ─► Arity           (no mutation)
//!         ─► resolve addresses ─► actions::execute(action, bounds, args)
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::sync::OnceLock;

use mw_core::Command;
use tracing::debug;

use crate::actions::{self, Flow};
use crate::editor::Editor;
use crate::error::{CommandError, CommandResult};

// =============================================================================
// TYPES
// =============================================================================

/// Every operation the shell knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    Help,
    Stack,
    Show,
    View,
    Length,
    Cursor,
    CursorBegin,
    CursorEnd,
    SetIn,
    SetOut,
    ClearIn,
    ClearOut,
    SetWidth,
    New,
    Dup,
    Pop,
    Swap,
    Roll,
    Crop,
    Split,
    Silence,
    Bloop,
    Append,
    Prepend,
    Bounce,
    Loop,
    Normalize,
    FadeIn,
    FadeOut,
    Play,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    /// May be omitted; the action substitutes its own behaviour
    Optional,
    /// May be omitted; this literal is used instead
    Default(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl Param {
    const fn optional(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Optional,
        }
    }

    const fn with_default(name: &'static str, default: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Default(default),
        }
    }
}

/// One registry row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub params: &'static [Param],
    pub description: &'static str,
    pub action: Action,
}

impl ActionSpec {
    pub fn min_args(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Required)
            .count()
    }

    pub fn max_args(&self) -> usize {
        self.params.len()
    }

    pub fn accepts(&self, count: usize) -> bool {
        (self.min_args()..=self.max_args()).contains(&count)
    }

    fn expected_args(&self) -> String {
        let (min, max) = (self.min_args(), self.max_args());
        if min == max {
            min.to_string()
        } else {
            format!("{min} to {max}")
        }
    }

    /// `name [p1,p2]`
    pub fn signature(&self) -> String {
        if self.params.is_empty() {
            self.name.to_string()
        } else {
            let names: Vec<&str> = self.params.iter().map(|p| p.name).collect();
            format!("{} [{}]", self.name, names.join(","))
        }
    }
}

/// Arguments bound to an action's parameters
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    spec: &'static ActionSpec,
    values: &'a [String],
}

impl<'a> Arguments<'a> {
    /// Value at position `index`, falling back to the declared default
    pub fn get(&self, index: usize) -> Option<&'a str> {
        if let Some(value) = self.values.get(index) {
            return Some(value.as_str());
        }
        match self.spec.params.get(index)?.kind {
            ParamKind::Default(default) => Some(default),
            ParamKind::Required | ParamKind::Optional => None,
        }
    }
}

// =============================================================================
// TABLE
// =============================================================================

macro_rules! spec {
    ($name:literal, $action:ident, [$($param:expr),* $(,)?], $desc:literal) => {
        ActionSpec {
            name: $name,
            params: &[$($param),*],
            description: $desc,
            action: Action::$action,
        }
    };
}

const BUILTIN_ACTIONS: &[ActionSpec] = &[
    spec!("q", Quit, [], "Exit the program"),
    spec!("help", Help, [], "Print help"),
    spec!("stack", Stack, [], "Print the stack"),
    spec!("show", Show, [], "Show the current sound"),
    spec!("view", View, [], "Show display and view settings"),
    spec!("length", Length, [], "Print the length of the top sound"),
    spec!("cm", Cursor, [Param::with_default("pos", "0")], "Set/nudge cursor position in millis"),
    spec!("cmills", Cursor, [Param::with_default("pos", "0")], "Same as cm"),
    spec!("cbegin", CursorBegin, [], "Set cursor to beginning of sound"),
    spec!("cend", CursorEnd, [], "Set cursor to end of sound"),
    spec!("i", SetIn, [Param::optional("time")], "Set in point"),
    spec!("o", SetOut, [Param::optional("time")], "Set out point"),
    spec!("ci", ClearIn, [], "Clear in point"),
    spec!("co", ClearOut, [], "Clear out point"),
    spec!("setw", SetWidth, [Param::with_default("width", "80")], "Set columns width"),
    spec!("new", New, [Param::with_default("length", "1000")], "Creates a new sound of [length] milliseconds"),
    spec!("dup", Dup, [], "Push a copy of the current sound onto the stack"),
    spec!("pop", Pop, [], "Pop the top sound on the stack, deleting it"),
    spec!("swap", Swap, [], "Swap the top two sounds on the stack"),
    spec!("roll", Roll, [Param::with_default("count", "1")], "Roll the stack"),
    spec!("crop", Crop, [], "Crop the sound to the in and out points"),
    spec!("split", Split, [], "Split sound at the in point"),
    spec!("silence", Silence, [], "Insert silence at in-point"),
    spec!("bloop", Bloop, [], "Replace audio in selection with silence"),
    spec!("append", Append, [], "Append the top sound to the sound below it"),
    spec!("prepend", Prepend, [], "Prepend the top sound to the sound below it"),
    spec!("bounce", Bounce, [], "Bounce (mix) the top sound in the stack with the sound below it"),
    spec!("loop", Loop, [Param::with_default("count", "2")], "Loop sound"),
    spec!("normalize", Normalize, [Param::with_default("level", "0.0")], "Normalize selection to [level] dB"),
    spec!("fadein", FadeIn, [], "Fade in from clip start to in point"),
    spec!("fadeout", FadeOut, [], "Fade out from out point to end of file"),
    spec!("play", Play, [], "Play the sound"),
    spec!("export", Export, [Param::with_default("name", "out.wav")], "Export audio as a wav file"),
];

// =============================================================================
// REGISTRY
// =============================================================================

static BUILTIN_REGISTRY: OnceLock<Registry> = OnceLock::new();

#[derive(Debug)]
pub struct Registry {
    specs: &'static [ActionSpec],
    index: HashMap<&'static str, usize>,
}

impl Registry {
    /// The built-in action set, constructed on first use
    pub fn global() -> &'static Registry {
        BUILTIN_REGISTRY.get_or_init(Self::builtin)
    }

    pub fn builtin() -> Self {
        Self::from_specs(BUILTIN_ACTIONS)
    }

    fn from_specs(specs: &'static [ActionSpec]) -> Self {
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.name, i))
            .collect();
        Self { specs, index }
    }

    pub fn lookup(&self, name: &str) -> Option<&'static ActionSpec> {
        let specs: &'static [ActionSpec] = self.specs;
        self.index.get(name).map(|&i| &specs[i])
    }

    /// All entries in registration order
    pub fn specs(&self) -> &'static [ActionSpec] {
        self.specs
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.specs.iter().map(|s| s.name)
    }

    /// Registered names starting with `partial`, in registration order
    pub fn complete(&self, partial: &str) -> Vec<&'static str> {
        self.names().filter(|n| n.starts_with(partial)).collect()
    }

    /// `name [params]: description`, one line per action
    pub fn help_table(&self) -> String {
        self.specs
            .iter()
            .map(|spec| format!("{:<15}: {}", spec.signature(), spec.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Look up `name` and check the argument count
    pub fn bind<'a>(&self, name: &str, values: &'a [String]) -> CommandResult<Arguments<'a>> {
        let spec = self
            .lookup(name)
            .ok_or_else(|| CommandError::UnknownAction(name.to_string()))?;
        if !spec.accepts(values.len()) {
            return Err(CommandError::Arity {
                action: spec.name.to_string(),
                expected: spec.expected_args(),
                found: values.len(),
            });
        }
        Ok(Arguments { spec, values })
    }

    /// Run one parsed command against `editor`
    ///
    /// Lookup and arity are checked before any address is resolved, so a
    /// rejected command leaves the editor untouched. A command without an
    /// action only resolves (and persists) its addresses.
    pub fn dispatch<W: Write>(
        &self,
        editor: &mut Editor,
        command: &Command,
        out: &mut W,
    ) -> CommandResult<Flow> {
        let bound = command
            .action()
            .map(|name| self.bind(name, command.arguments()))
            .transpose()?;

        let bounds = editor.resolve(command);

        let Some(args) = bound else {
            return Ok(Flow::Continue);
        };

        debug!(
            action = args.spec.name,
            args = ?command.arguments(),
            ?bounds,
            "dispatch"
        );
        actions::execute(self, args.spec.action, editor, bounds, args, out)
    }
}

/// Locate the action word being typed at `pos`
///
/// Returns the byte offset where the word starts and the partial name, or
/// `None` when the cursor is in the argument list. A leading address such as
/// `100,-20` is skipped.
pub fn completion_target(line: &str, pos: usize) -> Option<(usize, &str)> {
    let before = line.get(..pos)?;
    let word_start = before
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);

    let is_address = |c: char| c.is_ascii_digit() || c == '-' || c == ',';
    if !before[..word_start].trim().chars().all(is_address) {
        return None;
    }

    let word = &before[word_start..];
    let offset = word.find(|c: char| !is_address(c)).unwrap_or(word.len());
    let start = word_start + offset;
    let partial = &before[start..];
    match partial.chars().next() {
        Some(c) if !c.is_ascii_alphabetic() => None,
        _ => Some((start, partial)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_names_are_unique_and_valid() {
        let registry = Registry::builtin();
        let names: HashSet<_> = registry.names().collect();
        assert_eq!(names.len(), registry.specs().len());
        for name in registry.names() {
            let cmd = mw_core::parse_command(name).unwrap();
            assert_eq!(cmd.action(), Some(name), "{name} must parse as an action");
        }
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
    }

    #[test]
    fn test_prefix_search_keeps_registration_order() {
        let registry = Registry::builtin();
        assert_eq!(
            registry.complete("c"),
            vec!["cm", "cmills", "cbegin", "cend", "ci", "co", "crop"]
        );
        assert_eq!(registry.complete("fade"), vec!["fadein", "fadeout"]);
        assert!(registry.complete("zz").is_empty());
        assert_eq!(registry.complete("").len(), registry.specs().len());
    }

    #[test]
    fn test_cmills_is_the_cursor_action() {
        let registry = Registry::builtin();
        let long = registry.lookup("cmills").unwrap();
        let short = registry.lookup("cm").unwrap();
        assert_eq!(long.action, Action::Cursor);
        assert_eq!(long.params, short.params);
    }

    #[test]
    fn test_help_table() {
        let help = Registry::builtin().help_table();
        assert!(help.lines().any(|l| l == "q              : Exit the program"));
        assert!(help
            .lines()
            .any(|l| l == "export [name]  : Export audio as a wav file"));
        assert_eq!(help.lines().count(), BUILTIN_ACTIONS.len());
    }

    #[test]
    fn test_bind_unknown_action() {
        let err = Registry::builtin().bind("zap", &[]).unwrap_err();
        assert!(matches!(err, CommandError::UnknownAction(name) if name == "zap"));
    }

    #[test]
    fn test_bind_checks_arity() {
        let registry = Registry::builtin();
        assert!(registry.bind("dup", &[]).is_ok());
        let err = registry.bind("dup", &strings(&["x"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "action dup called with incorrect argument count: expected 0, found 1"
        );
        assert!(registry.bind("roll", &strings(&["2"])).is_ok());
        let err = registry.bind("roll", &strings(&["2", "3"])).unwrap_err();
        assert!(matches!(err, CommandError::Arity { ref expected, found: 2, .. } if expected == "0 to 1"));
    }

    #[test]
    fn test_arguments_defaults() {
        let registry = Registry::builtin();
        let none: Vec<String> = Vec::new();
        let args = registry.bind("export", &none).unwrap();
        assert_eq!(args.get(0), Some("out.wav"));
        let given = strings(&["take.wav"]);
        let args = registry.bind("export", &given).unwrap();
        assert_eq!(args.get(0), Some("take.wav"));
        let args = registry.bind("i", &none).unwrap();
        assert_eq!(args.get(0), None);
        assert_eq!(args.get(5), None);
    }

    #[test]
    fn test_completion_target() {
        assert_eq!(completion_target("cr", 2), Some((0, "cr")));
        assert_eq!(completion_target("", 0), Some((0, "")));
        assert_eq!(completion_target("100,-20fa", 9), Some((7, "fa")));
        assert_eq!(completion_target("100,200 ex", 10), Some((8, "ex")));
        assert_eq!(completion_target("export ou", 9), None);
        assert_eq!(completion_target("  lo", 4), Some((2, "lo")));
        assert_eq!(completion_target("10 /x", 5), None);
    }
}
