/*!
The grammar model for a single argument: its flags, destination, kind, action,
and repetition policy. Arguments are built once, validated, and then shared as
[`Arc<Argument>`]; their identity is the allocation, not the value, so the
same argument can be registered with a parent parser and its sub-commands.
*/

use std::{fmt, sync::Arc};

use joinery::JoinableIterator;

use crate::error::GrammarError;

/// Where an argument appears on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A slot matched by position, like `input.txt`
    Positional,

    /// A prefixed flag, like `--name` or `-n`
    Optional,

    /// An unprefixed `name=value` pair, like `if=disk.img`
    Operand,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Positional => "positional",
            Kind::Optional => "optional",
            Kind::Operand => "operand",
        })
    }
}

/// What happens when an argument is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Replace the stored values with the matched values
    Store,

    /// Replace the stored values with the argument's const values
    StoreConst,

    /// Store `"true"`; defaults to `"false"`
    StoreTrue,

    /// Store `"false"`; defaults to `"true"`
    StoreFalse,

    /// Add the matched values as a new group
    Append,

    /// Add the const values as a new group
    AppendConst,

    /// Count the number of times the flag appeared
    Count,

    /// Add the matched values to a flat list
    Extend,

    /// Print help and stop
    Help,

    /// Print the version and stop
    Version,

    /// Store a language code and switch the language of later diagnostics
    Language,

    /// A `--flag` / `--no-flag` pair storing `"true"` or `"false"`
    BooleanToggle,
}

impl Action {
    /// Actions that never read a value token from the command line
    #[inline]
    #[must_use]
    pub const fn is_zero_consumption(self) -> bool {
        matches!(
            self,
            Action::StoreConst
                | Action::StoreTrue
                | Action::StoreFalse
                | Action::AppendConst
                | Action::Count
                | Action::Help
                | Action::Version
                | Action::BooleanToggle
        )
    }

    /// Store, Append, and Extend
    #[inline]
    #[must_use]
    pub const fn is_store_family(self) -> bool {
        matches!(self, Action::Store | Action::Append | Action::Extend)
    }

    /// Actions that read value tokens
    #[inline]
    #[must_use]
    pub const fn takes_values(self) -> bool {
        self.is_store_family() || matches!(self, Action::Language)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Store => "store",
            Action::StoreConst => "store_const",
            Action::StoreTrue => "store_true",
            Action::StoreFalse => "store_false",
            Action::Append => "append",
            Action::AppendConst => "append_const",
            Action::Count => "count",
            Action::Extend => "extend",
            Action::Help => "help",
            Action::Version => "version",
            Action::Language => "language",
            Action::BooleanToggle => "boolean_toggle",
        })
    }
}

/**
How many value tokens an argument consumes each time it's matched.

| policy          | minimum | capacity              |
|-----------------|---------|-----------------------|
| `Default`       | 1 for value-taking actions, otherwise 0 | same |
| `Exactly(n)`    | n       | n                     |
| `ZeroOrOne(n)`  | 0       | n                     |
| `OneOrMore(n)`  | n       | unbounded             |
| `ZeroOrMore(n)` | 0, or n once any value is given | unbounded |
| `Remainder`     | 0       | the rest of the input |
| `Suppressed`    | 0       | 0                     |
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Nargs {
    #[default]
    Default,
    Exactly(usize),
    ZeroOrOne(usize),
    OneOrMore(usize),
    ZeroOrMore(usize),
    Remainder,
    Suppressed,
}

impl Nargs {
    /// Replace `Default` with the concrete policy it means for this action.
    /// Never returns `Default`.
    #[must_use]
    pub const fn resolve(self, action: Action) -> Nargs {
        match self {
            Nargs::Default if action.takes_values() => Nargs::Exactly(1),
            Nargs::Default => Nargs::Exactly(0),
            nargs => nargs,
        }
    }

    /// The fewest tokens this policy accepts when it's matched at all
    #[must_use]
    pub const fn minimum(self) -> usize {
        match self {
            Nargs::Default => 1,
            Nargs::Exactly(n) | Nargs::OneOrMore(n) => n,
            Nargs::ZeroOrOne(_) | Nargs::ZeroOrMore(_) | Nargs::Remainder | Nargs::Suppressed => 0,
        }
    }

    /// The most tokens this policy accepts, or `None` if unbounded
    #[must_use]
    pub const fn capacity(self) -> Option<usize> {
        match self {
            Nargs::Default => Some(1),
            Nargs::Exactly(n) | Nargs::ZeroOrOne(n) => Some(n),
            Nargs::Suppressed => Some(0),
            Nargs::OneOrMore(_) | Nargs::ZeroOrMore(_) | Nargs::Remainder => None,
        }
    }
}

impl fmt::Display for Nargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Nargs::Default => f.write_str("default"),
            Nargs::Exactly(n) => write!(f, "exactly({n})"),
            Nargs::ZeroOrOne(n) => write!(f, "zero_or_one({n})"),
            Nargs::OneOrMore(n) => write!(f, "one_or_more({n})"),
            Nargs::ZeroOrMore(n) => write!(f, "zero_or_more({n})"),
            Nargs::Remainder => f.write_str("remainder"),
            Nargs::Suppressed => f.write_str("suppressed"),
        }
    }
}

/// True for flags like `--name` or `++name`: two identical non-alphanumeric
/// characters followed by at least one more character.
pub(crate) fn is_long_flag(flag: &str) -> bool {
    let mut chars = flag.chars();

    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(a), Some(b), Some(_)) if a == b && !a.is_alphanumeric()
    )
}

/// One declared grammar unit. See the [module docs][self].
#[derive(Debug)]
pub struct Argument {
    flags: Vec<String>,
    dest: String,
    kind: Kind,
    action: Action,
    nargs: Nargs,
    choices: Option<Vec<String>>,
    required: bool,
    default: Option<Vec<String>>,
    constant: Option<Vec<String>>,
    implicit: Option<Vec<String>>,
    help: Option<String>,
    metavar: Option<String>,
    version: Option<String>,
}

impl Argument {
    /// Start building a positional argument. The name is also its
    /// destination unless [`dest`][ArgumentBuilder::dest] is given.
    pub fn positional(name: impl Into<String>) -> ArgumentBuilder {
        ArgumentBuilder::new(Kind::Positional, [name.into()])
    }

    /// Start building an optional argument answering to any of `flags`
    pub fn optional<I, S>(flags: I) -> ArgumentBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArgumentBuilder::new(Kind::Optional, flags.into_iter().map(Into::into))
    }

    /// Start building an operand, matched by tokens like `name=value`
    pub fn operand(name: impl Into<String>) -> ArgumentBuilder {
        ArgumentBuilder::new(Kind::Operand, [name.into()])
    }

    /// The `-h/--help` argument a parser gets unless it opts out, spelled
    /// with the parser's help prefix character
    pub(crate) fn help_flag(prefix: char) -> Arc<Argument> {
        Arc::new(Argument {
            flags: vec![format!("{prefix}h"), format!("{prefix}{prefix}help")],
            dest: "help".to_owned(),
            kind: Kind::Optional,
            action: Action::Help,
            nargs: Nargs::Default,
            choices: None,
            required: false,
            default: None,
            constant: None,
            implicit: None,
            help: None,
            metavar: None,
            version: None,
        })
    }

    /// The declared flag strings. Empty for positionals; the single name for
    /// operands.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    #[inline]
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    /// The declared policy, which may be [`Nargs::Default`]
    #[inline]
    #[must_use]
    pub fn declared_nargs(&self) -> Nargs {
        self.nargs
    }

    /// The concrete policy; never [`Nargs::Default`]
    #[inline]
    #[must_use]
    pub fn nargs(&self) -> Nargs {
        self.nargs.resolve(self.action)
    }

    #[inline]
    #[must_use]
    pub fn choices(&self) -> Option<&[String]> {
        self.choices.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[inline]
    #[must_use]
    pub fn default(&self) -> Option<&[String]> {
        self.default.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn constant(&self) -> Option<&[String]> {
        self.constant.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn implicit(&self) -> Option<&[String]> {
        self.implicit.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn metavar(&self) -> Option<&str> {
        self.metavar.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The value applied when the argument never appeared: the declared
    /// default, or the implied one for `StoreTrue` / `StoreFalse`.
    pub(crate) fn effective_default(&self) -> Option<Vec<String>> {
        match (&self.default, self.action) {
            (Some(default), _) => Some(default.clone()),
            (None, Action::StoreTrue) => Some(vec!["false".to_owned()]),
            (None, Action::StoreFalse) => Some(vec!["true".to_owned()]),
            (None, _) => None,
        }
    }

    /// Every spelling that matches this argument, paired with whether it's
    /// the negated `--no-` form of a [`Action::BooleanToggle`].
    pub(crate) fn spellings(&self) -> impl Iterator<Item = (String, bool)> + '_ {
        let negated = self
            .flags
            .iter()
            .filter(|_| self.action == Action::BooleanToggle)
            .filter(|flag| is_long_flag(flag))
            .map(|flag| {
                let prefix: String = flag.chars().take(2).collect();
                (format!("{prefix}no-{}", &flag[prefix.len()..]), true)
            });

        self.flags
            .iter()
            .map(|flag| (flag.clone(), false))
            .chain(negated)
    }

    /// The name used in diagnostics: `-f/--flag` for optionals, the metavar
    /// or dest for positionals, and the name for operands.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.kind {
            Kind::Optional => self.flags.iter().join_with("/").to_string(),
            Kind::Positional => self.metavar.clone().unwrap_or_else(|| self.dest.clone()),
            Kind::Operand => self.flags.first().cloned().unwrap_or_default(),
        }
    }

    /// The placeholder used for this argument's values in usage messages
    #[must_use]
    pub fn value_name(&self) -> String {
        match (&self.metavar, &self.choices, self.kind) {
            (Some(metavar), _, _) => metavar.clone(),
            (None, Some(choices), _) => format!("{{{}}}", choices.iter().join_with(",")),
            (None, None, Kind::Positional) => self.dest.clone(),
            (None, None, _) => self.dest.to_uppercase(),
        }
    }
}

/**
A validating builder for [`Argument`]. Every setter is infallible; all the
grammar invariants are checked in [`build`][ArgumentBuilder::build].

```
use quarrel::{Action, Argument, Nargs};

let verbose = Argument::optional(["-v", "--verbose"])
    .action(Action::Count)
    .help("say more")
    .build()
    .unwrap();
assert_eq!(verbose.dest(), "verbose");

let files = Argument::positional("files")
    .nargs(Nargs::OneOrMore(1))
    .build()
    .unwrap();
assert_eq!(files.dest(), "files");
```
*/
#[derive(Debug, Clone)]
#[must_use]
pub struct ArgumentBuilder {
    kind: Kind,
    names: Vec<String>,
    dest: Option<String>,
    action: Action,
    nargs: Nargs,
    choices: Option<Vec<String>>,
    required: bool,
    default: Option<Vec<String>>,
    constant: Option<Vec<String>>,
    implicit: Option<Vec<String>>,
    help: Option<String>,
    metavar: Option<String>,
    version: Option<String>,
}

fn owned<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl ArgumentBuilder {
    fn new(kind: Kind, names: impl IntoIterator<Item = String>) -> Self {
        Self {
            kind,
            names: names.into_iter().collect(),
            dest: None,
            action: Action::Store,
            nargs: Nargs::Default,
            choices: None,
            required: false,
            default: None,
            constant: None,
            implicit: None,
            help: None,
            metavar: None,
            version: None,
        }
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = nargs;
        self
    }

    /// Restrict matched values to a closed set
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(owned(choices));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(self, value: impl Into<String>) -> Self {
        self.default_values([value])
    }

    pub fn default_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default = Some(owned(values));
        self
    }

    /// The value stored by `StoreConst` and `AppendConst`, and by a flag that
    /// accepts zero values and got none (when no implicit value is set)
    pub fn constant(self, value: impl Into<String>) -> Self {
        self.constants([value])
    }

    pub fn constants<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constant = Some(owned(values));
        self
    }

    /// The value stored when a flag that accepts zero values appears without
    /// any, like `--color` for `--color[=WHEN]`
    pub fn implicit_value(self, value: impl Into<String>) -> Self {
        self.implicit_values([value])
    }

    pub fn implicit_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implicit = Some(owned(values));
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    /// The text printed by the `Version` action
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    fn derive_dest(&self) -> Option<String> {
        if let Some(dest) = &self.dest {
            return Some(dest.clone());
        }

        match self.kind {
            Kind::Positional | Kind::Operand => self.names.first().cloned(),
            Kind::Optional => {
                let name = self
                    .names
                    .iter()
                    .find(|name| is_long_flag(name))
                    .or(self.names.first())?;

                match name.trim_start_matches(|c: char| !c.is_alphanumeric()) {
                    "" => None,
                    stripped => Some(stripped.replace('-', "_")),
                }
            }
        }
    }

    /// Check every grammar invariant and produce the shared argument
    pub fn build(self) -> Result<Arc<Argument>, GrammarError> {
        let dest = match self.derive_dest() {
            Some(dest) if !dest.is_empty() => dest,
            _ => return Err(GrammarError::Unnamed),
        };

        let invalid_action = || GrammarError::InvalidAction {
            dest: dest.clone(),
            action: self.action,
            kind: self.kind,
        };

        let invalid_nargs = || GrammarError::InvalidNargs {
            dest: dest.clone(),
            nargs: self.nargs,
            action: self.action,
        };

        match self.kind {
            Kind::Positional => {
                if self.required {
                    return Err(GrammarError::RequiredPositional { dest });
                }

                if self.names.len() != 1 {
                    return Err(GrammarError::InvalidName {
                        dest,
                        name: self.names.join(" "),
                    });
                }

                if !matches!(
                    self.action,
                    Action::Store
                        | Action::Append
                        | Action::Extend
                        | Action::StoreConst
                        | Action::AppendConst
                ) {
                    return Err(invalid_action());
                }
            }
            Kind::Operand => {
                if !matches!(
                    self.action,
                    Action::Store | Action::Append | Action::Extend | Action::Language
                ) {
                    return Err(invalid_action());
                }

                if !matches!(self.nargs, Nargs::Default | Nargs::Exactly(1)) {
                    return Err(invalid_nargs());
                }

                if let Some(name) = self
                    .names
                    .iter()
                    .find(|name| name.is_empty() || name.contains('='))
                {
                    return Err(GrammarError::InvalidName {
                        dest,
                        name: name.clone(),
                    });
                }
            }
            Kind::Optional => {
                if self.names.is_empty() {
                    return Err(GrammarError::Unnamed);
                }

                if let Some(name) = self
                    .names
                    .iter()
                    .find(|name| name.chars().next().is_none_or(char::is_alphanumeric))
                {
                    return Err(GrammarError::InvalidName {
                        dest,
                        name: name.clone(),
                    });
                }
            }
        }

        if self.action.is_zero_consumption()
            && !matches!(self.nargs, Nargs::Default | Nargs::Exactly(0))
        {
            return Err(invalid_nargs());
        }

        if matches!(self.nargs, Nargs::Remainder | Nargs::Suppressed)
            && !self.action.is_store_family()
        {
            return Err(invalid_nargs());
        }

        if self.action.is_store_family() && matches!(self.nargs, Nargs::Exactly(0)) {
            return Err(invalid_nargs());
        }

        if self.action == Action::Language && !matches!(self.nargs, Nargs::Default | Nargs::Exactly(1))
        {
            return Err(invalid_nargs());
        }

        if matches!(self.action, Action::StoreConst | Action::AppendConst) && self.constant.is_none()
        {
            return Err(GrammarError::MissingConst { dest });
        }

        if self.action == Action::BooleanToggle && !self.names.iter().any(|name| is_long_flag(name))
        {
            return Err(GrammarError::NoLongFlag { dest });
        }

        Ok(Arc::new(Argument {
            flags: match self.kind {
                Kind::Positional => Vec::new(),
                Kind::Optional | Kind::Operand => self.names,
            },
            dest,
            kind: self.kind,
            action: self.action,
            nargs: self.nargs,
            choices: self.choices,
            required: self.required,
            default: self.default,
            constant: self.constant,
            implicit: self.implicit,
            help: self.help,
            metavar: self.metavar,
            version: self.version,
        }))
    }
}
