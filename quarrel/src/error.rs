use std::{fmt, io};

use joinery::JoinableIterator;
use lazy_format::lazy_format;

use crate::argument::{Action, Kind, Nargs};

/// The machine-distinguishable category of a failed parse or a malformed
/// grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An abbreviated flag matched more than one registered flag
    AmbiguousOption,

    /// Leftover input that starts with an unregistered flag
    UnknownFlag,

    /// Leftover input that no argument accepted
    UnrecognizedArguments,

    /// A flag or positional got the wrong number of values
    ArityMismatch,

    /// A value was outside an argument's choice set
    InvalidChoice,

    /// Two arguments claimed the same flag or sub-command name
    ConflictingOption,

    /// Two members of a mutually exclusive group were both given
    MutuallyExclusiveViolation,

    /// Required arguments, groups, or sub-commands were absent
    MissingRequiredArguments,

    /// The sub-command name wasn't one of the registered names or aliases
    InvalidSubcommand,

    /// An argument file couldn't be read
    FileNotFound,

    /// Text couldn't be split into words, like an argument file with an
    /// unterminated quote
    MalformedInput,

    /// The grammar itself violated an invariant
    MalformedGrammar,
}

/**
A failed parse: a kind, a message, and enough context to print a report the
usual way:

```text
usage: prog [-h] [--name NAME]
prog: error: the following arguments are required: --name
```
*/
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    kind: ErrorKind,
    message: String,
    prog: String,
    usage: String,

    /// The (possibly translated) word "error" used in the report
    label: String,
}

impl ParseError {
    /// The process exit code used for grammar violations
    pub const EXIT_CODE: i32 = 2;

    pub(crate) fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        prog: impl Into<String>,
        usage: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            prog: prog.into(),
            usage: usage.into(),
            label: label.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    #[must_use]
    pub fn prog(&self) -> &str {
        &self.prog
    }

    /// The usage synopsis of the parser that failed, without a trailing
    /// newline
    #[inline]
    #[must_use]
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// The full report: usage, then `prog: error: message`
    pub fn report(&self) -> impl fmt::Display + '_ {
        lazy_format!(
            "{usage}\n{prog}: {label}: {message}\n",
            usage = &self.usage,
            prog = &self.prog,
            label = &self.label,
            message = &self.message,
        )
    }

    pub fn write_report(&self, out: &mut impl io::Write) -> io::Result<()> {
        write!(out, "{}", self.report())
    }
}

/// A grammar declaration violated one of the construction rules. These are
/// programming errors in the command line's declaration, not bad input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarError {
    #[error("argument {argument}: conflicting option string: {flag}")]
    ConflictingOption { argument: String, flag: String },

    #[error("conflicting subcommand name: {name}")]
    DuplicateSubcommand { name: String },

    #[error("an argument needs at least one flag or a name")]
    Unnamed,

    #[error("argument {dest:?}: positional arguments can't be required")]
    RequiredPositional { dest: String },

    #[error("argument {dest:?}: nargs {nargs} isn't allowed with action {action}")]
    InvalidNargs {
        dest: String,
        nargs: Nargs,
        action: Action,
    },

    #[error("argument {dest:?}: action {action} isn't allowed on {kind} arguments")]
    InvalidAction {
        dest: String,
        action: Action,
        kind: Kind,
    },

    #[error("argument {dest:?}: {name:?} isn't a valid name")]
    InvalidName { dest: String, name: String },

    #[error(
        "argument {dest:?}: flag {flag:?} must start with one of {prefix_chars:?}"
    )]
    InvalidFlag {
        dest: String,
        flag: String,
        prefix_chars: String,
    },

    #[error("argument {dest:?}: this action needs a const value")]
    MissingConst { dest: String },

    #[error("argument {dest:?}: a boolean toggle needs at least one long flag")]
    NoLongFlag { dest: String },

    #[error("argument {dest:?}: group members must be registered, optional and not required")]
    InvalidGroupMember { dest: String },

    #[error("a mutually exclusive group needs at least one member")]
    EmptyGroup,

    #[error("a parser can't have more than one set of subcommands")]
    DuplicateSubparsers,

    #[error("subcommand {name:?} was added before any subparsers")]
    NoSubparsers { name: String },

    #[error("prefix characters can't be empty or alphanumeric (got {prefix_chars:?})")]
    InvalidPrefixChars { prefix_chars: String },
}

impl GrammarError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrammarError::ConflictingOption { .. } | GrammarError::DuplicateSubcommand { .. } => {
                ErrorKind::ConflictingOption
            }
            _ => ErrorKind::MalformedGrammar,
        }
    }
}

/// Render `'a', 'b', 'c'`, the way choices are listed in diagnostics
pub(crate) fn quoted_list<'a>(
    items: impl IntoIterator<Item = &'a str, IntoIter: Clone> + 'a,
) -> impl fmt::Display + 'a {
    items
        .into_iter()
        .map(|item| lazy_format!("'{item}'"))
        .join_with(", ")
}
