/*!
Diagnostic phrases and their translations. Every user-facing fragment the
engine produces is a [`Phrase`]; a [`Catalog`] maps a language code and a
phrase to a template, falling back to the built-in English. Templates use `{}`
placeholders, filled in order.
*/

use std::{collections::HashMap, fmt};

/// A translatable diagnostic or help fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Phrase {
    /// `usage: `
    Usage,

    /// `error`, as in `prog: error: message`
    Error,

    PositionalArguments,
    Options,
    Commands,

    /// `argument {}: {}`
    Argument,

    ExpectedOne,

    /// `expected {} arguments`
    ExpectedExactly,

    ExpectedAtLeastOne,

    /// `expected at least {} arguments`
    ExpectedAtLeast,

    /// `expected at most {} arguments`
    ExpectedAtMost,

    /// `ignored explicit argument '{}'`
    IgnoredExplicit,

    /// `invalid choice: '{}' (choose from {})`
    InvalidChoice,

    /// `ambiguous option: {} could match {}`
    AmbiguousOption,

    /// `not allowed with argument {}`
    NotAllowedWith,

    /// `one of the arguments {} is required`
    OneOfRequired,

    /// `the following arguments are required: {}`
    RequiredArguments,

    /// `unrecognized arguments: {}`
    UnrecognizedArguments,

    /// `can't open '{}': {}`
    CantOpen,

    /// `can't split '{}': {}`
    CantSplit,

    /// `'{}' includes itself`
    IncludesItself,

    /// The help text of the injected `-h/--help`
    ShowHelp,
}

impl Phrase {
    /// The built-in English template
    #[must_use]
    pub const fn english(self) -> &'static str {
        match self {
            Phrase::Usage => "usage: ",
            Phrase::Error => "error",
            Phrase::PositionalArguments => "Positional arguments",
            Phrase::Options => "Options",
            Phrase::Commands => "Commands",
            Phrase::Argument => "argument {}: {}",
            Phrase::ExpectedOne => "expected one argument",
            Phrase::ExpectedExactly => "expected {} arguments",
            Phrase::ExpectedAtLeastOne => "expected at least one argument",
            Phrase::ExpectedAtLeast => "expected at least {} arguments",
            Phrase::ExpectedAtMost => "expected at most {} arguments",
            Phrase::IgnoredExplicit => "ignored explicit argument '{}'",
            Phrase::InvalidChoice => "invalid choice: '{}' (choose from {})",
            Phrase::AmbiguousOption => "ambiguous option: {} could match {}",
            Phrase::NotAllowedWith => "not allowed with argument {}",
            Phrase::OneOfRequired => "one of the arguments {} is required",
            Phrase::RequiredArguments => "the following arguments are required: {}",
            Phrase::UnrecognizedArguments => "unrecognized arguments: {}",
            Phrase::CantOpen => "can't open '{}': {}",
            Phrase::CantSplit => "can't split '{}': {}",
            Phrase::IncludesItself => "'{}' includes itself",
            Phrase::ShowHelp => "show this help message and exit",
        }
    }
}

/// Fill the `{}` placeholders of `template` in order. Missing arguments leave
/// the placeholder empty; extra arguments are ignored.
#[must_use]
pub fn fill(template: &str, args: &[&dyn fmt::Display]) -> String {
    let mut pieces = template.split("{}");
    let mut args = args.iter();
    let mut out = String::with_capacity(template.len());

    out.extend(pieces.next());

    for piece in pieces {
        if let Some(arg) = args.next() {
            out.push_str(&arg.to_string());
        }
        out.push_str(piece);
    }

    out
}

/// Translations, keyed by language code and phrase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: HashMap<(String, Phrase), String>,
}

impl Catalog {
    pub fn insert(&mut self, language: impl Into<String>, phrase: Phrase, template: impl Into<String>) {
        self.entries.insert((language.into(), phrase), template.into());
    }

    /// The template for `phrase` in `language`, or the English one
    #[must_use]
    pub fn lookup(&self, language: Option<&str>, phrase: Phrase) -> &str {
        language
            .and_then(|language| self.entries.get(&(language.to_owned(), phrase)))
            .map_or(phrase.english(), String::as_str)
    }

    /// Copy every translation `other` has and this catalog lacks
    pub(crate) fn inherit(&mut self, other: &Catalog) {
        for (key, template) in &other.entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| template.clone());
        }
    }
}

/// A catalog paired with the active language of one parse frame
#[derive(Debug, Clone, Copy)]
pub(crate) struct Phrasebook<'a> {
    catalog: &'a Catalog,
    language: Option<&'a str>,
}

impl<'a> Phrasebook<'a> {
    pub fn new(catalog: &'a Catalog, language: Option<&'a str>) -> Self {
        Self { catalog, language }
    }

    pub fn get(&self, phrase: Phrase) -> &'a str {
        self.catalog.lookup(self.language, phrase)
    }

    pub fn fill(&self, phrase: Phrase, args: &[&dyn fmt::Display]) -> String {
        fill(self.get(phrase), args)
    }

    /// `argument NAME: message`
    pub fn about(&self, name: &str, message: &str) -> String {
        self.fill(Phrase::Argument, &[&name, &message])
    }
}
