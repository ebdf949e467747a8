/*!
Classification of a single token against one parser's registry: is it a
registered flag (and which one), or a value? A prefixed token that matches no
flag at all is a value, so `-abc` can fill a positional or follow a flag.
*/

use std::sync::Arc;

use quarrel_lexer::{Shape, classify as shape_of, is_negative_number, split_once};
use tracing::trace;

use crate::{
    argument::Argument,
    parser::ParserSettings,
    registry::{FlagEntry, Registry},
};

/// A value attached to the flag token itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attached<'arg> {
    /// `--name=value`, or the value of an operand `name=value`
    Explicit(&'arg str),

    /// The rest of a short cluster: `-fVALUE` or `-vvv`
    Cluster(&'arg str),
}

impl<'arg> Attached<'arg> {
    pub fn value(self) -> &'arg str {
        match self {
            Attached::Explicit(value) | Attached::Cluster(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FlagMatch<'p, 'arg> {
    pub argument: &'p Arc<Argument>,

    /// The registered spelling that matched, which can be longer than the
    /// token when it was abbreviated
    pub flag: &'p str,
    pub attached: Option<Attached<'arg>>,
    pub negated: bool,
}

impl<'p, 'arg> FlagMatch<'p, 'arg> {
    fn new(entry: &'p FlagEntry, attached: Option<Attached<'arg>>) -> Self {
        Self {
            argument: &entry.argument,
            flag: &entry.flag,
            attached,
            negated: entry.negated,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Class<'p, 'arg> {
    /// A value for a positional or for a preceding flag
    Positional,

    Flag(FlagMatch<'p, 'arg>),
}

/// An abbreviation or short cluster matched more than one flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ambiguous {
    pub token: String,
    pub candidates: Vec<String>,
}

/**
Classify `token`. The caller is responsible for the `--` marker and for
positional-only mode; this only looks at the token itself.

`negative_ambiguity` is true when the grammar registers a flag that looks like
a negative number, in which case negative numbers lose their special status.
*/
pub(crate) fn classify<'p, 'arg>(
    registry: &'p Registry,
    settings: &ParserSettings,
    token: &'arg str,
    negative_ambiguity: bool,
) -> Result<Class<'p, 'arg>, Ambiguous> {
    let class = classify_inner(registry, settings, token, negative_ambiguity)?;

    trace!(
        token,
        class = match class {
            Class::Positional => "positional",
            Class::Flag(_) => "flag",
        },
        "classified token"
    );

    Ok(class)
}

fn classify_inner<'p, 'arg>(
    registry: &'p Registry,
    settings: &ParserSettings,
    token: &'arg str,
    negative_ambiguity: bool,
) -> Result<Class<'p, 'arg>, Ambiguous> {
    let prefixed = match shape_of(token, &settings.prefix_chars) {
        Shape::Marker => return Ok(Class::Positional),
        Shape::Plain => {
            return Ok(split_once(token, b'=')
                .and_then(|(name, value)| {
                    registry.operand(name).map(|argument| {
                        Class::Flag(FlagMatch {
                            argument,
                            flag: argument
                                .flags()
                                .iter()
                                .find(|flag| flag.as_str() == name)
                                .map_or("", String::as_str),
                            attached: Some(Attached::Explicit(value)),
                            negated: false,
                        })
                    })
                })
                .unwrap_or(Class::Positional));
        }
        Shape::Prefixed(prefixed) => prefixed,
    };

    if let Some(entry) = registry.exact(token) {
        return Ok(Class::Flag(FlagMatch::new(entry, None)));
    }

    if let Some((name, value)) = prefixed.split_value()
        && let Some(entry) = registry.exact(name)
    {
        return Ok(Class::Flag(FlagMatch::new(
            entry,
            Some(Attached::Explicit(value)),
        )));
    }

    if !negative_ambiguity && is_negative_number(token) {
        return Ok(Class::Positional);
    }

    let mut candidates: Vec<FlagMatch<'p, 'arg>> = Vec::new();

    if prefixed.is_long() {
        if settings.allow_abbrev {
            let (partial, value) = match prefixed.split_value() {
                Some((name, value)) => (name, Some(Attached::Explicit(value))),
                None => (token, None),
            };

            candidates.extend(
                registry
                    .flag_entries()
                    .iter()
                    .filter(|entry| entry.flag.starts_with(partial))
                    .map(|entry| FlagMatch::new(entry, value)),
            );
        }
    } else {
        let head = prefixed.short_head();

        for entry in registry.flag_entries() {
            match head {
                Some((head, rest)) if entry.flag == head => {
                    candidates.push(FlagMatch::new(entry, Some(Attached::Cluster(rest))));
                }
                _ if settings.allow_abbrev && entry.flag.starts_with(token) => {
                    candidates.push(FlagMatch::new(entry, None));
                }
                _ => {}
            }
        }
    }

    // Several spellings of the same argument aren't an ambiguity
    candidates.dedup_by(|a, b| Arc::ptr_eq(a.argument, b.argument) && a.negated == b.negated);

    match candidates.as_slice() {
        [] => Ok(Class::Positional),
        [only] => Ok(Class::Flag(*only)),
        many => Err(Ambiguous {
            token: token.to_owned(),
            candidates: many.iter().map(|found| found.flag.to_owned()).collect(),
        }),
    }
}
