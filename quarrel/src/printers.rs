use std::{
    fmt::{self, Display, Write as _},
    sync::Arc,
};

use indent_write::fmt::IndentWriter;
use joinery::JoinableIterator;
use lazy_format::{lazy_format, make_lazy_format};
use textwrap::{Options, WordSeparator, WordSplitter, WrapAlgorithm};

use crate::{
    argument::{Action, Argument, Kind, Nargs},
    language::{Phrase, Phrasebook},
    parser::Parser,
    registry::{ExclusiveGroup, Registry, Slot, SubparsersSlot},
};

const WIDTH: usize = 80;

/// Items whose invocation is shorter than this get their help on the same
/// line, aligned to this column (within the section's indent)
const HELP_COLUMN: usize = 22;

// Usage parts are joined with this, so that wrapping only happens between
// parts, never inside one
const GLUE: char = '\u{a0}';

/// `M M`, `[M]`, `M [M ...]`, `[M ...]` or `...`, the way values are shown
/// for a repetition policy
fn format_values(nargs: Nargs, name: &str) -> String {
    let repeat = |n: usize| std::iter::repeat_n(name, n).join_with(' ').to_string();

    match nargs {
        Nargs::Default => name.to_owned(),
        Nargs::Exactly(n) => repeat(n),
        Nargs::ZeroOrOne(n) => format!("[{}]", repeat(n.max(1))),
        Nargs::OneOrMore(n) => format!("{} [{name} ...]", repeat(n.max(1))),
        Nargs::ZeroOrMore(0 | 1) => format!("[{name} ...]"),
        Nargs::ZeroOrMore(n) => format!("[{} [{name} ...]]", repeat(n)),
        Nargs::Remainder => "...".to_owned(),
        Nargs::Suppressed => String::new(),
    }
}

/// The values an argument takes, as shown after its flag
fn argument_values(argument: &Argument) -> String {
    match argument.action() {
        action if action.is_zero_consumption() => String::new(),
        _ => format_values(argument.nargs(), &argument.value_name()),
    }
}

/// `-f FILE` or `name=NAME`, without brackets
fn flag_usage(registry: &Registry, argument: &Arc<Argument>) -> String {
    if argument.kind() == Kind::Operand {
        let name = argument.flags().first().map_or("", String::as_str);
        return format!("{name}={}", argument.value_name());
    }

    let flag = registry.effective_flags(argument).next().unwrap_or_default();

    match argument_values(argument).as_str() {
        "" => flag.to_owned(),
        values => format!("{flag} {values}"),
    }
}

fn group_usage(registry: &Registry, group: &ExclusiveGroup) -> String {
    let members = group
        .members()
        .iter()
        .map(|member| flag_usage(registry, member))
        .join_with(" | ");

    match group.is_required() {
        true => format!("({members})"),
        false => format!("[{members}]"),
    }
}

fn subcommand_usage(subparsers: &SubparsersSlot) -> String {
    format!("{} ...", subparsers.display_name())
}

/// Every part of the usage synopsis, in order: optionals (with exclusive
/// groups in place of their first member), operands, then positionals
fn usage_parts(registry: &Registry) -> Vec<String> {
    let mut parts = Vec::new();
    let mut shown_groups: Vec<usize> = Vec::new();

    for argument in registry.optionals().iter().chain(registry.operands()) {
        let group = registry
            .groups()
            .iter()
            .enumerate()
            .find(|(_, group)| group.contains(argument));

        match group {
            Some((index, _)) if shown_groups.contains(&index) => {}
            Some((index, group)) => {
                shown_groups.push(index);
                parts.push(group_usage(registry, group));
            }
            None if argument.is_required() => parts.push(flag_usage(registry, argument)),
            None => parts.push(format!("[{}]", flag_usage(registry, argument))),
        }
    }

    for slot in registry.slots() {
        match slot {
            Slot::Argument(argument) => match argument.action() {
                Action::StoreConst | Action::AppendConst => {}
                _ => {
                    let values = format_values(argument.nargs(), &argument.value_name());
                    if !values.is_empty() {
                        parts.push(values);
                    }
                }
            },
            Slot::Command(subparsers) => parts.push(subcommand_usage(subparsers)),
        }
    }

    parts
}

/// `usage: prog [-h] ...`, wrapped with a hanging indent
pub(crate) fn usage(parser: &Parser, book: Phrasebook<'_>) -> String {
    let lead = format!("{}{}", book.get(Phrase::Usage), parser.prog());
    let parts = usage_parts(parser.registry());

    if parts.is_empty() {
        return lead;
    }

    let text = parts
        .iter()
        .map(|part| part.replace(' ', &GLUE.to_string()))
        .join_with(' ')
        .to_string();

    let first = format!("{lead} ");
    let rest = " ".repeat(first.chars().count());
    let options = Options::new(WIDTH)
        .initial_indent(&first)
        .subsequent_indent(&rest)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation)
        .wrap_algorithm(WrapAlgorithm::FirstFit)
        .break_words(false);

    textwrap::fill(&text, options).replace(GLUE, " ")
}

/// Write a section by writing a newline, then the `header`, then an
/// indented `body`.
fn section<O: fmt::Write + ?Sized, T>(
    out: &mut O,
    header: &str,
    body: impl FnOnce(IndentWriter<&mut O>) -> Result<T, fmt::Error>,
) -> Result<T, fmt::Error> {
    writeln!(out, "\n{header}:")?;
    body(IndentWriter::new("  ", out))
}

/// Write a section only if there's at least one item for it
fn maybe_section<O: fmt::Write + ?Sized, I: IntoIterator>(
    out: &mut O,
    header: &str,
    items: I,
    body: impl Fn(&mut IndentWriter<&mut O>, I::Item) -> fmt::Result,
) -> fmt::Result {
    let mut items = items.into_iter();

    match items.next() {
        None => Ok(()),
        Some(first) => section(out, header, |mut out| {
            body(&mut out, first)?;
            items.try_for_each(|item| body(&mut out, item))
        }),
    }
}

/// Describe an item by printing the item, followed by its help. If the item
/// is short enough the help goes on the same line, aligned; otherwise it
/// goes on the next line, indented to the help column.
fn describe(
    out: &mut (impl fmt::Write + ?Sized),
    item: impl Display,
    help: Option<&str>,
) -> fmt::Result {
    struct CharCounter<'a, T: fmt::Write + ?Sized> {
        inner: &'a mut T,
        count: &'a mut usize,
    }

    impl<T: fmt::Write + ?Sized> fmt::Write for CharCounter<'_, T> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.inner.write_str(s)?;
            *self.count += s.chars().count();
            Ok(())
        }
    }

    let mut count = 0;

    {
        let mut out = CharCounter {
            inner: &mut *out,
            count: &mut count,
        };
        write!(out, "{item}")?;
    }

    let help = match help {
        None | Some("") => return writeln!(out),
        Some(help) => help,
    };

    let indent = " ".repeat(HELP_COLUMN);
    let width = WIDTH - HELP_COLUMN - 2;

    if let Some(space) = HELP_COLUMN.checked_sub(count)
        && space >= 2
    {
        let lines = textwrap::wrap(help, width);
        let mut lines = lines.iter();

        if let Some(first) = lines.next() {
            writeln!(out, "{:space$}{first}", "")?;
        }

        lines.try_for_each(|line| writeln!(out, "{indent}{line}"))
    } else {
        writeln!(out)?;
        let mut out = IndentWriter::new(&indent, out);
        textwrap::wrap(help, width)
            .iter()
            .try_for_each(|line| writeln!(out, "{line}"))
    }
}

/// The help listing entry for an optional or operand: `-f, --file FILE`
fn invocation(registry: &Registry, argument: &Arc<Argument>) -> String {
    if argument.kind() == Kind::Operand {
        return flag_usage(registry, argument);
    }

    let flags = registry.effective_flags(argument).join_with(", ");

    match argument_values(argument).as_str() {
        "" => flags.to_string(),
        values => format!("{flags} {values}"),
    }
}

fn argument_help<'a>(argument: &'a Argument, book: Phrasebook<'a>) -> Option<&'a str> {
    match (argument.help(), argument.action()) {
        (None, Action::Help) => Some(book.get(Phrase::ShowHelp)),
        (help, _) => help,
    }
}

fn write_help(out: &mut impl fmt::Write, parser: &Parser, book: Phrasebook<'_>) -> fmt::Result {
    let registry = parser.registry();
    let settings = parser.settings();

    writeln!(out, "{}", usage(parser, book))?;

    if let Some(description) = &settings.description {
        writeln!(out, "\n{}", textwrap::fill(description, WIDTH))?;
    }

    maybe_section(
        out,
        book.get(Phrase::PositionalArguments),
        registry.slots(),
        |out, slot| match slot {
            Slot::Argument(argument) => {
                describe(out, argument.value_name(), argument_help(argument, book))
            }
            Slot::Command(subparsers) => describe(
                out,
                subparsers.display_name(),
                subparsers.argument().help(),
            ),
        },
    )?;

    if let Some(subparsers) = registry.subparsers() {
        maybe_section(
            out,
            book.get(Phrase::Commands),
            subparsers.commands(),
            |out, (command, _)| {
                let name = command.name();
                let aliases = command.aliases().iter().join_with(", ");
                let name = lazy_format!(match (command.aliases().is_empty()) {
                    true => "{name}",
                    false => "{name} ({aliases})",
                });

                describe(out, name, command.help_text())
            },
        )?;
    }

    maybe_section(
        out,
        book.get(Phrase::Options),
        registry.optionals().iter().chain(registry.operands()),
        |out, argument| {
            describe(
                out,
                invocation(registry, argument),
                argument_help(argument, book),
            )
        },
    )?;

    if let Some(epilog) = &settings.epilog {
        writeln!(out, "\n{}", textwrap::fill(epilog, WIDTH))?;
    }

    Ok(())
}

/// The full help text of one parser
pub(crate) fn help<'a>(parser: &'a Parser, book: Phrasebook<'a>) -> impl Display + 'a {
    make_lazy_format!(|f| write_help(f, parser, book))
}
