/*!
The matching engine. It walks the preprocessed tokens once, left to right,
with a stack of frames: the root parser's frame at the bottom and one more for
each sub-command entered. Flags are matched against the innermost frame only;
runs of positional tokens are split between the frame's positional slots by
the [allocator][crate::allocator].

When the input runs out the frames are validated innermost first and folded
back into their parents, so the root ends up holding every cell.
*/

use std::{mem, sync::Arc};

use quarrel_lexer::{MARKER, Tokens};
use tracing::{debug, trace};

use crate::{
    allocator::{Closure, SlotPolicy, allocate},
    argument::{Action, Argument, Nargs},
    error::{ErrorKind, ParseError, quoted_list},
    language::{Phrase, Phrasebook},
    matcher::{self, Attached, Class, FlagMatch},
    parser::Parser,
    registry::{Slot, SubparsersSlot},
    storage::Storage,
    validate::validate,
};

/// Matching stopped before the input was exhausted
#[derive(Debug)]
pub(crate) enum Interrupt {
    /// A `Help` flag was matched; the help text of the innermost parser
    Help(String),

    /// A `Version` flag was matched
    Version(String),

    Failed(ParseError),
}

/// Everything a completed walk produces, before it's frozen into a result
#[derive(Debug)]
pub(crate) struct Finished {
    pub storage: Storage,
    pub unrecognized: Vec<String>,
    pub commands: Vec<String>,
    pub language: Option<String>,
}

/// One parser's matching context
struct Frame<'p> {
    parser: &'p Parser,
    slots: Vec<Slot<'p>>,
    next_slot: usize,
    storage: Storage,
    negative_ambiguity: bool,
    language: Option<String>,
}

impl<'p> Frame<'p> {
    fn new(parser: &'p Parser, storage: Storage, language: Option<String>) -> Self {
        let registry = parser.registry();

        Self {
            parser,
            slots: registry.slots(),
            next_slot: 0,
            storage,
            negative_ambiguity: registry.has_negative_number_flags(),
            language,
        }
    }

    fn book(&self) -> Phrasebook<'_> {
        Phrasebook::new(self.parser.catalog(), self.language.as_deref())
    }

    fn fail(&self, kind: ErrorKind, message: String) -> Interrupt {
        Interrupt::Failed(self.parser.error(self.language.as_deref(), kind, message))
    }

    /// Fail with `argument NAME: message`
    fn fail_on(&self, argument: &Argument, kind: ErrorKind, message: &str) -> Interrupt {
        let message = self.book().about(&argument.display_name(), message);
        self.fail(kind, message)
    }

    /// `expected N arguments` and its variations
    fn arity(&self, n: usize, at_least: bool) -> String {
        let book = self.book();

        match (at_least, n) {
            (false, 1) => book.get(Phrase::ExpectedOne).to_owned(),
            (false, n) => book.fill(Phrase::ExpectedExactly, &[&n]),
            (true, 1) => book.get(Phrase::ExpectedAtLeastOne).to_owned(),
            (true, n) => book.fill(Phrase::ExpectedAtLeast, &[&n]),
        }
    }

    fn ignored(&self, argument: &Argument, value: &str) -> Interrupt {
        let message = self.book().fill(Phrase::IgnoredExplicit, &[&value]);
        self.fail_on(argument, ErrorKind::ArityMismatch, &message)
    }

    fn check_choices(&self, argument: &Argument, values: &[String]) -> Result<(), Interrupt> {
        if let Some(choices) = argument.choices()
            && let Some(bad) = values.iter().find(|&value| !choices.contains(value))
        {
            let message = self.book().fill(
                Phrase::InvalidChoice,
                &[&bad, &quoted_list(choices.iter().map(String::as_str))],
            );

            return Err(self.fail_on(argument, ErrorKind::InvalidChoice, &message));
        }

        Ok(())
    }
}

pub(crate) struct Engine<'p, 'arg> {
    current: Frame<'p>,
    parents: Vec<Frame<'p>>,
    tokens: Tokens<'arg, String>,
    unrecognized: Vec<String>,
    commands: Vec<String>,
}

impl<'p, 'arg> Engine<'p, 'arg> {
    pub fn new(parser: &'p Parser, tokens: &'arg [String]) -> Self {
        let language = parser.settings().language.clone();

        Self {
            current: Frame::new(parser, Storage::new(), language),
            parents: Vec::new(),
            tokens: Tokens::new(tokens),
            unrecognized: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<Finished, Interrupt> {
        loop {
            self.tokens.take_marker();

            let Some(token) = self.tokens.peek() else {
                break;
            };

            if self.tokens.positional_only() {
                self.consume_run()?;
                continue;
            }

            match self.classify(token)? {
                Class::Flag(found) => {
                    self.tokens.advance();
                    self.consume_flag(found)?;
                }
                Class::Positional => self.consume_run()?,
            }
        }

        self.finish()
    }

    fn classify(&self, token: &'arg str) -> Result<Class<'p, 'arg>, Interrupt> {
        let parser: &'p Parser = self.current.parser;

        matcher::classify(
            parser.registry(),
            parser.settings(),
            token,
            self.current.negative_ambiguity,
        )
        .map_err(|ambiguous| {
            let message = self.current.book().fill(
                Phrase::AmbiguousOption,
                &[&ambiguous.token, &ambiguous.candidates.join(", ")],
            );
            self.current.fail(ErrorKind::AmbiguousOption, message)
        })
    }

    /// Consume a maximal run of positional tokens and share it out between
    /// the frame's remaining slots
    fn consume_run(&mut self) -> Result<(), Interrupt> {
        if let Some(&Slot::Argument(argument)) = self.current.slots.get(self.current.next_slot)
            && argument.nargs() == Nargs::Remainder
        {
            let rest = self.tokens.take_rest().to_vec();
            self.current.next_slot += 1;

            debug!(
                dest = argument.dest(),
                tokens = rest.len(),
                "remainder slot took the rest of the input"
            );

            return self.store_positional(argument, rest);
        }

        let start = self.tokens;
        let mut run: Vec<&'arg str> = Vec::new();

        // The cursor after each token of the run, so that tokens the
        // allocator doesn't hand out can be put back
        let mut after: Vec<Tokens<'arg, String>> = Vec::new();

        loop {
            if self.tokens.take_marker() {
                continue;
            }

            let Some(token) = self.tokens.peek() else {
                break;
            };

            if !self.tokens.positional_only() && !matches!(self.classify(token)?, Class::Positional)
            {
                break;
            }

            self.tokens.advance();
            run.push(token);
            after.push(self.tokens);
        }

        let window: Vec<Slot<'p>> = self.current.slots[self.current.next_slot..].to_vec();
        let policies: Vec<SlotPolicy> = window.iter().map(Slot::policy).collect();
        let allocation = allocate(run.len(), &policies);

        debug!(
            tokens = run.len(),
            counts = ?allocation.counts,
            leftover = allocation.leftover,
            closed_by = ?allocation.closed_by,
            "allocated positional run"
        );

        let mut offset = 0;

        for (&slot, &count) in window.iter().zip(&allocation.counts) {
            self.current.next_slot += 1;

            match slot {
                Slot::Argument(argument) => {
                    let values = run[offset..offset + count]
                        .iter()
                        .map(|&token| token.to_owned())
                        .collect();
                    offset += count;

                    self.store_positional(argument, values)?;
                }
                Slot::Command(subparsers) => {
                    let name = run[offset];

                    // Everything after the name belongs to the sub-command
                    self.tokens = after[offset];
                    return self.dispatch(subparsers, name);
                }
            }
        }

        if allocation.closed_by.strands_leftovers() {
            self.unrecognized
                .extend(run[offset..].iter().map(|&token| token.to_owned()));
            return Ok(());
        }

        self.tokens = match offset {
            0 => start,
            n => after[n - 1],
        };

        match allocation.closed_by {
            // The next slot is the remainder, and it starts right here, even
            // if what follows looks like a flag
            Closure::Remainder => self.consume_run(),
            _ => Ok(()),
        }
    }

    fn store_positional(
        &mut self,
        argument: &'p Arc<Argument>,
        values: Vec<String>,
    ) -> Result<(), Interrupt> {
        if let Nargs::ZeroOrMore(n) = argument.nargs()
            && !values.is_empty()
            && values.len() < n
        {
            let message = self.current.arity(n, true);
            return Err(self
                .current
                .fail_on(argument, ErrorKind::ArityMismatch, &message));
        }

        self.current.check_choices(argument, &values)?;

        let constant = || argument.constant().map(<[String]>::to_vec).unwrap_or_default();

        match (argument.action(), argument.nargs()) {
            (_, Nargs::Suppressed) => self.current.storage.touch(argument).mark(),
            (Action::StoreConst, _) => self.current.storage.touch(argument).replace(constant()),
            (Action::AppendConst, _) => self
                .current
                .storage
                .touch(argument)
                .push_submission(constant()),

            // Left alone, so the default still applies
            _ if values.is_empty() => {}

            (Action::Append | Action::Extend, _) => {
                self.current.storage.touch(argument).push_submission(values);
            }
            _ => self.current.storage.touch(argument).replace(values),
        }

        Ok(())
    }

    fn consume_flag(&mut self, found: FlagMatch<'p, 'arg>) -> Result<(), Interrupt> {
        let parser: &'p Parser = self.current.parser;
        let FlagMatch {
            mut argument,
            mut flag,
            mut attached,
            mut negated,
        } = found;

        loop {
            trace!(flag, dest = argument.dest(), "matched flag");

            if !argument.action().is_zero_consumption() {
                return self.consume_values(argument, attached);
            }

            match attached {
                None => return self.apply_switch(argument, negated),
                Some(Attached::Explicit(value)) => {
                    return Err(self.current.ignored(argument, value));
                }
                Some(Attached::Cluster(rest)) => {
                    self.apply_switch(argument, negated)?;

                    // `-vx`: the rest is another short flag with the same
                    // prefix
                    let mut chars = rest.chars();
                    let (Some(prefix), Some(next)) = (flag.chars().next(), chars.next()) else {
                        return Ok(());
                    };

                    let Some(entry) = parser.registry().exact(&format!("{prefix}{next}")) else {
                        return Err(self.current.ignored(argument, rest));
                    };

                    argument = &entry.argument;
                    flag = entry.flag.as_str();
                    negated = entry.negated;
                    attached = match chars.as_str() {
                        "" => None,
                        tail => Some(Attached::Cluster(tail)),
                    };
                }
            }
        }
    }

    /// Apply an action that consumes no values
    fn apply_switch(&mut self, argument: &'p Arc<Argument>, negated: bool) -> Result<(), Interrupt> {
        let parser: &'p Parser = self.current.parser;

        match argument.action() {
            Action::Help => {
                return Err(Interrupt::Help(
                    parser.format_help_in(self.current.language.as_deref()),
                ));
            }
            Action::Version => {
                let text = argument.version().unwrap_or(parser.prog());
                return Err(Interrupt::Version(text.replace("{prog}", parser.prog())));
            }
            _ => {}
        }

        let constant = || argument.constant().map(<[String]>::to_vec).unwrap_or_default();
        let cell = self.current.storage.touch(argument);

        match argument.action() {
            Action::StoreConst => cell.replace(constant()),
            Action::AppendConst => cell.push_submission(constant()),
            Action::StoreTrue => cell.replace(vec!["true".to_owned()]),
            Action::StoreFalse => cell.replace(vec!["false".to_owned()]),
            Action::Count => cell.push_submission([]),
            Action::BooleanToggle => {
                let value = if negated { "false" } else { "true" };
                cell.replace(vec![value.to_owned()]);
            }
            Action::Help
            | Action::Version
            | Action::Store
            | Action::Append
            | Action::Extend
            | Action::Language => cell.mark(),
        }

        Ok(())
    }

    fn consume_values(
        &mut self,
        argument: &'p Arc<Argument>,
        attached: Option<Attached<'arg>>,
    ) -> Result<(), Interrupt> {
        let nargs = argument.nargs();

        let values = match attached {
            Some(attached) => {
                let value = attached.value();

                let message = match nargs {
                    Nargs::Suppressed => return Err(self.current.ignored(argument, value)),
                    Nargs::Exactly(1)
                    | Nargs::ZeroOrOne(1..)
                    | Nargs::OneOrMore(0 | 1)
                    | Nargs::ZeroOrMore(0 | 1)
                    | Nargs::Remainder
                    | Nargs::Default => None,
                    Nargs::Exactly(n) => Some(self.current.arity(n, false)),
                    Nargs::ZeroOrOne(_) => Some(self.current.book().fill(Phrase::ExpectedAtMost, &[&0])),
                    Nargs::OneOrMore(n) | Nargs::ZeroOrMore(n) => Some(self.current.arity(n, true)),
                };

                if let Some(message) = message {
                    return Err(self
                        .current
                        .fail_on(argument, ErrorKind::ArityMismatch, &message));
                }

                vec![value.to_owned()]
            }
            None => self.take_values(argument, nargs)?,
        };

        self.apply_values(argument, values)
    }

    /// Consume as many following tokens as the policy allows, stopping at
    /// the marker or anything that isn't a value
    fn take_values(&mut self, argument: &Argument, nargs: Nargs) -> Result<Vec<String>, Interrupt> {
        if nargs == Nargs::Remainder {
            return Ok(self.tokens.take_rest().to_vec());
        }

        let capacity = nargs.capacity();
        let mut values = Vec::new();

        while capacity.is_none_or(|capacity| values.len() < capacity) {
            let Some(token) = self.tokens.peek() else {
                break;
            };

            if token == MARKER || !matches!(self.classify(token)?, Class::Positional) {
                break;
            }

            values.push(token.to_owned());
            self.tokens.advance();
        }

        let short = match nargs {
            Nargs::Exactly(n) if values.len() != n => Some((n, false)),
            Nargs::OneOrMore(n) if values.len() < n => Some((n, true)),
            Nargs::ZeroOrMore(n) if !values.is_empty() && values.len() < n => Some((n, true)),
            _ => None,
        };

        match short {
            Some((n, at_least)) => {
                let message = self.current.arity(n, at_least);
                Err(self
                    .current
                    .fail_on(argument, ErrorKind::ArityMismatch, &message))
            }
            None => Ok(values),
        }
    }

    fn apply_values(
        &mut self,
        argument: &'p Arc<Argument>,
        values: Vec<String>,
    ) -> Result<(), Interrupt> {
        self.current.check_choices(argument, &values)?;

        if argument.nargs() == Nargs::Suppressed {
            self.current.storage.touch(argument).mark();
            return Ok(());
        }

        // What a flag stores when it accepted zero values and got none
        let fallback = argument
            .implicit()
            .or(argument.constant())
            .map(<[String]>::to_vec);

        match argument.action() {
            Action::Language => {
                if let Some(code) = values.last() {
                    debug!(language = %code, "switching diagnostics language");
                    self.current.language = Some(code.clone());
                }

                self.current.storage.touch(argument).replace(values);
            }
            Action::Append | Action::Extend => {
                let cell = self.current.storage.touch(argument);

                match (values.is_empty(), fallback) {
                    (true, Some(fallback)) => cell.push_submission(fallback),
                    (true, None) => cell.mark(),
                    (false, _) => cell.push_submission(values),
                }
            }
            _ => {
                let cell = self.current.storage.touch(argument);

                match (values.is_empty(), fallback) {
                    (true, Some(fallback)) => cell.replace(fallback),
                    (true, None) => cell.mark(),
                    (false, _) => cell.replace(values),
                }
            }
        }

        Ok(())
    }

    /// Store the chosen sub-command and push its frame
    fn dispatch(&mut self, subparsers: &'p SubparsersSlot, name: &'arg str) -> Result<(), Interrupt> {
        let Some(subcommand) = subparsers.find(name) else {
            let book = self.current.book();
            let message = book.fill(
                Phrase::InvalidChoice,
                &[&name, &quoted_list(subparsers.names())],
            );
            let message = book.about(&subparsers.display_name(), &message);

            return Err(self.current.fail(ErrorKind::InvalidSubcommand, message));
        };

        let canonical = subcommand.command.name();

        self.current
            .storage
            .touch(subparsers.argument())
            .replace(vec![canonical.to_owned()]);
        self.commands.push(canonical.to_owned());

        debug!(
            command = canonical,
            given = name,
            prog = subcommand.parser.prog(),
            "entering subcommand"
        );

        let child = Frame::new(
            &subcommand.parser,
            self.current.storage.clone(),
            self.current.language.clone(),
        );

        let parent = mem::replace(&mut self.current, child);
        self.parents.push(parent);

        Ok(())
    }

    /// Validate every frame innermost first, folding each into its parent
    fn finish(mut self) -> Result<Finished, Interrupt> {
        loop {
            let parser: &'p Parser = self.current.parser;
            let book = Phrasebook::new(parser.catalog(), self.current.language.as_deref());

            if let Err(violation) = validate(parser.registry(), &mut self.current.storage, book) {
                return Err(self.current.fail(violation.kind, violation.message));
            }

            match self.parents.pop() {
                Some(parent) => {
                    let child = mem::replace(&mut self.current, parent);
                    self.current.storage.merge_child(child.storage);
                }
                None => {
                    return Ok(Finished {
                        storage: self.current.storage,
                        unrecognized: self.unrecognized,
                        commands: self.commands,
                        language: self.current.language,
                    });
                }
            }
        }
    }
}
