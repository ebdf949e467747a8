/*!
The arguments owned by one parser: positionals, optionals and operands in
insertion order (which is also match priority), mutually exclusive groups, and
at most one sub-command slot.

The argument lists are append-only. Flag lookup goes through a separate list
of flag entries, which is the *effective* view: under the `Resolve` conflict
policy a newer argument takes over a colliding flag by removing the older
entry, and the older argument's declared flags are never touched.
*/

use std::sync::Arc;

use quarrel_lexer::is_negative_number;

use crate::{
    allocator::SlotPolicy,
    argument::{Action, Argument, Kind, Nargs},
    error::GrammarError,
    parser::{ConflictHandler, Parser},
};

/// One spelling that resolves to an optional argument
#[derive(Debug, Clone)]
pub(crate) struct FlagEntry {
    pub flag: String,
    pub argument: Arc<Argument>,

    /// The `--no-` spelling of a boolean toggle
    pub negated: bool,
}

/// At most one member may be present; if `required`, exactly one must be
#[derive(Debug, Clone)]
pub struct ExclusiveGroup {
    members: Vec<Arc<Argument>>,
    required: bool,
}

impl ExclusiveGroup {
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[Arc<Argument>] {
        &self.members
    }

    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub(crate) fn contains(&self, argument: &Arc<Argument>) -> bool {
        self.members
            .iter()
            .any(|member| Arc::ptr_eq(member, argument))
    }
}

/// Settings for a parser's sub-command slot
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Subparsers {
    dest: Option<String>,
    required: bool,
    help: Option<String>,
    metavar: Option<String>,
}

impl Subparsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the chosen sub-command's name is stored; `command` by default
    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
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
}

/// The name, aliases and help line of one sub-command
#[derive(Debug, Clone)]
#[must_use]
pub struct Command {
    name: String,
    aliases: Vec<String>,
    help: Option<String>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            help: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[inline]
    #[must_use]
    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> + Clone {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Subcommand {
    pub command: Command,
    pub parser: Parser,
}

/// The sub-command slot: a place in the positional order where a sub-command
/// name is expected
#[derive(Debug, Clone)]
pub struct SubparsersSlot {
    position: usize,
    argument: Arc<Argument>,
    required: bool,
    commands: Vec<Subcommand>,
}

impl SubparsersSlot {
    /// The positional argument the chosen name is stored under
    #[inline]
    #[must_use]
    pub fn argument(&self) -> &Arc<Argument> {
        &self.argument
    }

    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn commands(&self) -> impl Iterator<Item = (&Command, &Parser)> {
        self.commands
            .iter()
            .map(|subcommand| (&subcommand.command, &subcommand.parser))
    }

    /// Every accepted name, aliases included
    pub fn names(&self) -> impl Iterator<Item = &str> + Clone {
        self.commands
            .iter()
            .flat_map(|subcommand| subcommand.command.names())
    }

    pub(crate) fn find(&self, name: &str) -> Option<&Subcommand> {
        self.commands
            .iter()
            .find(|subcommand| subcommand.command.names().any(|known| known == name))
    }

    pub(crate) fn commands_mut(&mut self) -> impl Iterator<Item = &mut Subcommand> {
        self.commands.iter_mut()
    }

    /// `{a,b,c}`, unless a metavar was given
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.argument.metavar() {
            Some(metavar) => metavar.to_owned(),
            None => {
                let names: Vec<&str> = self
                    .commands
                    .iter()
                    .map(|subcommand| subcommand.command.name())
                    .collect();
                format!("{{{}}}", names.join(","))
            }
        }
    }
}

/// A positional place in match order
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot<'g> {
    Argument(&'g Arc<Argument>),
    Command(&'g SubparsersSlot),
}

impl Slot<'_> {
    pub fn policy(&self) -> SlotPolicy {
        match *self {
            Slot::Command(_) => SlotPolicy::Command,
            Slot::Argument(argument) => match (argument.action(), argument.nargs()) {
                (Action::StoreConst | Action::AppendConst, _) | (_, Nargs::Suppressed) => {
                    SlotPolicy::Nargs(Nargs::Exactly(0))
                }
                (_, nargs) => SlotPolicy::Nargs(nargs),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    positionals: Vec<Arc<Argument>>,
    optionals: Vec<Arc<Argument>>,
    operands: Vec<Arc<Argument>>,
    flags: Vec<FlagEntry>,
    groups: Vec<ExclusiveGroup>,
    subparsers: Option<SubparsersSlot>,
    negative_number_flags: bool,
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn positionals(&self) -> &[Arc<Argument>] {
        &self.positionals
    }

    #[inline]
    #[must_use]
    pub fn optionals(&self) -> &[Arc<Argument>] {
        &self.optionals
    }

    #[inline]
    #[must_use]
    pub fn operands(&self) -> &[Arc<Argument>] {
        &self.operands
    }

    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[ExclusiveGroup] {
        &self.groups
    }

    #[inline]
    #[must_use]
    pub fn subparsers(&self) -> Option<&SubparsersSlot> {
        self.subparsers.as_ref()
    }

    pub(crate) fn subparsers_mut(&mut self) -> Option<&mut SubparsersSlot> {
        self.subparsers.as_mut()
    }

    /// True if any registered flag looks like a negative number, which turns
    /// off the rule that negative numbers are always values
    #[inline]
    #[must_use]
    pub fn has_negative_number_flags(&self) -> bool {
        self.negative_number_flags
    }

    /// The flags that currently resolve to this argument, after conflict
    /// resolution; `--no-` spellings excluded
    pub fn effective_flags<'a>(
        &'a self,
        argument: &'a Arc<Argument>,
    ) -> impl Iterator<Item = &'a str> + Clone + 'a {
        self.flags
            .iter()
            .filter(move |entry| !entry.negated && Arc::ptr_eq(&entry.argument, argument))
            .map(|entry| entry.flag.as_str())
    }

    pub(crate) fn flag_entries(&self) -> &[FlagEntry] {
        &self.flags
    }

    pub(crate) fn exact(&self, flag: &str) -> Option<&FlagEntry> {
        self.flags.iter().find(|entry| entry.flag == flag)
    }

    pub(crate) fn operand(&self, name: &str) -> Option<&Arc<Argument>> {
        self.operands
            .iter()
            .find(|operand| operand.flags().iter().any(|flag| flag == name))
    }

    pub(crate) fn contains(&self, argument: &Arc<Argument>) -> bool {
        [&self.positionals, &self.optionals, &self.operands]
            .into_iter()
            .flatten()
            .any(|known| Arc::ptr_eq(known, argument))
    }

    /// The positional slots in match order, with the sub-command slot in its
    /// place
    pub(crate) fn slots(&self) -> Vec<Slot<'_>> {
        let mut slots: Vec<Slot<'_>> = self.positionals.iter().map(Slot::Argument).collect();

        if let Some(subparsers) = &self.subparsers {
            slots.insert(subparsers.position.min(slots.len()), Slot::Command(subparsers));
        }

        slots
    }

    /// Add the injected help flag to a registry that has nothing else yet
    pub(crate) fn seed_help(&mut self, argument: Arc<Argument>) {
        let entries: Vec<FlagEntry> = argument
            .spellings()
            .map(|(flag, negated)| FlagEntry {
                flag,
                argument: Arc::clone(&argument),
                negated,
            })
            .collect();

        self.flags.extend(entries);
        self.optionals.push(argument);
    }

    pub(crate) fn register(
        &mut self,
        argument: Arc<Argument>,
        prefix_chars: &str,
        policy: ConflictHandler,
    ) -> Result<(), GrammarError> {
        if self.contains(&argument) {
            return Ok(());
        }

        match argument.kind() {
            Kind::Positional => self.positionals.push(argument),
            Kind::Operand => {
                let clash = self.operands.iter().position(|operand| {
                    operand
                        .flags()
                        .iter()
                        .any(|name| argument.flags().contains(name))
                });

                if let Some(index) = clash {
                    match policy {
                        ConflictHandler::Error => {
                            return Err(GrammarError::ConflictingOption {
                                argument: argument.display_name(),
                                flag: argument.display_name(),
                            });
                        }
                        ConflictHandler::Resolve => {
                            let old = self.operands.remove(index);
                            self.forget(&old);
                        }
                    }
                }

                self.operands.push(argument);
            }
            Kind::Optional => {
                if let Some(flag) = argument
                    .flags()
                    .iter()
                    .find(|flag| !flag.starts_with(|c: char| prefix_chars.contains(c)))
                {
                    return Err(GrammarError::InvalidFlag {
                        dest: argument.dest().to_owned(),
                        flag: flag.clone(),
                        prefix_chars: prefix_chars.to_owned(),
                    });
                }

                let spellings: Vec<(String, bool)> = argument.spellings().collect();
                let collides =
                    |entry: &FlagEntry| spellings.iter().any(|(flag, _)| *flag == entry.flag);

                if let Some(entry) = self.flags.iter().find(|entry| collides(entry)) {
                    match policy {
                        ConflictHandler::Error => {
                            return Err(GrammarError::ConflictingOption {
                                argument: argument.display_name(),
                                flag: entry.flag.clone(),
                            });
                        }
                        ConflictHandler::Resolve => {
                            self.flags.retain(|entry| !collides(entry));
                            self.prune();
                        }
                    }
                }

                self.flags
                    .extend(spellings.into_iter().map(|(flag, negated)| FlagEntry {
                        flag,
                        argument: Arc::clone(&argument),
                        negated,
                    }));
                self.optionals.push(argument);
            }
        }

        self.negative_number_flags = self
            .flags
            .iter()
            .any(|entry| is_negative_number(&entry.flag));

        Ok(())
    }

    /// Drop optionals left without any flag after a conflict was resolved
    fn prune(&mut self) {
        let orphans: Vec<Arc<Argument>> = self
            .optionals
            .iter()
            .filter(|argument| {
                !self
                    .flags
                    .iter()
                    .any(|entry| Arc::ptr_eq(&entry.argument, argument))
            })
            .cloned()
            .collect();

        for orphan in &orphans {
            self.optionals
                .retain(|argument| !Arc::ptr_eq(argument, orphan));
            self.forget(orphan);
        }
    }

    /// Remove an argument from every group
    fn forget(&mut self, argument: &Arc<Argument>) {
        for group in &mut self.groups {
            group
                .members
                .retain(|member| !Arc::ptr_eq(member, argument));
        }

        self.groups.retain(|group| !group.members.is_empty());
    }

    pub(crate) fn add_group(
        &mut self,
        required: bool,
        members: Vec<Arc<Argument>>,
    ) -> Result<(), GrammarError> {
        if members.is_empty() {
            return Err(GrammarError::EmptyGroup);
        }

        if let Some(member) = members.iter().find(|member| {
            member.kind() == Kind::Positional || member.is_required() || !self.contains(member)
        }) {
            return Err(GrammarError::InvalidGroupMember {
                dest: member.dest().to_owned(),
            });
        }

        self.groups.push(ExclusiveGroup { members, required });
        Ok(())
    }

    pub(crate) fn set_subparsers(&mut self, settings: Subparsers) -> Result<(), GrammarError> {
        if self.subparsers.is_some() {
            return Err(GrammarError::DuplicateSubparsers);
        }

        let mut argument = Argument::positional(settings.dest.unwrap_or_else(|| "command".to_owned()));

        if let Some(help) = settings.help {
            argument = argument.help(help);
        }

        if let Some(metavar) = settings.metavar {
            argument = argument.metavar(metavar);
        }

        self.subparsers = Some(SubparsersSlot {
            position: self.positionals.len(),
            argument: argument.build()?,
            required: settings.required,
            commands: Vec::new(),
        });

        Ok(())
    }

    pub(crate) fn add_subcommand(
        &mut self,
        command: Command,
        parser: Parser,
    ) -> Result<(), GrammarError> {
        let Some(slot) = &mut self.subparsers else {
            return Err(GrammarError::NoSubparsers {
                name: command.name,
            });
        };

        if let Some(name) = command.names().find(|name| slot.find(name).is_some()) {
            return Err(GrammarError::DuplicateSubcommand {
                name: name.to_owned(),
            });
        }

        slot.commands.push(Subcommand { command, parser });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optional(flags: &[&str]) -> Arc<Argument> {
        Argument::optional(flags.iter().copied()).build().unwrap()
    }

    #[test]
    fn conflicts_error_by_default() {
        let mut registry = Registry::default();
        registry
            .register(optional(&["-f", "--foo"]), "-", ConflictHandler::Error)
            .unwrap();

        let error = registry
            .register(optional(&["-f", "--fast"]), "-", ConflictHandler::Error)
            .unwrap_err();

        assert_eq!(
            error,
            GrammarError::ConflictingOption {
                argument: "-f/--fast".to_owned(),
                flag: "-f".to_owned(),
            }
        );
    }

    #[test]
    fn resolve_takes_over_flags() {
        let mut registry = Registry::default();
        let foo = optional(&["-f", "--foo"]);
        let fast = optional(&["-f", "--fast"]);
        let only_f = optional(&["-f"]);

        registry
            .register(Arc::clone(&foo), "-", ConflictHandler::Resolve)
            .unwrap();
        registry
            .register(Arc::clone(&fast), "-", ConflictHandler::Resolve)
            .unwrap();

        assert_eq!(registry.effective_flags(&foo).collect::<Vec<_>>(), ["--foo"]);
        assert_eq!(foo.flags(), ["-f", "--foo"]);
        assert!(Arc::ptr_eq(&registry.exact("-f").unwrap().argument, &fast));

        // Losing every flag drops the argument entirely
        registry
            .register(Arc::clone(&only_f), "-", ConflictHandler::Resolve)
            .unwrap();
        registry
            .register(optional(&["--fast"]), "-", ConflictHandler::Resolve)
            .unwrap();
        assert!(!registry.contains(&fast));
        assert!(registry.contains(&foo));
    }

    #[test]
    fn flags_need_a_prefix() {
        let mut registry = Registry::default();
        let error = registry
            .register(optional(&["+x"]), "-", ConflictHandler::Error)
            .unwrap_err();
        assert!(matches!(error, GrammarError::InvalidFlag { .. }));

        registry
            .register(optional(&["+x"]), "-+", ConflictHandler::Error)
            .unwrap();
    }

    #[test]
    fn negative_number_flags() {
        let mut registry = Registry::default();
        registry
            .register(optional(&["-v"]), "-", ConflictHandler::Error)
            .unwrap();
        assert!(!registry.has_negative_number_flags());

        registry
            .register(optional(&["-1"]), "-", ConflictHandler::Error)
            .unwrap();
        assert!(registry.has_negative_number_flags());
    }

    #[test]
    fn group_members_must_be_registered_optionals() {
        let mut registry = Registry::default();
        let a = optional(&["-a"]);
        let b = optional(&["-b"]);
        let stranger = optional(&["-c"]);
        let required = Argument::optional(["-r"]).required(true).build().unwrap();

        for argument in [&a, &b, &required] {
            registry
                .register(Arc::clone(argument), "-", ConflictHandler::Error)
                .unwrap();
        }

        registry
            .add_group(false, vec![Arc::clone(&a), Arc::clone(&b)])
            .unwrap();
        assert!(registry.add_group(false, vec![stranger]).is_err());
        assert!(registry.add_group(false, vec![required]).is_err());
        assert_eq!(registry.add_group(true, vec![]), Err(GrammarError::EmptyGroup));
    }

    #[test]
    fn command_slot_position() {
        let mut registry = Registry::default();
        let first = Argument::positional("first").build().unwrap();
        let last = Argument::positional("last").build().unwrap();

        registry
            .register(Arc::clone(&first), "-", ConflictHandler::Error)
            .unwrap();
        registry.set_subparsers(Subparsers::new()).unwrap();
        registry
            .register(Arc::clone(&last), "-", ConflictHandler::Error)
            .unwrap();

        let slots = registry.slots();
        assert!(matches!(slots[0], Slot::Argument(argument) if Arc::ptr_eq(argument, &first)));
        assert!(matches!(slots[1], Slot::Command(_)));
        assert!(matches!(slots[2], Slot::Argument(argument) if Arc::ptr_eq(argument, &last)));

        assert_eq!(
            registry.set_subparsers(Subparsers::new()).unwrap_err(),
            GrammarError::DuplicateSubparsers
        );
    }
}
