/*!
The parser: a grammar (its [`Registry`]), the [`ParserSettings`] it was built
with, and the translations it uses for diagnostics. Parsing comes in two
flavors:

- the `try_*` methods never touch the process. Help and Version requests come
  back as an [`Outcome`], and grammar violations as a [`ParseError`].
- the others print help or the error report and exit, returning only on a
  successful parse.
*/

use std::{env, path::Path, process, sync::Arc};

use joinery::JoinableIterator;
use quarrel_lexer::{is_negative_number, split_words};
use tracing::debug;

use crate::{
    argument::{Action, Argument, ArgumentBuilder},
    engine::{Engine, Finished, Interrupt},
    error::{ErrorKind, GrammarError, ParseError},
    language::{Catalog, Phrase, Phrasebook},
    namespace::Namespace,
    preprocess::{Failure, preprocess},
    printers,
    registry::{Command, Registry, Subparsers},
    storage::Storage,
    validate::validate,
};

/// What to do when a new argument claims a flag that's already taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictHandler {
    /// Refuse the new argument with [`GrammarError::ConflictingOption`]
    #[default]
    Error,

    /// The new argument takes the flag over. An older argument left without
    /// any flag is dropped.
    Resolve,
}

/// Parser-wide configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// The program name shown in usage and error reports
    pub prog: String,
    pub description: Option<String>,
    pub epilog: Option<String>,

    /// Characters that start a flag
    pub prefix_chars: String,

    /// Characters that mark a token as the name of a file of arguments, like
    /// `@` for `@args.txt`. Empty turns argument files off.
    pub fromfile_prefix_chars: String,

    /// Characters that mark a token as a comment to be dropped
    pub comment_prefix_chars: String,

    /// Accept unambiguous prefixes of long flags
    pub allow_abbrev: bool,

    /// Inject `-h/--help`
    pub add_help: bool,
    pub conflict_handler: ConflictHandler,

    /// The diagnostics language a parse starts in; English when `None` or
    /// when the catalog has no translation for a phrase
    pub language: Option<String>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        let prog = env::args_os()
            .next()
            .as_deref()
            .map(Path::new)
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prog".to_owned());

        Self {
            prog,
            description: None,
            epilog: None,
            prefix_chars: "-".to_owned(),
            fromfile_prefix_chars: String::new(),
            comment_prefix_chars: String::new(),
            allow_abbrev: true,
            add_help: true,
            conflict_handler: ConflictHandler::Error,
            language: None,
        }
    }
}

/// The successful result of a parse
#[derive(Debug, Clone)]
pub struct ParseResult {
    namespace: Namespace,
    storage: Storage,
    unrecognized: Vec<String>,
    commands: Vec<String>,
}

impl ParseResult {
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    #[must_use]
    pub fn into_namespace(self) -> Namespace {
        self.namespace
    }

    /// The per-argument cells, keyed by argument identity
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Tokens nothing accepted. Always empty unless the parse was a
    /// known-args parse.
    #[inline]
    #[must_use]
    pub fn unrecognized(&self) -> &[String] {
        &self.unrecognized
    }

    /// The canonical names of the sub-commands entered, outermost first
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

/// How a non-exiting parse ended
#[derive(Debug, Clone)]
pub enum Outcome {
    Parsed(ParseResult),

    /// Help was requested; this is the text to print
    Help(String),

    /// The version was requested; this is the text to print
    Version(String),
}

impl Outcome {
    /// The result of the parse, if it wasn't cut short by Help or Version
    #[must_use]
    pub fn into_parsed(self) -> Option<ParseResult> {
        match self {
            Outcome::Parsed(result) => Some(result),
            Outcome::Help(_) | Outcome::Version(_) => None,
        }
    }
}

/**
A command-line grammar and the entry point for parsing against it.

```
use quarrel::{Action, Argument, Nargs, Parser};

let mut parser = Parser::new("cp");
parser.add_argument(Argument::optional(["-r", "--recursive"]).action(Action::StoreTrue)).unwrap();
parser.add_argument(Argument::positional("source").nargs(Nargs::OneOrMore(1))).unwrap();
parser.add_argument(Argument::positional("dest")).unwrap();

let result = parser.try_parse_args(["-r", "a", "b", "c"]).unwrap().into_parsed().unwrap();
let namespace = result.namespace();

assert!(namespace.flag("recursive"));
assert_eq!(namespace.values("source").unwrap(), ["a", "b"]);
assert_eq!(namespace.value("dest"), Some("c"));
```
*/
#[derive(Debug, Clone)]
pub struct Parser {
    settings: ParserSettings,
    registry: Registry,
    catalog: Catalog,
}

impl Parser {
    /// A parser with default settings and the given program name
    pub fn new(prog: impl Into<String>) -> Self {
        let settings = ParserSettings {
            prog: prog.into(),
            ..ParserSettings::default()
        };

        Self::assemble(settings)
    }

    /// A parser with custom settings. Fails if `prefix_chars` is empty or
    /// contains an alphanumeric character.
    pub fn with_settings(settings: ParserSettings) -> Result<Self, GrammarError> {
        if settings.prefix_chars.is_empty()
            || settings.prefix_chars.chars().any(char::is_alphanumeric)
        {
            return Err(GrammarError::InvalidPrefixChars {
                prefix_chars: settings.prefix_chars,
            });
        }

        Ok(Self::assemble(settings))
    }

    fn assemble(settings: ParserSettings) -> Self {
        let mut parser = Self {
            settings,
            registry: Registry::default(),
            catalog: Catalog::default(),
        };

        if parser.settings.add_help {
            let prefix_chars = &parser.settings.prefix_chars;
            let prefix = match prefix_chars.contains('-') {
                true => Some('-'),
                false => prefix_chars.chars().next(),
            };

            if let Some(prefix) = prefix {
                parser.registry.seed_help(Argument::help_flag(prefix));
            }
        }

        parser
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.settings.description = Some(description.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.settings.epilog = Some(epilog.into());
        self
    }

    pub fn allow_abbrev(mut self, allow: bool) -> Self {
        self.settings.allow_abbrev = allow;
        self
    }

    pub fn fromfile_prefix_chars(mut self, chars: impl Into<String>) -> Self {
        self.settings.fromfile_prefix_chars = chars.into();
        self
    }

    pub fn comment_prefix_chars(mut self, chars: impl Into<String>) -> Self {
        self.settings.comment_prefix_chars = chars.into();
        self
    }

    pub fn conflict_handler(mut self, handler: ConflictHandler) -> Self {
        self.settings.conflict_handler = handler;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.settings.language = Some(language.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn prog(&self) -> &str {
        &self.settings.prog
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn book<'a>(&'a self, language: Option<&'a str>) -> Phrasebook<'a> {
        Phrasebook::new(&self.catalog, language)
    }

    /// Build and register an argument, returning the shared handle so it can
    /// be put in a group or registered with other parsers
    pub fn add_argument(&mut self, builder: ArgumentBuilder) -> Result<Arc<Argument>, GrammarError> {
        let argument = builder.build()?;
        self.add_shared(Arc::clone(&argument))?;
        Ok(argument)
    }

    /// Register an argument that's already built, possibly one registered
    /// with another parser too. Both parsers then write to the same cell.
    pub fn add_shared(&mut self, argument: Arc<Argument>) -> Result<(), GrammarError> {
        debug!(
            prog = self.prog(),
            dest = argument.dest(),
            kind = %argument.kind(),
            "registering argument"
        );

        self.registry.register(
            argument,
            &self.settings.prefix_chars,
            self.settings.conflict_handler,
        )
    }

    /// Copy every argument and exclusive group of `parents` into this parser.
    /// Their help flags are skipped.
    pub fn add_parents<'a>(
        &mut self,
        parents: impl IntoIterator<Item = &'a Parser>,
    ) -> Result<(), GrammarError> {
        for parent in parents {
            let registry = &parent.registry;
            let arguments = registry
                .positionals()
                .iter()
                .chain(registry.optionals())
                .chain(registry.operands())
                .filter(|argument| argument.action() != Action::Help);

            for argument in arguments {
                self.add_shared(Arc::clone(argument))?;
            }

            for group in registry.groups() {
                self.add_exclusive_group(group.is_required(), group.members())?;
            }
        }

        Ok(())
    }

    /// At most one of `members` may be given; if `required`, exactly one
    /// must be
    pub fn add_exclusive_group(
        &mut self,
        required: bool,
        members: &[Arc<Argument>],
    ) -> Result<(), GrammarError> {
        self.registry.add_group(required, members.to_vec())
    }

    /// Open the sub-command slot, at the current end of the positionals
    pub fn add_subparsers(&mut self, subparsers: Subparsers) -> Result<(), GrammarError> {
        self.registry.set_subparsers(subparsers)
    }

    /// Attach a sub-command. Its program name becomes `prog name`, and it
    /// picks up every translation it doesn't already have.
    pub fn add_subcommand(&mut self, command: Command, mut parser: Parser) -> Result<(), GrammarError> {
        parser.set_prog(format!("{} {}", self.prog(), command.name()));
        parser.inherit_catalog(&self.catalog);

        self.registry.add_subcommand(command, parser)
    }

    fn set_prog(&mut self, prog: String) {
        if let Some(subparsers) = self.registry.subparsers_mut() {
            for subcommand in subparsers.commands_mut() {
                subcommand
                    .parser
                    .set_prog(format!("{prog} {}", subcommand.command.name()));
            }
        }

        self.settings.prog = prog;
    }

    fn inherit_catalog(&mut self, catalog: &Catalog) {
        self.catalog.inherit(catalog);

        if let Some(subparsers) = self.registry.subparsers_mut() {
            for subcommand in subparsers.commands_mut() {
                subcommand.parser.inherit_catalog(catalog);
            }
        }
    }

    /// Add a translation, here and in every sub-command
    pub fn translate(&mut self, language: &str, phrase: Phrase, template: &str) {
        self.catalog.insert(language, phrase, template);

        if let Some(subparsers) = self.registry.subparsers_mut() {
            for subcommand in subparsers.commands_mut() {
                subcommand.parser.translate(language, phrase, template);
            }
        }
    }

    pub(crate) fn error(
        &self,
        language: Option<&str>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> ParseError {
        let book = self.book(language);

        ParseError::new(
            kind,
            message,
            self.prog(),
            printers::usage(self, book),
            book.get(Phrase::Error),
        )
    }

    /// The usage synopsis, without a trailing newline
    #[must_use]
    pub fn format_usage(&self) -> String {
        printers::usage(self, self.book(self.settings.language.as_deref()))
    }

    #[must_use]
    pub fn format_help(&self) -> String {
        self.format_help_in(self.settings.language.as_deref())
    }

    pub(crate) fn format_help_in(&self, language: Option<&str>) -> String {
        printers::help(self, self.book(language)).to_string()
    }

    /// Run the end-of-parse checks on a storage and fill in defaults. Running
    /// it again on a storage it accepted changes nothing.
    pub fn validate(&self, storage: &mut Storage) -> Result<(), ParseError> {
        let language = self.settings.language.as_deref();

        validate(&self.registry, storage, self.book(language))
            .map_err(|violation| self.error(language, violation.kind, violation.message))
    }

    fn preprocess_failure(&self, failure: Failure) -> ParseError {
        let book = self.book(self.settings.language.as_deref());

        let (kind, message) = match failure {
            Failure::Unreadable { path, source } => (
                ErrorKind::FileNotFound,
                book.fill(Phrase::CantOpen, &[&path.display(), &source]),
            ),
            Failure::Malformed { path, source } => (
                ErrorKind::MalformedInput,
                book.fill(Phrase::CantSplit, &[&path.display(), &source]),
            ),
            Failure::Recursive { path } => (
                ErrorKind::MalformedInput,
                book.fill(Phrase::IncludesItself, &[&path.display()]),
            ),
        };

        self.error(self.settings.language.as_deref(), kind, message)
    }

    /// Parse, handing back tokens nothing accepted instead of failing on them
    pub fn try_parse_known_args<I, S>(&self, args: I) -> Result<Outcome, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.run(args)? {
            Ok(finished) => Ok(Outcome::Parsed(finished.into_result())),
            Err(interrupted) => Ok(interrupted),
        }
    }

    /// Parse, failing if any token was left unrecognized
    pub fn try_parse_args<I, S>(&self, args: I) -> Result<Outcome, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let finished = match self.run(args)? {
            Ok(finished) => finished,
            Err(interrupted) => return Ok(interrupted),
        };

        if let Some(first) = finished.unrecognized.first() {
            let prefix_chars = &self.settings.prefix_chars;
            let kind = match first.starts_with(|c: char| prefix_chars.contains(c))
                && first.len() > 1
                && !is_negative_number(first)
            {
                true => ErrorKind::UnknownFlag,
                false => ErrorKind::UnrecognizedArguments,
            };

            let language = finished.language.as_deref();
            let message = self.book(language).fill(
                Phrase::UnrecognizedArguments,
                &[&finished.unrecognized.iter().join_with(" ")],
            );

            return Err(self.error(language, kind, message));
        }

        Ok(Outcome::Parsed(finished.into_result()))
    }

    /// Split a whole command line into words, then parse it
    pub fn try_parse_line(&self, line: &str) -> Result<Outcome, ParseError> {
        let words = split_words(line).map_err(|error| {
            let language = self.settings.language.as_deref();
            let message = self.book(language).fill(Phrase::CantSplit, &[&line, &error]);
            self.error(language, ErrorKind::MalformedInput, message)
        })?;

        self.try_parse_args(words)
    }

    /// Preprocess and match. The inner result is `Err` when the walk was
    /// cut short by Help or Version.
    fn run<I, S>(&self, args: I) -> Result<Result<Finished, Outcome>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        let tokens = preprocess(&self.settings, tokens)
            .map_err(|failure| self.preprocess_failure(failure))?;

        debug!(prog = self.prog(), tokens = tokens.len(), "parsing");

        match Engine::new(self, &tokens).run() {
            Ok(finished) => Ok(Ok(finished)),
            Err(Interrupt::Help(text)) => Ok(Err(Outcome::Help(text))),
            Err(Interrupt::Version(text)) => Ok(Err(Outcome::Version(text))),
            Err(Interrupt::Failed(error)) => Err(error),
        }
    }

    fn exit_on(&self, outcome: Result<Outcome, ParseError>) -> ParseResult {
        match outcome {
            Ok(Outcome::Parsed(result)) => result,
            Ok(Outcome::Help(text)) => {
                print!("{text}");
                process::exit(0);
            }
            Ok(Outcome::Version(text)) => {
                println!("{text}");
                process::exit(0);
            }
            Err(error) => {
                eprint!("{}", error.report());
                process::exit(ParseError::EXIT_CODE);
            }
        }
    }

    /// Parse, exiting the process on Help, Version or a grammar violation
    pub fn parse_args<I, S>(&self, args: I) -> ParseResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exit_on(self.try_parse_args(args))
    }

    /// Like [`parse_args`][Self::parse_args], but unrecognized tokens are
    /// returned in the result
    pub fn parse_known_args<I, S>(&self, args: I) -> ParseResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exit_on(self.try_parse_known_args(args))
    }

    pub fn parse_line(&self, line: &str) -> ParseResult {
        self.exit_on(self.try_parse_line(line))
    }

    /// Parse the process's own arguments
    pub fn parse_env(&self) -> ParseResult {
        self.parse_args(env::args_os().skip(1).map(|arg| arg.to_string_lossy().into_owned()))
    }
}

impl Finished {
    fn into_result(self) -> ParseResult {
        ParseResult {
            namespace: Namespace::from_storage(&self.storage),
            storage: self.storage,
            unrecognized: self.unrecognized,
            commands: self.commands,
        }
    }
}
