mod error;

use std::{
    env, fmt,
    io::{self, Write as _},
    process::ExitCode,
};

use anyhow::Context as _;
use lazy_format::lazy_format;
use quarrel::{
    Action, Argument, Command, Namespace, Nargs, Outcome, ParseError, Parser, Phrase, Subparsers,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::error::PlanError;

/// A pretend archiver: it works out what it would do, and says so
fn grammar() -> anyhow::Result<Parser> {
    let mut parser = Parser::new("quarrel-demo")
        .description("A pretend archiver that explains how it understood its command line.")
        .epilog("Arguments can also be read from a file with @FILE.")
        .fromfile_prefix_chars("@");

    parser.add_argument(
        Argument::optional(["-v", "--verbose"])
            .action(Action::Count)
            .help("say more; repeat for even more"),
    )?;
    parser.add_argument(
        Argument::optional(["--lang"])
            .action(Action::Language)
            .choices(["en", "fr"])
            .help("language of the diagnostics"),
    )?;
    parser.add_argument(
        Argument::optional(["-V", "--version"])
            .action(Action::Version)
            .version(format!("{{prog}} {}", env!("CARGO_PKG_VERSION")))
            .help("show the version and exit"),
    )?;
    parser.add_subparsers(Subparsers::new().required(true))?;

    let mut create = Parser::new("create");
    create.add_argument(archive())?;
    create.add_argument(
        Argument::optional(["-z", "--gzip"])
            .action(Action::StoreTrue)
            .help("compress the archive"),
    )?;
    create.add_argument(
        Argument::optional(["--exclude"])
            .action(Action::Append)
            .metavar("PATTERN")
            .help("skip paths matching PATTERN"),
    )?;
    create.add_argument(
        Argument::positional("paths")
            .nargs(Nargs::OneOrMore(1))
            .help("files and directories to archive"),
    )?;

    let mut extract = Parser::new("extract");
    extract.add_argument(archive())?;
    extract.add_argument(
        Argument::optional(["-C", "--directory"])
            .default_value(".")
            .help("where to extract to"),
    )?;
    extract.add_argument(
        Argument::positional("members")
            .nargs(Nargs::ZeroOrMore(0))
            .help("only extract these members"),
    )?;

    let mut list = Parser::new("list");
    list.add_argument(archive())?;
    list.add_argument(
        Argument::optional(["--format"])
            .choices(["short", "long"])
            .default_value("short"),
    )?;

    parser.add_subcommand(
        Command::new("create").alias("c").help("create a new archive"),
        create,
    )?;
    parser.add_subcommand(
        Command::new("extract").alias("x").help("extract an archive"),
        extract,
    )?;
    parser.add_subcommand(
        Command::new("list").alias("t").help("list an archive's contents"),
        list,
    )?;

    parser.translate("fr", Phrase::Usage, "utilisation : ");
    parser.translate("fr", Phrase::Error, "erreur");
    parser.translate(
        "fr",
        Phrase::RequiredArguments,
        "les arguments suivants sont requis : {}",
    );
    parser.translate("fr", Phrase::InvalidChoice, "choix invalide : '{}' (parmi {})");
    parser.translate("fr", Phrase::UnrecognizedArguments, "arguments inconnus : {}");

    Ok(parser)
}

fn archive() -> quarrel::ArgumentBuilder {
    Argument::optional(["-f", "--file"])
        .required(true)
        .metavar("ARCHIVE")
        .help("the archive file")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Plan {
    Create {
        archive: String,
        gzip: bool,
        exclude: Vec<String>,
        paths: Vec<String>,
    },
    Extract {
        archive: String,
        directory: String,
        members: Vec<String>,
    },
    List {
        archive: String,
        long: bool,
    },
}

impl Plan {
    fn from_namespace(namespace: &Namespace) -> Result<Self, PlanError> {
        let archive = namespace
            .value("file")
            .ok_or(PlanError::Missing("--file"))?
            .to_owned();

        let strings = |dest: &str| -> Vec<String> {
            namespace.values(dest).map(<[String]>::to_vec).unwrap_or_default()
        };

        match namespace.value("command") {
            None => Err(PlanError::NoCommand),
            Some("create") => Ok(Plan::Create {
                archive,
                gzip: namespace.flag("gzip"),
                exclude: namespace.get_all("exclude")?,
                paths: strings("paths"),
            }),
            Some("extract") => Ok(Plan::Extract {
                archive,
                directory: namespace
                    .value("directory")
                    .ok_or(PlanError::Missing("--directory"))?
                    .to_owned(),
                members: strings("members"),
            }),
            Some("list") => Ok(Plan::List {
                archive,
                long: namespace.value("format") == Some("long"),
            }),
            Some(other) => Err(PlanError::UnknownCommand(other.to_owned())),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Create {
                archive,
                gzip,
                exclude,
                paths,
            } => {
                let compression = lazy_format!(match (*gzip) {
                    true => " (gzip)",
                    false => "",
                });

                writeln!(f, "create {archive}{compression} from {}", paths.join(", "))?;

                for pattern in exclude {
                    writeln!(f, "  excluding {pattern}")?;
                }

                Ok(())
            }
            Plan::Extract {
                archive,
                directory,
                members,
            } => match members.as_slice() {
                [] => writeln!(f, "extract {archive} into {directory} (all members)"),
                members => writeln!(f, "extract {archive} into {directory}: {}", members.join(", ")),
            },
            Plan::List { archive, long } => {
                let format = lazy_format!(match (*long) {
                    true => " (long)",
                    false => "",
                });

                writeln!(f, "list {archive}{format}")
            }
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let parser = grammar().context("the command line grammar is malformed")?;
    let args = env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned());

    let result = match parser.try_parse_args(args) {
        Ok(Outcome::Parsed(result)) => result,
        Ok(Outcome::Help(text)) => {
            print!("{text}");
            return Ok(ExitCode::SUCCESS);
        }
        Ok(Outcome::Version(text)) => {
            println!("{text}");
            return Ok(ExitCode::SUCCESS);
        }
        Err(error) => {
            error
                .write_report(&mut io::stderr().lock())
                .context("failed to write the error report")?;
            return Ok(ExitCode::from(ParseError::EXIT_CODE as u8));
        }
    };

    debug!(commands = ?result.commands(), "parsed the command line");

    let namespace = result.namespace();
    let plan = Plan::from_namespace(namespace).context("the parsed arguments make no sense")?;

    let mut stdout = io::stdout().lock();

    if let verbosity @ 1.. = namespace.count("verbose") {
        writeln!(stdout, "verbosity: {verbosity}")?;
    }

    write!(stdout, "{plan}")?;

    Ok(ExitCode::SUCCESS)
}
