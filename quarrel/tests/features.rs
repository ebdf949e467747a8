use std::io::Write as _;

use pretty_assertions::assert_eq;
use quarrel::{
    Action, Argument, Command, ConflictHandler, ErrorKind, GrammarError, Nargs, Outcome,
    ParseResult, Parser, Phrase, Subparsers,
};
use tempfile::NamedTempFile;

fn parse<const N: usize>(parser: &Parser, args: [&str; N]) -> ParseResult {
    parser
        .try_parse_args(args)
        .unwrap()
        .into_parsed()
        .unwrap()
}

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn argument_files_are_spliced_in() {
    let mut parser = Parser::new("prog").fromfile_prefix_chars("@");
    parser.add_argument(Argument::optional(["--name"])).unwrap();
    parser
        .add_argument(Argument::positional("inputs").nargs(Nargs::ZeroOrMore(0)))
        .unwrap();

    let file = file_with("--name 'Jane Doe'\nfirst.txt\n");
    let reference = format!("@{}", file.path().display());

    let result = parse(&parser, [reference.as_str(), "second.txt"]);
    let namespace = result.namespace();
    assert_eq!(namespace.value("name"), Some("Jane Doe"));
    assert_eq!(
        namespace.values("inputs").unwrap(),
        ["first.txt", "second.txt"]
    );

    // After the marker, the prefix means nothing
    let result = parse(&parser, ["--", reference.as_str()]);
    assert_eq!(
        result.namespace().values("inputs").unwrap(),
        [reference.as_str()]
    );
}

#[test]
fn argument_file_failures() {
    let parser = Parser::new("prog").fromfile_prefix_chars("@");

    let error = parser
        .try_parse_args(["@/definitely/not/here.args"])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::FileNotFound);
    assert!(error.message().starts_with("can't open '/definitely/not/here.args': "));

    let unterminated = file_with("--name 'oops\n");
    let error = parser
        .try_parse_args([format!("@{}", unterminated.path().display())])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedInput);

    let mut looping = NamedTempFile::new().unwrap();
    let path = looping.path().display().to_string();
    writeln!(looping, "@{path}").unwrap();
    looping.flush().unwrap();

    let error = parser.try_parse_args([format!("@{path}")]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedInput);
    assert_eq!(error.message(), format!("'{path}' includes itself"));
}

#[test]
fn comments_are_dropped() {
    let mut parser = Parser::new("prog").comment_prefix_chars("#");
    parser
        .add_argument(Argument::positional("words").nargs(Nargs::ZeroOrMore(0)))
        .unwrap();

    let result = parse(&parser, ["a", "#note", "b", "--", "#kept"]);
    assert_eq!(result.namespace().values("words").unwrap(), ["a", "b", "#kept"]);
}

#[test]
fn short_clusters() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::optional(["-v"]).action(Action::Count))
        .unwrap();
    parser
        .add_argument(Argument::optional(["-x"]).action(Action::StoreTrue))
        .unwrap();
    parser.add_argument(Argument::optional(["-f"])).unwrap();

    let result = parse(&parser, ["-vvx"]);
    assert_eq!(result.namespace().count("v"), 2);
    assert!(result.namespace().flag("x"));

    let result = parse(&parser, ["-vfout.txt"]);
    assert_eq!(result.namespace().count("v"), 1);
    assert_eq!(result.namespace().value("f"), Some("out.txt"));

    let error = parser.try_parse_args(["-vq"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ArityMismatch);
    assert_eq!(error.message(), "argument -v: ignored explicit argument 'q'");

    let error = parser.try_parse_args(["-x=yes"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ArityMismatch);
    assert_eq!(error.message(), "argument -x: ignored explicit argument 'yes'");
}

#[test]
fn negative_numbers_are_values() {
    let mut parser = Parser::new("prog");
    parser.add_argument(Argument::optional(["-x"])).unwrap();
    parser
        .add_argument(Argument::positional("numbers").nargs(Nargs::ZeroOrMore(0)))
        .unwrap();

    let result = parse(&parser, ["-x", "-5", "-1.5", "-.25"]);
    let namespace = result.namespace();
    assert_eq!(namespace.get::<i32>("x"), Ok(Some(-5)));
    assert_eq!(namespace.get_all::<f64>("numbers").unwrap(), [-1.5, -0.25]);
}

#[test]
fn negative_number_flags_take_precedence() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(
            Argument::optional(["-1"])
                .dest("one")
                .action(Action::StoreTrue),
        )
        .unwrap();
    parser
        .add_argument(Argument::positional("rest").nargs(Nargs::ZeroOrMore(0)))
        .unwrap();

    let result = parse(&parser, ["-1"]);
    assert!(result.namespace().flag("one"));

    // Not a registered flag, so still a value
    let result = parse(&parser, ["-2", "-1"]);
    assert_eq!(result.namespace().values("rest").unwrap(), ["-2"]);
    assert!(result.namespace().flag("one"));
}

#[test]
fn boolean_toggles() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::optional(["--color"]).action(Action::BooleanToggle))
        .unwrap();

    assert!(parse(&parser, ["--color"]).namespace().flag("color"));
    assert_eq!(
        parse(&parser, ["--no-color"]).namespace().value("color"),
        Some("false")
    );
    assert_eq!(
        parse(&parser, ["--no-color", "--color"]).namespace().value("color"),
        Some("true")
    );
    assert!(!parse(&parser, []).namespace().contains("color"));
}

#[test]
fn append_keeps_groups() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(
            Argument::optional(["-i", "--include"])
                .action(Action::Append)
                .nargs(Nargs::OneOrMore(1)),
        )
        .unwrap();

    let result = parse(&parser, ["-i", "a", "b", "--include", "c"]);
    let namespace = result.namespace();
    assert_eq!(namespace.values("include").unwrap(), ["a", "b", "c"]);
    assert_eq!(
        namespace.groups("include"),
        [&["a".to_owned(), "b".to_owned()][..], &["c".to_owned()][..]]
    );
    assert_eq!(namespace.count("include"), 2);
}

#[test]
fn language_switch_translates_later_diagnostics() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::optional(["--lang"]).action(Action::Language))
        .unwrap();
    parser
        .add_argument(Argument::optional(["--name"]).required(true))
        .unwrap();
    parser.translate("fr", Phrase::Error, "erreur");
    parser.translate("fr", Phrase::RequiredArguments, "arguments requis : {}");

    let error = parser.try_parse_args(["--lang", "fr"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MissingRequiredArguments);
    assert_eq!(error.message(), "arguments requis : --name");
    assert!(error.report().to_string().contains("prog: erreur: arguments requis"));

    let error = parser.try_parse_args(["--lang", "de"]).unwrap_err();
    assert_eq!(
        error.message(),
        "the following arguments are required: --name"
    );

    let result = parse(&parser, ["--lang", "fr", "--name", "x"]);
    assert_eq!(result.namespace().value("lang"), Some("fr"));

    let mut french = Parser::new("prog").language("fr");
    french
        .add_argument(Argument::optional(["--name"]).required(true))
        .unwrap();
    french.translate("fr", Phrase::RequiredArguments, "arguments requis : {}");
    assert_eq!(
        french.try_parse_args([] as [&str; 0]).unwrap_err().message(),
        "arguments requis : --name"
    );
}

#[test]
fn language_switch_stays_in_its_subcommand() {
    let mut root = Parser::new("prog");
    root.add_argument(Argument::optional(["--name"]).required(true))
        .unwrap();
    root.add_subparsers(Subparsers::new()).unwrap();

    let mut sub = Parser::new("sub");
    sub.add_argument(Argument::optional(["--lang"]).action(Action::Language))
        .unwrap();
    root.add_subcommand(Command::new("sub"), sub).unwrap();
    root.translate("fr", Phrase::RequiredArguments, "arguments requis : {}");
    root.translate("fr", Phrase::UnrecognizedArguments, "arguments inconnus : {}");

    let error = root.try_parse_args(["sub", "--lang", "fr"]).unwrap_err();
    assert_eq!(error.prog(), "prog");
    assert_eq!(
        error.message(),
        "the following arguments are required: --name"
    );

    let error = root
        .try_parse_args(["--name", "x", "sub", "--lang", "fr", "--", "extra"])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnrecognizedArguments);
    assert_eq!(error.message(), "unrecognized arguments: extra");
}

#[test]
fn conflicting_flags() {
    let mut strict = Parser::new("prog");
    strict.add_argument(Argument::optional(["-f", "--foo"])).unwrap();
    let error = strict
        .add_argument(Argument::optional(["--foo"]).dest("other"))
        .unwrap_err();
    assert!(matches!(error, GrammarError::ConflictingOption { .. }));
    assert_eq!(error.kind(), ErrorKind::ConflictingOption);

    let mut lenient = Parser::new("prog").conflict_handler(ConflictHandler::Resolve);
    lenient.add_argument(Argument::optional(["-f", "--foo"])).unwrap();
    lenient
        .add_argument(
            Argument::optional(["--foo"])
                .dest("other")
                .action(Action::StoreTrue),
        )
        .unwrap();

    let result = parse(&lenient, ["-f", "x", "--foo"]);
    assert_eq!(result.namespace().value("foo"), Some("x"));
    assert!(result.namespace().flag("other"));

    // Losing every flag drops the argument entirely
    lenient
        .add_argument(Argument::optional(["-f"]).dest("third").action(Action::Count))
        .unwrap();
    assert!(
        lenient
            .registry()
            .optionals()
            .iter()
            .all(|argument| argument.dest() != "foo")
    );
}

#[test]
fn operands() {
    let mut parser = Parser::new("copy");
    parser.add_argument(Argument::operand("if")).unwrap();
    parser
        .add_argument(Argument::operand("of").default_value("out.img"))
        .unwrap();

    let result = parse(&parser, ["if=disk.img"]);
    assert_eq!(result.namespace().value("if"), Some("disk.img"));
    assert_eq!(result.namespace().value("of"), Some("out.img"));

    let error = parser.try_parse_args(["bs=4"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnrecognizedArguments);
}

#[test]
fn known_args_are_returned() {
    let mut parser = Parser::new("prog");
    parser.add_argument(Argument::optional(["--name"])).unwrap();

    let result = parser
        .try_parse_known_args(["--name", "x", "--extra", "y"])
        .unwrap()
        .into_parsed()
        .unwrap();

    assert_eq!(result.namespace().value("name"), Some("x"));
    assert_eq!(result.unrecognized(), ["--extra", "y"]);

    let error = parser
        .try_parse_args(["--name", "x", "--extra", "y"])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnknownFlag);
    assert_eq!(error.message(), "unrecognized arguments: --extra y");
}

#[test]
fn unbounded_slot_wins_over_optional_slot() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::positional("maybe").nargs(Nargs::ZeroOrOne(1)))
        .unwrap();
    parser
        .add_argument(Argument::positional("rest").nargs(Nargs::ZeroOrMore(0)))
        .unwrap();

    let result = parse(&parser, ["1", "2", "3"]);
    assert!(!result.namespace().contains("maybe"));
    assert_eq!(result.namespace().values("rest").unwrap(), ["1", "2", "3"]);
}

#[test]
fn positional_runs_are_split_by_flags() {
    let mut parser = Parser::new("prog");
    parser.add_argument(Argument::optional(["-f"])).unwrap();
    parser.add_argument(Argument::positional("first")).unwrap();
    parser.add_argument(Argument::positional("second")).unwrap();

    let result = parse(&parser, ["a", "-f", "x", "b"]);
    let namespace = result.namespace();
    assert_eq!(namespace.value("first"), Some("a"));
    assert_eq!(namespace.value("f"), Some("x"));
    assert_eq!(namespace.value("second"), Some("b"));
}

#[test]
fn remainder_takes_everything() {
    let mut parser = Parser::new("run");
    parser.add_argument(Argument::optional(["-v"]).action(Action::Count)).unwrap();
    parser.add_argument(Argument::positional("program")).unwrap();
    parser
        .add_argument(Argument::positional("args").nargs(Nargs::Remainder))
        .unwrap();

    let result = parse(&parser, ["-v", "ls", "-la", "--", "x"]);
    let namespace = result.namespace();
    assert_eq!(namespace.count("v"), 1);
    assert_eq!(namespace.value("program"), Some("ls"));
    assert_eq!(namespace.values("args").unwrap(), ["-la", "--", "x"]);
}

#[test]
fn choices_are_checked() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::optional(["--mode"]).choices(["fast", "slow"]))
        .unwrap();

    assert_eq!(parse(&parser, ["--mode", "slow"]).namespace().value("mode"), Some("slow"));

    let error = parser.try_parse_args(["--mode", "medium"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidChoice);
    assert_eq!(
        error.message(),
        "argument --mode: invalid choice: 'medium' (choose from 'fast', 'slow')"
    );
}

#[test]
fn exclusive_groups() {
    let mut parser = Parser::new("prog");
    let a = parser
        .add_argument(Argument::optional(["-a"]).action(Action::StoreTrue))
        .unwrap();
    let b = parser
        .add_argument(Argument::optional(["-b"]).action(Action::StoreTrue))
        .unwrap();
    parser.add_exclusive_group(true, &[a, b]).unwrap();

    assert!(parse(&parser, ["-b"]).namespace().flag("b"));

    let error = parser.try_parse_args(["-b", "-a"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MutuallyExclusiveViolation);
    assert_eq!(error.message(), "argument -a: not allowed with argument -b");

    let error = parser.try_parse_args([] as [&str; 0]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MissingRequiredArguments);
    assert_eq!(error.message(), "one of the arguments -a -b is required");
}

fn tool() -> Parser {
    let mut root = Parser::new("tool");
    root.add_argument(Argument::optional(["--level"]).default_value("1"))
        .unwrap();
    root.add_subparsers(Subparsers::new().dest("action").required(true))
        .unwrap();

    let mut add = Parser::new("add");
    add.add_argument(Argument::optional(["--force"]).action(Action::StoreTrue))
        .unwrap();
    add.add_argument(Argument::positional("paths").nargs(Nargs::OneOrMore(1)))
        .unwrap();

    root.add_subcommand(Command::new("add").alias("a").help("stage paths"), add)
        .unwrap();
    root.add_subcommand(Command::new("remove"), Parser::new("remove"))
        .unwrap();

    root
}

#[test]
fn subcommand_results_merge_into_the_root() {
    let root = tool();

    let result = parse(&root, ["--level", "2", "a", "x", "y"]);
    let namespace = result.namespace();
    assert_eq!(result.commands(), ["add"]);
    assert_eq!(namespace.value("action"), Some("add"));
    assert_eq!(namespace.value("level"), Some("2"));
    assert_eq!(namespace.values("paths").unwrap(), ["x", "y"]);
    assert!(!namespace.flag("force"));

    let result = parse(&root, ["remove"]);
    assert_eq!(result.namespace().value("level"), Some("1"));
    assert!(!result.namespace().contains("paths"));
}

#[test]
fn subcommand_errors() {
    let root = tool();

    let error = root.try_parse_args(["nope"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidSubcommand);
    assert_eq!(
        error.message(),
        "argument {add,remove}: invalid choice: 'nope' (choose from 'add', 'a', 'remove')"
    );

    let error = root.try_parse_args([] as [&str; 0]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MissingRequiredArguments);
    assert_eq!(
        error.message(),
        "the following arguments are required: {add,remove}"
    );

    // Errors inside a sub-command carry its own program name
    let error = root.try_parse_args(["add"]).unwrap_err();
    assert_eq!(error.prog(), "tool add");
    assert_eq!(error.message(), "the following arguments are required: paths");
}

#[test]
fn help_and_version_stop_the_parse() {
    let mut root = tool();
    root.add_argument(
        Argument::optional(["-V", "--version"])
            .action(Action::Version)
            .version("{prog} 1.2.0"),
    )
    .unwrap();

    match root.try_parse_args(["-h", "--bogus"]).unwrap() {
        Outcome::Help(text) => assert_eq!(text, root.format_help()),
        other => panic!("expected help, got {other:?}"),
    }

    match root.try_parse_args(["--version"]).unwrap() {
        Outcome::Version(text) => assert_eq!(text, "tool 1.2.0"),
        other => panic!("expected a version, got {other:?}"),
    }

    match root.try_parse_args(["add", "--help"]).unwrap() {
        Outcome::Help(text) => {
            assert!(text.starts_with("usage: tool add [-h] [--force] paths [paths ...]\n"));
        }
        other => panic!("expected help, got {other:?}"),
    }
}

#[test]
fn whole_lines_are_split() {
    let mut parser = Parser::new("prog");
    parser.add_argument(Argument::optional(["--name"])).unwrap();

    let result = parser
        .try_parse_line(r#"--name "Jane Doe""#)
        .unwrap()
        .into_parsed()
        .unwrap();
    assert_eq!(result.namespace().value("name"), Some("Jane Doe"));

    let error = parser.try_parse_line("--name 'Jane").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedInput);
}
