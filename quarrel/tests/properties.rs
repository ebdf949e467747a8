use pretty_assertions::assert_eq;
use quarrel::{Action, Argument, ErrorKind, Nargs, Namespace, ParseResult, Parser, Storage};

fn parse(parser: &Parser, args: &[&str]) -> ParseResult {
    parser
        .try_parse_args(args.iter().copied())
        .unwrap()
        .into_parsed()
        .unwrap()
}

/// The observable content of a namespace, without input ordering details
fn snapshot(namespace: &Namespace) -> Vec<(String, Vec<String>, usize, bool)> {
    namespace
        .iter()
        .map(|(dest, cell)| {
            (
                dest.to_owned(),
                cell.values().to_vec(),
                cell.count(),
                cell.is_present(),
            )
        })
        .collect()
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }

    let mut out = Vec::new();

    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);

        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }

    out
}

#[test]
fn flag_order_does_not_matter() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::optional(["-a"]).action(Action::StoreTrue))
        .unwrap();
    parser.add_argument(Argument::optional(["--name"])).unwrap();
    parser
        .add_argument(Argument::optional(["-v"]).action(Action::Count))
        .unwrap();
    parser
        .add_argument(Argument::optional(["--tag"]).action(Action::Extend))
        .unwrap();

    let groups: Vec<&[&str]> = vec![&["-a"], &["--name", "x"], &["-v"], &["--tag", "t"]];

    let orders = permutations(&groups);
    assert_eq!(orders.len(), 24);

    let expected = snapshot(parse(&parser, &["-a", "--name", "x", "-v", "--tag", "t"]).namespace());

    for order in orders {
        let args: Vec<&str> = order.concat();
        assert_eq!(snapshot(parse(&parser, &args).namespace()), expected, "{args:?}");
    }
}

#[test]
fn exact_arity_is_enforced() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::optional(["--point"]).nargs(Nargs::Exactly(3)))
        .unwrap();

    let result = parse(&parser, &["--point", "1", "2", "3"]);
    assert_eq!(
        result.namespace().get_all::<i32>("point").unwrap(),
        [1, 2, 3]
    );

    let error = parser
        .try_parse_args(["--point", "1", "2"])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ArityMismatch);
    assert_eq!(error.message(), "argument --point: expected 3 arguments");

    let error = parser
        .try_parse_args(["--point", "1", "2", "3", "4"])
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnrecognizedArguments);
    assert_eq!(error.message(), "unrecognized arguments: 4");
}

#[test]
fn exact_positional_is_never_partially_filled() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::positional("pair").nargs(Nargs::Exactly(2)))
        .unwrap();

    let error = parser.try_parse_args(["x"]).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MissingRequiredArguments);
    assert_eq!(error.message(), "the following arguments are required: pair");

    let result = parse(&parser, &["x", "y"]);
    assert_eq!(result.namespace().values("pair").unwrap(), ["x", "y"]);
}

#[test]
fn one_or_more_absorbs_the_whole_run() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::positional("items").nargs(Nargs::OneOrMore(1)))
        .unwrap();

    let tokens = ["a", "b", "c", "d", "e"];

    for k in 1..=tokens.len() {
        let result = parse(&parser, &tokens[..k]);
        assert_eq!(result.namespace().values("items").unwrap(), &tokens[..k]);
    }
}

#[test]
fn minimums_come_first() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::positional("maybe").nargs(Nargs::ZeroOrOne(1)))
        .unwrap();
    parser.add_argument(Argument::positional("one")).unwrap();

    let result = parse(&parser, &["x"]);
    assert!(!result.namespace().contains("maybe"));
    assert_eq!(result.namespace().value("one"), Some("x"));

    let result = parse(&parser, &["x", "y"]);
    assert_eq!(result.namespace().value("maybe"), Some("x"));
    assert_eq!(result.namespace().value("one"), Some("y"));
}

#[test]
fn attached_values_are_kept_verbatim() {
    let mut parser = Parser::new("prog");
    parser.add_argument(Argument::optional(["-o", "--opt"])).unwrap();
    parser.add_argument(Argument::operand("level")).unwrap();

    for value in ["plain", "a=b", "", "with space", "-dash", "--"] {
        let long = format!("--opt={value}");
        let result = parse(&parser, &[long.as_str()]);
        assert_eq!(result.namespace().values("opt").unwrap(), [value]);

        let operand = format!("level={value}");
        let result = parse(&parser, &[operand.as_str()]);
        assert_eq!(result.namespace().values("level").unwrap(), [value]);
    }

    let result = parse(&parser, &["-ovalue"]);
    assert_eq!(result.namespace().value("opt"), Some("value"));
}

#[test]
fn validation_is_idempotent() {
    let mut parser = Parser::new("prog");
    parser
        .add_argument(Argument::optional(["--level"]).default_value("3"))
        .unwrap();
    parser
        .add_argument(Argument::optional(["-q"]).action(Action::StoreFalse))
        .unwrap();
    parser
        .add_argument(Argument::positional("input").nargs(Nargs::ZeroOrOne(1)))
        .unwrap();

    let result = parse(&parser, &["in.txt"]);
    let mut storage: Storage = result.storage().clone();

    parser.validate(&mut storage).unwrap();
    let once: Vec<_> = storage
        .iter()
        .map(|(argument, cell)| (argument.dest().to_owned(), cell.clone()))
        .collect();

    parser.validate(&mut storage).unwrap();
    let twice: Vec<_> = storage
        .iter()
        .map(|(argument, cell)| (argument.dest().to_owned(), cell.clone()))
        .collect();

    assert_eq!(once, twice);

    let namespace = result.namespace();
    assert_eq!(namespace.get::<u32>("level"), Ok(Some(3)));
    assert!(namespace.flag("q"));
    assert_eq!(namespace.value("input"), Some("in.txt"));
}
