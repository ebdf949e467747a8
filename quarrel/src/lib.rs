/*!
A command-line argument grammar and matching engine. You declare the
arguments a program expects (flags, positional slots with repetition
policies, sub-commands, mutually exclusive groups) on a [`Parser`], hand it
the raw tokens, and get back a [`Namespace`] of raw values, or a
[`ParseError`] saying precisely why the tokens don't fit the grammar.

```
use quarrel::{Action, Argument, Command, Nargs, Parser, Subparsers};

let mut parser = Parser::new("vcs");
parser.add_argument(Argument::optional(["-v", "--verbose"]).action(Action::Count)).unwrap();
parser.add_subparsers(Subparsers::new().required(true)).unwrap();

let mut commit = Parser::new("commit");
commit.add_argument(Argument::optional(["-m", "--message"]).required(true)).unwrap();
commit.add_argument(Argument::positional("paths").nargs(Nargs::ZeroOrMore(0))).unwrap();
parser.add_subcommand(Command::new("commit").alias("ci"), commit).unwrap();

let result = parser
    .try_parse_args(["-vv", "ci", "-m", "first", "a.txt", "b.txt"])
    .unwrap()
    .into_parsed()
    .unwrap();

assert_eq!(result.commands(), ["commit"]);

let namespace = result.namespace();
assert_eq!(namespace.count("verbose"), 2);
assert_eq!(namespace.value("command"), Some("commit"));
assert_eq!(namespace.value("message"), Some("first"));
assert_eq!(namespace.values("paths").unwrap(), ["a.txt", "b.txt"]);
```

Matching is strictly left to right. Flags are resolved exactly, then by
`--name=value`, then by short cluster or unambiguous abbreviation. Runs of
positional tokens are distributed over the positional slots by the
[`allocator`], which can be used on its own. Values stay strings; the
[`Namespace`] accessors convert them with [`FromStr`][std::str::FromStr] on
request.

Parsing emits [`tracing`] events: `debug` for sub-command dispatch, argument
files and positional allocation, and `trace` for every classified token.
*/

pub mod allocator;
mod argument;
mod engine;
mod error;
mod language;
mod matcher;
mod namespace;
mod parser;
mod preprocess;
mod printers;
mod registry;
mod storage;
mod validate;

pub use argument::{Action, Argument, ArgumentBuilder, Kind, Nargs};
pub use error::{ErrorKind, GrammarError, ParseError};
pub use language::{Catalog, Phrase, fill};
pub use namespace::{Namespace, ValueError};
pub use parser::{ConflictHandler, Outcome, ParseResult, Parser, ParserSettings};
pub use registry::{Command, ExclusiveGroup, Registry, Subparsers, SubparsersSlot};
pub use storage::{ArgKey, Cell, Storage};
