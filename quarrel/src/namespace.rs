use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use crate::storage::{Cell, Storage};

/// A value in the namespace couldn't be converted to the requested type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("{dest}: failed to parse {value:?}: {message}")]
    Parse {
        dest: String,
        value: String,
        message: String,
    },
}

/**
The frozen, read-only result of a parse, keyed by destination. When several
arguments share a destination, the one touched last by the command line wins;
an argument that only holds a default never beats one that was given.

```
use quarrel::{Action, Argument, Parser};

let mut parser = Parser::new("prog");
parser.add_argument(Argument::optional(["-v"]).action(Action::Count)).unwrap();
parser.add_argument(Argument::optional(["--level"]).default_value("3")).unwrap();

let result = parser.try_parse_args(["-vv"]).unwrap().into_parsed().unwrap();
let namespace = result.namespace();

assert_eq!(namespace.count("v"), 2);
assert_eq!(namespace.get::<u8>("level"), Ok(Some(3)));
```
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    cells: BTreeMap<String, Cell>,
}

impl Namespace {
    pub(crate) fn from_storage(storage: &Storage) -> Self {
        let mut cells: BTreeMap<String, Cell> = BTreeMap::new();

        for (argument, cell) in storage.iter() {
            let replace = match cells.get(argument.dest()) {
                None => true,
                Some(existing) => match (existing.is_present(), cell.is_present()) {
                    (false, true) => true,
                    (true, true) => cell.touched_at() > existing.touched_at(),
                    (false, false) => existing.is_empty() && !cell.is_empty(),
                    (true, false) => false,
                },
            };

            if replace {
                cells.insert(argument.dest().to_owned(), cell.clone());
            }
        }

        Self { cells }
    }

    #[must_use]
    pub fn cell(&self, dest: &str) -> Option<&Cell> {
        self.cells.get(dest)
    }

    /// Every destination with its cell, in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(dest, cell)| (dest.as_str(), cell))
    }

    /// The flat list of raw values
    #[must_use]
    pub fn values(&self, dest: &str) -> Option<&[String]> {
        self.cell(dest).map(Cell::values)
    }

    /// The raw values grouped by submission, like the separate occurrences of
    /// an `Append` flag
    #[must_use]
    pub fn groups(&self, dest: &str) -> Vec<&[String]> {
        self.cell(dest)
            .map(|cell| cell.submissions().collect())
            .unwrap_or_default()
    }

    /// The last raw value
    #[must_use]
    pub fn value(&self, dest: &str) -> Option<&str> {
        self.values(dest)?.last().map(String::as_str)
    }

    /// Convert the last value
    pub fn get<T>(&self, dest: &str) -> Result<Option<T>, ValueError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.value(dest)
            .map(|value| convert(dest, value))
            .transpose()
    }

    /// Convert every value
    pub fn get_all<T>(&self, dest: &str) -> Result<Vec<T>, ValueError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.values(dest)
            .unwrap_or_default()
            .iter()
            .map(|value| convert(dest, value))
            .collect()
    }

    /// `StoreTrue`, `StoreFalse` and toggle results as a `bool`
    #[must_use]
    pub fn flag(&self, dest: &str) -> bool {
        self.value(dest) == Some("true")
    }

    /// How many times the argument was matched; the `Count` action's value
    #[must_use]
    pub fn count(&self, dest: &str) -> usize {
        self.cell(dest)
            .filter(|cell| cell.is_present())
            .map_or(0, Cell::count)
    }

    /// True if the destination has a cell, even one holding only a default
    #[must_use]
    pub fn contains(&self, dest: &str) -> bool {
        self.cells.contains_key(dest)
    }

    /// True if the command line touched the destination
    #[must_use]
    pub fn is_present(&self, dest: &str) -> bool {
        self.cell(dest).is_some_and(Cell::is_present)
    }
}

fn convert<T>(dest: &str, value: &str) -> Result<T, ValueError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|error: T::Err| ValueError::Parse {
        dest: dest.to_owned(),
        value: value.to_owned(),
        message: error.to_string(),
    })
}
