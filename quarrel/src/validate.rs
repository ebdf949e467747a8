/*!
The post-pass run on each frame once the input is exhausted: exclusive group
checks, the aggregated missing-arguments check, and finally defaults for
everything the command line left untouched. Running it again on a storage it
already accepted changes nothing.
*/

use std::sync::Arc;

use joinery::JoinableIterator;

use crate::{
    argument::Argument,
    error::ErrorKind,
    language::{Phrase, Phrasebook},
    registry::{Registry, Slot},
    storage::{Cell, Storage},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Violation {
    pub kind: ErrorKind,
    pub message: String,
}

pub(crate) fn validate(
    registry: &Registry,
    storage: &mut Storage,
    book: Phrasebook<'_>,
) -> Result<(), Violation> {
    for group in registry.groups() {
        let mut present: Vec<(&Arc<Argument>, &Cell)> = group
            .members()
            .iter()
            .filter_map(|member| Some((member, storage.get(member)?)))
            .filter(|(_, cell)| cell.is_present())
            .collect();

        // The member given first on the command line is the one the other
        // conflicts with
        present.sort_by_key(|(_, cell)| cell.touched_at());

        match present.as_slice() {
            [(first, _), (second, _), ..] => {
                let message = book.fill(Phrase::NotAllowedWith, &[&first.display_name()]);

                return Err(Violation {
                    kind: ErrorKind::MutuallyExclusiveViolation,
                    message: book.about(&second.display_name(), &message),
                });
            }
            [] if group.is_required() => {
                let names = group
                    .members()
                    .iter()
                    .map(|member| member.display_name())
                    .join_with(" ");

                return Err(Violation {
                    kind: ErrorKind::MissingRequiredArguments,
                    message: book.fill(Phrase::OneOfRequired, &[&names]),
                });
            }
            _ => {}
        }
    }

    let mut missing: Vec<String> = registry
        .optionals()
        .iter()
        .chain(registry.operands())
        .filter(|argument| argument.is_required() && !storage.is_present(argument))
        .map(|argument| argument.display_name())
        .collect();

    for slot in registry.slots() {
        match slot {
            Slot::Argument(argument) => {
                if argument.nargs().minimum() > 0 && !storage.is_present(argument) {
                    missing.push(argument.display_name());
                }
            }
            Slot::Command(subparsers) => {
                if subparsers.is_required() && !storage.is_present(subparsers.argument()) {
                    missing.push(subparsers.display_name());
                }
            }
        }
    }

    if !missing.is_empty() {
        return Err(Violation {
            kind: ErrorKind::MissingRequiredArguments,
            message: book.fill(Phrase::RequiredArguments, &[&missing.join(", ")]),
        });
    }

    let arguments = registry
        .positionals()
        .iter()
        .chain(registry.optionals())
        .chain(registry.operands());

    for argument in arguments {
        if storage.get(argument).is_none_or(Cell::is_empty)
            && let Some(default) = argument.effective_default()
        {
            storage.cell_mut(argument).set_default(default);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        argument::Action,
        language::Catalog,
        parser::ConflictHandler,
    };

    fn register(registry: &mut Registry, argument: &Arc<Argument>) {
        registry
            .register(Arc::clone(argument), "-", ConflictHandler::Error)
            .unwrap();
    }

    #[test]
    fn defaults_are_applied_once() {
        let catalog = Catalog::default();
        let book = Phrasebook::new(&catalog, None);

        let mut registry = Registry::default();
        let level = Argument::optional(["--level"])
            .default_value("3")
            .build()
            .unwrap();
        let quiet = Argument::optional(["-q"])
            .action(Action::StoreTrue)
            .build()
            .unwrap();
        register(&mut registry, &level);
        register(&mut registry, &quiet);

        let mut storage = Storage::new();
        validate(&registry, &mut storage, book).unwrap();

        let level_cell = storage.get(&level).unwrap();
        assert_eq!(level_cell.values(), ["3"]);
        assert!(level_cell.default_used());
        assert!(!level_cell.is_present());
        assert_eq!(storage.get(&quiet).unwrap().values(), ["false"]);

        let before = storage.clone();
        validate(&registry, &mut storage, book).unwrap();
        assert_eq!(storage.get(&level), before.get(&level));
        assert_eq!(storage.len(), before.len());
    }

    #[test]
    fn missing_arguments_are_aggregated() {
        let catalog = Catalog::default();
        let book = Phrasebook::new(&catalog, None);

        let mut registry = Registry::default();
        register(
            &mut registry,
            &Argument::optional(["--name"]).required(true).build().unwrap(),
        );
        register(&mut registry, &Argument::positional("input").build().unwrap());

        let violation = validate(&registry, &mut Storage::new(), book).unwrap_err();
        assert_eq!(violation.kind, ErrorKind::MissingRequiredArguments);
        assert_eq!(
            violation.message,
            "the following arguments are required: --name, input"
        );
    }
}
