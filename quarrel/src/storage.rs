/*!
The per-parse accumulator of raw values. Cells are keyed by argument identity
(the `Arc` allocation), so arguments shared between a parser and its
sub-commands land in the same cell.
*/

use std::{collections::HashMap, sync::Arc};

use crate::argument::Argument;

/// The identity of a shared [`Argument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgKey(usize);

impl ArgKey {
    #[inline]
    #[must_use]
    pub fn of(argument: &Arc<Argument>) -> Self {
        Self(Arc::as_ptr(argument) as usize)
    }
}

/**
The raw values stored for one argument. Values are flat; `boundaries` records
where each matching call's contribution ends, so `-x a b -x c` on an `Append`
argument keeps the groups `[a, b]` and `[c]`.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    values: Vec<String>,
    boundaries: Vec<usize>,
    default_used: bool,

    // Touched by input, even with zero values
    exists: bool,

    // Storage clock reading at the last input touch
    touched_at: u64,
}

impl Cell {
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The values grouped by submission
    pub fn submissions(&self) -> impl Iterator<Item = &[String]> {
        let starts = std::iter::once(0).chain(self.boundaries.iter().copied());

        starts
            .zip(self.boundaries.iter().copied())
            .map(|(start, end)| &self.values[start..end])
    }

    /// How many times the argument was matched
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.boundaries.len()
    }

    /// True if the command line touched this argument at all
    #[inline]
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.exists
    }

    #[inline]
    #[must_use]
    pub fn default_used(&self) -> bool {
        self.default_used
    }

    /// Never touched by input and holding no default
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.exists && !self.default_used
    }

    pub(crate) fn touched_at(&self) -> u64 {
        self.touched_at
    }

    pub(crate) fn replace(&mut self, values: Vec<String>) {
        self.boundaries.clear();
        self.boundaries.push(values.len());
        self.values = values;
        self.default_used = false;
        self.exists = true;
    }

    pub(crate) fn push_submission(&mut self, values: impl IntoIterator<Item = String>) {
        if self.default_used {
            self.values.clear();
            self.boundaries.clear();
            self.default_used = false;
        }

        self.values.extend(values);
        self.boundaries.push(self.values.len());
        self.exists = true;
    }

    pub(crate) fn mark(&mut self) {
        self.exists = true;
    }

    pub(crate) fn set_default(&mut self, values: Vec<String>) {
        self.boundaries.clear();
        self.boundaries.push(values.len());
        self.values = values;
        self.default_used = true;
    }
}

/// Every cell touched during one parse, in first-touch order
#[derive(Debug, Clone, Default)]
pub struct Storage {
    entries: Vec<(Arc<Argument>, Cell)>,
    index: HashMap<ArgKey, usize>,
    clock: u64,
}

impl Storage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, argument: &Arc<Argument>) -> Option<&Cell> {
        self.index
            .get(&ArgKey::of(argument))
            .map(|&i| &self.entries[i].1)
    }

    /// True if the command line touched this argument
    #[must_use]
    pub fn is_present(&self, argument: &Arc<Argument>) -> bool {
        self.get(argument).is_some_and(Cell::is_present)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<Argument>, &Cell)> {
        self.entries.iter().map(|(argument, cell)| (argument, cell))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn cell_mut(&mut self, argument: &Arc<Argument>) -> &mut Cell {
        let next = self.entries.len();
        let i = *self.index.entry(ArgKey::of(argument)).or_insert(next);

        if i == next {
            self.entries.push((Arc::clone(argument), Cell::default()));
        }

        &mut self.entries[i].1
    }

    /// Get a cell for an input-driven change, stamping it with the clock so
    /// the latest of several arguments sharing a dest can win
    pub(crate) fn touch(&mut self, argument: &Arc<Argument>) -> &mut Cell {
        self.clock += 1;
        let clock = self.clock;
        let cell = self.cell_mut(argument);
        cell.touched_at = clock;
        cell
    }

    /// Fold a sub-command's storage back in. The child started as a copy of
    /// this storage, so a cell is taken from the child only where this one
    /// is still empty.
    pub(crate) fn merge_child(&mut self, child: Storage) {
        self.clock = self.clock.max(child.clock);

        for (argument, cell) in child.entries {
            if self.get(&argument).is_none_or(Cell::is_empty) {
                *self.cell_mut(&argument) = cell;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::argument::Action;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|&value| value.to_owned()).collect()
    }

    #[test]
    fn submissions_keep_their_groups() {
        let mut cell = Cell::default();
        cell.push_submission(strings(&["a", "b"]));
        cell.push_submission(strings(&[]));
        cell.push_submission(strings(&["c"]));

        let groups: Vec<&[String]> = cell.submissions().collect();
        assert_eq!(groups, [&strings(&["a", "b"])[..], &[], &strings(&["c"])[..]]);
        assert_eq!(cell.count(), 3);
        assert_eq!(cell.values(), strings(&["a", "b", "c"]));
    }

    #[test]
    fn defaults_are_not_presence() {
        let mut cell = Cell::default();
        assert!(cell.is_empty());

        cell.set_default(strings(&["x"]));
        assert!(!cell.is_present());
        assert!(cell.default_used());
        assert!(!cell.is_empty());

        cell.push_submission(strings(&["y"]));
        assert_eq!(cell.values(), strings(&["y"]));
        assert!(!cell.default_used());
    }

    #[test]
    fn identity_not_value() {
        let a = Argument::optional(["--same"]).build().unwrap();
        let b = Argument::optional(["--same"]).build().unwrap();

        let mut storage = Storage::new();
        storage.touch(&a).replace(strings(&["1"]));

        assert!(storage.is_present(&a));
        assert!(!storage.is_present(&b));
        assert!(storage.is_present(&Arc::clone(&a)));
    }

    #[test]
    fn parent_wins_unless_empty() {
        let shared = Argument::optional(["-v"])
            .action(Action::Count)
            .build()
            .unwrap();
        let late = Argument::optional(["--late"]).build().unwrap();

        let mut parent = Storage::new();
        parent.touch(&shared).push_submission([]);

        let mut child = parent.clone();
        child.touch(&shared).push_submission([]);
        child.touch(&late).replace(strings(&["z"]));

        parent.merge_child(child);
        assert_eq!(parent.get(&shared).map(Cell::count), Some(1));
        assert_eq!(
            parent.get(&late).map(Cell::values),
            Some(&strings(&["z"])[..])
        );
    }
}
