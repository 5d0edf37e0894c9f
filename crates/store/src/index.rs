//! Name index over an ordered keyword sequence.
//!
//! Keyword names repeat: a unified restart file holds one `PRESSURE` per
//! report step. [`NameIndex`] maps each distinct name to the ordered list of
//! positions where it occurs, and remembers the order in which names were
//! first seen.

use indexmap::IndexMap;

/// Insertion-ordered map from keyword name to occurrence positions.
///
/// An index is always built in one pass from a complete name sequence and
/// is never patched in place, so a partially built index is never visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    occurrences: IndexMap<String, Vec<usize>>,
}

impl NameIndex {
    /// Builds the index for a sequence of names.
    ///
    /// Position `i` in the result refers to the `i`-th name yielded.
    pub fn build<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut occurrences: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (position, name) in names.into_iter().enumerate() {
            match occurrences.get_mut(name) {
                Some(positions) => positions.push(position),
                None => {
                    occurrences.insert(name.to_string(), vec![position]);
                },
            }
        }
        Self { occurrences }
    }

    /// Positions of every occurrence of `name`, in sequence order.
    pub fn occurrences(&self, name: &str) -> &[usize] {
        self.occurrences.get(name).map_or(&[], Vec::as_slice)
    }

    /// Position of the `occurrence`-th instance of `name`.
    pub fn get(&self, name: &str, occurrence: usize) -> Option<usize> {
        self.occurrences(name).get(occurrence).copied()
    }

    /// Number of occurrences of `name`.
    pub fn count(&self, name: &str) -> usize {
        self.occurrences(name).len()
    }

    /// True if `name` occurs at least once.
    pub fn contains(&self, name: &str) -> bool {
        self.occurrences.contains_key(name)
    }

    /// Distinct names in first-seen order.
    pub fn distinct_names(&self) -> impl Iterator<Item = &str> {
        self.occurrences.keys().map(String::as_str)
    }

    /// Number of distinct names.
    pub fn distinct_len(&self) -> usize {
        self.occurrences.len()
    }
}
