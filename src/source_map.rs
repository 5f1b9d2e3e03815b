//! Mapping between memory locations and source code lines.

use std::collections::HashMap;
use std::iter::FromIterator;

/// Mapping from memory addresses into source locations. This type is generic over the location
/// type; the assembler produces a `SourceMap<usize>` of line numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap<V> {
    inner: HashMap<u16, V>,
}

impl<V> FromIterator<(u16, V)> for SourceMap<V> {
    fn from_iter<I>(iter: I) -> Self
        where I: IntoIterator<Item = (u16, V)>
    {
        SourceMap {
            inner: HashMap::from_iter(iter),
        }
    }
}

impl<V> SourceMap<V> {
    pub(crate) fn insert(&mut self, address: u16, location: V) {
        self.inner.insert(address, location);
    }

    /// Returns the location in the source which defined the value at the given memory address.
    pub fn get_source_span(&self, address: u16) -> Option<&V> {
        self.inner.get(&address)
    }

    /// Iterates over the mapped addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item=(u16, &V)> {
        let mut entries = self.inner.iter()
            .map(|(address, location)| (*address, location))
            .collect::<Vec<_>>();

        entries.sort_by_key(|(address, _)| *address);
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
