//! Label to address mapping of a single assembly run.

use std::collections::hash_map::{Entry, HashMap};

use edit_distance::edit_distance;

/// Largest edit distance at which a declared symbol is offered as a suggestion.
const SUGGESTION_DISTANCE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolInfo {
    pub label: String,
    pub address: u16,
    /// Source line of the declaration.
    pub defined: usize,
}

#[derive(Default, Debug, Clone)]
pub struct SymbolTable {
    inner: HashMap<String, SymbolInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            inner: HashMap::new(),
        }
    }

    /// Declares `label` at `address`.
    ///
    /// Returns the earlier declaration as the error if the label is already taken. The table
    /// is not modified in that case.
    pub fn define_symbol(&mut self, line: usize, label: &str, address: u16) -> Result<&SymbolInfo, &SymbolInfo> {
        match self.inner.entry(label.to_string()) {
            Entry::Occupied(entry) => Err(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(SymbolInfo {
                label: label.to_string(),
                address,
                defined: line,
            })),
        }
    }

    pub fn get_symbol_by_label<S: AsRef<str>>(&self, label: S) -> Option<&SymbolInfo> {
        self.inner.get(label.as_ref())
    }

    pub fn address_of<S: AsRef<str>>(&self, label: S) -> Option<u16> {
        self.get_symbol_by_label(label).map(|info| info.address)
    }

    /// Finds the declared label closest to `label`, if any is close enough to be a likely typo.
    pub fn suggest(&self, label: &str) -> Option<&str> {
        self.inner.keys()
            .map(|candidate| (edit_distance(candidate, label), candidate))
            .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
            .min()
            .map(|(_, candidate)| candidate.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item=&SymbolInfo> {
        self.inner.values()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[test]
fn test_define_symbol() {
    let mut table = SymbolTable::new();

    assert_eq!(table.define_symbol(1, "LOOP", 0x100).map(|s| s.address), Ok(0x100));
    assert_eq!(table.define_symbol(3, "END", 0x104).map(|s| s.address), Ok(0x104));

    let previous = table.define_symbol(7, "LOOP", 0x10A).unwrap_err();
    assert_eq!(previous.defined, 1);
    assert_eq!(table.address_of("LOOP"), Some(0x100));
    assert_eq!(table.address_of("loop"), None);
    assert_eq!(table.len(), 2);
}

#[test]
fn test_suggest() {
    let mut table = SymbolTable::new();
    table.define_symbol(1, "COUNTER", 0).unwrap();
    table.define_symbol(2, "RESULT", 1).unwrap();

    assert_eq!(table.suggest("COUNTR"), Some("COUNTER"));
    assert_eq!(table.suggest("RESLT"), Some("RESULT"));
    assert_eq!(table.suggest("ZZZ"), None);
}
