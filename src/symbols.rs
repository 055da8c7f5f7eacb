//! Address-to-name resolution, consumed only by the disassembler.
//!
//! Absence of symbols degrades gracefully to unresolved addresses; it never
//! changes simulated behavior.

use std::collections::BTreeMap;

/// Resolves an address to a human-readable name, if one is known.
pub trait SymbolResolver {
    /// Look up the name bound to `addr`, if any.
    fn resolve(&self, addr: u32) -> Option<&str>;
}

/// A simple address -> name map, typically populated from an ELF symbol
/// table by the loader.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    names: BTreeMap<u32, String>,
}

impl SymbolTable {
    /// An empty symbol table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `addr`, replacing any previous binding.
    pub fn insert(&mut self, addr: u32, name: impl Into<String>) {
        self.names.insert(addr, name.into());
    }

    /// Number of bound symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether this table has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, addr: u32) -> Option<&str> {
        self.names.get(&addr).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_addresses_only() {
        let mut table = SymbolTable::new();
        table.insert(0x1000, "_start");
        assert_eq!(table.resolve(0x1000), Some("_start"));
        assert_eq!(table.resolve(0x2000), None);
    }
}
