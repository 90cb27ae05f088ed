// intern.rs
//
// String interning for Name handles.

use rustc_hash::FxHashMap;

use crate::Name;

/// Interns strings to unique Name handles
#[derive(Debug, Clone, Default)]
pub struct Interner {
    map: FxHashMap<String, Name>,
    strings: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(name) = self.map.get(s) {
            return *name;
        }
        let name = Name::new(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), name);
        name
    }

    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.index() as usize]
    }

    /// Returns the number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if no strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Look up a string without interning it.
    pub fn lookup(&self, s: &str) -> Option<Name> {
        self.map.get(s).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_same_name() {
        let mut interner = Interner::new();
        let a = interner.intern("List");
        let b = interner.intern("List");
        let c = interner.intern("Dict");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn resolve_returns_interned_string() {
        let mut interner = Interner::new();
        let name = interner.intern("<=>");
        assert_eq!(interner.resolve(name), "<=>");
    }

    #[test]
    fn lookup_does_not_intern() {
        let mut interner = Interner::new();
        assert_eq!(interner.lookup("missing"), None);
        assert!(interner.is_empty());
        let name = interner.intern("present");
        assert_eq!(interner.lookup("present"), Some(name));
        assert_eq!(interner.len(), 1);
    }
}
