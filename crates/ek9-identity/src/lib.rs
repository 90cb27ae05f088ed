// lib.rs
//
// Identity primitives shared by every stage of the ek9 semantic core:
// typed entity handles, interned names and source spans.

mod entities;
mod intern;
mod span;

pub use entities::{ModuleId, NodeId, ScopeId, SymbolId};
pub use intern::Interner;
pub use span::Span;

/// Unique identifier for an interned string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl Name {
    /// Create a Name from a raw index. Only the interner should use this.
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the underlying index.
    pub fn index(self) -> u32 {
        self.0
    }

    /// Create a Name with an arbitrary index in test code.
    #[cfg(any(test, feature = "testing"))]
    pub fn new_for_test(index: u32) -> Self {
        Self(index)
    }
}

/// Hands out fresh `NodeId`s for trees built outside a parser (tests, synthesized nodes).
#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start numbering at `first`, so several generators can coexist without collisions.
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId::new(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique_and_ordered() {
        let mut ids = NodeIdGen::starting_at(10);
        let a = ids.fresh();
        let b = ids.fresh();
        assert_eq!(a.index(), 10);
        assert!(b > a);
    }

    #[test]
    fn entity_ids_compare_by_identity() {
        assert_eq!(SymbolId::new(3), SymbolId::new(3));
        assert_ne!(SymbolId::new(3), SymbolId::new(4));
        assert_eq!(ScopeId::new(9).slot(), 9);
    }
}
