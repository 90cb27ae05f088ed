// node_map.rs
//
// NodeId-keyed results of binding: which symbol a node declares or refers to,
// the type each expression evaluates to, and the scope a node opens.

use ek9_identity::{NodeId, ScopeId, SymbolId};
use rustc_hash::FxHashMap;

use crate::errors::InternalError;

/// Side table from syntax nodes to semantic entities.
///
/// Later phases read it instead of re-resolving names.
#[derive(Debug, Clone, Default)]
pub struct NodeBindings {
    symbols: FxHashMap<NodeId, SymbolId>,
    types: FxHashMap<NodeId, SymbolId>,
    scopes: FxHashMap<NodeId, ScopeId>,
}

impl NodeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_symbol(&mut self, node: NodeId, symbol: SymbolId) {
        self.symbols.insert(node, symbol);
    }

    pub fn record_type(&mut self, node: NodeId, ty: SymbolId) {
        self.types.insert(node, ty);
    }

    pub fn record_scope(&mut self, node: NodeId, scope: ScopeId) {
        self.scopes.insert(node, scope);
    }

    pub fn symbol(&self, node: NodeId) -> Option<SymbolId> {
        self.symbols.get(&node).copied()
    }

    /// Symbol recorded for `node` by an earlier pass; its absence is a bug in the analyzer.
    pub fn require_symbol(
        &self,
        node: NodeId,
        what: &'static str,
    ) -> Result<SymbolId, InternalError> {
        self.symbol(node).ok_or(InternalError::UnrecordedSymbol {
            node: node.index(),
            what,
        })
    }

    pub fn type_of(&self, node: NodeId) -> Option<SymbolId> {
        self.types.get(&node).copied()
    }

    pub fn scope(&self, node: NodeId) -> Option<ScopeId> {
        self.scopes.get(&node).copied()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_symbol_is_an_internal_error() {
        let bindings = NodeBindings::new();
        let err = bindings.require_symbol(NodeId::new(7), "method").unwrap_err();
        assert_eq!(
            err,
            InternalError::UnrecordedSymbol {
                node: 7,
                what: "method"
            }
        );
    }

    #[test]
    fn records_are_keyed_by_node() {
        let mut bindings = NodeBindings::new();
        bindings.record_symbol(NodeId::new(1), SymbolId::new(10));
        bindings.record_type(NodeId::new(1), SymbolId::new(4));
        assert_eq!(bindings.symbol(NodeId::new(1)), Some(SymbolId::new(10)));
        assert_eq!(bindings.type_of(NodeId::new(1)), Some(SymbolId::new(4)));
        assert_eq!(bindings.type_of(NodeId::new(2)), None);
        assert_eq!(bindings.symbol_count(), 1);
    }
}
