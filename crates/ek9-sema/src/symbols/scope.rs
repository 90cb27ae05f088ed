// symbols/scope.rs

use ek9_identity::{ModuleId, Name, ScopeId, SymbolId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Module,
    /// Members of an aggregate.
    TypeBody,
    Function,
    Method,
    Block,
    /// Body of a dynamic function with its captured variables.
    CaptureBlock,
}

impl ScopeKind {
    /// Scopes that never form the declarative context of an access site.
    pub fn is_block_like(self) -> bool {
        matches!(self, ScopeKind::Block | ScopeKind::Method)
    }
}

/// An ordered container of symbols with a parent link.
#[derive(Debug, Clone)]
pub struct ScopeDef {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Symbol that owns this scope (aggregate, function, method).
    pub owner: Option<SymbolId>,
    pub module: ModuleId,
    symbols: Vec<SymbolId>,
    by_name: FxHashMap<Name, SmallVec<[SymbolId; 2]>>,
}

impl ScopeDef {
    pub fn new(
        kind: ScopeKind,
        parent: Option<ScopeId>,
        owner: Option<SymbolId>,
        module: ModuleId,
    ) -> Self {
        Self {
            kind,
            parent,
            owner,
            module,
            symbols: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    pub(crate) fn push(&mut self, name: Name, symbol: SymbolId) {
        self.symbols.push(symbol);
        self.by_name.entry(name).or_default().push(symbol);
    }

    pub(crate) fn clear(&mut self) {
        self.symbols.clear();
        self.by_name.clear();
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// Every symbol declared here under `name` (overloads share a name).
    pub fn named(&self, name: Name) -> &[SymbolId] {
        self.by_name.get(&name).map(|v| v.as_slice()).unwrap_or(&[])
    }
}
