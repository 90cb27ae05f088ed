// symbols/scope_stack.rs
//
// The lexical scope stack maintained while walking a compilation unit.

use ek9_identity::ScopeId;

use super::SymbolTable;
use super::scope::{ScopeDef, ScopeKind};

/// Active lexical scopes, innermost last. Owned by one unit's analysis pass.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    scopes: Vec<ScopeId>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: ScopeId) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Option<ScopeId> {
        self.scopes.pop()
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.scopes.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Innermost first.
    pub fn iter(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.scopes.iter().rev().copied()
    }
}

/// Nearest enclosing scope that is not a plain block or method body.
///
/// This is the declarative context an access site belongs to: a type body, a
/// free function, a dynamic capture block or the module.
pub fn most_specific_scope(stack: &ScopeStack, table: &SymbolTable) -> Option<ScopeId> {
    stack
        .iter()
        .find(|scope| !table.scope(*scope).kind.is_block_like())
}

/// Nearest enclosing scope of the given kind.
pub fn traverse_back_up_stack(
    stack: &ScopeStack,
    table: &SymbolTable,
    kind: ScopeKind,
) -> Option<ScopeId> {
    traverse_back_up_stack_by(stack, table, |def| def.kind == kind)
}

/// Nearest enclosing scope accepted by `accept`.
pub fn traverse_back_up_stack_by(
    stack: &ScopeStack,
    table: &SymbolTable,
    accept: impl Fn(&ScopeDef) -> bool,
) -> Option<ScopeId> {
    stack.iter().find(|scope| accept(table.scope(*scope)))
}
