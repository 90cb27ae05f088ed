// compilation_db.rs
//
// Whole-program compilation database shared by concurrent analyses.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ek9_identity::SymbolId;

use crate::generic::{self, ParameterizeError};
use crate::symbols::SymbolTable;

/// Whole-program symbol store shared by every compilation unit.
///
/// Each unit's analysis takes the write lock for one top-level declaration at
/// a time, so a lookup-or-insert into the parameterized-type cache is always
/// atomic and two units asking for `List of Integer` get the same symbol.
///
/// # Usage
/// ```ignore
/// let db = Arc::new(CompilationDb::new());
///
/// // Read access
/// let name = db.symbols().symbol_name(id).to_string();
///
/// // Write access
/// let list_of_int = db.resolve_or_define(list, &[builtin::INTEGER], 256)?;
/// ```
#[derive(Debug, Default)]
pub struct CompilationDb {
    symbols: RwLock<SymbolTable>,
}

impl CompilationDb {
    /// Create a database with the built-in module registered.
    pub fn new() -> Self {
        Self {
            symbols: RwLock::new(SymbolTable::new()),
        }
    }

    /// Shared read access to the symbol table.
    ///
    /// A panic in another analysis cannot leave the table half-written in a way
    /// this reader cares about, so poisoning is ignored.
    pub fn symbols(&self) -> RwLockReadGuard<'_, SymbolTable> {
        self.symbols.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the symbol table.
    pub fn symbols_mut(&self) -> RwLockWriteGuard<'_, SymbolTable> {
        self.symbols.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lookup-or-insert into the parameterized-type cache under the write lock.
    pub fn resolve_or_define(
        &self,
        template: SymbolId,
        args: &[SymbolId],
        max_depth: usize,
    ) -> Result<SymbolId, ParameterizeError> {
        let mut table = self.symbols_mut();
        generic::resolve_or_define(&mut table, template, args, max_depth)
    }

    /// Consume the database, returning the table for later phases.
    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
