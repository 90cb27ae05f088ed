//! Type display utilities for formatting types in diagnostics.
//!
//! Instantiated generic types carry their display string as their name, so
//! most displays are a plain name lookup.

use ek9_identity::SymbolId;

use crate::symbols::SymbolTable;

/// Display a type (or any symbol) by name.
pub fn display_type(table: &SymbolTable, ty: SymbolId) -> String {
    table.symbol_name(ty).to_string()
}

/// Comma separated list of type names, used for argument lists.
pub fn display_types(table: &SymbolTable, types: &[SymbolId]) -> String {
    types
        .iter()
        .map(|ty| display_type(table, *ty))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Name of a generic instantiation: `List of Integer`, `Dict of (Integer, String)`,
/// `List of (List of Integer)`.
pub fn parameterized_name(table: &SymbolTable, template: SymbolId, args: &[SymbolId]) -> String {
    let base = table.symbol_name(template);
    match args {
        [single] => {
            let arg = table.symbol_name(*single);
            if arg.contains(' ') {
                format!("{base} of ({arg})")
            } else {
                format!("{base} of {arg}")
            }
        }
        _ => format!("{base} of ({})", display_types(table, args)),
    }
}

/// `name(Integer, String) <- Boolean` style signature of a function or method.
pub fn display_signature(table: &SymbolTable, callable: SymbolId) -> String {
    let params = display_types(table, &table.param_types(callable));
    let ret = table.return_type(callable);
    let name = table.symbol_name(callable);
    if ret == crate::symbols::builtin::VOID {
        format!("{name}({params})")
    } else {
        format!("{name}({params}) <- {}", display_type(table, ret))
    }
}
