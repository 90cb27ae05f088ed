// methods/mod.rs
//
// Method and operator resolution plus the per-type checks that finalize an
// aggregate: access control, defaulted operators, overrides, operator
// contracts and hierarchy structure.

mod access;
mod defaults;
mod hierarchy;
mod operators;
mod overrides;
mod resolution;


pub use access::{
    AccessDenied, access_or_error, check_access, check_property_access, property_access_or_error,
};
pub use defaults::{DEFAULTABLE_OPERATORS, default_operators_or_error, is_defaultable};
pub use hierarchy::{check_circular_hierarchy, check_duplicate_properties, check_extension};
pub use operators::{OperatorContract, ReturnRule, check_operator_contract, operator_contract};
pub use overrides::{check_abstract_implemented, check_method_conflicts, check_overrides};
pub use resolution::{
    MethodResolution, best_match, gather_constructors, gather_methods, has_operator, resolve_method,
};

use ek9_identity::SymbolId;

use crate::symbols::{SymbolTable, builtin};

/// The universal base type contributes no implementations, so it never takes
/// part in conflict detection or default-operator requirements.
pub const UNIVERSAL_BASE: SymbolId = builtin::ANY;

/// Template of an instantiation, or the type itself.
pub(crate) fn generic_origin(table: &SymbolTable, ty: SymbolId) -> SymbolId {
    table.parameterization(ty).map_or(ty, |p| p.template)
}
