// methods/overrides.rs
//
// Override marking, conflicting inherited implementations and unimplemented
// abstract methods.

use ek9_identity::{Name, SymbolId};
use rustc_hash::FxHashSet;

use super::UNIVERSAL_BASE;
use crate::compatibility::is_assignable;
use crate::diagnostics::Diagnostics;
use crate::errors::SemanticError;
use crate::symbols::{AggregateKind, SymbolList, SymbolTable, Visibility};
use crate::type_display::{display_signature, display_type};

/// An overridable method found on an ancestor.
fn inherited_with_signature(
    table: &SymbolTable,
    aggregate: SymbolId,
    name: Name,
    params: &[SymbolId],
) -> Option<SymbolId> {
    table.ancestors(aggregate).into_iter().find_map(|ancestor| {
        table
            .method_with_signature(ancestor, name, params)
            .filter(|m| !table.get(*m).is_constructor())
            .filter(|m| table.get(*m).visibility != Visibility::Private)
    })
}

/// Every own method that matches an inherited signature must say `override`,
/// and every method that says `override` must match one.
pub fn check_overrides(table: &SymbolTable, aggregate: SymbolId, diags: &mut Diagnostics) -> bool {
    let before = diags.error_count();
    for member in table.members(aggregate) {
        let Some(info) = table.method(*member) else {
            continue;
        };
        if info.flags.constructor {
            continue;
        }
        let def = table.get(*member);
        let params = table.param_types(*member);
        let inherited = inherited_with_signature(table, aggregate, def.name, &params);
        let reason = match inherited {
            Some(base) if !info.flags.is_override && !info.flags.defaulted => Some(format!(
                "overrides '{}' and must be marked 'override'",
                display_signature(table, base)
            )),
            None if info.flags.is_override => {
                Some("is marked 'override' but does not override any method".to_string())
            }
            Some(base) => {
                let own_ret = info.return_type;
                let base_ret = table.return_type(base);
                (!is_assignable(table, own_ret, base_ret)).then(|| {
                    format!(
                        "returns {} which is not compatible with {} of the overridden method",
                        display_type(table, own_ret),
                        display_type(table, base_ret)
                    )
                })
            }
            None => None,
        };
        if let Some(reason) = reason {
            diags.error(
                SemanticError::OverrideMismatch {
                    method: table.symbol_name(*member).to_string(),
                    reason,
                    span: def.span.into(),
                },
                def.span,
            );
        }
    }
    diags.error_count() == before
}

/// Signatures inherited through any direct supertype or trait.
fn inherited_signatures(table: &SymbolTable, aggregate: SymbolId) -> Vec<(Name, SymbolList)> {
    let mut seen: FxHashSet<(Name, SymbolList)> = FxHashSet::default();
    let mut out = Vec::new();
    for ancestor in table.ancestors(aggregate) {
        if ancestor == UNIVERSAL_BASE {
            continue;
        }
        for member in table.members(ancestor) {
            let Some(info) = table.method(*member) else {
                continue;
            };
            if info.flags.constructor || table.get(*member).visibility == Visibility::Private {
                continue;
            }
            let key = (table.get(*member).name, table.param_types(*member));
            if seen.insert(key.clone()) {
                out.push(key);
            }
        }
    }
    out
}

/// Implementation of a signature reached through one direct super: the
/// nearest declaration walking up from it.
fn effective_through(
    table: &SymbolTable,
    start: SymbolId,
    name: Name,
    params: &[SymbolId],
) -> Option<SymbolId> {
    std::iter::once(start)
        .chain(table.ancestors(start))
        .filter(|ty| *ty != UNIVERSAL_BASE)
        .find_map(|ty| table.method_with_signature(ty, name, params))
}

/// Two or more distinct concrete implementations of one signature arriving
/// through different supers must be resolved by an explicit override.
pub fn check_method_conflicts(
    table: &SymbolTable,
    aggregate: SymbolId,
    diags: &mut Diagnostics,
) -> bool {
    let before = diags.error_count();
    let span = table.get(aggregate).span;
    let supers = table.direct_supers(aggregate);
    for (name, params) in inherited_signatures(table, aggregate) {
        if table.method_with_signature(aggregate, name, &params).is_some() {
            continue;
        }
        let mut implementations: Vec<SymbolId> = Vec::new();
        for sup in &supers {
            let Some(found) = effective_through(table, *sup, name, &params) else {
                continue;
            };
            let concrete = table.method(found).is_some_and(|m| !m.flags.is_abstract);
            if concrete && !implementations.contains(&found) {
                implementations.push(found);
            }
        }
        if implementations.len() > 1 {
            let sources = implementations
                .iter()
                .filter_map(|m| table.method(*m).map(|info| display_type(table, info.owner)))
                .collect::<Vec<_>>()
                .join(", ");
            diags.error(
                SemanticError::MethodConflict {
                    method: table.name(name).to_string(),
                    on_type: table.symbol_name(aggregate).to_string(),
                    sources,
                    span: span.into(),
                },
                span,
            );
        }
    }
    diags.error_count() == before
}

/// A concrete type must provide a body for every inherited abstract signature.
pub fn check_abstract_implemented(
    table: &SymbolTable,
    aggregate: SymbolId,
    diags: &mut Diagnostics,
) -> bool {
    let Some(info) = table.aggregate(aggregate) else {
        return true;
    };
    if info.is_abstract || info.kind == AggregateKind::Trait {
        return true;
    }
    let before = diags.error_count();
    let span = table.get(aggregate).span;
    for (name, params) in inherited_signatures(table, aggregate) {
        let candidates = std::iter::once(aggregate).chain(table.ancestors(aggregate));
        let mut declared_in = None;
        let mut implemented = false;
        for ty in candidates {
            if let Some(method) = table.method_with_signature(ty, name, &params) {
                match table.method(method) {
                    Some(m) if m.flags.is_abstract => {
                        declared_in.get_or_insert(ty);
                    }
                    Some(_) => {
                        implemented = true;
                        break;
                    }
                    None => {}
                }
            }
        }
        if let (false, Some(declared_in)) = (implemented, declared_in) {
            diags.error(
                SemanticError::AbstractNotImplemented {
                    method: table.name(name).to_string(),
                    on_type: table.symbol_name(aggregate).to_string(),
                    declared_in: display_type(table, declared_in),
                    span: span.into(),
                },
                span,
            );
        }
    }
    diags.error_count() == before
}

