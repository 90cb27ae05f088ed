// methods/defaults.rs
//
// Derivability checks for operators a type asks the compiler to generate.
//
// Each check runs regardless of the others so one pass reports every problem
// on the type. A failure on a property is reported at the property, a failure
// on the supertype at the type itself.

use ek9_identity::{Span, SymbolId};
use rustc_hash::FxHashMap;

use super::UNIVERSAL_BASE;
use super::resolution::has_operator;
use crate::diagnostics::Diagnostics;
use crate::errors::SemanticError;
use crate::symbols::well_known::COMPARISON_OPERATORS;
use crate::symbols::{SymbolKind, SymbolTable, builtin};
use crate::type_display::display_type;

/// Operators produced by a bare `default operator`.
pub const DEFAULTABLE_OPERATORS: [&str; 11] = [
    "==", "<>", "<", "<=", ">", ">=", "<=>", "$", "$$", "#?", "?",
];

/// Operators whose generated body calls the same operator on every field.
const FIELD_WISE_UNARY: [&str; 4] = ["$", "#?", "$$", "?"];

/// Operator name that a delegate property may still take part in.
const DELEGATE_SAFE: &str = "?";

pub fn is_defaultable(op: &str) -> bool {
    DEFAULTABLE_OPERATORS.contains(&op)
}

struct Defaulted {
    op: String,
}

/// Verify every defaulted operator on `aggregate` can actually be generated.
///
/// Returns false when any requirement is missing.
#[tracing::instrument(
    level = "debug",
    skip(table, diags),
    fields(ty = %table.symbol_name(aggregate))
)]
pub fn default_operators_or_error(
    table: &SymbolTable,
    aggregate: SymbolId,
    diags: &mut Diagnostics,
) -> bool {
    let defaulted: Vec<Defaulted> = table
        .members(aggregate)
        .iter()
        .filter_map(|m| {
            let method = table.method(*m)?;
            method.flags.defaulted.then(|| Defaulted {
                op: table.symbol_name(*m).to_string(),
            })
        })
        .collect();
    if defaulted.is_empty() {
        return true;
    }

    let before = diags.error_count();
    let span = table.get(aggregate).span;
    let properties = table.properties(aggregate);
    let supertype = table
        .supertype_of(aggregate)
        .filter(|s| *s != UNIVERSAL_BASE && *s != builtin::UNRESOLVED);

    check_delegates(table, &properties, &defaulted, diags);
    check_comparisons(table, aggregate, supertype, &properties, &defaulted, span, diags);
    check_field_wise(table, supertype, &properties, &defaulted, span, diags);
    if defaulted.iter().any(|d| d.op == "$$") {
        check_field_names(table, aggregate, &properties, diags);
    }
    diags.error_count() == before
}

fn is_delegate(table: &SymbolTable, ty: SymbolId) -> bool {
    table.function(ty).is_some()
}

fn check_delegates(
    table: &SymbolTable,
    properties: &[SymbolId],
    defaulted: &[Defaulted],
    diags: &mut Diagnostics,
) {
    for property in properties {
        if !is_delegate(table, table.type_of(*property)) {
            continue;
        }
        if let Some(offending) = defaulted.iter().find(|d| d.op != DELEGATE_SAFE) {
            let span = table.get(*property).span;
            diags.error(
                SemanticError::DelegateOperator {
                    property: table.symbol_name(*property).to_string(),
                    operator: offending.op.clone(),
                    span: span.into(),
                },
                span,
            );
        }
    }
}

/// Comparison operators are generated from `<=>`, which the supertype must
/// offer. When `<=>` itself is generated, every property type needs it too.
fn check_comparisons(
    table: &SymbolTable,
    aggregate: SymbolId,
    supertype: Option<SymbolId>,
    properties: &[SymbolId],
    defaulted: &[Defaulted],
    span: Span,
    diags: &mut Diagnostics,
) {
    let Some(first) = defaulted
        .iter()
        .find(|d| d.op == "<=>" || COMPARISON_OPERATORS.contains(&d.op.as_str()))
    else {
        return;
    };

    if let Some(supertype) = supertype
        && !has_operator(table, supertype, "<=>", 1)
    {
        missing(table, "<=>", supertype, &first.op, span, diags);
    }

    let compare_declared = table.lookup_name("<=>").is_some_and(|name| {
        table
            .methods_named(aggregate, name)
            .iter()
            .any(|m| table.method(*m).is_some_and(|info| !info.flags.defaulted))
    });
    if compare_declared {
        return;
    }
    for property in properties {
        let ty = table.type_of(*property);
        if skip_property_type(table, ty) {
            continue;
        }
        if !has_operator(table, ty, "<=>", 1) {
            missing(table, "<=>", ty, &first.op, table.get(*property).span, diags);
        }
    }
}

fn check_field_wise(
    table: &SymbolTable,
    supertype: Option<SymbolId>,
    properties: &[SymbolId],
    defaulted: &[Defaulted],
    span: Span,
    diags: &mut Diagnostics,
) {
    for entry in defaulted
        .iter()
        .filter(|d| FIELD_WISE_UNARY.contains(&d.op.as_str()))
    {
        if let Some(supertype) = supertype
            && !has_operator(table, supertype, &entry.op, 0)
        {
            missing(table, &entry.op, supertype, &entry.op, span, diags);
        }
        for property in properties {
            let ty = table.type_of(*property);
            if skip_property_type(table, ty) {
                continue;
            }
            if !has_operator(table, ty, &entry.op, 0) {
                missing(table, &entry.op, ty, &entry.op, table.get(*property).span, diags);
            }
        }
    }
}

/// Output keys of `$$` are property names, so they must be unique across the
/// type and its supertype chain.
fn check_field_names(
    table: &SymbolTable,
    aggregate: SymbolId,
    properties: &[SymbolId],
    diags: &mut Diagnostics,
) {
    let mut seen: FxHashMap<&str, SymbolId> = FxHashMap::default();
    let mut chain = Vec::new();
    let mut current = table.supertype_of(aggregate);
    while let Some(ty) = current {
        if ty == aggregate || chain.contains(&ty) {
            break;
        }
        chain.push(ty);
        current = table.supertype_of(ty);
    }
    for inherited in chain.iter().rev() {
        for property in table.properties(*inherited) {
            seen.insert(table.symbol_name(property), property);
        }
    }
    for property in properties {
        let name = table.symbol_name(*property);
        if seen.insert(name, *property).is_some() {
            let span = table.get(*property).span;
            diags.error(
                SemanticError::DuplicateFieldName {
                    field: name.to_string(),
                    on_type: table.symbol_name(aggregate).to_string(),
                    span: span.into(),
                },
                span,
            );
        }
    }
}

/// Property types that cannot be judged here: the universal base, unresolved
/// types, conceptual type parameters and delegates (checked separately).
fn skip_property_type(table: &SymbolTable, ty: SymbolId) -> bool {
    ty == UNIVERSAL_BASE
        || ty == builtin::UNRESOLVED
        || matches!(table.get(ty).kind, SymbolKind::TypeParameter { .. })
        || is_delegate(table, ty)
}

fn missing(
    table: &SymbolTable,
    operator: &str,
    on_type: SymbolId,
    required_by: &str,
    span: Span,
    diags: &mut Diagnostics,
) {
    diags.error(
        SemanticError::MissingOperator {
            operator: operator.to_string(),
            on_type: display_type(table, on_type),
            required_by: required_by.to_string(),
            span: span.into(),
        },
        span,
    );
}
