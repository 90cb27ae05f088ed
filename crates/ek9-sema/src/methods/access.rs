// methods/access.rs
//
// Visibility checks for members accessed from a given declarative scope.

use ek9_identity::{ScopeId, Span, SymbolId};
use thiserror::Error;

use super::generic_origin;
use crate::diagnostics::Diagnostics;
use crate::errors::SemanticError;
use crate::symbols::{ScopeKind, SymbolSearch, SymbolTable, Visibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("private member accessed outside its declaring scope")]
    Private,
    #[error("protected member accessed from an unrelated type")]
    ProtectedUnrelated,
    #[error("protected member accessed from outside any type")]
    ProtectedOutsideAggregate,
}

/// Check whether `member` may be used from the declarative scope `from`.
///
/// `from` is the most specific scope of the access site; `None` means the
/// access has no declarative context at all.
pub fn check_access(
    table: &SymbolTable,
    from: Option<ScopeId>,
    member: SymbolId,
) -> Result<(), AccessDenied> {
    let def = table.get(member);
    match def.visibility {
        Visibility::Public => Ok(()),
        Visibility::Private => {
            if def.scope.is_some() && same_declaring_scope(table, from, def.scope) {
                Ok(())
            } else {
                Err(AccessDenied::Private)
            }
        }
        Visibility::Protected => {
            let Some(accessing) = from.and_then(|scope| table.aggregate_of_scope(scope)) else {
                return Err(AccessDenied::ProtectedOutsideAggregate);
            };
            let Some(declaring) = def.scope.and_then(|scope| table.aggregate_of_scope(scope)) else {
                return Ok(());
            };
            if in_same_hierarchy(table, accessing, declaring) {
                Ok(())
            } else {
                Err(AccessDenied::ProtectedUnrelated)
            }
        }
    }
}

/// As `check_access`, but a private property must also be the symbol that a
/// strict lookup of its name in the declaring scope finds.
pub fn check_property_access(
    table: &SymbolTable,
    from: Option<ScopeId>,
    property: SymbolId,
) -> Result<(), AccessDenied> {
    check_access(table, from, property)?;
    let def = table.get(property);
    if def.visibility == Visibility::Private {
        let Some(declaring) = def.scope else {
            return Err(AccessDenied::Private);
        };
        let found = table.resolve_in_this_scope_only(declaring, SymbolSearch::variable(def.name));
        if found != Some(property) {
            return Err(AccessDenied::Private);
        }
    }
    Ok(())
}

/// Report a `NotAccessible` error if `member` cannot be reached from `from`.
pub fn access_or_error(
    table: &SymbolTable,
    from: Option<ScopeId>,
    member: SymbolId,
    span: Span,
    diags: &mut Diagnostics,
) -> bool {
    report(table, from, member, span, diags, check_access(table, from, member))
}

pub fn property_access_or_error(
    table: &SymbolTable,
    from: Option<ScopeId>,
    property: SymbolId,
    span: Span,
    diags: &mut Diagnostics,
) -> bool {
    let result = check_property_access(table, from, property);
    report(table, from, property, span, diags, result)
}

fn report(
    table: &SymbolTable,
    from: Option<ScopeId>,
    member: SymbolId,
    span: Span,
    diags: &mut Diagnostics,
    result: Result<(), AccessDenied>,
) -> bool {
    let Err(denied) = result else {
        return true;
    };
    tracing::trace!(member = table.symbol_name(member), %denied, "access denied");
    diags.error(
        SemanticError::NotAccessible {
            name: table.symbol_name(member).to_string(),
            visibility: table.get(member).visibility.as_str().to_string(),
            from: describe_scope(table, from),
            span: span.into(),
        },
        span,
    );
    false
}

/// Private identity is per type, so an instantiation's members count as
/// declared in the template's body.
fn same_declaring_scope(
    table: &SymbolTable,
    from: Option<ScopeId>,
    declared: Option<ScopeId>,
) -> bool {
    let (Some(from), Some(declared)) = (from, declared) else {
        return false;
    };
    if from == declared {
        return true;
    }
    match (table.aggregate_of_scope(from), table.aggregate_of_scope(declared)) {
        (Some(a), Some(b)) => generic_origin(table, a) == generic_origin(table, b),
        _ => false,
    }
}

fn in_same_hierarchy(table: &SymbolTable, a: SymbolId, b: SymbolId) -> bool {
    let a = generic_origin(table, a);
    let b = generic_origin(table, b);
    let reaches = |from: SymbolId, to: SymbolId| {
        from == to
            || table
                .ancestors(from)
                .into_iter()
                .any(|ancestor| generic_origin(table, ancestor) == to)
    };
    reaches(a, b) || reaches(b, a)
}

fn describe_scope(table: &SymbolTable, scope: Option<ScopeId>) -> String {
    let Some(scope) = scope else {
        return "<unknown>".to_string();
    };
    let def = table.scope(scope);
    match (def.kind, def.owner) {
        (ScopeKind::Module, _) | (_, None) => table.module_info(def.module).path.clone(),
        (ScopeKind::CaptureBlock, Some(_)) => "dynamic function".to_string(),
        (_, Some(owner)) => table.symbol_name(owner).to_string(),
    }
}
