// methods/resolution.rs

use ek9_identity::{Name, SymbolId};
use smallvec::SmallVec;

use crate::compatibility::weight_of_match;
use crate::symbols::{SymbolList, SymbolSearch, SymbolTable};

/// Outcome of overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResolution {
    Found(SymbolId),
    /// Every candidate tied for the lowest weight.
    Ambiguous(SmallVec<[SymbolId; 4]>),
    NotFound,
}

impl MethodResolution {
    pub fn found(&self) -> Option<SymbolId> {
        match self {
            MethodResolution::Found(id) => Some(*id),
            _ => None,
        }
    }
}

/// Methods named `name` visible on `ty`, own declarations first.
///
/// Inherited methods whose signature is already provided by a nearer type are
/// skipped. Constructors are never inherited.
pub fn gather_methods(table: &SymbolTable, ty: SymbolId, name: Name) -> Vec<SymbolId> {
    let mut found: Vec<SymbolId> = Vec::new();
    let mut signatures: Vec<SymbolList> = Vec::new();
    let own = std::iter::once(ty);
    for owner in own.chain(table.ancestors(ty)) {
        for method in table.methods_named(owner, name) {
            if owner != ty && table.get(method).is_constructor() {
                continue;
            }
            let signature = table.param_types(method);
            if owner != ty && signatures.contains(&signature) {
                continue;
            }
            signatures.push(signature);
            found.push(method);
        }
    }
    found
}

/// Constructors declared directly on `ty`.
///
/// Matched by flag: an instantiation keeps the template's constructor name.
pub fn gather_constructors(table: &SymbolTable, ty: SymbolId) -> Vec<SymbolId> {
    table
        .members(ty)
        .iter()
        .copied()
        .filter(|m| table.get(*m).is_constructor())
        .collect()
}

/// Pick the candidate with the lowest summed argument weight.
///
/// Candidates whose arity differs or with any incompatible argument are
/// discarded. Weights within `epsilon` of the best are ties.
pub fn best_match(
    table: &SymbolTable,
    candidates: &[SymbolId],
    args: &[SymbolId],
    epsilon: f64,
) -> MethodResolution {
    let mut scored: Vec<(SymbolId, f64)> = Vec::new();
    'candidates: for candidate in candidates {
        let params = table.param_types(*candidate);
        if params.len() != args.len() {
            continue;
        }
        let mut total = 0.0;
        for (arg, param) in args.iter().zip(&params) {
            let weight = weight_of_match(table, *arg, *param);
            if weight < 0.0 {
                continue 'candidates;
            }
            total += weight;
        }
        scored.push((*candidate, total));
    }

    let Some(best) = scored.iter().map(|(_, w)| *w).reduce(f64::min) else {
        return MethodResolution::NotFound;
    };
    let tied: SmallVec<[SymbolId; 4]> = scored
        .iter()
        .filter(|(_, w)| (*w - best).abs() <= epsilon)
        .map(|(id, _)| *id)
        .collect();
    match tied.as_slice() {
        [single] => MethodResolution::Found(*single),
        _ => MethodResolution::Ambiguous(tied),
    }
}

/// Resolve `name(args)` on `ty` across its own and inherited methods.
#[tracing::instrument(
    level = "trace",
    skip(table, args),
    fields(ty = %table.symbol_name(ty), method = %table.name(name))
)]
pub fn resolve_method(
    table: &SymbolTable,
    ty: SymbolId,
    name: Name,
    args: &[SymbolId],
    epsilon: f64,
) -> MethodResolution {
    let candidates = gather_methods(table, ty, name);
    best_match(table, &candidates, args, epsilon)
}

/// Whether `ty` (or an ancestor) declares operator `op` taking `arity` arguments.
pub fn has_operator(table: &SymbolTable, ty: SymbolId, op: &str, arity: usize) -> bool {
    let Some(name) = table.lookup_name(op) else {
        return false;
    };
    if table
        .resolve_in_hierarchy(ty, SymbolSearch::method(name))
        .is_none()
    {
        return false;
    }
    gather_methods(table, ty, name)
        .iter()
        .any(|m| table.param_types(*m).len() == arity)
}
