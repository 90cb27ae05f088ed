// compatibility.rs
//
// Assignment compatibility expressed as a single scalar weight. Overload
// resolution minimizes the summed weight over arguments, so the weights must be
// ordered: exact < hierarchy < promotion < universal base type.

use ek9_identity::SymbolId;
use rustc_hash::FxHashMap;

use crate::symbols::{SymbolSearch, SymbolTable, builtin};

/// Identical types.
pub const EXACT: f64 = 0.0;
/// Cost of each step up through a supertype.
pub const SUPERTYPE_STEP: f64 = 0.05;
/// Cost of each step up through a trait.
pub const TRAIT_STEP: f64 = 0.1;
/// Cost of one `#^` promotion, added to the hierarchy distance of the promoted type.
pub const PROMOTION_COST: f64 = 0.5;
/// Matching only through the universal base type.
pub const ANY_WEIGHT: f64 = 20.0;
/// Not assignable.
pub const NO_MATCH: f64 = -1.0;

/// Name of the promotion operator.
pub const PROMOTE_OPERATOR: &str = "#^";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Hierarchy,
    Promotion,
    Universal,
    Incompatible,
}

/// Weight of assigning a `from` value to a `to` slot; negative when incompatible.
pub fn weight_of_match(table: &SymbolTable, from: SymbolId, to: SymbolId) -> f64 {
    classify_match(table, from, to).1
}

pub fn is_assignable(table: &SymbolTable, from: SymbolId, to: SymbolId) -> bool {
    weight_of_match(table, from, to) >= 0.0
}

/// Kind and weight of a match.
pub fn classify_match(table: &SymbolTable, from: SymbolId, to: SymbolId) -> (MatchKind, f64) {
    if from == to {
        return (MatchKind::Exact, EXACT);
    }
    // An unresolved operand has already been reported; treat it as matching.
    if from == builtin::UNRESOLVED || to == builtin::UNRESOLVED {
        return (MatchKind::Exact, EXACT);
    }
    if from == builtin::VOID || to == builtin::VOID {
        return (MatchKind::Incompatible, NO_MATCH);
    }
    if let Some(cost) = hierarchy_cost(table, from, to) {
        return (MatchKind::Hierarchy, cost);
    }
    if let Some(cost) = promotion_cost(table, from, to) {
        return (MatchKind::Promotion, cost);
    }
    if to == builtin::ANY {
        return (MatchKind::Universal, ANY_WEIGHT);
    }
    (MatchKind::Incompatible, NO_MATCH)
}

/// Cheapest path from `from` up to `to` through supertypes and traits.
fn hierarchy_cost(table: &SymbolTable, from: SymbolId, to: SymbolId) -> Option<f64> {
    let mut best: FxHashMap<SymbolId, f64> = FxHashMap::default();
    best.insert(from, EXACT);
    let mut work = vec![(from, EXACT)];
    let mut found: Option<f64> = None;

    while let Some((ty, cost)) = work.pop() {
        if best.get(&ty).is_some_and(|known| *known < cost) {
            continue;
        }
        if ty == to {
            found = Some(found.map_or(cost, |f: f64| f.min(cost)));
            continue;
        }
        let supertype = table.supertype_of(ty).map(|s| (s, SUPERTYPE_STEP));
        let traits = table.traits_of(ty).iter().map(|t| (*t, TRAIT_STEP));
        for (next, step) in supertype.into_iter().chain(traits) {
            let next_cost = cost + step;
            if best.get(&next).is_none_or(|known| next_cost < *known) {
                best.insert(next, next_cost);
                work.push((next, next_cost));
            }
        }
    }
    found
}

/// A single `#^` promotion followed by a hierarchy walk.
fn promotion_cost(table: &SymbolTable, from: SymbolId, to: SymbolId) -> Option<f64> {
    let promote = table.lookup_name(PROMOTE_OPERATOR)?;
    if table.aggregate(from).is_none() {
        return None;
    }
    let op = table
        .resolve_in_hierarchy(from, SymbolSearch::method(promote))
        .filter(|op| table.param_types(*op).is_empty())?;
    let promoted = table.return_type(op);
    if promoted == from || promoted == builtin::VOID {
        return None;
    }
    let distance = if promoted == to {
        EXACT
    } else {
        hierarchy_cost(table, promoted, to)?
    };
    Some(PROMOTION_COST + distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_types_are_exact() {
        let table = SymbolTable::new();
        assert_eq!(
            classify_match(&table, builtin::INTEGER, builtin::INTEGER),
            (MatchKind::Exact, EXACT)
        );
    }

    #[test]
    fn integer_promotes_to_float() {
        let table = SymbolTable::new();
        let (kind, weight) = classify_match(&table, builtin::INTEGER, builtin::FLOAT);
        assert_eq!(kind, MatchKind::Promotion);
        assert!(weight > EXACT && weight < ANY_WEIGHT);
        // No demotion.
        assert_eq!(weight_of_match(&table, builtin::FLOAT, builtin::INTEGER), NO_MATCH);
    }

    #[test]
    fn everything_reaches_any_at_the_top_weight() {
        let table = SymbolTable::new();
        assert_eq!(
            classify_match(&table, builtin::STRING, builtin::ANY),
            (MatchKind::Universal, ANY_WEIGHT)
        );
    }

    #[test]
    fn void_matches_only_itself() {
        let table = SymbolTable::new();
        assert_eq!(weight_of_match(&table, builtin::VOID, builtin::ANY), NO_MATCH);
        assert_eq!(weight_of_match(&table, builtin::INTEGER, builtin::VOID), NO_MATCH);
        assert_eq!(weight_of_match(&table, builtin::VOID, builtin::VOID), EXACT);
    }

    #[test]
    fn unresolved_suppresses_mismatch() {
        let table = SymbolTable::new();
        assert_eq!(weight_of_match(&table, builtin::UNRESOLVED, builtin::STRING), EXACT);
        assert_eq!(weight_of_match(&table, builtin::BOOLEAN, builtin::UNRESOLVED), EXACT);
    }

    #[test]
    fn unrelated_scalars_do_not_match() {
        let table = SymbolTable::new();
        assert!(!is_assignable(&table, builtin::STRING, builtin::INTEGER));
        assert!(!is_assignable(&table, builtin::BOOLEAN, builtin::FLOAT));
    }
}
