// pipeline/stages.rs
//
// One rule per stage kind. Each rule validates its own arguments against the
// flowing type and returns the type it hands to the next stage.

use ek9_identity::SymbolId;

use super::{BoundArg, BoundStage, StageCx, StageKind, check_terminal};
use crate::compatibility::is_assignable;
use crate::generic;
use crate::methods::has_operator;
use crate::symbols::{SymbolList, SymbolSearch, SymbolTable, builtin};

pub type StageRule = fn(&mut StageCx<'_>, &BoundStage, SymbolId) -> SymbolId;

/// Dispatch table from stage kind to its rule.
pub static STAGE_RULES: [(StageKind, StageRule); 17] = [
    (StageKind::Filter, filter),
    (StageKind::Select, filter),
    (StageKind::Map, map),
    (StageKind::Group, group),
    (StageKind::Sort, sort),
    (StageKind::Uniq, uniq),
    (StageKind::Join, join),
    (StageKind::Split, split),
    (StageKind::Flatten, flatten),
    (StageKind::Tee, tee),
    (StageKind::Head, limit),
    (StageKind::Tail, limit),
    (StageKind::Skip, limit),
    (StageKind::Call, call),
    (StageKind::Async, call),
    (StageKind::Max, extreme),
    (StageKind::Min, extreme),
];

pub(super) fn rule_for(kind: StageKind) -> StageRule {
    STAGE_RULES
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(unknown as StageRule, |(_, rule)| *rule)
}

fn unknown(cx: &mut StageCx<'_>, stage: &BoundStage, _current: SymbolId) -> SymbolId {
    cx.mismatch(stage, "is not a pipeline operation")
}

/// Signature of a function-valued argument.
fn signature(table: &SymbolTable, arg: &BoundArg) -> Option<(SymbolList, SymbolId)> {
    table.function(arg.ty)?;
    Some((table.param_types(arg.ty), table.return_type(arg.ty)))
}

/// Exactly one function argument taking a single value of the flowing type.
fn unary_function(
    cx: &mut StageCx<'_>,
    stage: &BoundStage,
    current: SymbolId,
) -> Result<SymbolId, SymbolId> {
    let [arg] = stage.args.as_slice() else {
        return Err(cx.mismatch(stage, "requires exactly one function"));
    };
    function_of_one(cx, stage, arg, current)
}

pub(super) fn function_of_one(
    cx: &mut StageCx<'_>,
    stage: &BoundStage,
    arg: &BoundArg,
    current: SymbolId,
) -> Result<SymbolId, SymbolId> {
    if arg.ty == builtin::UNRESOLVED {
        return Err(builtin::UNRESOLVED);
    }
    let Some((params, ret)) = signature(cx.table, arg) else {
        let found = cx.name(arg.ty);
        return Err(cx.mismatch(stage, format!("requires a function, found {found}")));
    };
    match params.as_slice() {
        [param] if is_assignable(cx.table, current, *param) => Ok(ret),
        [param] => {
            let (flowing, param) = (cx.name(current), cx.name(*param));
            Err(cx.mismatch(
                stage,
                format!("function accepts {param} but {flowing} is flowing"),
            ))
        }
        _ => Err(cx.mismatch(
            stage,
            format!("function must take one parameter, takes {}", params.len()),
        )),
    }
}

/// Zero or one function; returns the optional function's result type.
fn optional_function(
    cx: &mut StageCx<'_>,
    stage: &BoundStage,
    current: SymbolId,
) -> Result<Option<SymbolId>, SymbolId> {
    match stage.args.as_slice() {
        [] => Ok(None),
        [arg] => function_of_one(cx, stage, arg, current).map(Some),
        _ => Err(cx.mismatch(stage, "accepts at most one function")),
    }
}

fn filter(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    match unary_function(cx, stage, current) {
        Ok(ret) if ret == builtin::BOOLEAN || ret == builtin::UNRESOLVED => current,
        Ok(ret) => {
            let found = cx.name(ret);
            cx.mismatch(stage, format!("function must return Boolean, returns {found}"))
        }
        Err(unresolved) => unresolved,
    }
}

fn map(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    unary_function(cx, stage, current).unwrap_or_else(|unresolved| unresolved)
}

fn list_of(cx: &mut StageCx<'_>, stage: &BoundStage, element: SymbolId) -> SymbolId {
    let list = cx.table.well_known().list;
    match generic::resolve_or_define(cx.table, list, &[element], cx.max_depth) {
        Ok(id) => id,
        Err(err) => {
            let error = err.to_semantic(cx.table, stage.span);
            cx.diags.error(error, stage.span);
            builtin::UNRESOLVED
        }
    }
}

fn require_operator(
    cx: &mut StageCx<'_>,
    stage: &BoundStage,
    ty: SymbolId,
    op: &str,
    arity: usize,
) -> bool {
    if ty == builtin::UNRESOLVED || has_operator(cx.table, ty, op, arity) {
        return true;
    }
    let name = cx.name(ty);
    cx.mismatch(stage, format!("requires operator '{op}' on {name}"));
    false
}

fn group(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    let key = match optional_function(cx, stage, current) {
        Ok(key) => key.unwrap_or(current),
        Err(unresolved) => return unresolved,
    };
    if !require_operator(cx, stage, key, "#?", 0) {
        return builtin::UNRESOLVED;
    }
    list_of(cx, stage, current)
}

fn uniq(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    let key = match optional_function(cx, stage, current) {
        Ok(key) => key.unwrap_or(current),
        Err(unresolved) => return unresolved,
    };
    if require_operator(cx, stage, key, "#?", 0) {
        current
    } else {
        builtin::UNRESOLVED
    }
}

/// Ordering stages take either nothing (the element's own `<=>`) or a
/// comparator of two elements returning Integer.
fn ordering(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    match stage.args.as_slice() {
        [] => {
            if require_operator(cx, stage, current, "<=>", 1) {
                current
            } else {
                builtin::UNRESOLVED
            }
        }
        [arg] => {
            let Some((params, ret)) = signature(cx.table, arg) else {
                let found = cx.name(arg.ty);
                let detail = format!("requires a comparator function, found {found}");
                return cx.mismatch(stage, detail);
            };
            let accepts_both = params.len() == 2
                && params.iter().all(|p| is_assignable(cx.table, current, *p));
            if !accepts_both {
                let flowing = cx.name(current);
                return cx.mismatch(
                    stage,
                    format!("comparator must take two parameters accepting {flowing}"),
                );
            }
            if ret != builtin::INTEGER && ret != builtin::UNRESOLVED {
                return cx.mismatch(stage, "comparator must return Integer");
            }
            current
        }
        _ => cx.mismatch(stage, "accepts at most one comparator"),
    }
}

fn sort(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    ordering(cx, stage, current)
}

fn extreme(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    ordering(cx, stage, current)
}

fn join(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    let [arg] = stage.args.as_slice() else {
        return cx.mismatch(stage, "requires exactly one function");
    };
    let Some((params, ret)) = signature(cx.table, arg) else {
        let found = cx.name(arg.ty);
        return cx.mismatch(stage, format!("requires a function, found {found}"));
    };
    let accepts_both =
        params.len() == 2 && params.iter().all(|p| is_assignable(cx.table, current, *p));
    if !accepts_both {
        let flowing = cx.name(current);
        return cx.mismatch(
            stage,
            format!("function must take two parameters accepting {flowing}"),
        );
    }
    if !is_assignable(cx.table, ret, current) {
        let (ret, flowing) = (cx.name(ret), cx.name(current));
        let detail = format!("function returns {ret}, not assignable to {flowing}");
        return cx.mismatch(stage, detail);
    }
    current
}

fn split(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    match unary_function(cx, stage, current) {
        Ok(ret) if ret == builtin::BOOLEAN || ret == builtin::UNRESOLVED => {
            list_of(cx, stage, current)
        }
        Ok(ret) => {
            let found = cx.name(ret);
            cx.mismatch(stage, format!("function must return Boolean, returns {found}"))
        }
        Err(unresolved) => unresolved,
    }
}

/// Element type produced by iterating `ty`: an `Iterator of X` or anything
/// whose `iterator()` returns one.
pub fn element_type(table: &SymbolTable, ty: SymbolId) -> Option<SymbolId> {
    let iterator = table.well_known().iterator;
    let iterated = |candidate: SymbolId| {
        table
            .parameterization(candidate)
            .filter(|p| p.template == iterator)
            .and_then(|p| p.args.first().copied())
    };
    if let Some(element) = iterated(ty) {
        return Some(element);
    }
    let name = table.lookup_name("iterator")?;
    let method = table.resolve_in_hierarchy(ty, SymbolSearch::method(name))?;
    if !table.param_types(method).is_empty() {
        return None;
    }
    iterated(table.return_type(method))
}

fn flatten(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    if !stage.args.is_empty() {
        return cx.mismatch(stage, "takes no arguments");
    }
    match element_type(cx.table, current) {
        Some(element) => element,
        None => {
            let ty = cx.name(current);
            cx.diags.error(
                crate::errors::SemanticError::NotIterable {
                    ty,
                    span: stage.span.into(),
                },
                stage.span,
            );
            builtin::UNRESOLVED
        }
    }
}

/// The side branch sees the flowing type (or the mapping's result) and is
/// checked against its own terminal; the main flow is unchanged.
fn tee(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    if stage.args.len() > 2 {
        return cx.mismatch(stage, "accepts at most two functions");
    }
    let mut branch_type = current;
    if let Some(mapping) = stage.args.first() {
        match function_of_one(cx, stage, mapping, current) {
            Ok(ret) if ret == builtin::VOID => {
                return cx.mismatch(stage, "mapping function must return a value");
            }
            Ok(ret) => branch_type = ret,
            Err(unresolved) => return unresolved,
        }
    }
    if let Some(terminal_fn) = stage.args.get(1)
        && let Err(unresolved) = function_of_one(cx, stage, terminal_fn, branch_type)
    {
        return unresolved;
    }
    if let Some(branch) = &stage.branch {
        check_terminal(cx, branch, branch_type);
    }
    current
}

fn limit(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    match stage.args.as_slice() {
        [] => current,
        [arg] => {
            let produced = match signature(cx.table, arg) {
                Some((params, ret)) if params.is_empty() => ret,
                Some(_) => return cx.mismatch(stage, "count function must take no parameters"),
                None => arg.ty,
            };
            if produced == builtin::INTEGER || produced == builtin::UNRESOLVED {
                current
            } else {
                let found = cx.name(produced);
                cx.mismatch(stage, format!("count must be Integer, found {found}"))
            }
        }
        _ => cx.mismatch(stage, "accepts at most one count"),
    }
}

fn call(cx: &mut StageCx<'_>, stage: &BoundStage, current: SymbolId) -> SymbolId {
    if !stage.args.is_empty() {
        return cx.mismatch(stage, "takes no arguments");
    }
    if cx.table.function(current).is_none() {
        let found = cx.name(current);
        return cx.mismatch(stage, format!("requires a flowing function, found {found}"));
    }
    if !cx.table.param_types(current).is_empty() {
        return cx.mismatch(stage, "flowing function must take no parameters");
    }
    cx.table.return_type(current)
}
