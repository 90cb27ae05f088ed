// methods/hierarchy.rs
//
// Structural checks on supertype and trait links.

use ek9_identity::SymbolId;
use rustc_hash::FxHashSet;

use crate::diagnostics::Diagnostics;
use crate::errors::SemanticError;
use crate::symbols::{AggregateKind, SymbolSearch, SymbolTable, builtin};
use crate::type_display::display_type;

/// Report a hierarchy that leads back to `ty` and cut the offending link so
/// later walks over the same type terminate.
pub fn check_circular_hierarchy(
    table: &mut SymbolTable,
    ty: SymbolId,
    max_depth: usize,
    diags: &mut Diagnostics,
) -> bool {
    let Some(path) = find_cycle(table, ty, max_depth) else {
        return true;
    };
    let rendered = path
        .iter()
        .map(|id| display_type(table, *id))
        .collect::<Vec<_>>()
        .join(" -> ");
    let span = table.get(ty).span;
    diags.error(
        SemanticError::CircularHierarchy {
            path: rendered,
            span: span.into(),
        },
        span,
    );

    let link = path.get(1).copied().unwrap_or(ty);
    if let Some(info) = table.aggregate_mut(ty) {
        if info.supertype == Some(link) {
            info.supertype = None;
        }
        info.traits.retain(|t| *t != link);
    } else if let Some(info) = table.function_mut(ty)
        && info.supertype == Some(link)
    {
        info.supertype = None;
    }
    tracing::debug!(ty = table.symbol_name(ty), "broke circular hierarchy link");
    false
}

fn find_cycle(table: &SymbolTable, start: SymbolId, max_depth: usize) -> Option<Vec<SymbolId>> {
    let mut visited = FxHashSet::default();
    let mut stack: Vec<Vec<SymbolId>> = vec![vec![start]];
    while let Some(path) = stack.pop() {
        let Some(&node) = path.last() else {
            continue;
        };
        for next in table.direct_supers(node) {
            if next == start {
                let mut cycle = path.clone();
                cycle.push(start);
                return Some(cycle);
            }
            if path.len() <= max_depth && visited.insert(next) {
                let mut extended = path.clone();
                extended.push(next);
                stack.push(extended);
            }
        }
    }
    None
}

/// Whether `sub` may name `base` as its supertype (`as_trait == false`) or in
/// its trait list. Returns the reason when it may not.
pub fn check_extension(
    table: &SymbolTable,
    sub: SymbolId,
    base: SymbolId,
    as_trait: bool,
) -> Result<(), String> {
    if base == builtin::UNRESOLVED {
        return Ok(());
    }
    if base == sub {
        return Err("a type cannot extend itself".to_string());
    }

    if table.function(sub).is_some() {
        return match table.function(base) {
            Some(info) if info.is_abstract => Ok(()),
            Some(_) => Err("only abstract functions can be extended".to_string()),
            None => Err("a function can only extend a function".to_string()),
        };
    }

    let (Some(sub_info), Some(base_info)) = (table.aggregate(sub), table.aggregate(base)) else {
        return Err("it is not a type that can be extended".to_string());
    };

    if as_trait {
        return if base_info.kind == AggregateKind::Trait {
            Ok(())
        } else {
            Err(format!(
                "only traits can be listed, '{}' is a {}",
                display_type(table, base),
                base_info.kind.as_str()
            ))
        };
    }
    if base == builtin::ANY {
        return Ok(());
    }
    if base_info.kind == AggregateKind::Trait {
        return Err("traits are implemented with 'with trait of', not extended".to_string());
    }
    if base_info.kind != sub_info.kind {
        return Err(format!(
            "a {} cannot extend a {}",
            sub_info.kind.as_str(),
            base_info.kind.as_str()
        ));
    }
    if base_info.builtin {
        return Err("built-in types are closed".to_string());
    }
    if !base_info.is_open && !base_info.is_abstract {
        return Err("it is not open for extension".to_string());
    }
    Ok(())
}

/// Own properties must not redeclare a property of any ancestor.
pub fn check_duplicate_properties(
    table: &SymbolTable,
    aggregate: SymbolId,
    diags: &mut Diagnostics,
) -> bool {
    let before = diags.error_count();
    let ancestors = table.ancestors(aggregate);
    for property in table.properties(aggregate) {
        let name = table.get(property).name;
        let inherited = ancestors.iter().find(|ancestor| {
            table
                .resolve_member_only(**ancestor, SymbolSearch::variable(name))
                .is_some()
        });
        if let Some(inherited_from) = inherited {
            let span = table.get(property).span;
            diags.error(
                SemanticError::DuplicateProperty {
                    name: table.name(name).to_string(),
                    on_type: table.symbol_name(aggregate).to_string(),
                    inherited_from: display_type(table, *inherited_from),
                    span: span.into(),
                },
                span,
            );
        }
    }
    diags.error_count() == before
}
