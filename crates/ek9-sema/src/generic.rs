// generic.rs
//
// Parameterization of generic templates into concrete instantiations.
//
// Instantiations are cached by (template, ordered arguments), so asking for
// `List of Integer` twice yields the same SymbolId. A skeleton is cached before
// its members are derived, which lets a member that mentions its own
// instantiation (a `List of T` method returning `List of T`) re-enter safely.
// An instance whose derivation fails stays cached as failed, so every later
// request for it yields the same error.

use ek9_identity::{Name, ScopeId, Span, SymbolId};
use thiserror::Error;

use crate::compatibility::weight_of_match;
use crate::errors::SemanticError;
use crate::symbols::{
    AggregateInfo, FunctionInfo, MethodInfo, Parameterization, ScopeKind, SymbolDef, SymbolKind,
    SymbolList, SymbolTable, VariableRole, builtin,
};
use crate::type_display::{display_type, parameterized_name};

/// Default ceiling on nested parameterization.
pub const DEFAULT_INSTANTIATION_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterizeError {
    #[error("symbol {template:?} is not a generic template")]
    NotGeneric { template: SymbolId },
    #[error("expected {expected} type arguments, found {found}")]
    ArityMismatch {
        template: SymbolId,
        expected: usize,
        found: usize,
    },
    #[error("parameterization nested deeper than {limit}")]
    TooDeep { template: SymbolId, limit: usize },
    #[error("type argument does not satisfy its constraint")]
    NotConstrained {
        template: SymbolId,
        argument: SymbolId,
        parameter: SymbolId,
        constraint: SymbolId,
    },
    #[error("member {member:?} clashes while deriving {instance:?}")]
    MemberClash { instance: SymbolId, member: Name },
}

impl ParameterizeError {
    /// Convert into a user-facing diagnostic located at `span`.
    pub fn to_semantic(&self, table: &SymbolTable, span: Span) -> SemanticError {
        match *self {
            ParameterizeError::NotGeneric { template } => SemanticError::NotATemplate {
                name: display_type(table, template),
                span: span.into(),
            },
            ParameterizeError::ArityMismatch {
                template,
                expected,
                found,
            } => SemanticError::ParameterCountMismatch {
                name: display_type(table, template),
                expected,
                found,
                span: span.into(),
            },
            ParameterizeError::TooDeep { template, limit } => SemanticError::InstantiationTooDeep {
                name: display_type(table, template),
                limit,
                span: span.into(),
            },
            ParameterizeError::NotConstrained {
                argument,
                parameter,
                constraint,
                ..
            } => SemanticError::TypeNotConstrained {
                argument: display_type(table, argument),
                parameter: display_type(table, parameter),
                constraint: display_type(table, constraint),
                span: span.into(),
            },
            ParameterizeError::MemberClash { instance, member } => SemanticError::DuplicateSymbol {
                name: format!("{} in {}", table.name(member), display_type(table, instance)),
                span: span.into(),
            },
        }
    }

    /// The template whose request failed.
    pub fn template(&self) -> SymbolId {
        match *self {
            ParameterizeError::NotGeneric { template }
            | ParameterizeError::ArityMismatch { template, .. }
            | ParameterizeError::TooDeep { template, .. }
            | ParameterizeError::NotConstrained { template, .. } => template,
            ParameterizeError::MemberClash { instance, .. } => instance,
        }
    }
}

/// Return the instantiation of `template` with `args`, creating it on first use.
///
/// Arity and constraints are checked before the cache is consulted, so a
/// rejected request never leaves a cache entry behind. An `UNRESOLVED`
/// argument yields `UNRESOLVED` without caching anything.
pub fn resolve_or_define(
    table: &mut SymbolTable,
    template: SymbolId,
    args: &[SymbolId],
    max_depth: usize,
) -> Result<SymbolId, ParameterizeError> {
    instantiate(table, template, args, 0, max_depth)
}

fn instantiate(
    table: &mut SymbolTable,
    template: SymbolId,
    args: &[SymbolId],
    depth: usize,
    limit: usize,
) -> Result<SymbolId, ParameterizeError> {
    if !table.is_generic_template(template) {
        return Err(ParameterizeError::NotGeneric { template });
    }
    let params: SymbolList = table.type_params(template).into();
    if params.len() != args.len() {
        return Err(ParameterizeError::ArityMismatch {
            template,
            expected: params.len(),
            found: args.len(),
        });
    }
    if args.contains(&builtin::UNRESOLVED) {
        return Ok(builtin::UNRESOLVED);
    }
    check_constraints(table, template, &params, args)?;

    if let Some(existing) = table.cached_instance(template, args) {
        return match table.instance_failure(existing) {
            Some(failure) => Err(failure.clone()),
            None => Ok(existing),
        };
    }
    if depth > limit {
        return Err(ParameterizeError::TooDeep { template, limit });
    }

    let instance = create_skeleton(table, template, args);
    table.cache_instance(template, args.into(), instance);
    tracing::trace!(
        instance = table.symbol_name(instance),
        depth,
        "created instantiation"
    );
    if let Err(err) = derive_members(table, instance, depth, limit) {
        tracing::debug!(instance = table.symbol_name(instance), %err, "instantiation failed");
        table.mark_instance_failed(instance, err.clone());
        return Err(err);
    }
    Ok(instance)
}

fn check_constraints(
    table: &SymbolTable,
    template: SymbolId,
    params: &[SymbolId],
    args: &[SymbolId],
) -> Result<(), ParameterizeError> {
    for (param, arg) in params.iter().zip(args) {
        if let SymbolKind::TypeParameter { constraint, .. } = table.get(*param).kind
            && constraint != builtin::ANY
            && weight_of_match(table, *arg, constraint) < 0.0
        {
            return Err(ParameterizeError::NotConstrained {
                template,
                argument: *arg,
                parameter: *param,
                constraint,
            });
        }
    }
    Ok(())
}

fn create_skeleton(table: &mut SymbolTable, template: SymbolId, args: &[SymbolId]) -> SymbolId {
    let name = parameterized_name(table, template, args);
    let name = table.intern(&name);
    let complete = args.iter().all(|arg| table.is_concrete(*arg));
    let source = table.get(template).clone();
    let parameterization = Parameterization {
        template,
        args: args.into(),
        complete,
        stale: !source.flags.typed,
    };

    let kind = match &source.kind {
        SymbolKind::Aggregate(info) => {
            let parent = table.scope(info.members).parent;
            let members = table.new_scope(ScopeKind::TypeBody, parent, None, source.module);
            SymbolKind::Aggregate(Box::new(AggregateInfo {
                kind: info.kind,
                builtin: info.builtin,
                members,
                supertype: None,
                traits: SymbolList::new(),
                type_params: SymbolList::new(),
                parameterization: Some(parameterization),
                is_abstract: info.is_abstract,
                is_open: info.is_open,
            }))
        }
        SymbolKind::Function(info) => {
            let parent = table.scope(info.scope).parent;
            let scope = table.new_scope(ScopeKind::Function, parent, None, source.module);
            SymbolKind::Function(Box::new(FunctionInfo {
                scope,
                params: SymbolList::new(),
                return_type: builtin::UNRESOLVED,
                type_params: SymbolList::new(),
                parameterization: Some(parameterization),
                supertype: None,
                is_abstract: info.is_abstract,
                is_dynamic: info.is_dynamic,
            }))
        }
        _ => SymbolKind::Unresolved,
    };

    let mut def = SymbolDef::new(name, source.span, source.module, kind)
        .with_visibility(source.visibility);
    def.flags.typed = true;
    def.flags.pure = source.flags.pure;
    let instance = table.add_detached(def);
    table.get_mut(instance).ty = Some(instance);
    if let Some(scope) = owned_scope(table, instance) {
        table.set_scope_owner(scope, instance);
    }
    instance
}

fn owned_scope(table: &SymbolTable, id: SymbolId) -> Option<ScopeId> {
    match &table.get(id).kind {
        SymbolKind::Aggregate(info) => Some(info.members),
        SymbolKind::Function(info) => Some(info.scope),
        _ => None,
    }
}

/// Substitution from conceptual parameters (and the template itself) to concrete types.
struct Substitution {
    pairs: SmallPairs,
}

type SmallPairs = smallvec::SmallVec<[(SymbolId, SymbolId); 4]>;

impl Substitution {
    fn for_instance(table: &SymbolTable, instance: SymbolId) -> Option<(SymbolId, Self)> {
        let p = table.parameterization(instance)?;
        let mut pairs: SmallPairs = table
            .type_params(p.template)
            .iter()
            .copied()
            .zip(p.args.iter().copied())
            .collect();
        pairs.push((p.template, instance));
        Some((p.template, Self { pairs }))
    }

    fn apply(
        &self,
        table: &mut SymbolTable,
        ty: SymbolId,
        depth: usize,
        limit: usize,
    ) -> Result<SymbolId, ParameterizeError> {
        if let Some((_, to)) = self.pairs.iter().find(|(from, _)| *from == ty) {
            return Ok(*to);
        }
        let Some(p) = table.parameterization(ty).cloned() else {
            return Ok(ty);
        };
        let mut args = SymbolList::with_capacity(p.args.len());
        for arg in &p.args {
            args.push(self.apply(table, *arg, depth, limit)?);
        }
        if args == p.args {
            return Ok(ty);
        }
        instantiate(table, p.template, &args, depth + 1, limit)
    }
}

/// Populate an instance's members from its template by substitution.
fn derive_members(
    table: &mut SymbolTable,
    instance: SymbolId,
    depth: usize,
    limit: usize,
) -> Result<(), ParameterizeError> {
    let Some((template, subst)) = Substitution::for_instance(table, instance) else {
        return Ok(());
    };

    match table.get(template).kind.clone() {
        SymbolKind::Aggregate(info) => {
            let supertype = match info.supertype {
                Some(s) => Some(subst.apply(table, s, depth, limit)?),
                None => None,
            };
            let mut traits = SymbolList::new();
            for t in &info.traits {
                traits.push(subst.apply(table, *t, depth, limit)?);
            }
            let Some(members) = owned_scope(table, instance) else {
                return Ok(());
            };
            table.clear_scope(members);
            if let Some(target) = table.aggregate_mut(instance) {
                target.supertype = supertype;
                target.traits = traits;
            }

            let template_members: Vec<SymbolId> = table.scope(info.members).symbols().to_vec();
            for member in template_members {
                let source = table.get(member).clone();
                match &source.kind {
                    SymbolKind::Variable(VariableRole::Property) => {
                        let declared = table.type_of(member);
                        let ty = subst.apply(table, declared, depth, limit)?;
                        let mut def = source.clone().with_type(ty);
                        def.scope = None;
                        table.define(members, def).map_err(|_| ParameterizeError::MemberClash {
                            instance,
                            member: source.name,
                        })?;
                    }
                    SymbolKind::Method(method) => {
                        let target = DeriveTarget { instance, members };
                        derive_method(table, &subst, target, &source, method, depth, limit)?;
                    }
                    _ => {}
                }
            }
        }
        SymbolKind::Function(info) => {
            let Some(scope) = owned_scope(table, instance) else {
                return Ok(());
            };
            table.clear_scope(scope);
            let params = derive_params(table, &subst, scope, &info.params, depth, limit)?;
            let return_type = subst.apply(table, info.return_type, depth, limit)?;
            let supertype = match info.supertype {
                Some(s) => Some(subst.apply(table, s, depth, limit)?),
                None => None,
            };
            if let Some(target) = table.function_mut(instance) {
                target.params = params;
                target.return_type = return_type;
                target.supertype = supertype;
            }
        }
        _ => {}
    }

    let stale = !table_template_typed(table, template);
    if let Some(p) = instance_parameterization_mut(table, instance) {
        p.stale = stale;
    }
    Ok(())
}

#[derive(Clone, Copy)]
struct DeriveTarget {
    instance: SymbolId,
    members: ScopeId,
}

fn derive_method(
    table: &mut SymbolTable,
    subst: &Substitution,
    target: DeriveTarget,
    source: &SymbolDef,
    method: &MethodInfo,
    depth: usize,
    limit: usize,
) -> Result<(), ParameterizeError> {
    let DeriveTarget { instance, members } = target;
    let scope = table.new_scope(ScopeKind::Method, Some(members), None, source.module);
    let params = derive_params(table, subst, scope, &method.params, depth, limit)?;
    let return_type = if method.flags.constructor {
        instance
    } else {
        subst.apply(table, method.return_type, depth, limit)?
    };
    let info = MethodInfo {
        scope,
        owner: instance,
        params,
        return_type,
        flags: method.flags,
    };
    let kind = SymbolKind::Method(Box::new(info));
    let mut def = SymbolDef::new(source.name, source.span, source.module, kind)
        .with_visibility(source.visibility)
        .with_type(return_type);
    def.flags = source.flags;
    let id = table
        .define(members, def)
        .map_err(|_| ParameterizeError::MemberClash {
            instance,
            member: source.name,
        })?;
    table.set_scope_owner(scope, id);
    Ok(())
}

fn derive_params(
    table: &mut SymbolTable,
    subst: &Substitution,
    scope: ScopeId,
    params: &[SymbolId],
    depth: usize,
    limit: usize,
) -> Result<SymbolList, ParameterizeError> {
    let mut out = SymbolList::new();
    for param in params {
        let declared = table.type_of(*param);
        let ty = subst.apply(table, declared, depth, limit)?;
        let mut def = table.get(*param).clone().with_type(ty);
        def.scope = None;
        // A repeated parameter name was already reported on the template; keep
        // the copy detached so the parameter list keeps its shape.
        let id = match table.define(scope, def.clone()) {
            Ok(id) => id,
            Err(_) => {
                def.scope = Some(scope);
                table.add_detached(def)
            }
        };
        out.push(id);
    }
    Ok(out)
}

fn instance_parameterization_mut(
    table: &mut SymbolTable,
    instance: SymbolId,
) -> Option<&mut Parameterization> {
    match &mut table.get_mut(instance).kind {
        SymbolKind::Aggregate(info) => info.parameterization.as_mut(),
        SymbolKind::Function(info) => info.parameterization.as_mut(),
        _ => None,
    }
}

fn table_template_typed(table: &SymbolTable, template: SymbolId) -> bool {
    table.get(template).flags.typed
}

/// Outcome of [`refresh_stale`].
#[derive(Debug, Default)]
pub struct Refresh {
    pub refreshed: usize,
    /// Instances whose re-derivation failed; they are now cached as failed.
    pub failed: Vec<(SymbolId, ParameterizeError)>,
}

/// Re-derive members of instantiations created before their template's
/// signatures were resolved. A failure does not stop the remaining refreshes.
pub fn refresh_stale(table: &mut SymbolTable, max_depth: usize) -> Refresh {
    let mut outcome = Refresh::default();
    let pending: Vec<SymbolId> = table
        .instantiations()
        .iter()
        .copied()
        .filter(|id| table.parameterization(*id).is_some_and(|p| p.stale))
        .collect();
    for instance in pending {
        let Some(template) = table.parameterization(instance).map(|p| p.template) else {
            continue;
        };
        if !table_template_typed(table, template) || table.instance_failure(instance).is_some() {
            continue;
        }
        match derive_members(table, instance, 0, max_depth) {
            Ok(()) => outcome.refreshed += 1,
            Err(err) => {
                table.mark_instance_failed(instance, err.clone());
                outcome.failed.push((instance, err));
            }
        }
    }
    if outcome.refreshed > 0 || !outcome.failed.is_empty() {
        tracing::debug!(
            refreshed = outcome.refreshed,
            failed = outcome.failed.len(),
            "re-derived stale instantiations"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolSearch;

    #[test]
    fn same_arguments_give_same_instance() {
        let mut table = SymbolTable::new();
        let list = table.well_known().list;
        let a = resolve_or_define(&mut table, list, &[builtin::INTEGER], 16).unwrap();
        let b = resolve_or_define(&mut table, list, &[builtin::INTEGER], 16).unwrap();
        let c = resolve_or_define(&mut table, list, &[builtin::STRING], 16).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.symbol_name(a), "List of Integer");
    }

    #[test]
    fn members_are_substituted() {
        let mut table = SymbolTable::new();
        let list = table.well_known().list;
        let iterator = table.well_known().iterator;
        let instance = resolve_or_define(&mut table, list, &[builtin::STRING], 16).unwrap();

        let get = table.intern("get");
        let get = table
            .resolve_member_only(instance, SymbolSearch::method(get))
            .unwrap();
        assert_eq!(table.return_type(get), builtin::STRING);

        let iter = table.intern("iterator");
        let iter = table
            .resolve_member_only(instance, SymbolSearch::method(iter))
            .unwrap();
        let iter_of_string = table.return_type(iter);
        assert_eq!(
            table.parameterization(iter_of_string).map(|p| p.template),
            Some(iterator)
        );
        assert_eq!(table.symbol_name(iter_of_string), "Iterator of String");
    }

    #[test]
    fn nested_instances_are_named_with_parentheses() {
        let mut table = SymbolTable::new();
        let list = table.well_known().list;
        let inner = resolve_or_define(&mut table, list, &[builtin::INTEGER], 16).unwrap();
        let outer = resolve_or_define(&mut table, list, &[inner], 16).unwrap();
        assert_eq!(table.symbol_name(outer), "List of (List of Integer)");
        assert!(table.is_concrete(outer));
    }

    #[test]
    fn arity_mismatch_is_rejected_without_caching() {
        let mut table = SymbolTable::new();
        let dict = table.well_known().dict;
        let before = table.instantiations().len();
        let err = resolve_or_define(&mut table, dict, &[builtin::INTEGER], 16).unwrap_err();
        assert!(matches!(
            err,
            ParameterizeError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert_eq!(table.instantiations().len(), before);
    }

    #[test]
    fn non_generic_is_not_a_template() {
        let mut table = SymbolTable::new();
        let err =
            resolve_or_define(&mut table, builtin::STRING, &[builtin::INTEGER], 16).unwrap_err();
        assert_eq!(
            err,
            ParameterizeError::NotGeneric {
                template: builtin::STRING
            }
        );
    }

    #[test]
    fn conceptual_argument_leaves_instance_incomplete() {
        let mut table = SymbolTable::new();
        let list = table.well_known().list;
        let t = table.type_params(list)[0];
        let instance = resolve_or_define(&mut table, list, &[t], 16).unwrap();
        let p = table.parameterization(instance).unwrap();
        assert!(!p.complete);
        assert!(!table.is_concrete(instance));
    }

    #[test]
    fn member_clash_fails_the_instantiation() {
        let mut table = SymbolTable::new();
        let list = table.well_known().list;
        let members = table.aggregate(list).map(|info| info.members).unwrap();
        let module = table.get(list).module;
        let name = table.intern("backing");
        let property = || {
            let kind = SymbolKind::Variable(VariableRole::Property);
            SymbolDef::new(name, Span::default(), module, kind).with_type(builtin::INTEGER)
        };
        table.define(members, property()).unwrap();
        let twin = table.add_detached(property());
        table.push_unchecked(members, twin);

        let err = resolve_or_define(&mut table, list, &[builtin::STRING], 16).unwrap_err();
        assert!(matches!(err, ParameterizeError::MemberClash { member, .. } if member == name));
        let again = resolve_or_define(&mut table, list, &[builtin::STRING], 16).unwrap_err();
        assert_eq!(again, err);
    }

    #[test]
    fn unresolved_argument_short_circuits() {
        let mut table = SymbolTable::new();
        let list = table.well_known().list;
        let before = table.instantiations().len();
        let id = resolve_or_define(&mut table, list, &[builtin::UNRESOLVED], 16).unwrap();
        assert_eq!(id, builtin::UNRESOLVED);
        assert_eq!(table.instantiations().len(), before);
    }
}
