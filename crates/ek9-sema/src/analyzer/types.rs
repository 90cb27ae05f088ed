// analyzer/types.rs
//
// Pass 1: resolve every explicitly written type (supertypes, traits, type
// parameter constraints, properties, parameters, returns) before any body is
// looked at.

use ek9_identity::{ScopeId, Span, SymbolId};

use super::Binder;
use crate::ast::{AggregateDecl, Decl, FunctionDecl, Param, TypeExpr, TypeExprKind, TypeParamDecl};
use crate::errors::{InternalError, SemanticError};
use crate::generic;
use crate::methods::check_extension;
use crate::symbols::{SymbolKind, SymbolList, SymbolSearch, builtin};
use crate::type_display::display_types;

impl Binder<'_> {
    pub(super) fn resolve_explicit_types(&mut self, decl: &Decl) -> Result<(), InternalError> {
        match decl {
            Decl::Aggregate(aggregate) => self.type_aggregate(aggregate),
            Decl::Function(function) => self.type_function(function),
        }
    }

    fn type_aggregate(&mut self, decl: &AggregateDecl) -> Result<(), InternalError> {
        let id = self.unit.bindings.require_symbol(decl.id, "aggregate")?;
        let Some(members) = self.table.aggregate(id).map(|info| info.members) else {
            return Ok(());
        };
        self.constrain_type_params(members, &decl.type_params)?;

        if let Some(written) = &decl.supertype {
            let base = self.resolve_type(written, members);
            if base == id {
                self.self_reference(id, written.span);
            } else if base != builtin::UNRESOLVED {
                match check_extension(self.table, id, base, false) {
                    Ok(()) => {
                        if let Some(info) = self.table.aggregate_mut(id) {
                            info.supertype = Some(base);
                        }
                    }
                    Err(reason) => self.not_extendable(&decl.name, base, reason, written.span),
                }
            }
        }

        for written in &decl.traits {
            let t = self.resolve_type(written, members);
            if t == builtin::UNRESOLVED {
                continue;
            }
            if t == id {
                self.self_reference(id, written.span);
                continue;
            }
            if let Err(reason) = check_extension(self.table, id, t, true) {
                self.not_extendable(&decl.name, t, reason, written.span);
                continue;
            }
            let already = self.table.traits_of(id).contains(&t);
            if already {
                let error = SemanticError::DuplicateTraitReference {
                    trait_name: self.type_name(t),
                    on_type: decl.name.clone(),
                    span: written.span.into(),
                };
                self.report(error, written.span);
            } else if let Some(info) = self.table.aggregate_mut(id) {
                info.traits.push(t);
            }
        }

        for property in &decl.properties {
            let symbol = self.unit.bindings.require_symbol(property.id, "property")?;
            let ty = self.resolve_type(&property.ty, members);
            let def = self.table.get_mut(symbol);
            def.ty = Some(ty);
            def.flags.typed = true;
        }

        let mut seen: Vec<(SymbolId, SymbolList)> = Vec::new();
        for method in &decl.methods {
            if method.is_default {
                continue;
            }
            let symbol = self.unit.bindings.require_symbol(method.id, "method")?;
            let Some(scope) = self.table.method(symbol).map(|m| m.scope) else {
                continue;
            };
            self.type_params_of(scope, &method.params)?;
            let return_type = if method.is_constructor {
                id
            } else {
                match &method.returns {
                    Some(written) => self.resolve_type(written, scope),
                    None => builtin::VOID,
                }
            };
            if let Some(info) = self.table.method_mut(symbol) {
                info.return_type = return_type;
            }
            let def = self.table.get_mut(symbol);
            def.ty = Some(return_type);
            def.flags.typed = true;

            let signature = self.table.param_types(symbol);
            let name = self.table.get(symbol).name;
            let clash = seen.iter().any(|(other, params)| {
                self.table.get(*other).name == name && *params == signature
            });
            if clash {
                let error = SemanticError::DuplicateSymbol {
                    name: format!("{}({})", method.name, display_types(self.table, &signature)),
                    span: method.span.into(),
                };
                self.report(error, method.span);
            } else {
                seen.push((symbol, signature));
            }
        }

        self.table.get_mut(id).flags.typed = true;
        tracing::trace!(name = %decl.name, "aggregate typed");
        Ok(())
    }

    fn type_function(&mut self, decl: &FunctionDecl) -> Result<(), InternalError> {
        let id = self.unit.bindings.require_symbol(decl.id, "function")?;
        let Some(scope) = self.table.function(id).map(|f| f.scope) else {
            return Ok(());
        };
        self.constrain_type_params(scope, &decl.type_params)?;
        self.type_params_of(scope, &decl.params)?;
        let return_type = match &decl.returns {
            Some(written) => self.resolve_type(written, scope),
            None => builtin::VOID,
        };
        if let Some(info) = self.table.function_mut(id) {
            info.return_type = return_type;
        }

        if let Some(written) = &decl.supertype {
            let base = self.resolve_type(written, scope);
            if base != builtin::UNRESOLVED {
                if base == id {
                    self.self_reference(id, written.span);
                } else {
                    match self.check_function_extension(id, base) {
                        Ok(()) => {
                            if let Some(info) = self.table.function_mut(id) {
                                info.supertype = Some(base);
                            }
                        }
                        Err(reason) => {
                            self.not_extendable(&decl.name, base, reason, written.span)
                        }
                    }
                }
            }
        }
        self.table.get_mut(id).flags.typed = true;
        Ok(())
    }

    /// A function may only extend an abstract function with the same signature.
    pub(super) fn check_function_extension(
        &self,
        function: SymbolId,
        base: SymbolId,
    ) -> Result<(), String> {
        check_extension(self.table, function, base, false)?;
        let own = self.table.param_types(function);
        let inherited = self.table.param_types(base);
        if own != inherited {
            return Err(format!(
                "parameters ({}) do not match ({})",
                display_types(self.table, &own),
                display_types(self.table, &inherited)
            ));
        }
        Ok(())
    }

    /// A type or function naming itself as a supertype or trait is a cycle of one link.
    fn self_reference(&mut self, id: SymbolId, span: Span) {
        let name = self.type_name(id);
        let error = SemanticError::CircularHierarchy {
            path: format!("{name} -> {name}"),
            span: span.into(),
        };
        self.report(error, span);
    }

    fn not_extendable(&mut self, name: &str, base: SymbolId, reason: String, span: Span) {
        let error = SemanticError::NotExtendable {
            name: name.to_string(),
            base: self.type_name(base),
            reason,
            span: span.into(),
        };
        self.report(error, span);
    }

    fn constrain_type_params(
        &mut self,
        scope: ScopeId,
        params: &[TypeParamDecl],
    ) -> Result<(), InternalError> {
        for param in params {
            let symbol = self.unit.bindings.require_symbol(param.id, "type parameter")?;
            if let Some(written) = &param.constraint {
                let bound = self.resolve_type(written, scope);
                if let SymbolKind::TypeParameter { constraint, .. } =
                    &mut self.table.get_mut(symbol).kind
                {
                    *constraint = bound;
                }
            }
            self.table.get_mut(symbol).flags.typed = true;
        }
        Ok(())
    }

    fn type_params_of(&mut self, scope: ScopeId, params: &[Param]) -> Result<(), InternalError> {
        for param in params {
            let symbol = self.unit.bindings.require_symbol(param.id, "parameter")?;
            let ty = self.resolve_type(&param.ty, scope);
            let def = self.table.get_mut(symbol);
            def.ty = Some(ty);
            def.flags.typed = true;
        }
        Ok(())
    }

    /// Resolve a written type from `scope`, parameterizing generics on demand.
    ///
    /// Failures are reported here and yield `UNRESOLVED`.
    pub(super) fn resolve_type(&mut self, written: &TypeExpr, scope: ScopeId) -> SymbolId {
        let ty = match &written.kind {
            TypeExprKind::Named(name) => self.resolve_type_name(name, scope, written.span),
            TypeExprKind::Parameterized { base, args } => {
                let template = self.resolve_type_name(base, scope, written.span);
                let args: SymbolList =
                    args.iter().map(|arg| self.resolve_type(arg, scope)).collect();
                if template == builtin::UNRESOLVED {
                    builtin::UNRESOLVED
                } else {
                    self.parameterize(template, &args, written.span)
                }
            }
        };
        self.unit.bindings.record_type(written.id, ty);
        if ty != builtin::UNRESOLVED {
            self.unit.bindings.record_symbol(written.id, ty);
        }
        ty
    }

    fn resolve_type_name(&mut self, name: &str, scope: ScopeId, span: Span) -> SymbolId {
        let found = self
            .table
            .lookup_name(name)
            .and_then(|n| self.table.resolve(scope, SymbolSearch::of_type(n)));
        match found {
            Some(ty) => ty,
            None => {
                self.report(
                    SemanticError::NotResolved {
                        name: name.to_string(),
                        span: span.into(),
                    },
                    span,
                );
                builtin::UNRESOLVED
            }
        }
    }

    /// Lookup-or-insert into the instantiation cache; the caller already holds
    /// the table's write guard, so the whole operation is atomic.
    pub(super) fn parameterize(
        &mut self,
        template: SymbolId,
        args: &[SymbolId],
        span: Span,
    ) -> SymbolId {
        let limit = self.config.max_instantiation_depth;
        match generic::resolve_or_define(self.table, template, args, limit) {
            Ok(instance) => {
                if instance != builtin::UNRESOLVED {
                    self.unit.requested_at.entry(instance).or_insert(span);
                }
                instance
            }
            Err(err) => {
                let error = err.to_semantic(self.table, span);
                self.report(error, span);
                builtin::UNRESOLVED
            }
        }
    }
}
