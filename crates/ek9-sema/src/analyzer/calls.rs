// analyzer/calls.rs
//
// Call binding. A call by name is tried, in order, as a delegate held in a
// variable, a method on the enclosing type, a function and finally a
// constructor.

use ek9_identity::{Name, Span, SymbolId};

use super::Binder;
use crate::ast::{Expr, TypeExpr};
use crate::errors::{InternalError, SemanticError};
use crate::methods::{
    MethodResolution, access_or_error, best_match, gather_constructors, gather_methods,
    resolve_method,
};
use crate::symbols::{AggregateKind, SearchCategory, SymbolKind, SymbolList, SymbolSearch, builtin};
use crate::type_display::display_types;

impl Binder<'_> {
    pub(super) fn bind_call(
        &mut self,
        expr: &Expr,
        callee: &str,
        type_args: &[TypeExpr],
        args: &[Expr],
    ) -> Result<SymbolId, InternalError> {
        let arg_types = self.bind_args(args)?;
        let Some(name) = self.table.lookup_name(callee) else {
            self.not_resolved(callee, expr.span);
            return Ok(builtin::UNRESOLVED);
        };
        let scope = self.current_scope();

        if let Some(variable) = self.table.resolve(scope, SymbolSearch::variable(name)) {
            return Ok(self.bind_delegate_call(expr, callee, variable, &arg_types));
        }
        if let Some(owner) = self.frame().and_then(|f| f.owner)
            && self.table.get(owner).name != name
            && !gather_methods(self.table, owner, name).is_empty()
        {
            return Ok(self.bind_method_on(expr, owner, callee, &arg_types));
        }
        if let Some(function) = self
            .table
            .resolve(scope, SymbolSearch::new(name, SearchCategory::Function))
        {
            return Ok(self.bind_function_call(expr, callee, function, type_args, &arg_types));
        }
        if let Some(ty) = self.table.resolve(scope, SymbolSearch::of_type(name)) {
            return Ok(self.bind_constructor_call(expr, ty, type_args, &arg_types));
        }
        self.not_resolved(callee, expr.span);
        Ok(builtin::UNRESOLVED)
    }

    fn not_resolved(&mut self, name: &str, span: Span) {
        self.report(
            SemanticError::NotResolved {
                name: name.to_string(),
                span: span.into(),
            },
            span,
        );
    }

    /// Call through a variable holding a function.
    fn bind_delegate_call(
        &mut self,
        expr: &Expr,
        callee: &str,
        variable: SymbolId,
        args: &[SymbolId],
    ) -> SymbolId {
        self.unit.bindings.record_symbol(expr.id, variable);
        let ty = self.use_value(variable, callee, expr.span);
        if ty == builtin::UNRESOLVED {
            return builtin::UNRESOLVED;
        }
        if self.table.function(ty).is_none() {
            self.report(
                SemanticError::NotCallable {
                    name: callee.to_string(),
                    ty: self.type_name(ty),
                    span: expr.span.into(),
                },
                expr.span,
            );
            return builtin::UNRESOLVED;
        }
        self.check_call_arguments(callee, ty, args, expr.span);
        self.check_pure_call(ty, callee, expr.span);
        self.table.return_type(ty)
    }

    fn bind_function_call(
        &mut self,
        expr: &Expr,
        callee: &str,
        function: SymbolId,
        type_args: &[TypeExpr],
        args: &[SymbolId],
    ) -> SymbolId {
        let function = if !type_args.is_empty() {
            let scope = self.current_scope();
            let explicit: SymbolList =
                type_args.iter().map(|t| self.resolve_type(t, scope)).collect();
            self.parameterize(function, &explicit, expr.span)
        } else if self.table.is_generic_template(function) {
            match self.infer_type_args(function, args) {
                Some(inferred) => self.parameterize(function, &inferred, expr.span),
                None => {
                    let error = SemanticError::ParameterCountMismatch {
                        name: callee.to_string(),
                        expected: self.table.type_params(function).len(),
                        found: 0,
                        span: expr.span.into(),
                    };
                    self.report(error, expr.span);
                    builtin::UNRESOLVED
                }
            }
        } else {
            function
        };
        if function == builtin::UNRESOLVED {
            return builtin::UNRESOLVED;
        }
        self.unit.bindings.record_symbol(expr.id, function);
        if self.table.function(function).is_some_and(|f| f.is_abstract) {
            self.report(
                SemanticError::NotCallable {
                    name: callee.to_string(),
                    ty: "abstract function".to_string(),
                    span: expr.span.into(),
                },
                expr.span,
            );
            return builtin::UNRESOLVED;
        }
        self.check_call_arguments(callee, function, args, expr.span);
        self.check_pure_call(function, callee, expr.span);
        self.table.get_mut(function).flags.referenced = true;
        self.table.return_type(function)
    }

    /// Deduce a generic function's type arguments from parameters written
    /// directly as one of its type parameters.
    fn infer_type_args(&self, function: SymbolId, args: &[SymbolId]) -> Option<SymbolList> {
        let type_params = self.table.type_params(function);
        let params = self.table.param_types(function);
        if params.len() != args.len() {
            return None;
        }
        type_params
            .iter()
            .map(|tp| {
                params
                    .iter()
                    .zip(args)
                    .find(|(param, _)| *param == tp)
                    .map(|(_, arg)| *arg)
            })
            .collect()
    }

    fn check_call_arguments(
        &mut self,
        callee: &str,
        function: SymbolId,
        args: &[SymbolId],
        span: Span,
    ) {
        if args.contains(&builtin::UNRESOLVED) {
            return;
        }
        let resolution = best_match(self.table, &[function], args, self.config.ambiguity_epsilon);
        if let MethodResolution::NotFound = resolution {
            let expected = display_types(self.table, &self.table.param_types(function));
            self.report(
                SemanticError::IncompatibleArguments {
                    callee: callee.to_string(),
                    expected,
                    found: display_types(self.table, args),
                    span: span.into(),
                },
                span,
            );
        }
    }

    fn bind_constructor_call(
        &mut self,
        expr: &Expr,
        ty: SymbolId,
        type_args: &[TypeExpr],
        args: &[SymbolId],
    ) -> SymbolId {
        if matches!(self.table.get(ty).kind, SymbolKind::TypeParameter { .. }) {
            return ty;
        }
        let target = if !type_args.is_empty() {
            let scope = self.current_scope();
            let explicit: SymbolList =
                type_args.iter().map(|t| self.resolve_type(t, scope)).collect();
            self.parameterize(ty, &explicit, expr.span)
        } else if self.table.is_generic_template(ty) {
            let expected = self.table.type_params(ty).len();
            if args.len() == expected && !args.is_empty() {
                // `List(1)`, `Dict(1, "one")`: the arguments name the parameterization.
                self.parameterize(ty, args, expr.span)
            } else {
                let name = self.type_name(ty);
                self.report(
                    SemanticError::ParameterCountMismatch {
                        name,
                        expected,
                        found: 0,
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                builtin::UNRESOLVED
            }
        } else {
            ty
        };
        if target == builtin::UNRESOLVED {
            return builtin::UNRESOLVED;
        }

        if let Some(info) = self.table.aggregate(target) {
            let reason = if info.kind == AggregateKind::Trait {
                Some("traits cannot be instantiated")
            } else if info.is_abstract {
                Some("it is abstract")
            } else {
                None
            };
            if let Some(reason) = reason {
                let name = self.type_name(target);
                self.report(
                    SemanticError::CannotInstantiate {
                        name,
                        reason: reason.to_string(),
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                return target;
            }
        }

        if args.contains(&builtin::UNRESOLVED) {
            return builtin::UNRESOLVED;
        }
        let constructors = gather_constructors(self.table, target);
        if constructors.is_empty() && args.is_empty() {
            self.unit.bindings.record_symbol(expr.id, target);
            return target;
        }
        let name = self.type_name(target);
        match best_match(self.table, &constructors, args, self.config.ambiguity_epsilon) {
            MethodResolution::Found(constructor) => {
                self.accept_method(expr, constructor, &name);
            }
            MethodResolution::Ambiguous(tied) => self.report_ambiguous(&name, &tied, expr.span),
            MethodResolution::NotFound => self.method_not_resolved(&name, target, args, expr.span),
        }
        target
    }

    /// `this(...)` and `super(...)` from a constructor.
    pub(super) fn bind_constructor_delegation(
        &mut self,
        expr: &Expr,
        args: &[Expr],
        to_super: bool,
    ) -> Result<SymbolId, InternalError> {
        let arg_types = self.bind_args(args)?;
        let keyword = if to_super { "super" } else { "this" };
        let Some(owner) = self.frame().filter(|f| f.is_constructor).and_then(|f| f.owner) else {
            let reason = "constructor delegation is only valid inside a constructor";
            self.invalid_keyword(keyword, reason, expr.span);
            return Ok(builtin::VOID);
        };
        if arg_types.contains(&builtin::UNRESOLVED) {
            return Ok(builtin::VOID);
        }
        // Without a declared supertype `super(...)` reaches the universal base.
        let target = if to_super {
            self.table.supertype_of(owner).unwrap_or(builtin::ANY)
        } else {
            owner
        };
        let constructors = gather_constructors(self.table, target);
        if constructors.is_empty() && arg_types.is_empty() {
            return Ok(builtin::VOID);
        }
        let name = self.type_name(target);
        match best_match(self.table, &constructors, &arg_types, self.config.ambiguity_epsilon) {
            MethodResolution::Found(constructor) => {
                self.unit.bindings.record_symbol(expr.id, constructor);
                let from = self.access_scope();
                access_or_error(self.table, from, constructor, expr.span, &mut self.unit.diags);
            }
            MethodResolution::Ambiguous(tied) => self.report_ambiguous(&name, &tied, expr.span),
            MethodResolution::NotFound => {
                self.method_not_resolved(&name, target, &arg_types, expr.span)
            }
        }
        Ok(builtin::VOID)
    }

    pub(super) fn bind_method_call(
        &mut self,
        expr: &Expr,
        receiver: &Expr,
        method: &str,
        args: &[Expr],
    ) -> Result<SymbolId, InternalError> {
        let receiver_ty = self.bind_expr(receiver)?;
        let arg_types = self.bind_args(args)?;
        Ok(self.bind_method_on(expr, receiver_ty, method, &arg_types))
    }

    /// Resolve `method(args)` on `ty`, reporting not-found and ambiguity.
    pub(super) fn bind_method_on(
        &mut self,
        expr: &Expr,
        ty: SymbolId,
        method: &str,
        args: &[SymbolId],
    ) -> SymbolId {
        if args.contains(&builtin::UNRESOLVED) {
            return builtin::UNRESOLVED;
        }
        let Some(lookup) = self.member_lookup_type(ty) else {
            return builtin::UNRESOLVED;
        };
        let resolution = match self.table.lookup_name(method) {
            Some(name) => self.resolve_on(lookup, name, args),
            None => MethodResolution::NotFound,
        };
        match resolution {
            MethodResolution::Found(found) => self.accept_method(expr, found, method),
            MethodResolution::Ambiguous(tied) => {
                self.report_ambiguous(method, &tied, expr.span);
                builtin::UNRESOLVED
            }
            MethodResolution::NotFound => {
                self.method_not_resolved(method, ty, args, expr.span);
                builtin::UNRESOLVED
            }
        }
    }

    fn resolve_on(&self, ty: SymbolId, name: Name, args: &[SymbolId]) -> MethodResolution {
        resolve_method(self.table, ty, name, args, self.config.ambiguity_epsilon)
    }

    fn method_not_resolved(&mut self, method: &str, ty: SymbolId, args: &[SymbolId], span: Span) {
        let error = SemanticError::MethodNotResolved {
            method: method.to_string(),
            on_type: self.type_name(ty),
            args: display_types(self.table, args),
            span: span.into(),
        };
        self.report(error, span);
    }
}
