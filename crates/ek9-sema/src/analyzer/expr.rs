// analyzer/expr.rs
//
// Expression binding: every expression node gets its type recorded, and
// identifiers, properties and operators get the symbol they resolve to.

use ek9_identity::{Span, SymbolId};

use super::{Binder, Frame};
use crate::ast::{DynamicFunction, Expr, ExprKind};
use crate::errors::{InternalError, SemanticError};
use crate::methods::{MethodResolution, access_or_error, property_access_or_error, resolve_method};
use crate::symbols::{
    FunctionInfo, ScopeKind, SymbolDef, SymbolKind, SymbolList, SymbolSearch, VariableRole,
    builtin, traverse_back_up_stack_by,
};
use crate::type_display::{display_signature, display_type, display_types};

impl Binder<'_> {
    pub(super) fn bind_expr(&mut self, expr: &Expr) -> Result<SymbolId, InternalError> {
        let ty = match &expr.kind {
            ExprKind::Int(_) => builtin::INTEGER,
            ExprKind::Float(_) => builtin::FLOAT,
            ExprKind::Str(_) => builtin::STRING,
            ExprKind::Bool(_) => builtin::BOOLEAN,
            ExprKind::Ident(name) => self.bind_ident(expr, name),
            ExprKind::This => self.this_type("this", expr.span),
            ExprKind::Super => self.super_type("super", expr.span),
            ExprKind::Call {
                callee,
                type_args,
                args,
            } => self.bind_call(expr, callee, type_args, args)?,
            ExprKind::ThisCall(args) => self.bind_constructor_delegation(expr, args, false)?,
            ExprKind::SuperCall(args) => self.bind_constructor_delegation(expr, args, true)?,
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => self.bind_method_call(expr, receiver, method, args)?,
            ExprKind::Property { receiver, name } => self.bind_property(expr, receiver, name)?,
            ExprKind::Binary { op, lhs, rhs } => {
                let left = self.bind_expr(lhs)?;
                let right = self.bind_expr(rhs)?;
                self.bind_operator(expr, left, op, &[right])
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.bind_expr(operand)?;
                self.bind_operator(expr, ty, op, &[])
            }
            ExprKind::Dynamic(function) => self.bind_dynamic(expr, function)?,
            ExprKind::Pipeline(pipeline) => self.bind_pipeline(expr, pipeline)?,
        };
        self.unit.bindings.record_type(expr.id, ty);
        Ok(ty)
    }

    pub(super) fn bind_args(&mut self, args: &[Expr]) -> Result<SymbolList, InternalError> {
        let mut types = SymbolList::with_capacity(args.len());
        for arg in args {
            types.push(self.bind_expr(arg)?);
        }
        Ok(types)
    }

    fn bind_ident(&mut self, expr: &Expr, name: &str) -> SymbolId {
        let found = self
            .table
            .lookup_name(name)
            .and_then(|n| self.table.resolve(self.current_scope(), SymbolSearch::value(n)));
        let Some(symbol) = found else {
            self.report(
                SemanticError::NotResolved {
                    name: name.to_string(),
                    span: expr.span.into(),
                },
                expr.span,
            );
            return builtin::UNRESOLVED;
        };
        self.unit.bindings.record_symbol(expr.id, symbol);
        self.use_value(symbol, name, expr.span)
    }

    /// Mark a value as read and return its type. A function used as a value
    /// is its own type.
    pub(super) fn use_value(&mut self, symbol: SymbolId, name: &str, span: Span) -> SymbolId {
        let def = self.table.get(symbol);
        let role = def.variable_role();
        if role == Some(VariableRole::Local) && !def.flags.initialized {
            self.report(
                SemanticError::UsedBeforeInitialised {
                    name: name.to_string(),
                    span: span.into(),
                },
                span,
            );
        }
        if role == Some(VariableRole::Property) {
            let from = self.access_scope();
            property_access_or_error(self.table, from, symbol, span, &mut self.unit.diags);
        }
        self.table.get_mut(symbol).flags.referenced = true;
        match role {
            Some(_) => self.table.type_of(symbol),
            None => symbol,
        }
    }

    /// Type that `this` denotes here: the enclosing aggregate, or the dynamic
    /// function whose capture block encloses the code.
    pub(super) fn this_type(&mut self, keyword: &str, span: Span) -> SymbolId {
        let context = traverse_back_up_stack_by(&self.unit.stack, self.table, |scope| {
            matches!(
                scope.kind,
                ScopeKind::TypeBody | ScopeKind::CaptureBlock | ScopeKind::Function
            )
        });
        let owner = context.and_then(|scope| {
            let def = self.table.scope(scope);
            match def.kind {
                ScopeKind::TypeBody | ScopeKind::CaptureBlock => def.owner,
                _ => None,
            }
        });
        match owner {
            Some(owner) => owner,
            None => {
                let reason = "is only valid inside a type or dynamic function";
                self.invalid_keyword(keyword, reason, span);
                builtin::UNRESOLVED
            }
        }
    }

    pub(super) fn super_type(&mut self, keyword: &str, span: Span) -> SymbolId {
        let this = self.this_type(keyword, span);
        if this == builtin::UNRESOLVED {
            return builtin::UNRESOLVED;
        }
        match self.table.supertype_of(this) {
            Some(base) => base,
            None => {
                let reason = format!("'{}' has no supertype", self.type_name(this));
                self.invalid_keyword(keyword, &reason, span);
                builtin::UNRESOLVED
            }
        }
    }

    pub(super) fn invalid_keyword(&mut self, keyword: &str, reason: &str, span: Span) {
        self.report(
            SemanticError::InvalidThisOrSuper {
                keyword: keyword.to_string(),
                reason: reason.to_string(),
                span: span.into(),
            },
            span,
        );
    }

    pub(super) fn bind_property(
        &mut self,
        expr: &Expr,
        receiver: &Expr,
        name: &str,
    ) -> Result<SymbolId, InternalError> {
        let receiver_ty = self.bind_expr(receiver)?;
        let Some(lookup) = self.member_lookup_type(receiver_ty) else {
            return Ok(builtin::UNRESOLVED);
        };
        let found = self
            .table
            .lookup_name(name)
            .and_then(|n| self.table.resolve_in_hierarchy(lookup, SymbolSearch::variable(n)))
            .filter(|p| self.table.get(*p).variable_role() == Some(VariableRole::Property));
        let Some(property) = found else {
            self.report(
                SemanticError::NotResolved {
                    name: format!("{}.{}", self.type_name(receiver_ty), name),
                    span: expr.span.into(),
                },
                expr.span,
            );
            return Ok(builtin::UNRESOLVED);
        };
        self.unit.bindings.record_symbol(expr.id, property);
        let from = self.access_scope();
        property_access_or_error(self.table, from, property, expr.span, &mut self.unit.diags);
        self.table.get_mut(property).flags.referenced = true;
        Ok(self.table.type_of(property))
    }

    /// Type whose members are searched for a receiver of type `ty`.
    ///
    /// A type parameter is searched through its constraint; one without a
    /// constraint can only be checked once parameterized, so `None` is
    /// returned and the access is taken on trust.
    pub(super) fn member_lookup_type(&self, ty: SymbolId) -> Option<SymbolId> {
        if ty == builtin::UNRESOLVED {
            return None;
        }
        match self.table.get(ty).kind {
            SymbolKind::TypeParameter { constraint, .. } if constraint == builtin::ANY => None,
            SymbolKind::TypeParameter { constraint, .. } => Some(constraint),
            _ => Some(ty),
        }
    }

    /// Resolve an operator on `ty` and record it against `expr`.
    fn bind_operator(
        &mut self,
        expr: &Expr,
        ty: SymbolId,
        op: &str,
        args: &[SymbolId],
    ) -> SymbolId {
        if args.contains(&builtin::UNRESOLVED) {
            return builtin::UNRESOLVED;
        }
        let Some(lookup) = self.member_lookup_type(ty) else {
            return builtin::UNRESOLVED;
        };
        let resolution = match self.table.lookup_name(op) {
            Some(name) => {
                resolve_method(self.table, lookup, name, args, self.config.ambiguity_epsilon)
            }
            None => MethodResolution::NotFound,
        };
        match resolution {
            MethodResolution::Found(method) => self.accept_method(expr, method, op),
            MethodResolution::Ambiguous(tied) => {
                self.report_ambiguous(op, &tied, expr.span);
                builtin::UNRESOLVED
            }
            MethodResolution::NotFound => {
                let on_type = self.type_name(ty);
                let required_by = if args.is_empty() {
                    format!("'{op}' on {on_type}")
                } else {
                    format!("'{op}' with {}", display_types(self.table, args))
                };
                self.report(
                    SemanticError::MissingOperator {
                        operator: op.to_string(),
                        on_type,
                        required_by,
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                builtin::UNRESOLVED
            }
        }
    }

    /// Record a resolved method or operator and apply access and purity rules.
    pub(super) fn accept_method(&mut self, expr: &Expr, method: SymbolId, name: &str) -> SymbolId {
        self.unit.bindings.record_symbol(expr.id, method);
        access_or_error(self.table, self.access_scope(), method, expr.span, &mut self.unit.diags);
        self.check_pure_call(method, name, expr.span);
        self.table.return_type(method)
    }

    pub(super) fn check_pure_call(&mut self, callee: SymbolId, name: &str, span: Span) {
        if self.in_pure_context() && !self.table.get(callee).flags.pure {
            self.report(
                SemanticError::PureViolation {
                    action: "call".to_string(),
                    name: name.to_string(),
                    span: span.into(),
                },
                span,
            );
        }
    }

    pub(super) fn report_ambiguous(&mut self, name: &str, tied: &[SymbolId], span: Span) {
        let candidates = tied
            .iter()
            .map(|m| match self.table.method(*m) {
                Some(info) => format!(
                    "{}.{}",
                    display_type(self.table, info.owner),
                    display_signature(self.table, *m)
                ),
                None => display_signature(self.table, *m),
            })
            .collect::<Vec<_>>()
            .join("; ");
        self.report(
            SemanticError::AmbiguousCall {
                method: name.to_string(),
                candidates,
                span: span.into(),
            },
            span,
        );
    }

    /// A function literal. Its body only sees the module and its own capture
    /// block, so every outer value it uses must be captured explicitly.
    fn bind_dynamic(
        &mut self,
        expr: &Expr,
        function: &DynamicFunction,
    ) -> Result<SymbolId, InternalError> {
        let mut captured = SymbolList::with_capacity(function.captures.len());
        for capture in &function.captures {
            captured.push(self.bind_expr(&capture.value)?);
        }
        let module = self.unit.module;
        let scope = self.table.new_scope(
            ScopeKind::CaptureBlock,
            Some(self.unit.module_scope),
            None,
            module,
        );
        for (capture, ty) in function.captures.iter().zip(captured) {
            let name = self.table.intern(&capture.name);
            let kind = SymbolKind::Variable(VariableRole::Capture);
            let mut def = SymbolDef::new(name, capture.span, module, kind).with_type(ty);
            def.flags.initialized = true;
            def.flags.typed = true;
            let id = self.define_or_report(scope, def);
            self.unit.bindings.record_symbol(capture.id, id);
        }

        let mut params = SymbolList::new();
        for param in &function.params {
            let ty = self.resolve_type(&param.ty, scope);
            let name = self.table.intern(&param.name);
            let kind = SymbolKind::Variable(VariableRole::Parameter);
            let mut def = SymbolDef::new(name, param.span, module, kind).with_type(ty);
            def.flags.initialized = true;
            def.flags.typed = true;
            let id = self.define_or_report(scope, def);
            self.unit.bindings.record_symbol(param.id, id);
            params.push(id);
        }

        let supertype = function
            .supertype
            .as_ref()
            .map(|written| (self.resolve_type(written, scope), written.span));
        let return_type = match (&function.returns, supertype) {
            (Some(written), _) => self.resolve_type(written, scope),
            (None, Some((base, _))) if base != builtin::UNRESOLVED => self.table.return_type(base),
            (None, _) => builtin::VOID,
        };

        let info = FunctionInfo {
            scope,
            params,
            return_type,
            type_params: SymbolList::new(),
            parameterization: None,
            supertype: None,
            is_abstract: false,
            is_dynamic: true,
        };
        let name = self.table.intern(&format!("dynamic function#{}", function.id.index()));
        let mut def = SymbolDef::new(name, expr.span, module, SymbolKind::Function(Box::new(info)));
        def.flags.typed = true;
        def.scope = Some(self.current_scope());
        let id = self.table.add_detached(def);
        self.table.get_mut(id).ty = Some(id);
        self.table.set_scope_owner(scope, id);
        self.unit.bindings.record_symbol(function.id, id);
        self.unit.bindings.record_scope(function.id, scope);

        if let Some((base, span)) = supertype
            && base != builtin::UNRESOLVED
        {
            match self.check_function_extension(id, base) {
                Ok(()) => {
                    if let Some(info) = self.table.function_mut(id) {
                        info.supertype = Some(base);
                    }
                }
                Err(reason) => {
                    let error = SemanticError::NotExtendable {
                        name: "dynamic function".to_string(),
                        base: self.type_name(base),
                        reason,
                        span: span.into(),
                    };
                    self.report(error, span);
                }
            }
        }

        let frame = Frame {
            callable: id,
            owner: None,
            is_constructor: false,
            is_pure: false,
            returns: return_type,
        };
        self.bind_callable(frame, scope, &function.body, "dynamic function")?;
        Ok(id)
    }
}
