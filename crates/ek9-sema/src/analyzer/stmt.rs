// analyzer/stmt.rs
//
// Pass 2: bodies. Statements, blocks and variable flow facts.

use ek9_identity::{ScopeId, Span, SymbolId};

use super::{Binder, Frame};
use crate::ast::{Decl, Expr, ExprKind, MethodDecl, Stmt, StmtKind, TypeExpr};
use crate::compatibility::is_assignable;
use crate::errors::{InternalError, SemanticError};
use crate::symbols::{ScopeKind, SymbolDef, SymbolKind, SymbolSearch, VariableRole, builtin};

impl Binder<'_> {
    pub(super) fn bind_bodies(&mut self, decl: &Decl) -> Result<(), InternalError> {
        match decl {
            Decl::Aggregate(aggregate) => {
                let id = self.unit.bindings.require_symbol(aggregate.id, "aggregate")?;
                let Some(members) = self.table.aggregate(id).map(|info| info.members) else {
                    return Ok(());
                };
                self.enter_scope(members);
                for property in &aggregate.properties {
                    if let Some(init) = &property.initializer {
                        let symbol = self.unit.bindings.require_symbol(property.id, "property")?;
                        let found = self.bind_expr(init)?;
                        let expected = self.table.type_of(symbol);
                        self.check_assignable(found, expected, init.span);
                    }
                }
                for method in &aggregate.methods {
                    if !method.is_default {
                        self.bind_method_body(id, method)?;
                    }
                }
                self.exit_scope("type body")?;
            }
            Decl::Function(function) => {
                let id = self.unit.bindings.require_symbol(function.id, "function")?;
                let signature = self.table.function(id).map(|f| (f.scope, f.return_type));
                let Some((scope, returns)) = signature else {
                    return Ok(());
                };
                let frame = Frame {
                    callable: id,
                    owner: None,
                    is_constructor: false,
                    is_pure: function.is_pure,
                    returns,
                };
                self.bind_callable(frame, scope, &function.body, "function")?;
            }
        }
        Ok(())
    }

    fn bind_method_body(
        &mut self,
        owner: SymbolId,
        method: &MethodDecl,
    ) -> Result<(), InternalError> {
        let id = self.unit.bindings.require_symbol(method.id, "method")?;
        let Some(info) = self.table.method(id) else {
            return Ok(());
        };
        let frame = Frame {
            callable: id,
            owner: Some(owner),
            is_constructor: info.flags.constructor,
            is_pure: self.table.get(id).flags.pure,
            returns: if info.flags.constructor {
                builtin::VOID
            } else {
                info.return_type
            },
        };
        let scope = info.scope;
        self.bind_callable(frame, scope, &method.body, "method")
    }

    pub(super) fn bind_callable(
        &mut self,
        frame: Frame,
        scope: ScopeId,
        body: &[Stmt],
        context: &'static str,
    ) -> Result<(), InternalError> {
        tracing::trace!(
            callable = %self.table.symbol_name(frame.callable),
            context,
            "binding body"
        );
        self.unit.frames.push(frame);
        self.enter_scope(scope);
        let bound = self.bind_stmts(body);
        let exited = self.exit_scope(context);
        self.unit.frames.pop();
        bound?;
        exited.map(|_| ())
    }

    fn bind_stmts(&mut self, stmts: &[Stmt]) -> Result<(), InternalError> {
        for stmt in stmts {
            self.bind_stmt(stmt)?;
        }
        Ok(())
    }

    fn bind_stmt(&mut self, stmt: &Stmt) -> Result<(), InternalError> {
        match &stmt.kind {
            StmtKind::Let {
                name,
                ty,
                init,
                mutable,
            } => self.bind_let(stmt, name, ty.as_ref(), init.as_ref(), *mutable)?,
            StmtKind::Assign { target, value } => self.bind_assign(target, value)?,
            StmtKind::Expr(expr) => {
                self.bind_expr(expr)?;
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.bind_condition(cond)?;
                self.bind_block(stmt, then_block)?;
                if let Some(else_block) = else_block {
                    self.bind_block(stmt, else_block)?;
                }
            }
            StmtKind::While { cond, body } => {
                self.bind_condition(cond)?;
                self.bind_block(stmt, body)?;
            }
            StmtKind::Return(value) => self.bind_return(stmt.span, value.as_ref())?,
            StmtKind::Block(body) => self.bind_block(stmt, body)?,
        }
        Ok(())
    }

    fn bind_block(&mut self, owner: &Stmt, body: &[Stmt]) -> Result<(), InternalError> {
        let parent = self.current_scope();
        let scope = self
            .table
            .new_scope(ScopeKind::Block, Some(parent), None, self.unit.module);
        if self.unit.bindings.scope(owner.id).is_none() {
            self.unit.bindings.record_scope(owner.id, scope);
        }
        self.enter_scope(scope);
        let bound = self.bind_stmts(body);
        let exited = self.exit_scope("block");
        bound?;
        exited.map(|_| ())
    }

    fn bind_let(
        &mut self,
        stmt: &Stmt,
        name: &str,
        written: Option<&TypeExpr>,
        init: Option<&Expr>,
        mutable: bool,
    ) -> Result<(), InternalError> {
        let scope = self.current_scope();
        let declared = written.map(|ty| self.resolve_type(ty, scope));
        let initial = match init {
            Some(expr) => Some((self.bind_expr(expr)?, expr.span)),
            None => None,
        };
        let ty = match (declared, initial) {
            (Some(declared), Some((found, span))) => {
                self.check_assignable(found, declared, span);
                declared
            }
            (Some(declared), None) => declared,
            (None, Some((found, span))) if found == builtin::VOID => {
                self.report(
                    SemanticError::IncompatibleTypes {
                        expected: "a value".to_string(),
                        found: self.type_name(found),
                        span: span.into(),
                    },
                    span,
                );
                builtin::UNRESOLVED
            }
            (None, Some((found, _))) => found,
            (None, None) => builtin::UNRESOLVED,
        };

        let name = self.table.intern(name);
        let kind = SymbolKind::Variable(VariableRole::Local);
        let mut def = SymbolDef::new(name, stmt.span, self.unit.module, kind).with_type(ty);
        def.flags.mutable = mutable;
        def.flags.initialized = init.is_some();
        def.flags.typed = true;
        let id = self.define_or_report(scope, def);
        self.unit.bindings.record_symbol(stmt.id, id);
        self.unit.bindings.record_type(stmt.id, ty);
        Ok(())
    }

    fn bind_assign(&mut self, target: &Expr, value: &Expr) -> Result<(), InternalError> {
        let found = self.bind_expr(value)?;
        match &target.kind {
            ExprKind::Ident(name) => {
                let Some(symbol) = self.lookup_variable(name) else {
                    self.report(
                        SemanticError::NotResolved {
                            name: name.clone(),
                            span: target.span.into(),
                        },
                        target.span,
                    );
                    return Ok(());
                };
                self.unit.bindings.record_symbol(target.id, symbol);
                let role = self.table.get(symbol).variable_role();
                if role == Some(VariableRole::Property) {
                    crate::methods::property_access_or_error(
                        self.table,
                        self.access_scope(),
                        symbol,
                        target.span,
                        &mut self.unit.diags,
                    );
                }
                let flags = self.table.get(symbol).flags;
                if !flags.mutable && flags.initialized {
                    self.report(
                        SemanticError::ImmutableAssignment {
                            name: name.clone(),
                            span: target.span.into(),
                        },
                        target.span,
                    );
                }
                if matches!(role, Some(VariableRole::Property | VariableRole::Capture)) {
                    self.check_pure_assignment(name, target.span);
                }
                let expected = self.table.type_of(symbol);
                self.check_assignable(found, expected, value.span);
                self.table.get_mut(symbol).flags.initialized = true;
                self.unit.bindings.record_type(target.id, expected);
            }
            ExprKind::Property { receiver, name } => {
                let expected = self.bind_property(target, receiver, name)?;
                self.unit.bindings.record_type(target.id, expected);
                self.check_pure_assignment(name, target.span);
                self.check_assignable(found, expected, value.span);
            }
            _ => {
                self.bind_expr(target)?;
                self.report(
                    SemanticError::ImmutableAssignment {
                        name: "expression".to_string(),
                        span: target.span.into(),
                    },
                    target.span,
                );
            }
        }
        Ok(())
    }

    /// Pure code may only change its own locals; constructors may set up
    /// their own properties.
    fn check_pure_assignment(&mut self, name: &str, span: Span) {
        let constructing = self.frame().is_some_and(|f| f.is_constructor);
        if self.in_pure_context() && !constructing {
            self.report(
                SemanticError::PureViolation {
                    action: "assign to".to_string(),
                    name: name.to_string(),
                    span: span.into(),
                },
                span,
            );
        }
    }

    fn bind_condition(&mut self, cond: &Expr) -> Result<(), InternalError> {
        let found = self.bind_expr(cond)?;
        if found != builtin::BOOLEAN && found != builtin::UNRESOLVED {
            self.report(
                SemanticError::NonBooleanControl {
                    found: self.type_name(found),
                    span: cond.span.into(),
                },
                cond.span,
            );
        }
        Ok(())
    }

    fn bind_return(&mut self, span: Span, value: Option<&Expr>) -> Result<(), InternalError> {
        let expected = self.frame().map_or(builtin::VOID, |f| f.returns);
        match value {
            Some(expr) => {
                let found = self.bind_expr(expr)?;
                if expected == builtin::VOID && found != builtin::UNRESOLVED {
                    self.report(
                        SemanticError::IncompatibleTypes {
                            expected: self.type_name(builtin::VOID),
                            found: self.type_name(found),
                            span: expr.span.into(),
                        },
                        expr.span,
                    );
                } else {
                    self.check_assignable(found, expected, expr.span);
                }
            }
            None if expected != builtin::VOID && expected != builtin::UNRESOLVED => {
                self.report(
                    SemanticError::IncompatibleTypes {
                        expected: self.type_name(expected),
                        found: self.type_name(builtin::VOID),
                        span: span.into(),
                    },
                    span,
                );
            }
            None => {}
        }
        Ok(())
    }

    /// Report `IncompatibleTypes` when `found` cannot be assigned to `expected`.
    pub(super) fn check_assignable(
        &mut self,
        found: SymbolId,
        expected: SymbolId,
        span: Span,
    ) -> bool {
        if is_assignable(self.table, found, expected) {
            return true;
        }
        self.report(
            SemanticError::IncompatibleTypes {
                expected: self.type_name(expected),
                found: self.type_name(found),
                span: span.into(),
            },
            span,
        );
        false
    }

    pub(super) fn lookup_variable(&self, name: &str) -> Option<SymbolId> {
        let name = self.table.lookup_name(name)?;
        self.table
            .resolve(self.current_scope(), SymbolSearch::variable(name))
    }
}
