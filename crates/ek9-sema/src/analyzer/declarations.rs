// analyzer/declarations.rs
//
// Pass 0: create symbols for every declaration and record them against their
// nodes. Types are filled in by the next pass.

use ek9_identity::{ScopeId, Span, SymbolId};

use super::Binder;
use crate::ast::{AggregateDecl, Decl, FunctionDecl, MethodDecl, Param, PropertyDecl, TypeParamDecl};
use crate::errors::SemanticWarning;
use crate::methods::{DEFAULTABLE_OPERATORS, ReturnRule, operator_contract};
use crate::symbols::well_known::COMPARISON_OPERATORS;
use crate::symbols::{
    AggregateInfo, AggregateKind, FunctionInfo, MethodFlags, MethodInfo, ScopeKind, SymbolDef,
    SymbolKind, SymbolList, VariableRole, Visibility, builtin,
};

const COMPARE_OPERATOR: &str = "<=>";

impl Binder<'_> {
    pub(super) fn declare(&mut self, decl: &Decl) {
        match decl {
            Decl::Aggregate(aggregate) => self.declare_aggregate(aggregate),
            Decl::Function(function) => self.declare_function(function),
        }
    }

    fn declare_aggregate(&mut self, decl: &AggregateDecl) {
        let module = self.unit.module;
        let module_scope = self.unit.module_scope;
        let members = self
            .table
            .new_scope(ScopeKind::TypeBody, Some(module_scope), None, module);
        let info = AggregateInfo {
            kind: decl.kind,
            builtin: false,
            members,
            supertype: None,
            traits: SymbolList::new(),
            type_params: SymbolList::new(),
            parameterization: None,
            is_abstract: decl.is_abstract || decl.kind == AggregateKind::Trait,
            is_open: decl.is_open,
        };
        let name = self.table.intern(&decl.name);
        let def = SymbolDef::new(name, decl.span, module, SymbolKind::Aggregate(Box::new(info)));
        let id = self.define_or_report(module_scope, def);
        self.table.get_mut(id).ty = Some(id);
        self.table.set_scope_owner(members, id);
        self.unit.bindings.record_symbol(decl.id, id);
        self.unit.bindings.record_scope(decl.id, members);
        tracing::trace!(name = %decl.name, kind = decl.kind.as_str(), "declared aggregate");

        for param in &decl.type_params {
            let tp = self.declare_type_param(id, members, param);
            if let Some(info) = self.table.aggregate_mut(id) {
                info.type_params.push(tp);
            }
        }
        for property in &decl.properties {
            self.declare_property(members, property);
        }

        let explicit: Vec<&str> = decl
            .methods
            .iter()
            .filter(|m| m.is_operator && !m.is_default)
            .map(|m| m.name.as_str())
            .collect();
        let mut defaulted: Vec<String> = Vec::new();
        for method in &decl.methods {
            if method.is_default {
                self.declare_default_request(id, members, method, &explicit, &mut defaulted);
            } else {
                self.declare_method(id, members, method);
            }
        }
        if decl.default_operators {
            for op in DEFAULTABLE_OPERATORS {
                if !explicit.contains(&op) && !defaulted.iter().any(|d| d == op) {
                    self.declare_defaulted_operator(id, members, op, decl.span);
                    defaulted.push(op.to_string());
                }
            }
        }
        let wants_compare = defaulted
            .iter()
            .any(|op| COMPARISON_OPERATORS.contains(&op.as_str()));
        if wants_compare
            && !explicit.contains(&COMPARE_OPERATOR)
            && !defaulted.iter().any(|d| d == COMPARE_OPERATOR)
        {
            self.declare_defaulted_operator(id, members, COMPARE_OPERATOR, decl.span);
        }

        let has_constructor = decl.methods.iter().any(|m| m.is_constructor);
        if self.config.synthesize_default_constructors
            && !has_constructor
            && decl.kind != AggregateKind::Trait
        {
            self.declare_implicit_constructor(id, members, decl.span);
        }
    }

    fn declare_type_param(
        &mut self,
        owner: SymbolId,
        scope: ScopeId,
        decl: &TypeParamDecl,
    ) -> SymbolId {
        let name = self.table.intern(&decl.name);
        let kind = SymbolKind::TypeParameter {
            owner,
            constraint: builtin::ANY,
        };
        let def = SymbolDef::new(name, decl.span, self.unit.module, kind);
        let id = self.define_or_report(scope, def);
        self.table.get_mut(id).ty = Some(id);
        self.unit.bindings.record_symbol(decl.id, id);
        id
    }

    fn declare_property(&mut self, members: ScopeId, decl: &PropertyDecl) {
        let name = self.table.intern(&decl.name);
        let mut def = SymbolDef::new(
            name,
            decl.span,
            self.unit.module,
            SymbolKind::Variable(VariableRole::Property),
        )
        .with_visibility(decl.visibility);
        def.flags.mutable = true;
        def.flags.initialized = true;
        let id = self.define_or_report(members, def);
        self.unit.bindings.record_symbol(decl.id, id);
    }

    fn declare_params(&mut self, scope: ScopeId, params: &[Param]) -> SymbolList {
        let mut ids = SymbolList::new();
        for param in params {
            let name = self.table.intern(&param.name);
            let mut def = SymbolDef::new(
                name,
                param.span,
                self.unit.module,
                SymbolKind::Variable(VariableRole::Parameter),
            );
            def.flags.initialized = true;
            let id = self.define_or_report(scope, def);
            self.unit.bindings.record_symbol(param.id, id);
            ids.push(id);
        }
        ids
    }

    fn declare_method(&mut self, owner: SymbolId, members: ScopeId, decl: &MethodDecl) {
        let module = self.unit.module;
        let scope = self
            .table
            .new_scope(ScopeKind::Method, Some(members), None, module);
        let params = self.declare_params(scope, &decl.params);
        let info = MethodInfo {
            scope,
            owner,
            params,
            return_type: if decl.is_constructor {
                owner
            } else {
                builtin::UNRESOLVED
            },
            flags: MethodFlags {
                constructor: decl.is_constructor,
                operator: decl.is_operator,
                is_abstract: decl.is_abstract,
                is_override: decl.is_override,
                defaulted: false,
            },
        };
        let name = if decl.is_constructor {
            self.table.get(owner).name
        } else {
            self.table.intern(&decl.name)
        };
        let mut def = SymbolDef::new(name, decl.span, module, SymbolKind::Method(Box::new(info)))
            .with_visibility(decl.visibility);
        def.flags.pure = decl.is_pure;
        if decl.is_constructor {
            def.ty = Some(owner);
        }
        let id = self.define_method(members, scope, def);
        self.unit.bindings.record_symbol(decl.id, id);
        self.unit.bindings.record_scope(decl.id, scope);
    }

    /// `default operator <op>` written as a member.
    fn declare_default_request(
        &mut self,
        owner: SymbolId,
        members: ScopeId,
        decl: &MethodDecl,
        explicit: &[&str],
        defaulted: &mut Vec<String>,
    ) {
        if explicit.contains(&decl.name.as_str()) || defaulted.contains(&decl.name) {
            let warning = SemanticWarning::DefaultIgnored {
                operator: decl.name.clone(),
                span: decl.span.into(),
            };
            self.unit.diags.warning(warning, decl.span);
            return;
        }
        let id = self.declare_defaulted_operator(owner, members, &decl.name, decl.span);
        self.unit.bindings.record_symbol(decl.id, id);
        defaulted.push(decl.name.clone());
    }

    /// Materialise a compiler-generated operator so calls resolve to it.
    ///
    /// Comparisons take the owning type; the field-wise unary operators take
    /// nothing. The signature is complete here because it only mentions the
    /// owner and built-ins.
    fn declare_defaulted_operator(
        &mut self,
        owner: SymbolId,
        members: ScopeId,
        op: &str,
        span: Span,
    ) -> SymbolId {
        let module = self.unit.module;
        let scope = self
            .table
            .new_scope(ScopeKind::Method, Some(members), None, module);
        let mut params = SymbolList::new();
        if COMPARISON_OPERATORS.contains(&op) || op == COMPARE_OPERATOR {
            let name = self.table.intern("arg");
            let kind = SymbolKind::Variable(VariableRole::Parameter);
            let mut def = SymbolDef::new(name, span, module, kind).with_type(owner);
            def.flags.initialized = true;
            def.flags.typed = true;
            if let Ok(id) = self.table.define(scope, def) {
                params.push(id);
            }
        }
        let return_type = match operator_contract(op).map(|c| c.returns) {
            Some(ReturnRule::Exactly(ty)) => ty,
            _ => builtin::UNRESOLVED,
        };
        let info = MethodInfo {
            scope,
            owner,
            params,
            return_type,
            flags: MethodFlags {
                operator: true,
                defaulted: true,
                ..MethodFlags::default()
            },
        };
        let name = self.table.intern(op);
        let mut def = SymbolDef::new(name, span, module, SymbolKind::Method(Box::new(info)))
            .with_type(return_type);
        def.flags.pure = true;
        def.flags.typed = true;
        tracing::trace!(op, owner = self.table.symbol_name(owner), "defaulted operator");
        self.define_method(members, scope, def)
    }

    fn declare_implicit_constructor(&mut self, owner: SymbolId, members: ScopeId, span: Span) {
        let module = self.unit.module;
        let scope = self
            .table
            .new_scope(ScopeKind::Method, Some(members), None, module);
        let info = MethodInfo {
            scope,
            owner,
            params: SymbolList::new(),
            return_type: owner,
            flags: MethodFlags {
                constructor: true,
                ..MethodFlags::default()
            },
        };
        let name = self.table.get(owner).name;
        let mut def = SymbolDef::new(name, span, module, SymbolKind::Method(Box::new(info)))
            .with_visibility(Visibility::Public)
            .with_type(owner);
        def.flags.pure = true;
        def.flags.typed = true;
        self.define_method(members, scope, def);
    }

    fn define_method(&mut self, members: ScopeId, scope: ScopeId, def: SymbolDef) -> SymbolId {
        // Methods overload by name, so define never reports a clash for them.
        let id = match self.table.define(members, def) {
            Ok(id) | Err(id) => id,
        };
        self.table.set_scope_owner(scope, id);
        id
    }

    fn declare_function(&mut self, decl: &FunctionDecl) {
        let module = self.unit.module;
        let module_scope = self.unit.module_scope;
        let scope = self
            .table
            .new_scope(ScopeKind::Function, Some(module_scope), None, module);
        let info = FunctionInfo {
            scope,
            params: SymbolList::new(),
            return_type: builtin::UNRESOLVED,
            type_params: SymbolList::new(),
            parameterization: None,
            supertype: None,
            is_abstract: decl.is_abstract,
            is_dynamic: false,
        };
        let name = self.table.intern(&decl.name);
        let mut def = SymbolDef::new(name, decl.span, module, SymbolKind::Function(Box::new(info)));
        def.flags.pure = decl.is_pure;
        let id = self.define_or_report(module_scope, def);
        self.table.get_mut(id).ty = Some(id);
        self.table.set_scope_owner(scope, id);
        self.unit.bindings.record_symbol(decl.id, id);
        self.unit.bindings.record_scope(decl.id, scope);

        let type_params: SymbolList = decl
            .type_params
            .iter()
            .map(|param| self.declare_type_param(id, scope, param))
            .collect();
        let params = self.declare_params(scope, &decl.params);
        if let Some(info) = self.table.function_mut(id) {
            info.type_params = type_params;
            info.params = params;
        }
        tracing::trace!(name = %decl.name, "declared function");
    }
}

