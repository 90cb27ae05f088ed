// analyzer/mod.rs
//
// Orchestrates the passes over one compilation unit.
//
// Pass order per unit: declarations, explicit types, structural checks, then
// bodies. Every top-level declaration is processed under its own write guard
// on the shared symbol table, so concurrent units interleave between
// declarations and never observe a half-finished parameterization.

mod calls;
mod declarations;
mod expr;
mod pipelines;
mod stmt;
mod structure;
mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use ek9_identity::{ModuleId, NodeId, ScopeId, Span, SymbolId};
use rustc_hash::FxHashMap;

use crate::ast::CompilationUnit;
use crate::compilation_db::CompilationDb;
use crate::config::AnalyzerConfig;
use crate::diagnostics::{Diagnostics, TypeError, TypeWarning};
use crate::errors::{ErrorKind, InternalError, SemanticError, SemanticWarning};
use crate::generic;
use crate::node_map::NodeBindings;
use crate::pipeline::StreamFlow;
use crate::symbols::{
    ScopeStack, SymbolDef, SymbolTable, VariableRole, builtin, most_specific_scope,
};
use crate::type_display::display_type;

/// Everything the analysis of one unit hands to later phases.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub module: ModuleId,
    /// Symbols, types and scopes recorded against syntax nodes.
    pub bindings: NodeBindings,
    /// Type flow of every pipeline expression, keyed by the expression node.
    pub pipelines: FxHashMap<NodeId, StreamFlow>,
    pub errors: Vec<TypeError>,
    pub warnings: Vec<TypeWarning>,
}

impl AnalysisOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_kinds(&self) -> Vec<ErrorKind> {
        self.errors.iter().map(TypeError::kind).collect()
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind() == kind).count()
    }
}

/// Semantic analyzer for compilation units sharing one `CompilationDb`.
pub struct Analyzer {
    db: Arc<CompilationDb>,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(db: Arc<CompilationDb>, config: AnalyzerConfig) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &Arc<CompilationDb> {
        &self.db
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyse one unit. Program errors end up in the output; `Err` means the
    /// analyzer itself could not continue.
    #[tracing::instrument(skip_all, fields(module = %unit.module, decls = unit.decls.len()))]
    pub fn analyze(&self, unit: &CompilationUnit) -> Result<AnalysisOutput, InternalError> {
        let mut state = {
            let mut table = self.db.symbols_mut();
            verify_builtins(&table)?;
            table.set_hierarchy_limit(self.config.max_hierarchy_depth);
            let module = table.module(&unit.module);
            for reference in &unit.references {
                let target = table.module(reference);
                table.add_module_reference(module, target);
            }
            UnitState::new(module, table.module_scope(module))
        };

        for decl in &unit.decls {
            self.with_binder(&mut state, |binder| binder.declare(decl));
        }
        for decl in &unit.decls {
            self.with_binder(&mut state, |binder| binder.resolve_explicit_types(decl))?;
        }
        self.with_binder(&mut state, |binder| binder.refresh_instantiations());
        for decl in &unit.decls {
            self.with_binder(&mut state, |binder| binder.check_structure(decl))?;
        }
        for decl in &unit.decls {
            self.with_binder(&mut state, |binder| binder.bind_bodies(decl))?;
        }

        let output = state.finish();
        tracing::debug!(
            errors = output.errors.len(),
            warnings = output.warnings.len(),
            "unit analysed"
        );
        Ok(output)
    }

    fn with_binder<R>(&self, state: &mut UnitState, pass: impl FnOnce(&mut Binder<'_>) -> R) -> R {
        let mut table = self.db.symbols_mut();
        let mut binder = Binder {
            table: &mut *table,
            unit: state,
            config: &self.config,
        };
        pass(&mut binder)
    }
}

fn verify_builtins(table: &SymbolTable) -> Result<(), InternalError> {
    let scalars = [
        ("Void", builtin::VOID),
        ("Any", builtin::ANY),
        ("Boolean", builtin::BOOLEAN),
        ("Integer", builtin::INTEGER),
        ("Float", builtin::FLOAT),
        ("String", builtin::STRING),
        ("JSON", builtin::JSON),
    ];
    for (name, id) in scalars {
        if id.slot() >= table.symbol_count() || table.symbol_name(id) != name {
            return Err(InternalError::MissingBuiltin {
                name: name.to_string(),
            });
        }
    }
    let known = table.well_known();
    for (name, id) in [
        ("Iterator", known.iterator),
        ("List", known.list),
        ("Dict", known.dict),
    ] {
        if id == builtin::UNRESOLVED || !table.is_generic_template(id) {
            return Err(InternalError::MissingBuiltin {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

/// The callable whose body is being bound.
#[derive(Debug, Clone, Copy)]
struct Frame {
    callable: SymbolId,
    /// Aggregate owning the method, `None` for functions.
    owner: Option<SymbolId>,
    is_constructor: bool,
    is_pure: bool,
    returns: SymbolId,
}

/// Per-unit state that survives between the per-declaration lock scopes.
struct UnitState {
    module: ModuleId,
    module_scope: ScopeId,
    bindings: NodeBindings,
    diags: Diagnostics,
    stack: ScopeStack,
    pipelines: FxHashMap<NodeId, StreamFlow>,
    frames: Vec<Frame>,
    /// Where this unit first asked for each instantiation.
    requested_at: FxHashMap<SymbolId, Span>,
}

impl UnitState {
    fn new(module: ModuleId, module_scope: ScopeId) -> Self {
        let mut stack = ScopeStack::new();
        stack.push(module_scope);
        Self {
            module,
            module_scope,
            bindings: NodeBindings::new(),
            diags: Diagnostics::new(),
            stack,
            pipelines: FxHashMap::default(),
            frames: Vec::new(),
            requested_at: FxHashMap::default(),
        }
    }

    fn finish(self) -> AnalysisOutput {
        let (errors, warnings) = self.diags.into_parts();
        AnalysisOutput {
            module: self.module,
            bindings: self.bindings,
            pipelines: self.pipelines,
            errors,
            warnings,
        }
    }
}

/// One pass over one declaration, holding the table's write guard.
struct Binder<'a> {
    table: &'a mut SymbolTable,
    unit: &'a mut UnitState,
    config: &'a AnalyzerConfig,
}

impl Binder<'_> {
    fn report(&mut self, error: SemanticError, span: Span) {
        self.unit.diags.error(error, span);
    }

    fn type_name(&self, ty: SymbolId) -> String {
        display_type(self.table, ty)
    }

    fn current_scope(&self) -> ScopeId {
        self.unit.stack.current().unwrap_or(self.unit.module_scope)
    }

    /// Declarative context of the code being bound, for access checks.
    fn access_scope(&self) -> Option<ScopeId> {
        most_specific_scope(&self.unit.stack, self.table)
    }

    fn frame(&self) -> Option<Frame> {
        self.unit.frames.last().copied()
    }

    fn in_pure_context(&self) -> bool {
        self.frame().is_some_and(|f| f.is_pure)
    }

    fn enter_scope(&mut self, scope: ScopeId) {
        tracing::trace!(scope = scope.index(), depth = self.unit.stack.depth(), "enter scope");
        self.unit.stack.push(scope);
    }

    /// Pop the innermost scope, warning about locals nobody read.
    fn exit_scope(&mut self, context: &'static str) -> Result<ScopeId, InternalError> {
        let scope = self
            .unit
            .stack
            .pop()
            .ok_or(InternalError::ScopeStackUnderflow { context })?;
        tracing::trace!(scope = scope.index(), context, "exit scope");
        if self.config.warn_unreferenced {
            let unused: Vec<SymbolId> = self
                .table
                .scope(scope)
                .symbols()
                .iter()
                .copied()
                .filter(|id| {
                    let def = self.table.get(*id);
                    def.variable_role() == Some(VariableRole::Local) && !def.flags.referenced
                })
                .collect();
            for id in unused {
                let def = self.table.get(id);
                let span = def.span;
                let warning = SemanticWarning::NotReferenced {
                    name: self.table.name(def.name).to_string(),
                    span: span.into(),
                };
                self.unit.diags.warning(warning, span);
            }
        }
        Ok(scope)
    }

    /// Define `def` in `scope`; a clash is reported and the symbol is kept
    /// detached so the rest of the declaration can still be analysed.
    fn define_or_report(&mut self, scope: ScopeId, def: SymbolDef) -> SymbolId {
        match self.table.define(scope, def.clone()) {
            Ok(id) => id,
            Err(_) => {
                let span = def.span;
                self.report(
                    SemanticError::DuplicateSymbol {
                        name: self.table.name(def.name).to_string(),
                        span: span.into(),
                    },
                    span,
                );
                let mut detached = def;
                detached.scope = Some(scope);
                self.table.add_detached(detached)
            }
        }
    }

    /// Re-derive instantiations made before their template was fully typed.
    ///
    /// A failure is reported where this unit requested the instance, or at the
    /// template's declaration when another unit made the request.
    fn refresh_instantiations(&mut self) {
        let outcome = generic::refresh_stale(self.table, self.config.max_instantiation_depth);
        for (instance, err) in outcome.failed {
            let span = match self.unit.requested_at.get(&instance) {
                Some(span) => *span,
                None => {
                    let template = self.table.parameterization(instance).map(|p| p.template);
                    self.table.get(template.unwrap_or_else(|| err.template())).span
                }
            };
            let error = err.to_semantic(self.table, span);
            self.report(error, span);
        }
    }
}

