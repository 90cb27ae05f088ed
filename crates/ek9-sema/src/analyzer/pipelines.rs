// analyzer/pipelines.rs

use ek9_identity::SymbolId;

use super::Binder;
use crate::ast::{Expr, Pipeline, PipelineTerminal, SourceKind, TerminalKind};
use crate::errors::{InternalError, SemanticError};
use crate::pipeline::{BoundArg, BoundSource, BoundStage, BoundTerminal, StageCx, analyze_pipeline};
use crate::symbols::builtin;

impl Binder<'_> {
    /// Bind the expressions a pipeline carries, then fold the stream type
    /// through it. The flow is kept per pipeline node for later passes.
    pub(super) fn bind_pipeline(
        &mut self,
        expr: &Expr,
        pipeline: &Pipeline,
    ) -> Result<SymbolId, InternalError> {
        let source = match &pipeline.source.kind {
            SourceKind::Cat(values) => BoundSource::Values {
                types: self.bind_args(values)?.to_vec(),
                span: pipeline.source.span,
            },
            SourceKind::Range { from, to } => {
                for end in [from, to] {
                    let ty = self.bind_expr(end)?;
                    if ty != builtin::INTEGER && ty != builtin::UNRESOLVED {
                        let found = self.type_name(ty);
                        self.report(
                            SemanticError::IncompatibleTypes {
                                expected: "Integer".to_string(),
                                found,
                                span: end.span.into(),
                            },
                            end.span,
                        );
                    }
                }
                BoundSource::Range {
                    span: pipeline.source.span,
                }
            }
        };

        let mut stages = Vec::with_capacity(pipeline.stages.len());
        for stage in &pipeline.stages {
            let mut args = Vec::with_capacity(stage.args.len());
            for arg in &stage.args {
                let ty = self.bind_expr(arg)?;
                args.push(BoundArg { ty, span: arg.span });
            }
            let branch = stage.branch.as_ref().map(|t| self.bind_terminal(t));
            stages.push(BoundStage {
                kind: stage.kind,
                args,
                branch,
                span: stage.span,
            });
        }
        let terminal = pipeline.terminal.as_ref().map(|t| self.bind_terminal(t));

        let mut cx = StageCx {
            table: &mut *self.table,
            diags: &mut self.unit.diags,
            epsilon: self.config.ambiguity_epsilon,
            max_depth: self.config.max_instantiation_depth,
        };
        let flow = analyze_pipeline(&mut cx, &source, &stages, terminal.as_ref());

        for (stage, stage_flow) in pipeline.stages.iter().zip(&flow.stages) {
            self.unit.bindings.record_type(stage.id, stage_flow.produces);
        }
        self.unit.bindings.record_type(pipeline.source.id, flow.source_produces);
        let result = flow.result_type;
        tracing::debug!(
            stages = flow.stages.len(),
            result = %self.type_name(result),
            "pipeline bound"
        );
        self.unit.pipelines.insert(expr.id, flow);
        Ok(result)
    }

    fn bind_terminal(&mut self, terminal: &PipelineTerminal) -> BoundTerminal {
        match &terminal.kind {
            TerminalKind::Into(name) => {
                let Some(target) = self.lookup_variable(name) else {
                    self.report(
                        SemanticError::NotResolved {
                            name: name.clone(),
                            span: terminal.span.into(),
                        },
                        terminal.span,
                    );
                    return BoundTerminal::Into {
                        target: builtin::UNRESOLVED,
                        ty: builtin::UNRESOLVED,
                        span: terminal.span,
                    };
                };
                let ty = self.use_value(target, name, terminal.span);
                self.unit.bindings.record_symbol(terminal.id, target);
                self.unit.bindings.record_type(terminal.id, ty);
                BoundTerminal::Into {
                    target,
                    ty,
                    span: terminal.span,
                }
            }
            TerminalKind::CollectAs(written) => {
                let scope = self.current_scope();
                let ty = self.resolve_type(written, scope);
                self.unit.bindings.record_type(terminal.id, ty);
                BoundTerminal::CollectAs {
                    ty,
                    span: terminal.span,
                }
            }
        }
    }
}
