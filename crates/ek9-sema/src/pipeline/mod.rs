// pipeline/mod.rs
//
// Type flow through a stream pipeline: source, stages, terminal.
//
// The walk is a single left-to-right fold carrying the type that flows between
// stages. A stage that fails reports once and hands `UNRESOLVED` to the rest
// of the pipeline, which then skips its own checks.

mod stages;

#[cfg(test)]
mod tests;

use ek9_identity::{Span, SymbolId};

use crate::compatibility::{MatchKind, classify_match};
use crate::diagnostics::Diagnostics;
use crate::errors::SemanticError;
use crate::methods::{MethodResolution, best_match, gather_methods};
use crate::symbols::{SymbolTable, builtin};
use crate::type_display::display_type;

pub use stages::{STAGE_RULES, StageRule, element_type};

/// Operation kind of an intermediate stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Filter,
    Select,
    Map,
    Group,
    Sort,
    Uniq,
    Join,
    Split,
    Flatten,
    Tee,
    Head,
    Tail,
    Skip,
    Call,
    Async,
    Max,
    Min,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Filter => "filter",
            StageKind::Select => "select",
            StageKind::Map => "map",
            StageKind::Group => "group",
            StageKind::Sort => "sort",
            StageKind::Uniq => "uniq",
            StageKind::Join => "join",
            StageKind::Split => "split",
            StageKind::Flatten => "flatten",
            StageKind::Tee => "tee",
            StageKind::Head => "head",
            StageKind::Tail => "tail",
            StageKind::Skip => "skip",
            StageKind::Call => "call",
            StageKind::Async => "async",
            StageKind::Max => "max",
            StageKind::Min => "min",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "filter" => StageKind::Filter,
            "select" => StageKind::Select,
            "map" => StageKind::Map,
            "group" => StageKind::Group,
            "sort" => StageKind::Sort,
            "uniq" => StageKind::Uniq,
            "join" => StageKind::Join,
            "split" => StageKind::Split,
            "flatten" => StageKind::Flatten,
            "tee" => StageKind::Tee,
            "head" => StageKind::Head,
            "tail" => StageKind::Tail,
            "skip" => StageKind::Skip,
            "call" => StageKind::Call,
            "async" => StageKind::Async,
            "max" => StageKind::Max,
            "min" => StageKind::Min,
            _ => return None,
        };
        Some(kind)
    }
}

/// A stage argument after binding: its type and where it was written.
///
/// Function arguments carry the function symbol as their type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundArg {
    pub ty: SymbolId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundStage {
    pub kind: StageKind,
    pub args: Vec<BoundArg>,
    /// Side branch of a `tee`.
    pub branch: Option<BoundTerminal>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundSource {
    /// `cat a, b`: each value streams its elements if iterable, else itself.
    Values { types: Vec<SymbolId>, span: Span },
    /// `for i in 1 ... 10`
    Range { span: Span },
}

impl BoundSource {
    pub fn span(&self) -> Span {
        match self {
            BoundSource::Values { span, .. } | BoundSource::Range { span } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundTerminal {
    /// `> target`: the target's type must accept values through `|`.
    Into { target: SymbolId, ty: SymbolId, span: Span },
    /// `collect as List of String`: a new value of the type is filled through `|`.
    CollectAs { ty: SymbolId, span: Span },
}

impl BoundTerminal {
    pub fn sink_type(&self) -> SymbolId {
        match self {
            BoundTerminal::Into { ty, .. } | BoundTerminal::CollectAs { ty, .. } => *ty,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            BoundTerminal::Into { span, .. } | BoundTerminal::CollectAs { span, .. } => *span,
        }
    }
}

/// Resolved consumes/produces of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageFlow {
    pub kind: StageKind,
    pub consumes: SymbolId,
    pub produces: SymbolId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalFlow {
    pub accepts: SymbolId,
    /// The flowing type reaches the sink only through a `#^` promotion.
    pub promotion_required: bool,
}

/// Result of analysing one pipeline statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFlow {
    pub source_produces: SymbolId,
    pub stages: Vec<StageFlow>,
    pub terminal: Option<TerminalFlow>,
    /// Type flowing into the terminal.
    pub final_type: SymbolId,
    /// Value of the pipeline as an expression: the collected type, or Void.
    pub result_type: SymbolId,
}

/// Shared state handed to every stage rule.
pub struct StageCx<'a> {
    pub table: &'a mut SymbolTable,
    pub diags: &'a mut Diagnostics,
    pub epsilon: f64,
    pub max_depth: usize,
}

impl StageCx<'_> {
    pub(crate) fn mismatch(&mut self, stage: &BoundStage, detail: impl Into<String>) -> SymbolId {
        self.diags.error(
            SemanticError::PipelineStageMismatch {
                stage: stage.kind.as_str().to_string(),
                detail: detail.into(),
                span: stage.span.into(),
            },
            stage.span,
        );
        builtin::UNRESOLVED
    }

    pub(crate) fn name(&self, ty: SymbolId) -> String {
        display_type(self.table, ty)
    }
}

/// Fold the flowing type through `stages` and check the terminal.
#[tracing::instrument(level = "debug", skip_all, fields(stages = stages.len()))]
pub fn analyze_pipeline(
    cx: &mut StageCx<'_>,
    source: &BoundSource,
    stages: &[BoundStage],
    terminal: Option<&BoundTerminal>,
) -> StreamFlow {
    let source_produces = source_type(cx, source);
    let mut current = source_produces;
    if current == builtin::VOID {
        void_error(cx, "source", source.span());
        current = builtin::UNRESOLVED;
    }

    let mut flows = Vec::with_capacity(stages.len());
    for stage in stages {
        let consumes = current;
        // An unresolved flow or argument was reported where it arose.
        let unresolved_arg = stage.args.iter().any(|arg| arg.ty == builtin::UNRESOLVED);
        let produces = if current == builtin::UNRESOLVED || unresolved_arg {
            builtin::UNRESOLVED
        } else {
            let rule = stages::rule_for(stage.kind);
            rule(cx, stage, current)
        };
        current = if produces == builtin::VOID {
            void_error(cx, stage.kind.as_str(), stage.span);
            builtin::UNRESOLVED
        } else {
            produces
        };
        tracing::trace!(
            stage = stage.kind.as_str(),
            consumes = consumes.index(),
            produces = current.index()
        );
        flows.push(StageFlow {
            kind: stage.kind,
            consumes,
            produces: current,
        });
    }

    let terminal_flow = terminal.map(|t| check_terminal(cx, t, current));
    let result_type = match terminal {
        Some(BoundTerminal::CollectAs { ty, .. }) => *ty,
        _ => builtin::VOID,
    };
    StreamFlow {
        source_produces,
        stages: flows,
        terminal: terminal_flow,
        final_type: current,
        result_type,
    }
}

fn source_type(cx: &mut StageCx<'_>, source: &BoundSource) -> SymbolId {
    match source {
        BoundSource::Range { .. } => builtin::INTEGER,
        BoundSource::Values { types, span } => {
            let mut produced: Option<SymbolId> = None;
            for ty in types {
                let element = element_type(cx.table, *ty).unwrap_or(*ty);
                match produced {
                    None => produced = Some(element),
                    Some(first) if first == element || element == builtin::UNRESOLVED => {}
                    Some(first) => {
                        let detail = format!(
                            "sources must produce one type, found {} and {}",
                            cx.name(first),
                            cx.name(element)
                        );
                        cx.diags.error(
                            SemanticError::PipelineStageMismatch {
                                stage: "cat".to_string(),
                                detail,
                                span: (*span).into(),
                            },
                            *span,
                        );
                        return builtin::UNRESOLVED;
                    }
                }
            }
            produced.unwrap_or(builtin::UNRESOLVED)
        }
    }
}

fn void_error(cx: &mut StageCx<'_>, stage: &str, span: Span) {
    cx.diags.error(
        SemanticError::VoidPipeline {
            stage: stage.to_string(),
            span: span.into(),
        },
        span,
    );
}

/// The sink must expose `|` accepting the flowing type.
pub(crate) fn check_terminal(
    cx: &mut StageCx<'_>,
    terminal: &BoundTerminal,
    flowing: SymbolId,
) -> TerminalFlow {
    let sink = terminal.sink_type();
    let unchecked = TerminalFlow {
        accepts: builtin::UNRESOLVED,
        promotion_required: false,
    };
    if flowing == builtin::UNRESOLVED || sink == builtin::UNRESOLVED {
        return unchecked;
    }

    let pipe = cx.table.lookup_name("|");
    let candidates = pipe
        .map(|name| gather_methods(cx.table, sink, name))
        .unwrap_or_default();
    match best_match(cx.table, &candidates, &[flowing], cx.epsilon) {
        MethodResolution::Found(op) => {
            let accepts = cx.table.param_types(op).first().copied().unwrap_or(flowing);
            let (kind, _) = classify_match(cx.table, flowing, accepts);
            TerminalFlow {
                accepts,
                promotion_required: kind == MatchKind::Promotion,
            }
        }
        MethodResolution::Ambiguous(tied) => TerminalFlow {
            accepts: tied
                .first()
                .and_then(|op| cx.table.param_types(*op).first().copied())
                .unwrap_or(flowing),
            promotion_required: false,
        },
        MethodResolution::NotFound => {
            let span = terminal.span();
            let error = SemanticError::NoPipeForType {
                flowing: cx.name(flowing),
                sink: cx.name(sink),
                span: span.into(),
            };
            cx.diags.error(error, span);
            unchecked
        }
    }
}
