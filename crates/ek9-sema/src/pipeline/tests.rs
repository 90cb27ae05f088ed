use ek9_identity::{Span, SymbolId};

use super::*;
use crate::errors::ErrorKind;
use crate::generic::resolve_or_define;
use crate::symbols::{
    FunctionInfo, ScopeKind, SymbolDef, SymbolKind, SymbolList, VariableRole,
};

struct Fixture {
    table: SymbolTable,
    diags: Diagnostics,
    line: u32,
}

impl Fixture {
    fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            diags: Diagnostics::new(),
            line: 0,
        }
    }

    fn span(&mut self) -> Span {
        self.line += 1;
        Span::at_line(self.line)
    }

    fn function(&mut self, name: &str, params: &[SymbolId], ret: SymbolId) -> SymbolId {
        let module = self.table.module("test.pipeline");
        let module_scope = self.table.module_scope(module);
        let scope = self
            .table
            .new_scope(ScopeKind::Function, Some(module_scope), None, module);
        let mut ids = SymbolList::new();
        for (i, ty) in params.iter().enumerate() {
            let n = self.table.intern(&format!("p{i}"));
            let role = SymbolKind::Variable(VariableRole::Parameter);
            let def = SymbolDef::new(n, Span::default(), module, role).with_type(*ty);
            ids.push(self.table.define(scope, def).unwrap());
        }
        let info = FunctionInfo {
            scope,
            params: ids,
            return_type: ret,
            type_params: SymbolList::new(),
            parameterization: None,
            supertype: None,
            is_abstract: false,
            is_dynamic: false,
        };
        let n = self.table.intern(name);
        let id = self
            .table
            .define(
                module_scope,
                SymbolDef::new(n, Span::default(), module, SymbolKind::Function(Box::new(info))),
            )
            .unwrap();
        self.table.get_mut(id).ty = Some(id);
        self.table.set_scope_owner(scope, id);
        id
    }

    fn list_of(&mut self, element: SymbolId) -> SymbolId {
        let list = self.table.well_known().list;
        resolve_or_define(&mut self.table, list, &[element], 64).unwrap()
    }

    fn stage(&mut self, kind: StageKind, args: &[SymbolId]) -> BoundStage {
        let span = self.span();
        BoundStage {
            kind,
            args: args.iter().map(|ty| BoundArg { ty: *ty, span }).collect(),
            branch: None,
            span,
        }
    }

    fn run(
        &mut self,
        source: BoundSource,
        stages: &[BoundStage],
        terminal: Option<BoundTerminal>,
    ) -> StreamFlow {
        let mut cx = StageCx {
            table: &mut self.table,
            diags: &mut self.diags,
            epsilon: 0.001,
            max_depth: 64,
        };
        analyze_pipeline(&mut cx, &source, stages, terminal.as_ref())
    }

    fn kinds(&self) -> Vec<ErrorKind> {
        self.diags.errors().iter().map(|e| e.kind()).collect()
    }
}

fn values(types: &[SymbolId]) -> BoundSource {
    BoundSource::Values {
        types: types.to_vec(),
        span: Span::at_line(1000),
    }
}

#[test]
fn map_changes_the_flowing_type() {
    let mut f = Fixture::new();
    let to_string = f.function("toString", &[builtin::INTEGER], builtin::STRING);
    let strings = f.list_of(builtin::STRING);
    let map = f.stage(StageKind::Map, &[to_string]);
    let flow = f.run(
        values(&[builtin::INTEGER]),
        &[map],
        Some(BoundTerminal::CollectAs {
            ty: strings,
            span: Span::at_line(2000),
        }),
    );

    assert!(f.kinds().is_empty(), "{:?}", f.kinds());
    assert_eq!(flow.source_produces, builtin::INTEGER);
    assert_eq!(flow.stages[0].consumes, builtin::INTEGER);
    assert_eq!(flow.stages[0].produces, builtin::STRING);
    assert_eq!(flow.final_type, builtin::STRING);
    assert_eq!(flow.result_type, strings);
    assert_eq!(
        flow.terminal,
        Some(TerminalFlow {
            accepts: builtin::STRING,
            promotion_required: false
        })
    );
}

#[test]
fn iterable_source_streams_its_elements() {
    let mut f = Fixture::new();
    let strings = f.list_of(builtin::STRING);
    let flow = f.run(values(&[strings]), &[], None);
    assert_eq!(flow.source_produces, builtin::STRING);
}

#[test]
fn range_source_produces_integers() {
    let mut f = Fixture::new();
    let flow = f.run(BoundSource::Range { span: Span::at_line(1) }, &[], None);
    assert_eq!(flow.final_type, builtin::INTEGER);
}

#[test]
fn filter_requires_boolean_predicate() {
    let mut f = Fixture::new();
    let not_predicate = f.function("length", &[builtin::STRING], builtin::INTEGER);
    let filter = f.stage(StageKind::Filter, &[not_predicate]);
    let flow = f.run(values(&[builtin::STRING]), &[filter], None);
    assert_eq!(f.kinds(), vec![ErrorKind::PipelineStageMismatch]);
    assert_eq!(flow.final_type, builtin::UNRESOLVED);
}

#[test]
fn failed_stage_does_not_cascade() {
    let mut f = Fixture::new();
    let wrong = f.function("wrong", &[builtin::BOOLEAN], builtin::STRING);
    let also_wrong = f.function("alsoWrong", &[builtin::BOOLEAN], builtin::STRING);
    let first = f.stage(StageKind::Map, &[wrong]);
    let second = f.stage(StageKind::Map, &[also_wrong]);
    f.run(values(&[builtin::INTEGER]), &[first, second], None);
    assert_eq!(f.kinds(), vec![ErrorKind::PipelineStageMismatch]);
}

#[test]
fn void_is_never_carried() {
    let mut f = Fixture::new();
    let consume = f.function("consume", &[builtin::INTEGER], builtin::VOID);
    let map = f.stage(StageKind::Map, &[consume]);
    let flow = f.run(values(&[builtin::INTEGER]), &[map], None);
    assert_eq!(f.kinds(), vec![ErrorKind::VoidPipeline]);
    assert_eq!(flow.final_type, builtin::UNRESOLVED);
}

#[test]
fn group_and_split_produce_lists() {
    let mut f = Fixture::new();
    let ints = f.list_of(builtin::INTEGER);
    let group = f.stage(StageKind::Group, &[]);
    let flow = f.run(values(&[builtin::INTEGER]), &[group], None);
    assert_eq!(flow.final_type, ints);

    let is_even = f.function("isEven", &[builtin::INTEGER], builtin::BOOLEAN);
    let split = f.stage(StageKind::Split, &[is_even]);
    let flow = f.run(values(&[builtin::INTEGER]), &[split], None);
    assert_eq!(flow.final_type, ints);
    assert!(f.kinds().is_empty());
}

#[test]
fn flatten_unwraps_one_level() {
    let mut f = Fixture::new();
    let ints = f.list_of(builtin::INTEGER);
    let group = f.stage(StageKind::Group, &[]);
    let flatten = f.stage(StageKind::Flatten, &[]);
    let flow = f.run(values(&[builtin::INTEGER]), &[group, flatten], None);
    assert_eq!(flow.stages[0].produces, ints);
    assert_eq!(flow.final_type, builtin::INTEGER);

    let flatten = f.stage(StageKind::Flatten, &[]);
    f.run(values(&[builtin::BOOLEAN]), &[flatten], None);
    assert_eq!(f.kinds(), vec![ErrorKind::NotIterable]);
}

#[test]
fn sort_uses_compare_or_a_comparator() {
    let mut f = Fixture::new();
    let plain = f.stage(StageKind::Sort, &[]);
    f.run(values(&[builtin::STRING]), &[plain], None);
    assert!(f.kinds().is_empty());

    let comparator = f.function("byLength", &[builtin::STRING, builtin::STRING], builtin::INTEGER);
    let with_fn = f.stage(StageKind::Sort, &[comparator]);
    f.run(values(&[builtin::STRING]), &[with_fn], None);
    assert!(f.kinds().is_empty());

    let ints = f.list_of(builtin::INTEGER);
    let group = f.stage(StageKind::Group, &[]);
    let uncomparable = f.stage(StageKind::Max, &[]);
    f.run(values(&[ints, ints]), &[group, uncomparable], None);
    assert_eq!(f.kinds(), vec![ErrorKind::PipelineStageMismatch]);
}

#[test]
fn terminal_without_pipe_is_reported() {
    let mut f = Fixture::new();
    let flow = f.run(
        values(&[builtin::INTEGER]),
        &[],
        Some(BoundTerminal::CollectAs {
            ty: builtin::STRING,
            span: Span::at_line(77),
        }),
    );
    assert_eq!(f.kinds(), vec![ErrorKind::NoPipeForType]);
    assert_eq!(flow.terminal.map(|t| t.accepts), Some(builtin::UNRESOLVED));
}

#[test]
fn terminal_records_promotion() {
    let mut f = Fixture::new();
    let floats = f.list_of(builtin::FLOAT);
    let flow = f.run(
        values(&[builtin::INTEGER]),
        &[],
        Some(BoundTerminal::CollectAs {
            ty: floats,
            span: Span::at_line(5),
        }),
    );
    assert!(f.kinds().is_empty());
    assert_eq!(
        flow.terminal,
        Some(TerminalFlow {
            accepts: builtin::FLOAT,
            promotion_required: true
        })
    );
}

#[test]
fn head_takes_an_integer_count() {
    let mut f = Fixture::new();
    let head = f.stage(StageKind::Head, &[builtin::INTEGER]);
    f.run(values(&[builtin::STRING]), &[head], None);
    assert!(f.kinds().is_empty());
    let bad = f.stage(StageKind::Tail, &[builtin::STRING]);
    f.run(values(&[builtin::STRING]), &[bad], None);
    assert_eq!(f.kinds(), vec![ErrorKind::PipelineStageMismatch]);
}

#[test]
fn tee_branch_is_checked_against_its_own_terminal() {
    let mut f = Fixture::new();
    let to_string = f.function("toString", &[builtin::INTEGER], builtin::STRING);
    let strings = f.list_of(builtin::STRING);
    let mut tee = f.stage(StageKind::Tee, &[to_string]);
    tee.branch = Some(BoundTerminal::CollectAs {
        ty: strings,
        span: Span::at_line(300),
    });
    let flow = f.run(values(&[builtin::INTEGER]), &[tee], None);
    assert!(f.kinds().is_empty());
    assert_eq!(flow.final_type, builtin::INTEGER);
}

#[test]
fn every_stage_kind_has_a_rule() {
    for (kind, _) in STAGE_RULES.iter() {
        assert_eq!(StageKind::from_keyword(kind.as_str()), Some(*kind));
    }
    assert_eq!(STAGE_RULES.len(), 17);
}

#[test]
fn unresolved_stage_argument_is_not_reported_again() {
    let mut f = Fixture::new();
    let integers = f.list_of(builtin::INTEGER);
    let filter = f.stage(StageKind::Filter, &[builtin::UNRESOLVED]);
    let sort = f.stage(StageKind::Sort, &[builtin::UNRESOLVED]);
    let tee = f.stage(StageKind::Tee, &[builtin::UNRESOLVED]);
    let flow = f.run(
        BoundSource::Range {
            span: Span::at_line(1000),
        },
        &[filter, sort, tee],
        Some(BoundTerminal::CollectAs {
            ty: integers,
            span: Span::at_line(2000),
        }),
    );
    assert!(f.kinds().is_empty(), "{:?}", f.kinds());
    assert_eq!(flow.final_type, builtin::UNRESOLVED);
    assert!(flow.stages.iter().all(|s| s.produces == builtin::UNRESOLVED));
}

#[test]
fn unresolved_mapping_in_tee_stays_silent() {
    let mut f = Fixture::new();
    let arg = BoundArg {
        ty: builtin::UNRESOLVED,
        span: Span::at_line(3),
    };
    let stage = f.stage(StageKind::Tee, &[]);
    let mut cx = StageCx {
        table: &mut f.table,
        diags: &mut f.diags,
        epsilon: 0.001,
        max_depth: 64,
    };
    let result = stages::function_of_one(&mut cx, &stage, &arg, builtin::INTEGER);
    assert_eq!(result, Err(builtin::UNRESOLVED));
    assert!(f.diags.errors().is_empty());
}
