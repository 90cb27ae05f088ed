// tests/analysis.rs
//! Whole-unit analysis over a shared database: cross-module resolution,
//! concurrent units and the overload weight ordering.

use std::sync::{Arc, Once};
use std::thread;

use ek9_identity::NodeId;
use ek9_sema::ast::{CompilationUnit, Decl};
use ek9_sema::symbols::SymbolSearch;
use ek9_sema::{
    AnalysisOutput, Analyzer, AnalyzerConfig, AstBuilder, CompilationDb, ErrorKind, builtin,
    weight_of_match,
};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn run(db: &Arc<CompilationDb>, unit: &CompilationUnit) -> AnalysisOutput {
    init_tracing();
    Analyzer::new(Arc::clone(db), AnalyzerConfig::default())
        .analyze(unit)
        .unwrap()
}

fn shapes_unit(b: &mut AstBuilder) -> CompilationUnit {
    let side_ty = b.ty("Float");
    let side = b.prop("side", side_ty);
    let ret_ty = b.ty("Float");
    let lhs = b.ident("side");
    let rhs = b.ident("side");
    let product = b.binary(lhs, "*", rhs);
    let ret = b.ret(Some(product));
    let area = b.method("area").returning(ret_ty).with_body(vec![ret]).pure();
    let square = b
        .class("Square")
        .with_property(side)
        .with_method(area)
        .into_decl();
    b.unit("com.shapes", vec![square])
}

/// `main` declaring a `List of Integer`; returns the unit and the declaring node.
fn list_user(b: &mut AstBuilder, module: &str) -> (CompilationUnit, NodeId) {
    let int_ty = b.ty("Integer");
    let list_ty = b.ty_of("List", vec![int_ty]);
    let arg_ty = b.ty("Integer");
    let init = b.call_of("List", vec![arg_ty], vec![]);
    let numbers = b.var("numbers", list_ty, Some(init));
    let id = numbers.id;
    let main: Decl = b.function("main").with_body(vec![numbers]).into_decl();
    (b.unit(module, vec![main]), id)
}

#[test]
fn referenced_module_types_resolve() {
    let db = Arc::new(CompilationDb::new());
    let mut b = AstBuilder::starting_at(1);
    let shapes = shapes_unit(&mut b);
    let out = run(&db, &shapes);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());

    let mut b = AstBuilder::starting_at(10_000);
    let make = b.call("Square", vec![]);
    let sq = b.let_("sq", make);
    let receiver = b.ident("sq");
    let call = b.method_call(receiver, "area", vec![]);
    let area = b.let_("a", call);
    let area_id = area.id;
    let main = b.function("main").with_body(vec![sq, area]).into_decl();
    let app = b.unit("com.app", vec![main]).referencing("com.shapes");

    let out = run(&db, &app);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
    assert_eq!(out.bindings.type_of(area_id), Some(builtin::FLOAT));
}

#[test]
fn unreferenced_module_types_do_not_resolve() {
    let db = Arc::new(CompilationDb::new());
    let mut b = AstBuilder::starting_at(1);
    let shapes = shapes_unit(&mut b);
    run(&db, &shapes);

    let mut b = AstBuilder::starting_at(10_000);
    let make = b.call("Square", vec![]);
    let stmt = b.expr_stmt(make);
    let main = b.function("main").with_body(vec![stmt]).into_decl();
    let app = b.unit("com.other", vec![main]);

    let out = run(&db, &app);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotResolved]);
}

#[test]
fn concurrent_units_agree_on_parameterized_types() {
    let db = Arc::new(CompilationDb::new());
    let units: Vec<_> = (0..4u32)
        .map(|i| {
            let mut b = AstBuilder::starting_at(1 + i * 1_000);
            list_user(&mut b, &format!("com.unit{i}"))
        })
        .collect();

    let types: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = units
            .iter()
            .map(|(unit, id)| {
                let db = Arc::clone(&db);
                s.spawn(move || {
                    let out = run(&db, unit);
                    assert!(!out.has_errors(), "{:?}", out.error_kinds());
                    out.bindings.type_of(*id)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(types[0].is_some());
    assert!(types.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn weights_order_exact_hierarchy_promotion_and_any() {
    let db = Arc::new(CompilationDb::new());
    let mut b = AstBuilder::new();
    let base = b.class("Base").open().into_decl();
    let base_ty = b.ty("Base");
    let mid = b.class("Mid").open().extending(base_ty).into_decl();
    let mid_ty = b.ty("Mid");
    let leaf = b.class("Leaf").extending(mid_ty).into_decl();
    let unit = b.unit("com.weights", vec![base, mid, leaf]);
    let out = run(&db, &unit);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());

    let table = db.symbols();
    let module = table.find_module("com.weights").unwrap();
    let scope = table.module_scope(module);
    let find = |name: &str| {
        let name = table.lookup_name(name).unwrap();
        table
            .resolve(scope, SymbolSearch::of_type(name))
            .unwrap()
    };
    let (leaf, mid, base) = (find("Leaf"), find("Mid"), find("Base"));

    let exact = weight_of_match(&table, leaf, leaf);
    let one_up = weight_of_match(&table, leaf, mid);
    let two_up = weight_of_match(&table, leaf, base);
    let promoted = weight_of_match(&table, builtin::INTEGER, builtin::FLOAT);
    let any = weight_of_match(&table, leaf, builtin::ANY);

    assert_eq!(exact, 0.0);
    assert!(exact < one_up && one_up < two_up);
    assert!(two_up < any && promoted < any);
    assert!(weight_of_match(&table, base, leaf) < 0.0);
    assert!(weight_of_match(&table, builtin::FLOAT, builtin::INTEGER) < 0.0);
}
