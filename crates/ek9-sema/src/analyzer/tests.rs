use std::sync::Arc;

use super::*;
use crate::ast::{AstBuilder, Decl, Visibility};
use crate::errors::ErrorKind;
use crate::pipeline::StageKind;
use crate::symbols::builtin;

fn analyzer() -> Analyzer {
    Analyzer::new(Arc::new(CompilationDb::new()), AnalyzerConfig::default())
}

fn analyze(decls: Vec<Decl>) -> AnalysisOutput {
    let b = AstBuilder::new();
    let unit = b.unit("com.test", decls);
    analyzer().analyze(&unit).unwrap()
}

/// A `main` function with the given body.
fn main_with(b: &mut AstBuilder, body: Vec<crate::ast::Stmt>) -> Decl {
    b.function("main").with_body(body).into_decl()
}

#[test]
fn clean_unit_has_no_errors() {
    let mut b = AstBuilder::new();
    let x_ty = b.ty("Integer");
    let x = b.param("x", x_ty);
    let ret_ty = b.ty("Integer");
    let lhs = b.ident("x");
    let rhs = b.int(1);
    let sum = b.binary(lhs, "+", rhs);
    let ret = b.ret(Some(sum));
    let inc = b
        .function("inc")
        .with_param(x)
        .returning(ret_ty)
        .with_body(vec![ret])
        .pure()
        .into_decl();

    let out = analyze(vec![inc]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
}

#[test]
fn same_parameterization_yields_same_type() {
    let mut b = AstBuilder::new();
    let int_ty = b.ty("Integer");
    let explicit = b.call_of("List", vec![int_ty], vec![]);
    let a = b.let_("a", explicit);
    let one = b.int(1);
    let inferred = b.call("List", vec![one]);
    let c = b.let_("c", inferred);
    let (a_id, c_id) = (a.id, c.id);
    let main = main_with(&mut b, vec![a, c]);

    let out = analyze(vec![main]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
    let a_ty = out.bindings.type_of(a_id).unwrap();
    assert_ne!(a_ty, builtin::UNRESOLVED);
    assert_eq!(Some(a_ty), out.bindings.type_of(c_id));
}

#[test]
fn unknown_identifier_is_not_resolved() {
    let mut b = AstBuilder::new();
    let missing = b.ident("missing");
    let stmt = b.expr_stmt(missing);
    let main = main_with(&mut b, vec![stmt]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotResolved]);
}

#[test]
fn initializer_must_match_declared_type() {
    let mut b = AstBuilder::new();
    let ty = b.ty("Integer");
    let text = b.string("text");
    let x = b.var("x", ty, Some(text));
    let main = main_with(&mut b, vec![x]);

    let out = analyze(vec![main]);
    assert_eq!(out.count_of(ErrorKind::IncompatibleTypes), 1);
}

#[test]
fn private_property_is_hidden_from_subclass() {
    let mut b = AstBuilder::new();
    let secret_ty = b.ty("Integer");
    let secret = b.prop("secret", secret_ty);
    let base = b.class("Base").open().with_property(secret).into_decl();

    let ret_ty = b.ty("Integer");
    let read = b.ident("secret");
    let ret = b.ret(Some(read));
    let peek = b.method("peek").returning(ret_ty).with_body(vec![ret]);
    let base_ty = b.ty("Base");
    let derived = b.class("Derived").extending(base_ty).with_method(peek).into_decl();

    let out = analyze(vec![base, derived]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotAccessible]);
}

#[test]
fn protected_property_is_hidden_from_functions() {
    let mut b = AstBuilder::new();
    let area_ty = b.ty("Float");
    let area = b.prop("area", area_ty).visibility(Visibility::Protected);
    let shape = b.class("Shape").with_property(area).into_decl();

    let make = b.call("Shape", vec![]);
    let s = b.let_("s", make);
    let receiver = b.ident("s");
    let read = b.property(receiver, "area");
    let stmt = b.expr_stmt(read);
    let main = main_with(&mut b, vec![s, stmt]);

    let out = analyze(vec![shape, main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotAccessible]);
}

#[test]
fn defaulted_comparison_needs_compare_on_properties() {
    let mut b = AstBuilder::new();
    let opaque = b.class("Opaque").into_decl();
    let o_ty = b.ty("Opaque");
    let o = b.prop("o", o_ty);
    let less = b.default_operator("<");
    let pair = b.record("Pair").with_property(o).with_method(less).into_decl();

    let out = analyze(vec![opaque, pair]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::MissingOperator]);
}

#[test]
fn defaulted_operators_resolve_in_expressions() {
    let mut b = AstBuilder::new();
    let n_ty = b.ty("Integer");
    let n = b.prop("n", n_ty);
    let point = b.record("Point").with_property(n).with_default_operators().into_decl();

    let lhs = b.call("Point", vec![]);
    let rhs = b.call("Point", vec![]);
    let cmp = b.binary(lhs, "<", rhs);
    let cond = b.if_(cmp, vec![], None);
    let main = main_with(&mut b, vec![cond]);

    let out = analyze(vec![point, main]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
}

#[test]
fn equally_distant_traits_are_ambiguous() {
    let mut b = AstBuilder::new();
    let shows = b.trait_decl("Shows").into_decl();
    let prints = b.trait_decl("Prints").into_decl();
    let shows_ty = b.ty("Shows");
    let prints_ty = b.ty("Prints");
    let doc = b.class("Doc").with_trait(shows_ty).with_trait(prints_ty).into_decl();

    let p1_ty = b.ty("Shows");
    let p1 = b.param("item", p1_ty);
    let show_a = b.method("show").with_param(p1);
    let p2_ty = b.ty("Prints");
    let p2 = b.param("item", p2_ty);
    let show_b = b.method("show").with_param(p2);
    let printer = b.class("Printer").with_method(show_a).with_method(show_b).into_decl();

    let receiver = b.call("Printer", vec![]);
    let arg = b.call("Doc", vec![]);
    let call = b.method_call(receiver, "show", vec![arg]);
    let stmt = b.expr_stmt(call);
    let main = main_with(&mut b, vec![stmt]);

    let out = analyze(vec![shows, prints, doc, printer, main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::Ambiguous]);
}

#[test]
fn circular_traits_terminate_with_error() {
    let mut b = AstBuilder::new();
    let to_b = b.ty("B");
    let a = b.trait_decl("A").with_trait(to_b).into_decl();
    let to_a = b.ty("A");
    let t = b.trait_decl("B").with_trait(to_a).into_decl();

    let out = analyze(vec![a, t]);
    assert!(out.count_of(ErrorKind::CircularHierarchy) >= 1);
}

#[test]
fn trait_listing_itself_is_circular() {
    let mut b = AstBuilder::new();
    let itself = b.ty("A");
    let a = b.trait_decl("A").with_trait(itself).into_decl();

    let out = analyze(vec![a]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::CircularHierarchy]);
}

#[test]
fn every_missing_abstract_method_is_reported() {
    let mut b = AstBuilder::new();
    let first = b.method("first").abstract_();
    let second = b.method("second").abstract_();
    let shape = b
        .trait_decl("Shape")
        .with_method(first)
        .with_method(second)
        .into_decl();
    let shape_ty = b.ty("Shape");
    let square = b.class("Square").with_trait(shape_ty).into_decl();

    let out = analyze(vec![shape, square]);
    assert_eq!(
        out.error_kinds(),
        vec![ErrorKind::AbstractNotImplemented, ErrorKind::AbstractNotImplemented]
    );
}

#[test]
fn each_defaulted_operator_reports_its_own_missing_operator() {
    let mut b = AstBuilder::new();
    let opaque = b.class("Opaque").into_decl();
    let o_ty = b.ty("Opaque");
    let o = b.prop("o", o_ty);
    let text = b.default_operator("$");
    let hash = b.default_operator("#?");
    let holder = b
        .record("Holder")
        .with_property(o)
        .with_method(text)
        .with_method(hash)
        .into_decl();

    let out = analyze(vec![opaque, holder]);
    assert_eq!(
        out.error_kinds(),
        vec![ErrorKind::MissingOperator, ErrorKind::MissingOperator]
    );
}

#[test]
fn unresolved_stage_function_is_reported_once() {
    let mut b = AstBuilder::new();
    let from = b.int(1);
    let to = b.int(10);
    let source = b.range(from, to);
    let missing = b.ident("undefinedFn");
    let filter = b.stage(StageKind::Filter, vec![missing]);
    let int_ty = b.ty("Integer");
    let list_ty = b.ty_of("List", vec![int_ty]);
    let collect = b.collect_as(list_ty);
    let pipeline = b.pipeline(source, vec![filter], Some(collect));
    let kept = b.let_("kept", pipeline);
    let main = main_with(&mut b, vec![kept]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotResolved]);
}

/// `Choice(Integer)` and `Choice(String)`, plus a no-argument constructor
/// whose body is `body`.
fn overloaded_choice(b: &mut AstBuilder, body: Vec<crate::ast::Stmt>) -> Decl {
    let n_ty = b.ty("Integer");
    let n = b.param("n", n_ty);
    let by_number = b.constructor("Choice").with_param(n);
    let s_ty = b.ty("String");
    let s = b.param("s", s_ty);
    let by_text = b.constructor("Choice").with_param(s);
    let empty = b.constructor("Choice").with_body(body);
    b.class("Choice")
        .with_method(by_number)
        .with_method(by_text)
        .with_method(empty)
        .into_decl()
}

#[test]
fn unresolved_constructor_argument_is_reported_once() {
    let mut b = AstBuilder::new();
    let choice = overloaded_choice(&mut b, vec![]);
    let missing = b.ident("missing");
    let call = b.call("Choice", vec![missing]);
    let c = b.let_("c", call);
    let c_id = c.id;
    let main = main_with(&mut b, vec![c]);

    let out = analyze(vec![choice, main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotResolved]);
    assert_eq!(out.bindings.type_of(c_id), Some(builtin::UNRESOLVED));
}

#[test]
fn unresolved_delegation_argument_is_reported_once() {
    let mut b = AstBuilder::new();
    let missing = b.ident("missing");
    let delegate = b.this_call(vec![missing]);
    let stmt = b.expr_stmt(delegate);
    let choice = overloaded_choice(&mut b, vec![stmt]);

    let out = analyze(vec![choice]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotResolved]);
}

#[test]
fn instantiation_past_depth_limit_fails_the_same_way_each_time() {
    let mut b = AstBuilder::new();
    let t = b.type_param("T", None);
    let inner = b.ty("T");
    let list_of_t = b.ty_of("List", vec![inner]);
    let grown = b.ty_of("G", vec![list_of_t]);
    let grow = b.method("grow").returning(grown);
    let g = b.class("G").with_type_param(t).with_method(grow).into_decl();

    let int_a = b.ty("Integer");
    let first = b.call_of("G", vec![int_a], vec![]);
    let a = b.let_("a", first);
    let int_c = b.ty("Integer");
    let second = b.call_of("G", vec![int_c], vec![]);
    let c = b.let_("c", second);
    let (a_id, c_id) = (a.id, c.id);
    let main = main_with(&mut b, vec![a, c]);
    let unit = b.unit("com.test", vec![g, main]);

    let config = AnalyzerConfig {
        max_instantiation_depth: 3,
        ..AnalyzerConfig::default()
    };
    let out = Analyzer::new(Arc::new(CompilationDb::new()), config)
        .analyze(&unit)
        .unwrap();

    assert!(out.count_of(ErrorKind::InstantiationTooDeep) >= 2, "{:?}", out.error_kinds());
    assert_eq!(out.count_of(ErrorKind::InstantiationTooDeep), out.errors.len());
    assert!(out.errors.iter().all(|e| e.span != Span::default()));
    assert_eq!(out.bindings.type_of(a_id), Some(builtin::UNRESOLVED));
    assert_eq!(out.bindings.type_of(c_id), Some(builtin::UNRESOLVED));
}

#[test]
fn repeated_parameter_of_generic_method_is_reported_once() {
    let mut b = AstBuilder::new();
    let t = b.type_param("T", None);
    let x_ty = b.ty("T");
    let x = b.param("x", x_ty);
    let again_ty = b.ty("T");
    let again = b.param("x", again_ty);
    let take = b.method("take").with_param(x).with_param(again);
    let holder = b
        .class("Holder")
        .with_type_param(t)
        .with_method(take)
        .into_decl();

    let int_ty = b.ty("Integer");
    let make = b.call_of("Holder", vec![int_ty], vec![]);
    let h = b.let_("h", make);
    let h_id = h.id;
    let main = main_with(&mut b, vec![h]);

    let out = analyze(vec![holder, main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::DuplicateSymbol]);
    assert_ne!(out.bindings.type_of(h_id), Some(builtin::UNRESOLVED));
}

#[test]
fn reading_unset_variable_is_reported() {
    let mut b = AstBuilder::new();
    let ty = b.ty("Integer");
    let x = b.var("x", ty, None);
    let read = b.ident("x");
    let y = b.let_("y", read);
    let main = main_with(&mut b, vec![x, y]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::UsedBeforeInitialised]);
}

#[test]
fn immutable_variable_cannot_be_reassigned() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let x = b.let_("x", one);
    let target = b.ident("x");
    let two = b.int(2);
    let assign = b.assign(target, two);
    let main = main_with(&mut b, vec![x, assign]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::ImmutableAssignment]);
}

#[test]
fn late_initialisation_of_declared_variable_is_allowed() {
    let mut b = AstBuilder::new();
    let ty = b.ty("Integer");
    let x = b.var("x", ty, None);
    let target = b.ident("x");
    let two = b.int(2);
    let assign = b.assign(target, two);
    let main = main_with(&mut b, vec![x, assign]);

    let out = analyze(vec![main]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
}

#[test]
fn control_expression_must_be_boolean() {
    let mut b = AstBuilder::new();
    let cond = b.int(1);
    let stmt = b.if_(cond, vec![], None);
    let main = main_with(&mut b, vec![stmt]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NonBooleanControl]);
}

#[test]
fn pure_function_cannot_call_impure_one() {
    let mut b = AstBuilder::new();
    let noisy = b.function("noisy").into_decl();
    let call = b.call("noisy", vec![]);
    let stmt = b.expr_stmt(call);
    let quiet = b.function("quiet").pure().with_body(vec![stmt]).into_decl();

    let out = analyze(vec![noisy, quiet]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::PureViolation]);
}

#[test]
fn this_outside_a_type_is_invalid() {
    let mut b = AstBuilder::new();
    let this = b.this();
    let stmt = b.expr_stmt(this);
    let main = main_with(&mut b, vec![stmt]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::InvalidThisOrSuper]);
}

#[test]
fn constructor_delegation_outside_constructor_is_invalid() {
    let mut b = AstBuilder::new();
    let call = b.this_call(vec![]);
    let stmt = b.expr_stmt(call);
    let main = main_with(&mut b, vec![stmt]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::InvalidThisOrSuper]);
}

#[test]
fn super_constructor_is_resolved_by_arguments() {
    let mut b = AstBuilder::new();
    let p_ty = b.ty("Integer");
    let p = b.param("size", p_ty);
    let base_ctor = b.constructor("Base").with_param(p);
    let base = b.class("Base").open().with_method(base_ctor).into_decl();

    let one = b.int(1);
    let delegate = b.super_call(vec![one]);
    let stmt = b.expr_stmt(delegate);
    let derived_ctor = b.constructor("Derived").with_body(vec![stmt]);
    let base_ty = b.ty("Base");
    let derived = b
        .class("Derived")
        .extending(base_ty)
        .with_method(derived_ctor)
        .into_decl();

    let out = analyze(vec![base, derived]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
}

#[test]
fn traits_cannot_be_instantiated() {
    let mut b = AstBuilder::new();
    let shape = b.trait_decl("Shape").into_decl();
    let call = b.call("Shape", vec![]);
    let stmt = b.expr_stmt(call);
    let main = main_with(&mut b, vec![stmt]);

    let out = analyze(vec![shape, main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::CannotInstantiate]);
}

#[test]
fn closed_class_cannot_be_extended() {
    let mut b = AstBuilder::new();
    let base = b.class("Base").into_decl();
    let base_ty = b.ty("Base");
    let derived = b.class("Derived").extending(base_ty).into_decl();

    let out = analyze(vec![base, derived]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotExtendable]);
}

#[test]
fn generic_function_is_inferred_from_arguments() {
    let mut b = AstBuilder::new();
    let t = b.type_param("T", None);
    let x_ty = b.ty("T");
    let x = b.param("x", x_ty);
    let ret_ty = b.ty("T");
    let read = b.ident("x");
    let ret = b.ret(Some(read));
    let identity = b
        .function("identity")
        .with_type_param(t)
        .with_param(x)
        .returning(ret_ty)
        .with_body(vec![ret])
        .into_decl();

    let text = b.string("hello");
    let call = b.call("identity", vec![text]);
    let r = b.let_("r", call);
    let r_id = r.id;
    let main = main_with(&mut b, vec![r]);

    let out = analyze(vec![identity, main]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
    assert_eq!(out.bindings.type_of(r_id), Some(builtin::STRING));
}

#[test]
fn pipeline_maps_and_collects() {
    let mut b = AstBuilder::new();
    let n_ty = b.ty("Integer");
    let n = b.param("n", n_ty);
    let ret_ty = b.ty("String");
    let read = b.ident("n");
    let text = b.unary("$", read);
    let ret = b.ret(Some(text));
    let to_text = b
        .function("toText")
        .with_param(n)
        .returning(ret_ty)
        .with_body(vec![ret])
        .into_decl();

    let from = b.int(1);
    let to = b.int(10);
    let source = b.range(from, to);
    let mapper = b.ident("toText");
    let map = b.stage(StageKind::Map, vec![mapper]);
    let string_ty = b.ty("String");
    let list_ty = b.ty_of("List", vec![string_ty]);
    let collect = b.collect_as(list_ty);
    let pipeline = b.pipeline(source, vec![map], Some(collect));
    let pipeline_id = pipeline.id;
    let names = b.let_("names", pipeline);
    let main = main_with(&mut b, vec![names]);

    let out = analyze(vec![to_text, main]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());
    let flow = &out.pipelines[&pipeline_id];
    assert_eq!(flow.source_produces, builtin::INTEGER);
    assert_eq!(flow.final_type, builtin::STRING);
    assert_ne!(flow.result_type, builtin::UNRESOLVED);
}

#[test]
fn dynamic_function_sees_only_captures() {
    let mut b = AstBuilder::new();
    let two = b.int(2);
    let factor = b.let_("factor", two);
    let captured = b.ident("factor");
    let capture = b.capture("f", captured);
    let v_ty = b.ty("Integer");
    let v = b.param("v", v_ty);
    let ret_ty = b.ty("Integer");
    let lhs = b.ident("v");
    let rhs = b.ident("f");
    let product = b.binary(lhs, "*", rhs);
    let ret = b.ret(Some(product));
    let scale = b.dynamic(vec![capture], vec![v], Some(ret_ty), vec![ret]);
    let bound = b.let_("scale", scale);
    let main = main_with(&mut b, vec![factor, bound]);

    let out = analyze(vec![main]);
    assert!(!out.has_errors(), "{:?}", out.error_kinds());

    let mut b = AstBuilder::new();
    let two = b.int(2);
    let factor = b.let_("factor", two);
    let v_ty = b.ty("Integer");
    let v = b.param("v", v_ty);
    let ret_ty = b.ty("Integer");
    let lhs = b.ident("v");
    let rhs = b.ident("factor");
    let product = b.binary(lhs, "*", rhs);
    let ret = b.ret(Some(product));
    let scale = b.dynamic(vec![], vec![v], Some(ret_ty), vec![ret]);
    let bound = b.let_("scale", scale);
    let main = main_with(&mut b, vec![factor, bound]);

    let out = analyze(vec![main]);
    assert_eq!(out.error_kinds(), vec![ErrorKind::NotResolved]);
}

#[test]
fn unreferenced_locals_warn_when_enabled() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let unused = b.let_("unused", one);
    let main = main_with(&mut b, vec![unused]);
    let unit = b.unit("com.test", vec![main]);

    let out = analyzer().analyze(&unit).unwrap();
    assert!(!out.has_errors());
    assert_eq!(out.warnings.len(), 1);

    let config = AnalyzerConfig {
        warn_unreferenced: false,
        ..AnalyzerConfig::default()
    };
    let quiet = Analyzer::new(Arc::new(CompilationDb::new()), config);
    let out = quiet.analyze(&unit).unwrap();
    assert!(out.warnings.is_empty());
}
