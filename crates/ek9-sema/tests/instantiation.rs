// tests/instantiation.rs
//! Parameterized-type cache behaviour through the shared compilation database.

use std::sync::Arc;
use std::thread;

use ek9_sema::{CompilationDb, ParameterizeError, builtin, display_type};

const DEPTH: usize = 256;

#[test]
fn concurrent_requests_share_one_instance() {
    let db = Arc::new(CompilationDb::new());
    let list = db.symbols().well_known().list;

    let ids: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                s.spawn(move || db.resolve_or_define(list, &[builtin::INTEGER], DEPTH).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    let table = db.symbols();
    assert_eq!(display_type(&table, ids[0]), "List of Integer");
    assert_eq!(table.instantiations().iter().filter(|i| **i == ids[0]).count(), 1);
}

#[test]
fn arity_failure_leaves_no_cache_entry() {
    let db = CompilationDb::new();
    let list = db.symbols().well_known().list;
    let before = db.symbols().instantiations().len();

    let err = db
        .resolve_or_define(list, &[builtin::INTEGER, builtin::STRING], DEPTH)
        .unwrap_err();

    assert!(matches!(err, ParameterizeError::ArityMismatch { expected: 1, found: 2, .. }));
    let table = db.symbols();
    assert_eq!(table.instantiations().len(), before);
    assert!(table.cached_instance(list, &[builtin::INTEGER, builtin::STRING]).is_none());
}

#[test]
fn non_generic_type_cannot_be_parameterized() {
    let db = CompilationDb::new();
    let err = db.resolve_or_define(builtin::STRING, &[builtin::INTEGER], DEPTH).unwrap_err();
    assert!(matches!(err, ParameterizeError::NotGeneric { .. }));
}

#[test]
fn unresolved_argument_is_not_cached() {
    let db = CompilationDb::new();
    let list = db.symbols().well_known().list;
    let before = db.symbols().instantiations().len();

    let id = db.resolve_or_define(list, &[builtin::UNRESOLVED], DEPTH).unwrap();

    assert_eq!(id, builtin::UNRESOLVED);
    assert_eq!(db.symbols().instantiations().len(), before);
}

#[test]
fn nested_instances_are_distinct_and_stable() {
    let db = CompilationDb::new();
    let (list, dict) = {
        let table = db.symbols();
        (table.well_known().list, table.well_known().dict)
    };
    let inner = db.resolve_or_define(list, &[builtin::INTEGER], DEPTH).unwrap();
    let outer = db.resolve_or_define(list, &[inner], DEPTH).unwrap();
    let by_name = db.resolve_or_define(dict, &[builtin::STRING, outer], DEPTH).unwrap();

    assert_ne!(inner, outer);
    assert_eq!(db.resolve_or_define(list, &[inner], DEPTH).unwrap(), outer);
    assert_eq!(
        db.resolve_or_define(dict, &[builtin::STRING, outer], DEPTH).unwrap(),
        by_name
    );
    let table = db.symbols();
    assert_eq!(display_type(&table, outer), "List of (List of Integer)");
}

#[test]
fn depth_failure_is_answered_identically_on_every_request() {
    let db = CompilationDb::new();
    let (list, iterator) = {
        let table = db.symbols();
        (table.well_known().list, table.well_known().iterator)
    };

    // `List of String` derives `Iterator of String` one level further down.
    let first = db.resolve_or_define(list, &[builtin::STRING], 0).unwrap_err();
    assert_eq!(
        first,
        ParameterizeError::TooDeep {
            template: iterator,
            limit: 0
        }
    );
    let again = db.resolve_or_define(list, &[builtin::STRING], 0).unwrap_err();
    assert_eq!(again, first);
    // The failure sticks to the cached instance even under a roomier limit.
    let roomier = db.resolve_or_define(list, &[builtin::STRING], DEPTH).unwrap_err();
    assert_eq!(roomier, first);

    let table = db.symbols();
    let failed = table
        .cached_instance(list, &[builtin::STRING])
        .expect("failed instance stays cached");
    assert!(table.instance_failure(failed).is_some());
    assert!(table.cached_instance(iterator, &[builtin::STRING]).is_none());
}

#[test]
fn depth_failure_does_not_touch_other_parameterizations() {
    let db = CompilationDb::new();
    let list = db.symbols().well_known().list;

    assert!(db.resolve_or_define(list, &[builtin::STRING], 0).is_err());
    let ints = db.resolve_or_define(list, &[builtin::INTEGER], DEPTH).unwrap();
    let table = db.symbols();
    assert_eq!(display_type(&table, ints), "List of Integer");
    assert!(table.instance_failure(ints).is_none());
}
