// symbols/well_known.rs
//
// Built-in types registered in every SymbolTable.
//
// Scalar built-ins are registered first and in a fixed order so their ids are
// compile-time constants; the generic templates are looked up via `WellKnown`.

use ek9_identity::{ModuleId, ScopeId, Span, SymbolId};

use super::{
    AggregateInfo, AggregateKind, MethodFlags, MethodInfo, ScopeKind, SymbolDef, SymbolKind,
    SymbolList, SymbolTable, VariableRole,
};
use crate::generic::{self, DEFAULT_INSTANTIATION_DEPTH};

/// Path of the module that holds every built-in symbol.
pub const BUILTIN_MODULE: &str = "org.ek9.lang";

/// Fixed ids of the scalar built-ins.
pub mod builtin {
    use ek9_identity::SymbolId;

    /// Marker for anything that failed to resolve. Compatible with everything so
    /// one failure does not cascade.
    pub const UNRESOLVED: SymbolId = SymbolId::new(0);
    pub const VOID: SymbolId = SymbolId::new(1);
    /// Universal base type; every type converts to it at the highest weight.
    pub const ANY: SymbolId = SymbolId::new(2);
    pub const BOOLEAN: SymbolId = SymbolId::new(3);
    pub const INTEGER: SymbolId = SymbolId::new(4);
    pub const FLOAT: SymbolId = SymbolId::new(5);
    pub const STRING: SymbolId = SymbolId::new(6);
    pub const JSON: SymbolId = SymbolId::new(7);
}

/// Generic built-in templates and the built-in module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnown {
    pub module: ModuleId,
    /// `Iterator of T`
    pub iterator: SymbolId,
    /// `List of T`
    pub list: SymbolId,
    /// `Dict of (K, V)`
    pub dict: SymbolId,
}

impl WellKnown {
    pub(super) fn placeholder() -> Self {
        Self {
            module: ModuleId::new(0),
            iterator: builtin::UNRESOLVED,
            list: builtin::UNRESOLVED,
            dict: builtin::UNRESOLVED,
        }
    }
}

/// Comparison operators that can be defaulted from `<=>`.
pub const COMPARISON_OPERATORS: [&str; 6] = ["==", "<>", "<", "<=", ">", ">="];

/// Built-in members that change their receiver.
const MUTATING_MEMBERS: [&str; 3] = ["|", "add", "put"];

/// Operators every scalar built-in supports with no arguments, and their results.
const UNARY_OPERATORS: [(&str, SymbolId); 4] = [
    ("$", builtin::STRING),
    ("$$", builtin::JSON),
    ("#?", builtin::INTEGER),
    ("?", builtin::BOOLEAN),
];

pub(super) fn register_builtins(table: &mut SymbolTable) -> WellKnown {
    let module = table.module(BUILTIN_MODULE);
    let scope = table.module_scope(module);

    let unresolved_name = table.intern("Unresolved");
    let unresolved = table.add_detached(
        SymbolDef::new(unresolved_name, Span::default(), module, SymbolKind::Unresolved)
            .with_type(builtin::UNRESOLVED),
    );
    debug_assert_eq!(unresolved, builtin::UNRESOLVED);

    let scalars = [
        ("Void", builtin::VOID),
        ("Any", builtin::ANY),
        ("Boolean", builtin::BOOLEAN),
        ("Integer", builtin::INTEGER),
        ("Float", builtin::FLOAT),
        ("String", builtin::STRING),
        ("JSON", builtin::JSON),
    ];
    for (name, expected) in scalars {
        let id = define_type(table, scope, module, name, AggregateKind::Class);
        debug_assert_eq!(id, expected, "built-in '{name}' registered out of order");
    }
    if let Some(info) = table.aggregate_mut(builtin::ANY) {
        info.is_open = true;
        info.is_abstract = true;
    }

    for ty in [
        builtin::BOOLEAN,
        builtin::INTEGER,
        builtin::FLOAT,
        builtin::STRING,
        builtin::JSON,
    ] {
        add_constructor(table, ty, &[]);
        add_constructor(table, ty, &[ty]);
        for op in COMPARISON_OPERATORS {
            add_operator(table, ty, op, &[ty], builtin::BOOLEAN);
        }
        add_operator(table, ty, "<=>", &[ty], builtin::INTEGER);
        for (op, ret) in UNARY_OPERATORS {
            add_operator(table, ty, op, &[], ret);
        }
    }

    for op in ["and", "or", "xor"] {
        add_operator(table, builtin::BOOLEAN, op, &[builtin::BOOLEAN], builtin::BOOLEAN);
    }
    add_operator(table, builtin::BOOLEAN, "~", &[], builtin::BOOLEAN);

    for ty in [builtin::INTEGER, builtin::FLOAT] {
        for op in ["+", "-", "*", "/"] {
            add_operator(table, ty, op, &[ty], ty);
        }
        add_operator(table, ty, "-", &[], ty);
        add_operator(table, ty, "abs", &[], ty);
    }
    add_operator(table, builtin::INTEGER, "#^", &[], builtin::FLOAT);
    add_operator(table, builtin::INTEGER, "mod", &[builtin::INTEGER], builtin::INTEGER);

    add_operator(table, builtin::STRING, "+", &[builtin::STRING], builtin::STRING);
    add_operator(table, builtin::STRING, "#<", &[], builtin::STRING);
    add_operator(table, builtin::STRING, "#>", &[], builtin::STRING);
    add_method(table, builtin::STRING, "length", &[], builtin::INTEGER);
    add_method(table, builtin::STRING, "trim", &[], builtin::STRING);

    let iterator = register_iterator(table, scope, module);
    let list = register_list(table, scope, module, iterator);
    let dict = register_dict(table, scope, module, iterator);

    tracing::debug!(symbols = table.symbol_count(), "built-ins registered");
    WellKnown {
        module,
        iterator,
        list,
        dict,
    }
}

fn register_iterator(table: &mut SymbolTable, scope: ScopeId, module: ModuleId) -> SymbolId {
    let iterator = define_type(table, scope, module, "Iterator", AggregateKind::Class);
    let t = add_type_param(table, iterator, "T");
    add_constructor(table, iterator, &[]);
    add_method(table, iterator, "hasNext", &[], builtin::BOOLEAN);
    add_method(table, iterator, "next", &[], t);
    add_operator(table, iterator, "?", &[], builtin::BOOLEAN);
    iterator
}

fn register_list(
    table: &mut SymbolTable,
    scope: ScopeId,
    module: ModuleId,
    iterator: SymbolId,
) -> SymbolId {
    let list = define_type(table, scope, module, "List", AggregateKind::Class);
    let t = add_type_param(table, list, "T");
    let iter_of_t = instantiate(table, iterator, &[t]);
    add_constructor(table, list, &[]);
    add_constructor(table, list, &[t]);
    add_operator(table, list, "|", &[t], builtin::VOID);
    add_method(table, list, "add", &[t], builtin::VOID);
    add_method(table, list, "get", &[builtin::INTEGER], t);
    add_method(table, list, "iterator", &[], iter_of_t);
    add_method(table, list, "length", &[], builtin::INTEGER);
    add_operator(table, list, "#?", &[], builtin::INTEGER);
    add_operator(table, list, "$", &[], builtin::STRING);
    add_operator(table, list, "?", &[], builtin::BOOLEAN);
    list
}

fn register_dict(
    table: &mut SymbolTable,
    scope: ScopeId,
    module: ModuleId,
    iterator: SymbolId,
) -> SymbolId {
    let dict = define_type(table, scope, module, "Dict", AggregateKind::Class);
    let k = add_type_param(table, dict, "K");
    let v = add_type_param(table, dict, "V");
    let iter_of_k = instantiate(table, iterator, &[k]);
    add_constructor(table, dict, &[]);
    add_constructor(table, dict, &[k, v]);
    add_method(table, dict, "get", &[k], v);
    add_method(table, dict, "put", &[k, v], builtin::VOID);
    add_method(table, dict, "keys", &[], iter_of_k);
    add_method(table, dict, "length", &[], builtin::INTEGER);
    add_operator(table, dict, "$", &[], builtin::STRING);
    add_operator(table, dict, "?", &[], builtin::BOOLEAN);
    dict
}

fn instantiate(table: &mut SymbolTable, template: SymbolId, args: &[SymbolId]) -> SymbolId {
    generic::resolve_or_define(table, template, args, DEFAULT_INSTANTIATION_DEPTH).unwrap_or_else(
        |err| {
            tracing::error!(%err, "built-in instantiation failed");
            builtin::UNRESOLVED
        },
    )
}

fn define_type(
    table: &mut SymbolTable,
    scope: ScopeId,
    module: ModuleId,
    name: &str,
    kind: AggregateKind,
) -> SymbolId {
    let name = table.intern(name);
    let members = table.new_scope(ScopeKind::TypeBody, Some(scope), None, module);
    let info = AggregateInfo {
        kind,
        builtin: true,
        members,
        supertype: None,
        traits: SymbolList::new(),
        type_params: SymbolList::new(),
        parameterization: None,
        is_abstract: false,
        is_open: false,
    };
    let kind = SymbolKind::Aggregate(Box::new(info));
    let mut def = SymbolDef::new(name, Span::default(), module, kind);
    def.flags.typed = true;
    let id = match table.define(scope, def) {
        Ok(id) | Err(id) => id,
    };
    table.get_mut(id).ty = Some(id);
    table.set_scope_owner(members, id);
    id
}

fn add_type_param(table: &mut SymbolTable, owner: SymbolId, name: &str) -> SymbolId {
    let name = table.intern(name);
    let module = table.get(owner).module;
    let kind = SymbolKind::TypeParameter {
        owner,
        constraint: builtin::ANY,
    };
    let mut def = SymbolDef::new(name, Span::default(), module, kind);
    def.flags.typed = true;
    let id = match table.aggregate(owner).map(|info| info.members) {
        Some(members) => match table.define(members, def) {
            Ok(id) | Err(id) => id,
        },
        None => table.add_detached(def),
    };
    table.get_mut(id).ty = Some(id);
    if let Some(info) = table.aggregate_mut(owner) {
        info.type_params.push(id);
    }
    id
}

fn add_constructor(table: &mut SymbolTable, owner: SymbolId, params: &[SymbolId]) -> SymbolId {
    let name = table.symbol_name(owner).to_string();
    let flags = MethodFlags {
        constructor: true,
        ..MethodFlags::default()
    };
    add_member(table, owner, &name, params, owner, flags)
}

fn add_operator(
    table: &mut SymbolTable,
    owner: SymbolId,
    name: &str,
    params: &[SymbolId],
    ret: SymbolId,
) -> SymbolId {
    let flags = MethodFlags {
        operator: true,
        ..MethodFlags::default()
    };
    add_member(table, owner, name, params, ret, flags)
}

fn add_method(
    table: &mut SymbolTable,
    owner: SymbolId,
    name: &str,
    params: &[SymbolId],
    ret: SymbolId,
) -> SymbolId {
    add_member(table, owner, name, params, ret, MethodFlags::default())
}

fn add_member(
    table: &mut SymbolTable,
    owner: SymbolId,
    name: &str,
    params: &[SymbolId],
    ret: SymbolId,
    flags: MethodFlags,
) -> SymbolId {
    let module = table.get(owner).module;
    let Some(members) = table.aggregate(owner).map(|info| info.members) else {
        return builtin::UNRESOLVED;
    };
    let method_scope = table.new_scope(ScopeKind::Method, Some(members), None, module);

    let mut param_ids = SymbolList::new();
    for (index, ty) in params.iter().enumerate() {
        let param_name = table.intern(&format!("arg{index}"));
        let mut def = SymbolDef::new(
            param_name,
            Span::default(),
            module,
            SymbolKind::Variable(VariableRole::Parameter),
        )
        .with_type(*ty);
        def.flags.initialized = true;
        def.flags.typed = true;
        if let Ok(id) = table.define(method_scope, def) {
            param_ids.push(id);
        }
    }

    let info = MethodInfo {
        scope: method_scope,
        owner,
        params: param_ids,
        return_type: ret,
        flags,
    };
    let pure = !MUTATING_MEMBERS.contains(&name);
    let name = table.intern(name);
    let mut def = SymbolDef::new(name, Span::default(), module, SymbolKind::Method(Box::new(info)))
        .with_type(ret);
    def.flags.typed = true;
    def.flags.pure = pure;
    let id = match table.define(members, def) {
        Ok(id) | Err(id) => id,
    };
    table.set_scope_owner(method_scope, id);
    id
}
