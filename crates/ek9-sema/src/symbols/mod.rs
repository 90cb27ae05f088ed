// symbols/mod.rs
//
// Whole-program symbol store: symbol and scope arenas, module registry and the
// parameterized-type cache.

mod scope;
mod scope_stack;
mod search;
mod symbol;
pub mod well_known;


use std::collections::VecDeque;

use ek9_identity::{Interner, ModuleId, Name, ScopeId, SymbolId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::generic::ParameterizeError;

pub use scope::{ScopeDef, ScopeKind};
pub use scope_stack::{
    ScopeStack, most_specific_scope, traverse_back_up_stack, traverse_back_up_stack_by,
};
pub use search::{SearchCategory, SymbolSearch};
pub use symbol::{
    AggregateInfo, AggregateKind, FunctionInfo, MethodFlags, MethodInfo, Parameterization,
    SymbolCategory, SymbolDef, SymbolFlags, SymbolKind, SymbolList, VariableRole, Visibility,
};
pub use well_known::{WellKnown, builtin};

/// Default ceiling for supertype/trait walks.
pub const DEFAULT_HIERARCHY_LIMIT: usize = 128;

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub path: String,
    pub scope: ScopeId,
    pub imports: Vec<ModuleId>,
}

/// Key of the parameterized-type cache: template identity plus ordered argument identities.
type InstanceKey = (SymbolId, SymbolList);

/// Arena-backed store of every symbol and scope in the program.
///
/// Symbols are addressed by `SymbolId` and never move, so ids handed out during
/// analysis stay valid for later phases. The table is shared between compilation
/// units through `CompilationDb`, which serializes access with a lock.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    names: Interner,
    symbols: Vec<SymbolDef>,
    scopes: Vec<ScopeDef>,
    modules: Vec<ModuleInfo>,
    module_by_path: FxHashMap<String, ModuleId>,
    instances: FxHashMap<InstanceKey, SymbolId>,
    /// Instantiations in creation order.
    instance_order: Vec<SymbolId>,
    /// Instantiations whose members could not be derived.
    failed_instances: FxHashMap<SymbolId, ParameterizeError>,
    well_known: WellKnown,
    hierarchy_limit: usize,
}

impl SymbolTable {
    /// Create a table with the built-in module registered.
    pub fn new() -> Self {
        let mut table = Self {
            names: Interner::new(),
            symbols: Vec::new(),
            scopes: Vec::new(),
            modules: Vec::new(),
            module_by_path: FxHashMap::default(),
            instances: FxHashMap::default(),
            instance_order: Vec::new(),
            failed_instances: FxHashMap::default(),
            well_known: WellKnown::placeholder(),
            hierarchy_limit: DEFAULT_HIERARCHY_LIMIT,
        };
        table.well_known = well_known::register_builtins(&mut table);
        table
    }

    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    pub fn set_hierarchy_limit(&mut self, limit: usize) {
        self.hierarchy_limit = limit.max(1);
    }

    // ---- names ----

    pub fn intern(&mut self, s: &str) -> Name {
        self.names.intern(s)
    }

    pub fn name(&self, name: Name) -> &str {
        self.names.resolve(name)
    }

    pub fn lookup_name(&self, s: &str) -> Option<Name> {
        self.names.lookup(s)
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.names.resolve(self.get(id).name)
    }

    // ---- modules ----

    /// Module for `path`, registering it (with its scope) on first use.
    pub fn module(&mut self, path: &str) -> ModuleId {
        if let Some(id) = self.module_by_path.get(path) {
            return *id;
        }
        let id = ModuleId::new(self.modules.len() as u32);
        let scope = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(ScopeDef::new(ScopeKind::Module, None, None, id));
        self.modules.push(ModuleInfo {
            path: path.to_string(),
            scope,
            imports: Vec::new(),
        });
        self.module_by_path.insert(path.to_string(), id);
        tracing::trace!(module = path, "registered module");
        id
    }

    pub fn find_module(&self, path: &str) -> Option<ModuleId> {
        self.module_by_path.get(path).copied()
    }

    pub fn module_info(&self, id: ModuleId) -> &ModuleInfo {
        &self.modules[id.slot()]
    }

    pub fn module_scope(&self, id: ModuleId) -> ScopeId {
        self.modules[id.slot()].scope
    }

    pub fn builtin_module(&self) -> ModuleId {
        self.well_known.module
    }

    /// Make the symbols of `target` visible from `from` (a `references` import).
    pub fn add_module_reference(&mut self, from: ModuleId, target: ModuleId) {
        let imports = &mut self.modules[from.slot()].imports;
        if from != target && !imports.contains(&target) {
            imports.push(target);
        }
    }

    // ---- scopes ----

    pub fn new_scope(
        &mut self,
        kind: ScopeKind,
        parent: Option<ScopeId>,
        owner: Option<SymbolId>,
        module: ModuleId,
    ) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(ScopeDef::new(kind, parent, owner, module));
        id
    }

    pub fn scope(&self, id: ScopeId) -> &ScopeDef {
        &self.scopes[id.slot()]
    }

    pub fn set_scope_owner(&mut self, scope: ScopeId, owner: SymbolId) {
        self.scopes[scope.slot()].owner = Some(owner);
    }

    /// Drop every symbol from a scope; used when instance members are re-derived.
    pub(crate) fn clear_scope(&mut self, scope: ScopeId) {
        self.scopes[scope.slot()].clear();
    }

    // ---- symbols ----

    /// Register a symbol that does not live in any scope (instantiations).
    pub fn add_detached(&mut self, def: SymbolDef) -> SymbolId {
        let id = SymbolId::new(self.symbols.len() as u32);
        self.symbols.push(def);
        id
    }

    /// Define `def` in `scope`.
    ///
    /// Names are unique per category within one scope, except methods which
    /// overload by name. On a clash the already defined symbol is returned.
    pub fn define(&mut self, scope: ScopeId, mut def: SymbolDef) -> Result<SymbolId, SymbolId> {
        if let Some(category) = def.kind.category()
            && category != SymbolCategory::Method
        {
            let clash = self.scopes[scope.slot()]
                .named(def.name)
                .iter()
                .copied()
                .find(|existing| self.get(*existing).kind.category() == Some(category));
            if let Some(existing) = clash {
                return Err(existing);
            }
        }
        def.scope = Some(scope);
        let name = def.name;
        let id = self.add_detached(def);
        self.scopes[scope.slot()].push(name, id);
        Ok(id)
    }

    /// Append `id` to `scope` without the clash check.
    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, scope: ScopeId, id: SymbolId) {
        let name = self.get(id).name;
        self.scopes[scope.slot()].push(name, id);
    }

    pub fn get(&self, id: SymbolId) -> &SymbolDef {
        &self.symbols[id.slot()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut SymbolDef {
        &mut self.symbols[id.slot()]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn aggregate(&self, id: SymbolId) -> Option<&AggregateInfo> {
        self.get(id).as_aggregate()
    }

    pub fn aggregate_mut(&mut self, id: SymbolId) -> Option<&mut AggregateInfo> {
        match &mut self.get_mut(id).kind {
            SymbolKind::Aggregate(info) => Some(info),
            _ => None,
        }
    }

    pub fn function(&self, id: SymbolId) -> Option<&FunctionInfo> {
        self.get(id).as_function()
    }

    pub fn function_mut(&mut self, id: SymbolId) -> Option<&mut FunctionInfo> {
        match &mut self.get_mut(id).kind {
            SymbolKind::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn method(&self, id: SymbolId) -> Option<&MethodInfo> {
        self.get(id).as_method()
    }

    pub fn method_mut(&mut self, id: SymbolId) -> Option<&mut MethodInfo> {
        match &mut self.get_mut(id).kind {
            SymbolKind::Method(info) => Some(info),
            _ => None,
        }
    }

    /// Resolved type of a symbol, `UNRESOLVED` when not yet known.
    pub fn type_of(&self, id: SymbolId) -> SymbolId {
        self.get(id).ty.unwrap_or(builtin::UNRESOLVED)
    }

    /// Parameter types of a function or method.
    pub fn param_types(&self, callable: SymbolId) -> SymbolList {
        let params = match &self.get(callable).kind {
            SymbolKind::Function(info) => &info.params,
            SymbolKind::Method(info) => &info.params,
            _ => return SymbolList::new(),
        };
        params.iter().map(|p| self.type_of(*p)).collect()
    }

    pub fn return_type(&self, callable: SymbolId) -> SymbolId {
        match &self.get(callable).kind {
            SymbolKind::Function(info) => info.return_type,
            SymbolKind::Method(info) => info.return_type,
            _ => builtin::UNRESOLVED,
        }
    }

    /// Type parameters declared by a generic template.
    pub fn type_params(&self, id: SymbolId) -> &[SymbolId] {
        match &self.get(id).kind {
            SymbolKind::Aggregate(info) => &info.type_params,
            SymbolKind::Function(info) => &info.type_params,
            _ => &[],
        }
    }

    pub fn parameterization(&self, id: SymbolId) -> Option<&Parameterization> {
        match &self.get(id).kind {
            SymbolKind::Aggregate(info) => info.parameterization.as_ref(),
            SymbolKind::Function(info) => info.parameterization.as_ref(),
            _ => None,
        }
    }

    /// A declared generic template that has not itself been parameterized.
    pub fn is_generic_template(&self, id: SymbolId) -> bool {
        !self.type_params(id).is_empty() && self.parameterization(id).is_none()
    }

    /// True when the type contains no conceptual type parameters.
    pub fn is_concrete(&self, ty: SymbolId) -> bool {
        match &self.get(ty).kind {
            SymbolKind::TypeParameter { .. } => false,
            SymbolKind::Aggregate(_) | SymbolKind::Function(_) => match self.parameterization(ty) {
                Some(p) => p.args.iter().all(|arg| self.is_concrete(*arg)),
                None => self.type_params(ty).is_empty(),
            },
            _ => true,
        }
    }

    // ---- hierarchy ----

    /// Declared supertype; a type parameter reports its constraint.
    pub fn supertype_of(&self, ty: SymbolId) -> Option<SymbolId> {
        match &self.get(ty).kind {
            SymbolKind::Aggregate(info) => info.supertype,
            SymbolKind::Function(info) => info.supertype,
            SymbolKind::TypeParameter { constraint, .. } if *constraint != builtin::ANY => {
                Some(*constraint)
            }
            _ => None,
        }
    }

    pub fn traits_of(&self, ty: SymbolId) -> &[SymbolId] {
        match &self.get(ty).kind {
            SymbolKind::Aggregate(info) => &info.traits,
            _ => &[],
        }
    }

    /// Supertype followed by traits.
    pub fn direct_supers(&self, ty: SymbolId) -> SymbolList {
        let mut supers = SymbolList::new();
        supers.extend(self.supertype_of(ty));
        supers.extend(self.traits_of(ty).iter().copied());
        supers
    }

    /// Every supertype and trait reachable from `ty`, nearest first, excluding `ty`.
    ///
    /// Terminates on cyclic hierarchies; the cycle itself is reported by the
    /// structural checks.
    pub fn ancestors(&self, ty: SymbolId) -> Vec<SymbolId> {
        let mut seen = FxHashSet::default();
        seen.insert(ty);
        let mut out = Vec::new();
        let mut queue: VecDeque<(SymbolId, usize)> = VecDeque::new();
        queue.push_back((ty, 0));
        while let Some((current, depth)) = queue.pop_front() {
            if depth >= self.hierarchy_limit {
                tracing::warn!(ty = self.symbol_name(ty), "hierarchy walk hit depth limit");
                break;
            }
            for parent in self.direct_supers(current) {
                if seen.insert(parent) {
                    out.push(parent);
                    queue.push_back((parent, depth + 1));
                }
            }
        }
        out
    }

    pub fn is_subtype(&self, sub: SymbolId, sup: SymbolId) -> bool {
        sub == sup || self.ancestors(sub).contains(&sup)
    }

    /// Aggregate whose members scope is `scope`, if any.
    pub fn aggregate_of_scope(&self, scope: ScopeId) -> Option<SymbolId> {
        let def = self.scope(scope);
        match def.kind {
            ScopeKind::TypeBody => def.owner,
            _ => None,
        }
    }

    pub fn members(&self, aggregate: SymbolId) -> &[SymbolId] {
        match self.aggregate(aggregate) {
            Some(info) => self.scope(info.members).symbols(),
            None => &[],
        }
    }

    /// Properties declared directly on the aggregate, in order.
    pub fn properties(&self, aggregate: SymbolId) -> Vec<SymbolId> {
        self.members(aggregate)
            .iter()
            .copied()
            .filter(|m| self.get(*m).variable_role() == Some(VariableRole::Property))
            .collect()
    }

    /// Methods declared directly on the aggregate with this name.
    pub fn methods_named(&self, aggregate: SymbolId, name: Name) -> Vec<SymbolId> {
        match self.aggregate(aggregate) {
            Some(info) => self
                .scope(info.members)
                .named(name)
                .iter()
                .copied()
                .filter(|m| self.method(*m).is_some())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Overload identity lookup: same name and exactly the same parameter types.
    pub fn method_with_signature(
        &self,
        aggregate: SymbolId,
        name: Name,
        params: &[SymbolId],
    ) -> Option<SymbolId> {
        self.methods_named(aggregate, name)
            .into_iter()
            .find(|m| self.param_types(*m).as_slice() == params)
    }

    // ---- resolution ----

    /// Search a single scope without walking outward or into supertypes.
    pub fn resolve_in_this_scope_only(
        &self,
        scope: ScopeId,
        search: SymbolSearch,
    ) -> Option<SymbolId> {
        self.scope(scope)
            .named(search.name)
            .iter()
            .copied()
            .find(|id| search.matches(&self.get(*id).kind))
    }

    /// Search the members of `aggregate` only (no supertypes).
    pub fn resolve_member_only(
        &self,
        aggregate: SymbolId,
        search: SymbolSearch,
    ) -> Option<SymbolId> {
        let info = self.aggregate(aggregate)?;
        self.resolve_in_this_scope_only(info.members, search)
    }

    /// Search the members of `aggregate` and then of every ancestor, nearest first.
    pub fn resolve_in_hierarchy(
        &self,
        aggregate: SymbolId,
        search: SymbolSearch,
    ) -> Option<SymbolId> {
        if let Some(found) = self.resolve_member_only(aggregate, search) {
            return Some(found);
        }
        self.ancestors(aggregate)
            .into_iter()
            .find_map(|ancestor| self.resolve_member_only(ancestor, search))
    }

    /// Walk outward from `scope` looking for a symbol matching `search`.
    ///
    /// Type bodies also search their supertype/trait hierarchy. After the
    /// module scope, referenced modules and then the built-in module are
    /// searched. Returns `None` when nothing matches; reporting is up to the caller.
    pub fn resolve(&self, scope: ScopeId, search: SymbolSearch) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.resolve_in_this_scope_only(id, search) {
                return Some(found);
            }
            let def = self.scope(id);
            if def.kind == ScopeKind::TypeBody
                && let Some(owner) = def.owner
                && let Some(found) = self
                    .ancestors(owner)
                    .into_iter()
                    .find_map(|ancestor| self.resolve_member_only(ancestor, search))
            {
                return Some(found);
            }
            current = def.parent;
        }

        let module = self.scope(scope).module;
        for import in &self.modules[module.slot()].imports {
            let scope = self.module_scope(*import);
            if let Some(found) = self.resolve_in_this_scope_only(scope, search) {
                return Some(found);
            }
        }
        if module != self.well_known.module {
            let builtins = self.module_scope(self.well_known.module);
            return self.resolve_in_this_scope_only(builtins, search);
        }
        None
    }

    // ---- parameterized-type cache ----

    pub fn cached_instance(&self, template: SymbolId, args: &[SymbolId]) -> Option<SymbolId> {
        self.instances
            .get(&(template, SymbolList::from_slice(args)))
            .copied()
    }

    pub(crate) fn cache_instance(
        &mut self,
        template: SymbolId,
        args: SymbolList,
        instance: SymbolId,
    ) {
        self.instances.insert((template, args), instance);
        self.instance_order.push(instance);
    }

    /// Keep `instance` cached but answer every later request for it with `error`.
    pub(crate) fn mark_instance_failed(&mut self, instance: SymbolId, error: ParameterizeError) {
        self.failed_instances.insert(instance, error);
    }

    pub fn instance_failure(&self, instance: SymbolId) -> Option<&ParameterizeError> {
        self.failed_instances.get(&instance)
    }

    /// Every instantiation created so far, in creation order.
    pub fn instantiations(&self) -> &[SymbolId] {
        &self.instance_order
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
