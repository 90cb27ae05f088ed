// symbols/symbol.rs
//
// Symbol definitions stored in the SymbolTable arena.

use ek9_identity::{ModuleId, Name, ScopeId, Span, SymbolId};
use smallvec::SmallVec;

/// Short list of symbol ids (parameter types, type arguments, traits).
pub type SymbolList = SmallVec<[SymbolId; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// Genus of an aggregate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Class,
    Record,
    Trait,
    Component,
}

impl AggregateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateKind::Class => "class",
            AggregateKind::Record => "record",
            AggregateKind::Trait => "trait",
            AggregateKind::Component => "component",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRole {
    Local,
    Property,
    Parameter,
    Capture,
}

/// Facts discovered about a symbol while it is analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolFlags {
    pub mutable: bool,
    pub constant: bool,
    pub referenced: bool,
    pub initialized: bool,
    pub pure: bool,
    /// Explicit types (supertypes, member signatures) have been resolved.
    pub typed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodFlags {
    pub constructor: bool,
    pub operator: bool,
    pub is_abstract: bool,
    pub is_override: bool,
    /// Body is generated by the compiler (`default operator`).
    pub defaulted: bool,
}

/// Link from an instantiated symbol back to its generic template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameterization {
    pub template: SymbolId,
    pub args: SymbolList,
    /// Every argument is concrete; false while used inside another generic body.
    pub complete: bool,
    /// Members were derived before the template's own signatures were resolved.
    pub stale: bool,
}

#[derive(Debug, Clone)]
pub struct AggregateInfo {
    pub kind: AggregateKind,
    pub builtin: bool,
    pub members: ScopeId,
    pub supertype: Option<SymbolId>,
    pub traits: SymbolList,
    pub type_params: SymbolList,
    pub parameterization: Option<Parameterization>,
    pub is_abstract: bool,
    pub is_open: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub scope: ScopeId,
    /// Parameter variable symbols, in declaration order.
    pub params: SymbolList,
    pub return_type: SymbolId,
    pub type_params: SymbolList,
    pub parameterization: Option<Parameterization>,
    pub supertype: Option<SymbolId>,
    pub is_abstract: bool,
    pub is_dynamic: bool,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub scope: ScopeId,
    pub owner: SymbolId,
    pub params: SymbolList,
    pub return_type: SymbolId,
    pub flags: MethodFlags,
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// The explicit marker for anything that failed to resolve.
    Unresolved,
    Variable(VariableRole),
    /// Conceptual type parameter ("T") of a generic template.
    TypeParameter {
        owner: SymbolId,
        constraint: SymbolId,
    },
    Aggregate(Box<AggregateInfo>),
    Function(Box<FunctionInfo>),
    Method(Box<MethodInfo>),
}

/// Category used for per-scope uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolCategory {
    Type,
    Variable,
    Method,
    Function,
}

impl SymbolKind {
    pub fn category(&self) -> Option<SymbolCategory> {
        match self {
            SymbolKind::Unresolved => None,
            SymbolKind::Variable(_) => Some(SymbolCategory::Variable),
            SymbolKind::TypeParameter { .. } | SymbolKind::Aggregate(_) => {
                Some(SymbolCategory::Type)
            }
            SymbolKind::Function(_) => Some(SymbolCategory::Function),
            SymbolKind::Method(_) => Some(SymbolCategory::Method),
        }
    }

    /// Symbols that denote a type (functions are types too).
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::TypeParameter { .. } | SymbolKind::Aggregate(_) | SymbolKind::Function(_)
        )
    }
}

/// A named, typed entity.
#[derive(Debug, Clone)]
pub struct SymbolDef {
    pub name: Name,
    pub span: Span,
    pub module: ModuleId,
    /// Scope the symbol was declared in.
    pub scope: Option<ScopeId>,
    pub kind: SymbolKind,
    /// Resolved type; types are their own type, methods carry their return type.
    pub ty: Option<SymbolId>,
    pub visibility: Visibility,
    pub flags: SymbolFlags,
}

impl SymbolDef {
    pub fn new(name: Name, span: Span, module: ModuleId, kind: SymbolKind) -> Self {
        Self {
            name,
            span,
            module,
            scope: None,
            kind,
            ty: None,
            visibility: Visibility::Public,
            flags: SymbolFlags::default(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_type(mut self, ty: SymbolId) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn as_aggregate(&self) -> Option<&AggregateInfo> {
        match &self.kind {
            SymbolKind::Aggregate(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionInfo> {
        match &self.kind {
            SymbolKind::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodInfo> {
        match &self.kind {
            SymbolKind::Method(info) => Some(info),
            _ => None,
        }
    }

    pub fn variable_role(&self) -> Option<VariableRole> {
        match self.kind {
            SymbolKind::Variable(role) => Some(role),
            _ => None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.as_method().is_some_and(|m| m.flags.constructor)
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.kind, SymbolKind::Unresolved)
    }
}
