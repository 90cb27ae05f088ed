// ast/mod.rs
//
// The syntax tree handed over by the parser. Only the shapes the semantic
// core consumes are modelled; every node carries a `NodeId` and a `Span`.

mod build;

pub use build::AstBuilder;

use ek9_identity::{NodeId, Span};

use crate::pipeline::StageKind;
pub use crate::symbols::{AggregateKind, Visibility};

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// Dotted module path, e.g. `com.example.shapes`.
    pub module: String,
    /// Modules whose symbols are referenced by this unit.
    pub references: Vec<String>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Aggregate(AggregateDecl),
    Function(FunctionDecl),
}

impl Decl {
    pub fn id(&self) -> NodeId {
        match self {
            Decl::Aggregate(d) => d.id,
            Decl::Function(d) => d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Decl::Aggregate(d) => &d.name,
            Decl::Function(d) => &d.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Aggregate(d) => d.span,
            Decl::Function(d) => d.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    Named(String),
    /// `List of Integer`, `Dict of (Integer, String)`
    Parameterized { base: String, args: Vec<TypeExpr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    /// `T constrain by Shape`
    pub constraint: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDecl {
    pub id: NodeId,
    pub span: Span,
    pub kind: AggregateKind,
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub supertype: Option<TypeExpr>,
    pub traits: Vec<TypeExpr>,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
    pub is_abstract: bool,
    pub is_open: bool,
    /// A bare `default operator`.
    pub default_operators: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub ty: TypeExpr,
    pub visibility: Visibility,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<Param>,
    pub returns: Option<TypeExpr>,
    pub is_constructor: bool,
    pub is_operator: bool,
    pub is_abstract: bool,
    pub is_override: bool,
    pub is_pure: bool,
    /// `default operator <`: the body is generated.
    pub is_default: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<Param>,
    pub returns: Option<TypeExpr>,
    pub supertype: Option<TypeExpr>,
    pub is_pure: bool,
    pub is_abstract: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `name as Type: init`, `name <- init` or `name as Type?`
    Let {
        name: String,
        ty: Option<TypeExpr>,
        init: Option<Expr>,
        mutable: bool,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Ident(String),
    This,
    Super,
    /// Function, constructor or delegate call by name.
    Call {
        callee: String,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    /// `this(...)` constructor delegation.
    ThisCall(Vec<Expr>),
    /// `super(...)` constructor delegation.
    SuperCall(Vec<Expr>),
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Property {
        receiver: Box<Expr>,
        name: String,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    Dynamic(Box<DynamicFunction>),
    Pipeline(Box<Pipeline>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub value: Expr,
}

/// A function literal with an explicit capture list.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicFunction {
    pub id: NodeId,
    pub captures: Vec<Capture>,
    pub params: Vec<Param>,
    pub returns: Option<TypeExpr>,
    /// Abstract function this literal implements.
    pub supertype: Option<TypeExpr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub source: PipelineSource,
    pub stages: Vec<PipelineStage>,
    pub terminal: Option<PipelineTerminal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSource {
    pub id: NodeId,
    pub span: Span,
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Cat(Vec<Expr>),
    Range { from: Expr, to: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStage {
    pub id: NodeId,
    pub span: Span,
    pub kind: StageKind,
    pub args: Vec<Expr>,
    pub branch: Option<PipelineTerminal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTerminal {
    pub id: NodeId,
    pub span: Span,
    pub kind: TerminalKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalKind {
    /// `> target`
    Into(String),
    /// `collect as Type`
    CollectAs(TypeExpr),
}
