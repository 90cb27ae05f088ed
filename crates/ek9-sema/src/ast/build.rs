// ast/build.rs
//
// Programmatic construction of syntax trees for synthesized code and tests.
// Every node gets a fresh id and a distinct one-line span.

use ek9_identity::{NodeId, NodeIdGen, Span};

use super::*;

#[derive(Debug)]
pub struct AstBuilder {
    ids: NodeIdGen,
    line: u32,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Number nodes from `first`, so trees built by separate builders never share ids.
    pub fn starting_at(first: u32) -> Self {
        Self {
            ids: NodeIdGen::starting_at(first),
            line: first,
        }
    }

    fn next(&mut self) -> (NodeId, Span) {
        let id = self.ids.fresh();
        self.line += 1;
        let start = self.line as usize * 80;
        (id, Span::new(start, start + 40, self.line, 1))
    }

    // ---- types ----

    pub fn ty(&mut self, name: &str) -> TypeExpr {
        let (id, span) = self.next();
        TypeExpr {
            id,
            span,
            kind: TypeExprKind::Named(name.to_string()),
        }
    }

    pub fn ty_of(&mut self, base: &str, args: Vec<TypeExpr>) -> TypeExpr {
        let (id, span) = self.next();
        TypeExpr {
            id,
            span,
            kind: TypeExprKind::Parameterized {
                base: base.to_string(),
                args,
            },
        }
    }

    pub fn type_param(&mut self, name: &str, constraint: Option<TypeExpr>) -> TypeParamDecl {
        let (id, span) = self.next();
        TypeParamDecl {
            id,
            span,
            name: name.to_string(),
            constraint,
        }
    }

    // ---- declarations ----

    pub fn unit(&self, module: &str, decls: Vec<Decl>) -> CompilationUnit {
        CompilationUnit {
            module: module.to_string(),
            references: Vec::new(),
            decls,
        }
    }

    pub fn aggregate(&mut self, kind: AggregateKind, name: &str) -> AggregateDecl {
        let (id, span) = self.next();
        AggregateDecl {
            id,
            span,
            kind,
            name: name.to_string(),
            type_params: Vec::new(),
            supertype: None,
            traits: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            is_abstract: kind == AggregateKind::Trait,
            is_open: false,
            default_operators: false,
        }
    }

    pub fn class(&mut self, name: &str) -> AggregateDecl {
        self.aggregate(AggregateKind::Class, name)
    }

    pub fn record(&mut self, name: &str) -> AggregateDecl {
        self.aggregate(AggregateKind::Record, name)
    }

    pub fn trait_decl(&mut self, name: &str) -> AggregateDecl {
        self.aggregate(AggregateKind::Trait, name)
    }

    pub fn prop(&mut self, name: &str, ty: TypeExpr) -> PropertyDecl {
        let (id, span) = self.next();
        PropertyDecl {
            id,
            span,
            name: name.to_string(),
            ty,
            visibility: Visibility::Private,
            initializer: None,
        }
    }

    pub fn param(&mut self, name: &str, ty: TypeExpr) -> Param {
        let (id, span) = self.next();
        Param {
            id,
            span,
            name: name.to_string(),
            ty,
        }
    }

    pub fn method(&mut self, name: &str) -> MethodDecl {
        let (id, span) = self.next();
        MethodDecl {
            id,
            span,
            name: name.to_string(),
            visibility: Visibility::Public,
            params: Vec::new(),
            returns: None,
            is_constructor: false,
            is_operator: false,
            is_abstract: false,
            is_override: false,
            is_pure: false,
            is_default: false,
            body: Vec::new(),
        }
    }

    pub fn operator(&mut self, op: &str) -> MethodDecl {
        let mut method = self.method(op);
        method.is_operator = true;
        method.is_pure = true;
        method
    }

    /// `default operator <op>`
    pub fn default_operator(&mut self, op: &str) -> MethodDecl {
        let mut method = self.operator(op);
        method.is_default = true;
        method
    }

    pub fn constructor(&mut self, type_name: &str) -> MethodDecl {
        let mut method = self.method(type_name);
        method.is_constructor = true;
        method
    }

    pub fn function(&mut self, name: &str) -> FunctionDecl {
        let (id, span) = self.next();
        FunctionDecl {
            id,
            span,
            name: name.to_string(),
            type_params: Vec::new(),
            params: Vec::new(),
            returns: None,
            supertype: None,
            is_pure: false,
            is_abstract: false,
            body: Vec::new(),
        }
    }

    // ---- statements ----

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        let (id, span) = self.next();
        Stmt { id, span, kind }
    }

    /// `name <- init`
    pub fn let_(&mut self, name: &str, init: Expr) -> Stmt {
        self.stmt(StmtKind::Let {
            name: name.to_string(),
            ty: None,
            init: Some(init),
            mutable: false,
        })
    }

    /// `name as Type: init` (mutable)
    pub fn var(&mut self, name: &str, ty: TypeExpr, init: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Let {
            name: name.to_string(),
            ty: Some(ty),
            init,
            mutable: true,
        })
    }

    pub fn assign(&mut self, target: Expr, value: Expr) -> Stmt {
        self.stmt(StmtKind::Assign { target, value })
    }

    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn if_(
        &mut self,
        cond: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
    ) -> Stmt {
        self.stmt(StmtKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn while_(&mut self, cond: Expr, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn ret(&mut self, value: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(value))
    }

    pub fn block(&mut self, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::Block(body))
    }

    // ---- expressions ----

    fn expr(&mut self, kind: ExprKind) -> Expr {
        let (id, span) = self.next();
        Expr { id, span, kind }
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.expr(ExprKind::Int(value))
    }

    pub fn float(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::Float(value))
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::Str(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Bool(value))
    }

    pub fn ident(&mut self, name: &str) -> Expr {
        self.expr(ExprKind::Ident(name.to_string()))
    }

    pub fn this(&mut self) -> Expr {
        self.expr(ExprKind::This)
    }

    pub fn super_(&mut self) -> Expr {
        self.expr(ExprKind::Super)
    }

    pub fn call(&mut self, callee: &str, args: Vec<Expr>) -> Expr {
        self.call_of(callee, Vec::new(), args)
    }

    /// `callee of (type_args)(args)`
    pub fn call_of(&mut self, callee: &str, type_args: Vec<TypeExpr>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            callee: callee.to_string(),
            type_args,
            args,
        })
    }

    pub fn this_call(&mut self, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ThisCall(args))
    }

    pub fn super_call(&mut self, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::SuperCall(args))
    }

    pub fn method_call(&mut self, receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::MethodCall {
            receiver: Box::new(receiver),
            method: method.to_string(),
            args,
        })
    }

    pub fn property(&mut self, receiver: Expr, name: &str) -> Expr {
        self.expr(ExprKind::Property {
            receiver: Box::new(receiver),
            name: name.to_string(),
        })
    }

    pub fn binary(&mut self, lhs: Expr, op: &str, rhs: Expr) -> Expr {
        self.expr(ExprKind::Binary {
            op: op.to_string(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn unary(&mut self, op: &str, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op: op.to_string(),
            operand: Box::new(operand),
        })
    }

    pub fn capture(&mut self, name: &str, value: Expr) -> Capture {
        let (id, span) = self.next();
        Capture {
            id,
            span,
            name: name.to_string(),
            value,
        }
    }

    pub fn dynamic(
        &mut self,
        captures: Vec<Capture>,
        params: Vec<Param>,
        returns: Option<TypeExpr>,
        body: Vec<Stmt>,
    ) -> Expr {
        let (id, _) = self.next();
        self.expr(ExprKind::Dynamic(Box::new(DynamicFunction {
            id,
            captures,
            params,
            returns,
            supertype: None,
            body,
        })))
    }

    // ---- pipelines ----

    pub fn cat(&mut self, values: Vec<Expr>) -> PipelineSource {
        let (id, span) = self.next();
        PipelineSource {
            id,
            span,
            kind: SourceKind::Cat(values),
        }
    }

    pub fn range(&mut self, from: Expr, to: Expr) -> PipelineSource {
        let (id, span) = self.next();
        PipelineSource {
            id,
            span,
            kind: SourceKind::Range { from, to },
        }
    }

    pub fn stage(&mut self, kind: StageKind, args: Vec<Expr>) -> PipelineStage {
        let (id, span) = self.next();
        PipelineStage {
            id,
            span,
            kind,
            args,
            branch: None,
        }
    }

    pub fn into_target(&mut self, target: &str) -> PipelineTerminal {
        let (id, span) = self.next();
        PipelineTerminal {
            id,
            span,
            kind: TerminalKind::Into(target.to_string()),
        }
    }

    pub fn collect_as(&mut self, ty: TypeExpr) -> PipelineTerminal {
        let (id, span) = self.next();
        PipelineTerminal {
            id,
            span,
            kind: TerminalKind::CollectAs(ty),
        }
    }

    pub fn pipeline(
        &mut self,
        source: PipelineSource,
        stages: Vec<PipelineStage>,
        terminal: Option<PipelineTerminal>,
    ) -> Expr {
        self.expr(ExprKind::Pipeline(Box::new(Pipeline {
            source,
            stages,
            terminal,
        })))
    }
}

impl AggregateDecl {
    pub fn extending(mut self, supertype: TypeExpr) -> Self {
        self.supertype = Some(supertype);
        self
    }

    pub fn with_trait(mut self, t: TypeExpr) -> Self {
        self.traits.push(t);
        self
    }

    pub fn with_type_param(mut self, param: TypeParamDecl) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn with_property(mut self, property: PropertyDecl) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn open(mut self) -> Self {
        self.is_open = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_default_operators(mut self) -> Self {
        self.default_operators = true;
        self
    }

    pub fn into_decl(self) -> Decl {
        Decl::Aggregate(self)
    }
}

impl MethodDecl {
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn returning(mut self, ty: TypeExpr) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn pure(mut self) -> Self {
        self.is_pure = true;
        self
    }
}

impl FunctionDecl {
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_type_param(mut self, param: TypeParamDecl) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn returning(mut self, ty: TypeExpr) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    pub fn extending(mut self, supertype: TypeExpr) -> Self {
        self.supertype = Some(supertype);
        self
    }

    pub fn pure(mut self) -> Self {
        self.is_pure = true;
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn into_decl(self) -> Decl {
        Decl::Function(self)
    }
}

impl PropertyDecl {
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn initialized(mut self, value: Expr) -> Self {
        self.initializer = Some(value);
        self
    }
}

impl CompilationUnit {
    pub fn referencing(mut self, module: &str) -> Self {
        self.references.push(module.to_string());
        self
    }
}
