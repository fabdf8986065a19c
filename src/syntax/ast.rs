//! Syntax tree for the supported Java subset.
//!
//! The tree shape is fixed by the parser; content can be mutated through the
//! primitives on `Block`, `TypeDecl` and `CompilationUnit`. Statement order in
//! a `Block` is execution order.

use std::fmt;

/// Unique statement identity within one compilation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
    /// Next unused statement id
    pub next_id: u32,
}

impl CompilationUnit {
    /// Find a type declaration by simple name, searching nested types too
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find_map(|ty| ty.find_type(name))
    }

    pub fn find_type_mut(&mut self, name: &str) -> Option<&mut TypeDecl> {
        self.types.iter_mut().find_map(|ty| ty.find_type_mut(name))
    }

    /// Package-qualified name of a top-level or nested type
    pub fn qualified_name(&self, name: &str) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, name),
            None => name.to_string(),
        }
    }

    /// Mint a statement with a fresh id
    pub fn fresh_stmt(&mut self, kind: StmtKind) -> Stmt {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Stmt { id, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub is_static: bool,
    pub path: String,
    pub wildcard: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: String,
    /// `None` for a marker annotation, `Some` when parentheses were written
    pub args: Option<Vec<Expr>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    pub annotations: Vec<Annotation>,
    pub keywords: Vec<String>,
}

impl Modifiers {
    pub fn has(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }
}

/// A (possibly qualified, generic, array) type reference
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub segments: Vec<TypeSegment>,
    pub dims: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSegment {
    pub name: String,
    /// `Some(vec![])` is the diamond `<>`
    pub args: Option<Vec<TypeArg>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeArg {
    Type(TypeRef),
    Wildcard(Option<(WildcardBound, TypeRef)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardBound {
    Extends,
    Super,
}

pub const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            segments: vec![TypeSegment {
                name: name.into(),
                args: None,
            }],
            dims: 0,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.segments.len() == 1
            && self.segments[0].args.is_none()
            && PRIMITIVE_TYPES.contains(&self.segments[0].name.as_str())
    }

    pub fn is_void(&self) -> bool {
        self.dims == 0 && self.segments.len() == 1 && self.segments[0].name == "void"
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            if let Some(args) = &segment.args {
                f.write_str("<")?;
                for (j, arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")?;
            }
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Type(ty) => write!(f, "{}", ty),
            TypeArg::Wildcard(None) => f.write_str("?"),
            TypeArg::Wildcard(Some((WildcardBound::Extends, ty))) => write!(f, "? extends {}", ty),
            TypeArg::Wildcard(Some((WildcardBound::Super, ty))) => write!(f, "? super {}", ty),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
}

/// Class, interface, enum or record declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub modifiers: Modifiers,
    pub kind: TypeKind,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    /// `permits` clause of a sealed type
    pub permits: Vec<TypeRef>,
    /// Header components of a record; they are also its fields
    pub record_components: Vec<Param>,
    pub enum_constants: Vec<EnumConstant>,
    pub members: Vec<Member>,
}

impl TypeDecl {
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        if self.name == name {
            return Some(self);
        }
        self.members.iter().find_map(|member| match member {
            Member::Type(nested) => nested.find_type(name),
            _ => None,
        })
    }

    pub fn find_type_mut(&mut self, name: &str) -> Option<&mut TypeDecl> {
        if self.name == name {
            return Some(self);
        }
        self.members.iter_mut().find_map(|member| match member {
            Member::Type(nested) => nested.find_type_mut(name),
            _ => None,
        })
    }

    pub fn add_member(&mut self, member: Member) {
        self.members.push(member);
    }

    /// Names this declaration binds directly (fields, methods, nested types)
    pub fn member_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for member in &self.members {
            match member {
                Member::Field(field) => names.extend(field.declarators.iter().map(|d| d.name.as_str())),
                Member::Method(method) => names.push(method.name.as_str()),
                Member::Type(nested) => names.push(nested.name.as_str()),
                Member::Constructor(_) | Member::Initializer(_) => {}
            }
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    pub args: Option<Vec<Expr>>,
    /// Constant-specific class body
    pub body: Option<Vec<Member>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Initializer(Initializer),
    Type(TypeDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub declarators: Vec<Declarator>,
}

/// One `name[] = init` part of a field or local declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub dims: usize,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub varargs: bool,
    pub name: String,
    pub dims: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    pub return_type: TypeRef,
    pub name: String,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    /// `None` for abstract and interface methods
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    pub name: String,
    /// Record compact form, written without a parameter list
    pub compact: bool,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    pub is_static: bool,
    pub body: Block,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    /// Insert at `pos`, shifting later statements back by one
    pub fn insert(&mut self, pos: usize, stmt: Stmt) {
        let pos = pos.min(self.stmts.len());
        self.stmts.insert(pos, stmt);
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.stmts.iter().position(|stmt| stmt.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Block),
    LocalVar(LocalVar),
    LocalClass(Box<TypeDecl>),
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: ForInit,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    ForEach {
        modifiers: Modifiers,
        ty: TypeRef,
        name: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expr),
    Yield(Expr),
    Try {
        resources: Vec<Resource>,
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Switch {
        selector: Expr,
        cases: Vec<SwitchCase>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Synchronized {
        lock: Expr,
        body: Block,
    },
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    Empty,
}

/// Local variable declaration statement
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Empty,
    Decl(LocalVar),
    Exprs(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Decl {
        modifiers: Modifiers,
        ty: TypeRef,
        name: String,
        init: Expr,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub modifiers: Modifiers,
    pub types: Vec<TypeRef>,
    pub name: String,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    Case(Vec<Expr>),
    Default,
}

/// One `case ...:` or `case ... ->` arm
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub label: CaseLabel,
    pub arrow: bool,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Float,
    Char,
    String,
    TextBlock,
    Bool,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Source spelling, quotes included
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    pub ty: Option<TypeRef>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    This,
    Super,
    /// A type in expression position (`String[]::new`, `int.class`)
    Type(TypeRef),
    FieldAccess {
        target: Box<Expr>,
        name: String,
    },
    MethodCall {
        target: Option<Box<Expr>>,
        type_args: Vec<TypeArg>,
        name: String,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
        body: Option<Vec<Member>>,
    },
    NewArray {
        element: TypeRef,
        dims: Vec<Expr>,
        extra_dims: usize,
        init: Option<Vec<Expr>>,
    },
    ArrayInit(Vec<Expr>),
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    Postfix {
        op: String,
        operand: Box<Expr>,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: TypeRef,
        binding: Option<String>,
    },
    Lambda {
        params: Vec<LambdaParam>,
        parenthesized: bool,
        body: LambdaBody,
    },
    MethodRef {
        target: Box<Expr>,
        name: String,
    },
    ClassLit(TypeRef),
    Paren(Box<Expr>),
    Switch {
        selector: Box<Expr>,
        cases: Vec<SwitchCase>,
    },
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn string(value: &str) -> Self {
        Expr::Literal(Literal {
            kind: LiteralKind::String,
            text: format!("\"{}\"", value),
        })
    }

    /// `Target.name(args)` where target is a plain (possibly dotted) name
    pub fn static_call(target: &str, name: &str, args: Vec<Expr>) -> Self {
        Expr::MethodCall {
            target: Some(Box::new(Expr::name(target))),
            type_args: Vec::new(),
            name: name.to_string(),
            args,
        }
    }

    /// Root variable name of `x`, `x[i]`, `x[i][j]`
    pub fn base_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            Expr::Index { target, .. } => target.base_name(),
            Expr::Paren(inner) => inner.base_name(),
            _ => None,
        }
    }
}
