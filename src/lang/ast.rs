//! # Cinder syntax tree
//!
//! The tree is produced by the parser and is the only input of the optimizer
//! and the code generator. Every node kind is a closed enum so that each pass
//! is a plain `match` over the variants.
//!
//! ## Shape
//!
//! - A [`Program`] is a list of struct definitions and function definitions.
//! - Function bodies are lists of [`Stmt`].
//! - Expressions are [`Expr`]: either a "basic" expression wrapping an
//!   [`RValue`], a unary `not`, or a binary operation.
//! - A [`VarPath`] (`a`, `a[i]`, `a.b[i].c`) is shared by assignment targets
//!   and variable reads.

use super::span::Span;

/// A name together with where it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// The element type named by a [`DataType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    Int,
    Double,
    Bool,
    String,
    /// Only valid as a function return type.
    Void,
    /// A user-defined struct.
    Struct(String),
}

impl TypeName {
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            TypeName::Int | TypeName::Double | TypeName::Bool | TypeName::String
        )
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Int => write!(f, "int"),
            TypeName::Double => write!(f, "double"),
            TypeName::Bool => write!(f, "bool"),
            TypeName::String => write!(f, "string"),
            TypeName::Void => write!(f, "void"),
            TypeName::Struct(name) => write!(f, "{}", name),
        }
    }
}

/// A declared type: `int`, `Node`, `[double]`, ...
///
/// Arrays are one level deep; `[[int]]` is not expressible.
#[derive(Debug, Clone, PartialEq)]
pub struct DataType {
    pub name: TypeName,
    pub is_array: bool,
    pub span: Span,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_array {
            write!(f, "[{}]", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub structs: Vec<StructDef>,
    pub functions: Vec<FunDef>,
}

/// A `name: type` pair, used for struct fields and function parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: Ident,
    pub ty: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Ident,
    /// Fields in declaration order; constructor arguments follow this order.
    pub fields: Vec<VarDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDef {
    pub name: Ident,
    pub return_type: DataType,
    pub params: Vec<VarDef>,
    pub body: Vec<Stmt>,
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var x = e`, `var x: T`, `var x: T = e`
    Var(VarStmt),
    /// `path = e`
    Assign(AssignStmt),
    /// `return e`
    Return(ReturnStmt),
    While(WhileStmt),
    For(ForStmt),
    /// `if` with any number of `else if` branches and an optional `else`.
    If(IfStmt),
    /// A call used as a statement; its result is discarded.
    Call(CallExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarStmt {
    pub name: Ident,
    pub ty: Option<DataType>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: VarPath,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// `for v from lo to hi { ... }` iterates `v` over `lo..=hi`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var: Ident,
    pub from: Expr,
    pub to: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// The `if` branch followed by each `else if`, in source order. Never empty.
    pub branches: Vec<Branch>,
    pub else_body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }

    /// Binding strength used by the precedence-climbing parser.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Mul | BinOp::Div => 4,
            BinOp::Add | BinOp::Sub => 3,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 2,
            BinOp::And => 1,
            BinOp::Or => 0,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_relational(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }
}

/// Literal payloads as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Double(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "int",
            Literal::Double(_) => "double",
            Literal::Bool(_) => "bool",
            Literal::Str(_) => "string",
            Literal::Null => "null",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A single r-value with no operator applied.
    Basic(RValue),
    Unary {
        op: UnaryOp,
        span: Span,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        span: Span,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn literal(value: Literal, span: Span) -> Self {
        Expr::Basic(RValue::Literal { value, span })
    }

    pub fn binary(op: BinOp, span: Span, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            span,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Returns the literal if this expression is nothing but a literal.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expr::Basic(RValue::Literal { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Span of the leftmost token of the expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Basic(rvalue) => rvalue.span(),
            Expr::Unary { span, .. } => *span,
            Expr::Binary { lhs, .. } => lhs.span(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    Literal {
        value: Literal,
        span: Span,
    },
    Var(VarPath),
    Call(CallExpr),
    /// `new Name(a, b, ...)`
    NewStruct {
        name: Ident,
        args: Vec<Expr>,
    },
    /// `new T[size]`
    NewArray {
        elem: DataType,
        size: Box<Expr>,
    },
}

impl RValue {
    pub fn span(&self) -> Span {
        match self {
            RValue::Literal { span, .. } => *span,
            RValue::Var(path) => path.root().name.span,
            RValue::Call(call) => call.name.span,
            RValue::NewStruct { name, .. } => name.span,
            RValue::NewArray { elem, .. } => elem.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: Ident,
    pub args: Vec<Expr>,
}

/// One `name` or `name[index]` step of a [`VarPath`].
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: Ident,
    pub index: Option<Expr>,
}

/// A non-empty chain of field accesses and array indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct VarPath {
    segments: Vec<PathSegment>,
}

impl VarPath {
    pub fn new(root: PathSegment) -> Self {
        VarPath {
            segments: vec![root],
        }
    }

    /// A plain variable reference `name`.
    pub fn simple(name: Ident) -> Self {
        VarPath::new(PathSegment { name, index: None })
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn root(&self) -> &PathSegment {
        &self.segments[0]
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Rebuilds the path segment by segment; the length never changes.
    pub fn map_segments(self, f: impl FnMut(PathSegment) -> PathSegment) -> Self {
        VarPath {
            segments: self.segments.into_iter().map(f).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
