//! AST node definitions and source spans for coffer.
//!
//! This crate defines the syntax tree handed to the checker by the parser.
//! Every node carries a [`Span`] for source location tracking. Only the
//! constructs that touch box types are modelled in detail; the rest of the
//! language appears in the reduced form needed to type box operands.

/// Identifies a source file in the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic span for compiler-generated nodes.
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

pub type TypeExpr = Spanned<TypeExprKind>;

/// Direction of a channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExprKind {
    /// A type name: `int`, `string`, `Point`.
    Name(String),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `[N]T`
    Array { len: u64, elem: Box<TypeExpr> },
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `chan T`, `chan<- T`, `<-chan T`
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    /// `func(params) results`
    Func(FuncTypeExpr),
    /// `struct { fields }`
    Struct(Vec<FieldExpr>),
    /// `interface { methods }`
    Interface(Vec<MethodExpr>),
    /// `box { T1; T2; ... }`
    Box(BoxTypeExpr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncTypeExpr {
    pub params: Vec<TypeExpr>,
    pub results: Vec<TypeExpr>,
    pub variadic: bool,
}

/// A struct field. `name == None` marks an embedded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExpr {
    pub name: Option<Spanned<String>>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodExpr {
    pub name: Spanned<String>,
    pub sig: FuncTypeExpr,
}

/// The variant list of a box type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxTypeExpr {
    pub variants: Vec<TypeExpr>,
}

// ---------------------------------------------------------------------------
// Literals and expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i128),
    Float(f64),
    Rune(char),
    String(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value (an untyped constant).
    Lit(Lit),

    /// Variable reference.
    Name(String),

    /// Composite literal `T{...}`. Element expressions are not modelled; the
    /// literal has type `T`.
    Composite(TypeExpr),

    /// Function call: `f(args)`.
    Call { func: Spanned<String>, args: Vec<Expr> },

    /// Conversion: `T(x)`.
    Convert { ty: TypeExpr, value: Box<Expr> },

    /// Type assertion: `x.(T)`.
    TypeAssert { value: Box<Expr>, ty: TypeExpr },

    /// Binary operation: `lhs op rhs`.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

pub type Block = Vec<Stmt>;

pub type Stmt = Spanned<StmtKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `var name T = value`
    Var(VarDecl),

    /// `a, b := value`
    Define {
        names: Vec<Spanned<String>>,
        value: Expr,
    },

    /// `name = value`
    Assign { target: Spanned<String>, value: Expr },

    /// `return values...`
    Return(Vec<Expr>),

    /// `if cond { ... } else { ... }`
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },

    /// An expression evaluated for its effects.
    Expr(Expr),

    /// `switch binding := subject.(type) { clauses }`
    TypeSwitch(TypeSwitch),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Spanned<String>,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSwitch {
    pub binding: Option<Spanned<String>>,
    pub subject: Expr,
    pub clauses: Vec<CaseClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseClause {
    pub kind: CaseKind,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseKind {
    /// `case T1, T2:`
    Types(Vec<TypeExpr>),
    /// `default:`
    Default,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// `type Name T` or, with `alias`, `type Name = T`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: Spanned<String>,
    pub alias: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub results: Vec<TypeExpr>,
    pub body: Block,
}

pub type Decl = Spanned<DeclKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Type(TypeDecl),
    Func(FuncDecl),
    Var(VarDecl),
}

/// A single source file's top-level declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub file: FileId,
    /// Package path used to qualify named types at run time.
    pub package: String,
    pub decls: Vec<Decl>,
}

impl Module {
    pub fn new(file: FileId, package: impl Into<String>) -> Self {
        Self {
            file,
            package: package.into(),
            decls: Vec::new(),
        }
    }

    pub fn type_decls(&self) -> impl Iterator<Item = &TypeDecl> {
        self.decls.iter().filter_map(|decl| match &decl.node {
            DeclKind::Type(def) => Some(def),
            _ => None,
        })
    }

    pub fn func_decls(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter().filter_map(|decl| match &decl.node {
            DeclKind::Func(func) => Some(func),
            _ => None,
        })
    }
}
