//! Predicate expression syntax tree.

/// Source span for error reporting.
/// Uses byte offsets into the source string.
pub type Span = std::ops::Range<usize>;

/// AST node with source location and unique ID.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    /// Unique identifier for this node (1-indexed, assigned during parsing)
    pub id: i64,
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(id: i64, node: T, span: Span) -> Self {
        Self { id, node, span }
    }
}

/// A spanned expression.
pub type SpannedExpr = Spanned<Expr>;

/// Literal values as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Decimal literal (`19.99m`), kept as source text so no precision is lost
    /// before the runtime picks a representation.
    Decimal(String),
    Char(char),
    String(String),
}

/// Predicate expression.
///
/// The grammar is expression-only: there is no statement, declaration or loop
/// node, so nothing produced by the parser can iterate on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),

    /// Bare identifier (`item`, `Math`, `x`).
    Ident(String),

    /// Member access: `target.name`
    Member {
        target: Box<SpannedExpr>,
        name: String,
    },

    /// Call: `callee(args...)`. Method calls have a `Member` callee.
    Call {
        callee: Box<SpannedExpr>,
        args: Vec<SpannedExpr>,
    },

    /// Index: `target[index]`
    Index {
        target: Box<SpannedExpr>,
        index: Box<SpannedExpr>,
    },

    Unary {
        op: UnaryOp,
        operand: Box<SpannedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<SpannedExpr>,
        right: Box<SpannedExpr>,
    },
    Conditional {
        cond: Box<SpannedExpr>,
        then_expr: Box<SpannedExpr>,
        else_expr: Box<SpannedExpr>,
    },

    /// Array literal: `[a, b]` or `new[] { a, b }`
    Array(Vec<SpannedExpr>),

    /// Single-parameter lambda: `x => body`
    Lambda {
        param: String,
        body: Box<SpannedExpr>,
    },

    /// `typeof(Name)`. Kept as its own node so it can be rejected
    /// structurally rather than by name.
    TypeOf(String),
}

impl Expr {
    /// Returns the dotted path of an identifier/member chain (`a.b.c`), or
    /// `None` if the chain is rooted at anything other than an identifier.
    pub fn dotted_path(&self) -> Option<Vec<&str>> {
        match self {
            Expr::Ident(name) => Some(vec![name.as_str()]),
            Expr::Member { target, name } => {
                let mut path = target.node.dotted_path()?;
                path.push(name.as_str());
                Some(path)
            }
            _ => None,
        }
    }

    /// Returns the root identifier of a member chain, walking through
    /// member accesses only.
    pub fn chain_root(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            Expr::Member { target, .. } => target.node.chain_root(),
            _ => None,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`)
    Neg,
    /// Logical negation (`!`)
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// The operator as written in source.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}
