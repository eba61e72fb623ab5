// AST node types for kernel definition bodies.
//
// The definition sublanguage is deliberately tiny: one `def`, counted and
// conditional loops, branches, (augmented) assignments, and a small
// expression grammar. Each supported construct is one variant of a closed
// sum type, so the lowering in `codegen` dispatches exhaustively and any
// grammar extension is a compile-time-checked addition.
//
// Preconditions: produced by the parser from a valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Definition ──

/// A complete kernel definition: `def name(params): body`.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ── Statements ──

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `for VAR in range(bounds...):` — bound arity is validated at lowering.
    For {
        var: Ident,
        bounds: Vec<Expr>,
        body: Vec<Stmt>,
    },
    /// `while TEST:` — the test must lower to a single comparison.
    While { test: Expr, body: Vec<Stmt> },
    /// `if TEST: ... else: ...` — the else arm may be empty.
    If {
        test: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    /// `TARGET = VALUE`
    Assign { target: Expr, value: Expr },
    /// `TARGET op= VALUE`
    AugAssign {
        target: Expr,
        op: AugOp,
        value: Expr,
    },
}

/// Compound-assignment operator. Only `Add` is lowerable; the others are
/// parsed so the transpiler can reject them by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugOp {
    Add,
    Sub,
    Mul,
}

impl AugOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AugOp::Add => "+=",
            AugOp::Sub => "-=",
            AugOp::Mul => "*=",
        }
    }
}

// ── Expressions ──

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Plain identifier. The name `i` is the thread-index sentinel.
    Name(String),
    /// Integer literal (unary minus is folded in by the parser).
    Int(i64),
    /// `True` / `False`.
    Bool(bool),
    /// `(lhs op rhs)` arithmetic.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Single comparison `lhs op rhs`.
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `base[index]`.
    Subscript { base: Box<Expr>, index: Box<Expr> },
    /// `callee(args...)` — arity is validated at lowering.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `body if test else orelse` — only valid as an assignment RHS.
    Ternary {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
        }
    }
}

/// Comparison operator. `Le` is parsed but has no lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

// ── Identifier ──

/// An identifier with its source text and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Expr {
    /// The leftmost name of an assignment target (`x` in `x[a][b]`), if any.
    pub fn root_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(n) => Some(n),
            ExprKind::Subscript { base, .. } => base.root_name(),
            _ => None,
        }
    }
}
