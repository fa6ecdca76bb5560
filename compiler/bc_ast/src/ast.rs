//! The AST the semantic builder produces and the declaration/emission passes
//! consume.
//!
//! Every value in B is a word; there is no separate "index expression" node
//! because `a[b]` is folded to `*(a + b)` during building (see
//! [`crate::builder`]), so the emission pass only ever has to know how to
//! emit `Deref` and `Binary(Add, ..)`, not a third indexing form.
//!
//! A handful of [`Expr`] variants are *referenceable*: they can stand on the
//! left of `=`, or have their address taken with `&`. [`Expr::as_place`]
//! is the single place that decides this, mirroring the address/pointer
//! bridge's l-value/r-value duality.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Function {
        name: String,
        params: Vec<String>,
        body: Stmt,
    },
    /// A bracketed vector definition, `name[max_index] ival, ival, ...;`.
    /// Its allocated length is reconciled from `max_index` and the
    /// initializer count by [`crate::builder::vector_length`].
    Vector {
        name: String,
        max_index: Option<u64>,
        ivals: Vec<Ival>,
    },
    /// An unbracketed definition, `name ival, ival, ...;`. A single (or
    /// absent) initializer is a plain scalar word; more than one promotes
    /// it to a vector sized to the initializer count, exactly as `name[]`
    /// would (original B does not require brackets for a multi-word
    /// external).
    Simple { name: String, ivals: Vec<Ival> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ival {
    Number(i64),
    /// The address of another top-level name, e.g. `f[2] g;` stores the
    /// address of `g` in `f[0]`.
    Name(String),
    Str(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `auto` declarations in one statement, each either a plain scalar
    /// (`None`) or a vector reserving `Some(extra_words)` beyond the first.
    Auto(Vec<(String, Option<u64>)>),
    Extrn(Vec<String>),
    Compound(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Switch {
        scrutinee: Expr,
        body: Box<Stmt>,
    },
    Case {
        value: i64,
        body: Box<Stmt>,
    },
    Default {
        body: Box<Stmt>,
    },
    Break,
    Return(Option<Expr>),
    /// `goto` to a (typically forward-declared) label. Only bare-identifier
    /// targets are supported; anything else is a semantic error, since
    /// computed `goto` is outside this frontend's testable scenarios.
    Goto(String),
    Label {
        name: String,
        body: Box<Stmt>,
    },
    Null,
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Shl,
    Shr,
    Le,
    Ge,
    Eq,
    Ne,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinOp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i64),
    Str(Vec<u8>),
    Ident(String),
    Deref(Box<Expr>),
    AddrOf(Box<Expr>),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Complement(Box<Expr>),
    PreIncr(Box<Expr>),
    PreDecr(Box<Expr>),
    PostIncr(Box<Expr>),
    PostDecr(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// The `__bytes_per_word` builtin (§4.5): a target-dependent constant
    /// resolved at emission time, not at build time, so the same AST could
    /// in principle be re-emitted for a different target.
    BytesPerWord,
}

/// A node that can be *referenced*: assigned to, or have its address taken.
/// `a[b]` is not listed because the builder already desugars it to
/// `Deref(Binary(Add, a, b))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    Ident(String),
    Deref(Expr),
}

impl Expr {
    /// Classifies this expression as a place (l-value) if it can stand on
    /// the left of `=` or be operated on by `&`. Returns `None` for pure
    /// r-values such as literals, arithmetic results, and calls.
    pub fn as_place(&self) -> Option<Place> {
        match self {
            Expr::Ident(name) => Some(Place::Ident(name.clone())),
            Expr::Deref(inner) => Some(Place::Deref((**inner).clone())),
            _ => None,
        }
    }
}
