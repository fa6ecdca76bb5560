//! The parser-shaped tree handed to the semantic builder.
//!
//! Nothing here resolves operator precedence, decodes literal text, or
//! validates that an expression used as an assignment target is actually an
//! lvalue — those are the semantic builder's job (see `bc_ast`). This tree
//! only records what the grammar saw.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProgram {
    pub definitions: Vec<ParseDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDefinition {
    Function {
        name: String,
        params: Vec<String>,
        body: ParseStmt,
    },
    Vector {
        name: String,
        max_index: Option<String>,
        ivals: Vec<ParseIval>,
    },
    Simple {
        name: String,
        ivals: Vec<ParseIval>,
    },
}

/// A raw initializer token: text is kept exactly as lexed, to be decoded by
/// the semantic builder (octal/decimal, escapes, big-endian char packing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseIval {
    Ident(String),
    Number(String),
    Char(String),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStmt {
    Auto(Vec<(String, Option<String>)>),
    Extrn(Vec<String>),
    Compound(Vec<ParseStmt>),
    If(ParseExpr, Box<ParseStmt>, Option<Box<ParseStmt>>),
    While(ParseExpr, Box<ParseStmt>),
    Switch(ParseExpr, Box<ParseStmt>),
    Case(String, Box<ParseStmt>),
    Default(Box<ParseStmt>),
    Break,
    Return(Option<ParseExpr>),
    Goto(ParseExpr),
    Label(String, Box<ParseStmt>),
    Null,
    Expr(ParseExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Or,
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
pub enum PrefixOp {
    Incr,
    Decr,
    Neg,
    Not,
    Complement,
    Deref,
    AddrOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Incr,
    Decr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseExpr {
    Assign {
        op: AssignOp,
        lhs: Box<ParseExpr>,
        rhs: Box<ParseExpr>,
    },
    Ternary {
        cond: OperatorChain,
        then_branch: Box<ParseExpr>,
        else_branch: Box<ParseExpr>,
    },
    Chain(OperatorChain),
}

/// An unresolved left-to-right operand/operator chain, e.g. `a + b * c` is
/// `OperatorChain { first: a, rest: [(Add, b), (Mul, c)] }` with no
/// precedence applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorChain {
    pub first: ParseUnary,
    pub rest: Vec<(BinOp, ParseUnary)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseUnary {
    pub prefix: Vec<PrefixOp>,
    pub postfix_expr: ParsePostfixExpr,
    pub trailing: Vec<PostfixOp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePostfixExpr {
    pub primary: ParsePrimary,
    pub suffixes: Vec<ParseSuffix>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseSuffix {
    Index(Box<ParseExpr>),
    Call(Vec<ParseExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsePrimary {
    Paren(Box<ParseExpr>),
    Number(String),
    Char(String),
    Str(String),
    Ident(String),
}
