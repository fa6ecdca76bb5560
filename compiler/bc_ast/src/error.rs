use std::fmt;

/// Errors the frontend can report.
///
/// Mirrors the two-kind split the pipeline actually needs: a `Semantic`
/// error for malformed-but-parseable input (undeclared identifiers,
/// duplicate declarations, `break`/`case` outside a `switch`, ...) and an
/// `Ice` ("internal compiler error") for states that should be unreachable
/// given a valid AST, reported instead of unwound so the driver can print a
/// uniform message and exit non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BcError {
    Semantic(String),
    Ice(String),
}

impl BcError {
    pub fn semantic(msg: impl Into<String>) -> Self {
        BcError::Semantic(msg.into())
    }

    pub fn ice(msg: impl Into<String>) -> Self {
        BcError::Ice(msg.into())
    }
}

impl fmt::Display for BcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BcError::Semantic(msg) => write!(f, "semantic error: {msg}"),
            BcError::Ice(msg) => write!(f, "internal compiler error: {msg}"),
        }
    }
}

impl std::error::Error for BcError {}

pub type BcResult<T> = Result<T, BcError>;
