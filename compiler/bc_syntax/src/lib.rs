//! A small `pest`-based lexer/parser for the subset of B this frontend
//! targets, standing in for the upstream grammar collaborator the rest of
//! the compiler treats as an external dependency.
//!
//! This crate only produces a parser-shaped tree (see [`tree`]): it does not
//! resolve operator precedence, decode literal text, or validate lvalues.
//! That work belongs to `bc_ast`'s semantic builder.

pub mod parser;
pub mod tree;

pub use parser::{ParseError, parse_program};
pub use tree::*;
