//! The semantic layer between the parser and codegen: a desugared AST, the
//! builder that produces it from `bc_syntax`'s parser-shaped tree, and the
//! scope chain codegen's declaration/emission passes use to resolve names.

pub mod ast;
pub mod builder;
pub mod error;
pub mod scope;

pub use ast::*;
pub use builder::{build_program, vector_length, BuildConfig};
pub use error::{BcError, BcResult};
pub use scope::{Binding, GlobalKind, GlobalScope, Scope};
