//! Target-facing ABI facts: word size, alignment, and the LLVM data layout
//! string the frontend stamps on every module it creates.
//!
//! B has exactly one scalar type (the word), so this crate is much smaller
//! than a typed-language equivalent would be: there is no per-type layout
//! computation, only the handful of facts needed to pick a pointer width
//! and align globals and the string-constant pool consistently.

pub mod size_and_align;
pub mod target;
