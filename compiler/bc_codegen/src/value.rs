//! Backend value shapes.
//!
//! B has exactly one scalar type, the word, so this is much flatter than a
//! typed-language equivalent: a place is always a pointer to a word, and an
//! operand is always a word-sized integer. There is no scalar-pair/ZST
//! distinction to carry around.

use inkwell::values::{IntValue, PointerValue};

/// An addressable location: the target of `auto`, `extrn` data, vector
/// elements, and anything reached through `&`/`*`.
#[derive(Debug, Clone, Copy)]
pub struct PlaceRef<'ll> {
    pub ptr: PointerValue<'ll>,
}

impl<'ll> PlaceRef<'ll> {
    pub fn new(ptr: PointerValue<'ll>) -> Self {
        PlaceRef { ptr }
    }
}

/// A computed word value with no fixed home.
#[derive(Debug, Clone, Copy)]
pub struct OperandRef<'ll> {
    pub value: IntValue<'ll>,
}

impl<'ll> OperandRef<'ll> {
    pub fn new(value: IntValue<'ll>) -> Self {
        OperandRef { value }
    }
}

/// A local variable's storage. Every `auto` gets a stack slot rather than an
/// SSA register, even when never addressed: B programs are free to take the
/// address of any local with `&`, so there is no equivalent of `PendingOperandRef`
/// to optimize away the alloca speculatively.
#[derive(Debug, Clone, Copy)]
pub struct LocalRef<'ll> {
    pub place: PlaceRef<'ll>,
}
