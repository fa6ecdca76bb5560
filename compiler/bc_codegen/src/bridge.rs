//! The address/pointer bridge (§4.3): converts between a B *word-address*
//! (an ordinary word value the source program can add to, store, and pass
//! around like any other number) and a genuine LLVM pointer.
//!
//! B defines `a[b]` as exactly `*(a + b)`, with the addition unscaled. For
//! that to step by whole words, the numeric value a program sees for "the
//! address of `x`" must already be expressed in word units, not bytes. The
//! bridge is where that scaling happens, at the two places a word-address
//! meets a real pointer: taking `&x` (pointer → word) and dereferencing
//! (word → pointer). Plain integer arithmetic in between never needs to
//! know it's touching an address at all.
//!
//! Each conversion also records a back-link (§9): the value it was derived
//! from, keyed by the produced value's identity in [`CodegenCtx::backlinks`].
//! The inverse conversion checks this table first, so a round trip like
//! `&*p`, or a vector cell reusing its own backing array's address, collapses
//! to reusing the original IR value (at most a bitcast) instead of emitting
//! fresh `ptrtoint`/`inttoptr` arithmetic.

use inkwell::builder::Builder;
use inkwell::values::{AsValueRef, IntValue, PointerValue};

use crate::context::CodegenCtx;
use crate::BcCodegenError;

/// The other side of a conversion a value was produced from, recorded so the
/// inverse conversion can reuse it verbatim.
#[derive(Debug, Clone, Copy)]
pub enum Backlink<'ll> {
    Address(IntValue<'ll>),
    Pointer(PointerValue<'ll>),
}

fn value_key<V: AsValueRef>(value: &V) -> usize {
    value.as_value_ref() as usize
}

/// Records that `addr` and `ptr` are each other's back-link, so converting
/// either one to the other's kind reuses the value recorded here.
fn link<'ll>(ctx: &CodegenCtx<'ll>, addr: IntValue<'ll>, ptr: PointerValue<'ll>) {
    let mut table = ctx.backlinks.borrow_mut();
    table.insert(value_key(&addr), Backlink::Pointer(ptr));
    table.insert(value_key(&ptr), Backlink::Address(addr));
}

fn word_shift_bits(ctx: &CodegenCtx) -> u64 {
    ctx.bytes_per_word().trailing_zeros() as u64
}

/// Computes a word-address constant for a pointer known at compile time
/// (global/function addresses used in initializers). Constants here are
/// never round-tripped back through [`word_to_ptr`], so no back-link
/// bookkeeping is needed.
pub fn const_ptr_to_word<'ll>(ctx: &CodegenCtx<'ll>, ptr: PointerValue<'ll>) -> IntValue<'ll> {
    let word_ty = ctx.word_type();
    let raw = ptr.const_to_int(word_ty);
    raw.const_lshr(word_ty.const_int(word_shift_bits(ctx), false))
}

/// Converts a pointer to its word-address value at a given point in a
/// function body (used by `&`). If `ptr` was itself produced by
/// [`word_to_ptr`] from some address, returns that address directly.
pub fn ptr_to_word<'ll>(
    ctx: &CodegenCtx<'ll>,
    builder: &Builder<'ll>,
    ptr: PointerValue<'ll>,
) -> Result<IntValue<'ll>, BcCodegenError> {
    if let Some(Backlink::Address(addr)) = ctx.backlinks.borrow().get(&value_key(&ptr)).copied() {
        return Ok(addr);
    }

    let word_ty = ctx.word_type();
    let raw = builder
        .build_ptr_to_int(ptr, word_ty, "addr2word")
        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
    let addr = builder
        .build_right_shift(raw, word_ty.const_int(word_shift_bits(ctx), false), false, "addr2word.shr")
        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
    link(ctx, addr, ptr);
    Ok(addr)
}

/// Converts a word-address value to a pointer suitable for load/store (used
/// by `*`, including the implicit deref behind `a[b]`). If `word` was itself
/// produced by [`ptr_to_word`] from some pointer, returns that pointer
/// directly rather than reconstructing it.
pub fn word_to_ptr<'ll>(
    ctx: &CodegenCtx<'ll>,
    builder: &Builder<'ll>,
    word: IntValue<'ll>,
) -> Result<PointerValue<'ll>, BcCodegenError> {
    if let Some(Backlink::Pointer(ptr)) = ctx.backlinks.borrow().get(&value_key(&word)).copied() {
        return Ok(ptr);
    }

    let word_ty = ctx.word_type();
    let raw = builder
        .build_left_shift(word, word_ty.const_int(word_shift_bits(ctx), false), "word2addr.shl")
        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
    let ptr = builder
        .build_int_to_ptr(raw, ctx.ptr_type(), "word2addr")
        .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
    link(ctx, word, ptr);
    Ok(ptr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn pointer_to_address_round_trip_reuses_the_same_pointer_value() {
        let ll_context = Context::create();
        let ctx = CodegenCtx::new(&ll_context, "test");
        let fn_val = ctx
            .ll_module
            .add_function("probe", ctx.word_type().fn_type(&[], false), None);
        let entry = ll_context.append_basic_block(fn_val, "entry");
        let builder = ll_context.create_builder();
        builder.position_at_end(entry);

        let slot = builder.build_alloca(ctx.word_type(), "slot").unwrap();
        let addr = ptr_to_word(&ctx, &builder, slot).unwrap();
        let back = word_to_ptr(&ctx, &builder, addr).unwrap();

        assert_eq!(back.as_value_ref(), slot.as_value_ref());
    }

    #[test]
    fn address_to_pointer_round_trip_reuses_the_same_address_value() {
        let ll_context = Context::create();
        let ctx = CodegenCtx::new(&ll_context, "test");
        let word_ty = ctx.word_type();
        let fn_val = ctx
            .ll_module
            .add_function("probe", word_ty.fn_type(&[word_ty.into()], false), None);
        let entry = ll_context.append_basic_block(fn_val, "entry");
        let builder = ll_context.create_builder();
        builder.position_at_end(entry);

        let param = fn_val.get_nth_param(0).unwrap().into_int_value();
        let ptr = word_to_ptr(&ctx, &builder, param).unwrap();
        let back = ptr_to_word(&ctx, &builder, ptr).unwrap();

        assert_eq!(back.as_value_ref(), param.as_value_ref());
    }
}
