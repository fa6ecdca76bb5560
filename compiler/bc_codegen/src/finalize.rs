//! The finalizer (§4.8): runs once every top-level definition and function
//! body has been emitted. This crate resolves `goto` targets inline (every
//! label's block is pre-created before its function's body is walked, so
//! there is no deferred post-emit hook queue to drain here); the one
//! finalization step left is synthesizing `llvm.global_ctors` from whatever
//! constructors [`crate::init`] registered.

use inkwell::module::Linkage;
use inkwell::values::BasicValue;
use inkwell::AddressSpace;

use crate::context::CodegenCtx;

/// Appends the `llvm.global_ctors` array naming every registered constructor
/// at priority 0, if any were registered. A no-op for a program where every
/// initializer folded to a constant.
pub fn finalize(ctx: &CodegenCtx) {
    let ctors = ctx.ctors.borrow();
    if ctors.is_empty() {
        return;
    }

    let i32_ty = ctx.ll_context.i32_type();
    let ptr_ty = ctx.ptr_type();
    let entry_ty = ctx.ll_context.struct_type(&[i32_ty.into(), ptr_ty.into(), ptr_ty.into()], false);

    let entries: Vec<_> = ctors
        .iter()
        .map(|ctor| {
            entry_ty.const_named_struct(&[
                i32_ty.const_zero().into(),
                ctor.as_global_value().as_pointer_value().into(),
                ptr_ty.const_null().into(),
            ])
        })
        .collect();

    let array_ty = entry_ty.array_type(entries.len() as u32);
    let array_val = array_ty.const_array(&entries);

    let global = ctx
        .ll_module
        .add_global(array_ty, Some(AddressSpace::default()), "llvm.global_ctors");
    global.set_linkage(Linkage::Appending);
    global.set_initializer(&array_val.as_basic_value_enum());
}
