//! The declaration pass (§4.4): walk every top-level definition once and
//! pre-register it before any body is emitted, so a call or `extrn`
//! referencing a name defined later in the file still resolves.
//!
//! Every B name — scalar or vector, local or global — is a single word
//! cell. A scalar's cell holds its value directly. A vector's cell holds
//! the word-address of a separate backing array allocated alongside it
//! (the historical "back-link"); see [`crate::bridge`]. This module creates
//! both globals; [`crate::init`] fills in their initializers once every
//! name in the program has a declared cell to point at.

use bc_ast::{Definition, GlobalKind, GlobalScope, Program};
use inkwell::module::Linkage;
use inkwell::values::{BasicValue, GlobalValue};
use inkwell::AddressSpace;
use tracing::debug;

use crate::context::{mangle, CodegenCtx};
use crate::BcCodegenError;

/// Whether a definition's identifier denotes a vector (indirect, its cell
/// holds a data address) rather than a plain scalar (its cell holds the
/// value itself). A bracketed `name[n]` is always a vector; an unbracketed
/// `name` with more than one initializer is promoted to one, exactly as if
/// it had been written `name[]`.
pub fn is_vector_definition(def: &Definition) -> bool {
    match def {
        Definition::Function { .. } => false,
        Definition::Vector { .. } => true,
        Definition::Simple { ivals, .. } => ivals.len() > 1,
    }
}

pub fn declare_globals<'ll>(
    ctx: &CodegenCtx<'ll>,
    program: &Program,
) -> Result<GlobalScope, BcCodegenError> {
    let mut scope = GlobalScope::new();

    for def in &program.definitions {
        match def {
            Definition::Function { name, params, .. } => {
                scope
                    .declare(name, GlobalKind::Function)
                    .map_err(BcCodegenError::from)?;
                declare_function(ctx, name, params.len());
            }
            Definition::Vector {
                name,
                max_index,
                ivals,
            } => {
                scope
                    .declare(name, GlobalKind::Data)
                    .map_err(BcCodegenError::from)?;
                let len = bc_ast::vector_length(*max_index, ivals.len());
                declare_vector(ctx, name, len);
            }
            Definition::Simple { name, ivals } => {
                scope
                    .declare(name, GlobalKind::Data)
                    .map_err(BcCodegenError::from)?;
                if ivals.len() > 1 {
                    declare_vector(ctx, name, ivals.len() as u64);
                } else {
                    declare_scalar(ctx, name);
                }
            }
        }
    }

    Ok(scope)
}

fn declare_function<'ll>(ctx: &CodegenCtx<'ll>, name: &str, arity: usize) {
    if ctx.get_function(name).is_some() {
        return;
    }
    let word_ty = ctx.word_type();
    let param_tys = vec![word_ty.into(); arity];
    let fn_ty = word_ty.fn_type(&param_tys, false);
    let fn_val = ctx
        .ll_module
        .add_function(&mangle(name), fn_ty, Some(Linkage::External));
    fn_val.as_global_value().set_alignment(ctx.bytes_per_word() as u32);
    debug!("declared function `{name}` with arity {arity}");
    ctx.functions.borrow_mut().insert(name.to_string(), fn_val);
}

/// Declares the single-word cell for a scalar definition, zero-initialized
/// until [`crate::init::emit_initializers`] fills it in.
fn declare_scalar<'ll>(ctx: &CodegenCtx<'ll>, name: &str) {
    if ctx.get_global(name).is_some() {
        return;
    }
    let word_ty = ctx.word_type();
    let global = ctx
        .ll_module
        .add_global(word_ty, Some(AddressSpace::default()), &mangle(name));
    global.set_linkage(Linkage::External);
    global.set_alignment(ctx.bytes_per_word() as u32);
    global.set_initializer(&word_ty.const_zero().as_basic_value_enum());
    debug!("declared scalar `{name}`");
    ctx.globals.borrow_mut().insert(name.to_string(), global);
}

/// Declares a vector's cell (`name`, externally visible) and its backing
/// array of `len` words (`name$data`, private — nothing ever names it
/// directly, only through the cell's back-link).
fn declare_vector<'ll>(ctx: &CodegenCtx<'ll>, name: &str, len: u64) {
    if ctx.get_global(name).is_some() {
        return;
    }
    let word_ty = ctx.word_type();

    let data_name = format!("{name}$data");
    let array_ty = word_ty.array_type(len as u32);
    let data_global = ctx
        .ll_module
        .add_global(array_ty, Some(AddressSpace::default()), &format!("{}$data", mangle(name)));
    data_global.set_linkage(Linkage::Private);
    data_global.set_unnamed_addr(true);
    data_global.set_alignment(ctx.bytes_per_word() as u32);
    data_global.set_initializer(&array_ty.const_zero().as_basic_value_enum());

    let cell_global = ctx
        .ll_module
        .add_global(word_ty, Some(AddressSpace::default()), &mangle(name));
    cell_global.set_linkage(Linkage::External);
    cell_global.set_alignment(ctx.bytes_per_word() as u32);
    cell_global.set_initializer(&word_ty.const_zero().as_basic_value_enum());

    debug!("declared vector `{name}` with {len} words");
    ctx.globals.borrow_mut().insert(name.to_string(), cell_global);
    ctx.globals.borrow_mut().insert(data_name, data_global);
}

/// Declares the zero-initialized, weak-linkage-equivalent global an `extrn`
/// of a name outside this translation unit falls back to (§3, §4.6): the
/// first mention creates the storage, a repeated one reuses it, and a real
/// strong definition linked in from elsewhere wins over this stub.
pub fn declare_extern_fallback<'ll>(ctx: &CodegenCtx<'ll>, name: &str) -> GlobalValue<'ll> {
    if let Some(existing) = ctx.get_global(name) {
        return existing;
    }
    let word_ty = ctx.word_type();
    let global = ctx
        .ll_module
        .add_global(word_ty, Some(AddressSpace::default()), &mangle(name));
    global.set_linkage(Linkage::WeakAny);
    global.set_alignment(ctx.bytes_per_word() as u32);
    global.set_initializer(&word_ty.const_zero().as_basic_value_enum());
    debug!("declared auxiliary external `{name}`");
    ctx.globals.borrow_mut().insert(name.to_string(), global);
    global
}
