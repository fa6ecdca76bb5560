//! Fills in the initializer for every global definition's cell (and, for
//! vectors, its backing array), once the declaration pass has pre-registered
//! every name in the program. Must run before any function body is emitted,
//! so a forward reference like `f[2] g;` (`g` defined later in the source)
//! resolves to `g`'s real address.
//!
//! A vector's backing array is always filled by a synthesized constructor
//! (§4.7) — "any vector with an initializer list" takes the constructor path
//! unconditionally, even when every element happens to be a literal. A
//! scalar's cell only needs a constructor when its own initializer is not a
//! compile-time constant; under this grammar's `ival` production (a number,
//! a name, or a string) that branch is never actually taken, since every
//! form folds to a constant address or integer, but the rule itself is
//! unconditional and the branch stays in place for it.

use bc_ast::{Definition, Ival, Program};
use inkwell::builder::Builder;
use inkwell::module::Linkage;
use inkwell::values::{BasicValue, IntValue};
use tracing::instrument;

use crate::bridge::const_ptr_to_word;
use crate::context::CodegenCtx;
use crate::declare::is_vector_definition;
use crate::BcCodegenError;

#[instrument(skip(ctx, program))]
pub fn emit_initializers<'ll>(
    ctx: &CodegenCtx<'ll>,
    program: &Program,
) -> Result<(), BcCodegenError> {
    for def in &program.definitions {
        let (name, ivals) = match def {
            Definition::Function { .. } => continue,
            Definition::Vector { name, ivals, .. } => (name, ivals),
            Definition::Simple { name, ivals } => (name, ivals),
        };

        if is_vector_definition(def) {
            emit_vector_initializer(ctx, name, ivals)?;
        } else {
            emit_scalar_initializer(ctx, name, ivals.first())?;
        }
    }

    Ok(())
}

fn emit_scalar_initializer<'ll>(
    ctx: &CodegenCtx<'ll>,
    name: &str,
    ival: Option<&Ival>,
) -> Result<(), BcCodegenError> {
    let cell = ctx
        .get_global(name)
        .ok_or_else(|| BcCodegenError::Ice(format!("`{name}` was not predeclared")))?;
    match ival {
        None => {
            cell.set_initializer(&ctx.word_type().const_zero().as_basic_value_enum());
        }
        Some(ival) if is_constant_ival(ctx, ival) => {
            let word = ival_to_word(ctx, ival)?;
            cell.set_initializer(&word.as_basic_value_enum());
        }
        Some(ival) => {
            cell.set_initializer(&ctx.word_type().const_zero().as_basic_value_enum());
            let ival = ival.clone();
            let cell_ptr = cell.as_pointer_value();
            synthesize_ctor(ctx, name, move |ctx, builder| {
                let word = ival_to_word(ctx, &ival)?;
                builder
                    .build_store(cell_ptr, word)
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))?;
                Ok(())
            })?;
        }
    }
    Ok(())
}

/// A vector's backing array is never given a static initializer list: every
/// element, even a plain literal, is stored by a synthesized constructor
/// (§4.7's "any vector with an initializer list"), so the declaration pass's
/// zero-initialized array stays the array's only compile-time initializer.
fn emit_vector_initializer<'ll>(ctx: &CodegenCtx<'ll>, name: &str, ivals: &[Ival]) -> Result<(), BcCodegenError> {
    let word_ty = ctx.word_type();
    let cell = ctx
        .get_global(name)
        .ok_or_else(|| BcCodegenError::Ice(format!("`{name}` was not predeclared")))?;
    let data = ctx
        .get_global(&format!("{name}$data"))
        .ok_or_else(|| BcCodegenError::Ice(format!("`{name}$data` was not predeclared")))?;

    let data_ptr = data.as_pointer_value();
    let backlink = const_ptr_to_word(ctx, data_ptr);
    cell.set_initializer(&backlink.as_basic_value_enum());

    if ivals.is_empty() {
        return Ok(());
    }

    let ivals = ivals.to_vec();
    synthesize_ctor(ctx, name, move |ctx, builder| {
        for (i, ival) in ivals.iter().enumerate() {
            let word = ival_to_word(ctx, ival)?;
            let index = ctx.ll_context.i32_type().const_int(i as u64, false);
            let slot = unsafe {
                builder
                    .build_gep(word_ty, data_ptr, &[index], "ival.slot")
                    .map_err(|e| BcCodegenError::Ice(e.to_string()))?
            };
            builder.build_store(slot, word).map_err(|e| BcCodegenError::Ice(e.to_string()))?;
        }
        Ok(())
    })
}

/// Whether `ival` folds to a compile-time LLVM constant. Every form this
/// grammar admits does; kept as a named predicate because §4.7's rule is
/// phrased in terms of it, not because any call site currently sees `false`.
fn is_constant_ival(ctx: &CodegenCtx, ival: &Ival) -> bool {
    match ival {
        Ival::Number(_) | Ival::Str(_) => true,
        Ival::Name(name) => ctx.get_global(name).is_some() || ctx.get_function(name).is_some(),
    }
}

fn ival_to_word<'ll>(ctx: &CodegenCtx<'ll>, ival: &Ival) -> Result<IntValue<'ll>, BcCodegenError> {
    let word_ty = ctx.word_type();
    Ok(match ival {
        Ival::Number(n) => word_ty.const_int(*n as u64, true),
        Ival::Name(name) => {
            if let Some(global) = ctx.get_global(name) {
                const_ptr_to_word(ctx, global.as_pointer_value())
            } else if let Some(func) = ctx.get_function(name) {
                const_ptr_to_word(ctx, func.as_global_value().as_pointer_value())
            } else {
                return Err(BcCodegenError::Semantic(format!(
                    "initializer refers to undeclared name `{name}`"
                )));
            }
        }
        Ival::Str(bytes) => {
            let ptr = ctx
                .strings
                .borrow_mut()
                .intern(&ctx.ll_module, bytes, ctx.bytes_per_word() as u32);
            const_ptr_to_word(ctx, ptr)
        }
    })
}

/// Synthesizes a private void function named `__ctor.<name>` whose body is
/// built by `emit_body`, and registers it in [`CodegenCtx::ctors`] for the
/// finalizer to drain into `llvm.global_ctors` (§4.7, §4.8).
fn synthesize_ctor<'ll>(
    ctx: &CodegenCtx<'ll>,
    name: &str,
    emit_body: impl FnOnce(&CodegenCtx<'ll>, &Builder<'ll>) -> Result<(), BcCodegenError>,
) -> Result<(), BcCodegenError> {
    let fn_ty = ctx.ll_context.void_type().fn_type(&[], false);
    let ctor = ctx
        .ll_module
        .add_function(&format!("__ctor.{name}"), fn_ty, Some(Linkage::Private));
    let entry = ctx.ll_context.append_basic_block(ctor, "entry");
    let builder = ctx.ll_context.create_builder();
    builder.position_at_end(entry);

    emit_body(ctx, &builder)?;

    builder.build_return(None).map_err(|e| BcCodegenError::Ice(e.to_string()))?;
    ctx.ctors.borrow_mut().push(ctor);
    Ok(())
}
