//! Lowers a desugared program (`bc_ast`) straight to LLVM IR (§4). There is
//! no intermediate flat IR: declaration, initializer emission, and function
//! bodies are each a direct walk of the AST against one [`CodegenCtx`].

pub mod bridge;
pub mod context;
pub mod declare;
pub mod finalize;
pub mod func;
pub mod init;
pub mod strings;
pub mod value;

use std::fmt;

use bc_ast::Program;
use inkwell::context::Context;
use inkwell::module::Module;
use tracing::instrument;

pub use context::CodegenCtx;

/// Two-kind error policy (§7), mirroring `bc_ast::BcError`: a `Semantic`
/// error is a malformed program (an unresolved name, a misplaced `case`); an
/// `Ice` is this crate breaking one of its own invariants, such as an
/// inkwell builder call failing on IR it constructed itself.
#[derive(Debug, Clone)]
pub enum BcCodegenError {
    Semantic(String),
    Ice(String),
}

impl fmt::Display for BcCodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BcCodegenError::Semantic(msg) => write!(f, "{msg}"),
            BcCodegenError::Ice(msg) => write!(f, "internal codegen error: {msg}"),
        }
    }
}

impl std::error::Error for BcCodegenError {}

impl From<bc_ast::BcError> for BcCodegenError {
    fn from(err: bc_ast::BcError) -> Self {
        match err {
            bc_ast::BcError::Semantic(msg) => BcCodegenError::Semantic(msg),
            bc_ast::BcError::Ice(msg) => BcCodegenError::Ice(msg),
        }
    }
}

/// Runs the full pipeline over an already-built program: declare every
/// top-level name, fill in global initializers, then emit every function
/// body. Returns the populated module; nothing here writes to disk, that's
/// the CLI driver's job.
#[instrument(skip(ll_context, program))]
pub fn compile_program<'ll>(
    ll_context: &'ll Context,
    module_name: &str,
    program: &Program,
) -> Result<Module<'ll>, BcCodegenError> {
    let ctx = CodegenCtx::new(ll_context, module_name);

    let scope = declare::declare_globals(&ctx, program)?;
    init::emit_initializers(&ctx, program)?;

    for def in &program.definitions {
        if matches!(def, bc_ast::Definition::Function { .. }) {
            func::emit_function(&ctx, &scope, def)?;
        }
    }

    finalize::finalize(&ctx);
    Ok(ctx.ll_module)
}
