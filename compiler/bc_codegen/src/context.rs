//! The emit context: process-wide mutable state threaded through the
//! declaration and emission passes (§4.2). Holds the LLVM context/module,
//! the maps from source name to the LLVM value already declared for it, the
//! string-constant pool, and the list of constructor functions the
//! finalizer stitches into `llvm.global_ctors`.

use std::cell::RefCell;
use std::collections::HashMap;

use bc_abi::target::{BackendKind, Target};
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::targets::{TargetData, TargetTriple};
use inkwell::types::{IntType, PointerType};
use inkwell::values::{FunctionValue, GlobalValue};
use inkwell::AddressSpace;
use tracing::instrument;

use crate::strings::StringPool;

pub struct CodegenCtx<'ll> {
    pub ll_context: &'ll Context,
    pub ll_module: Module<'ll>,
    pub target: Target,

    /// Functions already declared, by source name. Populated by the
    /// declaration pass; functions are visible everywhere without `extrn`,
    /// so this map doubles as the answer to "does this name exist".
    pub functions: RefCell<HashMap<String, FunctionValue<'ll>>>,

    /// Scalar/vector globals already declared, by source name.
    pub globals: RefCell<HashMap<String, GlobalValue<'ll>>>,

    pub strings: RefCell<StringPool<'ll>>,

    /// Per-definition initializer functions (`__ctor.<name>`) registered by
    /// the declaration pass when a global's initializer is not a compile-time
    /// constant (§4.7). Drained by the finalizer into `llvm.global_ctors`.
    pub ctors: RefCell<Vec<FunctionValue<'ll>>>,

    /// The address/pointer bridge's back-link table (§4.3, §9): each side of
    /// a word-address/pointer conversion records the value it was converted
    /// from, keyed by the *other* side's IR value identity (its raw value
    /// pointer, as a `usize`), so the inverse conversion can reuse it
    /// instead of re-deriving it.
    pub backlinks: RefCell<HashMap<usize, crate::bridge::Backlink<'ll>>>,
}

impl<'ll> CodegenCtx<'ll> {
    #[instrument(skip(ll_context))]
    pub fn new(ll_context: &'ll Context, module_name: &str) -> Self {
        let target = Target::new(BackendKind::Llvm);
        let ll_module = ll_context.create_module(module_name);

        let triple_string = target
            .target_triple_string()
            .unwrap_or_else(|| "x86_64-unknown-linux-gnu".to_string());
        ll_module.set_triple(&TargetTriple::create(&triple_string));
        ll_module.set_data_layout(&TargetData::create(&target.data_layout_string()).get_data_layout());

        CodegenCtx {
            ll_context,
            ll_module,
            target,
            functions: RefCell::new(HashMap::new()),
            globals: RefCell::new(HashMap::new()),
            strings: RefCell::new(StringPool::new()),
            ctors: RefCell::new(Vec::new()),
            backlinks: RefCell::new(HashMap::new()),
        }
    }

    pub fn bytes_per_word(&self) -> u64 {
        self.target.bytes_per_word()
    }

    pub fn word_type(&self) -> IntType<'ll> {
        self.ll_context.custom_width_int_type((self.bytes_per_word() * 8) as u32)
    }

    pub fn ptr_type(&self) -> PointerType<'ll> {
        self.ll_context.ptr_type(AddressSpace::default())
    }

    pub fn get_function(&self, name: &str) -> Option<FunctionValue<'ll>> {
        self.functions.borrow().get(name).copied()
    }

    pub fn get_global(&self, name: &str) -> Option<GlobalValue<'ll>> {
        self.globals.borrow().get(name).copied()
    }
}

/// Prepends `b.` to an externally visible B symbol (§4.3, §6), so the
/// emitted IR can never collide with a C-callable identifier. Every global
/// or function this crate hands to `add_global`/`add_function` goes through
/// here; the maps in [`CodegenCtx`] still key on the bare source name.
pub fn mangle(name: &str) -> String {
    format!("b.{name}")
}
