//! Name resolution: a linked chain of block scopes, backed by a global
//! scope of top-level definitions and, per function, an external table
//! populated by `extrn` statements.
//!
//! Function names are visible everywhere without `extrn` (the declaration
//! pass pre-registers every function before any body is emitted, so calls
//! never need an explicit import); scalar and vector globals must be
//! brought into a function with `extrn` before they can be read, written,
//! or addressed, matching the historical implementation's `externals`
//! table (`examples/original_source/rbc/codegen/statement.py`).

use std::collections::HashMap;

use crate::error::{BcError, BcResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKind {
    Function,
    Data,
}

/// What a resolved name refers to, from the emission pass's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// An `auto` local: an address in the current stack frame.
    Local,
    /// A top-level name, visible either because it is a function (always
    /// visible) or because it was brought in by `extrn`.
    Global(GlobalKind),
}

/// The set of top-level names the declaration pass has pre-registered,
/// shared read-only by every function's scope chain.
#[derive(Debug, Default)]
pub struct GlobalScope {
    names: HashMap<String, GlobalKind>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, kind: GlobalKind) -> BcResult<()> {
        if self.names.insert(name.to_string(), kind).is_some() {
            return Err(BcError::semantic(format!(
                "duplicate top-level definition of `{name}`"
            )));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<GlobalKind> {
        self.names.get(name).copied()
    }
}

/// A chain of block scopes for one function body, plus that function's
/// `extrn` table.
pub struct Scope<'g> {
    globals: &'g GlobalScope,
    externs: HashMap<String, GlobalKind>,
    blocks: Vec<HashMap<String, ()>>,
}

impl<'g> Scope<'g> {
    pub fn new(globals: &'g GlobalScope) -> Self {
        Scope {
            globals,
            externs: HashMap::new(),
            blocks: vec![HashMap::new()],
        }
    }

    pub fn enter_block(&mut self) {
        self.blocks.push(HashMap::new());
    }

    pub fn exit_block(&mut self) {
        self.blocks.pop();
        debug_assert!(
            !self.blocks.is_empty(),
            "exit_block must not pop the function's outermost scope"
        );
    }

    pub fn declare_local(&mut self, name: &str) -> BcResult<()> {
        let innermost = self
            .blocks
            .last_mut()
            .expect("a Scope always has at least one block");
        if innermost.insert(name.to_string(), ()).is_some() {
            return Err(BcError::semantic(format!(
                "`{name}` is already declared in this scope"
            )));
        }
        Ok(())
    }

    /// Brings `name` into this function's external table. A name the
    /// declaration pass already knows about (a function, or a global
    /// defined elsewhere in this translation unit) keeps its real kind. A
    /// name with no defining translation unit still succeeds: it is an
    /// auxiliary external — a symbol linked in from elsewhere (the runtime,
    /// a library) — which this compiler always treats as data, never a
    /// direct-called function. A second `extrn` of the same name resolves
    /// to the same storage either way.
    pub fn declare_extrn(&mut self, name: &str) -> BcResult<()> {
        let kind = self.globals.get(name).unwrap_or(GlobalKind::Data);
        self.externs.insert(name.to_string(), kind);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> BcResult<Binding> {
        if self.blocks.iter().rev().any(|block| block.contains_key(name)) {
            return Ok(Binding::Local);
        }
        if let Some(kind) = self.externs.get(name) {
            return Ok(Binding::Global(*kind));
        }
        if let Some(GlobalKind::Function) = self.globals.get(name) {
            return Ok(Binding::Global(GlobalKind::Function));
        }
        Err(BcError::semantic(format!("undeclared identifier `{name}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_are_visible_without_extrn() {
        let mut globals = GlobalScope::new();
        globals.declare("helper", GlobalKind::Function).unwrap();
        let scope = Scope::new(&globals);
        assert_eq!(
            scope.resolve("helper").unwrap(),
            Binding::Global(GlobalKind::Function)
        );
    }

    #[test]
    fn data_globals_require_extrn() {
        let mut globals = GlobalScope::new();
        globals.declare("count", GlobalKind::Data).unwrap();
        let mut scope = Scope::new(&globals);
        assert!(scope.resolve("count").is_err());
        scope.declare_extrn("count").unwrap();
        assert_eq!(
            scope.resolve("count").unwrap(),
            Binding::Global(GlobalKind::Data)
        );
    }

    #[test]
    fn extrn_of_unknown_name_falls_back_to_auxiliary_data() {
        let globals = GlobalScope::new();
        let mut scope = Scope::new(&globals);
        scope.declare_extrn("putchar").unwrap();
        assert_eq!(
            scope.resolve("putchar").unwrap(),
            Binding::Global(GlobalKind::Data)
        );
    }

    #[test]
    fn locals_shadow_globals_and_vanish_on_block_exit() {
        let mut globals = GlobalScope::new();
        globals.declare("x", GlobalKind::Function).unwrap();
        let mut scope = Scope::new(&globals);
        scope.enter_block();
        scope.declare_local("x").unwrap();
        assert_eq!(scope.resolve("x").unwrap(), Binding::Local);
        scope.exit_block();
        assert_eq!(
            scope.resolve("x").unwrap(),
            Binding::Global(GlobalKind::Function)
        );
    }
}
