//! The string-constant pool: every distinct string literal in the source
//! becomes one private, unnamed, word-aligned global, terminated with B's
//! `0x04` byte (there is no NUL terminator in this dialect; see
//! `examples/original_source/rbc/codegen/context.py`'s
//! `get_or_create_string_constant`, which this pool mirrors byte-for-byte
//! down to the cache-by-content behavior).

use std::collections::HashMap;

use inkwell::module::{Linkage, Module};
use inkwell::values::PointerValue;
use inkwell::AddressSpace;

/// B string constant terminator. Not NUL: NUL is a legal character inside a
/// B string, so the language uses a byte outside the printable range that a
/// program can still test for with `if (c == '*e')`.
pub const STRING_TERMINATOR: u8 = 0x04;

pub struct StringPool<'ll> {
    next_id: u32,
    interned: HashMap<Vec<u8>, PointerValue<'ll>>,
}

impl<'ll> StringPool<'ll> {
    pub fn new() -> Self {
        StringPool {
            next_id: 0,
            interned: HashMap::new(),
        }
    }

    /// Interns `bytes` (without its terminator) as a global, returning the
    /// existing one if this exact byte sequence has already been interned
    /// (quantified invariant 5).
    pub fn intern(&mut self, ll_module: &Module<'ll>, bytes: &[u8], align_bytes: u32) -> PointerValue<'ll> {
        if let Some(existing) = self.interned.get(bytes) {
            return *existing;
        }

        let name = format!("__str.{}", self.next_id);
        self.next_id += 1;

        let context = ll_module.get_context();
        let mut data = bytes.to_vec();
        data.push(STRING_TERMINATOR);

        let i8_ty = context.i8_type();
        let const_bytes = i8_ty.const_array(
            &data
                .iter()
                .map(|b| i8_ty.const_int(*b as u64, false))
                .collect::<Vec<_>>(),
        );

        let global = ll_module.add_global(const_bytes.get_type(), Some(AddressSpace::default()), &name);
        global.set_initializer(&const_bytes);
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);
        global.set_alignment(align_bytes);

        let ptr = global.as_pointer_value();
        self.interned.insert(bytes.to_vec(), ptr);
        ptr
    }
}

impl<'ll> Default for StringPool<'ll> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn interned_strings_get_distinct_names_and_a_terminator_byte() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut pool = StringPool::new();

        let a = pool.intern(&module, b"hi", 8);
        let b = pool.intern(&module, b"there", 8);
        assert_ne!(a.get_name(), b.get_name());

        let global = module.get_global("__str.0").expect("first string global");
        let printed = global.print_to_string().to_string();
        assert!(printed.contains("[3 x i8]"));
    }

    #[test]
    fn identical_byte_contents_reuse_the_same_global() {
        let context = Context::create();
        let module = context.create_module("test");
        let mut pool = StringPool::new();

        let a = pool.intern(&module, b"hi", 8);
        let b = pool.intern(&module, b"hi", 8);
        assert_eq!(a.get_name(), b.get_name());
        assert!(module.get_global("__str.1").is_none());
    }
}
