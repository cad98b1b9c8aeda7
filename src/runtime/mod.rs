//! The runtime library linked into every compiled program.
//! Each module is a handful of WebAssembly functions built in place,
//! together with the modules it calls into.
//! The linker pulls in only what a program asked for.

pub mod allocator;
pub mod closure;
pub mod comparator;
pub mod env;
pub mod float;
pub mod list;
pub mod matcher;
pub mod tuple;

use crate::{
    common::tag::{Tag, TAG_SHIFT},
    wasm::ir::{Field, Func, Instr, Op},
};

/// A runtime module, before linking.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDef {
    /// Modules are deduplicated by name when linked.
    pub name:         String,
    pub fields:       Vec<Field>,
    pub dependencies: Vec<ModuleDef>,
}

impl ModuleDef {
    pub fn new(name: &str, fields: Vec<Field>, dependencies: Vec<ModuleDef>) -> ModuleDef {
        ModuleDef {
            name: name.to_string(),
            fields,
            dependencies,
        }
    }

    /// A module made only of functions.
    pub fn funcs(name: &str, funcs: Vec<Func>, dependencies: Vec<ModuleDef>) -> ModuleDef {
        ModuleDef::new(name, funcs.into_iter().map(Field::Func).collect(), dependencies)
    }
}

/// Turns the address on top of the stack into a boxed word.
pub fn tag(tag: Tag) -> Vec<Instr> {
    vec![
        Instr::I32Const(TAG_SHIFT),
        Instr::op(Op::I32Shl),
        Instr::I32Const(tag.bits()),
        Instr::op(Op::I32Or),
    ]
}

/// Turns the boxed word on top of the stack back into its address.
pub fn untag() -> Vec<Instr> {
    vec![Instr::I32Const(TAG_SHIFT), Instr::op(Op::I32ShrU)]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::link::Builder;

    #[test]
    fn every_module_links_alone() {
        let all = [
            allocator::module(1),
            tuple::module(1),
            env::module(1),
            list::module(1),
            float::module(1),
            closure::module(1),
            matcher::module(1),
        ];
        for def in all {
            let module = Builder::new(def.clone()).build()
                .unwrap_or_else(|e| panic!("{}: {}", def.name, e));
            assert!(module.funcs().count() >= 1, "{} is empty", def.name);
        }
    }

    #[test]
    fn pages_reach_the_allocator() {
        let def = env::module(3);
        let allocator = &def.dependencies[0].dependencies[0];
        assert_eq!(allocator.name, allocator::NAME);
        assert!(allocator.fields.iter().any(|field| matches!(
            field,
            Field::Memory(memory) if memory.pages == 3
        )));
    }

    #[test]
    fn tags_shift_then_mark() {
        assert_eq!(tag(Tag::List), vec![
            Instr::I32Const(4),
            Instr::op(Op::I32Shl),
            Instr::I32Const(0b0100),
            Instr::op(Op::I32Or),
        ]);
    }
}
