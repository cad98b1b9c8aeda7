use crate::{
    common::tag::HEAP_START,
    runtime::ModuleDef,
    wasm::ir::{Export, ExportKind, Field, Func, Global, Instr, Local, Memory, Op},
};

pub const NAME:   &str = "allocator";
pub const MALLOC: &str = "malloc";
pub const MEMORY: &str = "memory";

const HEAP_TOP: &str = "heap_top";

/// A bump allocator over a single linear memory of `pages` pages.
/// Nothing is ever freed; the cursor only moves forward.
/// Address zero is never handed out, so no boxed word is zero.
pub fn module(pages: u32) -> ModuleDef {
    let malloc = Func::words(MALLOC, &["size"], vec![
        Instr::global_get(HEAP_TOP),
        Instr::local_tee("address"),
        Instr::local_get("size"),
        Instr::op(Op::I32Add),
        Instr::global_set(HEAP_TOP),
        Instr::local_get("address"),
    ]).with_local(Local::i32("address"));

    ModuleDef::new(NAME, vec![
        Field::Memory(Memory { name: MEMORY.to_string(), pages }),
        Field::Global(Global { name: HEAP_TOP.to_string(), mutable: true, init: HEAP_START }),
        Field::Func(malloc),
        Field::Export(Export {
            name:   MEMORY.to_string(),
            kind:   ExportKind::Memory,
            target: MEMORY.to_string(),
        }),
    ], vec![])
}
