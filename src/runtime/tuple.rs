use crate::{
    runtime::{allocator, ModuleDef},
    wasm::ir::{Func, Instr, Local, ValType},
};

pub const NAME: &str = "tuple";
pub const NEW:  &str = "tuple_new";
pub const GET0: &str = "tuple_get0";
pub const GET1: &str = "tuple_get1";

/// Pairs of words on the heap, the building block of
/// environments, list cells, and closures.
pub fn module(pages: u32) -> ModuleDef {
    let new = Func::words(NEW, &["first", "second"], vec![
        Instr::I32Const(8),
        Instr::call(allocator::MALLOC),
        Instr::local_tee("address"),
        Instr::local_get("first"),
        Instr::store(ValType::I32, 0),
        Instr::local_get("address"),
        Instr::local_get("second"),
        Instr::store(ValType::I32, 4),
        Instr::local_get("address"),
    ]).with_local(Local::i32("address"));

    let get = |name: &str, offset: u32| Func::words(name, &["address"], vec![
        Instr::local_get("address"),
        Instr::load(ValType::I32, offset),
    ]);

    ModuleDef::funcs(NAME, vec![new, get(GET0, 0), get(GET1, 4)], vec![allocator::module(pages)])
}
