use crate::{
    common::tag::Tag,
    runtime::{allocator, tag, untag, ModuleDef},
    wasm::ir::{Func, Instr, Local, ValType},
};

pub const NAME: &str = "float";
pub const NEW:  &str = "float_new";
pub const GET:  &str = "float_get";

/// Boxed 64-bit floats. Every arithmetic result is a fresh box.
pub fn module(pages: u32) -> ModuleDef {
    let mut boxed = vec![
        Instr::I32Const(8),
        Instr::call(allocator::MALLOC),
        Instr::local_tee("address"),
        Instr::local_get("value"),
        Instr::store(ValType::F64, 0),
        Instr::local_get("address"),
    ];
    boxed.extend(tag(Tag::Float));
    let new = Func {
        name:   NEW.to_string(),
        params: vec![Local::new("value", ValType::F64)],
        result: Some(ValType::I32),
        locals: vec![Local::i32("address")],
        body:   boxed,
    };

    let mut unboxed = vec![Instr::local_get("boxed")];
    unboxed.extend(untag());
    unboxed.push(Instr::load(ValType::F64, 0));
    let get = Func {
        name:   GET.to_string(),
        params: vec![Local::i32("boxed")],
        result: Some(ValType::F64),
        locals: vec![],
        body:   unboxed,
    };

    ModuleDef::funcs(NAME, vec![new, get], vec![allocator::module(pages)])
}
