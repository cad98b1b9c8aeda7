use crate::{
    common::tag::{Tag, EMPTY_LIST},
    runtime::{tag, tuple, untag, ModuleDef},
    wasm::ir::{Func, Instr, Op},
};

pub const NAME:     &str = "list";
pub const NEW:      &str = "list_new";
pub const PUSH:     &str = "list_push";
pub const IS_EMPTY: &str = "list_is_empty";
pub const HEAD:     &str = "list_head";
pub const TAIL:     &str = "list_tail";

/// Immutable singly linked lists.
/// The empty list is the zero word; a cell is a (tail, head) tuple
/// whose address is tagged as a list.
pub fn module(pages: u32) -> ModuleDef {
    let new = Func::words(NEW, &[], vec![Instr::I32Const(EMPTY_LIST)]);

    let mut push = vec![
        Instr::local_get("list"),
        Instr::local_get("value"),
        Instr::call(tuple::NEW),
    ];
    push.extend(tag(Tag::List));
    let push = Func::words(PUSH, &["list", "value"], push);

    let is_empty = Func::words(IS_EMPTY, &["list"], vec![
        Instr::local_get("list"),
        Instr::op(Op::I32Eqz),
    ]);

    let field = |name: &str, get: &str| {
        let mut body = vec![Instr::local_get("list")];
        body.extend(untag());
        body.push(Instr::call(get));
        Func::words(name, &["list"], body)
    };

    ModuleDef::funcs(
        NAME,
        vec![new, push, is_empty, field(HEAD, tuple::GET1), field(TAIL, tuple::GET0)],
        vec![tuple::module(pages)],
    )
}
