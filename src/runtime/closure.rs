use crate::{
    common::tag::Tag,
    runtime::{tag, tuple, untag, ModuleDef},
    wasm::ir::{Func, Instr},
};

pub const NAME:  &str = "closure";
pub const NEW:   &str = "closure_new";
pub const ENV:   &str = "closure_env";
pub const INDEX: &str = "closure_index";

/// The call table holding the code of every function literal.
pub const TABLE: &str = "closures";
/// The signature shared by every function literal:
/// it takes its environment and returns its result.
pub const TYPE:  &str = "closure_fn";

/// Closures pair the environment a function literal was evaluated in
/// with the slot of its code in the call table.
pub fn module(pages: u32) -> ModuleDef {
    let mut new = vec![
        Instr::local_get("env"),
        Instr::local_get("index"),
        Instr::call(tuple::NEW),
    ];
    new.extend(tag(Tag::Closure));
    let new = Func::words(NEW, &["env", "index"], new);

    let field = |name: &str, get: &str| {
        let mut body = vec![Instr::local_get("closure")];
        body.extend(untag());
        body.push(Instr::call(get));
        Func::words(name, &["closure"], body)
    };

    ModuleDef::funcs(
        NAME,
        vec![new, field(ENV, tuple::GET0), field(INDEX, tuple::GET1)],
        vec![tuple::module(pages)],
    )
}
