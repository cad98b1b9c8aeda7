use crate::{
    runtime::{tuple, ModuleDef},
    wasm::ir::{Func, Instr, Op},
};

pub const NAME:   &str = "environment";
pub const NEW:    &str = "env_new";
pub const GET:    &str = "env_get";
pub const PARENT: &str = "env_parent";

/// The local holding the current environment in every compiled function.
pub const LOCAL:  &str = "env";

/// Environments form a cactus stack: each frame is a (parent, value) pair,
/// and many frames may share one parent.
/// Extending an environment never disturbs the frames below it,
/// so closures can hold onto them.
pub fn module(pages: u32) -> ModuleDef {
    let new = Func::words(NEW, &["parent", "value"], vec![
        Instr::local_get("parent"),
        Instr::local_get("value"),
        Instr::call(tuple::NEW),
    ]);

    // walks `depth` parents up, then reads the value of that frame
    let get = Func::words(GET, &["env", "depth"], vec![
        Instr::local_get("depth"),
        Instr::op(Op::I32Eqz),
        Instr::if_i32(
            vec![Instr::local_get("env"), Instr::call(tuple::GET1)],
            vec![
                Instr::local_get("env"),
                Instr::call(tuple::GET0),
                Instr::local_get("depth"),
                Instr::I32Const(1),
                Instr::op(Op::I32Sub),
                Instr::call(GET),
            ],
        ),
    ]);

    let parent = Func::words(PARENT, &["env"], vec![
        Instr::local_get("env"),
        Instr::call(tuple::GET0),
    ]);

    ModuleDef::funcs(NAME, vec![new, get, parent], vec![tuple::module(pages)])
}
