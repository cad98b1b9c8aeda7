use crate::{
    runtime::{env, list, ModuleDef},
    wasm::ir::{Func, Instr},
};

pub const NAME:       &str = "matcher";
pub const WILDCARD:   &str = "match_wildcard";
pub const EMPTY_LIST: &str = "match_empty_list";
pub const IDENTIFIER: &str = "match_identifier";

/// The word a matcher returns when the value does not match.
pub const FAILURE: i32 = 0;

/// Matching primitives.
/// A matcher takes the environment to extend and the value to inspect,
/// and returns the extended environment, or zero on failure.
/// Zero is never a valid environment: the root is -1,
/// and every frame lives at a non-zero address.
pub fn module(pages: u32) -> ModuleDef {
    let params = ["env", "value"];

    let wildcard = Func::words(WILDCARD, &params, vec![Instr::local_get("env")]);

    let empty_list = Func::words(EMPTY_LIST, &params, vec![
        Instr::local_get("value"),
        Instr::call(list::IS_EMPTY),
        Instr::if_i32(vec![Instr::local_get("env")], vec![Instr::I32Const(FAILURE)]),
    ]);

    let identifier = Func::words(IDENTIFIER, &params, vec![
        Instr::local_get("env"),
        Instr::local_get("value"),
        Instr::call(env::NEW),
    ]);

    ModuleDef::funcs(
        NAME,
        vec![wildcard, empty_list, identifier],
        vec![list::module(pages), env::module(pages)],
    )
}
