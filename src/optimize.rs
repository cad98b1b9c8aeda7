//! Peephole passes over a linked module.
//! Both are purely syntactic and preserve what a program computes.

use tracing::debug;

use crate::{
    runtime::{env, float},
    wasm::ir::{Func, Instr, Module},
};

/// Runs every pass over every function of the module.
pub fn optimize(module: &mut Module) {
    for func in module.funcs_mut() {
        let before = size(&func.body);
        reduce_float_instructions(func);
        reduce_env_pops(func);
        debug!(func = %func.name, before, after = size(&func.body), "optimized");
    }
}

/// Counts instructions, including those nested in blocks.
pub fn size(body: &[Instr]) -> usize {
    body.iter().map(|instr| match instr {
        Instr::If { then, otherwise, .. } => 1 + size(then) + size(otherwise),
        _ => 1,
    }).sum()
}

fn is_call(instr: &Instr, name: &str) -> bool {
    matches!(instr, Instr::Call(called) if called == name)
}

/// One pass of box/unbox elision: a float boxed only to be
/// unboxed again on the next instruction stays unboxed.
/// Returns whether anything changed.
fn elide_boxes(body: &mut Vec<Instr>) -> bool {
    let mut changed = false;
    let mut out: Vec<Instr> = Vec::with_capacity(body.len());

    for mut instr in body.drain(..) {
        if let Instr::If { then, otherwise, .. } = &mut instr {
            changed |= elide_boxes(then);
            changed |= elide_boxes(otherwise);
        }

        let boxed = out.last().map_or(false, |last| is_call(last, float::NEW));
        if boxed && is_call(&instr, float::GET) {
            out.pop();
            changed = true;
        } else {
            out.push(instr);
        }
    }

    *body = out;
    changed
}

/// Removes every `call $float_new` immediately followed by `call $float_get`,
/// repeating until nothing changes.
pub fn reduce_float_instructions(func: &mut Func) {
    while elide_boxes(&mut func.body) {}
}

fn ends_with_pop(body: &[Instr]) -> bool {
    match body {
        [.., Instr::LocalGet(get), Instr::Call(call), Instr::LocalSet(set)] => {
            get == env::LOCAL && call == env::PARENT && set == env::LOCAL
        },
        _ => false,
    }
}

/// Restoring the environment is pointless as the last thing a function does,
/// since nothing reads it afterwards. Strips such restores off the end
/// of the function body, repeatedly.
pub fn reduce_env_pops(func: &mut Func) {
    while ends_with_pop(&func.body) {
        let len = func.body.len();
        func.body.truncate(len - 3);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wasm::ir::{Local, ValType};

    fn func(body: Vec<Instr>) -> Func {
        Func {
            name:   "f".to_string(),
            params: vec![Local::i32("env")],
            result: Some(ValType::I32),
            locals: vec![],
            body,
        }
    }

    fn pop() -> Vec<Instr> {
        vec![Instr::local_get("env"), Instr::call("env_parent"), Instr::local_set("env")]
    }

    #[test]
    fn nested_boxes_collapse() {
        let mut f = func(vec![
            Instr::F64Const(1.0),
            Instr::call("float_new"),
            Instr::call("float_new"),
            Instr::call("float_get"),
            Instr::call("float_get"),
            Instr::call("float_new"),
        ]);
        reduce_float_instructions(&mut f);
        assert_eq!(f.body, vec![Instr::F64Const(1.0), Instr::call("float_new")]);
    }

    #[test]
    fn boxes_inside_blocks() {
        let mut f = func(vec![Instr::I32Const(3), Instr::if_i32(
            vec![Instr::F64Const(2.0), Instr::call("float_new"), Instr::call("float_get"), Instr::call("float_new")],
            vec![Instr::I32Const(0)],
        )]);
        reduce_float_instructions(&mut f);
        assert_eq!(size(&f.body), 5);
    }

    #[test]
    fn trailing_pops() {
        let mut body = vec![Instr::I32Const(1)];
        body.extend(pop());
        body.extend(pop());
        let mut f = func(body);
        reduce_env_pops(&mut f);
        assert_eq!(f.body, vec![Instr::I32Const(1)]);
    }

    #[test]
    fn inner_pops_stay() {
        let mut body = pop();
        body.push(Instr::I32Const(1));
        let mut f = func(body.clone());
        reduce_env_pops(&mut f);
        assert_eq!(f.body, body);
    }
}
