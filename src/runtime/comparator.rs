use std::collections::BTreeSet;

use crate::{
    common::tag::{Tag, INT_FLAG, TAG_MASK},
    compiler::ast::Comparison,
    runtime::{float, list, ModuleDef},
    wasm::ir::{Func, Instr, Local, Op, ValType},
};

pub const NAME: &str = "comparator";

/// Name of the polymorphic comparison function for `op`.
pub fn function(op: Comparison) -> String {
    format!("compare_{}", op.suffix())
}

/// Name of the list comparison function for `op`.
pub fn list_function(op: Comparison) -> String {
    format!("compare_list_{}", op.suffix())
}

/// What a program needs from its comparator module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub ops:    BTreeSet<Comparison>,
    /// Whether the program boxes floats at all.
    pub floats: bool,
    /// Whether the program builds list cells at all.
    pub lists:  bool,
}

impl Request {
    /// Every function that has to exist to serve the requested operators.
    /// Inequality is negated equality.
    /// Lists compare heads for equality,
    /// and the non-strict orderings compare heads strictly.
    pub fn closure(&self) -> BTreeSet<Comparison> {
        let mut ops = self.ops.clone();
        if ops.contains(&Comparison::Ne) {
            ops.insert(Comparison::Eq);
        }
        if self.lists && !ops.is_empty() {
            ops.insert(Comparison::Eq);
            if ops.contains(&Comparison::Le) { ops.insert(Comparison::Lt); }
            if ops.contains(&Comparison::Ge) { ops.insert(Comparison::Gt); }
        }
        ops
    }
}

fn get(name: &str) -> Instr {
    Instr::local_get(name)
}

fn operands() -> Vec<Instr> {
    vec![get("left"), get("right")]
}

fn binary(name: String, body: Vec<Instr>) -> Func {
    Func {
        name,
        params: vec![Local::i32("left"), Local::i32("right")],
        result: Some(ValType::I32),
        locals: vec![],
        body,
    }
}

/// `left & TAG_MASK == tag`
fn has_tag(tag: Tag) -> Vec<Instr> {
    vec![
        get("left"),
        Instr::I32Const(TAG_MASK),
        Instr::op(Op::I32And),
        Instr::I32Const(tag.bits()),
        Instr::op(Op::I32Eq),
    ]
}

/// Branches on the tag of a boxed left operand.
/// Tags with no branch trap.
fn dispatch(branches: Vec<(Tag, Vec<Instr>)>) -> Vec<Instr> {
    branches.into_iter().rev().fold(
        vec![Instr::op(Op::Unreachable)],
        |otherwise, (tag, then)| {
            let mut test = has_tag(tag);
            test.push(Instr::if_i32(then, otherwise));
            test
        },
    )
}

/// Polymorphic comparison of two words of the same type.
/// Unboxed words (integers, booleans, the empty list) compare as integers;
/// boxed words dispatch on the tag of the left operand.
fn polymorphic(op: Comparison, request: &Request) -> Func {
    if op == Comparison::Ne {
        let mut body = operands();
        body.push(Instr::call(&function(Comparison::Eq)));
        body.push(Instr::op(Op::I32Eqz));
        return binary(function(op), body);
    }

    let mut branches = vec![];
    if request.floats {
        branches.push((Tag::Float, vec![
            get("left"), Instr::call(float::GET),
            get("right"), Instr::call(float::GET),
            Instr::op(op.float_op()),
        ]));
    }
    if request.lists {
        let mut then = operands();
        then.push(Instr::call(&list_function(op)));
        branches.push((Tag::List, then));
    }
    if op == Comparison::Eq {
        // closures are only equal to themselves
        let mut then = operands();
        then.push(Instr::op(Op::I32Eq));
        branches.push((Tag::Closure, then));
    }

    let mut words = operands();
    words.push(Instr::op(op.word_op()));

    let mut body = vec![
        get("left"),
        Instr::I32Const(INT_FLAG),
        Instr::op(Op::I32And),
    ];
    body.push(Instr::if_i32(
        words.clone(),
        vec![get("left"), Instr::if_i32(dispatch(branches), words)],
    ));

    binary(function(op), body)
}

fn heads() -> Vec<Instr> {
    vec![
        get("left"), Instr::call(list::HEAD),
        get("right"), Instr::call(list::HEAD),
    ]
}

fn tails() -> Vec<Instr> {
    vec![
        get("left"), Instr::call(list::TAIL),
        get("right"), Instr::call(list::TAIL),
    ]
}

/// Structural comparison of two lists, in lexicographic order.
/// The orderings compare heads with their strict form, so `le`
/// and `ge` only fall through to the tails on equal heads.
fn list_compare(op: Comparison) -> Func {
    let bool_const = |b: bool| vec![Instr::I32Const(b as i32)];

    let mut recurse = tails();
    recurse.push(Instr::call(&list_function(op)));

    let mut heads_equal = heads();
    heads_equal.push(Instr::call(&function(Comparison::Eq)));

    heads_equal.push(Instr::if_i32(recurse, bool_const(false)));

    let both = if op == Comparison::Eq {
        heads_equal
    } else {
        // the first pair of heads that differ decides
        let mut strictly = heads();
        strictly.push(Instr::call(&function(op.strict())));
        strictly.push(Instr::if_i32(bool_const(true), heads_equal));
        strictly
    };

    // a list that runs out first is the smaller one
    let (only_left, only_right, neither) = match op {
        Comparison::Lt => (false, true, false),
        Comparison::Le => (false, true, true),
        Comparison::Gt => (true, false, false),
        Comparison::Ge => (true, false, true),
        Comparison::Eq | Comparison::Ne => (false, false, true),
    };

    let body = vec![
        get("left"),
        Instr::if_i32(
            vec![get("right"), Instr::if_i32(both, bool_const(only_left))],
            vec![get("right"), Instr::if_i32(bool_const(only_right), bool_const(neither))],
        ),
    ];

    binary(list_function(op), body)
}

/// Builds the comparator module serving `request`.
/// It only refers to the float and list runtimes
/// when the program uses them.
pub fn module(request: &Request, pages: u32) -> ModuleDef {
    let ops = request.closure();
    let mut funcs: Vec<Func> = ops.iter().map(|op| polymorphic(*op, request)).collect();
    if request.lists {
        funcs.extend(ops.iter().filter(|op| **op != Comparison::Ne).map(|op| list_compare(*op)));
    }

    let mut dependencies = vec![];
    if request.floats { dependencies.push(float::module(pages)); }
    if request.lists  { dependencies.push(list::module(pages)); }

    ModuleDef::funcs(NAME, funcs, dependencies)
}
