//! The optimizer must never change what a program computes.

mod common;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use picoml::{
    compile,
    compiler::ast::{BinOp, Builder, Node, UnaryOp},
    optimize::size,
    Config, Ty, Types,
};

use common::*;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FloatOp {
    Add,
    Sub,
    Mul,
}

impl FloatOp {
    fn bin_op(self) -> BinOp {
        match self {
            FloatOp::Add => BinOp::FAdd,
            FloatOp::Sub => BinOp::FSub,
            FloatOp::Mul => BinOp::FMul,
        }
    }
}

/// The shape of a float-valued program, without spans.
#[derive(Debug, Clone)]
enum Shape {
    Float(f64),
    /// The innermost bound variable, or `1.0` outside of any binding.
    Var,
    Bin(FloatOp, Box<Shape>, Box<Shape>),
    Neg(Box<Shape>),
    Let(Box<Shape>, Box<Shape>),
    /// `(fun v -> body) arg`
    Apply(Box<Shape>, Box<Shape>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (-8i32..8).prop_map(|n| Shape::Float(n as f64 / 2.0)),
        Just(Shape::Var),
    ];

    leaf.prop_recursive(4, 24, 2, |inner| prop_oneof![
        (any::<FloatOp>(), inner.clone(), inner.clone())
            .prop_map(|(op, a, b)| Shape::Bin(op, Box::new(a), Box::new(b))),
        inner.clone().prop_map(|a| Shape::Neg(Box::new(a))),
        (inner.clone(), inner.clone()).prop_map(|(a, b)| Shape::Let(Box::new(a), Box::new(b))),
        (inner.clone(), inner).prop_map(|(a, b)| Shape::Apply(Box::new(a), Box::new(b))),
    ])
}

fn build(b: &Builder, shape: &Shape, bound: bool) -> Node {
    match shape {
        Shape::Float(n) => b.float(*n),
        Shape::Var if bound => b.ident("v"),
        Shape::Var => b.float(1.0),
        Shape::Bin(op, l, r) => b.binary(op.bin_op(), build(b, l, bound), build(b, r, bound)),
        Shape::Neg(a) => b.unary(UnaryOp::FMinus, build(b, a, bound)),
        Shape::Let(value, body) => b.let_("v", build(b, value, bound), build(b, body, true)),
        Shape::Apply(body, arg) => b.app(
            b.fun("v", build(b, body, true)),
            vec![build(b, arg, bound)],
        ),
    }
}

fn total_size(tree: &Node, config: &Config) -> usize {
    let compiled = compile(tree, &Types::new(), config).unwrap();
    compiled.module.funcs().map(|f| size(&f.body)).sum()
}

#[test]
fn float_boxes_are_elided() {
    let b = Builder::default();
    let tree = b.binary(BinOp::FAdd, b.binary(BinOp::FMul, b.float(2.0), b.float(3.0)), b.float(0.5));
    let plain = Config::default();
    let reduced = Config { reduce_instructions: true, ..Config::default() };

    let compiled = compile(&tree, &Types::new(), &reduced).unwrap();
    let main = compiled.module.func("main").unwrap();
    let boxes = main.body.iter().filter(|i| i.to_string() == "call $float_new").count();
    // the three literals are boxed, then unboxed at once; only the result stays boxed
    assert_eq!(boxes, 1);
    assert!(total_size(&tree, &reduced) < total_size(&tree, &plain));
}

#[test]
fn trailing_environment_pops_are_elided() {
    let b = Builder::default();
    let tree = b.let_("x", b.int(1), b.let_("y", b.int(2), b.ident("x")));
    let reduced = Config { reduce_instructions: true, ..Config::default() };

    let compiled = compile(&tree, &Types::new(), &reduced).unwrap();
    let main = compiled.module.func("main").unwrap();
    assert!(!main.body.iter().any(|i| i.to_string() == "call $env_parent"));
    assert_eq!(eval_with(&tree, &Ty::Int, &Types::new(), &reduced), picoml::Value::Int(1));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn optimizer_is_sound(shape in shape()) {
        let b = Builder::default();
        let tree = build(&b, &shape, false);

        let plain = Config::default();
        let reduced = Config { reduce_instructions: true, ..Config::default() };

        let expected = eval_with(&tree, &Ty::Float, &Types::new(), &plain);
        let actual = eval_with(&tree, &Ty::Float, &Types::new(), &reduced);
        prop_assert_eq!(expected, actual);
        prop_assert!(total_size(&tree, &reduced) <= total_size(&tree, &plain));
    }
}
