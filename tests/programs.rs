//! Whole programs, compiled and executed under every configuration.

mod common;

use picoml::{
    compiler::ast::{BinOp, Builder, Comparison, Node, UnaryOp},
    compile, Config, Ty, Types, Value,
};

use common::*;

#[test]
fn integer_arithmetic() {
    let b = Builder::default();
    // (1 + 2) * 3 - 10 / 2
    let tree = b.binary(
        BinOp::Sub,
        b.binary(BinOp::Mul, b.binary(BinOp::Add, b.int(1), b.int(2)), b.int(3)),
        b.binary(BinOp::Div, b.int(10), b.int(2)),
    );
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(4));
}

#[test]
fn negation() {
    let b = Builder::default();
    let tree = b.binary(BinOp::Mul, b.unary(UnaryOp::Minus, b.int(7)), b.int(6));
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(-42));
}

#[test]
fn short_circuit() {
    let b = Builder::default();
    let and = b.binary(BinOp::And, b.boolean(true), b.boolean(false));
    let or = b.binary(BinOp::Or, b.boolean(false), b.boolean(true));
    assert_eq!(eval(&and, &Ty::Bool), Value::Bool(false));
    assert_eq!(eval(&or, &Ty::Bool), Value::Bool(true));
}

#[test]
fn conditionals() {
    let b = Builder::default();
    let tree = b.if_(
        b.compare(Comparison::Gt, b.int(2), b.int(1)),
        b.int(10),
        b.int(20),
    );
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(10));
}

#[test]
fn shadowing() {
    let b = Builder::default();
    // let x = 1 in let y = 10 in let x = x + y in x
    let tree = b.let_("x", b.int(1), b.let_("y", b.int(10), b.let_(
        "x",
        b.binary(BinOp::Add, b.ident("x"), b.ident("y")),
        b.ident("x"),
    )));
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(11));
}

#[test]
fn float_arithmetic() {
    let b = Builder::default();
    // -. (1.5 +. 2.25) *. 2.0
    let tree = b.binary(
        BinOp::FMul,
        b.unary(UnaryOp::FMinus, b.binary(BinOp::FAdd, b.float(1.5), b.float(2.25))),
        b.float(2.0),
    );
    assert_eq!(eval_all(&tree, &Ty::Float, &Types::new()), Value::Float(-7.5));
}

#[test]
fn list_literal() {
    let b = Builder::default();
    let tree = b.list(vec![b.int(1), b.int(2), b.int(3)]);
    assert_eq!(eval_all(&tree, &Ty::list(Ty::Int), &Types::new()), ints(&[1, 2, 3]));
}

#[test]
fn curried_closure() {
    let b = Builder::default();
    // let add = fun a -> fun b -> a + b in add 2 40
    let tree = b.let_(
        "add",
        b.fun("a", b.fun("b", b.binary(BinOp::Add, b.ident("a"), b.ident("b")))),
        b.app(b.ident("add"), vec![b.int(2), b.int(40)]),
    );
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(42));
}

#[test]
fn closures_capture_their_environment() {
    let b = Builder::default();
    // let k = 5 in let f = fun x -> x + k in let k = 100 in f 1
    let tree = b.let_("k", b.int(5), b.let_(
        "f",
        b.fun("x", b.binary(BinOp::Add, b.ident("x"), b.ident("k"))),
        b.let_("k", b.int(100), b.app(b.ident("f"), vec![b.int(1)])),
    ));
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(6));
}

fn fact(b: &Builder, types: &mut Types) -> Node {
    // fun n -> if n < 2 then 1 else n * fact (n - 1)
    let n = b.ident("n");
    let two = b.int(2);
    types.insert(n.span.clone(), Ty::Int);
    types.insert(two.span.clone(), Ty::Int);

    b.fun("n", b.if_(
        b.compare(Comparison::Lt, n, two),
        b.int(1),
        b.binary(
            BinOp::Mul,
            b.ident("n"),
            b.app(b.ident("fact"), vec![b.binary(BinOp::Sub, b.ident("n"), b.int(1))]),
        ),
    ))
}

#[test]
fn factorial() {
    let b = Builder::default();
    let mut types = Types::new();
    let tree = b.let_rec(
        "fact",
        fact(&b, &mut types),
        b.app(b.ident("fact"), vec![b.int(7)]),
    );
    assert_eq!(eval_all(&tree, &Ty::Int, &types), Value::Int(5040));
}

#[test]
fn map_factorial_over_range() {
    let b = Builder::default();
    let mut types = Types::new();

    // fun a -> fun z -> if a < z then a :: range (a + 1) z else []
    let range = b.fun("a", b.fun("z", b.if_(
        b.compare(Comparison::Lt, b.ident("a"), b.ident("z")),
        b.cons(
            b.ident("a"),
            b.app(b.ident("range"), vec![b.binary(BinOp::Add, b.ident("a"), b.int(1)), b.ident("z")]),
        ),
        b.nil(),
    )));

    // fun f -> fun l -> match l with [] -> [] | x :: xs -> f x :: map f xs
    let map = b.fun("f", b.fun("l", b.match_(b.ident("l"), vec![
        b.arm(b.p_nil(), b.nil()),
        b.arm(
            b.p_cons(b.p_ident("x"), b.p_ident("xs")),
            b.cons(
                b.app(b.ident("f"), vec![b.ident("x")]),
                b.app(b.ident("map"), vec![b.ident("f"), b.ident("xs")]),
            ),
        ),
    ])));

    let tree = b.let_rec("fact", fact(&b, &mut types),
        b.let_rec("range", range,
            b.let_rec("map", map,
                b.app(b.ident("map"), vec![
                    b.ident("fact"),
                    b.app(b.ident("range"), vec![b.int(1), b.int(7)]),
                ]),
            ),
        ),
    );

    let value = eval_all(&tree, &Ty::list(Ty::Int), &types);
    assert_eq!(value, ints(&[1, 2, 6, 24, 120, 720]));
}

#[test]
fn match_cons_against_singleton() {
    let b = Builder::default();
    // match 1 :: [] with [] -> false | x :: y -> y
    let tree = b.match_(b.cons(b.int(1), b.nil()), vec![
        b.arm(b.p_nil(), b.boolean(false)),
        b.arm(b.p_cons(b.p_ident("x"), b.p_ident("y")), b.ident("y")),
    ]);
    assert_eq!(eval_all(&tree, &Ty::list(Ty::Int), &Types::new()), ints(&[]));
}

#[test]
fn match_nested_cons() {
    let b = Builder::default();
    // match 1 :: 2 :: [] with x :: y :: z -> z
    let tree = b.match_(b.list(vec![b.int(1), b.int(2)]), vec![
        b.arm(b.p_cons(b.p_ident("x"), b.p_cons(b.p_ident("y"), b.p_ident("z"))), b.ident("z")),
    ]);
    assert_eq!(eval_all(&tree, &Ty::list(Ty::Int), &Types::new()), ints(&[]));

    // the same pattern, reading the second element
    let tree = b.match_(b.list(vec![b.int(1), b.int(2)]), vec![
        b.arm(b.p_cons(b.p_ident("x"), b.p_cons(b.p_ident("y"), b.p_ident("z"))), b.ident("y")),
    ]);
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(2));
}

#[test]
fn match_wildcard() {
    let b = Builder::default();
    let tree = b.match_(b.int(0), vec![b.arm(b.p_wildcard(), b.boolean(true))]);
    assert_eq!(eval_all(&tree, &Ty::Bool, &Types::new()), Value::Bool(true));
}

#[test]
fn match_restores_environment() {
    let b = Builder::default();
    // let x = 1 in (match [5] with x :: _ -> x) + x
    let tree = b.let_("x", b.int(1), b.binary(
        BinOp::Add,
        b.match_(b.list(vec![b.int(5)]), vec![
            b.arm(b.p_cons(b.p_ident("x"), b.p_wildcard()), b.ident("x")),
        ]),
        b.ident("x"),
    ));
    assert_eq!(eval_all(&tree, &Ty::Int, &Types::new()), Value::Int(6));
}

#[test]
fn exhausted_match_traps() {
    let b = Builder::default();
    let tree = b.match_(b.nil(), vec![
        b.arm(b.p_cons(b.p_wildcard(), b.p_wildcard()), b.int(1)),
    ]);
    assert_eq!(run_with(&tree, &Types::new(), &Config::default()), Outcome::Trap);
}

#[test]
fn closure_identity() {
    let b = Builder::default();
    let same = |op| b.let_("fn", b.fun("x", b.int(10)), b.compare(op, b.ident("fn"), b.ident("fn")));
    let distinct = |op| b.compare(op, b.fun("x", b.int(10)), b.fun("x", b.int(10)));

    let types = Types::new();
    assert_eq!(eval_all(&same(Comparison::Eq), &Ty::Bool, &types), Value::Bool(true));
    assert_eq!(eval_all(&same(Comparison::Ne), &Ty::Bool, &types), Value::Bool(false));
    assert_eq!(eval_all(&distinct(Comparison::Eq), &Ty::Bool, &types), Value::Bool(false));
    assert_eq!(eval_all(&distinct(Comparison::Ne), &Ty::Bool, &types), Value::Bool(true));
}

#[test]
fn closures_decode() {
    let b = Builder::default();
    let tree = b.fun("x", b.ident("x"));
    match eval(&tree, &Ty::fun(Ty::Int, Ty::Int)) {
        Value::Closure { env, index } => {
            assert_eq!(env, -1);
            assert_eq!(index, 0);
        },
        other => panic!("expected a closure, found {}", other),
    }
}

#[test]
fn custom_export_and_names() {
    let b = Builder::default();
    let config = Config {
        export_name:         "run".to_string(),
        enable_name_section: true,
        ..Config::default()
    };
    let compiled = compile(&b.int(3), &Types::new(), &config).unwrap();
    assert!(compiled.text().contains("(export \"run\" (func $main))"));
    assert_eq!(execute(&compiled, "run"), Outcome::Word(7, vec![]));
}

#[test]
fn unbound_identifier_reports_occurrence() {
    let b = Builder::default();
    let tree = b.let_("x", b.int(1), b.ident("y"));
    let error = compile(&tree, &Types::new(), &Config::default()).unwrap_err();
    assert!(error.to_string().contains("`y`"));
    assert!(error.span().is_some());
}

#[test]
fn first_allocation_is_past_zero() {
    let b = Builder::default();
    let compiled = compile(&b.list(vec![b.int(7)]), &Types::new(), &Config::default()).unwrap();
    match execute(&compiled, "main") {
        // one cell at address 4, tagged as a list
        Outcome::Word(word, memory) => {
            assert_eq!(word, (4 << 4) | 0b0100);
            assert_eq!(Value::decode(word, &Ty::list(Ty::Int), &memory).unwrap(), ints(&[7]));
        },
        Outcome::Trap => panic!("program trapped"),
    }
}

#[test]
fn memory_past_the_boxed_address_range_is_rejected() {
    let b = Builder::default();
    let config = Config { memory_pages: 4097, ..Config::default() };
    let error = compile(&b.list(vec![b.int(1)]), &Types::new(), &config).unwrap_err();
    assert!(matches!(error, picoml::CompileError::Config(_)));
}
