use std::collections::HashMap;

use tracing::debug;

use crate::{
    common::tag::{Word, FALSE, TRUE},
    compiler::{
        ast::{Arm, BinOp, Comparison, Expr, Lit, Node, NodeKind, UnaryOp},
        context::Context,
        error::CompileError,
    },
    runtime::{closure, comparator, env, float, list},
    wasm::ir::{Instr, Local, Op},
};

/// Compiles one kind of node into the instructions that leave its value
/// on the stack.
pub type Handler = fn(&mut Compiler, &Node) -> Result<Vec<Instr>, CompileError>;

/// Maps each kind of node to the handler that compiles it.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: HashMap<NodeKind, Handler>,
}

impl Dispatcher {
    /// A dispatcher that knows nothing.
    pub fn empty() -> Dispatcher {
        Dispatcher { handlers: HashMap::new() }
    }

    /// A dispatcher for the whole language.
    pub fn standard() -> Dispatcher {
        let mut dispatcher = Dispatcher::empty();
        dispatcher.register(NodeKind::Lit,    lit);
        dispatcher.register(NodeKind::Ident,  ident);
        dispatcher.register(NodeKind::Unary,  unary);
        dispatcher.register(NodeKind::Binary, binary);
        dispatcher.register(NodeKind::If,     if_);
        dispatcher.register(NodeKind::Let,    let_);
        dispatcher.register(NodeKind::LetRec, let_rec);
        dispatcher.register(NodeKind::Fun,    fun);
        dispatcher.register(NodeKind::App,    app);
        dispatcher.register(NodeKind::Cons,   cons);
        dispatcher.register(NodeKind::Match,  match_);
        dispatcher
    }

    pub fn register(&mut self, kind: NodeKind, handler: Handler) {
        self.handlers.insert(kind, handler);
    }

    pub fn remove(&mut self, kind: NodeKind) -> Option<Handler> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: NodeKind) -> Option<Handler> {
        self.handlers.get(&kind).copied()
    }
}

impl Default for Dispatcher {
    fn default() -> Dispatcher {
        Dispatcher::standard()
    }
}

/// Walks an expression tree, producing the instructions of the entry point
/// and collecting every function literal and matcher along the way.
pub struct Compiler {
    pub context: Context,
    dispatcher:  Dispatcher,
}

impl Compiler {
    pub fn new(context: Context, dispatcher: Dispatcher) -> Compiler {
        Compiler { context, dispatcher }
    }

    /// Compiles a node with whatever handler is registered for its kind.
    pub fn walk(&mut self, node: &Node) -> Result<Vec<Instr>, CompileError> {
        let kind = node.item.kind();
        let handler = self.dispatcher.get(kind).ok_or_else(|| CompileError::unimplemented(
            &format!("{:?}", kind),
            "this construct is not supported by the back end",
            &node.span,
        ))?;
        handler(self, node)
    }

    /// Compiles a subtree with `names` bound on top of the current scope,
    /// unbinding them afterwards even if compilation fails.
    pub fn walk_with(&mut self, names: &[String], node: &Node) -> Result<Vec<Instr>, CompileError> {
        let depth = self.context.scopes.depth();
        for name in names {
            self.context.scopes.push(name);
        }
        let result = self.walk(node);
        self.context.scopes.restore(depth);
        result
    }

    /// Compiles a function literal.
    /// The body sees the captured environment, then the closure itself
    /// (named if the literal is recursive), then the argument.
    pub fn function(
        &mut self,
        name: Option<&str>,
        param: &str,
        body: &Node,
    ) -> Result<Vec<Instr>, CompileError> {
        self.context.use_closure();

        let depth = self.context.scopes.depth();
        match name {
            Some(name) => self.context.scopes.push(name),
            None => self.context.scopes.push_anonymous(),
        }
        self.context.scopes.push(param);

        let nesting = self.context.functions.enter();
        let result = self.walk(body);
        self.context.scopes.restore(depth);
        let body = result?;
        let index = self.context.functions.leave(body);
        debug!(index, nesting, "compiled function literal");

        Ok(vec![
            Instr::local_get(env::LOCAL),
            Instr::I32Const(index as i32),
            Instr::call(closure::NEW),
        ])
    }

    /// `local.get $env; <value>; env_new; local.set $env`,
    /// then the body, then the environment is popped again.
    fn bind(&mut self, name: &str, value: Vec<Instr>, body: &Node) -> Result<Vec<Instr>, CompileError> {
        self.context.use_environment();

        let mut instrs = vec![Instr::local_get(env::LOCAL)];
        instrs.extend(value);
        instrs.push(Instr::call(env::NEW));
        instrs.push(Instr::local_set(env::LOCAL));
        instrs.extend(self.walk_with(&[name.to_string()], body)?);
        instrs.push(Instr::local_get(env::LOCAL));
        instrs.push(Instr::call(env::PARENT));
        instrs.push(Instr::local_set(env::LOCAL));
        Ok(instrs)
    }

    /// Whether both operands are statically known to be plain words.
    fn words(&self, left: &Node, right: &Node) -> bool {
        let known = |node: &Node| self.context.static_type(&node.span).map_or(false, |ty| ty.is_word());
        known(left) && known(right)
    }
}

fn lit(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let instrs = match &node.item {
        Expr::Lit(Lit::Int(n))  => vec![Instr::I32Const(Word::int(*n))],
        Expr::Lit(Lit::Bool(b)) => vec![Instr::I32Const(if *b { TRUE } else { FALSE })],
        Expr::Lit(Lit::Nil) => {
            compiler.context.use_list();
            vec![Instr::call(list::NEW)]
        },
        Expr::Lit(Lit::Float(n)) => {
            compiler.context.use_float();
            vec![Instr::F64Const(*n), Instr::call(float::NEW)]
        },
        _ => unreachable!("dispatched a non-literal to the literal compiler"),
    };
    Ok(instrs)
}

fn ident(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let name = match &node.item {
        Expr::Ident(name) => name,
        _ => unreachable!(),
    };

    let distance = compiler.context.scopes.distance(name)
        .ok_or_else(|| CompileError::resolution(name, &node.span))?;
    compiler.context.use_environment();

    Ok(vec![
        Instr::local_get(env::LOCAL),
        Instr::I32Const(distance as i32),
        Instr::call(env::GET),
    ])
}

fn unary(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (op, operand) = match &node.item {
        Expr::Unary(op, operand) => (*op, operand),
        _ => unreachable!(),
    };

    let instrs = match op {
        // 2 - (2n + 1) = 2(-n) + 1
        UnaryOp::Minus => {
            let mut instrs = vec![Instr::I32Const(2)];
            instrs.extend(compiler.walk(operand)?);
            instrs.push(Instr::op(Op::I32Sub));
            instrs
        },
        UnaryOp::FMinus => {
            compiler.context.use_float();
            let mut instrs = compiler.walk(operand)?;
            instrs.push(Instr::call(float::GET));
            instrs.push(Instr::op(Op::F64Neg));
            instrs.push(Instr::call(float::NEW));
            instrs
        },
    };
    Ok(instrs)
}

/// Untags an integer operand.
fn untag() -> Vec<Instr> {
    vec![Instr::I32Const(1), Instr::op(Op::I32ShrS)]
}

/// Arithmetic on tagged integers, without untagging where it can be avoided.
fn int_arith(op: BinOp, left: Vec<Instr>, right: Vec<Instr>) -> Vec<Instr> {
    let mut instrs = left;
    match op {
        // (2a + 1) + (2b + 1) - 1
        BinOp::Add => {
            instrs.extend(right);
            instrs.extend(vec![Instr::op(Op::I32Add), Instr::I32Const(1), Instr::op(Op::I32Sub)]);
        },
        // (2a + 1) - (2b + 1) + 1
        BinOp::Sub => {
            instrs.extend(right);
            instrs.extend(vec![Instr::op(Op::I32Sub), Instr::I32Const(1), Instr::op(Op::I32Add)]);
        },
        BinOp::Mul | BinOp::Div => {
            instrs.extend(untag());
            instrs.extend(right);
            instrs.extend(untag());
            let op = if op == BinOp::Mul { Op::I32Mul } else { Op::I32DivS };
            instrs.extend(vec![
                Instr::op(op),
                Instr::I32Const(1), Instr::op(Op::I32Shl),
                Instr::I32Const(1), Instr::op(Op::I32Or),
            ]);
        },
        _ => unreachable!("not integer arithmetic"),
    }
    instrs
}

fn float_arith(op: BinOp, left: Vec<Instr>, right: Vec<Instr>) -> Vec<Instr> {
    let op = match op {
        BinOp::FAdd => Op::F64Add,
        BinOp::FSub => Op::F64Sub,
        BinOp::FMul => Op::F64Mul,
        BinOp::FDiv => Op::F64Div,
        _ => unreachable!("not float arithmetic"),
    };

    let mut instrs = left;
    instrs.push(Instr::call(float::GET));
    instrs.extend(right);
    instrs.push(Instr::call(float::GET));
    instrs.push(Instr::op(op));
    instrs.push(Instr::call(float::NEW));
    instrs
}

/// Comparisons produce 0 or 1; booleans are 0 or 3.
fn to_bool() -> Vec<Instr> {
    vec![Instr::I32Const(TRUE), Instr::op(Op::I32Mul)]
}

fn compare(
    compiler: &mut Compiler,
    op: Comparison,
    left: &Node,
    right: &Node,
) -> Result<Vec<Instr>, CompileError> {
    let words = compiler.words(left, right);
    let mut instrs = compiler.walk(left)?;
    instrs.extend(compiler.walk(right)?);

    if words {
        instrs.push(Instr::op(op.word_op()));
    } else {
        compiler.context.use_comparator(op);
        instrs.push(Instr::call(&comparator::function(op)));
    }

    instrs.extend(to_bool());
    Ok(instrs)
}

fn binary(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (op, left, right) = match &node.item {
        Expr::Binary(op, left, right) => (*op, left, right),
        _ => unreachable!(),
    };

    let instrs = match op {
        BinOp::Compare(comparison) => compare(compiler, comparison, left, right)?,
        BinOp::And => {
            let mut instrs = compiler.walk(left)?;
            instrs.push(Instr::if_i32(compiler.walk(right)?, vec![Instr::I32Const(FALSE)]));
            instrs
        },
        BinOp::Or => {
            let mut instrs = compiler.walk(left)?;
            instrs.push(Instr::if_i32(vec![Instr::I32Const(TRUE)], compiler.walk(right)?));
            instrs
        },
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
            let left = compiler.walk(left)?;
            int_arith(op, left, compiler.walk(right)?)
        },
        BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv => {
            compiler.context.use_float();
            let left = compiler.walk(left)?;
            float_arith(op, left, compiler.walk(right)?)
        },
    };
    Ok(instrs)
}

fn if_(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (cond, then, otherwise) = match &node.item {
        Expr::If { cond, then, otherwise } => (cond, then, otherwise),
        _ => unreachable!(),
    };

    let mut instrs = compiler.walk(cond)?;
    let then = compiler.walk(then)?;
    instrs.push(Instr::if_i32(then, compiler.walk(otherwise)?));
    Ok(instrs)
}

fn let_(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (name, value, body) = match &node.item {
        Expr::Let { name, value, body } => (name, value, body),
        _ => unreachable!(),
    };

    let value = compiler.walk(value)?;
    compiler.bind(name, value, body)
}

fn let_rec(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (name, value, body) = match &node.item {
        Expr::LetRec { name, value, body } => (name, value, body),
        _ => unreachable!(),
    };

    let value = match &value.item {
        Expr::Fun { param, body } => compiler.function(Some(name), param, body)?,
        _ => return Err(CompileError::unimplemented(
            "LetRec",
            "only functions can be defined recursively",
            &value.span,
        )),
    };
    compiler.bind(name, value, body)
}

fn fun(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    match &node.item {
        Expr::Fun { param, body } => compiler.function(None, param, body),
        _ => unreachable!(),
    }
}

const CALLEE:   &str = "callee";
const ARGUMENT: &str = "argument";

/// Evaluates the argument, then the function,
/// and calls the function's code with its environment
/// extended by the closure itself and the argument.
fn app(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (fun, arg) = match &node.item {
        Expr::App { fun, arg } => (fun, arg),
        _ => unreachable!(),
    };

    compiler.context.use_closure();
    compiler.context.declare_local(Local::i32(CALLEE));
    compiler.context.declare_local(Local::i32(ARGUMENT));

    let mut instrs = compiler.walk(arg)?;
    instrs.extend(compiler.walk(fun)?);
    instrs.extend(vec![
        Instr::local_set(CALLEE),
        Instr::local_set(ARGUMENT),
        Instr::local_get(CALLEE),
        Instr::call(closure::ENV),
        Instr::local_get(CALLEE),
        Instr::call(env::NEW),
        Instr::local_get(ARGUMENT),
        Instr::call(env::NEW),
        Instr::local_get(CALLEE),
        Instr::call(closure::INDEX),
        Instr::CallIndirect {
            table: closure::TABLE.to_string(),
            ty:    closure::TYPE.to_string(),
        },
    ]);
    Ok(instrs)
}

fn cons(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (head, tail) = match &node.item {
        Expr::Cons { head, tail } => (head, tail),
        _ => unreachable!(),
    };

    compiler.context.use_list();
    let mut instrs = compiler.walk(tail)?;
    instrs.extend(compiler.walk(head)?);
    instrs.push(Instr::call(list::PUSH));
    Ok(instrs)
}

/// Tries each arm in order. The first matcher to succeed
/// replaces the environment for the arm's body;
/// the environment before the match is restored afterwards.
/// Running out of arms traps.
fn match_(compiler: &mut Compiler, node: &Node) -> Result<Vec<Instr>, CompileError> {
    let (scrutinee, arms) = match &node.item {
        Expr::Match { scrutinee, arms } => (scrutinee, arms),
        _ => unreachable!(),
    };

    compiler.context.use_matcher();
    let site = compiler.context.next_match_site();
    let value = format!("match_{}_value", site);
    let outer = format!("match_{}_outer", site);
    let inner = format!("match_{}_env", site);
    for local in [&value, &outer, &inner] {
        compiler.context.declare_local(Local::i32(local));
    }

    let mut instrs = compiler.walk(scrutinee)?;
    instrs.push(Instr::LocalSet(value.clone()));
    instrs.push(Instr::local_get(env::LOCAL));
    instrs.push(Instr::LocalSet(outer.clone()));

    let mut compiled: Vec<(String, Vec<Instr>)> = vec![];
    for Arm { pattern, body } in arms.iter() {
        let matcher = compiler.pattern(pattern)?;
        let body = compiler.walk_with(&pattern.item.bindings(), body)?;
        compiled.push((matcher, body));
    }

    let cascade = compiled.into_iter().rev().fold(
        vec![Instr::op(Op::Unreachable)],
        |otherwise, (matcher, body)| {
            let mut then = vec![Instr::LocalGet(inner.clone()), Instr::local_set(env::LOCAL)];
            then.extend(body);
            then.push(Instr::LocalGet(outer.clone()));
            then.push(Instr::local_set(env::LOCAL));

            vec![
                Instr::LocalGet(outer.clone()),
                Instr::LocalGet(value.clone()),
                Instr::Call(matcher),
                Instr::LocalTee(inner.clone()),
                Instr::if_i32(then, otherwise),
            ]
        },
    );

    instrs.extend(cascade);
    Ok(instrs)
}
