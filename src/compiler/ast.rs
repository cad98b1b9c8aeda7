use std::{cell::Cell, rc::Rc};

use crate::common::{
    source::Source,
    span::{Span, Spanned},
};
use crate::wasm::ir::Op;

/// An expression node: an `Expr` and the occurrence it was parsed from.
pub type Node = Spanned<Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i32),
    Float(f64),
    Bool(bool),
    /// The empty list, `[]`.
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Integer negation, `-`.
    Minus,
    /// Float negation, `-.`.
    FMinus,
}

/// The six comparison operators, shared by every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    pub fn suffix(self) -> &'static str {
        match self {
            Comparison::Lt => "lt",
            Comparison::Le => "le",
            Comparison::Gt => "gt",
            Comparison::Ge => "ge",
            Comparison::Eq => "eq",
            Comparison::Ne => "ne",
        }
    }

    /// The signed comparison of two words.
    pub fn word_op(self) -> Op {
        match self {
            Comparison::Lt => Op::I32LtS,
            Comparison::Le => Op::I32LeS,
            Comparison::Gt => Op::I32GtS,
            Comparison::Ge => Op::I32GeS,
            Comparison::Eq => Op::I32Eq,
            Comparison::Ne => Op::I32Ne,
        }
    }

    pub fn float_op(self) -> Op {
        match self {
            Comparison::Lt => Op::F64Lt,
            Comparison::Le => Op::F64Le,
            Comparison::Gt => Op::F64Gt,
            Comparison::Ge => Op::F64Ge,
            Comparison::Eq => Op::F64Eq,
            Comparison::Ne => Op::F64Ne,
        }
    }

    /// The strict ordering that decides between two differing elements.
    pub fn strict(self) -> Comparison {
        match self {
            Comparison::Le => Comparison::Lt,
            Comparison::Ge => Comparison::Gt,
            other          => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FAdd,
    FSub,
    FMul,
    FDiv,
    And,
    Or,
    Compare(Comparison),
}

/// A single `pattern -> body` arm of a `match`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arm {
    pub pattern: Spanned<Pattern>,
    pub body:    Node,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// `_`
    Wildcard,
    /// `[]`
    Nil,
    /// Binds the value to a name.
    Ident(String),
    /// `head :: tail`
    Cons(Box<Spanned<Pattern>>, Box<Spanned<Pattern>>),
}

impl Pattern {
    /// Names bound by this pattern, in the order they are bound.
    pub fn bindings(&self) -> Vec<String> {
        match self {
            Pattern::Wildcard | Pattern::Nil => vec![],
            Pattern::Ident(name) => vec![name.clone()],
            Pattern::Cons(head, tail) => {
                let mut names = head.item.bindings();
                names.append(&mut tail.item.bindings());
                names
            },
        }
    }
}

/// A typed PicoML expression tree, as handed over by the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Lit),
    Ident(String),
    Unary(UnaryOp, Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    If {
        cond:      Box<Node>,
        then:      Box<Node>,
        otherwise: Box<Node>,
    },
    Let {
        name:  String,
        value: Box<Node>,
        body:  Box<Node>,
    },
    /// Like `Let`, but the value (always a function) can see its own name.
    LetRec {
        name:  String,
        value: Box<Node>,
        body:  Box<Node>,
    },
    Fun {
        param: String,
        body:  Box<Node>,
    },
    App {
        fun: Box<Node>,
        arg: Box<Node>,
    },
    Cons {
        head: Box<Node>,
        tail: Box<Node>,
    },
    Match {
        scrutinee: Box<Node>,
        arms:      Vec<Arm>,
    },
}

/// The kind of an expression node, used to pick its compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Lit,
    Ident,
    Unary,
    Binary,
    If,
    Let,
    LetRec,
    Fun,
    App,
    Cons,
    Match,
}

impl NodeKind {
    pub const ALL: [NodeKind; 11] = [
        NodeKind::Lit, NodeKind::Ident, NodeKind::Unary, NodeKind::Binary,
        NodeKind::If, NodeKind::Let, NodeKind::LetRec, NodeKind::Fun,
        NodeKind::App, NodeKind::Cons, NodeKind::Match,
    ];
}

impl Expr {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Lit(_)          => NodeKind::Lit,
            Expr::Ident(_)        => NodeKind::Ident,
            Expr::Unary(..)       => NodeKind::Unary,
            Expr::Binary(..)      => NodeKind::Binary,
            Expr::If { .. }       => NodeKind::If,
            Expr::Let { .. }      => NodeKind::Let,
            Expr::LetRec { .. }   => NodeKind::LetRec,
            Expr::Fun { .. }      => NodeKind::Fun,
            Expr::App { .. }      => NodeKind::App,
            Expr::Cons { .. }     => NodeKind::Cons,
            Expr::Match { .. }    => NodeKind::Match,
        }
    }
}

/// Builds expression trees by hand, giving every node
/// a distinct span so that types can be attached to it.
/// Used by hosts that bring their own front end, and by tests.
pub struct Builder {
    source: Rc<Source>,
    next:   Cell<usize>,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new(Source::source(""))
    }
}

impl Builder {
    pub fn new(source: Rc<Source>) -> Builder {
        Builder { source, next: Cell::new(0) }
    }

    /// A fresh span, distinct from every other one handed out.
    pub fn span(&self) -> Span {
        let offset = self.next.get();
        self.next.set(offset + 1);
        Span::new(&self.source, offset, 1)
    }

    fn node(&self, expr: Expr) -> Node {
        Spanned::new(expr, self.span())
    }

    fn pattern(&self, pattern: Pattern) -> Spanned<Pattern> {
        Spanned::new(pattern, self.span())
    }

    pub fn int(&self, n: i32) -> Node { self.node(Expr::Lit(Lit::Int(n))) }
    pub fn float(&self, n: f64) -> Node { self.node(Expr::Lit(Lit::Float(n))) }
    pub fn boolean(&self, b: bool) -> Node { self.node(Expr::Lit(Lit::Bool(b))) }
    pub fn nil(&self) -> Node { self.node(Expr::Lit(Lit::Nil)) }
    pub fn ident(&self, name: &str) -> Node { self.node(Expr::Ident(name.to_string())) }

    pub fn unary(&self, op: UnaryOp, operand: Node) -> Node {
        self.node(Expr::Unary(op, Box::new(operand)))
    }

    pub fn binary(&self, op: BinOp, left: Node, right: Node) -> Node {
        self.node(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    pub fn compare(&self, op: Comparison, left: Node, right: Node) -> Node {
        self.binary(BinOp::Compare(op), left, right)
    }

    pub fn if_(&self, cond: Node, then: Node, otherwise: Node) -> Node {
        self.node(Expr::If {
            cond:      Box::new(cond),
            then:      Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    pub fn let_(&self, name: &str, value: Node, body: Node) -> Node {
        self.node(Expr::Let {
            name:  name.to_string(),
            value: Box::new(value),
            body:  Box::new(body),
        })
    }

    pub fn let_rec(&self, name: &str, value: Node, body: Node) -> Node {
        self.node(Expr::LetRec {
            name:  name.to_string(),
            value: Box::new(value),
            body:  Box::new(body),
        })
    }

    pub fn fun(&self, param: &str, body: Node) -> Node {
        self.node(Expr::Fun { param: param.to_string(), body: Box::new(body) })
    }

    /// Applies `fun` to each argument in turn.
    pub fn app(&self, fun: Node, args: Vec<Node>) -> Node {
        args.into_iter().fold(fun, |fun, arg| {
            self.node(Expr::App { fun: Box::new(fun), arg: Box::new(arg) })
        })
    }

    pub fn cons(&self, head: Node, tail: Node) -> Node {
        self.node(Expr::Cons { head: Box::new(head), tail: Box::new(tail) })
    }

    /// A list literal, built from cons cells.
    pub fn list(&self, items: Vec<Node>) -> Node {
        items.into_iter().rev().fold(self.nil(), |tail, head| self.cons(head, tail))
    }

    pub fn match_(&self, scrutinee: Node, arms: Vec<Arm>) -> Node {
        self.node(Expr::Match { scrutinee: Box::new(scrutinee), arms })
    }

    pub fn arm(&self, pattern: Spanned<Pattern>, body: Node) -> Arm {
        Arm { pattern, body }
    }

    pub fn p_wildcard(&self) -> Spanned<Pattern> { self.pattern(Pattern::Wildcard) }
    pub fn p_nil(&self) -> Spanned<Pattern> { self.pattern(Pattern::Nil) }
    pub fn p_ident(&self, name: &str) -> Spanned<Pattern> { self.pattern(Pattern::Ident(name.to_string())) }

    pub fn p_cons(&self, head: Spanned<Pattern>, tail: Spanned<Pattern>) -> Spanned<Pattern> {
        self.pattern(Pattern::Cons(Box::new(head), Box::new(tail)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spans_are_distinct() {
        let b = Builder::default();
        let (x, y) = (b.int(1), b.int(1));
        assert_eq!(x.item, y.item);
        assert_ne!(x.span, y.span);
    }

    #[test]
    fn cons_bindings_in_order() {
        let b = Builder::default();
        let pattern = b.p_cons(b.p_ident("x"), b.p_cons(b.p_wildcard(), b.p_ident("rest")));
        assert_eq!(pattern.item.bindings(), vec!["x".to_string(), "rest".to_string()]);
    }

    #[test]
    fn list_literal() {
        let b = Builder::default();
        let list = b.list(vec![b.int(1), b.int(2)]);
        match list.item {
            Expr::Cons { head, .. } => assert_eq!(head.item, Expr::Lit(Lit::Int(1))),
            other => panic!("expected a cons cell, found {:?}", other),
        }
    }
}
