use std::collections::HashMap;

use crate::common::span::Span;

/// Monomorphic types as inferred by the Hindley-Milner pass.
/// The back end only ever asks one question of them:
/// can two operands be compared as plain machine words?
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Int,
    Bool,
    Float,
    List(Box<Ty>),
    Fun(Box<Ty>, Box<Ty>),
    /// A type variable left unresolved by inference.
    Var(usize),
}

/// Inferred types, keyed by the occurrence (span) of each expression.
pub type Types = HashMap<Span, Ty>;

impl Ty {
    /// Shortcut for creating a `Ty::List` variant.
    pub fn list(item: Ty) -> Ty {
        Ty::List(Box::new(item))
    }

    /// Shortcut for creating a `Ty::Fun` variant.
    pub fn fun(arg: Ty, body: Ty) -> Ty {
        Ty::Fun(Box::new(arg), Box::new(body))
    }

    /// Integers and booleans are both stored as ordered words,
    /// so their comparisons need no runtime tag inspection.
    pub fn is_word(&self) -> bool {
        matches!(self, Ty::Int | Ty::Bool)
    }
}
