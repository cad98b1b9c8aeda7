//! Contains datastructures and utility functions
//! common to every stage of the back end.
//!
//! - Source code representation and span annotations.
//! - The tagged runtime word and its decoder.
//! - Inferred types handed over by the type checker.

pub mod source;
pub mod span;
pub mod tag;
pub mod ty;

pub use source::Source;
pub use span::{Span, Spanned};
pub use tag::Value;
pub use ty::{Ty, Types};
