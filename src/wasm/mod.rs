//! The WebAssembly side of the back end:
//! a symbolic IR, a printer for its text form,
//! and an encoder to the binary format.

pub mod encode;
pub mod ir;
pub mod print;

pub use encode::{check, encode, EncodeError};
pub use ir::{Field, Func, Instr, Local, Module, Op, ValType};
