//! # PicoML
//! This crate contains the back end of the PicoML compiler.
//! It takes an expression tree that has already been parsed and
//! type-checked, and turns it into a self-contained WebAssembly module
//! exporting a single function that evaluates the program.
//!
//! ## Compiling a tree
//! Trees usually come from the front end, but can be built by hand:
//! ```
//! use picoml::{compile, compiler::ast::Builder, Config, Types};
//!
//! let b = Builder::default();
//! let tree = b.let_("x", b.int(20), b.binary(
//!     picoml::compiler::ast::BinOp::Add, b.ident("x"), b.int(22),
//! ));
//! let compiled = compile(&tree, &Types::new(), &Config::default()).unwrap();
//! assert_eq!(&compiled.bytes[..4], b"\0asm");
//! ```
//!
//! ## Overview of the compilation process
//! Every value is a single tagged word at runtime (see `common::tag`).
//! The per-node compilers in `compiler::gen` turn the tree into instructions,
//! raising runtime features (environments, lists, floats, ...) as they go.
//! Each feature is a small runtime module (see `runtime`);
//! the linker in `link` pulls in exactly the modules a program needs,
//! once each, and the optimizer in `optimize` cleans up after the
//! per-node compilers before the module is encoded.

pub mod common;
pub mod compiler;
pub mod config;
pub mod link;
pub mod optimize;
pub mod runtime;
pub mod wasm;

pub use common::{Ty, Types, Value};
pub use compiler::{compile, CompileError, Compiled};
pub use config::Config;
