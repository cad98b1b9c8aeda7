//! This module contains the compiler implementation.
//! Each step in the pipeline turns one datatype into another,
//! starting with a typed expression tree (`ast.rs`):
//!
//! 1. Instructions: `gen.rs`, with patterns in `pattern.rs`
//! 2. Definitions: function literals and matchers, `defs.rs`
//! 3. Linked module: `crate::link`
//! 4. Optimized module: `crate::optimize`
//! 5. Binary: `crate::wasm::encode`

pub mod ast;
pub mod context;
pub mod defs;
pub mod error;
pub mod gen;
pub mod pattern;
pub mod scope;

use tracing::{debug_span, info};

use crate::{
    common::ty::Types,
    config::Config,
    link::Builder,
    optimize::optimize,
    runtime::ModuleDef,
    wasm::{
        encode::encode,
        ir::{Export, ExportKind, Field, Func, Module, ValType},
    },
};

pub use ast::Node;
pub use context::Context;
pub use error::CompileError;
pub use gen::{Compiler, Dispatcher};

/// The name of the entry point inside the module.
pub const ENTRY: &str = "main";

/// A finished program: the linked module and its binary encoding.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub module: Module,
    pub bytes:  Vec<u8>,
}

impl Compiled {
    /// The module in the WebAssembly text format.
    pub fn text(&self) -> String {
        self.module.to_string()
    }
}

/// Compiles a typed expression tree with the standard dispatcher.
pub fn compile(node: &Node, types: &Types, config: &Config) -> Result<Compiled, CompileError> {
    compile_with(node, types, config, Dispatcher::standard())
}

/// Compiles a typed expression tree into a self-contained module
/// exporting a function that evaluates it and returns the resulting word.
pub fn compile_with(
    node: &Node,
    types: &Types,
    config: &Config,
    dispatcher: Dispatcher,
) -> Result<Compiled, CompileError> {
    let _span = debug_span!("compile").entered();
    config.validate()?;

    let mut compiler = Compiler::new(Context::new(config.clone(), types.clone()), dispatcher);
    let body = compiler.walk(node)?;
    let mut context = compiler.context;
    context.push_instructions(body);

    let (locals, body) = context.take_entry();
    let entry = Func {
        name:   ENTRY.to_string(),
        params: vec![],
        result: Some(ValType::I32),
        locals,
        body,
    };

    let mut builder = Builder::new(ModuleDef::new(ENTRY, vec![], context.finish_dependencies()));
    builder
        .fields(context.functions.build_funcs())
        .fields(context.matchers.build_funcs())
        .fields(context.functions.build_tables())
        .field(Field::Func(entry))
        .field(Field::Export(Export {
            name:   config.export_name.clone(),
            kind:   ExportKind::Func,
            target: ENTRY.to_string(),
        }));

    let mut module = builder.build()?;
    if config.reduce_instructions {
        optimize(&mut module);
    }

    let bytes = encode(&module, config.enable_name_section)?;
    info!(bytes = bytes.len(), "compiled");
    Ok(Compiled { module, bytes })
}
