//! Helpers shared by the end-to-end tests:
//! compile a tree, run it under wasmtime, and read the result back.

#![allow(dead_code)]

use picoml::{compile, Compiled, Config, Ty, Types, Value};
use picoml::compiler::ast::Node;
use wasmtime::{Engine, Instance, Store};

/// Describes how a compiled program ended.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The returned word and a snapshot of linear memory.
    Word(i32, Vec<u8>),
    Trap,
}

pub fn execute(compiled: &Compiled, export: &str) -> Outcome {
    let engine = Engine::default();
    let module = wasmtime::Module::new(&engine, &compiled.bytes)
        .unwrap_or_else(|e| panic!("invalid module: {}\n{}", e, compiled.text()));
    let mut store = Store::new(&engine, ());
    let instance = Instance::new(&mut store, &module, &[]).unwrap();
    let main = instance.get_typed_func::<(), i32>(&mut store, export).unwrap();

    match main.call(&mut store, ()) {
        Ok(word) => {
            let memory = instance
                .get_memory(&mut store, "memory")
                .map(|memory| memory.data(&store).to_vec())
                .unwrap_or_default();
            Outcome::Word(word, memory)
        },
        Err(_) => Outcome::Trap,
    }
}

pub fn run_with(tree: &Node, types: &Types, config: &Config) -> Outcome {
    let compiled = compile(tree, types, config).unwrap();
    execute(&compiled, &config.export_name)
}

/// Runs a program and decodes its result as a value of type `ty`.
pub fn eval_with(tree: &Node, ty: &Ty, types: &Types, config: &Config) -> Value {
    match run_with(tree, types, config) {
        Outcome::Word(word, memory) => Value::decode(word, ty, &memory).unwrap(),
        Outcome::Trap => panic!("program trapped"),
    }
}

pub fn eval(tree: &Node, ty: &Ty) -> Value {
    eval_with(tree, ty, &Types::new(), &Config::default())
}

/// Every configuration worth checking a program against.
pub fn configs() -> Vec<Config> {
    let mut configs = vec![];
    for dispatch in [false, true] {
        for reduce in [false, true] {
            configs.push(Config {
                dispatch_using_inferred_type: dispatch,
                reduce_instructions:          reduce,
                ..Config::default()
            });
        }
    }
    configs
}

/// Evaluates under every configuration, checking they all agree.
pub fn eval_all(tree: &Node, ty: &Ty, types: &Types) -> Value {
    let values: Vec<_> = configs().iter().map(|c| eval_with(tree, ty, types, c)).collect();
    for value in values.iter() {
        assert_eq!(value, &values[0]);
    }
    values[0].clone()
}

pub fn ints(items: &[i32]) -> Value {
    Value::List(items.iter().map(|n| Value::Int(*n)).collect())
}
