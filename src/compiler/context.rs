use std::collections::BTreeSet;

use tracing::trace;

use crate::{
    common::{span::Span, tag::ROOT_ENV, ty::{Ty, Types}},
    compiler::{
        ast::Comparison,
        defs::{FunctionDefs, MatcherDefs},
        scope::Scopes,
    },
    config::Config,
    runtime::{self, comparator, env, ModuleDef},
    wasm::ir::{Instr, Local},
};

/// Runtime features a program has asked for so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub allocator:   bool,
    pub tuple:       bool,
    pub environment: bool,
    pub list:        bool,
    pub float:       bool,
    pub closure:     bool,
    pub matcher:     bool,
}

/// Everything the per-node compilers share while walking a tree:
/// the names in scope, the definitions collected so far,
/// and the runtime modules the program will have to be linked with.
/// Raising a feature is idempotent; the first raise records the
/// runtime module, later ones change nothing.
#[derive(Debug)]
pub struct Context {
    pub config:    Config,
    types:         Types,
    pub scopes:    Scopes,
    pub functions: FunctionDefs,
    pub matchers:  MatcherDefs,
    instructions:  Vec<Instr>,
    features:      Features,
    dependencies:  Vec<ModuleDef>,
    comparisons:   BTreeSet<Comparison>,
    match_sites:   usize,
}

impl Context {
    pub fn new(config: Config, types: Types) -> Context {
        Context {
            config,
            types,
            scopes:       Scopes::new(),
            functions:    FunctionDefs::new(),
            matchers:     MatcherDefs::new(),
            instructions: vec![],
            features:     Features::default(),
            dependencies: vec![],
            comparisons:  BTreeSet::new(),
            match_sites:  0,
        }
    }

    pub fn features(&self) -> Features {
        self.features
    }

    fn depend(&mut self, module: ModuleDef) {
        trace!(module = %module.name, "runtime module requested");
        self.dependencies.push(module);
    }

    pub fn use_allocator(&mut self) {
        if self.features.allocator { return; }
        self.features.allocator = true;
        self.depend(runtime::allocator::module(self.config.memory_pages));
    }

    pub fn use_tuple(&mut self) {
        if self.features.tuple { return; }
        self.features.tuple = true;
        self.use_allocator();
        self.depend(runtime::tuple::module(self.config.memory_pages));
    }

    /// Environments also need the entry point to start from the root environment.
    pub fn use_environment(&mut self) {
        if self.features.environment { return; }
        self.features.environment = true;
        self.use_tuple();
        self.depend(runtime::env::module(self.config.memory_pages));
    }

    pub fn use_list(&mut self) {
        if self.features.list { return; }
        self.features.list = true;
        self.use_tuple();
        self.depend(runtime::list::module(self.config.memory_pages));
    }

    pub fn use_float(&mut self) {
        if self.features.float { return; }
        self.features.float = true;
        self.use_allocator();
        self.depend(runtime::float::module(self.config.memory_pages));
    }

    pub fn use_closure(&mut self) {
        if self.features.closure { return; }
        self.features.closure = true;
        self.use_environment();
        self.use_tuple();
        self.depend(runtime::closure::module(self.config.memory_pages));
    }

    /// Matchers inspect lists and extend environments.
    pub fn use_matcher(&mut self) {
        if self.features.matcher { return; }
        self.features.matcher = true;
        self.use_environment();
        self.use_list();
        self.depend(runtime::matcher::module(self.config.memory_pages));
    }

    /// Requests the polymorphic comparator for `op`.
    /// The comparator module itself is only built once the whole tree
    /// has been walked, when it is known whether floats and lists occur.
    pub fn use_comparator(&mut self, op: Comparison) {
        self.comparisons.insert(op);
    }

    /// Runtime modules requested so far, in order of first request.
    pub fn dependencies(&self) -> &[ModuleDef] {
        &self.dependencies
    }

    /// Every dependency, with the comparator appended if one was requested.
    pub fn finish_dependencies(&self) -> Vec<ModuleDef> {
        let mut dependencies = self.dependencies.clone();
        if !self.comparisons.is_empty() {
            let request = comparator::Request {
                ops:    self.comparisons.clone(),
                floats: self.features.float,
                lists:  self.features.list,
            };
            dependencies.push(comparator::module(&request, self.config.memory_pages));
        }
        dependencies
    }

    /// The inferred type of an occurrence,
    /// if dispatching on inferred types is enabled.
    pub fn static_type(&self, span: &Span) -> Option<&Ty> {
        if !self.config.dispatch_using_inferred_type {
            return None;
        }
        self.types.get(span)
    }

    /// Hands out a fresh number for the locals of a `match`.
    pub fn next_match_site(&mut self) -> usize {
        self.match_sites += 1;
        self.match_sites - 1
    }

    /// Declares a scratch local in the function currently being compiled.
    pub fn declare_local(&mut self, local: Local) {
        self.functions.declare(local);
    }

    /// Appends to the body of the entry point.
    pub fn push_instructions(&mut self, instrs: Vec<Instr>) {
        self.instructions.extend(instrs);
    }

    /// Takes the body of the entry point, preceded by the prologue
    /// that sets up the root environment if the program has one,
    /// together with its locals.
    pub fn take_entry(&mut self) -> (Vec<Local>, Vec<Instr>) {
        let mut locals = vec![];
        let mut body = vec![];

        if self.features.environment {
            locals.push(Local::i32(env::LOCAL));
            body.push(Instr::I32Const(ROOT_ENV));
            body.push(Instr::local_set(env::LOCAL));
        }

        locals.extend(self.functions.root_locals());
        body.append(&mut self.instructions);
        (locals, body)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn features_are_idempotent() {
        let mut context = Context::new(Config::default(), Types::new());
        context.use_float();
        context.use_float();
        context.use_closure();
        context.use_environment();
        context.use_closure();

        let names: Vec<_> = context.dependencies().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["allocator", "float", "tuple", "environment", "closure"]);

        let features = context.features();
        assert!(features.allocator && features.tuple);
        assert!(!features.list && !features.matcher);

        let (locals, body) = context.take_entry();
        assert_eq!(locals, vec![Local::i32("env")]);
        assert_eq!(body, vec![Instr::I32Const(-1), Instr::local_set("env")]);
    }

    #[test]
    fn lists_raise_their_building_blocks() {
        let mut context = Context::new(Config::default(), Types::new());
        context.use_list();
        let features = context.features();
        assert!(features.list && features.tuple && features.allocator);
        assert!(!features.environment);
    }

    #[test]
    fn comparator_joins_last() {
        let mut context = Context::new(Config::default(), Types::new());
        assert!(context.finish_dependencies().is_empty());
        context.use_comparator(Comparison::Lt);
        context.use_comparator(Comparison::Lt);
        let dependencies = context.finish_dependencies();
        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].name, "comparator");
    }

    #[test]
    fn static_types_need_opt_in() {
        use crate::compiler::ast::Builder;

        let b = Builder::default();
        let node = b.int(1);
        let mut types = Types::new();
        types.insert(node.span.clone(), Ty::Int);

        let context = Context::new(Config::default(), types.clone());
        assert_eq!(context.static_type(&node.span), None);

        let config = Config { dispatch_using_inferred_type: true, ..Config::default() };
        let context = Context::new(config, types);
        assert_eq!(context.static_type(&node.span), Some(&Ty::Int));
    }
}
