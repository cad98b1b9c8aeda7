use std::collections::HashSet;

use tracing::debug;

use crate::{
    compiler::error::CompileError,
    runtime::ModuleDef,
    wasm::{encode::check, ir::{Field, Module}},
};

/// Links a module definition with everything it depends on.
/// Every module is included once, no matter how many modules
/// depend on it, and always before the modules that depend on it.
#[derive(Debug)]
pub struct Builder {
    root:   ModuleDef,
    fields: Vec<Field>,
}

impl Builder {
    pub fn new(root: ModuleDef) -> Builder {
        Builder { root, fields: vec![] }
    }

    /// Adds a field directly to the linked module, after every dependency.
    pub fn field(&mut self, field: Field) -> &mut Builder {
        self.fields.push(field);
        self
    }

    pub fn fields(&mut self, fields: impl IntoIterator<Item = Field>) -> &mut Builder {
        self.fields.extend(fields);
        self
    }

    /// Every module reachable from the root, dependencies first.
    /// When two modules share a name, the first one reached wins.
    pub fn order(&self) -> Vec<&ModuleDef> {
        fn visit<'a>(def: &'a ModuleDef, seen: &mut HashSet<&'a str>, out: &mut Vec<&'a ModuleDef>) {
            if !seen.insert(&def.name) {
                return;
            }
            for dependency in def.dependencies.iter() {
                visit(dependency, seen, out);
            }
            out.push(def);
        }

        let mut seen = HashSet::new();
        let mut out = vec![];
        visit(&self.root, &mut seen, &mut out);
        out
    }

    /// Concatenates the fields of every module.
    /// Each module may only refer to what it and the modules
    /// before it define, so a broken module is caught and named
    /// as soon as it is linked.
    pub fn build(&self) -> Result<Module, CompileError> {
        let mut module = Module::default();

        for def in self.order() {
            debug!(module = %def.name, "linking");
            module.fields.extend(def.fields.iter().cloned());
            check(&module).map_err(|source| CompileError::Parse {
                module: def.name.clone(),
                source,
            })?;
        }

        module.fields.extend(self.fields.iter().cloned());
        Ok(module)
    }
}
