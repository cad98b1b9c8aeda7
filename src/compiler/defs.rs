use crate::runtime::closure;
use crate::wasm::ir::{Elem, Field, Func, FuncType, Instr, Local, Table, ValType};

/// Locals declared by the functions currently being compiled,
/// innermost last. A nested definition gets a fresh frame,
/// so its scratch locals never leak into the function around it.
#[derive(Debug, Default)]
struct Frames {
    frames: Vec<Vec<Local>>,
}

impl Frames {
    fn enter(&mut self) -> usize {
        self.frames.push(vec![]);
        self.frames.len()
    }

    /// Declares a local in the innermost frame.
    /// Declaring the same local twice is a no-op.
    fn declare(&mut self, local: Local) {
        if let Some(frame) = self.frames.last_mut() {
            if !frame.contains(&local) {
                frame.push(local);
            }
        }
    }

    fn leave(&mut self) -> Vec<Local> {
        self.frames.pop().unwrap_or_default()
    }
}

/// Collects the code of every function literal in the program.
/// Each one becomes a function with the shared closure signature
/// and a slot in the call table, in order of completion.
#[derive(Debug)]
pub struct FunctionDefs {
    frames: Frames,
    funcs:  Vec<Func>,
}

impl FunctionDefs {
    /// Starts with the frame of the entry point already open.
    pub fn new() -> FunctionDefs {
        let mut frames = Frames::default();
        frames.enter();
        FunctionDefs { frames, funcs: vec![] }
    }

    pub fn name(index: u32) -> String {
        format!("fn_{}", index)
    }

    /// Opens the frame of a nested function literal,
    /// returning how deep the definitions are now nested.
    pub fn enter(&mut self) -> usize {
        self.frames.enter()
    }

    pub fn declare(&mut self, local: Local) {
        self.frames.declare(local)
    }

    /// Closes the innermost function literal with `body`,
    /// returning its slot in the call table.
    pub fn leave(&mut self, body: Vec<Instr>) -> u32 {
        let index = self.funcs.len() as u32;
        let locals = self.frames.leave();
        self.funcs.push(Func {
            name:   FunctionDefs::name(index),
            params: vec![Local::i32(crate::runtime::env::LOCAL)],
            result: Some(ValType::I32),
            locals,
            body,
        });
        index
    }

    /// Locals of the entry point, once every nested definition is closed.
    pub fn root_locals(&mut self) -> Vec<Local> {
        self.frames.leave()
    }

    /// The closure signature and every function literal.
    pub fn build_funcs(&self) -> Vec<Field> {
        if self.funcs.is_empty() {
            return vec![];
        }

        let mut fields = vec![Field::Type(FuncType {
            name:   closure::TYPE.to_string(),
            params: vec![ValType::I32],
            result: Some(ValType::I32),
        })];
        fields.extend(self.funcs.iter().cloned().map(Field::Func));
        fields
    }

    /// The call table and its contents.
    pub fn build_tables(&self) -> Vec<Field> {
        if self.funcs.is_empty() {
            return vec![];
        }

        vec![
            Field::Table(Table {
                name: closure::TABLE.to_string(),
                size: self.funcs.len() as u32,
            }),
            Field::Elem(Elem {
                table:  closure::TABLE.to_string(),
                offset: 0,
                funcs:  self.funcs.iter().map(|f| f.name.clone()).collect(),
            }),
        ]
    }
}

impl Default for FunctionDefs {
    fn default() -> FunctionDefs {
        FunctionDefs::new()
    }
}

/// Collects one matcher function per pattern node.
/// A matcher takes `(env, value)` and returns the extended environment,
/// or zero if the value does not match.
#[derive(Debug, Default)]
pub struct MatcherDefs {
    frames: Frames,
    funcs:  Vec<Func>,
}

impl MatcherDefs {
    pub const ENV:   &'static str = "env";
    pub const VALUE: &'static str = "value";

    pub fn new() -> MatcherDefs {
        Default::default()
    }

    pub fn enter(&mut self) -> usize {
        self.frames.enter()
    }

    pub fn declare(&mut self, local: Local) {
        self.frames.declare(local)
    }

    /// Closes the innermost matcher, returning its name.
    pub fn leave(&mut self, body: Vec<Instr>) -> String {
        let name = format!("matcher_{}", self.funcs.len());
        let locals = self.frames.leave();
        self.funcs.push(Func {
            name:   name.clone(),
            params: vec![Local::i32(MatcherDefs::ENV), Local::i32(MatcherDefs::VALUE)],
            result: Some(ValType::I32),
            locals,
            body,
        });
        name
    }

    /// How many matchers have been closed so far.
    pub fn count(&self) -> usize {
        self.funcs.len()
    }

    pub fn build_funcs(&self) -> Vec<Field> {
        self.funcs.iter().cloned().map(Field::Func).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_locals_stay_apart() {
        let mut defs = FunctionDefs::new();
        defs.declare(Local::i32("outer"));
        assert_eq!(defs.enter(), 2);
        defs.declare(Local::i32("inner"));
        defs.declare(Local::i32("inner"));
        let index = defs.leave(vec![Instr::I32Const(1)]);

        assert_eq!(index, 0);
        assert_eq!(defs.funcs[0].locals, vec![Local::i32("inner")]);
        assert_eq!(defs.root_locals(), vec![Local::i32("outer")]);
    }

    #[test]
    fn table_in_completion_order() {
        let mut defs = FunctionDefs::new();
        defs.enter();
        defs.enter();
        defs.leave(vec![]);
        defs.leave(vec![]);

        match &defs.build_tables()[1] {
            Field::Elem(elem) => assert_eq!(elem.funcs, vec!["fn_0", "fn_1"]),
            other => panic!("expected an elem segment, found {:?}", other),
        }
        assert_eq!(defs.build_funcs().len(), 3);
    }

    #[test]
    fn no_functions_no_table() {
        let defs = FunctionDefs::new();
        assert!(defs.build_funcs().is_empty());
        assert!(defs.build_tables().is_empty());
    }
}
