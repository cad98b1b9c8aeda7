//! A small structured representation of the WebAssembly subset the back end emits.
//! Every reference (locals, globals, functions, types, tables) is symbolic,
//! so fragments produced by different modules can be concatenated freely;
//! names are resolved to indices only when the module is encoded.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    I32,
    F64,
}

impl ValType {
    pub fn text(self) -> &'static str {
        match self {
            ValType::I32 => "i32",
            ValType::F64 => "f64",
        }
    }
}

macro_rules! ops {
    ($($variant:ident => $text:literal,)*) => {
        /// Instructions that take no immediates.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Op {
            $($variant,)*
        }

        impl Op {
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Op::$variant => $text,)*
                }
            }
        }
    };
}

ops! {
    Unreachable => "unreachable",
    Nop         => "nop",
    Drop        => "drop",
    Select      => "select",
    Return      => "return",

    I32Eqz      => "i32.eqz",
    I32Eq       => "i32.eq",
    I32Ne       => "i32.ne",
    I32LtS      => "i32.lt_s",
    I32LeS      => "i32.le_s",
    I32GtS      => "i32.gt_s",
    I32GeS      => "i32.ge_s",
    I32Add      => "i32.add",
    I32Sub      => "i32.sub",
    I32Mul      => "i32.mul",
    I32DivS     => "i32.div_s",
    I32And      => "i32.and",
    I32Or       => "i32.or",
    I32Shl      => "i32.shl",
    I32ShrS     => "i32.shr_s",
    I32ShrU     => "i32.shr_u",

    F64Eq       => "f64.eq",
    F64Ne       => "f64.ne",
    F64Lt       => "f64.lt",
    F64Le       => "f64.le",
    F64Gt       => "f64.gt",
    F64Ge       => "f64.ge",
    F64Neg      => "f64.neg",
    F64Add      => "f64.add",
    F64Sub      => "f64.sub",
    F64Mul      => "f64.mul",
    F64Div      => "f64.div",
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Op(Op),
    I32Const(i32),
    F64Const(f64),
    LocalGet(String),
    LocalSet(String),
    LocalTee(String),
    GlobalGet(String),
    GlobalSet(String),
    Call(String),
    /// Calls through `table` with the signature declared as `ty`.
    CallIndirect { table: String, ty: String },
    Load  { ty: ValType, offset: u32 },
    Store { ty: ValType, offset: u32 },
    If {
        result:    Option<ValType>,
        then:      Vec<Instr>,
        otherwise: Vec<Instr>,
    },
}

/// Shortcuts for building instruction sequences by hand.
impl Instr {
    pub fn op(op: Op) -> Instr { Instr::Op(op) }
    pub fn call(name: &str) -> Instr { Instr::Call(name.to_string()) }
    pub fn local_get(name: &str) -> Instr { Instr::LocalGet(name.to_string()) }
    pub fn local_set(name: &str) -> Instr { Instr::LocalSet(name.to_string()) }
    pub fn local_tee(name: &str) -> Instr { Instr::LocalTee(name.to_string()) }
    pub fn global_get(name: &str) -> Instr { Instr::GlobalGet(name.to_string()) }
    pub fn global_set(name: &str) -> Instr { Instr::GlobalSet(name.to_string()) }
    pub fn load(ty: ValType, offset: u32) -> Instr { Instr::Load { ty, offset } }
    pub fn store(ty: ValType, offset: u32) -> Instr { Instr::Store { ty, offset } }

    /// An `if` producing a single `i32`, the only kind the back end emits.
    pub fn if_i32(then: Vec<Instr>, otherwise: Vec<Instr>) -> Instr {
        Instr::If { result: Some(ValType::I32), then, otherwise }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub ty:   ValType,
}

impl Local {
    pub fn new(name: &str, ty: ValType) -> Local {
        Local { name: name.to_string(), ty }
    }

    pub fn i32(name: &str) -> Local {
        Local::new(name, ValType::I32)
    }
}

/// A named function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    pub name:   String,
    pub params: Vec<ValType>,
    pub result: Option<ValType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub name:   String,
    pub params: Vec<Local>,
    pub result: Option<ValType>,
    pub locals: Vec<Local>,
    pub body:   Vec<Instr>,
}

impl Func {
    /// A function from `i32` parameters to one `i32`.
    pub fn words(name: &str, params: &[&str], body: Vec<Instr>) -> Func {
        Func {
            name:   name.to_string(),
            params: params.iter().map(|param| Local::i32(param)).collect(),
            result: Some(ValType::I32),
            locals: vec![],
            body,
        }
    }

    pub fn with_local(mut self, local: Local) -> Func {
        self.locals.push(local);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name:    String,
    pub mutable: bool,
    pub init:    i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub name:  String,
    pub pages: u32,
}

/// A table of function references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub size: u32,
}

/// Fills `table` with `funcs`, starting at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elem {
    pub table:  String,
    pub offset: i32,
    pub funcs:  Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Func,
    Memory,
    Global,
}

impl ExportKind {
    pub fn text(self) -> &'static str {
        match self {
            ExportKind::Func   => "func",
            ExportKind::Memory => "memory",
            ExportKind::Global => "global",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name:   String,
    pub kind:   ExportKind,
    pub target: String,
}

/// A top-level declaration of a module.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Type(FuncType),
    Func(Func),
    Global(Global),
    Memory(Memory),
    Table(Table),
    Elem(Elem),
    Export(Export),
}

/// A module is an ordered list of fields.
/// Linking two modules is concatenating their fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub fields: Vec<Field>,
}

impl Module {
    pub fn new(fields: Vec<Field>) -> Module {
        Module { fields }
    }

    pub fn funcs(&self) -> impl Iterator<Item = &Func> {
        self.fields.iter().filter_map(|field| match field {
            Field::Func(func) => Some(func),
            _ => None,
        })
    }

    pub fn funcs_mut(&mut self) -> impl Iterator<Item = &mut Func> {
        self.fields.iter_mut().filter_map(|field| match field {
            Field::Func(func) => Some(func),
            _ => None,
        })
    }

    pub fn func(&self, name: &str) -> Option<&Func> {
        self.funcs().find(|func| func.name == name)
    }
}
