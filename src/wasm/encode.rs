use std::{borrow::Cow, collections::HashMap};

use thiserror::Error;
use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, ElementSection, Elements, ExportSection,
    Function, FunctionSection, GlobalSection, GlobalType, IndirectNameMap, Instruction,
    MemArg, MemorySection, MemoryType, NameMap, NameSection, RefType, TableSection,
    TableType, TypeSection,
};

use crate::wasm::ir::*;

/// Raised when a linked module refers to something it never defines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("undefined {kind} `${name}`")]
    Undefined { kind: &'static str, name: String },
    #[error("`${name}` is defined twice")]
    Duplicate { name: String },
}

fn undefined(kind: &'static str, name: &str) -> EncodeError {
    EncodeError::Undefined { kind, name: name.to_string() }
}

impl From<ValType> for wasm_encoder::ValType {
    fn from(ty: ValType) -> Self {
        match ty {
            ValType::I32 => wasm_encoder::ValType::I32,
            ValType::F64 => wasm_encoder::ValType::F64,
        }
    }
}

/// Name to index maps for one index space.
#[derive(Default)]
struct Space {
    indices: HashMap<String, u32>,
    names:   Vec<String>,
}

impl Space {
    fn define(&mut self, name: &str) -> Result<u32, EncodeError> {
        let index = self.names.len() as u32;
        if self.indices.insert(name.to_string(), index).is_some() {
            return Err(EncodeError::Duplicate { name: name.to_string() });
        }
        self.names.push(name.to_string());
        Ok(index)
    }

    fn get(&self, kind: &'static str, name: &str) -> Result<u32, EncodeError> {
        self.indices.get(name).copied().ok_or_else(|| undefined(kind, name))
    }

    fn name_map(&self) -> NameMap {
        let mut map = NameMap::new();
        for (index, name) in self.names.iter().enumerate() {
            map.append(index as u32, name);
        }
        map
    }
}

/// Signatures, deduplicated structurally.
#[derive(Default)]
struct Types {
    named:      HashMap<String, u32>,
    signatures: Vec<(Vec<ValType>, Option<ValType>)>,
}

impl Types {
    fn intern(&mut self, params: Vec<ValType>, result: Option<ValType>) -> u32 {
        let signature = (params, result);
        match self.signatures.iter().position(|s| s == &signature) {
            Some(index) => index as u32,
            None => {
                self.signatures.push(signature);
                self.signatures.len() as u32 - 1
            },
        }
    }
}

struct Encoder<'a> {
    module:  &'a Module,
    types:   Types,
    funcs:   Space,
    globals: Space,
    memories: Space,
    tables:  Space,
}

impl<'a> Encoder<'a> {
    fn new(module: &'a Module) -> Result<Encoder<'a>, EncodeError> {
        let mut encoder = Encoder {
            module,
            types:    Types::default(),
            funcs:    Space::default(),
            globals:  Space::default(),
            memories: Space::default(),
            tables:   Space::default(),
        };

        for field in module.fields.iter() {
            match field {
                Field::Type(ty) => {
                    let index = encoder.types.intern(ty.params.clone(), ty.result);
                    encoder.types.named.insert(ty.name.clone(), index);
                },
                Field::Func(func)     => { encoder.funcs.define(&func.name)?; },
                Field::Global(global) => { encoder.globals.define(&global.name)?; },
                Field::Memory(memory) => { encoder.memories.define(&memory.name)?; },
                Field::Table(table)   => { encoder.tables.define(&table.name)?; },
                Field::Elem(_) | Field::Export(_) => (),
            }
        }

        Ok(encoder)
    }

    fn locals(func: &Func) -> Result<Space, EncodeError> {
        let mut locals = Space::default();
        for local in func.params.iter().chain(func.locals.iter()) {
            locals.define(&local.name)?;
        }
        Ok(locals)
    }

    fn instrs(
        &self,
        out: &mut Function,
        locals: &Space,
        body: &[Instr],
    ) -> Result<(), EncodeError> {
        for instr in body {
            match instr {
                Instr::Op(op) => { out.instruction(&op_instruction(*op)); },
                Instr::I32Const(n) => { out.instruction(&Instruction::I32Const(*n)); },
                Instr::F64Const(n) => { out.instruction(&Instruction::F64Const(*n)); },
                Instr::LocalGet(n) => { out.instruction(&Instruction::LocalGet(locals.get("local", n)?)); },
                Instr::LocalSet(n) => { out.instruction(&Instruction::LocalSet(locals.get("local", n)?)); },
                Instr::LocalTee(n) => { out.instruction(&Instruction::LocalTee(locals.get("local", n)?)); },
                Instr::GlobalGet(n) => { out.instruction(&Instruction::GlobalGet(self.globals.get("global", n)?)); },
                Instr::GlobalSet(n) => { out.instruction(&Instruction::GlobalSet(self.globals.get("global", n)?)); },
                Instr::Call(n) => { out.instruction(&Instruction::Call(self.funcs.get("function", n)?)); },
                Instr::CallIndirect { table, ty } => {
                    let type_index = self.types.named.get(ty).copied()
                        .ok_or_else(|| undefined("type", ty))?;
                    let table_index = self.tables.get("table", table)?;
                    out.instruction(&Instruction::CallIndirect { type_index, table_index });
                },
                Instr::Load { ty, offset } => {
                    let arg = mem_arg(*ty, *offset);
                    out.instruction(&match ty {
                        ValType::I32 => Instruction::I32Load(arg),
                        ValType::F64 => Instruction::F64Load(arg),
                    });
                },
                Instr::Store { ty, offset } => {
                    let arg = mem_arg(*ty, *offset);
                    out.instruction(&match ty {
                        ValType::I32 => Instruction::I32Store(arg),
                        ValType::F64 => Instruction::F64Store(arg),
                    });
                },
                Instr::If { result, then, otherwise } => {
                    let block = match result {
                        Some(ty) => BlockType::Result((*ty).into()),
                        None     => BlockType::Empty,
                    };
                    out.instruction(&Instruction::If(block));
                    self.instrs(out, locals, then)?;
                    if !otherwise.is_empty() {
                        out.instruction(&Instruction::Else);
                        self.instrs(out, locals, otherwise)?;
                    }
                    out.instruction(&Instruction::End);
                },
            }
        }
        Ok(())
    }

    fn encode(mut self, names: bool) -> Result<Vec<u8>, EncodeError> {
        let mut functions = FunctionSection::new();
        let mut code = CodeSection::new();
        let mut local_names = IndirectNameMap::new();

        let module = self.module;
        for (index, func) in module.funcs().enumerate() {
            let params = func.params.iter().map(|p| p.ty).collect();
            functions.function(self.types.intern(params, func.result));

            let locals = Encoder::locals(func)?;
            let mut out = Function::new(func.locals.iter().map(|l| (1u32, wasm_encoder::ValType::from(l.ty))));
            self.instrs(&mut out, &locals, &func.body)?;
            out.instruction(&Instruction::End);
            code.function(&out);
            local_names.append(index as u32, &locals.name_map());
        }

        let mut types = TypeSection::new();
        for (params, result) in self.types.signatures.iter() {
            let params: Vec<wasm_encoder::ValType> = params.iter().map(|&p| p.into()).collect();
            let results: Vec<wasm_encoder::ValType> = result.iter().map(|&r| r.into()).collect();
            types.ty().function(params, results);
        }

        let mut tables = TableSection::new();
        let mut memories = MemorySection::new();
        let mut globals = GlobalSection::new();
        let mut exports = ExportSection::new();
        let mut elements = ElementSection::new();

        for field in module.fields.iter() {
            match field {
                Field::Table(table) => {
                    tables.table(TableType {
                        element_type: RefType::FUNCREF,
                        minimum:      table.size as u64,
                        maximum:      Some(table.size as u64),
                        table64:      false,
                        shared:       false,
                    });
                },
                Field::Memory(memory) => {
                    memories.memory(MemoryType {
                        minimum:        memory.pages as u64,
                        maximum:        None,
                        memory64:       false,
                        shared:         false,
                        page_size_log2: None,
                    });
                },
                Field::Global(global) => {
                    globals.global(
                        GlobalType {
                            val_type: wasm_encoder::ValType::I32,
                            mutable:  global.mutable,
                            shared:   false,
                        },
                        &ConstExpr::i32_const(global.init),
                    );
                },
                Field::Export(export) => {
                    let (kind, index) = match export.kind {
                        ExportKind::Func   => (wasm_encoder::ExportKind::Func, self.funcs.get("function", &export.target)?),
                        ExportKind::Memory => (wasm_encoder::ExportKind::Memory, self.memories.get("memory", &export.target)?),
                        ExportKind::Global => (wasm_encoder::ExportKind::Global, self.globals.get("global", &export.target)?),
                    };
                    exports.export(&export.name, kind, index);
                },
                Field::Elem(elem) => {
                    let table = self.tables.get("table", &elem.table)?;
                    let funcs = elem.funcs.iter()
                        .map(|f| self.funcs.get("function", f))
                        .collect::<Result<Vec<_>, _>>()?;
                    elements.active(
                        Some(table),
                        &ConstExpr::i32_const(elem.offset),
                        Elements::Functions(Cow::Owned(funcs)),
                    );
                },
                Field::Type(_) | Field::Func(_) => (),
            }
        }

        let mut binary = wasm_encoder::Module::new();
        binary.section(&types);
        binary.section(&functions);
        if !tables.is_empty()   { binary.section(&tables); }
        if !memories.is_empty() { binary.section(&memories); }
        if !globals.is_empty()  { binary.section(&globals); }
        binary.section(&exports);
        if !elements.is_empty() { binary.section(&elements); }
        binary.section(&code);

        if names {
            let mut section = NameSection::new();
            section.functions(&self.funcs.name_map());
            section.locals(&local_names);
            section.globals(&self.globals.name_map());
            binary.section(&section);
        }

        Ok(binary.finish())
    }
}

fn mem_arg(ty: ValType, offset: u32) -> MemArg {
    MemArg {
        offset:       offset as u64,
        align:        match ty { ValType::I32 => 2, ValType::F64 => 3 },
        memory_index: 0,
    }
}

fn op_instruction(op: Op) -> Instruction<'static> {
    match op {
        Op::Unreachable => Instruction::Unreachable,
        Op::Nop         => Instruction::Nop,
        Op::Drop        => Instruction::Drop,
        Op::Select      => Instruction::Select,
        Op::Return      => Instruction::Return,
        Op::I32Eqz      => Instruction::I32Eqz,
        Op::I32Eq       => Instruction::I32Eq,
        Op::I32Ne       => Instruction::I32Ne,
        Op::I32LtS      => Instruction::I32LtS,
        Op::I32LeS      => Instruction::I32LeS,
        Op::I32GtS      => Instruction::I32GtS,
        Op::I32GeS      => Instruction::I32GeS,
        Op::I32Add      => Instruction::I32Add,
        Op::I32Sub      => Instruction::I32Sub,
        Op::I32Mul      => Instruction::I32Mul,
        Op::I32DivS     => Instruction::I32DivS,
        Op::I32And      => Instruction::I32And,
        Op::I32Or       => Instruction::I32Or,
        Op::I32Shl      => Instruction::I32Shl,
        Op::I32ShrS     => Instruction::I32ShrS,
        Op::I32ShrU     => Instruction::I32ShrU,
        Op::F64Eq       => Instruction::F64Eq,
        Op::F64Ne       => Instruction::F64Ne,
        Op::F64Lt       => Instruction::F64Lt,
        Op::F64Le       => Instruction::F64Le,
        Op::F64Gt       => Instruction::F64Gt,
        Op::F64Ge       => Instruction::F64Ge,
        Op::F64Neg      => Instruction::F64Neg,
        Op::F64Add      => Instruction::F64Add,
        Op::F64Sub      => Instruction::F64Sub,
        Op::F64Mul      => Instruction::F64Mul,
        Op::F64Div      => Instruction::F64Div,
    }
}

/// Resolves every symbolic name in a linked module and
/// produces the binary format.
/// When `names` is set, a custom name section is appended
/// so that traps and disassembly show the original names.
pub fn encode(module: &Module, names: bool) -> Result<Vec<u8>, EncodeError> {
    Encoder::new(module)?.encode(names)
}

/// Checks that every name in `module` is defined exactly once.
pub fn check(module: &Module) -> Result<(), EncodeError> {
    encode(module, false).map(|_| ())
}
