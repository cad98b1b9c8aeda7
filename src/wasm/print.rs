use std::fmt::{self, Display, Formatter};

use crate::wasm::ir::*;

/// Writes `f64` constants the way the text format expects them.
fn float(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "inf" } else { "-inf" }).to_string()
    } else {
        format!("{:?}", n)
    }
}

/// Writes a flat instruction sequence, one instruction per line.
fn instrs(f: &mut Formatter<'_>, body: &[Instr], depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    for instr in body {
        match instr {
            Instr::If { result, then, otherwise } => {
                match result {
                    Some(ty) => writeln!(f, "{}if (result {})", indent, ty.text())?,
                    None     => writeln!(f, "{}if", indent)?,
                }
                instrs(f, then, depth + 1)?;
                if !otherwise.is_empty() {
                    writeln!(f, "{}else", indent)?;
                    instrs(f, otherwise, depth + 1)?;
                }
                writeln!(f, "{}end", indent)?;
            },
            other => writeln!(f, "{}{}", indent, other)?,
        }
    }
    Ok(())
}

impl Display for Instr {
    /// Single-line form; nested blocks are only spelled out by `instrs`.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Op(op)          => write!(f, "{}", op.mnemonic()),
            Instr::I32Const(n)     => write!(f, "i32.const {}", n),
            Instr::F64Const(n)     => write!(f, "f64.const {}", float(*n)),
            Instr::LocalGet(name)  => write!(f, "local.get ${}", name),
            Instr::LocalSet(name)  => write!(f, "local.set ${}", name),
            Instr::LocalTee(name)  => write!(f, "local.tee ${}", name),
            Instr::GlobalGet(name) => write!(f, "global.get ${}", name),
            Instr::GlobalSet(name) => write!(f, "global.set ${}", name),
            Instr::Call(name)      => write!(f, "call ${}", name),
            Instr::CallIndirect { table, ty } => write!(f, "call_indirect ${} (type ${})", table, ty),
            Instr::Load { ty, offset } | Instr::Store { ty, offset } => {
                let verb = if matches!(self, Instr::Load { .. }) { "load" } else { "store" };
                write!(f, "{}.{}", ty.text(), verb)?;
                if *offset != 0 { write!(f, " offset={}", offset)?; }
                Ok(())
            },
            Instr::If { result, .. } => match result {
                Some(ty) => write!(f, "if (result {}) ...", ty.text()),
                None     => write!(f, "if ..."),
            },
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Field::Type(ty) => {
                write!(f, "(type ${} (func", ty.name)?;
                for param in ty.params.iter() {
                    write!(f, " (param {})", param.text())?;
                }
                if let Some(result) = ty.result {
                    write!(f, " (result {})", result.text())?;
                }
                write!(f, "))")
            },
            Field::Func(func) => {
                write!(f, "(func ${}", func.name)?;
                for param in func.params.iter() {
                    write!(f, " (param ${} {})", param.name, param.ty.text())?;
                }
                if let Some(result) = func.result {
                    write!(f, " (result {})", result.text())?;
                }
                for local in func.locals.iter() {
                    write!(f, " (local ${} {})", local.name, local.ty.text())?;
                }
                writeln!(f)?;
                instrs(f, &func.body, 2)?;
                write!(f, "  )")
            },
            Field::Global(global) => {
                let ty = if global.mutable { "(mut i32)" } else { "i32" };
                write!(f, "(global ${} {} (i32.const {}))", global.name, ty, global.init)
            },
            Field::Memory(memory) => write!(f, "(memory ${} {})", memory.name, memory.pages),
            Field::Table(table)   => write!(f, "(table ${} {} funcref)", table.name, table.size),
            Field::Elem(elem) => {
                write!(f, "(elem (table ${}) (i32.const {}) func", elem.table, elem.offset)?;
                for func in elem.funcs.iter() {
                    write!(f, " ${}", func)?;
                }
                write!(f, ")")
            },
            Field::Export(export) => write!(
                f, "(export \"{}\" ({} ${}))",
                export.name, export.kind.text(), export.target,
            ),
        }
    }
}

impl Display for Module {
    /// Prints the module in the WebAssembly text format,
    /// with flat (unfolded) instructions.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "(module")?;
        for field in self.fields.iter() {
            writeln!(f, "  {}", field)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_if() {
        let func = Func {
            name:   "pick".to_string(),
            params: vec![Local::i32("flag")],
            result: Some(ValType::I32),
            locals: vec![],
            body:   vec![
                Instr::local_get("flag"),
                Instr::if_i32(vec![Instr::I32Const(3)], vec![Instr::I32Const(0)]),
            ],
        };
        let target = "(module\n  (func $pick (param $flag i32) (result i32)\n    local.get $flag\n    if (result i32)\n      i32.const 3\n    else\n      i32.const 0\n    end\n  )\n)";
        assert_eq!(Module::new(vec![Field::Func(func)]).to_string(), target);
    }

    #[test]
    fn floats() {
        assert_eq!(Instr::F64Const(1.0).to_string(), "f64.const 1.0");
        assert_eq!(Instr::F64Const(f64::NEG_INFINITY).to_string(), "f64.const -inf");
        assert_eq!(Instr::Load { ty: ValType::I32, offset: 4 }.to_string(), "i32.load offset=4");
    }
}
