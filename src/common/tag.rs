use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use crate::common::ty::Ty;

/// Every PicoML value is a single 32-bit word at runtime.
/// The low bits of the word say how the rest of it is to be read:
/// ```plain
/// Integer---------------------------------------------------------1
/// Address-------------------------------------------------0010    float
/// Address-------------------------------------------------0100    list
/// Address-------------------------------------------------1110    closure
/// 00000000000000000000000000000000                                false, []
/// 00000000000000000000000000000011                                true
/// ```
/// Integers carry 31 bits of payload, shifted up by one with the low bit set.
/// Everything larger lives in linear memory; a boxed word stores the
/// address of its payload shifted up by four, leaving room for the tag.
/// Boxed words always have the low bit clear, and are never zero,
/// because the heap starts past address zero.
///
/// Booleans and the empty list are unboxed and share the zero word,
/// so a word alone can not always be read back: `decode` needs the type too.
pub struct Word;

pub const INT_FLAG:   i32 = 0b0001;
pub const TAG_MASK:   i32 = 0b1110;
pub const TAG_SHIFT:  i32 = 4;

pub const FALSE:      i32 = 0b0000;
pub const TRUE:       i32 = 0b0011;
pub const EMPTY_LIST: i32 = 0b0000;

/// Environment word of the outermost scope.
pub const ROOT_ENV:   i32 = -1;
/// First address handed out by the allocator.
pub const HEAP_START: i32 = 4;

/// The tag of a boxed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Float   = 0b0010,
    List    = 0b0100,
    Closure = 0b1110,
}

impl Tag {
    pub fn bits(self) -> i32 {
        self as i32
    }

    /// Reads the tag of a boxed word.
    /// Integers and the zero word have no tag.
    pub fn of(word: i32) -> Option<Tag> {
        if word & INT_FLAG != 0 || word == 0 {
            return None;
        }

        match word & TAG_MASK {
            0b0010 => Some(Tag::Float),
            0b0100 => Some(Tag::List),
            0b1110 => Some(Tag::Closure),
            _      => None,
        }
    }
}

impl Word {
    /// Packs an integer, dropping its top bit.
    pub fn int(n: i32) -> i32 {
        n.wrapping_shl(1) | INT_FLAG
    }

    pub fn boolean(b: bool) -> i32 {
        if b { TRUE } else { FALSE }
    }

    /// Packs a heap address under a tag.
    pub fn boxed(address: u32, tag: Tag) -> i32 {
        ((address << TAG_SHIFT) as i32) | tag.bits()
    }

    /// Recovers the integer from a packed word.
    pub fn unpack_int(word: i32) -> i32 {
        word >> 1
    }

    /// Recovers the heap address from a boxed word.
    pub fn address(word: i32) -> usize {
        ((word as u32) >> TAG_SHIFT) as usize
    }
}

/// A PicoML value read back out of a finished program,
/// as the host sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Float(f64),
    List(Vec<Value>),
    /// A closure is opaque: the environment word it captured,
    /// and the slot of its code in the call table.
    Closure { env: i32, index: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("address {address:#x} is outside of linear memory")]
    OutOfBounds { address: usize },
    #[error("word {word:#x} is not a {expected}")]
    Tag { word: i32, expected: &'static str },
    #[error("can not decode a value of unresolved type")]
    Unresolved,
}

fn load_i32(memory: &[u8], address: usize) -> Result<i32, DecodeError> {
    let bytes = memory.get(address..address + 4)
        .ok_or(DecodeError::OutOfBounds { address })?;
    let mut word = [0; 4];
    word.copy_from_slice(bytes);
    Ok(i32::from_le_bytes(word))
}

fn load_f64(memory: &[u8], address: usize) -> Result<f64, DecodeError> {
    let bytes = memory.get(address..address + 8)
        .ok_or(DecodeError::OutOfBounds { address })?;
    let mut double = [0; 8];
    double.copy_from_slice(bytes);
    Ok(f64::from_le_bytes(double))
}

fn expect(word: i32, tag: Tag, expected: &'static str) -> Result<usize, DecodeError> {
    match Tag::of(word) {
        Some(t) if t == tag => Ok(Word::address(word)),
        _ => Err(DecodeError::Tag { word, expected }),
    }
}

impl Value {
    /// Reads a word of a known type back into a `Value`,
    /// following pointers into a snapshot of linear memory.
    pub fn decode(word: i32, ty: &Ty, memory: &[u8]) -> Result<Value, DecodeError> {
        let value = match ty {
            Ty::Int => {
                if word & INT_FLAG == 0 {
                    return Err(DecodeError::Tag { word, expected: "integer" });
                }
                Value::Int(Word::unpack_int(word))
            },
            Ty::Bool  => Value::Bool(word != FALSE),
            Ty::Float => {
                let address = expect(word, Tag::Float, "float")?;
                Value::Float(load_f64(memory, address)?)
            },
            Ty::List(item) => {
                let mut items = vec![];
                let mut cell = word;
                // each cell is a pair of (tail, head)
                while cell != EMPTY_LIST {
                    let address = expect(cell, Tag::List, "list")?;
                    let head = load_i32(memory, address + 4)?;
                    items.push(Value::decode(head, item, memory)?);
                    cell = load_i32(memory, address)?;
                }
                Value::List(items)
            },
            Ty::Fun(_, _) => {
                let address = expect(word, Tag::Closure, "closure")?;
                Value::Closure {
                    env:   load_i32(memory, address)?,
                    index: load_i32(memory, address + 4)?,
                }
            },
            Ty::Var(_) => return Err(DecodeError::Unresolved),
        };

        Ok(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n)   => write!(f, "{}", n),
            Value::Bool(b)  => write!(f, "{}", b),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index != 0 { write!(f, "; ")?; }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            },
            Value::Closure { index, .. } => write!(f, "<fun {}>", index),
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn tags_are_disjoint() {
        assert_eq!(Tag::of(Word::int(7)), None);
        assert_eq!(Tag::of(FALSE), None);
        assert_eq!(Tag::of(Word::boxed(8, Tag::Float)), Some(Tag::Float));
        assert_eq!(Tag::of(Word::boxed(8, Tag::List)), Some(Tag::List));
        assert_eq!(Tag::of(Word::boxed(8, Tag::Closure)), Some(Tag::Closure));
    }

    #[test]
    fn decode_list() {
        // [1; 2] laid out at 4 (tail = 12) and 12 (tail = [])
        let mut memory = vec![0u8; 20];
        memory[4..8].copy_from_slice(&Word::boxed(12, Tag::List).to_le_bytes());
        memory[8..12].copy_from_slice(&Word::int(1).to_le_bytes());
        memory[12..16].copy_from_slice(&EMPTY_LIST.to_le_bytes());
        memory[16..20].copy_from_slice(&Word::int(2).to_le_bytes());

        let word = Word::boxed(4, Tag::List);
        let value = Value::decode(word, &Ty::list(Ty::Int), &memory).unwrap();
        assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(value.to_string(), "[1; 2]");
    }

    #[test]
    fn decode_out_of_bounds() {
        let word = Word::boxed(64, Tag::Float);
        let result = Value::decode(word, &Ty::Float, &[0; 16]);
        assert_eq!(result, Err(DecodeError::OutOfBounds { address: 64 }));
    }

    proptest! {
        #[test]
        fn ints_survive_packing(n in -(1i32 << 30)..(1i32 << 30)) {
            let word = Word::int(n);
            prop_assert_eq!(word & INT_FLAG, INT_FLAG);
            prop_assert_eq!(Value::decode(word, &Ty::Int, &[]), Ok(Value::Int(n)));
        }
    }
}
