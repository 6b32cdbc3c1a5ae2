//! record/value — типизированные значения колонок и декодированная запись.
//!
//! Отсутствие значения (NULL фиксированной/variable колонки, нет tagged-колонки в записи)
//! выражается `Field::Absent`, а не нулём/пустой строкой.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::util::to_hex;

/// GUID в on-disk порядке: первые три группы little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    pub fn from_slice(b: &[u8]) -> Option<Self> {
        let arr: [u8; 16] = b.try_into().ok()?;
        Some(Guid(arr))
    }

    /// Разобрать текстовую форму `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` (фигурные скобки допустимы).
    pub fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('{').trim_end_matches('}');
        let hex: String = s.chars().filter(|c| *c != '-').collect();
        if hex.len() != 32 || s.len() != 36 {
            return None;
        }
        let mut v = [0u8; 16];
        for (i, b) in v.iter_mut().enumerate() {
            *b = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        // Текстовая форма big-endian по группам → on-disk (LE для первых трёх групп).
        v[0..4].reverse();
        v[4..6].reverse();
        v[6..8].reverse();
        Some(Guid(v))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12], b[13],
            b[14], b[15]
        )
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

fn serialize_hex<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&to_hex(v))
}

/// Значение колонки.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    Currency(i64),
    F32(f32),
    F64(f64),
    /// Сырые 8 байт DateTime (UAL хранит в них FILETIME).
    DateTime(u64),
    Guid(Guid),
    Text(String),
    Binary(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
    Multi(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Guid> {
        match self {
            Value::Guid(g) => Some(*g),
            Value::Binary(b) => Guid::from_slice(b),
            _ => None,
        }
    }

    /// Целочисленное значение любого целого типа.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Bool(b) => Some(b as i64),
            Value::U8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::I64(v) | Value::Currency(v) => Some(v),
            _ => None,
        }
    }

    /// Сырые 8 байт DateTime либо 64-битное целое (FILETIME).
    pub fn as_filetime(&self) -> Option<u64> {
        match *self {
            Value::DateTime(v) => Some(v),
            Value::I64(v) | Value::Currency(v) if v >= 0 => Some(v as u64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I64(v) | Value::Currency(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "0x{:016x}", v),
            Value::Guid(g) => write!(f, "{}", g),
            Value::Text(s) => write!(f, "{}", s),
            Value::Binary(b) => write!(f, "{}", to_hex(b)),
            Value::Multi(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Значение колонки в записи: присутствует или логически отсутствует.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Field {
    Present(Value),
    Absent,
}

impl Field {
    #[inline]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Field::Present(v) => Some(v),
            Field::Absent => None,
        }
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }
}

/// Колонка декодированной записи.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordField {
    pub column_id: u32,
    pub name: String,
    pub field: Field,
}

/// Декодированная строка таблицы (колонки — в порядке id).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    pub table: String,
    pub fields: Vec<RecordField>,
}

impl DecodedRecord {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.field)
    }

    /// Значение колонки; None — колонка отсутствует в схеме или значение Absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).and_then(Field::value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_guid(&self, name: &str) -> Option<Guid> {
        self.get(name).and_then(Value::as_guid)
    }

    pub fn get_filetime(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_filetime)
    }
}
