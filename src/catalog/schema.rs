//! catalog/schema — описание таблиц: типы колонок, дескрипторы колонок/индексов, TableSchema.

use serde::Serialize;

use crate::consts::{
    COLTYP_BINARY, COLTYP_BIT, COLTYP_CURRENCY, COLTYP_DATETIME, COLTYP_GUID,
    COLTYP_IEEE_DOUBLE, COLTYP_IEEE_SINGLE, COLTYP_LONG, COLTYP_LONG_BINARY, COLTYP_LONG_LONG,
    COLTYP_LONG_TEXT, COLTYP_NIL, COLTYP_SHORT, COLTYP_SLV, COLTYP_TEXT, COLTYP_UNSIGNED_BYTE,
    COLTYP_UNSIGNED_LONG, COLTYP_UNSIGNED_SHORT, COLUMN_FLAG_MULTI_VALUED, FIXED_COLUMN_MAX,
    TAGGED_COLUMN_FIRST, VARIABLE_COLUMN_MAX,
};

/// Тип колонки (JET_coltyp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Nil,
    Bit,
    UnsignedByte,
    Short,
    Long,
    Currency,
    IeeeSingle,
    IeeeDouble,
    DateTime,
    Binary,
    Text,
    LongBinary,
    LongText,
    Slv,
    UnsignedLong,
    LongLong,
    Guid,
    UnsignedShort,
    Unknown(u32),
}

impl ColumnType {
    pub fn from_coltyp(v: u32) -> Self {
        match v {
            COLTYP_NIL => ColumnType::Nil,
            COLTYP_BIT => ColumnType::Bit,
            COLTYP_UNSIGNED_BYTE => ColumnType::UnsignedByte,
            COLTYP_SHORT => ColumnType::Short,
            COLTYP_LONG => ColumnType::Long,
            COLTYP_CURRENCY => ColumnType::Currency,
            COLTYP_IEEE_SINGLE => ColumnType::IeeeSingle,
            COLTYP_IEEE_DOUBLE => ColumnType::IeeeDouble,
            COLTYP_DATETIME => ColumnType::DateTime,
            COLTYP_BINARY => ColumnType::Binary,
            COLTYP_TEXT => ColumnType::Text,
            COLTYP_LONG_BINARY => ColumnType::LongBinary,
            COLTYP_LONG_TEXT => ColumnType::LongText,
            COLTYP_SLV => ColumnType::Slv,
            COLTYP_UNSIGNED_LONG => ColumnType::UnsignedLong,
            COLTYP_LONG_LONG => ColumnType::LongLong,
            COLTYP_GUID => ColumnType::Guid,
            COLTYP_UNSIGNED_SHORT => ColumnType::UnsignedShort,
            other => ColumnType::Unknown(other),
        }
    }

    pub fn to_coltyp(self) -> u32 {
        match self {
            ColumnType::Nil => COLTYP_NIL,
            ColumnType::Bit => COLTYP_BIT,
            ColumnType::UnsignedByte => COLTYP_UNSIGNED_BYTE,
            ColumnType::Short => COLTYP_SHORT,
            ColumnType::Long => COLTYP_LONG,
            ColumnType::Currency => COLTYP_CURRENCY,
            ColumnType::IeeeSingle => COLTYP_IEEE_SINGLE,
            ColumnType::IeeeDouble => COLTYP_IEEE_DOUBLE,
            ColumnType::DateTime => COLTYP_DATETIME,
            ColumnType::Binary => COLTYP_BINARY,
            ColumnType::Text => COLTYP_TEXT,
            ColumnType::LongBinary => COLTYP_LONG_BINARY,
            ColumnType::LongText => COLTYP_LONG_TEXT,
            ColumnType::Slv => COLTYP_SLV,
            ColumnType::UnsignedLong => COLTYP_UNSIGNED_LONG,
            ColumnType::LongLong => COLTYP_LONG_LONG,
            ColumnType::Guid => COLTYP_GUID,
            ColumnType::UnsignedShort => COLTYP_UNSIGNED_SHORT,
            ColumnType::Unknown(v) => v,
        }
    }

    /// Размер значения для типов фиксированной длины.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ColumnType::Bit | ColumnType::UnsignedByte => Some(1),
            ColumnType::Short | ColumnType::UnsignedShort => Some(2),
            ColumnType::Long | ColumnType::UnsignedLong | ColumnType::IeeeSingle => Some(4),
            ColumnType::Currency
            | ColumnType::IeeeDouble
            | ColumnType::DateTime
            | ColumnType::LongLong => Some(8),
            ColumnType::Guid => Some(16),
            _ => None,
        }
    }

    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::LongText)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Nil => "nil",
            ColumnType::Bit => "bool",
            ColumnType::UnsignedByte => "u8",
            ColumnType::Short => "i16",
            ColumnType::Long => "i32",
            ColumnType::Currency => "currency",
            ColumnType::IeeeSingle => "f32",
            ColumnType::IeeeDouble => "f64",
            ColumnType::DateTime => "datetime",
            ColumnType::Binary => "binary",
            ColumnType::Text => "text",
            ColumnType::LongBinary => "long_binary",
            ColumnType::LongText => "long_text",
            ColumnType::Slv => "slv",
            ColumnType::UnsignedLong => "u32",
            ColumnType::LongLong => "i64",
            ColumnType::Guid => "guid",
            ColumnType::UnsignedShort => "u16",
            ColumnType::Unknown(_) => "unknown",
        }
    }
}

/// Класс колонки по её идентификатору.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnClass {
    Fixed,
    Variable,
    Tagged,
}

/// Дескриптор колонки (строка типа 2 в каталоге).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub id: u32,
    pub name: String,
    pub coltyp: ColumnType,
    /// SpaceUsage: максимальный/фиксированный размер.
    pub space_usage: u32,
    pub flags: u32,
    pub codepage: u32,
    /// Смещение фиксированной колонки в записи (0 — неизвестно).
    pub record_offset: u16,
}

impl ColumnDescriptor {
    pub fn new(id: u32, name: &str, coltyp: ColumnType) -> Self {
        Self {
            id,
            name: name.to_string(),
            coltyp,
            space_usage: coltyp.fixed_size().unwrap_or(0) as u32,
            flags: 0,
            codepage: 0,
            record_offset: 0,
        }
    }

    pub fn with_codepage(mut self, codepage: u32) -> Self {
        self.codepage = codepage;
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_space_usage(mut self, size: u32) -> Self {
        self.space_usage = size;
        self
    }

    pub fn class(&self) -> ColumnClass {
        if self.id <= FIXED_COLUMN_MAX {
            ColumnClass::Fixed
        } else if self.id <= VARIABLE_COLUMN_MAX {
            ColumnClass::Variable
        } else {
            ColumnClass::Tagged
        }
    }

    #[inline]
    pub fn is_tagged(&self) -> bool {
        self.id >= TAGGED_COLUMN_FIRST
    }

    #[inline]
    pub fn is_multivalue(&self) -> bool {
        self.flags & COLUMN_FLAG_MULTI_VALUED != 0
    }

    /// Размер значения в фиксированной области записи.
    /// Для Binary/Text фиксированного класса используется SpaceUsage.
    pub fn fixed_size(&self) -> Option<usize> {
        match self.coltyp.fixed_size() {
            Some(n) => Some(n),
            None if self.space_usage > 0 => Some(self.space_usage as usize),
            None => None,
        }
    }
}

/// Дескриптор индекса (строка типа 3 в каталоге).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    pub id: u32,
    pub name: String,
    pub root_page: u32,
    pub flags: u32,
    /// Колонки ключа в порядке сегментов.
    pub key_columns: Vec<u32>,
}

/// Разобрать KeyFldIDs: 4-байтовые сегменты [flags u16][fid u16] либо старые 2-байтовые
/// (знак — направление сортировки).
pub fn parse_key_fields(b: &[u8]) -> Vec<u32> {
    if b.len() % 4 == 0 {
        b.chunks_exact(4)
            .map(|c| u16::from_le_bytes([c[2], c[3]]) as u32)
            .collect()
    } else {
        b.chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]).unsigned_abs() as u32)
            .collect()
    }
}

/// Схема таблицы.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub object_id: u32,
    pub name: String,
    pub root_page: u32,
    pub long_value_root: Option<u32>,
    /// Колонки по возрастанию id.
    pub columns: Vec<ColumnDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl TableSchema {
    pub fn new(object_id: u32, name: &str, root_page: u32) -> Self {
        Self {
            object_id,
            name: name.to_string(),
            root_page,
            long_value_root: None,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_by_id(&self, id: u32) -> Option<&ColumnDescriptor> {
        self.columns
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|i| &self.columns[i])
    }

    /// Добавить колонку, сохраняя порядок по id (дубликат id заменяет старую запись).
    pub fn push_column(&mut self, col: ColumnDescriptor) {
        match self.columns.binary_search_by_key(&col.id, |c| c.id) {
            Ok(i) => self.columns[i] = col,
            Err(i) => self.columns.insert(i, col),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_class_follows_id_ranges() {
        assert_eq!(ColumnDescriptor::new(1, "a", ColumnType::Long).class(), ColumnClass::Fixed);
        assert_eq!(ColumnDescriptor::new(128, "b", ColumnType::Text).class(), ColumnClass::Variable);
        let t = ColumnDescriptor::new(256, "c", ColumnType::LongText);
        assert_eq!(t.class(), ColumnClass::Tagged);
        assert!(t.is_tagged());
    }

    #[test]
    fn push_column_keeps_order() {
        let mut s = TableSchema::new(10, "T", 20);
        s.push_column(ColumnDescriptor::new(256, "z", ColumnType::LongText));
        s.push_column(ColumnDescriptor::new(1, "a", ColumnType::Long));
        s.push_column(ColumnDescriptor::new(128, "m", ColumnType::Text));
        let ids: Vec<u32> = s.columns.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 128, 256]);
        assert_eq!(s.column_by_id(128).map(|c| c.name.as_str()), Some("m"));
        assert!(s.column_by_id(2).is_none());
    }

    #[test]
    fn key_fields_both_layouts() {
        assert_eq!(parse_key_fields(&[0, 0, 1, 0, 1, 0, 0x80, 0]), vec![1, 128]);
        assert_eq!(parse_key_fields(&[0xFE, 0xFF, 3, 0, 5, 0]), vec![2, 3, 5]);
        assert!(parse_key_fields(&[]).is_empty());
    }

    #[test]
    fn coltyp_roundtrip_and_sizes() {
        for v in 0..=18u32 {
            assert_eq!(ColumnType::from_coltyp(v).to_coltyp(), v);
        }
        assert_eq!(ColumnType::Guid.fixed_size(), Some(16));
        assert_eq!(ColumnType::LongText.fixed_size(), None);
        let fixed_bin = ColumnDescriptor::new(3, "bin", ColumnType::Binary).with_space_usage(6);
        assert_eq!(fixed_bin.fixed_size(), Some(6));
    }
}
