//! record/decode — декодирование записи таблицы по её схеме.
//!
//! Формат записи:
//! [0] u8  last_fixed   — id последней фиксированной колонки в записи
//! [1] u8  last_var     — id последней variable колонки (127 — нет)
//! [2] u16 var_offset   — начало таблицы смещений variable-колонок
//! [4..]                — фиксированные значения подряд по id;
//!                        null-bitmap ceil(last_fixed/8) байт лежит вплотную перед var_offset
//!                        (бит установлен — NULL)
//! [var_offset..]       — u16 конечные смещения variable-значений (0x8000 — NULL),
//!                        далее сами значения
//! [после variable]     — tagged-область: массив (id u16, offset u16), затем значения;
//!                        offset первой записи = размер массива
//!
//! Tagged-значение может начинаться с байта флагов (бит 0x4000 в offset; на больших
//! страницах — всегда): 0x02 сжато, 0x04 long value (4-байтовый LID), 0x08 multi-value,
//! 0x10 multi-value с размером первого значения.
//!
//! Колонка, которой нет в записи, даёт Field::Absent. Несогласованные смещения — DecodeError.

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};

use crate::btree::LongValueStore;
use crate::catalog::schema::{ColumnClass, ColumnDescriptor, ColumnType, TableSchema};
use crate::consts::{
    CODEPAGE_UTF16, RECORD_HDR_SIZE, TAGGED_HAS_FLAGS, TAGGED_OFFSET_MASK,
    TAGGED_OFFSET_MASK_LARGE, VALUE_FLAG_COMPRESSED, VALUE_FLAG_LONG_VALUE,
    VALUE_FLAG_MULTI_VALUE, VALUE_FLAG_MULTI_VALUE_SIZED, VARIABLE_COLUMN_FIRST, VAR_OFFSET_MASK,
    VAR_OFFSET_NULL,
};
use crate::error::EseError;

use super::compress::decompress;
use super::value::{DecodedRecord, Field, Guid, RecordField, Value};

/// Окружение декодера: формат страниц и LV-хранилище таблицы.
#[derive(Clone, Copy, Default)]
pub struct DecodeContext<'a> {
    /// Страницы > 8 KiB: маска 0x7FFF и обязательный байт флагов у tagged-значений.
    pub large_pages: bool,
    pub long_values: Option<&'a LongValueStore>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(large_pages: bool) -> Self {
        Self {
            large_pages,
            long_values: None,
        }
    }

    pub fn with_long_values(mut self, lv: &'a LongValueStore) -> Self {
        self.long_values = Some(lv);
        self
    }
}

/// Декодировать сырую запись по схеме таблицы.
pub fn decode_record(raw: &[u8], schema: &TableSchema, ctx: &DecodeContext<'_>) -> Result<DecodedRecord> {
    if raw.len() < RECORD_HDR_SIZE {
        return Err(EseError::decode(format!(
            "{}: record too short ({} bytes)",
            schema.name,
            raw.len()
        )));
    }
    let last_fixed = raw[0] as u32;
    let last_var = raw[1] as u32;
    let var_offset = LittleEndian::read_u16(&raw[2..4]) as usize;
    if var_offset < RECORD_HDR_SIZE || var_offset > raw.len() {
        return Err(EseError::decode(format!(
            "{}: variable offset {} outside record of {} bytes",
            schema.name,
            var_offset,
            raw.len()
        )));
    }

    let bitmap_len = last_fixed.div_ceil(8) as usize;
    let bitmap_start = var_offset
        .checked_sub(bitmap_len)
        .filter(|&s| s >= RECORD_HDR_SIZE || bitmap_len == 0)
        .ok_or_else(|| {
            EseError::decode(format!(
                "{}: null bitmap of {} bytes does not fit before offset {}",
                schema.name, bitmap_len, var_offset
            ))
        })?;

    let mut fields = Vec::with_capacity(schema.columns.len());

    // --- fixed ---
    let mut cursor = RECORD_HDR_SIZE;
    let mut expected_id = 1u32;
    for col in schema.columns.iter().filter(|c| c.class() == ColumnClass::Fixed) {
        if col.id > last_fixed {
            fields.push(field(col, Field::Absent));
            continue;
        }
        if col.id != expected_id && col.record_offset == 0 {
            // пропущенный id: размер предыдущей колонки неизвестен
            return Err(EseError::decode(format!(
                "{}: fixed column {} has no descriptor for preceding ids",
                schema.name, col.id
            )));
        }
        expected_id = col.id + 1;
        let size = col.fixed_size().ok_or_else(|| {
            EseError::decode(format!(
                "{}: fixed column '{}' has no size",
                schema.name, col.name
            ))
        })?;
        let start = if col.record_offset as usize >= RECORD_HDR_SIZE {
            col.record_offset as usize
        } else {
            cursor
        };
        let end = start + size;
        if end > bitmap_start {
            return Err(EseError::decode(format!(
                "{}: fixed column '{}' [{}..{}) overlaps null bitmap at {}",
                schema.name, col.name, start, end, bitmap_start
            )));
        }
        cursor = end;

        let bit = (col.id - 1) as usize;
        let is_null = raw[bitmap_start + bit / 8] & (1u8 << (bit % 8)) != 0;
        if is_null {
            fields.push(field(col, Field::Absent));
        } else {
            let v = decode_value(col, &raw[start..end])?;
            fields.push(field(col, Field::Present(v)));
        }
    }

    // --- variable ---
    let var_count = if last_var >= VARIABLE_COLUMN_FIRST {
        (last_var - VARIABLE_COLUMN_FIRST + 1) as usize
    } else {
        0
    };
    let values_start = var_offset + var_count * 2;
    if values_start > raw.len() {
        return Err(EseError::decode(format!(
            "{}: variable offset table ({} entries) runs past record end",
            schema.name, var_count
        )));
    }
    let mut var_slots: Vec<Option<(usize, usize)>> = Vec::with_capacity(var_count);
    let mut prev_end = 0usize;
    for i in 0..var_count {
        let word = LittleEndian::read_u16(&raw[var_offset + i * 2..var_offset + i * 2 + 2]);
        let end = (word & VAR_OFFSET_MASK) as usize;
        if end < prev_end || values_start + end > raw.len() {
            return Err(EseError::decode(format!(
                "{}: variable column {} end offset {} inconsistent (prev {}, record {})",
                schema.name,
                VARIABLE_COLUMN_FIRST as usize + i,
                end,
                prev_end,
                raw.len()
            )));
        }
        if word & VAR_OFFSET_NULL != 0 {
            var_slots.push(None);
        } else {
            var_slots.push(Some((values_start + prev_end, values_start + end)));
        }
        prev_end = end;
    }
    for col in schema.columns.iter().filter(|c| c.class() == ColumnClass::Variable) {
        let slot = (col.id - VARIABLE_COLUMN_FIRST) as usize;
        match var_slots.get(slot).copied().flatten() {
            Some((s, e)) => {
                let v = decode_value(col, &raw[s..e])?;
                fields.push(field(col, Field::Present(v)));
            }
            None => fields.push(field(col, Field::Absent)),
        }
    }

    // --- tagged ---
    let tagged = parse_tagged_area(&raw[values_start + prev_end..], schema, ctx)?;
    for col in schema.columns.iter().filter(|c| c.class() == ColumnClass::Tagged) {
        match tagged.iter().find(|t| t.id == col.id) {
            Some(t) => {
                let v = decode_tagged(col, t, ctx, &schema.name)?;
                fields.push(field(col, Field::Present(v)));
            }
            None => fields.push(field(col, Field::Absent)),
        }
    }

    Ok(DecodedRecord {
        table: schema.name.clone(),
        fields,
    })
}

fn field(col: &ColumnDescriptor, f: Field) -> RecordField {
    RecordField {
        column_id: col.id,
        name: col.name.clone(),
        field: f,
    }
}

struct TaggedEntry<'r> {
    id: u32,
    flags: u8,
    data: &'r [u8],
}

fn parse_tagged_area<'r>(
    area: &'r [u8],
    schema: &TableSchema,
    ctx: &DecodeContext<'_>,
) -> Result<Vec<TaggedEntry<'r>>> {
    if area.is_empty() {
        return Ok(Vec::new());
    }
    let mask = if ctx.large_pages {
        TAGGED_OFFSET_MASK_LARGE
    } else {
        TAGGED_OFFSET_MASK
    };
    if area.len() < 4 {
        return Err(EseError::decode(format!(
            "{}: tagged area of {} bytes is too short",
            schema.name,
            area.len()
        )));
    }
    let array_len = (LittleEndian::read_u16(&area[2..4]) & mask) as usize;
    if array_len == 0 || array_len % 4 != 0 || array_len > area.len() {
        return Err(EseError::decode(format!(
            "{}: tagged array size {} invalid for area of {} bytes",
            schema.name,
            array_len,
            area.len()
        )));
    }
    let n = array_len / 4;
    let mut out = Vec::with_capacity(n);
    let mut prev_id = 0u32;
    for j in 0..n {
        let id = LittleEndian::read_u16(&area[j * 4..j * 4 + 2]) as u32;
        let word = LittleEndian::read_u16(&area[j * 4 + 2..j * 4 + 4]);
        let start = (word & mask) as usize;
        let end = if j + 1 < n {
            (LittleEndian::read_u16(&area[(j + 1) * 4 + 2..(j + 1) * 4 + 4]) & mask) as usize
        } else {
            area.len()
        };
        if id <= prev_id || start < array_len || start > end || end > area.len() {
            return Err(EseError::decode(format!(
                "{}: tagged entry {} (column {}) has inconsistent bounds [{}..{})",
                schema.name, j, id, start, end
            )));
        }
        prev_id = id;
        let has_flags = ctx.large_pages || word & TAGGED_HAS_FLAGS != 0;
        let mut data = &area[start..end];
        let mut flags = 0u8;
        if has_flags && !data.is_empty() {
            flags = data[0];
            data = &data[1..];
        }
        out.push(TaggedEntry { id, flags, data });
    }
    Ok(out)
}

fn decode_tagged(
    col: &ColumnDescriptor,
    t: &TaggedEntry<'_>,
    ctx: &DecodeContext<'_>,
    table: &str,
) -> Result<Value> {
    if t.flags & VALUE_FLAG_MULTI_VALUE_SIZED != 0 {
        // [size u8][первое значение][второе значение]
        let first = *t.data.first().ok_or_else(|| {
            EseError::decode(format!("{}: sized multi-value of '{}' is empty", table, col.name))
        })? as usize;
        if 1 + first > t.data.len() {
            return Err(EseError::decode(format!(
                "{}: sized multi-value of '{}' overruns value",
                table, col.name
            )));
        }
        let a = element(col, &t.data[1..1 + first], t.flags, ctx, table)?;
        let b = element(col, &t.data[1 + first..], t.flags, ctx, table)?;
        return Ok(Value::Multi(vec![a, b]));
    }
    if t.flags & VALUE_FLAG_MULTI_VALUE != 0 {
        return decode_multi(col, t.data, t.flags, ctx, table);
    }
    element(col, t.data, t.flags, ctx, table)
}

/// Multi-value: таблица u16 смещений (count = первое смещение / 2), затем элементы.
/// Бит 0x8000 в смещении — элемент вынесен в LV.
fn decode_multi(
    col: &ColumnDescriptor,
    data: &[u8],
    flags: u8,
    ctx: &DecodeContext<'_>,
    table: &str,
) -> Result<Value> {
    if data.len() < 2 {
        return Err(EseError::decode(format!(
            "{}: multi-value of '{}' is too short",
            table, col.name
        )));
    }
    let first = (LittleEndian::read_u16(&data[0..2]) & VAR_OFFSET_MASK) as usize;
    if first < 2 || first % 2 != 0 || first > data.len() {
        return Err(EseError::decode(format!(
            "{}: multi-value of '{}' has bad offset table size {}",
            table, col.name, first
        )));
    }
    let count = first / 2;
    let mut values = Vec::with_capacity(count);
    for i in 0..count {
        let word = LittleEndian::read_u16(&data[i * 2..i * 2 + 2]);
        let start = (word & VAR_OFFSET_MASK) as usize;
        let end = if i + 1 < count {
            (LittleEndian::read_u16(&data[(i + 1) * 2..(i + 1) * 2 + 2]) & VAR_OFFSET_MASK) as usize
        } else {
            data.len()
        };
        if start < first || start > end || end > data.len() {
            return Err(EseError::decode(format!(
                "{}: multi-value element {} of '{}' has bounds [{}..{})",
                table, i, col.name, start, end
            )));
        }
        let mut elem_flags = flags & VALUE_FLAG_COMPRESSED;
        if word & VAR_OFFSET_NULL != 0 {
            elem_flags |= VALUE_FLAG_LONG_VALUE;
        }
        values.push(element(col, &data[start..end], elem_flags, ctx, table)?);
    }
    Ok(Value::Multi(values))
}

/// Одно значение tagged-колонки: LV-разыменование, распаковка, типизация.
fn element(
    col: &ColumnDescriptor,
    data: &[u8],
    flags: u8,
    ctx: &DecodeContext<'_>,
    table: &str,
) -> Result<Value> {
    let lv_bytes: Vec<u8>;
    let bytes: &[u8] = if flags & VALUE_FLAG_LONG_VALUE != 0 {
        if data.len() != 4 {
            return Err(EseError::decode(format!(
                "{}: long value reference of '{}' is {} bytes",
                table,
                col.name,
                data.len()
            )));
        }
        let lid = LittleEndian::read_u32(data);
        let store = ctx.long_values.ok_or_else(|| {
            EseError::decode(format!(
                "{}: column '{}' references long value {} but table has no lv tree",
                table, col.name, lid
            ))
        })?;
        lv_bytes = store.get(lid)?;
        &lv_bytes
    } else {
        data
    };
    let unpacked: Vec<u8>;
    let bytes: &[u8] = if flags & VALUE_FLAG_COMPRESSED != 0 {
        unpacked = decompress(bytes)?;
        &unpacked
    } else {
        bytes
    };
    decode_value(col, bytes)
}

/// Типизировать байты значения по типу колонки.
pub fn decode_value(col: &ColumnDescriptor, b: &[u8]) -> Result<Value> {
    let need = |n: usize| -> Result<()> {
        if b.len() != n {
            return Err(EseError::decode(format!(
                "column '{}' ({}) expects {} bytes, got {}",
                col.name,
                col.coltyp.name(),
                n,
                b.len()
            )));
        }
        Ok(())
    };
    let v = match col.coltyp {
        ColumnType::Bit => {
            need(1)?;
            Value::Bool(b[0] != 0)
        }
        ColumnType::UnsignedByte => {
            need(1)?;
            Value::U8(b[0])
        }
        ColumnType::Short => {
            need(2)?;
            Value::I16(LittleEndian::read_i16(b))
        }
        ColumnType::UnsignedShort => {
            need(2)?;
            Value::U16(LittleEndian::read_u16(b))
        }
        ColumnType::Long => {
            need(4)?;
            Value::I32(LittleEndian::read_i32(b))
        }
        ColumnType::UnsignedLong => {
            need(4)?;
            Value::U32(LittleEndian::read_u32(b))
        }
        ColumnType::LongLong => {
            need(8)?;
            Value::I64(LittleEndian::read_i64(b))
        }
        ColumnType::Currency => {
            need(8)?;
            Value::Currency(LittleEndian::read_i64(b))
        }
        ColumnType::IeeeSingle => {
            need(4)?;
            Value::F32(LittleEndian::read_f32(b))
        }
        ColumnType::IeeeDouble => {
            need(8)?;
            Value::F64(LittleEndian::read_f64(b))
        }
        ColumnType::DateTime => {
            need(8)?;
            Value::DateTime(LittleEndian::read_u64(b))
        }
        ColumnType::Guid => {
            need(16)?;
            let mut g = [0u8; 16];
            g.copy_from_slice(b);
            Value::Guid(Guid(g))
        }
        ColumnType::Text | ColumnType::LongText => Value::Text(decode_text(b, col.codepage)),
        ColumnType::Binary
        | ColumnType::LongBinary
        | ColumnType::Slv
        | ColumnType::Nil
        | ColumnType::Unknown(_) => Value::Binary(b.to_vec()),
    };
    Ok(v)
}

/// Текст по кодовой странице: 1200 — UTF-16LE, прочие — однобайтовые (Latin-1).
/// Хвостовые NUL отбрасываются.
pub fn decode_text(b: &[u8], codepage: u32) -> String {
    let s = if codepage == CODEPAGE_UTF16 {
        let units: Vec<u16> = b
            .chunks_exact(2)
            .map(LittleEndian::read_u16)
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        b.iter().map(|&c| c as char).collect()
    };
    s.trim_end_matches('\0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::ColumnDescriptor;
    use crate::error::is_decode_error;
    use crate::record::build::RecordBuilder;

    fn schema() -> TableSchema {
        let mut s = TableSchema::new(10, "T", 20);
        s.push_column(ColumnDescriptor::new(1, "A", ColumnType::Long));
        s.push_column(ColumnDescriptor::new(2, "B", ColumnType::Short));
        s.push_column(ColumnDescriptor::new(3, "C", ColumnType::DateTime));
        s.push_column(ColumnDescriptor::new(128, "Name", ColumnType::Text).with_codepage(1252));
        s.push_column(ColumnDescriptor::new(129, "Blob", ColumnType::Binary));
        s.push_column(ColumnDescriptor::new(256, "Wide", ColumnType::LongText).with_codepage(1200));
        s.push_column(ColumnDescriptor::new(257, "Extra", ColumnType::LongBinary));
        s
    }

    #[test]
    fn decode_is_deterministic() {
        let s = schema();
        let raw = RecordBuilder::new(false)
            .fixed(1, &7i32.to_le_bytes())
            .fixed(2, &(-3i16).to_le_bytes())
            .fixed(3, &42u64.to_le_bytes())
            .variable(128, b"hello")
            .tagged(256, &[b'h', 0, b'i', 0])
            .build();
        let ctx = DecodeContext::new(false);
        let a = decode_record(&raw, &s, &ctx).expect("decode");
        let b = decode_record(&raw, &s, &ctx).expect("decode");
        assert_eq!(a, b);
        assert_eq!(a.get_i64("A"), Some(7));
        assert_eq!(a.get_i64("B"), Some(-3));
        assert_eq!(a.get_filetime("C"), Some(42));
        assert_eq!(a.get_str("Name"), Some("hello"));
        assert_eq!(a.get_str("Wide"), Some("hi"));
        assert!(a.field("Blob").map(Field::is_absent).unwrap_or(false));
        assert!(a.field("Extra").map(Field::is_absent).unwrap_or(false));
    }

    #[test]
    fn null_bitmap_marks_absent() {
        let s = schema();
        let raw = RecordBuilder::new(false)
            .fixed(1, &1i32.to_le_bytes())
            .null_fixed(2, 2)
            .fixed(3, &5u64.to_le_bytes())
            .build();
        let rec = decode_record(&raw, &s, &DecodeContext::new(false)).expect("decode");
        assert_eq!(rec.get_i64("A"), Some(1));
        assert!(rec.field("B").map(Field::is_absent).unwrap_or(false));
        assert_eq!(rec.get_filetime("C"), Some(5));
    }

    #[test]
    fn fixed_ids_past_last_fixed_are_absent() {
        let s = schema();
        let raw = RecordBuilder::new(false).fixed(1, &9i32.to_le_bytes()).build();
        let rec = decode_record(&raw, &s, &DecodeContext::new(false)).expect("decode");
        assert_eq!(rec.get_i64("A"), Some(9));
        assert!(rec.get("B").is_none());
        assert!(rec.get("C").is_none());
    }

    #[test]
    fn large_page_tagged_has_flags_byte() {
        let s = schema();
        let raw = RecordBuilder::new(true)
            .tagged(257, &[1, 2, 3])
            .build();
        let rec = decode_record(&raw, &s, &DecodeContext::new(true)).expect("decode");
        assert_eq!(rec.get("Extra").and_then(Value::as_bytes), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn long_value_without_store_is_decode_error() {
        let s = schema();
        let raw = RecordBuilder::new(false)
            .tagged_with_flags(257, VALUE_FLAG_LONG_VALUE, &7u32.to_le_bytes())
            .build();
        let e = decode_record(&raw, &s, &DecodeContext::new(false)).unwrap_err();
        assert!(is_decode_error(&e));
    }

    #[test]
    fn bad_variable_offset_is_decode_error() {
        let s = schema();
        let mut raw = RecordBuilder::new(false)
            .fixed(1, &1i32.to_le_bytes())
            .variable(128, b"abc")
            .build();
        // var_offset за пределами записи
        let len = raw.len() as u16;
        raw[2..4].copy_from_slice(&(len + 10).to_le_bytes());
        let e = decode_record(&raw, &s, &DecodeContext::new(false)).unwrap_err();
        assert!(is_decode_error(&e));
    }

    #[test]
    fn multi_value_offsets() {
        let mut s = TableSchema::new(1, "M", 2);
        s.push_column(
            ColumnDescriptor::new(256, "Tags", ColumnType::LongText)
                .with_codepage(1252)
                .with_flags(crate::consts::COLUMN_FLAG_MULTI_VALUED),
        );
        // две строки: "ab", "c"
        let mut mv = Vec::new();
        mv.extend_from_slice(&4u16.to_le_bytes());
        mv.extend_from_slice(&6u16.to_le_bytes());
        mv.extend_from_slice(b"abc");
        let raw = RecordBuilder::new(false)
            .tagged_with_flags(256, VALUE_FLAG_MULTI_VALUE, &mv)
            .build();
        let rec = decode_record(&raw, &s, &DecodeContext::new(false)).expect("decode");
        assert_eq!(
            rec.get("Tags"),
            Some(&Value::Multi(vec![
                Value::Text("ab".into()),
                Value::Text("c".into())
            ]))
        );
    }

    #[test]
    fn sized_multi_value_has_two_elements() {
        let mut s = TableSchema::new(1, "M", 2);
        s.push_column(
            ColumnDescriptor::new(256, "Pair", ColumnType::LongText)
                .with_codepage(1252)
                .with_flags(crate::consts::COLUMN_FLAG_MULTI_VALUED),
        );
        // [размер первого u8]["ab"]["cde"]
        let mut mv = vec![2u8];
        mv.extend_from_slice(b"abcde");
        let raw = RecordBuilder::new(false)
            .tagged_with_flags(256, VALUE_FLAG_MULTI_VALUE_SIZED, &mv)
            .build();
        let rec = decode_record(&raw, &s, &DecodeContext::new(false)).expect("decode");
        assert_eq!(
            rec.get("Pair"),
            Some(&Value::Multi(vec![
                Value::Text("ab".into()),
                Value::Text("cde".into())
            ]))
        );

        // размер первого за пределами значения
        let raw = RecordBuilder::new(false)
            .tagged_with_flags(256, VALUE_FLAG_MULTI_VALUE_SIZED, &[9, b'a'])
            .build();
        let e = decode_record(&raw, &s, &DecodeContext::new(false)).unwrap_err();
        assert!(is_decode_error(&e));
    }

    #[test]
    fn compressed_tagged_values_are_unpacked() {
        use crate::consts::COMPRESSION_7BIT_UNICODE;
        use crate::record::compress::compress_7bit_ascii;

        let s = schema();
        let mut wide = compress_7bit_ascii(b"HOST-A");
        wide[0] = (COMPRESSION_7BIT_UNICODE << 3) | (wide[0] & 0x07);
        let raw = RecordBuilder::new(false)
            .tagged_with_flags(256, VALUE_FLAG_COMPRESSED, &wide)
            .tagged_with_flags(257, VALUE_FLAG_COMPRESSED, &compress_7bit_ascii(b"abcdefg"))
            .build();
        let rec = decode_record(&raw, &s, &DecodeContext::new(false)).expect("decode");
        assert_eq!(rec.get_str("Wide"), Some("HOST-A"));
        // бинарное значение без хвостового NUL
        assert_eq!(rec.get("Extra"), Some(&Value::Binary(b"abcdefg".to_vec())));
    }

    #[test]
    fn text_codepages() {
        assert_eq!(decode_text(&[b'a', 0, b'b', 0, 0, 0], 1200), "ab");
        assert_eq!(decode_text(&[0x41, 0xE9], 1252), "Aé");
    }
}
