//! btree/long_value — сборка long values (LV) из LV-дерева таблицы.
//!
//! LV-дерево — обычное B+дерево с ключами big-endian:
//! - заголовок значения:  key = LID (u32 BE),              data = [refcount u32][size u32]
//! - сегмент значения:    key = LID (u32 BE) + off (u32 BE), data = байты сегмента
//!
//! get(lid) склеивает сегменты по возрастанию offset и строго проверяет:
//! непрерывность (без дыр и перекрытий), наличие заголовка и совпадение итогового размера.
//! Любое нарушение — DecodeError (строка, ссылающаяся на LV, пропускается).
//!
//! Защита от чрезмерной аллокации: ParseConfig::max_value_bytes.

use anyhow::Result;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

use crate::consts::{LV_HEADER_DATA_LEN, LV_KEY_HEADER_LEN, LV_KEY_SEGMENT_LEN};
use crate::error::EseError;
use crate::pager::Pager;

use super::walker::TreeScan;

#[derive(Debug, Default)]
struct LongValue {
    declared_size: Option<u32>,
    segments: BTreeMap<u32, Vec<u8>>,
}

/// Все long values одной таблицы, собранные одним сканом LV-дерева.
#[derive(Debug, Default)]
pub struct LongValueStore {
    root: u32,
    values: HashMap<u32, LongValue>,
    max_value_bytes: usize,
}

impl LongValueStore {
    /// Пустое хранилище (у таблицы нет LV-дерева).
    pub fn empty(max_value_bytes: usize) -> Self {
        Self {
            root: 0,
            values: HashMap::new(),
            max_value_bytes,
        }
    }

    /// Просканировать LV-дерево с корнем `root`.
    pub fn load(pager: &Pager, root: u32, budget: usize, max_value_bytes: usize) -> Result<Self> {
        let mut values: HashMap<u32, LongValue> = HashMap::new();
        let mut ignored = 0usize;

        for entry in TreeScan::new(pager, root, budget) {
            let entry = entry?;
            match entry.key.len() {
                LV_KEY_HEADER_LEN => {
                    let lid = BigEndian::read_u32(&entry.key[0..4]);
                    if entry.data.len() < LV_HEADER_DATA_LEN {
                        debug!("lv {}: short header record on page {}", lid, entry.page);
                        ignored += 1;
                        continue;
                    }
                    let size = LittleEndian::read_u32(&entry.data[4..8]);
                    values.entry(lid).or_default().declared_size = Some(size);
                }
                LV_KEY_SEGMENT_LEN => {
                    let lid = BigEndian::read_u32(&entry.key[0..4]);
                    let off = BigEndian::read_u32(&entry.key[4..8]);
                    values
                        .entry(lid)
                        .or_default()
                        .segments
                        .insert(off, entry.data);
                }
                other => {
                    debug!(
                        "lv tree {}: unexpected key length {} on page {}",
                        root, other, entry.page
                    );
                    ignored += 1;
                }
            }
        }
        if ignored > 0 {
            warn!("lv tree {}: {} record(s) with unknown layout ignored", root, ignored);
        }
        debug!("lv tree {}: {} long value(s)", root, values.len());

        Ok(Self {
            root,
            values,
            max_value_bytes,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Собрать значение `lid` целиком.
    pub fn get(&self, lid: u32) -> Result<Vec<u8>> {
        let lv = self.values.get(&lid).ok_or_else(|| {
            EseError::decode(format!("long value {} not found in lv tree {}", lid, self.root))
        })?;
        let size = lv.declared_size.ok_or_else(|| {
            EseError::decode(format!("long value {} has no header record", lid))
        })? as usize;
        if size > self.max_value_bytes {
            return Err(EseError::decode(format!(
                "long value {} size {} exceeds max_value_bytes {}",
                lid, size, self.max_value_bytes
            )));
        }

        let mut out = Vec::with_capacity(size);
        for (&off, seg) in &lv.segments {
            if off as usize != out.len() {
                return Err(EseError::decode(format!(
                    "long value {}: segment at offset {} but {} byte(s) assembled",
                    lid,
                    off,
                    out.len()
                )));
            }
            if out.len() + seg.len() > size {
                return Err(EseError::decode(format!(
                    "long value {}: segments exceed declared size {}",
                    lid, size
                )));
            }
            out.extend_from_slice(seg);
        }
        if out.len() != size {
            return Err(EseError::decode(format!(
                "long value {} length mismatch: got {}, expected {}",
                lid,
                out.len(),
                size
            )));
        }
        Ok(out)
    }
}
