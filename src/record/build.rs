//! record/build — сборка сырой записи в on-disk формате.
//!
//! Используется для синтетических образов БД (тесты, fixtures). Формат — тот же, что
//! разбирает decode_record.

use std::collections::BTreeMap;

use crate::consts::{RECORD_HDR_SIZE, TAGGED_HAS_FLAGS, VARIABLE_COLUMN_FIRST, VAR_OFFSET_NULL};

#[derive(Debug, Clone)]
pub struct RecordBuilder {
    large_pages: bool,
    fixed: BTreeMap<u32, (Vec<u8>, bool)>,
    variable: BTreeMap<u32, Option<Vec<u8>>>,
    tagged: BTreeMap<u32, (u8, Vec<u8>)>,
}

impl RecordBuilder {
    pub fn new(large_pages: bool) -> Self {
        Self {
            large_pages,
            fixed: BTreeMap::new(),
            variable: BTreeMap::new(),
            tagged: BTreeMap::new(),
        }
    }

    /// Фиксированная колонка. Id должны идти без пропусков с 1.
    pub fn fixed(mut self, id: u32, bytes: &[u8]) -> Self {
        self.fixed.insert(id, (bytes.to_vec(), false));
        self
    }

    /// NULL фиксированной колонки (место `size` байт всё равно занято).
    pub fn null_fixed(mut self, id: u32, size: usize) -> Self {
        self.fixed.insert(id, (vec![0u8; size], true));
        self
    }

    pub fn variable(mut self, id: u32, bytes: &[u8]) -> Self {
        self.variable.insert(id, Some(bytes.to_vec()));
        self
    }

    pub fn null_variable(mut self, id: u32) -> Self {
        self.variable.insert(id, None);
        self
    }

    pub fn tagged(self, id: u32, bytes: &[u8]) -> Self {
        self.tagged_with_flags(id, 0, bytes)
    }

    pub fn tagged_with_flags(mut self, id: u32, flags: u8, bytes: &[u8]) -> Self {
        self.tagged.insert(id, (flags, bytes.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let last_fixed = self.fixed.keys().next_back().copied().unwrap_or(0);
        let last_var = self
            .variable
            .keys()
            .next_back()
            .copied()
            .unwrap_or(VARIABLE_COLUMN_FIRST - 1);

        let mut out = vec![0u8; RECORD_HDR_SIZE];
        out[0] = last_fixed as u8;
        out[1] = last_var as u8;

        for (v, _) in self.fixed.values() {
            out.extend_from_slice(v);
        }
        let mut bitmap = vec![0u8; last_fixed.div_ceil(8) as usize];
        for (&id, (_, is_null)) in &self.fixed {
            if *is_null {
                let bit = (id - 1) as usize;
                bitmap[bit / 8] |= 1 << (bit % 8);
            }
        }
        out.extend_from_slice(&bitmap);
        let var_offset = out.len() as u16;
        out[2..4].copy_from_slice(&var_offset.to_le_bytes());

        let mut table = Vec::new();
        let mut data = Vec::new();
        if last_var >= VARIABLE_COLUMN_FIRST {
            for id in VARIABLE_COLUMN_FIRST..=last_var {
                match self.variable.get(&id) {
                    Some(Some(v)) => {
                        data.extend_from_slice(v);
                        table.extend_from_slice(&(data.len() as u16).to_le_bytes());
                    }
                    _ => {
                        let w = data.len() as u16 | VAR_OFFSET_NULL;
                        table.extend_from_slice(&w.to_le_bytes());
                    }
                }
            }
        }
        out.extend_from_slice(&table);
        out.extend_from_slice(&data);

        if !self.tagged.is_empty() {
            let mut entries = Vec::new();
            let mut values = Vec::new();
            let array_len = self.tagged.len() * 4;
            for (&id, (flags, v)) in &self.tagged {
                let mut word = (array_len + values.len()) as u16;
                if self.large_pages {
                    values.push(*flags);
                } else if *flags != 0 {
                    word |= TAGGED_HAS_FLAGS;
                    values.push(*flags);
                }
                values.extend_from_slice(v);
                entries.extend_from_slice(&(id as u16).to_le_bytes());
                entries.extend_from_slice(&word.to_le_bytes());
            }
            out.extend_from_slice(&entries);
            out.extend_from_slice(&values);
        }
        out
    }
}
