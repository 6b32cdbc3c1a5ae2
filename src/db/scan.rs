//! db/scan — полный последовательный скан таблицы.
//!
//! Семантика:
//! - строки отдаются в порядке ключей первичного дерева;
//! - DecodeError строки логируется (warn), учитывается в skipped_rows и пропускается;
//! - TraversalError/CorruptPageError завершают скан ошибкой (итератор fused);
//! - LV-дерево таблицы загружается лениво, при первом next().
//!   Нечитаемое LV-дерево не роняет скан: строки со ссылками на LV станут DecodeError.

use anyhow::Result;
use log::{debug, warn};

use crate::btree::{LongValueStore, TreeScan};
use crate::catalog::TableSchema;
use crate::error::{is_decode_error, is_traversal_error};
use crate::record::{decode_record, DecodeContext, DecodedRecord};

use super::core::EseDb;

/// Итератор строк одной таблицы.
pub struct TableRows<'db> {
    db: &'db EseDb,
    schema: &'db TableSchema,
    scan: TreeScan<'db>,
    long_values: Option<LongValueStore>,
    rows_decoded: u64,
    skipped_rows: u64,
    done: bool,
}

impl EseDb {
    /// Скан таблицы по имени (SchemaError, если таблицы нет).
    pub fn scan_table(&self, name: &str) -> Result<TableRows<'_>> {
        let schema = self.table(name)?;
        Ok(self.scan_schema(schema))
    }

    /// Скан таблицы по её схеме.
    pub fn scan_schema<'db>(&'db self, schema: &'db TableSchema) -> TableRows<'db> {
        debug!(
            "scan '{}' (root={}, lv_root={:?})",
            schema.name, schema.root_page, schema.long_value_root
        );
        TableRows {
            db: self,
            schema,
            scan: TreeScan::new(&self.pager, schema.root_page, self.visit_budget()),
            long_values: None,
            rows_decoded: 0,
            skipped_rows: 0,
            done: false,
        }
    }
}

impl<'db> TableRows<'db> {
    #[inline]
    pub fn schema(&self) -> &TableSchema {
        self.schema
    }

    #[inline]
    pub fn rows_decoded(&self) -> u64 {
        self.rows_decoded
    }

    #[inline]
    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows
    }

    /// Страниц посещено обходом основного дерева.
    #[inline]
    pub fn visited_pages(&self) -> usize {
        self.scan.visited()
    }

    fn ensure_long_values(&mut self) -> Result<()> {
        if self.long_values.is_some() {
            return Ok(());
        }
        let max = self.db.cfg.max_value_bytes;
        let store = match self.schema.long_value_root {
            None => LongValueStore::empty(max),
            Some(root) => {
                match LongValueStore::load(&self.db.pager, root, self.db.visit_budget(), max) {
                    Ok(s) => s,
                    Err(e) if is_traversal_error(&e) => {
                        warn!(
                            "table '{}': long-value tree {} unreadable: {}",
                            self.schema.name, root, e
                        );
                        LongValueStore::empty(max)
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        self.long_values = Some(store);
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<DecodedRecord>> {
        self.ensure_long_values()?;
        let mut ctx = DecodeContext::new(self.db.pager.page_format().is_large());
        if let Some(lv) = self.long_values.as_ref() {
            ctx = ctx.with_long_values(lv);
        }
        for entry in self.scan.by_ref() {
            let entry = entry?;
            match decode_record(&entry.data, self.schema, &ctx) {
                Ok(rec) => {
                    self.rows_decoded += 1;
                    return Ok(Some(rec));
                }
                Err(e) if is_decode_error(&e) => {
                    self.skipped_rows += 1;
                    warn!(
                        "table '{}': row at page {} tag {} skipped: {}",
                        self.schema.name, entry.page, entry.tag, e
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

impl Iterator for TableRows<'_> {
    type Item = Result<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(r)) => Some(Ok(r)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
