//! catalog — схемы таблиц из MSysObjects.
//! - bootstrap.rs — встроенная схема самого MSysObjects
//! - schema.rs    — ColumnType, ColumnDescriptor, IndexDescriptor, TableSchema
//!
//! Catalog::load сканирует дерево каталога (корень — страница 4), декодирует каждую строку
//! встроенной схемой и группирует строки по ObjidTable:
//! 1 — таблица (FDP = корень), 2 — колонка, 3 — индекс, 4 — LV-дерево, 5 — callback.
//! Каталог строится один раз на файл и дальше только читается.

pub mod bootstrap;
pub mod schema;

use anyhow::Result;
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::btree::TreeScan;
use crate::consts::{
    CATALOG_ROOT_PAGE, CATALOG_TYPE_CALLBACK, CATALOG_TYPE_COLUMN, CATALOG_TYPE_INDEX,
    CATALOG_TYPE_LONG_VALUE, CATALOG_TYPE_TABLE,
};
use crate::error::{find_ese_error, EseError};
use crate::pager::Pager;
use crate::record::{decode_record, DecodeContext, DecodedRecord};

use bootstrap::{
    catalog_schema, COL_COLTYP_OR_PGNO_FDP, COL_FLAGS, COL_ID, COL_NAME, COL_OBJID_TABLE,
    COL_PAGES_OR_LOCALE, COL_RECORD_OFFSET, COL_SPACE_USAGE, COL_TYPE,
};
pub use schema::{
    parse_key_fields, ColumnClass, ColumnDescriptor, ColumnType, IndexDescriptor, TableSchema,
};

/// Строка MSysObjects, приведённая к типизированному виду.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRow {
    pub objid_table: u32,
    pub kind: i16,
    pub id: u32,
    pub coltyp_or_fdp: u32,
    pub space_usage: u32,
    pub flags: u32,
    pub pages_or_locale: u32,
    pub record_offset: u16,
    pub name: String,
    pub key_fields: Vec<u32>,
}

impl CatalogRow {
    pub fn from_record(rec: &DecodedRecord) -> Result<Self> {
        let required = |name: &str| -> Result<i64> {
            rec.get_i64(name).ok_or_else(|| {
                EseError::schema(format!("catalog row is missing required column {}", name))
            })
        };
        let optional = |name: &str| rec.get_i64(name).unwrap_or(0);

        let name = rec
            .get_str(COL_NAME)
            .ok_or_else(|| EseError::schema("catalog row is missing required column Name"))?
            .to_string();
        Ok(Self {
            objid_table: required(COL_OBJID_TABLE)? as u32,
            kind: required(COL_TYPE)? as i16,
            id: required(COL_ID)? as u32,
            coltyp_or_fdp: required(COL_COLTYP_OR_PGNO_FDP)? as u32,
            space_usage: optional(COL_SPACE_USAGE) as u32,
            flags: optional(COL_FLAGS) as u32,
            pages_or_locale: optional(COL_PAGES_OR_LOCALE) as u32,
            record_offset: optional(COL_RECORD_OFFSET) as u16,
            name,
            key_fields: rec
                .get("KeyFldIDs")
                .and_then(|v| v.as_bytes())
                .map(parse_key_fields)
                .unwrap_or_default(),
        })
    }
}

/// Все таблицы одного файла.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, TableSchema>,
}

impl Catalog {
    /// Прочитать каталог из файла. Бюджет — как у любого TreeScan.
    pub fn load(pager: &Pager, budget: usize) -> Result<Self> {
        if !pager.contains(CATALOG_ROOT_PAGE) {
            return Err(EseError::corrupt_page(
                Some(CATALOG_ROOT_PAGE),
                format!(
                    "catalog root page {} is beyond the last page {}",
                    CATALOG_ROOT_PAGE,
                    pager.last_page()
                ),
            ));
        }
        let schema = catalog_schema();
        let ctx = DecodeContext::new(pager.page_format().is_large());
        let mut rows = Vec::new();

        for entry in TreeScan::new(pager, CATALOG_ROOT_PAGE, budget) {
            let entry = entry.map_err(|e| match find_ese_error(&e) {
                Some(EseError::Traversal { .. }) => {
                    EseError::schema(format!("catalog tree unreadable: {}", e))
                }
                _ => e,
            })?;
            let rec = decode_record(&entry.data, &schema, &ctx).map_err(|e| {
                EseError::schema(format!(
                    "catalog row on page {} tag {} undecodable: {}",
                    entry.page, entry.tag, e
                ))
            })?;
            rows.push(CatalogRow::from_record(&rec)?);
        }
        debug!("catalog: {} row(s)", rows.len());

        let cat = Self::from_rows(rows)?;
        info!("catalog: {} table(s)", cat.len());
        Ok(cat)
    }

    /// Собрать схемы из строк каталога.
    pub fn from_rows(rows: Vec<CatalogRow>) -> Result<Self> {
        let mut by_obj: BTreeMap<u32, TableSchema> = BTreeMap::new();
        for r in rows.iter().filter(|r| r.kind == CATALOG_TYPE_TABLE) {
            if r.name.is_empty() {
                return Err(EseError::schema(format!("table object {} has an empty name", r.id)));
            }
            if by_obj
                .insert(r.id, TableSchema::new(r.id, &r.name, r.coltyp_or_fdp))
                .is_some()
            {
                return Err(EseError::schema(format!("duplicate table object id {}", r.id)));
            }
        }
        if by_obj.is_empty() {
            return Err(EseError::schema("catalog holds no tables"));
        }

        for r in rows.into_iter().filter(|r| r.kind != CATALOG_TYPE_TABLE) {
            let Some(table) = by_obj.get_mut(&r.objid_table) else {
                if r.kind == CATALOG_TYPE_COLUMN {
                    return Err(EseError::schema(format!(
                        "column '{}' references unknown table object {}",
                        r.name, r.objid_table
                    )));
                }
                debug!(
                    "catalog: {} row '{}' of unknown table {} ignored",
                    r.kind, r.name, r.objid_table
                );
                continue;
            };
            if r.kind == CATALOG_TYPE_COLUMN && r.id == 0 {
                return Err(EseError::schema(format!(
                    "column '{}' of table '{}' has id 0",
                    r.name, table.name
                )));
            }
            match r.kind {
                CATALOG_TYPE_COLUMN => table.push_column(ColumnDescriptor {
                    id: r.id,
                    name: r.name,
                    coltyp: ColumnType::from_coltyp(r.coltyp_or_fdp),
                    space_usage: r.space_usage,
                    flags: r.flags,
                    codepage: r.pages_or_locale,
                    record_offset: r.record_offset,
                }),
                CATALOG_TYPE_INDEX => table.indexes.push(IndexDescriptor {
                    id: r.id,
                    name: r.name,
                    root_page: r.coltyp_or_fdp,
                    flags: r.flags,
                    key_columns: r.key_fields,
                }),
                CATALOG_TYPE_LONG_VALUE => table.long_value_root = Some(r.coltyp_or_fdp),
                CATALOG_TYPE_CALLBACK => {
                    debug!("catalog: callback '{}' on table '{}'", r.name, table.name)
                }
                other => debug!("catalog: unknown object type {} ('{}')", other, r.name),
            }
        }

        let mut tables = BTreeMap::new();
        for (_, t) in by_obj {
            if tables.contains_key(&t.name) {
                return Err(EseError::schema(format!("duplicate table name '{}'", t.name)));
            }
            tables.insert(t.name.clone(), t);
        }
        Ok(Self { tables })
    }

    /// Таблица по имени: сначала точное совпадение, затем без учёта регистра (ASCII).
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name).or_else(|| {
            self.tables
                .values()
                .find(|t| t.name.eq_ignore_ascii_case(name))
        })
    }

    /// То же, что table(), но отсутствие — SchemaError.
    pub fn require(&self, name: &str) -> Result<&TableSchema> {
        self.table(name)
            .ok_or_else(|| EseError::schema(format!("table '{}' not found in catalog", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
