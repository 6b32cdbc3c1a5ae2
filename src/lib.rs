#![allow(non_snake_case)]

// Базовые модули
pub mod config;
pub mod consts;
pub mod error;
pub mod header;

// Слой страниц и деревьев
pub mod page;   // src/page/{mod,common,checksum,header,tags,view}.rs
pub mod pager;  // src/pager/{mod,core,io}.rs
pub mod btree;  // src/btree/{mod,walker,long_value}.rs

// Записи и схемы
pub mod record;  // src/record/{mod,value,decode,compress,build}.rs
pub mod catalog; // src/catalog/{mod,bootstrap,schema}.rs
pub mod db;      // src/db/{mod,core,open,scan,doctor}.rs

// UAL и вывод
pub mod ual;    // src/ual/{mod,types,mapper}.rs
pub mod report; // src/report/{mod,text,json}.rs

// Утилиты (FILETIME, адреса, hex)
pub mod util;

// Удобные реэкспорты
pub use btree::{LongValueStore, TreeScan};
pub use catalog::{Catalog, ColumnDescriptor, ColumnType, TableSchema};
pub use config::{ParseBuilder, ParseConfig};
pub use db::{EseDb, PageCheckReport, TableRows};
pub use error::{error_kind, EseError};
pub use header::{read_file_header, FileHeader};
pub use record::{decode_record, DecodeContext, DecodedRecord, Field, Guid, Value};
pub use report::{format_json_lines, format_text};
pub use ual::{build_ual_report, DomainRecord, ParseSummary, UalReport};

use anyhow::Result;
use std::path::Path;

/// Разобрать один файл UAL целиком: открыть, построить отчёт.
/// Файл закрывается при выходе на любом пути.
pub fn parse_file(path: &Path, cfg: &ParseConfig) -> Result<UalReport> {
    let db = EseDb::open_with_config(path, cfg.clone())?;
    build_ual_report(&[&db])
}
