//! report — сериализация UalReport.
//! - text.rs — строки `LABEL||поле||...` + `# summary: ...`
//! - json.rs — JSON lines (одна запись — одна строка)
//!
//! Порядок записей детерминирован: DomainRecord::sort_key.

pub mod json;
pub mod text;

pub use json::format_json_lines;
pub use text::{format_record, format_summary, format_text};

use crate::ual::{DomainRecord, UalReport};

/// Записи отчёта в порядке вывода.
pub(crate) fn ordered(report: &UalReport) -> Vec<&DomainRecord> {
    let mut v: Vec<&DomainRecord> = report.records.iter().collect();
    v.sort_by_cached_key(|r| r.sort_key());
    v
}
