//! report/text — текстовый вывод.
//!
//! Порядок колонок — стабильный контракт с потребителями вывода:
//! SYSTEM||host||domain||os_version||os_build||manufacturer||product||serial||creation_time||last_boot
//! ROLE||role_guid||role_name||product_name||first_seen||last_seen
//! USAGE||role_name||role_guid||client_name||authenticated_username||address||tenant_id||first_seen||last_seen||total_accesses
//! ACCESS||role_name||role_guid||client_name||authenticated_username||date||accesses
//!
//! Отсутствующее значение — пустое поле.

use std::fmt::Display;

use crate::ual::{DomainRecord, ParseSummary, UalReport};

pub const FIELD_SEPARATOR: &str = "||";

fn opt<T: Display>(v: &Option<T>) -> String {
    v.as_ref().map(|x| x.to_string()).unwrap_or_default()
}

/// Переводы строк внутри значения ломают построчный формат.
fn clean(s: String) -> String {
    if s.contains(['\n', '\r']) {
        s.replace(['\n', '\r'], " ")
    } else {
        s
    }
}

pub fn format_record(r: &DomainRecord) -> String {
    let fields: Vec<String> = match r {
        DomainRecord::System(s) => vec![
            opt(&s.host_name),
            opt(&s.domain_name),
            opt(&s.os_version()),
            opt(&s.os_build),
            opt(&s.manufacturer),
            opt(&s.product_name),
            opt(&s.serial_number),
            opt(&s.creation_time),
            opt(&s.last_boot_time),
        ],
        DomainRecord::Role(x) => vec![
            x.role_guid.to_string(),
            x.role_name.clone(),
            opt(&x.product_name),
            opt(&x.first_seen),
            opt(&x.last_seen),
        ],
        DomainRecord::Usage(u) => vec![
            u.role_name.clone(),
            u.role_guid.to_string(),
            u.client_name.clone(),
            opt(&u.authenticated_username),
            opt(&u.address),
            opt(&u.tenant_id),
            opt(&u.first_seen),
            opt(&u.last_seen),
            u.total_accesses.to_string(),
        ],
        DomainRecord::Access(a) => vec![
            a.role_name.clone(),
            a.role_guid.to_string(),
            a.client_name.clone(),
            opt(&a.authenticated_username),
            a.date.clone(),
            a.accesses.to_string(),
        ],
    };
    let mut line = String::from(r.label());
    for f in fields {
        line.push_str(FIELD_SEPARATOR);
        line.push_str(&clean(f));
    }
    line
}

pub fn format_summary(s: &ParseSummary) -> String {
    format!(
        "# summary: skipped_rows={} unreadable_tables={}",
        s.skipped_rows,
        s.unreadable_tables.join(",")
    )
}

/// Весь отчёт; строка summary — только если что-то было пропущено.
pub fn format_text(report: &UalReport) -> String {
    let mut out = String::new();
    for r in super::ordered(report) {
        out.push_str(&format_record(r));
        out.push('\n');
    }
    if report.summary.has_losses() {
        out.push_str(&format_summary(&report.summary));
        out.push('\n');
    }
    out
}
