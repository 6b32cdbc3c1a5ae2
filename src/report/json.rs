//! report/json — JSON lines: по одному объекту на запись, поле "record" — вид записи.
//! Итоговая строка {"record":"summary",...} — только если что-то было пропущено.

use anyhow::Result;
use serde::Serialize;

use crate::ual::{ParseSummary, UalReport};

#[derive(Serialize)]
struct SummaryLine<'a> {
    record: &'static str,
    #[serde(flatten)]
    summary: &'a ParseSummary,
}

pub fn format_json_lines(report: &UalReport) -> Result<String> {
    let mut out = String::new();
    for r in super::ordered(report) {
        out.push_str(&serde_json::to_string(r)?);
        out.push('\n');
    }
    if report.summary.has_losses() {
        out.push_str(&serde_json::to_string(&SummaryLine {
            record: "summary",
            summary: &report.summary,
        })?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Guid;
    use crate::ual::{ClientAccessEvent, DomainRecord};

    #[test]
    fn one_object_per_line() -> Result<()> {
        let mut report = UalReport::default();
        report.records.push(DomainRecord::Access(ClientAccessEvent {
            role_guid: Guid([0xAB; 16]),
            role_name: "RDP".into(),
            client_name: "HOST-A".into(),
            authenticated_username: Some("CORP\\bob".into()),
            date: "2024-01-02".into(),
            day_of_year: 2,
            accesses: 4,
        }));
        report.summary.skipped_rows = 1;
        let s = format_json_lines(&report)?;
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[0])?;
        assert_eq!(v["record"], "access");
        assert_eq!(v["client_name"], "HOST-A");
        assert_eq!(v["accesses"], 4);
        let sm: serde_json::Value = serde_json::from_str(lines[1])?;
        assert_eq!(sm["record"], "summary");
        assert_eq!(sm["skipped_rows"], 1);
        Ok(())
    }
}
