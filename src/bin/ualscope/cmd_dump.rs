use anyhow::Result;
use std::path::PathBuf;

use UalScope::{Field, Value};

use crate::util::{open_db, write_stdout};

pub fn exec(path: PathBuf, table: String, limit: Option<usize>, json: bool, no_verify: bool) -> Result<()> {
    let db = open_db(&path, no_verify)?;
    let mut rows = db.scan_table(&table)?;
    let limit = limit.unwrap_or(usize::MAX);

    let mut out = String::new();
    let mut n = 0usize;
    for rec in rows.by_ref() {
        if n >= limit {
            break;
        }
        let rec = rec?;
        if json {
            out.push_str(&serde_json::to_string(&rec)?);
        } else {
            let parts: Vec<String> = rec
                .fields
                .iter()
                .map(|f| match &f.field {
                    Field::Present(Value::DateTime(ft)) => format!(
                        "{}={}",
                        f.name,
                        UalScope::util::format_filetime(*ft).unwrap_or_default()
                    ),
                    Field::Present(v) => format!("{}={}", f.name, v),
                    Field::Absent => format!("{}=", f.name),
                })
                .collect();
            out.push_str(&parts.join("||"));
        }
        out.push('\n');
        n += 1;
    }
    if rows.skipped_rows() > 0 {
        out.push_str(&format!("# summary: skipped_rows={}\n", rows.skipped_rows()));
    }
    write_stdout(&out)
}
