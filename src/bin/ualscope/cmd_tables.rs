use anyhow::Result;
use std::path::PathBuf;

use UalScope::TableSchema;

use crate::util::{open_db, print_json, write_stdout};

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let db = open_db(&path, false)?;
    let tables: Vec<&TableSchema> = db.catalog().tables().collect();

    if json {
        return print_json(&tables);
    }

    let mut out = String::new();
    for t in tables {
        out.push_str(&format!(
            "{} (objid={}, root={}, lv_root={}, columns={}, indexes={})\n",
            t.name,
            t.object_id,
            t.root_page,
            t.long_value_root.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            t.columns.len(),
            t.indexes.len()
        ));
        for c in &t.columns {
            out.push_str(&format!(
                "  {:>4} {:<32} {:<12} cp={} flags=0x{:x}{}\n",
                c.id,
                c.name,
                c.coltyp.name(),
                c.codepage,
                c.flags,
                if c.is_multivalue() { " multi" } else { "" }
            ));
        }
    }
    write_stdout(&out)
}
