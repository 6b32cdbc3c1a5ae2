use anyhow::Result;
use std::path::PathBuf;

use crate::util::{open_db, print_json, write_stdout};

pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    // Битые страницы — предмет отчёта, а не ошибка открытия.
    let db = open_db(&path, true)?;
    let r = db.check_pages()?;

    if json {
        return print_json(&r);
    }
    let bad = r
        .bad_pages
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let out = format!(
        "Doctor report ({}):\n\
         \x20 page_size         = {}\n\
         \x20 pages_total       = {}\n\
         \x20 ok_pages          = {}\n\
         \x20 checksum_failures = {}\n\
         \x20 not_verified      = {}\n\
         \x20 empty_pages       = {}\n\
         \x20 unparsable        = {}\n\
         \x20 leaf/branch/root  = {}/{}/{}\n\
         \x20 long_value        = {}\n\
         \x20 space_tree        = {}\n\
         \x20 index             = {}\n\
         \x20 bad_pages         = {}\n",
        path.display(),
        r.page_size,
        r.pages_total,
        r.ok_pages,
        r.checksum_failures,
        r.not_verified,
        r.empty_pages,
        r.unparsable,
        r.leaf_pages,
        r.branch_pages,
        r.root_pages,
        r.long_value_pages,
        r.space_tree_pages,
        r.index_pages,
        if bad.is_empty() { "-" } else { bad.as_str() }
    );
    write_stdout(&out)
}
