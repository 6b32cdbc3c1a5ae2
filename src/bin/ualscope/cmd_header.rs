use anyhow::Result;
use std::fs::File;
use std::path::PathBuf;

use UalScope::read_file_header;

use crate::util::{print_json, write_stdout};

/// Только заголовок: каталог не читается, поэтому команда работает и на файлах
/// с нечитаемым каталогом.
pub fn exec(path: PathBuf, json: bool) -> Result<()> {
    let mut f = File::open(&path)?;
    let h = read_file_header(&mut f, true)?;

    if json {
        return print_json(&h);
    }
    let out = format!(
        "file          = {}\n\
         source        = {:?}\n\
         format        = 0x{:x} rev 0x{:x}\n\
         page_size     = {}\n\
         state         = {} ({})\n\
         db_time       = {}\n\
         created       = {}\n",
        path.display(),
        h.source,
        h.format_version,
        h.format_revision,
        h.page_size,
        h.state_str(),
        h.database_state,
        h.db_time,
        h.creation_time.map(|t| t.to_string()).unwrap_or_default()
    );
    write_stdout(&out)
}
