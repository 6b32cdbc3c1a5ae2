use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use UalScope::{EseDb, ParseConfig};

/// Конфиг из окружения; флаг --no-verify отключает проверку checksum поверх env.
pub fn parse_config(no_verify: bool) -> ParseConfig {
    let mut b = EseDb::builder();
    if no_verify {
        b = b.verify_checksums(false);
    }
    b.build()
}

pub fn open_db(path: &Path, no_verify: bool) -> Result<EseDb> {
    EseDb::open_with_config(path, parse_config(no_verify))
}

/// Записать готовый вывод в stdout одним куском.
pub fn write_stdout(s: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(s.as_bytes())?;
    out.flush()?;
    Ok(())
}

pub fn print_json<T: Serialize>(v: &T) -> Result<()> {
    let mut s = serde_json::to_string(v)?;
    s.push('\n');
    write_stdout(&s)
}
