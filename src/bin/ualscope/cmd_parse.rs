use anyhow::Result;
use log::info;
use std::path::PathBuf;

use UalScope::{build_ual_report, format_json_lines, format_text, EseDb};

use crate::util::{parse_config, write_stdout};

/// Вывод печатается только после успешного разбора всех файлов:
/// фатальная ошибка не оставляет частичного вывода.
pub fn exec(paths: Vec<PathBuf>, identity: Option<PathBuf>, json: bool, no_verify: bool) -> Result<()> {
    let cfg = parse_config(no_verify);
    info!("{}", cfg);

    let mut dbs = Vec::with_capacity(paths.len() + 1);
    for p in paths.iter().chain(identity.iter()) {
        dbs.push(EseDb::open_with_config(p, cfg.clone())?);
    }
    let refs: Vec<&EseDb> = dbs.iter().collect();
    let report = build_ual_report(&refs)?;

    let out = if json {
        format_json_lines(&report)?
    } else {
        format_text(&report)
    };
    write_stdout(&out)
}
