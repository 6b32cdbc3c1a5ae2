//! db/open — открытие EseDb с конфигом.

use anyhow::Result;
use log::info;
use std::path::Path;

use crate::catalog::Catalog;
use crate::config::{ParseBuilder, ParseConfig};
use crate::pager::Pager;

use super::core::EseDb;

impl EseDb {
    /// Открыть файл с конфигом из окружения (UAL_*).
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, ParseConfig::from_env())
    }

    /// Открыть файл: заголовок → pager → каталог.
    pub fn open_with_config(path: &Path, cfg: ParseConfig) -> Result<Self> {
        let pager = Pager::open(path, &cfg)?;
        let budget = cfg.visit_budget(pager.page_count());
        let catalog = Catalog::load(&pager, budget)?;
        info!(
            "{}: {} page(s), {} table(s)",
            path.display(),
            pager.page_count(),
            catalog.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            pager,
            catalog,
            cfg,
        })
    }

    /// Билдер конфигурации (стартует от env).
    pub fn builder() -> ParseBuilder {
        ParseBuilder::new()
    }
}
