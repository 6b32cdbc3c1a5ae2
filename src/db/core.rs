//! db/core — структура EseDb и базовые аксессоры.

use anyhow::Result;
use std::path::PathBuf;

use crate::catalog::{Catalog, TableSchema};
use crate::config::ParseConfig;
use crate::header::FileHeader;
use crate::pager::Pager;

/// Открытый файл ESE: pager + заголовок + каталог.
///
/// Владеет единственным файловым дескриптором (через Pager). Каталог строится один раз
/// при открытии и дальше только читается.
pub struct EseDb {
    pub path: PathBuf,
    pub(crate) pager: Pager,
    pub(crate) catalog: Catalog,
    pub(crate) cfg: ParseConfig,
}

impl EseDb {
    #[inline]
    pub fn header(&self) -> &FileHeader {
        &self.pager.header
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[inline]
    pub fn config(&self) -> &ParseConfig {
        &self.cfg
    }

    #[inline]
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Имена таблиц в порядке сортировки.
    pub fn table_names(&self) -> Vec<String> {
        self.catalog.names().map(str::to_string).collect()
    }

    /// Схема таблицы; отсутствие — SchemaError.
    pub fn table(&self, name: &str) -> Result<&TableSchema> {
        self.catalog.require(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.catalog.table(name).is_some()
    }

    /// Бюджет посещённых страниц для одного обхода дерева.
    #[inline]
    pub fn visit_budget(&self) -> usize {
        self.cfg.visit_budget(self.pager.page_count())
    }
}
