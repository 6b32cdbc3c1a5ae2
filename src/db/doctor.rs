//! db/doctor — проверка всех страниц файла: checksum и типизация.
//!
//! Семантика:
//! - проходим page ∈ [1 ..= last_page];
//! - checksum: ok / mismatch / not_verified (extended-формат) / empty (все нули);
//! - типизация по флагам заголовка: leaf / branch / root / long_value / space_tree / index;
//!   страница с нечитаемым заголовком или тегами учитывается как unparsable.
//!
//! Скан не прерывается на битых страницах: отчёт — это и есть результат.

use anyhow::Result;
use serde::Serialize;

use crate::page::ChecksumCheck;

use super::core::EseDb;

/// Сколько номеров битых страниц хранить в отчёте.
const MAX_LISTED_BAD_PAGES: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageCheckReport {
    pub page_size: u32,
    pub pages_total: u32,
    pub ok_pages: u32,
    pub checksum_failures: u32,
    pub not_verified: u32,
    pub empty_pages: u32,
    pub unparsable: u32,
    pub leaf_pages: u32,
    pub branch_pages: u32,
    pub root_pages: u32,
    pub long_value_pages: u32,
    pub space_tree_pages: u32,
    pub index_pages: u32,
    /// Первые номера страниц с ошибкой checksum или разбора.
    pub bad_pages: Vec<u32>,
}

impl PageCheckReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.checksum_failures == 0 && self.unparsable == 0
    }

    fn note_bad(&mut self, page: u32) {
        if self.bad_pages.len() < MAX_LISTED_BAD_PAGES {
            self.bad_pages.push(page);
        }
    }
}

impl EseDb {
    /// Doctor-скан всех страниц.
    pub fn check_pages(&self) -> Result<PageCheckReport> {
        let mut r = PageCheckReport {
            page_size: self.pager.header.page_size,
            pages_total: self.pager.page_count(),
            ..Default::default()
        };

        for pgno in 1..=self.pager.last_page() {
            let (status, page) = self.pager.check_page(pgno)?;
            match status {
                ChecksumCheck::Valid => r.ok_pages += 1,
                ChecksumCheck::NotVerified => r.not_verified += 1,
                ChecksumCheck::Empty => {
                    r.empty_pages += 1;
                    continue;
                }
                ChecksumCheck::Mismatch { .. } => {
                    r.checksum_failures += 1;
                    r.note_bad(pgno);
                }
            }
            let Some(page) = page else {
                r.unparsable += 1;
                // mismatch уже отмечен выше
                if !matches!(status, ChecksumCheck::Mismatch { .. }) {
                    r.note_bad(pgno);
                }
                continue;
            };
            let h = &page.header;
            if h.is_root() {
                r.root_pages += 1;
            }
            if h.is_space_tree() {
                r.space_tree_pages += 1;
            } else if h.is_long_value() {
                r.long_value_pages += 1;
            } else if h.is_index() {
                r.index_pages += 1;
            }
            if h.is_leaf() {
                r.leaf_pages += 1;
            } else if h.is_parent() {
                r.branch_pages += 1;
            }
        }
        Ok(r)
    }
}
