//! pager/io — чтение страниц:
//! - read_raw: сырые байты страницы (проверка диапазона, усечённое чтение → CorruptPageError)
//! - read_page: read_raw + проверка checksum + разбор заголовка/тегов
//! - check_page: классификация страницы без ошибки (для doctor)

use anyhow::Result;
use log::debug;
use std::io::{Read, Seek, SeekFrom};

use crate::error::EseError;
use crate::page::{page_verify_checksum, ChecksumCheck, Page};

use super::core::Pager;

impl Pager {
    /// Прочитать сырые байты страницы `page_number`.
    pub fn read_raw(&self, page_number: u32) -> Result<Vec<u8>> {
        if !self.contains(page_number) {
            return Err(EseError::corrupt_page(
                Some(page_number),
                format!("page out of range 1..={}", self.last_page),
            ));
        }
        let ps = self.page_size();
        let off = self.fmt.file_offset(page_number);
        let mut buf = vec![0u8; ps];

        let mut f = &self.file;
        f.seek(SeekFrom::Start(off))?;
        f.read_exact(&mut buf).map_err(|e| {
            EseError::corrupt_page(
                Some(page_number),
                format!("truncated read at offset {}: {}", off, e),
            )
        })?;
        Ok(buf)
    }

    /// Прочитать и провалидировать страницу.
    pub fn read_page(&self, page_number: u32) -> Result<Page> {
        let buf = self.read_raw(page_number)?;

        match page_verify_checksum(&buf, page_number, &self.fmt) {
            ChecksumCheck::Valid => {}
            ChecksumCheck::Empty => {
                return Err(EseError::corrupt_page(
                    Some(page_number),
                    "page is uninitialized (all zero)",
                ));
            }
            ChecksumCheck::Mismatch { stored, computed } => {
                if self.verify_checksums {
                    return Err(EseError::corrupt_page(
                        Some(page_number),
                        format!(
                            "checksum mismatch (stored=0x{:08X}, computed=0x{:08X})",
                            stored, computed
                        ),
                    ));
                }
                debug!("page {} checksum mismatch ignored (verification disabled)", page_number);
            }
            ChecksumCheck::NotVerified => {}
        }

        Page::parse(page_number, buf, &self.fmt)
    }

    /// Проверка одной страницы без ошибки верхнего уровня: статус checksum + заголовок.
    /// Err возвращается только при ошибке ввода-вывода/диапазона.
    pub fn check_page(&self, page_number: u32) -> Result<(ChecksumCheck, Option<Page>)> {
        let buf = self.read_raw(page_number)?;
        let status = page_verify_checksum(&buf, page_number, &self.fmt);
        if status == ChecksumCheck::Empty {
            return Ok((status, None));
        }
        let page = Page::parse(page_number, buf, &self.fmt).ok();
        Ok((status, page))
    }
}
