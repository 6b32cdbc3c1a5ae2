//! pager/core — ядро Pager: структура, open(), геометрия файла.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::config::ParseConfig;
use crate::error::EseError;
use crate::header::{read_file_header, FileHeader};
use crate::page::PageFormat;

/// Низкоуровневый читатель страниц одного файла БД.
///
/// Владеет единственным файловым дескриптором; закрывается в Drop на любом пути выхода.
/// Чтения идут через seek + read_exact на общем дескрипторе, поэтому Pager
/// рассчитан на последовательное использование из одного потока.
pub struct Pager {
    pub path: PathBuf,
    pub(crate) file: File,
    pub header: FileHeader,
    pub(crate) fmt: PageFormat,
    pub(crate) file_len: u64,
    pub(crate) last_page: u32,
    pub(crate) verify_checksums: bool,
}

impl Pager {
    /// Открыть файл БД: заголовок (с тенью), проверка геометрии.
    pub fn open(path: &Path, cfg: &ParseConfig) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        let file_len = file.metadata()?.len();

        let header = read_file_header(&mut file, cfg.shadow_header)?;
        let ps = header.page_size as u64;

        if file_len % ps != 0 {
            return Err(EseError::corrupt_page(
                None,
                format!(
                    "file length {} is not a multiple of page size {} (truncated mid-page)",
                    file_len, ps
                ),
            ));
        }
        // Две первые страницы файла — заголовок и его тень.
        let total = file_len / ps;
        if total < 2 {
            return Err(EseError::corrupt_page(
                None,
                format!("file too short for header and shadow ({} bytes)", file_len),
            ));
        }
        let last_page = u32::try_from(total - 2).map_err(|_| {
            EseError::corrupt_page(None, format!("file too large ({} pages)", total))
        })?;

        if header.is_dirty() {
            warn!(
                "{}: database is in dirty-shutdown state; recent changes may be in logs only",
                path.display()
            );
        }
        if header.page_format().has_extended_header() && cfg.verify_checksums {
            debug!(
                "{}: extended page format, per-page ECC checksums are not verified",
                path.display()
            );
        }
        debug!(
            "opened {} (page_size={}, revision=0x{:x}, pages={}, state={})",
            path.display(),
            header.page_size,
            header.format_revision,
            last_page,
            header.state_str()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            fmt: header.page_format(),
            header,
            file_len,
            last_page,
            verify_checksums: cfg.verify_checksums,
        })
    }

    #[inline]
    pub fn page_format(&self) -> PageFormat {
        self.fmt
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.fmt.page_size as usize
    }

    /// Последний валидный номер страницы (страницы нумеруются с 1).
    #[inline]
    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    /// Число страниц данных в файле.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.last_page
    }

    #[inline]
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    #[inline]
    pub fn contains(&self, page_number: u32) -> bool {
        page_number >= 1 && page_number <= self.last_page
    }
}
