//! page/common — offset'ы заголовка страницы ESE и описание формата страниц файла.

use crate::consts::{PAGE_HDR_EXT_SIZE, PAGE_HDR_SIZE, REVISION_EXTENDED_HEADER};

// ---------- Стандартный заголовок (40 байт) ----------
/// XOR-32 checksum (u32).
pub const OFF_CHECKSUM: usize = 0;
/// ECC checksum (новый формат) либо номер страницы (старый формат), u32.
pub const OFF_ECC_OR_PGNO: usize = 4;
/// Время последней модификации БД (u64).
pub const OFF_DB_TIME: usize = 8;
/// Предыдущая страница-сосед (u32, 0 — нет).
pub const OFF_PREV_PAGE: usize = 16;
/// Следующая страница-сосед (u32, 0 — нет).
pub const OFF_NEXT_PAGE: usize = 20;
/// Object id дерева (FDP), которому принадлежит страница (u32).
pub const OFF_FDP_OBJID: usize = 24;
/// Свободно байт (u16).
pub const OFF_AVAIL_DATA_SIZE: usize = 28;
/// Свободно байт с учётом незакоммиченных (u16).
pub const OFF_AVAIL_UNCOMMITTED: usize = 30;
/// Смещение первого свободного байта данных (u16, относительно конца заголовка).
pub const OFF_FIRST_FREE: usize = 32;
/// Число тегов (u16).
pub const OFF_TAG_COUNT: usize = 34;
/// Флаги страницы (u32).
pub const OFF_FLAGS: usize = 36;

// ---------- Расширенный заголовок (ревизия >= 0x11, страницы > 8 KiB) ----------
/// Номер страницы (u64) в расширенной части.
pub const OFF_EXT_PAGE_NUMBER: usize = 64;

/// Параметры, от которых зависит разметка страниц файла.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFormat {
    pub page_size: u32,
    pub revision: u32,
}

impl PageFormat {
    pub fn new(page_size: u32, revision: u32) -> Self {
        Self {
            page_size,
            revision,
        }
    }

    /// Большие страницы (> 8 KiB): 15-битные offset'ы тегов, флаги тегов в данных.
    #[inline]
    pub fn is_large(&self) -> bool {
        self.page_size > 8192
    }

    #[inline]
    pub fn has_extended_header(&self) -> bool {
        self.is_large() && self.revision >= REVISION_EXTENDED_HEADER
    }

    #[inline]
    pub fn header_len(&self) -> usize {
        if self.has_extended_header() {
            PAGE_HDR_EXT_SIZE
        } else {
            PAGE_HDR_SIZE
        }
    }

    /// Маска размера/смещения в элементе тега.
    #[inline]
    pub fn tag_mask(&self) -> u16 {
        if self.is_large() {
            0x7FFF
        } else {
            0x1FFF
        }
    }

    /// Смещение страницы в файле: страницы 0 и 1 файла заняты заголовком и его тенью.
    #[inline]
    pub fn file_offset(&self, page_number: u32) -> u64 {
        (page_number as u64 + 1) * self.page_size as u64
    }
}
