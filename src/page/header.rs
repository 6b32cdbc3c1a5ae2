//! page/header — заголовок страницы ESE (чтение и запись).

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{
    PAGE_FLAG_EMPTY, PAGE_FLAG_INDEX, PAGE_FLAG_LEAF, PAGE_FLAG_LONG_VALUE,
    PAGE_FLAG_NEW_RECORD_FORMAT, PAGE_FLAG_PARENT, PAGE_FLAG_ROOT, PAGE_FLAG_SPACE_TREE,
    REVISION_NEW_CHECKSUM,
};
use crate::error::EseError;

use super::common::{
    PageFormat, OFF_AVAIL_DATA_SIZE, OFF_AVAIL_UNCOMMITTED, OFF_CHECKSUM, OFF_DB_TIME,
    OFF_ECC_OR_PGNO, OFF_EXT_PAGE_NUMBER, OFF_FDP_OBJID, OFF_FIRST_FREE, OFF_FLAGS,
    OFF_NEXT_PAGE, OFF_PREV_PAGE, OFF_TAG_COUNT,
};

/// Заголовок страницы.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageHeader {
    pub checksum: u32,
    pub ecc_or_page_number: u32,
    pub db_time: u64,
    pub prev_page: u32, // 0 — нет соседа
    pub next_page: u32, // 0 — конец цепочки листьев
    pub fdp_object_id: u32,
    pub available_data_size: u16,
    pub available_uncommitted: u16,
    pub first_free_offset: u16,
    pub tag_count: u16,
    pub flags: u32,
    /// Номер страницы из расширенного заголовка (если есть).
    pub ext_page_number: Option<u64>,
}

impl PageHeader {
    #[inline]
    pub fn is_root(&self) -> bool {
        self.flags & PAGE_FLAG_ROOT != 0
    }
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.flags & PAGE_FLAG_LEAF != 0
    }
    #[inline]
    pub fn is_parent(&self) -> bool {
        self.flags & PAGE_FLAG_PARENT != 0
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flags & PAGE_FLAG_EMPTY != 0
    }
    #[inline]
    pub fn is_space_tree(&self) -> bool {
        self.flags & PAGE_FLAG_SPACE_TREE != 0
    }
    #[inline]
    pub fn is_index(&self) -> bool {
        self.flags & PAGE_FLAG_INDEX != 0
    }
    #[inline]
    pub fn is_long_value(&self) -> bool {
        self.flags & PAGE_FLAG_LONG_VALUE != 0
    }
    #[inline]
    pub fn is_new_record_format(&self) -> bool {
        self.flags & PAGE_FLAG_NEW_RECORD_FORMAT != 0
    }

    /// Короткое имя типа страницы (doctor/отчёты).
    pub fn kind_str(&self) -> &'static str {
        if self.is_space_tree() {
            "space_tree"
        } else if self.is_long_value() {
            "long_value"
        } else if self.is_index() {
            "index"
        } else if self.is_leaf() {
            "leaf"
        } else if self.is_parent() {
            "branch"
        } else {
            "other"
        }
    }
}

/// Прочитать заголовок страницы `page_number` (валидация номера страницы, где он хранится).
pub fn page_header_read(page: &[u8], page_number: u32, fmt: &PageFormat) -> Result<PageHeader> {
    if page.len() != fmt.page_size as usize {
        return Err(EseError::corrupt_page(
            Some(page_number),
            format!("buffer size {} != page_size {}", page.len(), fmt.page_size),
        ));
    }

    let h = PageHeader {
        checksum: LittleEndian::read_u32(&page[OFF_CHECKSUM..OFF_CHECKSUM + 4]),
        ecc_or_page_number: LittleEndian::read_u32(&page[OFF_ECC_OR_PGNO..OFF_ECC_OR_PGNO + 4]),
        db_time: LittleEndian::read_u64(&page[OFF_DB_TIME..OFF_DB_TIME + 8]),
        prev_page: LittleEndian::read_u32(&page[OFF_PREV_PAGE..OFF_PREV_PAGE + 4]),
        next_page: LittleEndian::read_u32(&page[OFF_NEXT_PAGE..OFF_NEXT_PAGE + 4]),
        fdp_object_id: LittleEndian::read_u32(&page[OFF_FDP_OBJID..OFF_FDP_OBJID + 4]),
        available_data_size: LittleEndian::read_u16(
            &page[OFF_AVAIL_DATA_SIZE..OFF_AVAIL_DATA_SIZE + 2],
        ),
        available_uncommitted: LittleEndian::read_u16(
            &page[OFF_AVAIL_UNCOMMITTED..OFF_AVAIL_UNCOMMITTED + 2],
        ),
        first_free_offset: LittleEndian::read_u16(&page[OFF_FIRST_FREE..OFF_FIRST_FREE + 2]),
        tag_count: LittleEndian::read_u16(&page[OFF_TAG_COUNT..OFF_TAG_COUNT + 2]),
        flags: LittleEndian::read_u32(&page[OFF_FLAGS..OFF_FLAGS + 4]),
        ext_page_number: if fmt.has_extended_header() {
            Some(LittleEndian::read_u64(
                &page[OFF_EXT_PAGE_NUMBER..OFF_EXT_PAGE_NUMBER + 8],
            ))
        } else {
            None
        },
    };

    // Старый формат хранит номер страницы в [4..8) — сверим.
    if fmt.revision < REVISION_NEW_CHECKSUM && h.ecc_or_page_number != page_number {
        return Err(EseError::corrupt_page(
            Some(page_number),
            format!("stored page number {} mismatch", h.ecc_or_page_number),
        ));
    }
    if let Some(ext) = h.ext_page_number {
        if ext != page_number as u64 {
            return Err(EseError::corrupt_page(
                Some(page_number),
                format!("extended header page number {} mismatch", ext),
            ));
        }
    }
    Ok(h)
}

/// Записать заголовок (без пересчёта checksum).
pub fn page_header_write(page: &mut [u8], h: &PageHeader, fmt: &PageFormat) {
    LittleEndian::write_u32(&mut page[OFF_CHECKSUM..OFF_CHECKSUM + 4], h.checksum);
    LittleEndian::write_u32(
        &mut page[OFF_ECC_OR_PGNO..OFF_ECC_OR_PGNO + 4],
        h.ecc_or_page_number,
    );
    LittleEndian::write_u64(&mut page[OFF_DB_TIME..OFF_DB_TIME + 8], h.db_time);
    LittleEndian::write_u32(&mut page[OFF_PREV_PAGE..OFF_PREV_PAGE + 4], h.prev_page);
    LittleEndian::write_u32(&mut page[OFF_NEXT_PAGE..OFF_NEXT_PAGE + 4], h.next_page);
    LittleEndian::write_u32(&mut page[OFF_FDP_OBJID..OFF_FDP_OBJID + 4], h.fdp_object_id);
    LittleEndian::write_u16(
        &mut page[OFF_AVAIL_DATA_SIZE..OFF_AVAIL_DATA_SIZE + 2],
        h.available_data_size,
    );
    LittleEndian::write_u16(
        &mut page[OFF_AVAIL_UNCOMMITTED..OFF_AVAIL_UNCOMMITTED + 2],
        h.available_uncommitted,
    );
    LittleEndian::write_u16(&mut page[OFF_FIRST_FREE..OFF_FIRST_FREE + 2], h.first_free_offset);
    LittleEndian::write_u16(&mut page[OFF_TAG_COUNT..OFF_TAG_COUNT + 2], h.tag_count);
    LittleEndian::write_u32(&mut page[OFF_FLAGS..OFF_FLAGS + 4], h.flags);
    if fmt.has_extended_header() {
        LittleEndian::write_u64(
            &mut page[OFF_EXT_PAGE_NUMBER..OFF_EXT_PAGE_NUMBER + 8],
            h.ext_page_number.unwrap_or(0),
        );
    }
}
