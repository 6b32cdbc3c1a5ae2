//! page/tags — массив тегов в хвосте страницы и разбор узлов (key + data).
//!
//! Тег i лежит по адресу ps - 4*(i+1): [size u16][offset u16], offset — относительно конца
//! заголовка страницы. Страницы <= 8 KiB: 13-битные size/offset, флаги — биты 13..15 слова
//! offset. Большие страницы: 15-битные size/offset, флаги — биты 13..15 первого u16 данных.
//!
//! Узел (теги 1..n):
//!   [common_key_size u16 — только при флаге COMMON_KEY][local_key_size u16][local_key][data]
//! Полный ключ = первые common_key_size байт префикса страницы (данные тега 0) + local_key.

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{PAGE_TAG_SIZE, TAG_FLAG_COMMON_KEY, TAG_FLAG_DEFUNCT};
use crate::error::EseError;

use super::common::PageFormat;

/// Маска полей размера ключа (верхние биты на больших страницах заняты флагами).
const KEY_SIZE_MASK: u16 = 0x1FFF;

/// Элемент массива тегов.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTag {
    /// Абсолютное смещение данных в странице.
    pub offset: usize,
    pub size: usize,
    pub flags: u8,
}

impl PageTag {
    #[inline]
    pub fn is_defunct(&self) -> bool {
        self.flags & TAG_FLAG_DEFUNCT != 0
    }
    #[inline]
    pub fn has_common_key(&self) -> bool {
        self.flags & TAG_FLAG_COMMON_KEY != 0
    }
}

/// Разобрать массив тегов, проверив, что данные не пересекают заголовок и сам массив.
pub fn read_tags(
    page: &[u8],
    page_number: u32,
    tag_count: u16,
    fmt: &PageFormat,
) -> Result<Vec<PageTag>> {
    let ps = page.len();
    let hdr = fmt.header_len();
    let n = tag_count as usize;
    let tags_len = n * PAGE_TAG_SIZE;
    if hdr + tags_len > ps {
        return Err(EseError::corrupt_page(
            Some(page_number),
            format!("tag count {} does not fit page", tag_count),
        ));
    }
    let data_end = ps - tags_len;
    let mask = fmt.tag_mask();

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let at = ps - PAGE_TAG_SIZE * (i + 1);
        let size_word = LittleEndian::read_u16(&page[at..at + 2]);
        let off_word = LittleEndian::read_u16(&page[at + 2..at + 4]);
        let size = (size_word & mask) as usize;
        let offset = hdr + (off_word & mask) as usize;
        if offset + size > data_end {
            return Err(EseError::corrupt_page(
                Some(page_number),
                format!("tag {} out of bounds (off={}, size={})", i, offset, size),
            ));
        }
        let flags = if fmt.is_large() {
            if size >= 2 {
                (LittleEndian::read_u16(&page[offset..offset + 2]) >> 13) as u8
            } else {
                0
            }
        } else {
            (off_word >> 13) as u8
        };
        out.push(PageTag {
            offset,
            size,
            flags,
        });
    }
    Ok(out)
}

/// Узел страницы B+дерева.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<'a> {
    /// Индекс тега (>= 1).
    pub tag: usize,
    pub flags: u8,
    pub key: Vec<u8>,
    pub data: &'a [u8],
}

impl Node<'_> {
    #[inline]
    pub fn is_defunct(&self) -> bool {
        self.flags & TAG_FLAG_DEFUNCT != 0
    }

    /// Номер дочерней страницы (узел branch-страницы).
    pub fn child_page(&self) -> Option<u32> {
        if self.data.len() < 4 {
            return None;
        }
        Some(LittleEndian::read_u32(&self.data[0..4]))
    }
}

/// Разобрать узел из данных тега.
pub fn parse_node<'a>(
    raw: &'a [u8],
    tag_index: usize,
    tag: &PageTag,
    prefix: &[u8],
    page_number: u32,
) -> Result<Node<'a>> {
    let bad = |what: &str| {
        EseError::corrupt_page(
            Some(page_number),
            format!("tag {}: {}", tag_index, what),
        )
    };

    let mut pos = 0usize;
    let mut common = 0usize;
    if tag.has_common_key() {
        if raw.len() < 2 {
            return Err(bad("truncated common key size"));
        }
        common = (LittleEndian::read_u16(&raw[0..2]) & KEY_SIZE_MASK) as usize;
        pos = 2;
    }
    if raw.len() < pos + 2 {
        return Err(bad("truncated local key size"));
    }
    let local = (LittleEndian::read_u16(&raw[pos..pos + 2]) & KEY_SIZE_MASK) as usize;
    pos += 2;
    if raw.len() < pos + local {
        return Err(bad("local key exceeds tag"));
    }
    if common > prefix.len() {
        return Err(bad("common key longer than page prefix"));
    }

    let mut key = Vec::with_capacity(common + local);
    key.extend_from_slice(&prefix[..common]);
    key.extend_from_slice(&raw[pos..pos + local]);
    pos += local;

    Ok(Node {
        tag: tag_index,
        flags: tag.flags,
        key,
        data: &raw[pos..],
    })
}
