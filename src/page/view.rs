//! page/view — разобранная страница: заголовок + теги + доступ к узлам.

use anyhow::Result;

use super::common::PageFormat;
use super::header::{page_header_read, PageHeader};
use super::tags::{parse_node, read_tags, Node, PageTag};

/// Страница, прочитанная и провалидированная pager'ом.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub header: PageHeader,
    bytes: Vec<u8>,
    tags: Vec<PageTag>,
}

impl Page {
    /// Разобрать байты страницы (checksum проверяется снаружи, в pager).
    pub fn parse(number: u32, bytes: Vec<u8>, fmt: &PageFormat) -> Result<Self> {
        let header = page_header_read(&bytes, number, fmt)?;
        let tags = read_tags(&bytes, number, header.tag_count, fmt)?;
        Ok(Self {
            number,
            header,
            bytes,
            tags,
        })
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn tags(&self) -> &[PageTag] {
        &self.tags
    }

    /// Сырые данные тега.
    pub fn tag_data(&self, i: usize) -> Option<&[u8]> {
        let t = self.tags.get(i)?;
        Some(&self.bytes[t.offset..t.offset + t.size])
    }

    /// Внешний заголовок страницы (тег 0).
    pub fn external_header(&self) -> &[u8] {
        self.tag_data(0).unwrap_or(&[])
    }

    /// Префикс общего ключа: тег 0 не-корневых страниц.
    /// У корневой страницы тег 0 хранит space-заголовок, а не префикс.
    pub fn key_prefix(&self) -> &[u8] {
        if self.header.is_root() {
            &[]
        } else {
            self.external_header()
        }
    }

    /// Все узлы страницы (теги 1..n) в порядке тегов, включая defunct.
    pub fn nodes(&self) -> Result<Vec<Node<'_>>> {
        let prefix = self.key_prefix();
        let mut out = Vec::with_capacity(self.tags.len().saturating_sub(1));
        for (i, tag) in self.tags.iter().enumerate().skip(1) {
            let raw = &self.bytes[tag.offset..tag.offset + tag.size];
            out.push(parse_node(raw, i, tag, prefix, self.number)?);
        }
        Ok(out)
    }

    /// Живые (не defunct) узлы.
    pub fn live_nodes(&self) -> Result<Vec<Node<'_>>> {
        Ok(self
            .nodes()?
            .into_iter()
            .filter(|n| !n.is_defunct())
            .collect())
    }
}
