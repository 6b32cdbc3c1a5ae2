//! btree/walker — ленивый обход листьев B+дерева в порядке ключей.
//!
//! Алгоритм:
//! - от корня спускаемся по самому левому живому узлу каждой branch-страницы до листа;
//! - отдаём узлы листа в порядке тегов (defunct пропускаются);
//! - переходим по next_page листа, пока он не станет 0.
//!
//! Защита от битых файлов:
//! - каждый заход на страницу расходует бюджет; бюджет по умолчанию равен числу страниц в файле,
//!   поэтому его исчерпание доказывает цикл (память O(1), без множества посещённых страниц);
//! - указатель за пределы файла, чужой object id, страница не того типа → TraversalError;
//! - после первой ошибки итератор завершён (fused).

use anyhow::Result;
use std::collections::VecDeque;

use crate::error::EseError;
use crate::page::Page;
use crate::pager::Pager;

/// Узел листа, отданный сканом.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafEntry {
    pub page: u32,
    pub tag: usize,
    pub key: Vec<u8>,
    pub data: Vec<u8>,
}

enum ScanState {
    Start,
    Leaf { next_page: u32 },
    Done,
}

/// Скан одного дерева. Новый скан (TreeScan::new) всегда идёт заново от корня.
pub struct TreeScan<'p> {
    pager: &'p Pager,
    root: u32,
    object_id: Option<u32>,
    budget: usize,
    visited: usize,
    leaves: usize,
    pending: VecDeque<LeafEntry>,
    state: ScanState,
}

impl<'p> TreeScan<'p> {
    pub fn new(pager: &'p Pager, root: u32, budget: usize) -> Self {
        Self {
            pager,
            root,
            object_id: None,
            budget: budget.max(1),
            visited: 0,
            leaves: 0,
            pending: VecDeque::new(),
            state: ScanState::Start,
        }
    }

    /// Сколько страниц посещено (branch + leaf).
    #[inline]
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Сколько листьев пройдено.
    #[inline]
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    #[inline]
    pub fn root(&self) -> u32 {
        self.root
    }

    fn visit(&mut self, page_number: u32) -> Result<Page> {
        if !self.pager.contains(page_number) {
            return Err(EseError::traversal(
                self.root,
                page_number,
                format!("page pointer outside 1..={}", self.pager.last_page()),
            ));
        }
        self.visited += 1;
        if self.visited > self.budget {
            return Err(EseError::traversal(
                self.root,
                page_number,
                format!(
                    "visited-page budget of {} exhausted (cycle in page links)",
                    self.budget
                ),
            ));
        }

        let page = self.pager.read_page(page_number)?;
        match self.object_id {
            None => self.object_id = Some(page.header.fdp_object_id),
            Some(obj) if obj != page.header.fdp_object_id => {
                return Err(EseError::traversal(
                    self.root,
                    page_number,
                    format!(
                        "page belongs to object {} (tree object {})",
                        page.header.fdp_object_id, obj
                    ),
                ));
            }
            Some(_) => {}
        }
        Ok(page)
    }

    /// Спуск от корня к самому левому листу.
    fn descend(&mut self) -> Result<Page> {
        let mut page_number = self.root;
        loop {
            let page = self.visit(page_number)?;
            if page.header.is_leaf() {
                return Ok(page);
            }
            if !page.header.is_parent() {
                return Err(EseError::traversal(
                    self.root,
                    page_number,
                    format!("page is neither leaf nor branch (flags=0x{:x})", page.header.flags),
                ));
            }
            let child = page
                .live_nodes()?
                .first()
                .and_then(|n| n.child_page())
                .ok_or_else(|| {
                    EseError::traversal(self.root, page_number, "branch page without children")
                })?;
            page_number = child;
        }
    }

    /// Загрузить узлы листа в очередь и запомнить следующий лист.
    fn load_leaf(&mut self, page: Page) -> Result<()> {
        if !page.header.is_leaf() {
            return Err(EseError::traversal(
                self.root,
                page.number,
                "sibling link points to a non-leaf page",
            ));
        }
        self.leaves += 1;
        for node in page.live_nodes()? {
            self.pending.push_back(LeafEntry {
                page: page.number,
                tag: node.tag,
                key: node.key,
                data: node.data.to_vec(),
            });
        }
        if page.header.next_page == page.number {
            return Err(EseError::traversal(
                self.root,
                page.number,
                "leaf links to itself",
            ));
        }
        self.state = ScanState::Leaf {
            next_page: page.header.next_page,
        };
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<LeafEntry>> {
        loop {
            if let Some(e) = self.pending.pop_front() {
                return Ok(Some(e));
            }
            match self.state {
                ScanState::Done => return Ok(None),
                ScanState::Start => {
                    let leaf = self.descend()?;
                    self.load_leaf(leaf)?;
                }
                ScanState::Leaf { next_page: 0 } => {
                    self.state = ScanState::Done;
                    return Ok(None);
                }
                ScanState::Leaf { next_page } => {
                    let leaf = self.visit(next_page)?;
                    self.load_leaf(leaf)?;
                }
            }
        }
    }
}

impl Iterator for TreeScan<'_> {
    type Item = Result<LeafEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(e)) => Some(Ok(e)),
            Ok(None) => None,
            Err(e) => {
                self.state = ScanState::Done;
                self.pending.clear();
                Some(Err(e))
            }
        }
    }
}
