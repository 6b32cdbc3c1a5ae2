//! error — таксономия ошибок разбора ESE.
//!
//! Все функции крейта возвращают `anyhow::Result`; классифицируемые сбои
//! заворачиваются в `EseError` и распознаются через `error_kind()`:
//! - CorruptPageError — файл нечитаем/невалиден (фатально);
//! - SchemaError      — каталог нечитаем (фатально);
//! - TraversalError   — обход дерева одной таблицы невозможен (таблица пропускается);
//! - DecodeError      — строка не декодируется (строка пропускается, счётчик skipped).

use thiserror::Error;

/// Класс сбоя разбора.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EseError {
    /// Страница/заголовок повреждены, усечены или не поддерживаются.
    #[error("corrupt {}: {detail}", page_label(.page))]
    CorruptPage { page: Option<u32>, detail: String },

    /// Каталог (MSysObjects) не позволяет восстановить схему.
    #[error("catalog unreadable: {detail}")]
    Schema { detail: String },

    /// Обход B+дерева прерван (цикл, указатель за диапазон, чужая страница).
    #[error("tree traversal failed (root={root}, page={page}): {detail}")]
    Traversal { root: u32, page: u32, detail: String },

    /// Строку нельзя декодировать по схеме.
    #[error("record decode failed: {detail}")]
    Decode { detail: String },
}

fn page_label(page: &Option<u32>) -> String {
    match page {
        Some(p) => format!("page {}", p),
        None => "database file".to_string(),
    }
}

impl EseError {
    pub fn corrupt_page(page: Option<u32>, detail: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(EseError::CorruptPage {
            page,
            detail: detail.into(),
        })
    }

    pub fn schema(detail: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(EseError::Schema {
            detail: detail.into(),
        })
    }

    pub fn traversal(root: u32, page: u32, detail: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(EseError::Traversal {
            root,
            page,
            detail: detail.into(),
        })
    }

    pub fn decode(detail: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(EseError::Decode {
            detail: detail.into(),
        })
    }

    /// Имя класса в таксономии (печатается в stderr CLI).
    pub fn kind_name(&self) -> &'static str {
        match self {
            EseError::CorruptPage { .. } => "CorruptPageError",
            EseError::Schema { .. } => "SchemaError",
            EseError::Traversal { .. } => "TraversalError",
            EseError::Decode { .. } => "DecodeError",
        }
    }

    /// Фатален ли сбой для всего разбора файла.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EseError::CorruptPage { .. } | EseError::Schema { .. })
    }
}

/// Найти `EseError` в цепочке ошибки (с учётом `.context(..)` обёрток).
pub fn find_ese_error(e: &anyhow::Error) -> Option<&EseError> {
    e.chain().find_map(|c| c.downcast_ref::<EseError>())
}

/// Имя класса ошибки: таксономия ESE, затем IoError, иначе "Error".
pub fn error_kind(e: &anyhow::Error) -> &'static str {
    if let Some(ese) = find_ese_error(e) {
        return ese.kind_name();
    }
    if e.chain().any(|c| c.downcast_ref::<std::io::Error>().is_some()) {
        return "IoError";
    }
    "Error"
}

/// Ошибка строки (DecodeError) — её можно пропустить и продолжить скан.
pub fn is_decode_error(e: &anyhow::Error) -> bool {
    matches!(find_ese_error(e), Some(EseError::Decode { .. }))
}

/// Ошибка обхода дерева одной таблицы.
pub fn is_traversal_error(e: &anyhow::Error) -> bool {
    matches!(find_ese_error(e), Some(EseError::Traversal { .. }))
}
