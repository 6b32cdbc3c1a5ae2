//! db — фасад одного файла БД (EseDb).
//!
//! Разделение по подмодулям:
//! - core.rs   — структура EseDb, доступ к заголовку/каталогу/конфигу
//! - open.rs   — открытие (open / open_with_config / builder)
//! - scan.rs   — TableRows: полный последовательный скан таблицы с изоляцией ошибок строк
//! - doctor.rs — check_pages: проверка checksum и типизация всех страниц

pub mod core;
pub mod doctor;
pub mod open;
pub mod scan;

pub use core::EseDb;
pub use doctor::PageCheckReport;
pub use scan::TableRows;
