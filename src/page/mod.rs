//! page — on-disk страницы ESE: заголовок, checksum, теги и узлы.
//!
//! Разделение по подмодулям:
//! - common.rs   — offset'ы заголовка, PageFormat (размер страницы + ревизия формата).
//! - checksum.rs — XOR-32 checksum (старый/новый режим), статус проверки.
//! - header.rs   — PageHeader: чтение/запись, флаги.
//! - tags.rs     — массив тегов, разбор узлов (общий префикс ключа + локальный ключ + данные).
//! - view.rs     — Page: провалидированная страница с доступом к узлам.

pub mod common;
pub mod checksum;
pub mod header;
pub mod tags;
pub mod view;

// ---------------- re-exports (внешний API модуля page) ----------------

pub use common::PageFormat;

pub use checksum::{page_update_checksum, page_verify_checksum, xor32, ChecksumCheck};

pub use header::{page_header_read, page_header_write, PageHeader};

pub use tags::{Node, PageTag};

pub use view::Page;
