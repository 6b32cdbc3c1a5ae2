//! pager — слой чтения страниц файла ESE.
//!
//! Подмодули:
//! - core.rs — структура Pager, open() (заголовок, геометрия, проверка усечения).
//! - io.rs   — read_raw/read_page/check_page.
//!
//! Номер страницы n (с 1) лежит по смещению (n + 1) * page_size:
//! страницы 0 и 1 файла — заголовок и его теневая копия.

pub mod core;
pub mod io;

// Re-exports для внешнего API
pub use core::Pager;
