//! btree — обход B+деревьев ESE.
//! - walker.rs     — TreeScan: ленивый in-order скан листьев с бюджетом посещённых страниц
//! - long_value.rs — LongValueStore: сборка long values из LV-дерева таблицы

pub mod long_value;
pub mod walker;

pub use long_value::LongValueStore;
pub use walker::{LeafEntry, TreeScan};
