//! catalog/bootstrap — схема MSysObjects, известная заранее.
//!
//! Каталог сам хранится как таблица, поэтому для чтения его строк нужна встроенная схема.

use crate::consts::{
    CATALOG_ROOT_PAGE, CATALOG_TABLE_NAME, CODEPAGE_UTF16, CODEPAGE_WESTERN,
};

use super::schema::{ColumnDescriptor, ColumnType, TableSchema};

/// Object id таблицы MSysObjects.
pub const CATALOG_OBJECT_ID: u32 = 2;

pub const COL_OBJID_TABLE: &str = "ObjidTable";
pub const COL_TYPE: &str = "Type";
pub const COL_ID: &str = "Id";
pub const COL_COLTYP_OR_PGNO_FDP: &str = "ColtypOrPgnoFDP";
pub const COL_SPACE_USAGE: &str = "SpaceUsage";
pub const COL_FLAGS: &str = "Flags";
pub const COL_PAGES_OR_LOCALE: &str = "PagesOrLocale";
pub const COL_RECORD_OFFSET: &str = "RecordOffset";
pub const COL_NAME: &str = "Name";

pub fn catalog_schema() -> TableSchema {
    let mut s = TableSchema::new(CATALOG_OBJECT_ID, CATALOG_TABLE_NAME, CATALOG_ROOT_PAGE);
    let cols = [
        ColumnDescriptor::new(1, COL_OBJID_TABLE, ColumnType::Long),
        ColumnDescriptor::new(2, COL_TYPE, ColumnType::Short),
        ColumnDescriptor::new(3, COL_ID, ColumnType::Long),
        ColumnDescriptor::new(4, COL_COLTYP_OR_PGNO_FDP, ColumnType::Long),
        ColumnDescriptor::new(5, COL_SPACE_USAGE, ColumnType::Long),
        ColumnDescriptor::new(6, COL_FLAGS, ColumnType::Long),
        ColumnDescriptor::new(7, COL_PAGES_OR_LOCALE, ColumnType::Long),
        ColumnDescriptor::new(8, "RootFlag", ColumnType::Bit),
        ColumnDescriptor::new(9, COL_RECORD_OFFSET, ColumnType::Short),
        ColumnDescriptor::new(10, "LCMapFlags", ColumnType::Long),
        ColumnDescriptor::new(11, "KeyMost", ColumnType::UnsignedShort),
        ColumnDescriptor::new(12, "LVChunkMax", ColumnType::Long),
        ColumnDescriptor::new(128, COL_NAME, ColumnType::Text).with_codepage(CODEPAGE_WESTERN),
        ColumnDescriptor::new(129, "Stats", ColumnType::Binary),
        ColumnDescriptor::new(130, "TemplateTable", ColumnType::Text)
            .with_codepage(CODEPAGE_WESTERN),
        ColumnDescriptor::new(131, "DefaultValue", ColumnType::Binary),
        ColumnDescriptor::new(132, "KeyFldIDs", ColumnType::Binary),
        ColumnDescriptor::new(133, "VarSegMac", ColumnType::Binary),
        ColumnDescriptor::new(134, "ConditionalColumns", ColumnType::Binary),
        ColumnDescriptor::new(135, "TupleLimits", ColumnType::Binary),
        ColumnDescriptor::new(136, "Version", ColumnType::Binary),
        ColumnDescriptor::new(137, "SortID", ColumnType::Binary),
        ColumnDescriptor::new(256, "CallbackData", ColumnType::LongBinary),
        ColumnDescriptor::new(257, "CallbackDependencies", ColumnType::LongBinary),
        ColumnDescriptor::new(258, "SeparateLV", ColumnType::LongBinary),
        ColumnDescriptor::new(259, "SpaceHints", ColumnType::LongBinary),
        ColumnDescriptor::new(260, "SpaceDeferredLVHints", ColumnType::LongBinary),
        ColumnDescriptor::new(261, "LocaleName", ColumnType::LongText)
            .with_codepage(CODEPAGE_UTF16),
    ];
    for c in cols {
        s.push_column(c);
    }
    s
}
