//! Общие константы формата ESE (header, pages, tags, catalog, column types).

// -------- File header --------
pub const FILE_SIGNATURE: u32 = 0x89AB_CDEF;
pub const FORMAT_VERSION: u32 = 0x620;
/// Размер значимой части заголовка (checksum считается по [4..668)).
pub const FILE_HEADER_SIZE: usize = 668;
/// Seed для XOR-32 checksum (заголовок и страницы).
pub const XOR_SEED: u32 = 0x89AB_CDEF;

pub const HDR_OFF_CHECKSUM: usize = 0;
pub const HDR_OFF_SIGNATURE: usize = 4;
pub const HDR_OFF_FORMAT_VERSION: usize = 8;
pub const HDR_OFF_FILE_TYPE: usize = 12;
pub const HDR_OFF_DB_TIME: usize = 16;
/// LOGTIME создания (внутри database signature: [random u32][logtime 8][computer name 16]).
pub const HDR_OFF_CREATION_LOGTIME: usize = 28;
pub const HDR_OFF_DB_STATE: usize = 52;
pub const HDR_OFF_FORMAT_REVISION: usize = 232;
pub const HDR_OFF_PAGE_SIZE: usize = 236;

pub const FILE_TYPE_DATABASE: u32 = 0;

// database_state
pub const DB_STATE_JUST_CREATED: u32 = 1;
pub const DB_STATE_DIRTY_SHUTDOWN: u32 = 2;
pub const DB_STATE_CLEAN_SHUTDOWN: u32 = 3;
pub const DB_STATE_BEING_CONVERTED: u32 = 4;
pub const DB_STATE_FORCE_DETACH: u32 = 5;

/// Поддерживаемые размеры страниц.
pub const SUPPORTED_PAGE_SIZES: [u32; 4] = [4096, 8192, 16384, 32768];

// -------- Format revisions --------
/// Начиная с этой ревизии страницы с флагом NEW_RECORD_FORMAT используют ECC+XOR checksum.
pub const REVISION_NEW_CHECKSUM: u32 = 0x0b;
/// Начиная с этой ревизии страницы > 8 KiB имеют расширенный (80-байтовый) заголовок.
pub const REVISION_EXTENDED_HEADER: u32 = 0x11;

// -------- Pages --------
pub const PAGE_HDR_SIZE: usize = 40;
pub const PAGE_HDR_EXT_SIZE: usize = 80;
/// Размер элемента массива тегов в хвосте страницы.
pub const PAGE_TAG_SIZE: usize = 4;

pub const PAGE_FLAG_ROOT: u32 = 0x0001;
pub const PAGE_FLAG_LEAF: u32 = 0x0002;
pub const PAGE_FLAG_PARENT: u32 = 0x0004;
pub const PAGE_FLAG_EMPTY: u32 = 0x0008;
pub const PAGE_FLAG_SPACE_TREE: u32 = 0x0020;
pub const PAGE_FLAG_INDEX: u32 = 0x0040;
pub const PAGE_FLAG_LONG_VALUE: u32 = 0x0080;
pub const PAGE_FLAG_NEW_RECORD_FORMAT: u32 = 0x2000;

// Флаги тега (биты 13..15 слова offset; на больших страницах — в первом u16 данных)
pub const TAG_FLAG_VERSION: u8 = 0x1;
pub const TAG_FLAG_DEFUNCT: u8 = 0x2;
pub const TAG_FLAG_COMMON_KEY: u8 = 0x4;

// -------- Catalog (MSysObjects) --------
/// Корневая страница каталога — фиксирована форматом.
pub const CATALOG_ROOT_PAGE: u32 = 4;
pub const CATALOG_TABLE_NAME: &str = "MSysObjects";

pub const CATALOG_TYPE_TABLE: i16 = 1;
pub const CATALOG_TYPE_COLUMN: i16 = 2;
pub const CATALOG_TYPE_INDEX: i16 = 3;
pub const CATALOG_TYPE_LONG_VALUE: i16 = 4;
pub const CATALOG_TYPE_CALLBACK: i16 = 5;

// JET_bitColumn*
pub const COLUMN_FLAG_FIXED: u32 = 0x0000_0001;
pub const COLUMN_FLAG_TAGGED: u32 = 0x0000_0002;
pub const COLUMN_FLAG_NOT_NULL: u32 = 0x0000_0004;
pub const COLUMN_FLAG_MULTI_VALUED: u32 = 0x0000_0400;

// Диапазоны идентификаторов колонок
pub const FIXED_COLUMN_MAX: u32 = 127;
pub const VARIABLE_COLUMN_FIRST: u32 = 128;
pub const VARIABLE_COLUMN_MAX: u32 = 255;
pub const TAGGED_COLUMN_FIRST: u32 = 256;

// -------- Column types (JET_coltyp) --------
pub const COLTYP_NIL: u32 = 0;
pub const COLTYP_BIT: u32 = 1;
pub const COLTYP_UNSIGNED_BYTE: u32 = 2;
pub const COLTYP_SHORT: u32 = 3;
pub const COLTYP_LONG: u32 = 4;
pub const COLTYP_CURRENCY: u32 = 5;
pub const COLTYP_IEEE_SINGLE: u32 = 6;
pub const COLTYP_IEEE_DOUBLE: u32 = 7;
pub const COLTYP_DATETIME: u32 = 8;
pub const COLTYP_BINARY: u32 = 9;
pub const COLTYP_TEXT: u32 = 10;
pub const COLTYP_LONG_BINARY: u32 = 11;
pub const COLTYP_LONG_TEXT: u32 = 12;
pub const COLTYP_SLV: u32 = 13;
pub const COLTYP_UNSIGNED_LONG: u32 = 14;
pub const COLTYP_LONG_LONG: u32 = 15;
pub const COLTYP_GUID: u32 = 16;
pub const COLTYP_UNSIGNED_SHORT: u32 = 17;

// -------- Codepages --------
pub const CODEPAGE_UTF16: u32 = 1200;
pub const CODEPAGE_WESTERN: u32 = 1252;
pub const CODEPAGE_ASCII: u32 = 20127;

// -------- Records --------
/// [last_fixed u8][last_variable u8][variable_offset u16]
pub const RECORD_HDR_SIZE: usize = 4;
/// Бит NULL в таблице смещений variable-колонок.
pub const VAR_OFFSET_NULL: u16 = 0x8000;
pub const VAR_OFFSET_MASK: u16 = 0x7FFF;

/// Маска смещения tagged-колонки (страницы <= 8 KiB).
pub const TAGGED_OFFSET_MASK: u16 = 0x3FFF;
/// Маска смещения tagged-колонки (большие страницы).
pub const TAGGED_OFFSET_MASK_LARGE: u16 = 0x7FFF;
/// Значение tagged-колонки начинается с байта флагов.
pub const TAGGED_HAS_FLAGS: u16 = 0x4000;

// Флаги значения tagged-колонки
pub const VALUE_FLAG_VARIABLE_SIZE: u8 = 0x01;
pub const VALUE_FLAG_COMPRESSED: u8 = 0x02;
pub const VALUE_FLAG_LONG_VALUE: u8 = 0x04;
pub const VALUE_FLAG_MULTI_VALUE: u8 = 0x08;
pub const VALUE_FLAG_MULTI_VALUE_SIZED: u8 = 0x10;

// -------- Compression (первый байт сжатых данных >> 3) --------
pub const COMPRESSION_7BIT_ASCII: u8 = 1;
pub const COMPRESSION_7BIT_UNICODE: u8 = 2;
pub const COMPRESSION_XPRESS: u8 = 3;

// -------- Long values --------
/// Ключ заголовка LV: LID (u32 BE).
pub const LV_KEY_HEADER_LEN: usize = 4;
/// Ключ сегмента LV: LID (u32 BE) + offset (u32 BE).
pub const LV_KEY_SEGMENT_LEN: usize = 8;
/// Данные заголовка LV: [refcount u32][size u32].
pub const LV_HEADER_DATA_LEN: usize = 8;
