//! record — декодирование записей таблиц ESE.
//! - value.rs    — Value / Field / DecodedRecord / Guid
//! - decode.rs   — decode_record: fixed, variable, tagged (LV, multi-value, сжатие)
//! - compress.rs — 7-bit распаковка
//! - build.rs    — RecordBuilder для синтетических записей

pub mod build;
pub mod compress;
pub mod decode;
pub mod value;

pub use build::RecordBuilder;
pub use decode::{decode_record, decode_text, decode_value, DecodeContext};
pub use value::{DecodedRecord, Field, Guid, RecordField, Value};
