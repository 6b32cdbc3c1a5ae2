// src/header.rs — заголовок файла ESE (страница 0 файла и её тень на странице 1)
//
// Значимые поля (LE):
// [0]   u32 checksum        XOR-32 по [4..668), seed 0x89ABCDEF
// [4]   u32 signature       0x89ABCDEF
// [8]   u32 format_version  0x620
// [12]  u32 file_type       0 = database
// [16]  u64 db_time
// [28]  LOGTIME creation    [sec][min][hour][day][month][year-1900][fill u16]
// [52]  u32 database_state  1 created, 2 dirty, 3 clean, 4 converting, 5 force detach
// [232] u32 format_revision
// [236] u32 page_size
//
// Политика:
// - Неподдерживаемые версия/размер страницы — немедленная ошибка (CorruptPageError).
// - Битый основной заголовок → пробуем тень (warn), если разрешено конфигом.

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use serde::Serialize;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use crate::consts::{
    DB_STATE_BEING_CONVERTED, DB_STATE_CLEAN_SHUTDOWN, DB_STATE_DIRTY_SHUTDOWN,
    DB_STATE_FORCE_DETACH, DB_STATE_JUST_CREATED, FILE_HEADER_SIZE, FILE_SIGNATURE,
    FILE_TYPE_DATABASE, FORMAT_VERSION, HDR_OFF_CHECKSUM, HDR_OFF_CREATION_LOGTIME,
    HDR_OFF_DB_STATE, HDR_OFF_DB_TIME, HDR_OFF_FILE_TYPE, HDR_OFF_FORMAT_REVISION,
    HDR_OFF_FORMAT_VERSION, HDR_OFF_PAGE_SIZE, HDR_OFF_SIGNATURE, SUPPORTED_PAGE_SIZES, XOR_SEED,
};
use crate::error::EseError;
use crate::page::{xor32, PageFormat};

/// Какая копия заголовка использована.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderSource {
    Primary,
    Shadow,
}

/// JET LOGTIME (время создания БД).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for LogTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Заголовок файла БД.
#[derive(Debug, Clone, Serialize)]
pub struct FileHeader {
    pub checksum: u32,
    pub signature: u32,
    pub format_version: u32,
    pub file_type: u32,
    pub db_time: u64,
    pub creation_time: Option<LogTime>,
    pub database_state: u32,
    pub format_revision: u32,
    pub page_size: u32,
    pub source: HeaderSource,
}

impl FileHeader {
    #[inline]
    pub fn page_format(&self) -> PageFormat {
        PageFormat::new(self.page_size, self.format_revision)
    }

    pub fn state_str(&self) -> &'static str {
        match self.database_state {
            DB_STATE_JUST_CREATED => "just_created",
            DB_STATE_DIRTY_SHUTDOWN => "dirty_shutdown",
            DB_STATE_CLEAN_SHUTDOWN => "clean_shutdown",
            DB_STATE_BEING_CONVERTED => "being_converted",
            DB_STATE_FORCE_DETACH => "force_detach",
            _ => "unknown",
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.database_state == DB_STATE_DIRTY_SHUTDOWN
    }
}

/// Проверка размера страницы из заголовка.
pub fn validate_page_size(page_size: u32) -> Result<()> {
    if !SUPPORTED_PAGE_SIZES.contains(&page_size) {
        return Err(EseError::corrupt_page(
            None,
            format!(
                "unsupported page size {} (supported: {:?})",
                page_size, SUPPORTED_PAGE_SIZES
            ),
        ));
    }
    Ok(())
}

fn parse_logtime(b: &[u8]) -> Option<LogTime> {
    let (second, minute, hour, day, month, year) = (b[0], b[1], b[2], b[3], b[4], b[5]);
    if month == 0 || month > 12 || day == 0 || day > 31 || hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    Some(LogTime {
        year: 1900 + year as u16,
        month,
        day,
        hour,
        minute,
        second,
    })
}

/// Разобрать и провалидировать копию заголовка (буфер >= 668 байт).
pub fn parse_file_header(buf: &[u8], source: HeaderSource) -> Result<FileHeader> {
    if buf.len() < FILE_HEADER_SIZE {
        return Err(EseError::corrupt_page(
            None,
            format!("file header truncated ({} bytes)", buf.len()),
        ));
    }

    let signature = LittleEndian::read_u32(&buf[HDR_OFF_SIGNATURE..HDR_OFF_SIGNATURE + 4]);
    if signature != FILE_SIGNATURE {
        return Err(EseError::corrupt_page(
            None,
            format!("bad file signature 0x{:08X}", signature),
        ));
    }

    let checksum = LittleEndian::read_u32(&buf[HDR_OFF_CHECKSUM..HDR_OFF_CHECKSUM + 4]);
    let computed = xor32(&buf[4..FILE_HEADER_SIZE], XOR_SEED);
    if checksum != computed {
        return Err(EseError::corrupt_page(
            None,
            format!(
                "file header checksum mismatch (stored=0x{:08X}, computed=0x{:08X})",
                checksum, computed
            ),
        ));
    }

    let format_version =
        LittleEndian::read_u32(&buf[HDR_OFF_FORMAT_VERSION..HDR_OFF_FORMAT_VERSION + 4]);
    if format_version != FORMAT_VERSION {
        return Err(EseError::corrupt_page(
            None,
            format!("unsupported format version 0x{:X}", format_version),
        ));
    }

    let file_type = LittleEndian::read_u32(&buf[HDR_OFF_FILE_TYPE..HDR_OFF_FILE_TYPE + 4]);
    if file_type != FILE_TYPE_DATABASE {
        return Err(EseError::corrupt_page(
            None,
            format!("not a database file (file_type={})", file_type),
        ));
    }

    let page_size = LittleEndian::read_u32(&buf[HDR_OFF_PAGE_SIZE..HDR_OFF_PAGE_SIZE + 4]);
    validate_page_size(page_size)?;

    Ok(FileHeader {
        checksum,
        signature,
        format_version,
        file_type,
        db_time: LittleEndian::read_u64(&buf[HDR_OFF_DB_TIME..HDR_OFF_DB_TIME + 8]),
        creation_time: parse_logtime(&buf[HDR_OFF_CREATION_LOGTIME..HDR_OFF_CREATION_LOGTIME + 8]),
        database_state: LittleEndian::read_u32(&buf[HDR_OFF_DB_STATE..HDR_OFF_DB_STATE + 4]),
        format_revision: LittleEndian::read_u32(
            &buf[HDR_OFF_FORMAT_REVISION..HDR_OFF_FORMAT_REVISION + 4],
        ),
        page_size,
        source,
    })
}

fn read_header_copy<R: Read + Seek>(r: &mut R, off: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; FILE_HEADER_SIZE];
    r.seek(SeekFrom::Start(off))?;
    r.read_exact(&mut buf).map_err(|e| {
        EseError::corrupt_page(None, format!("file header read at {} failed: {}", off, e))
    })?;
    Ok(buf)
}

/// Прочитать заголовок файла: основная копия, затем (опционально) теневая.
pub fn read_file_header<R: Read + Seek>(r: &mut R, allow_shadow: bool) -> Result<FileHeader> {
    let primary_buf = read_header_copy(r, 0)?;
    let primary_err = match parse_file_header(&primary_buf, HeaderSource::Primary) {
        Ok(h) => return Ok(h),
        Err(e) => e,
    };
    if !allow_shadow {
        return Err(primary_err);
    }

    // Тень лежит на следующей странице файла; размер страницы берём из основной копии,
    // а если он битый — перебираем поддерживаемые.
    let declared = LittleEndian::read_u32(&primary_buf[HDR_OFF_PAGE_SIZE..HDR_OFF_PAGE_SIZE + 4]);
    let mut candidates: Vec<u32> = Vec::new();
    if SUPPORTED_PAGE_SIZES.contains(&declared) {
        candidates.push(declared);
    }
    candidates.extend(SUPPORTED_PAGE_SIZES.iter().filter(|&&s| s != declared));

    for ps in candidates {
        let buf = match read_header_copy(r, ps as u64) {
            Ok(b) => b,
            Err(_) => continue,
        };
        if let Ok(h) = parse_file_header(&buf, HeaderSource::Shadow) {
            if h.page_size == ps {
                warn!(
                    "primary file header invalid ({:#}); using shadow header copy",
                    primary_err
                );
                return Ok(h);
            }
        }
    }
    Err(primary_err)
}

/// Записать заголовок в буфер (>= 668 байт) с пересчётом checksum.
pub fn write_file_header(buf: &mut [u8], h: &FileHeader) {
    LittleEndian::write_u32(&mut buf[HDR_OFF_SIGNATURE..HDR_OFF_SIGNATURE + 4], h.signature);
    LittleEndian::write_u32(
        &mut buf[HDR_OFF_FORMAT_VERSION..HDR_OFF_FORMAT_VERSION + 4],
        h.format_version,
    );
    LittleEndian::write_u32(&mut buf[HDR_OFF_FILE_TYPE..HDR_OFF_FILE_TYPE + 4], h.file_type);
    LittleEndian::write_u64(&mut buf[HDR_OFF_DB_TIME..HDR_OFF_DB_TIME + 8], h.db_time);
    if let Some(t) = h.creation_time {
        let lt = &mut buf[HDR_OFF_CREATION_LOGTIME..HDR_OFF_CREATION_LOGTIME + 8];
        lt[0] = t.second;
        lt[1] = t.minute;
        lt[2] = t.hour;
        lt[3] = t.day;
        lt[4] = t.month;
        lt[5] = (t.year.saturating_sub(1900)) as u8;
    }
    LittleEndian::write_u32(&mut buf[HDR_OFF_DB_STATE..HDR_OFF_DB_STATE + 4], h.database_state);
    LittleEndian::write_u32(
        &mut buf[HDR_OFF_FORMAT_REVISION..HDR_OFF_FORMAT_REVISION + 4],
        h.format_revision,
    );
    LittleEndian::write_u32(&mut buf[HDR_OFF_PAGE_SIZE..HDR_OFF_PAGE_SIZE + 4], h.page_size);
    let sum = xor32(&buf[4..FILE_HEADER_SIZE], XOR_SEED);
    LittleEndian::write_u32(&mut buf[HDR_OFF_CHECKSUM..HDR_OFF_CHECKSUM + 4], sum);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample(page_size: u32) -> FileHeader {
        FileHeader {
            checksum: 0,
            signature: FILE_SIGNATURE,
            format_version: FORMAT_VERSION,
            file_type: FILE_TYPE_DATABASE,
            db_time: 42,
            creation_time: Some(LogTime {
                year: 2023,
                month: 4,
                day: 9,
                hour: 10,
                minute: 11,
                second: 12,
            }),
            database_state: DB_STATE_CLEAN_SHUTDOWN,
            format_revision: 0x14,
            page_size,
            source: HeaderSource::Primary,
        }
    }

    fn image(ps: u32) -> Vec<u8> {
        let mut img = vec![0u8; ps as usize * 2];
        let h = sample(ps);
        write_file_header(&mut img[..ps as usize], &h);
        write_file_header(&mut img[ps as usize..], &h);
        img
    }

    #[test]
    fn header_parses_and_reports_state() -> Result<()> {
        let img = image(8192);
        let h = read_file_header(&mut Cursor::new(img), true)?;
        assert_eq!(h.page_size, 8192);
        assert_eq!(h.format_revision, 0x14);
        assert_eq!(h.state_str(), "clean_shutdown");
        assert_eq!(h.source, HeaderSource::Primary);
        assert_eq!(
            h.creation_time.map(|t| t.to_string()).as_deref(),
            Some("2023-04-09 10:11:12")
        );
        Ok(())
    }

    #[test]
    fn shadow_used_when_primary_broken() -> Result<()> {
        let mut img = image(4096);
        img[300] ^= 0xFF; // ломаем checksum основной копии
        let h = read_file_header(&mut Cursor::new(img.clone()), true)?;
        assert_eq!(h.source, HeaderSource::Shadow);

        let err = read_file_header(&mut Cursor::new(img), false).unwrap_err();
        assert_eq!(crate::error::error_kind(&err), "CorruptPageError");
        Ok(())
    }

    #[test]
    fn unsupported_page_size_is_fatal() {
        let mut buf = vec![0u8; 4096];
        write_file_header(&mut buf, &sample(2048));
        let err = parse_file_header(&buf, HeaderSource::Primary).unwrap_err();
        assert!(format!("{:#}", err).contains("unsupported page size"));
    }
}
