//! page/checksum — XOR-32 checksum страниц и заголовка файла.
//!
//! Режимы (выбираются по ревизии формата и флагам страницы):
//! - старый: stored[0..4] = XOR-32 по [4..ps) с seed 0x89ABCDEF;
//! - новый (ревизия >= 0x0b и флаг NEW_RECORD_FORMAT): stored[0..4] = XOR-32 по [8..ps)
//!   с seed 0x89ABCDEF ^ page_number; [4..8) — ECC, не проверяется;
//! - расширенные страницы (> 8 KiB, ревизия >= 0x11): ECC по кускам, не проверяется.
//!
//! Полностью нулевая страница выделяется отдельным статусом Empty.

use byteorder::{ByteOrder, LittleEndian};

use crate::consts::{PAGE_FLAG_NEW_RECORD_FORMAT, REVISION_NEW_CHECKSUM, XOR_SEED};

use super::common::{PageFormat, OFF_CHECKSUM, OFF_FLAGS};

/// Результат проверки checksum страницы.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumCheck {
    Valid,
    Mismatch { stored: u32, computed: u32 },
    /// Формат страницы не позволяет проверить checksum.
    NotVerified,
    /// Страница целиком из нулей (не инициализирована).
    Empty,
}

/// XOR всех u32 (LE) в `bytes` с начальным значением `seed`. Хвост < 4 байт игнорируется.
#[inline]
pub fn xor32(bytes: &[u8], seed: u32) -> u32 {
    bytes
        .chunks_exact(4)
        .fold(seed, |acc, w| acc ^ LittleEndian::read_u32(w))
}

/// Вычислить XOR-32 для страницы так, как его хранит формат (без ECC).
pub fn page_compute_xor(page: &[u8], page_number: u32, fmt: &PageFormat) -> u32 {
    let flags = LittleEndian::read_u32(&page[OFF_FLAGS..OFF_FLAGS + 4]);
    if uses_new_checksum(flags, fmt) {
        xor32(&page[8..], XOR_SEED ^ page_number)
    } else {
        xor32(&page[4..], XOR_SEED)
    }
}

#[inline]
fn uses_new_checksum(flags: u32, fmt: &PageFormat) -> bool {
    fmt.revision >= REVISION_NEW_CHECKSUM && (flags & PAGE_FLAG_NEW_RECORD_FORMAT) != 0
}

/// Проверить checksum страницы.
pub fn page_verify_checksum(page: &[u8], page_number: u32, fmt: &PageFormat) -> ChecksumCheck {
    if page.len() < fmt.header_len() {
        return ChecksumCheck::Mismatch {
            stored: 0,
            computed: 0,
        };
    }
    if page.iter().all(|&b| b == 0) {
        return ChecksumCheck::Empty;
    }
    if fmt.has_extended_header() {
        return ChecksumCheck::NotVerified;
    }
    let stored = LittleEndian::read_u32(&page[OFF_CHECKSUM..OFF_CHECKSUM + 4]);
    let computed = page_compute_xor(page, page_number, fmt);
    if stored == computed {
        ChecksumCheck::Valid
    } else {
        ChecksumCheck::Mismatch { stored, computed }
    }
}

/// Записать XOR-32 в начало страницы (используется при сборке тестовых образов).
pub fn page_update_checksum(page: &mut [u8], page_number: u32, fmt: &PageFormat) {
    let sum = page_compute_xor(page, page_number, fmt);
    LittleEndian::write_u32(&mut page[OFF_CHECKSUM..OFF_CHECKSUM + 4], sum);
}
