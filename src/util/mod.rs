//! util — общие утилиты.
//!
//! Содержит:
//! - to_hex(): hex-представление байтов.
//! - FILETIME <-> chrono::DateTime<Utc>, даты DayN (NaiveDate::from_yo_opt).
//! - format_address(): IPv4/IPv6 из бинарного значения колонки Address.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Секунд между 1601-01-01 и 1970-01-01.
pub const FILETIME_UNIX_EPOCH_DIFF_SECS: i64 = 11_644_473_600;

/// Тиков FILETIME (100 нс) в секунде.
pub const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

#[inline]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// FILETIME → UTC. Ноль означает «нет значения».
pub fn filetime_to_datetime(ft: u64) -> Option<DateTime<Utc>> {
    if ft == 0 {
        return None;
    }
    let secs = (ft / FILETIME_TICKS_PER_SEC) as i64 - FILETIME_UNIX_EPOCH_DIFF_SECS;
    let nanos = (ft % FILETIME_TICKS_PER_SEC) as u32 * 100;
    DateTime::from_timestamp(secs, nanos)
}

/// UTC → FILETIME; None для моментов до 1601 года.
pub fn datetime_to_filetime(dt: DateTime<Utc>) -> Option<u64> {
    let secs = u64::try_from(dt.timestamp() + FILETIME_UNIX_EPOCH_DIFF_SECS).ok()?;
    Some(secs * FILETIME_TICKS_PER_SEC + (dt.timestamp_subsec_nanos() / 100) as u64)
}

/// FILETIME → "YYYY-MM-DD HH:MM:SS" (UTC); None для нуля.
pub fn format_filetime(ft: u64) -> Option<String> {
    filetime_to_datetime(ft).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Год (UTC) момента FILETIME.
pub fn filetime_year(ft: u64) -> Option<i32> {
    filetime_to_datetime(ft).map(|dt| dt.year())
}

/// N-й день года (N с единицы); None за пределами года.
#[inline]
pub fn day_of_year(year: i32, n: u32) -> Option<NaiveDate> {
    NaiveDate::from_yo_opt(year, n)
}

/// Бинарный адрес клиента → текст. 4 байта — IPv4, 16 — IPv6, иначе hex.
pub fn format_address(bytes: &[u8]) -> String {
    match bytes.len() {
        4 => Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]).to_string(),
        16 => {
            let mut a = [0u8; 16];
            a.copy_from_slice(bytes);
            Ipv6Addr::from(a).to_string()
        }
        _ => to_hex(bytes),
    }
}
