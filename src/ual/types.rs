//! ual/types — доменные записи UAL и итоговый отчёт.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::record::Guid;
use crate::util::format_filetime;

/// Имя роли, если RoleGuid не найден в ROLE_IDS ни одного из входных файлов.
pub const UNRESOLVED_ROLE: &str = "UNRESOLVED";

/// Имя клиента, если не удалось определить ни имя, ни адрес.
pub const UNKNOWN_CLIENT: &str = "-";

/// Момент времени в формате FILETIME (100 нс с 1601-01-01 UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match format_filetime(self.0) {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Сведения о хосте (SYSTEM_IDENTITY).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemIdentity {
    pub host_name: Option<String>,
    pub domain_name: Option<String>,
    pub os_major: Option<i64>,
    pub os_minor: Option<i64>,
    pub os_build: Option<i64>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    pub serial_number: Option<String>,
    pub creation_time: Option<Timestamp>,
    pub last_boot_time: Option<Timestamp>,
}

impl SystemIdentity {
    /// "major.minor", если известны обе части.
    pub fn os_version(&self) -> Option<String> {
        match (self.os_major, self.os_minor) {
            (Some(a), Some(b)) => Some(format!("{}.{}", a, b)),
            (Some(a), None) => Some(a.to_string()),
            _ => None,
        }
    }
}

/// Роль сервера (ROLE_IDS, дополненная ROLE_ACCESS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleIdentity {
    pub role_guid: Guid,
    pub role_name: String,
    pub product_name: Option<String>,
    pub first_seen: Option<Timestamp>,
    pub last_seen: Option<Timestamp>,
}

/// Агрегированное использование роли клиентом (строка CLIENTS после дедупликации).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleUsageEvent {
    pub role_guid: Guid,
    pub role_name: String,
    pub client_name: String,
    pub authenticated_username: Option<String>,
    pub address: Option<String>,
    pub tenant_id: Option<Guid>,
    pub first_seen: Option<Timestamp>,
    pub last_seen: Option<Timestamp>,
    pub total_accesses: u64,
}

/// Обращения клиента к роли за один день (колонки DayN).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientAccessEvent {
    pub role_guid: Guid,
    pub role_name: String,
    pub client_name: String,
    pub authenticated_username: Option<String>,
    /// "YYYY-MM-DD"
    pub date: String,
    pub day_of_year: u32,
    pub accesses: u64,
}

/// Запись отчёта.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum DomainRecord {
    System(SystemIdentity),
    Role(RoleIdentity),
    Usage(RoleUsageEvent),
    Access(ClientAccessEvent),
}

impl DomainRecord {
    /// Метка вида записи (первое поле текстовой строки).
    pub fn label(&self) -> &'static str {
        match self {
            DomainRecord::System(_) => "SYSTEM",
            DomainRecord::Role(_) => "ROLE",
            DomainRecord::Usage(_) => "USAGE",
            DomainRecord::Access(_) => "ACCESS",
        }
    }

    /// Ключ детерминированной сортировки:
    /// вид, имя роли, имя клиента, пользователь, дата/guid.
    pub fn sort_key(&self) -> (u8, String, String, String, String) {
        let user = |u: &Option<String>| u.clone().unwrap_or_default();
        match self {
            DomainRecord::System(s) => (
                0,
                s.host_name.clone().unwrap_or_default(),
                s.domain_name.clone().unwrap_or_default(),
                s.serial_number.clone().unwrap_or_default(),
                s.creation_time.map(|t| t.to_string()).unwrap_or_default(),
            ),
            DomainRecord::Role(r) => (
                1,
                r.role_name.clone(),
                String::new(),
                String::new(),
                r.role_guid.to_string(),
            ),
            DomainRecord::Usage(u) => (
                2,
                u.role_name.clone(),
                u.client_name.clone(),
                user(&u.authenticated_username),
                u.role_guid.to_string(),
            ),
            DomainRecord::Access(a) => (
                3,
                a.role_name.clone(),
                a.client_name.clone(),
                user(&a.authenticated_username),
                format!("{} {}", a.date, a.role_guid),
            ),
        }
    }
}

/// Итоги разбора.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub sources: usize,
    pub tables_scanned: u64,
    pub rows_decoded: u64,
    pub skipped_rows: u64,
    pub unreadable_tables: Vec<String>,
}

impl ParseSummary {
    /// Нужна ли строка summary в выводе (что-то было пропущено).
    #[inline]
    pub fn has_losses(&self) -> bool {
        self.skipped_rows > 0 || !self.unreadable_tables.is_empty()
    }
}

/// Результат разбора одного или нескольких файлов UAL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UalReport {
    pub records: Vec<DomainRecord>,
    pub summary: ParseSummary,
}

impl UalReport {
    pub fn usage_events(&self) -> impl Iterator<Item = &RoleUsageEvent> {
        self.records.iter().filter_map(|r| match r {
            DomainRecord::Usage(u) => Some(u),
            _ => None,
        })
    }

    pub fn access_events(&self) -> impl Iterator<Item = &ClientAccessEvent> {
        self.records.iter().filter_map(|r| match r {
            DomainRecord::Access(a) => Some(a),
            _ => None,
        })
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleIdentity> {
        self.records.iter().filter_map(|r| match r {
            DomainRecord::Role(x) => Some(x),
            _ => None,
        })
    }

    pub fn systems(&self) -> impl Iterator<Item = &SystemIdentity> {
        self.records.iter().filter_map(|r| match r {
            DomainRecord::System(x) => Some(x),
            _ => None,
        })
    }
}
