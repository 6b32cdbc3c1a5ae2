//! ual/mapper — построение отчёта UAL из таблиц одного или нескольких файлов.
//!
//! Таблицы (имена сравниваются сначала точно, затем без учёта регистра):
//! - ROLE_IDS                       RoleGuid, ProductName, RoleName
//! - ROLE_ACCESS                    RoleGuid, FirstSeen, LastSeen
//! - CLIENTS | CLIENTS_ROLE_ACCESS  RoleGuid, TenantId, TotalAccesses, InsertDate, LastAccess,
//!                                  Address, AuthenticatedUserName, ClientName, Day1..Day366
//! - DNS                            LastSeen, Address, HostName
//! - SYSTEM_IDENTITY | SystemIdentity
//!
//! Все таблицы необязательны: отсутствующая таблица просто не даёт записей (debug).
//! TraversalError при скане таблицы → таблица в summary.unreadable_tables, разбор продолжается.
//! CorruptPageError/SchemaError — фатальны и поднимаются наверх.
//!
//! Дедупликация CLIENTS по (role_guid, client_name, authenticated_username):
//! побеждает более поздний last_seen, при равенстве — больший total_accesses,
//! при полном равенстве — встреченная первой (порядок файлов, затем порядок ключей).

use anyhow::Result;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

use crate::db::EseDb;
use crate::error::is_traversal_error;
use crate::record::{DecodedRecord, Guid, Value};
use crate::util::{day_of_year, filetime_year, format_address};

use super::types::{
    ClientAccessEvent, DomainRecord, ParseSummary, RoleIdentity, RoleUsageEvent, SystemIdentity,
    Timestamp, UalReport, UNKNOWN_CLIENT, UNRESOLVED_ROLE,
};

pub const TABLE_ROLE_IDS: &[&str] = &["ROLE_IDS"];
pub const TABLE_ROLE_ACCESS: &[&str] = &["ROLE_ACCESS"];
pub const TABLE_CLIENTS: &[&str] = &["CLIENTS", "CLIENTS_ROLE_ACCESS"];
pub const TABLE_DNS: &[&str] = &["DNS"];
pub const TABLE_SYSTEM_IDENTITY: &[&str] = &["SYSTEM_IDENTITY", "SystemIdentity"];

const MAX_DAY_COLUMN: u32 = 366;

/// Строка CLIENTS до дедупликации.
#[derive(Debug, Clone)]
struct ClientRow {
    role_guid: Guid,
    tenant_id: Option<Guid>,
    total_accesses: u64,
    first_seen: Option<Timestamp>,
    last_seen: Option<Timestamp>,
    address: Option<String>,
    username: Option<String>,
    client_name: Option<String>,
    days: Vec<(u32, u64)>,
}

#[derive(Default)]
struct Collected {
    roles: BTreeMap<Guid, RoleIdentity>,
    role_access: Vec<(Guid, Option<Timestamp>, Option<Timestamp>)>,
    dns: HashMap<String, (Option<Timestamp>, String)>,
    systems: Vec<SystemIdentity>,
    clients: Vec<ClientRow>,
}

/// Построить отчёт по всем источникам (порядок источников значим для равных дублей).
pub fn build_ual_report(sources: &[&EseDb]) -> Result<UalReport> {
    let mut summary = ParseSummary {
        sources: sources.len(),
        ..Default::default()
    };
    let mut c = Collected::default();
    let multi = sources.len() > 1;

    for db in sources {
        if let Some(rows) = scan_known(db, TABLE_ROLE_IDS, multi, &mut summary)? {
            for rec in &rows {
                collect_role(rec, &mut c, &mut summary);
            }
        }
        if let Some(rows) = scan_known(db, TABLE_ROLE_ACCESS, multi, &mut summary)? {
            for rec in &rows {
                match rec.get_guid("RoleGuid") {
                    Some(g) => c.role_access.push((g, ts(rec, "FirstSeen"), ts(rec, "LastSeen"))),
                    None => skip_row(rec, "RoleGuid", &mut summary),
                }
            }
        }
        if let Some(rows) = scan_known(db, TABLE_DNS, multi, &mut summary)? {
            for rec in &rows {
                collect_dns(rec, &mut c);
            }
        }
        if let Some(rows) = scan_known(db, TABLE_SYSTEM_IDENTITY, multi, &mut summary)? {
            for rec in &rows {
                let s = system_identity(rec);
                if !c.systems.contains(&s) {
                    c.systems.push(s);
                }
            }
        }
        if let Some(rows) = scan_known(db, TABLE_CLIENTS, multi, &mut summary)? {
            for rec in &rows {
                match client_row(rec) {
                    Some(r) => c.clients.push(r),
                    None => skip_row(rec, "RoleGuid", &mut summary),
                }
            }
        }
    }

    for (guid, first, last) in std::mem::take(&mut c.role_access) {
        if let Some(role) = c.roles.get_mut(&guid) {
            role.first_seen = min_opt(role.first_seen, first);
            role.last_seen = max_opt(role.last_seen, last);
        }
    }

    let mut records: Vec<DomainRecord> = Vec::new();
    records.extend(c.systems.iter().cloned().map(DomainRecord::System));
    records.extend(c.roles.values().cloned().map(DomainRecord::Role));

    for row in dedup_clients(&c) {
        let role_name = c
            .roles
            .get(&row.role_guid)
            .map(|r| r.role_name.clone())
            .unwrap_or_else(|| UNRESOLVED_ROLE.to_string());
        let client_name = resolve_client_name(row, &c.dns);

        for (day, n) in day_events(row) {
            records.push(DomainRecord::Access(ClientAccessEvent {
                role_guid: row.role_guid,
                role_name: role_name.clone(),
                client_name: client_name.clone(),
                authenticated_username: row.username.clone(),
                date: day.1,
                day_of_year: day.0,
                accesses: n,
            }));
        }
        records.push(DomainRecord::Usage(RoleUsageEvent {
            role_guid: row.role_guid,
            role_name,
            client_name,
            authenticated_username: row.username.clone(),
            address: row.address.clone(),
            tenant_id: row.tenant_id,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
            total_accesses: row.total_accesses,
        }));
    }

    records.sort_by_cached_key(DomainRecord::sort_key);
    summary.unreadable_tables.sort();
    summary.unreadable_tables.dedup();
    debug!(
        "ual report: {} record(s), {} row(s) decoded, {} skipped",
        records.len(),
        summary.rows_decoded,
        summary.skipped_rows
    );
    Ok(UalReport { records, summary })
}

/// Полный скан первой найденной таблицы из списка имён.
/// Ok(None): таблицы нет либо она нечитаема (отмечено в summary).
fn scan_known(
    db: &EseDb,
    names: &[&str],
    multi: bool,
    summary: &mut ParseSummary,
) -> Result<Option<Vec<DecodedRecord>>> {
    let Some(schema) = names.iter().find_map(|n| db.catalog().table(n)) else {
        debug!("{}: no table {}", db.path.display(), names.join("|"));
        return Ok(None);
    };
    summary.tables_scanned += 1;

    let mut rows = db.scan_schema(schema);
    let mut out = Vec::new();
    let mut failed = None;
    for r in rows.by_ref() {
        match r {
            Ok(rec) => out.push(rec),
            Err(e) if is_traversal_error(&e) => {
                failed = Some(e);
                break;
            }
            Err(e) => return Err(e),
        }
    }
    summary.rows_decoded += rows.rows_decoded();
    summary.skipped_rows += rows.skipped_rows();

    if let Some(e) = failed {
        let label = if multi {
            format!("{}:{}", db.path.display(), schema.name)
        } else {
            schema.name.clone()
        };
        warn!("table {} unreadable: {}", label, e);
        summary.unreadable_tables.push(label);
        return Ok(None);
    }
    Ok(Some(out))
}

fn skip_row(rec: &DecodedRecord, column: &str, summary: &mut ParseSummary) {
    warn!("{}: row without {} skipped", rec.table, column);
    summary.skipped_rows += 1;
}

fn ts(rec: &DecodedRecord, name: &str) -> Option<Timestamp> {
    rec.get_filetime(name).filter(|&v| v != 0).map(Timestamp)
}

fn text(rec: &DecodedRecord, name: &str) -> Option<String> {
    rec.get_str(name)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn address(rec: &DecodedRecord) -> Option<String> {
    match rec.get("Address")? {
        Value::Binary(b) if !b.is_empty() => Some(format_address(b)),
        Value::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn min_opt(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

fn max_opt(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
    a.max(b)
}

fn collect_role(rec: &DecodedRecord, c: &mut Collected, summary: &mut ParseSummary) {
    let Some(guid) = rec.get_guid("RoleGuid") else {
        skip_row(rec, "RoleGuid", summary);
        return;
    };
    let name = text(rec, "RoleName");
    let product = text(rec, "ProductName");
    match c.roles.get_mut(&guid) {
        Some(existing) => {
            if existing.role_name == UNRESOLVED_ROLE {
                if let Some(name) = name {
                    existing.role_name = name;
                }
            }
            if existing.product_name.is_none() {
                existing.product_name = product;
            }
        }
        None => {
            c.roles.insert(
                guid,
                RoleIdentity {
                    role_guid: guid,
                    role_name: name.unwrap_or_else(|| UNRESOLVED_ROLE.to_string()),
                    product_name: product,
                    first_seen: None,
                    last_seen: None,
                },
            );
        }
    }
}

fn collect_dns(rec: &DecodedRecord, c: &mut Collected) {
    let (Some(addr), Some(host)) = (address(rec), text(rec, "HostName")) else {
        return;
    };
    let seen = ts(rec, "LastSeen");
    match c.dns.get(&addr) {
        Some((prev, _)) if *prev >= seen => {}
        _ => {
            c.dns.insert(addr, (seen, host));
        }
    }
}

fn system_identity(rec: &DecodedRecord) -> SystemIdentity {
    SystemIdentity {
        host_name: text(rec, "SystemDNSHostName"),
        domain_name: text(rec, "SystemDomainName"),
        os_major: rec.get_i64("OSMajor"),
        os_minor: rec.get_i64("OSMinor"),
        os_build: rec.get_i64("OSBuildNumber"),
        manufacturer: text(rec, "SystemManufacturer"),
        product_name: text(rec, "SystemProductName"),
        serial_number: text(rec, "SystemSerialNumber"),
        creation_time: ts(rec, "CreationTime"),
        last_boot_time: ts(rec, "OSLastBootUpTime"),
    }
}

fn client_row(rec: &DecodedRecord) -> Option<ClientRow> {
    let role_guid = rec.get_guid("RoleGuid")?;
    let days = rec
        .fields
        .iter()
        .filter_map(|f| {
            let n = f.name.strip_prefix("Day")?.parse::<u32>().ok()?;
            let v = f.field.value()?.as_i64()?;
            ((1..=MAX_DAY_COLUMN).contains(&n) && v > 0).then_some((n, v as u64))
        })
        .collect();
    Some(ClientRow {
        role_guid,
        tenant_id: rec.get_guid("TenantId"),
        total_accesses: rec.get_i64("TotalAccesses").unwrap_or(0).max(0) as u64,
        first_seen: ts(rec, "InsertDate"),
        last_seen: ts(rec, "LastAccess"),
        address: address(rec),
        username: text(rec, "AuthenticatedUserName"),
        client_name: text(rec, "ClientName"),
        days,
    })
}

/// ClientName, иначе имя хоста из DNS по адресу, иначе адрес, иначе "-".
fn resolve_client_name(row: &ClientRow, dns: &HashMap<String, (Option<Timestamp>, String)>) -> String {
    if let Some(n) = &row.client_name {
        return n.clone();
    }
    match &row.address {
        Some(a) => dns
            .get(a)
            .map(|(_, h)| h.clone())
            .unwrap_or_else(|| a.clone()),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

fn dedup_clients(c: &Collected) -> Vec<&ClientRow> {
    let mut winners: Vec<&ClientRow> = Vec::new();
    let mut index: HashMap<(Guid, String, Option<String>), usize> = HashMap::new();
    for row in &c.clients {
        let key = (
            row.role_guid,
            resolve_client_name(row, &c.dns),
            row.username.clone(),
        );
        match index.get(&key) {
            Some(&i) => {
                if wins_over(row, winners[i]) {
                    winners[i] = row;
                }
            }
            None => {
                index.insert(key, winners.len());
                winners.push(row);
            }
        }
    }
    winners
}

/// Более поздний last_seen; при равенстве — больший total_accesses.
fn wins_over(cand: &ClientRow, cur: &ClientRow) -> bool {
    (cand.last_seen, cand.total_accesses) > (cur.last_seen, cur.total_accesses)
}

/// ((день года, "YYYY-MM-DD"), обращений) для DayN колонок; год — год first_seen
/// (или last_seen). Дни за пределами года пропускаются.
fn day_events(row: &ClientRow) -> Vec<((u32, String), u64)> {
    let Some(anchor) = row.first_seen.or(row.last_seen) else {
        if !row.days.is_empty() {
            debug!("client row without timestamps: day counters ignored");
        }
        return Vec::new();
    };
    let Some(year) = filetime_year(anchor.0) else {
        return Vec::new();
    };
    row.days
        .iter()
        .filter_map(|&(n, v)| {
            let date = day_of_year(year, n)?;
            Some(((n, date.format("%Y-%m-%d").to_string()), v))
        })
        .collect()
}
