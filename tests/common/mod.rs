//! Сборка синтетических образов ESE для интеграционных тестов.
//!
//! Образ: заголовок + тень, страницы 1..=N. Каталог — дерево с корнем на странице 4,
//! строки MSysObjects собираются RecordBuilder'ом по встроенной схеме каталога.
//! Деревья таблиц раскладываются по листьям автоматически; если не влезают в одну
//! страницу — корень становится branch, листья связываются через next_page.
#![allow(dead_code)]

use anyhow::Result;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use UalScope::consts::{
    CATALOG_ROOT_PAGE, CATALOG_TYPE_COLUMN, CATALOG_TYPE_LONG_VALUE, CATALOG_TYPE_TABLE,
    CODEPAGE_UTF16, CODEPAGE_WESTERN, COLTYP_BINARY, COLTYP_DATETIME, COLTYP_GUID, COLTYP_LONG,
    COLTYP_LONG_TEXT, COLTYP_TEXT, DB_STATE_CLEAN_SHUTDOWN, FILE_SIGNATURE, FILE_TYPE_DATABASE,
    FORMAT_VERSION, PAGE_FLAG_LEAF, PAGE_FLAG_LONG_VALUE, PAGE_FLAG_NEW_RECORD_FORMAT,
    PAGE_FLAG_PARENT, PAGE_FLAG_ROOT, PAGE_HDR_SIZE, PAGE_TAG_SIZE, TAG_FLAG_COMMON_KEY,
};
use UalScope::header::{write_file_header, FileHeader, HeaderSource, LogTime};
use UalScope::page::common::OFF_NEXT_PAGE;
use UalScope::page::{page_header_write, page_update_checksum, PageFormat, PageHeader};
use UalScope::record::RecordBuilder;
use UalScope::Guid;

pub const PAGE_SIZE: u32 = 4096;
pub const REVISION: u32 = 0x14;

/// Object id каталога (как во встроенной схеме).
const CATALOG_OBJID: u32 = 2;
/// Размер "space header" в теге 0 корневой страницы.
const ROOT_EXT_HEADER: usize = 16;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_path(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("ualtest-{prefix}-{pid}-{t}-{id}.mdb"))
}

pub fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

pub fn guid(s: &str) -> Guid {
    Guid::parse_str(s).unwrap_or_else(|| panic!("bad guid literal {s}"))
}

/// FILETIME для полуночи (UTC) даты y-m-d плюс `secs` секунд.
pub fn filetime(y: i32, m: u32, d: u32, secs: u64) -> u64 {
    use chrono::TimeZone;
    let midnight = chrono::Utc
        .with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("bad date {y}-{m}-{d}"));
    let base = UalScope::util::datetime_to_filetime(midnight).expect("date after 1601");
    base + secs * UalScope::util::FILETIME_TICKS_PER_SEC
}

// ------------------------------------------------------------------
// Описания таблиц
// ------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub id: u32,
    pub name: String,
    pub coltyp: u32,
    pub codepage: u32,
    pub flags: u32,
}

impl ColumnDef {
    pub fn new(id: u32, name: &str, coltyp: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            coltyp,
            codepage: 0,
            flags: 0,
        }
    }

    pub fn text(id: u32, name: &str) -> Self {
        Self {
            codepage: CODEPAGE_UTF16,
            ..Self::new(id, name, COLTYP_TEXT)
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableDef {
    pub objid: u32,
    pub name: String,
    pub root: u32,
    pub lv_root: Option<u32>,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(objid: u32, name: &str, root: u32) -> Self {
        Self {
            objid,
            name: name.to_string(),
            root,
            lv_root: None,
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, c: ColumnDef) -> Self {
        self.columns.push(c);
        self
    }

    pub fn long_values(mut self, root: u32) -> Self {
        self.lv_root = Some(root);
        self
    }
}

/// Строка MSysObjects: fixed 1..=7 + Name (128).
fn catalog_row(objid_table: u32, kind: i16, id: u32, coltyp_or_fdp: u32, flags: u32, locale: u32, name: &str) -> Vec<u8> {
    RecordBuilder::new(false)
        .fixed(1, &objid_table.to_le_bytes())
        .fixed(2, &kind.to_le_bytes())
        .fixed(3, &id.to_le_bytes())
        .fixed(4, &coltyp_or_fdp.to_le_bytes())
        .fixed(5, &0u32.to_le_bytes())
        .fixed(6, &flags.to_le_bytes())
        .fixed(7, &locale.to_le_bytes())
        .variable(128, name.as_bytes())
        .build()
}

fn catalog_key(objid: u32, kind: i16, id: u32) -> Vec<u8> {
    let mut k = vec![0u8; 10];
    BigEndian::write_u32(&mut k[0..4], objid);
    BigEndian::write_i16(&mut k[4..6], kind);
    BigEndian::write_u32(&mut k[6..10], id);
    k
}

/// Записи каталога (ключ, данные) для набора таблиц.
pub fn catalog_entries(tables: &[TableDef]) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    for t in tables {
        out.push((
            catalog_key(t.objid, CATALOG_TYPE_TABLE, t.objid),
            catalog_row(t.objid, CATALOG_TYPE_TABLE, t.objid, t.root, 0, 0, &t.name),
        ));
        for c in &t.columns {
            out.push((
                catalog_key(t.objid, CATALOG_TYPE_COLUMN, c.id),
                catalog_row(t.objid, CATALOG_TYPE_COLUMN, c.id, c.coltyp, c.flags, c.codepage, &c.name),
            ));
        }
        if let Some(lv) = t.lv_root {
            out.push((
                catalog_key(t.objid, CATALOG_TYPE_LONG_VALUE, lv),
                catalog_row(t.objid, CATALOG_TYPE_LONG_VALUE, lv, lv, 0, 0, &format!("LV{}", t.objid)),
            ));
        }
    }
    out
}

/// Ключ строки таблицы: порядковый номер (u32 BE).
pub fn row_key(n: u32) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

/// Записи LV-дерева для одного значения: заголовок + сегменты по `chunk` байт.
pub fn long_value_entries(lid: u32, value: &[u8], chunk: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    let mut hdr = vec![0u8; 8];
    LittleEndian::write_u32(&mut hdr[0..4], 1);
    LittleEndian::write_u32(&mut hdr[4..8], value.len() as u32);
    out.push((lid.to_be_bytes().to_vec(), hdr));
    for (i, seg) in value.chunks(chunk.max(1)).enumerate() {
        let mut k = vec![0u8; 8];
        BigEndian::write_u32(&mut k[0..4], lid);
        BigEndian::write_u32(&mut k[4..8], (i * chunk) as u32);
        out.push((k, seg.to_vec()));
    }
    out
}

// ------------------------------------------------------------------
// Образ
// ------------------------------------------------------------------

pub struct EseImage {
    fmt: PageFormat,
    pages: BTreeMap<u32, Vec<u8>>,
    next_free: u32,
    /// Не-корневые страницы хранят общий префикс ключей в теге 0.
    prefix_keys: bool,
}

impl EseImage {
    pub fn new() -> Self {
        Self {
            fmt: PageFormat::new(PAGE_SIZE, REVISION),
            pages: BTreeMap::new(),
            // 1..=3 — служебные (остаются нулевыми), 4 — каталог
            next_free: 100,
            prefix_keys: false,
        }
    }

    /// Сжимать ключи не-корневых страниц общим префиксом (как это делает ESE).
    pub fn with_prefix_keys(mut self) -> Self {
        self.prefix_keys = true;
        self
    }

    /// Образ с каталогом для `tables` (деревья таблиц добавляются отдельно).
    pub fn with_catalog(tables: &[TableDef]) -> Self {
        let mut img = Self::new();
        img.add_tree(CATALOG_OBJID, CATALOG_ROOT_PAGE, catalog_entries(tables), false);
        img
    }

    pub fn format(&self) -> PageFormat {
        self.fmt
    }

    pub fn last_page(&self) -> u32 {
        self.pages.keys().next_back().copied().unwrap_or(0).max(CATALOG_ROOT_PAGE)
    }

    /// Свободная страница за пределами уже занятых номеров.
    pub fn alloc(&mut self) -> u32 {
        while self.pages.contains_key(&self.next_free) {
            self.next_free += 1;
        }
        let p = self.next_free;
        self.next_free += 1;
        p
    }

    fn node_len(key: &[u8], data: &[u8]) -> usize {
        2 + key.len() + data.len() + PAGE_TAG_SIZE
    }

    /// Разбить записи по листам, учитывая место под заголовок и тег 0.
    fn split(&self, entries: Vec<(Vec<u8>, Vec<u8>)>, ext_len: usize) -> Vec<Vec<(Vec<u8>, Vec<u8>)>> {
        let cap = PAGE_SIZE as usize - PAGE_HDR_SIZE - ext_len - PAGE_TAG_SIZE;
        let mut leaves: Vec<Vec<(Vec<u8>, Vec<u8>)>> = vec![Vec::new()];
        let mut used = 0usize;
        for (k, d) in entries {
            let need = Self::node_len(&k, &d);
            assert!(need <= cap, "entry of {} bytes does not fit a page", need);
            if used + need > cap {
                leaves.push(Vec::new());
                used = 0;
            }
            used += need;
            if let Some(last) = leaves.last_mut() {
                last.push((k, d));
            }
        }
        leaves
    }

    /// Положить дерево с корнем `root`. Возвращает номера листьев по порядку.
    pub fn add_tree(&mut self, objid: u32, root: u32, entries: Vec<(Vec<u8>, Vec<u8>)>, long_value: bool) -> Vec<u32> {
        let kind = if long_value { PAGE_FLAG_LONG_VALUE } else { 0 };
        let leaves = self.split(entries.clone(), ROOT_EXT_HEADER);
        if leaves.len() == 1 {
            self.put_page(root, objid, PAGE_FLAG_ROOT | PAGE_FLAG_LEAF | kind, 0, 0, &[0u8; ROOT_EXT_HEADER], &entries);
            return vec![root];
        }
        let leaves = self.split(entries, 0);
        let numbers: Vec<u32> = leaves.iter().map(|_| self.alloc()).collect();
        let mut children = Vec::new();
        for (i, leaf) in leaves.iter().enumerate() {
            let prev = if i > 0 { numbers[i - 1] } else { 0 };
            let next = numbers.get(i + 1).copied().unwrap_or(0);
            self.put_page(numbers[i], objid, PAGE_FLAG_LEAF | kind, prev, next, &[], leaf);
            let sep = leaf.last().map(|(k, _)| k.clone()).unwrap_or_default();
            children.push((sep, numbers[i].to_le_bytes().to_vec()));
        }
        self.put_page(root, objid, PAGE_FLAG_ROOT | PAGE_FLAG_PARENT | kind, 0, 0, &[0u8; ROOT_EXT_HEADER], &children);
        numbers
    }

    /// Дерево таблицы: строки нумеруются ключами 1, 2, ...
    pub fn add_rows(&mut self, table: &TableDef, rows: Vec<Vec<u8>>) -> Vec<u32> {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(i, r)| (row_key(i as u32 + 1), r))
            .collect();
        self.add_tree(table.objid, table.root, entries, false)
    }

    pub fn page_bytes(&self, pgno: u32) -> Option<Vec<u8>> {
        self.pages.get(&pgno).cloned()
    }

    /// Узлы с общим префиксом: (префикс для тега 0, [(common, key, data)]).
    /// None, если сжатие не даёт выигрыша или не влезает в страницу.
    fn prefix_nodes(nodes: &[(Vec<u8>, Vec<u8>)]) -> Option<(Vec<u8>, Vec<usize>)> {
        let first = &nodes.first()?.0;
        let common = nodes.iter().fold(first.len(), |n, (k, _)| {
            n.min(k.iter().zip(first).take_while(|(a, b)| a == b).count())
        });
        if common == 0 {
            return None;
        }
        let plain: usize = nodes.iter().map(|(k, d)| 2 + k.len() + d.len()).sum();
        let packed: usize = common + nodes.iter().map(|(k, d)| 4 + k.len() - common + d.len()).sum::<usize>();
        (packed <= plain).then(|| (first[..common].to_vec(), vec![common; nodes.len()]))
    }

    /// Собрать страницу: тег 0 = ext, теги 1..n = узлы [key_len u16][key][data].
    /// С prefix_keys узлы не-корневой страницы: [common u16][local_len u16][local][data].
    pub fn put_page(
        &mut self,
        pgno: u32,
        objid: u32,
        flags: u32,
        prev: u32,
        next: u32,
        ext: &[u8],
        nodes: &[(Vec<u8>, Vec<u8>)],
    ) {
        let ps = PAGE_SIZE as usize;
        let mut page = vec![0u8; ps];
        let packed = if self.prefix_keys && flags & PAGE_FLAG_ROOT == 0 {
            Self::prefix_nodes(nodes)
        } else {
            None
        };
        let (tag0, commons) = match packed {
            Some((prefix, commons)) => (prefix, commons),
            None => (ext.to_vec(), vec![0; nodes.len()]),
        };

        let mut blobs: Vec<(Vec<u8>, u16)> = vec![(tag0, 0)];
        for ((k, d), &common) in nodes.iter().zip(&commons) {
            let mut b = Vec::with_capacity(4 + k.len() + d.len());
            let mut tag_flags = 0u16;
            if common > 0 {
                b.extend_from_slice(&(common as u16).to_le_bytes());
                tag_flags = (TAG_FLAG_COMMON_KEY as u16) << 13;
            }
            b.extend_from_slice(&((k.len() - common) as u16).to_le_bytes());
            b.extend_from_slice(&k[common..]);
            b.extend_from_slice(d);
            blobs.push((b, tag_flags));
        }
        let mut off = 0usize;
        for (i, (b, tag_flags)) in blobs.iter().enumerate() {
            let at = PAGE_HDR_SIZE + off;
            page[at..at + b.len()].copy_from_slice(b);
            let t = ps - PAGE_TAG_SIZE * (i + 1);
            LittleEndian::write_u16(&mut page[t..t + 2], b.len() as u16);
            LittleEndian::write_u16(&mut page[t + 2..t + 4], off as u16 | tag_flags);
            off += b.len();
        }
        let h = PageHeader {
            ecc_or_page_number: pgno,
            db_time: 1,
            prev_page: prev,
            next_page: next,
            fdp_object_id: objid,
            first_free_offset: off as u16,
            tag_count: blobs.len() as u16,
            flags: flags | PAGE_FLAG_NEW_RECORD_FORMAT,
            ..Default::default()
        };
        page_header_write(&mut page, &h, &self.fmt);
        page_update_checksum(&mut page, pgno, &self.fmt);
        self.pages.insert(pgno, page);
    }

    /// Переписать next_page листа (с пересчётом checksum).
    pub fn set_next(&mut self, pgno: u32, next: u32) {
        let fmt = self.fmt;
        if let Some(p) = self.pages.get_mut(&pgno) {
            LittleEndian::write_u32(&mut p[OFF_NEXT_PAGE..OFF_NEXT_PAGE + 4], next);
            page_update_checksum(p, pgno, &fmt);
        }
    }

    /// Испортить байт страницы без пересчёта checksum.
    pub fn flip_byte(&mut self, pgno: u32, at: usize) {
        if let Some(p) = self.pages.get_mut(&pgno) {
            p[at] ^= 0x5A;
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let ps = PAGE_SIZE as usize;
        let last = self.last_page();
        let mut out = vec![0u8; (last as usize + 2) * ps];
        let h = FileHeader {
            checksum: 0,
            signature: FILE_SIGNATURE,
            format_version: FORMAT_VERSION,
            file_type: FILE_TYPE_DATABASE,
            db_time: 7,
            creation_time: Some(LogTime {
                year: 2024,
                month: 3,
                day: 1,
                hour: 8,
                minute: 0,
                second: 0,
            }),
            database_state: DB_STATE_CLEAN_SHUTDOWN,
            format_revision: REVISION,
            page_size: PAGE_SIZE,
            source: HeaderSource::Primary,
        };
        write_file_header(&mut out[0..ps], &h);
        write_file_header(&mut out[ps..2 * ps], &h);
        for (&pgno, page) in &self.pages {
            let off = self.fmt.file_offset(pgno) as usize;
            out[off..off + ps].copy_from_slice(page);
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn write_temp(&self, prefix: &str) -> Result<PathBuf> {
        let p = unique_path(prefix);
        self.write(&p)?;
        Ok(p)
    }
}

// ------------------------------------------------------------------
// UAL-таблицы
// ------------------------------------------------------------------

pub const RDP_GUID: &str = "{C50FCC83-BC8D-4DF5-8A3D-89D7F80F074B}";
pub const FILE_SERVER_GUID: &str = "{10A9226F-50EE-49D8-A393-9A501D47CE04}";

pub fn role_ids_table() -> TableDef {
    TableDef::new(10, "ROLE_IDS", 10)
        .column(ColumnDef::new(1, "RoleGuid", COLTYP_GUID))
        .column(ColumnDef::text(128, "ProductName"))
        .column(ColumnDef::text(129, "RoleName"))
}

pub fn role_row(g: &str, product: &str, name: &str) -> Vec<u8> {
    RecordBuilder::new(false)
        .fixed(1, &guid(g).0)
        .variable(128, &utf16(product))
        .variable(129, &utf16(name))
        .build()
}

/// Строка ROLE_IDS без RoleName (NULL).
pub fn role_row_unnamed(g: &str, product: &str) -> Vec<u8> {
    RecordBuilder::new(false)
        .fixed(1, &guid(g).0)
        .variable(128, &utf16(product))
        .null_variable(129)
        .build()
}

pub fn role_access_table() -> TableDef {
    TableDef::new(30, "ROLE_ACCESS", 30)
        .column(ColumnDef::new(1, "RoleGuid", COLTYP_GUID))
        .column(ColumnDef::new(2, "FirstSeen", COLTYP_DATETIME))
        .column(ColumnDef::new(3, "LastSeen", COLTYP_DATETIME))
}

pub fn role_access_row(g: &str, first: u64, last: u64) -> Vec<u8> {
    RecordBuilder::new(false)
        .fixed(1, &guid(g).0)
        .fixed(2, &first.to_le_bytes())
        .fixed(3, &last.to_le_bytes())
        .build()
}

pub fn system_identity_table() -> TableDef {
    TableDef::new(60, "SYSTEM_IDENTITY", 60)
        .column(ColumnDef::new(1, "CreationTime", COLTYP_DATETIME))
        .column(ColumnDef::new(2, "OSMajor", COLTYP_LONG))
        .column(ColumnDef::new(3, "OSMinor", COLTYP_LONG))
        .column(ColumnDef::new(4, "OSBuildNumber", COLTYP_LONG))
        .column(ColumnDef::text(128, "SystemDNSHostName"))
        .column(ColumnDef::text(129, "SystemDomainName"))
}

pub fn system_identity_row(created: u64, os: (u32, u32, u32), host: &str, domain: &str) -> Vec<u8> {
    RecordBuilder::new(false)
        .fixed(1, &created.to_le_bytes())
        .fixed(2, &os.0.to_le_bytes())
        .fixed(3, &os.1.to_le_bytes())
        .fixed(4, &os.2.to_le_bytes())
        .variable(128, &utf16(host))
        .variable(129, &utf16(domain))
        .build()
}

pub fn clients_table() -> TableDef {
    TableDef::new(20, "CLIENTS", 20)
        .column(ColumnDef::new(1, "RoleGuid", COLTYP_GUID))
        .column(ColumnDef::new(2, "TenantId", COLTYP_GUID))
        .column(ColumnDef::new(3, "TotalAccesses", COLTYP_LONG))
        .column(ColumnDef::new(4, "InsertDate", COLTYP_DATETIME))
        .column(ColumnDef::new(5, "LastAccess", COLTYP_DATETIME))
        .column(ColumnDef::new(128, "Address", COLTYP_BINARY))
        .column(ColumnDef::text(129, "AuthenticatedUserName"))
        .column(ColumnDef::text(130, "ClientName"))
        .column(ColumnDef::new(256, "Day1", COLTYP_LONG))
        .column(ColumnDef::new(257, "Day2", COLTYP_LONG))
        .column(ColumnDef::new(258, "Day3", COLTYP_LONG))
}

/// Строка CLIENTS. `days` — (номер DayN, значение), N ∈ 1..=3.
pub struct ClientSpec<'a> {
    pub role: &'a str,
    pub total: u32,
    pub insert: u64,
    pub last: u64,
    pub address: &'a [u8],
    pub user: &'a str,
    pub client_name: Option<&'a str>,
    pub days: &'a [(u32, u32)],
}

pub fn client_row(c: &ClientSpec<'_>) -> Vec<u8> {
    let mut b = RecordBuilder::new(false)
        .fixed(1, &guid(c.role).0)
        .null_fixed(2, 16)
        .fixed(3, &c.total.to_le_bytes())
        .fixed(4, &c.insert.to_le_bytes())
        .fixed(5, &c.last.to_le_bytes())
        .variable(128, c.address)
        .variable(129, &utf16(c.user));
    b = match c.client_name {
        Some(n) => b.variable(130, &utf16(n)),
        None => b.null_variable(130),
    };
    for &(n, v) in c.days {
        b = b.tagged(255 + n, &v.to_le_bytes());
    }
    b.build()
}

pub fn dns_table() -> TableDef {
    TableDef::new(40, "DNS", 40)
        .column(ColumnDef::new(1, "LastSeen", COLTYP_DATETIME))
        .column(ColumnDef::text(128, "Address"))
        .column(ColumnDef::text(129, "HostName"))
}

pub fn dns_row(seen: u64, addr: &str, host: &str) -> Vec<u8> {
    RecordBuilder::new(false)
        .fixed(1, &seen.to_le_bytes())
        .variable(128, &utf16(addr))
        .variable(129, &utf16(host))
        .build()
}

/// Таблица с одной LongText-колонкой, значения которой лежат в LV-дереве.
pub fn notes_table(lv_root: u32) -> TableDef {
    TableDef::new(50, "NOTES", 50)
        .long_values(lv_root)
        .column(ColumnDef::new(1, "Id", COLTYP_LONG))
        .column(ColumnDef {
            codepage: CODEPAGE_WESTERN,
            ..ColumnDef::new(256, "Body", COLTYP_LONG_TEXT)
        })
}
