mod common;

use anyhow::Result;
use oorandom::Rand64;
use std::fs::{self, OpenOptions};

use UalScope::consts::CATALOG_ROOT_PAGE;
use UalScope::error::{error_kind, find_ese_error, EseError};
use UalScope::{parse_file, EseDb, ParseConfig};

use common::{
    client_row, clients_table, dns_table, filetime, role_ids_table, role_row, ClientSpec,
    EseImage, PAGE_SIZE, RDP_GUID,
};

fn sample_image() -> EseImage {
    let tables = vec![clients_table(), role_ids_table(), dns_table()];
    let mut img = EseImage::with_catalog(&tables);
    let rows = (0..40u32)
        .map(|i| {
            client_row(&ClientSpec {
                role: RDP_GUID,
                total: i + 1,
                insert: filetime(2024, 2, 1, 0),
                last: filetime(2024, 2, 3, i as u64),
                address: &[192, 168, 1, i as u8],
                user: &format!("CORP\\user{}", i),
                client_name: None,
                days: &[(1, 1)],
            })
        })
        .collect();
    img.add_rows(&tables[0], rows);
    img.add_rows(&tables[1], vec![role_row(RDP_GUID, "Windows Server", "Remote Desktop Services")]);
    img.add_rows(&tables[2], Vec::new());
    img
}

#[test]
fn truncated_before_catalog_root_is_corrupt_page() -> Result<()> {
    let path = sample_image().write_temp("trunc")?;
    // оставить заголовок, тень и страницы 1..=3
    let keep = (CATALOG_ROOT_PAGE as u64 + 1) * PAGE_SIZE as u64;
    OpenOptions::new().write(true).open(&path)?.set_len(keep)?;

    let err = parse_file(&path, &ParseConfig::default()).unwrap_err();
    assert_eq!(error_kind(&err), "CorruptPageError");
    assert!(matches!(
        find_ese_error(&err),
        Some(EseError::CorruptPage { page: Some(4), .. })
    ));

    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn truncated_mid_page_is_corrupt_page() -> Result<()> {
    let path = sample_image().write_temp("midpage")?;
    let len = fs::metadata(&path)?.len();
    OpenOptions::new().write(true).open(&path)?.set_len(len - 100)?;

    let err = EseDb::open(&path).err().expect("mid-page truncation must fail");
    assert_eq!(error_kind(&err), "CorruptPageError");

    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn bad_primary_header_falls_back_to_shadow() -> Result<()> {
    let path = sample_image().write_temp("shadow")?;
    let mut bytes = fs::read(&path)?;
    bytes[300] ^= 0xFF; // внутри области checksum заголовка
    fs::write(&path, &bytes)?;

    let db = EseDb::open(&path)?;
    assert_eq!(
        db.header().source,
        UalScope::header::HeaderSource::Shadow
    );

    let strict = ParseConfig::default().with_shadow_header(false);
    let err = EseDb::open_with_config(&path, strict).err().expect("no shadow fallback");
    assert_eq!(error_kind(&err), "CorruptPageError");

    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn checksum_mismatch_is_fatal_unless_disabled() -> Result<()> {
    let mut img = sample_image();
    let clients = clients_table();
    // байт в свободной области страницы: данные не меняются, checksum — да
    img.flip_byte(clients.root, PAGE_SIZE as usize / 2);
    let path = img.write_temp("checksum")?;

    let err = parse_file(&path, &ParseConfig::default()).unwrap_err();
    assert_eq!(error_kind(&err), "CorruptPageError");

    let lenient = ParseConfig::default().with_verify_checksums(false);
    let report = parse_file(&path, &lenient)?;
    assert!(report.usage_events().count() > 0);

    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn catalog_without_tables_is_schema_error() -> Result<()> {
    let path = EseImage::with_catalog(&[]).write_temp("emptycat")?;
    let err = EseDb::open(&path).err().expect("empty catalog");
    assert_eq!(error_kind(&err), "SchemaError");
    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn random_corruption_never_panics() -> Result<()> {
    let clean = sample_image().to_bytes();
    let pages = clean.len() / PAGE_SIZE as usize;
    let mut rng = Rand64::new(0x5EED_0A11_u128);
    let lenient = ParseConfig::default().with_verify_checksums(false);

    for round in 0..200 {
        let mut bytes = clean.clone();
        let flips = 1 + (rng.rand_u64() % 24) as usize;
        for _ in 0..flips {
            // страницы данных (без заголовка и тени)
            let page = 2 + (rng.rand_u64() % (pages as u64 - 2)) as usize;
            let at = page * PAGE_SIZE as usize + (rng.rand_u64() % PAGE_SIZE as u64) as usize;
            bytes[at] = rng.rand_u64() as u8;
        }
        let path = common::unique_path(&format!("fuzz{}", round));
        fs::write(&path, &bytes)?;

        // Ok или классифицированная ошибка — но не паника
        match parse_file(&path, &lenient) {
            Ok(report) => {
                let _ = UalScope::format_text(&report);
            }
            Err(e) => {
                assert_ne!(error_kind(&e), "Error", "unclassified error: {:#}", e);
            }
        }
        fs::remove_file(&path)?;
    }
    Ok(())
}
