//! ual — семантика таблиц Windows User Access Logging.
//! - types.rs  — доменные записи (SystemIdentity, RoleIdentity, RoleUsageEvent,
//!               ClientAccessEvent), ParseSummary, UalReport
//! - mapper.rs — build_ual_report: скан известных таблиц, корреляция, дедупликация

pub mod mapper;
pub mod types;

pub use mapper::build_ual_report;
pub use types::{
    ClientAccessEvent, DomainRecord, ParseSummary, RoleIdentity, RoleUsageEvent, SystemIdentity,
    Timestamp, UalReport, UNKNOWN_CLIENT, UNRESOLVED_ROLE,
};
