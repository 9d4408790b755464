//! Resource Storage Module
//! Mission: Persist rooms, tables, and reservations with SQLite

pub mod models;
pub mod resource_store;

pub use resource_store::ResourceStore;

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width RFC 3339 UTC rendering.
///
/// All timestamps are written through this so that stored strings compare
/// lexicographically in timestamp order (the reservation-overlap query
/// relies on it).
pub(crate) fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_dt(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}
