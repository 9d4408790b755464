//! API Module
//! Mission: HTTP routing and CRUD handlers for rooms, tables, reservations

pub mod reservations;
pub mod rooms;
pub mod routes;
pub mod tables;

use serde::Deserialize;

/// Shared `?page=N` query for the list endpoints; pages are 1-based.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}
