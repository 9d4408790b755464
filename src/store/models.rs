//! Resource Models
//! Mission: Define room, table, and reservation data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rooms carrying this faculty label are reservable by every account,
/// regardless of the account's own faculty.
pub const OPEN_FACULTY: &str = "open";

/// Page size shared by every list endpoint.
pub const SIZE_PER_PAGE: i64 = 50;

/// Room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub faculty: String,
    /// Closed rooms reject reservation creation outright.
    pub is_open: bool,
    /// Owning account; room mutation is gated on this.
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoom {
    pub name: String,
    pub faculty: String,
    #[serde(default = "default_true")]
    pub is_open: bool,
}

pub type UpdateRoom = CreateRoom;

#[derive(Debug, Serialize)]
pub struct RoomList {
    pub rooms: Vec<Room>,
    pub page: i64,
    pub page_count: i64,
    pub size_per_page: i64,
}

/// Table within a room; scope and ownership are inherited from the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    /// Sequential number within the room, unique per room.
    pub number: i64,
    pub room_id: i64,
    pub is_available: bool,
}

/// Batch table creation: allocates `count` sequentially numbered tables.
#[derive(Debug, Deserialize)]
pub struct CreateTables {
    pub room_id: i64,
    pub count: i64,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

#[derive(Debug, Serialize)]
pub struct TableList {
    pub tables: Vec<Table>,
    pub page: i64,
    pub page_count: i64,
    pub size_per_page: i64,
}

/// Reservation of one table by one account for a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: i64,
    pub table_id: i64,
    pub duration_hours: i64,
    pub reserved_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReservation {
    pub table_id: i64,
    pub duration_hours: i64,
}

pub type UpdateReservation = CreateReservation;

#[derive(Debug, Serialize)]
pub struct ReservationList {
    pub reservations: Vec<Reservation>,
    pub page: i64,
    pub page_count: i64,
    pub size_per_page: i64,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_room_defaults_open() {
        let room: CreateRoom =
            serde_json::from_str(r#"{"name": "Lab 1", "faculty": "Engineering"}"#).unwrap();
        assert!(room.is_open);

        let closed: CreateRoom =
            serde_json::from_str(r#"{"name": "Lab 2", "faculty": "Engineering", "is_open": false}"#)
                .unwrap();
        assert!(!closed.is_open);
    }

    #[test]
    fn test_create_tables_defaults_available() {
        let req: CreateTables = serde_json::from_str(r#"{"room_id": 1, "count": 4}"#).unwrap();
        assert_eq!(req.count, 4);
        assert!(req.is_available);
    }
}
