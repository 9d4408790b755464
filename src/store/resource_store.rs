//! Resource Storage
//! Mission: Store rooms, tables, and reservations with SQLite

use crate::store::models::{
    Reservation, Room, RoomList, Table, TableList, ReservationList, SIZE_PER_PAGE,
};
use crate::store::{fmt_dt, parse_dt};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use tracing::{info, warn};

/// Attempts at allocating table numbers before giving up. Conflicts only
/// happen when another writer grabs the same numbers between our read of
/// MAX(number) and the insert; the UNIQUE constraint catches that.
const NUMBERING_ATTEMPTS: usize = 5;

/// Room/table/reservation storage with SQLite backend
pub struct ResourceStore {
    db_path: String,
}

impl ResourceStore {
    /// Create a new resource store and initialize the schema
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS rooms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                faculty TEXT NOT NULL,
                is_open INTEGER NOT NULL DEFAULT 1,
                user_id INTEGER NOT NULL
            )",
            [],
        )?;

        // UNIQUE(room_id, number) serializes concurrent numbering; the
        // allocator retries on conflict instead of locking in-process.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tables (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                number INTEGER NOT NULL,
                room_id INTEGER NOT NULL,
                is_available INTEGER NOT NULL DEFAULT 1,
                UNIQUE(room_id, number),
                FOREIGN KEY (room_id) REFERENCES rooms(id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reservations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                table_id INTEGER NOT NULL,
                duration_hours INTEGER NOT NULL,
                reserved_at TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                FOREIGN KEY (table_id) REFERENCES tables(id)
            )",
            [],
        )?;

        Ok(())
    }

    // ===== Rooms =====

    pub fn create_room(
        &self,
        name: &str,
        faculty: &str,
        is_open: bool,
        user_id: i64,
    ) -> Result<Room> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO rooms (name, faculty, is_open, user_id) VALUES (?1, ?2, ?3, ?4)",
            params![name, faculty, is_open, user_id],
        )
        .context("Failed to insert room")?;

        let room = Room {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            faculty: faculty.to_string(),
            is_open,
            user_id,
        };

        info!("Created room {} ({}, faculty {})", room.id, room.name, room.faculty);
        Ok(room)
    }

    pub fn get_room(&self, room_id: i64) -> Result<Option<Room>> {
        let conn = Connection::open(&self.db_path)?;
        let result = conn.query_row(
            "SELECT id, name, faculty, is_open, user_id FROM rooms WHERE id = ?1",
            params![room_id],
            room_from_row,
        );
        optional(result)
    }

    pub fn list_rooms(&self, page: i64) -> Result<RoomList> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT id, name, faculty, is_open, user_id FROM rooms
             ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;
        let rooms = stmt
            .query_map(params![SIZE_PER_PAGE, (page - 1) * SIZE_PER_PAGE], room_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM rooms", [], |row| row.get(0))?;

        Ok(RoomList {
            rooms,
            page,
            page_count: page_count(total),
            size_per_page: SIZE_PER_PAGE,
        })
    }

    pub fn update_room(
        &self,
        room_id: i64,
        name: &str,
        faculty: &str,
        is_open: bool,
    ) -> Result<Option<Room>> {
        let conn = Connection::open(&self.db_path)?;
        let rows = conn.execute(
            "UPDATE rooms SET name = ?1, faculty = ?2, is_open = ?3 WHERE id = ?4",
            params![name, faculty, is_open, room_id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_room(room_id)
    }

    /// Delete a room together with its tables and their reservations.
    pub fn delete_room(&self, room_id: i64) -> Result<bool> {
        let mut conn = Connection::open(&self.db_path)?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM reservations WHERE table_id IN
             (SELECT id FROM tables WHERE room_id = ?1)",
            params![room_id],
        )?;
        tx.execute("DELETE FROM tables WHERE room_id = ?1", params![room_id])?;
        let rows = tx.execute("DELETE FROM rooms WHERE id = ?1", params![room_id])?;
        tx.commit()?;

        if rows > 0 {
            info!("Deleted room {}", room_id);
        }
        Ok(rows > 0)
    }

    // ===== Tables =====

    /// Allocate `count` tables in a room, numbered MAX(number)+1 onwards.
    ///
    /// The read-then-insert is done inside one transaction and guarded by
    /// the UNIQUE(room_id, number) constraint; a conflicting concurrent
    /// allocation triggers a bounded retry with fresh numbers.
    pub fn create_tables(&self, room_id: i64, count: i64, is_available: bool) -> Result<Vec<Table>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_allocate_tables(room_id, count, is_available) {
                Ok(tables) => {
                    info!("Created {} table(s) in room {}", tables.len(), room_id);
                    return Ok(tables);
                }
                Err(e) if is_unique_violation(&e) && attempt < NUMBERING_ATTEMPTS => {
                    warn!(
                        "Table numbering conflict in room {}, retrying ({}/{})",
                        room_id, attempt, NUMBERING_ATTEMPTS
                    );
                }
                Err(e) => {
                    return Err(anyhow::Error::from(e).context("Failed to allocate tables"));
                }
            }
        }
    }

    fn try_allocate_tables(
        &self,
        room_id: i64,
        count: i64,
        is_available: bool,
    ) -> rusqlite::Result<Vec<Table>> {
        let mut conn = Connection::open(&self.db_path)?;
        let tx = conn.transaction()?;

        let max_number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) FROM tables WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )?;

        let mut created = Vec::with_capacity(count as usize);
        for i in 0..count {
            let number = max_number + i + 1;
            tx.execute(
                "INSERT INTO tables (number, room_id, is_available) VALUES (?1, ?2, ?3)",
                params![number, room_id, is_available],
            )?;
            created.push(Table {
                id: tx.last_insert_rowid(),
                number,
                room_id,
                is_available,
            });
        }

        tx.commit()?;
        Ok(created)
    }

    pub fn get_table(&self, table_id: i64) -> Result<Option<Table>> {
        let conn = Connection::open(&self.db_path)?;
        let result = conn.query_row(
            "SELECT id, number, room_id, is_available FROM tables WHERE id = ?1",
            params![table_id],
            table_from_row,
        );
        optional(result)
    }

    pub fn list_tables(&self, page: i64) -> Result<TableList> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT id, number, room_id, is_available FROM tables
             ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;
        let tables = stmt
            .query_map(params![SIZE_PER_PAGE, (page - 1) * SIZE_PER_PAGE], table_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM tables", [], |row| row.get(0))?;

        Ok(TableList {
            tables,
            page,
            page_count: page_count(total),
            size_per_page: SIZE_PER_PAGE,
        })
    }

    pub fn delete_table(&self, table_id: i64) -> Result<bool> {
        let mut conn = Connection::open(&self.db_path)?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM reservations WHERE table_id = ?1",
            params![table_id],
        )?;
        let rows = tx.execute("DELETE FROM tables WHERE id = ?1", params![table_id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // ===== Reservations =====

    /// True if any existing reservation on the table intersects
    /// [start, end). Touching windows (end == next start) do not overlap.
    pub fn has_overlap(
        &self,
        table_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;
        Ok(overlap_exists(&conn, table_id, start, end)?)
    }

    /// Reserve a table for [start_time, end_time), or return None when the
    /// window is already taken.
    ///
    /// The overlap check and the insert run inside one immediate
    /// transaction, so concurrent writers serialize on the database lock
    /// and the second one sees the first one's row. The stored window is
    /// exactly the one that was checked.
    pub fn create_reservation(
        &self,
        user_id: i64,
        table_id: i64,
        duration_hours: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Option<Reservation>> {
        let mut conn = Connection::open(&self.db_path)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if overlap_exists(&tx, table_id, start_time, end_time)? {
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO reservations
             (user_id, table_id, duration_hours, reserved_at, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                table_id,
                duration_hours,
                fmt_dt(start_time),
                fmt_dt(start_time),
                fmt_dt(end_time),
            ],
        )
        .context("Failed to insert reservation")?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        let reservation = Reservation {
            id,
            user_id,
            table_id,
            duration_hours,
            reserved_at: start_time,
            start_time,
            end_time,
        };

        info!(
            "Created reservation {} (table {}, account {}, {}h)",
            reservation.id, table_id, user_id, duration_hours
        );
        Ok(Some(reservation))
    }

    pub fn get_reservation(&self, reservation_id: i64) -> Result<Option<Reservation>> {
        let conn = Connection::open(&self.db_path)?;
        let result = conn.query_row(
            "SELECT id, user_id, table_id, duration_hours, reserved_at, start_time, end_time
             FROM reservations WHERE id = ?1",
            params![reservation_id],
            reservation_from_row,
        );
        optional(result)
    }

    pub fn list_reservations(&self, page: i64) -> Result<ReservationList> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, table_id, duration_hours, reserved_at, start_time, end_time
             FROM reservations ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;
        let reservations = stmt
            .query_map(
                params![SIZE_PER_PAGE, (page - 1) * SIZE_PER_PAGE],
                reservation_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total: i64 =
            conn.query_row("SELECT COUNT(*) FROM reservations", [], |row| row.get(0))?;

        Ok(ReservationList {
            reservations,
            page,
            page_count: page_count(total),
            size_per_page: SIZE_PER_PAGE,
        })
    }

    /// Move a reservation to another table and/or duration. The start time
    /// is kept; the end time is recomputed from the new duration.
    pub fn update_reservation(
        &self,
        reservation_id: i64,
        table_id: i64,
        duration_hours: i64,
    ) -> Result<Option<Reservation>> {
        let Some(existing) = self.get_reservation(reservation_id)? else {
            return Ok(None);
        };

        let end_time = existing.start_time + Duration::hours(duration_hours);

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "UPDATE reservations
             SET table_id = ?1, duration_hours = ?2, end_time = ?3 WHERE id = ?4",
            params![table_id, duration_hours, fmt_dt(end_time), reservation_id],
        )?;

        Ok(Some(Reservation {
            table_id,
            duration_hours,
            end_time,
            ..existing
        }))
    }

    pub fn delete_reservation(&self, reservation_id: i64) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;
        let rows = conn.execute(
            "DELETE FROM reservations WHERE id = ?1",
            params![reservation_id],
        )?;
        Ok(rows > 0)
    }
}

fn room_from_row(row: &Row) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        name: row.get(1)?,
        faculty: row.get(2)?,
        is_open: row.get(3)?,
        user_id: row.get(4)?,
    })
}

fn table_from_row(row: &Row) -> rusqlite::Result<Table> {
    Ok(Table {
        id: row.get(0)?,
        number: row.get(1)?,
        room_id: row.get(2)?,
        is_available: row.get(3)?,
    })
}

fn reservation_from_row(row: &Row) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        table_id: row.get(2)?,
        duration_hours: row.get(3)?,
        reserved_at: parse_dt(&row.get::<_, String>(4)?)?,
        start_time: parse_dt(&row.get::<_, String>(5)?)?,
        end_time: parse_dt(&row.get::<_, String>(6)?)?,
    })
}

fn overlap_exists(
    conn: &Connection,
    table_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reservations
         WHERE table_id = ?1 AND start_time < ?2 AND end_time > ?3",
        params![table_id, fmt_dt(end), fmt_dt(start)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn page_count(total: i64) -> i64 {
    (total + SIZE_PER_PAGE - 1) / SIZE_PER_PAGE
}
