//! User Storage
//! Mission: Securely store and manage user accounts with SQLite

use crate::auth::models::{Role, User};
use crate::store::models::OPEN_FACULTY;
use crate::store::{fmt_dt, parse_dt};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::{info, warn};

/// Fields accepted at registration.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub faculty: &'a str,
    pub role: Role,
    pub room_permission: bool,
}

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize the schema
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
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                room_permission INTEGER NOT NULL DEFAULT 0,
                faculty TEXT NOT NULL,
                register_date TEXT NOT NULL,
                updated_date TEXT NOT NULL,
                last_login_date TEXT
            )",
            [],
        )?;

        Ok(())
    }

    /// Create a default admin account if no admin exists yet.
    pub fn seed_default_admin(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count == 0 {
            self.create_user(NewUser {
                username: "admin",
                email: "admin@email.local",
                password: "admin123",
                first_name: "Default",
                last_name: "Admin",
                faculty: OPEN_FACULTY,
                role: Role::Admin,
                room_permission: true,
            })?;

            info!("🔐 Default admin user created (username: admin, password: admin123)");
            warn!("⚠️  CHANGE DEFAULT PASSWORD IN PRODUCTION!");
        }

        Ok(())
    }

    /// Create a new user. The plaintext password is bcrypt-hashed with a
    /// fresh salt; uniqueness of username and email is enforced by the
    /// schema as a backstop for the handler-level checks.
    pub fn create_user(&self, new_user: NewUser) -> Result<User> {
        let password_hash =
            hash(new_user.password, DEFAULT_COST).context("Failed to hash password")?;
        let now = Utc::now();

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO users
             (username, email, first_name, last_name, password_hash, role,
              room_permission, faculty, register_date, updated_date, last_login_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
            params![
                new_user.username,
                new_user.email,
                new_user.first_name,
                new_user.last_name,
                password_hash,
                new_user.role.as_str(),
                new_user.room_permission,
                new_user.faculty,
                fmt_dt(now),
                fmt_dt(now),
            ],
        )
        .context("Failed to insert user")?;

        let user = User {
            id: conn.last_insert_rowid(),
            username: new_user.username.to_string(),
            email: new_user.email.to_string(),
            first_name: new_user.first_name.to_string(),
            last_name: new_user.last_name.to_string(),
            password_hash,
            role: new_user.role,
            room_permission: new_user.room_permission,
            faculty: new_user.faculty.to_string(),
            register_date: now,
            updated_date: now,
            last_login_date: None,
        };

        info!("✅ Created user: {} ({})", user.username, user.role.as_str());
        Ok(user)
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.get_user_where("id = ?1", params![user_id])
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_where("username = ?1", params![username])
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_where("email = ?1", params![email])
    }

    fn get_user_where(
        &self,
        predicate: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;
        let sql = format!(
            "SELECT id, username, email, first_name, last_name, password_hash, role,
                    room_permission, faculty, register_date, updated_date, last_login_date
             FROM users WHERE {}",
            predicate
        );

        let result = conn.query_row(&sql, params, user_from_row);
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify an email/password pair, returning the account on success.
    ///
    /// Returns None both for an unknown email and a wrong password so the
    /// caller cannot distinguish the two.
    pub fn verify_password(&self, email: &str, password: &str) -> Result<Option<User>> {
        match self.get_user_by_email(email)? {
            Some(user) => {
                let valid =
                    verify(password, &user.password_hash).context("Failed to verify password")?;
                Ok(valid.then_some(user))
            }
            None => Ok(None),
        }
    }

    pub fn change_password(&self, user_id: i64, new_password: &str) -> Result<()> {
        let password_hash =
            hash(new_password, DEFAULT_COST).context("Failed to hash password")?;

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "UPDATE users SET password_hash = ?1, updated_date = ?2 WHERE id = ?3",
            params![password_hash, fmt_dt(Utc::now()), user_id],
        )?;
        Ok(())
    }

    pub fn update_profile(
        &self,
        user_id: i64,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;
        let rows = conn.execute(
            "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, updated_date = ?4
             WHERE id = ?5",
            params![email, first_name, last_name, fmt_dt(Utc::now()), user_id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        self.get_user(user_id)
    }

    pub fn record_login(&self, user_id: i64) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "UPDATE users SET last_login_date = ?1 WHERE id = ?2",
            params![fmt_dt(Utc::now()), user_id],
        )?;
        Ok(())
    }

    /// Delete a user by id. Outstanding tokens for the account become
    /// invalid at their next validation, since the middleware re-resolves
    /// the subject on every request.
    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        let conn = Connection::open(&self.db_path)?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        if rows > 0 {
            info!("🗑️  Deleted user: {}", user_id);
        }
        Ok(rows > 0)
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role_str: String = row.get(6)?;
    let last_login: Option<String> = row.get(11)?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password_hash: row.get(5)?,
        role: Role::from_str(&role_str).unwrap_or(Role::Visitor),
        room_permission: row.get(7)?,
        faculty: row.get(8)?,
        register_date: parse_dt(&row.get::<_, String>(9)?)?,
        updated_date: parse_dt(&row.get::<_, String>(10)?)?,
        last_login_date: last_login.as_deref().map(parse_dt).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (UserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = UserStore::new(db_path).unwrap();
        (store, temp_file)
    }

    fn new_user<'a>(username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            username,
            email,
            password: "password123",
            first_name: "Test",
            last_name: "User",
            faculty: "Engineering",
            role: Role::User,
            room_permission: false,
        }
    }

    #[test]
    fn test_seed_default_admin() {
        let (store, _temp) = create_test_store();
        store.seed_default_admin().unwrap();

        let admin = store.get_user_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.room_permission);

        // Idempotent: a second seed does not add another admin
        store.seed_default_admin().unwrap();
        assert!(store.get_user_by_email("admin@email.local").unwrap().is_some());
    }

    #[test]
    fn test_create_and_retrieve_user() {
        let (store, _temp) = create_test_store();

        let created = store.create_user(new_user("alice", "alice@test.com")).unwrap();
        assert_eq!(created.role, Role::User);
        assert!(created.last_login_date.is_none());
        // Stored hash is salted, never the plaintext
        assert_ne!(created.password_hash, "password123");

        let by_id = store.get_user(created.id).unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_email = store.get_user_by_email("alice@test.com").unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(store.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let (store, _temp) = create_test_store();
        let a = store.create_user(new_user("a", "a@test.com")).unwrap();
        let b = store.create_user(new_user("b", "b@test.com")).unwrap();
        // Fresh salt per call
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn test_duplicate_username_rejected_by_schema() {
        let (store, _temp) = create_test_store();
        store.create_user(new_user("alice", "alice@test.com")).unwrap();
        assert!(store.create_user(new_user("alice", "other@test.com")).is_err());
        assert!(store.create_user(new_user("other", "alice@test.com")).is_err());
    }

    #[test]
    fn test_verify_password() {
        let (store, _temp) = create_test_store();
        store.create_user(new_user("alice", "alice@test.com")).unwrap();

        let user = store
            .verify_password("alice@test.com", "password123")
            .unwrap();
        assert!(user.is_some());

        // Wrong password and unknown email look the same to the caller
        assert!(store
            .verify_password("alice@test.com", "wrongpassword")
            .unwrap()
            .is_none());
        assert!(store
            .verify_password("ghost@test.com", "password123")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_change_password() {
        let (store, _temp) = create_test_store();
        let user = store.create_user(new_user("alice", "alice@test.com")).unwrap();

        store.change_password(user.id, "newpassword").unwrap();
        assert!(store
            .verify_password("alice@test.com", "password123")
            .unwrap()
            .is_none());
        assert!(store
            .verify_password("alice@test.com", "newpassword")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_update_profile() {
        let (store, _temp) = create_test_store();
        let user = store.create_user(new_user("alice", "alice@test.com")).unwrap();

        let updated = store
            .update_profile(user.id, "new@test.com", "New", "Name")
            .unwrap()
            .unwrap();
        assert_eq!(updated.email, "new@test.com");
        assert_eq!(updated.first_name, "New");
        assert!(updated.updated_date >= user.updated_date);

        assert!(store
            .update_profile(9999, "x@test.com", "X", "Y")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_record_login() {
        let (store, _temp) = create_test_store();
        let user = store.create_user(new_user("alice", "alice@test.com")).unwrap();

        store.record_login(user.id).unwrap();
        let fetched = store.get_user(user.id).unwrap().unwrap();
        assert!(fetched.last_login_date.is_some());
    }

    #[test]
    fn test_delete_user() {
        let (store, _temp) = create_test_store();
        let user = store.create_user(new_user("alice", "alice@test.com")).unwrap();

        assert!(store.delete_user(user.id).unwrap());
        assert!(store.get_user(user.id).unwrap().is_none());
        assert!(!store.delete_user(user.id).unwrap());
    }
}
