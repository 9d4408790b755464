//! Runtime Configuration
//! Mission: Load every process-wide setting once at startup
//!
//! Nothing in here is mutated after `Config::from_env` returns; the struct
//! is passed by reference (or cloned into shared state) instead of living
//! in globals.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file backing both the user and resource stores.
    pub database_path: String,
    /// Address the API server binds to.
    pub bind_addr: String,
    /// HS256 signing secret for access and refresh tokens.
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "reservations.db".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let secret_key = env::var("SECRET_KEY").context("SECRET_KEY must be set")?;

        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(5 * 60);

        let refresh_token_expire_minutes = env::var("REFRESH_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(7 * 24 * 60);

        Ok(Self {
            database_path,
            bind_addr,
            secret_key,
            access_token_expire_minutes,
            refresh_token_expire_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because the process environment is shared across threads.
    #[test]
    fn test_from_env() {
        env::remove_var("DATABASE_PATH");
        env::remove_var("BIND_ADDR");
        env::remove_var("ACCESS_TOKEN_EXPIRE_MINUTES");
        env::remove_var("REFRESH_TOKEN_EXPIRE_MINUTES");

        // from_env must fail rather than fall back to a guessable secret
        env::remove_var("SECRET_KEY");
        assert!(Config::from_env().is_err());

        env::set_var("SECRET_KEY", "test-secret");
        let config = Config::from_env().unwrap();
        assert_eq!(config.secret_key, "test-secret");
        assert_eq!(config.database_path, "reservations.db");
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.access_token_expire_minutes, 300);
        assert_eq!(config.refresh_token_expire_minutes, 10080);
    }
}
