//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, written as free functions that accept a `&mut SqliteConnection`. Callers obtain
//! a connection from the pool, or open a transaction, and call through to these functions without any other changes.
//!
//! Functions that change a status always carry the expected status in their `WHERE` clause, and report a missed
//! match as `Ok(None)` or an empty result rather than guessing why it missed.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod assignments;
pub mod catalog;
pub mod items;
pub mod orders;
pub mod payouts;
pub mod slots;
pub mod wallets;

const SQLITE_DB_URL: &str = "sqlite://data/fulfillment.db";

pub fn db_url() -> String {
    let result = env::var("FMS_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ FMS_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

/// Opens a connection pool. Writers wait on the database lock for up to ten seconds instead of failing immediately,
/// so bursts of conditional writes serialize rather than error.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(10))
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
