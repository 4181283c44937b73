// core/src/db.rs

//! Pool construction and embedded migrations.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Opens (creating if missing) the database at `database_url` and applies
/// pending migrations.
///
/// In-memory URLs get a single long-lived connection; every extra connection
/// would otherwise see its own empty database.
#[instrument(name = "db::connect", skip(database_url), err(Display))]
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
  if database_url.contains(":memory:") {
    return in_memory().await;
  }

  let options = SqliteConnectOptions::from_str(database_url)?
    .create_if_missing(true)
    .journal_mode(SqliteJournalMode::Wal)
    .busy_timeout(Duration::from_secs(5));

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections.max(1))
    .connect_with(options)
    .await?;
  migrate(&pool).await?;
  info!("Database ready.");
  Ok(pool)
}

/// A fresh, migrated in-memory database.
pub async fn in_memory() -> Result<SqlitePool> {
  let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .min_connections(1)
    .idle_timeout(None)
    .max_lifetime(None)
    .connect_with(options)
    .await?;
  migrate(&pool).await?;
  Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
  sqlx::migrate!("./migrations").run(pool).await?;
  Ok(())
}
