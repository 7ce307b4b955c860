//! SQLite pool creation and schema application.
//!
//! The schema is applied on connect so in-memory test databases and fresh
//! deployments come up ready to serve. Foreign keys are enabled on every
//! connection; `ON DELETE CASCADE` backs up the explicit transactional
//! cascade performed by the repository.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS medications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        dosage_mg INTEGER NOT NULL,
        prescribed_per_day INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS dose_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        medication_id INTEGER NOT NULL REFERENCES medications(id) ON DELETE CASCADE,
        taken_at TEXT NOT NULL,
        was_taken INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        medication_id INTEGER NOT NULL REFERENCES medications(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_dose_logs_taken_at ON dose_logs (taken_at)",
    "CREATE INDEX IF NOT EXISTS idx_dose_logs_medication ON dose_logs (medication_id)",
];

/// Create a connection pool for `database_url` and apply the schema.
///
/// A single connection is used for the whole pool: SQLite serializes
/// writers anyway, and it also keeps `sqlite::memory:` databases shared
/// between the schema step and later queries.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_pool_applies_schema() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        // All three tables should exist and be queryable.
        for table in ["medications", "dose_logs", "notes"] {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            sqlx::query(&sql).fetch_one(&pool).await.unwrap();
        }
    }
}
