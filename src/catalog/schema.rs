//! Catalog schema definitions and migrations.

use rusqlite::Connection;

use crate::error::CatalogError;
use crate::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if migrations fail.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| CatalogError::Migration(format!("failed to create migrations table: {e}")))?;

    let current_version = get_current_version(conn)?;
    tracing::debug!(
        current = current_version,
        target = SCHEMA_VERSION,
        "Checking catalog migrations"
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| CatalogError::Migration(format!("failed to get version: {e}")).into())
}

fn record_migration(conn: &Connection, version: i32) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)",
        rusqlite::params![version, now],
    )
    .map_err(|e| CatalogError::Migration(format!("failed to record migration: {e}")))?;

    Ok(())
}

/// Migration v1: collections and media rows.
fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Applying catalog migration v1");

    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS collections (
            uri TEXT PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS media (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL REFERENCES collections(uri),
            _data TEXT NOT NULL,
            title TEXT NOT NULL,
            _size INTEGER NOT NULL,
            date_modified INTEGER NOT NULL,
            UNIQUE(collection, _data)
        );

        CREATE INDEX IF NOT EXISTS idx_media_collection ON media(collection);
        CREATE INDEX IF NOT EXISTS idx_media_title ON media(title);
        ",
    )
    .map_err(|e| CatalogError::Migration(format!("v1 migration failed: {e}")))?;

    record_migration(conn, 1)?;
    Ok(())
}
