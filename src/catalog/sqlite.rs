//! `SQLite`-backed media catalog.
//!
//! One connection per catalog, shared behind a mutex. Writes to a collection
//! run in a single transaction and broadcast one [`CatalogChange`] when any
//! row was touched.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use tokio::sync::broadcast;

use super::schema::migrate;
use super::{
    CatalogChange, CatalogQuery, CatalogRow, CollectionUri, MediaCatalog, COLUMN_DATA,
    COLUMN_DATE_MODIFIED, COLUMN_SIZE, COLUMN_TITLE,
};
use crate::error::CatalogError;
use crate::Result;

/// Buffered change notifications per subscriber.
const CHANGE_CAPACITY: usize = 64;

/// Media catalog stored in `SQLite`.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
    location: Arc<str>,
    changes: broadcast::Sender<CatalogChange>,
}

impl SqliteCatalog {
    /// Open or create a catalog file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| CatalogError::Database(format!("failed to open catalog: {e}")))?;
        // Scans write while live queries read.
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(CatalogError::from)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(CatalogError::from)?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "Catalog file opened");

        Self::from_connection(conn, &path.display().to_string())
    }

    /// Open an in-memory catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CatalogError::Database(format!("failed to open catalog: {e}")))?;
        Self::from_connection(conn, ":memory:")
    }

    fn from_connection(conn: Connection, location: &str) -> Result<Self> {
        migrate(&conn)?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Arc::from(location),
            changes,
        })
    }

    /// Where the catalog lives: a file path or `:memory:`.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Make a collection URI known to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn register_collection(&self, uri: &CollectionUri) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT OR IGNORE INTO collections (uri) VALUES (?)",
                [uri.as_str()],
            )
            .map_err(CatalogError::from)?;
        Ok(())
    }

    /// Insert or replace a row, keyed by its data path.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is unknown or the write fails.
    pub fn insert(&self, uri: &CollectionUri, row: &CatalogRow) -> Result<()> {
        self.insert_batch(uri, std::slice::from_ref(row)).map(|_| ())
    }

    /// Insert or replace many rows in one transaction, notifying once.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is unknown or the write fails.
    pub fn insert_batch(&self, uri: &CollectionUri, rows: &[CatalogRow]) -> Result<usize> {
        self.mutate(uri, |tx| {
            let written = insert_rows(tx, uri, rows)?;
            Ok((written, written))
        })
    }

    /// Replace the whole content of a collection with `rows`.
    ///
    /// Rows whose path is absent from `rows` are dropped. Subscribers see a
    /// single change.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is unknown or the write fails.
    pub fn replace_collection(&self, uri: &CollectionUri, rows: &[CatalogRow]) -> Result<usize> {
        self.mutate(uri, |tx| {
            let removed = delete_rows(tx, uri)?;
            let written = insert_rows(tx, uri, rows)?;
            Ok((written, removed + written))
        })
    }

    /// Remove the row with the given data path. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is unknown or the write fails.
    pub fn remove(&self, uri: &CollectionUri, data: &str) -> Result<bool> {
        self.mutate(uri, |tx| {
            let removed = tx
                .execute(
                    &format!("DELETE FROM media WHERE collection = ? AND {COLUMN_DATA} = ?"),
                    [uri.as_str(), data],
                )
                .map_err(CatalogError::from)?;
            Ok((removed > 0, removed))
        })
    }

    /// Remove every row of a collection. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is unknown or the write fails.
    pub fn clear_collection(&self, uri: &CollectionUri) -> Result<usize> {
        self.mutate(uri, |tx| {
            let removed = delete_rows(tx, uri)?;
            Ok((removed, removed))
        })
    }

    /// Broadcast a change for `uri`.
    pub fn notify_change(&self, uri: &CollectionUri) {
        // No subscribers is fine.
        let _ = self.changes.send(CatalogChange { uri: uri.clone() });
    }

    /// Run `write` against one collection inside a transaction.
    ///
    /// `write` returns its result and the number of rows it touched; a
    /// non-zero count broadcasts one change after commit. Dropping the
    /// transaction on error rolls it back.
    fn mutate<T, F>(&self, uri: &CollectionUri, write: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<(T, usize)>,
    {
        let (result, touched) = {
            let mut conn = self.conn.lock();
            let tx = conn.transaction().map_err(CatalogError::from)?;
            ensure_collection(&tx, uri)?;
            let outcome = write(&tx)?;
            tx.commit().map_err(CatalogError::from)?;
            outcome
        };

        if touched > 0 {
            tracing::trace!(%uri, touched, "Catalog collection changed");
            self.notify_change(uri);
        }
        Ok(result)
    }

    fn fetch(&self, query: &CatalogQuery) -> Result<Option<Vec<CatalogRow>>> {
        let conn = self.conn.lock();
        if !has_collection(&conn, &query.uri)? {
            tracing::debug!(uri = %query.uri, "Query against unknown collection");
            return Ok(None);
        }

        let mut sql = format!(
            "SELECT {COLUMN_DATA}, {COLUMN_TITLE}, {COLUMN_SIZE}, {COLUMN_DATE_MODIFIED} \
             FROM media WHERE collection = ?"
        );
        if let Some(selection) = &query.selection {
            sql.push_str(&format!(" AND ({selection})"));
        }
        if let Some(sort) = &query.sort_order {
            sql.push_str(&format!(" ORDER BY {sort}"));
        }

        let mut stmt = conn.prepare(&sql).map_err(CatalogError::from)?;
        let args = std::iter::once(query.uri.as_str())
            .chain(query.selection_args.iter().map(String::as_str));

        let rows = stmt
            .query_map(params_from_iter(args), |row| {
                let size: i64 = row.get(2)?;
                Ok(CatalogRow {
                    data: row.get(0)?,
                    title: row.get(1)?,
                    size: u64::try_from(size).unwrap_or_default(),
                    date_modified: row.get(3)?,
                })
            })
            .map_err(CatalogError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CatalogError::from)?;

        Ok(Some(rows))
    }
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("location", &self.location)
            .field("subscribers", &self.changes.receiver_count())
            .finish()
    }
}

impl MediaCatalog for SqliteCatalog {
    fn query(&self, query: &CatalogQuery) -> Result<Option<Vec<CatalogRow>>> {
        self.fetch(query)
    }

    fn subscribe(&self) -> broadcast::Receiver<CatalogChange> {
        self.changes.subscribe()
    }
}

fn has_collection(conn: &Connection, uri: &CollectionUri) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM collections WHERE uri = ?",
            [uri.as_str()],
            |_| Ok(()),
        )
        .optional()
        .map_err(CatalogError::from)?;
    Ok(found.is_some())
}

fn insert_rows(conn: &Connection, uri: &CollectionUri, rows: &[CatalogRow]) -> Result<usize> {
    let mut stmt = conn
        .prepare(&format!(
            "INSERT OR REPLACE INTO media \
             (collection, {COLUMN_DATA}, {COLUMN_TITLE}, {COLUMN_SIZE}, {COLUMN_DATE_MODIFIED}) \
             VALUES (?, ?, ?, ?, ?)"
        ))
        .map_err(CatalogError::from)?;

    for row in rows {
        stmt.execute(params![
            uri.as_str(),
            row.data,
            row.title,
            i64::try_from(row.size).unwrap_or(i64::MAX),
            row.date_modified,
        ])
        .map_err(CatalogError::from)?;
    }
    Ok(rows.len())
}

fn delete_rows(conn: &Connection, uri: &CollectionUri) -> Result<usize> {
    let removed = conn
        .execute("DELETE FROM media WHERE collection = ?", [uri.as_str()])
        .map_err(CatalogError::from)?;
    Ok(removed)
}

fn ensure_collection(conn: &Connection, uri: &CollectionUri) -> Result<()> {
    if has_collection(conn, uri)? {
        Ok(())
    } else {
        Err(CatalogError::UnknownCollection(uri.to_string()).into())
    }
}
