//! Media catalog boundary.
//!
//! This module provides:
//! - The `MediaCatalog` trait consumed by the media query service
//! - A `SQLite`-backed catalog with change notifications
//! - A scanner that registers media files found on disk

mod scanner;
mod schema;
mod sqlite;

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use scanner::{scan_media, scan_media_async, ScanStats, ScanStatsSnapshot};
pub use schema::{migrate, SCHEMA_VERSION};
pub use sqlite::SqliteCatalog;

use crate::Result;

/// Column holding the absolute file path.
pub const COLUMN_DATA: &str = "_data";
/// Column holding the display title.
pub const COLUMN_TITLE: &str = "title";
/// Column holding the size in bytes.
pub const COLUMN_SIZE: &str = "_size";
/// Column holding the modification time in seconds.
pub const COLUMN_DATE_MODIFIED: &str = "date_modified";

/// Identifier of one media collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionUri(String);

impl CollectionUri {
    /// Wrap a URI string.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// The URI as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

/// One catalog row with the columns the mapper reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    /// `_data`: absolute path.
    pub data: String,
    /// `title`: display title.
    pub title: String,
    /// `_size`: length in bytes.
    pub size: u64,
    /// `date_modified`: seconds since the Unix epoch.
    pub date_modified: i64,
}

/// Parameters of one catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Collection to read.
    pub uri: CollectionUri,
    /// SQL selection clause with `?` placeholders.
    pub selection: Option<String>,
    /// Values bound to the selection placeholders, in order.
    pub selection_args: Vec<String>,
    /// SQL ordering clause.
    pub sort_order: Option<String>,
}

impl CatalogQuery {
    /// Every row of a collection in the catalog's natural order.
    #[must_use]
    pub const fn all(uri: CollectionUri) -> Self {
        Self {
            uri,
            selection: None,
            selection_args: Vec::new(),
            sort_order: None,
        }
    }

    /// Rows whose title contains `query` (case-insensitive), ordered by title.
    #[must_use]
    pub fn title_contains(uri: CollectionUri, query: &str) -> Self {
        Self {
            uri,
            selection: Some(format!("{COLUMN_TITLE} LIKE ?")),
            selection_args: vec![format!("%{query}%")],
            sort_order: Some(format!("{COLUMN_TITLE} ASC")),
        }
    }
}

/// Notification that something in a collection changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogChange {
    /// The collection that changed.
    pub uri: CollectionUri,
}

/// Indexed media catalog.
pub trait MediaCatalog: Send + Sync {
    /// Run a query.
    ///
    /// `Ok(None)` means the catalog produced no cursor for the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn query(&self, query: &CatalogQuery) -> Result<Option<Vec<CatalogRow>>>;

    /// Subscribe to change notifications for every collection.
    fn subscribe(&self) -> broadcast::Receiver<CatalogChange>;
}
