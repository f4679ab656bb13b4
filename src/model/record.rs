//! Unified file record and the mappers that produce it.

use std::fs::Metadata;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::category::{classify, classify_extension, extension_of, Category};
use crate::catalog::CatalogRow;

/// Canonical representation of a file, whether listed from the filesystem or
/// read from the media catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path. Identity key within one root.
    pub path: String,

    /// Display name.
    pub name: String,

    /// Coarse type derived from the extension.
    pub category: Category,

    /// Length in bytes.
    pub size_bytes: u64,

    /// Lowercase extension without the dot, possibly empty.
    pub format: String,

    /// Last modification time in milliseconds since the Unix epoch.
    pub modified_at_epoch_millis: i64,
}

impl FileRecord {
    /// Map a filesystem entry.
    #[must_use]
    pub fn from_entry(path: &Path, metadata: &Metadata) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let is_dir = metadata.is_dir();
        let modified_at_epoch_millis = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or(0);

        Self {
            path: path.to_string_lossy().into_owned(),
            category: classify(&name, is_dir),
            format: if is_dir {
                String::new()
            } else {
                extension_of(&name).to_lowercase()
            },
            size_bytes: metadata.len(),
            modified_at_epoch_millis,
            name,
        }
    }

    /// Map a media catalog row.
    ///
    /// The format comes from the data path's last segment after the final dot;
    /// the display name is the catalog title.
    #[must_use]
    pub fn from_catalog_row(row: &CatalogRow) -> Self {
        let file_name = row.data.rsplit('/').next().unwrap_or_default();
        let ext = extension_of(file_name);

        Self {
            path: row.data.clone(),
            name: row.title.clone(),
            category: classify_extension(ext),
            size_bytes: row.size,
            format: ext.to_lowercase(),
            modified_at_epoch_millis: row.date_modified.saturating_mul(1000),
        }
    }

    /// Whether both records denote the same entity.
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        self.path == other.path
    }

    /// Whether this is a directory.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.category == Category::Directory
    }

    /// Whether the underlying entry is hidden (dot-prefixed name).
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        Path::new(&self.path)
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'))
    }

    /// Modification time as a UTC timestamp.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.modified_at_epoch_millis).single()
    }
}
