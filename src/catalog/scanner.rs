//! Media scanner that registers files found on disk in the catalog.
//!
//! Walks the storage root, skipping hidden entries, and files every image,
//! audio and video file into its collection.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use walkdir::WalkDir;

use super::{CatalogRow, CollectionUri, SqliteCatalog};
use crate::model::{Category, CollectionSelector, FileRecord};
use crate::observability::spans;
use crate::Result;

/// Scan statistics.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub files_found: AtomicU64,
    pub media_registered: AtomicU64,
    pub files_skipped: AtomicU64,
    pub errors: AtomicU64,
}

impl ScanStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            files_found: self.files_found.load(Ordering::Relaxed),
            media_registered: self.media_registered.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scan stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanStatsSnapshot {
    pub files_found: u64,
    pub media_registered: u64,
    pub files_skipped: u64,
    pub errors: u64,
}

const fn selector_for(category: Category) -> Option<CollectionSelector> {
    match category {
        Category::Image => Some(CollectionSelector::Image),
        Category::Video => Some(CollectionSelector::Video),
        Category::Audio => Some(CollectionSelector::Audio),
        Category::Directory | Category::Text | Category::Other => None,
    }
}

/// Scan `root` and register media files.
///
/// `collection_uri` resolves the collection each media category is filed
/// under. Each collection is registered if needed and its content replaced
/// by what the walk found.
///
/// # Errors
///
/// Returns an error if the catalog rejects a write.
pub fn scan_media(
    root: &Path,
    catalog: &SqliteCatalog,
    collection_uri: impl Fn(CollectionSelector) -> CollectionUri,
) -> Result<ScanStatsSnapshot> {
    let _span = spans::scan_span(&root.display().to_string()).entered();
    let stats = ScanStats::new();
    let mut batches: HashMap<CollectionSelector, Vec<CatalogRow>> = HashMap::new();

    tracing::info!(path = %root.display(), "Starting media scan");

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    continue;
                }
                stats.files_found.fetch_add(1, Ordering::Relaxed);

                let metadata = match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        tracing::debug!(error = %e, "Skipping unreadable entry");
                        stats.errors.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };

                let record = FileRecord::from_entry(entry.path(), &metadata);
                let Some(selector) = selector_for(record.category) else {
                    stats.files_skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                };

                let title = entry
                    .path()
                    .file_stem()
                    .map_or_else(|| record.name.clone(), |s| s.to_string_lossy().into_owned());

                batches.entry(selector).or_default().push(CatalogRow {
                    data: record.path,
                    title,
                    size: record.size_bytes,
                    date_modified: record.modified_at_epoch_millis.div_euclid(1000),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error walking directory");
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // Every collection is rewritten so files deleted since the last scan drop out.
    for selector in [CollectionSelector::Image, CollectionSelector::Video, CollectionSelector::Audio] {
        let uri = collection_uri(selector);
        let rows = batches.remove(&selector).unwrap_or_default();
        catalog.register_collection(&uri)?;
        let written = catalog.replace_collection(&uri, &rows)?;
        stats
            .media_registered
            .fetch_add(written as u64, Ordering::Relaxed);
    }

    let snapshot = stats.snapshot();
    tracing::info!(
        path = %root.display(),
        found = snapshot.files_found,
        registered = snapshot.media_registered,
        skipped = snapshot.files_skipped,
        errors = snapshot.errors,
        "Media scan complete"
    );

    Ok(snapshot)
}

/// Async version of [`scan_media`].
///
/// # Errors
///
/// Returns an error if the scan fails or its task panics.
pub async fn scan_media_async<F>(
    root: &Path,
    catalog: &SqliteCatalog,
    collection_uri: F,
) -> Result<ScanStatsSnapshot>
where
    F: Fn(CollectionSelector) -> CollectionUri + Send + 'static,
{
    let root = root.to_path_buf();
    let catalog = catalog.clone();

    tokio::task::spawn_blocking(move || scan_media(&root, &catalog, collection_uri))
        .await
        .map_err(|e| crate::Error::internal(format!("Scan task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogQuery, MediaCatalog};
    use std::fs;
    use tempfile::TempDir;

    fn uri(selector: CollectionSelector) -> CollectionUri {
        CollectionUri::new(format!("test://{selector}"))
    }

    #[tokio::test]
    async fn test_scan_registers_media() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Music")).unwrap();
        fs::create_dir_all(tmp.path().join("DCIM/.thumbnails")).unwrap();
        fs::write(tmp.path().join("Music/one.mp3"), "x").unwrap();
        fs::write(tmp.path().join("DCIM/beach.jpg"), "x").unwrap();
        fs::write(tmp.path().join("DCIM/.thumbnails/beach.jpg"), "x").unwrap();
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let stats = scan_media_async(tmp.path(), &catalog, uri).await.unwrap();

        assert_eq!(stats.files_found, 3);
        assert_eq!(stats.media_registered, 2);
        assert_eq!(stats.files_skipped, 1);

        let audio = catalog
            .query(&CatalogQuery::all(uri(CollectionSelector::Audio)))
            .unwrap()
            .unwrap();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].title, "one");
        assert!(audio[0].data.ends_with("Music/one.mp3"));

        let images = catalog
            .query(&CatalogQuery::all(uri(CollectionSelector::Image)))
            .unwrap()
            .unwrap();
        assert_eq!(images.len(), 1);

        // No video found, but the collection is registered and empty.
        assert_eq!(
            catalog
                .query(&CatalogQuery::all(uri(CollectionSelector::Video)))
                .unwrap(),
            Some(Vec::new())
        );
    }

    #[tokio::test]
    async fn test_rescan_drops_deleted_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Music")).unwrap();
        fs::write(tmp.path().join("Music/one.mp3"), "x").unwrap();
        fs::write(tmp.path().join("Music/two.mp3"), "x").unwrap();

        let catalog = SqliteCatalog::open_in_memory().unwrap();
        scan_media_async(tmp.path(), &catalog, uri).await.unwrap();

        fs::remove_file(tmp.path().join("Music/one.mp3")).unwrap();
        let stats = scan_media_async(tmp.path(), &catalog, uri).await.unwrap();
        assert_eq!(stats.media_registered, 1);

        let audio = catalog
            .query(&CatalogQuery::all(uri(CollectionSelector::Audio)))
            .unwrap()
            .unwrap();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].title, "two");
    }
}
