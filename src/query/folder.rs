//! Folder listings and recursive search over the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;

use super::observe::{blocking_fetch, spawn_observation, Fetch};
use super::search::search_tree;
use super::stream::QueryStream;
use super::StreamOptions;
use crate::model::{FileRecord, Listing, QueryOutcome};
use crate::watcher::{DirectoryWatcher, WatchScope};

/// Live listings of single directories, and live recursive searches.
#[derive(Debug, Clone)]
pub struct FolderQueryService {
    storage_root: PathBuf,
    options: StreamOptions,
}

impl FolderQueryService {
    /// Create a service whose searches are retriggered by changes anywhere
    /// under `storage_root`.
    pub fn new(storage_root: impl Into<PathBuf>, options: StreamOptions) -> Self {
        Self {
            storage_root: storage_root.into(),
            options,
        }
    }

    /// Observe the immediate children of `path`.
    ///
    /// An empty path emits an empty success once and attaches no watcher.
    #[must_use]
    pub fn observe(&self, path: &str, include_hidden: bool) -> QueryStream {
        if path.is_empty() {
            return QueryStream::inert(QueryOutcome::success(Vec::new()));
        }

        let dir = path.to_string();
        let watch_root = PathBuf::from(path);
        let debounce = self.options.watch_debounce;

        spawn_observation(
            "folder",
            dir.clone(),
            move || DirectoryWatcher::new(watch_root, WatchScope::Directory, debounce),
            blocking_fetch(move || list_folder(&dir, include_hidden)),
            self.options.channel_capacity,
        )
    }

    /// Observe a recursive name search below `dir`.
    ///
    /// The search re-runs on any change under the storage root.
    #[must_use]
    pub fn search(&self, query: &str, dir: &Path) -> QueryStream {
        let query: Arc<str> = Arc::from(query);
        let dir = dir.to_path_buf();
        let storage_root = self.storage_root.clone();
        let debounce = self.options.watch_debounce;

        let target = dir.display().to_string();
        let fetch: Fetch = Arc::new(move || {
            let query = Arc::clone(&query);
            let dir = dir.clone();
            async move { search_tree(&dir, &query).await }.boxed()
        });

        spawn_observation(
            "search",
            target,
            move || DirectoryWatcher::new(storage_root, WatchScope::Tree, debounce),
            fetch,
            self.options.channel_capacity,
        )
    }
}

/// One snapshot of a directory's children.
#[must_use]
pub fn list_folder(path: &str, include_hidden: bool) -> Listing {
    let dir = Path::new(path);
    if !dir.is_dir() {
        return QueryOutcome::non_existing_dir(path);
    }
    listing_outcome(path, list_children(dir), include_hidden)
}

fn listing_outcome(path: &str, children: io::Result<Vec<PathBuf>>, include_hidden: bool) -> Listing {
    match children {
        Ok(children) => {
            let records = children
                .iter()
                .filter_map(|child| read_record(child))
                .filter(|record| include_hidden || !record.is_hidden())
                .collect();
            QueryOutcome::success(records)
        }
        Err(e) => {
            tracing::warn!(path, error = %e, "Directory listing failed");
            QueryOutcome::access_denied(path)
        }
    }
}

/// Immediate children of `dir`, sorted by file name.
pub(crate) fn list_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}

/// Map one path, following symlinks where possible. Entries that vanished
/// since listing are skipped.
pub(crate) fn read_record(path: &Path) -> Option<FileRecord> {
    fs::metadata(path)
        .or_else(|_| fs::symlink_metadata(path))
        .ok()
        .map(|metadata| FileRecord::from_entry(path, &metadata))
}
