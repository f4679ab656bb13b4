//! Recursive filename search over a directory subtree.
//!
//! The root's children are split into three contiguous segments which are
//! searched in parallel on the blocking pool. Results are joined in segment
//! order and then sorted by name, descending.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::folder::{list_children, read_record};
use crate::model::{FileRecord, Listing, QueryOutcome};

/// Position-based partition of a directory's children into three slices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySegmentSet {
    pub first: Vec<PathBuf>,
    pub second: Vec<PathBuf>,
    pub third: Vec<PathBuf>,
}

impl DirectorySegmentSet {
    /// Split `children` at `n/3` and `2n/3`.
    #[must_use]
    pub fn partition(mut children: Vec<PathBuf>) -> Self {
        let n = children.len();
        let third = children.split_off(2 * n / 3);
        let second = children.split_off(n / 3);
        Self {
            first: children,
            second,
            third,
        }
    }

    /// Partition the children of `dir`. Anything that is not a readable
    /// directory yields three empty segments.
    #[must_use]
    pub fn of_directory(dir: &Path) -> Self {
        if !dir.is_dir() {
            return Self::default();
        }
        match list_children(dir) {
            Ok(children) => Self::partition(children),
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "Search root not listable");
                Self::default()
            }
        }
    }

    /// Segments in join order.
    #[must_use]
    pub fn into_segments(self) -> [Vec<PathBuf>; 3] {
        [self.first, self.second, self.third]
    }
}

/// Depth-first search of one segment.
///
/// Every visited entry whose name contains `needle` (already lowercased) is
/// collected; directories are descended whether or not they match.
#[must_use]
pub fn search_segment(entries: &[PathBuf], needle: &str) -> Vec<FileRecord> {
    let mut found = Vec::new();
    for entry in entries {
        let walker = WalkDir::new(entry)
            .follow_links(false)
            .follow_root_links(false)
            .sort_by_file_name();
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::trace!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !item.file_name().to_string_lossy().to_lowercase().contains(needle) {
                continue;
            }
            // Same mapping as folder listings: symlinks are described by their
            // target, though the walk never descends through them.
            match read_record(item.path()) {
                Some(record) => found.push(record),
                None => tracing::trace!(path = %item.path().display(), "Entry vanished during search"),
            }
        }
    }
    found
}

/// Sort records by name, descending. Ties keep their join order.
pub fn sort_descending(records: &mut [FileRecord]) {
    records.sort_by(|a, b| b.name.cmp(&a.name));
}

/// Search the subtree below `root` for names containing `query`,
/// case-insensitively.
pub async fn search_tree(root: &Path, query: &str) -> Listing {
    let dir = root.to_path_buf();
    let segments = match tokio::task::spawn_blocking(move || DirectorySegmentSet::of_directory(&dir)).await {
        Ok(segments) => segments,
        Err(e) => return QueryOutcome::internal(format!("search task failed: {e}")),
    };

    let needle: Arc<str> = Arc::from(query.to_lowercase());
    let spawn_segment = |segment: Vec<PathBuf>| {
        let needle = Arc::clone(&needle);
        tokio::task::spawn_blocking(move || search_segment(&segment, &needle))
    };

    let [first, second, third] = segments.into_segments();
    let (first, second, third) = tokio::join!(
        spawn_segment(first),
        spawn_segment(second),
        spawn_segment(third)
    );

    match (first, second, third) {
        (Ok(mut found), Ok(second), Ok(third)) => {
            found.extend(second);
            found.extend(third);
            sort_descending(&mut found);
            tracing::debug!(root = %root.display(), matches = found.len(), "Search complete");
            QueryOutcome::success(found)
        }
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            QueryOutcome::internal(format!("search task failed: {e}"))
        }
    }
}
