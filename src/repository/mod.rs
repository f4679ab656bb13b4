//! Unified storage repository.
//!
//! Routes folder, collection and search requests to the folder or media
//! query service and hands back a live [`QueryStream`].

mod paths;

use std::sync::Arc;

pub use paths::{PathProvider, StoragePaths, AUDIO_URI, IMAGES_URI, VIDEO_URI};

use crate::catalog::MediaCatalog;
use crate::model::{CollectionSelector, QueryOutcome, SearchFilter};
use crate::query::{FolderQueryService, MediaQueryService, QueryStream, StreamOptions};
use crate::Config;

/// Single entry point for every storage query.
#[derive(Clone)]
pub struct StorageRepository {
    folders: FolderQueryService,
    media: MediaQueryService,
    paths: Arc<dyn PathProvider>,
}

impl StorageRepository {
    /// Build a repository over the configured storage tree and `catalog`.
    pub fn new(config: &Config, catalog: Arc<dyn MediaCatalog>) -> Self {
        Self::with_paths(
            Arc::new(StoragePaths::from_config(config)),
            catalog,
            StreamOptions::from(config),
        )
    }

    /// Build a repository with custom path resolution.
    pub fn with_paths(
        paths: Arc<dyn PathProvider>,
        catalog: Arc<dyn MediaCatalog>,
        options: StreamOptions,
    ) -> Self {
        Self {
            folders: FolderQueryService::new(paths.root_path(), options),
            media: MediaQueryService::new(catalog, options),
            paths,
        }
    }

    /// Observe a search.
    ///
    /// An empty query emits an empty success once and starts no watcher.
    #[must_use]
    pub fn search(&self, query: &str, filter: SearchFilter) -> QueryStream {
        if query.is_empty() {
            return QueryStream::inert(QueryOutcome::success(Vec::new()));
        }

        tracing::debug!(query, ?filter, "Routing search");
        if let Some(selector) = filter.collection() {
            return self.media.search(query, &self.paths.collection_uri(selector));
        }
        let dir = if filter == SearchFilter::Downloads {
            self.paths.downloads_path()
        } else {
            self.paths.root_path()
        };
        self.folders.search(query, dir)
    }

    /// Observe the immediate children of `path`.
    #[must_use]
    pub fn get_folder(&self, path: &str, include_hidden: bool) -> QueryStream {
        self.folders.observe(path, include_hidden)
    }

    /// Observe every item of a media collection.
    #[must_use]
    pub fn get_collection(&self, selector: CollectionSelector) -> QueryStream {
        self.media.observe(&self.paths.collection_uri(selector))
    }
}

impl std::fmt::Debug for StorageRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRepository")
            .field("folders", &self.folders)
            .field("media", &self.media)
            .field("root", &self.paths.root_path())
            .finish()
    }
}
