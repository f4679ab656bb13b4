//! Live queries against the media catalog.

use std::sync::Arc;

use super::observe::{blocking_fetch, spawn_observation};
use super::stream::QueryStream;
use super::StreamOptions;
use crate::catalog::{CatalogQuery, CollectionUri, MediaCatalog};
use crate::model::{FileRecord, Listing, QueryOutcome};
use crate::watcher::CatalogWatcher;

/// Collection listings and title searches, re-run on every catalog change.
#[derive(Clone)]
pub struct MediaQueryService {
    catalog: Arc<dyn MediaCatalog>,
    options: StreamOptions,
}

impl MediaQueryService {
    /// Create a service over `catalog`.
    pub fn new(catalog: Arc<dyn MediaCatalog>, options: StreamOptions) -> Self {
        Self { catalog, options }
    }

    /// Observe every row of a collection, in the catalog's natural order.
    #[must_use]
    pub fn observe(&self, uri: &CollectionUri) -> QueryStream {
        self.observe_query("collection", CatalogQuery::all(uri.clone()))
    }

    /// Observe rows whose title contains `query`, ordered by title.
    #[must_use]
    pub fn search(&self, query: &str, uri: &CollectionUri) -> QueryStream {
        self.observe_query("media-search", CatalogQuery::title_contains(uri.clone(), query))
    }

    fn observe_query(&self, kind: &'static str, query: CatalogQuery) -> QueryStream {
        let watcher_catalog = Arc::clone(&self.catalog);
        let fetch_catalog = Arc::clone(&self.catalog);
        let uri = query.uri.clone();

        spawn_observation(
            kind,
            uri.to_string(),
            move || CatalogWatcher::new(watcher_catalog, uri),
            blocking_fetch(move || run_query(fetch_catalog.as_ref(), &query)),
            self.options.channel_capacity,
        )
    }
}

/// Run one catalog query and map its rows.
#[must_use]
pub fn run_query(catalog: &dyn MediaCatalog, query: &CatalogQuery) -> Listing {
    match catalog.query(query) {
        Ok(Some(rows)) => QueryOutcome::success(rows.iter().map(FileRecord::from_catalog_row).collect()),
        Ok(None) => {
            tracing::warn!(uri = %query.uri, "Catalog returned no cursor");
            QueryOutcome::media_store_error()
        }
        Err(e) => {
            tracing::warn!(uri = %query.uri, error = %e, "Catalog query failed");
            QueryOutcome::media_store_error()
        }
    }
}

impl std::fmt::Debug for MediaQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaQueryService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogChange, CatalogRow, SqliteCatalog};
    use crate::model::{FailureKind, MEDIA_STORE_QUERY_ERROR};
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Catalog that never produces a cursor.
    struct NullCatalog {
        changes: broadcast::Sender<CatalogChange>,
    }

    impl MediaCatalog for NullCatalog {
        fn query(&self, _query: &CatalogQuery) -> crate::Result<Option<Vec<CatalogRow>>> {
            Ok(None)
        }

        fn subscribe(&self) -> broadcast::Receiver<CatalogChange> {
            self.changes.subscribe()
        }
    }

    /// Catalog whose queries always fail.
    struct BrokenCatalog {
        changes: broadcast::Sender<CatalogChange>,
    }

    impl MediaCatalog for BrokenCatalog {
        fn query(&self, _query: &CatalogQuery) -> crate::Result<Option<Vec<CatalogRow>>> {
            Err(crate::Error::internal("disk I/O error"))
        }

        fn subscribe(&self) -> broadcast::Receiver<CatalogChange> {
            self.changes.subscribe()
        }
    }

    fn uri() -> CollectionUri {
        CollectionUri::from("content://media/external/audio/media")
    }

    #[test]
    fn test_null_cursor_is_internal_failure() {
        let (changes, _) = broadcast::channel(4);
        let catalog = NullCatalog { changes };
        let outcome = run_query(&catalog, &CatalogQuery::all(uri()));
        assert_eq!(
            outcome,
            QueryOutcome::Failure {
                kind: FailureKind::Internal,
                message: MEDIA_STORE_QUERY_ERROR.to_string(),
            }
        );
    }

    #[test]
    fn test_query_error_is_internal_failure() {
        let (changes, _) = broadcast::channel(4);
        let catalog = BrokenCatalog { changes };
        let outcome = run_query(&catalog, &CatalogQuery::title_contains(uri(), "x"));
        assert_eq!(outcome, QueryOutcome::media_store_error());
    }

    #[tokio::test]
    async fn test_search_re_emits_on_catalog_change() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.register_collection(&uri()).unwrap();
        let service = MediaQueryService::new(Arc::new(catalog.clone()), StreamOptions::default());

        let mut stream = service.search("one", &uri());
        let first = tokio::time::timeout(Duration::from_secs(2), stream.recv()).await.unwrap().unwrap();
        assert_eq!(first, QueryOutcome::success(Vec::new()));

        catalog
            .insert(
                &uri(),
                &CatalogRow {
                    data: "/Music/one.mp3".to_string(),
                    title: "One".to_string(),
                    size: 3,
                    date_modified: 10,
                },
            )
            .unwrap();

        let second = tokio::time::timeout(Duration::from_secs(2), stream.recv()).await.unwrap().unwrap();
        let records = second.into_value().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "One");
        assert_eq!(records[0].format, "mp3");

        stream.close().await;
    }
}
