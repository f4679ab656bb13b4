//! Integration tests for the storage repository.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use filescope::catalog::{CatalogChange, CatalogQuery, CatalogRow, MediaCatalog, SqliteCatalog};
use filescope::model::{FailureKind, MEDIA_STORE_QUERY_ERROR};
use filescope::repository::StoragePaths;
use filescope::{
    CollectionSelector, Config, Listing, QueryOutcome, QueryStream, SearchFilter, StorageRepository,
};
use tempfile::TempDir;
use tokio::sync::broadcast;

/// Catalog that never produces a cursor.
struct NullCatalog {
    changes: broadcast::Sender<CatalogChange>,
}

impl NullCatalog {
    fn new() -> Self {
        let (changes, _) = broadcast::channel(4);
        Self { changes }
    }
}

impl MediaCatalog for NullCatalog {
    fn query(&self, _query: &CatalogQuery) -> filescope::Result<Option<Vec<CatalogRow>>> {
        Ok(None)
    }

    fn subscribe(&self) -> broadcast::Receiver<CatalogChange> {
        self.changes.subscribe()
    }
}

fn config(root: &Path) -> Config {
    Config {
        watch_debounce: Duration::from_millis(50),
        ..Config::with_root(root)
    }
}

fn repository(root: &Path) -> (StorageRepository, SqliteCatalog) {
    let catalog = SqliteCatalog::open_in_memory().unwrap();
    for selector in [CollectionSelector::Image, CollectionSelector::Video, CollectionSelector::Audio] {
        catalog
            .register_collection(&StoragePaths::media_collection(selector))
            .unwrap();
    }
    let repo = StorageRepository::new(&config(root), Arc::new(catalog.clone()));
    (repo, catalog)
}

async fn next(stream: &mut QueryStream) -> Listing {
    tokio::time::timeout(Duration::from_secs(5), stream.recv())
        .await
        .expect("emission timed out")
        .expect("stream ended")
}

async fn quiet(stream: &mut QueryStream, window: Duration) -> bool {
    tokio::time::timeout(window, stream.recv()).await.is_err()
}

fn names(listing: Listing) -> Vec<String> {
    listing
        .into_value()
        .expect("expected success")
        .into_iter()
        .map(|r| r.name)
        .collect()
}

/// Music and image files, a couple of which mention "meta".
fn music_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir(tmp.path().join("Music")).unwrap();
    fs::create_dir(tmp.path().join("Image")).unwrap();
    fs::write(tmp.path().join("Music/metallica - what if.mp3"), "x").unwrap();
    fs::write(tmp.path().join("Music/megadeath.mp3"), "x").unwrap();
    fs::write(tmp.path().join("Image/black_album_metallica.jpeg"), "x").unwrap();
    fs::write(tmp.path().join("Image/nirvana.mpeg"), "x").unwrap();
    tmp
}

#[tokio::test]
async fn test_search_all_files_sorted_descending() {
    let tmp = music_fixture();
    let (repo, _catalog) = repository(tmp.path());

    let mut stream = repo.search("meta", SearchFilter::AllFiles);
    // Search results are sorted by name, descending, after the segment join:
    // "metallica - what if.mp3" > "black_album_metallica.jpeg".
    assert_eq!(
        names(next(&mut stream).await),
        vec!["metallica - what if.mp3", "black_album_metallica.jpeg"]
    );
    stream.close().await;
}

#[tokio::test]
async fn test_search_downloads_is_scoped() {
    let tmp = music_fixture();
    fs::create_dir(tmp.path().join("Download")).unwrap();
    fs::write(tmp.path().join("Download/metadata.json"), "{}").unwrap();
    let (repo, _catalog) = repository(tmp.path());

    let mut stream = repo.search("meta", SearchFilter::Downloads);
    assert_eq!(names(next(&mut stream).await), vec!["metadata.json"]);
    stream.close().await;
}

#[tokio::test]
async fn test_folder_not_a_directory() {
    let tmp = music_fixture();
    let (repo, _catalog) = repository(tmp.path());
    let file = tmp.path().join("Music/megadeath.mp3");
    let path = file.to_string_lossy().into_owned();

    let mut stream = repo.get_folder(&path, false);
    assert_eq!(
        next(&mut stream).await,
        QueryOutcome::Failure {
            kind: FailureKind::NonExistingDir,
            message: format!("Dir not existing: {path}"),
        }
    );
    stream.close().await;
}

#[tokio::test]
async fn test_null_cursor_for_search_and_collection() {
    let tmp = TempDir::new().unwrap();
    let repo = StorageRepository::new(&config(tmp.path()), Arc::new(NullCatalog::new()));
    let expected = QueryOutcome::Failure {
        kind: FailureKind::Internal,
        message: MEDIA_STORE_QUERY_ERROR.to_string(),
    };

    let mut search = repo.search("x", SearchFilter::Audio);
    assert_eq!(next(&mut search).await, expected);
    search.close().await;

    let mut collection = repo.get_collection(CollectionSelector::Image);
    assert_eq!(next(&mut collection).await, expected);
    collection.close().await;
}

#[tokio::test]
async fn test_empty_query_and_empty_path_short_circuit() {
    let tmp = music_fixture();
    let (repo, _catalog) = repository(tmp.path());

    for filter in [SearchFilter::AllFiles, SearchFilter::Video] {
        let mut stream = repo.search("", filter);
        assert_eq!(next(&mut stream).await, QueryOutcome::success(Vec::new()));
        assert!(quiet(&mut stream, Duration::from_millis(100)).await);
    }

    let mut stream = repo.get_folder("", true);
    assert_eq!(next(&mut stream).await, QueryOutcome::success(Vec::new()));
    assert!(quiet(&mut stream, Duration::from_millis(100)).await);
}

#[tokio::test]
async fn test_folder_hidden_filter() {
    let tmp = music_fixture();
    fs::write(tmp.path().join(".nomedia"), "").unwrap();
    let (repo, _catalog) = repository(tmp.path());
    let root = tmp.path().to_string_lossy().into_owned();

    let mut visible = repo.get_folder(&root, false);
    assert_eq!(names(next(&mut visible).await), vec!["Image", "Music"]);
    visible.close().await;

    let mut all = repo.get_folder(&root, true);
    assert_eq!(names(next(&mut all).await), vec![".nomedia", "Image", "Music"]);
    all.close().await;
}

#[tokio::test]
async fn test_folder_re_emits_after_change() {
    let tmp = music_fixture();
    let (repo, _catalog) = repository(tmp.path());
    let music = tmp.path().join("Music").to_string_lossy().into_owned();

    let mut stream = repo.get_folder(&music, false);
    assert_eq!(names(next(&mut stream).await).len(), 2);

    fs::write(tmp.path().join("Music/one.mp3"), "x").unwrap();
    assert_eq!(
        names(next(&mut stream).await),
        vec!["megadeath.mp3", "metallica - what if.mp3", "one.mp3"]
    );
    // One change, one re-emission.
    assert!(quiet(&mut stream, Duration::from_millis(500)).await);
    stream.close().await;
}

#[tokio::test]
async fn test_search_re_emits_on_nested_change() {
    let tmp = music_fixture();
    let (repo, _catalog) = repository(tmp.path());

    let mut stream = repo.search("meta", SearchFilter::AllFiles);
    assert_eq!(names(next(&mut stream).await).len(), 2);

    fs::write(tmp.path().join("Image/meta.png"), "x").unwrap();
    assert_eq!(
        names(next(&mut stream).await),
        vec!["metallica - what if.mp3", "meta.png", "black_album_metallica.jpeg"]
    );
    stream.close().await;
}

#[tokio::test]
async fn test_directory_created_later_is_not_watched() {
    let tmp = music_fixture();
    let (repo, _catalog) = repository(tmp.path());

    let mut stream = repo.search("later", SearchFilter::AllFiles);
    assert!(names(next(&mut stream).await).is_empty());

    // The new directory's creation is seen by its watched parent...
    fs::create_dir(tmp.path().join("Later")).unwrap();
    assert_eq!(names(next(&mut stream).await), vec!["Later"]);

    // ...but nothing inside it is.
    fs::write(tmp.path().join("Later/later.txt"), "x").unwrap();
    assert!(quiet(&mut stream, Duration::from_millis(500)).await);
    stream.close().await;
}

#[tokio::test]
async fn test_collection_re_emits_on_catalog_change() {
    let tmp = TempDir::new().unwrap();
    let (repo, catalog) = repository(tmp.path());
    let audio = StoragePaths::media_collection(CollectionSelector::Audio);

    let mut stream = repo.get_collection(CollectionSelector::Audio);
    assert_eq!(next(&mut stream).await, QueryOutcome::success(Vec::new()));

    catalog
        .insert(
            &audio,
            &CatalogRow {
                data: "/storage/emulated/0/Music/one.mp3".to_string(),
                title: "One".to_string(),
                size: 1024,
                date_modified: 1_700_000_000,
            },
        )
        .unwrap();

    let records = next(&mut stream).await.into_value().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "One");
    assert_eq!(records[0].modified_at_epoch_millis, 1_700_000_000_000);
    stream.close().await;
}

#[tokio::test]
async fn test_cancel_ends_stream() {
    let tmp = music_fixture();
    let (repo, _catalog) = repository(tmp.path());
    let music = tmp.path().join("Music").to_string_lossy().into_owned();

    let mut cancelled = repo.get_folder(&music, false);
    let mut live = repo.get_folder(&music, false);
    next(&mut cancelled).await;
    next(&mut live).await;

    cancelled.cancel();
    assert!(cancelled.is_cancelled());
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while cancelled.recv().await.is_some() {}
    })
    .await;
    assert!(ended.is_ok());

    fs::write(tmp.path().join("Music/two.mp3"), "x").unwrap();
    assert_eq!(names(next(&mut live).await).len(), 3);
    live.close().await;
}
