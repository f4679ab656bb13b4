//! Storage locations and collection identifiers.

use std::path::{Path, PathBuf};

use crate::catalog::CollectionUri;
use crate::model::CollectionSelector;
use crate::Config;

/// Catalog identifier of the external images collection.
pub const IMAGES_URI: &str = "content://media/external/images/media";
/// Catalog identifier of the external video collection.
pub const VIDEO_URI: &str = "content://media/external/video/media";
/// Catalog identifier of the external audio collection.
pub const AUDIO_URI: &str = "content://media/external/audio/media";

/// Resolves the locations the repository queries against.
pub trait PathProvider: Send + Sync {
    /// Root of the external storage tree.
    fn root_path(&self) -> &Path;

    /// The downloads directory.
    fn downloads_path(&self) -> &Path;

    /// Catalog identifier of a media collection.
    fn collection_uri(&self, selector: CollectionSelector) -> CollectionUri;
}

/// Standard external-storage locations and media collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
    downloads: PathBuf,
}

impl StoragePaths {
    /// Paths with an explicit root and downloads directory.
    pub fn new(root: impl Into<PathBuf>, downloads: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            downloads: downloads.into(),
        }
    }

    /// Paths taken from a configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.root_path, &config.downloads_path)
    }

    /// Collection identifier for `selector`.
    #[must_use]
    pub fn media_collection(selector: CollectionSelector) -> CollectionUri {
        let uri = match selector {
            CollectionSelector::Image => IMAGES_URI,
            CollectionSelector::Video => VIDEO_URI,
            CollectionSelector::Audio => AUDIO_URI,
        };
        CollectionUri::from(uri)
    }
}

impl PathProvider for StoragePaths {
    fn root_path(&self) -> &Path {
        &self.root
    }

    fn downloads_path(&self) -> &Path {
        &self.downloads
    }

    fn collection_uri(&self, selector: CollectionSelector) -> CollectionUri {
        Self::media_collection(selector)
    }
}
