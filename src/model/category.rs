//! Coarse file-type classification by extension.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Coarse file-type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Directory,
    Image,
    Video,
    Audio,
    Text,
    Other,
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif", "svg", "ico", "tiff",
];

// "TS" is an uppercase-only entry; lookups are case-sensitive.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "webm", "3gp", "avi", "mov", "flv", "wmv", "m4v", "TS",
];

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "ogg", "flac", "aac", "m4a", "wma", "amr", "opus", "mid", "midi",
];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "log", "csv", "json", "xml", "html", "htm", "rtf", "ini", "conf",
];

static EXTENSION_TABLE: Lazy<HashMap<&'static str, Category>> = Lazy::new(|| {
    let groups = [
        (IMAGE_EXTENSIONS, Category::Image),
        (VIDEO_EXTENSIONS, Category::Video),
        (AUDIO_EXTENSIONS, Category::Audio),
        (TEXT_EXTENSIONS, Category::Text),
    ];
    groups
        .iter()
        .flat_map(|(exts, category)| exts.iter().map(move |ext| (*ext, *category)))
        .collect()
});

/// Extension of a file name: everything after the last `.`, or empty.
#[must_use]
pub fn extension_of(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

/// Classify a bare extension (without the dot). Matching is case-sensitive.
#[must_use]
pub fn classify_extension(ext: &str) -> Category {
    EXTENSION_TABLE.get(ext).copied().unwrap_or(Category::Other)
}

/// Classify an entry by name. Directories always map to [`Category::Directory`].
#[must_use]
pub fn classify(name: &str, is_dir: bool) -> Category {
    if is_dir {
        return Category::Directory;
    }
    classify_extension(extension_of(name))
}

impl Category {
    /// Whether this category is served by a media collection.
    #[must_use]
    pub const fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio)
    }
}
