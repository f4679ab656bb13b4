//! Request discriminators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which aggregate media collection to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSelector {
    Image,
    Video,
    Audio,
}

/// Which subsystem a search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    AllFiles,
    Downloads,
    Image,
    Audio,
    Video,
}

impl SearchFilter {
    /// The media collection this filter searches, if it is catalog-backed.
    #[must_use]
    pub const fn collection(self) -> Option<CollectionSelector> {
        match self {
            Self::AllFiles | Self::Downloads => None,
            Self::Image => Some(CollectionSelector::Image),
            Self::Audio => Some(CollectionSelector::Audio),
            Self::Video => Some(CollectionSelector::Video),
        }
    }
}

impl FromStr for CollectionSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" | "images" => Ok(Self::Image),
            "video" | "videos" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(format!("unknown collection '{other}'")),
        }
    }
}

impl FromStr for SearchFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "all_files" => Ok(Self::AllFiles),
            "downloads" => Ok(Self::Downloads),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown search filter '{other}'")),
        }
    }
}

impl fmt::Display for CollectionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        };
        f.write_str(s)
    }
}
