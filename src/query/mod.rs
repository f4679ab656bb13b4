//! Live query services.
//!
//! Every query returns a [`QueryStream`]: an initial snapshot followed by a
//! fresh emission whenever the underlying watcher signals a change.

mod folder;
mod media;
mod observe;
mod search;
mod stream;

use std::time::Duration;

pub use folder::{list_folder, FolderQueryService};
pub use media::{run_query, MediaQueryService};
pub use observe::{blocking_fetch, spawn_observation, Fetch};
pub use search::{search_segment, search_tree, sort_descending, DirectorySegmentSet};
pub use stream::QueryStream;

use crate::config::{Config, DEFAULT_WATCH_DEBOUNCE};

/// Per-subscription stream settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Quiet period before a burst of filesystem events raises one signal.
    pub watch_debounce: Duration,
    /// Buffered emissions per subscription.
    pub channel_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
            channel_capacity: 16,
        }
    }
}

impl From<&Config> for StreamOptions {
    fn from(config: &Config) -> Self {
        Self {
            watch_debounce: config.watch_debounce,
            channel_capacity: config.channel_capacity,
        }
    }
}
