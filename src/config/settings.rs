//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet period used to coalesce bursts of filesystem events.
pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Upper bound for the watch debounce.
const MAX_WATCH_DEBOUNCE: Duration = Duration::from_secs(10);

/// Main configuration for the storage query engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the external storage tree; search scope for "all files".
    pub root_path: PathBuf,

    /// Downloads directory; search scope for the downloads filter.
    pub downloads_path: PathBuf,

    /// Directory holding the media catalog database.
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Quiet period before a burst of filesystem events raises one signal.
    pub watch_debounce: Duration,

    /// Number of undelivered emissions buffered per subscription.
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let root_path = PathBuf::from("/storage/emulated/0");
        Self {
            downloads_path: root_path.join("Download"),
            root_path,
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            watch_debounce: DEFAULT_WATCH_DEBOUNCE,
            channel_capacity: 16,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration rooted at `root`, with downloads at `root/Download`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root_path = root.into();
        Self {
            downloads_path: root_path.join("Download"),
            root_path,
            ..Self::default()
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.root_path.as_os_str().is_empty() {
            return Err(Error::config("root_path cannot be empty"));
        }

        if self.downloads_path.as_os_str().is_empty() {
            return Err(Error::config("downloads_path cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.watch_debounce > MAX_WATCH_DEBOUNCE {
            return Err(Error::config(format!(
                "watch_debounce cannot exceed {}s",
                MAX_WATCH_DEBOUNCE.as_secs()
            )));
        }

        if self.channel_capacity == 0 || self.channel_capacity > 1024 {
            return Err(Error::config("channel_capacity must be between 1 and 1024"));
        }

        Ok(())
    }

    /// Get the path to the media catalog database file.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.db")
    }
}
