//! Change watching for the filesystem and the media catalog.
//!
//! This module provides:
//! - The `ChangeObserver` start/stop contract shared by all watchers
//! - A payload-free, coalescing change signal
//! - A filesystem watcher built on notify-rs
//! - A media catalog watcher built on catalog change broadcasts

mod catalog;
mod directory;
mod events;

pub use catalog::CatalogWatcher;
pub use directory::{DirectoryWatcher, WatchScope};
pub use events::{ChangeKind, ChangeSignal, SignalSender};

use crate::Result;

/// Start/stop contract of a change watcher.
///
/// Both operations are idempotent. Stopping releases every watch resource and
/// is safe on a watcher that was never started.
pub trait ChangeObserver: Send {
    /// Begin delivering change signals.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be established.
    fn start_observing(&mut self) -> Result<()>;

    /// Release all watch resources.
    fn stop_observing(&mut self);

    /// Whether the watcher is currently attached.
    fn is_observing(&self) -> bool;
}
