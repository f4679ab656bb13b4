//! Filesystem change watcher using notify-rs.
//!
//! Watches are attached per directory node, non-recursively, for every
//! directory that exists when the watcher is constructed. Directories created
//! afterwards are not picked up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use walkdir::WalkDir;

use super::events::{ChangeKind, ChangeSignal, SignalSender};
use super::ChangeObserver;
use crate::error::WatcherError;
use crate::Result;

/// How much of the tree below the root is watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchScope {
    /// Only the root directory itself.
    Directory,
    /// The root and every directory below it.
    Tree,
}

/// Live notify registration plus the task that turns raw events into signals.
struct ActiveWatch {
    _watcher: RecommendedWatcher,
    forwarder: JoinHandle<()>,
}

/// Filesystem watcher raising a payload-free signal per burst of changes.
pub struct DirectoryWatcher {
    root: PathBuf,
    targets: Vec<PathBuf>,
    debounce: Duration,
    signal_tx: SignalSender,
    active: Option<ActiveWatch>,
}

impl DirectoryWatcher {
    /// Create a watcher for `root`.
    ///
    /// The set of watched directories is captured here. A missing root yields
    /// a watcher with nothing to watch.
    pub fn new(root: impl AsRef<Path>, scope: WatchScope, debounce: Duration) -> (Self, ChangeSignal) {
        let root = root.as_ref().to_path_buf();
        let targets = snapshot_targets(&root, scope);
        let (signal_tx, signal) = ChangeSignal::channel();

        tracing::trace!(
            root = %root.display(),
            directories = targets.len(),
            ?scope,
            "Captured watch targets"
        );

        (
            Self {
                root,
                targets,
                debounce,
                signal_tx,
                active: None,
            },
            signal,
        )
    }

    /// Root directory of this watcher.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories this watcher attaches to when started.
    #[must_use]
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.targets
    }
}

impl ChangeObserver for DirectoryWatcher {
    fn start_observing(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<ChangeKind>();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    if let Some(kind) = ChangeKind::from_event_kind(&event.kind) {
                        let _ = raw_tx.send(kind);
                    }
                }
                Err(e) => {
                    tracing::error!("Watch error: {:?}", e);
                }
            }
        })
        .map_err(|e| WatcherError::watch_failed(&self.root, e))?;

        let mut attached = 0usize;
        for target in &self.targets {
            match watcher.watch(target, RecursiveMode::NonRecursive) {
                Ok(()) => attached += 1,
                // Vanished between snapshot and setup.
                Err(e) => tracing::debug!(path = %target.display(), error = %e, "Skipping directory"),
            }
        }

        let forwarder = runtime.spawn(forward_changes(raw_rx, self.signal_tx.clone(), self.debounce));

        self.active = Some(ActiveWatch {
            _watcher: watcher,
            forwarder,
        });

        tracing::debug!(root = %self.root.display(), attached, "Started observing directory");
        Ok(())
    }

    fn stop_observing(&mut self) {
        if let Some(active) = self.active.take() {
            active.forwarder.abort();
            drop(active);
            tracing::debug!(root = %self.root.display(), "Stopped observing directory");
        }
    }

    fn is_observing(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop_observing();
    }
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .field("targets", &self.targets.len())
            .field("observing", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

/// Collect the directories to watch for `root`.
fn snapshot_targets(root: &Path, scope: WatchScope) -> Vec<PathBuf> {
    match scope {
        WatchScope::Directory => {
            if root.is_dir() {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            }
        }
        WatchScope::Tree => WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.file_type().is_dir())
            .filter_map(std::result::Result::ok)
            .map(walkdir::DirEntry::into_path)
            .collect(),
    }
}

/// Upper bound on one burst, in multiples of the debounce.
const MAX_BURST_WINDOWS: u32 = 5;

/// Wait for a relevant change, let the burst settle, then raise one signal.
///
/// A burst ends after `debounce` of quiet, or `MAX_BURST_WINDOWS * debounce`
/// after its first event, whichever comes first. A steady writer therefore
/// still produces a signal per window.
async fn forward_changes(
    mut raw_rx: mpsc::UnboundedReceiver<ChangeKind>,
    signal: SignalSender,
    debounce: Duration,
) {
    while let Some(first) = raw_rx.recv().await {
        let deadline = Instant::now() + debounce * MAX_BURST_WINDOWS;
        let mut coalesced = 1usize;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match tokio::time::timeout_at((now + debounce).min(deadline), raw_rx.recv()).await {
                Ok(Some(_)) => coalesced += 1,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        tracing::trace!(?first, coalesced, "Filesystem change burst");
        if !signal.notify() {
            return;
        }
    }
}
