//! Media catalog change watcher.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::events::{ChangeSignal, SignalSender};
use super::ChangeObserver;
use crate::catalog::{CollectionUri, MediaCatalog};
use crate::error::WatcherError;
use crate::Result;

/// Raises a signal whenever any row of one collection changes.
pub struct CatalogWatcher {
    catalog: Arc<dyn MediaCatalog>,
    uri: CollectionUri,
    signal_tx: SignalSender,
    forwarder: Option<JoinHandle<()>>,
}

impl CatalogWatcher {
    /// Create a watcher for `uri`.
    pub fn new(catalog: Arc<dyn MediaCatalog>, uri: CollectionUri) -> (Self, ChangeSignal) {
        let (signal_tx, signal) = ChangeSignal::channel();
        (
            Self {
                catalog,
                uri,
                signal_tx,
                forwarder: None,
            },
            signal,
        )
    }

    /// The watched collection.
    #[must_use]
    pub const fn uri(&self) -> &CollectionUri {
        &self.uri
    }
}

impl ChangeObserver for CatalogWatcher {
    fn start_observing(&mut self) -> Result<()> {
        if self.forwarder.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;

        // Subscribe before returning so no change after start is missed.
        let mut changes = self.catalog.subscribe();
        let uri = self.uri.clone();
        let signal = self.signal_tx.clone();

        self.forwarder = Some(runtime.spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.uri == uri && !signal.notify() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!(%uri, missed, "Catalog watcher lagged");
                        if !signal.notify() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        tracing::debug!(uri = %self.uri, "Started observing collection");
        Ok(())
    }

    fn stop_observing(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
            tracing::debug!(uri = %self.uri, "Stopped observing collection");
        }
    }

    fn is_observing(&self) -> bool {
        self.forwarder.is_some()
    }
}

impl Drop for CatalogWatcher {
    fn drop(&mut self) {
        self.stop_observing();
    }
}
