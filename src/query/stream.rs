//! Live result streams with explicit cancellation.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::model::Listing;

/// A continuously updating query result.
///
/// Yields one [`Listing`] per emission. Cancelling (or dropping) the stream
/// releases the watch resources of this subscription and no other.
pub struct QueryStream {
    inner: ReceiverStream<Listing>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    idle: Option<mpsc::Sender<Listing>>,
}

impl QueryStream {
    /// Stream fed by an observation task.
    pub(crate) fn observed(
        rx: mpsc::Receiver<Listing>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            cancel,
            task: Some(task),
            idle: None,
        }
    }

    /// Stream that emits `value` once and then stays open without a watcher.
    pub(crate) fn inert(value: Listing) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Fresh channel with capacity 1: cannot be full or closed.
        let _ = tx.try_send(value);
        Self {
            inner: ReceiverStream::new(rx),
            cancel: CancellationToken::new(),
            task: None,
            idle: Some(tx),
        }
    }

    /// Wait for the next emission.
    ///
    /// Returns `None` once the stream has been cancelled and drained.
    pub async fn recv(&mut self) -> Option<Listing> {
        self.inner.next().await
    }

    /// Cancel the subscription. Idempotent.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.idle = None;
    }

    /// Whether the subscription has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait until the watch resources have been released.
    pub async fn close(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("Observation task panicked: {e}");
                }
            }
        }
    }
}

impl Stream for QueryStream {
    type Item = Listing;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for QueryStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("observed", &self.task.is_some())
            .finish_non_exhaustive()
    }
}
