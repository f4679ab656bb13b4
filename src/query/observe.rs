//! Observation driver shared by every query service.
//!
//! One task per subscription: build the watcher, start it, emit a snapshot,
//! then re-fetch and re-emit once per change signal until cancelled.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::stream::QueryStream;
use crate::model::{Listing, QueryOutcome};
use crate::observability::spans;
use crate::watcher::{ChangeObserver, ChangeSignal};

/// Produces a fresh listing each time it is called.
pub type Fetch = Arc<dyn Fn() -> BoxFuture<'static, Listing> + Send + Sync>;

/// Wrap a blocking listing function so it runs on the blocking pool.
pub fn blocking_fetch<F>(f: F) -> Fetch
where
    F: Fn() -> Listing + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move || {
        let f = Arc::clone(&f);
        async move {
            tokio::task::spawn_blocking(move || f())
                .await
                .unwrap_or_else(|e| QueryOutcome::internal(format!("query task failed: {e}")))
        }
        .boxed()
    })
}

/// Start an observation and return its stream.
///
/// `make_observer` runs on the blocking pool since building a watcher may
/// walk a directory tree. Must be called from within a Tokio runtime.
pub fn spawn_observation<O, M>(
    kind: &'static str,
    target: String,
    make_observer: M,
    fetch: Fetch,
    capacity: usize,
) -> QueryStream
where
    O: ChangeObserver + 'static,
    M: FnOnce() -> (O, ChangeSignal) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let span = spans::observation_span(kind, &target);

    let task = tokio::spawn(
        async move {
            match tokio::task::spawn_blocking(make_observer).await {
                Ok((observer, signal)) => drive(observer, signal, fetch, tx, token).await,
                Err(e) => {
                    tracing::error!("Failed to build watcher: {e}");
                    let _ = tx
                        .send(QueryOutcome::internal(format!("watcher setup failed: {e}")))
                        .await;
                }
            }
        }
        .instrument(span),
    );

    QueryStream::observed(rx, cancel, task)
}

/// Emission loop. Stops the observer exactly once on the way out.
async fn drive<O: ChangeObserver>(
    mut observer: O,
    mut signal: ChangeSignal,
    fetch: Fetch,
    tx: mpsc::Sender<Listing>,
    cancel: CancellationToken,
) {
    if let Err(e) = observer.start_observing() {
        tracing::warn!(error = %e, "Change watching unavailable, emitting snapshot only");
    }

    let mut emissions = 0u64;
    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = fetch() => outcome,
        };

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(outcome) => sent,
        };
        if sent.is_err() {
            // Receiver dropped.
            break;
        }
        emissions += 1;

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = signal.recv() => {
                if changed.is_none() {
                    break;
                }
            }
        }
        tracing::trace!(emissions, "Change detected, re-querying");
    }

    observer.stop_observing();
    tracing::debug!(emissions, "Observation ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::SignalSender;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Observer that counts start/stop calls.
    struct CountingObserver {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        observing: bool,
    }

    impl ChangeObserver for CountingObserver {
        fn start_observing(&mut self) -> crate::Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.observing = true;
            Ok(())
        }

        fn stop_observing(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.observing = false;
        }

        fn is_observing(&self) -> bool {
            self.observing
        }
    }

    struct Harness {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
        trigger: SignalSender,
        stream: QueryStream,
    }

    fn harness(fetch: Fetch) -> Harness {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let (trigger, signal) = ChangeSignal::channel();
        let observer = CountingObserver {
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
            observing: false,
        };
        let stream = spawn_observation("test", "fake".to_string(), move || (observer, signal), fetch, 4);
        Harness {
            starts,
            stops,
            trigger,
            stream,
        }
    }

    fn counting_fetch() -> Fetch {
        let calls = Arc::new(AtomicUsize::new(0));
        blocking_fetch(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            QueryOutcome::internal(format!("call {n}"))
        })
    }

    async fn next(stream: &mut QueryStream) -> Listing {
        tokio::time::timeout(Duration::from_secs(2), stream.recv())
            .await
            .expect("emission timed out")
            .expect("stream ended")
    }

    #[tokio::test]
    async fn test_initial_then_per_signal_emissions() {
        let mut h = harness(counting_fetch());

        assert_eq!(next(&mut h.stream).await, QueryOutcome::internal("call 0"));
        h.trigger.notify();
        assert_eq!(next(&mut h.stream).await, QueryOutcome::internal("call 1"));
        h.trigger.notify();
        assert_eq!(next(&mut h.stream).await, QueryOutcome::internal("call 2"));

        let quiet = tokio::time::timeout(Duration::from_millis(100), h.stream.recv()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test]
    async fn test_close_stops_observer_exactly_once() {
        let mut h = harness(counting_fetch());
        next(&mut h.stream).await;

        h.stream.close().await;
        assert_eq!(h.starts.load(Ordering::SeqCst), 1);
        assert_eq!(h.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_stops_observer() {
        let h = harness(counting_fetch());
        let stops = Arc::clone(&h.stops);
        drop(h.stream);

        for _ in 0..50 {
            if stops.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        drop(h.trigger);
    }

    #[tokio::test]
    async fn test_cancellation_is_per_subscription() {
        let mut a = harness(counting_fetch());
        let mut b = harness(counting_fetch());
        next(&mut a.stream).await;
        next(&mut b.stream).await;

        a.stream.close().await;
        assert_eq!(a.stops.load(Ordering::SeqCst), 1);
        assert_eq!(b.stops.load(Ordering::SeqCst), 0);

        b.trigger.notify();
        assert_eq!(next(&mut b.stream).await, QueryOutcome::internal("call 1"));
    }
}
