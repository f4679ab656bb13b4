//! Change event classification and signal delivery.

#![allow(clippy::missing_const_for_fn)]

use notify::event::ModifyKind;
use notify::EventKind;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Filesystem change kinds that invalidate a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Delete,
    Modify,
    Move,
}

impl ChangeKind {
    /// Map a raw notify event kind. Access and metadata-only events map to
    /// `None` so that reading a directory never counts as a change.
    #[must_use]
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Remove(_) => Some(Self::Delete),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Move),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modify),
            _ => None,
        }
    }
}

/// Receiving half of a watcher's "something changed" signal.
///
/// The channel holds at most one pending signal, so any number of changes
/// arriving before the consumer re-queries collapse into one.
#[derive(Debug)]
pub struct ChangeSignal {
    rx: mpsc::Receiver<()>,
}

/// Sending half of a [`ChangeSignal`].
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<()>,
}

impl ChangeSignal {
    /// Create a connected sender/receiver pair.
    #[must_use]
    pub fn channel() -> (SignalSender, Self) {
        let (tx, rx) = mpsc::channel(1);
        (SignalSender { tx }, Self { rx })
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once every sender has been dropped.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Take a pending change without waiting.
    pub fn try_recv(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl SignalSender {
    /// Raise the signal. Returns `false` once the receiver is gone.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }
}
