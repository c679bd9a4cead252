//! Live change feed for an event's media.
//!
//! Lightweight pub/sub: the feed is the transport for row changes after they
//! are persisted, so a dropped message is recoverable by reloading from the
//! store. Consumers must tolerate duplicates.

use std::sync::mpsc::Receiver;
use std::time::Duration;

use keepsake_core::MediaId;

use crate::media::Media;

/// A single row change on an event's media.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaChange {
    Inserted(Media),
    Deleted(MediaId),
}

/// A live subscription to one event's media changes.
///
/// Dropping the subscription unsubscribes; the feed side detects the closed
/// channel and discards the sender.
#[derive(Debug)]
pub struct MediaSubscription {
    receiver: Receiver<MediaChange>,
}

impl MediaSubscription {
    pub fn new(receiver: Receiver<MediaChange>) -> Self {
        Self { receiver }
    }

    /// Block until the next change arrives.
    pub fn recv(&self) -> Result<MediaChange, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Take a pending change without blocking.
    pub fn try_recv(&self) -> Result<MediaChange, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a change.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<MediaChange, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Source of live media changes, scoped per event.
pub trait MediaChangeFeed: Send + Sync {
    fn subscribe(&self, event_id: keepsake_core::EventId) -> MediaSubscription;
}

impl<F> MediaChangeFeed for std::sync::Arc<F>
where
    F: MediaChangeFeed + ?Sized,
{
    fn subscribe(&self, event_id: keepsake_core::EventId) -> MediaSubscription {
        (**self).subscribe(event_id)
    }
}
