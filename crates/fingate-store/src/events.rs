//! Consent change broadcast channel.
//!
//! Stores publish a [`ConsentChanged`] event after every successful consent
//! write; reconcilers and UI layers subscribe instead of registering ad hoc
//! callbacks, which keeps ordering and cancellation explicit.

use fingate_core::{defaults::CONSENT_EVENT_CAPACITY, ConsentPreferences};
use tokio::sync::broadcast;

/// A successful consent write, as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsentChanged {
    pub user_id: String,
    pub preferences: ConsentPreferences,
    pub revision: u64,
}

/// Broadcast fan-out for consent changes.
///
/// Slow subscribers may observe `Lagged` and should re-read the store;
/// events are notifications, not the source of truth.
#[derive(Debug)]
pub struct ConsentEvents {
    tx: broadcast::Sender<ConsentChanged>,
}

impl ConsentEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CONSENT_EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all consent changes on this store.
    pub fn subscribe(&self) -> broadcast::Receiver<ConsentChanged> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ConsentChanged) {
        let _ = self.tx.send(event);
    }
}

impl Default for ConsentEvents {
    fn default() -> Self {
        Self::new()
    }
}
