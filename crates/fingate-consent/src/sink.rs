//! Consent-gated side effects.

use fingate_core::ConsentPreferences;

/// Receiver for consent changes that gate third-party collection.
///
/// `apply` is called synchronously with every local cache write, before any
/// remote I/O, so no analytics activity can happen ahead of (or without)
/// consent. Implementations toggle whatever they gate — an analytics
/// client, a tag manager bridge — and must not block.
pub trait ConsentSink: Send + Sync {
    fn apply(&self, preferences: &ConsentPreferences);
}

/// Sink that gates nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ConsentSink for NoopSink {
    fn apply(&self, _preferences: &ConsentPreferences) {}
}

impl<F> ConsentSink for F
where
    F: Fn(&ConsentPreferences) + Send + Sync,
{
    fn apply(&self, preferences: &ConsentPreferences) {
        self(preferences)
    }
}
