//! Consent reconciliation.
//!
//! A consent decision lives in two places: a device-local cache (one
//! browser/device, no identity attached) and a per-user remote record with
//! an auditable revision history. This crate owns the rules for keeping the
//! two consistent:
//!
//! - on login, remote wins when it exists; otherwise the local decision is
//!   promoted to revision 1 (sync overwrites never produce audit entries,
//!   promotions produce exactly one);
//! - every explicit decision writes locally first, applies consent-gated
//!   side effects synchronously, then writes remotely with a
//!   compare-and-swap revision bump — logging a change entry only when the
//!   preferences actually changed;
//! - remote failures never block a decision: the local cache stays
//!   authoritative for the session and the result is flagged
//!   `store_connected: false`.
//!
//! See [`ConsentService`] for the entry points.

mod local;
mod service;
mod sink;

pub use local::{CacheError, FileConsentCache, LocalConsentCache, MemoryConsentCache};
pub use service::ConsentService;
pub use sink::{ConsentSink, NoopSink};
