//! Storage contracts and backends for fingate.
//!
//! The remote side of the consent subsystem and the user document live
//! behind two data-access traits:
//!
//! - [`ConsentStore`] — the per-user consent record with its atomic revision
//!   bump, plus the append-only change log.
//! - [`UserStore`] — the user document (subscription state, favorite
//!   tickers).
//!
//! Two backends are provided: [`MemoryStore`] (single-mutex reference
//! semantics, used in tests) and [`SqlStore`] (SQLite via `sqlx`).
//!
//! Revision assignment is the linearization point for consent writes:
//! [`ConsentStore::put_consent`] succeeds only when the caller's record
//! claims exactly the next revision, so two concurrent writers can never
//! both claim the same number.

mod error;
mod events;
mod memory;
mod record;
pub mod sql;
mod traits;

pub use error::StoreError;
pub use events::{ConsentChanged, ConsentEvents};
pub use memory::MemoryStore;
pub use record::UserRecord;
pub use sql::{SqlStore, SqlStoreConfig};
pub use traits::{ConsentStore, UserStore};
