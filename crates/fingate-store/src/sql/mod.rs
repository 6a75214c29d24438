//! SQL store backend (SQLite via SQLx).
//!
//! # Example
//!
//! ```ignore
//! use fingate_store::{SqlStore, SqlStoreConfig};
//!
//! let store = SqlStore::connect(
//!     SqlStoreConfig::new("sqlite:fingate.db").max_connections(5),
//! ).await?;
//! store.init_schema().await?;
//! ```
//!
//! # Schema
//!
//! Three tables: `consent` (one row per user, current record), `consent_log`
//! (append-only, primary key `(user_id, revision)`), and `users`
//! (subscription fields plus the favorites list as a JSON column).
//!
//! The revision compare-and-swap is expressed directly in SQL: the first
//! write is an `INSERT OR IGNORE` of revision 1, every later write an
//! `UPDATE ... WHERE user_id = ? AND revision = ?`. Zero affected rows
//! means another writer got there first.

mod config;
mod queries;
mod store;

pub use config::SqlStoreConfig;
pub use store::SqlStore;
