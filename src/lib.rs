//! # fingate-rs
//!
//! Consent reconciliation and tiered entitlements for a subscription-gated
//! financial-analysis service.
//!
//! ## Crates
//!
//! - [`fingate_core`] - Core types and default configurations
//! - [`fingate_store`] - Consent and user-document storage (memory + SQL)
//! - [`fingate_consent`] - Local/remote consent reconciliation
//! - [`fingate_entitlement`] - Tier resolution and quota enforcement
//! - [`fingate_config`] - Configuration loading and validation

pub use fingate_config as config;
pub use fingate_consent as consent;
pub use fingate_core as core;
pub use fingate_entitlement as entitlement;
pub use fingate_store as store;

pub mod gateway;

pub use gateway::{Gateway, GatewayError, Session};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use fingate_config::{load_config, validate_config, Config};
    pub use fingate_consent::{ConsentService, FileConsentCache, MemoryConsentCache};
    pub use fingate_core::{ConsentPreferences, ConsentSource, Tier};
    pub use fingate_entitlement::{EntitlementService, SharedPriceMap};
    pub use fingate_store::{ConsentStore, MemoryStore, SqlStore, UserStore};

    pub use crate::gateway::{Gateway, GatewayError, Session};
}
