//! Core types for fingate.
//!
//! This crate defines the shared vocabulary of the consent and entitlement
//! subsystems: consent preference records, the tier/status enums with their
//! ordering, the price-to-tier map, favorite-ticker entries, and the
//! identity-provider seam used by the public gateway.
//!
//! Higher-level crates (`fingate-store`, `fingate-consent`,
//! `fingate-entitlement`) build on these types; this crate has no I/O.

mod auth;
mod consent;
pub mod defaults;
mod ticker;
mod tier;

pub use auth::{AuthError, Identity, IdentityProvider, MemoryIdentity};
pub use consent::{
    ConsentChangeLogEntry, ConsentPreferences, ConsentRecord, ConsentSource, EffectiveConsent,
    RemoteConsentRecord,
};
pub use ticker::FavoriteTicker;
pub use tier::{SubscriptionState, SubscriptionStatus, Tier, TierPriceMap};
