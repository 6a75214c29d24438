//! Subscription-tier resolution and quota enforcement.
//!
//! Billing data (customer subscriptions keyed by price id) is resolved
//! into a [`SubscriptionState`](fingate_core::SubscriptionState) through a
//! reloadable price-to-tier map, persisted on the user document, and used
//! to bound the favorite-ticker list. Resolution fails safe: unmapped
//! prices and unknown labels grant nothing, and billing timeouts keep the
//! last-known entitlements.
//!
//! [`EntitlementService`] is the entry point; [`ProfileQueue`] provisions
//! integration profiles for active subscribers off the sync path.

mod billing;
mod error;
mod profile;
mod quota;
mod resolver;
mod service;

pub use billing::{BillingProvider, BillingSubscription, MemoryBilling};
pub use error::{BillingError, EntitlementError, IntegrationError, QuotaError};
pub use profile::{
    IntegrationPlatform, MemoryIntegration, ProfileQueue, ProfileQueueConfig, ProfileRequest,
};
pub use quota::{effective_tier, trim_to_limit, validate_favorites, TierInfo};
pub use resolver::{resolve_tier, SharedPriceMap};
pub use service::{EntitlementService, MigrationReport};
