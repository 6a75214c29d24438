//! The user document.

use chrono::{DateTime, Utc};
use fingate_core::{FavoriteTicker, SubscriptionState};
use serde::{Deserialize, Serialize};

/// Per-user document: subscription state plus owned collections.
///
/// Subscription fields are mutated only by the entitlement resolver; the
/// favorites list only through quota-validated writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub email: Option<String>,
    /// Billing-provider customer identifier, if the user ever checked out.
    pub customer_id: Option<String>,
    pub subscription: SubscriptionState,
    pub favorite_tickers: Vec<FavoriteTicker>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// A fresh user with no subscription and no favorites.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            customer_id: None,
            subscription: SubscriptionState::default(),
            favorite_tickers: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}
