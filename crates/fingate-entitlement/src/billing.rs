//! Billing-provider seam.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fingate_core::SubscriptionStatus;
use parking_lot::Mutex;

use crate::error::BillingError;

/// One subscription as reported by the billing provider.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingSubscription {
    /// Provider-side subscription identifier.
    pub id: String,
    pub status: SubscriptionStatus,
    /// Provider-side price identifier, mapped to a tier by the price map.
    pub price_id: String,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl BillingSubscription {
    /// Build from raw provider fields. Unrecognized statuses map to
    /// inactive.
    pub fn new(id: impl Into<String>, raw_status: &str, price_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SubscriptionStatus::from_provider(raw_status),
            price_id: price_id.into(),
            current_period_end: None,
        }
    }

    pub fn with_period_end(mut self, end: DateTime<Utc>) -> Self {
        self.current_period_end = Some(end);
        self
    }
}

/// Read-only view of a customer's subscriptions at the billing provider.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Subscriptions for a customer, most recently created first.
    async fn subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<BillingSubscription>, BillingError>;
}

#[async_trait]
impl<B: BillingProvider + ?Sized> BillingProvider for Arc<B> {
    #[inline]
    async fn subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<BillingSubscription>, BillingError> {
        (**self).subscriptions(customer_id).await
    }
}

/// In-memory billing provider for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryBilling {
    inner: Mutex<HashMap<String, Vec<BillingSubscription>>>,
    unavailable: AtomicBool,
}

impl MemoryBilling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the subscriptions recorded for a customer.
    pub fn set(&self, customer_id: impl Into<String>, subscriptions: Vec<BillingSubscription>) {
        self.inner.lock().insert(customer_id.into(), subscriptions);
    }

    /// Make every call fail, simulating a provider outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl BillingProvider for MemoryBilling {
    async fn subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<BillingSubscription>, BillingError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BillingError::Provider("service unavailable".to_string()));
        }
        Ok(self
            .inner
            .lock()
            .get(customer_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_customer_has_no_subscriptions() {
        let billing = MemoryBilling::new();
        assert!(billing.subscriptions("cus_1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outage_surfaces_as_provider_error() {
        let billing = MemoryBilling::new();
        billing.set("cus_1", vec![BillingSubscription::new("sub_1", "active", "price_1")]);
        billing.set_unavailable(true);
        assert!(billing.subscriptions("cus_1").await.is_err());
    }

    #[test]
    fn raw_status_maps_through_provider_table() {
        let sub = BillingSubscription::new("sub_1", "incomplete", "price_1");
        assert_eq!(sub.status, SubscriptionStatus::Inactive);
    }
}
