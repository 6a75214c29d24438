//! Entitlement synchronization against the user store.

use std::time::Duration;

use fingate_core::defaults::DEFAULT_BILLING_TIMEOUT_SECS;
use fingate_core::{FavoriteTicker, SubscriptionState, SubscriptionStatus, Tier};
use fingate_store::UserStore;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::billing::BillingProvider;
use crate::error::EntitlementError;
use crate::profile::{ProfileQueue, ProfileRequest};
use crate::quota::{effective_tier, trim_to_limit, validate_favorites, TierInfo};
use crate::resolver::{resolve_tier, SharedPriceMap};

/// Outcome of a bulk entitlement sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub synced: usize,
    pub failed: usize,
}

/// Resolves billing data into entitlement state and enforces the
/// tier-based favorites quota.
///
/// Billing lookups run under a timeout and fail soft: a timed-out lookup
/// keeps the last-known entitlements instead of downgrading a paying user
/// on a flaky provider. Provider errors other than a timeout surface to
/// the caller.
pub struct EntitlementService<B, U> {
    billing: B,
    users: U,
    prices: SharedPriceMap,
    profiles: Option<ProfileQueue>,
    billing_timeout: Duration,
}

impl<B, U> EntitlementService<B, U>
where
    B: BillingProvider,
    U: UserStore,
{
    pub fn new(billing: B, users: U, prices: SharedPriceMap) -> Self {
        Self {
            billing,
            users,
            prices,
            profiles: None,
            billing_timeout: Duration::from_secs(DEFAULT_BILLING_TIMEOUT_SECS),
        }
    }

    /// Provision integration profiles for active subscribers through
    /// `queue`.
    pub fn with_profile_queue(mut self, queue: ProfileQueue) -> Self {
        self.profiles = Some(queue);
        self
    }

    pub fn with_billing_timeout(mut self, timeout: Duration) -> Self {
        self.billing_timeout = timeout;
        self
    }

    /// Re-resolve a user's entitlements from billing data and persist the
    /// result.
    ///
    /// Persists only when the resolved state differs from the stored one.
    /// A downgrade that leaves the favorites list over quota trims it,
    /// keeping daily-update entries in preference. Active and trialing
    /// subscribers with a known email get an integration profile queued.
    pub async fn sync_subscription(
        &self,
        user_id: &str,
    ) -> Result<SubscriptionState, EntitlementError> {
        let user = self
            .users
            .user(user_id)
            .await?
            .ok_or_else(|| EntitlementError::UnknownUser(user_id.to_string()))?;

        let resolved = match &user.customer_id {
            // Never checked out, nothing to resolve.
            None => SubscriptionState::default(),
            Some(customer_id) => {
                match timeout(self.billing_timeout, self.billing.subscriptions(customer_id)).await
                {
                    Ok(Ok(subscriptions)) => resolve_tier(&subscriptions, &self.prices.load()),
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => {
                        warn!(
                            user_id = %user_id,
                            "billing lookup timed out, keeping last-known entitlements"
                        );
                        return Ok(user.subscription.clone());
                    }
                }
            }
        };

        if resolved != user.subscription {
            self.users.put_subscription(user_id, &resolved).await?;
            info!(
                user_id = %user_id,
                tier = %resolved.tier,
                status = %resolved.status,
                "entitlements updated"
            );

            let limit = effective_tier(&resolved).ticker_limit();
            if user.favorite_tickers.len() > limit {
                let trimmed = trim_to_limit(user.favorite_tickers.clone(), limit);
                warn!(
                    user_id = %user_id,
                    kept = trimmed.len(),
                    dropped = user.favorite_tickers.len() - trimmed.len(),
                    "favorites trimmed to the downgraded quota"
                );
                self.users.put_favorites(user_id, &trimmed).await?;
            }
        }

        if matches!(
            resolved.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        ) {
            if let (Some(queue), Some(email), Some(subscription_id)) =
                (&self.profiles, &user.email, &resolved.subscription_id)
            {
                queue.enqueue(ProfileRequest {
                    subscription_id: subscription_id.clone(),
                    email: email.clone(),
                });
            }
        }

        Ok(resolved)
    }

    /// Sync every known user, continuing past individual failures.
    pub async fn migrate_all(&self) -> Result<MigrationReport, EntitlementError> {
        let mut report = MigrationReport::default();
        for user_id in self.users.user_ids().await? {
            match self.sync_subscription(&user_id).await {
                Ok(_) => report.synced += 1,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "entitlement sync failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            synced = report.synced,
            failed = report.failed,
            "entitlement migration finished"
        );
        Ok(report)
    }

    /// The user's quota standing at their current effective tier.
    pub async fn tier_info(&self, user_id: &str) -> Result<TierInfo, EntitlementError> {
        let user = self
            .users
            .user(user_id)
            .await?
            .ok_or_else(|| EntitlementError::UnknownUser(user_id.to_string()))?;
        Ok(TierInfo::new(
            &user.subscription,
            user.favorite_tickers.len(),
        ))
    }

    /// Replace the user's favorites list, enforcing the quota of their
    /// current effective tier. Returns the resulting quota standing.
    pub async fn set_favorites(
        &self,
        user_id: &str,
        tickers: &[FavoriteTicker],
    ) -> Result<TierInfo, EntitlementError> {
        let user = self
            .users
            .user(user_id)
            .await?
            .ok_or_else(|| EntitlementError::UnknownUser(user_id.to_string()))?;

        let tier = effective_tier(&user.subscription);
        let normalized = validate_favorites(tier, tickers)?;
        self.users.put_favorites(user_id, &normalized).await?;
        Ok(TierInfo::new(&user.subscription, normalized.len()))
    }

    /// Whether the user currently satisfies a minimum-tier requirement.
    pub async fn has_minimum_tier(
        &self,
        user_id: &str,
        required: Tier,
    ) -> Result<bool, EntitlementError> {
        let user = self
            .users
            .user(user_id)
            .await?
            .ok_or_else(|| EntitlementError::UnknownUser(user_id.to_string()))?;
        Ok(user.subscription.has_minimum_tier(required))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use fingate_core::TierPriceMap;
    use fingate_store::{MemoryStore, UserRecord};
    use tokio::time::sleep;

    use super::*;
    use crate::billing::{BillingSubscription, MemoryBilling};
    use crate::error::{BillingError, QuotaError};
    use crate::profile::{MemoryIntegration, ProfileQueueConfig};

    fn prices() -> SharedPriceMap {
        SharedPriceMap::new(
            [
                ("price_std", fingate_core::Tier::Standard),
                ("price_vip", fingate_core::Tier::Vip),
            ]
            .into_iter()
            .collect::<TierPriceMap>(),
        )
    }

    async fn seed_user(store: &MemoryStore, user_id: &str, customer_id: Option<&str>) {
        let mut record = UserRecord::new(user_id).with_email(format!("{user_id}@example.com"));
        if let Some(cid) = customer_id {
            record = record.with_customer_id(cid);
        }
        store.put_user(&record).await.unwrap();
    }

    #[tokio::test]
    async fn sync_resolves_and_persists_tier() {
        let store = Arc::new(MemoryStore::new());
        let billing = MemoryBilling::new();
        seed_user(&store, "u1", Some("cus_1")).await;
        billing.set(
            "cus_1",
            vec![BillingSubscription::new("sub_1", "active", "price_std")],
        );

        let svc = EntitlementService::new(billing, store.clone(), prices());
        let state = svc.sync_subscription("u1").await.unwrap();
        assert_eq!(state.tier, Tier::Standard);
        assert_eq!(state.status, SubscriptionStatus::Active);

        let stored = store.user("u1").await.unwrap().unwrap();
        assert_eq!(stored.subscription, state);
    }

    #[tokio::test]
    async fn unmapped_price_resolves_to_free_with_status() {
        let store = Arc::new(MemoryStore::new());
        let billing = MemoryBilling::new();
        seed_user(&store, "u1", Some("cus_1")).await;
        billing.set(
            "cus_1",
            vec![BillingSubscription::new("sub_1", "active", "price_unknown")],
        );

        let svc = EntitlementService::new(billing, store, prices());
        let state = svc.sync_subscription("u1").await.unwrap();
        assert_eq!(state.tier, Tier::Free);
        assert_eq!(state.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn billing_timeout_keeps_last_known_state() {
        struct SlowBilling;

        #[async_trait]
        impl BillingProvider for SlowBilling {
            async fn subscriptions(
                &self,
                _: &str,
            ) -> Result<Vec<BillingSubscription>, BillingError> {
                sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }

        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", Some("cus_1")).await;
        let known = SubscriptionState {
            tier: Tier::Vip,
            status: SubscriptionStatus::Active,
            subscription_id: Some("sub_1".to_string()),
            current_period_end: None,
        };
        store.put_subscription("u1", &known).await.unwrap();

        let svc = EntitlementService::new(SlowBilling, store.clone(), prices())
            .with_billing_timeout(Duration::from_millis(20));
        let state = svc.sync_subscription("u1").await.unwrap();
        assert_eq!(state, known, "timeout must not downgrade the user");
        assert_eq!(store.user("u1").await.unwrap().unwrap().subscription, known);
    }

    #[tokio::test]
    async fn billing_outage_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let billing = MemoryBilling::new();
        seed_user(&store, "u1", Some("cus_1")).await;
        billing.set_unavailable(true);

        let svc = EntitlementService::new(billing, store, prices());
        assert!(matches!(
            svc.sync_subscription("u1").await,
            Err(EntitlementError::Billing(_))
        ));
    }

    #[tokio::test]
    async fn downgrade_trims_favorites_to_new_quota() {
        let store = Arc::new(MemoryStore::new());
        let billing = MemoryBilling::new();
        seed_user(&store, "u1", Some("cus_1")).await;
        store
            .put_subscription(
                "u1",
                &SubscriptionState {
                    tier: Tier::Vip,
                    status: SubscriptionStatus::Active,
                    subscription_id: Some("sub_vip".to_string()),
                    current_period_end: None,
                },
            )
            .await
            .unwrap();
        let favorites: Vec<FavoriteTicker> = ["AAPL", "MSFT", "GOOG", "AMZN", "META", "NVDA"]
            .iter()
            .enumerate()
            .map(|(i, s)| FavoriteTicker::new(*s, i % 2 == 1))
            .collect();
        store.put_favorites("u1", &favorites).await.unwrap();

        // The vip subscription lapsed; a standard one replaced it.
        billing.set(
            "cus_1",
            vec![BillingSubscription::new("sub_std", "active", "price_std")],
        );

        let svc = EntitlementService::new(billing, store.clone(), prices());
        let state = svc.sync_subscription("u1").await.unwrap();
        assert_eq!(state.tier, Tier::Standard);

        let stored = store.user("u1").await.unwrap().unwrap();
        assert_eq!(stored.favorite_tickers.len(), 5);
        // Daily-update entries survive in preference.
        assert!(stored.favorite_tickers[0].daily_updates);
    }

    #[tokio::test]
    async fn no_customer_resolves_to_never_subscribed() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", None).await;
        store
            .put_subscription(
                "u1",
                &SubscriptionState {
                    tier: Tier::Premium,
                    status: SubscriptionStatus::Active,
                    subscription_id: Some("sub_stale".to_string()),
                    current_period_end: None,
                },
            )
            .await
            .unwrap();

        let svc = EntitlementService::new(MemoryBilling::new(), store.clone(), prices());
        let state = svc.sync_subscription("u1").await.unwrap();
        assert_eq!(state, SubscriptionState::default());
        assert_eq!(
            store.user("u1").await.unwrap().unwrap().subscription,
            SubscriptionState::default()
        );
    }

    #[tokio::test]
    async fn active_subscriber_gets_profile_queued() {
        let store = Arc::new(MemoryStore::new());
        let billing = MemoryBilling::new();
        seed_user(&store, "u1", Some("cus_1")).await;
        billing.set(
            "cus_1",
            vec![BillingSubscription::new("sub_1", "trialing", "price_std")],
        );

        let platform = Arc::new(MemoryIntegration::new());
        let queue = ProfileQueue::spawn(
            platform.clone(),
            ProfileQueueConfig {
                attempt_timeout: Duration::from_millis(200),
                max_attempts: 1,
                initial_backoff: Duration::from_millis(1),
            },
        );

        let svc = EntitlementService::new(billing, store, prices()).with_profile_queue(queue);
        svc.sync_subscription("u1").await.unwrap();

        let mut created = false;
        for _ in 0..100 {
            if platform.profile("u1@example.com").is_some() {
                created = true;
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert!(created, "active subscriber must get a profile");
    }

    #[tokio::test]
    async fn canceled_subscriber_gets_no_profile() {
        let store = Arc::new(MemoryStore::new());
        let billing = MemoryBilling::new();
        seed_user(&store, "u1", Some("cus_1")).await;
        billing.set(
            "cus_1",
            vec![BillingSubscription::new("sub_1", "canceled", "price_std")],
        );

        let platform = Arc::new(MemoryIntegration::new());
        let queue = ProfileQueue::spawn(platform.clone(), ProfileQueueConfig::default());

        let svc = EntitlementService::new(billing, store, prices()).with_profile_queue(queue);
        svc.sync_subscription("u1").await.unwrap();

        sleep(Duration::from_millis(50)).await;
        assert_eq!(platform.profile_count(), 0);
    }

    #[tokio::test]
    async fn set_favorites_enforces_the_effective_quota() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", None).await;
        store
            .put_subscription(
                "u1",
                &SubscriptionState {
                    tier: Tier::Standard,
                    status: SubscriptionStatus::Active,
                    subscription_id: Some("sub_1".to_string()),
                    current_period_end: None,
                },
            )
            .await
            .unwrap();

        let svc = EntitlementService::new(MemoryBilling::new(), store.clone(), prices());

        let ok: Vec<FavoriteTicker> = ["aapl", "msft"]
            .iter()
            .map(|s| FavoriteTicker::new(*s, false))
            .collect();
        let info = svc.set_favorites("u1", &ok).await.unwrap();
        assert_eq!(info.used, 2);
        assert_eq!(info.remaining, 3);
        let stored = store.user("u1").await.unwrap().unwrap().favorite_tickers;
        assert_eq!(stored[0].symbol, "AAPL");

        let too_many: Vec<FavoriteTicker> = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .map(|s| FavoriteTicker::new(*s, false))
            .collect();
        match svc.set_favorites("u1", &too_many).await {
            Err(EntitlementError::Quota(QuotaError::Exceeded { limit: 5, .. })) => {}
            other => panic!("expected quota violation, got {other:?}"),
        }
        // The rejected write changed nothing.
        assert_eq!(
            store.user("u1").await.unwrap().unwrap().favorite_tickers.len(),
            2
        );
    }

    #[tokio::test]
    async fn migrate_all_counts_failures_and_continues() {
        let store = Arc::new(MemoryStore::new());
        let billing = MemoryBilling::new();
        seed_user(&store, "u1", Some("cus_1")).await;
        seed_user(&store, "u2", None).await;
        billing.set(
            "cus_1",
            vec![BillingSubscription::new("sub_1", "active", "price_vip")],
        );

        let svc = EntitlementService::new(billing, store.clone(), prices());
        let report = svc.migrate_all().await.unwrap();
        assert_eq!(report, MigrationReport { synced: 2, failed: 0 });
        assert_eq!(
            store.user("u1").await.unwrap().unwrap().subscription.tier,
            Tier::Vip
        );
    }

    #[tokio::test]
    async fn tier_info_reports_quota_standing() {
        let store = Arc::new(MemoryStore::new());
        seed_user(&store, "u1", None).await;
        store
            .put_subscription(
                "u1",
                &SubscriptionState {
                    tier: Tier::Premium,
                    status: SubscriptionStatus::Active,
                    subscription_id: Some("sub_1".to_string()),
                    current_period_end: None,
                },
            )
            .await
            .unwrap();
        store
            .put_favorites("u1", &[FavoriteTicker::new("AAPL", true)])
            .await
            .unwrap();

        let svc = EntitlementService::new(MemoryBilling::new(), store, prices());
        let info = svc.tier_info("u1").await.unwrap();
        assert_eq!(info.tier, Tier::Premium);
        assert_eq!(info.limit, 20);
        assert_eq!(info.used, 1);
        assert_eq!(info.remaining, 19);
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let svc =
            EntitlementService::new(MemoryBilling::new(), Arc::new(MemoryStore::new()), prices());
        assert!(matches!(
            svc.sync_subscription("ghost").await,
            Err(EntitlementError::UnknownUser(_))
        ));
    }
}
