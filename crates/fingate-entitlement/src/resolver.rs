//! Pure tier resolution from billing data.

use std::sync::Arc;

use fingate_core::{SubscriptionState, SubscriptionStatus, TierPriceMap};
use parking_lot::RwLock;

use crate::billing::BillingSubscription;

/// Resolve a user's entitlement state from their provider subscriptions.
///
/// Selection prefers the first subscription that is active or trialing;
/// when none qualifies the first subscription of any status is used, so a
/// canceled or past-due subscription still resolves to its tier and the
/// status decides access. No subscriptions at all is the never-subscribed
/// state (`free`/`inactive`).
///
/// A price id missing from the map resolves to `free` with the status
/// preserved: an unmapped price must never grant paid access.
pub fn resolve_tier(
    subscriptions: &[BillingSubscription],
    prices: &TierPriceMap,
) -> SubscriptionState {
    let picked = subscriptions
        .iter()
        .find(|s| matches!(s.status, SubscriptionStatus::Active | SubscriptionStatus::Trialing))
        .or_else(|| subscriptions.first());

    match picked {
        Some(sub) => SubscriptionState {
            tier: prices.tier_for_price(&sub.price_id),
            status: sub.status,
            subscription_id: Some(sub.id.clone()),
            current_period_end: sub.current_period_end,
        },
        None => SubscriptionState::default(),
    }
}

/// Shared, reloadable handle to the price-to-tier map.
///
/// Lookups clone an `Arc` under a read lock; administrative edits swap the
/// whole map atomically, so in-flight resolutions keep the snapshot they
/// started with.
#[derive(Debug, Clone)]
pub struct SharedPriceMap {
    inner: Arc<RwLock<Arc<TierPriceMap>>>,
}

impl SharedPriceMap {
    pub fn new(map: TierPriceMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(map))),
        }
    }

    /// The current map snapshot.
    pub fn load(&self) -> Arc<TierPriceMap> {
        self.inner.read().clone()
    }

    /// Replace the map for all holders of this handle.
    pub fn reload(&self, map: TierPriceMap) {
        *self.inner.write() = Arc::new(map);
    }
}

impl Default for SharedPriceMap {
    fn default() -> Self {
        Self::new(TierPriceMap::default())
    }
}

#[cfg(test)]
mod tests {
    use fingate_core::Tier;

    use super::*;

    fn prices() -> TierPriceMap {
        [
            ("price_std", Tier::Standard),
            ("price_prem", Tier::Premium),
            ("price_vip", Tier::Vip),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn active_subscription_wins_over_earlier_canceled() {
        let subs = vec![
            BillingSubscription::new("sub_old", "canceled", "price_vip"),
            BillingSubscription::new("sub_new", "active", "price_std"),
        ];
        let state = resolve_tier(&subs, &prices());
        assert_eq!(state.tier, Tier::Standard);
        assert_eq!(state.status, SubscriptionStatus::Active);
        assert_eq!(state.subscription_id.as_deref(), Some("sub_new"));
    }

    #[test]
    fn canceled_only_resolves_tier_with_status_preserved() {
        let subs = vec![BillingSubscription::new("sub_1", "canceled", "price_prem")];
        let state = resolve_tier(&subs, &prices());
        assert_eq!(state.tier, Tier::Premium);
        assert_eq!(state.status, SubscriptionStatus::Canceled);
    }

    #[test]
    fn no_subscriptions_is_never_subscribed() {
        assert_eq!(resolve_tier(&[], &prices()), SubscriptionState::default());
    }

    #[test]
    fn unmapped_price_fails_safe_to_free() {
        let subs = vec![BillingSubscription::new("sub_1", "active", "price_legacy")];
        let state = resolve_tier(&subs, &prices());
        assert_eq!(state.tier, Tier::Free);
        assert_eq!(state.status, SubscriptionStatus::Active);
        assert_eq!(state.subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn shared_map_reload_is_visible_to_clones() {
        let shared = SharedPriceMap::new(prices());
        let clone = shared.clone();
        assert_eq!(clone.load().tier_for_price("price_std"), Tier::Standard);

        shared.reload([("price_std", Tier::Vip)].into_iter().collect());
        assert_eq!(clone.load().tier_for_price("price_std"), Tier::Vip);
        assert_eq!(clone.load().tier_for_price("price_prem"), Tier::Free);
    }
}
