//! Entitlement tiers and subscription state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{
    TICKER_LIMIT_FREE, TICKER_LIMIT_PREMIUM, TICKER_LIMIT_STANDARD, TICKER_LIMIT_ULTIMATE,
    TICKER_LIMIT_VIP,
};

/// Internal entitlement tier, ordered from least to most entitled.
///
/// The derived `Ord` follows declaration order and is the tier hierarchy
/// used by minimum-tier checks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Standard,
    Premium,
    Vip,
    Ultimate,
}

impl Tier {
    /// Stable label, matching the serialized representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Vip => "vip",
            Self::Ultimate => "ultimate",
        }
    }

    /// Parse a tier label, failing safe to [`Tier::Free`].
    ///
    /// Unknown labels must never grant paid access, so anything
    /// unrecognized maps to the free tier. Matching is case-insensitive.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "standard" => Self::Standard,
            "premium" => Self::Premium,
            "vip" => Self::Vip,
            "ultimate" => Self::Ultimate,
            _ => Self::Free,
        }
    }

    /// Favorite-ticker quota at this tier.
    pub fn ticker_limit(self) -> usize {
        match self {
            Self::Free => TICKER_LIMIT_FREE,
            Self::Standard => TICKER_LIMIT_STANDARD,
            Self::Premium => TICKER_LIMIT_PREMIUM,
            Self::Vip => TICKER_LIMIT_VIP,
            Self::Ultimate => TICKER_LIMIT_ULTIMATE,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing subscription status as tracked internally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    #[default]
    Inactive,
}

impl SubscriptionStatus {
    /// Stable label, matching the serialized representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Inactive => "inactive",
        }
    }

    /// Map a raw provider status string.
    ///
    /// Statuses outside our model (incomplete, unpaid, paused, ...) are
    /// treated as inactive.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            _ => Self::Inactive,
        }
    }

    /// Whether this status still grants access to paid features.
    ///
    /// `past_due` counts: users keep their entitlements during the payment
    /// grace period.
    pub fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Trialing | Self::PastDue)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's entitlement state, derived from billing data.
///
/// Mutated only by the entitlement resolver; `Default` is the
/// never-subscribed state (`free`/`inactive`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionState {
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub subscription_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    /// Whether this state satisfies a minimum-tier requirement.
    ///
    /// True iff the tier is at least `required` and, for paid tiers, the
    /// status still grants access (active/trialing/past_due).
    pub fn has_minimum_tier(&self, required: Tier) -> bool {
        self.tier >= required && (required == Tier::Free || self.status.grants_access())
    }
}

/// Mapping from external billing price identifiers to tiers.
///
/// Read-only at request time; administrative edits are applied by reloading
/// the shared handle (see `fingate-entitlement`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierPriceMap(pub HashMap<String, Tier>);

impl TierPriceMap {
    /// Resolve a price identifier, failing safe to [`Tier::Free`].
    pub fn tier_for_price(&self, price_id: &str) -> Tier {
        self.0.get(price_id).copied().unwrap_or(Tier::Free)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Tier)> for TierPriceMap {
    fn from_iter<I: IntoIterator<Item = (S, Tier)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering() {
        assert!(Tier::Free < Tier::Standard);
        assert!(Tier::Standard < Tier::Premium);
        assert!(Tier::Premium < Tier::Vip);
        assert!(Tier::Vip < Tier::Ultimate);
    }

    #[test]
    fn unknown_label_fails_safe() {
        assert_eq!(Tier::from_label("platinum"), Tier::Free);
        assert_eq!(Tier::from_label(""), Tier::Free);
        assert_eq!(Tier::from_label("PREMIUM"), Tier::Premium);
        assert_eq!(Tier::from_label(" vip "), Tier::Vip);
    }

    #[test]
    fn quota_table() {
        assert_eq!(Tier::Free.ticker_limit(), 0);
        assert_eq!(Tier::Standard.ticker_limit(), 5);
        assert_eq!(Tier::Premium.ticker_limit(), 20);
        assert_eq!(Tier::Vip.ticker_limit(), 50);
        assert_eq!(Tier::Ultimate.ticker_limit(), 100);
    }

    #[test]
    fn minimum_tier_respects_grace_period() {
        let vip_past_due = SubscriptionState {
            tier: Tier::Vip,
            status: SubscriptionStatus::PastDue,
            ..Default::default()
        };
        assert!(vip_past_due.has_minimum_tier(Tier::Premium));

        let standard_active = SubscriptionState {
            tier: Tier::Standard,
            status: SubscriptionStatus::Active,
            ..Default::default()
        };
        assert!(!standard_active.has_minimum_tier(Tier::Premium));

        let vip_canceled = SubscriptionState {
            tier: Tier::Vip,
            status: SubscriptionStatus::Canceled,
            ..Default::default()
        };
        assert!(!vip_canceled.has_minimum_tier(Tier::Premium));
        // Free is always satisfied, even with no subscription.
        assert!(vip_canceled.has_minimum_tier(Tier::Free));
        assert!(SubscriptionState::default().has_minimum_tier(Tier::Free));
    }

    #[test]
    fn price_map_lookup() {
        let map: TierPriceMap = [("price_std", Tier::Standard), ("price_vip", Tier::Vip)]
            .into_iter()
            .collect();
        assert_eq!(map.tier_for_price("price_std"), Tier::Standard);
        assert_eq!(map.tier_for_price("price_unknown"), Tier::Free);
    }

    #[test]
    fn provider_status_mapping() {
        assert_eq!(
            SubscriptionStatus::from_provider("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider("past_due"),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired"),
            SubscriptionStatus::Inactive
        );
    }
}
