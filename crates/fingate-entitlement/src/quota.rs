//! Tier-based favorite-ticker quota rules.

use fingate_core::{FavoriteTicker, SubscriptionState, Tier};
use serde::Serialize;

use crate::error::QuotaError;

/// The tier whose quota applies to a subscription state.
///
/// A tier only counts while its status grants access; a canceled or lapsed
/// subscription falls back to the free quota regardless of the recorded
/// tier.
pub fn effective_tier(state: &SubscriptionState) -> Tier {
    if state.status.grants_access() {
        state.tier
    } else {
        Tier::Free
    }
}

/// A user's quota standing, as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierInfo {
    pub tier: Tier,
    pub limit: usize,
    pub used: usize,
    pub remaining: usize,
}

impl TierInfo {
    pub fn new(state: &SubscriptionState, used: usize) -> Self {
        let tier = effective_tier(state);
        let limit = tier.ticker_limit();
        Self {
            tier,
            limit,
            used,
            remaining: limit.saturating_sub(used),
        }
    }
}

/// Validate a favorites list against a tier's quota.
///
/// Returns the normalized entries (symbols trimmed and uppercased) or the
/// violation. Validation happens before any write, so an over-quota request
/// changes nothing.
pub fn validate_favorites(
    tier: Tier,
    tickers: &[FavoriteTicker],
) -> Result<Vec<FavoriteTicker>, QuotaError> {
    let limit = tier.ticker_limit();
    if tickers.len() > limit {
        return Err(QuotaError::Exceeded {
            tier,
            limit,
            requested: tickers.len(),
        });
    }

    let mut normalized = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let ticker = ticker.clone().normalized();
        if ticker.symbol.is_empty() {
            return Err(QuotaError::InvalidSymbol(ticker.symbol));
        }
        normalized.push(ticker);
    }
    Ok(normalized)
}

/// Trim an over-quota favorites list after a downgrade.
///
/// Entries with daily updates enabled are kept in preference to those
/// without; within each group the original order is preserved.
pub fn trim_to_limit(mut tickers: Vec<FavoriteTicker>, limit: usize) -> Vec<FavoriteTicker> {
    if tickers.len() > limit {
        tickers.sort_by_key(|t| !t.daily_updates);
        tickers.truncate(limit);
    }
    tickers
}

#[cfg(test)]
mod tests {
    use fingate_core::SubscriptionStatus;

    use super::*;

    #[test]
    fn over_quota_is_rejected() {
        let tickers: Vec<FavoriteTicker> = ["AAPL", "MSFT", "GOOG", "AMZN", "META", "NVDA"]
            .iter()
            .map(|s| FavoriteTicker::new(*s, false))
            .collect();
        let err = validate_favorites(Tier::Standard, &tickers).unwrap_err();
        assert_eq!(
            err,
            QuotaError::Exceeded {
                tier: Tier::Standard,
                limit: 5,
                requested: 6,
            }
        );

        // Exactly at the limit is fine.
        assert_eq!(validate_favorites(Tier::Standard, &tickers[..5]).unwrap().len(), 5);
    }

    #[test]
    fn free_tier_allows_no_favorites() {
        let tickers = vec![FavoriteTicker::new("AAPL", false)];
        assert!(validate_favorites(Tier::Free, &tickers).is_err());
        assert!(validate_favorites(Tier::Free, &[]).unwrap().is_empty());
    }

    #[test]
    fn symbols_are_normalized_and_blank_rejected() {
        let tickers = vec![FavoriteTicker {
            symbol: " aapl ".to_string(),
            display_name: None,
            daily_updates: true,
        }];
        let normalized = validate_favorites(Tier::Standard, &tickers).unwrap();
        assert_eq!(normalized[0].symbol, "AAPL");

        let blank = vec![FavoriteTicker {
            symbol: "   ".to_string(),
            display_name: None,
            daily_updates: false,
        }];
        assert_eq!(
            validate_favorites(Tier::Standard, &blank).unwrap_err(),
            QuotaError::InvalidSymbol(String::new())
        );
    }

    #[test]
    fn trim_prefers_daily_update_entries() {
        let tickers = vec![
            FavoriteTicker::new("AAPL", false),
            FavoriteTicker::new("MSFT", true),
            FavoriteTicker::new("GOOG", false),
            FavoriteTicker::new("NVDA", true),
        ];
        let trimmed = trim_to_limit(tickers, 3);
        let symbols: Vec<&str> = trimmed.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, ["MSFT", "NVDA", "AAPL"]);
    }

    #[test]
    fn trim_is_a_noop_under_limit() {
        let tickers = vec![
            FavoriteTicker::new("AAPL", false),
            FavoriteTicker::new("MSFT", true),
        ];
        assert_eq!(trim_to_limit(tickers.clone(), 5), tickers);
    }

    #[test]
    fn lapsed_subscription_counts_as_free() {
        let canceled = SubscriptionState {
            tier: Tier::Vip,
            status: SubscriptionStatus::Canceled,
            ..Default::default()
        };
        assert_eq!(effective_tier(&canceled), Tier::Free);
        assert_eq!(TierInfo::new(&canceled, 0).limit, 0);

        let past_due = SubscriptionState {
            tier: Tier::Vip,
            status: SubscriptionStatus::PastDue,
            ..Default::default()
        };
        assert_eq!(effective_tier(&past_due), Tier::Vip);
        let info = TierInfo::new(&past_due, 12);
        assert_eq!(info.limit, 50);
        assert_eq!(info.remaining, 38);
    }
}
