//! Favorite-ticker entries.

use serde::{Deserialize, Serialize};

/// One entry in a user's favorite-ticker list.
///
/// The list lives on the user document and is bounded by the quota of the
/// user's current tier (see `fingate-entitlement`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteTicker {
    /// Instrument symbol, stored uppercased and trimmed.
    pub symbol: String,
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the user receives daily update notifications for this symbol.
    pub daily_updates: bool,
}

impl FavoriteTicker {
    pub fn new(symbol: impl Into<String>, daily_updates: bool) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: None,
            daily_updates,
        }
        .normalized()
    }

    /// Trim and uppercase the symbol.
    pub fn normalized(mut self) -> Self {
        self.symbol = self.symbol.trim().to_uppercase();
        self
    }
}
