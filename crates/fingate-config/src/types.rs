//! Configuration type definitions for the store, consent, billing,
//! integration, and logging sections.

use std::collections::HashMap;

use fingate_core::{Tier, TierPriceMap};
use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub consent: ConsentConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database URL, e.g. `sqlite://fingate.db`.
    pub database_url: String,
    #[serde(default = "default_store_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_store_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Path of the device-local consent cache file. None keeps the cache
    /// in memory only.
    #[serde(default)]
    pub cache_path: Option<String>,
    /// Default number of change-log entries returned by history queries.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            history_limit: default_history_limit(),
        }
    }
}

/// Billing section. The price map here is the canonical price-to-tier
/// mapping; edits take effect by reloading the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Price-id to tier-label mapping, e.g. `price_123 = "premium"`.
    #[serde(default)]
    pub tier_prices: HashMap<String, Tier>,
    /// Timeout for provider lookups in seconds.
    #[serde(default = "default_billing_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            tier_prices: HashMap::new(),
            timeout_secs: default_billing_timeout_secs(),
        }
    }
}

impl BillingConfig {
    pub fn price_map(&self) -> TierPriceMap {
        TierPriceMap(self.tier_prices.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Disabled skips profile provisioning entirely.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the integration platform's API. Required when enabled.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_integration_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_profile_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_profile_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            timeout_secs: default_integration_timeout_secs(),
            max_attempts: default_profile_max_attempts(),
            backoff_ms: default_profile_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
}
