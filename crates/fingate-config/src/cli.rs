//! Command-line overrides applied on top of the loaded config file.

use clap::Parser;

use crate::Config;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override database URL, e.g. sqlite://fingate.db
    #[arg(long)]
    pub database_url: Option<String>,
    /// Override local consent cache path
    #[arg(long)]
    pub consent_cache: Option<String>,
    /// Override change-history limit
    #[arg(long)]
    pub history_limit: Option<usize>,
    /// Override billing lookup timeout (seconds)
    #[arg(long)]
    pub billing_timeout_secs: Option<u64>,
    /// Enable or disable integration profile provisioning
    #[arg(long)]
    pub integration_enabled: Option<bool>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.database_url {
        config.store.database_url = v.clone();
    }
    if let Some(v) = &overrides.consent_cache {
        config.consent.cache_path = Some(v.clone());
    }
    if let Some(v) = overrides.history_limit {
        config.consent.history_limit = v;
    }
    if let Some(v) = overrides.billing_timeout_secs {
        config.billing.timeout_secs = v;
    }
    if let Some(v) = overrides.integration_enabled {
        config.integration.enabled = v;
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
}
