//! Configuration validation logic.

use crate::loader::ConfigError;
use crate::Config;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.store.database_url.trim().is_empty() {
        return Err(ConfigError::Validation("store.database_url is empty".into()));
    }
    if config.store.max_connections == 0 {
        return Err(ConfigError::Validation(
            "store.max_connections must be > 0".into(),
        ));
    }
    if config.store.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "store.connect_timeout_secs must be > 0".into(),
        ));
    }
    if config.consent.history_limit == 0 {
        return Err(ConfigError::Validation(
            "consent.history_limit must be > 0".into(),
        ));
    }
    if config.billing.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "billing.timeout_secs must be > 0".into(),
        ));
    }
    if config.integration.enabled {
        if config
            .integration
            .base_url
            .as_deref()
            .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "integration.base_url is required when integration is enabled".into(),
            ));
        }
        if config.integration.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "integration.timeout_secs must be > 0".into(),
            ));
        }
        if config.integration.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "integration.max_attempts must be > 0".into(),
            ));
        }
        if config.integration.backoff_ms == 0 {
            return Err(ConfigError::Validation(
                "integration.backoff_ms must be > 0".into(),
            ));
        }
    }
    if let Some(level) = &config.logging.level {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of: {:?}",
                valid
            )));
        }
    }
    Ok(())
}
