//! Configuration loading and CLI definitions.
//!
//! Configuration resolves in three layers: file (json/jsonc/yaml/toml by
//! extension), command-line overrides, then validation. The billing
//! section's `tier_prices` table is the canonical price-to-tier mapping.

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{apply_overrides, CliOverrides};
pub use loader::{load_config, ConfigError};
pub use types::{
    BillingConfig, Config, ConsentConfig, IntegrationConfig, LoggingConfig, StoreConfig,
};
pub use validate::validate_config;
