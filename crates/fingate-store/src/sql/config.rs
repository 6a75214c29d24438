//! SQL store configuration.

use std::time::Duration;

use fingate_core::defaults::{DEFAULT_STORE_CONNECT_TIMEOUT_SECS, DEFAULT_STORE_MAX_CONNECTIONS};

/// Connection configuration for [`SqlStore`](super::SqlStore).
#[derive(Debug, Clone)]
pub struct SqlStoreConfig {
    /// Database URL (`sqlite:...`).
    pub database_url: String,
    /// Maximum pool connections.
    pub max_connections: u32,
    /// Timeout for acquiring a connection.
    pub connect_timeout: Duration,
}

impl SqlStoreConfig {
    /// Create a configuration with defaults for the given URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_STORE_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_STORE_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
