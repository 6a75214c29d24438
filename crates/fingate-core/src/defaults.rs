//! Default constants shared across fingate crates.
//!
//! Config defaults forward to these so the wire format and the code agree on
//! a single value.

/// Schema version stamped on every persisted consent record.
///
/// Bumping this invalidates stored decisions: a cached record with an older
/// version requires a fresh consent decision.
pub const CONSENT_SCHEMA_VERSION: &str = "1.0";

/// Default number of change-log entries returned by history queries.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Favorite-ticker quota for the `free` tier.
pub const TICKER_LIMIT_FREE: usize = 0;
/// Favorite-ticker quota for the `standard` tier.
pub const TICKER_LIMIT_STANDARD: usize = 5;
/// Favorite-ticker quota for the `premium` tier.
pub const TICKER_LIMIT_PREMIUM: usize = 20;
/// Favorite-ticker quota for the `vip` tier.
pub const TICKER_LIMIT_VIP: usize = 50;
/// Favorite-ticker quota for the `ultimate` tier.
pub const TICKER_LIMIT_ULTIMATE: usize = 100;

/// Timeout for billing-provider calls, in seconds.
pub const DEFAULT_BILLING_TIMEOUT_SECS: u64 = 10;

/// Timeout for a single integration-platform call, in seconds.
pub const DEFAULT_INTEGRATION_TIMEOUT_SECS: u64 = 10;

/// Attempts per integration-platform profile request before giving up.
pub const DEFAULT_PROFILE_MAX_ATTEMPTS: u32 = 3;

/// Initial backoff between profile request attempts, in milliseconds.
/// Doubles after each failed attempt.
pub const DEFAULT_PROFILE_BACKOFF_MS: u64 = 500;

/// Bounded retries when a remote consent write loses a revision race.
pub const CONSENT_PUT_MAX_RETRIES: u32 = 3;

/// Capacity of the consent change broadcast channel.
pub const CONSENT_EVENT_CAPACITY: usize = 64;

/// Default SQL store connection pool size.
pub const DEFAULT_STORE_MAX_CONNECTIONS: u32 = 5;

/// Default SQL store connect timeout, in seconds.
pub const DEFAULT_STORE_CONNECT_TIMEOUT_SECS: u64 = 10;
