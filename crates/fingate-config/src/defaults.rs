//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `fingate_core::defaults`.

use fingate_core::defaults;

/// Generate default value functions that forward to fingate_core::defaults constants.
macro_rules! default_fns {
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

default_fns! {
    default_history_limit            => DEFAULT_HISTORY_LIMIT: usize,
    default_billing_timeout_secs     => DEFAULT_BILLING_TIMEOUT_SECS: u64,
    default_integration_timeout_secs => DEFAULT_INTEGRATION_TIMEOUT_SECS: u64,
    default_profile_max_attempts     => DEFAULT_PROFILE_MAX_ATTEMPTS: u32,
    default_profile_backoff_ms       => DEFAULT_PROFILE_BACKOFF_MS: u64,
    default_store_max_connections    => DEFAULT_STORE_MAX_CONNECTIONS: u32,
    default_store_connect_timeout_secs => DEFAULT_STORE_CONNECT_TIMEOUT_SECS: u64,
}
