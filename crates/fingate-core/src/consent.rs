//! Consent preference types.
//!
//! Two stores exist for a user's cookie-consent decision: a device-local
//! cache ([`ConsentRecord`]) and a per-user remote document
//! ([`RemoteConsentRecord`]) with a monotonically increasing revision and an
//! append-only change log. The reconciliation rules live in
//! `fingate-consent`; this module only defines the data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::CONSENT_SCHEMA_VERSION;

/// A user's cookie-consent decision.
///
/// `essential` can never be persisted as `false`; every constructor and
/// every persist boundary goes through [`normalized`](Self::normalized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPreferences {
    /// Strictly-necessary cookies. Always `true`.
    pub essential: bool,
    /// Analytics/measurement cookies.
    pub analytics: bool,
}

impl ConsentPreferences {
    /// Create preferences with the given analytics choice.
    #[inline]
    pub fn new(analytics: bool) -> Self {
        Self {
            essential: true,
            analytics,
        }
    }

    /// Force the `essential` invariant, whatever the input claimed.
    #[inline]
    pub fn normalized(self) -> Self {
        Self {
            essential: true,
            ..self
        }
    }
}

impl Default for ConsentPreferences {
    /// The implicit pre-decision state: essential only.
    fn default() -> Self {
        Self::new(false)
    }
}

/// Where a consent decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentSource {
    /// The first-visit cookie banner.
    Banner,
    /// The cookie settings panel.
    Settings,
    /// Programmatic writes (login sync, migrations).
    Api,
}

impl ConsentSource {
    /// Stable string form, matching the serialized representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Settings => "settings",
            Self::Api => "api",
        }
    }

    /// Parse a stored label. Unknown labels map to [`ConsentSource::Api`],
    /// the programmatic bucket.
    pub fn from_label(label: &str) -> Self {
        match label {
            "banner" => Self::Banner,
            "settings" => Self::Settings,
            _ => Self::Api,
        }
    }
}

impl std::fmt::Display for ConsentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The device-local consent cache entry.
///
/// Owned exclusively by one browser/device context; there is no cross-device
/// identity attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub preferences: ConsentPreferences,
    pub timestamp: DateTime<Utc>,
    pub schema_version: String,
}

impl ConsentRecord {
    /// Create a record stamped with the current time and schema version.
    pub fn new(preferences: ConsentPreferences) -> Self {
        Self {
            preferences: preferences.normalized(),
            timestamp: Utc::now(),
            schema_version: CONSENT_SCHEMA_VERSION.to_string(),
        }
    }

    /// Whether this record is from an outdated consent schema.
    ///
    /// A stale record still applies for the current session but should
    /// trigger a fresh banner decision.
    pub fn is_stale(&self) -> bool {
        self.schema_version != CONSENT_SCHEMA_VERSION
    }

    /// Age of the decision in whole days, if the clock hasn't gone backwards.
    pub fn age_days(&self) -> Option<i64> {
        let days = (Utc::now() - self.timestamp).num_days();
        (days >= 0).then_some(days)
    }
}

/// The per-user remote consent document.
///
/// `revision` strictly increases by 1 on every successful preference write
/// and is never reused; flag-only updates do not bump it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConsentRecord {
    pub preferences: ConsentPreferences,
    /// Auxiliary cookie flag mirrored from the settings UI.
    pub analytics_cookie: bool,
    /// Auxiliary cookie flag; effectively always `true`.
    pub essential_cookie: bool,
    pub revision: u64,
    pub source: ConsentSource,
    pub schema_version: String,
    pub updated_at: DateTime<Utc>,
}

impl RemoteConsentRecord {
    /// Build a record at the given revision, stamped with the current time.
    pub fn new(
        preferences: ConsentPreferences,
        analytics_cookie: bool,
        essential_cookie: bool,
        revision: u64,
        source: ConsentSource,
    ) -> Self {
        Self {
            preferences: preferences.normalized(),
            analytics_cookie,
            essential_cookie,
            revision,
            source,
            schema_version: CONSENT_SCHEMA_VERSION.to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// One entry in a user's append-only consent audit trail.
///
/// Written if and only if `previous_preferences != new_preferences`;
/// `revision` matches the remote record revision claimed by that write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentChangeLogEntry {
    pub revision: u64,
    pub previous_preferences: ConsentPreferences,
    pub new_preferences: ConsentPreferences,
    pub source: ConsentSource,
    pub timestamp: DateTime<Utc>,
}

/// The resolved consent state returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConsent {
    pub preferences: ConsentPreferences,
    pub analytics_cookie: bool,
    pub essential_cookie: bool,
    /// `false` when the remote store was unreachable and the result is
    /// local-only for this session.
    pub store_connected: bool,
}

impl EffectiveConsent {
    /// Local-only consent derived from preferences alone.
    pub fn local(preferences: ConsentPreferences, store_connected: bool) -> Self {
        let preferences = preferences.normalized();
        Self {
            preferences,
            analytics_cookie: preferences.analytics,
            essential_cookie: true,
            store_connected,
        }
    }
}
