//! The consent reconciler.

use fingate_core::defaults::CONSENT_PUT_MAX_RETRIES;
use fingate_core::{
    ConsentChangeLogEntry, ConsentPreferences, ConsentRecord, ConsentSource, EffectiveConsent,
    RemoteConsentRecord,
};
use fingate_store::{ConsentChanged, ConsentStore, StoreError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::local::LocalConsentCache;
use crate::sink::{ConsentSink, NoopSink};

/// Outcome of a remote consent write.
#[derive(Debug, Clone, Copy)]
struct RemoteWrite {
    revision: u64,
    changed: bool,
}

/// Reconciles the device-local consent cache with the per-user remote
/// record and routes every explicit decision through both.
///
/// Remote-store failures inside [`reconcile`](Self::reconcile) and
/// [`apply_decision`](Self::apply_decision) are swallowed by design: the
/// local decision applies for the session and the returned
/// [`EffectiveConsent::store_connected`] flag reports the degradation. Only
/// [`change_history`](Self::change_history) and [`erase`](Self::erase)
/// surface store errors, since they have no local fallback.
pub struct ConsentService<S, L, K = NoopSink> {
    store: S,
    local: L,
    sink: K,
}

impl<S, L> ConsentService<S, L, NoopSink>
where
    S: ConsentStore,
    L: LocalConsentCache,
{
    /// Create a service with no consent-gated side effects.
    pub fn new(store: S, local: L) -> Self {
        Self {
            store,
            local,
            sink: NoopSink,
        }
    }
}

impl<S, L, K> ConsentService<S, L, K>
where
    S: ConsentStore,
    L: LocalConsentCache,
    K: ConsentSink,
{
    /// Create a service that applies `sink` on every decision.
    pub fn with_sink(store: S, local: L, sink: K) -> Self {
        Self { store, local, sink }
    }

    /// Resolve the effective consent for the current session.
    ///
    /// Anonymous sessions resolve from the local cache alone (default
    /// essential-only when no decision was ever made) with no persistence.
    /// Authenticated sessions run the full login reconciliation.
    pub async fn reconcile(&self, user_id: Option<&str>) -> EffectiveConsent {
        match user_id {
            Some(uid) => self.reconcile_on_login(uid).await,
            None => {
                let preferences = self
                    .local
                    .load()
                    .map(|record| record.preferences)
                    .unwrap_or_default();
                EffectiveConsent::local(preferences, true)
            }
        }
    }

    /// Reconcile local and remote state after an anonymous→authenticated
    /// transition.
    ///
    /// - Remote record present: remote wins. The local cache is overwritten
    ///   to match; the overwrite is a sync, not a decision, and produces no
    ///   change-log entry.
    /// - Remote absent, local decision present: the local decision is
    ///   promoted to remote revision 1, with exactly one change-log entry
    ///   whose previous preferences are the implicit default.
    /// - Neither present: default, no writes anywhere.
    pub async fn reconcile_on_login(&self, user_id: &str) -> EffectiveConsent {
        let local = self.local.load();

        let remote = match self.store.consent(user_id).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "consent store unreachable, using local state");
                let preferences = local.map(|r| r.preferences).unwrap_or_default();
                self.sink.apply(&preferences);
                return EffectiveConsent::local(preferences, false);
            }
        };

        match (remote, local) {
            (Some(remote), local) => {
                let differs = local
                    .as_ref()
                    .map_or(true, |l| l.preferences != remote.preferences);
                if differs {
                    if let Err(e) = self.local.store(&ConsentRecord::new(remote.preferences)) {
                        warn!(user_id = %user_id, error = %e, "failed to sync consent to local cache");
                    }
                }
                self.sink.apply(&remote.preferences);
                debug!(user_id = %user_id, revision = remote.revision, synced = differs, "remote consent wins");
                EffectiveConsent {
                    preferences: remote.preferences,
                    analytics_cookie: remote.analytics_cookie,
                    essential_cookie: remote.essential_cookie,
                    store_connected: true,
                }
            }
            (None, Some(local_record)) => {
                // Promote the anonymous decision to the user's account.
                let preferences = local_record.preferences.normalized();
                self.sink.apply(&preferences);
                match self
                    .write_remote(
                        user_id,
                        preferences,
                        preferences.analytics,
                        true,
                        ConsentSource::Api,
                    )
                    .await
                {
                    Ok(write) => {
                        debug!(user_id = %user_id, revision = write.revision, "local consent promoted to remote");
                        EffectiveConsent::local(preferences, true)
                    }
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "consent promotion failed, staying local");
                        EffectiveConsent::local(preferences, false)
                    }
                }
            }
            (None, None) => EffectiveConsent::local(ConsentPreferences::default(), true),
        }
    }

    /// Record an explicit consent decision.
    ///
    /// The local write and the side-effect sink run first and
    /// unconditionally; the remote write only happens for authenticated
    /// users and its failure never blocks the decision.
    pub async fn apply_decision(
        &self,
        preferences: ConsentPreferences,
        analytics_cookie: bool,
        essential_cookie: bool,
        user_id: Option<&str>,
        source: ConsentSource,
    ) -> EffectiveConsent {
        let preferences = preferences.normalized();

        if let Err(e) = self.local.store(&ConsentRecord::new(preferences)) {
            // Storage-quota exhaustion and friends: the decision still
            // applies for this session.
            warn!(error = %e, "failed to persist consent decision locally");
        }
        self.sink.apply(&preferences);

        let mut store_connected = true;
        if let Some(uid) = user_id {
            match self
                .write_remote(uid, preferences, analytics_cookie, essential_cookie, source)
                .await
            {
                Ok(write) => {
                    debug!(
                        user_id = %uid,
                        revision = write.revision,
                        changed = write.changed,
                        source = %source,
                        "consent decision persisted remotely"
                    );
                }
                Err(e) => {
                    warn!(user_id = %uid, error = %e, "remote consent write failed, local decision stands");
                    store_connected = false;
                }
            }
        }

        EffectiveConsent {
            preferences,
            analytics_cookie,
            essential_cookie,
            store_connected,
        }
    }

    /// The user's consent audit trail, newest first.
    pub async fn change_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConsentChangeLogEntry>, StoreError> {
        self.store.change_history(user_id, limit).await
    }

    /// Subscribe to remote consent changes (all users of the store).
    pub fn subscribe(&self) -> broadcast::Receiver<ConsentChanged> {
        self.store.subscribe()
    }

    /// Whether a fresh banner decision is required on this device: no
    /// cached decision exists, or the cached one was recorded under an
    /// outdated consent schema. A stale decision still applies for the
    /// session; it just has to be re-asked.
    pub fn is_consent_required(&self) -> bool {
        self.local.load().map_or(true, |record| record.is_stale())
    }

    /// Remove the locally cached decision.
    pub fn clear_local(&self) {
        if let Err(e) = self.local.clear() {
            warn!(error = %e, "failed to clear local consent cache");
        }
    }

    /// Erase all consent data for a user: remote record, change log, and
    /// the local cache.
    pub async fn erase(&self, user_id: &str) -> Result<(), StoreError> {
        self.store.delete_consent_data(user_id).await?;
        self.clear_local();
        Ok(())
    }

    /// Compare-and-swap write of the remote record.
    ///
    /// Re-reads and retries a bounded number of times when another writer
    /// claims the revision first. Unchanged preferences are an idempotent
    /// no-op: flags and `updated_at` are refreshed, the revision stays, and
    /// no change-log entry is written.
    async fn write_remote(
        &self,
        user_id: &str,
        preferences: ConsentPreferences,
        analytics_cookie: bool,
        essential_cookie: bool,
        source: ConsentSource,
    ) -> Result<RemoteWrite, StoreError> {
        for _ in 0..=CONSENT_PUT_MAX_RETRIES {
            let current = self.store.consent(user_id).await?;

            if let Some(current) = &current {
                if current.preferences == preferences {
                    self.store
                        .touch_consent(user_id, analytics_cookie, essential_cookie)
                        .await?;
                    return Ok(RemoteWrite {
                        revision: current.revision,
                        changed: false,
                    });
                }
            }

            let previous = current.as_ref().map(|c| c.preferences).unwrap_or_default();
            let revision = current.as_ref().map_or(1, |c| c.revision + 1);
            let record = RemoteConsentRecord::new(
                preferences,
                analytics_cookie,
                essential_cookie,
                revision,
                source,
            );

            match self.store.put_consent(user_id, &record).await {
                Ok(()) => {
                    let entry = ConsentChangeLogEntry {
                        revision,
                        previous_preferences: previous,
                        new_preferences: preferences,
                        source,
                        timestamp: record.updated_at,
                    };
                    self.store.append_change_log(user_id, &entry).await?;
                    return Ok(RemoteWrite {
                        revision,
                        changed: true,
                    });
                }
                Err(StoreError::RevisionConflict { expected }) => {
                    debug!(user_id = %user_id, expected, "consent write lost revision race, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::Backend(
            "consent write kept losing the revision race".to_string(),
        ))
    }
}
