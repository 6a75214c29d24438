//! In-memory store backend.
//!
//! All operations for all users go through one mutex, which trivially
//! satisfies the per-user linearization the [`ConsentStore`] contract
//! requires. This is the reference implementation used throughout the test
//! suites and is suitable for single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use fingate_core::{ConsentChangeLogEntry, FavoriteTicker, RemoteConsentRecord, SubscriptionState};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::events::{ConsentChanged, ConsentEvents};
use crate::record::UserRecord;
use crate::traits::{ConsentStore, UserStore};

#[derive(Debug, Default)]
struct UserState {
    consent: Option<RemoteConsentRecord>,
    change_log: Vec<ConsentChangeLogEntry>,
    user: Option<UserRecord>,
}

/// In-memory [`ConsentStore`] and [`UserStore`] backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, UserState>>,
    events: ConsentEvents,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with any stored state.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[async_trait]
impl ConsentStore for MemoryStore {
    async fn consent(&self, user_id: &str) -> Result<Option<RemoteConsentRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .get(user_id)
            .and_then(|state| state.consent.clone()))
    }

    async fn put_consent(
        &self,
        user_id: &str,
        record: &RemoteConsentRecord,
    ) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.lock();
            let state = inner.entry(user_id.to_string()).or_default();
            let expected = state.consent.as_ref().map_or(1, |c| c.revision + 1);
            if record.revision != expected {
                return Err(StoreError::RevisionConflict { expected });
            }
            state.consent = Some(record.clone());
        }

        self.events.publish(ConsentChanged {
            user_id: user_id.to_string(),
            preferences: record.preferences,
            revision: record.revision,
        });
        Ok(())
    }

    async fn touch_consent(
        &self,
        user_id: &str,
        analytics_cookie: bool,
        essential_cookie: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(consent) = inner.get_mut(user_id).and_then(|s| s.consent.as_mut()) {
            consent.analytics_cookie = analytics_cookie;
            consent.essential_cookie = essential_cookie;
            consent.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn append_change_log(
        &self,
        user_id: &str,
        entry: &ConsentChangeLogEntry,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner.entry(user_id.to_string()).or_default();
        if state.change_log.iter().any(|e| e.revision == entry.revision) {
            return Err(StoreError::DuplicateRevision {
                revision: entry.revision,
            });
        }
        state.change_log.push(entry.clone());
        Ok(())
    }

    async fn change_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConsentChangeLogEntry>, StoreError> {
        let inner = self.inner.lock();
        let Some(state) = inner.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut entries = state.change_log.clone();
        entries.sort_by(|a, b| b.revision.cmp(&a.revision));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn delete_consent_data(&self, user_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.get_mut(user_id) {
            state.consent = None;
            state.change_log.clear();
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConsentChanged> {
        self.events.subscribe()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .get(user_id)
            .and_then(|state| state.user.clone()))
    }

    async fn put_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner.entry(record.user_id.clone()).or_default();
        state.user = Some(record.clone());
        Ok(())
    }

    async fn put_subscription(
        &self,
        user_id: &str,
        subscription: &SubscriptionState,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner.entry(user_id.to_string()).or_default();
        let user = state
            .user
            .get_or_insert_with(|| UserRecord::new(user_id.to_string()));
        user.subscription = subscription.clone();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn put_favorites(
        &self,
        user_id: &str,
        tickers: &[FavoriteTicker],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner.entry(user_id.to_string()).or_default();
        let user = state
            .user
            .get_or_insert_with(|| UserRecord::new(user_id.to_string()));
        user.favorite_tickers = tickers.to_vec();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn user_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .iter()
            .filter(|(_, state)| state.user.is_some())
            .map(|(id, _)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingate_core::{ConsentPreferences, ConsentSource, Tier};

    fn record(revision: u64, analytics: bool) -> RemoteConsentRecord {
        RemoteConsentRecord::new(
            ConsentPreferences::new(analytics),
            analytics,
            true,
            revision,
            ConsentSource::Settings,
        )
    }

    #[tokio::test]
    async fn put_consent_enforces_revision_sequence() {
        let store = MemoryStore::new();

        store.put_consent("u1", &record(1, true)).await.unwrap();

        // Re-claiming revision 1 conflicts and reports the next revision.
        let err = store.put_consent("u1", &record(1, false)).await.unwrap_err();
        assert!(matches!(err, StoreError::RevisionConflict { expected: 2 }));

        // Skipping ahead conflicts too.
        let err = store.put_consent("u1", &record(5, false)).await.unwrap_err();
        assert!(matches!(err, StoreError::RevisionConflict { expected: 2 }));

        store.put_consent("u1", &record(2, false)).await.unwrap();
        let current = store.consent("u1").await.unwrap().unwrap();
        assert_eq!(current.revision, 2);
        assert!(!current.preferences.analytics);
    }

    #[tokio::test]
    async fn first_write_must_claim_revision_one() {
        let store = MemoryStore::new();
        let err = store.put_consent("u1", &record(3, true)).await.unwrap_err();
        assert!(matches!(err, StoreError::RevisionConflict { expected: 1 }));
    }

    #[tokio::test]
    async fn concurrent_writers_never_share_a_revision() {
        let store = std::sync::Arc::new(MemoryStore::new());

        let mut handles = Vec::new();
        for i in 0..16u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                // Retry with the reported next revision until the write lands.
                let mut revision = 1;
                loop {
                    match store.put_consent("u1", &record(revision, i % 2 == 0)).await {
                        Ok(()) => return revision,
                        Err(StoreError::RevisionConflict { expected }) => revision = expected,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            }));
        }

        let mut claimed = Vec::new();
        for handle in handles {
            claimed.push(handle.await.unwrap());
        }
        claimed.sort_unstable();
        let expected: Vec<u64> = (1..=16).collect();
        assert_eq!(claimed, expected);
    }

    #[tokio::test]
    async fn change_log_is_unique_per_revision_and_ordered() {
        let store = MemoryStore::new();
        let entry = |revision| ConsentChangeLogEntry {
            revision,
            previous_preferences: ConsentPreferences::default(),
            new_preferences: ConsentPreferences::new(true),
            source: ConsentSource::Banner,
            timestamp: Utc::now(),
        };

        store.append_change_log("u1", &entry(1)).await.unwrap();
        store.append_change_log("u1", &entry(2)).await.unwrap();
        let err = store.append_change_log("u1", &entry(2)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRevision { revision: 2 }));

        let history = store.change_history("u1", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].revision, 2);
        assert_eq!(history[1].revision, 1);

        let limited = store.change_history("u1", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].revision, 2);
    }

    #[tokio::test]
    async fn touch_updates_flags_without_bumping_revision() {
        let store = MemoryStore::new();
        store.put_consent("u1", &record(1, true)).await.unwrap();

        store.touch_consent("u1", false, true).await.unwrap();
        let current = store.consent("u1").await.unwrap().unwrap();
        assert_eq!(current.revision, 1);
        assert!(!current.analytics_cookie);
        // Preferences themselves are untouched.
        assert!(current.preferences.analytics);
    }

    #[tokio::test]
    async fn put_consent_publishes_event() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.put_consent("u1", &record(1, true)).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id, "u1");
        assert_eq!(event.revision, 1);
        assert!(event.preferences.analytics);
    }

    #[tokio::test]
    async fn delete_erases_consent_and_log_only() {
        let store = MemoryStore::new();
        store.put_consent("u1", &record(1, true)).await.unwrap();
        store
            .put_favorites("u1", &[FavoriteTicker::new("AAPL", true)])
            .await
            .unwrap();

        store.delete_consent_data("u1").await.unwrap();
        assert!(store.consent("u1").await.unwrap().is_none());
        assert!(store.change_history("u1", 10).await.unwrap().is_empty());
        // The user document survives GDPR erasure of consent data.
        let user = store.user("u1").await.unwrap().unwrap();
        assert_eq!(user.favorite_tickers.len(), 1);
    }

    #[tokio::test]
    async fn subscription_upsert_creates_user() {
        let store = MemoryStore::new();
        let state = SubscriptionState {
            tier: Tier::Premium,
            ..Default::default()
        };
        store.put_subscription("u1", &state).await.unwrap();

        let user = store.user("u1").await.unwrap().unwrap();
        assert_eq!(user.subscription.tier, Tier::Premium);
        assert_eq!(store.user_ids().await.unwrap(), vec!["u1".to_string()]);
    }
}
