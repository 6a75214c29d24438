//! Data-access traits for the consent record and the user document.

use std::sync::Arc;

use async_trait::async_trait;
use fingate_core::{ConsentChangeLogEntry, FavoriteTicker, RemoteConsentRecord, SubscriptionState};
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::events::ConsentChanged;
use crate::record::UserRecord;

/// Data-access layer for the per-user remote consent record.
///
/// `put_consent` is the linearization point for all consent writes: the
/// store must accept a record only when its `revision` is exactly one more
/// than the stored revision (or `1` when no record exists), and must reject
/// everything else with [`StoreError::RevisionConflict`] carrying the
/// revision a retry has to claim. Implementations serialize this check and
/// the write per user (one mutex, one SQL conditional update, ...).
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Fetch the current consent record, `None` if the user never decided.
    async fn consent(&self, user_id: &str) -> Result<Option<RemoteConsentRecord>, StoreError>;

    /// Write a consent record claiming the next revision.
    ///
    /// On success the store publishes a [`ConsentChanged`] event.
    async fn put_consent(
        &self,
        user_id: &str,
        record: &RemoteConsentRecord,
    ) -> Result<(), StoreError>;

    /// Refresh the auxiliary cookie flags and `updated_at` without bumping
    /// the revision. No-op when the user has no consent record.
    async fn touch_consent(
        &self,
        user_id: &str,
        analytics_cookie: bool,
        essential_cookie: bool,
    ) -> Result<(), StoreError>;

    /// Append an audit-trail entry. Revisions are unique per user; a
    /// duplicate fails with [`StoreError::DuplicateRevision`].
    async fn append_change_log(
        &self,
        user_id: &str,
        entry: &ConsentChangeLogEntry,
    ) -> Result<(), StoreError>;

    /// Change-log entries, newest first.
    async fn change_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConsentChangeLogEntry>, StoreError>;

    /// Erase the consent record and the full change log for a user.
    async fn delete_consent_data(&self, user_id: &str) -> Result<(), StoreError>;

    /// Subscribe to consent changes across all users of this store.
    fn subscribe(&self) -> broadcast::Receiver<ConsentChanged>;
}

/// Data-access layer for the user document.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch a user document.
    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Upsert a full user document.
    async fn put_user(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// Upsert the subscription fields of a user document.
    async fn put_subscription(
        &self,
        user_id: &str,
        state: &SubscriptionState,
    ) -> Result<(), StoreError>;

    /// Replace the favorites list. Quota validation is the caller's job.
    async fn put_favorites(
        &self,
        user_id: &str,
        tickers: &[FavoriteTicker],
    ) -> Result<(), StoreError>;

    /// All known user ids, for migration batches.
    async fn user_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Blanket implementation for `Arc<S>` where `S: ConsentStore`.
#[async_trait]
impl<S: ConsentStore + ?Sized> ConsentStore for Arc<S> {
    #[inline]
    async fn consent(&self, user_id: &str) -> Result<Option<RemoteConsentRecord>, StoreError> {
        (**self).consent(user_id).await
    }

    #[inline]
    async fn put_consent(
        &self,
        user_id: &str,
        record: &RemoteConsentRecord,
    ) -> Result<(), StoreError> {
        (**self).put_consent(user_id, record).await
    }

    #[inline]
    async fn touch_consent(
        &self,
        user_id: &str,
        analytics_cookie: bool,
        essential_cookie: bool,
    ) -> Result<(), StoreError> {
        (**self)
            .touch_consent(user_id, analytics_cookie, essential_cookie)
            .await
    }

    #[inline]
    async fn append_change_log(
        &self,
        user_id: &str,
        entry: &ConsentChangeLogEntry,
    ) -> Result<(), StoreError> {
        (**self).append_change_log(user_id, entry).await
    }

    #[inline]
    async fn change_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConsentChangeLogEntry>, StoreError> {
        (**self).change_history(user_id, limit).await
    }

    #[inline]
    async fn delete_consent_data(&self, user_id: &str) -> Result<(), StoreError> {
        (**self).delete_consent_data(user_id).await
    }

    #[inline]
    fn subscribe(&self) -> broadcast::Receiver<ConsentChanged> {
        (**self).subscribe()
    }
}

/// Blanket implementation for `Arc<S>` where `S: UserStore`.
#[async_trait]
impl<S: UserStore + ?Sized> UserStore for Arc<S> {
    #[inline]
    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        (**self).user(user_id).await
    }

    #[inline]
    async fn put_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        (**self).put_user(record).await
    }

    #[inline]
    async fn put_subscription(
        &self,
        user_id: &str,
        state: &SubscriptionState,
    ) -> Result<(), StoreError> {
        (**self).put_subscription(user_id, state).await
    }

    #[inline]
    async fn put_favorites(
        &self,
        user_id: &str,
        tickers: &[FavoriteTicker],
    ) -> Result<(), StoreError> {
        (**self).put_favorites(user_id, tickers).await
    }

    #[inline]
    async fn user_ids(&self) -> Result<Vec<String>, StoreError> {
        (**self).user_ids().await
    }
}
