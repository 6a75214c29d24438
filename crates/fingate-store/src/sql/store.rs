//! SQLite-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fingate_core::{
    ConsentChangeLogEntry, ConsentPreferences, ConsentSource, FavoriteTicker, RemoteConsentRecord,
    SubscriptionState, SubscriptionStatus, Tier,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::events::{ConsentChanged, ConsentEvents};
use crate::record::UserRecord;
use crate::traits::{ConsentStore, UserStore};

use super::config::SqlStoreConfig;
use super::queries;

/// SQLite-backed [`ConsentStore`] and [`UserStore`].
#[derive(Debug)]
pub struct SqlStore {
    pool: SqlitePool,
    events: ConsentEvents,
}

impl SqlStore {
    /// Connect to the database.
    pub async fn connect(config: SqlStoreConfig) -> Result<Self, StoreError> {
        if !config.database_url.starts_with("sqlite:") {
            return Err(StoreError::backend("unsupported database URL scheme"));
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool,
            events: ConsentEvents::new(),
        })
    }

    /// Create the tables if they do not exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(queries::CREATE_CONSENT_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(queries::CREATE_CONSENT_LOG_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(queries::CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The revision the next consent write for `user_id` has to claim.
    async fn next_revision(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .consent_row(user_id)
            .await?
            .map_or(1, |r| r.revision + 1))
    }

    async fn consent_row(&self, user_id: &str) -> Result<Option<RemoteConsentRecord>, StoreError> {
        let row = sqlx::query(queries::SELECT_CONSENT)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(parse_consent_row).transpose()
    }
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::backend(format!("invalid timestamp {millis}")))
}

fn parse_consent_row(row: SqliteRow) -> Result<RemoteConsentRecord, StoreError> {
    let revision: i64 = row.try_get("revision")?;
    let source: String = row.try_get("source")?;
    Ok(RemoteConsentRecord {
        preferences: ConsentPreferences {
            essential: row.try_get("essential")?,
            analytics: row.try_get("analytics")?,
        }
        .normalized(),
        analytics_cookie: row.try_get("analytics_cookie")?,
        essential_cookie: row.try_get("essential_cookie")?,
        revision: revision as u64,
        source: ConsentSource::from_label(&source),
        schema_version: row.try_get("schema_version")?,
        updated_at: timestamp(row.try_get("updated_at")?)?,
    })
}

fn parse_log_row(row: SqliteRow) -> Result<ConsentChangeLogEntry, StoreError> {
    let revision: i64 = row.try_get("revision")?;
    let source: String = row.try_get("source")?;
    Ok(ConsentChangeLogEntry {
        revision: revision as u64,
        previous_preferences: ConsentPreferences {
            essential: row.try_get("prev_essential")?,
            analytics: row.try_get("prev_analytics")?,
        },
        new_preferences: ConsentPreferences {
            essential: row.try_get("new_essential")?,
            analytics: row.try_get("new_analytics")?,
        },
        source: ConsentSource::from_label(&source),
        timestamp: timestamp(row.try_get("created_at")?)?,
    })
}

fn parse_user_row(row: SqliteRow) -> Result<UserRecord, StoreError> {
    let tier: String = row.try_get("tier")?;
    let status: String = row.try_get("status")?;
    let favorites_json: String = row.try_get("favorite_tickers")?;
    let period_end: Option<i64> = row.try_get("current_period_end")?;

    Ok(UserRecord {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        customer_id: row.try_get("customer_id")?,
        subscription: SubscriptionState {
            tier: Tier::from_label(&tier),
            status: SubscriptionStatus::from_provider(&status),
            subscription_id: row.try_get("subscription_id")?,
            current_period_end: period_end.map(timestamp).transpose()?,
        },
        favorite_tickers: serde_json::from_str(&favorites_json)?,
        updated_at: timestamp(row.try_get("updated_at")?)?,
    })
}

#[async_trait]
impl ConsentStore for SqlStore {
    async fn consent(&self, user_id: &str) -> Result<Option<RemoteConsentRecord>, StoreError> {
        self.consent_row(user_id).await
    }

    async fn put_consent(
        &self,
        user_id: &str,
        record: &RemoteConsentRecord,
    ) -> Result<(), StoreError> {
        let prefs = record.preferences.normalized();
        let updated_at = record.updated_at.timestamp_millis();

        let result = if record.revision == 1 {
            sqlx::query(queries::INSERT_CONSENT)
                .bind(user_id)
                .bind(prefs.essential)
                .bind(prefs.analytics)
                .bind(record.analytics_cookie)
                .bind(record.essential_cookie)
                .bind(record.source.as_str())
                .bind(&record.schema_version)
                .bind(updated_at)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query(queries::UPDATE_CONSENT)
                .bind(prefs.essential)
                .bind(prefs.analytics)
                .bind(record.analytics_cookie)
                .bind(record.essential_cookie)
                .bind(record.revision as i64)
                .bind(record.source.as_str())
                .bind(&record.schema_version)
                .bind(updated_at)
                .bind(user_id)
                .bind(record.revision as i64 - 1)
                .execute(&self.pool)
                .await?
        };

        if result.rows_affected() == 0 {
            let expected = self.next_revision(user_id).await?;
            return Err(StoreError::RevisionConflict { expected });
        }

        self.events.publish(ConsentChanged {
            user_id: user_id.to_string(),
            preferences: prefs,
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
        sqlx::query(queries::TOUCH_CONSENT)
            .bind(analytics_cookie)
            .bind(essential_cookie)
            .bind(Utc::now().timestamp_millis())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_change_log(
        &self,
        user_id: &str,
        entry: &ConsentChangeLogEntry,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(queries::INSERT_LOG_ENTRY)
            .bind(user_id)
            .bind(entry.revision as i64)
            .bind(entry.previous_preferences.essential)
            .bind(entry.previous_preferences.analytics)
            .bind(entry.new_preferences.essential)
            .bind(entry.new_preferences.analytics)
            .bind(entry.source.as_str())
            .bind(entry.timestamp.timestamp_millis())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateRevision {
                revision: entry.revision,
            });
        }
        Ok(())
    }

    async fn change_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConsentChangeLogEntry>, StoreError> {
        let rows = sqlx::query(queries::SELECT_LOG_ENTRIES)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(parse_log_row).collect()
    }

    async fn delete_consent_data(&self, user_id: &str) -> Result<(), StoreError> {
        sqlx::query(queries::DELETE_CONSENT)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        sqlx::query(queries::DELETE_LOG_ENTRIES)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConsentChanged> {
        self.events.subscribe()
    }
}

#[async_trait]
impl UserStore for SqlStore {
    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(queries::SELECT_USER)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(parse_user_row).transpose()
    }

    async fn put_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        let favorites = serde_json::to_string(&record.favorite_tickers)?;
        sqlx::query(queries::UPSERT_USER)
            .bind(&record.user_id)
            .bind(&record.email)
            .bind(&record.customer_id)
            .bind(record.subscription.tier.as_str())
            .bind(record.subscription.status.as_str())
            .bind(&record.subscription.subscription_id)
            .bind(
                record
                    .subscription
                    .current_period_end
                    .map(|t| t.timestamp_millis()),
            )
            .bind(favorites)
            .bind(record.updated_at.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_subscription(
        &self,
        user_id: &str,
        state: &SubscriptionState,
    ) -> Result<(), StoreError> {
        sqlx::query(queries::UPSERT_SUBSCRIPTION)
            .bind(user_id)
            .bind(state.tier.as_str())
            .bind(state.status.as_str())
            .bind(&state.subscription_id)
            .bind(state.current_period_end.map(|t| t.timestamp_millis()))
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_favorites(
        &self,
        user_id: &str,
        tickers: &[FavoriteTicker],
    ) -> Result<(), StoreError> {
        let favorites = serde_json::to_string(tickers)?;
        sqlx::query(queries::UPSERT_FAVORITES)
            .bind(user_id)
            .bind(favorites)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn user_ids(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(queries::SELECT_USER_IDS)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("user_id").map_err(StoreError::from))
            .collect()
    }
}
