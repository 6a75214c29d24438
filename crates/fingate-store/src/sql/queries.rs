//! SQL statements for the SQLite backend.

/// Consent record table.
pub const CREATE_CONSENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consent (
    user_id          TEXT PRIMARY KEY,
    essential        INTEGER NOT NULL,
    analytics        INTEGER NOT NULL,
    analytics_cookie INTEGER NOT NULL,
    essential_cookie INTEGER NOT NULL,
    revision         INTEGER NOT NULL,
    source           TEXT NOT NULL,
    schema_version   TEXT NOT NULL,
    updated_at       INTEGER NOT NULL
)
"#;

/// Append-only change log; `(user_id, revision)` uniqueness backs the
/// one-entry-per-revision invariant.
pub const CREATE_CONSENT_LOG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consent_log (
    user_id        TEXT NOT NULL,
    revision       INTEGER NOT NULL,
    prev_essential INTEGER NOT NULL,
    prev_analytics INTEGER NOT NULL,
    new_essential  INTEGER NOT NULL,
    new_analytics  INTEGER NOT NULL,
    source         TEXT NOT NULL,
    created_at     INTEGER NOT NULL,
    PRIMARY KEY (user_id, revision)
)
"#;

/// User document table. Favorites are a JSON array column.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id            TEXT PRIMARY KEY,
    email              TEXT,
    customer_id        TEXT,
    tier               TEXT NOT NULL DEFAULT 'free',
    status             TEXT NOT NULL DEFAULT 'inactive',
    subscription_id    TEXT,
    current_period_end INTEGER,
    favorite_tickers   TEXT NOT NULL DEFAULT '[]',
    updated_at         INTEGER NOT NULL
)
"#;

pub const SELECT_CONSENT: &str = r#"
SELECT essential, analytics, analytics_cookie, essential_cookie,
       revision, source, schema_version, updated_at
FROM consent
WHERE user_id = ?
"#;

/// First consent write: only succeeds when no row exists yet.
pub const INSERT_CONSENT: &str = r#"
INSERT OR IGNORE INTO consent
    (user_id, essential, analytics, analytics_cookie, essential_cookie,
     revision, source, schema_version, updated_at)
VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
"#;

/// Subsequent consent write: the `revision = ?` guard is the
/// compare-and-swap.
pub const UPDATE_CONSENT: &str = r#"
UPDATE consent
SET essential = ?, analytics = ?, analytics_cookie = ?, essential_cookie = ?,
    revision = ?, source = ?, schema_version = ?, updated_at = ?
WHERE user_id = ? AND revision = ?
"#;

pub const TOUCH_CONSENT: &str = r#"
UPDATE consent
SET analytics_cookie = ?, essential_cookie = ?, updated_at = ?
WHERE user_id = ?
"#;

pub const INSERT_LOG_ENTRY: &str = r#"
INSERT OR IGNORE INTO consent_log
    (user_id, revision, prev_essential, prev_analytics,
     new_essential, new_analytics, source, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

pub const SELECT_LOG_ENTRIES: &str = r#"
SELECT revision, prev_essential, prev_analytics, new_essential, new_analytics,
       source, created_at
FROM consent_log
WHERE user_id = ?
ORDER BY revision DESC
LIMIT ?
"#;

pub const DELETE_CONSENT: &str = "DELETE FROM consent WHERE user_id = ?";

pub const DELETE_LOG_ENTRIES: &str = "DELETE FROM consent_log WHERE user_id = ?";

pub const SELECT_USER: &str = r#"
SELECT user_id, email, customer_id, tier, status, subscription_id,
       current_period_end, favorite_tickers, updated_at
FROM users
WHERE user_id = ?
"#;

pub const UPSERT_USER: &str = r#"
INSERT INTO users
    (user_id, email, customer_id, tier, status, subscription_id,
     current_period_end, favorite_tickers, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(user_id) DO UPDATE SET
    email = excluded.email,
    customer_id = excluded.customer_id,
    tier = excluded.tier,
    status = excluded.status,
    subscription_id = excluded.subscription_id,
    current_period_end = excluded.current_period_end,
    favorite_tickers = excluded.favorite_tickers,
    updated_at = excluded.updated_at
"#;

pub const UPSERT_SUBSCRIPTION: &str = r#"
INSERT INTO users (user_id, tier, status, subscription_id, current_period_end, updated_at)
VALUES (?, ?, ?, ?, ?, ?)
ON CONFLICT(user_id) DO UPDATE SET
    tier = excluded.tier,
    status = excluded.status,
    subscription_id = excluded.subscription_id,
    current_period_end = excluded.current_period_end,
    updated_at = excluded.updated_at
"#;

pub const UPSERT_FAVORITES: &str = r#"
INSERT INTO users (user_id, favorite_tickers, updated_at)
VALUES (?, ?, ?)
ON CONFLICT(user_id) DO UPDATE SET
    favorite_tickers = excluded.favorite_tickers,
    updated_at = excluded.updated_at
"#;

pub const SELECT_USER_IDS: &str = "SELECT user_id FROM users";
