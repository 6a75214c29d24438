//! Store error types.

/// Document-store error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable (network, pool exhaustion). Callers degrade to
    /// local-only / last-known state on this variant.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A consent write claimed a revision that is no longer next in line.
    ///
    /// `expected` is the revision a retry must claim.
    #[error("revision conflict: next revision is {expected}")]
    RevisionConflict { expected: u64 },

    /// A change-log entry for this revision already exists.
    #[error("duplicate change-log revision {revision}")]
    DuplicateRevision { revision: u64 },

    /// Document (de)serialization failure.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend error (driver, constraint, corrupt row, ...).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Whether a caller should treat the store as disconnected rather than
    /// the operation as invalid.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}
