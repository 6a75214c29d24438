//! Identity-provider seam.
//!
//! Token cryptography is an external concern; the gateway only needs a way
//! to turn a bearer token into a `(user_id, email)` pair.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// Authentication error.
///
/// Auth failures are surfaced to the caller (401-equivalent) and never
/// retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Token is malformed or does not verify.
    #[error("invalid token")]
    InvalidToken,

    /// Token verified but has expired.
    #[error("expired token")]
    Expired,

    /// Identity provider failure (network, configuration, ...).
    #[error("identity provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Create a provider error from any error type.
    #[inline]
    pub fn provider<E: std::fmt::Display>(err: E) -> Self {
        Self::Provider(err.to_string())
    }
}

/// A verified identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Trait for identity providers.
///
/// Implementations must be thread-safe (`Send + Sync`) as they may be
/// called concurrently from multiple requests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token and return the identity it carries.
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Blanket implementation for `Arc<I>` where `I: IdentityProvider`.
#[async_trait]
impl<I: IdentityProvider + ?Sized> IdentityProvider for Arc<I> {
    #[inline]
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        (**self).verify_token(token).await
    }
}

/// In-memory identity provider backed by a static token table.
///
/// Suitable for tests and local development; production deployments wire in
/// a real token verifier at the same seam.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentity {
    tokens: HashMap<String, Identity>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from `(token, user_id, email)` triples.
    pub fn from_tokens<I, T, U>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, U, Option<U>)>,
        T: Into<String>,
        U: Into<String>,
    {
        let tokens = entries
            .into_iter()
            .map(|(token, user_id, email)| {
                (
                    token.into(),
                    Identity {
                        user_id: user_id.into(),
                        email: email.map(Into::into),
                    },
                )
            })
            .collect();
        Self { tokens }
    }

    /// Register a token.
    pub fn insert(&mut self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
