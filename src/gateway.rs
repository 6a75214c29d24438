//! Token-authenticated facade over the consent and entitlement services.
//!
//! The gateway owns the session boundary: every operation that touches a
//! user's remote state verifies the bearer token first, then delegates to
//! the service owning that state. Anonymous callers get the local-only
//! consent paths and nothing else.

use fingate_consent::{ConsentService, ConsentSink, LocalConsentCache};
use fingate_core::{
    AuthError, ConsentChangeLogEntry, ConsentPreferences, ConsentSource, EffectiveConsent,
    FavoriteTicker, Identity, IdentityProvider, SubscriptionState, Tier,
};
use fingate_entitlement::{BillingProvider, EntitlementError, EntitlementService, TierInfo};
use fingate_store::{ConsentStore, StoreError, UserRecord, UserStore};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Entitlement(#[from] EntitlementError),
}

/// Everything a client needs after login.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub consent: EffectiveConsent,
    pub subscription: SubscriptionState,
}

pub struct Gateway<I, S, L, K, B, U> {
    identity: I,
    consent: ConsentService<S, L, K>,
    entitlements: EntitlementService<B, U>,
    users: U,
}

impl<I, S, L, K, B, U> Gateway<I, S, L, K, B, U>
where
    I: IdentityProvider,
    S: ConsentStore,
    L: LocalConsentCache,
    K: ConsentSink,
    B: BillingProvider,
    U: UserStore,
{
    pub fn new(
        identity: I,
        consent: ConsentService<S, L, K>,
        entitlements: EntitlementService<B, U>,
        users: U,
    ) -> Self {
        Self {
            identity,
            consent,
            entitlements,
            users,
        }
    }

    /// Full login flow: verify the token, make sure a user document
    /// exists, reconcile consent, and refresh entitlements.
    ///
    /// A billing outage does not fail the login; the stored subscription
    /// state is served instead.
    pub async fn login(&self, token: &str) -> Result<Session, GatewayError> {
        let identity = self.identity.verify_token(token).await?;

        if self.users.user(&identity.user_id).await?.is_none() {
            let mut record = UserRecord::new(&identity.user_id);
            if let Some(email) = &identity.email {
                record = record.with_email(email);
            }
            self.users.put_user(&record).await?;
        }

        let consent = self.consent.reconcile_on_login(&identity.user_id).await;

        let subscription = match self.entitlements.sync_subscription(&identity.user_id).await {
            Ok(state) => state,
            Err(EntitlementError::Billing(e)) => {
                warn!(user_id = %identity.user_id, error = %e, "billing unreachable at login, serving stored entitlements");
                self.users
                    .user(&identity.user_id)
                    .await?
                    .map(|u| u.subscription)
                    .unwrap_or_default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Session {
            identity,
            consent,
            subscription,
        })
    }

    /// Effective consent for a session, anonymous or authenticated.
    pub async fn session_consent(
        &self,
        token: Option<&str>,
    ) -> Result<EffectiveConsent, GatewayError> {
        match token {
            Some(token) => {
                let identity = self.identity.verify_token(token).await?;
                Ok(self.consent.reconcile(Some(&identity.user_id)).await)
            }
            None => Ok(self.consent.reconcile(None).await),
        }
    }

    /// Record an explicit consent decision. Works for anonymous sessions
    /// (local only) and authenticated ones (local plus remote).
    ///
    /// The cookie flags travel separately from the preferences: a
    /// resubmission with identical preferences but different flags refreshes
    /// the flags without bumping the revision or logging.
    pub async fn record_decision(
        &self,
        token: Option<&str>,
        preferences: ConsentPreferences,
        analytics_cookie: bool,
        essential_cookie: bool,
        source: ConsentSource,
    ) -> Result<EffectiveConsent, GatewayError> {
        let user_id = match token {
            Some(token) => Some(self.identity.verify_token(token).await?.user_id),
            None => None,
        };
        Ok(self
            .consent
            .apply_decision(
                preferences,
                analytics_cookie,
                essential_cookie,
                user_id.as_deref(),
                source,
            )
            .await)
    }

    /// The authenticated user's consent audit trail, newest first.
    pub async fn consent_history(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<ConsentChangeLogEntry>, GatewayError> {
        let identity = self.identity.verify_token(token).await?;
        Ok(self.consent.change_history(&identity.user_id, limit).await?)
    }

    /// Re-resolve the authenticated user's entitlements from billing data.
    pub async fn sync_entitlements(&self, token: &str) -> Result<SubscriptionState, GatewayError> {
        let identity = self.identity.verify_token(token).await?;
        Ok(self.entitlements.sync_subscription(&identity.user_id).await?)
    }

    /// Replace the favorites list under the quota of the current tier.
    /// Returns the resulting quota standing.
    pub async fn set_favorites(
        &self,
        token: &str,
        tickers: &[FavoriteTicker],
    ) -> Result<TierInfo, GatewayError> {
        let identity = self.identity.verify_token(token).await?;
        Ok(self
            .entitlements
            .set_favorites(&identity.user_id, tickers)
            .await?)
    }

    /// The authenticated user's quota standing.
    pub async fn tier_info(&self, token: &str) -> Result<TierInfo, GatewayError> {
        let identity = self.identity.verify_token(token).await?;
        Ok(self.entitlements.tier_info(&identity.user_id).await?)
    }

    /// Whether the authenticated user satisfies a minimum-tier gate.
    pub async fn has_minimum_tier(
        &self,
        token: &str,
        required: Tier,
    ) -> Result<bool, GatewayError> {
        let identity = self.identity.verify_token(token).await?;
        Ok(self
            .entitlements
            .has_minimum_tier(&identity.user_id, required)
            .await?)
    }

    /// Erase the authenticated user's consent data everywhere.
    pub async fn erase_consent(&self, token: &str) -> Result<(), GatewayError> {
        let identity = self.identity.verify_token(token).await?;
        Ok(self.consent.erase(&identity.user_id).await?)
    }
}
