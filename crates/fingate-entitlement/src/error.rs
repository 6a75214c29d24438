//! Entitlement error types.

use std::fmt::Display;

use fingate_core::Tier;
use fingate_store::StoreError;
use thiserror::Error;

/// Billing-provider failure.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("billing provider: {0}")]
    Provider(String),
}

impl BillingError {
    pub fn provider<E: Display>(e: E) -> Self {
        Self::Provider(e.to_string())
    }
}

/// Integration-platform failure.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("integration platform: {0}")]
    Platform(String),
    #[error("integration call timed out")]
    Timeout,
}

impl IntegrationError {
    pub fn platform<E: Display>(e: E) -> Self {
        Self::Platform(e.to_string())
    }
}

/// Favorite-ticker quota violation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuotaError {
    #[error("favorite limit exceeded: {requested} requested, {limit} allowed at tier {tier}")]
    Exceeded {
        tier: Tier,
        limit: usize,
        requested: usize,
    },
    #[error("invalid ticker symbol {0:?}")]
    InvalidSymbol(String),
}

/// Top-level error for entitlement operations.
#[derive(Debug, Error)]
pub enum EntitlementError {
    #[error("billing: {0}")]
    Billing(#[from] BillingError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("quota: {0}")]
    Quota(#[from] QuotaError),
    #[error("unknown user: {0}")]
    UnknownUser(String),
}
