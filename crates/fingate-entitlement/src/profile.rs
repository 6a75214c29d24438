//! Integration-platform profile provisioning.
//!
//! Profile creation is a side effect of subscription syncs and must never
//! slow one down, so requests go through a bounded queue drained by a
//! spawned worker. Each attempt runs under its own timeout and failures
//! retry with doubling backoff before the request is dropped with a
//! warning. The platform call is idempotent per email: an existing profile
//! short-circuits creation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fingate_core::defaults::{
    DEFAULT_INTEGRATION_TIMEOUT_SECS, DEFAULT_PROFILE_BACKOFF_MS, DEFAULT_PROFILE_MAX_ATTEMPTS,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::IntegrationError;

const PROFILE_QUEUE_CAPACITY: usize = 64;

/// A request to ensure a marketing profile exists for a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequest {
    pub subscription_id: String,
    pub email: String,
}

/// Seam to the external integration platform.
#[async_trait]
pub trait IntegrationPlatform: Send + Sync {
    /// Whether a profile already exists for this email.
    async fn profile_exists(&self, email: &str) -> Result<bool, IntegrationError>;

    /// Create a profile. Only called when `profile_exists` returned false.
    async fn create_profile(&self, request: &ProfileRequest) -> Result<(), IntegrationError>;
}

#[async_trait]
impl<P: IntegrationPlatform + ?Sized> IntegrationPlatform for Arc<P> {
    #[inline]
    async fn profile_exists(&self, email: &str) -> Result<bool, IntegrationError> {
        (**self).profile_exists(email).await
    }

    #[inline]
    async fn create_profile(&self, request: &ProfileRequest) -> Result<(), IntegrationError> {
        (**self).create_profile(request).await
    }
}

/// Worker tuning. Defaults match production settings; tests shrink them.
#[derive(Debug, Clone)]
pub struct ProfileQueueConfig {
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for ProfileQueueConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(DEFAULT_INTEGRATION_TIMEOUT_SECS),
            max_attempts: DEFAULT_PROFILE_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_PROFILE_BACKOFF_MS),
        }
    }
}

/// Handle to the profile-provisioning worker.
#[derive(Debug, Clone)]
pub struct ProfileQueue {
    tx: mpsc::Sender<ProfileRequest>,
}

impl ProfileQueue {
    /// Spawn the worker on the current runtime.
    pub fn spawn<P>(platform: P, config: ProfileQueueConfig) -> Self
    where
        P: IntegrationPlatform + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<ProfileRequest>(PROFILE_QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                ensure_profile(&platform, &request, &config).await;
            }
        });
        Self { tx }
    }

    /// Queue a request without waiting. A full queue drops the request,
    /// which is acceptable for a best-effort side effect.
    pub fn enqueue(&self, request: ProfileRequest) {
        if let Err(e) = self.tx.try_send(request) {
            warn!(error = %e, "profile request dropped, queue full or worker gone");
        }
    }
}

async fn ensure_profile<P: IntegrationPlatform>(
    platform: &P,
    request: &ProfileRequest,
    config: &ProfileQueueConfig,
) {
    let mut backoff = config.initial_backoff;
    for attempt in 1..=config.max_attempts {
        let result = timeout(config.attempt_timeout, async {
            if platform.profile_exists(&request.email).await? {
                return Ok(false);
            }
            platform.create_profile(request).await.map(|()| true)
        })
        .await;

        match result {
            Ok(Ok(created)) => {
                debug!(
                    subscription_id = %request.subscription_id,
                    created,
                    "integration profile ensured"
                );
                return;
            }
            Ok(Err(e)) => {
                warn!(subscription_id = %request.subscription_id, attempt, error = %e, "profile provisioning failed");
            }
            Err(_) => {
                warn!(subscription_id = %request.subscription_id, attempt, "profile provisioning timed out");
            }
        }

        if attempt < config.max_attempts {
            sleep(backoff).await;
            backoff *= 2;
        }
    }
    warn!(subscription_id = %request.subscription_id, "giving up on profile provisioning");
}

/// In-memory platform for tests: records created profiles and can fail a
/// configured number of leading calls.
#[derive(Debug, Default)]
pub struct MemoryIntegration {
    profiles: Mutex<HashMap<String, ProfileRequest>>,
    fail_next: AtomicU32,
}

impl MemoryIntegration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` platform calls with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn profile(&self, email: &str) -> Option<ProfileRequest> {
        self.profiles.lock().get(email).cloned()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().len()
    }

    fn check_failure(&self) -> Result<(), IntegrationError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(IntegrationError::Platform("transient failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IntegrationPlatform for MemoryIntegration {
    async fn profile_exists(&self, email: &str) -> Result<bool, IntegrationError> {
        self.check_failure()?;
        Ok(self.profiles.lock().contains_key(email))
    }

    async fn create_profile(&self, request: &ProfileRequest) -> Result<(), IntegrationError> {
        self.check_failure()?;
        self.profiles
            .lock()
            .insert(request.email.clone(), request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ProfileQueueConfig {
        ProfileQueueConfig {
            attempt_timeout: Duration::from_millis(200),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
        }
    }

    async fn wait_for(platform: &MemoryIntegration, email: &str) -> bool {
        for _ in 0..100 {
            if platform.profile(email).is_some() {
                return true;
            }
            sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn worker_creates_missing_profile() {
        let platform = Arc::new(MemoryIntegration::new());
        let queue = ProfileQueue::spawn(platform.clone(), test_config());

        queue.enqueue(ProfileRequest {
            subscription_id: "sub_1".to_string(),
            email: "a@example.com".to_string(),
        });

        assert!(wait_for(&platform, "a@example.com").await);
        assert_eq!(platform.profile_count(), 1);
    }

    #[tokio::test]
    async fn existing_profile_is_not_recreated() {
        let platform = Arc::new(MemoryIntegration::new());
        let first = ProfileRequest {
            subscription_id: "sub_1".to_string(),
            email: "a@example.com".to_string(),
        };
        platform.create_profile(&first).await.unwrap();

        let queue = ProfileQueue::spawn(platform.clone(), test_config());
        queue.enqueue(ProfileRequest {
            subscription_id: "sub_2".to_string(),
            email: "a@example.com".to_string(),
        });

        // Give the worker time to process, then confirm the original
        // profile survived.
        sleep(Duration::from_millis(100)).await;
        assert_eq!(
            platform.profile("a@example.com").unwrap().subscription_id,
            "sub_1"
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let platform = Arc::new(MemoryIntegration::new());
        platform.fail_next(2);

        let queue = ProfileQueue::spawn(platform.clone(), test_config());
        queue.enqueue(ProfileRequest {
            subscription_id: "sub_1".to_string(),
            email: "b@example.com".to_string(),
        });

        assert!(wait_for(&platform, "b@example.com").await);
    }

    #[tokio::test]
    async fn exhausted_retries_drop_the_request() {
        let platform = Arc::new(MemoryIntegration::new());
        platform.fail_next(10);

        let queue = ProfileQueue::spawn(platform.clone(), test_config());
        queue.enqueue(ProfileRequest {
            subscription_id: "sub_1".to_string(),
            email: "c@example.com".to_string(),
        });

        sleep(Duration::from_millis(200)).await;
        assert_eq!(platform.profile_count(), 0);
    }
}
