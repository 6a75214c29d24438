//! Device-local consent cache.
//!
//! The local cache is exclusive to one device context and is never touched
//! concurrently, so the trait is synchronous: cache operations must not
//! suspend (the decision flow applies side effects in the same step).

use std::fs;
use std::path::PathBuf;

use fingate_core::ConsentRecord;
use parking_lot::Mutex;
use tracing::warn;

/// Local cache failure.
///
/// Cache write failures are non-fatal by contract: a decision that cannot
/// be persisted still applies for the current session.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage for the last-known consent decision on this device.
pub trait LocalConsentCache: Send + Sync {
    /// The cached record, if any. Unreadable/corrupt data reads as `None`.
    fn load(&self) -> Option<ConsentRecord>;

    /// Overwrite the cached record.
    fn store(&self, record: &ConsentRecord) -> Result<(), CacheError>;

    /// Remove the cached record (explicit user erasure).
    fn clear(&self) -> Result<(), CacheError>;
}

/// In-memory cache, used in tests and headless sessions.
#[derive(Debug, Default)]
pub struct MemoryConsentCache {
    inner: Mutex<Option<ConsentRecord>>,
}

impl MemoryConsentCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalConsentCache for MemoryConsentCache {
    fn load(&self) -> Option<ConsentRecord> {
        self.inner.lock().clone()
    }

    fn store(&self, record: &ConsentRecord) -> Result<(), CacheError> {
        *self.inner.lock() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        *self.inner.lock() = None;
        Ok(())
    }
}

/// JSON-file-backed cache.
///
/// The file plays the role a browser's local storage plays for the web
/// client: one record, overwritten in place.
#[derive(Debug, Clone)]
pub struct FileConsentCache {
    path: PathBuf,
}

impl FileConsentCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl LocalConsentCache for FileConsentCache {
    fn load(&self) -> Option<ConsentRecord> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read consent cache");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                // Corrupt cache is treated as no decision, not an error.
                warn!(path = %self.path.display(), error = %e, "corrupt consent cache ignored");
                None
            }
        }
    }

    fn store(&self, record: &ConsentRecord) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingate_core::ConsentPreferences;

    #[test]
    fn memory_cache_roundtrip() {
        let cache = MemoryConsentCache::new();
        assert!(cache.load().is_none());

        let record = ConsentRecord::new(ConsentPreferences::new(true));
        cache.store(&record).unwrap();
        assert_eq!(cache.load().unwrap().preferences, record.preferences);

        cache.clear().unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn file_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileConsentCache::new(dir.path().join("consent.json"));
        assert!(cache.load().is_none());

        let record = ConsentRecord::new(ConsentPreferences::new(true));
        cache.store(&record).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.preferences, record.preferences);
        assert_eq!(loaded.schema_version, record.schema_version);

        cache.clear().unwrap();
        assert!(cache.load().is_none());
        // Clearing twice is fine.
        cache.clear().unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consent.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = FileConsentCache::new(&path);
        assert!(cache.load().is_none());
    }
}
