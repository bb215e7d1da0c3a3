//! Persistence of a single JSON document under one fixed key.
//!
//! Backends implement [`KeyValueStore`]; [`PersistenceStore`] layers the
//! document contract on top: failures are logged and surfaced as `false` /
//! `None`, never as errors, so callers decide how to notify the user.

pub mod debounce;
pub mod file;
pub mod memory;
pub mod redis;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::Document;

pub use debounce::Debouncer;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;

pub const DEFAULT_STORAGE_KEY: &str = "edufolio_data";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} available")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Minimal string key-value contract, the shape of a browser's local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Checks a write of `needed` bytes against an optional quota.
pub(crate) fn check_quota(needed: usize, quota: Option<usize>) -> Result<(), StoreError> {
    match quota {
        Some(quota) if needed > quota => Err(StoreError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

pub struct PersistenceStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    debouncer: Debouncer,
}

impl PersistenceStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>, debounce: Duration) -> Self {
        PersistenceStore {
            backend,
            key: key.into(),
            debouncer: Debouncer::new(debounce),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Writes the document. Returns `false` when serialization or the backend fails.
    pub async fn save(&self, document: &Document) -> bool {
        let payload = match serde_json::to_string(document) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize document: {e}");
                return false;
            }
        };

        match self.backend.set(&self.key, &payload).await {
            Ok(()) => {
                debug!("Saved document ({} bytes) under '{}'", payload.len(), self.key);
                true
            }
            Err(e) => {
                error!("Failed to save document under '{}': {e}", self.key);
                false
            }
        }
    }

    /// Reads the document. Missing and undecodable values are both `None`.
    pub async fn load(&self) -> Option<Document> {
        let raw = match self.backend.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to read '{}': {e}", self.key);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Stored document under '{}' is unreadable: {e}", self.key);
                None
            }
        }
    }

    pub async fn clear(&self) -> bool {
        match self.backend.remove(&self.key).await {
            Ok(()) => {
                info!("Cleared stored document '{}'", self.key);
                true
            }
            Err(e) => {
                error!("Failed to clear '{}': {e}", self.key);
                false
            }
        }
    }

    /// (Re)arms the auto-save timer; bursts of calls collapse into one run.
    pub fn schedule_debounced_save<F, Fut>(&self, callback: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.debouncer.schedule(callback);
    }

    pub fn cancel_pending(&self) {
        self.debouncer.cancel();
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Certificate, EducationEntry};

    fn store_with(backend: Arc<dyn KeyValueStore>) -> PersistenceStore {
        PersistenceStore::new(backend, DEFAULT_STORAGE_KEY, Duration::from_millis(1000))
    }

    fn sample() -> Document {
        Document {
            full_name: "Grace Hopper".into(),
            education: vec![EducationEntry {
                degree_title: "PhD".into(),
                education_period: "1930 - 1934".into(),
                institution_name: "Yale".into(),
            }],
            certificates: vec![Certificate::new("data:image/png;base64,AAAA".into(), "c.png")],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = store_with(Arc::new(MemoryStore::new()));
        let document = sample();
        assert!(store.save(&document).await);
        assert_eq!(store.load().await, Some(document));
    }

    #[tokio::test]
    async fn test_load_absent() {
        let store = store_with(Arc::new(MemoryStore::new()));
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_corrupted_value_loads_as_absent() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(DEFAULT_STORAGE_KEY, "{not json").await.unwrap();
        let store = store_with(backend);
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_clear_then_load_is_absent() {
        let store = store_with(Arc::new(MemoryStore::new()));
        assert!(store.save(&sample()).await);
        assert!(store.clear().await);
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_full_store_keeps_previous_value() {
        let small = Document {
            full_name: "A".into(),
            ..Default::default()
        };
        let quota = serde_json::to_string(&small).unwrap().len() + DEFAULT_STORAGE_KEY.len() + 16;
        let store = store_with(Arc::new(MemoryStore::with_quota(quota)));

        assert!(store.save(&small).await);
        let mut big = small.clone();
        big.summary = "x".repeat(quota);
        assert!(!store.save(&big).await);
        assert_eq!(store.load().await, Some(small));
    }

    #[test]
    fn test_check_quota() {
        assert!(check_quota(10, None).is_ok());
        assert!(check_quota(10, Some(10)).is_ok());
        assert!(matches!(
            check_quota(11, Some(10)),
            Err(StoreError::QuotaExceeded { needed: 11, quota: 10 })
        ));
    }
}
