//! Storage backend trait for the SSH CA engine.
//!
//! The engine never assumes cross-key transactions: every operation is a
//! single-key read or write with read-after-write consistency, plus a
//! prefix listing. `put_if_absent` is the only conditional write and is used
//! to reserve serial numbers.

use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// Storage backend for the SSH CA engine.
///
/// Implemented by the hosting runtime over its key-value store, and by
/// [`InMemorySshCaBackend`] for tests.
#[async_trait]
pub trait SshCaBackend: Send + Sync {
    /// Store a value at the given path.
    async fn put(&self, path: &str, value: &[u8]) -> Result<()>;

    /// Get a value at the given path.
    ///
    /// Returns `None` if the path doesn't exist.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a value at the given path.
    ///
    /// Returns `true` if the value existed and was deleted.
    async fn delete(&self, path: &str) -> Result<bool>;

    /// List all keys under a prefix.
    ///
    /// Returns sorted paths relative to the prefix.
    /// Keys ending in `/` represent "directories" (prefixes with children).
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if a path exists.
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.get(path).await?.is_some())
    }

    /// Store a value only if nothing exists at the path yet.
    ///
    /// Returns `true` if the value was written, `false` if the path was taken.
    async fn put_if_absent(&self, path: &str, value: &[u8]) -> Result<bool>;
}

/// In-memory backend for testing.
///
/// Thread-safe and deterministic for simulation testing.
#[derive(Default)]
pub struct InMemorySshCaBackend {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySshCaBackend {
    /// Create a new in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the backend is empty.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl SshCaBackend for InMemorySshCaBackend {
    async fn put(&self, path: &str, value: &[u8]) -> Result<()> {
        let mut data = self.data.write().await;
        data.insert(path.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().await;
        Ok(data.get(path).cloned())
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        Ok(data.remove(path).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        let mut keys = HashSet::new();

        for key in data.keys() {
            if let Some(relative) = key.strip_prefix(prefix) {
                if let Some(slash_pos) = relative.find('/') {
                    keys.insert(format!("{}/", &relative[..slash_pos]));
                } else if !relative.is_empty() {
                    keys.insert(relative.to_string());
                }
            }
        }

        let mut result: Vec<String> = keys.into_iter().collect();
        result.sort();
        Ok(result)
    }

    async fn put_if_absent(&self, path: &str, value: &[u8]) -> Result<bool> {
        let mut data = self.data.write().await;
        if data.contains_key(path) {
            return Ok(false);
        }
        data.insert(path.to_string(), value.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inmemory_put_get() {
        let backend = InMemorySshCaBackend::new();

        backend.put("role/web", b"value").await.unwrap();
        let result = backend.get("role/web").await.unwrap();
        assert_eq!(result, Some(b"value".to_vec()));
        assert_eq!(backend.get("role/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_inmemory_delete() {
        let backend = InMemorySshCaBackend::new();

        backend.put("certs/01", b"value").await.unwrap();
        assert!(backend.exists("certs/01").await.unwrap());

        assert!(backend.delete("certs/01").await.unwrap());
        assert!(!backend.delete("certs/01").await.unwrap());
        assert!(!backend.exists("certs/01").await.unwrap());
    }

    #[tokio::test]
    async fn test_inmemory_list_is_relative_and_sorted() {
        let backend = InMemorySshCaBackend::new();

        backend.put("certs/b", b"1").await.unwrap();
        backend.put("certs/a", b"2").await.unwrap();
        backend.put("revoked/a", b"3").await.unwrap();
        backend.put("crl", b"").await.unwrap();

        assert_eq!(backend.list("certs/").await.unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(backend.list("revoked/").await.unwrap(), vec!["a".to_string()]);

        let root = backend.list("").await.unwrap();
        assert_eq!(root, vec!["certs/".to_string(), "crl".to_string(), "revoked/".to_string()]);
    }

    #[tokio::test]
    async fn test_inmemory_put_if_absent() {
        let backend = InMemorySshCaBackend::new();

        assert!(backend.put_if_absent("certs/01", b"first").await.unwrap());
        assert!(!backend.put_if_absent("certs/01", b"second").await.unwrap());
        assert_eq!(backend.get("certs/01").await.unwrap(), Some(b"first".to_vec()));
    }
}
