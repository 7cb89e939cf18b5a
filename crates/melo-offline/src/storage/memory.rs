//! In-memory storage backend for cache buckets

use crate::cache::CachedResponse;
use crate::storage::CacheStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Buckets = HashMap<String, HashMap<String, CachedResponse>>;

/// In-memory storage backend
///
/// Fast but non-persistent - cache is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    buckets: Arc<RwLock<Buckets>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all buckets
    pub async fn size(&self) -> usize {
        self.buckets.read().await.values().map(HashMap::len).sum()
    }

    /// Total body bytes stored
    pub async fn total_bytes(&self) -> usize {
        self.buckets
            .read()
            .await
            .values()
            .flat_map(HashMap::values)
            .map(CachedResponse::size_bytes)
            .sum()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).and_then(|b| b.get(key)).cloned())
    }

    async fn put(&self, bucket: &str, key: &str, response: CachedResponse) -> Result<()> {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), response);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
        let mut buckets = self.buckets.write().await;
        Ok(buckets
            .get_mut(bucket)
            .map_or(false, |b| b.remove(key).is_some()))
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn bucket_names(&self) -> Result<Vec<String>> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::FetchResponse;

    fn cached(body: &str) -> CachedResponse {
        CachedResponse::new("/x", FetchResponse::new(200, body.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        store.put("melo-images-v1", "/a.png", cached("a")).await.unwrap();
        let retrieved = store.get("melo-images-v1", "/a.png").await.unwrap();
        assert_eq!(retrieved.unwrap().response.text(), "a");

        // Same key in a different bucket is a different entry
        assert!(store.get("melo-static-v1", "/a.png").await.unwrap().is_none());

        assert!(store.delete("melo-images-v1", "/a.png").await.unwrap());
        assert!(!store.delete("melo-images-v1", "/a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_most_recent_write_wins() {
        let store = MemoryStore::new();
        store.put("b", "/k", cached("old")).await.unwrap();
        store.put("b", "/k", cached("new")).await.unwrap();

        assert_eq!(store.get("b", "/k").await.unwrap().unwrap().response.text(), "new");
        assert_eq!(store.size().await, 1);
        assert_eq!(store.total_bytes().await, 3);
    }

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let store = MemoryStore::new();
        store.put("v1", "/a", cached("a")).await.unwrap();
        store.put("v2", "/b", cached("b")).await.unwrap();

        let mut names = store.bucket_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["v1", "v2"]);

        assert!(store.delete_bucket("v1").await.unwrap());
        assert_eq!(store.bucket_names().await.unwrap(), vec!["v2"]);
        assert_eq!(store.keys("v2").await.unwrap(), vec!["/b"]);
    }
}
