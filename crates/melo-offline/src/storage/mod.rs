//! Storage backends for cache buckets

use crate::cache::CachedResponse;
use anyhow::Result;
use async_trait::async_trait;

pub mod memory;

#[cfg(feature = "filesystem")]
pub mod filesystem;

/// Named buckets of cached responses, keyed by request URL.
///
/// Writes replace any previous entry for the same key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a cached response
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>>;

    /// Store a response, creating the bucket if needed
    async fn put(&self, bucket: &str, key: &str, response: CachedResponse) -> Result<()>;

    /// Delete a cached response; `true` if it existed
    async fn delete(&self, bucket: &str, key: &str) -> Result<bool>;

    /// All keys in a bucket
    async fn keys(&self, bucket: &str) -> Result<Vec<String>>;

    /// Names of every existing bucket
    async fn bucket_names(&self) -> Result<Vec<String>>;

    /// Delete a whole bucket; `true` if it existed
    async fn delete_bucket(&self, bucket: &str) -> Result<bool>;

    /// Get storage backend name
    fn name(&self) -> &'static str;
}
