//! Cached response types and statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::request::FetchResponse;

/// A response stored in a cache bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedResponse {
    /// Request URL the response was stored under
    pub url: String,

    pub response: FetchResponse,

    /// When the response was written
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, response: FetchResponse) -> Self {
        Self {
            url: url.into(),
            response,
            cached_at: Utc::now(),
        }
    }

    /// Time since the response was cached
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    pub fn size_bytes(&self) -> usize {
        self.response.body.len()
    }
}

/// Counters for the fetch interceptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests answered from a cache bucket
    pub hits: u64,

    /// Cache lookups that found nothing
    pub misses: u64,

    /// Network failures answered from cache instead
    pub network_fallbacks: u64,

    /// Navigations answered with the offline page
    pub offline_responses: u64,

    /// Background refreshes started by stale-while-revalidate
    pub revalidations: u64,

    /// Responses written to a bucket
    pub stores: u64,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
