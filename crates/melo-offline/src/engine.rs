//! Fetch interceptor core - strategy dispatch, install and activation

use crate::cache::{CacheStats, CachedResponse};
use crate::config::{OfflineConfig, StorageBackend};
use crate::network::{Network, NetworkError};
use crate::policy::{CacheBucket, CachePolicy, CacheRule, Strategy};
use crate::request::{FetchRequest, FetchResponse};
use crate::storage::CacheStore;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    Offline,
}

/// Result of intercepting one fetch
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: FetchResponse,
    pub source: ResponseSource,
    /// Background cache refresh started by stale-while-revalidate.
    /// Await it to keep the refresh alive, or drop it to let it run detached.
    pub revalidation: Option<JoinHandle<()>>,
}

impl FetchOutcome {
    fn new(response: FetchResponse, source: ResponseSource) -> Self {
        Self {
            response,
            source,
            revalidation: None,
        }
    }
}

/// Result of the install step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

/// Applies the cache policy to intercepted fetches
pub struct CacheManager {
    config: OfflineConfig,
    policy: CachePolicy,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    stats: Arc<RwLock<CacheStats>>,
}

impl CacheManager {
    /// Create a manager with the storage backend named in the config
    pub async fn new(config: OfflineConfig, network: Arc<dyn Network>) -> Result<Self> {
        let store = Self::create_storage(&config.storage).await?;
        Ok(Self::with_store(config, store, network))
    }

    pub fn with_store(
        config: OfflineConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            config,
            policy: CachePolicy::default(),
            store,
            network,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create a storage backend from config
    async fn create_storage(backend: &StorageBackend) -> Result<Arc<dyn CacheStore>> {
        match backend {
            StorageBackend::Memory => {
                use crate::storage::memory::MemoryStore;
                Ok(Arc::new(MemoryStore::new()))
            }
            #[cfg(feature = "filesystem")]
            StorageBackend::Filesystem(config) => {
                use crate::storage::filesystem::FilesystemStore;
                let store = FilesystemStore::new(config.clone()).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "filesystem"))]
            StorageBackend::Filesystem(_) => {
                anyhow::bail!("Filesystem storage requires the 'filesystem' feature to be enabled")
            }
        }
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Versioned bucket name, e.g. `melo-images-v1`
    pub fn bucket_name(&self, bucket: CacheBucket) -> String {
        format!("{}-{}-{}", self.config.cache_prefix, bucket.as_str(), self.config.version)
    }

    pub fn current_buckets(&self) -> Vec<String> {
        CacheBucket::ALL.iter().map(|b| self.bucket_name(*b)).collect()
    }

    /// Pre-cache the configured URLs into the static bucket.
    ///
    /// A URL that cannot be fetched is logged and skipped.
    pub async fn install(&self) -> Result<InstallReport> {
        let bucket = self.bucket_name(CacheBucket::Static);
        let mut report = InstallReport::default();

        for url in &self.config.precache {
            let request = FetchRequest::get(url.clone());
            match self.network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    self.store_response(&bucket, &request, response).await;
                    report.cached.push(url.clone());
                }
                Ok(response) => {
                    tracing::warn!(url = %url, status = response.status, "precache skipped non-success response");
                    report.failed.push(url.clone());
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "precache fetch failed");
                    report.failed.push(url.clone());
                }
            }
        }

        tracing::info!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            version = %self.config.version,
            "offline cache installed"
        );
        Ok(report)
    }

    /// Delete every bucket not belonging to the current version.
    ///
    /// Returns the deleted bucket names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let current = self.current_buckets();
        let mut deleted = Vec::new();

        for name in self.store.bucket_names().await? {
            if current.contains(&name) {
                continue;
            }
            if self.store.delete_bucket(&name).await? {
                tracing::info!(bucket = %name, "deleted stale cache bucket");
                deleted.push(name);
            }
        }

        deleted.sort();
        Ok(deleted)
    }

    /// Serve one intercepted fetch according to the policy
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchOutcome, NetworkError> {
        let rule = match self.policy.classify(request) {
            Some(rule) => rule.clone(),
            None => return self.network_only(request).await,
        };

        match rule.strategy {
            Strategy::CacheFirst => self.cache_first(&rule, request).await,
            Strategy::NetworkFirst => self.network_first(&rule, request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(&rule, request).await,
            Strategy::NetworkOnly => self.network_only(request).await,
        }
    }

    async fn network_only(&self, request: &FetchRequest) -> Result<FetchOutcome, NetworkError> {
        let response = self.network.fetch(request).await?;
        Ok(FetchOutcome::new(response, ResponseSource::Network))
    }

    async fn cache_first(
        &self,
        rule: &CacheRule,
        request: &FetchRequest,
    ) -> Result<FetchOutcome, NetworkError> {
        let bucket = self.bucket_name(rule.bucket);

        if let Some(cached) = self.lookup(&bucket, request).await {
            return Ok(FetchOutcome::new(cached.response, ResponseSource::Cache));
        }

        let response = self.network.fetch(request).await?;
        if response.is_ok() {
            self.store_response(&bucket, request, response.clone()).await;
        }
        Ok(FetchOutcome::new(response, ResponseSource::Network))
    }

    async fn network_first(
        &self,
        rule: &CacheRule,
        request: &FetchRequest,
    ) -> Result<FetchOutcome, NetworkError> {
        let bucket = self.bucket_name(rule.bucket);

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_response(&bucket, request, response.clone()).await;
                }
                Ok(FetchOutcome::new(response, ResponseSource::Network))
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "network failed, trying cache");

                if let Some(cached) = self.lookup(&bucket, request).await {
                    self.stats.write().await.network_fallbacks += 1;
                    return Ok(FetchOutcome::new(cached.response, ResponseSource::Cache));
                }

                if request.is_navigation() {
                    self.stats.write().await.offline_responses += 1;
                    let page = FetchResponse::html(503, &self.config.offline_page_html);
                    return Ok(FetchOutcome::new(page, ResponseSource::Offline));
                }

                Err(err)
            }
        }
    }

    async fn stale_while_revalidate(
        &self,
        rule: &CacheRule,
        request: &FetchRequest,
    ) -> Result<FetchOutcome, NetworkError> {
        let bucket = self.bucket_name(rule.bucket);

        if let Some(cached) = self.lookup(&bucket, request).await {
            self.stats.write().await.revalidations += 1;

            let engine = self.clone();
            let request = request.clone();
            let handle = tokio::spawn(async move {
                engine.revalidate(&bucket, &request).await;
            });

            return Ok(FetchOutcome {
                response: cached.response,
                source: ResponseSource::Cache,
                revalidation: Some(handle),
            });
        }

        let response = self.network.fetch(request).await?;
        if response.is_ok() {
            self.store_response(&bucket, request, response.clone()).await;
        }
        Ok(FetchOutcome::new(response, ResponseSource::Network))
    }

    /// Refresh one cache entry from the network; failures only log
    async fn revalidate(&self, bucket: &str, request: &FetchRequest) {
        match self.network.fetch(request).await {
            Ok(response) if response.is_ok() => self.store_response(bucket, request, response).await,
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status, "revalidation kept cached copy")
            }
            Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed"),
        }
    }

    async fn lookup(&self, bucket: &str, request: &FetchRequest) -> Option<CachedResponse> {
        let found = match self.store.get(bucket, request.cache_key()).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(bucket, url = %request.url, error = %e, "cache read failed");
                None
            }
        };

        let mut stats = self.stats.write().await;
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    /// Write to a bucket; a failed write is logged and does not fail the fetch
    async fn store_response(&self, bucket: &str, request: &FetchRequest, response: FetchResponse) {
        let cached = CachedResponse::new(request.cache_key(), response);
        match self.store.put(bucket, request.cache_key(), cached).await {
            Ok(()) => self.stats.write().await.stores += 1,
            Err(e) => tracing::warn!(bucket, url = %request.url, error = %e, "cache write failed"),
        }
    }

    /// Remove every bucket, current or not
    pub async fn clear(&self) -> Result<()> {
        for name in self.store.bucket_names().await? {
            self.store.delete_bucket(&name).await?;
        }

        let mut stats = self.stats.write().await;
        *stats = CacheStats::default();

        Ok(())
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }
}

impl Clone for CacheManager {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            policy: self.policy.clone(),
            store: Arc::clone(&self.store),
            network: Arc::clone(&self.network),
            stats: Arc::clone(&self.stats),
        }
    }
}
