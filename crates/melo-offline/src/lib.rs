//! # melo-offline
//!
//! The offline layer of the Melo web client: decides, per intercepted fetch,
//! whether to answer from a cache bucket or the network.
//!
//! ## Features
//!
//! - **Ordered cache policy**: first matching rule picks the strategy and bucket
//! - **Three strategies**: cache-first, network-first with offline fallback,
//!   and stale-while-revalidate
//! - **Versioned buckets**: activation drops buckets from other versions
//! - **Multiple Storage Backends**: Memory, Filesystem
//!
//! ## Example
//!
//! ```rust,no_run
//! use melo_offline::{CacheManager, FetchRequest, HttpNetwork, OfflineConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let network = Arc::new(HttpNetwork::new("https://chat.example.org", Duration::from_secs(10))?);
//! let manager = CacheManager::new(OfflineConfig::default(), network).await?;
//!
//! manager.install().await?;
//! manager.activate().await?;
//!
//! let outcome = manager.handle_fetch(&FetchRequest::get("/icons/icon-192x192.png")).await?;
//! println!("served from {:?}", outcome.source);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod network;
pub mod policy;
pub mod request;
pub mod storage;

pub use cache::{CacheStats, CachedResponse};
pub use config::{FilesystemConfig, OfflineConfig, StorageBackend};
pub use engine::{CacheManager, FetchOutcome, InstallReport, ResponseSource};
pub use network::{HttpNetwork, Network, NetworkError};
pub use policy::{CacheBucket, CachePolicy, CacheRule, RequestMatcher, Strategy};
pub use request::{FetchRequest, FetchResponse, RequestMode};
pub use storage::CacheStore;
