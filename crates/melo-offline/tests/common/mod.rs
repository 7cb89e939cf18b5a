//! Test doubles for the offline engine

use async_trait::async_trait;
use melo_offline::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted network: fixed responses per URL, switchable offline
#[derive(Default)]
pub struct MockNetwork {
    responses: Mutex<HashMap<String, FetchResponse>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), FetchResponse::new(status, body.as_bytes().to_vec()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Unreachable("offline".to_string()));
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, b"not found".to_vec())))
    }
}

pub fn manager_with(network: Arc<MockNetwork>, config: OfflineConfig) -> CacheManager {
    let store: Arc<dyn CacheStore> = Arc::new(melo_offline::storage::memory::MemoryStore::new());
    CacheManager::with_store(config, store, network)
}

pub fn manager(network: Arc<MockNetwork>) -> CacheManager {
    manager_with(network, OfflineConfig::default())
}
