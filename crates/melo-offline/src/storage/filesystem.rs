//! Filesystem storage backend for cache buckets

use crate::cache::CachedResponse;
use crate::config::FilesystemConfig;
use crate::storage::CacheStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Longest percent-encoded key used verbatim as a file stem
const MAX_PLAIN_STEM: usize = 128;

/// Encoded prefix kept in front of the digest for long keys
const HASHED_PREFIX: usize = 48;

/// On-disk record: the original key next to the cached response
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    #[serde(flatten)]
    cached: CachedResponse,
}

/// File stem for a cache key.
///
/// Short keys are stored under their percent-encoded form. Longer ones get a
/// readable prefix plus the SHA-256 of the full key, so names stay well under
/// the 255-byte limit most filesystems put on a single path component.
fn file_stem(key: &str) -> String {
    let encoded = urlencoding::encode(key);
    if encoded.len() <= MAX_PLAIN_STEM {
        return encoded.into_owned();
    }

    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{}~{}", &encoded[..HASHED_PREFIX], digest)
}

/// Filesystem storage backend
///
/// Each bucket is a directory; each entry is a JSON file holding the request
/// key and the response. Persistent across restarts.
#[derive(Clone)]
pub struct FilesystemStore {
    config: FilesystemConfig,
}

impl FilesystemStore {
    /// Create a new filesystem storage backend
    pub async fn new(config: FilesystemConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)
            .await
            .context("Failed to create cache directory")?;

        Ok(Self { config })
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.config.path.join(urlencoding::encode(bucket).as_ref())
    }

    /// Get the file path for a cache key
    fn key_to_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_path(bucket).join(format!("{}.json", file_stem(key)))
    }

    async fn read_entry(&self, path: &Path) -> Result<StoredEntry> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read cache file")?;

        serde_json::from_str(&content).context("Failed to deserialize cached response")
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.config.path.exists() {
            return Ok(names);
        }

        let mut entries = fs::read_dir(&self.config.path)
            .await
            .context("Failed to read cache directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            if !entry_path.is_dir() {
                continue;
            }

            if let Some(name) = entry_path.file_name().and_then(|n| n.to_str()) {
                // Reverse the encoding applied on write
                if let Ok(decoded) = urlencoding::decode(name) {
                    names.push(decoded.into_owned());
                }
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl CacheStore for FilesystemStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>> {
        let path = self.key_to_path(bucket, key);

        if !path.exists() {
            return Ok(None);
        }

        let entry = self.read_entry(&path).await?;

        // A different key that shares the hashed stem is a miss
        if entry.key != key {
            return Ok(None);
        }

        Ok(Some(entry.cached))
    }

    async fn put(&self, bucket: &str, key: &str, response: CachedResponse) -> Result<()> {
        let dir = self.bucket_path(bucket);
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create bucket directory")?;

        let entry = StoredEntry {
            key: key.to_string(),
            cached: response,
        };
        let json = serde_json::to_string(&entry).context("Failed to serialize response")?;

        // Write then rename so readers never see a half-written entry
        let path = self.key_to_path(bucket, key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .context("Failed to write cache file")?;
        fs::rename(&tmp, &path)
            .await
            .context("Failed to move cache file into place")?;

        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
        let path = self.key_to_path(bucket, key);

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .await
            .context("Failed to delete cache file")?;
        Ok(true)
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>> {
        let dir = self.bucket_path(bucket);
        let mut keys = Vec::new();
        if !dir.exists() {
            return Ok(keys);
        }

        let mut entries = fs::read_dir(&dir)
            .await
            .context("Failed to read bucket directory")?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match self.read_entry(&path).await {
                Ok(stored) => keys.push(stored.key),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "skipping unreadable cache file"
                ),
            }
        }

        Ok(keys)
    }

    async fn bucket_names(&self) -> Result<Vec<String>> {
        self.list_buckets().await
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool> {
        let dir = self.bucket_path(bucket);

        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .context("Failed to delete bucket directory")?;
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
