//! Offline cache configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fallback page served to navigations when both network and cache fail
pub const DEFAULT_OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Melo - Offline</title>
</head>
<body>
  <main>
    <h1>You're offline</h1>
    <p>Melo can't reach the server right now. Check your connection and try again.</p>
    <button onclick="location.reload()">Retry</button>
  </main>
</body>
</html>"#;

/// Offline cache configuration, the `[offline]` table of melo.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Prefix of every bucket name
    #[serde(default = "default_prefix")]
    pub cache_prefix: String,

    /// Cache version; buckets from other versions are dropped on activation
    #[serde(default = "default_version")]
    pub version: String,

    /// URLs stored in the static bucket on install
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    #[serde(default = "default_offline_page_html")]
    pub offline_page_html: String,

    #[serde(default)]
    pub storage: StorageBackend,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory storage (fast, non-persistent)
    #[default]
    Memory,

    /// Filesystem storage (persistent, single-instance)
    Filesystem(FilesystemConfig),
}

/// Filesystem storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Cache directory path
    pub path: PathBuf,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".melo/cache"),
        }
    }
}

fn default_prefix() -> String {
    "melo".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_precache() -> Vec<String> {
    vec![
        "/".to_string(),
        "/manifest.json".to_string(),
        "/icons/icon-192x192.png".to_string(),
        "/icons/icon-512x512.png".to_string(),
    ]
}

fn default_offline_page_html() -> String {
    DEFAULT_OFFLINE_PAGE.to_string()
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_prefix(),
            version: default_version(),
            precache: default_precache(),
            offline_page_html: default_offline_page_html(),
            storage: StorageBackend::default(),
        }
    }
}

impl OfflineConfig {
    /// Load the `[offline]` table from a TOML file; missing or empty files yield defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        #[derive(Deserialize)]
        struct File {
            #[serde(default)]
            offline: OfflineConfig,
        }

        let file: File = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(file.offline)
    }
}
