//! Push handler configuration, the `[push]` table of melo.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::click::absolute_url;
use crate::options::NotificationDefaults;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Origin the client is served from, e.g. `https://melo.chat`
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Application server key used when resubscribing
    #[serde(default)]
    pub vapid_public_key: String,

    /// Where renewed subscriptions are POSTed; relative to `origin` unless absolute
    #[serde(default = "default_subscription_endpoint")]
    pub subscription_endpoint: String,

    #[serde(default)]
    pub defaults: NotificationDefaults,
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_subscription_endpoint() -> String {
    "/api/push/subscription".to_string()
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            vapid_public_key: String::new(),
            subscription_endpoint: default_subscription_endpoint(),
            defaults: NotificationDefaults::default(),
        }
    }
}

impl PushConfig {
    /// Load the `[push]` table from a TOML file; missing or empty files yield defaults
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
            push: PushConfig,
        }

        let file: File = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(file.push)
    }

    pub fn subscription_url(&self) -> String {
        absolute_url(&self.origin, &self.subscription_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PushConfig::default();
        assert_eq!(config.subscription_url(), "http://localhost:3000/api/push/subscription");
        assert_eq!(config.defaults.title, "New Message");
    }

    #[test]
    fn test_parse_push_table() {
        let file: toml::Value = toml::from_str(
            r#"
            [push]
            origin = "https://melo.chat"
            vapid_public_key = "BExampleKey"

            [push.defaults]
            title = "Melo"
            "#,
        )
        .unwrap();

        let config: PushConfig = file["push"].clone().try_into().unwrap();
        assert_eq!(config.origin, "https://melo.chat");
        assert_eq!(config.vapid_public_key, "BExampleKey");
        assert_eq!(config.defaults.title, "Melo");
        assert_eq!(config.defaults.body, "You have a new message");
        assert_eq!(config.subscription_url(), "https://melo.chat/api/push/subscription");
    }
}
