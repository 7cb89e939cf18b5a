//! Server configuration: `melo.toml` plus environment overrides

use anyhow::{Context, Result};
use melo_logging::LoggingConfig;
use melo_push::PushConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "melo.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeloConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub push: PushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// How often stale in-flight requests are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl MeloConfig {
    /// Load configuration from a TOML file; missing or empty files yield defaults
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

        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from default path (./melo.toml)
    pub fn load_default() -> Result<Self> {
        Self::load(DEFAULT_CONFIG_FILE)
    }

    /// Apply `HOST`, `PORT` and the logging variables from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().with_context(|| format!("Invalid PORT: {}", port))?;
        }
        if let Some(key) = lookup("VAPID_PUBLIC_KEY") {
            self.push.vapid_public_key = key;
        }

        self.logging = self.logging.with_lookup(lookup)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = MeloConfig::default();
        assert_eq!(config.server.addr(), "127.0.0.1:3000");
        assert_eq!(config.server.sweep_interval_secs, 60);
    }

    #[test]
    fn test_parse_sections() {
        let config: MeloConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [logging.logger]
            level = "warn"

            [push]
            origin = "https://melo.chat"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.logger.level, melo_logging::LogLevel::Warn);
        assert_eq!(config.push.origin, "https://melo.chat");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("PORT", "9000"), ("LOG_LEVEL", "debug")].into_iter().collect();
        let config = MeloConfig::default()
            .with_lookup(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.logger.level, melo_logging::LogLevel::Debug);
    }

    #[test]
    fn test_invalid_port() {
        let result = MeloConfig::default().with_lookup(|key| (key == "PORT").then(|| "nope".to_string()));
        assert!(result.is_err());
    }
}
