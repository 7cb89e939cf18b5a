// File: src/config.rs
// Purpose: Logger, rotation and request-logging configuration from melo.toml and the environment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::entry::LogLevel;
use crate::size::parse_size;

/// Logging configuration, the `[logging]` table of melo.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub rotation: RotationConfig,

    #[serde(default)]
    pub request: RequestLogConfig,
}

/// Structured logger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_true")]
    pub console: bool,

    /// JSON-lines output file; `None` disables file output
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

/// Rotation and retention of the log directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(default = "default_log_dir")]
    pub directory: PathBuf,

    /// Rotate once a file reaches this many bytes
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default = "default_true")]
    pub compress: bool,

    /// Seconds between rotation passes when run in the background
    #[serde(default = "default_rotation_interval")]
    pub interval_secs: u64,
}

/// Request logging middleware settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLogConfig {
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default = "default_false")]
    pub log_headers: bool,

    /// Write sensitive headers and body fields unredacted
    #[serde(default = "default_false")]
    pub log_sensitive_data: bool,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// In-flight requests older than this are swept from the registry
    #[serde(default = "default_in_flight_ttl")]
    pub in_flight_ttl_secs: u64,
}

// Default values
fn default_service() -> String {
    "melo".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_max_size() -> u64 {
    10 * 1024 * 1024
}

fn default_max_files() -> usize {
    5
}

fn default_rotation_interval() -> u64 {
    3600
}

fn default_max_body_size() -> usize {
    1024
}

fn default_in_flight_ttl() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            service: default_service(),
            version: default_version(),
            environment: default_environment(),
            console: true,
            file_path: None,
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            max_size: default_max_size(),
            max_files: default_max_files(),
            compress: true,
            interval_secs: default_rotation_interval(),
        }
    }
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            file_path: None,
            log_headers: false,
            log_sensitive_data: false,
            max_body_size: default_max_body_size(),
            in_flight_ttl_secs: default_in_flight_ttl(),
        }
    }
}

impl LoggingConfig {
    /// Load the `[logging]` table from a TOML file.
    ///
    /// A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        #[derive(Deserialize)]
        struct File {
            #[serde(default)]
            logging: LoggingConfig,
        }

        let file: File = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(file.logging)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Recognised: `LOG_LEVEL`, `LOG_FILE_PATH`, `LOG_MAX_FILES`, `LOG_MAX_SIZE`,
    /// `LOG_COMPRESS`, `REQUEST_LOG_FILE_PATH`, `LOG_REQUEST_HEADERS`,
    /// `LOG_SENSITIVE_DATA`, `LOG_MAX_BODY_SIZE`, `NODE_ENV`.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logger.level = level.parse()?;
        }

        if let Some(path) = lookup("LOG_FILE_PATH") {
            let path = PathBuf::from(path);
            // Rotation watches the directory the active file lives in
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                self.rotation.directory = parent.to_path_buf();
            }
            self.logger.file_path = Some(path);
        }

        if let Some(max_files) = lookup("LOG_MAX_FILES") {
            self.rotation.max_files = max_files
                .trim()
                .parse()
                .with_context(|| format!("LOG_MAX_FILES must be a number, got '{}'", max_files))?;
        }

        if let Some(max_size) = lookup("LOG_MAX_SIZE") {
            self.rotation.max_size = parse_size(&max_size)?;
        }

        if let Some(compress) = lookup("LOG_COMPRESS") {
            self.rotation.compress = parse_flag(&compress);
        }

        if let Some(env) = lookup("NODE_ENV") {
            self.logger.environment = env;
        }

        if let Some(path) = lookup("REQUEST_LOG_FILE_PATH") {
            self.request.file_path = Some(PathBuf::from(path));
        }

        if let Some(flag) = lookup("LOG_REQUEST_HEADERS") {
            self.request.log_headers = parse_flag(&flag);
        }

        if let Some(flag) = lookup("LOG_SENSITIVE_DATA") {
            self.request.log_sensitive_data = parse_flag(&flag);
        }

        if let Some(size) = lookup("LOG_MAX_BODY_SIZE") {
            self.request.max_body_size = parse_size(&size)? as usize;
        }

        Ok(self)
    }

    pub fn is_production(&self) -> bool {
        self.logger.environment == "production"
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.logger.level, LogLevel::Info);
        assert_eq!(config.logger.service, "melo");
        assert_eq!(config.rotation.max_size, 10 * 1024 * 1024);
        assert_eq!(config.rotation.max_files, 5);
        assert!(!config.request.log_headers);
        assert_eq!(config.request.max_body_size, 1024);
    }

    #[test]
    fn test_env_overrides() {
        let config = LoggingConfig::default()
            .with_lookup(lookup(&[
                ("LOG_LEVEL", "debug"),
                ("LOG_FILE_PATH", "/var/log/melo/app.log"),
                ("LOG_MAX_FILES", "3"),
                ("LOG_MAX_SIZE", "5MB"),
                ("NODE_ENV", "production"),
                ("LOG_REQUEST_HEADERS", "true"),
                ("LOG_MAX_BODY_SIZE", "2KB"),
            ]))
            .unwrap();

        assert_eq!(config.logger.level, LogLevel::Debug);
        assert_eq!(config.logger.file_path, Some(PathBuf::from("/var/log/melo/app.log")));
        assert_eq!(config.rotation.directory, PathBuf::from("/var/log/melo"));
        assert_eq!(config.rotation.max_files, 3);
        assert_eq!(config.rotation.max_size, 5 * 1024 * 1024);
        assert!(config.is_production());
        assert!(config.request.log_headers);
        assert!(!config.request.log_sensitive_data);
        assert_eq!(config.request.max_body_size, 2048);
    }

    #[test]
    fn test_env_rejects_bad_size() {
        let result = LoggingConfig::default().with_lookup(lookup(&[("LOG_MAX_SIZE", "huge")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_logging_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("melo.toml");
        fs::write(
            &path,
            r#"
                [logging.logger]
                level = "warn"
                service = "melo-web"

                [logging.rotation]
                max_files = 2
                compress = false
            "#,
        )
        .unwrap();

        let config = LoggingConfig::load(&path).unwrap();
        assert_eq!(config.logger.level, LogLevel::Warn);
        assert_eq!(config.logger.service, "melo-web");
        assert_eq!(config.rotation.max_files, 2);
        assert!(!config.rotation.compress);
        assert_eq!(config.rotation.directory, PathBuf::from("logs"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = LoggingConfig::load("/nonexistent/melo.toml").unwrap();
        assert_eq!(config.logger.service, "melo");
    }
}
