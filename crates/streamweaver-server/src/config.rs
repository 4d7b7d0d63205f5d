//! Broker Configuration
//!
//! TOML configuration with section-by-section validation. Validation
//! failures are fatal at startup; nothing here is reloadable at runtime.
//!
//! ```toml
//! port = 50051
//!
//! [logging]
//! log_level = "info"
//! log_format = "text"
//!
//! [retention]
//! policy = "time"
//! max_age = 604800000        # milliseconds, or a legacy "7d" / "12h" string
//! cleanup_policy = "delete,archive"
//! interval_seconds = 300
//! batch_size = 1000
//!
//! [storage]
//! provider = "local"
//!
//! [storage.local]
//! directory = "./data/blocks"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use streamweaver_core::parse_time_unit;
use streamweaver_hotstore::CleanupPolicy;
use streamweaver_storage::{S3Options, StorageProviderConfig};
use thiserror::Error;

pub const VALID_LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];
pub const VALID_LOG_FORMATS: &[&str] = &["text", "json"];
pub const VALID_RETENTION_POLICIES: &[&str] = &["time", "size"];
pub const VALID_STORAGE_PROVIDERS: &[&str] = &["local", "s3"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// gRPC listen port.
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    pub retention: RetentionConfig,

    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// `max_age` accepts plain milliseconds or a legacy `<n>d` / `<n>h` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaxAge {
    Millis(i64),
    Legacy(String),
}

impl MaxAge {
    pub fn as_millis(&self) -> Result<i64, ConfigError> {
        match self {
            MaxAge::Millis(ms) => Ok(*ms),
            MaxAge::Legacy(s) => parse_time_unit(s)
                .map(|secs| secs * 1000)
                .map_err(|e| invalid(format!("retention.max_age: {}", e))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Retention flavor; only "time" is implemented.
    #[serde(default = "default_retention_policy")]
    pub policy: String,

    /// Default stream retention window.
    pub max_age: MaxAge,

    /// Default cleanup policy for new streams.
    pub cleanup_policy: String,

    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_retention_policy() -> String {
    "time".to_string()
}

fn default_interval_seconds() -> u64 {
    300
}

fn default_batch_size() -> usize {
    streamweaver_retention::DEFAULT_BATCH_SIZE
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    pub local: Option<LocalStorageConfig>,
    pub s3: Option<S3StorageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalStorageConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3StorageConfig {
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_access_key: String,
    pub endpoint: Option<String>,
}

impl BrokerConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BrokerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid("port must be nonzero"));
        }
        self.logging.validate()?;
        self.retention.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(invalid(format!(
                "logging.log_level must be one of {:?}, got {:?}",
                VALID_LOG_LEVELS, self.log_level
            )));
        }
        if !VALID_LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(invalid(format!(
                "logging.log_format must be one of {:?}, got {:?}",
                VALID_LOG_FORMATS, self.log_format
            )));
        }
        Ok(())
    }
}

impl RetentionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_RETENTION_POLICIES.contains(&self.policy.as_str()) {
            return Err(invalid(format!(
                "retention.policy must be one of {:?}, got {:?}",
                VALID_RETENTION_POLICIES, self.policy
            )));
        }
        if self.policy == "size" {
            return Err(invalid(
                "retention.policy \"size\" is not implemented; use \"time\"",
            ));
        }
        let max_age_ms = self.max_age.as_millis()?;
        if max_age_ms <= 0 {
            return Err(invalid(format!(
                "retention.max_age must be positive, got {}",
                max_age_ms
            )));
        }
        self.cleanup_policy
            .parse::<CleanupPolicy>()
            .map_err(|e| invalid(format!("retention.cleanup_policy: {}", e)))?;
        if self.interval_seconds == 0 {
            return Err(invalid("retention.interval_seconds must be nonzero"));
        }
        if self.batch_size == 0 {
            return Err(invalid("retention.batch_size must be nonzero"));
        }
        Ok(())
    }

    pub fn max_age_ms(&self) -> Result<i64, ConfigError> {
        self.max_age.as_millis()
    }

    pub fn parsed_cleanup_policy(&self) -> Result<CleanupPolicy, ConfigError> {
        self.cleanup_policy
            .parse()
            .map_err(|e| invalid(format!("retention.cleanup_policy: {}", e)))
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.provider.as_str() {
            "local" => {
                if self.local.is_none() {
                    return Err(invalid(
                        "storage.provider is \"local\" but [storage.local] is missing",
                    ));
                }
            }
            "s3" => {
                let Some(s3) = &self.s3 else {
                    return Err(invalid(
                        "storage.provider is \"s3\" but [storage.s3] is missing",
                    ));
                };
                for (field, value) in [
                    ("region", &s3.region),
                    ("bucket", &s3.bucket),
                    ("access_key", &s3.access_key),
                    ("secret_access_key", &s3.secret_access_key),
                ] {
                    if value.is_empty() {
                        return Err(invalid(format!("storage.s3.{} is required", field)));
                    }
                }
            }
            other => {
                return Err(invalid(format!(
                    "storage.provider must be one of {:?}, got {:?}",
                    VALID_STORAGE_PROVIDERS, other
                )));
            }
        }
        Ok(())
    }

    /// Convert the validated section into the storage crate's provider
    /// selection.
    pub fn provider_config(&self) -> Result<StorageProviderConfig, ConfigError> {
        match self.provider.as_str() {
            "local" => {
                let local = self
                    .local
                    .as_ref()
                    .ok_or_else(|| invalid("[storage.local] is missing"))?;
                Ok(StorageProviderConfig::Local {
                    directory: local.directory.clone(),
                })
            }
            "s3" => {
                let s3 = self
                    .s3
                    .as_ref()
                    .ok_or_else(|| invalid("[storage.s3] is missing"))?;
                Ok(StorageProviderConfig::S3(S3Options {
                    region: s3.region.clone(),
                    bucket: s3.bucket.clone(),
                    access_key: s3.access_key.clone(),
                    secret_access_key: s3.secret_access_key.clone(),
                    endpoint: s3.endpoint.clone(),
                }))
            }
            other => Err(invalid(format!("unknown storage provider: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> &'static str {
        r#"
            port = 50051

            [retention]
            max_age = 604800000
            cleanup_policy = "delete,archive"

            [storage]
            provider = "local"

            [storage.local]
            directory = "/tmp/blocks"
        "#
    }

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: BrokerConfig = toml::from_str(base_config()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.retention.policy, "time");
        assert_eq!(config.retention.interval_seconds, 300);
        assert_eq!(config.retention.batch_size, 1000);
        assert_eq!(config.retention.max_age_ms().unwrap(), 604_800_000);
        assert_eq!(
            config.retention.parsed_cleanup_policy().unwrap(),
            CleanupPolicy::DeleteArchive
        );
    }

    #[test]
    fn legacy_max_age_strings_are_accepted() {
        let toml_str = base_config().replace("604800000", "\"7d\"");
        let config: BrokerConfig = toml::from_str(&toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.retention.max_age_ms().unwrap(), 604_800_000);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let config: BrokerConfig = toml::from_str(
            r#"
                port = 50051

                [logging]
                log_level = "loud"

                [retention]
                max_age = 1000
                cleanup_policy = "delete"

                [storage]
                provider = "local"

                [storage.local]
                directory = "/tmp/blocks"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn size_retention_is_recognized_but_unimplemented() {
        let config: BrokerConfig = toml::from_str(
            r#"
                port = 50051

                [retention]
                policy = "size"
                max_age = 1000
                cleanup_policy = "delete"

                [storage]
                provider = "local"

                [storage.local]
                directory = "/tmp/blocks"
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not implemented"));
    }

    #[test]
    fn unknown_cleanup_policy_is_rejected() {
        let toml_str = base_config().replace("delete,archive", "compact");
        let config: BrokerConfig = toml::from_str(&toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn s3_provider_requires_its_section() {
        let config: BrokerConfig = toml::from_str(
            r#"
                port = 50051

                [retention]
                max_age = 1000
                cleanup_policy = "delete"

                [storage]
                provider = "s3"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let toml_str = base_config().replace("\"local\"", "\"tape\"");
        let config: BrokerConfig = toml::from_str(&toml_str).unwrap();
        assert!(config.validate().is_err());
    }
}
