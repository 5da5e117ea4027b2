use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::notifier::{DEFAULT_MESSAGE, DEFAULT_TITLE, NoticeText};

pub const IN_MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    /// Master switch for remote sync. Off means local-only.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    /// Per-request limit in milliseconds, 0 for none.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            anon_key: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    /// Both the service url and its public key are present.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.is_configured()
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    /// Show remote errors to the user. When off they are only logged.
    #[serde(default)]
    pub surface_errors: bool,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_message")]
    pub message: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            surface_errors: false,
            title: default_title(),
            message: default_message(),
        }
    }
}

impl NotifyConfig {
    pub fn notice(&self) -> NoticeText {
        NoticeText {
            title: self.title.clone(),
            message: self.message.clone(),
        }
    }
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// SQLite file holding the local snapshot, or `:memory:`.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}

fn default_storage_path() -> String {
    "todocal.db".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    ///
    /// Priority (highest to lowest):
    /// 1. Legacy flags `TODO_REMOTE=1` and `TODO_ERROR_MODAL=1`
    /// 2. Environment variables (`TODOCAL__REMOTE__URL`, etc.)
    /// 3. Config file: `config_path`, else `TODOCAL_CONFIG`, else `config/todocal.toml`
    /// 4. Defaults
    pub fn load(config_path: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_file_path = config_path
            .or_else(|| env::var("TODOCAL_CONFIG").ok())
            .unwrap_or_else(|| "config/todocal.toml".to_string());

        // The file is optional.
        let path = Path::new(&config_file_path);
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("TODOCAL")
                .separator("__")
                .try_parsing(true),
        );

        if env::var("TODO_REMOTE").is_ok_and(|v| v == "1") {
            builder = builder.set_override("remote.enabled", true)?;
        }
        if env::var("TODO_ERROR_MODAL").is_ok_and(|v| v == "1") {
            builder = builder.set_override("notify.surface_errors", true)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.storage.path.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "storage.path must not be empty".to_string(),
            ));
        }
        if EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(EngineError::InvalidConfig(format!(
                "logging.level is not a valid filter: {}",
                self.logging.level
            )));
        }
        Ok(())
    }
}
