//! Configuration for the bundle service

use bifrost_hooks::{slack_hooks, HookSet, RetryPolicy, SlackChannel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BifrostConfig {
    /// Passed to every lifecycle hook
    #[serde(default = "default_environment_name")]
    pub environment_name: String,

    /// Bundle repository backend
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Root of artifact storage; packages live under `{storage_path}/bundles`
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Tag allow-list
    #[serde(default)]
    pub tags: Vec<String>,

    /// Retry policy for lifecycle hooks
    #[serde(default)]
    pub hooks: RetryPolicy,

    #[serde(default)]
    pub slack: SlackConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BifrostConfig {
    fn default() -> Self {
        Self {
            environment_name: default_environment_name(),
            database: DatabaseConfig::default(),
            storage_path: default_storage_path(),
            tags: Vec::new(),
            hooks: RetryPolicy::default(),
            slack: SlackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// In-memory store (for development/testing)
    Memory,

    /// SQLite database file
    Sqlite {
        #[serde(default = "default_database_path")]
        path: PathBuf,
    },
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::Sqlite {
            path: default_database_path(),
        }
    }
}

/// Slack notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Incoming webhook; Slack hooks are installed only when set
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_environment_name() -> String {
    "development".to_string()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".data/")
}

fn default_database_path() -> PathBuf {
    PathBuf::from(".db/bifrost.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl BifrostConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `BIFROST_*` environment variables.
    ///
    /// Nested keys use `__` (`BIFROST_SLACK__WEBHOOK_URL`); `BIFROST_TAGS` is
    /// a comma-separated list.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&BifrostConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("BIFROST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("tags"),
        );

        builder.build()?.try_deserialize()
    }

    /// Development configuration backed by the in-memory store.
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig::Memory,
            ..Default::default()
        }
    }

    pub fn is_tag_allowed(&self, tag: &str) -> bool {
        self.tags.iter().any(|allowed| allowed == tag)
    }

    /// Hooks implied by the configuration: Slack notifications for every
    /// event when a webhook is set, otherwise none.
    pub fn default_hooks(&self) -> HookSet {
        match self.slack.webhook_url.as_deref() {
            Some(url) if !url.is_empty() => slack_hooks(SlackChannel::new(url)),
            _ => HookSet::new(),
        }
    }
}
