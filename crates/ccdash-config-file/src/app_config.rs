use ccdash_core::types::parse_utc_offset;
use ccdash_core::{Error, QueueTable, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Top-level ccdash configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Queue literal sets per selector and domain
    #[serde(default)]
    pub queues: QueueTable,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; `~` is expanded
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Fixed offset classification dates are reported in, e.g. `+04:00`
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Answered-within threshold for service level
    #[serde(default = "default_sl_threshold")]
    pub sl_threshold_secs: i64,

    /// Per-step store deadline; unset or zero means no deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub log_sql_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            sl_threshold_secs: default_sl_threshold(),
            query_timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_sql_queries: false,
        }
    }
}

impl AppConfig {
    /// Read a config file, YAML unless the extension is `.toml`
    ///
    /// # Errors
    /// - `Error::ConfigNotFound` if the file does not exist
    /// - `Error::Io` if it cannot be read
    /// - `Error::Config` if it does not parse
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand(&path.as_ref().to_string_lossy());
        if !path.exists() {
            return Err(Error::ConfigNotFound);
        }

        let contents = std::fs::read_to_string(&path)?;
        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Invalid YAML: {}", e)))?
        };

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load an explicit file, or the default location if present
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// yields built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(default) if default.exists() => Self::from_file(default),
                _ => {
                    info!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("CCDASH_DB_PATH") {
            self.database.path = val;
        }

        if let Ok(val) = std::env::var("CCDASH_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("CCDASH_LOG_SQL") {
            match val.parse::<bool>() {
                Ok(enabled) => self.logging.log_sql_queries = enabled,
                Err(_) => warn!("Ignoring invalid CCDASH_LOG_SQL '{}'", val),
            }
        }

        if let Ok(val) = std::env::var("CCDASH_REPORT_OFFSET") {
            self.reporting.utc_offset = val;
        }

        if let Ok(val) = std::env::var("CCDASH_QUERY_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(0) => self.reporting.query_timeout_secs = None,
                Ok(secs) => self.reporting.query_timeout_secs = Some(secs),
                Err(_) => warn!("Ignoring invalid CCDASH_QUERY_TIMEOUT_SECS '{}'", val),
            }
        }
    }

    /// Reject settings that would fail later at query time
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(Error::Config("database.path must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.reporting.sl_threshold_secs < 0 {
            return Err(Error::Config(
                "reporting.sl_threshold_secs must not be negative".to_string(),
            ));
        }
        self.report_offset()?;
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        expand(&self.database.path)
    }

    pub fn report_offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.reporting.utc_offset)
    }

    /// Per-step store deadline; zero means none, from a file or the env
    pub fn query_timeout(&self) -> Option<Duration> {
        self.reporting
            .query_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// `<config dir>/ccdash/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ccdash").join("config.yaml"))
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn default_db_path() -> String {
    "~/.ccdash/ccdash.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_utc_offset() -> String {
    "+04:00".to_string()
}

fn default_sl_threshold() -> i64 {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}
