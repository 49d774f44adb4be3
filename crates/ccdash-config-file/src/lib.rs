//! File-based configuration for ccdash
//!
//! Loads [`AppConfig`] from a YAML or TOML file (chosen by extension), then
//! lets `CCDASH_*` environment variables override individual fields.
//! Configuration is read once at startup; nothing watches the file.
//!
//! # Example
//! ```no_run
//! # use ccdash_config_file::AppConfig;
//! # fn example() -> ccdash_core::Result<()> {
//! let mut config = AppConfig::load(Some("~/.ccdash/config.yaml".as_ref()))?;
//! config.merge_env();
//! config.validate()?;
//! let offset = config.report_offset()?;
//! # Ok(())
//! # }
//! ```

mod app_config;

pub use app_config::{
    AppConfig, DatabaseConfig, LoggingConfig, ReportingConfig, default_config_path,
};
