//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.vendor-summary.toml` files.

use crate::clean::ZeroDenominator;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".vendor-summary.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Destination and export settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Log file settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Derived metric settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Source database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite inventory database.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("inventory.db")
}

/// Destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination table, fully replaced on every run.
    #[serde(default = "default_table")]
    pub table: String,

    /// Optional JSON export of the cleaned summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            export: None,
        }
    }
}

fn default_table() -> String {
    "vendor_sales_summary".to_string()
}

/// Log file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Append-only log file.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Level filter: error, warn, info, debug or trace.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/get_vendor_summary.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Derived metric settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Value written for a ratio whose denominator is zero.
    #[serde(default)]
    pub zero_denominator: ZeroDenominator,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref database) = args.database {
            self.database.path = database.clone();
        }
        if let Some(ref table) = args.table {
            self.output.table = table.clone();
        }
        if let Some(ref export) = args.export {
            self.output.export = Some(export.clone());
        }
        if let Some(ref log_file) = args.log_file {
            self.logging.file = log_file.clone();
        }
        if let Some(policy) = args.zero_denominator {
            self.metrics.zero_denominator = policy;
        }

        // Verbosity flags always win over the configured level
        if args.verbose {
            self.logging.level = "debug".to_string();
        } else if args.quiet {
            self.logging.level = "error".to_string();
        }
    }

    /// Level filter for the log file, falling back to INFO on an unknown name.
    pub fn log_level(&self) -> tracing::Level {
        self.logging
            .level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, PathBuf::from("inventory.db"));
        assert_eq!(config.output.table, "vendor_sales_summary");
        assert_eq!(
            config.logging.file,
            PathBuf::from("logs/get_vendor_summary.log")
        );
        assert_eq!(config.metrics.zero_denominator, ZeroDenominator::Zero);
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_verbose_raises_default_level() {
        let mut config = Config::default();
        config.merge_with_args(&Args::parse_from(["vendor-summary", "-v"]));
        assert_eq!(config.log_level(), tracing::Level::DEBUG);

        let mut config = Config::default();
        config.logging.level = "chatty".to_string();
        assert_eq!(config.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[database]
path = "data/inventory.db"

[output]
table = "vendor_summary_v2"
export = "summary.json"

[metrics]
zero_denominator = "null"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.database.path, PathBuf::from("data/inventory.db"));
        assert_eq!(config.output.table, "vendor_summary_v2");
        assert_eq!(config.output.export, Some(PathBuf::from("summary.json")));
        assert_eq!(config.metrics.zero_denominator, ZeroDenominator::Null);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_merge_with_args() {
        let mut config: Config = toml::from_str(
            r#"
[output]
table = "from_config"

[logging]
level = "info"
"#,
        )
        .unwrap();
        let args = Args::parse_from([
            "vendor-summary",
            "--database",
            "other.db",
            "--zero-denominator",
            "null",
            "--quiet",
        ]);

        config.merge_with_args(&args);

        assert_eq!(config.database.path, PathBuf::from("other.db"));
        assert_eq!(config.output.table, "from_config");
        assert_eq!(config.metrics.zero_denominator, ZeroDenominator::Null);
        assert_eq!(config.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_load_rejects_bad_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[metrics]\nzero_denominator = \"nan\"\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("[metrics]"));
    }
}
