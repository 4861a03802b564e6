//! Configuration module for the BMI server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the BMI server
#[derive(Parser, Debug, Default)]
#[command(name = "bmi-server")]
#[command(version = "0.1.0")]
#[command(about = "A TCP body-mass-index server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:5000)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen backlog
    #[arg(long)]
    pub backlog: Option<u32>,

    /// Seconds to wait for a request before dropping the connection (0 = no limit)
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Seconds to wait for a response write to complete (0 = no limit)
    #[arg(long)]
    pub write_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Read deadline in seconds
    #[serde(default = "default_timeout")]
    pub read_timeout: u64,
    /// Write deadline in seconds
    #[serde(default = "default_timeout")]
    pub write_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            read_timeout: default_timeout(),
            write_timeout: default_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
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

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_backlog() -> u32 {
    1024
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen: String,
    pub backlog: u32,
    /// `None` disables the deadline
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config::merge(CliArgs::default(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = match cli.config {
            Some(ref config_path) => {
                let contents = std::fs::read_to_string(config_path)
                    .map_err(|source| ConfigError::FileRead {
                        path: config_path.clone(),
                        source,
                    })?;
                toml::from_str(&contents)
                    .map_err(|source| ConfigError::TomlParse {
                        path: config_path.clone(),
                        source,
                    })?
            }
            None => TomlConfig::default(),
        };

        Ok(Config::merge(cli, toml_config))
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    pub fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            read_timeout: seconds(cli.read_timeout.unwrap_or(toml_config.server.read_timeout)),
            write_timeout: seconds(
                cli.write_timeout
                    .unwrap_or(toml_config.server.write_timeout),
            ),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
