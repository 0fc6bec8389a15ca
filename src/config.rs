//! Configuration management for SimpleChain

use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
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

fn default_db_path() -> String {
    "./chaindata.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load `config.toml` from the working directory, or defaults when it is absent.
pub fn load_config() -> Result<Config, ChainError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

pub fn load_config_from<P: AsRef<Path>>(path: P) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        parse_config(&config_str)?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

fn parse_config(config_str: &str) -> Result<Config, ChainError> {
    toml::from_str(config_str).map_err(|e| ChainError::ConfigError(e.to_string()))
}

fn validate(config: &Config) -> Result<(), ChainError> {
    if config.database.path.is_empty() {
        return Err(ChainError::ConfigError(
            "database.path must be set in config.toml".to_string(),
        ));
    }
    Ok(())
}
