//! # Configuration Management Module
//!
//! Loads and writes the TOML configuration for the skill tree service.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - where player tree state is persisted
//! - [`SkillsConfig`] - where skill tree seed files live
//! - [`ProgressionConfig`] - engine policies
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use skilltree::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Seeds: {}", config.skills.seed_dir);
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [skills]
//! seed_dir = "./data/seeds/skills"
//!
//! [progression]
//! dormant_reunlock = "free"
//!
//! [logging]
//! level = "info"
//! file = "skilltree.log"
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::skills::DormantReunlockPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub skills: SkillsConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional override for the Sled database path; defaults to `<data_dir>/skill_state`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("skill_state"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Directory of `*.json` skill tree seeds, one tree per file.
    pub seed_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// What re-activating a dormant special node costs: "free" or "repay".
    #[serde(default)]
    pub dormant_reunlock: DormantReunlockPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl LoggingConfig {
    /// Parsed level; unknown strings fall back to `info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                db_path: None,
            },
            skills: SkillsConfig {
                seed_dir: "./data/seeds/skills".to_string(),
            },
            progression: ProgressionConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("skilltree.log".to_string()),
            },
        }
    }
}
