//! Configuration management for forgechain

use crate::error::{ChainError, Result};
use crate::miner::{DEFAULT_DIFFICULTY, MINING_REWARD};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// File read by [`load_config`].
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// SHA-256 hex digests are 64 characters, so no proof can satisfy more.
const MAX_DIFFICULTY: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_reward")]
    pub reward: u64,
    /// Recipient of mining rewards. A random identifier is used when unset.
    #[serde(default)]
    pub node_identifier: Option<String>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward: default_reward(),
            node_identifier: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.network.host.is_empty() {
            return Err(ChainError::ConfigError("network.host must not be empty".to_string()));
        }
        if self.network.api_port == 0 {
            return Err(ChainError::ConfigError("network.api_port must be non-zero".to_string()));
        }
        if self.miner.difficulty == 0 || self.miner.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "miner.difficulty must be between 1 and {}, got {}",
                MAX_DIFFICULTY, self.miner.difficulty
            )));
        }
        Ok(())
    }

    /// Apply overrides from the environment (`PORT`).
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.network.api_port = port;
        }
    }

    /// Configured node identifier, ignoring blank values.
    pub fn node_identifier(&self) -> Option<&str> {
        self.miner
            .node_identifier
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Load `config.toml` from the working directory, or defaults when absent.
pub fn load_config() -> Result<Config> {
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config_from(DEFAULT_CONFIG_PATH)
    } else {
        Ok(Config::default())
    }
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    let config_str = fs::read_to_string(path.as_ref())?;
    let config: Config = if config_str.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str)?
    };

    config.validate()?;
    Ok(config)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_reward() -> u64 {
    MINING_REWARD
}
