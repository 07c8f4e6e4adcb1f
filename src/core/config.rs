//! Configuration management for kira-scenario.
//!
//! Handles loading and saving configuration from TOML files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::duration::human;

/// Name of the per-project configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".kira-scenario.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chain node connection settings
    pub node: NodeConfig,

    /// Scenario engine defaults
    pub engine: EngineConfig,

    /// Static key name to address table, consulted before the node keyring
    pub keys: BTreeMap<String, String>,
}

/// Settings for reaching the chain node through its CLI binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node binary to invoke
    pub binary: String,

    /// RPC endpoint passed as `--node`
    pub node: String,

    /// Chain id passed to transactions
    pub chain_id: String,

    /// Node home directory (`~` is expanded)
    pub home: Option<String>,

    /// Keyring backend passed to key lookups and transactions
    pub keyring_backend: String,

    /// Run the binary inside this container via `docker exec`
    pub container: Option<String>,

    /// Bech32 prefix that marks a value as an address rather than a key name
    pub address_prefix: String,

    /// Upper bound for a single node command
    #[serde(with = "human")]
    pub command_timeout: Duration,
}

/// Defaults applied to scenario runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long to wait for an async-broadcast transaction to be included
    #[serde(with = "human")]
    pub wait_timeout: Duration,

    /// Interval between inclusion checks
    #[serde(with = "human")]
    pub poll_interval: Duration,

    /// Keep running steps after a failure
    pub continue_on_error: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            binary: "sekaid".to_string(),
            node: "tcp://localhost:26657".to_string(),
            chain_id: "localnet-1".to_string(),
            home: None,
            keyring_backend: "test".to_string(),
            container: None,
            address_prefix: "kira".to_string(),
            command_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            continue_on_error: false,
        }
    }
}

impl NodeConfig {
    /// Home directory with `~` and environment variables expanded.
    pub fn expanded_home(&self) -> Option<String> {
        self.home.as_ref().map(|h| {
            shellexpand::full(h).map(|expanded| expanded.into_owned()).unwrap_or_else(|_| h.clone())
        })
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.kira-scenario.toml` in current directory
    /// 2. `~/.config/kira-scenario/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::global_config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = ?path, "Loaded configuration");
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The file `load()` would read, if any exists.
    pub fn active_path() -> Option<PathBuf> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }
        Self::global_config_path().filter(|p| p.exists())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("kira-scenario"))
    }

    fn global_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }
}
