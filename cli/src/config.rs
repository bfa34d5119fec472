//! Configuration management for the CLI.
//!
//! Configuration is stored in ~/.voxgate/config.yaml. Every field is
//! optional; missing fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voxgate_voiceauth::AuthConfig;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".voxgate";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Default model store filename.
pub const DEFAULT_STORE_FILE: &str = "models.redb";

/// CLI configuration: the model store location plus the authentication
/// settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Model store path; `~/` is expanded. Defaults to
    /// ~/.voxgate/models.redb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,

    #[serde(flatten)]
    pub auth: AuthConfig,

    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

impl CliConfig {
    /// Gets the default config directory.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Resolves the model store path.
    pub fn store_path(&self) -> anyhow::Result<PathBuf> {
        match &self.store {
            Some(p) => Ok(expand_home(p)),
            None => Self::default_config_dir()
                .map(|dir| dir.join(DEFAULT_STORE_FILE))
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory for the model store")),
        }
    }
}

/// Loads the configuration, creating an empty file if none exists.
pub fn load_config(custom_path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let config_path = resolve_path(custom_path)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg: CliConfig = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            CliConfig::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                anyhow::anyhow!("invalid config {}: {e}", config_path.display())
            })?
        }
    } else {
        std::fs::write(&config_path, "")?;
        CliConfig::default()
    };

    cfg.config_path = config_path;
    Ok(cfg)
}

/// Writes `config` to `custom_path` or the default location.
pub fn save_config(config: &CliConfig, custom_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let config_path = resolve_path(custom_path)?;
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config_path, serde_yaml::to_string(config)?)?;
    Ok(config_path)
}

fn resolve_path(custom_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match custom_path {
        Some(p) => Ok(p.to_path_buf()),
        None => CliConfig::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path")),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
