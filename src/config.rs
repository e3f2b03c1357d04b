use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::GRAPH_BASE_URL;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Azure AD tenant used for the client-credentials grant
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// App registration ID; enables the client-credentials grant when set
    #[serde(default)]
    pub client_id: Option<String>,
    /// Name of the env var holding the client secret
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
}

fn default_tenant() -> String {
    "organizations".to_string()
}

fn default_client_secret_env() -> String {
    "TEAMS_GRAPH_CLIENT_SECRET".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            client_id: None,
            client_secret_env: default_client_secret_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (json, table or plain) used when `--format` is absent
    #[serde(default = "default_format")]
    pub default_format: String,
    /// Colored status messages; `false` forces them off
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_format() -> String {
    "table".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Graph base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Endpoint catalog (.json or .toml) used instead of the built-in one
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Merge `catalog` over the built-in one rather than replacing it
    #[serde(default)]
    pub extend_builtin: bool,
}

fn default_base_url() -> String {
    GRAPH_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            catalog: None,
            extend_builtin: false,
        }
    }
}

impl Config {
    /// Get the project directories
    pub fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "teams-graph", "teams-graph")
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs().context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the cache directory
    pub fn cache_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs().context("Could not determine cache directory")?;
        Ok(dirs.cache_dir().to_path_buf())
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, falling back to defaults when absent
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))
        } else {
            Ok(Self::default())
        }
    }
}
