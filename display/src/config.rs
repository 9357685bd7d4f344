use std::path::{Path, PathBuf};

use commit_graph::LayoutOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LOCAL_TREE_NAME: &str = "Local commit tree";
pub const REMOTE_TREE_NAME: &str = "Remote commit tree";
pub const FINALIZER_THREAD_NAME: &str = "Layout finalization";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for one commit tree view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// View name, shown in worker thread names
    pub name: String,
    pub layout: LayoutOptions,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { name: LOCAL_TREE_NAME.to_string(), layout: LayoutOptions::default() }
    }
}

impl DisplayConfig {
    pub fn remote() -> Self {
        Self { name: REMOTE_TREE_NAME.to_string(), ..Self::default() }
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.layout.cancel_check_interval == 0 {
            return Err(ConfigError::Invalid("layout.cancel_check_interval must be at least 1".into()));
        }
        if self.layout.max_cells == Some(0) {
            return Err(ConfigError::Invalid("layout.max_cells must be positive".into()));
        }
        Ok(())
    }

    pub fn layout_thread_name(&self) -> String {
        format!("Graph Layout: {}", self.name)
    }
}
