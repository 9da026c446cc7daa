use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use modgraph_util::errors::ModgraphError;

/// Global user configuration loaded from `~/.modgraph/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolution: ResolutionConfig,

    #[serde(default)]
    pub tool: ToolConfig,
}

/// Resolution settings from `[resolution]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Maximum number of concurrent metadata fetches.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Upper bound on driver passes before resolution is declared divergent.
    #[serde(default = "default_max_passes", rename = "max-passes")]
    pub max_passes: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            max_passes: default_max_passes(),
        }
    }
}

fn default_jobs() -> usize {
    8
}

fn default_max_passes() -> usize {
    64
}

/// Build identity overrides from `[tool]`, written into `createdBy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "build-id")]
    pub build_id: Option<String>,
}

impl GlobalConfig {
    /// Load the global configuration from `~/.modgraph/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load the configuration at `path`, or return defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if path.is_file() {
            tracing::debug!("Loading global config from {}", path.display());
            let content = std::fs::read_to_string(path).map_err(|e| ModgraphError::Generic {
                message: format!("Failed to read global config: {e}"),
            })?;
            Self::from_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_str(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            ModgraphError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the modgraph data directory (`~/.modgraph/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".modgraph")
}
