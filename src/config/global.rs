//! Loading and interpreting the config file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::CONFIG_ENV;
use crate::core::AddonError;
use crate::tools::ToolSpec;
use crate::utils::platform::expand_path;

/// Contents of the config file.
///
/// Every field is optional; an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Include roots searched after the ones given on the command line
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Glob patterns of files left out of every archive
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Warning names that are never reported
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub muted_warnings: Vec<String>,

    /// Base directory for build workspaces, the system temp dir if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_path: Option<String>,

    /// External programs
    #[serde(default, skip_serializing_if = "ToolsConfig::is_empty")]
    pub tools: ToolsConfig,
}

/// The `[tools]` table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Compiles `config.cpp`, `.rvmat` and `.ext` files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_compiler: Option<ToolSpec>,

    /// Binarizes models and terrains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_binarizer: Option<ToolSpec>,

    /// Signs finished archives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<ToolSpec>,
}

impl ToolsConfig {
    /// Whether no tool is configured.
    pub fn is_empty(&self) -> bool {
        self.config_compiler.is_none() && self.model_binarizer.is_none() && self.signer.is_none()
    }
}

impl Config {
    /// Loads the configuration, see the [module docs](crate::config) for the
    /// lookup order.
    ///
    /// # Errors
    ///
    /// Fails if `explicit` does not exist, or if the chosen file cannot be
    /// read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = Self::locate(explicit, std::env::var_os(CONFIG_ENV))?;
        if !path.exists() {
            if required {
                return Err(AddonError::FileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads the configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// `~/.addonpack/config.toml`.
    ///
    /// # Errors
    ///
    /// Fails when the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".addonpack").join("config.toml"))
    }

    /// Picks the config path and whether it has to exist.
    fn locate(explicit: Option<&Path>, env: Option<OsString>) -> Result<(PathBuf, bool)> {
        if let Some(path) = explicit {
            return Ok((path.to_path_buf(), true));
        }
        if let Some(value) = env.filter(|v| !v.is_empty()) {
            return Ok((expand_path(&value.to_string_lossy())?, false));
        }
        Ok((Self::default_path()?, false))
    }

    /// Configured include roots with `~` and variables expanded.
    pub fn include_roots(&self) -> Result<Vec<PathBuf>> {
        self.include.iter().map(|root| expand_path(root)).collect()
    }

    /// Configured temp base, expanded.
    pub fn temp_path(&self) -> Result<Option<PathBuf>> {
        self.temp_path.as_deref().map(expand_path).transpose()
    }
}
