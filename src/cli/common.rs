//! State shared by the commands that read the config file.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::build::Toolchain;
use crate::config::Config;
use crate::constants::TOOL_OUTPUT_ENV;
use crate::utils::fs::absolute_path;

/// The loaded config plus helpers to merge it with command-line values.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Contents of the config file, or defaults
    pub config: Config,
}

impl CommandContext {
    /// Loads the config from `config_path` or the default locations.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Ok(Self {
            config: Config::load(config_path)?,
        })
    }

    /// Include roots in search order: the current directory, then `cli_roots`,
    /// then the configured ones.
    pub fn include_roots(&self, cli_roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut roots = vec![absolute_path(Path::new("."))?];
        for root in cli_roots.iter().cloned().chain(self.config.include_roots()?) {
            let root = absolute_path(&root)?;
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        Ok(roots)
    }

    /// Command-line list values followed by the configured ones.
    pub fn merged(cli: &[String], configured: &[String]) -> Vec<String> {
        cli.iter().chain(configured).cloned().collect()
    }

    /// The toolchain from the `[tools]` table.
    ///
    /// Tool output is captured unless `tool_output` is set or
    /// `ADDONPACK_TOOL_OUTPUT` is present.
    pub fn toolchain(&self, tool_output: bool) -> Toolchain {
        let show_output = tool_output || std::env::var_os(TOOL_OUTPUT_ENV).is_some();
        Toolchain::from_config(&self.config.tools, !show_output)
    }
}
