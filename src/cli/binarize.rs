//! Compile or binarize a single file outside of a build.
//!
//! Configs (`.cpp`, `.rvmat`, `.ext`) go through the config compiler; models
//! and terrains go through the configured model binarizer.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::CommandContext;
use crate::build::Dispatcher;
use crate::core::AddonError;
use crate::resolver::Resolver;

/// Command to binarize one file.
#[derive(Args, Debug)]
pub struct BinarizeCommand {
    /// File to binarize
    source: PathBuf,

    /// Output file
    target: PathBuf,

    /// Overwrite the target if it exists
    #[arg(short, long)]
    force: bool,

    /// Additional include root (repeatable)
    #[arg(short, long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Show the output of external tools
    #[arg(long)]
    tool_output: bool,
}

impl BinarizeCommand {
    /// Binarizes `source` into `target`.
    pub fn execute(self, context: &CommandContext) -> Result<()> {
        if self.target.exists() && !self.force {
            return Err(AddonError::TargetExists {
                path: self.target.display().to_string(),
            }
            .into());
        }

        let tools = context.toolchain(self.tool_output);
        let resolver = Resolver::new(context.include_roots(&self.include)?);
        let mut dispatcher = Dispatcher::new(&tools, &resolver, &context.config.muted_warnings);
        dispatcher.binarize_file(&self.source, &self.target)
    }
}
