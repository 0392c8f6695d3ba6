//! Print the preprocessed text of a config source.
//!
//! ```bash
//! addonpack preprocess addons/main/config.cpp
//! addonpack preprocess -i ../cba addons/main/config.cpp build/config.i
//! ```

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use super::CommandContext;
use crate::preprocess::{CompileContext, preprocess};
use crate::resolver::Resolver;
use crate::utils::fs::ensure_parent_dir;

/// Command to run the preprocessor on one file.
#[derive(Args, Debug)]
pub struct PreprocessCommand {
    /// Source file
    source: PathBuf,

    /// Output file, stdout when omitted
    target: Option<PathBuf>,

    /// Additional include root (repeatable)
    #[arg(short, long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Mute a named warning (repeatable)
    #[arg(short = 'w', long = "warning", value_name = "NAME")]
    muted_warnings: Vec<String>,
}

impl PreprocessCommand {
    /// Preprocesses the source and writes the result.
    pub fn execute(self, context: &CommandContext) -> Result<()> {
        let resolver = Resolver::new(context.include_roots(&self.include)?);
        let muted = CommandContext::merged(&self.muted_warnings, &context.config.muted_warnings);
        let mut ctx = CompileContext::new(&resolver).with_muted_warnings(muted);

        let mut out = Vec::new();
        preprocess(&self.source, &mut out, &mut ctx)?;

        match &self.target {
            Some(target) => {
                ensure_parent_dir(target)?;
                std::fs::write(target, &out)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&out).context("Failed to write to stdout")?;
                stdout.flush()?;
            }
        }
        Ok(())
    }
}
