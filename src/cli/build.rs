//! Build an addon directory into an archive.
//!
//! # Examples
//!
//! ```bash
//! addonpack build addons/main release/main.pbo
//! addonpack build -f -x "*.psd" -x "*.blend" addons/main release/main.pbo
//! addonpack build -p -k keys/mod.biprivatekey addons/main release/main.pbo
//! ```
//!
//! Exclude patterns, muted warnings and the temp directory given on the
//! command line are combined with the ones from the config file.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CommandContext;
use crate::build::{BuildOptions, BuildReport, build};

/// Command to pack an addon.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Addon source directory
    source: PathBuf,

    /// Archive to write
    target: PathBuf,

    /// Overwrite the target if it exists
    #[arg(short, long)]
    force: bool,

    /// Pack files as they are, skipping binarization
    #[arg(short, long)]
    pack_only: bool,

    /// Mute a named warning (repeatable)
    #[arg(short = 'w', long = "warning", value_name = "NAME")]
    muted_warnings: Vec<String>,

    /// Additional include root (repeatable)
    #[arg(short, long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Glob of files to leave out of the archive (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// Private key to sign the archive with
    #[arg(short, long, value_name = "KEY")]
    key: Option<PathBuf>,

    /// Directory to create the build workspace in
    #[arg(short = 'T', long = "temp", value_name = "DIR")]
    temp: Option<PathBuf>,

    /// Keep the build workspace after the build
    #[arg(long)]
    keep_temp: bool,

    /// Show the output of external tools
    #[arg(long)]
    tool_output: bool,
}

impl BuildCommand {
    /// Runs the build and prints a summary.
    pub fn execute(self, context: &CommandContext) -> Result<()> {
        let options = self.options(context)?;
        let report = build(&options, &context.toolchain(self.tool_output))?;
        print_report(&options, &report);
        Ok(())
    }

    fn options(&self, context: &CommandContext) -> Result<BuildOptions> {
        let config = &context.config;
        let temp_path = match &self.temp {
            Some(path) => Some(path.clone()),
            None => config.temp_path()?,
        };

        Ok(BuildOptions {
            source: self.source.clone(),
            target: self.target.clone(),
            force: self.force,
            pack_only: self.pack_only,
            include_roots: context.include_roots(&self.include)?,
            exclude: CommandContext::merged(&self.exclude, &config.exclude),
            key: self.key.clone(),
            temp_path,
            keep_temp: self.keep_temp,
            muted_warnings: CommandContext::merged(&self.muted_warnings, &config.muted_warnings),
        })
    }
}

fn print_report(options: &BuildOptions, report: &BuildReport) {
    println!(
        "{} {} ({} entries, prefix {})",
        "Built".green().bold(),
        options.target.display(),
        report.entries.len(),
        report.prefix.cyan()
    );
    println!("  sha1 {}", report.checksum.dimmed());

    if let Some(signature) = &report.signature {
        println!("  {} {}", "signed".green(), signature.display());
    }
    if let Some(workspace) = &report.kept_workspace {
        println!("  workspace kept at {}", workspace.display());
    }
    if !report.warnings.is_empty() {
        println!("  {} warning(s)", report.warnings.len().to_string().yellow());
    }
}
