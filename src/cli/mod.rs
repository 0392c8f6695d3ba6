//! Command-line interface for addonpack.
//!
//! # Commands
//!
//! - `build` - Pack an addon directory into an archive
//! - `preprocess` - Print the preprocessed text of a config
//! - `binarize` - Compile or binarize a single file
//! - `inspect` - List an archive's prefix and entries and verify its checksum
//! - `unpack` - Extract an archive into a directory
//! - `cat` - Write one archive entry to stdout
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Only report errors
//! - `--config <path>` - Use a specific config file
//! - `--no-progress` - Hide progress bars
//!
//! `RUST_LOG` overrides the level picked by `--verbose` and `--quiet`.
//!
//! # Examples
//!
//! ```bash
//! addonpack build -f -x "*.psd" -k keys/mod.biprivatekey addons/main release/main.pbo
//! addonpack preprocess -i ../cba addons/main/config.cpp
//! addonpack inspect --format json release/main.pbo
//! ```

mod binarize;
mod build;
mod cat;
mod common;
mod inspect;
mod preprocess;
mod unpack;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::CommandContext;

/// Settings derived from the global flags, applied before a command runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Hide progress bars
    pub no_progress: bool,
    /// Config file given with `--config`
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Installs the log subscriber and progress settings.
    ///
    /// Safe to call more than once; only the first subscriber is installed.
    pub fn apply(&self) {
        if self.no_progress {
            crate::utils::progress::disable_progress();
        }

        let filter = if std::env::var_os("RUST_LOG").is_some() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&self.log_level)
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .try_init();
    }
}

/// Packs game addon sources into signed archives.
#[derive(Parser, Debug)]
#[command(
    name = "addonpack",
    about = "Preprocess, binarize and pack game addons",
    version,
    long_about = "addonpack turns an addon source directory into a packed archive: configs are \
                  preprocessed, models are binarized in isolated workspaces, and the result is \
                  written with a checksum trailer and an optional detached signature."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of ~/.addonpack/config.toml
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an addon directory into an archive
    Build(build::BuildCommand),

    /// Preprocess a config and print the result
    Preprocess(preprocess::PreprocessCommand),

    /// Compile or binarize a single file
    Binarize(binarize::BinarizeCommand),

    /// Show the contents of an archive and verify its checksum
    Inspect(inspect::InspectCommand),

    /// Extract an archive into a directory
    Unpack(unpack::UnpackCommand),

    /// Write one archive entry to stdout
    Cat(cat::CatCommand),
}

impl Cli {
    /// Runs the parsed command.
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config)
    }

    /// Translates the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Runs the command with explicit settings.
    pub fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply();
        let context = CommandContext::load(config.config_path.as_deref())?;

        match self.command {
            Commands::Build(cmd) => cmd.execute(&context),
            Commands::Preprocess(cmd) => cmd.execute(&context),
            Commands::Binarize(cmd) => cmd.execute(&context),
            Commands::Inspect(cmd) => cmd.execute(),
            Commands::Unpack(cmd) => cmd.execute(),
            Commands::Cat(cmd) => cmd.execute(),
        }
    }
}
