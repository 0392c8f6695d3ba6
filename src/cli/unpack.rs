//! Extract an archive.
//!
//! ```bash
//! addonpack unpack release/main.pbo unpacked/main
//! addonpack unpack -f -i "*.sqf" release/main.pbo unpacked/main
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::pattern::PatternSet;
use crate::pbo::{UnpackOptions, unpack};

/// Command to extract an archive into a directory.
#[derive(Args, Debug)]
pub struct UnpackCommand {
    /// Archive to extract
    archive: PathBuf,

    /// Directory to extract into
    target: PathBuf,

    /// Extract into a non-empty directory
    #[arg(short, long)]
    force: bool,

    /// Only extract entries matching this glob (repeatable)
    #[arg(short, long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// Skip entries matching this glob (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
}

impl UnpackCommand {
    /// Extracts the archive.
    pub fn execute(self) -> Result<()> {
        let options = UnpackOptions {
            force: self.force,
            include: PatternSet::new(&self.include)?,
            exclude: PatternSet::new(&self.exclude)?,
        };
        let extracted = unpack(&self.archive, &self.target, &options)?;
        println!(
            "{} {} entries into {}",
            "Extracted".green().bold(),
            extracted.len(),
            self.target.display()
        );
        Ok(())
    }
}
