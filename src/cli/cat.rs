//! Write a single archive entry to stdout.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use crate::pbo::Archive;

/// Command to print one entry of an archive.
#[derive(Args, Debug)]
pub struct CatCommand {
    /// Archive to read
    archive: PathBuf,

    /// Entry name, with `\` or `/` separators
    name: String,
}

impl CatCommand {
    /// Copies the entry's bytes to stdout.
    pub fn execute(self) -> Result<()> {
        let archive = Archive::read(&self.archive)?;
        let data = archive.entry_data(&self.name)?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(data).context("Failed to write to stdout")?;
        stdout.flush()?;
        Ok(())
    }
}
