//! Show what an archive holds.
//!
//! Prints the header extensions, every entry with its size, and whether the
//! SHA-1 trailer matches the content. A mismatch makes the command fail after
//! the listing has been printed.
//!
//! ```bash
//! addonpack inspect release/main.pbo
//! addonpack inspect --format json release/main.pbo
//! ```

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::pbo::{Archive, ArchiveEntry};

/// Output formats for `inspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable listing
    Text,
    /// JSON document
    Json,
}

/// Command to list an archive.
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Archive to inspect
    archive: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Serialize)]
struct Inspection<'a> {
    prefix: Option<&'a str>,
    extensions: Vec<(&'a str, &'a str)>,
    entries: &'a [ArchiveEntry],
    stored_hash: Option<String>,
    computed_hash: String,
    checksum_ok: bool,
}

impl InspectCommand {
    /// Reads the archive and prints its listing.
    pub fn execute(self) -> Result<()> {
        let archive = Archive::read(&self.archive)?;
        let verified = archive.verify_checksum();

        let inspection = Inspection {
            prefix: archive.prefix(),
            extensions: archive
                .extensions()
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            entries: archive.entries(),
            stored_hash: archive.stored_hash().map(hex::encode),
            computed_hash: hex::encode(archive.computed_hash()),
            checksum_ok: verified.is_ok(),
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&inspection)?),
            OutputFormat::Text => print_text(&inspection),
        }

        verified.map_err(Into::into)
    }
}

fn print_text(inspection: &Inspection<'_>) {
    for (key, value) in &inspection.extensions {
        println!("{} = {}", key.cyan(), value);
    }
    println!();

    let mut total = 0u64;
    for entry in inspection.entries {
        total += u64::from(entry.data_size);
        println!("{:>10}  {}", entry.data_size, entry.name);
    }
    println!("{:>10}  {} entries", total, inspection.entries.len());
    println!();

    match (&inspection.stored_hash, inspection.checksum_ok) {
        (Some(hash), true) => println!("sha1 {} {}", hash, "ok".green()),
        (Some(hash), false) => println!(
            "sha1 {} {} (content hashes to {})",
            hash,
            "MISMATCH".red().bold(),
            inspection.computed_hash
        ),
        (None, _) => println!("sha1 {}", "missing".red()),
    }
}
