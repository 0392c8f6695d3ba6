//! Extracting archives into directories.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Archive;
use crate::constants::PREFIX_MARKER;
use crate::core::AddonError;
use crate::pattern::PatternSet;
use crate::utils::fs::{ensure_dir, ensure_parent_dir};
use crate::utils::platform::logical_to_relative;

/// Options for [`unpack`].
#[derive(Debug, Clone, Default)]
pub struct UnpackOptions {
    /// Write into a non-empty target directory
    pub force: bool,
    /// When non-empty, only entries matching one of these are extracted
    pub include: PatternSet,
    /// Entries matching one of these are skipped
    pub exclude: PatternSet,
}

/// Extracts `archive_path` into `target_dir`.
///
/// Entry names are converted to host paths; `..` components are dropped so
/// nothing lands outside `target_dir`. The prefix is written to a
/// `$PBOPREFIX$` file unless the archive carries one itself.
///
/// Returns the names of the extracted entries.
pub fn unpack(archive_path: &Path, target_dir: &Path, options: &UnpackOptions) -> Result<Vec<String>> {
    let archive = Archive::read(archive_path)?;

    let occupied = target_dir.is_dir()
        && fs::read_dir(target_dir)
            .with_context(|| format!("Failed to read directory: {}", target_dir.display()))?
            .next()
            .is_some();
    if occupied && !options.force {
        return Err(AddonError::TargetExists {
            path: target_dir.display().to_string(),
        }
        .into());
    }
    ensure_dir(target_dir)?;

    let mut written = Vec::new();
    for entry in archive.entries() {
        let relative = logical_to_relative(&entry.name);
        if !selected(&relative, options) {
            debug!(target: "archive", "skipping {}", entry.name);
            continue;
        }

        let destination: PathBuf = target_dir.join(&relative);
        ensure_parent_dir(&destination)?;
        fs::write(&destination, archive.payload(entry))
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        written.push(entry.name.clone());
    }

    if let Some(prefix) = archive.prefix()
        && archive.entry(PREFIX_MARKER).is_none()
    {
        let marker = target_dir.join(PREFIX_MARKER);
        fs::write(&marker, format!("{prefix}\n"))
            .with_context(|| format!("Failed to write {}", marker.display()))?;
    }

    info!(
        target: "archive",
        "unpacked {} of {} entries into {}",
        written.len(),
        archive.entries().len(),
        target_dir.display()
    );
    Ok(written)
}

fn selected(relative: &Path, options: &UnpackOptions) -> bool {
    (options.include.is_empty() || options.include.matches_any(relative))
        && !options.exclude.matches_any(relative)
}
