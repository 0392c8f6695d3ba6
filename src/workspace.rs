//! Scratch directories for builds.
//!
//! A [`TempWorkspace`] owns `<temp>/addonpack/<pid>/<addon>` where `<addon>` is
//! the addon prefix with separators replaced by `_`. The whole source tree is
//! copied there before binarization so the source is never touched.
//! Per-file sub-workspaces for external binarizers live next to it under the
//! same process directory.
//!
//! The workspace is removed when dropped unless it was marked to be kept.
//! Removal is refused for any path outside the process directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::TEMP_DIR_NAME;
use crate::core::AddonError;
use crate::utils::fs::{copy_dir, ensure_dir, normalize_path, remove_dir_all};

/// Directory name of the per-file binarizer workspace.
pub(crate) const BINARIZE_DIR_NAME: &str = "_binarize";

/// Checks a user-supplied temp base.
///
/// Empty paths and filesystem roots are rejected, since the workspace is
/// deleted recursively afterwards.
pub fn validate_temp_base(path: &Path) -> Result<PathBuf, AddonError> {
    let invalid = |reason: &str| AddonError::ConfigError {
        message: format!("invalid temp path '{}': {reason}", path.display()),
    };

    if path.as_os_str().is_empty() {
        return Err(invalid("path is empty"));
    }
    let normalized = normalize_path(path);
    if normalized.parent().is_none() {
        return Err(invalid("refusing to use a filesystem root"));
    }
    Ok(normalized)
}

/// A build's scratch directory, removed on drop unless kept.
#[derive(Debug)]
pub struct TempWorkspace {
    process_root: PathBuf,
    path: PathBuf,
    keep: bool,
}

impl TempWorkspace {
    /// Creates an empty workspace for the addon with `prefix`.
    ///
    /// `temp_base` defaults to the system temp directory. Leftovers from an
    /// earlier build of the same addon by the same process id are removed.
    pub fn create(temp_base: Option<&Path>, prefix: &str) -> Result<Self> {
        let base = match temp_base {
            Some(base) => validate_temp_base(base)?,
            None => std::env::temp_dir(),
        };
        let process_root = base.join(TEMP_DIR_NAME).join(std::process::id().to_string());
        let path = process_root.join(workspace_name(prefix));

        if path.exists() {
            remove_dir_all(&path)?;
        }
        ensure_dir(&path)?;
        debug!(target: "build", "workspace {}", path.display());

        Ok(Self {
            process_root,
            path,
            keep: false,
        })
    }

    /// Creates the workspace and copies `source` into it.
    pub fn populate(temp_base: Option<&Path>, prefix: &str, source: &Path) -> Result<Self> {
        let workspace = Self::create(temp_base, prefix)?;
        copy_dir(source, &workspace.path).with_context(|| {
            format!(
                "Failed to copy {} into workspace {}",
                source.display(),
                workspace.path.display()
            )
        })?;
        Ok(workspace)
    }

    /// Workspace directory holding the copied addon.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-process directory under the temp base.
    #[must_use]
    pub fn process_root(&self) -> &Path {
        &self.process_root
    }

    /// Keeps the directory on drop.
    pub fn set_keep(&mut self, keep: bool) {
        self.keep = keep;
    }

    /// Whether the directory survives the drop.
    #[must_use]
    pub fn is_kept(&self) -> bool {
        self.keep
    }

    /// Returns a fresh, empty directory for one external binarizer run.
    ///
    /// The same directory is reused for every call, cleared each time.
    pub fn sub_workspace(&self) -> Result<PathBuf> {
        let sub = self.process_root.join(BINARIZE_DIR_NAME);
        if sub.exists() {
            self.remove(&sub)?;
        }
        ensure_dir(&sub)?;
        Ok(sub)
    }

    /// Recursively removes `path`, which must lie inside the process directory.
    pub fn remove(&self, path: &Path) -> Result<()> {
        let normalized = normalize_path(path);
        if normalized == self.process_root || !normalized.starts_with(&self.process_root) {
            return Err(AddonError::OutsideTempRoot {
                path: path.display().to_string(),
                root: self.process_root.display().to_string(),
            }
            .into());
        }
        remove_dir_all(&normalized)
    }

    /// Removes the workspace now, unless kept.
    pub fn cleanup(mut self) -> Result<()> {
        let result = self.remove_all();
        // Nothing left for drop to do.
        self.keep = true;
        result
    }

    fn remove_all(&self) -> Result<()> {
        if self.keep {
            debug!(target: "build", "keeping workspace {}", self.path.display());
            return Ok(());
        }
        remove_dir_all(&self.process_root).with_context(|| {
            format!("Failed to remove workspace {}", self.process_root.display())
        })
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if let Err(e) = self.remove_all() {
            warn!(target: "build", "{e:#}");
        }
    }
}

/// Directory name for an addon prefix.
fn workspace_name(prefix: &str) -> String {
    let name: String = prefix
        .trim_matches(['\\', '/'])
        .chars()
        .map(|c| if c == '\\' || c == '/' { '_' } else { c })
        .collect();
    if name.is_empty() {
        "addon".to_string()
    } else {
        name
    }
}
