//! The build pipeline: source directory in, archive out.
//!
//! # Stages
//!
//! 1. **Prepare**: refuse to overwrite an existing target without `force`,
//!    check the signing key, and determine the addon prefix.
//! 2. **Workspace**: copy the source tree into a [`TempWorkspace`].
//! 3. **Binarize**: walk the workspace once, classify every file and hand it
//!    to the config compiler or the model binarizer. Skipped entirely for
//!    pack-only builds and addons carrying a `$NOBIN$` marker.
//! 4. **Archive**: walk the workspace again and pack every included file.
//! 5. **Sign**: write a detached signature when a key was given.
//! 6. **Cleanup**: remove the workspace unless asked to keep it.
//!
//! A failing stage aborts the build. Its error is wrapped in
//! [`AddonError::BuildStage`], naming the stage and the target. If the archive
//! stage fails, the partial archive is deleted. The workspace is removed on
//! every exit path unless `keep_temp` is set.
//!
//! # Example
//!
//! ```rust,no_run
//! use addonpack::build::{BuildOptions, Toolchain, build};
//! use std::path::PathBuf;
//!
//! # fn example() -> anyhow::Result<()> {
//! let options = BuildOptions {
//!     source: PathBuf::from("addons/main"),
//!     target: PathBuf::from("release/main.pbo"),
//!     force: true,
//!     ..BuildOptions::default()
//! };
//! let report = build(&options, &Toolchain::default())?;
//! println!("{} entries under {}", report.entries.len(), report.prefix);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod dispatch;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::PREFIX_MARKER;
use crate::core::{AddonError, BuildStage};
use crate::pattern::PatternSet;
use crate::pbo::{ArchiveFile, write_archive};
use crate::resolver::Resolver;
use crate::sign::{sign_archive, validate_key};
use crate::tools::roles;
use crate::utils::fs::{absolute_path, has_prefix_marker, remove_file_if_exists, sorted_walk};
use crate::utils::platform::{normalize_logical, to_archive_name};
use crate::utils::progress::ProgressBar;
use crate::workspace::TempWorkspace;

pub use classify::{FileKind, classify, has_no_binarize_marker, is_included};
pub use dispatch::{Dispatcher, FALLBACK_BINARIZER, MISSING_DEPENDENCY, Toolchain};

/// Everything a build needs besides the toolchain.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Addon source directory
    pub source: PathBuf,
    /// Archive to write
    pub target: PathBuf,
    /// Overwrite an existing target
    pub force: bool,
    /// Pack files as they are, without binarizing anything
    pub pack_only: bool,
    /// Extra include roots, searched after the workspace
    pub include_roots: Vec<PathBuf>,
    /// Glob patterns of files left out of the archive
    pub exclude: Vec<String>,
    /// Private key to sign the archive with
    pub key: Option<PathBuf>,
    /// Base directory for the workspace
    pub temp_path: Option<PathBuf>,
    /// Leave the workspace behind for inspection
    pub keep_temp: bool,
    /// Warning names that are not reported
    pub muted_warnings: Vec<String>,
}

/// A non-fatal problem found during a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildWarning {
    /// Warning name, usable with `-w`
    pub name: &'static str,
    /// What happened
    pub message: String,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Prefix written into the archive header
    pub prefix: String,
    /// Entry names, in archive order
    pub entries: Vec<String>,
    /// SHA-1 stored in the trailer, hex encoded
    pub checksum: String,
    /// Warnings raised while binarizing
    pub warnings: Vec<BuildWarning>,
    /// Detached signature, when the archive was signed
    pub signature: Option<PathBuf>,
    /// Workspace left behind because `keep_temp` was set
    pub kept_workspace: Option<PathBuf>,
}

/// Builds the addon in `options.source` into `options.target`.
pub fn build(options: &BuildOptions, tools: &Toolchain) -> Result<BuildReport> {
    let target_name = options.target.display().to_string();
    let stage = |stage: BuildStage| AddonError::BuildStage {
        stage,
        target: target_name.clone(),
    };

    let (source, excludes, prefix) = prepare(options, tools).with_context(|| stage(BuildStage::Prepare))?;
    info!(target: "build", "building {} ({prefix}) -> {}", source.display(), options.target.display());

    let mut workspace = open_workspace(options, &source, &prefix).with_context(|| stage(BuildStage::Workspace))?;
    workspace.set_keep(options.keep_temp);

    let mut roots = vec![workspace.path().to_path_buf()];
    roots.extend(options.include_roots.iter().cloned());
    let resolver = Resolver::new(roots);

    let mut dispatcher = Dispatcher::new(tools, &resolver, &options.muted_warnings);
    if options.pack_only || has_no_binarize_marker(&source) {
        info!(target: "build", "binarization disabled, packing sources as they are");
    } else {
        binarize_all(&workspace, &excludes, &mut dispatcher).with_context(|| stage(BuildStage::Binarize))?;
    }
    let warnings = dispatcher.into_warnings();

    let (entries, checksum) = match pack(&workspace, &prefix, &excludes, &options.target) {
        Ok(packed) => packed,
        Err(e) => {
            if let Err(remove_error) = remove_file_if_exists(&options.target) {
                debug!(target: "build", "{remove_error:#}");
            }
            return Err(e.context(stage(BuildStage::Archive)));
        }
    };

    let signature = match (&options.key, tools.signer.as_deref()) {
        (Some(key), Some(signer)) => {
            Some(sign_archive(signer, &options.target, key).with_context(|| stage(BuildStage::Sign))?)
        }
        _ => None,
    };

    let kept_workspace = workspace.is_kept().then(|| workspace.path().to_path_buf());
    workspace.cleanup().with_context(|| stage(BuildStage::Cleanup))?;

    info!(target: "build", "built {} with {} entries", options.target.display(), entries.len());
    Ok(BuildReport {
        prefix,
        entries,
        checksum,
        warnings,
        signature,
        kept_workspace,
    })
}

/// Validates options and determines the prefix.
fn prepare(options: &BuildOptions, tools: &Toolchain) -> Result<(PathBuf, PatternSet, String)> {
    let source = absolute_path(&options.source)?;
    if !source.is_dir() {
        return Err(AddonError::FileNotFound {
            path: options.source.display().to_string(),
        }
        .into());
    }
    if options.target.exists() && !options.force {
        return Err(AddonError::TargetExists {
            path: options.target.display().to_string(),
        }
        .into());
    }
    if let Some(key) = &options.key {
        validate_key(key)?;
        if tools.signer.is_none() {
            return Err(AddonError::ExternalToolMissing {
                tool: roles::SIGNER.to_string(),
                program: "(not configured)".to_string(),
            }
            .into());
        }
    }

    let excludes = PatternSet::new(&options.exclude)?;
    let prefix = addon_prefix(&source);
    Ok((source, excludes, prefix))
}

/// Prefix declared by the source or one of its ancestors, else the name of
/// the source directory.
pub fn addon_prefix(source: &Path) -> String {
    Resolver::default().resolve_prefix(source).unwrap_or_else(|| {
        let fallback = source
            .file_name()
            .map(|name| normalize_logical(&name.to_string_lossy()))
            .unwrap_or_default();
        debug!(target: "build", "no prefix marker above {}, using '{fallback}'", source.display());
        fallback
    })
}

fn open_workspace(options: &BuildOptions, source: &Path, prefix: &str) -> Result<TempWorkspace> {
    let workspace = TempWorkspace::populate(options.temp_path.as_deref(), prefix, source)?;
    // Files in the workspace need a marker to get logical paths.
    if !has_prefix_marker(workspace.path()) {
        let marker = workspace.path().join(PREFIX_MARKER);
        std::fs::write(&marker, format!("{prefix}\n"))
            .with_context(|| format!("Failed to write {}", marker.display()))?;
    }
    Ok(workspace)
}

fn binarize_all(workspace: &TempWorkspace, excludes: &PatternSet, dispatcher: &mut Dispatcher<'_>) -> Result<()> {
    let files: Vec<(PathBuf, FileKind)> = sorted_walk(workspace.path(), true)?
        .into_iter()
        .filter_map(|file| {
            let relative = file.strip_prefix(workspace.path()).ok()?.to_path_buf();
            let kind = classify(&relative, excludes);
            (kind != FileKind::Skip && kind != FileKind::Other).then_some((relative, kind))
        })
        .collect();

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_prefix("Binarizing");
    for (relative, kind) in &files {
        progress.set_message(relative.display().to_string());
        dispatcher.binarize_in_workspace(workspace, relative, kind)?;
        progress.inc(1);
    }
    progress.finish_and_clear();
    Ok(())
}

/// Writes the archive, returning the entry names and the hex checksum.
fn pack(workspace: &TempWorkspace, prefix: &str, excludes: &PatternSet, target: &Path) -> Result<(Vec<String>, String)> {
    let files: Vec<ArchiveFile> = sorted_walk(workspace.path(), true)?
        .into_iter()
        .filter_map(|file| {
            let relative = file.strip_prefix(workspace.path()).ok()?;
            is_included(relative, excludes).then(|| ArchiveFile {
                name: to_archive_name(relative),
                source: file.clone(),
            })
        })
        .collect();

    let hash = write_archive(target, prefix, &files)?;
    Ok((files.into_iter().map(|f| f.name).collect(), hex::encode(hash)))
}
