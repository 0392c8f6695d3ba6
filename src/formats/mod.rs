//! Dependency discovery in asset files.
//!
//! Before an external binarizer runs, the files a model or terrain needs are
//! copied next to it. This module only extracts the *names* of those files:
//!
//! - [`mlod`]: face textures and materials of editable (MLOD) models
//! - [`wrp`]: materials and object models of 8WVR terrains
//! - [`references`]: quoted asset paths in materials and text configs
//!
//! Names are returned in first-seen order with case-insensitive duplicates
//! removed. Procedural textures (`#(argb,...)`) are never returned.

pub mod cursor;
pub mod mlod;
pub mod references;
pub mod wrp;

use anyhow::Result;
use std::path::Path;

use crate::constants::{CONFIG_EXTENSIONS, MODEL_EXTENSION, TERRAIN_EXTENSION};

/// Collects asset names, dropping empty, procedural and duplicate ones.
#[derive(Debug, Default, Clone)]
pub struct DependencyList {
    names: Vec<String>,
}

impl DependencyList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` unless it is empty, procedural or already present.
    pub fn add(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || name.starts_with('#') {
            return;
        }
        if !self.names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            self.names.push(name.to_string());
        }
    }

    /// Names in first-seen order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Consumes the list.
    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// Dependencies of `path`, chosen by extension.
///
/// Files of other types have none.
pub fn discover(path: &Path) -> Result<Vec<String>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if extension == MODEL_EXTENSION {
        let data = read(path)?;
        mlod::dependencies(&data)
    } else if extension == TERRAIN_EXTENSION {
        let data = read(path)?;
        wrp::dependencies(&data)
    } else if CONFIG_EXTENSIONS.contains(&extension.as_str()) {
        let text = crate::utils::fs::read_text_lossy(path)?;
        Ok(references::scan(&text))
    } else {
        Ok(Vec::new())
    }
}

/// Whether a model or terrain is still in its editable form.
///
/// Already binarized files (`ODOL` models, `OPRW` terrains) are packed as
/// they are. Other file types always count as editable.
pub fn is_editable(path: &Path) -> Result<bool> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let magic: &[u8] = if extension == MODEL_EXTENSION {
        b"MLOD"
    } else if extension == TERRAIN_EXTENSION {
        b"8WVR"
    } else {
        return Ok(true);
    };
    Ok(read(path)?.starts_with(magic))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    use anyhow::Context;
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
