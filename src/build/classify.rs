//! File classification for the binarize and archive passes.

use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_BINARY_NAME, CONFIG_EXTENSIONS, CONFIG_SOURCE_NAME, EXCLUDED_EXTENSIONS, MODEL_EXTENSION,
    NO_BINARIZE_MARKERS, PREFIX_MARKER, PREFIX_MARKER_TXT, TERRAIN_EXTENSION,
};
use crate::pattern::PatternSet;

/// What the binarize pass does with a workspace file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// Not binarized and not archived
    Skip,
    /// Text config compiled to `target`, relative to the workspace
    Config {
        /// Output path, the source itself unless the file is `config.cpp`
        target: PathBuf,
    },
    /// Editable model, binarized in place
    Model,
    /// Terrain, binarized in place
    Terrain,
    /// Archived as is
    Other,
}

impl FileKind {
    /// Whether an external binarizer may be asked to handle this file.
    pub fn needs_model_binarizer(&self) -> bool {
        matches!(self, Self::Model | Self::Terrain)
    }
}

/// Decides how the file at workspace-relative path `relative` is binarized.
///
/// `config.cpp` is the one file that is compiled without being archived: its
/// `config.bin` takes its place.
pub fn classify(relative: &Path, excludes: &PatternSet) -> FileKind {
    let Some(name) = relative.file_name().map(|n| n.to_string_lossy()) else {
        return FileKind::Skip;
    };

    if name.eq_ignore_ascii_case(CONFIG_SOURCE_NAME) {
        if excludes.matches_any(relative) {
            return FileKind::Skip;
        }
        return FileKind::Config {
            target: relative.with_file_name(CONFIG_BINARY_NAME),
        };
    }
    if !is_included(relative, excludes) {
        return FileKind::Skip;
    }

    let extension = extension_of(relative);
    if CONFIG_EXTENSIONS.contains(&extension.as_str()) {
        FileKind::Config {
            target: relative.to_path_buf(),
        }
    } else if extension == MODEL_EXTENSION {
        FileKind::Model
    } else if extension == TERRAIN_EXTENSION {
        FileKind::Terrain
    } else {
        FileKind::Other
    }
}

/// Whether a workspace file ends up in the archive.
///
/// Prefix markers, `config.cpp`, auxiliary extensions and anything matching
/// `excludes` are left out.
pub fn is_included(relative: &Path, excludes: &PatternSet) -> bool {
    let Some(name) = relative.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };

    let is_marker = [PREFIX_MARKER, PREFIX_MARKER_TXT]
        .iter()
        .any(|marker| name.eq_ignore_ascii_case(marker));
    if is_marker || name.eq_ignore_ascii_case(CONFIG_SOURCE_NAME) {
        return false;
    }

    let extension = extension_of(relative);
    if EXCLUDED_EXTENSIONS.contains(&extension.as_str()) {
        return false;
    }

    !excludes.matches_any(relative)
}

/// Whether `source_root` holds a marker that disables binarization.
pub fn has_no_binarize_marker(source_root: &Path) -> bool {
    NO_BINARIZE_MARKERS
        .iter()
        .any(|marker| source_root.join(marker).is_file())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}
