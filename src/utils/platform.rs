//! Path string conversions between the host, logical paths and archive names.
//!
//! Logical paths and archive entry names always use a backslash separator,
//! whatever the host platform. Host paths use the native separator.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Separator used by logical paths and archive entry names.
pub const LOGICAL_SEPARATOR: char = '\\';

/// Converts a relative host path into an archive entry name.
///
/// ```rust
/// use addonpack::utils::platform::to_archive_name;
/// use std::path::Path;
///
/// assert_eq!(to_archive_name(Path::new("data/tex_co.paa")), "data\\tex_co.paa");
/// ```
#[must_use]
pub fn to_archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("\\")
}

/// Normalizes a logical path or prefix: forward slashes become backslashes
/// and leading and trailing separators and whitespace are dropped.
///
/// ```rust
/// use addonpack::utils::platform::normalize_logical;
///
/// assert_eq!(normalize_logical(" /x/cba/addons/main\\ "), "x\\cba\\addons\\main");
/// ```
#[must_use]
pub fn normalize_logical(path: &str) -> String {
    path.trim()
        .replace('/', "\\")
        .trim_matches(LOGICAL_SEPARATOR)
        .to_string()
}

/// Converts a logical path into a relative host path.
#[must_use]
pub fn logical_to_relative(logical: &str) -> PathBuf {
    normalize_logical(logical)
        .split(LOGICAL_SEPARATOR)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect()
}

/// Compares two logical paths, ignoring a leading separator and optionally case.
#[must_use]
pub fn logical_eq(a: &str, b: &str, case_insensitive: bool) -> bool {
    let a = normalize_logical(a);
    let b = normalize_logical(b);
    if case_insensitive {
        a.eq_ignore_ascii_case(&b)
    } else {
        a == b
    }
}

/// Expands `~` and environment variables in a configured path.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
