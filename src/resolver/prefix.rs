//! Prefix marker parsing.
//!
//! Two marker forms are recognised in an addon's root directory:
//! - `$PBOPREFIX$`: the first line that is not a `key=value` pair is the prefix
//! - `$PBOPREFIX$.txt`: a `prefix=<value>` line (key compared ignoring case)
//!
//! The bare form wins when both exist and it yields a prefix.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::constants::{PREFIX_MARKER, PREFIX_MARKER_TXT};
use crate::utils::fs::read_text_lossy;
use crate::utils::platform::{normalize_logical, to_archive_name};

/// An addon root directory and the logical prefix it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonPrefix {
    /// Directory holding the marker file
    pub root: PathBuf,
    /// Normalized prefix, backslash separated, no leading or trailing separator
    pub prefix: String,
}

impl AddonPrefix {
    /// Logical path of a file given relative to [`AddonPrefix::root`].
    #[must_use]
    pub fn logical_path(&self, relative: &Path) -> String {
        let relative = to_archive_name(relative);
        if relative.is_empty() {
            self.prefix.clone()
        } else if self.prefix.is_empty() {
            relative
        } else {
            format!("{}\\{}", self.prefix, relative)
        }
    }
}

/// Reads the prefix declared by a marker file directly inside `dir`.
///
/// Unreadable markers are logged and treated as absent.
#[must_use]
pub fn read_prefix_marker(dir: &Path) -> Option<String> {
    let bare = dir.join(PREFIX_MARKER);
    if bare.is_file()
        && let Some(prefix) = read_marker(&bare, parse_bare_marker)
    {
        return Some(prefix);
    }

    let keyed = dir.join(PREFIX_MARKER_TXT);
    if keyed.is_file() {
        return read_marker(&keyed, parse_keyed_marker);
    }

    None
}

fn read_marker(path: &Path, parse: fn(&str) -> Option<String>) -> Option<String> {
    match read_text_lossy(path) {
        Ok(content) => parse(content.trim_start_matches('\u{feff}')),
        Err(e) => {
            warn!(target: "resolver", "ignoring unreadable prefix marker {}: {:#}", path.display(), e);
            None
        }
    }
}

/// First non-blank line without `=`.
fn parse_bare_marker(content: &str) -> Option<String> {
    content
        .lines()
        .filter(|line| !line.contains('='))
        .map(normalize_logical)
        .find(|prefix| !prefix.is_empty())
}

/// Value of the first `prefix=` line.
fn parse_keyed_marker(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("prefix")
            .then(|| normalize_logical(value))
            .filter(|prefix| !prefix.is_empty())
    })
}
