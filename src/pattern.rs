//! Glob patterns for selecting archive contents.
//!
//! Patterns are standard globs (`*`, `**`, `?`, `[a-z]`) matched without case
//! sensitivity against both the workspace-relative path of a file and its bare
//! file name, so `*.bak` drops backups anywhere while `data/raw/*` only drops
//! one directory. Backslashes in patterns are treated as path separators.
//!
//! ```rust,no_run
//! use addonpack::pattern::PatternSet;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let excludes = PatternSet::new(["*.bak", "data\\raw\\*"])?;
//! assert!(excludes.matches_any(Path::new("ui/old/Dialog.BAK")));
//! assert!(excludes.matches_any(Path::new("data/raw/height.asc")));
//! assert!(!excludes.matches_any(Path::new("data/height.asc")));
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::trace;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A single compiled glob.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Pattern,
    original_pattern: String,
}

impl PatternMatcher {
    /// Compiles `pattern_str`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not valid glob syntax.
    pub fn new(pattern_str: &str) -> Result<Self> {
        let normalized = pattern_str.trim().replace('\\', "/");
        let pattern = Pattern::new(&normalized)
            .with_context(|| format!("Invalid glob pattern: {pattern_str}"))?;

        Ok(Self {
            pattern,
            original_pattern: pattern_str.to_string(),
        })
    }

    /// Whether `path`, or its file name alone, matches.
    pub fn matches(&self, path: &Path) -> bool {
        let full = path.to_string_lossy().replace('\\', "/");
        if self.pattern.matches_with(&full, MATCH_OPTIONS) {
            return true;
        }
        path.file_name()
            .is_some_and(|name| self.pattern.matches_with(&name.to_string_lossy(), MATCH_OPTIONS))
    }

    /// The pattern as it was given.
    pub fn pattern(&self) -> &str {
        &self.original_pattern
    }
}

/// A list of globs; a path is selected when any of them matches.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    matchers: Vec<PatternMatcher>,
}

impl PatternSet {
    /// Compiles every pattern, skipping blank ones.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid pattern.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| PatternMatcher::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { matchers })
    }

    /// Whether any pattern matches `relative`.
    pub fn matches_any(&self, relative: &Path) -> bool {
        let hit = self.matchers.iter().find(|m| m.matches(relative));
        if let Some(matcher) = hit {
            trace!("{} matched '{}'", relative.display(), matcher.pattern());
        }
        hit.is_some()
    }

    /// Number of patterns.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether there are no patterns.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_pattern_matches_file_name_anywhere() {
        let matcher = PatternMatcher::new("*.bak").unwrap();
        assert!(matcher.matches(Path::new("config.bak")));
        assert!(matcher.matches(Path::new("deep/nested/config.bak")));
        assert!(!matcher.matches(Path::new("config.cpp")));
    }

    #[test]
    fn test_pattern_case_insensitive() {
        let matcher = PatternMatcher::new("*.psd").unwrap();
        assert!(matcher.matches(Path::new("data/Source.PSD")));
    }

    #[test]
    fn test_directory_patterns_with_either_separator() {
        let excludes = PatternSet::new(["data\\raw\\*", "docs/**"]).unwrap();
        let raw: PathBuf = ["data", "raw", "a.asc"].iter().collect();
        assert!(excludes.matches_any(&raw));
        assert!(excludes.matches_any(Path::new("docs/guide/intro.md")));
        assert!(!excludes.matches_any(Path::new("data/a.asc")));
    }

    #[test]
    fn test_blank_patterns_ignored() {
        let excludes = PatternSet::new(["", "  ", "*.txt"]).unwrap();
        assert_eq!(excludes.len(), 1);
        assert!(!PatternSet::default().matches_any(Path::new("a.txt")));
        assert!(PatternSet::default().is_empty());
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let err = PatternSet::new(["[unclosed"]).unwrap_err();
        assert!(err.to_string().contains("[unclosed"));
    }
}
