//! File system helpers used by the build pipeline and the resolver.
//!
//! All directory walks go through [`sorted_walk`], which orders the entries of
//! every directory case-insensitively and visits a directory's children right
//! after the directory itself. Anything that depends on a reproducible order
//! (archive passes, include root indexes) uses it.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::constants::{PREFIX_MARKER, PREFIX_MARKER_TXT};

/// Creates a directory and all its parents if they don't exist.
///
/// # Arguments
///
/// * `path` - The directory to create
///
/// # Examples
///
/// ```rust,no_run
/// use addonpack::utils::fs::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("build/tmp/x"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!(
            "Path exists but is not a directory: {}",
            path.display()
        ));
    }
    Ok(())
}

/// Creates the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Case-insensitive ordering of two walk entries by file name.
///
/// Ties between names that only differ in case are broken by the raw name so
/// the order stays total.
pub(crate) fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_name = a.file_name().to_string_lossy();
    let b_name = b.file_name().to_string_lossy();
    a_name
        .to_ascii_lowercase()
        .cmp(&b_name.to_ascii_lowercase())
        .then_with(|| a_name.cmp(&b_name))
}

/// Lists every regular file under `root` in deterministic order.
///
/// Directory entries are sorted case-insensitively and descended into in
/// place, depth first. Symlinks are followed. When `skip_nested_addons` is set,
/// subdirectories (never `root` itself) that carry their own prefix marker are
/// skipped together with their contents.
///
/// # Returns
///
/// Absolute or root-joined paths of the files, in walk order.
pub fn sorted_walk(root: &Path, skip_nested_addons: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by(compare_entries)
        .into_iter()
        .filter_entry(|entry| {
            !(skip_nested_addons
                && entry.depth() > 0
                && entry.file_type().is_dir()
                && has_prefix_marker(entry.path()))
        });

    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to walk directory: {}", root.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Whether `dir` contains either form of prefix marker.
#[must_use]
pub fn has_prefix_marker(dir: &Path) -> bool {
    dir.join(PREFIX_MARKER).is_file() || dir.join(PREFIX_MARKER_TXT).is_file()
}

/// Recursively copies a directory tree, creating `dst` as needed.
///
/// Existing files in the destination are overwritten. Symlinks are followed,
/// so the copy holds real files.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;

    for entry in WalkDir::new(src).follow_links(true).sort_by(compare_entries) {
        let entry = entry.with_context(|| format!("Failed to walk directory: {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("Walk escaped {}", src.display()))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &target)?;
        }
    }

    Ok(())
}

/// Copies one file, creating the destination's parent directories.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent_dir(dst)?;
    fs::copy(src, dst).with_context(|| {
        format!(
            "Failed to copy file from {} to {}",
            src.display(),
            dst.display()
        )
    })?;
    Ok(())
}

/// Recursively removes a directory. Missing directories are not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Removes a file. Missing files are not an error.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove file: {}", path.display())),
    }
}

/// Resolves `.` and `..` components without touching the filesystem.
///
/// ```rust
/// use addonpack::utils::fs::normalize_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
/// ```
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Makes `path` absolute against the current directory and normalizes it.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to determine the current directory")?
            .join(path)
    };
    Ok(normalize_path(&joined))
}

/// Reads a file into a string, replacing invalid UTF-8 sequences.
///
/// Addon sources are frequently saved in legacy code pages, so decoding is
/// lossy rather than failing.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        ensure_parent_dir(path).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_sorted_walk_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("b.txt"));
        touch(&root.join("A.txt"));
        touch(&root.join("c/inner.txt"));
        touch(&root.join("C.txt"));

        let names: Vec<String> = sorted_walk(root, false)
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(names, vec!["A.txt", "b.txt", "c/inner.txt", "C.txt"]);
    }

    #[test]
    fn test_sorted_walk_skips_nested_addons() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join(PREFIX_MARKER));
        touch(&root.join("main.sqf"));
        touch(&root.join("other/$PBOPREFIX$"));
        touch(&root.join("other/script.sqf"));

        let all = sorted_walk(root, false).unwrap();
        assert_eq!(all.len(), 4);

        let own = sorted_walk(root, true).unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|p| !p.starts_with(root.join("other"))));
    }

    #[test]
    fn test_copy_dir_recursive() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        touch(&src.join("a/b/c.txt"));
        touch(&src.join("top.txt"));

        let dst = temp.path().join("dst");
        copy_dir(&src, &dst).unwrap();

        assert!(dst.join("a/b/c.txt").is_file());
        assert!(dst.join("top.txt").is_file());
    }

    #[test]
    fn test_remove_helpers_tolerate_missing() {
        let temp = TempDir::new().unwrap();
        remove_dir_all(&temp.path().join("missing")).unwrap();
        remove_file_if_exists(&temp.path().join("missing.txt")).unwrap();
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("a/./b/../c")),
            PathBuf::from("a/c")
        );
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_read_text_lossy() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("latin1.cpp");
        fs::write(&path, [b'a', 0xE9, b'b']).unwrap();
        let text = read_text_lossy(&path).unwrap();
        assert!(text.starts_with('a'));
        assert!(text.ends_with('b'));
    }
}
