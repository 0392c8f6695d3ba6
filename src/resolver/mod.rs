//! Logical path resolution for addon sources.
//!
//! Addons address each other's files through *logical paths*: a leading
//! backslash followed by an addon prefix and the path inside that addon, e.g.
//! `\x\cba\addons\main\script_macros.hpp`. The prefix of an addon is declared by
//! a marker file (`$PBOPREFIX$` or `$PBOPREFIX$.txt`) in the addon's root
//! directory, see [`prefix`].
//!
//! [`Resolver`] maps references to real files:
//! - a **relative** reference (no leading separator) is joined onto the
//!   requesting file's directory, without checking that the result exists
//! - a **logical** reference is searched for in every include root, in order;
//!   a file matches when its name equals the reference's last component and
//!   its prefix-derived logical path equals the reference
//! - as a last resort, `root + logical path` is tried directly
//!
//! Prefix lookups and include root listings are cached for the lifetime of
//! the resolver, which is one build or one compile.
//!
//! # Examples
//!
//! ```rust,no_run
//! use addonpack::resolver::{LookupOptions, Resolver};
//! use std::path::{Path, PathBuf};
//!
//! # fn example() -> Result<(), addonpack::core::AddonError> {
//! let resolver = Resolver::new(vec![PathBuf::from("addons")]);
//! let header = resolver.find_file(
//!     "\\x\\cba\\addons\\main\\script_macros.hpp",
//!     Path::new("addons/main/config.cpp"),
//!     LookupOptions::include(),
//! )?;
//! println!("{}", header.display());
//! # Ok(())
//! # }
//! ```

pub mod prefix;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::constants::{SUBSTITUTABLE_IMAGE_EXTENSIONS, TEXTURE_EXTENSION};
use crate::core::AddonError;
use crate::utils::fs::compare_entries;
use crate::utils::platform::{LOGICAL_SEPARATOR, logical_eq, logical_to_relative, normalize_logical};

pub use prefix::{AddonPrefix, read_prefix_marker};

/// Matching options for [`Resolver::find_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    /// Compare names and logical paths ignoring ASCII case
    pub case_insensitive: bool,
    /// Let a compressed texture satisfy a request for an uncompressed image
    pub texture_substitution: bool,
}

impl LookupOptions {
    /// Options used for `#include`: case-insensitive, no substitution.
    #[must_use]
    pub const fn include() -> Self {
        Self {
            case_insensitive: true,
            texture_substitution: false,
        }
    }

    /// Options used for asset dependencies: case-insensitive with substitution.
    #[must_use]
    pub const fn asset() -> Self {
        Self {
            case_insensitive: true,
            texture_substitution: true,
        }
    }
}

/// Resolves relative and logical references against include roots.
#[derive(Debug, Default)]
pub struct Resolver {
    include_roots: Vec<PathBuf>,
    prefix_cache: RefCell<HashMap<PathBuf, Option<Rc<AddonPrefix>>>>,
    root_index: RefCell<HashMap<PathBuf, Rc<Vec<PathBuf>>>>,
}

impl Resolver {
    /// Creates a resolver searching `include_roots` in the given order.
    #[must_use]
    pub fn new(include_roots: Vec<PathBuf>) -> Self {
        Self {
            include_roots,
            prefix_cache: RefCell::new(HashMap::new()),
            root_index: RefCell::new(HashMap::new()),
        }
    }

    /// Include roots in search order.
    #[must_use]
    pub fn include_roots(&self) -> &[PathBuf] {
        &self.include_roots
    }

    /// Logical prefix of `directory`, found by checking it and then each of its
    /// ancestors for a prefix marker. `None` when no ancestor has one.
    #[must_use]
    pub fn resolve_prefix(&self, directory: &Path) -> Option<String> {
        self.addon_of(directory).map(|addon| addon.prefix.clone())
    }

    /// The addon (marker directory and prefix) that `directory` belongs to.
    pub fn addon_of(&self, directory: &Path) -> Option<Rc<AddonPrefix>> {
        if let Some(cached) = self.prefix_cache.borrow().get(directory) {
            return cached.clone();
        }

        let found = directory.ancestors().find_map(|dir| {
            read_prefix_marker(dir).map(|prefix| {
                Rc::new(AddonPrefix {
                    root: dir.to_path_buf(),
                    prefix,
                })
            })
        });

        trace!(
            target: "resolver",
            "prefix of {}: {:?}",
            directory.display(),
            found.as_ref().map(|a| &a.prefix)
        );
        self.prefix_cache
            .borrow_mut()
            .insert(directory.to_path_buf(), found.clone());
        found
    }

    /// Logical path of a real file, derived from the prefix of its addon.
    ///
    /// Returned without a leading separator, e.g. `x\cba\addons\main\data\icon.paa`.
    #[must_use]
    pub fn logical_path_of(&self, file: &Path) -> Option<String> {
        let directory = file.parent()?;
        let addon = self.addon_of(directory)?;
        let relative = file.strip_prefix(&addon.root).ok()?;
        Some(addon.logical_path(relative))
    }

    /// Resolves `reference` as seen from `requesting_file`.
    ///
    /// Relative references are returned without an existence check. Logical
    /// references must resolve to an existing file or this fails with
    /// [`AddonError::FileNotFound`].
    pub fn find_file(
        &self,
        reference: &str,
        requesting_file: &Path,
        options: LookupOptions,
    ) -> Result<PathBuf, AddonError> {
        if !is_logical(reference) {
            let base = requesting_file.parent().unwrap_or_else(|| Path::new(""));
            let relative: PathBuf = reference
                .split(['\\', '/'])
                .filter(|part| !part.is_empty())
                .collect();
            return Ok(base.join(relative));
        }

        let wanted = normalize_logical(reference);
        let substitute = if options.texture_substitution {
            texture_variant(&wanted)
        } else {
            None
        };

        for root in &self.include_roots {
            if let Some(found) = self.search_root(root, &wanted, substitute.as_deref(), options) {
                debug!(target: "resolver", "{} -> {}", reference, found.display());
                return Ok(found);
            }
        }

        for root in &self.include_roots {
            for candidate in std::iter::once(wanted.as_str()).chain(substitute.as_deref()) {
                let direct = root.join(logical_to_relative(candidate));
                if direct.is_file() {
                    debug!(target: "resolver", "{} -> {} (direct)", reference, direct.display());
                    return Ok(direct);
                }
            }
        }

        Err(AddonError::FileNotFound {
            path: reference.to_string(),
        })
    }

    fn search_root(
        &self,
        root: &Path,
        wanted: &str,
        substitute: Option<&str>,
        options: LookupOptions,
    ) -> Option<PathBuf> {
        let files = self.files_under(root);
        let names: Vec<&str> = std::iter::once(wanted)
            .chain(substitute)
            .map(|logical| logical.rsplit(LOGICAL_SEPARATOR).next().unwrap_or(logical))
            .collect();

        files.iter().find_map(|file| {
            let name = file.file_name()?.to_string_lossy();
            let name_matches = names.iter().any(|n| {
                if options.case_insensitive {
                    n.eq_ignore_ascii_case(&name)
                } else {
                    *n == name
                }
            });
            if !name_matches {
                return None;
            }

            let logical = self.logical_path_of(file)?;
            let path_matches = std::iter::once(wanted)
                .chain(substitute)
                .any(|target| logical_eq(&logical, target, options.case_insensitive));
            path_matches.then(|| file.clone())
        })
    }

    /// Files under an include root in walk order, listed once per resolver.
    fn files_under(&self, root: &Path) -> Rc<Vec<PathBuf>> {
        if let Some(files) = self.root_index.borrow().get(root) {
            return Rc::clone(files);
        }

        let files: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .sort_by(compare_entries)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(target: "resolver", "skipping unreadable entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect();

        let files = Rc::new(files);
        self.root_index
            .borrow_mut()
            .insert(root.to_path_buf(), Rc::clone(&files));
        files
    }
}

/// Whether `reference` is a logical path (leading separator).
#[must_use]
pub fn is_logical(reference: &str) -> bool {
    reference.starts_with(['\\', '/'])
}

/// `.paa` counterpart of a logical path to an uncompressed image.
fn texture_variant(logical: &str) -> Option<String> {
    let (stem, extension) = logical.rsplit_once('.')?;
    if stem.ends_with(LOGICAL_SEPARATOR) {
        return None;
    }
    SUBSTITUTABLE_IMAGE_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
        .then(|| format!("{stem}.{TEXTURE_EXTENSION}"))
}
