//! Addon source trees for tests.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::PREFIX_MARKER;

/// An addon source directory described in memory and written on demand.
#[derive(Clone, Debug)]
pub struct AddonFixture {
    /// Directory name the addon is written under
    pub name: String,
    /// Content of the `$PBOPREFIX$` marker, none to leave it out
    pub prefix: Option<String>,
    /// Files relative to the addon root, with `/` separators
    pub files: Vec<(String, Vec<u8>)>,
}

impl AddonFixture {
    /// Empty addon called `name` with the given prefix.
    pub fn new(name: &str, prefix: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.map(str::to_string),
            files: Vec::new(),
        }
    }

    /// Addon with a macro-driven config, a function script and a file that
    /// tests usually exclude.
    ///
    /// Built without tools, its archive holds `config.bin`,
    /// `functions\fn_init.sqf` and `script_macros.hpp`; `config.bin` reads
    /// `class CfgPatches { class main { version = 3; }; };`.
    pub fn basic() -> Self {
        Self::new("main", Some("x\\mod\\addons\\main"))
            .with_file(
                "config.cpp",
                "#include \"script_macros.hpp\"\n\
                 // patch entry\n\
                 class CfgPatches { class main { version = VERSION; }; };\n",
            )
            .with_file("script_macros.hpp", "#define VERSION 3\n")
            .with_file("functions/fn_init.sqf", "diag_log 'init';\n")
            .with_file("art/logo.psd", "layers")
    }

    /// Adds or replaces a file.
    pub fn with_file(mut self, relative: &str, content: impl AsRef<[u8]>) -> Self {
        self.files.retain(|(name, _)| name != relative);
        self.files.push((relative.to_string(), content.as_ref().to_vec()));
        self
    }

    /// Writes the addon under `parent`, returning its root.
    pub fn write_to(&self, parent: &Path) -> Result<PathBuf> {
        let root = parent.join(&self.name);
        fs::create_dir_all(&root).with_context(|| format!("Failed to create {}", root.display()))?;

        if let Some(prefix) = &self.prefix {
            fs::write(root.join(PREFIX_MARKER), format!("{prefix}\n"))?;
        }
        for (relative, content) in &self.files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(root)
    }
}
