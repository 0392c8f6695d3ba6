//! Common test utilities for addonpack integration tests

// Not every test module uses every helper
#![allow(dead_code)]

use addonpack::test_utils::AddonFixture;
use anyhow::{Context, Result};
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch directory with its own config file, temp base and output dir.
pub struct TestProject {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestProject {
    /// Create an empty project
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        fs::create_dir_all(root.join("addons"))?;
        fs::create_dir_all(root.join("out"))?;
        fs::create_dir_all(root.join("tmp"))?;
        Ok(Self {
            _temp_dir: temp_dir,
            root,
        })
    }

    /// Project root
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of `relative` inside the project
    pub fn join(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write an addon under `addons/`, returning its root
    pub fn add_addon(&self, fixture: &AddonFixture) -> Result<PathBuf> {
        fixture.write_to(&self.root.join("addons"))
    }

    /// Write the config file picked up through `ADDONPACK_CONFIG`
    pub fn write_config(&self, content: &str) -> Result<()> {
        let path = self.config_path();
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Write an arbitrary file
    pub fn write_file(&self, relative: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("addonpack.toml")
    }

    /// An `addonpack` command running in the project directory
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("addonpack").expect("addonpack binary");
        cmd.current_dir(&self.root)
            .env("ADDONPACK_CONFIG", self.config_path())
            .env("ADDONPACK_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("ADDONPACK_TOOL_OUTPUT");
        cmd
    }

    /// `addonpack build` with a project-local temp base
    pub fn build_cmd(&self, source: &Path, target: &Path) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("build")
            .arg("-T")
            .arg(self.join("tmp"))
            .arg(source)
            .arg(target);
        cmd
    }
}

/// File assertion helpers
pub struct FileAssert;

impl FileAssert {
    /// Assert a file exists
    pub fn exists(path: impl AsRef<Path>) {
        let path = path.as_ref();
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert a file does not exist
    pub fn not_exists(path: impl AsRef<Path>) {
        let path = path.as_ref();
        assert!(!path.exists(), "Expected file to not exist: {}", path.display());
    }

    /// Assert file content equals the expected text
    pub fn equals(path: impl AsRef<Path>, expected: &str) {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
        assert_eq!(content, expected, "Unexpected content in {}", path.display());
    }
}
