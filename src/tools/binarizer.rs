//! Per-file binarization backends.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use super::{Placeholders, ToolSpec};
use crate::core::AddonError;
use crate::preprocess::{CompileContext, preprocess_to_string};
use crate::resolver::Resolver;
use crate::utils::fs::{copy_file, ensure_parent_dir};

/// Converts one source file into its runtime form.
pub trait Binarizer {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Reads `source` and writes `target`, which may be the same path.
    fn binarize(&self, source: &Path, target: &Path) -> Result<()>;

    /// Whether the step runs an external program that should only see a
    /// minimal workspace.
    fn is_external(&self) -> bool {
        false
    }
}

/// Runs a configured program.
#[derive(Debug, Clone)]
pub struct ExternalBinarizer {
    role: &'static str,
    spec: ToolSpec,
    capture_output: bool,
}

impl ExternalBinarizer {
    /// Creates a binarizer for tool role `role`.
    pub fn new(role: &'static str, spec: ToolSpec, capture_output: bool) -> Self {
        Self {
            role,
            spec,
            capture_output,
        }
    }
}

impl Binarizer for ExternalBinarizer {
    fn name(&self) -> &str {
        &self.spec.program
    }

    fn binarize(&self, source: &Path, target: &Path) -> Result<()> {
        ensure_parent_dir(target)?;
        let placeholders = Placeholders::new().source_target(source, target);
        let mut command = self
            .spec
            .command(self.role, &placeholders, &["{source}", "{target}"])
            .capture_output(self.capture_output)
            .subject(source);
        if let Some(dir) = source.parent().filter(|d| !d.as_os_str().is_empty()) {
            command = command.current_dir(dir);
        }
        command.execute()?;

        if !target.is_file() {
            return Err(AddonError::ExternalToolFailed {
                tool: self.role.to_string(),
                path: source.display().to_string(),
                code: Some(0),
                output: format!("{} was not written", target.display()),
            }
            .into());
        }
        Ok(())
    }

    fn is_external(&self) -> bool {
        true
    }
}

/// Copies the source unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Binarizer for PassThrough {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn binarize(&self, source: &Path, target: &Path) -> Result<()> {
        if source != target {
            copy_file(source, target)?;
        }
        Ok(())
    }
}

/// Built-in config compiler: writes the preprocessed text of the source.
#[derive(Debug)]
pub struct PreprocessingCompiler {
    resolver: Resolver,
    muted_warnings: Vec<String>,
}

impl PreprocessingCompiler {
    /// Creates a compiler resolving includes with `resolver`.
    pub fn new(resolver: Resolver, muted_warnings: Vec<String>) -> Self {
        Self {
            resolver,
            muted_warnings,
        }
    }
}

impl Binarizer for PreprocessingCompiler {
    fn name(&self) -> &str {
        "preprocessor"
    }

    fn binarize(&self, source: &Path, target: &Path) -> Result<()> {
        let mut ctx = CompileContext::new(&self.resolver).with_muted_warnings(self.muted_warnings.iter().cloned());
        let text = preprocess_to_string(source, &mut ctx)?;
        debug!(
            target: "preprocess",
            "{}: {} lines, {} macros",
            source.display(),
            ctx.line_map.len(),
            ctx.macros.len()
        );
        ensure_parent_dir(target)?;
        std::fs::write(target, text).with_context(|| format!("Failed to write {}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_pass_through_copies() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.p3d");
        fs::write(&source, "MLOD").unwrap();
        let target = temp.path().join("out/a.p3d");

        PassThrough.binarize(&source, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"MLOD");
        PassThrough.binarize(&target, &target).unwrap();
        assert!(!PassThrough.is_external());
    }

    #[test]
    fn test_preprocessing_compiler_in_place() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("mat.rvmat");
        fs::write(&source, "#define TEX \"a.paa\"\ntexture = TEX;\n").unwrap();

        let compiler = PreprocessingCompiler::new(Resolver::new(vec![temp.path().to_path_buf()]), Vec::new());
        compiler.binarize(&source, &source).unwrap();
        assert_eq!(fs::read_to_string(&source).unwrap(), "texture = \"a.paa\";\n");
    }

    #[test]
    fn test_preprocessing_compiler_reports_errors() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("config.cpp");
        fs::write(&source, "#include \"missing.hpp\"\n").unwrap();

        let compiler = PreprocessingCompiler::new(Resolver::new(Vec::<PathBuf>::new()), Vec::new());
        let err = compiler.binarize(&source, &temp.path().join("config.bin")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AddonError>(),
            Some(AddonError::IncludeNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_external_binarizer_requires_output() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.p3d");
        fs::write(&source, "MLOD").unwrap();
        let target = temp.path().join("out").join("a.p3d");

        let copying = ExternalBinarizer::new(
            "model_binarizer",
            ToolSpec {
                program: "cp".to_string(),
                args: vec!["{source}".to_string(), "{target}".to_string()],
            },
            true,
        );
        copying.binarize(&source, &target).unwrap();
        assert!(target.is_file());
        assert!(copying.is_external());

        let lazy = ExternalBinarizer::new(
            "model_binarizer",
            ToolSpec {
                program: "true".to_string(),
                args: Vec::new(),
            },
            true,
        );
        let err = lazy.binarize(&source, &temp.path().join("never.p3d")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AddonError>(),
            Some(AddonError::ExternalToolFailed { .. })
        ));
    }
}
