//! Detached archive signatures.
//!
//! Signing is delegated to an external program configured as
//! `[tools.signer]`. The signature lands beside the archive as
//! `<archive>.<key stem>.bisign`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{PRIVATE_KEY_EXTENSION, SIGNATURE_EXTENSION};
use crate::core::AddonError;
use crate::tools::{Placeholders, ToolSpec, roles};
use crate::utils::fs::remove_file_if_exists;

/// Produces a detached signature for a finished archive.
pub trait Signer {
    /// Signs `archive` with `key`, writing `signature`.
    fn sign(&self, archive: &Path, key: &Path, signature: &Path) -> Result<()>;
}

/// Runs the configured signing program.
#[derive(Debug, Clone)]
pub struct ExternalSigner {
    spec: ToolSpec,
    capture_output: bool,
}

impl ExternalSigner {
    /// Creates a signer from its tool configuration.
    pub fn new(spec: ToolSpec, capture_output: bool) -> Self {
        Self {
            spec,
            capture_output,
        }
    }
}

impl Signer for ExternalSigner {
    fn sign(&self, archive: &Path, key: &Path, signature: &Path) -> Result<()> {
        let placeholders = Placeholders::new()
            .path("key", key)
            .path("archive", archive)
            .path("signature", signature)
            .source_target(archive, signature);
        self.spec
            .command(roles::SIGNER, &placeholders, &["{key}", "{archive}"])
            .capture_output(self.capture_output)
            .subject(archive)
            .execute()?;
        Ok(())
    }
}

/// Fails unless `key` names a private key file.
pub fn validate_key(key: &Path) -> Result<(), AddonError> {
    let is_private_key = key
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(PRIVATE_KEY_EXTENSION));
    if !is_private_key {
        return Err(AddonError::InvalidKey {
            path: key.display().to_string(),
        });
    }
    if !key.is_file() {
        return Err(AddonError::FileNotFound {
            path: key.display().to_string(),
        });
    }
    Ok(())
}

/// Where the signature of `archive` made with `key` is written.
///
/// ```rust
/// use addonpack::sign::signature_path;
/// use std::path::{Path, PathBuf};
///
/// let path = signature_path(Path::new("out/main.pbo"), Path::new("keys/mymod_v1.biprivatekey"));
/// assert_eq!(path, PathBuf::from("out/main.pbo.mymod_v1.bisign"));
/// ```
pub fn signature_path(archive: &Path, key: &Path) -> PathBuf {
    let key_name = key
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = archive.as_os_str().to_os_string();
    name.push(format!(".{key_name}.{SIGNATURE_EXTENSION}"));
    PathBuf::from(name)
}

/// Signs `archive`, replacing any previous signature.
///
/// Fails if the signer succeeds without writing the signature.
pub fn sign_archive(signer: &dyn Signer, archive: &Path, key: &Path) -> Result<PathBuf> {
    validate_key(key)?;
    let signature = signature_path(archive, key);
    remove_file_if_exists(&signature)?;

    signer.sign(archive, key, &signature)?;
    if !signature.is_file() {
        return Err(AddonError::ExternalToolFailed {
            tool: roles::SIGNER.to_string(),
            path: archive.display().to_string(),
            code: Some(0),
            output: format!("{} was not written", signature.display()),
        }
        .into());
    }

    info!(target: "build", "signed {} -> {}", archive.display(), signature.display());
    Ok(signature)
}
