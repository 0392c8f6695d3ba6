//! Archive assembly.

use anyhow::{Context, Result, bail};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::ArchiveEntry;
use crate::constants::{ARCHIVE_BOUNDARY_LEN, ARCHIVE_HASH_LEN, ARCHIVE_HEADER_BLOCK};
use crate::utils::fs::ensure_parent_dir;

/// A writer that hashes everything passing through it.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha1,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha1::new(),
            written: 0,
        }
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns the digest of everything written and the inner writer.
    pub fn finish(self) -> ([u8; ARCHIVE_HASH_LEN], W) {
        (self.hasher.finalize().into(), self.inner)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A file to be packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// Entry name, `\` separated
    pub name: String,
    /// File holding the contents
    pub source: PathBuf,
}

/// Writes an archive containing `files`, in the given order, to `target`.
///
/// Returns the SHA-1 stored in the trailer. The target is overwritten; the
/// caller decides whether that is allowed and removes it if this fails.
pub fn write_archive(target: &Path, prefix: &str, files: &[ArchiveFile]) -> Result<[u8; ARCHIVE_HASH_LEN]> {
    ensure_parent_dir(target)?;
    let file = File::create(target)
        .with_context(|| format!("Failed to create archive: {}", target.display()))?;
    let mut out = HashingWriter::new(BufWriter::new(file));

    info!(target: "archive", "writing prefix {prefix}");
    write_prefix(&mut out, prefix)?;

    debug!(target: "archive", "writing {} headers", files.len());
    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let entry = header_for(file)?;
        write_header(&mut out, &entry)?;
        entries.push(entry);
    }
    out.write_all(&[0u8; ARCHIVE_BOUNDARY_LEN])?;

    debug!(target: "archive", "writing contents");
    for (file, entry) in files.iter().zip(&entries) {
        copy_payload(&mut out, file, entry.data_size)?;
    }

    let written = out.written();
    let (hash, mut inner) = out.finish();
    inner.write_all(&[0])?;
    inner.write_all(&hash)?;
    inner
        .flush()
        .with_context(|| format!("Failed to write archive: {}", target.display()))?;

    info!(
        target: "archive",
        "wrote {} ({} entries, {} bytes, sha1 {})",
        target.display(),
        entries.len(),
        written + 1 + ARCHIVE_HASH_LEN as u64,
        hex::encode(hash)
    );
    Ok(hash)
}

fn write_prefix<W: Write>(out: &mut W, prefix: &str) -> Result<()> {
    out.write_all(&ARCHIVE_HEADER_BLOCK)?;
    out.write_all(prefix.replace('/', "\\").as_bytes())?;
    out.write_all(&[0, 0])?;
    Ok(())
}

fn header_for(file: &ArchiveFile) -> Result<ArchiveEntry> {
    let metadata = std::fs::metadata(&file.source)
        .with_context(|| format!("Failed to read metadata: {}", file.source.display()))?;
    let size = u32::try_from(metadata.len()).with_context(|| {
        format!("{} is too large for an archive entry", file.source.display())
    })?;
    Ok(ArchiveEntry::stored(file.name.clone(), size))
}

fn write_header<W: Write>(out: &mut W, entry: &ArchiveEntry) -> Result<()> {
    out.write_all(entry.name.as_bytes())?;
    out.write_all(&[0])?;
    for field in [
        entry.method,
        entry.original_size,
        entry.reserved,
        entry.timestamp,
        entry.data_size,
    ] {
        out.write_all(&field.to_le_bytes())?;
    }
    Ok(())
}

fn copy_payload<W: Write>(out: &mut W, file: &ArchiveFile, expected: u32) -> Result<()> {
    let mut source = File::open(&file.source)
        .with_context(|| format!("Failed to open {}", file.source.display()))?;
    let copied = io::copy(&mut source, out)
        .with_context(|| format!("Failed to pack {}", file.source.display()))?;
    if copied != u64::from(expected) {
        bail!(
            "{} changed while packing: header says {} bytes, copied {}",
            file.source.display(),
            expected,
            copied
        );
    }
    Ok(())
}
