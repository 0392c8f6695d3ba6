//! Archive parsing and verification.

use sha1::{Digest, Sha1};
use std::path::Path;
use tracing::debug;

use super::{ArchiveEntry, VERSION_METHOD};
use crate::constants::ARCHIVE_HASH_LEN;
use crate::core::AddonError;

/// A parsed archive held in memory.
#[derive(Debug, Clone)]
pub struct Archive {
    name: String,
    data: Vec<u8>,
    extensions: Vec<(String, String)>,
    entries: Vec<ArchiveEntry>,
    payload_end: usize,
    stored_hash: Option<[u8; ARCHIVE_HASH_LEN]>,
}

impl Archive {
    /// Reads and parses the archive at `path`.
    pub fn read(path: &Path) -> Result<Self, AddonError> {
        let data = std::fs::read(path).map_err(|e| AddonError::io("read", path, &e))?;
        Self::from_bytes(&path.display().to_string(), data)
    }

    /// Parses archive bytes; `name` is used in error messages.
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self, AddonError> {
        let mut cursor = Cursor {
            data: &data,
            pos: 0,
            archive: name,
        };
        let mut extensions = Vec::new();
        let mut entries = Vec::new();

        loop {
            let entry_name = cursor.asciiz()?;
            let fields = [cursor.u32()?, cursor.u32()?, cursor.u32()?, cursor.u32()?, cursor.u32()?];

            if entry_name.is_empty() {
                if fields[0] == VERSION_METHOD && entries.is_empty() && extensions.is_empty() {
                    loop {
                        let key = cursor.asciiz()?;
                        if key.is_empty() {
                            break;
                        }
                        let value = cursor.asciiz()?;
                        extensions.push((key, value));
                    }
                    continue;
                }
                break;
            }

            entries.push(ArchiveEntry {
                name: entry_name,
                method: fields[0],
                original_size: fields[1],
                reserved: fields[2],
                timestamp: fields[3],
                data_size: fields[4],
                offset: 0,
            });
        }

        let mut offset = cursor.pos;
        for entry in &mut entries {
            entry.offset = offset;
            offset += entry.data_size as usize;
        }
        if offset > data.len() {
            return Err(cursor.invalid(format!(
                "entries need {} bytes of payload but the archive ends at {}",
                offset - cursor.pos,
                data.len()
            )));
        }

        let stored_hash = match &data[offset..] {
            [] => None,
            [0, hash @ ..] if hash.len() == ARCHIVE_HASH_LEN => {
                let mut stored = [0u8; ARCHIVE_HASH_LEN];
                stored.copy_from_slice(hash);
                Some(stored)
            }
            rest => {
                return Err(cursor.invalid(format!(
                    "expected a {}-byte trailer after the payload, found {} bytes",
                    ARCHIVE_HASH_LEN + 1,
                    rest.len()
                )));
            }
        };

        debug!(target: "archive", "{}: {} entries", name, entries.len());
        Ok(Self {
            name: name.to_string(),
            extensions,
            entries,
            payload_end: offset,
            stored_hash,
            data,
        })
    }

    /// Header extension key/value pairs, in file order.
    #[must_use]
    pub fn extensions(&self) -> &[(String, String)] {
        &self.extensions
    }

    /// Value of the `prefix` header extension.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.extensions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("prefix"))
            .map(|(_, value)| value.as_str())
    }

    /// Entries in header order.
    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Looks up an entry by name, ignoring case and separator style.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        let wanted = name.replace('/', "\\");
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(&wanted))
    }

    /// Payload of the entry called `name`.
    pub fn entry_data(&self, name: &str) -> Result<&[u8], AddonError> {
        let entry = self.entry(name).ok_or_else(|| AddonError::EntryNotFound {
            path: self.name.clone(),
            name: name.to_string(),
        })?;
        Ok(self.payload(entry))
    }

    /// Payload of `entry`, which must belong to this archive.
    #[must_use]
    pub fn payload(&self, entry: &ArchiveEntry) -> &[u8] {
        &self.data[entry.offset..entry.offset + entry.data_size as usize]
    }

    /// Digest stored in the trailer, if the archive has one.
    #[must_use]
    pub fn stored_hash(&self) -> Option<[u8; ARCHIVE_HASH_LEN]> {
        self.stored_hash
    }

    /// SHA-1 of every byte before the trailer.
    #[must_use]
    pub fn computed_hash(&self) -> [u8; ARCHIVE_HASH_LEN] {
        Sha1::digest(&self.data[..self.payload_end]).into()
    }

    /// Checks the trailer against the contents.
    ///
    /// An archive without a trailer fails as well.
    pub fn verify_checksum(&self) -> Result<(), AddonError> {
        let computed = self.computed_hash();
        match self.stored_hash {
            Some(stored) if stored == computed => Ok(()),
            Some(stored) => Err(AddonError::ChecksumMismatch {
                path: self.name.clone(),
                stored: hex::encode(stored),
                computed: hex::encode(computed),
            }),
            None => Err(AddonError::InvalidArchive {
                path: self.name.clone(),
                reason: "archive has no checksum trailer".to_string(),
            }),
        }
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    archive: &'a str,
}

impl Cursor<'_> {
    fn invalid(&self, reason: String) -> AddonError {
        AddonError::InvalidArchive {
            path: self.archive.to_string(),
            reason,
        }
    }

    fn asciiz(&mut self) -> Result<String, AddonError> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| self.invalid(format!("unterminated string at offset {}", self.pos)))?;
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(text)
    }

    fn u32(&mut self) -> Result<u32, AddonError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.invalid(format!("truncated header at offset {}", self.pos)))?;
        self.pos += 4;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
