//! The packed archive format.
//!
//! Layout of an archive, all integers little-endian `u32`:
//!
//! ```text
//! "\0sreV" + 16 zero bytes        version entry (empty name, method "Vers")
//! "prefix\0" <prefix> "\0"        header extension, one key/value pair
//! "\0"                            end of header extension
//! <name> "\0" + 5 × u32           one header per entry, `\` separated name
//! 21 zero bytes                   boundary (an entry with an empty name)
//! <payload>...                    entry contents, in header order
//! "\0" + 20 byte SHA-1            digest of every byte before this trailer
//! ```
//!
//! Entries are always stored uncompressed with a zero timestamp, so packing
//! the same tree twice yields identical bytes.
//!
//! [`writer`] produces archives, [`reader`] parses and verifies them and
//! [`unpack`] extracts them back into a directory.

pub mod reader;
pub mod unpack;
pub mod writer;

use serde::Serialize;

pub use reader::Archive;
pub use unpack::{UnpackOptions, unpack};
pub use writer::{ArchiveFile, HashingWriter, write_archive};

/// Packing method of the version entry, `"Vers"` read as a little-endian `u32`.
pub const VERSION_METHOD: u32 = u32::from_le_bytes(*b"sreV");

/// Packing method of stored (uncompressed) entries.
pub const STORED_METHOD: u32 = 0;

/// One header record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Name with `\` separators
    pub name: String,
    /// Packing method, [`STORED_METHOD`] for everything this crate writes
    pub method: u32,
    /// Unpacked size
    pub original_size: u32,
    /// Always zero
    pub reserved: u32,
    /// Always zero when written by this crate
    pub timestamp: u32,
    /// Size of the payload in the archive
    pub data_size: u32,
    /// Offset of the payload from the start of the archive
    #[serde(skip)]
    pub offset: usize,
}

impl ArchiveEntry {
    /// A stored entry of `size` bytes.
    #[must_use]
    pub fn stored(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            method: STORED_METHOD,
            original_size: size,
            reserved: 0,
            timestamp: 0,
            data_size: size,
            offset: 0,
        }
    }
}
