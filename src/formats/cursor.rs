//! Little-endian reader over an in-memory buffer.

use anyhow::{Result, anyhow, bail};

/// Bounds-checked reader; every read fails cleanly at end of data.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> ByteCursor<'a> {
    /// Reads `data`, naming it `what` in errors.
    pub fn new(data: &'a [u8], what: &'static str) -> Self {
        Self { data, pos: 0, what }
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads `len` bytes.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| anyhow!("{}: unexpected end of data at offset {}", self.what, self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Skips `count` records of `size` bytes.
    pub fn skip(&mut self, count: usize, size: usize) -> Result<()> {
        let len = count
            .checked_mul(size)
            .ok_or_else(|| anyhow!("{}: record count {} too large", self.what, count))?;
        self.bytes(len).map(|_| ())
    }

    /// Fails unless the next bytes equal `magic`.
    pub fn expect(&mut self, magic: &[u8]) -> Result<()> {
        let at = self.pos;
        let found = self.bytes(magic.len())?;
        if found != magic {
            bail!(
                "{}: expected {:?} at offset {}, found {:?}",
                self.what,
                String::from_utf8_lossy(magic),
                at,
                String::from_utf8_lossy(found)
            );
        }
        Ok(())
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    /// Reads a little-endian `u32`.
    pub fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian `i32`.
    pub fn i32(&mut self) -> Result<i32> {
        let b = self.bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian `f32`.
    pub fn f32(&mut self) -> Result<f32> {
        let b = self.bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a `u32` used as a count or length.
    pub fn count(&mut self) -> Result<usize> {
        Ok(self.u32()? as usize)
    }

    /// Reads a zero-terminated string, decoding lossily.
    pub fn asciiz(&mut self) -> Result<String> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| anyhow!("{}: unterminated string at offset {}", self.what, self.pos))?;
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(text)
    }
}
