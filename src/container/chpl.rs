//! Nero chapter list (`chpl`) decoding
//!
//! Layout of the atom body:
//!
//! ```text
//! [0..4)  version + flags
//! [4..8)  reserved
//! [8]     entry count N
//! N x { u64 BE start (100 ns ticks), u8 title length L, L bytes UTF-8 title }
//! ```

use super::atom::ChapterEntry;
use super::AtomError;

/// Bounds-checked big-endian cursor
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], AtomError> {
        if len > self.remaining() {
            return Err(AtomError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), AtomError> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, AtomError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, AtomError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, AtomError> {
        let b = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }
}

/// Decode a raw `chpl` body.
///
/// Any read past the end fails the whole atom; no partial list is returned.
pub fn decode_chpl(payload: &[u8]) -> Result<Vec<ChapterEntry>, AtomError> {
    let mut reader = ByteReader::new(payload);
    reader.skip(4)?;
    reader.skip(4)?;
    let count = reader.read_u8()?;

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start_ticks = reader.read_u64()?;
        let len = reader.read_u8()? as usize;
        let title = String::from_utf8_lossy(reader.read_bytes(len)?).into_owned();
        entries.push(ChapterEntry { start_ticks, title });
    }

    Ok(entries)
}
