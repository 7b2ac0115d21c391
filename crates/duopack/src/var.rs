//! # Variable Data
//!
//! Bounds-checked access to the trailing variable-length region of a message.
//!
//! ## Invariants
//! - A `VarRef` is only dereferenced through `VarData::get`, which rejects any
//!   region reaching past the filled length.
//! - Offsets are assigned by the caller; `push` packs regions contiguously.

use crate::error::Error;
use crate::error::Result;

/// Wire size of a `VarRef`.
pub(crate) const VAR_REF_SIZE: usize = 4;

/// A `(byte_offset, byte_length)` pair addressing a region of a message's variable data.
///
/// Wire layout is `[byte_length: u16 LE][byte_offset: u16 LE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarRef {
    pub byte_offset: u16,
    pub byte_length: u16,
}

impl VarRef {
    pub fn new(byte_offset: u16, byte_length: u16) -> Self {
        Self { byte_offset, byte_length }
    }

    /// One past the last byte addressed by this region.
    pub fn end(&self) -> usize {
        self.byte_offset as usize + self.byte_length as usize
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.byte_length.to_le_bytes());
        buf.extend_from_slice(&self.byte_offset.to_le_bytes());
    }

    pub(crate) fn read(bytes: &[u8]) -> Self {
        Self {
            byte_length: u16::from_le_bytes([bytes[0], bytes[1]]),
            byte_offset: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }
}

/// The variable-length data owned by a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VarData {
    bytes: Vec<u8>,
}

impl VarData {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Appends a region directly after the current end and returns its reference.
    ///
    /// # Errors
    /// Returns `Error::RegionTooLarge` if the region's offset or length does not fit a `u16`.
    pub fn push(&mut self, region: &[u8]) -> Result<VarRef> {
        let offset = u16::try_from(self.bytes.len())
            .map_err(|_| Error::RegionTooLarge(self.bytes.len()))?;
        let length = u16::try_from(region.len())
            .map_err(|_| Error::RegionTooLarge(region.len()))?;
        self.bytes.extend_from_slice(region);
        Ok(VarRef::new(offset, length))
    }

    /// Returns the bytes addressed by `r`.
    ///
    /// # Errors
    /// Returns `Error::RegionOutOfBounds` if `r` reaches past the filled length.
    pub fn get(&self, r: VarRef) -> Result<&[u8]> {
        if r.end() > self.bytes.len() {
            return Err(Error::RegionOutOfBounds {
                offset: r.byte_offset as usize,
                length: r.byte_length as usize,
                filled: self.bytes.len(),
            });
        }
        Ok(&self.bytes[r.byte_offset as usize..r.end()])
    }

    /// Count of meaningful bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for VarData {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for VarData {
    fn from(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }
}
