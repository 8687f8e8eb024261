//! The writing counterpart of [ByteCursor](super::byte_cursor::ByteCursor), used to assemble
//! containers in memory.

use byteorder::{ByteOrder, LittleEndian};

use crate::encryption::xor::XorKey;
use crate::misc::chunk_iterator::TagScheme;
use crate::misc::tag::ChunkTag;

/// Position of a chunk opened with [ByteWriter::begin_chunk], needed to close it.
#[derive(Debug, Clone, Copy)]
pub struct ChunkMark {
    start: usize,
    scheme: TagScheme,
}

#[derive(Debug, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
    key: XorKey,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: XorKey) -> Self {
        Self {
            buffer: vec![],
            key,
        }
    }

    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let start = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        self.key.apply(&mut self.buffer[start..]);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_u8(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        LittleEndian::write_u16(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn write_u16_be(&mut self, value: u16) {
        self.write_u16(value.swap_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn write_u24(&mut self, value: u32) {
        let mut bytes = [0u8; 3];
        LittleEndian::write_u24(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn write_u32_be(&mut self, value: u32) {
        self.write_u32(value.swap_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_tag(&mut self, tag: ChunkTag) {
        self.write_bytes(tag.as_bytes());
    }

    /// Overwrite four bytes at `offset` with a little-endian value.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.key.apply(&mut bytes);
        self.buffer[offset..offset + 4].copy_from_slice(&bytes);
    }

    pub fn patch_u32_be(&mut self, offset: usize, value: u32) {
        self.patch_u32(offset, value.swap_bytes());
    }

    /// Write a chunk header with a placeholder size. The size is filled in by [Self::end_chunk].
    pub fn begin_chunk(&mut self, scheme: TagScheme, tag: ChunkTag) -> ChunkMark {
        let start = self.position();
        match scheme {
            TagScheme::Small => {
                self.write_u32(0);
                self.write_tag(tag);
            }
            TagScheme::Block => {
                self.write_tag(tag);
                self.write_u32_be(0);
            }
        }
        ChunkMark { start, scheme }
    }

    /// Close a chunk, storing its size including the header.
    pub fn end_chunk(&mut self, mark: ChunkMark) {
        let size = (self.position() - mark.start) as u32;
        match mark.scheme {
            TagScheme::Small => self.patch_u32(mark.start, size),
            TagScheme::Block => self.patch_u32_be(mark.start + 4, size),
        }
    }

    /// Write a complete chunk around `payload`.
    pub fn write_chunk(&mut self, scheme: TagScheme, tag: ChunkTag, payload: &[u8]) {
        let mark = self.begin_chunk(scheme, tag);
        self.write_bytes(payload);
        self.end_chunk(mark);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
