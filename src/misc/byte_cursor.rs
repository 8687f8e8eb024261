//! Seekable binary reader over a borrowed byte slice.
//!
//! Every byte handed to the caller passes through the cursor's [XorKey], so obfuscated files can
//! be read as if they were plain. Fixed-layout records are declared with `binrw` and read through
//! [ByteCursor::read_record].

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use binrw::meta::ReadEndian;
use binrw::BinRead;
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::encryption::xor::XorKey;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("Truncated data: wanted {wanted} bytes at offset {offset:#x}, only {available} available")]
    TruncatedData {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    #[error("Invalid record at offset {offset:#x}: {message}")]
    InvalidRecord { offset: usize, message: String },

    #[error("Chunk at offset {offset:#x} declares size {size}, smaller than its {header_size} byte header")]
    InvalidChunkSize {
        offset: usize,
        size: u32,
        header_size: usize,
    },
}

/// A record with a fixed on-disk size that `binrw` can parse without arguments.
pub trait FixedRecord: for<'a> BinRead<Args<'a> = ()> + ReadEndian {
    const SIZE: usize;
}

#[derive(Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
    key: XorKey,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_key(data, XorKey::NONE)
    }

    pub fn with_key(data: &'a [u8], key: XorKey) -> Self {
        Self {
            data,
            position: 0,
            key,
        }
    }

    pub fn key(&self) -> XorKey {
        self.key
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Move to an absolute offset. Offsets up to and including the end of data are valid.
    pub fn seek(&mut self, offset: usize) -> Result<(), CursorError> {
        if offset > self.data.len() {
            return Err(CursorError::TruncatedData {
                offset,
                wanted: 0,
                available: 0,
            });
        }
        self.position = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), CursorError> {
        self.ensure(count)?;
        self.position += count;
        Ok(())
    }

    fn ensure(&self, wanted: usize) -> Result<(), CursorError> {
        if wanted > self.remaining() {
            return Err(CursorError::TruncatedData {
                offset: self.position,
                wanted,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        self.ensure(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.position..self.position + N]);
        self.key.apply(&mut bytes);
        self.position += N;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, CursorError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        Ok(LittleEndian::read_u16(&self.take::<2>()?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16, CursorError> {
        Ok(self.read_u16()?.swap_bytes())
    }

    pub fn read_i16(&mut self) -> Result<i16, CursorError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i16_be(&mut self) -> Result<i16, CursorError> {
        Ok(self.read_u16_be()? as i16)
    }

    pub fn read_u24(&mut self) -> Result<u32, CursorError> {
        let bytes = self.take::<3>()?;
        Ok(LittleEndian::read_u24(&bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        Ok(LittleEndian::read_u32(&self.take::<4>()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, CursorError> {
        Ok(self.read_u32()?.swap_bytes())
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i32_be(&mut self) -> Result<i32, CursorError> {
        Ok(self.read_u32_be()? as i32)
    }

    pub fn read_tag2(&mut self) -> Result<[u8; 2], CursorError> {
        self.take::<2>()
    }

    pub fn read_tag4(&mut self) -> Result<[u8; 4], CursorError> {
        self.take::<4>()
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, CursorError> {
        self.ensure(count)?;
        let mut bytes = self.data[self.position..self.position + count].to_vec();
        self.key.apply(&mut bytes);
        self.position += count;
        Ok(bytes)
    }

    /// Read a NUL terminated string of at most `limit` bytes, consuming the terminator.
    /// The returned bytes exclude the terminator.
    pub fn read_null_terminated(&mut self, limit: usize) -> Result<Vec<u8>, CursorError> {
        let mut bytes = vec![];
        while bytes.len() < limit {
            match self.read_u8()? {
                0 => break,
                byte => bytes.push(byte),
            }
        }
        Ok(bytes)
    }

    /// Read a fixed-size `binrw` record, with the XOR key applied to its bytes.
    /// The whole record must be available; on failure the position is left unchanged.
    pub fn read_record<T: FixedRecord>(&mut self) -> Result<T, CursorError> {
        let offset = self.position;
        self.ensure(T::SIZE)?;
        T::read(self).map_err(|e| {
            self.position = offset;
            CursorError::InvalidRecord {
                offset,
                message: e.to_string(),
            }
        })
    }
}

impl Read for ByteCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.key.apply(&mut buf[..count]);
        self.position += count;
        Ok(count)
    }
}

impl Seek for ByteCursor<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset as i64),
            SeekFrom::Current(delta) => (self.position as i64).checked_add(delta),
            SeekFrom::End(delta) => (self.data.len() as i64).checked_add(delta),
        };
        match target {
            Some(target) if target >= 0 && target as usize <= self.data.len() => {
                self.position = target as usize;
                Ok(self.position as u64)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside of the cursor's data",
            )),
        }
    }
}

impl fmt::Debug for ByteCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "ByteCursor {{ position: {:#x}, len: {:#x}, key: {:#04x} }}",
            self.position,
            self.data.len(),
            self.key.0
        )
    }
}
