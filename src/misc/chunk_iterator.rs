//! Walks tagged, length-prefixed chunks inside a bounded range of a [ByteCursor].
//!
//! Nesting is left to the caller: to descend into a container chunk, build a new iterator over
//! the same cursor positioned at the chunk's payload, with [Chunk::payload_len] as the budget.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::misc::byte_cursor::{ByteCursor, CursorError};
use crate::misc::tag::ChunkTag;

/// How chunk headers are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TagScheme {
    /// Generations 3 and 4: little-endian u32 size followed by a 2-byte tag.
    Small,
    /// Generations 5 to 8: 4-byte ASCII tag followed by a big-endian u32 size.
    Block,
}

impl TagScheme {
    pub const fn header_size(&self) -> usize {
        match self {
            TagScheme::Small => 6,
            TagScheme::Block => 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub tag: ChunkTag,
    /// Total size of the chunk, header included.
    pub size: u32,
    /// Absolute offset of the chunk header.
    pub offset: usize,
    /// Absolute offset of the first payload byte.
    pub payload_offset: usize,
}

impl Chunk {
    pub fn payload_len(&self) -> usize {
        self.end().saturating_sub(self.payload_offset)
    }

    /// Absolute offset one past the last byte of the chunk.
    pub fn end(&self) -> usize {
        self.offset + self.size as usize
    }
}

/// Read one chunk header at the cursor's position.
///
/// `size_includes_header` selects whether the stored size counts the header bytes; the returned
/// [Chunk::size] always does.
pub fn read_chunk_header(
    cursor: &mut ByteCursor,
    scheme: TagScheme,
    size_includes_header: bool,
) -> Result<Chunk, CursorError> {
    let offset = cursor.position();
    let (tag, declared) = match scheme {
        TagScheme::Small => {
            let size = cursor.read_u32()?;
            (ChunkTag::small(&cursor.read_tag2()?), size)
        }
        TagScheme::Block => {
            let tag = ChunkTag::block(&cursor.read_tag4()?);
            (tag, cursor.read_u32_be()?)
        }
    };

    let header_size = scheme.header_size();
    let size = if size_includes_header {
        if (declared as usize) < header_size {
            return Err(CursorError::InvalidChunkSize {
                offset,
                size: declared,
                header_size,
            });
        }
        declared
    } else {
        declared.saturating_add(header_size as u32)
    };

    Ok(Chunk {
        tag,
        size,
        offset,
        payload_offset: cursor.position(),
    })
}

pub struct ChunkIterator<'c, 'a> {
    cursor: &'c mut ByteCursor<'a>,
    scheme: TagScheme,
    size_includes_header: bool,
    end: usize,
    next_offset: usize,
}

impl<'c, 'a> ChunkIterator<'c, 'a> {
    /// Iterate the chunks in `budget` bytes starting at the cursor's current position.
    pub fn new(cursor: &'c mut ByteCursor<'a>, scheme: TagScheme, budget: usize) -> Self {
        let start = cursor.position();
        let end = start.saturating_add(budget).min(cursor.len());
        Self {
            cursor,
            scheme,
            size_includes_header: true,
            end,
            next_offset: start,
        }
    }

    /// Iterate the payload of `chunk`.
    pub fn over(
        cursor: &'c mut ByteCursor<'a>,
        scheme: TagScheme,
        chunk: &Chunk,
    ) -> Result<Self, CursorError> {
        cursor.seek(chunk.payload_offset)?;
        Ok(Self::new(cursor, scheme, chunk.payload_len()))
    }

    /// Treat stored sizes as payload-only.
    pub fn excluding_header_size(mut self) -> Self {
        self.size_includes_header = false;
        self
    }

    pub fn cursor(&mut self) -> &mut ByteCursor<'a> {
        self.cursor
    }

    pub fn scheme(&self) -> TagScheme {
        self.scheme
    }

    /// Read the next chunk header, leaving the cursor at its payload.
    /// Returns `None` once no further header fits in the range.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, CursorError> {
        let header_size = self.scheme.header_size();
        if self.next_offset.saturating_add(header_size) > self.end {
            return Ok(None);
        }

        self.cursor.seek(self.next_offset)?;
        let chunk = read_chunk_header(self.cursor, self.scheme, self.size_includes_header)?;
        self.next_offset = chunk.end();
        Ok(Some(chunk))
    }

    /// Advance until a chunk with `tag` is found.
    pub fn find(&mut self, tag: ChunkTag) -> Result<Option<Chunk>, CursorError> {
        while let Some(chunk) = self.next_chunk()? {
            if chunk.tag == tag {
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }

    /// Collect every remaining chunk header.
    pub fn collect_chunks(mut self) -> Result<Vec<Chunk>, CursorError> {
        let mut chunks = vec![];
        while let Some(chunk) = self.next_chunk()? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}
