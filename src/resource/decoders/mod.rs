//! Per-generation decoding of rooms, scripts, costumes, sounds and charsets.
//!
//! Every generation is described by a [GenerationProfile]: a table of the layout choices that
//! differ between generations (header scheme, box width, palette format and so on). The decoding
//! functions are shared and consult the profile wherever the generations disagree.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::encryption::xor::XorKey;
use crate::misc::byte_cursor::{ByteCursor, CursorError};
use crate::misc::chunk_iterator::{read_chunk_header, Chunk, ChunkIterator, TagScheme};
use crate::misc::tag::ChunkTag;
use crate::resource::descriptor::{AudioDriver, GameDescriptor};
use crate::resource::room::Room;
use crate::resource::storage::{FileStorage, StorageError};
use crate::Generation;

pub mod boxes;
pub mod chunked;
pub mod classic;
pub mod objects;
pub mod palette;
pub mod records;
pub mod rle;
pub mod sound;
pub mod tags;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Truncated data: {0}")]
    TruncatedData(CursorError),

    #[error("Malformed resource at offset {offset:#x}: expected {expected}, found {actual}")]
    MalformedResource {
        expected: String,
        actual: String,
        offset: usize,
    },

    #[error("Parsing error at offset {offset:#x}: {message}")]
    ParsingError { offset: usize, message: String },

    #[error("{operation} is not supported by generation {generation} data files")]
    UnsupportedOperation {
        operation: &'static str,
        generation: Generation,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DecodeError {
    pub fn malformed(expected: impl ToString, actual: impl ToString, offset: usize) -> Self {
        DecodeError::MalformedResource {
            expected: expected.to_string(),
            actual: actual.to_string(),
            offset,
        }
    }
}

impl From<CursorError> for DecodeError {
    fn from(e: CursorError) -> Self {
        match e {
            CursorError::TruncatedData { .. } => DecodeError::TruncatedData(e),
            CursorError::InvalidRecord { offset, message } => {
                DecodeError::ParsingError { offset, message }
            }
            CursorError::InvalidChunkSize {
                offset,
                size,
                header_size,
            } => DecodeError::malformed(
                format!("a chunk of at least {} bytes", header_size),
                format!("size {}", size),
                offset,
            ),
        }
    }
}

/// How a room is framed on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomLayout {
    /// Fields at fixed offsets, no chunk tags.
    Positional,
    /// Chunks with 2-byte tags.
    Small,
    /// Chunks with 4-byte tags.
    Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountWidth {
    U8,
    U16,
    U32,
}

impl CountWidth {
    pub fn read(&self, cursor: &mut ByteCursor) -> Result<u32, CursorError> {
        match self {
            CountWidth::U8 => Ok(cursor.read_u8()? as u32),
            CountWidth::U16 => Ok(cursor.read_u16()? as u32),
            CountWidth::U32 => cursor.read_u32(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxFormat {
    /// 8-byte records with 8-bit coordinates.
    Narrow,
    /// 20-byte records with 16-bit signed coordinates and a scale.
    Wide,
    /// 52-byte records with 32-bit coordinates and a scale slot.
    Extended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteFormat {
    None,
    /// A colour count (16 or 32) followed by RGB triplets.
    Counted,
    /// One 256 colour palette.
    Clut,
    /// Any number of 256 colour palettes inside `PALS`.
    Multiple,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleFormat {
    None,
    /// 16 fixed slots of rate and range.
    Fixed16,
    /// Indexed records ended by a zero index.
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomHeaderFormat {
    Positional,
    Small,
    V5,
    V7,
    V8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageHeaderFormat {
    Positional,
    Small,
    V5,
    V7,
    V8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeHeaderFormat {
    /// Generation 0, with fields one byte further down.
    PositionalC64,
    Positional,
    Small,
    V5,
    V6,
    V7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerbFormat {
    /// 1-byte verb id and 2-byte offset.
    Short,
    /// 4-byte verb id and 4-byte offset.
    Long,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleFormat {
    None,
    Short,
    Long,
}

/// The layout choices of one generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationProfile {
    pub generation: Generation,
    pub layout: RoomLayout,
    pub boxes: BoxFormat,
    pub box_count: CountWidth,
    pub palette: PaletteFormat,
    pub cycles: CycleFormat,
    pub room_header: RoomHeaderFormat,
    pub image_header: ImageHeaderFormat,
    pub code_header: CodeHeaderFormat,
    pub verbs: VerbFormat,
    pub local_script_id: CountWidth,
    pub scale: ScaleFormat,
    /// Generation 0/1 backgrounds are run-length coded tile maps.
    pub tiles_rle: bool,
}

impl GenerationProfile {
    pub fn for_generation(generation: Generation) -> Self {
        use Generation::*;

        let layout = match generation {
            V0 | V1 | V2 => RoomLayout::Positional,
            V3 | V4 => RoomLayout::Small,
            _ => RoomLayout::Block,
        };
        let (boxes, box_count) = match generation {
            V0 | V1 | V2 | V3 => (BoxFormat::Narrow, CountWidth::U8),
            V8 => (BoxFormat::Extended, CountWidth::U32),
            _ => (BoxFormat::Wide, CountWidth::U16),
        };
        let palette = match generation {
            V0 | V1 | V2 => PaletteFormat::None,
            V3 => PaletteFormat::Counted,
            V4 | V5 => PaletteFormat::Clut,
            _ => PaletteFormat::Multiple,
        };
        let cycles = match layout {
            RoomLayout::Positional => CycleFormat::None,
            RoomLayout::Small => CycleFormat::Fixed16,
            RoomLayout::Block => CycleFormat::Terminated,
        };
        let (room_header, image_header) = match generation {
            V0 | V1 | V2 => (RoomHeaderFormat::Positional, ImageHeaderFormat::Positional),
            V3 | V4 => (RoomHeaderFormat::Small, ImageHeaderFormat::Small),
            V5 | V6 => (RoomHeaderFormat::V5, ImageHeaderFormat::V5),
            V7 => (RoomHeaderFormat::V7, ImageHeaderFormat::V7),
            V8 => (RoomHeaderFormat::V8, ImageHeaderFormat::V8),
        };
        let code_header = match generation {
            V0 => CodeHeaderFormat::PositionalC64,
            V1 | V2 => CodeHeaderFormat::Positional,
            V3 | V4 => CodeHeaderFormat::Small,
            V5 => CodeHeaderFormat::V5,
            V6 => CodeHeaderFormat::V6,
            V7 | V8 => CodeHeaderFormat::V7,
        };
        let local_script_id = match generation {
            V7 => CountWidth::U16,
            V8 => CountWidth::U32,
            _ => CountWidth::U8,
        };
        let scale = match generation {
            V5 | V6 | V7 => ScaleFormat::Short,
            V8 => ScaleFormat::Long,
            _ => ScaleFormat::None,
        };

        Self {
            generation,
            layout,
            boxes,
            box_count,
            palette,
            cycles,
            room_header,
            image_header,
            code_header,
            verbs: match generation {
                V8 => VerbFormat::Long,
                _ => VerbFormat::Short,
            },
            local_script_id,
            scale,
            tiles_rle: matches!(generation, V0 | V1),
        }
    }

    /// The chunk header scheme, `None` for positional generations.
    pub fn tag_scheme(&self) -> Option<TagScheme> {
        match self.layout {
            RoomLayout::Positional => None,
            RoomLayout::Small => Some(TagScheme::Small),
            RoomLayout::Block => Some(TagScheme::Block),
        }
    }

    pub fn script_tag(&self) -> Option<ChunkTag> {
        self.pick_tag(tags::SC, tags::SCRP)
    }

    pub fn costume_tag(&self) -> Option<ChunkTag> {
        match self.generation {
            Generation::V7 | Generation::V8 => Some(tags::AKOS),
            _ => self.pick_tag(tags::CO, tags::COST),
        }
    }

    pub fn sound_tag(&self) -> Option<ChunkTag> {
        self.pick_tag(tags::SO, tags::SOUN)
    }

    fn pick_tag(&self, small: ChunkTag, block: ChunkTag) -> Option<ChunkTag> {
        match self.layout {
            RoomLayout::Positional => None,
            RoomLayout::Small => Some(small),
            RoomLayout::Block => Some(block),
        }
    }
}

/// Decodes the resources of one generation.
#[derive(Clone, Debug)]
pub struct FormatDecoder {
    profile: GenerationProfile,
    key: XorKey,
}

impl FormatDecoder {
    /// A decoder for the DOS release of a generation.
    pub fn for_generation(generation: Generation) -> Self {
        Self {
            profile: GenerationProfile::for_generation(generation),
            key: XorKey::for_containers(generation, Default::default()),
        }
    }

    pub fn for_game(descriptor: &GameDescriptor) -> Self {
        Self {
            profile: GenerationProfile::for_generation(descriptor.generation),
            key: descriptor.container_key(),
        }
    }

    pub fn profile(&self) -> &GenerationProfile {
        &self.profile
    }

    pub fn generation(&self) -> Generation {
        self.profile.generation
    }

    /// The key room containers are obfuscated with.
    pub fn container_key(&self) -> XorKey {
        self.key
    }

    /// A cursor over container bytes with the container key applied.
    pub fn cursor<'a>(&self, data: &'a [u8]) -> ByteCursor<'a> {
        ByteCursor::with_key(data, self.key)
    }

    pub fn read_room(&self, cursor: &mut ByteCursor, offset: usize) -> Result<Room, DecodeError> {
        match self.profile.layout {
            RoomLayout::Positional => classic::read_room(&self.profile, cursor, offset),
            RoomLayout::Small | RoomLayout::Block => {
                chunked::read_room(&self.profile, cursor, offset)
            }
        }
    }

    pub fn read_script(&self, cursor: &mut ByteCursor, offset: usize) -> Result<Vec<u8>, DecodeError> {
        self.read_blob(cursor, offset, self.profile.script_tag())
    }

    pub fn read_costume(&self, cursor: &mut ByteCursor, offset: usize) -> Result<Vec<u8>, DecodeError> {
        self.read_blob(cursor, offset, self.profile.costume_tag())
    }

    /// The sound track best matching `driver`, or `None` when the resource has no usable track.
    pub fn read_sound(
        &self,
        cursor: &mut ByteCursor,
        driver: AudioDriver,
        offset: usize,
    ) -> Result<Option<Vec<u8>>, DecodeError> {
        match self.profile.layout {
            RoomLayout::Positional => Ok(Some(classic::read_blob(cursor, offset)?)),
            RoomLayout::Small => sound::read_small_sound(cursor, driver, offset),
            RoomLayout::Block => sound::read_block_sound(cursor, driver, offset),
        }
    }

    /// Read a charset stored as its own file (generations 3 and 4).
    pub fn read_charset<S: FileStorage + ?Sized>(
        &self,
        storage: &S,
        descriptor: &GameDescriptor,
        id: u16,
    ) -> Result<Vec<u8>, DecodeError> {
        let name = descriptor
            .charset_file_name(id)
            .ok_or(DecodeError::UnsupportedOperation {
                operation: "reading charset files",
                generation: self.generation(),
            })?;
        let data = storage.read(&name)?;

        match self.generation() {
            Generation::V3 => {
                let mut cursor = ByteCursor::with_key(&data, XorKey::LFL);
                let size = cursor.read_u16()? as usize;
                Ok(cursor.read_bytes(size)?)
            }
            _ => {
                let mut cursor = ByteCursor::new(&data);
                let size = cursor.read_u32()? as usize;
                Ok(cursor.read_bytes(size)?)
            }
        }
    }

    /// Read a `CHAR` chunk from a container (generations 5 to 8).
    pub fn read_charset_chunk(
        &self,
        cursor: &mut ByteCursor,
        offset: usize,
    ) -> Result<Vec<u8>, DecodeError> {
        if self.profile.layout != RoomLayout::Block {
            return Err(DecodeError::UnsupportedOperation {
                operation: "reading charset chunks",
                generation: self.generation(),
            });
        }
        self.read_blob(cursor, offset, Some(tags::CHAR))
    }

    /// Read the room offset directory at the start of a bundle container.
    pub fn read_room_offset_table(
        &self,
        cursor: &mut ByteCursor,
    ) -> Result<BTreeMap<u8, u32>, DecodeError> {
        let (scheme, container, directory) = match self.profile.tag_scheme() {
            Some(scheme) if self.generation().is_bundled() => match scheme {
                TagScheme::Small => (scheme, tags::LE, tags::FO),
                TagScheme::Block => (scheme, tags::LECF, tags::LOFF),
            },
            _ => {
                return Err(DecodeError::UnsupportedOperation {
                    operation: "reading room offset tables",
                    generation: self.generation(),
                })
            }
        };

        let outer = expect_chunk(cursor, scheme, 0, container)?;
        let mut iter = ChunkIterator::over(cursor, scheme, &outer)?;
        let chunk = iter.next_chunk()?;
        let chunk = match chunk {
            Some(chunk) if chunk.tag == directory => chunk,
            Some(chunk) => {
                return Err(DecodeError::malformed(directory, chunk.tag, chunk.offset))
            }
            None => {
                return Err(DecodeError::malformed(directory, "end of data", outer.payload_offset))
            }
        };

        let cursor = iter.cursor();
        cursor.seek(chunk.payload_offset)?;
        let count = cursor.read_u8()?;
        let mut table = BTreeMap::new();
        for _ in 0..count {
            let room = cursor.read_u8()?;
            let offset = cursor.read_u32()?;
            table.insert(room, offset);
        }
        Ok(table)
    }

    fn read_blob(
        &self,
        cursor: &mut ByteCursor,
        offset: usize,
        tag: Option<ChunkTag>,
    ) -> Result<Vec<u8>, DecodeError> {
        match (self.profile.tag_scheme(), tag) {
            (Some(scheme), Some(tag)) => {
                let chunk = expect_chunk(cursor, scheme, offset, tag)?;
                Ok(cursor.read_bytes(chunk.payload_len())?)
            }
            _ => classic::read_blob(cursor, offset),
        }
    }
}

/// Read the chunk header at `offset`, failing unless it carries `tag`.
/// The cursor is left at the chunk payload.
pub fn expect_chunk(
    cursor: &mut ByteCursor,
    scheme: TagScheme,
    offset: usize,
    tag: ChunkTag,
) -> Result<Chunk, DecodeError> {
    cursor.seek(offset)?;
    let chunk = read_chunk_header(cursor, scheme, true)?;
    if chunk.tag != tag {
        return Err(DecodeError::malformed(tag, chunk.tag, offset));
    }
    if chunk.end() > cursor.len() {
        return Err(DecodeError::TruncatedData(CursorError::TruncatedData {
            offset: chunk.payload_offset,
            wanted: chunk.payload_len(),
            available: cursor.len().saturating_sub(chunk.payload_offset),
        }));
    }
    Ok(chunk)
}
