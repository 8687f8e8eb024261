//! The per-game index file: where every room, script, sound, costume and charset lives, plus the
//! global object tables, array definitions and engine limits.

use std::collections::BTreeMap;

use bitfield_struct::bitfield;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::misc::byte_cursor::CursorError;
use crate::resource::descriptor::{GameDescriptor, GameId, Platform};
use crate::resource::index::block_parser::BlockIndexParser;
use crate::resource::index::classic_parser::ClassicIndexParser;
use crate::resource::index::small_parser::SmallIndexParser;
use crate::resource::locator::{ResourceClass, ResourceLocator};
use crate::resource::storage::{FileStorage, StorageError};
use crate::Generation;

pub mod block_parser;
pub mod classic_parser;
pub mod small_parser;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index files of generation {generation} on {platform:?} are not supported")]
    UnsupportedFormat {
        generation: Generation,
        platform: Platform,
    },

    #[error("Invalid index signature: expected {expected}, found {actual}")]
    InvalidSignature { expected: String, actual: String },

    #[error("No resource counts are known for {0:?}")]
    UnknownGame(GameId),

    #[error("Truncated index: {0}")]
    TruncatedData(CursorError),

    #[error("Malformed index at offset {offset:#x}: {message}")]
    MalformedIndex { offset: usize, message: String },

    #[error("Parsing error at offset {offset:#x}: {message}")]
    ParsingError { offset: usize, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CursorError> for IndexError {
    fn from(e: CursorError) -> Self {
        match e {
            CursorError::TruncatedData { .. } => IndexError::TruncatedData(e),
            CursorError::InvalidRecord { offset, message } => {
                IndexError::ParsingError { offset, message }
            }
            CursorError::InvalidChunkSize {
                offset,
                size,
                header_size,
            } => IndexError::MalformedIndex {
                offset,
                message: format!("chunk size {} is smaller than its {} byte header", size, header_size),
            },
        }
    }
}

pub trait IndexParser {
    fn parse(data: &[u8], descriptor: &GameDescriptor) -> Result<ResourceIndex, IndexError>;
}

/// One byte of the global object table in generations 0 to 6.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct OwnerState {
    #[bits(4)]
    pub owner: u8,
    #[bits(4)]
    pub state: u8,
}

/// Owner of objects that sit in a room rather than in an actor's inventory.
pub const OWNER_ROOM: u8 = 0x0F;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementType {
    Bit,
    Nibble,
    Byte,
    String,
    Int,
    Dword,
    Other(u16),
}

impl From<u16> for ElementType {
    fn from(value: u16) -> Self {
        match value {
            1 => ElementType::Bit,
            2 => ElementType::Nibble,
            3 => ElementType::Byte,
            4 => ElementType::String,
            5 => ElementType::Int,
            6 => ElementType::Dword,
            other => ElementType::Other(other),
        }
    }
}

/// An array variable the engine allocates at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrayDefinition {
    pub index: u32,
    pub element_type: ElementType,
    pub dim1: u32,
    pub dim2: u32,
}

/// Table sizes the interpreter allocates. Generations 5 and later read them from `MAXS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineLimits {
    pub verbs: u32,
    pub inventory: u32,
    pub variables: u32,
    pub bit_variables: u32,
    pub local_objects: u32,
    pub arrays: u32,
    pub global_scripts: u32,
    pub charsets: u32,
    pub new_names: u32,
    pub floating_objects: u32,
}

impl EngineLimits {
    pub fn for_generation(generation: Generation) -> Self {
        use Generation::*;

        Self {
            verbs: 100,
            inventory: 80,
            variables: 800,
            bit_variables: 4096,
            local_objects: 200,
            arrays: match generation {
                V0 | V1 | V2 => 0,
                _ => 50,
            },
            global_scripts: match generation {
                V7 | V8 => 2000,
                _ => 200,
            },
            charsets: 9,
            new_names: match generation {
                V5 => 150,
                _ => 50,
            },
            floating_objects: match generation {
                V6 | V7 | V8 => 50,
                _ => 0,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceIndex {
    pub generation: Generation,
    /// For bundled generations the room number column holds the disk number.
    pub rooms: Vec<ResourceLocator>,
    pub scripts: Vec<ResourceLocator>,
    pub sounds: Vec<ResourceLocator>,
    pub costumes: Vec<ResourceLocator>,
    pub charsets: Vec<ResourceLocator>,
    pub room_names: BTreeMap<u8, String>,
    pub object_owners: Vec<u8>,
    pub object_states: Vec<u8>,
    /// 24-bit class masks.
    pub object_classes: Vec<u32>,
    /// Room of each global object, generations 7 and 8 only.
    pub object_rooms: Vec<u8>,
    pub arrays: Vec<ArrayDefinition>,
    pub limits: EngineLimits,
}

impl ResourceIndex {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            rooms: vec![],
            scripts: vec![],
            sounds: vec![],
            costumes: vec![],
            charsets: vec![],
            room_names: BTreeMap::new(),
            object_owners: vec![],
            object_states: vec![],
            object_classes: vec![],
            object_rooms: vec![],
            arrays: vec![],
            limits: EngineLimits::for_generation(generation),
        }
    }

    /// Read and parse the index file named by `descriptor`.
    pub fn load<S: FileStorage + ?Sized>(
        storage: &S,
        descriptor: &GameDescriptor,
    ) -> Result<Self, IndexError> {
        if descriptor.platform == Platform::Nes {
            return Err(IndexError::UnsupportedFormat {
                generation: descriptor.generation,
                platform: descriptor.platform,
            });
        }

        let data = storage.read(&descriptor.index_file)?;
        let index = match descriptor.generation {
            Generation::V0 | Generation::V1 | Generation::V2 => {
                ClassicIndexParser::parse(&data, descriptor)?
            }
            Generation::V3 | Generation::V4 => SmallIndexParser::parse(&data, descriptor)?,
            _ => BlockIndexParser::parse(&data, descriptor)?,
        };
        log::debug!(
            "Loaded {} index {}: {} rooms, {} scripts, {} sounds, {} costumes, {} objects",
            index.generation,
            descriptor.index_file,
            index.rooms.len(),
            index.scripts.len(),
            index.sounds.len(),
            index.costumes.len(),
            index.object_owners.len()
        );
        Ok(index)
    }

    pub fn directory(&self, class: ResourceClass) -> &[ResourceLocator] {
        match class {
            ResourceClass::Room => &self.rooms,
            ResourceClass::Script => &self.scripts,
            ResourceClass::Costume => &self.costumes,
            ResourceClass::Sound => &self.sounds,
            ResourceClass::Charset => &self.charsets,
        }
    }

    /// The locator of a resource, `None` when the directory has no usable entry for it.
    pub fn locator(&self, class: ResourceClass, id: u16) -> Option<ResourceLocator> {
        self.directory(class)
            .get(id as usize)
            .copied()
            .filter(|locator| !locator.is_absent())
    }

    pub fn room_name(&self, room: u8) -> Option<&str> {
        self.room_names.get(&room).map(String::as_str)
    }

    pub fn object_owner(&self, id: u16) -> Option<u8> {
        self.object_owners.get(id as usize).copied()
    }

    pub fn object_state(&self, id: u16) -> Option<u8> {
        self.object_states.get(id as usize).copied()
    }

    pub fn object_class(&self, id: u16) -> Option<u32> {
        self.object_classes.get(id as usize).copied()
    }

    fn push_owner_state(&mut self, packed: OwnerState) {
        self.object_owners.push(packed.owner());
        self.object_states.push(packed.state());
    }
}

/// Decode a fixed-width room name stored with every byte inverted.
fn decode_room_name(bytes: &[u8]) -> String {
    let name: Vec<u8> = bytes
        .iter()
        .map(|b| b ^ 0xFF)
        .take_while(|&b| b != 0)
        .collect();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::storage::MemoryStorage;

    #[test]
    fn test_owner_state_nibbles() {
        let packed = OwnerState::from_bits(0x3F);
        assert_eq!(packed.owner(), 0x0F);
        assert_eq!(packed.state(), 0x03);
    }

    #[test]
    fn test_array_element_types() {
        assert_eq!(ElementType::from(1), ElementType::Bit);
        assert_eq!(ElementType::from(5), ElementType::Int);
        assert_eq!(ElementType::from(9), ElementType::Other(9));
    }

    #[test]
    fn test_locator_lookup_skips_absent_entries() {
        let mut index = ResourceIndex::new(Generation::V5);
        index.scripts = vec![
            ResourceLocator::ABSENT,
            ResourceLocator::new(2, 0x40),
            ResourceLocator::new(0, 0x80),
        ];
        assert_eq!(index.locator(ResourceClass::Script, 1), Some(ResourceLocator::new(2, 0x40)));
        assert_eq!(index.locator(ResourceClass::Script, 2), None);
        assert_eq!(index.locator(ResourceClass::Script, 7), None);
        assert_eq!(index.locator(ResourceClass::Sound, 1), None);
    }

    #[test]
    fn test_nes_is_unsupported() {
        let storage = MemoryStorage::new().with_file("00.LFL", vec![0; 4]);
        let descriptor = GameDescriptor::new(GameId::Maniac, "maniac", Generation::V1)
            .with_platform(Platform::Nes);
        assert!(matches!(
            ResourceIndex::load(&storage, &descriptor),
            Err(IndexError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_room_names_are_inverted() {
        let mut bytes = [0xFFu8; 9];
        for (slot, c) in bytes.iter_mut().zip(b"beach") {
            *slot = c ^ 0xFF;
        }
        assert_eq!(decode_room_name(&bytes), "beach");
    }
}
