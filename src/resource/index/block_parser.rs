//! Index files of generations 5 to 8: 4-byte tagged blocks.

use binrw::BinRead;

use crate::misc::byte_cursor::{ByteCursor, FixedRecord};
use crate::misc::chunk_iterator::{Chunk, ChunkIterator, TagScheme};
use crate::misc::tag::ChunkTag;
use crate::resource::descriptor::GameDescriptor;
use crate::resource::index::{
    decode_room_name, ArrayDefinition, ElementType, EngineLimits, IndexError, IndexParser,
    OwnerState, ResourceIndex, OWNER_ROOM,
};
use crate::resource::locator::ResourceLocator;
use crate::Generation;

const RNAM: ChunkTag = ChunkTag::block(b"RNAM");
const MAXS: ChunkTag = ChunkTag::block(b"MAXS");
const DROO: ChunkTag = ChunkTag::block(b"DROO");
const DIRR: ChunkTag = ChunkTag::block(b"DIRR");
const DSCR: ChunkTag = ChunkTag::block(b"DSCR");
const DIRS: ChunkTag = ChunkTag::block(b"DIRS");
const DSOU: ChunkTag = ChunkTag::block(b"DSOU");
const DIRN: ChunkTag = ChunkTag::block(b"DIRN");
const DCOS: ChunkTag = ChunkTag::block(b"DCOS");
const DIRC: ChunkTag = ChunkTag::block(b"DIRC");
const DCHR: ChunkTag = ChunkTag::block(b"DCHR");
const DIRF: ChunkTag = ChunkTag::block(b"DIRF");
const DOBJ: ChunkTag = ChunkTag::block(b"DOBJ");
const DIRO: ChunkTag = ChunkTag::block(b"DIRO");
const AARY: ChunkTag = ChunkTag::block(b"AARY");

const ROOM_NAME_LEN: usize = 9;
const WIDE_ROOM_NAME_LEN: usize = 20;
const OBJECT_NAME_LEN: usize = 40;
const CLASS_MASK: u32 = 0x00FF_FFFF;

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct MaxsV5 {
    variables: u16,
    _unknown1: u16,
    bit_variables: u16,
    local_objects: u16,
    _unknown2: u16,
    charsets: u16,
    _unknown3: u16,
    _unknown4: u16,
    inventory: u16,
}

impl FixedRecord for MaxsV5 {
    const SIZE: usize = 18;
}

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct MaxsV6 {
    variables: u16,
    _unknown1: u16,
    bit_variables: u16,
    local_objects: u16,
    arrays: u16,
    _unknown2: u16,
    verbs: u16,
    floating_objects: u16,
    inventory: u16,
    _rooms: u16,
    _scripts: u16,
    _sounds: u16,
    charsets: u16,
    _costumes: u16,
    _global_objects: u16,
}

impl FixedRecord for MaxsV6 {
    const SIZE: usize = 30;
}

/// Preceded by the engine and data file version strings, 50 bytes each.
#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct MaxsV7 {
    #[br(pad_before = 100)]
    variables: u16,
    bit_variables: u16,
    _unknown1: u16,
    _global_objects: u16,
    local_objects: u16,
    new_names: u16,
    verbs: u16,
    floating_objects: u16,
    inventory: u16,
    arrays: u16,
    _rooms: u16,
    _scripts: u16,
    _sounds: u16,
    charsets: u16,
    _costumes: u16,
}

impl FixedRecord for MaxsV7 {
    const SIZE: usize = 130;
}

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
struct MaxsV8 {
    #[br(pad_before = 100)]
    variables: u32,
    bit_variables: u32,
    _unknown1: u32,
    _scripts: u32,
    _sounds: u32,
    charsets: u32,
    _costumes: u32,
    _rooms: u32,
    _unknown2: u32,
    _global_objects: u32,
    _unknown3: u32,
    local_objects: u32,
    new_names: u32,
    floating_objects: u32,
    inventory: u32,
    arrays: u32,
    verbs: u32,
}

impl FixedRecord for MaxsV8 {
    const SIZE: usize = 168;
}

pub struct BlockIndexParser;

impl IndexParser for BlockIndexParser {
    fn parse(data: &[u8], descriptor: &GameDescriptor) -> Result<ResourceIndex, IndexError> {
        let generation = descriptor.generation;
        let mut cursor = ByteCursor::with_key(data, descriptor.index_key());
        let mut index = ResourceIndex::new(generation);

        let chunks = ChunkIterator::new(&mut cursor, TagScheme::Block, data.len()).collect_chunks()?;
        for chunk in chunks {
            cursor.seek(chunk.payload_offset)?;
            match chunk.tag {
                RNAM => read_room_names(&mut cursor, &chunk, generation, &mut index)?,
                MAXS => index.limits = read_limits(&mut cursor, generation)?,
                DROO | DIRR => index.rooms = read_directory(&mut cursor, generation)?,
                DSCR | DIRS => index.scripts = read_directory(&mut cursor, generation)?,
                DSOU | DIRN => index.sounds = read_directory(&mut cursor, generation)?,
                DCOS | DIRC => index.costumes = read_directory(&mut cursor, generation)?,
                DCHR | DIRF => index.charsets = read_directory(&mut cursor, generation)?,
                DOBJ | DIRO => read_objects(&mut cursor, generation, &mut index)?,
                AARY if generation >= Generation::V6 => {
                    index.arrays = read_arrays(&mut cursor, generation)?
                }
                _ => log::trace!("Skipping {} in index at {:#x}", chunk.tag, chunk.offset),
            }
        }
        Ok(index)
    }
}

fn read_room_names(
    cursor: &mut ByteCursor,
    chunk: &Chunk,
    generation: Generation,
    index: &mut ResourceIndex,
) -> Result<(), IndexError> {
    while cursor.position() < chunk.end() {
        if generation == Generation::V8 {
            let room = cursor.read_u16()?;
            if room == 0 {
                break;
            }
            let name = cursor.read_bytes(WIDE_ROOM_NAME_LEN)?;
            match u8::try_from(room) {
                Ok(room) => {
                    let len = name.iter().position(|&b| b == 0).unwrap_or(name.len());
                    let name = String::from_utf8_lossy(&name[..len]).into_owned();
                    index.room_names.insert(room, name);
                }
                Err(_) => log::trace!("Ignoring name of room {}", room),
            }
        } else {
            let room = cursor.read_u8()?;
            if room == 0 {
                break;
            }
            let name = cursor.read_bytes(ROOM_NAME_LEN)?;
            index.room_names.insert(room, decode_room_name(&name));
        }
    }
    Ok(())
}

fn read_limits(cursor: &mut ByteCursor, generation: Generation) -> Result<EngineLimits, IndexError> {
    let mut limits = EngineLimits::for_generation(generation);
    match generation {
        Generation::V5 => {
            let maxs: MaxsV5 = cursor.read_record()?;
            limits.variables = maxs.variables as u32;
            limits.bit_variables = maxs.bit_variables as u32;
            limits.local_objects = maxs.local_objects as u32;
            limits.charsets = maxs.charsets as u32;
            limits.inventory = maxs.inventory as u32;
        }
        Generation::V6 => {
            let maxs: MaxsV6 = cursor.read_record()?;
            limits.variables = maxs.variables as u32;
            limits.bit_variables = maxs.bit_variables as u32;
            limits.local_objects = maxs.local_objects as u32;
            limits.arrays = maxs.arrays as u32;
            limits.verbs = maxs.verbs as u32;
            limits.floating_objects = maxs.floating_objects as u32;
            limits.inventory = maxs.inventory as u32;
            limits.charsets = maxs.charsets as u32;
        }
        Generation::V7 => {
            let maxs: MaxsV7 = cursor.read_record()?;
            limits.variables = maxs.variables as u32;
            limits.bit_variables = maxs.bit_variables as u32;
            limits.local_objects = maxs.local_objects as u32;
            limits.new_names = maxs.new_names as u32;
            limits.verbs = maxs.verbs as u32;
            limits.floating_objects = maxs.floating_objects as u32;
            limits.inventory = maxs.inventory as u32;
            limits.arrays = maxs.arrays as u32;
            limits.charsets = maxs.charsets as u32;
        }
        _ => {
            let maxs: MaxsV8 = cursor.read_record()?;
            limits.variables = maxs.variables;
            limits.bit_variables = maxs.bit_variables;
            limits.charsets = maxs.charsets;
            limits.local_objects = maxs.local_objects;
            limits.new_names = maxs.new_names;
            limits.floating_objects = maxs.floating_objects;
            limits.inventory = maxs.inventory;
            limits.arrays = maxs.arrays;
            limits.verbs = maxs.verbs;
        }
    }
    Ok(limits)
}

fn read_count(cursor: &mut ByteCursor, generation: Generation) -> Result<usize, IndexError> {
    Ok(match generation {
        Generation::V8 => cursor.read_u32()? as usize,
        _ => cursor.read_u16()? as usize,
    })
}

/// A count, the room numbers, then the 32-bit offsets.
fn read_directory(
    cursor: &mut ByteCursor,
    generation: Generation,
) -> Result<Vec<ResourceLocator>, IndexError> {
    let count = read_count(cursor, generation)?;
    let rooms = cursor.read_bytes(count)?;
    rooms
        .into_iter()
        .map(|room| -> Result<ResourceLocator, IndexError> {
            Ok(ResourceLocator::new(room, cursor.read_u32()?))
        })
        .collect()
}

fn read_objects(
    cursor: &mut ByteCursor,
    generation: Generation,
    index: &mut ResourceIndex,
) -> Result<(), IndexError> {
    let count = read_count(cursor, generation)?;
    index.object_owners.clear();
    index.object_states.clear();
    index.object_classes.clear();
    index.object_rooms.clear();

    match generation {
        Generation::V5 | Generation::V6 => {
            for packed in cursor.read_bytes(count)? {
                index.push_owner_state(OwnerState::from_bits(packed));
            }
            for _ in 0..count {
                index.object_classes.push(cursor.read_u32()? & CLASS_MASK);
            }
        }
        Generation::V7 => {
            index.object_states = cursor.read_bytes(count)?;
            index.object_rooms = cursor.read_bytes(count)?;
            for _ in 0..count {
                index.object_classes.push(cursor.read_u32()? & CLASS_MASK);
            }
            index.object_owners = vec![OWNER_ROOM; count];
        }
        _ => {
            for _ in 0..count {
                cursor.skip(OBJECT_NAME_LEN)?;
                index.object_states.push(cursor.read_u8()?);
                index.object_rooms.push(cursor.read_u8()?);
                index.object_classes.push(cursor.read_u32()? & CLASS_MASK);
            }
            index.object_owners = vec![OWNER_ROOM; count];
        }
    }
    Ok(())
}

fn read_arrays(
    cursor: &mut ByteCursor,
    generation: Generation,
) -> Result<Vec<ArrayDefinition>, IndexError> {
    let mut arrays = vec![];
    loop {
        let definition = if generation == Generation::V8 {
            let id = cursor.read_u32()?;
            if id == 0 {
                break;
            }
            let a = cursor.read_u32()?;
            let b = cursor.read_u32()?;
            if b != 0 {
                ArrayDefinition {
                    index: id,
                    element_type: ElementType::Int,
                    dim1: b,
                    dim2: a,
                }
            } else {
                ArrayDefinition {
                    index: id,
                    element_type: ElementType::String,
                    dim1: a,
                    dim2: 0,
                }
            }
        } else {
            let id = cursor.read_u16()?;
            if id == 0 {
                break;
            }
            let dim1 = cursor.read_u16()?;
            let dim2 = cursor.read_u16()?;
            let element_type = ElementType::from(cursor.read_u16()?);
            ArrayDefinition {
                index: id as u32,
                element_type,
                dim1: dim1 as u32,
                dim2: dim2 as u32,
            }
        };
        arrays.push(definition);
    }
    Ok(arrays)
}
