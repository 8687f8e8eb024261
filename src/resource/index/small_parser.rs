//! Index files of generations 3 and 4: 2-byte tagged blocks in an inverted file.

use crate::misc::byte_cursor::ByteCursor;
use crate::misc::chunk_iterator::{ChunkIterator, TagScheme};
use crate::misc::tag::ChunkTag;
use crate::resource::descriptor::GameDescriptor;
use crate::resource::index::{decode_room_name, IndexError, IndexParser, OwnerState, ResourceIndex};
use crate::resource::locator::ResourceLocator;

const RN: ChunkTag = ChunkTag::small(b"RN");
const ROOMS: ChunkTag = ChunkTag::small(b"0R");
const SCRIPTS: ChunkTag = ChunkTag::small(b"0S");
const SOUNDS: ChunkTag = ChunkTag::small(b"0N");
const COSTUMES: ChunkTag = ChunkTag::small(b"0C");
const OBJECTS: ChunkTag = ChunkTag::small(b"0O");

const ROOM_NAME_LEN: usize = 9;

pub struct SmallIndexParser;

impl IndexParser for SmallIndexParser {
    fn parse(data: &[u8], descriptor: &GameDescriptor) -> Result<ResourceIndex, IndexError> {
        let mut cursor = ByteCursor::with_key(data, descriptor.index_key());
        let mut index = ResourceIndex::new(descriptor.generation);

        let chunks = ChunkIterator::new(&mut cursor, TagScheme::Small, data.len()).collect_chunks()?;
        for chunk in chunks {
            cursor.seek(chunk.payload_offset)?;
            match chunk.tag {
                RN => {
                    while cursor.position() < chunk.end() {
                        let room = cursor.read_u8()?;
                        if room == 0 {
                            break;
                        }
                        let name = cursor.read_bytes(ROOM_NAME_LEN)?;
                        index.room_names.insert(room, decode_room_name(&name));
                    }
                }
                ROOMS => index.rooms = read_directory(&mut cursor)?,
                SCRIPTS => index.scripts = read_directory(&mut cursor)?,
                SOUNDS => index.sounds = read_directory(&mut cursor)?,
                COSTUMES => index.costumes = read_directory(&mut cursor)?,
                OBJECTS => {
                    let count = cursor.read_u16()?;
                    for _ in 0..count {
                        index.object_classes.push(cursor.read_u24()?);
                        index.push_owner_state(OwnerState::from_bits(cursor.read_u8()?));
                    }
                }
                _ => log::trace!("Skipping {} in index at {:#x}", chunk.tag, chunk.offset),
            }
        }
        Ok(index)
    }
}

/// A count followed by interleaved room numbers and 32-bit offsets.
fn read_directory(cursor: &mut ByteCursor) -> Result<Vec<ResourceLocator>, IndexError> {
    let count = cursor.read_u16()?;
    (0..count)
        .map(|_| -> Result<ResourceLocator, IndexError> {
            let room = cursor.read_u8()?;
            Ok(ResourceLocator::new(room, cursor.read_u32()?))
        })
        .collect()
}
