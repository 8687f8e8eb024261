//! Index files of generations 0 to 2 (`00.LFL`).
//!
//! Two layouts exist, told apart by the leading magic: the classic one leaves the table sizes to
//! the engine, the enhanced one stores a count in front of every table.

use crate::misc::byte_cursor::ByteCursor;
use crate::resource::descriptor::{GameDescriptor, GameId};
use crate::resource::index::{IndexError, IndexParser, OwnerState, ResourceIndex};
use crate::resource::locator::ResourceLocator;
use crate::Generation;

const CLASSIC_MAGIC: u16 = 0x0A31;
const ENHANCED_MAGIC: u16 = 0x0100;

/// Table sizes of the classic layout, which only the engine knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TableSizes {
    objects: usize,
    rooms: usize,
    costumes: usize,
    scripts: usize,
    sounds: usize,
}

fn classic_table_sizes(descriptor: &GameDescriptor) -> Result<TableSizes, IndexError> {
    let (objects, rooms, costumes, scripts, sounds) = match (descriptor.game_id, descriptor.generation) {
        (GameId::Maniac, Generation::V0) => (256, 55, 25, 160, 70),
        (GameId::Maniac, _) => (800, 55, 35, 200, 100),
        (GameId::Zak, _) => (800, 61, 37, 155, 120),
        (other, _) => return Err(IndexError::UnknownGame(other)),
    };
    Ok(TableSizes {
        objects,
        rooms,
        costumes,
        scripts,
        sounds,
    })
}

pub struct ClassicIndexParser;

impl IndexParser for ClassicIndexParser {
    fn parse(data: &[u8], descriptor: &GameDescriptor) -> Result<ResourceIndex, IndexError> {
        let mut cursor = ByteCursor::with_key(data, descriptor.index_key());
        let mut index = ResourceIndex::new(descriptor.generation);

        match cursor.read_u16()? {
            CLASSIC_MAGIC => {
                let sizes = classic_table_sizes(descriptor)?;
                read_objects(&mut cursor, &mut index, sizes.objects)?;
                index.rooms = read_directory(&mut cursor, sizes.rooms)?;
                index.costumes = read_directory(&mut cursor, sizes.costumes)?;
                index.scripts = read_directory(&mut cursor, sizes.scripts)?;
                index.sounds = read_directory(&mut cursor, sizes.sounds)?;
            }
            ENHANCED_MAGIC => {
                let objects = cursor.read_u16()? as usize;
                read_objects(&mut cursor, &mut index, objects)?;
                let rooms = cursor.read_u8()? as usize;
                index.rooms = read_directory(&mut cursor, rooms)?;
                let costumes = cursor.read_u8()? as usize;
                index.costumes = read_directory(&mut cursor, costumes)?;
                let scripts = cursor.read_u8()? as usize;
                index.scripts = read_directory(&mut cursor, scripts)?;
                let sounds = cursor.read_u8()? as usize;
                index.sounds = read_directory(&mut cursor, sounds)?;
            }
            other => {
                return Err(IndexError::InvalidSignature {
                    expected: format!("{:#06x} or {:#06x}", CLASSIC_MAGIC, ENHANCED_MAGIC),
                    actual: format!("{:#06x}", other),
                })
            }
        }
        Ok(index)
    }
}

fn read_objects(
    cursor: &mut ByteCursor,
    index: &mut ResourceIndex,
    count: usize,
) -> Result<(), IndexError> {
    for packed in cursor.read_bytes(count)? {
        index.push_owner_state(OwnerState::from_bits(packed));
    }
    index.object_classes = vec![0; count];
    Ok(())
}

/// `count` room bytes followed by `count` 16-bit offsets.
fn read_directory(cursor: &mut ByteCursor, count: usize) -> Result<Vec<ResourceLocator>, IndexError> {
    let rooms = cursor.read_bytes(count)?;
    rooms
        .into_iter()
        .map(|room| -> Result<ResourceLocator, IndexError> {
            Ok(ResourceLocator::from_short_offset(room, cursor.read_u16()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::xor::XorKey;
    use crate::misc::byte_writer::ByteWriter;
    use crate::resource::locator::ResourceClass;

    fn write_directory(writer: &mut ByteWriter, entries: &[(u8, u16)]) {
        for (room, _) in entries {
            writer.write_u8(*room);
        }
        for (_, offset) in entries {
            writer.write_u16(*offset);
        }
    }

    #[test]
    fn test_enhanced_index() -> Result<(), IndexError> {
        let mut writer = ByteWriter::with_key(XorKey::LFL);
        writer.write_u16(ENHANCED_MAGIC);
        writer.write_u16(2);
        writer.write_bytes(&[0x1F, 0x02]);
        writer.write_u8(2);
        write_directory(&mut writer, &[(0, 0xFFFF), (1, 0)]);
        writer.write_u8(1);
        write_directory(&mut writer, &[(3, 0x120)]);
        writer.write_u8(2);
        write_directory(&mut writer, &[(0, 0xFFFF), (5, 0x40)]);
        writer.write_u8(0);
        let data = writer.into_bytes();

        let descriptor = GameDescriptor::new(GameId::Zak, "zak", Generation::V2);
        let index = ClassicIndexParser::parse(&data, &descriptor)?;
        assert_eq!(index.object_owners, vec![0x0F, 0x02]);
        assert_eq!(index.object_states, vec![0x01, 0x00]);
        assert_eq!(index.rooms.len(), 2);
        assert_eq!(index.locator(ResourceClass::Costume, 0), Some(ResourceLocator::new(3, 0x120)));
        assert_eq!(index.locator(ResourceClass::Script, 0), None);
        assert_eq!(index.locator(ResourceClass::Script, 1), Some(ResourceLocator::new(5, 0x40)));
        assert!(index.sounds.is_empty());
        Ok(())
    }

    #[test]
    fn test_classic_index_uses_game_table_sizes() -> Result<(), IndexError> {
        let mut writer = ByteWriter::with_key(XorKey::LFL);
        writer.write_u16(CLASSIC_MAGIC);
        writer.write_bytes(&[0; 800]);
        for count in [55usize, 35, 200, 100] {
            let entries = vec![(1u8, 0x10u16); count];
            write_directory(&mut writer, &entries);
        }
        let data = writer.into_bytes();

        let descriptor = GameDescriptor::new(GameId::Maniac, "maniac", Generation::V1);
        let index = ClassicIndexParser::parse(&data, &descriptor)?;
        assert_eq!(index.object_owners.len(), 800);
        assert_eq!(index.rooms.len(), 55);
        assert_eq!(index.costumes.len(), 35);
        assert_eq!(index.scripts.len(), 200);
        assert_eq!(index.sounds.len(), 100);

        let unknown = GameDescriptor::new(GameId::Indy3, "indy3", Generation::V2);
        assert!(matches!(
            ClassicIndexParser::parse(&data, &unknown),
            Err(IndexError::UnknownGame(GameId::Indy3))
        ));
        Ok(())
    }

    #[test]
    fn test_bad_magic_is_invalid_signature() {
        let mut writer = ByteWriter::with_key(XorKey::LFL);
        writer.write_u16(0x1234);
        let data = writer.into_bytes();
        let descriptor = GameDescriptor::new(GameId::Zak, "zak", Generation::V2);
        match ClassicIndexParser::parse(&data, &descriptor) {
            Err(IndexError::InvalidSignature { actual, .. }) => assert_eq!(actual, "0x1234"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
