//! Builds a small generation 5 game in memory: an index file and one disk holding two rooms.
#![allow(dead_code)]

use scumm_rs::encryption::xor::XorKey;
use scumm_rs::misc::byte_writer::ByteWriter;
use scumm_rs::misc::chunk_iterator::TagScheme;
use scumm_rs::misc::tag::ChunkTag;
use scumm_rs::resource::decoders::tags;
use scumm_rs::resource::descriptor::{GameDescriptor, GameId};
use scumm_rs::resource::storage::MemoryStorage;
use scumm_rs::Generation;

pub const SCRIPT_SIZE: usize = 100;
/// Scripts 1 to 5 and 7 are readable, script 6 is not a script chunk.
pub const BROKEN_SCRIPT: u16 = 6;
pub const ROOM_TWO_SCRIPT: u16 = 7;
pub const ABSENT_SCRIPT: u16 = 8;

const LFLF: ChunkTag = ChunkTag::block(b"LFLF");

pub fn descriptor() -> GameDescriptor {
    GameDescriptor::new(GameId::Monkey, "monkey", Generation::V5)
}

fn write_room(writer: &mut ByteWriter, width: u16) {
    let room = writer.begin_chunk(TagScheme::Block, tags::ROOM);
    let header: Vec<u8> = [width, 200, 0].iter().flat_map(|v| v.to_le_bytes()).collect();
    writer.write_chunk(TagScheme::Block, tags::RMHD, &header);
    writer.write_chunk(TagScheme::Block, tags::EXCD, &[1, 2, 3, 4]);
    writer.write_chunk(TagScheme::Block, tags::ENCD, &[5, 6, 7, 8]);
    writer.end_chunk(room);
}

fn write_directory(writer: &mut ByteWriter, tag: &[u8; 4], entries: &[(u8, u32)]) {
    let mark = writer.begin_chunk(TagScheme::Block, ChunkTag::block(tag));
    writer.write_u16(entries.len() as u16);
    for (room, _) in entries {
        writer.write_u8(*room);
    }
    for (_, offset) in entries {
        writer.write_u32(*offset);
    }
    writer.end_chunk(mark);
}

/// Directory entries are `(room, offset relative to the room)`.
struct Directories {
    scripts: Vec<(u8, u32)>,
    costumes: Vec<(u8, u32)>,
    sounds: Vec<(u8, u32)>,
    charsets: Vec<(u8, u32)>,
}

pub fn container() -> (Vec<u8>, Vec<u8>) {
    let mut writer = ByteWriter::with_key(XorKey::BUNDLE);
    let mut dirs = Directories {
        scripts: vec![(0, 0)],
        costumes: vec![(0, 0)],
        sounds: vec![(0, 0)],
        charsets: vec![(0, 0)],
    };

    let lecf = writer.begin_chunk(TagScheme::Block, tags::LECF);
    let loff = writer.begin_chunk(TagScheme::Block, tags::LOFF);
    writer.write_u8(2);
    writer.write_u8(1);
    let room_one_slot = writer.position();
    writer.write_u32(0);
    writer.write_u8(2);
    let room_two_slot = writer.position();
    writer.write_u32(0);
    writer.end_chunk(loff);

    let lflf = writer.begin_chunk(TagScheme::Block, LFLF);
    let room_one = writer.position();
    writer.patch_u32(room_one_slot, room_one as u32);
    write_room(&mut writer, 320);
    for id in 1..=5u8 {
        dirs.scripts.push((1, (writer.position() - room_one) as u32));
        writer.write_chunk(TagScheme::Block, tags::SCRP, &[id; SCRIPT_SIZE]);
    }
    dirs.scripts.push((1, (writer.position() - room_one) as u32));
    writer.write_chunk(TagScheme::Block, ChunkTag::block(b"XXXX"), &[0; 4]);

    dirs.costumes.push((1, (writer.position() - room_one) as u32));
    writer.write_chunk(TagScheme::Block, tags::COST, &[0xC0; 50]);

    dirs.sounds.push((1, (writer.position() - room_one) as u32));
    let soun = writer.begin_chunk(TagScheme::Block, tags::SOUN);
    writer.write_chunk(TagScheme::Block, tags::SPK, &[0x5B; 10]);
    writer.write_chunk(TagScheme::Block, tags::ADL, &[0xAD; 20]);
    writer.end_chunk(soun);

    dirs.charsets.push((1, (writer.position() - room_one) as u32));
    writer.write_chunk(TagScheme::Block, tags::CHAR, &[0xC5; 12]);
    writer.end_chunk(lflf);

    let lflf = writer.begin_chunk(TagScheme::Block, LFLF);
    let room_two = writer.position();
    writer.patch_u32(room_two_slot, room_two as u32);
    write_room(&mut writer, 640);
    dirs.scripts.push((2, (writer.position() - room_two) as u32));
    writer.write_chunk(TagScheme::Block, tags::SCRP, &[7; SCRIPT_SIZE]);
    writer.end_chunk(lflf);
    writer.end_chunk(lecf);

    // script 8 is listed as absent
    dirs.scripts.push((0, 0xFFFF_FFFF));

    let container = writer.into_bytes();
    (index(&dirs), container)
}

fn index(dirs: &Directories) -> Vec<u8> {
    let mut writer = ByteWriter::with_key(XorKey::BUNDLE);
    let mut rnam = vec![1];
    rnam.extend(b"beach\0\0\0\0".iter().map(|b| b ^ 0xFF));
    rnam.push(0);
    writer.write_chunk(TagScheme::Block, ChunkTag::block(b"RNAM"), &rnam);

    let maxs = writer.begin_chunk(TagScheme::Block, ChunkTag::block(b"MAXS"));
    for value in [800u16, 0, 2048, 200, 0, 9, 0, 0, 80] {
        writer.write_u16(value);
    }
    writer.end_chunk(maxs);

    write_directory(&mut writer, b"DROO", &[(0, 0), (1, 0), (1, 0)]);
    write_directory(&mut writer, b"DSCR", &dirs.scripts);
    write_directory(&mut writer, b"DSOU", &dirs.sounds);
    write_directory(&mut writer, b"DCOS", &dirs.costumes);
    write_directory(&mut writer, b"DCHR", &dirs.charsets);

    let dobj = writer.begin_chunk(TagScheme::Block, ChunkTag::block(b"DOBJ"));
    writer.write_u16(2);
    writer.write_bytes(&[0x0F, 0x21]);
    writer.write_u32(0);
    writer.write_u32(0x80_0002);
    writer.end_chunk(dobj);
    writer.into_bytes()
}

pub fn storage() -> MemoryStorage {
    let (index, container) = container();
    MemoryStorage::new()
        .with_file("MONKEY.000", index)
        .with_file("MONKEY.001", container)
}

/// A generation 4 game: `000.LFL` and one disk whose `LE`/`FO` bundle holds room 1 and script 1.
pub fn small_bundle() -> (GameDescriptor, MemoryStorage) {
    let mut disk = ByteWriter::with_key(XorKey::BUNDLE);
    let le = disk.begin_chunk(TagScheme::Small, tags::LE);
    let fo = disk.begin_chunk(TagScheme::Small, tags::FO);
    disk.write_u8(1);
    disk.write_u8(1);
    let room_slot = disk.position();
    disk.write_u32(0);
    disk.end_chunk(fo);

    let room_start = disk.position();
    disk.patch_u32(room_slot, room_start as u32);
    let ro = disk.begin_chunk(TagScheme::Small, tags::RO);
    let header: Vec<u8> = [320u16, 144, 0].iter().flat_map(|v| v.to_le_bytes()).collect();
    disk.write_chunk(TagScheme::Small, tags::HD, &header);
    disk.write_chunk(TagScheme::Small, tags::EX, &[1, 2]);
    disk.write_chunk(TagScheme::Small, tags::EN, &[3]);
    disk.end_chunk(ro);
    let script_offset = (disk.position() - room_start) as u32;
    disk.write_chunk(TagScheme::Small, tags::SC, &[9; SCRIPT_SIZE]);
    disk.end_chunk(le);

    let mut index = ByteWriter::with_key(XorKey::LFL);
    for (tag, entries) in [
        (b"0R", [(0u8, 0u32), (1, 0)]),
        (b"0S", [(0, 0), (1, script_offset)]),
    ] {
        let mark = index.begin_chunk(TagScheme::Small, ChunkTag::small(tag));
        index.write_u16(entries.len() as u16);
        for (room, offset) in entries {
            index.write_u8(room);
            index.write_u32(offset);
        }
        index.end_chunk(mark);
    }

    let descriptor = GameDescriptor::new(GameId::Loom, "loom", Generation::V4);
    let storage = MemoryStorage::new()
        .with_file("000.LFL", index.into_bytes())
        .with_file("DISK01.LEC", disk.into_bytes());
    (descriptor, storage)
}
