//! Generations 3 to 8: rooms made of tagged chunks.
//!
//! The room chunk's children are dispatched through a table of tag handlers. Tags without a
//! handler are skipped. Generation 8 rooms continue in the `RMSC` chunk that follows `ROOM`.

use crate::misc::byte_cursor::ByteCursor;
use crate::misc::chunk_iterator::{read_chunk_header, Chunk, ChunkIterator, TagScheme};
use crate::misc::tag::ChunkTag;
use crate::resource::decoders::boxes::read_boxes;
use crate::resource::decoders::objects::{
    read_block_code, read_block_image, read_images, read_small_code, ObjectImage, ObjectMerger,
};
use crate::resource::decoders::palette::{
    read_counted_palette, read_fixed_cycles, read_full_palette, read_palette_set,
    read_terminated_cycles,
};
use crate::resource::decoders::records::{RoomHeaderV5, RoomHeaderV7, RoomHeaderV8};
use crate::resource::decoders::{
    expect_chunk, tags, CountWidth, CycleFormat, DecodeError, GenerationProfile, PaletteFormat,
    RoomHeaderFormat, ScaleFormat,
};
use crate::resource::room::{Image, Room, RoomHeader, ScaleSlot, ScriptData};
use crate::Generation;

type Handler = fn(&mut RoomBuilder, &mut ByteCursor, &Chunk) -> Result<(), DecodeError>;

const SMALL_HANDLERS: &[(ChunkTag, Handler)] = &[
    (tags::HD, read_header),
    (tags::CC, read_cycles),
    (tags::PA, read_palette),
    (tags::BX, read_small_boxes),
    (tags::BM, read_bitmap),
    (tags::OI, read_small_object_image),
    (tags::OC, read_small_object_code),
    (tags::LS, read_local_script),
    (tags::EX, read_exit_script),
    (tags::EN, read_entry_script),
];

const BLOCK_HANDLERS: &[(ChunkTag, Handler)] = &[
    (tags::RMHD, read_header),
    (tags::CYCL, read_cycles),
    (tags::TRNS, read_transparency),
    (tags::CLUT, read_palette),
    (tags::PALS, read_palettes),
    (tags::RMIM, read_room_image),
    (tags::OBIM, read_block_object_image),
    (tags::OBCD, read_block_object_code),
    (tags::EXCD, read_exit_script),
    (tags::ENCD, read_entry_script),
    (tags::LSCR, read_local_script),
    (tags::LSC2, read_wide_local_script),
    (tags::BOXD, read_block_boxes),
    (tags::BOXM, read_box_matrix),
    (tags::SCAL, read_scale_slots),
];

struct RoomBuilder {
    profile: GenerationProfile,
    room: Room,
    objects: ObjectMerger,
}

impl RoomBuilder {
    fn new(profile: &GenerationProfile) -> Self {
        Self {
            profile: profile.clone(),
            room: Room::default(),
            objects: ObjectMerger::new(),
        }
    }

    fn walk(
        &mut self,
        cursor: &mut ByteCursor,
        scheme: TagScheme,
        parent: &Chunk,
        handlers: &[(ChunkTag, Handler)],
    ) -> Result<(), DecodeError> {
        let children = ChunkIterator::over(cursor, scheme, parent)?.collect_chunks()?;
        for chunk in children {
            if chunk.end() > parent.end() {
                return Err(DecodeError::malformed(
                    format!("{} inside {} ending at {:#x}", chunk.tag, parent.tag, parent.end()),
                    format!("a chunk ending at {:#x}", chunk.end()),
                    chunk.offset,
                ));
            }
            match handlers.iter().find(|(tag, _)| *tag == chunk.tag) {
                Some((_, handler)) => {
                    cursor.seek(chunk.payload_offset)?;
                    handler(self, cursor, &chunk)?;
                }
                None => log::trace!("Skipping {} in room at {:#x}", chunk.tag, chunk.offset),
            }
        }
        Ok(())
    }

    fn finish(self, size: usize) -> Room {
        Room {
            objects: self.objects.finish(),
            size,
            ..self.room
        }
    }
}

pub fn read_room(
    profile: &GenerationProfile,
    cursor: &mut ByteCursor,
    offset: usize,
) -> Result<Room, DecodeError> {
    let scheme = profile.tag_scheme().ok_or(DecodeError::UnsupportedOperation {
        operation: "reading chunked rooms",
        generation: profile.generation,
    })?;
    let (room_tag, handlers) = match scheme {
        TagScheme::Small => (tags::RO, SMALL_HANDLERS),
        TagScheme::Block => (tags::ROOM, BLOCK_HANDLERS),
    };

    let room_chunk = expect_chunk(cursor, scheme, offset, room_tag)?;
    let mut builder = RoomBuilder::new(profile);
    builder.walk(cursor, scheme, &room_chunk, handlers)?;
    let mut size = room_chunk.size as usize;

    if profile.generation == Generation::V8
        && cursor.len().saturating_sub(room_chunk.end()) >= scheme.header_size()
    {
        cursor.seek(room_chunk.end())?;
        let next = read_chunk_header(cursor, scheme, true)?;
        if next.tag == tags::RMSC {
            let scripts = expect_chunk(cursor, scheme, next.offset, tags::RMSC)?;
            builder.walk(cursor, scheme, &scripts, handlers)?;
            size += scripts.size as usize;
        }
    }

    let room = builder.finish(size);
    log::debug!(
        "Read {} room at {:#x}: {}x{}, {} objects, {} local scripts",
        profile.generation,
        offset,
        room.header.width,
        room.header.height,
        room.objects.len(),
        room.local_scripts.len()
    );
    Ok(room)
}

fn remaining_payload(cursor: &mut ByteCursor, chunk: &Chunk) -> Result<Vec<u8>, DecodeError> {
    let len = chunk.end().saturating_sub(cursor.position());
    Ok(cursor.read_bytes(len)?)
}

/// Script bytes from the cursor to the chunk end, offset from the chunk header.
fn read_script(cursor: &mut ByteCursor, chunk: &Chunk) -> Result<ScriptData, DecodeError> {
    let offset = (cursor.position() - chunk.offset) as u32;
    Ok(ScriptData::with_offset(offset, remaining_payload(cursor, chunk)?))
}

fn read_header(builder: &mut RoomBuilder, cursor: &mut ByteCursor, _: &Chunk) -> Result<(), DecodeError> {
    let header = match builder.profile.room_header {
        RoomHeaderFormat::V7 => {
            let r: RoomHeaderV7 = cursor.read_record()?;
            RoomHeader {
                width: r.width,
                height: r.height,
                object_count: r.object_count,
            }
        }
        RoomHeaderFormat::V8 => {
            let r: RoomHeaderV8 = cursor.read_record()?;
            builder.room.transparent_color = Some(r.transparency as u8);
            RoomHeader {
                width: r.width as u16,
                height: r.height as u16,
                object_count: r.object_count as u16,
            }
        }
        _ => {
            let r: RoomHeaderV5 = cursor.read_record()?;
            RoomHeader {
                width: r.width,
                height: r.height,
                object_count: r.object_count,
            }
        }
    };
    builder.room.header = header;
    Ok(())
}

fn read_cycles(builder: &mut RoomBuilder, cursor: &mut ByteCursor, _: &Chunk) -> Result<(), DecodeError> {
    builder.room.color_cycles = match builder.profile.cycles {
        CycleFormat::Fixed16 => read_fixed_cycles(cursor)?,
        CycleFormat::Terminated => read_terminated_cycles(cursor)?,
        CycleFormat::None => vec![],
    };
    Ok(())
}

fn read_transparency(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    _: &Chunk,
) -> Result<(), DecodeError> {
    builder.room.transparent_color = Some(cursor.read_u16()? as u8);
    Ok(())
}

fn read_palette(builder: &mut RoomBuilder, cursor: &mut ByteCursor, _: &Chunk) -> Result<(), DecodeError> {
    let palette = match builder.profile.palette {
        PaletteFormat::Counted => read_counted_palette(cursor)?,
        _ => read_full_palette(cursor)?,
    };
    builder.room.palettes = vec![palette];
    Ok(())
}

fn read_palettes(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    builder.room.palettes = read_palette_set(cursor, chunk)?;
    Ok(())
}

fn read_bitmap(builder: &mut RoomBuilder, cursor: &mut ByteCursor, chunk: &Chunk) -> Result<(), DecodeError> {
    builder.room.image = Some(Image::new(remaining_payload(cursor, chunk)?));
    Ok(())
}

fn read_room_image(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    builder.room.image = read_images(cursor, chunk)?.into_iter().next();
    Ok(())
}

fn read_small_object_image(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    let id = cursor.read_u16()?;
    let image = Image::new(remaining_payload(cursor, chunk)?);
    builder.objects.add_image(ObjectImage {
        id,
        images: vec![image],
        ..Default::default()
    });
    Ok(())
}

fn read_small_object_code(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    let object = read_small_code(&builder.profile, cursor, chunk)?;
    builder.objects.add_code(object);
    Ok(())
}

fn read_block_object_image(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    let image = read_block_image(&builder.profile, cursor, chunk)?;
    builder.objects.add_image(image);
    Ok(())
}

fn read_block_object_code(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    let object = read_block_code(&builder.profile, cursor, chunk)?;
    builder.objects.add_code(object);
    Ok(())
}

fn read_exit_script(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    builder.room.exit_script = read_script(cursor, chunk)?;
    Ok(())
}

fn read_entry_script(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    builder.room.entry_script = read_script(cursor, chunk)?;
    Ok(())
}

fn read_local_script(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    let id = builder.profile.local_script_id.read(cursor)?;
    let script = read_script(cursor, chunk)?;
    builder.room.local_scripts.insert(id, script);
    Ok(())
}

/// `LSC2` always carries a 32-bit id.
fn read_wide_local_script(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    let id = CountWidth::U32.read(cursor)?;
    let script = read_script(cursor, chunk)?;
    builder.room.local_scripts.insert(id, script);
    Ok(())
}

/// `BX` holds the boxes followed by the box matrix.
fn read_small_boxes(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    builder.room.boxes = read_boxes(cursor, builder.profile.boxes, builder.profile.box_count)?;
    builder.room.box_matrix = remaining_payload(cursor, chunk)?;
    Ok(())
}

fn read_block_boxes(builder: &mut RoomBuilder, cursor: &mut ByteCursor, _: &Chunk) -> Result<(), DecodeError> {
    builder.room.boxes = read_boxes(cursor, builder.profile.boxes, builder.profile.box_count)?;
    Ok(())
}

fn read_box_matrix(
    builder: &mut RoomBuilder,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<(), DecodeError> {
    builder.room.box_matrix = remaining_payload(cursor, chunk)?;
    Ok(())
}

fn read_scale_slots(builder: &mut RoomBuilder, cursor: &mut ByteCursor, _: &Chunk) -> Result<(), DecodeError> {
    let mut value = || -> Result<u32, DecodeError> {
        Ok(match builder.profile.scale {
            ScaleFormat::Long => cursor.read_u32()?,
            _ => cursor.read_u16()? as u32,
        })
    };
    let mut slots = Vec::with_capacity(4);
    for _ in 0..4 {
        slots.push(ScaleSlot {
            scale1: value()?,
            y1: value()?,
            scale2: value()?,
            y2: value()?,
        });
    }
    builder.room.scale_slots = slots;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::misc::byte_writer::ByteWriter;
    use crate::resource::decoders::FormatDecoder;

    fn rmhd(width: u16, height: u16, objects: u16) -> Vec<u8> {
        [width, height, objects].iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_v5_room_end_to_end() -> Result<(), DecodeError> {
        let mut writer = ByteWriter::new();
        let room = writer.begin_chunk(TagScheme::Block, tags::ROOM);
        writer.write_chunk(TagScheme::Block, tags::RMHD, &rmhd(320, 200, 0));
        writer.write_chunk(TagScheme::Block, ChunkTag::block(b"XXXX"), &[0; 3]);
        writer.write_chunk(TagScheme::Block, tags::EXCD, &[1, 2, 3, 4]);
        writer.write_chunk(TagScheme::Block, tags::ENCD, &[5, 6, 7, 8]);
        writer.end_chunk(room);
        let data = writer.into_bytes();

        let decoder = FormatDecoder::for_generation(Generation::V5);
        let room = decoder.read_room(&mut ByteCursor::new(&data), 0)?;
        assert_eq!(room.header.width, 320);
        assert_eq!(room.header.height, 200);
        assert_eq!(room.header.object_count, 0);
        assert_eq!(room.exit_script.data, vec![1, 2, 3, 4]);
        assert_eq!(room.entry_script.data, vec![5, 6, 7, 8]);
        assert!(room.objects.is_empty());
        assert_eq!(room.size, data.len());
        Ok(())
    }

    #[test]
    fn test_v3_room_merges_objects() -> Result<(), DecodeError> {
        let mut code = vec![];
        code.extend(9u16.to_le_bytes());
        code.extend([0, 2, 3, 4, 0]);
        code.extend(12i16.to_le_bytes());
        code.extend(40i16.to_le_bytes());
        code.push(0x20 | 1); // height 32, dir 1
        code.push(0); // no name
        code.extend([0x0F, 0x20, 0x00, 0x00]);
        code.extend([0xC0, 0xC1]);

        let mut oi = 9u16.to_le_bytes().to_vec();
        oi.extend([0xAB; 6]);

        let mut writer = ByteWriter::new();
        let room = writer.begin_chunk(TagScheme::Small, tags::RO);
        writer.write_chunk(TagScheme::Small, tags::HD, &rmhd(320, 144, 1));
        writer.write_chunk(TagScheme::Small, tags::BX, &[1, 10, 50, 4, 12, 2, 20, 0, 0, 0]);
        writer.write_chunk(TagScheme::Small, tags::OI, &oi);
        writer.write_chunk(TagScheme::Small, tags::NL, &[0]);
        writer.write_chunk(TagScheme::Small, tags::OC, &code);
        writer.write_chunk(TagScheme::Small, tags::LS, &[200, 0x11, 0x22]);
        writer.end_chunk(room);
        let data = writer.into_bytes();

        let profile = GenerationProfile::for_generation(Generation::V3);
        let room = read_room(&profile, &mut ByteCursor::new(&data), 0)?;
        assert_eq!(room.header.height, 144);
        assert_eq!(room.boxes.len(), 1);
        assert_eq!(room.box_matrix, vec![0]);
        assert_eq!(room.local_script(200).map(|s| s.data.clone()), Some(vec![0x11, 0x22]));

        let object = room.object(9).expect("object 9");
        assert_eq!((object.x, object.y, object.width, object.height), (16, 24, 32, 32));
        assert_eq!(object.verbs.get(&0x0F), Some(&0x20));
        assert_eq!(object.images[0].data, vec![0xAB; 6]);
        // OC header (6) + fixed fields (13) + verb table (4)
        assert_eq!(object.script.offset, 23);
        assert_eq!(object.script.data, vec![0xC0, 0xC1]);
        Ok(())
    }

    #[test]
    fn test_v8_room_continues_into_rmsc() -> Result<(), DecodeError> {
        let mut header = vec![];
        for value in [8u32, 640, 480, 0, 1, 5] {
            header.extend(value.to_le_bytes());
        }

        let mut writer = ByteWriter::new();
        let room = writer.begin_chunk(TagScheme::Block, tags::ROOM);
        writer.write_chunk(TagScheme::Block, tags::RMHD, &header);
        writer.end_chunk(room);
        let rmsc = writer.begin_chunk(TagScheme::Block, tags::RMSC);
        writer.write_chunk(TagScheme::Block, tags::ENCD, &[0x33]);
        let mut lscr = 2000u32.to_le_bytes().to_vec();
        lscr.push(0x44);
        writer.write_chunk(TagScheme::Block, tags::LSCR, &lscr);
        writer.end_chunk(rmsc);
        let data = writer.into_bytes();

        let profile = GenerationProfile::for_generation(Generation::V8);
        let room = read_room(&profile, &mut ByteCursor::new(&data), 0)?;
        assert_eq!((room.header.width, room.header.height), (640, 480));
        assert_eq!(room.transparent_color, Some(5));
        assert_eq!(room.entry_script.data, vec![0x33]);
        assert_eq!(room.local_script(2000).map(|s| s.data.clone()), Some(vec![0x44]));
        assert_eq!(room.size, data.len());
        Ok(())
    }
}
