//! Generations 0 to 2: rooms without chunk tags, where every field sits at a fixed offset from the
//! start of the room file.

use itertools::Itertools;

use crate::misc::byte_cursor::ByteCursor;
use crate::resource::decoders::boxes::{read_boxes, triangular_matrix_len};
use crate::resource::decoders::objects::read_code_tail;
use crate::resource::decoders::records::{DirHeight, PackedY};
use crate::resource::decoders::{rle, BoxFormat, CodeHeaderFormat, CountWidth, DecodeError, GenerationProfile};
use crate::resource::room::{Image, ObjectData, Room, RoomHeader, ScriptData, TileGraphics};

const ROOM_HEADER_SIZE: usize = 28;
const TILE_CHARSET_SIZE: usize = 2048;
const BLOB_HEADER_SIZE: usize = 4;

/// A script, costume or sound: `size u16`, two unused bytes, then `size - 4` bytes of data.
pub fn read_blob(cursor: &mut ByteCursor, offset: usize) -> Result<Vec<u8>, DecodeError> {
    cursor.seek(offset)?;
    let size = cursor.read_u16()? as usize;
    if size < BLOB_HEADER_SIZE {
        return Err(DecodeError::malformed(
            "a resource of at least 4 bytes",
            format!("size {}", size),
            offset,
        ));
    }
    cursor.skip(2)?;
    Ok(cursor.read_bytes(size - BLOB_HEADER_SIZE)?)
}

/// Field access relative to the start of a room.
struct RoomFields<'c, 'a> {
    cursor: &'c mut ByteCursor<'a>,
    base: usize,
}

impl RoomFields<'_, '_> {
    fn u8_at(&mut self, at: usize) -> Result<u8, DecodeError> {
        self.cursor.seek(self.base + at)?;
        Ok(self.cursor.read_u8()?)
    }

    fn u16_at(&mut self, at: usize) -> Result<u16, DecodeError> {
        self.cursor.seek(self.base + at)?;
        Ok(self.cursor.read_u16()?)
    }

    fn bytes_between(&mut self, start: usize, end: usize) -> Result<Vec<u8>, DecodeError> {
        self.cursor.seek(self.base + start)?;
        Ok(self.cursor.read_bytes(end.saturating_sub(start))?)
    }
}

/// Sorted list of every offset the room header points at. A span starting at one offset ends at
/// the next larger one, or at the end of the room.
struct Spans {
    offsets: Vec<usize>,
    size: usize,
}

impl Spans {
    fn new(offsets: impl IntoIterator<Item = usize>, size: usize) -> Self {
        Self {
            offsets: offsets
                .into_iter()
                .filter(|&offset| offset != 0 && offset < size)
                .sorted()
                .dedup()
                .collect(),
            size,
        }
    }

    fn end_of(&self, start: usize) -> usize {
        self.offsets
            .iter()
            .copied()
            .find(|&offset| offset > start)
            .unwrap_or(self.size)
    }
}

pub fn read_room(
    profile: &GenerationProfile,
    cursor: &mut ByteCursor,
    offset: usize,
) -> Result<Room, DecodeError> {
    let mut fields = RoomFields { cursor, base: offset };
    let size = fields.u16_at(0)? as usize;
    if size < ROOM_HEADER_SIZE {
        return Err(DecodeError::malformed(
            "a positional room header",
            format!("room size {}", size),
            offset,
        ));
    }
    // the whole room has to be present
    fields.cursor.seek(offset)?;
    fields.cursor.skip(size)?;

    let width_tiles = fields.u8_at(4)?;
    let height_tiles = fields.u8_at(5)?;
    let object_count = fields.u8_at(20)? as usize;
    let box_offset = match profile.code_header {
        CodeHeaderFormat::PositionalC64 => fields.u8_at(21)? as usize,
        _ => fields.u16_at(21)? as usize,
    };
    let exit_offset = fields.u16_at(24)? as usize;
    let entry_offset = fields.u16_at(26)? as usize;

    let mut image_offsets = Vec::with_capacity(object_count);
    let mut code_offsets = Vec::with_capacity(object_count);
    for i in 0..object_count {
        image_offsets.push(fields.u16_at(ROOM_HEADER_SIZE + i * 2)? as usize);
    }
    for i in 0..object_count {
        code_offsets.push(fields.u16_at(ROOM_HEADER_SIZE + (object_count + i) * 2)? as usize);
    }

    let graphics_offsets = if profile.tiles_rle {
        (0..5)
            .map(|i| fields.u16_at(10 + i * 2).map(|v| v as usize))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![fields.u16_at(8)? as usize, fields.u16_at(10)? as usize]
    };

    let spans = Spans::new(
        graphics_offsets
            .iter()
            .copied()
            .chain([box_offset, exit_offset, entry_offset])
            .chain(image_offsets.iter().copied())
            .chain(code_offsets.iter().copied()),
        size,
    );

    let mut room = Room {
        header: RoomHeader {
            width: width_tiles as u16 * 8,
            height: height_tiles as u16 * 8,
            object_count: object_count as u16,
        },
        size,
        ..Default::default()
    };

    if exit_offset != 0 {
        room.exit_script = ScriptData::new(fields.bytes_between(exit_offset, spans.end_of(exit_offset))?);
    }
    if entry_offset != 0 {
        room.entry_script =
            ScriptData::new(fields.bytes_between(entry_offset, spans.end_of(entry_offset))?);
    }

    if profile.tiles_rle {
        let map_len = width_tiles as usize * height_tiles as usize;
        let mut tiles = TileGraphics::default();
        for (i, &at) in graphics_offsets.iter().enumerate() {
            if at == 0 {
                continue;
            }
            fields.cursor.seek(offset + at)?;
            let cursor = &mut *fields.cursor;
            match i {
                0 => tiles.charset = rle::decode(cursor, TILE_CHARSET_SIZE)?,
                1 => tiles.picture_map = rle::decode(cursor, map_len)?,
                2 => tiles.colour_map = rle::decode(cursor, map_len)?,
                3 => tiles.mask_map = rle::decode(cursor, map_len)?,
                _ => {
                    let len = cursor.read_u16()? as usize;
                    tiles.mask_charset = rle::decode(cursor, len)?;
                }
            }
        }
        room.tiles = Some(tiles);
    } else {
        let (mask_offset, image_offset) = (graphics_offsets[0], graphics_offsets[1]);
        if image_offset != 0 {
            let mut image = Image::new(fields.bytes_between(image_offset, spans.end_of(image_offset))?);
            if mask_offset != 0 {
                image
                    .z_planes
                    .push(fields.bytes_between(mask_offset, spans.end_of(mask_offset))?);
            }
            room.image = Some(image);
        }
    }

    if box_offset != 0 {
        fields.cursor.seek(offset + box_offset)?;
        room.boxes = read_boxes(fields.cursor, BoxFormat::Narrow, CountWidth::U8)?;
        room.box_matrix = fields
            .cursor
            .read_bytes(triangular_matrix_len(room.boxes.len()))?;
    }

    for (&code_offset, &image_offset) in code_offsets.iter().zip(image_offsets.iter()) {
        if code_offset == 0 {
            continue;
        }
        let mut object = read_code(profile, fields.cursor, offset + code_offset, offset + size)?;
        if image_offset != 0 {
            object.images.push(Image::new(
                fields.bytes_between(image_offset, spans.end_of(image_offset))?,
            ));
        }
        room.objects.push(object);
    }

    log::debug!(
        "Read {} room at {:#x}: {}x{}, {} objects",
        profile.generation,
        offset,
        room.header.width,
        room.header.height,
        room.objects.len()
    );
    Ok(room)
}

/// Read one object code record. Generation 0 stores the id one byte later and everything after
/// it one byte earlier than generations 1 and 2.
fn read_code(
    profile: &GenerationProfile,
    cursor: &mut ByteCursor,
    base: usize,
    room_end: usize,
) -> Result<ObjectData, DecodeError> {
    let mut fields = RoomFields { cursor, base };
    let record_size = fields.u16_at(0)? as usize;
    let end = (base + record_size).min(room_end);

    let (id, first) = match profile.code_header {
        CodeHeaderFormat::PositionalC64 => {
            let lo = fields.u8_at(6)? as u16;
            let hi = fields.u8_at(7)? as u16;
            (lo | hi << 8, 8)
        }
        _ => (fields.u16_at(4)?, 9),
    };

    let x = fields.u8_at(first)?;
    let y = PackedY::from_bits(fields.u8_at(first + 1)?);
    let width = fields.u8_at(first + 2)?;
    let parent = fields.u8_at(first + 3)?;
    let walk_x = fields.u8_at(first + 4)?;
    let walk_y = fields.u8_at(first + 5)? & 0x1F;
    let dir_height = DirHeight::from_bits(fields.u8_at(first + 6)?);
    let name_offset = fields.u8_at(first + 7)?;

    let mut object = ObjectData {
        id,
        x: x as i32 * 8,
        y: y.tiles() as i32 * 8,
        width: width as u32 * 8,
        height: dir_height.height_tiles() as u32 * 8,
        parent,
        parent_state: y.parent_state() as u8,
        walk_x: walk_x as i32 * 8,
        walk_y: walk_y as i32 * 8,
        actor_dir: dir_height.dir(),
        ..Default::default()
    };
    read_code_tail(
        fields.cursor,
        &mut object,
        base,
        base + first + 8,
        name_offset,
        end,
        profile.verbs,
    )?;
    Ok(object)
}
