//! Object images, object code and merging the two.
//!
//! An object's geometry and images live in one chunk and its code in another, in no guaranteed
//! order. Both halves are buffered by id and merged once the room has been walked.

use std::collections::BTreeMap;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::misc::byte_cursor::ByteCursor;
use crate::misc::chunk_iterator::{Chunk, ChunkIterator, TagScheme};
use crate::resource::decoders::records::{
    CodeHeaderV5, CodeHeaderV6, CodeHeaderV7, DirHeight, ImageHeaderV5, ImageHeaderV7,
    ImageHeaderV8, PackedY, SmallCodeHeader,
};
use crate::resource::decoders::{
    tags, CodeHeaderFormat, DecodeError, GenerationProfile, ImageHeaderFormat, VerbFormat,
};
use crate::resource::room::{Image, ObjectData, Point, ScriptData};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The image half of an object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectImage {
    pub id: u16,
    pub geometry: Option<Geometry>,
    pub hotspots: Vec<Point>,
    pub name: Option<Vec<u8>>,
    pub images: Vec<Image>,
}

impl ObjectImage {
    /// Copy the image half onto a code record. Geometry carried by the image replaces the code's.
    fn apply_to(self, object: &mut ObjectData) {
        if let Some(geometry) = self.geometry {
            object.x = geometry.x;
            object.y = geometry.y;
            object.width = geometry.width;
            object.height = geometry.height;
        }
        if !self.hotspots.is_empty() {
            object.hotspots = self.hotspots;
        }
        if let Some(name) = self.name {
            object.name = name;
        }
        object.images.extend(self.images);
    }

    fn into_object(self) -> ObjectData {
        let mut object = ObjectData {
            id: self.id,
            ..Default::default()
        };
        self.apply_to(&mut object);
        object
    }
}

#[derive(Debug, Default)]
pub struct ObjectMerger {
    images: IndexMap<u16, ObjectImage>,
    /// Generation 8 image headers carry a name instead of an id.
    named_images: Vec<ObjectImage>,
    code: IndexMap<u16, ObjectData>,
}

impl ObjectMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&mut self, image: ObjectImage) {
        if image.id == 0 && image.name.is_some() {
            self.named_images.push(image);
            return;
        }
        match self.images.get_mut(&image.id) {
            Some(existing) => existing.images.extend(image.images),
            None => {
                self.images.insert(image.id, image);
            }
        }
    }

    /// The first code record of an id wins, later duplicates are dropped.
    pub fn add_code(&mut self, object: ObjectData) {
        match self.code.entry(object.id) {
            Entry::Occupied(_) => {
                log::warn!("Dropping duplicate code record for object {}", object.id);
            }
            Entry::Vacant(slot) => {
                slot.insert(object);
            }
        }
    }

    /// Objects in code order, followed by images that never got code.
    pub fn finish(mut self) -> Vec<ObjectData> {
        let mut objects = Vec::with_capacity(self.code.len() + self.images.len());
        for (id, mut object) in self.code {
            if let Some(image) = self.images.shift_remove(&id) {
                image.apply_to(&mut object);
            } else if let Some(at) = self
                .named_images
                .iter()
                .position(|image| image.name.as_deref() == Some(object.name.as_slice()))
            {
                self.named_images.remove(at).apply_to(&mut object);
            }
            objects.push(object);
        }
        objects.extend(
            self.images
                .into_values()
                .chain(self.named_images)
                .map(ObjectImage::into_object),
        );
        objects
    }
}

/// Collect the images below `parent`: each `SMAP`/`BOMP` starts an image, z-planes attach to the
/// latest one, and `IMnn`/`IMAG`/`WRAP` are descended into.
pub fn read_images(cursor: &mut ByteCursor, parent: &Chunk) -> Result<Vec<Image>, DecodeError> {
    let mut images = vec![];
    collect_images(cursor, parent, &mut images)?;
    Ok(images)
}

fn collect_images(
    cursor: &mut ByteCursor,
    parent: &Chunk,
    images: &mut Vec<Image>,
) -> Result<(), DecodeError> {
    let children = ChunkIterator::over(cursor, TagScheme::Block, parent)?.collect_chunks()?;
    for chunk in children {
        if chunk.tag == tags::SMAP || chunk.tag == tags::BOMP {
            cursor.seek(chunk.payload_offset)?;
            images.push(Image::new(cursor.read_bytes(chunk.payload_len())?));
        } else if tags::is_z_plane(&chunk.tag) {
            cursor.seek(chunk.payload_offset)?;
            let plane = cursor.read_bytes(chunk.payload_len())?;
            match images.last_mut() {
                Some(image) => image.z_planes.push(plane),
                None => images.push(Image {
                    data: vec![],
                    z_planes: vec![plane],
                }),
            }
        } else if tags::is_image_container(&chunk.tag) {
            collect_images(cursor, &chunk, images)?;
        } else {
            log::trace!("Skipping {} inside image at {:#x}", chunk.tag, chunk.offset);
        }
    }
    Ok(())
}

/// Read an `OBIM` chunk.
pub fn read_block_image(
    profile: &GenerationProfile,
    cursor: &mut ByteCursor,
    obim: &Chunk,
) -> Result<ObjectImage, DecodeError> {
    let mut object = ObjectImage::default();
    let mut has_header = false;
    let children = ChunkIterator::over(cursor, TagScheme::Block, obim)?.collect_chunks()?;
    for chunk in children {
        if chunk.tag == tags::IMHD {
            cursor.seek(chunk.payload_offset)?;
            read_image_header(profile.image_header, cursor, &mut object)?;
            has_header = true;
        } else if tags::is_image_container(&chunk.tag) {
            object.images.extend(read_images(cursor, &chunk)?);
        }
    }
    if !has_header {
        return Err(DecodeError::malformed(tags::IMHD, "no image header", obim.offset));
    }
    Ok(object)
}

fn read_image_header(
    format: ImageHeaderFormat,
    cursor: &mut ByteCursor,
    object: &mut ObjectImage,
) -> Result<(), DecodeError> {
    match format {
        ImageHeaderFormat::V5 => {
            let header: ImageHeaderV5 = cursor.read_record()?;
            object.id = header.id;
            object.geometry = Some(Geometry {
                x: header.x as i32,
                y: header.y as i32,
                width: header.width as u32,
                height: header.height as u32,
            });
        }
        ImageHeaderFormat::V7 => {
            let header: ImageHeaderV7 = cursor.read_record()?;
            object.id = header.id;
            object.geometry = Some(Geometry {
                x: header.x as i32,
                y: header.y as i32,
                width: header.width as u32,
                height: header.height as u32,
            });
            for _ in 0..header.hotspot_count {
                let x = cursor.read_i16()? as i32;
                let y = cursor.read_i16()? as i32;
                object.hotspots.push(Point::new(x, y));
            }
        }
        ImageHeaderFormat::V8 => {
            let header: ImageHeaderV8 = cursor.read_record()?;
            let name_len = header.name.iter().position(|&b| b == 0).unwrap_or(40);
            object.name = Some(header.name[..name_len].to_vec());
            object.geometry = Some(Geometry {
                x: header.x,
                y: header.y,
                width: header.width,
                height: header.height,
            });
            object.hotspots = header
                .hotspots
                .iter()
                .map(|[x, y]| Point::new(*x, *y))
                .collect();
        }
        ImageHeaderFormat::Positional | ImageHeaderFormat::Small => {
            object.id = cursor.read_u16()?;
        }
    }
    Ok(())
}

/// Verb id to offset pairs until a zero id.
pub fn read_verb_table(
    cursor: &mut ByteCursor,
    format: VerbFormat,
) -> Result<BTreeMap<u32, u32>, DecodeError> {
    let mut verbs = BTreeMap::new();
    loop {
        let (verb, offset) = match format {
            VerbFormat::Short => {
                let verb = cursor.read_u8()? as u32;
                if verb == 0 {
                    break;
                }
                (verb, cursor.read_u16()? as u32)
            }
            VerbFormat::Long => {
                let verb = cursor.read_u32()?;
                if verb == 0 {
                    break;
                }
                (verb, cursor.read_u32()?)
            }
        };
        verbs.insert(verb, offset);
    }
    Ok(verbs)
}

/// The tail shared by positional and small object code: verb table, optional name, script.
///
/// `base` is where the code record starts; the name offset and the returned script offset are
/// relative to it. The script starts after whichever of the verb table and the name ends last.
pub fn read_code_tail(
    cursor: &mut ByteCursor,
    object: &mut ObjectData,
    base: usize,
    table_offset: usize,
    name_offset: u8,
    end: usize,
    format: VerbFormat,
) -> Result<(), DecodeError> {
    cursor.seek(table_offset)?;
    object.verbs = read_verb_table(cursor, format)?;
    let mut script_start = cursor.position();

    if name_offset != 0 {
        let name_at = base + name_offset as usize;
        cursor.seek(name_at)?;
        object.name = cursor.read_null_terminated(end.saturating_sub(name_at))?;
        script_start = script_start.max(cursor.position());
    }

    let script_start = script_start.min(end);
    cursor.seek(script_start)?;
    object.script =
        ScriptData::with_offset((script_start - base) as u32, cursor.read_bytes(end - script_start)?);
    Ok(())
}

/// Read a generation 3/4 `OC` chunk.
pub fn read_small_code(
    profile: &GenerationProfile,
    cursor: &mut ByteCursor,
    chunk: &Chunk,
) -> Result<ObjectData, DecodeError> {
    cursor.seek(chunk.payload_offset)?;
    let header: SmallCodeHeader = cursor.read_record()?;
    let y = PackedY::from_bits(header.y);
    let dir_height = DirHeight::from_bits(header.dir_height);

    let mut object = ObjectData {
        id: header.id,
        x: header.x as i32 * 8,
        y: y.tiles() as i32 * 8,
        width: header.width as u32 * 8,
        height: dir_height.height_tiles() as u32 * 8,
        parent: header.parent,
        parent_state: y.parent_state() as u8,
        walk_x: header.walk_x as i32,
        walk_y: header.walk_y as i32,
        actor_dir: dir_height.dir(),
        ..Default::default()
    };
    let table_offset = cursor.position();
    read_code_tail(
        cursor,
        &mut object,
        chunk.offset,
        table_offset,
        header.name_offset,
        chunk.end(),
        profile.verbs,
    )?;
    Ok(object)
}

/// Read an `OBCD` chunk: `CDHD` header, `VERB` table plus script, `OBNA` name.
pub fn read_block_code(
    profile: &GenerationProfile,
    cursor: &mut ByteCursor,
    obcd: &Chunk,
) -> Result<ObjectData, DecodeError> {
    let mut object = ObjectData::default();
    let mut has_header = false;
    let children = ChunkIterator::over(cursor, TagScheme::Block, obcd)?.collect_chunks()?;
    for chunk in children {
        cursor.seek(chunk.payload_offset)?;
        match chunk.tag {
            tags::CDHD => {
                read_code_header(profile.code_header, cursor, &mut object)?;
                has_header = true;
            }
            tags::VERB => {
                object.verbs = read_verb_table(cursor, profile.verbs)?;
                let script_start = cursor.position().min(chunk.end());
                object.script = ScriptData::with_offset(
                    (script_start - obcd.offset) as u32,
                    cursor.read_bytes(chunk.end() - script_start)?,
                );
            }
            tags::OBNA => {
                object.name = cursor.read_null_terminated(chunk.payload_len())?;
            }
            _ => log::trace!("Skipping {} inside object code at {:#x}", chunk.tag, chunk.offset),
        }
    }
    if !has_header {
        return Err(DecodeError::malformed(tags::CDHD, "no code header", obcd.offset));
    }
    Ok(object)
}

fn read_code_header(
    format: CodeHeaderFormat,
    cursor: &mut ByteCursor,
    object: &mut ObjectData,
) -> Result<(), DecodeError> {
    match format {
        CodeHeaderFormat::V5 => {
            let header: CodeHeaderV5 = cursor.read_record()?;
            object.id = header.id;
            object.x = header.x as i32 * 8;
            object.y = header.y as i32 * 8;
            object.width = header.width as u32 * 8;
            object.height = header.height as u32 * 8;
            object.flags = header.flags;
            object.parent = header.parent;
            object.walk_x = header.walk_x as i32;
            object.walk_y = header.walk_y as i32;
            object.actor_dir = header.actor_dir;
        }
        CodeHeaderFormat::V6 => {
            let header: CodeHeaderV6 = cursor.read_record()?;
            object.id = header.id;
            object.x = header.x as i32;
            object.y = header.y as i32;
            object.width = header.width as u32;
            object.height = header.height as u32;
            object.flags = header.flags;
            object.parent = header.parent;
            object.walk_x = header.walk_x as i32;
            object.walk_y = header.walk_y as i32;
            object.actor_dir = header.actor_dir;
        }
        CodeHeaderFormat::V7 => {
            let header: CodeHeaderV7 = cursor.read_record()?;
            object.id = header.id;
            object.parent = header.parent;
            object.parent_state = header.parent_state;
        }
        CodeHeaderFormat::Positional
        | CodeHeaderFormat::PositionalC64
        | CodeHeaderFormat::Small => {
            return Err(DecodeError::malformed(
                "object code inside a chunk",
                format!("{:?} code header", format),
                cursor.position(),
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::misc::byte_writer::ByteWriter;
    use crate::Generation;

    #[test]
    fn test_merge_prefers_image_geometry() {
        let mut merger = ObjectMerger::new();
        let mut verbs = BTreeMap::new();
        verbs.insert(1, 0x20);
        merger.add_code(ObjectData {
            id: 7,
            x: 8,
            width: 16,
            verbs: verbs.clone(),
            ..Default::default()
        });
        merger.add_image(ObjectImage {
            id: 7,
            geometry: Some(Geometry {
                x: 100,
                y: 50,
                width: 40,
                height: 16,
            }),
            ..Default::default()
        });
        merger.add_image(ObjectImage {
            id: 9,
            images: vec![Image::new(vec![1, 2])],
            ..Default::default()
        });

        let objects = merger.finish();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id, 7);
        assert_eq!((objects[0].x, objects[0].width, objects[0].height), (100, 40, 16));
        assert_eq!(objects[0].verbs, verbs);
        assert_eq!(objects[1].id, 9);
        assert_eq!(objects[1].images.len(), 1);
    }

    #[test]
    fn test_code_geometry_kept_without_image_header_geometry() {
        let mut merger = ObjectMerger::new();
        merger.add_image(ObjectImage {
            id: 3,
            images: vec![Image::new(vec![5])],
            ..Default::default()
        });
        merger.add_code(ObjectData {
            id: 3,
            x: 24,
            ..Default::default()
        });
        let objects = merger.finish();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].x, 24);
        assert_eq!(objects[0].images[0].data, vec![5]);
    }

    #[test]
    fn test_duplicate_code_keeps_the_first_record() {
        let mut merger = ObjectMerger::new();
        merger.add_code(ObjectData {
            id: 4,
            name: b"rope".to_vec(),
            ..Default::default()
        });
        merger.add_code(ObjectData {
            id: 4,
            name: b"sword".to_vec(),
            ..Default::default()
        });
        let objects = merger.finish();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, b"rope".to_vec());
    }

    #[test]
    fn test_named_images_match_code_by_name() {
        let mut merger = ObjectMerger::new();
        merger.add_image(ObjectImage {
            name: Some(b"lamp".to_vec()),
            geometry: Some(Geometry {
                x: 10,
                y: 20,
                width: 30,
                height: 40,
            }),
            ..Default::default()
        });
        merger.add_code(ObjectData {
            id: 12,
            name: b"lamp".to_vec(),
            ..Default::default()
        });
        let objects = merger.finish();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, 12);
        assert_eq!((objects[0].width, objects[0].height), (30, 40));
    }

    #[test]
    fn test_block_code_script_offset() -> Result<(), DecodeError> {
        let mut writer = ByteWriter::new();
        let obcd = writer.begin_chunk(TagScheme::Block, tags::OBCD);
        let mut cdhd = vec![];
        cdhd.extend(7u16.to_le_bytes());
        cdhd.extend([1, 2, 3, 4, 0, 0]);
        cdhd.extend(16i16.to_le_bytes());
        cdhd.extend(32i16.to_le_bytes());
        cdhd.push(2);
        writer.write_chunk(TagScheme::Block, tags::CDHD, &cdhd);
        writer.write_chunk(
            TagScheme::Block,
            tags::VERB,
            &[1, 0x20, 0x00, 0x0A, 0x24, 0x00, 0, 0xAA, 0xBB],
        );
        writer.write_chunk(TagScheme::Block, tags::OBNA, b"door\0");
        writer.end_chunk(obcd);
        let data = writer.into_bytes();

        let profile = GenerationProfile::for_generation(Generation::V5);
        let mut cursor = ByteCursor::new(&data);
        let chunk = ChunkIterator::new(&mut cursor, TagScheme::Block, data.len())
            .next_chunk()?
            .expect("OBCD chunk");
        let object = read_block_code(&profile, &mut cursor, &chunk)?;

        assert_eq!(object.id, 7);
        assert_eq!((object.x, object.y, object.width, object.height), (8, 16, 24, 32));
        assert_eq!((object.walk_x, object.walk_y), (16, 32));
        assert_eq!(object.verbs.get(&1), Some(&0x20));
        assert_eq!(object.verbs.get(&0x0A), Some(&0x24));
        // OBCD header (8) + CDHD (8 + 13) + VERB header (8) + table (7)
        assert_eq!(object.script.offset, 44);
        assert_eq!(object.script.data, vec![0xAA, 0xBB]);
        assert_eq!(object.name, b"door".to_vec());
        Ok(())
    }
}
