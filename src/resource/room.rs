//! Decoded room contents.
//!
//! Images are kept as the framed bytes found on disk (strips and z-planes); only the generation
//! 0/1 tile maps are expanded, since their run-length coding is part of the room framing.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoomHeader {
    pub width: u16,
    pub height: u16,
    pub object_count: u16,
}

/// Bytecode plus the offset its first byte had inside the chunk it came from. Jump targets in
/// object scripts are relative to that chunk, so the offset is needed to rebase them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScriptData {
    pub offset: u32,
    pub data: Vec<u8>,
}

impl ScriptData {
    pub fn new(data: Vec<u8>) -> Self {
        Self { offset: 0, data }
    }

    pub fn with_offset(offset: u32, data: Vec<u8>) -> Self {
        Self { offset, data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One image: compressed strips plus any z-plane masks that follow them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Image {
    pub data: Vec<u8>,
    pub z_planes: Vec<Vec<u8>>,
}

impl Image {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            z_planes: vec![],
        }
    }

    pub fn byte_len(&self) -> usize {
        self.data.len() + self.z_planes.iter().map(Vec::len).sum::<usize>()
    }
}

/// Run-length decoded background of generations 0 and 1.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileGraphics {
    /// 256 tiles of 8 bytes.
    pub charset: Vec<u8>,
    pub picture_map: Vec<u8>,
    pub colour_map: Vec<u8>,
    pub mask_map: Vec<u8>,
    pub mask_charset: Vec<u8>,
}

impl TileGraphics {
    pub fn byte_len(&self) -> usize {
        self.charset.len()
            + self.picture_map.len()
            + self.colour_map.len()
            + self.mask_map.len()
            + self.mask_charset.len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorCycle {
    /// Cycle slot, 1 to 16.
    pub slot: u8,
    pub delay: u16,
    pub flags: u16,
    pub start: u8,
    pub end: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A walkable quadrangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WalkBox {
    pub upper_left: Point,
    pub upper_right: Point,
    pub lower_right: Point,
    pub lower_left: Point,
    pub mask: u32,
    pub flags: u32,
    pub scale: u32,
    pub scale_slot: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Palette {
    pub colors: Vec<Rgb>,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Linear actor scaling between two screen lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScaleSlot {
    pub scale1: u32,
    pub y1: u32,
    pub scale2: u32,
    pub y2: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectData {
    pub id: u16,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub parent: u8,
    pub parent_state: u8,
    pub walk_x: i32,
    pub walk_y: i32,
    pub actor_dir: u8,
    pub flags: u8,
    /// Verb id to entry point, relative to the start of the object's code chunk.
    pub verbs: BTreeMap<u32, u32>,
    pub script: ScriptData,
    pub name: Vec<u8>,
    pub images: Vec<Image>,
    pub hotspots: Vec<Point>,
}

impl ObjectData {
    pub fn byte_len(&self) -> usize {
        self.script.data.len()
            + self.name.len()
            + self.images.iter().map(Image::byte_len).sum::<usize>()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Room {
    pub header: RoomHeader,
    pub entry_script: ScriptData,
    pub exit_script: ScriptData,
    pub local_scripts: BTreeMap<u32, ScriptData>,
    pub image: Option<Image>,
    pub tiles: Option<TileGraphics>,
    pub color_cycles: Vec<ColorCycle>,
    pub boxes: Vec<WalkBox>,
    pub box_matrix: Vec<u8>,
    pub palettes: Vec<Palette>,
    pub objects: Vec<ObjectData>,
    pub scale_slots: Vec<ScaleSlot>,
    pub transparent_color: Option<u8>,
    /// Bytes of the room data read from disk, used as the cache cost.
    pub size: usize,
}

impl Room {
    pub fn object(&self, id: u16) -> Option<&ObjectData> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn local_script(&self, id: u32) -> Option<&ScriptData> {
        self.local_scripts.get(&id)
    }
}
