//! Fixed-size on-disk records, parsed with `binrw` through [ByteCursor](crate::misc::byte_cursor::ByteCursor).

use binrw::BinRead;
use bitfield_struct::bitfield;

use crate::misc::byte_cursor::FixedRecord;

/// The y byte of positional and small object code: y/8 plus the parent state bit.
#[bitfield(u8)]
pub struct PackedY {
    #[bits(7)]
    pub tiles: u8,
    pub parent_state: bool,
}

/// Facing direction in the low bits, height in multiples of 8 above them.
#[bitfield(u8)]
pub struct DirHeight {
    #[bits(3)]
    pub dir: u8,
    #[bits(5)]
    pub height_tiles: u8,
}

macro_rules! fixed_record {
    ($record:ty, $size:expr) => {
        impl FixedRecord for $record {
            const SIZE: usize = $size;
        }
    };
}

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct NarrowBoxRecord {
    pub uy: u8,
    pub ly: u8,
    pub ulx: u8,
    pub urx: u8,
    pub llx: u8,
    pub lrx: u8,
    pub mask: u8,
    pub flags: u8,
}
fixed_record!(NarrowBoxRecord, 8);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct WideBoxRecord {
    pub ulx: i16,
    pub uly: i16,
    pub urx: i16,
    pub ury: i16,
    pub lrx: i16,
    pub lry: i16,
    pub llx: i16,
    pub lly: i16,
    pub mask: u8,
    pub flags: u8,
    pub scale: u16,
}
fixed_record!(WideBoxRecord, 20);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct ExtendedBoxRecord {
    pub ulx: i32,
    pub uly: i32,
    pub urx: i32,
    pub ury: i32,
    pub lrx: i32,
    pub lry: i32,
    pub llx: i32,
    pub lly: i32,
    pub mask: u32,
    pub flags: u32,
    pub scale_slot: u32,
    pub scale: u32,
    pub unused: u32,
}
fixed_record!(ExtendedBoxRecord, 52);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct RoomHeaderV5 {
    pub width: u16,
    pub height: u16,
    pub object_count: u16,
}
fixed_record!(RoomHeaderV5, 6);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct RoomHeaderV7 {
    pub version: u32,
    pub width: u16,
    pub height: u16,
    pub object_count: u16,
}
fixed_record!(RoomHeaderV7, 10);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct RoomHeaderV8 {
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub object_count: u32,
    pub z_buffers: u32,
    pub transparency: u32,
}
fixed_record!(RoomHeaderV8, 24);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct ImageHeaderV5 {
    pub id: u16,
    pub image_count: u16,
    pub z_planes: u16,
    pub flags: u8,
    pub flags2: u8,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}
fixed_record!(ImageHeaderV5, 16);

/// Followed by `hotspot_count` pairs of i16.
#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct ImageHeaderV7 {
    pub version: u32,
    pub id: u16,
    pub image_count: u16,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub unknown: u16,
    pub hotspot_count: u16,
}
fixed_record!(ImageHeaderV7, 20);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct ImageHeaderV8 {
    pub name: [u8; 40],
    pub version: u32,
    pub image_count: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub actor_dir: u32,
    pub flags: u32,
    pub hotspots: [[i32; 2]; 15],
}
fixed_record!(ImageHeaderV8, 192);

/// Position and size are stored divided by 8.
#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct CodeHeaderV5 {
    pub id: u16,
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub height: u8,
    pub flags: u8,
    pub parent: u8,
    pub walk_x: i16,
    pub walk_y: i16,
    pub actor_dir: u8,
}
fixed_record!(CodeHeaderV5, 13);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct CodeHeaderV6 {
    pub id: u16,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub flags: u8,
    pub parent: u8,
    pub walk_x: i16,
    pub walk_y: i16,
    pub actor_dir: u8,
}
fixed_record!(CodeHeaderV6, 17);

#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct CodeHeaderV7 {
    pub version: u32,
    pub id: u16,
    pub parent: u8,
    pub parent_state: u8,
}
fixed_record!(CodeHeaderV7, 8);

/// The fixed part of a generation 3/4 `OC` chunk. The name offset counts from the chunk start.
#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct SmallCodeHeader {
    pub id: u16,
    pub unknown: u8,
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub parent: u8,
    pub walk_x: i16,
    pub walk_y: i16,
    pub dir_height: u8,
    pub name_offset: u8,
}
fixed_record!(SmallCodeHeader, 13);

/// A `CYCL` entry after its index byte.
#[derive(BinRead, Debug, Clone, Copy)]
#[br(little)]
pub struct CycleRecord {
    pub unknown: u16,
    #[br(big)]
    pub rate: u16,
    #[br(big)]
    pub flags: u16,
    pub start: u8,
    pub end: u8,
}
fixed_record!(CycleRecord, 8);
