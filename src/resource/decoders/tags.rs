//! Chunk tags found in room containers.

use crate::misc::tag::ChunkTag;

// Generations 3 and 4
pub const LE: ChunkTag = ChunkTag::small(b"LE");
pub const FO: ChunkTag = ChunkTag::small(b"FO");
pub const RO: ChunkTag = ChunkTag::small(b"RO");
pub const HD: ChunkTag = ChunkTag::small(b"HD");
pub const CC: ChunkTag = ChunkTag::small(b"CC");
pub const PA: ChunkTag = ChunkTag::small(b"PA");
pub const BX: ChunkTag = ChunkTag::small(b"BX");
pub const BM: ChunkTag = ChunkTag::small(b"BM");
pub const OI: ChunkTag = ChunkTag::small(b"OI");
pub const OC: ChunkTag = ChunkTag::small(b"OC");
pub const NL: ChunkTag = ChunkTag::small(b"NL");
pub const LS: ChunkTag = ChunkTag::small(b"LS");
pub const EX: ChunkTag = ChunkTag::small(b"EX");
pub const EN: ChunkTag = ChunkTag::small(b"EN");
pub const SC: ChunkTag = ChunkTag::small(b"SC");
pub const CO: ChunkTag = ChunkTag::small(b"CO");
pub const SO: ChunkTag = ChunkTag::small(b"SO");
pub const WA: ChunkTag = ChunkTag::small(b"WA");
pub const AD: ChunkTag = ChunkTag::small(b"AD");

// Generations 5 to 8
pub const LECF: ChunkTag = ChunkTag::block(b"LECF");
pub const LOFF: ChunkTag = ChunkTag::block(b"LOFF");
pub const ROOM: ChunkTag = ChunkTag::block(b"ROOM");
pub const RMSC: ChunkTag = ChunkTag::block(b"RMSC");
pub const RMHD: ChunkTag = ChunkTag::block(b"RMHD");
pub const CYCL: ChunkTag = ChunkTag::block(b"CYCL");
pub const TRNS: ChunkTag = ChunkTag::block(b"TRNS");
pub const CLUT: ChunkTag = ChunkTag::block(b"CLUT");
pub const PALS: ChunkTag = ChunkTag::block(b"PALS");
pub const WRAP: ChunkTag = ChunkTag::block(b"WRAP");
pub const OFFS: ChunkTag = ChunkTag::block(b"OFFS");
pub const APAL: ChunkTag = ChunkTag::block(b"APAL");
pub const RMIM: ChunkTag = ChunkTag::block(b"RMIM");
pub const IMAG: ChunkTag = ChunkTag::block(b"IMAG");
pub const SMAP: ChunkTag = ChunkTag::block(b"SMAP");
pub const BOMP: ChunkTag = ChunkTag::block(b"BOMP");
pub const ZPLN: ChunkTag = ChunkTag::block(b"ZPLN");
pub const OBIM: ChunkTag = ChunkTag::block(b"OBIM");
pub const IMHD: ChunkTag = ChunkTag::block(b"IMHD");
pub const OBCD: ChunkTag = ChunkTag::block(b"OBCD");
pub const CDHD: ChunkTag = ChunkTag::block(b"CDHD");
pub const VERB: ChunkTag = ChunkTag::block(b"VERB");
pub const OBNA: ChunkTag = ChunkTag::block(b"OBNA");
pub const EXCD: ChunkTag = ChunkTag::block(b"EXCD");
pub const ENCD: ChunkTag = ChunkTag::block(b"ENCD");
pub const NLSC: ChunkTag = ChunkTag::block(b"NLSC");
pub const LSCR: ChunkTag = ChunkTag::block(b"LSCR");
pub const LSC2: ChunkTag = ChunkTag::block(b"LSC2");
pub const BOXD: ChunkTag = ChunkTag::block(b"BOXD");
pub const BOXM: ChunkTag = ChunkTag::block(b"BOXM");
pub const SCAL: ChunkTag = ChunkTag::block(b"SCAL");
pub const SCRP: ChunkTag = ChunkTag::block(b"SCRP");
pub const COST: ChunkTag = ChunkTag::block(b"COST");
pub const AKOS: ChunkTag = ChunkTag::block(b"AKOS");
pub const CHAR: ChunkTag = ChunkTag::block(b"CHAR");
pub const SOUN: ChunkTag = ChunkTag::block(b"SOUN");
pub const SOU: ChunkTag = ChunkTag::block(b"SOU ");
pub const SPK: ChunkTag = ChunkTag::block(b"SPK ");
pub const ADL: ChunkTag = ChunkTag::block(b"ADL ");
pub const AMI: ChunkTag = ChunkTag::block(b"AMI ");
pub const ROL: ChunkTag = ChunkTag::block(b"ROL ");
pub const GMD: ChunkTag = ChunkTag::block(b"GMD ");
pub const MIDI: ChunkTag = ChunkTag::block(b"MIDI");

/// `IMnn` and `IMAG` wrap images; `ZPnn` tags are z-planes.
pub fn is_image_container(tag: &ChunkTag) -> bool {
    (tag.as_bytes().len() == 4 && tag.starts_with(b"IM") && *tag != IMHD) || *tag == WRAP
}

pub fn is_z_plane(tag: &ChunkTag) -> bool {
    (tag.as_bytes().len() == 4 && tag.starts_with(b"ZP")) || *tag == ZPLN
}
