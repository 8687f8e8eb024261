//! Palettes and colour cycles.

use crate::misc::byte_cursor::ByteCursor;
use crate::misc::chunk_iterator::{Chunk, ChunkIterator, TagScheme};
use crate::resource::decoders::records::CycleRecord;
use crate::resource::decoders::{tags, DecodeError};
use crate::resource::room::{ColorCycle, Palette, Rgb};

const CYCLE_SLOTS: u8 = 16;
const FULL_PALETTE: usize = 256;

/// Cycle delays are expressed as 16384 divided by the stored rate.
fn delay_for_rate(rate: u16) -> u16 {
    (16384 / rate as u32) as u16
}

pub fn read_rgb(cursor: &mut ByteCursor, count: usize) -> Result<Palette, DecodeError> {
    let bytes = cursor.read_bytes(count * 3)?;
    let colors = bytes
        .chunks_exact(3)
        .map(|c| Rgb {
            r: c[0],
            g: c[1],
            b: c[2],
        })
        .collect();
    Ok(Palette { colors })
}

pub fn read_full_palette(cursor: &mut ByteCursor) -> Result<Palette, DecodeError> {
    read_rgb(cursor, FULL_PALETTE)
}

/// A generation 3 palette: colour count, then the colours. Only 16 and 32 colours exist.
pub fn read_counted_palette(cursor: &mut ByteCursor) -> Result<Palette, DecodeError> {
    let offset = cursor.position();
    let count = cursor.read_u16()?;
    if count != 16 && count != 32 {
        return Err(DecodeError::malformed(
            "a palette of 16 or 32 colours",
            format!("{} colours", count),
            offset,
        ));
    }
    read_rgb(cursor, count as usize)
}

/// Read every `APAL` inside a `PALS` chunk, descending through `WRAP`.
pub fn read_palette_set(cursor: &mut ByteCursor, pals: &Chunk) -> Result<Vec<Palette>, DecodeError> {
    let mut palettes = vec![];
    collect_palettes(cursor, pals, &mut palettes)?;
    Ok(palettes)
}

fn collect_palettes(
    cursor: &mut ByteCursor,
    parent: &Chunk,
    palettes: &mut Vec<Palette>,
) -> Result<(), DecodeError> {
    let children = ChunkIterator::over(cursor, TagScheme::Block, parent)?.collect_chunks()?;
    for chunk in children {
        match chunk.tag {
            tags::WRAP => collect_palettes(cursor, &chunk, palettes)?,
            tags::APAL => {
                cursor.seek(chunk.payload_offset)?;
                palettes.push(read_full_palette(cursor)?);
            }
            _ => log::trace!("Skipping {} inside palette set at {:#x}", chunk.tag, chunk.offset),
        }
    }
    Ok(())
}

/// Generation 3/4 `CC`: 16 slots of big-endian rate and colour range. A zero rate is unused.
pub fn read_fixed_cycles(cursor: &mut ByteCursor) -> Result<Vec<ColorCycle>, DecodeError> {
    let mut cycles = vec![];
    for slot in 1..=CYCLE_SLOTS {
        let rate = cursor.read_u16_be()?;
        let start = cursor.read_u8()?;
        let end = cursor.read_u8()?;
        if rate == 0 {
            continue;
        }
        cycles.push(ColorCycle {
            slot,
            delay: delay_for_rate(rate),
            flags: 0,
            start,
            end,
        });
    }
    Ok(cycles)
}

/// `CYCL`: slot numbered records until a zero slot.
pub fn read_terminated_cycles(cursor: &mut ByteCursor) -> Result<Vec<ColorCycle>, DecodeError> {
    let mut cycles = vec![];
    loop {
        let offset = cursor.position();
        let slot = cursor.read_u8()?;
        if slot == 0 {
            break;
        }
        if slot > CYCLE_SLOTS {
            return Err(DecodeError::malformed(
                "a colour cycle slot from 1 to 16",
                slot,
                offset,
            ));
        }
        let record: CycleRecord = cursor.read_record()?;
        if record.rate == 0 {
            continue;
        }
        cycles.push(ColorCycle {
            slot,
            delay: delay_for_rate(record.rate),
            flags: record.flags,
            start: record.start,
            end: record.end,
        });
    }
    Ok(cycles)
}
