use crate::misc::byte_cursor::{ByteCursor, CursorError};
use crate::resource::decoders::records::{ExtendedBoxRecord, NarrowBoxRecord, WideBoxRecord};
use crate::resource::decoders::{BoxFormat, CountWidth};
use crate::resource::room::{Point, WalkBox};

/// Read a box count followed by that many records.
pub fn read_boxes(
    cursor: &mut ByteCursor,
    format: BoxFormat,
    count: CountWidth,
) -> Result<Vec<WalkBox>, CursorError> {
    let count = count.read(cursor)?;
    (0..count).map(|_| read_box(cursor, format)).collect()
}

pub fn read_box(cursor: &mut ByteCursor, format: BoxFormat) -> Result<WalkBox, CursorError> {
    let walk_box = match format {
        BoxFormat::Narrow => {
            let r: NarrowBoxRecord = cursor.read_record()?;
            WalkBox {
                upper_left: Point::new(r.ulx as i32, r.uy as i32),
                upper_right: Point::new(r.urx as i32, r.uy as i32),
                lower_right: Point::new(r.lrx as i32, r.ly as i32),
                lower_left: Point::new(r.llx as i32, r.ly as i32),
                mask: r.mask as u32,
                flags: r.flags as u32,
                ..Default::default()
            }
        }
        BoxFormat::Wide => {
            let r: WideBoxRecord = cursor.read_record()?;
            WalkBox {
                upper_left: Point::new(r.ulx as i32, r.uly as i32),
                upper_right: Point::new(r.urx as i32, r.ury as i32),
                lower_right: Point::new(r.lrx as i32, r.lry as i32),
                lower_left: Point::new(r.llx as i32, r.lly as i32),
                mask: r.mask as u32,
                flags: r.flags as u32,
                scale: r.scale as u32,
                scale_slot: 0,
            }
        }
        BoxFormat::Extended => {
            let r: ExtendedBoxRecord = cursor.read_record()?;
            WalkBox {
                upper_left: Point::new(r.ulx, r.uly),
                upper_right: Point::new(r.urx, r.ury),
                lower_right: Point::new(r.lrx, r.lry),
                lower_left: Point::new(r.llx, r.lly),
                mask: r.mask,
                flags: r.flags,
                scale: r.scale,
                scale_slot: r.scale_slot,
            }
        }
    };
    Ok(walk_box)
}

/// Size of the flattened triangular box matrix used by positional rooms.
pub fn triangular_matrix_len(box_count: usize) -> usize {
    box_count * (box_count + 1) / 2
}
