//! Run-length coding of the generation 0/1 tile graphics.
//!
//! A stream starts with four common colours. Each following code byte is one of:
//!
//! - `1ccnnnnn`: repeat common colour `cc` `n + 1` times
//! - `01nnnnnn`: repeat the next byte `n + 1` times
//! - `00nnnnnn`: copy the next `n + 1` bytes

use crate::misc::byte_cursor::{ByteCursor, CursorError};

/// Decode exactly `output_len` bytes starting at the cursor's position.
pub fn decode(cursor: &mut ByteCursor, output_len: usize) -> Result<Vec<u8>, CursorError> {
    let mut common = [0u8; 4];
    for color in common.iter_mut() {
        *color = cursor.read_u8()?;
    }

    let mut output = Vec::with_capacity(output_len);
    while output.len() < output_len {
        let code = cursor.read_u8()?;
        if code & 0x80 != 0 {
            let color = common[((code >> 5) & 3) as usize];
            let run = (code & 0x1F) as usize + 1;
            output.extend(std::iter::repeat(color).take(run));
        } else if code & 0x40 != 0 {
            let run = (code & 0x3F) as usize + 1;
            let color = cursor.read_u8()?;
            output.extend(std::iter::repeat(color).take(run));
        } else {
            let literal = cursor.read_bytes(code as usize + 1)?;
            output.extend(literal);
        }
    }
    // a run may overshoot the expected size on the last code
    output.truncate(output_len);
    Ok(output)
}
