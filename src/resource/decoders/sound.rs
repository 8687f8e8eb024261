//! Picking the track of a sound resource that suits the configured audio driver.

use crate::misc::byte_cursor::ByteCursor;
use crate::misc::chunk_iterator::{Chunk, ChunkIterator, TagScheme};
use crate::misc::tag::ChunkTag;
use crate::resource::decoders::{expect_chunk, tags, DecodeError};
use crate::resource::descriptor::AudioDriver;

/// The second byte of a CMS `AD` track is 0x80 when it holds music rather than effects.
const CMS_MUSIC_MARKER: u8 = 0x80;

/// Every track tag a generation 5+ sound may carry.
const BLOCK_TRACKS: [ChunkTag; 6] = [
    tags::SPK,
    tags::ADL,
    tags::AMI,
    tags::ROL,
    tags::GMD,
    tags::MIDI,
];

fn payload(cursor: &mut ByteCursor, chunk: &Chunk) -> Result<Vec<u8>, DecodeError> {
    cursor.seek(chunk.payload_offset)?;
    Ok(cursor.read_bytes(chunk.payload_len())?)
}

/// Read a generation 3/4 `SO` chunk holding `WA` (PC speaker) and `AD` (AdLib) tracks.
pub fn read_small_sound(
    cursor: &mut ByteCursor,
    driver: AudioDriver,
    offset: usize,
) -> Result<Option<Vec<u8>>, DecodeError> {
    let sound = expect_chunk(cursor, TagScheme::Small, offset, tags::SO)?;
    let children = ChunkIterator::over(cursor, TagScheme::Small, &sound)?.collect_chunks()?;
    let wave = children.iter().find(|chunk| chunk.tag == tags::WA);
    let adlib = children.iter().find(|chunk| chunk.tag == tags::AD);

    let chosen = match driver {
        AudioDriver::PcSpeaker | AudioDriver::PcJr => wave.or(adlib),
        AudioDriver::Cms => match adlib {
            Some(chunk) if is_cms_music(cursor, chunk)? => Some(chunk),
            _ => wave,
        },
        AudioDriver::AdLib | AudioDriver::Midi => adlib.or(wave),
        _ => wave.or(adlib),
    };

    match chosen {
        Some(chunk) => {
            log::trace!("Picked {} track at {:#x} for {}", chunk.tag, chunk.offset, driver);
            Ok(Some(payload(cursor, chunk)?))
        }
        None => Ok(None),
    }
}

fn is_cms_music(cursor: &mut ByteCursor, chunk: &Chunk) -> Result<bool, DecodeError> {
    if chunk.payload_len() < 2 {
        return Ok(false);
    }
    cursor.seek(chunk.payload_offset + 1)?;
    Ok(cursor.read_u8()? == CMS_MUSIC_MARKER)
}

/// Track tags to try for a driver, most preferred first.
fn block_preferences(driver: AudioDriver) -> &'static [ChunkTag] {
    match driver {
        AudioDriver::PcSpeaker | AudioDriver::PcJr => &[tags::SPK],
        AudioDriver::Cms => &[tags::ADL, tags::SPK],
        AudioDriver::AdLib => &[tags::ADL],
        AudioDriver::Amiga => &[tags::AMI, tags::SPK],
        AudioDriver::Midi => &[tags::ROL, tags::GMD, tags::MIDI, tags::SPK],
        _ => &[tags::SPK],
    }
}

/// Read a generation 5+ `SOUN` chunk. Tracks may sit directly inside it or inside a `SOU `
/// wrapper. A payload without any known track is returned whole.
pub fn read_block_sound(
    cursor: &mut ByteCursor,
    driver: AudioDriver,
    offset: usize,
) -> Result<Option<Vec<u8>>, DecodeError> {
    let sound = expect_chunk(cursor, TagScheme::Block, offset, tags::SOUN)?;

    let mut tracks = vec![];
    let children = match ChunkIterator::over(cursor, TagScheme::Block, &sound)?.collect_chunks() {
        Ok(children) => children,
        Err(e) => {
            log::debug!("SOUN at {:#x} holds raw sample data ({}), returning it whole", offset, e);
            return Ok(Some(payload(cursor, &sound)?));
        }
    };
    for chunk in children {
        if chunk.tag == tags::SOU {
            let inner = ChunkIterator::over(cursor, TagScheme::Block, &chunk)?.collect_chunks()?;
            tracks.extend(inner.into_iter().filter(|c| BLOCK_TRACKS.contains(&c.tag)));
        } else if BLOCK_TRACKS.contains(&chunk.tag) {
            tracks.push(chunk);
        }
    }

    if tracks.is_empty() {
        return Ok(Some(payload(cursor, &sound)?));
    }

    let chosen = block_preferences(driver)
        .iter()
        .chain(std::iter::once(&tags::SPK))
        .find_map(|tag| tracks.iter().find(|chunk| chunk.tag == *tag));

    match chosen {
        Some(chunk) => {
            log::trace!("Picked {} track at {:#x} for {}", chunk.tag, chunk.offset, driver);
            Ok(Some(payload(cursor, chunk)?))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::misc::byte_writer::ByteWriter;

    fn small_sound() -> Vec<u8> {
        let mut adlib = vec![0u8; 20];
        adlib[0] = 0xAD;
        adlib[1] = 0x01;
        let mut writer = ByteWriter::new();
        let so = writer.begin_chunk(TagScheme::Small, tags::SO);
        writer.write_chunk(TagScheme::Small, tags::WA, &[0x11; 10]);
        writer.write_chunk(TagScheme::Small, tags::AD, &adlib);
        writer.end_chunk(so);
        writer.into_bytes()
    }

    #[test]
    fn test_small_sound_selection() -> Result<(), DecodeError> {
        let data = small_sound();

        let cms = read_small_sound(&mut ByteCursor::new(&data), AudioDriver::Cms, 0)?
            .expect("a CMS track");
        assert_eq!(cms, vec![0x11; 10]);

        let adlib = read_small_sound(&mut ByteCursor::new(&data), AudioDriver::AdLib, 0)?
            .expect("an AdLib track");
        assert_eq!(adlib.len(), 20);
        assert_eq!(adlib[0], 0xAD);

        let speaker = read_small_sound(&mut ByteCursor::new(&data), AudioDriver::PcSpeaker, 0)?;
        assert_eq!(speaker, Some(vec![0x11; 10]));
        Ok(())
    }

    #[test]
    fn test_small_sound_without_tracks_is_absent() -> Result<(), DecodeError> {
        let mut writer = ByteWriter::new();
        writer.write_chunk(TagScheme::Small, tags::SO, &[]);
        let data = writer.into_bytes();
        assert_eq!(read_small_sound(&mut ByteCursor::new(&data), AudioDriver::AdLib, 0)?, None);
        Ok(())
    }

    #[test]
    fn test_block_sound_prefers_driver_track() -> Result<(), DecodeError> {
        let mut writer = ByteWriter::new();
        let soun = writer.begin_chunk(TagScheme::Block, tags::SOUN);
        let sou = writer.begin_chunk(TagScheme::Block, tags::SOU);
        writer.write_chunk(TagScheme::Block, tags::SPK, &[1]);
        writer.write_chunk(TagScheme::Block, tags::ADL, &[2]);
        writer.write_chunk(TagScheme::Block, tags::ROL, &[3]);
        writer.end_chunk(sou);
        writer.end_chunk(soun);
        let data = writer.into_bytes();

        let pick = |driver| read_block_sound(&mut ByteCursor::new(&data), driver, 0);
        assert_eq!(pick(AudioDriver::AdLib)?, Some(vec![2]));
        assert_eq!(pick(AudioDriver::Midi)?, Some(vec![3]));
        assert_eq!(pick(AudioDriver::Amiga)?, Some(vec![1]));
        Ok(())
    }

    #[test]
    fn test_block_sound_without_tracks_returns_payload() -> Result<(), DecodeError> {
        let mut writer = ByteWriter::new();
        let soun = writer.begin_chunk(TagScheme::Block, tags::SOUN);
        writer.write_chunk(TagScheme::Block, ChunkTag::block(b"VCTL"), &[7, 7]);
        writer.end_chunk(soun);
        let data = writer.into_bytes();

        let sound = read_block_sound(&mut ByteCursor::new(&data), AudioDriver::AdLib, 0)?;
        assert_eq!(sound.map(|s| s.len()), Some(10));
        Ok(())
    }

    #[test]
    fn test_block_sound_with_raw_samples_returns_payload() -> Result<(), DecodeError> {
        // the bytes after the first four read as a chunk size below the header size
        let samples = [0x10, 0x20, 0x30, 0x40, 0, 0, 0, 2, 9, 9];
        let mut writer = ByteWriter::new();
        writer.write_chunk(TagScheme::Block, tags::SOUN, &samples);
        let data = writer.into_bytes();

        let sound = read_block_sound(&mut ByteCursor::new(&data), AudioDriver::AdLib, 0)?;
        assert_eq!(sound, Some(samples.to_vec()));
        Ok(())
    }
}
