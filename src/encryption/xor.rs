//! Single-byte XOR obfuscation used by most SCUMM data files.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::resource::descriptor::Platform;
use crate::Generation;

/// A constant XOR key applied to every byte of a file.
///
/// A key of zero is the identity transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct XorKey(pub u8);

impl XorKey {
    pub const NONE: XorKey = XorKey(0x00);
    /// Index files of generations 0 to 4 and the per-room `NN.LFL` files.
    pub const LFL: XorKey = XorKey(0xFF);
    /// `DISKNN.LEC` bundles and the `.000`/`.001` files of generations 5 and 6.
    pub const BUNDLE: XorKey = XorKey(0x69);

    /// The key used by the index file of a game.
    pub fn for_index(generation: Generation, platform: Platform) -> Self {
        match (generation, platform) {
            (Generation::V0, Platform::C64) => XorKey::NONE,
            (Generation::V5, Platform::FmTowns) => XorKey::NONE,
            (g, _) if g <= Generation::V4 => XorKey::LFL,
            (Generation::V5 | Generation::V6, _) => XorKey::BUNDLE,
            _ => XorKey::NONE,
        }
    }

    /// The key used by the room containers of a game.
    pub fn for_containers(generation: Generation, platform: Platform) -> Self {
        match (generation, platform) {
            (Generation::V0, Platform::C64) => XorKey::NONE,
            (Generation::V5, Platform::FmTowns) => XorKey::NONE,
            (g, _) if g <= Generation::V3 => XorKey::LFL,
            (Generation::V4 | Generation::V5 | Generation::V6, _) => XorKey::BUNDLE,
            _ => XorKey::NONE,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn apply_byte(&self, byte: u8) -> u8 {
        byte ^ self.0
    }

    /// Transform a buffer in place. Applying the same key twice restores the input.
    pub fn apply(&self, buffer: &mut [u8]) {
        if self.is_identity() {
            return;
        }
        buffer.iter_mut().for_each(|byte| *byte ^= self.0);
    }
}
