use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A chunk tag: two bytes for generations 3 and 4, four ASCII bytes from generation 5 on.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChunkTag {
    bytes: [u8; 4],
    len: u8,
}

impl ChunkTag {
    pub const fn small(tag: &[u8; 2]) -> Self {
        Self {
            bytes: [tag[0], tag[1], 0, 0],
            len: 2,
        }
    }

    pub const fn block(tag: &[u8; 4]) -> Self {
        Self {
            bytes: *tag,
            len: 4,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.as_bytes().starts_with(prefix)
    }

    pub fn to_ascii_string(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect()
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_ascii_string())
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}'", self.to_ascii_string())
    }
}
