use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kinds of resources the manager hands out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResourceClass {
    Room,
    Script,
    Costume,
    Sound,
    Charset,
}

impl ResourceClass {
    /// Classes that take part in the eviction sweep.
    pub const EVICTABLE: [ResourceClass; 4] = [
        ResourceClass::Room,
        ResourceClass::Script,
        ResourceClass::Costume,
        ResourceClass::Sound,
    ];
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResourceClass::Room => "room",
            ResourceClass::Script => "script",
            ResourceClass::Costume => "costume",
            ResourceClass::Sound => "sound",
            ResourceClass::Charset => "charset",
        };
        write!(f, "{}", name)
    }
}

/// Where a resource lives: a room (or, for room entries of bundled games, a disk) and an offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceLocator {
    pub room_number: u8,
    pub offset: u32,
}

impl ResourceLocator {
    pub const ABSENT_OFFSET: u32 = 0xFFFF_FFFF;

    pub const ABSENT: ResourceLocator = ResourceLocator {
        room_number: 0,
        offset: Self::ABSENT_OFFSET,
    };

    pub fn new(room_number: u8, offset: u32) -> Self {
        Self {
            room_number,
            offset,
        }
    }

    /// Build a locator from a 16-bit directory offset, where `0xFFFF` marks an empty slot.
    pub fn from_short_offset(room_number: u8, offset: u16) -> Self {
        match offset {
            0xFFFF => Self::new(room_number, Self::ABSENT_OFFSET),
            offset => Self::new(room_number, offset as u32),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.room_number == 0 || self.offset == Self::ABSENT_OFFSET
    }
}

impl Default for ResourceLocator {
    fn default() -> Self {
        Self::ABSENT
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_absent() {
            write!(f, "<absent>")
        } else {
            write!(f, "room {} @ {:#x}", self.room_number, self.offset)
        }
    }
}
