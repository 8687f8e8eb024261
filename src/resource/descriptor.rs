//! Identification of a game: which title it is, which on-disk generation it uses and how its
//! files are named.

use std::fmt;

use lazy_regex::regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::encryption::xor::XorKey;
use crate::Generation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GameId {
    Maniac,
    Zak,
    Indy3,
    Loom,
    Monkey,
    Monkey2,
    Atlantis,
    Tentacle,
    SamNMax,
    FullThrottle,
    Dig,
    Curse,
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Platform {
    #[default]
    Dos,
    Amiga,
    AtariSt,
    C64,
    FmTowns,
    Macintosh,
    Nes,
    Apple2gs,
    Windows,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Language {
    #[default]
    English,
    German,
    French,
    Italian,
    Spanish,
    Portuguese,
    Japanese,
    Korean,
    Other,
}

/// The audio hardware the embedding engine plays through. Selects which track of a sound
/// resource is returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AudioDriver {
    PcSpeaker,
    PcJr,
    Cms,
    #[default]
    AdLib,
    Amiga,
    Midi,
    None,
}

impl fmt::Display for AudioDriver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AudioDriver::PcSpeaker => "PC speaker",
            AudioDriver::PcJr => "PCjr",
            AudioDriver::Cms => "CMS",
            AudioDriver::AdLib => "AdLib",
            AudioDriver::Amiga => "Amiga",
            AudioDriver::Midi => "MIDI",
            AudioDriver::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Everything the resource layer needs to know about a game before touching its files.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GameDescriptor {
    pub game_id: GameId,
    /// Short name substituted for `%s` in file name patterns, e.g. `monkey2`.
    pub name: String,
    pub generation: Generation,
    pub platform: Platform,
    pub language: Language,
    pub index_file: String,
    /// sprintf-like container name pattern: `%d`, `%0Nd` and `%s` are supported.
    pub container_pattern: String,
}

impl GameDescriptor {
    /// A DOS descriptor with the conventional file names of its generation.
    pub fn new(game_id: GameId, name: &str, generation: Generation) -> Self {
        let (index_pattern, container_pattern) = match generation {
            Generation::V0 | Generation::V1 | Generation::V2 | Generation::V3 => {
                ("00.LFL", "%02d.LFL")
            }
            Generation::V4 => ("000.LFL", "DISK%02d.LEC"),
            Generation::V5 | Generation::V6 => ("%s.000", "%s.%03d"),
            Generation::V7 | Generation::V8 => ("%s.la0", "%s.la%d"),
        };
        Self {
            game_id,
            name: name.to_string(),
            generation,
            platform: Platform::Dos,
            language: Language::English,
            index_file: format_file_name(index_pattern, name, 0),
            container_pattern: container_pattern.to_string(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_container_pattern(mut self, pattern: &str) -> Self {
        self.container_pattern = pattern.to_string();
        self
    }

    pub fn with_index_file(mut self, index_file: &str) -> Self {
        self.index_file = index_file.to_string();
        self
    }

    /// Name of the container with the given room (generations 0 to 3) or disk number.
    pub fn container_file_name(&self, number: u32) -> String {
        format_file_name(&self.container_pattern, &self.name, number)
    }

    /// Name of a standalone charset file. Only generations 3 and 4 store charsets that way.
    pub fn charset_file_name(&self, id: u16) -> Option<String> {
        match self.generation {
            Generation::V3 if id < 100 => Some(format!("{:02}.LFL", 99 - id)),
            Generation::V4 => Some(format!("{:03}.LFL", 900 + id as u32)),
            _ => None,
        }
    }

    pub fn index_key(&self) -> XorKey {
        XorKey::for_index(self.generation, self.platform)
    }

    pub fn container_key(&self) -> XorKey {
        XorKey::for_containers(self.generation, self.platform)
    }
}

/// Expand a sprintf-like file name pattern.
///
/// `%s` becomes `game_name`, `%d` and `%Nd` the number, `%0Nd` the zero padded number.
pub fn format_file_name(pattern: &str, game_name: &str, number: u32) -> String {
    let placeholder = regex!(r"%(0?)(\d*)([ds])");
    let mut name = String::with_capacity(pattern.len() + 8);
    let mut copied = 0;
    for caps in placeholder.captures_iter(pattern) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        name.push_str(&pattern[copied..whole.start()]);
        copied = whole.end();

        if &caps[3] == "s" {
            name.push_str(game_name);
            continue;
        }
        let width = caps[2].parse::<usize>().unwrap_or(0);
        if caps[1].is_empty() {
            name.push_str(&format!("{:width$}", number, width = width));
        } else {
            name.push_str(&format!("{:0width$}", number, width = width));
        }
    }
    name.push_str(&pattern[copied..]);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_name() {
        assert_eq!(format_file_name("%02d.LFL", "", 7), "07.LFL");
        assert_eq!(format_file_name("DISK%02d.LEC", "", 1), "DISK01.LEC");
        assert_eq!(format_file_name("%s.%03d", "monkey", 1), "monkey.001");
        assert_eq!(format_file_name("%s.la%d", "dig", 2), "dig.la2");
        assert_eq!(format_file_name("room%3d", "", 5), "room  5");
    }

    #[test]
    fn test_default_file_names() {
        let tentacle = GameDescriptor::new(GameId::Tentacle, "tentacle", Generation::V6);
        assert_eq!(tentacle.index_file, "tentacle.000");
        assert_eq!(tentacle.container_file_name(1), "tentacle.001");

        let loom = GameDescriptor::new(GameId::Loom, "loom", Generation::V4);
        assert_eq!(loom.index_file, "000.LFL");
        assert_eq!(loom.container_file_name(2), "DISK02.LEC");
        assert_eq!(loom.charset_file_name(2).as_deref(), Some("902.LFL"));

        let indy3 = GameDescriptor::new(GameId::Indy3, "indy3", Generation::V3);
        assert_eq!(indy3.charset_file_name(0).as_deref(), Some("99.LFL"));

        let dig = GameDescriptor::new(GameId::Dig, "dig", Generation::V7);
        assert_eq!(dig.index_file, "dig.la0");
        assert_eq!(dig.charset_file_name(0), None);
    }
}
