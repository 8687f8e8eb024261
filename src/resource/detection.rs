//! Recognising a game from the hash of its index file.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::encryption::md5_engine::Md5Engine;
use crate::resource::descriptor::GameDescriptor;
use crate::resource::storage::{FileStorage, StorageError};

/// Known games keyed by the lowercase hex MD5 of their index file.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GameCatalog {
    entries: HashMap<String, GameDescriptor>,
}

impl GameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, md5: &str, descriptor: GameDescriptor) -> Self {
        self.insert(md5, descriptor);
        self
    }

    pub fn insert(&mut self, md5: &str, descriptor: GameDescriptor) {
        self.entries.insert(md5.to_ascii_lowercase(), descriptor);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, md5: &str) -> Option<&GameDescriptor> {
        self.entries.get(&md5.to_ascii_lowercase())
    }

    /// The descriptor whose index file is present in `storage` and hashes to a catalog entry.
    pub fn identify<S: FileStorage + ?Sized>(
        &self,
        storage: &S,
    ) -> Result<Option<&GameDescriptor>, StorageError> {
        let mut index_files: Vec<&str> = self
            .entries
            .values()
            .map(|descriptor| descriptor.index_file.as_str())
            .collect();
        index_files.sort_unstable();
        index_files.dedup();

        for name in index_files {
            if !storage.exists(name) {
                continue;
            }
            let digest = Md5Engine::hex_digest(&storage.read(name)?);
            match self.entries.get(&digest) {
                Some(descriptor) if descriptor.index_file.eq_ignore_ascii_case(name) => {
                    log::debug!("Identified {} from {} ({})", descriptor.name, name, digest);
                    return Ok(Some(descriptor));
                }
                _ => log::trace!("{} hashes to unknown digest {}", name, digest),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::descriptor::GameId;
    use crate::resource::storage::MemoryStorage;
    use crate::Generation;

    #[test]
    fn test_identify_by_index_hash() -> Result<(), StorageError> {
        let monkey = GameDescriptor::new(GameId::Monkey, "monkey", Generation::V5);
        let tentacle = GameDescriptor::new(GameId::Tentacle, "tentacle", Generation::V6);
        let catalog = GameCatalog::new()
            .with_entry(&Md5Engine::hex_digest(b"monkey index"), monkey.clone())
            .with_entry(&Md5Engine::hex_digest(b"tentacle index"), tentacle);

        let storage = MemoryStorage::new().with_file("monkey.000", b"monkey index".to_vec());
        assert_eq!(catalog.identify(&storage)?, Some(&monkey));

        let unknown = MemoryStorage::new().with_file("monkey.000", b"patched".to_vec());
        assert_eq!(catalog.identify(&unknown)?, None);
        Ok(())
    }

    #[test]
    fn test_lookup_ignores_case() {
        let catalog = GameCatalog::new().with_entry(
            "D41D8CD98F00B204E9800998ECF8427E",
            GameDescriptor::new(GameId::Zak, "zak", Generation::V2),
        );
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup("d41d8cd98f00b204e9800998ecf8427e").is_some());
    }
}
