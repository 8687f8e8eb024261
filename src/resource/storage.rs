//! Access to the game's files. The rest of the crate never touches the filesystem directly.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

use crate::utils;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Error opening the file: {0}")]
    IoError(#[from] io::Error),

    #[error("File {0} could not be found")]
    FileNotFound(String),
}

pub trait FileStorage {
    /// Read a whole file.
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    fn exists(&self, name: &str) -> bool;

    /// Names of all files in the storage.
    fn list(&self) -> Result<Vec<String>, StorageError>;
}

/// Files in a directory on disk. Lookups fall back to a case-insensitive match.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        utils::find_file_ignore_case(&self.root, name)
    }
}

impl FileStorage for DirectoryStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;
        let file = File::open(&path)?;
        if file.metadata()?.len() == 0 {
            return Ok(vec![]);
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(mmap.to_vec())
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(utils::read_file_names(&self.root)?)
    }
}

/// Files held in memory. Counts reads so callers can check which lookups hit the files.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: BTreeMap<String, Vec<u8>>,
    reads: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, data: Vec<u8>) -> Self {
        self.insert(name, data);
        self
    }

    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.files.insert(name.to_string(), data);
    }

    /// Number of successful and failed [FileStorage::read] calls so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    fn lookup(&self, name: &str) -> Option<&Vec<u8>> {
        self.files.get(name).or_else(|| {
            self.files
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
                .map(|(_, data)| data)
        })
    }
}

impl FileStorage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        self.reads.set(self.reads.get() + 1);
        self.lookup(name)
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.files.keys().cloned().collect())
    }
}
