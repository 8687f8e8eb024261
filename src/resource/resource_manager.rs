//! Lazy, budgeted access to the resources of one game.
//!
//! The manager binds an index to the decoder of the game's generation, opens the right container
//! for every request and keeps decoded resources resident until memory pressure evicts them.
//! Eviction is generational: every resident entry carries a counter that starts at 1 and ages by
//! one on every sweep, and a sweep under pressure drops the entries with the lowest counter of at
//! least 2 first. Locked entries and entries the engine reports in use are never dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::misc::byte_cursor::ByteCursor;
use crate::resource::cache::{CacheControl, ResourceCache, ResourceCost};
use crate::resource::decoders::{DecodeError, FormatDecoder};
use crate::resource::descriptor::{AudioDriver, GameDescriptor};
use crate::resource::index::{EngineLimits, IndexError, ResourceIndex};
use crate::resource::locator::{ResourceClass, ResourceLocator};
use crate::resource::room::Room;
use crate::resource::storage::{FileStorage, StorageError};
use crate::Generation;

#[derive(Debug, Error)]
pub enum ResourceManagerError {
    #[error("Index error: {0}")]
    IndexError(#[from] IndexError),

    #[error("Failed to decode {class} {id}: {source}")]
    DecodeError {
        class: ResourceClass,
        id: u16,
        source: DecodeError,
    },

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Cache tuning. The thresholds are in bytes of decoded resources.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceManagerConfig {
    /// A sweep under pressure evicts until the resident total drops below this.
    pub min_heap_threshold: usize,
    /// Resident bytes above this trigger eviction.
    pub max_heap_threshold: usize,
    pub counter_max: u8,
    /// Keep container bytes and their room offset tables after the first read.
    pub cache_containers: bool,
    pub default_audio_driver: AudioDriver,
}

impl ResourceManagerConfig {
    pub fn for_generation(generation: Generation) -> Self {
        let max_heap_threshold = match generation {
            Generation::V7 | Generation::V8 => 2_500_000,
            _ => 550_000,
        };
        Self {
            min_heap_threshold: 400_000,
            max_heap_threshold,
            counter_max: 127,
            cache_containers: true,
            default_audio_driver: AudioDriver::default(),
        }
    }

    pub fn with_thresholds(mut self, min: usize, max: usize) -> Self {
        self.min_heap_threshold = min;
        self.max_heap_threshold = max;
        self
    }

    pub fn validate(&self) -> Result<(), ResourceManagerError> {
        if self.min_heap_threshold >= self.max_heap_threshold {
            return Err(ResourceManagerError::InvalidConfiguration(format!(
                "minimum heap threshold {} must be below the maximum {}",
                self.min_heap_threshold, self.max_heap_threshold
            )));
        }
        if self.counter_max < 2 {
            return Err(ResourceManagerError::InvalidConfiguration(format!(
                "counter maximum {} leaves nothing evictable",
                self.counter_max
            )));
        }
        Ok(())
    }
}

/// Tells the manager which resources the running engine still references.
pub trait ResourceUsage {
    fn is_in_use(&self, class: ResourceClass, id: u16) -> bool;
}

impl<F: Fn(ResourceClass, u16) -> bool> ResourceUsage for F {
    fn is_in_use(&self, class: ResourceClass, id: u16) -> bool {
        self(class, id)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NeverInUse;

impl ResourceUsage for NeverInUse {
    fn is_in_use(&self, _: ResourceClass, _: u16) -> bool {
        false
    }
}

/// A sound track together with the driver it was picked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundData {
    pub driver: AudioDriver,
    pub data: Vec<u8>,
}

impl ResourceCost for SoundData {
    fn cost(&self) -> usize {
        self.data.len()
    }
}

/// What one [ResourceManager::expire] sweep did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpireReport {
    pub evicted: Vec<(ResourceClass, u16)>,
    pub freed_bytes: usize,
    /// The sweep stopped because nothing evictable was left.
    pub exhausted: bool,
}

macro_rules! class_accessors {
    ($lock:ident, $unlock:ident, $counter:ident, $set_counter:ident, $class:expr) => {
        pub fn $lock(&mut self, id: u16) {
            self.lock($class, id)
        }

        pub fn $unlock(&mut self, id: u16) {
            self.unlock($class, id)
        }

        pub fn $counter(&self, id: u16) -> Option<u8> {
            self.counter($class, id)
        }

        pub fn $set_counter(&mut self, id: u16, value: u8) -> bool {
            self.set_counter($class, id, value)
        }
    };
}

pub struct ResourceManager<S: FileStorage> {
    storage: S,
    descriptor: GameDescriptor,
    index: ResourceIndex,
    decoder: FormatDecoder,
    config: ResourceManagerConfig,
    usage: Box<dyn ResourceUsage>,
    rooms: ResourceCache<Room>,
    scripts: ResourceCache<Vec<u8>>,
    costumes: ResourceCache<Vec<u8>>,
    sounds: ResourceCache<SoundData>,
    charsets: BTreeMap<u16, Vec<u8>>,
    unreadable: BTreeSet<(ResourceClass, u16)>,
    allocated: usize,
    containers: HashMap<String, Rc<[u8]>>,
    offset_tables: HashMap<String, BTreeMap<u8, u32>>,
    last_expire: Option<ExpireReport>,
}

impl<S: FileStorage> ResourceManager<S> {
    /// Load the game's index and set up the cache with the generation's default thresholds.
    pub fn new(storage: S, descriptor: GameDescriptor) -> Result<Self, ResourceManagerError> {
        let config = ResourceManagerConfig::for_generation(descriptor.generation);
        Self::with_config(storage, descriptor, config)
    }

    pub fn with_config(
        storage: S,
        descriptor: GameDescriptor,
        config: ResourceManagerConfig,
    ) -> Result<Self, ResourceManagerError> {
        let index = ResourceIndex::load(&storage, &descriptor)?;
        Self::from_index(storage, descriptor, index, config)
    }

    /// Use an index that was already parsed.
    pub fn from_index(
        storage: S,
        descriptor: GameDescriptor,
        index: ResourceIndex,
        config: ResourceManagerConfig,
    ) -> Result<Self, ResourceManagerError> {
        config.validate()?;
        Ok(Self {
            decoder: FormatDecoder::for_game(&descriptor),
            storage,
            descriptor,
            index,
            config,
            usage: Box::new(NeverInUse),
            rooms: ResourceCache::new(),
            scripts: ResourceCache::new(),
            costumes: ResourceCache::new(),
            sounds: ResourceCache::new(),
            charsets: BTreeMap::new(),
            unreadable: BTreeSet::new(),
            allocated: 0,
            containers: HashMap::new(),
            offset_tables: HashMap::new(),
            last_expire: None,
        })
    }

    /// Consult `usage` before evicting anything.
    pub fn with_usage(mut self, usage: impl ResourceUsage + 'static) -> Self {
        self.usage = Box::new(usage);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn descriptor(&self) -> &GameDescriptor {
        &self.descriptor
    }

    pub fn index(&self) -> &ResourceIndex {
        &self.index
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.index.limits
    }

    pub fn config(&self) -> &ResourceManagerConfig {
        &self.config
    }

    pub fn decoder(&self) -> &FormatDecoder {
        &self.decoder
    }

    /// Bytes of rooms, scripts, costumes and sounds currently resident.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    pub fn last_expire(&self) -> Option<&ExpireReport> {
        self.last_expire.as_ref()
    }

    pub fn room(&mut self, id: u16) -> Result<Option<&Room>, ResourceManagerError> {
        self.load_room(id)?;
        Ok(self.rooms.get(id))
    }

    pub fn script(&mut self, id: u16) -> Result<Option<&[u8]>, ResourceManagerError> {
        self.load_script(id)?;
        Ok(self.scripts.get(id).map(Vec::as_slice))
    }

    pub fn costume(&mut self, id: u16) -> Result<Option<&[u8]>, ResourceManagerError> {
        self.load_costume(id)?;
        Ok(self.costumes.get(id).map(Vec::as_slice))
    }

    /// The track of sound `id` picked for `driver`.
    pub fn sound(
        &mut self,
        driver: AudioDriver,
        id: u16,
    ) -> Result<Option<&[u8]>, ResourceManagerError> {
        self.load_sound(driver, id)?;
        Ok(self
            .sounds
            .get(id)
            .filter(|sound| sound.driver == driver)
            .map(|sound| sound.data.as_slice()))
    }

    /// The track of sound `id` picked for the configured default driver.
    pub fn default_sound(&mut self, id: u16) -> Result<Option<&[u8]>, ResourceManagerError> {
        let driver = self.config.default_audio_driver;
        self.sound(driver, id)
    }

    pub fn charset(&mut self, id: u16) -> Result<Option<&[u8]>, ResourceManagerError> {
        if !self.charsets.contains_key(&id) {
            if let Some(data) = self.read_charset(id)? {
                self.charsets.insert(id, data);
            }
        }
        Ok(self.charsets.get(&id).map(Vec::as_slice))
    }

    pub fn load_room(&mut self, id: u16) -> Result<(), ResourceManagerError> {
        let locator = match self.pending_locator(ResourceClass::Room, id) {
            Some(locator) => locator,
            None => return Ok(()),
        };
        if let Some(room) =
            self.decode_at(ResourceClass::Room, id, locator, |decoder, cursor, offset| {
                decoder.read_room(cursor, offset)
            })?
        {
            self.expire(room.cost());
            let (added, replaced) = self.rooms.insert(id, room);
            self.account(added, replaced);
        }
        Ok(())
    }

    /// Scripts that fail to decode are logged once and treated as absent from then on.
    pub fn load_script(&mut self, id: u16) -> Result<(), ResourceManagerError> {
        let locator = match self.pending_locator(ResourceClass::Script, id) {
            Some(locator) => locator,
            None => return Ok(()),
        };
        let decoded = self.decode_at(ResourceClass::Script, id, locator, |decoder, cursor, offset| {
            decoder.read_script(cursor, offset)
        });
        match decoded {
            Ok(Some(data)) => {
                self.expire(data.cost());
                let (added, replaced) = self.scripts.insert(id, data);
                self.account(added, replaced);
            }
            Ok(None) => {}
            Err(ResourceManagerError::DecodeError { source, .. }) => {
                log::warn!("Script {} at {} is unreadable, treating it as absent: {}", id, locator, source);
                self.unreadable.insert((ResourceClass::Script, id));
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    pub fn load_costume(&mut self, id: u16) -> Result<(), ResourceManagerError> {
        let locator = match self.pending_locator(ResourceClass::Costume, id) {
            Some(locator) => locator,
            None => return Ok(()),
        };
        if let Some(data) =
            self.decode_at(ResourceClass::Costume, id, locator, |decoder, cursor, offset| {
                decoder.read_costume(cursor, offset)
            })?
        {
            self.expire(data.cost());
            let (added, replaced) = self.costumes.insert(id, data);
            self.account(added, replaced);
        }
        Ok(())
    }

    /// A sound resident for another driver is decoded again for `driver`.
    pub fn load_sound(&mut self, driver: AudioDriver, id: u16) -> Result<(), ResourceManagerError> {
        if matches!(self.sounds.get(id), Some(sound) if sound.driver == driver) {
            return Ok(());
        }
        let locator = match self.index.locator(ResourceClass::Sound, id) {
            Some(locator) if id != 0 => locator,
            _ => return Ok(()),
        };
        let decoded = self.decode_at(ResourceClass::Sound, id, locator, |decoder, cursor, offset| {
            decoder.read_sound(cursor, driver, offset)
        })?;
        if let Some(Some(data)) = decoded {
            let sound = SoundData { driver, data };
            self.expire(sound.cost());
            let (added, replaced) = self.sounds.insert(id, sound);
            self.account(added, replaced);
        }
        Ok(())
    }

    pub fn is_resident(&self, class: ResourceClass, id: u16) -> bool {
        match class {
            ResourceClass::Room => self.rooms.contains(id),
            ResourceClass::Script => self.scripts.contains(id),
            ResourceClass::Costume => self.costumes.contains(id),
            ResourceClass::Sound => self.sounds.contains(id),
            ResourceClass::Charset => self.charsets.contains_key(&id),
        }
    }

    /// Whether a failed decode marked the resource absent.
    pub fn is_unreadable(&self, class: ResourceClass, id: u16) -> bool {
        self.unreadable.contains(&(class, id))
    }

    /// Charsets are not part of the eviction sweep and ignore locks.
    pub fn lock(&mut self, class: ResourceClass, id: u16) {
        if let Some(cache) = self.cache_mut(class) {
            cache.lock(id);
        }
    }

    pub fn unlock(&mut self, class: ResourceClass, id: u16) {
        if let Some(cache) = self.cache_mut(class) {
            cache.unlock(id);
        }
    }

    pub fn is_locked(&self, class: ResourceClass, id: u16) -> bool {
        self.cache(class).map_or(false, |cache| cache.is_locked(id))
    }

    pub fn counter(&self, class: ResourceClass, id: u16) -> Option<u8> {
        self.cache(class).and_then(|cache| cache.counter(id))
    }

    /// Returns false when the resource is not resident. Values above the configured maximum are
    /// clamped.
    pub fn set_counter(&mut self, class: ResourceClass, id: u16, value: u8) -> bool {
        let value = value.min(self.config.counter_max);
        self.cache_mut(class)
            .map_or(false, |cache| cache.set_counter(id, value))
    }

    class_accessors!(lock_room, unlock_room, room_counter, set_room_counter, ResourceClass::Room);
    class_accessors!(
        lock_script,
        unlock_script,
        script_counter,
        set_script_counter,
        ResourceClass::Script
    );
    class_accessors!(
        lock_costume,
        unlock_costume,
        costume_counter,
        set_costume_counter,
        ResourceClass::Costume
    );
    class_accessors!(lock_sound, unlock_sound, sound_counter, set_sound_counter, ResourceClass::Sound);

    /// Make room for `additional` bytes, then age every counter.
    ///
    /// Nothing is evicted while the resident total plus `additional` stays within the maximum
    /// threshold. Above it, the entry with the lowest counter of at least 2 that is neither locked
    /// nor in use is evicted, across all classes, until the total drops below the minimum
    /// threshold or no such entry is left.
    pub fn expire(&mut self, additional: usize) -> ExpireReport {
        let mut report = ExpireReport::default();

        if self.allocated + additional > self.config.max_heap_threshold {
            while self.allocated + additional >= self.config.min_heap_threshold {
                let (class, id) = match self.eviction_candidate() {
                    Some(candidate) => candidate,
                    None => {
                        report.exhausted = true;
                        break;
                    }
                };
                let freed = self
                    .cache_mut(class)
                    .and_then(|cache| cache.evict(id))
                    .unwrap_or(0);
                self.allocated = self.allocated.saturating_sub(freed);
                report.freed_bytes += freed;
                report.evicted.push((class, id));
                log::debug!("Evicted {} {} ({} bytes), {} bytes resident", class, id, freed, self.allocated);
            }
            if report.exhausted {
                log::debug!(
                    "Nothing left to evict with {} bytes resident and {} requested",
                    self.allocated,
                    additional
                );
            }
        }

        let counter_max = self.config.counter_max;
        for class in ResourceClass::EVICTABLE {
            if let Some(cache) = self.cache_mut(class) {
                cache.age(counter_max);
            }
        }

        self.last_expire = Some(report.clone());
        report
    }

    fn eviction_candidate(&self) -> Option<(ResourceClass, u16)> {
        let mut best: Option<(ResourceClass, u16, u8)> = None;
        for class in ResourceClass::EVICTABLE {
            let cache = match self.cache(class) {
                Some(cache) => cache,
                None => continue,
            };
            let in_use = |id: u16| self.usage.is_in_use(class, id);
            if let Some((id, counter)) = cache.eviction_candidate(&in_use) {
                if best.map_or(true, |(_, _, lowest)| counter < lowest) {
                    best = Some((class, id, counter));
                }
            }
        }
        best.map(|(class, id, _)| (class, id))
    }

    fn cache(&self, class: ResourceClass) -> Option<&dyn CacheControl> {
        match class {
            ResourceClass::Room => Some(&self.rooms),
            ResourceClass::Script => Some(&self.scripts),
            ResourceClass::Costume => Some(&self.costumes),
            ResourceClass::Sound => Some(&self.sounds),
            ResourceClass::Charset => None,
        }
    }

    fn cache_mut(&mut self, class: ResourceClass) -> Option<&mut dyn CacheControl> {
        match class {
            ResourceClass::Room => Some(&mut self.rooms),
            ResourceClass::Script => Some(&mut self.scripts),
            ResourceClass::Costume => Some(&mut self.costumes),
            ResourceClass::Sound => Some(&mut self.sounds),
            ResourceClass::Charset => None,
        }
    }

    fn account(&mut self, added: usize, replaced: usize) {
        self.allocated = (self.allocated + added).saturating_sub(replaced);
    }

    /// The locator of a resource that still has to be loaded: `None` for the id 0 sentinel,
    /// resident or unreadable resources and absent directory entries.
    fn pending_locator(&self, class: ResourceClass, id: u16) -> Option<ResourceLocator> {
        if id == 0 || self.is_resident(class, id) || self.is_unreadable(class, id) {
            return None;
        }
        let locator = self.index.locator(class, id);
        if locator.is_none() {
            log::trace!("No {} {} in the index", class, id);
        }
        locator
    }

    fn decode_at<T>(
        &mut self,
        class: ResourceClass,
        id: u16,
        locator: ResourceLocator,
        decode: impl FnOnce(&FormatDecoder, &mut ByteCursor, usize) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, ResourceManagerError> {
        let (data, offset) = match self.resolve(class, id, locator)? {
            Some(resolved) => resolved,
            None => return Ok(None),
        };
        let mut cursor = self.decoder.cursor(&data);
        let value = decode(&self.decoder, &mut cursor, offset)
            .map_err(|source| ResourceManagerError::DecodeError { class, id, source })?;
        log::debug!("Loaded {} {} from {}", class, id, locator);
        Ok(Some(value))
    }

    /// The container bytes holding a resource and the absolute offset inside them.
    fn resolve(
        &mut self,
        class: ResourceClass,
        id: u16,
        locator: ResourceLocator,
    ) -> Result<Option<(Rc<[u8]>, usize)>, ResourceManagerError> {
        let room = match class {
            ResourceClass::Room => match u8::try_from(id) {
                Ok(room) => room,
                Err(_) => return Ok(None),
            },
            _ => locator.room_number,
        };

        if !self.descriptor.generation.is_bundled() {
            let file = self.descriptor.container_file_name(room as u32);
            let data = self.container(&file)?;
            return Ok(Some((data, locator.offset as usize)));
        }

        let disk = match class {
            ResourceClass::Room => locator.room_number,
            _ => match self.index.locator(ResourceClass::Room, room as u16) {
                Some(room_locator) => room_locator.room_number,
                None => {
                    log::trace!("{} {} lives in room {}, which is not in the index", class, id, room);
                    return Ok(None);
                }
            },
        };
        let file = self.descriptor.container_file_name(disk as u32);
        let data = self.container(&file)?;
        let room_offset = self
            .room_offsets(&file, &data)
            .map_err(|source| ResourceManagerError::DecodeError { class, id, source })?
            .get(&room)
            .copied();
        match room_offset {
            Some(room_offset) => Ok(Some((data, room_offset as usize + locator.offset as usize))),
            None => Err(ResourceManagerError::DecodeError {
                class,
                id,
                source: DecodeError::malformed(
                    format!("room {} in the offset table of {}", room, file),
                    "no entry",
                    0,
                ),
            }),
        }
    }

    fn container(&mut self, file: &str) -> Result<Rc<[u8]>, ResourceManagerError> {
        if let Some(data) = self.containers.get(file) {
            return Ok(Rc::clone(data));
        }
        let data: Rc<[u8]> = Rc::from(self.storage.read(file)?);
        log::debug!("Read container {} ({} bytes)", file, data.len());
        if self.config.cache_containers {
            self.containers.insert(file.to_string(), Rc::clone(&data));
        }
        Ok(data)
    }

    fn room_offsets(&mut self, file: &str, data: &[u8]) -> Result<&BTreeMap<u8, u32>, DecodeError> {
        if !self.offset_tables.contains_key(file) {
            let table = self
                .decoder
                .read_room_offset_table(&mut self.decoder.cursor(data))?;
            self.offset_tables.insert(file.to_string(), table);
        }
        Ok(&self.offset_tables[file])
    }

    fn read_charset(&mut self, id: u16) -> Result<Option<Vec<u8>>, ResourceManagerError> {
        match self.descriptor.generation {
            Generation::V0 | Generation::V1 | Generation::V2 => Ok(None),
            Generation::V3 | Generation::V4 => {
                let exists = self
                    .descriptor
                    .charset_file_name(id)
                    .map_or(false, |name| self.storage.exists(&name));
                if !exists {
                    return Ok(None);
                }
                self.decoder
                    .read_charset(&self.storage, &self.descriptor, id)
                    .map(Some)
                    .map_err(|source| ResourceManagerError::DecodeError {
                        class: ResourceClass::Charset,
                        id,
                        source,
                    })
            }
            _ => match self.index.locator(ResourceClass::Charset, id) {
                Some(locator) => {
                    self.decode_at(ResourceClass::Charset, id, locator, |decoder, cursor, offset| {
                        decoder.read_charset_chunk(cursor, offset)
                    })
                }
                None => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = ResourceManagerConfig::for_generation(Generation::V6);
        assert_eq!(config.max_heap_threshold, 550_000);
        assert!(config.validate().is_ok());
        assert_eq!(
            ResourceManagerConfig::for_generation(Generation::V8).max_heap_threshold,
            2_500_000
        );
        assert!(matches!(
            config.with_thresholds(100, 100).validate(),
            Err(ResourceManagerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_closures_report_usage() {
        let usage = |class: ResourceClass, id: u16| class == ResourceClass::Costume && id == 3;
        assert!(usage.is_in_use(ResourceClass::Costume, 3));
        assert!(!usage.is_in_use(ResourceClass::Script, 3));
        assert!(!NeverInUse.is_in_use(ResourceClass::Room, 1));
    }
}
