//! Id keyed storage of decoded resources with generational counters and a lock set.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::resource::room::Room;

/// Bytes a resident value is charged against the cache budget.
pub trait ResourceCost {
    fn cost(&self) -> usize;
}

impl ResourceCost for Room {
    fn cost(&self) -> usize {
        self.size
    }
}

impl ResourceCost for Vec<u8> {
    fn cost(&self) -> usize {
        self.len()
    }
}

#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    counter: u8,
}

/// One resource class worth of cached values.
#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: IndexMap<u16, CacheEntry<T>>,
    locked: BTreeSet<u16>,
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            locked: BTreeSet::new(),
        }
    }
}

impl<T: ResourceCost> ResourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: u16) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: u16) -> Option<&T> {
        self.entries.get(&id).map(|entry| &entry.value)
    }

    /// Insert a freshly loaded value with a counter of 1. Returns the cost now resident for `id`
    /// and the cost of any value it replaced.
    pub fn insert(&mut self, id: u16, value: T) -> (usize, usize) {
        let cost = value.cost();
        let replaced = self
            .entries
            .insert(id, CacheEntry { value, counter: 1 })
            .map_or(0, |old| old.value.cost());
        (cost, replaced)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }
}

/// Operations the eviction sweep and the lock/counter accessors need, independent of the value
/// type.
pub trait CacheControl {
    fn lock(&mut self, id: u16);

    fn unlock(&mut self, id: u16);

    fn is_locked(&self, id: u16) -> bool;

    fn counter(&self, id: u16) -> Option<u8>;

    /// Returns false when `id` is not resident.
    fn set_counter(&mut self, id: u16, value: u8) -> bool;

    /// The resident entry with the lowest counter that may be evicted: counter of at least 2,
    /// not locked and not reported in use. Ties go to the entry loaded first.
    fn eviction_candidate(&self, in_use: &dyn Fn(u16) -> bool) -> Option<(u16, u8)>;

    /// Bump every nonzero counter below `counter_max` by one.
    fn age(&mut self, counter_max: u8);

    /// Drop an unlocked entry, returning the bytes freed.
    fn evict(&mut self, id: u16) -> Option<usize>;

    fn resident_bytes(&self) -> usize;
}

impl<T: ResourceCost> CacheControl for ResourceCache<T> {
    fn lock(&mut self, id: u16) {
        self.locked.insert(id);
    }

    fn unlock(&mut self, id: u16) {
        self.locked.remove(&id);
    }

    fn is_locked(&self, id: u16) -> bool {
        self.locked.contains(&id)
    }

    fn counter(&self, id: u16) -> Option<u8> {
        self.entries.get(&id).map(|entry| entry.counter)
    }

    fn set_counter(&mut self, id: u16, value: u8) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.counter = value;
                true
            }
            None => false,
        }
    }

    fn eviction_candidate(&self, in_use: &dyn Fn(u16) -> bool) -> Option<(u16, u8)> {
        self.entries
            .iter()
            .filter(|(id, entry)| entry.counter >= 2 && !self.is_locked(**id) && !in_use(**id))
            .map(|(id, entry)| (*id, entry.counter))
            .min_by_key(|(_, counter)| *counter)
    }

    fn age(&mut self, counter_max: u8) {
        self.entries
            .values_mut()
            .filter(|entry| entry.counter != 0 && entry.counter < counter_max)
            .for_each(|entry| entry.counter += 1);
    }

    fn evict(&mut self, id: u16) -> Option<usize> {
        if self.is_locked(id) {
            return None;
        }
        self.entries
            .shift_remove(&id)
            .map(|entry| entry.value.cost())
    }

    fn resident_bytes(&self) -> usize {
        self.entries.values().map(|entry| entry.value.cost()).sum()
    }
}
