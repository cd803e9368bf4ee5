#[cfg(feature = "debug")]
use std::collections::BTreeMap;
use std::{
    hash::{BuildHasher, BuildHasherDefault, Hash},
    iter::repeat_with,
    mem, slice,
};

use crate::{table_size, MulHasher, MIN_TABLE_SIZE};

/// An open addressing hash map with linear probing.
///
/// The table keeps its load factor at or below one half, doubling when an
/// insertion would exceed it. Entries are only ever added or drained, never
/// removed one at a time, so no tombstones are needed.
pub struct HashMap<K, V, S = BuildHasherDefault<MulHasher>> {
    hash_builder: S,
    slots: Vec<Option<(K, V)>>,
    items: usize,
    #[cfg(feature = "debug")]
    pub probe_lengths: BTreeMap<usize, usize>,
}

impl<K, V> HashMap<K, V> {
    pub fn new() -> Self {
        HashMap::with_capacity(MIN_TABLE_SIZE / 4)
    }
    pub fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, BuildHasherDefault::default())
    }
}

impl<K, V> Default for HashMap<K, V> {
    fn default() -> Self {
        HashMap::new()
    }
}

fn empty_slots<K, V>(len: usize) -> Vec<Option<(K, V)>> {
    repeat_with(|| None).take(len).collect()
}

impl<K, V, S> HashMap<K, V, S> {
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            hash_builder,
            slots: empty_slots(table_size(capacity)),
            items: 0,
            #[cfg(feature = "debug")]
            probe_lengths: BTreeMap::new(),
        }
    }
    pub fn len(&self) -> usize {
        self.items
    }
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }
    /// Number of items the map holds before it has to grow.
    pub fn capacity(&self) -> usize {
        self.slots.len() / 2
    }
    /// Removes every entry. Entries the iterator doesn't get to are dropped
    /// with it.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            slots: self.slots.iter_mut(),
            items: &mut self.items,
        }
    }
}

impl<K: Eq + Hash, V, S: BuildHasher> HashMap<K, V, S> {
    // returns the slot holding `key`, or the empty slot where it belongs
    fn probe(&self, key: &K) -> (usize, usize) {
        let mask = self.slots.len() - 1;
        let mut index = self.hash_builder.hash_one(key) as usize & mask;
        let mut probes = 0;
        loop {
            match &self.slots[index] {
                Some((k, _)) if k != key => {
                    probes += 1;
                    index = (index + 1) & mask;
                }
                _ => break (index, probes),
            }
        }
    }

    fn grow(&mut self) {
        let len = self
            .slots
            .len()
            .checked_mul(2)
            .expect("multiplication by 2 overflows a usize");
        let old = mem::replace(&mut self.slots, empty_slots(len));
        for (k, v) in old.into_iter().flatten() {
            let (index, _) = self.probe(&k);
            self.slots[index] = Some((k, v));
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let (index, _) = self.probe(key);
        self.slots[index].as_ref().map(|(_, v)| v)
    }

    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        if self.items + 1 > self.capacity() {
            self.grow();
        }
        let (index, _probes) = self.probe(&key);
        #[cfg(feature = "debug")]
        {
            *self.probe_lengths.entry(_probes).or_insert(0) += 1;
        }
        let Self { slots, items, .. } = self;
        match &mut slots[index] {
            Some((_, v)) => Entry::Occupied(v),
            slot => Entry::Vacant(VacantEntry { key, slot, items }),
        }
    }
}

pub struct Drain<'a, K, V> {
    slots: slice::IterMut<'a, Option<(K, V)>>,
    items: &'a mut usize,
}

impl<'a, K, V> Iterator for Drain<'a, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        for slot in &mut self.slots {
            if let Some(kv) = slot.take() {
                *self.items -= 1;
                return Some(kv);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (*self.items, Some(*self.items))
    }
}

// a partially drained table has holes in its probe chains, so nothing can stay
impl<'a, K, V> Drop for Drain<'a, K, V> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        *self.items = 0;
    }
}

pub enum Entry<'a, K, V> {
    Occupied(&'a mut V),
    Vacant(VacantEntry<'a, K, V>),
}

pub struct VacantEntry<'a, K, V> {
    key: K,
    slot: &'a mut Option<(K, V)>,
    items: &'a mut usize,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    pub fn insert(self, v: V) -> &'a mut V {
        *self.items += 1;
        &mut self.slot.insert((self.key, v)).1
    }
}

impl<'a, K, V> Entry<'a, K, V> {
    pub fn and_modify<F: FnOnce(&mut V)>(mut self, f: F) -> Self {
        if let Entry::Occupied(ref mut v) = self {
            f(*v);
        }
        self
    }
    pub fn or_insert(self, v: V) -> &'a mut V {
        match self {
            Entry::Occupied(v) => v,
            Entry::Vacant(e) => e.insert(v),
        }
    }
    pub fn or_insert_with<F: FnOnce() -> V>(self, f: F) -> &'a mut V {
        match self {
            Entry::Occupied(v) => v,
            Entry::Vacant(e) => e.insert(f()),
        }
    }
}
