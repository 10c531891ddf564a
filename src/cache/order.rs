//! Insertion Order Module
//!
//! Tracks the order in which ids entered a store.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == Key Order ==
/// Tracks insertion order of cache ids.
///
/// Each key gets an increasing sequence number:
/// - Lowest = Oldest entry
/// - Highest = Newest entry
///
/// Push, remove and contains stay cheap however many keys are tracked.
#[derive(Debug)]
pub struct KeyOrder<K> {
    /// Sequence number of each tracked key
    positions: HashMap<K, u64>,
    /// Keys by sequence number
    order: BTreeMap<u64, K>,
    /// Sequence number handed to the next new key
    next: u64,
}

impl<K: Eq + Hash + Clone> Default for KeyOrder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> KeyOrder<K> {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            order: BTreeMap::new(),
            next: 0,
        }
    }

    // == Push ==
    /// Appends a key as the newest entry.
    ///
    /// A key already tracked keeps its original position.
    pub fn push(&mut self, key: K) {
        if self.positions.contains_key(&key) {
            return;
        }
        let seq = self.next;
        self.next += 1;
        self.positions.insert(key.clone(), seq);
        self.order.insert(seq, key);
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) {
        if let Some(seq) = self.positions.remove(key) {
            self.order.remove(&seq);
        }
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.positions.clear();
        self.order.clear();
    }

    // == Snapshot ==
    /// Returns the tracked keys, oldest first.
    pub fn to_vec(&self) -> Vec<K> {
        self.order.values().cloned().collect()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }
}
