//! Cache Statistics Module
//!
//! Tracks lookups, creations and removals for one store instance.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of `get` calls served from the map
    pub hits: u64,
    /// Number of `get` calls that ran the creator (or failed to)
    pub misses: u64,
    /// Number of entries created
    pub created: u64,
    /// Number of entries dropped by `remove`, `clear` or record eviction
    pub removed: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_creation(&mut self) {
        self.created += 1;
    }

    pub fn record_removals(&mut self, count: usize) {
        self.removed += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
