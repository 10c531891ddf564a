//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

use crate::reactive::{Reactive, Watcher};

// == Cache Entry ==
/// One cached object plus whatever keeps it in sync with its source.
#[derive(Debug)]
pub struct CacheEntry<T> {
    /// The observable handed out by `get`
    value: Reactive<T>,
    /// Record watcher owned by the entry; dropping the entry stops it
    guard: Option<Watcher>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    pub fn new(value: Reactive<T>, guard: Option<Watcher>) -> Self {
        Self { value, guard }
    }

    /// Returns the cached observable.
    pub fn value(&self) -> &Reactive<T> {
        &self.value
    }

    /// Whether a live watcher keeps this entry in sync with a record source.
    pub fn is_watched(&self) -> bool {
        self.guard.as_ref().is_some_and(Watcher::is_active)
    }
}

/// What a creator hands back to the store before it is wrapped.
pub(crate) struct Built<T> {
    pub(crate) object: T,
    pub(crate) guard: Option<Watcher>,
}

impl<T> Built<T> {
    pub(crate) fn new(object: T) -> Self {
        Self {
            object,
            guard: None,
        }
    }

    pub(crate) fn guarded(object: T, guard: Watcher) -> Self {
        Self {
            object,
            guard: Some(guard),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::watch_effect;

    #[test]
    fn test_entry_without_guard() {
        let entry = CacheEntry::new(Reactive::new(5), None);

        assert_eq!(entry.value().get(), 5);
        assert!(!entry.is_watched());
    }

    #[test]
    fn test_entry_guard_stops_on_drop() {
        let watcher = watch_effect(|_| {});
        let handle = watcher.stop_handle();
        let entry = CacheEntry::new(Reactive::new("x"), Some(watcher));

        assert!(entry.is_watched());
        drop(entry);
        assert!(!handle.is_active());
    }

    #[test]
    fn test_built_guarded() {
        let built = Built::guarded(1, watch_effect(|_| {}));
        assert!(built.guard.is_some());
        assert_eq!(Built::new(2).object, 2);
    }
}
