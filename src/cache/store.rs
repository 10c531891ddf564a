//! Cache Store Module
//!
//! Main cache engine: an id-keyed map of lazily created reactive objects with
//! a use count that drives automatic clearing.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use crate::cache::entry::Built;
use crate::cache::{CacheEntry, CacheStats, KeyOrder};
use crate::error::{CacheError, Result};
use crate::options::ResolvedOptions;
use crate::projection::{project_fields, Fields, Projectable, ProjectedFields};
use crate::reactive::{untracked, Reactive};

type Creator<Id, T> = Rc<dyn Fn(&Id, &CacheStore<Id, T>) -> Result<Built<T>>>;

struct StoreInner<Id, T> {
    /// Id to entry storage
    entries: RefCell<HashMap<Id, CacheEntry<T>>>,
    /// Insertion order of the ids in `entries`
    order: RefCell<KeyOrder<Id>>,
    /// Ids whose creator is currently running
    constructing: RefCell<HashSet<Id>>,
    use_count: Cell<i64>,
    stats: RefCell<CacheStats>,
    options: ResolvedOptions,
    creator: Creator<Id, T>,
}

// == Cache Store ==
/// One instance of a cache: at most one live `Reactive<T>` per id.
///
/// Cloning yields another handle on the same instance. The store is also
/// the context handed to the creator, so a creator may look up other ids,
/// check membership or read the use count while it builds an object.
pub struct CacheStore<Id, T> {
    inner: Rc<StoreInner<Id, T>>,
}

impl<Id, T> Clone for CacheStore<Id, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<Id: Debug, T> Debug for CacheStore<Id, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("ids", &self.inner.order.borrow())
            .field("use_count", &self.inner.use_count.get())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Removes an id from the in-progress set when construction ends, even on error.
struct ConstructionGuard<'a, Id: Eq + Hash> {
    constructing: &'a RefCell<HashSet<Id>>,
    id: &'a Id,
}

impl<Id: Eq + Hash> Drop for ConstructionGuard<'_, Id> {
    fn drop(&mut self) {
        self.constructing.borrow_mut().remove(self.id);
    }
}

impl<Id, T> CacheStore<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
{
    // == Constructor ==
    /// Creates a standalone store with already resolved options.
    ///
    /// Most callers go through a [`StoreDefinition`](crate::StoreDefinition)
    /// instead, which resolves options and wires the host scope.
    pub fn new(options: ResolvedOptions, creator: impl Fn(&Id, &Self) -> T + 'static) -> Self {
        Self::from_parts(options, move |id, store| Ok(Built::new(creator(id, store))))
    }

    pub(crate) fn from_parts(
        options: ResolvedOptions,
        creator: impl Fn(&Id, &Self) -> Result<Built<T>> + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                entries: RefCell::new(HashMap::new()),
                order: RefCell::new(KeyOrder::new()),
                constructing: RefCell::new(HashSet::new()),
                use_count: Cell::new(0),
                stats: RefCell::new(CacheStats::new()),
                options,
                creator: Rc::new(creator),
            }),
        }
    }

    // == Get ==
    /// Returns the object cached for `id`, creating it on first request.
    ///
    /// The creator runs at most once per id until the entry is removed. It
    /// runs untracked, so a surrounding watcher or computed does not pick up
    /// its reads.
    ///
    /// # Errors
    /// - [`CacheError::CircularConstruction`] if the creator for `id` asks
    ///   for `id` again before returning
    /// - whatever the creator itself fails with (record stores return
    ///   [`CacheError::RecordNotFound`])
    pub fn get(&self, id: &Id) -> Result<Reactive<T>> {
        if let Some(entry) = self.inner.entries.borrow().get(id) {
            self.inner.stats.borrow_mut().record_hit();
            return Ok(entry.value().clone());
        }
        self.inner.stats.borrow_mut().record_miss();

        if !self.inner.constructing.borrow_mut().insert(id.clone()) {
            return Err(CacheError::circular_construction(id));
        }
        let _guard = ConstructionGuard {
            constructing: &self.inner.constructing,
            id,
        };

        let creator = Rc::clone(&self.inner.creator);
        let built = untracked(|| creator(id, self))?;

        let value = Reactive::new(built.object);
        self.inner
            .entries
            .borrow_mut()
            .insert(id.clone(), CacheEntry::new(value.clone(), built.guard));
        self.inner.order.borrow_mut().push(id.clone());

        let mut stats = self.inner.stats.borrow_mut();
        stats.record_creation();
        stats.set_total_entries(self.inner.order.borrow().len());
        debug!(id = ?id, "created cache entry");

        Ok(value)
    }

    // == Has ==
    pub fn has(&self, id: &Id) -> bool {
        self.inner.entries.borrow().contains_key(id)
    }

    // == Remove ==
    /// Drops the entry for `id`, stopping its record watcher if it has one.
    ///
    /// Removing an absent id does nothing.
    pub fn remove(&self, id: &Id) {
        let removed = self.inner.entries.borrow_mut().remove(id);
        if removed.is_none() {
            return;
        }
        self.inner.order.borrow_mut().remove(id);

        let mut stats = self.inner.stats.borrow_mut();
        stats.record_removals(1);
        stats.set_total_entries(self.inner.order.borrow().len());
        drop(stats);
        debug!(id = ?id, "removed cache entry");

        // The entry may own objects holding other store handles; release
        // it only once no borrow is held.
        drop(removed);
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.inner.entries.borrow_mut());
        self.inner.order.borrow_mut().clear();

        let mut stats = self.inner.stats.borrow_mut();
        stats.record_removals(entries.len());
        stats.set_total_entries(0);
        drop(stats);
        debug!(count = entries.len(), "cleared cache store");

        drop(entries);
    }

    // == Ids ==
    /// Snapshot of the cached ids in insertion order.
    pub fn ids(&self) -> Vec<Id> {
        self.inner.order.borrow().to_vec()
    }

    /// Calls `f` with each cached object and its id, in insertion order.
    ///
    /// Iterates a snapshot, so `f` may add or remove entries.
    pub fn for_each(&self, mut f: impl FnMut(&Reactive<T>, &Id)) {
        let snapshot: Vec<(Id, Reactive<T>)> = {
            let entries = self.inner.entries.borrow();
            self.inner
                .order
                .borrow()
                .to_vec()
                .into_iter()
                .filter_map(|id| {
                    let value = entries.get(&id)?.value().clone();
                    Some((id, value))
                })
                .collect()
        };
        for (id, value) in &snapshot {
            f(value, id);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the entry for `id` is still kept in sync by a record watcher.
    pub fn is_watched(&self, id: &Id) -> bool {
        self.inner
            .entries
            .borrow()
            .get(id)
            .is_some_and(CacheEntry::is_watched)
    }

    // == Use Count ==
    /// Number of consumers currently using this store.
    ///
    /// Unbalanced `un_mount` calls drive it below zero.
    pub fn use_count(&self) -> i64 {
        self.inner.use_count.get()
    }

    /// Registers one more consumer.
    pub fn mount(&self) {
        let count = self.inner.use_count.get() + 1;
        self.inner.use_count.set(count);
        debug!(use_count = count, "mounted cache store");
    }

    /// Releases one consumer, clearing the store once nobody uses it if
    /// `auto_clear_unused` is set.
    pub fn un_mount(&self) {
        let count = self.inner.use_count.get() - 1;
        self.inner.use_count.set(count);
        if count < 0 {
            debug!(use_count = count, "use count dropped below zero");
        } else {
            debug!(use_count = count, "un-mounted cache store");
        }

        if self.inner.options.auto_clear_unused && count < 1 {
            info!(entries = self.len(), "clearing unused cache store");
            self.clear();
        }
    }

    // == Options ==
    /// Options this instance was created with.
    pub fn options(&self) -> ResolvedOptions {
        self.inner.options
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.borrow().clone()
    }

    /// A handle that does not keep the store alive.
    ///
    /// Cached objects that need their store should hold this rather than a
    /// clone, otherwise the store and its entries never get dropped.
    pub fn downgrade(&self) -> WeakCacheStore<Id, T> {
        WeakCacheStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<Id, T> CacheStore<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: Fields,
{
    /// Projects the object cached for `id` to per-field handles.
    pub fn get_refs(&self, id: &Id) -> Result<ProjectedFields> {
        Ok(project_fields(&self.get(id)?))
    }
}

// == Weak Cache Store ==
/// Non-owning handle on a [`CacheStore`].
pub struct WeakCacheStore<Id, T> {
    inner: Weak<StoreInner<Id, T>>,
}

impl<Id, T> Clone for WeakCacheStore<Id, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<Id, T> Debug for WeakCacheStore<Id, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCacheStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<Id, T> WeakCacheStore<Id, T> {
    /// The store, if it is still alive.
    pub fn upgrade(&self) -> Option<CacheStore<Id, T>> {
        self.inner.upgrade().map(|inner| CacheStore { inner })
    }
}

// Store handles inside cached objects are plain fields.
impl<Id: 'static, T: 'static> Projectable for CacheStore<Id, T> {}
impl<Id: 'static, T: 'static> Projectable for WeakCacheStore<Id, T> {}
