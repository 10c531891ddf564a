//! Record Store Module
//!
//! A narrow store flavor for parents that own their record caches
//! explicitly: no options, no use count.

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;

use tracing::debug;

use super::evict_when_missing;
use crate::cache::entry::Built;
use crate::cache::{CacheStore, WeakCacheStore};
use crate::error::{CacheError, Result};
use crate::options::ResolvedOptions;
use crate::projection::{Fields, Projectable, ProjectedFields};
use crate::reactive::{Computed, Reactive};

// == Record Store ==
/// Id-keyed cache without lifecycle options.
pub struct RecordStore<Id, T> {
    store: CacheStore<Id, T>,
}

impl<Id, T> Clone for RecordStore<Id, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<Id: Debug, T> Debug for RecordStore<Id, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordStore").field(&self.store).finish()
    }
}

impl<Id, T> RecordStore<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
{
    fn from_creator(creator: impl Fn(&Id, &Self) -> Result<Built<T>> + 'static) -> Self {
        let store = CacheStore::from_parts(ResolvedOptions::disabled(), move |id, store| {
            creator(
                id,
                &RecordStore {
                    store: store.clone(),
                },
            )
        });
        Self { store }
    }

    /// Snapshot of the cached ids in insertion order.
    pub fn ids(&self) -> Vec<Id> {
        self.store.ids()
    }

    /// Returns the object cached for `id`, creating it on first request.
    pub fn get(&self, id: &Id) -> Result<Reactive<T>> {
        self.store.get(id)
    }

    pub fn has(&self, id: &Id) -> bool {
        self.store.has(id)
    }

    pub fn remove(&self, id: &Id) {
        self.store.remove(id);
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn for_each(&self, f: impl FnMut(&Reactive<T>, &Id)) {
        self.store.for_each(f);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// A handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakRecordStore<Id, T> {
        WeakRecordStore {
            store: self.store.downgrade(),
        }
    }
}

impl<Id, T> RecordStore<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: Fields,
{
    pub fn get_refs(&self, id: &Id) -> Result<ProjectedFields> {
        self.store.get_refs(id)
    }
}

/// Non-owning handle on a [`RecordStore`].
pub struct WeakRecordStore<Id, T> {
    store: WeakCacheStore<Id, T>,
}

impl<Id, T> Clone for WeakRecordStore<Id, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<Id, T> WeakRecordStore<Id, T> {
    pub fn upgrade(&self) -> Option<RecordStore<Id, T>> {
        self.store.upgrade().map(|store| RecordStore { store })
    }
}

impl<Id: 'static, T: 'static> Projectable for RecordStore<Id, T> {}
impl<Id: 'static, T: 'static> Projectable for WeakRecordStore<Id, T> {}

// == Constructors ==
/// Creates a record store around a plain creator.
///
/// The creator may fail, typically with [`CacheError::RecordNotFound`];
/// nothing is cached in that case.
pub fn make_record_store<Id, T>(
    creator: impl Fn(&Id, &RecordStore<Id, T>) -> Result<T> + 'static,
) -> RecordStore<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
{
    RecordStore::from_creator(move |id, store| creator(id, store).map(Built::new))
}

/// Creates a record store whose objects are built from a reactive view of
/// their record.
///
/// `create` receives a `Computed` that re-reads `get_record(id)` whenever
/// the source changes. The entry is removed on the first flush after the
/// computed turns `None`.
pub fn watch_record_store<Id, R, T>(
    get_record: impl Fn(&Id) -> Option<R> + 'static,
    create: impl Fn(Computed<Option<R>>, &RecordStore<Id, T>) -> T + 'static,
) -> RecordStore<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    R: 'static,
    T: 'static,
{
    let get_record = Rc::new(get_record);
    RecordStore::from_creator(move |id: &Id, store: &RecordStore<Id, T>| {
        let lookup = Rc::clone(&get_record);
        let key = id.clone();
        let record = Computed::new(move || lookup(&key));
        if record.with(Option::is_none) {
            return Err(CacheError::record_not_found(id));
        }

        let object = create(record.clone(), store);

        let evicted = id.clone();
        let weak = store.downgrade();
        let guard = evict_when_missing(
            move || record.with(Option::is_some),
            move || {
                if let Some(store) = weak.upgrade() {
                    debug!(id = ?evicted, "record gone, evicting record store entry");
                    store.remove(&evicted);
                }
            },
        );
        Ok(Built::guarded(object, guard))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{flush, Ref};
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Task {
        id: u32,
        title: String,
    }

    fn tasks() -> Ref<Vec<Task>> {
        Ref::new(vec![
            Task {
                id: 1,
                title: "write".into(),
            },
            Task {
                id: 2,
                title: "review".into(),
            },
        ])
    }

    #[test]
    fn test_make_record_store() {
        let source = tasks();
        let lookup = source.clone();
        let store = make_record_store(move |id: &u32, _: &RecordStore<u32, String>| {
            lookup
                .with(|tasks| tasks.iter().find(|t| t.id == *id).map(|t| t.title.clone()))
                .ok_or_else(|| CacheError::record_not_found(id))
        });

        assert_eq!(store.get(&2).unwrap().get(), "review");
        assert_eq!(
            store.get(&9).err(),
            Some(CacheError::RecordNotFound("9".into()))
        );
        assert_eq!(store.ids(), vec![2]);

        // Plain creators are not watched.
        source.set(Vec::new());
        flush();
        assert!(store.has(&2));
    }

    #[test]
    fn test_watch_record_store_follows_record() {
        let source = tasks();
        let lookup = source.clone();
        let store = watch_record_store(
            move |id: &u32| lookup.with(|tasks| tasks.iter().find(|t| t.id == *id).cloned()),
            |record: Computed<Option<Task>>, _: &RecordStore<u32, Computed<Option<Task>>>| record,
        );

        let view = store.get(&1).unwrap().get();
        assert_eq!(view.get().map(|t| t.title), Some("write".to_string()));

        source.update(|tasks| tasks[0].title = "rewrite".into());
        flush();
        assert!(store.has(&1));
        assert_eq!(view.get().map(|t| t.title), Some("rewrite".to_string()));

        source.update(|tasks| tasks.remove(0));
        flush();
        assert!(!store.has(&1));
        assert_eq!(view.get(), None);
    }

    #[test]
    fn test_watch_record_store_missing() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let store = watch_record_store(
            |_: &u32| None::<Task>,
            move |_: Computed<Option<Task>>, _: &RecordStore<u32, ()>| counter.set(counter.get() + 1),
        );

        assert_eq!(
            store.get(&5).err(),
            Some(CacheError::RecordNotFound("5".into()))
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_creator_context_is_same_store() {
        let store = make_record_store(|id: &u32, ctx: &RecordStore<u32, usize>| {
            Ok(if *id == 0 { 0 } else { ctx.get(&(id - 1))?.get() + 1 })
        });

        assert_eq!(store.get(&3).unwrap().get(), 3);
        assert_eq!(store.ids(), vec![0, 1, 2, 3]);
        assert!(store.downgrade().upgrade().is_some());
    }
}
