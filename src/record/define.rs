//! Record-backed store definitions.

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use tracing::debug;

use super::evict_when_missing;
use crate::cache::entry::Built;
use crate::cache::{CacheStore, StoreDefinition};
use crate::error::{CacheError, Result};
use crate::options::StoreOptions;

/// Inputs of a record-backed store definition.
///
/// `get_record` looks up the backing record of an id. It should read its
/// source through reactive handles so entries notice when a record goes
/// away. `create` builds the cached object from the record.
#[derive(Debug, Clone)]
pub struct RecordStoreSpec<G, C> {
    pub get_record: G,
    pub create: C,
    /// Definition-level defaults; both flags off unless changed.
    pub default_options: StoreOptions,
}

impl<G, C> RecordStoreSpec<G, C> {
    pub fn new(get_record: G, create: C) -> Self {
        Self {
            get_record,
            create,
            default_options: StoreOptions::all(false, false),
        }
    }

    pub fn with_default_options(mut self, default_options: StoreOptions) -> Self {
        self.default_options = default_options;
        self
    }
}

fn record_creator<Id, R, T, A>(
    get_record: impl Fn(&Id) -> Option<R> + 'static,
    create: impl Fn(R, &CacheStore<Id, T>, &A) -> T + 'static,
) -> impl Fn(&Id, &CacheStore<Id, T>, &A) -> Result<Built<T>> + 'static
where
    Id: Clone + Eq + Hash + Debug + 'static,
    R: 'static,
    T: 'static,
    A: 'static,
{
    let get_record = Rc::new(get_record);
    move |id: &Id, store: &CacheStore<Id, T>, args: &A| {
        let record = get_record(id).ok_or_else(|| CacheError::record_not_found(id))?;
        let object = create(record, store, args);

        let lookup = Rc::clone(&get_record);
        let watched = id.clone();
        let evicted = id.clone();
        let weak = store.downgrade();
        let guard = evict_when_missing(
            move || lookup(&watched).is_some(),
            move || {
                if let Some(store) = weak.upgrade() {
                    debug!(id = ?evicted, "record gone, evicting cache entry");
                    store.remove(&evicted);
                }
            },
        );
        Ok(Built::guarded(object, guard))
    }
}

// == Define ==
/// Defines a store whose entries exist only while their record does.
///
/// `get` fails with [`CacheError::RecordNotFound`] when the record is
/// missing. Once created, an entry is removed on the first
/// [`flush`](crate::reactive::flush) after its record disappears.
pub fn define_record_store<Id, R, T, G, C>(spec: RecordStoreSpec<G, C>) -> StoreDefinition<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    R: 'static,
    T: 'static,
    G: Fn(&Id) -> Option<R> + 'static,
    C: Fn(R, &CacheStore<Id, T>) -> T + 'static,
{
    let RecordStoreSpec {
        get_record,
        create,
        default_options,
    } = spec;
    StoreDefinition::from_parts(
        record_creator::<Id, R, T, ()>(get_record, move |record, store, _| create(record, store)),
        default_options,
    )
}

/// Like [`define_record_store`], with per-instance arguments passed to `create`.
pub fn define_record_store_with_args<Id, R, T, A, G, C>(
    spec: RecordStoreSpec<G, C>,
) -> StoreDefinition<Id, T, A>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    R: 'static,
    T: 'static,
    A: 'static,
    G: Fn(&Id) -> Option<R> + 'static,
    C: Fn(R, &CacheStore<Id, T>, &A) -> T + 'static,
{
    StoreDefinition::from_parts(
        record_creator::<Id, R, T, A>(spec.get_record, spec.create),
        spec.default_options,
    )
}

/// Defines and instantiates a record-backed store in one call.
pub fn make_record_cache<Id, R, T, G, C>(spec: RecordStoreSpec<G, C>) -> CacheStore<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    R: 'static,
    T: 'static,
    G: Fn(&Id) -> Option<R> + 'static,
    C: Fn(R, &CacheStore<Id, T>) -> T + 'static,
{
    define_record_store(spec).create()
}
