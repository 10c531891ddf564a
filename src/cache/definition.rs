//! Store Definition Module
//!
//! A [`StoreDefinition`] is a stateless template: a creator plus default
//! options. Every instantiation yields an independent [`CacheStore`].

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;

use tracing::debug;

use crate::cache::entry::Built;
use crate::cache::CacheStore;
use crate::error::Result;
use crate::lifecycle;
use crate::options::{DefaultOptions, StoreOptions};

type DefinitionCreator<Id, T, A> = Rc<dyn Fn(&Id, &CacheStore<Id, T>, &A) -> Result<Built<T>>>;

// == Store Definition ==
/// Factory for cache store instances.
///
/// `A` are extra arguments bound once per instance and passed to the
/// creator on every call.
pub struct StoreDefinition<Id, T, A = ()> {
    creator: DefinitionCreator<Id, T, A>,
    defaults: StoreOptions,
    config: DefaultOptions,
}

impl<Id, T, A> Clone for StoreDefinition<Id, T, A> {
    fn clone(&self) -> Self {
        Self {
            creator: Rc::clone(&self.creator),
            defaults: self.defaults,
            config: self.config.clone(),
        }
    }
}

impl<Id, T, A> Debug for StoreDefinition<Id, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreDefinition")
            .field("defaults", &self.defaults)
            .field("config", &self.config)
            .finish()
    }
}

impl<Id, T, A> StoreDefinition<Id, T, A>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
    A: 'static,
{
    pub(crate) fn from_parts(
        creator: impl Fn(&Id, &CacheStore<Id, T>, &A) -> Result<Built<T>> + 'static,
        defaults: StoreOptions,
    ) -> Self {
        Self {
            creator: Rc::new(creator),
            defaults,
            config: DefaultOptions::global(),
        }
    }

    /// Replaces the definition-level default options.
    pub fn with_defaults(mut self, defaults: StoreOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Resolves instances against `config` instead of the global defaults.
    pub fn with_config(mut self, config: DefaultOptions) -> Self {
        self.config = config;
        self
    }

    /// Definition-level default options.
    pub fn defaults(&self) -> StoreOptions {
        self.defaults
    }

    // == Instantiate ==
    /// Creates a store instance with call-site `overrides` and bound `args`.
    ///
    /// With `auto_mount_and_unmount` resolved on, the new store is mounted
    /// right away and un-mounted when the current [`Scope`](crate::Scope)
    /// unmounts.
    pub fn create_with(&self, overrides: StoreOptions, args: A) -> CacheStore<Id, T> {
        let options = self.config.resolve(Some(&self.defaults), Some(&overrides));
        let creator = Rc::clone(&self.creator);
        let store = CacheStore::from_parts(options, move |id, store| creator(id, store, &args));
        debug!(?options, "created cache store instance");

        if options.auto_mount_and_unmount {
            store.mount();
            let owner = store.clone();
            lifecycle::on_unmounted(move || owner.un_mount());
        }
        store
    }
}

impl<Id, T, A> StoreDefinition<Id, T, A>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
    A: Default + 'static,
{
    /// Creates a store instance with default args and no overrides.
    pub fn create(&self) -> CacheStore<Id, T> {
        self.create_with(StoreOptions::new(), A::default())
    }

    /// Creates a store instance with call-site `overrides` and default args.
    pub fn with_options(&self, overrides: StoreOptions) -> CacheStore<Id, T> {
        self.create_with(overrides, A::default())
    }
}

// == Define ==
/// Defines a store whose creator takes the id and the owning store.
pub fn define_store<Id, T>(
    creator: impl Fn(&Id, &CacheStore<Id, T>) -> T + 'static,
) -> StoreDefinition<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
{
    StoreDefinition::from_parts(
        move |id, store, _: &()| Ok(Built::new(creator(id, store))),
        StoreOptions::new(),
    )
}

/// Defines a store with definition-level default options.
pub fn define_store_with_defaults<Id, T>(
    creator: impl Fn(&Id, &CacheStore<Id, T>) -> T + 'static,
    defaults: StoreOptions,
) -> StoreDefinition<Id, T>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
{
    define_store(creator).with_defaults(defaults)
}

/// Defines a store whose creator also receives per-instance arguments.
pub fn define_store_with_args<Id, T, A>(
    creator: impl Fn(&Id, &CacheStore<Id, T>, &A) -> T + 'static,
) -> StoreDefinition<Id, T, A>
where
    Id: Clone + Eq + Hash + Debug + 'static,
    T: 'static,
    A: 'static,
{
    StoreDefinition::from_parts(
        move |id, store, args| Ok(Built::new(creator(id, store, args))),
        StoreOptions::new(),
    )
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Scope;
    use crate::options::ResolvedOptions;
    use std::cell::Cell;

    fn isolated() -> DefaultOptions {
        DefaultOptions::new(ResolvedOptions::default())
    }

    #[test]
    fn test_instances_are_independent() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let definition = define_store(move |id: &u32, _: &CacheStore<u32, u32>| {
            counter.set(counter.get() + 1);
            id * 2
        })
        .with_config(isolated())
        .with_defaults(StoreOptions::all(false, false));

        let a = definition.create();
        let b = definition.create();
        let from_a = a.get(&1).unwrap();
        let from_b = b.get(&1).unwrap();

        assert!(!from_a.ptr_eq(&from_b));
        assert!(!a.ptr_eq(&b));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_option_cascade() {
        let config = DefaultOptions::new(ResolvedOptions::disabled());
        let definition = define_store_with_defaults(
            |id: &u32, _: &CacheStore<u32, u32>| *id,
            StoreOptions::new().auto_clear_unused(true),
        )
        .with_config(config.clone());

        let store = definition.with_options(StoreOptions::new());
        assert_eq!(
            store.options(),
            ResolvedOptions {
                auto_mount_and_unmount: false,
                auto_clear_unused: true,
            }
        );

        let store = definition.with_options(StoreOptions::new().auto_clear_unused(false));
        assert!(!store.options().auto_clear_unused);

        // Definitions read the handle at instantiation time.
        config.set(StoreOptions::new().auto_mount_and_unmount(true));
        Scope::new().run(|| {
            let store = definition.create();
            assert!(store.options().auto_mount_and_unmount);
        });
    }

    #[test]
    fn test_auto_mount_registers_unmount_on_scope() {
        let definition =
            define_store(|id: &u32, _: &CacheStore<u32, String>| id.to_string()).with_config(isolated());
        let scope = Scope::new();

        let store = scope.run(|| definition.create());
        store.get(&1).unwrap();
        assert_eq!(store.use_count(), 1);
        assert_eq!(scope.hook_count(), 1);

        scope.unmount();
        assert_eq!(store.use_count(), 0);
        assert!(store.ids().is_empty());
    }

    #[test]
    fn test_auto_mount_without_scope() {
        let definition =
            define_store(|id: &u32, _: &CacheStore<u32, u32>| *id).with_config(isolated());

        let store = definition.create();
        assert_eq!(store.use_count(), 1);
    }

    #[test]
    fn test_create_with_args() {
        let definition = define_store_with_args(
            |id: &u32, _: &CacheStore<u32, String>, prefix: &String| format!("{prefix}{id}"),
        )
        .with_config(isolated())
        .with_defaults(StoreOptions::all(false, false));

        let store = definition.create_with(StoreOptions::new(), "user-".to_string());
        assert_eq!(store.get(&7).unwrap().get(), "user-7");
        assert_eq!(store.use_count(), 0);
    }
}
