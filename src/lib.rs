//! Reactive Cache - identity-keyed caches of reactive objects
//!
//! Keeps exactly one live, observable object per id, hands the same instance
//! to every consumer, and clears stores nobody uses anymore.

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod projection;
pub mod reactive;
pub mod record;

pub use cache::{
    define_store, define_store_with_args, define_store_with_defaults, CacheStats, CacheStore,
    StoreDefinition, WeakCacheStore,
};
pub use config::Config;
pub use error::{CacheError, Result};
pub use lifecycle::{on_unmounted, Scope};
pub use options::{
    get_global_default_options, init_global_default_options, merge, reset_global_default_options,
    set_global_default_options, DefaultOptions, ResolvedOptions, StoreOptions,
};
pub use projection::{project_fields, FieldKind, FieldRef, Fields, ProjectedFields, Projectable};
pub use reactive::{flush, untracked, watch_effect, Computed, Reactive, Ref, StopHandle, Watcher};
pub use record::{
    define_record_store, define_record_store_with_args, make_record_cache, make_record_store,
    watch_record_store, RecordStore, RecordStoreSpec, WeakRecordStore,
};
