//! Cache Module
//!
//! Provides id-keyed stores of reactive objects with use counting and
//! automatic clearing.

mod definition;
pub(crate) mod entry;
mod order;
mod stats;
mod store;


// Re-export public types
pub use definition::{define_store, define_store_with_args, define_store_with_defaults, StoreDefinition};
pub use entry::CacheEntry;
pub use order::KeyOrder;
pub use stats::CacheStats;
pub use store::{CacheStore, WeakCacheStore};
