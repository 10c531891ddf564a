//! Record Module
//!
//! Stores whose entries mirror an external record source. Each entry owns a
//! watcher that re-checks its record whenever the source changes and evicts
//! the entry, once, when the record is gone.

mod define;
mod store;

pub use define::{
    define_record_store, define_record_store_with_args, make_record_cache, RecordStoreSpec,
};
pub use store::{make_record_store, watch_record_store, RecordStore, WeakRecordStore};

use crate::reactive::{watch_effect, Watcher};

/// Watches `present` and calls `evict` the first time it reports false.
///
/// The watcher stops itself before evicting, so `evict` may drop it.
pub(crate) fn evict_when_missing(
    present: impl Fn() -> bool + 'static,
    evict: impl Fn() + 'static,
) -> Watcher {
    watch_effect(move |handle| {
        if !present() {
            handle.stop();
            evict();
        }
    })
}
