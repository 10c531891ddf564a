//! Reactive Module
//!
//! Single-threaded reactive primitives the cache is built on:
//!
//! - [`Ref`]: a mutable cell.
//! - [`Computed`]: a memoized derived cell, optionally writable.
//! - [`Reactive`]: an observable wrapper around a plain object.
//! - [`Watcher`]: an effect re-run after its inputs change, with an explicit
//!   stop handle.
//!
//! Reads inside a computed or a watcher are tracked automatically. Computeds
//! are invalidated synchronously; watchers are queued and run by [`flush`],
//! which plays the role of one scheduler tick.

mod cell;
mod computed;
mod object;
mod runtime;
mod watch;

pub use cell::Ref;
pub use computed::Computed;
pub use object::Reactive;
pub use runtime::{flush, pending, untracked};
pub use watch::{watch_effect, StopHandle, Watcher};
