//! Watcher Module
//!
//! A [`Watcher`] runs a callback once immediately, then again on every
//! [`flush`](super::flush) after a reactive value it read has changed.
//! Dropping the watcher, or calling [`Watcher::stop`], ends it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::runtime::{self, Dep, Job, Subscriber};

struct WatcherInner {
    id: u64,
    callback: Box<dyn Fn(&StopHandle)>,
    active: Cell<bool>,
    queued: Cell<bool>,
    runs: Cell<u64>,
    sources: RefCell<Vec<Dep>>,
}

impl WatcherInner {
    fn unlink_sources(&self) {
        for source in self.sources.borrow_mut().drain(..) {
            source.unsubscribe(self.id);
        }
    }

    fn stop(&self) -> bool {
        if !self.active.replace(false) {
            return false;
        }
        self.unlink_sources();
        true
    }

    fn execute(this: &Rc<Self>) {
        if !this.active.get() {
            return;
        }
        this.unlink_sources();
        this.runs.set(this.runs.get() + 1);
        let handle = StopHandle {
            inner: Rc::downgrade(this),
        };
        let observer: Rc<dyn Subscriber> = this.clone();
        runtime::with_observer(Some(observer), || (this.callback)(&handle));
    }
}

impl Subscriber for WatcherInner {
    fn id(&self) -> u64 {
        self.id
    }

    fn notify(self: Rc<Self>) {
        if self.active.get() && !self.queued.replace(true) {
            runtime::schedule(self);
        }
    }

    fn record(&self, dep: &Dep) -> bool {
        if !self.active.get() {
            return false;
        }
        self.sources.borrow_mut().push(dep.clone());
        true
    }
}

impl Job for WatcherInner {
    fn run(self: Rc<Self>) {
        self.queued.set(false);
        WatcherInner::execute(&self);
    }
}

// == Stop Handle ==
/// Non-owning handle passed to a watcher's callback so it can end itself.
#[derive(Clone)]
pub struct StopHandle {
    inner: Weak<WatcherInner>,
}

impl StopHandle {
    /// Stops the watcher. Returns true only for the call that stopped it.
    pub fn stop(&self) -> bool {
        self.inner.upgrade().is_some_and(|inner| inner.stop())
    }

    /// Whether the watcher is still running.
    pub fn is_active(&self) -> bool {
        self.inner.upgrade().is_some_and(|inner| inner.active.get())
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

// == Watcher ==
/// Owning handle of a running watcher. Stops the watcher on drop.
#[must_use = "dropping a Watcher stops it"]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl Watcher {
    /// Stops the watcher. Returns true only for the call that stopped it.
    pub fn stop(&self) -> bool {
        self.inner.stop()
    }

    /// Whether the watcher is still running.
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// How many times the callback ran.
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }

    /// A non-owning handle that can stop this watcher.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("active", &self.is_active())
            .field("runs", &self.run_count())
            .finish()
    }
}

/// Runs `callback` now and again after each flush that follows a change to
/// anything it read.
pub fn watch_effect(callback: impl Fn(&StopHandle) + 'static) -> Watcher {
    let inner = Rc::new(WatcherInner {
        id: runtime::next_id(),
        callback: Box::new(callback),
        active: Cell::new(true),
        queued: Cell::new(false),
        runs: Cell::new(0),
        sources: RefCell::new(Vec::new()),
    });
    WatcherInner::execute(&inner);
    Watcher { inner }
}
