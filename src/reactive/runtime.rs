//! Reactive Runtime Module
//!
//! Thread-local dependency tracking and the effect scheduler.
//!
//! Reads of a reactive source call [`Dep::track`], which links the source to
//! whichever observer (computed or watcher) is currently running. Writes call
//! [`Dep::trigger`]: computeds are marked dirty synchronously, watchers are
//! queued and only run on the next [`flush`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::warn;

/// Upper bound on jobs run by a single flush, guards against effects that
/// keep re-triggering themselves.
const MAX_FLUSH_JOBS: usize = 10_000;

// == Subscriber ==
/// Something that reacts to dependency changes.
pub(crate) trait Subscriber {
    /// Unique id used to unlink the subscriber from its dependencies.
    fn id(&self) -> u64;

    /// Called when a dependency changed.
    fn notify(self: Rc<Self>);

    /// Remembers `dep` so it can be unlinked later.
    ///
    /// Returns false when the subscriber no longer accepts dependencies.
    fn record(&self, dep: &Dep) -> bool;
}

// == Job ==
/// Deferred work run by [`flush`].
pub(crate) trait Job {
    fn run(self: Rc<Self>);
}

// == Dep ==
/// Set of subscribers depending on one reactive source.
#[derive(Clone, Default)]
pub(crate) struct Dep {
    subscribers: Rc<RefCell<Vec<(u64, Weak<dyn Subscriber>)>>>,
}

impl Dep {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Links the running observer, if any, to this dependency.
    pub(crate) fn track(&self) {
        let Some(observer) = current_observer() else {
            return;
        };
        let id = observer.id();
        if self.subscribers.borrow().iter().any(|(sub, _)| *sub == id) {
            return;
        }
        if observer.record(self) {
            self.subscribers
                .borrow_mut()
                .push((id, Rc::downgrade(&observer)));
        }
    }

    /// Notifies every live subscriber.
    pub(crate) fn trigger(&self) {
        let live: Vec<Rc<dyn Subscriber>> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|(_, weak)| weak.strong_count() > 0);
            subscribers
                .iter()
                .filter_map(|(_, weak)| weak.upgrade())
                .collect()
        };
        for subscriber in live {
            subscriber.notify();
        }
    }

    /// Unlinks the subscriber with the given id.
    pub(crate) fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|(sub, _)| *sub != id);
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }
}

// == Runtime ==
struct Runtime {
    observers: RefCell<Vec<Option<Rc<dyn Subscriber>>>>,
    queue: RefCell<VecDeque<Rc<dyn Job>>>,
    flushing: Cell<bool>,
    next_id: Cell<u64>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            flushing: Cell::new(false),
            next_id: Cell::new(1),
        }
    }
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

/// Allocates a fresh subscriber id.
pub(crate) fn next_id() -> u64 {
    RUNTIME.with(|rt| {
        let id = rt.next_id.get();
        rt.next_id.set(id + 1);
        id
    })
}

fn current_observer() -> Option<Rc<dyn Subscriber>> {
    RUNTIME.with(|rt| rt.observers.borrow().last().cloned().flatten())
}

/// Pops the observer stack even if the observed closure panics.
struct ObserverGuard;

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        RUNTIME.with(|rt| {
            rt.observers.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `observer` collecting the dependencies it reads.
pub(crate) fn with_observer<R>(observer: Option<Rc<dyn Subscriber>>, f: impl FnOnce() -> R) -> R {
    RUNTIME.with(|rt| rt.observers.borrow_mut().push(observer));
    let _guard = ObserverGuard;
    f()
}

/// Runs `f` without registering any of its reads as dependencies.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    with_observer(None, f)
}

/// Queues a job for the next flush.
pub(crate) fn schedule(job: Rc<dyn Job>) {
    RUNTIME.with(|rt| rt.queue.borrow_mut().push_back(job));
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        RUNTIME.with(|rt| rt.flushing.set(false));
    }
}

// == Flush ==
/// Runs every queued watcher, including the ones queued while flushing.
///
/// This is one scheduler tick. Changes made to reactive state are only seen
/// by watchers after the next flush. Returns the number of jobs run; a nested
/// call made from inside a running job returns 0.
pub fn flush() -> usize {
    if RUNTIME.with(|rt| rt.flushing.replace(true)) {
        return 0;
    }
    let _guard = FlushGuard;

    let mut ran = 0;
    while let Some(job) = RUNTIME.with(|rt| rt.queue.borrow_mut().pop_front()) {
        if ran == MAX_FLUSH_JOBS {
            let dropped = RUNTIME.with(|rt| {
                let mut queue = rt.queue.borrow_mut();
                let dropped = queue.len() + 1;
                queue.clear();
                dropped
            });
            warn!(dropped, "flush aborted, watchers keep re-triggering each other");
            break;
        }
        job.run();
        ran += 1;
    }
    ran
}

/// Number of jobs waiting for the next flush.
pub fn pending() -> usize {
    RUNTIME.with(|rt| rt.queue.borrow().len())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        id: u64,
        hits: Cell<u32>,
        deps: RefCell<Vec<Dep>>,
    }

    impl Subscriber for Counter {
        fn id(&self) -> u64 {
            self.id
        }

        fn notify(self: Rc<Self>) {
            self.hits.set(self.hits.get() + 1);
        }

        fn record(&self, dep: &Dep) -> bool {
            self.deps.borrow_mut().push(dep.clone());
            true
        }
    }

    fn counter() -> Rc<Counter> {
        Rc::new(Counter {
            id: next_id(),
            hits: Cell::new(0),
            deps: RefCell::new(Vec::new()),
        })
    }

    #[test]
    fn test_track_outside_observer_is_noop() {
        let dep = Dep::new();
        dep.track();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn test_track_and_trigger() {
        let dep = Dep::new();
        let sub = counter();

        with_observer(Some(sub.clone()), || {
            dep.track();
            dep.track();
        });

        assert_eq!(dep.subscriber_count(), 1);
        assert_eq!(sub.deps.borrow().len(), 1);

        dep.trigger();
        assert_eq!(sub.hits.get(), 1);
    }

    #[test]
    fn test_untracked_hides_observer() {
        let dep = Dep::new();
        let sub = counter();

        with_observer(Some(sub.clone()), || untracked(|| dep.track()));

        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let dep = Dep::new();
        let sub = counter();

        with_observer(Some(sub.clone()), || dep.track());
        dep.unsubscribe(sub.id);
        dep.trigger();

        assert_eq!(sub.hits.get(), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let dep = Dep::new();
        let sub = counter();

        with_observer(Some(sub.clone()), || dep.track());
        drop(sub);
        dep.trigger();

        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn test_flush_empty_queue() {
        assert_eq!(pending(), 0);
        assert_eq!(flush(), 0);
    }
}
