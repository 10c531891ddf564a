//! Derived Cell Module
//!
//! [`Computed<T>`] caches the result of a getter and recomputes it lazily
//! after any reactive value the getter read has changed. A computed built
//! with [`Computed::writable`] also forwards writes to a setter.
//!
//! # Invariants
//!
//! 1. The getter runs only when the cached value is missing or dirty.
//! 2. Dependencies are re-collected on every recomputation; a source that was
//!    not read during the last run cannot dirty the computed.
//! 3. Becoming dirty propagates to dependents synchronously, once per
//!    clean-to-dirty transition.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::runtime::{self, Dep, Subscriber};

struct ComputedInner<T> {
    id: u64,
    getter: Box<dyn Fn() -> T>,
    setter: Option<Box<dyn Fn(T)>>,
    cached: RefCell<Option<T>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
    /// Notified when this computed becomes dirty.
    dep: Dep,
    /// Sources read during the last recomputation.
    sources: RefCell<Vec<Dep>>,
}

impl<T> ComputedInner<T> {
    fn unlink_sources(&self) {
        for source in self.sources.borrow_mut().drain(..) {
            source.unsubscribe(self.id);
        }
    }
}

impl<T: 'static> Subscriber for ComputedInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn notify(self: Rc<Self>) {
        if !self.dirty.replace(true) {
            self.dep.trigger();
        }
    }

    fn record(&self, dep: &Dep) -> bool {
        self.sources.borrow_mut().push(dep.clone());
        true
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.unlink_sources();
    }
}

// == Computed ==
/// A memoized derived value, optionally writable.
///
/// Cloning a `Computed` creates a new handle to the **same** cached state.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("cached", &self.inner.cached.borrow())
            .field("dirty", &self.inner.dirty.get())
            .field("writable", &self.inner.setter.is_some())
            .finish()
    }
}

impl<T: 'static> Computed<T> {
    /// Creates a read-only computed from `getter`.
    pub fn new(getter: impl Fn() -> T + 'static) -> Self {
        Self::build(Box::new(getter), None)
    }

    /// Creates a computed that forwards writes to `setter`.
    pub fn writable(getter: impl Fn() -> T + 'static, setter: impl Fn(T) + 'static) -> Self {
        Self::build(Box::new(getter), Some(Box::new(setter)))
    }

    fn build(getter: Box<dyn Fn() -> T>, setter: Option<Box<dyn Fn(T)>>) -> Self {
        Self {
            inner: Rc::new(ComputedInner {
                id: runtime::next_id(),
                getter,
                setter,
                cached: RefCell::new(None),
                dirty: Cell::new(true),
                version: Cell::new(0),
                dep: Dep::new(),
                sources: RefCell::new(Vec::new()),
            }),
        }
    }

    fn refresh(&self) {
        let inner = &self.inner;
        if !inner.dirty.get() && inner.cached.borrow().is_some() {
            return;
        }
        inner.unlink_sources();
        // Cleared before running so writes made by the getter re-dirty it.
        inner.dirty.set(false);
        let observer: Rc<dyn Subscriber> = self.inner.clone();
        let value = runtime::with_observer(Some(observer), || (inner.getter)());
        let _previous = inner.cached.replace(Some(value));
        inner.version.set(inner.version.get() + 1);
    }

    /// Reads the current value by reference, recomputing if dirty.
    ///
    /// # Panics
    ///
    /// Panics if `f` re-enters this computed while it is dirty.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.dep.track();
        self.refresh();
        let cached = self.inner.cached.borrow();
        f(cached
            .as_ref()
            .expect("computed value is cached after refresh"))
    }

    /// Writes through the setter.
    ///
    /// Writes to a read-only computed are ignored with a warning.
    pub fn set(&self, value: T) {
        match &self.inner.setter {
            Some(setter) => setter(value),
            None => warn!("write to a read-only computed value ignored"),
        }
    }

    /// Whether a setter was supplied.
    pub fn is_writable(&self) -> bool {
        self.inner.setter.is_some()
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get() || self.inner.cached.borrow().is_none()
    }

    /// Number of recomputations so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Returns true if both handles share the same state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Returns a clone of the current value, recomputing if dirty.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Ref;

    #[test]
    fn test_computed_is_lazy() {
        let calls = Rc::new(Cell::new(0));
        let source = Ref::new(2);

        let doubled = {
            let calls = calls.clone();
            let source = source.clone();
            Computed::new(move || {
                calls.set(calls.get() + 1);
                source.get() * 2
            })
        };

        assert_eq!(calls.get(), 0);
        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_computed_recomputes_after_change() {
        let source = Ref::new(1);
        let plus_one = {
            let source = source.clone();
            Computed::new(move || source.get() + 1)
        };

        assert_eq!(plus_one.get(), 2);
        source.set(10);
        assert!(plus_one.is_dirty());
        assert_eq!(plus_one.get(), 11);
        assert_eq!(plus_one.version(), 2);
    }

    #[test]
    fn test_computed_chain() {
        let name = Ref::new(String::from("Jim"));
        let upper = {
            let name = name.clone();
            Computed::new(move || name.get().to_uppercase())
        };
        let len = {
            let upper = upper.clone();
            Computed::new(move || upper.get().len())
        };

        assert_eq!(len.get(), 3);
        name.set(String::from("Ricky"));
        assert_eq!(len.get(), 5);
        assert_eq!(upper.get(), "RICKY");
    }

    #[test]
    fn test_computed_drops_stale_dependencies() {
        let use_a = Ref::new(true);
        let a = Ref::new(1);
        let b = Ref::new(2);

        let pick = {
            let (use_a, a, b) = (use_a.clone(), a.clone(), b.clone());
            Computed::new(move || if use_a.get() { a.get() } else { b.get() })
        };

        assert_eq!(pick.get(), 1);
        use_a.set(false);
        assert_eq!(pick.get(), 2);

        a.set(100);
        assert!(!pick.is_dirty());
    }

    #[test]
    fn test_writable_computed() {
        let source = Ref::new(1);
        let mirror = {
            let read = source.clone();
            let write = source.clone();
            Computed::writable(move || read.get(), move |v| write.set(v))
        };

        assert!(mirror.is_writable());
        mirror.set(5);
        assert_eq!(source.get(), 5);
        assert_eq!(mirror.get(), 5);
    }

    #[test]
    fn test_read_only_computed_ignores_write() {
        let constant = Computed::new(|| 3);
        assert!(!constant.is_writable());

        constant.set(4);
        assert_eq!(constant.get(), 3);
    }
}
