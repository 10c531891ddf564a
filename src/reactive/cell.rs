//! Mutable Cell Module
//!
//! [`Ref<T>`] is a shared, directly settable reactive value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::computed::Computed;
use super::runtime::Dep;

// == Slot ==
/// Value storage plus the dependency list notified on writes.
pub(crate) struct Slot<T> {
    value: RefCell<T>,
    dep: Dep,
}

impl<T> Slot<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            dep: Dep::new(),
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.dep.track();
        f(&self.value.borrow())
    }

    pub(crate) fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.value.borrow_mut());
        self.dep.trigger();
        result
    }

    pub(crate) fn replace(&self, value: T) -> T {
        let previous = self.value.replace(value);
        self.dep.trigger();
        previous
    }

    #[cfg(test)]
    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }
}

// == Ref ==
/// A mutable reactive cell.
///
/// Cloning a `Ref` creates another handle to the **same** value; writes
/// through any handle are visible to all of them.
pub struct Ref<T> {
    slot: Rc<Slot<T>>,
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slot
            .peek(|value| f.debug_tuple("Ref").field(value).finish())
    }
}

impl<T: Default> Default for Ref<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Ref<T> {
    /// Creates a new cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(Slot::new(value)),
        }
    }

    /// Reads the value by reference, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.slot.read(f)
    }

    /// Reads the value without tracking.
    pub fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.slot.peek(f)
    }

    /// Replaces the value and notifies dependents.
    pub fn set(&self, value: T) {
        // Old value is dropped after notification so its Drop cannot observe
        // a borrowed cell.
        let _previous = self.slot.replace(value);
    }

    /// Mutates the value in place and notifies dependents.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.slot.write(f)
    }

    /// Returns true if both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: Clone> Ref<T> {
    /// Returns a clone of the value, tracking the read.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: 'static> Ref<T> {
    /// A writable computed over one part of the value.
    ///
    /// Reads go through `get`; writes patch the value in place with `set`,
    /// so every other handle on this cell sees them.
    pub fn focus<F: 'static>(
        &self,
        get: impl Fn(&T) -> F + 'static,
        set: impl Fn(&mut T, F) + 'static,
    ) -> Computed<F> {
        let read = self.clone();
        let write = self.clone();
        Computed::writable(
            move || read.with(&get),
            move |value| write.update(|target| set(target, value)),
        )
    }
}
