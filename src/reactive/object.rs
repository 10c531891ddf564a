//! Observable Object Module
//!
//! [`Reactive<T>`] wraps a plain value so that reads through it are tracked
//! and writes through it notify dependents. The cache hands these out for
//! every entry.

use std::fmt;
use std::rc::Rc;

use super::cell::Slot;

// == Reactive ==
/// Observable wrapper around a plain object.
///
/// Handles are shared by reference: cloning returns another handle to the
/// same object, and [`Reactive::ptr_eq`] compares identity.
pub struct Reactive<T> {
    slot: Rc<Slot<T>>,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slot
            .peek(|value| f.debug_tuple("Reactive").field(value).finish())
    }
}

impl<T> Reactive<T> {
    /// Wraps `value` into an observable.
    pub fn new(value: T) -> Self {
        Self {
            slot: Rc::new(Slot::new(value)),
        }
    }

    /// Reads the object, tracking the read.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls [`Reactive::update`] on the same object.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.slot.read(f)
    }

    /// Reads the object without tracking.
    pub fn peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.slot.peek(f)
    }

    /// Mutates the object and notifies dependents.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.slot.write(f)
    }

    /// Replaces the whole object and notifies dependents.
    pub fn set(&self, value: T) {
        let _previous = self.slot.replace(value);
    }

    /// Returns true if both handles wrap the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// Number of live handles to this object.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.slot)
    }
}

impl<T: Clone> Reactive<T> {
    /// Returns a clone of the wrapped object, tracking the read.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_reactive_read_and_update() {
        let point = Reactive::new(Point { x: 1, y: 2 });

        assert_eq!(point.with(|p| p.x), 1);
        point.update(|p| p.y = 5);

        assert_eq!(point.get(), Point { x: 1, y: 5 });
    }

    #[test]
    fn test_reactive_identity() {
        let a = Reactive::new(Point { x: 0, y: 0 });
        let b = a.clone();
        let c = Reactive::new(Point { x: 0, y: 0 });

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.handle_count(), 2);
    }

    #[test]
    fn test_reactive_set_replaces() {
        let point = Reactive::new(Point { x: 0, y: 0 });
        point.set(Point { x: 3, y: 4 });
        assert_eq!(point.peek(|p| p.x + p.y), 7);
    }
}
