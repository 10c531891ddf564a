//! Host Lifecycle Module
//!
//! A [`Scope`] stands for one consumer of the cache (a component, a view, a
//! request handler). Code running inside [`Scope::run`] can register
//! teardown callbacks with [`on_unmounted`]; they fire once when the scope
//! is unmounted.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

type Hook = Box<dyn FnOnce()>;

struct ScopeInner {
    hooks: RefCell<Vec<Hook>>,
    unmounted: Cell<bool>,
}

thread_local! {
    static CURRENT: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

// == Scope ==
/// A consumer lifetime with teardown hooks.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("hooks", &self.hook_count())
            .field("unmounted", &self.is_unmounted())
            .finish()
    }
}

struct CurrentGuard;

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Scope {
    /// Creates a mounted scope with no hooks.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                hooks: RefCell::new(Vec::new()),
                unmounted: Cell::new(false),
            }),
        }
    }

    /// Runs `f` with this scope as the current one.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        CURRENT.with(|stack| stack.borrow_mut().push(self.clone()));
        let _guard = CurrentGuard;
        f()
    }

    /// Registers a teardown hook on this scope.
    ///
    /// Hooks added after unmount run immediately.
    pub fn on_unmounted(&self, hook: impl FnOnce() + 'static) {
        if self.is_unmounted() {
            hook();
            return;
        }
        self.inner.hooks.borrow_mut().push(Box::new(hook));
    }

    /// Runs every teardown hook in registration order. Later calls do nothing.
    pub fn unmount(&self) {
        if self.inner.unmounted.replace(true) {
            return;
        }
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        debug!(hooks = hooks.len(), "unmounting scope");
        for hook in hooks {
            hook();
        }
    }

    /// Whether [`Scope::unmount`] already ran.
    pub fn is_unmounted(&self) -> bool {
        self.inner.unmounted.get()
    }

    /// Number of hooks waiting for unmount.
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }

    /// The innermost scope currently running, if any.
    pub fn current() -> Option<Scope> {
        CURRENT.with(|stack| stack.borrow().last().cloned())
    }
}

/// Registers `hook` on the current scope.
///
/// Returns false, and drops the hook, when no scope is running.
pub fn on_unmounted(hook: impl FnOnce() + 'static) -> bool {
    match Scope::current() {
        Some(scope) => {
            scope.on_unmounted(hook);
            true
        }
        None => {
            warn!("on_unmounted called without an active scope, teardown hook dropped");
            false
        }
    }
}
