//! Store Options Module
//!
//! Resolves the two store flags from three layers: the global defaults, the
//! defaults given when a store was defined, and the overrides given when an
//! instance is created. Later layers win; unset fields fall through.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

// == Partial Options ==
/// One layer of options. `None` leaves the field to the previous layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoreOptions {
    /// Mount on creation and un-mount when the owning scope tears down.
    #[serde(
        rename = "autoMountAndUnMount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auto_mount_and_unmount: Option<bool>,
    /// Clear every entry once the use count drops below one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_clear_unused: Option<bool>,
}

impl StoreOptions {
    /// A layer that sets nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that sets both flags.
    pub fn all(auto_mount_and_unmount: bool, auto_clear_unused: bool) -> Self {
        Self {
            auto_mount_and_unmount: Some(auto_mount_and_unmount),
            auto_clear_unused: Some(auto_clear_unused),
        }
    }

    pub fn auto_mount_and_unmount(mut self, enabled: bool) -> Self {
        self.auto_mount_and_unmount = Some(enabled);
        self
    }

    pub fn auto_clear_unused(mut self, enabled: bool) -> Self {
        self.auto_clear_unused = Some(enabled);
        self
    }

    /// Overlays the fields this layer sets onto `base`.
    pub fn apply_to(&self, base: ResolvedOptions) -> ResolvedOptions {
        ResolvedOptions {
            auto_mount_and_unmount: self
                .auto_mount_and_unmount
                .unwrap_or(base.auto_mount_and_unmount),
            auto_clear_unused: self.auto_clear_unused.unwrap_or(base.auto_clear_unused),
        }
    }

    /// Combines two layers, `other` winning where it sets a field.
    pub fn overlay(&self, other: &StoreOptions) -> StoreOptions {
        StoreOptions {
            auto_mount_and_unmount: other.auto_mount_and_unmount.or(self.auto_mount_and_unmount),
            auto_clear_unused: other.auto_clear_unused.or(self.auto_clear_unused),
        }
    }
}

// == Resolved Options ==
/// Fully resolved flags for one store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOptions {
    #[serde(rename = "autoMountAndUnMount")]
    pub auto_mount_and_unmount: bool,
    pub auto_clear_unused: bool,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            auto_mount_and_unmount: true,
            auto_clear_unused: true,
        }
    }
}

impl ResolvedOptions {
    /// Both flags off.
    pub fn disabled() -> Self {
        Self {
            auto_mount_and_unmount: false,
            auto_clear_unused: false,
        }
    }
}

impl From<ResolvedOptions> for StoreOptions {
    fn from(options: ResolvedOptions) -> Self {
        StoreOptions::all(options.auto_mount_and_unmount, options.auto_clear_unused)
    }
}

/// Merges the three option layers.
pub fn merge(
    global: ResolvedOptions,
    definition: Option<&StoreOptions>,
    call: Option<&StoreOptions>,
) -> ResolvedOptions {
    let resolved = definition.map_or(global, |layer| layer.apply_to(global));
    call.map_or(resolved, |layer| layer.apply_to(resolved))
}

// == Default Options ==
struct DefaultOptionsInner {
    initial: Cell<ResolvedOptions>,
    current: Cell<ResolvedOptions>,
}

/// Handle on a mutable set of global defaults.
///
/// Store definitions capture a handle and read it each time an instance is
/// created. Cloning shares the same state.
#[derive(Clone)]
pub struct DefaultOptions {
    inner: Rc<DefaultOptionsInner>,
}

thread_local! {
    static GLOBAL_DEFAULTS: DefaultOptions = DefaultOptions::new(ResolvedOptions::default());
}

impl fmt::Debug for DefaultOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultOptions")
            .field("initial", &self.initial())
            .field("current", &self.get())
            .finish()
    }
}

impl Default for DefaultOptions {
    fn default() -> Self {
        Self::new(ResolvedOptions::default())
    }
}

impl DefaultOptions {
    /// Creates defaults that [`DefaultOptions::reset`] returns to.
    pub fn new(initial: ResolvedOptions) -> Self {
        Self {
            inner: Rc::new(DefaultOptionsInner {
                initial: Cell::new(initial),
                current: Cell::new(initial),
            }),
        }
    }

    /// The shared global defaults.
    ///
    /// Global means per thread: each thread running stores has its own copy,
    /// like the rest of the reactive runtime.
    pub fn global() -> Self {
        GLOBAL_DEFAULTS.with(Clone::clone)
    }

    /// Current defaults.
    pub fn get(&self) -> ResolvedOptions {
        self.inner.current.get()
    }

    /// The value restored by [`DefaultOptions::reset`].
    pub fn initial(&self) -> ResolvedOptions {
        self.inner.initial.get()
    }

    /// Overlays `options` onto the current defaults.
    pub fn set(&self, options: StoreOptions) {
        self.inner.current.set(options.apply_to(self.get()));
    }

    /// Restores the initial defaults.
    pub fn reset(&self) {
        self.inner.current.set(self.initial());
    }

    /// Replaces both the initial and the current defaults.
    pub fn init(&self, initial: ResolvedOptions) {
        self.inner.initial.set(initial);
        self.inner.current.set(initial);
    }

    /// Resolves a definition layer and a call layer against these defaults.
    pub fn resolve(
        &self,
        definition: Option<&StoreOptions>,
        call: Option<&StoreOptions>,
    ) -> ResolvedOptions {
        merge(self.get(), definition, call)
    }
}

/// Initializes the global defaults, typically once at startup from
/// [`Config`](crate::Config).
pub fn init_global_default_options(initial: ResolvedOptions) {
    DefaultOptions::global().init(initial);
}

/// Overlays `options` onto the global defaults.
pub fn set_global_default_options(options: StoreOptions) {
    DefaultOptions::global().set(options);
}

/// Current global defaults.
pub fn get_global_default_options() -> ResolvedOptions {
    DefaultOptions::global().get()
}

/// Restores the global defaults to their initial value.
pub fn reset_global_default_options() {
    DefaultOptions::global().reset();
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let defaults = ResolvedOptions::default();
        assert!(defaults.auto_mount_and_unmount);
        assert!(defaults.auto_clear_unused);
    }

    #[test]
    fn test_merge_layers() {
        let global = ResolvedOptions::default();
        let definition = StoreOptions::new().auto_clear_unused(false);
        let call = StoreOptions::new().auto_mount_and_unmount(false);

        let resolved = merge(global, Some(&definition), Some(&call));
        assert_eq!(resolved, ResolvedOptions::disabled());
    }

    #[test]
    fn test_merge_unset_falls_through() {
        let global = ResolvedOptions::disabled();
        let definition = StoreOptions::new().auto_mount_and_unmount(true);

        let resolved = merge(global, Some(&definition), Some(&StoreOptions::new()));
        assert!(resolved.auto_mount_and_unmount);
        assert!(!resolved.auto_clear_unused);

        assert_eq!(merge(global, None, None), global);
    }

    #[test]
    fn test_overlay() {
        let base = StoreOptions::all(true, true);
        let top = StoreOptions::new().auto_clear_unused(false);

        assert_eq!(base.overlay(&top), StoreOptions::all(true, false));
        assert_eq!(top.overlay(&StoreOptions::new()), top);
    }

    #[test]
    fn test_set_and_reset_defaults() {
        let defaults = DefaultOptions::new(ResolvedOptions::default());

        defaults.set(StoreOptions::all(false, false));
        assert_eq!(defaults.get(), ResolvedOptions::disabled());

        defaults.set(StoreOptions::new().auto_clear_unused(true));
        assert!(defaults.get().auto_clear_unused);
        assert!(!defaults.get().auto_mount_and_unmount);

        defaults.reset();
        assert_eq!(defaults.get(), ResolvedOptions::default());
    }

    #[test]
    fn test_reset_returns_to_init_value() {
        let defaults = DefaultOptions::default();
        defaults.init(ResolvedOptions::disabled());
        defaults.set(StoreOptions::all(true, true));

        defaults.reset();
        assert_eq!(defaults.get(), ResolvedOptions::disabled());
    }

    #[test]
    fn test_global_defaults_roundtrip() {
        set_global_default_options(StoreOptions::new().auto_mount_and_unmount(false));
        assert!(!get_global_default_options().auto_mount_and_unmount);
        assert!(DefaultOptions::global().resolve(None, None).auto_clear_unused);

        reset_global_default_options();
        assert_eq!(get_global_default_options(), ResolvedOptions::default());
    }

    #[test]
    fn test_options_json_shape() {
        let options: StoreOptions = serde_json::from_str(r#"{"autoClearUnused":false}"#).unwrap();
        assert_eq!(options, StoreOptions::new().auto_clear_unused(false));

        let options: StoreOptions =
            serde_json::from_str(r#"{"autoMountAndUnMount":false}"#).unwrap();
        assert_eq!(options, StoreOptions::new().auto_mount_and_unmount(false));

        let json = serde_json::to_string(&ResolvedOptions::disabled()).unwrap();
        assert_eq!(json, r#"{"autoMountAndUnMount":false,"autoClearUnused":false}"#);
    }

    #[test]
    fn test_options_json_rejects_unknown_keys() {
        let misspelled = serde_json::from_str::<StoreOptions>(r#"{"autoMountAndUnmount":false}"#);
        assert!(misspelled.is_err());
    }
}
