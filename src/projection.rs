//! Field Projection Module
//!
//! Splits a [`Reactive<S>`] into one bindable handle per reactive field, the
//! way destructuring would, without losing reactivity or write-back.
//!
//! Each field type classifies itself through [`Projectable`]:
//!
//! | field type      | handle                                              |
//! |-----------------|-----------------------------------------------------|
//! | `Computed<U>`   | new writable `Computed<U>` reading through `source` |
//! | `Ref<U>`        | alias reading and writing `source.field`            |
//! | `Reactive<V>`   | alias reading and replacing `source.field`          |
//! | anything else   | none                                                |
//!
//! Structs opt in with [`reactive_fields!`](crate::reactive_fields).

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::reactive::{Computed, Reactive, Ref};

// == Field Kind ==
/// How a projected field is bound to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Derived cell, re-exposed as a writable computed.
    Derived,
    /// Mutable cell, aliased.
    Cell,
    /// Nested reactive object, aliased.
    Nested,
}

// == Field Ref ==
/// Getter/setter pair aliasing one field of a reactive object.
pub struct PropertyRef<U> {
    getter: Rc<dyn Fn() -> U>,
    setter: Rc<dyn Fn(U)>,
}

impl<U> Clone for PropertyRef<U> {
    fn clone(&self) -> Self {
        Self {
            getter: Rc::clone(&self.getter),
            setter: Rc::clone(&self.setter),
        }
    }
}

impl<U> PropertyRef<U> {
    fn new(getter: impl Fn() -> U + 'static, setter: impl Fn(U) + 'static) -> Self {
        Self {
            getter: Rc::new(getter),
            setter: Rc::new(setter),
        }
    }

    pub fn get(&self) -> U {
        (self.getter)()
    }

    pub fn set(&self, value: U) {
        (self.setter)(value)
    }
}

/// A projected field handle.
pub enum FieldRef<U> {
    Derived(Computed<U>),
    Alias(PropertyRef<U>),
}

impl<U> Clone for FieldRef<U> {
    fn clone(&self) -> Self {
        match self {
            FieldRef::Derived(computed) => FieldRef::Derived(computed.clone()),
            FieldRef::Alias(property) => FieldRef::Alias(property.clone()),
        }
    }
}

impl<U: Clone + 'static> FieldRef<U> {
    /// Reads the field through its source; reads are tracked.
    pub fn get(&self) -> U {
        match self {
            FieldRef::Derived(computed) => computed.get(),
            FieldRef::Alias(property) => property.get(),
        }
    }

    /// Writes the field through its source.
    pub fn set(&self, value: U) {
        match self {
            FieldRef::Derived(computed) => computed.set(value),
            FieldRef::Alias(property) => property.set(value),
        }
    }
}

impl<U: Clone + fmt::Debug + 'static> fmt::Debug for FieldRef<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            FieldRef::Derived(_) => "Derived",
            FieldRef::Alias(_) => "Alias",
        };
        f.debug_tuple(variant).field(&self.get()).finish()
    }
}

// == Projection ==
/// One projected field with its type erased.
pub struct Projection {
    kind: FieldKind,
    handle: Rc<dyn Any>,
}

impl Projection {
    fn new<U: 'static>(kind: FieldKind, handle: FieldRef<U>) -> Self {
        Self {
            kind,
            handle: Rc::new(handle),
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

/// Classifies a field type for projection.
///
/// Plain types keep the default, which projects nothing.
pub trait Projectable: 'static {
    fn project<S: 'static>(
        source: &Reactive<S>,
        get: fn(&S) -> &Self,
        get_mut: fn(&mut S) -> &mut Self,
    ) -> Option<Projection> {
        let _ = (source, get, get_mut);
        None
    }
}

impl<U: Clone + 'static> Projectable for Computed<U> {
    fn project<S: 'static>(
        source: &Reactive<S>,
        get: fn(&S) -> &Self,
        _get_mut: fn(&mut S) -> &mut Self,
    ) -> Option<Projection> {
        // Goes through the source on every access so the read is tracked on
        // the enclosing object as well as on the field.
        let read = source.clone();
        let write = source.clone();
        let handle = Computed::writable(
            move || read.with(|s| get(s).clone()).get(),
            move |value| write.peek(|s| get(s).clone()).set(value),
        );
        Some(Projection::new(FieldKind::Derived, FieldRef::Derived(handle)))
    }
}

impl<U: Clone + 'static> Projectable for Ref<U> {
    fn project<S: 'static>(
        source: &Reactive<S>,
        get: fn(&S) -> &Self,
        _get_mut: fn(&mut S) -> &mut Self,
    ) -> Option<Projection> {
        let read = source.clone();
        let write = source.clone();
        let handle = PropertyRef::new(
            move || read.with(|s| get(s).clone()).get(),
            move |value| write.peek(|s| get(s).clone()).set(value),
        );
        Some(Projection::new(FieldKind::Cell, FieldRef::Alias(handle)))
    }
}

impl<V: 'static> Projectable for Reactive<V> {
    fn project<S: 'static>(
        source: &Reactive<S>,
        get: fn(&S) -> &Self,
        get_mut: fn(&mut S) -> &mut Self,
    ) -> Option<Projection> {
        let read = source.clone();
        let write = source.clone();
        let handle = PropertyRef::new(
            move || read.with(|s| get(s).clone()),
            move |value| write.update(|s| *get_mut(s) = value),
        );
        Some(Projection::new(FieldKind::Nested, FieldRef::Alias(handle)))
    }
}

/// Marks types as plain, non-reactive fields.
#[macro_export]
macro_rules! plain_fields {
    ($($ty:ty),* $(,)?) => {
        $( impl $crate::projection::Projectable for $ty {} )*
    };
}

plain_fields!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

impl<U: 'static> Projectable for Option<U> {}
impl<U: 'static> Projectable for Vec<U> {}
impl<U: 'static> Projectable for VecDeque<U> {}
impl<K: 'static, V: 'static, H: 'static> Projectable for HashMap<K, V, H> {}
impl<K: 'static, H: 'static> Projectable for HashSet<K, H> {}
impl<K: 'static, V: 'static> Projectable for BTreeMap<K, V> {}
impl<U: ?Sized + 'static> Projectable for Box<U> {}
impl<U: ?Sized + 'static> Projectable for Rc<U> {}
impl<U: ?Sized + 'static> Projectable for Arc<U> {}
impl<R: 'static> Projectable for fn() -> R {}
impl<A: 'static, R: 'static> Projectable for fn(A) -> R {}
impl<A: 'static, B: 'static, R: 'static> Projectable for fn(A, B) -> R {}

// == Fields ==
/// Structural field listing of a struct, in declaration order.
pub trait Fields: Sized + 'static {
    fn visit_fields(visitor: &mut FieldVisitor<'_, Self>);
}

/// Collects projections while a [`Fields`] impl walks its fields.
pub struct FieldVisitor<'a, S> {
    source: &'a Reactive<S>,
    fields: Vec<(&'static str, Projection)>,
}

impl<S: 'static> FieldVisitor<'_, S> {
    pub fn field<F: Projectable>(
        &mut self,
        key: &'static str,
        get: fn(&S) -> &F,
        get_mut: fn(&mut S) -> &mut F,
    ) {
        if let Some(projection) = F::project(self.source, get, get_mut) {
            self.fields.push((key, projection));
        }
    }
}

/// Implements [`Fields`] for a struct by listing its fields.
///
/// ```ignore
/// struct Person { id: u32, name: Ref<String>, name_len: Computed<usize> }
/// reactive_fields!(Person { id, name, name_len });
/// ```
#[macro_export]
macro_rules! reactive_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::projection::Fields for $ty {
            fn visit_fields(visitor: &mut $crate::projection::FieldVisitor<'_, Self>) {
                $(
                    visitor.field(
                        stringify!($field),
                        |source: &$ty| &source.$field,
                        |source: &mut $ty| &mut source.$field,
                    );
                )*
            }
        }
    };
}

// == Projected Fields ==
/// Handles produced by [`project_fields`], keyed by field name.
pub struct ProjectedFields {
    fields: Vec<(&'static str, Projection)>,
}

impl ProjectedFields {
    /// Typed handle for `key`; `None` if absent or `U` is not the field's
    /// value type.
    pub fn get<U: 'static>(&self, key: &str) -> Option<FieldRef<U>> {
        let (_, projection) = self.fields.iter().find(|(name, _)| *name == key)?;
        let any: &dyn Any = &*projection.handle;
        any.downcast_ref::<FieldRef<U>>().cloned()
    }

    pub fn kind(&self, key: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, projection)| projection.kind())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|(name, _)| *name == key)
    }

    /// Field names in declaration order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for ProjectedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(name, p)| (name, p.kind())))
            .finish()
    }
}

/// Projects every reactive field of `source` to its own handle.
pub fn project_fields<S: Fields>(source: &Reactive<S>) -> ProjectedFields {
    let mut visitor = FieldVisitor {
        source,
        fields: Vec::new(),
    };
    S::visit_fields(&mut visitor);
    ProjectedFields {
        fields: visitor.fields,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{flush, watch_effect};
    use std::cell::Cell;

    struct Address {
        city: String,
    }

    struct Profile {
        id: u32,
        name: Ref<String>,
        shout: Computed<String>,
        address: Reactive<Address>,
        greet: fn() -> &'static str,
    }

    crate::reactive_fields!(Profile { id, name, shout, address, greet });

    fn profile(backing: &Ref<String>) -> Reactive<Profile> {
        let name = Ref::new(String::from("Jim"));
        let shout = {
            let read = backing.clone();
            let write = backing.clone();
            Computed::writable(move || read.get().to_uppercase(), move |v| write.set(v))
        };
        Reactive::new(Profile {
            id: 7,
            name,
            shout,
            address: Reactive::new(Address {
                city: String::from("Oslo"),
            }),
            greet: || "hi",
        })
    }

    #[test]
    fn test_projection_skips_plain_fields() {
        let source = profile(&Ref::new(String::from("a")));
        let refs = project_fields(&source);

        assert_eq!(refs.keys(), vec!["name", "shout", "address"]);
        assert!(!refs.contains("id"));
        assert!(!refs.contains("greet"));
        assert_eq!(refs.kind("name"), Some(FieldKind::Cell));
        assert_eq!(refs.kind("shout"), Some(FieldKind::Derived));
        assert_eq!(refs.kind("address"), Some(FieldKind::Nested));
        assert_eq!(source.with(|p| (p.greet)()), "hi");
        assert_eq!(source.with(|p| p.id), 7);
    }

    #[test]
    fn test_cell_alias_is_two_way() {
        let source = profile(&Ref::new(String::from("a")));
        let name = project_fields(&source).get::<String>("name").unwrap();

        name.set(String::from("Lisa"));
        assert_eq!(source.with(|p| p.name.get()), "Lisa");

        source.with(|p| p.name.set(String::from("Ricky")));
        assert_eq!(name.get(), "Ricky");
    }

    #[test]
    fn test_cell_alias_follows_replaced_field() {
        let source = profile(&Ref::new(String::from("a")));
        let name = project_fields(&source).get::<String>("name").unwrap();

        source.update(|p| p.name = Ref::new(String::from("new cell")));
        assert_eq!(name.get(), "new cell");
    }

    #[test]
    fn test_derived_field_is_writable() {
        let backing = Ref::new(String::from("a"));
        let source = profile(&backing);
        let shout = project_fields(&source).get::<String>("shout").unwrap();

        assert_eq!(shout.get(), "A");
        shout.set(String::from("b"));
        assert_eq!(backing.get(), "b");
        assert_eq!(shout.get(), "B");

        backing.set(String::from("c"));
        assert_eq!(shout.get(), "C");
    }

    #[test]
    fn test_nested_alias_shares_object() {
        let source = profile(&Ref::new(String::from("a")));
        let address = project_fields(&source)
            .get::<Reactive<Address>>("address")
            .unwrap();

        address.get().update(|a| a.city = String::from("Bergen"));
        assert_eq!(source.with(|p| p.address.peek(|a| a.city.clone())), "Bergen");

        address.set(Reactive::new(Address {
            city: String::from("Rome"),
        }));
        assert_eq!(source.with(|p| p.address.peek(|a| a.city.clone())), "Rome");
    }

    #[test]
    fn test_wrong_type_yields_none() {
        let source = profile(&Ref::new(String::from("a")));
        let refs = project_fields(&source);

        assert!(refs.get::<u32>("name").is_none());
        assert!(refs.get::<String>("missing").is_none());
        assert_eq!(refs.len(), 3);
        assert!(!refs.is_empty());
    }

    #[test]
    fn test_projected_handle_is_reactive() {
        let source = profile(&Ref::new(String::from("a")));
        let name = project_fields(&source).get::<String>("name").unwrap();
        let seen = Rc::new(Cell::new(0));

        let _watcher = {
            let name = name.clone();
            let seen = seen.clone();
            watch_effect(move |_| {
                let _ = name.get();
                seen.set(seen.get() + 1);
            })
        };

        source.with(|p| p.name.set(String::from("x")));
        flush();
        assert_eq!(seen.get(), 2);
    }
}
