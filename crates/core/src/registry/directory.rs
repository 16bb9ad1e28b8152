//! Process-wide type directory
//!
//! Records are created lazily the first time a type is asked for through
//! [`type_of`] and are published under both their registered name and their
//! `TypeId`. Registration runs under one reentrant lock so a type can refer
//! to itself, or pull in the types of its fields, while it is being set up.
//! Other threads only see a record once its registration has finished.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use tracing::{debug, warn};

use super::TypeData;
use crate::error::{fatal, ReflectError};
use crate::lifecycle::Lifecycle;

/// A type that can describe itself to the registry.
///
/// Usually implemented through `#[derive(Reflect)]`.
///
/// # Example
///
/// ```ignore
/// use typemeta_core::{Lifecycle, Property, Reflect, TypeData};
///
/// #[derive(Default, Clone, PartialEq)]
/// struct Point {
///     x: i32,
/// }
///
/// impl Reflect for Point {
///     const TYPE_NAME: &'static str = "Point";
///
///     fn lifecycle() -> Lifecycle {
///         Lifecycle::builder::<Self>()
///             .with_default()
///             .with_copy()
///             .with_eq()
///             .build()
///     }
///
///     fn register(ty: &'static TypeData) {
///         ty.add_property(Property::member("x", |p: &Point| &p.x, |p: &mut Point| &mut p.x));
///     }
/// }
/// ```
pub trait Reflect: Sized + 'static {
    /// Name the type is registered under
    const TYPE_NAME: &'static str;

    /// Lifecycle operations available for this type
    fn lifecycle() -> Lifecycle;

    /// Add properties, methods and the parent link.
    ///
    /// Called exactly once, the first time the type is looked up.
    fn register(ty: &'static TypeData) {
        let _ = ty;
    }
}

struct Directory {
    by_name: DashMap<String, &'static TypeData>,
    by_id: DashMap<TypeId, &'static TypeData>,
}

/// Global directory of finished records
static DIRECTORY: LazyLock<Directory> = LazyLock::new(|| Directory {
    by_name: DashMap::new(),
    by_id: DashMap::new(),
});

/// Records whose registration is in progress, guarded by the registration lock
static REGISTRATION: LazyLock<ReentrantMutex<RefCell<HashMap<TypeId, &'static TypeData>>>> =
    LazyLock::new(|| ReentrantMutex::new(RefCell::new(HashMap::new())));

/// Removes the in-progress entry even if registration panics.
struct PendingGuard<'a> {
    pending: &'a RefCell<HashMap<TypeId, &'static TypeData>>,
    id: TypeId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.borrow_mut().remove(&self.id);
    }
}

/// Get the record for `T`, registering it on first use.
pub fn type_of<T: Reflect>() -> &'static TypeData {
    let id = TypeId::of::<T>();
    if let Some(found) = DIRECTORY.by_id.get(&id).map(|entry| *entry) {
        return found;
    }

    let lock = REGISTRATION.lock();
    if let Some(found) = DIRECTORY.by_id.get(&id).map(|entry| *entry) {
        return found;
    }
    if let Some(found) = lock.borrow().get(&id).copied() {
        // Re-entered while `T` is still registering
        return found;
    }

    let lifecycle = T::lifecycle();
    if lifecycle.type_id() != id {
        fatal(ReflectError::LifecycleMismatch {
            ty: T::TYPE_NAME.to_string(),
            found: lifecycle.rust_type_name(),
        });
    }

    let data = TypeData::leak(T::TYPE_NAME, lifecycle);
    lock.borrow_mut().insert(id, data);
    {
        let _pending = PendingGuard { pending: &*lock, id };
        T::register(data);
    }

    publish(id, data);
    data
}

fn publish(id: TypeId, data: &'static TypeData) {
    let mut name_taken = false;
    DIRECTORY
        .by_name
        .entry(data.name().to_string())
        .and_modify(|_| name_taken = true)
        .or_insert(data);
    if name_taken {
        warn!(
            "Type name {} is already registered, {} is only reachable by type",
            data.name(),
            data.lifecycle().rust_type_name()
        );
    }
    DIRECTORY.by_id.insert(id, data);
    debug!(
        "Registered type {} ({} bytes, {:?})",
        data.name(),
        data.size(),
        data.lifecycle().capabilities()
    );
}

/// Register `T` eagerly.
pub fn register<T: Reflect>() -> &'static TypeData {
    type_of::<T>()
}

/// Look up a registered type by name.
pub fn find_type(name: &str) -> Option<&'static TypeData> {
    DIRECTORY.by_name.get(name).map(|entry| *entry)
}

/// Number of registered types
pub fn registered_type_count() -> usize {
    DIRECTORY.by_id.len()
}

/// Names of all registered types, sorted
pub fn registered_type_names() -> Vec<String> {
    let mut names: Vec<String> = DIRECTORY
        .by_name
        .iter()
        .map(|entry| entry.key().clone())
        .collect();
    names.sort();
    names
}
