//! Per-type metadata records
//!
//! A [`TypeData`] is created once per reflected type and lives for the rest
//! of the process. It carries the type's name, size and [`Lifecycle`], an
//! optional parent record, the ordered property list used for serialization
//! and the named overload sets.
//!
//! Members are added during the type's registration (see
//! [`Reflect::register`]). Lookups fall back to the parent chain, and
//! inherited bindings are applied to a child instance through the projection
//! recorded by [`TypeData::set_parent`].

mod builtin;
mod directory;

use std::any::TypeId;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::any::AnyValue;
use crate::error::{fatal, ReflectError, ReflectResult};
use crate::lifecycle::Lifecycle;
use crate::method::{Method, MethodOverloads};
use crate::property::Property;

pub use directory::{
    find_type, register, registered_type_count, registered_type_names, type_of, Reflect,
};

type Projection = Box<dyn Fn(NonNull<u8>) -> NonNull<u8> + Send + Sync>;

/// Link from a child record to its parent
struct ParentLink {
    data: &'static TypeData,
    upcast: Projection,
    upcast_mut: Projection,
}

#[derive(Default)]
struct Members {
    ordered: Vec<Arc<Property>>,
    properties: HashMap<String, Arc<Property>>,
    methods: HashMap<String, Arc<MethodOverloads>>,
}

/// Metadata record for one reflected type.
pub struct TypeData {
    name: String,
    lifecycle: Lifecycle,
    parent: OnceLock<ParentLink>,
    members: RwLock<Members>,
}

impl TypeData {
    pub(crate) fn leak(name: impl Into<String>, lifecycle: Lifecycle) -> &'static TypeData {
        Box::leak(Box::new(TypeData {
            name: name.into(),
            lifecycle,
            parent: OnceLock::new(),
            members: RwLock::new(Members::default()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.lifecycle.layout().size()
    }

    pub fn type_id(&self) -> TypeId {
        self.lifecycle.type_id()
    }

    /// Lifecycle operations of this type
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Default-construct a new owned value of this type.
    ///
    /// Fatal if the type has no default capability.
    pub fn construct(&'static self) -> AnyValue<'static> {
        AnyValue::construct(self)
    }

    // ============================================================================
    // Inheritance
    // ============================================================================

    pub fn parent(&self) -> Option<&'static TypeData> {
        self.parent.get().map(|link| link.data)
    }

    /// Record `P` as the parent of `C`, fatal on invalid hierarchies.
    ///
    /// `as_parent` and `as_parent_mut` project a child instance onto the
    /// embedded parent value.
    pub fn set_parent<C, P, A, M>(&'static self, as_parent: A, as_parent_mut: M)
    where
        C: Reflect,
        P: Reflect,
        A: Fn(&C) -> &P + Send + Sync + 'static,
        M: Fn(&mut C) -> &mut P + Send + Sync + 'static,
    {
        if let Err(err) = self.try_set_parent(as_parent, as_parent_mut) {
            fatal(err);
        }
    }

    pub fn try_set_parent<C, P, A, M>(
        &'static self,
        as_parent: A,
        as_parent_mut: M,
    ) -> ReflectResult<()>
    where
        C: Reflect,
        P: Reflect,
        A: Fn(&C) -> &P + Send + Sync + 'static,
        M: Fn(&mut C) -> &mut P + Send + Sync + 'static,
    {
        if self.type_id() != TypeId::of::<C>() {
            return Err(ReflectError::OwnerMismatch {
                expected: self.name.clone(),
                found: C::TYPE_NAME.to_string(),
                member: format!("parent {}", P::TYPE_NAME),
            });
        }
        if TypeId::of::<C>() == TypeId::of::<P>() {
            return Err(ReflectError::SelfParent {
                ty: self.name.clone(),
            });
        }

        let data = type_of::<P>();
        if std::ptr::eq(data, self) || data.has_ancestor(self) {
            return Err(ReflectError::SelfParent {
                ty: self.name.clone(),
            });
        }

        let link = ParentLink {
            data,
            // SAFETY: projections only receive pointers to live `C` values,
            // resolved through `project`/`project_mut` from this record.
            upcast: Box::new(move |ptr| {
                let child = unsafe { ptr.cast::<C>().as_ref() };
                NonNull::from(as_parent(child)).cast()
            }),
            upcast_mut: Box::new(move |ptr| {
                let child = unsafe { ptr.cast::<C>().as_mut() };
                NonNull::from(as_parent_mut(child)).cast()
            }),
        };

        self.parent.set(link).map_err(|_| ReflectError::ParentAlreadySet {
            ty: self.name.clone(),
        })?;
        debug!("{} derives from {}", self.name, data.name);
        Ok(())
    }

    /// True if `candidate` is the parent of this type or one of its ancestors.
    pub fn has_ancestor(&self, candidate: &TypeData) -> bool {
        let mut current = self.parent();
        while let Some(ty) = current {
            if std::ptr::eq(ty, candidate) {
                return true;
            }
            current = ty.parent();
        }
        false
    }

    /// True if this type is `other` or derives from it.
    pub fn is_a(&self, other: &TypeData) -> bool {
        std::ptr::eq(self, other) || self.has_ancestor(other)
    }

    /// Walk the parent chain from `self` to `target`, projecting `ptr`.
    pub(crate) fn project(&self, ptr: NonNull<u8>, target: &TypeData) -> Option<NonNull<u8>> {
        let mut ty = self;
        let mut ptr = ptr;
        loop {
            if std::ptr::eq(ty, target) {
                return Some(ptr);
            }
            let link = ty.parent.get()?;
            ptr = (link.upcast)(ptr);
            ty = link.data;
        }
    }

    pub(crate) fn project_mut(&self, ptr: NonNull<u8>, target: &TypeData) -> Option<NonNull<u8>> {
        let mut ty = self;
        let mut ptr = ptr;
        loop {
            if std::ptr::eq(ty, target) {
                return Some(ptr);
            }
            let link = ty.parent.get()?;
            ptr = (link.upcast_mut)(ptr);
            ty = link.data;
        }
    }

    // ============================================================================
    // Properties
    // ============================================================================

    /// Add a property, fatal if the name is taken.
    pub fn add_property(&'static self, property: Property) -> Arc<Property> {
        self.try_add_property(property).unwrap_or_else(|err| fatal(err))
    }

    pub fn try_add_property(&'static self, property: Property) -> ReflectResult<Arc<Property>> {
        if let Some(owner) = property.owner() {
            if !std::ptr::eq(owner, self) {
                return Err(ReflectError::OwnerMismatch {
                    expected: self.name.clone(),
                    found: owner.name().to_string(),
                    member: property.name().to_string(),
                });
            }
        }

        let mut members = self.members.write();
        if members.properties.contains_key(property.name()) {
            return Err(ReflectError::DuplicateProperty {
                ty: self.name.clone(),
                property: property.name().to_string(),
            });
        }

        let property = Arc::new(property);
        members
            .properties
            .insert(property.name().to_string(), Arc::clone(&property));
        members.ordered.push(Arc::clone(&property));
        debug!(
            "Registered property {}.{} ({})",
            self.name,
            property.name(),
            property.value_type().name()
        );
        Ok(property)
    }

    /// Look up a property here or on an ancestor.
    pub fn property(&self, name: &str) -> Option<Arc<Property>> {
        if let Some(found) = self.own_property(name) {
            return Some(found);
        }
        self.parent()?.property(name)
    }

    /// Look up a property registered directly on this type.
    pub fn own_property(&self, name: &str) -> Option<Arc<Property>> {
        self.members.read().properties.get(name).cloned()
    }

    /// Properties registered on this type, in registration order
    pub fn properties(&self) -> Vec<Arc<Property>> {
        self.members.read().ordered.clone()
    }

    /// Serializable properties including inherited ones, root type first
    pub fn serializable_properties(&self) -> Vec<Arc<Property>> {
        let mut out = self
            .parent()
            .map(|parent| parent.serializable_properties())
            .unwrap_or_default();
        out.extend(
            self.members
                .read()
                .ordered
                .iter()
                .filter(|p| p.is_serializable())
                .cloned(),
        );
        out
    }

    // ============================================================================
    // Methods
    // ============================================================================

    /// Add an overload, fatal on staticness mismatch or duplicate signature.
    pub fn add_method(&'static self, method: Method) -> Arc<MethodOverloads> {
        self.try_add_method(method).unwrap_or_else(|err| fatal(err))
    }

    pub fn try_add_method(&'static self, method: Method) -> ReflectResult<Arc<MethodOverloads>> {
        if let Some(receiver) = method.receiver_type() {
            if !std::ptr::eq(receiver, self) {
                return Err(ReflectError::OwnerMismatch {
                    expected: self.name.clone(),
                    found: receiver.name().to_string(),
                    member: method.name().to_string(),
                });
            }
        }

        let validate = crate::config::current().validate_signatures;
        let name = method.name().to_string();
        let mut members = self.members.write();
        let set = members
            .methods
            .entry(name.clone())
            .or_insert_with(|| {
                Arc::new(MethodOverloads::new(name.clone(), self, method.is_static()))
            });
        Arc::make_mut(set).add(method, validate)?;
        debug!("Registered method {}::{} ({} overloads)", self.name, name, set.len());
        Ok(Arc::clone(set))
    }

    /// Look up an overload set here or on an ancestor.
    pub fn method(&self, name: &str) -> Option<Arc<MethodOverloads>> {
        if let Some(found) = self.members.read().methods.get(name).cloned() {
            return Some(found);
        }
        self.parent()?.method(name)
    }

    /// Names of methods registered directly on this type
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.members.read().methods.keys().cloned().collect();
        names.sort();
        names
    }
}

impl PartialEq for TypeData {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for TypeData {}

impl std::fmt::Debug for TypeData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeData")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("parent", &self.parent().map(|p| p.name()))
            .finish()
    }
}
