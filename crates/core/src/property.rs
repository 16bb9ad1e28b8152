//! Named field bindings
//!
//! A [`Property`] binds a name on one type to a getter and an optional
//! setter and exposes them through an untyped interface working on
//! [`AnyValue`]s. The binding can sit on:
//!
//! - a struct field (`member`, or `readonly_member` whose set is a no-op)
//! - an accessor pair (`accessor`, or `getter` whose set is a no-op)
//! - process-wide storage (`static_member`, `static_constant`)
//! - a static accessor pair (`static_accessor`, `static_getter`)
//!
//! Reads always return a fresh owned copy of the value. Instance bindings
//! accept any instance whose type is the owner or derives from it; other
//! instances give an empty result.

use std::ptr::NonNull;

use parking_lot::RwLock;

use crate::any::AnyValue;
use crate::error::{ReflectError, ReflectResult};
use crate::registry::{type_of, Reflect, TypeData};
use crate::serial::{TextReader, TextValue, TextWriter};

/// Value types a property can expose.
pub trait FieldValue: Reflect + Clone + PartialEq + TextValue {}

impl<T: Reflect + Clone + PartialEq + TextValue> FieldValue for T {}

/// How a property reaches its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Member,
    ReadOnlyMember,
    Accessor,
    GetOnly,
    StaticMember,
    StaticConstant,
    StaticAccessor,
    StaticGetOnly,
}

impl PropertyKind {
    pub fn is_static(self) -> bool {
        matches!(
            self,
            Self::StaticMember | Self::StaticConstant | Self::StaticAccessor | Self::StaticGetOnly
        )
    }

    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Self::Member | Self::Accessor | Self::StaticMember | Self::StaticAccessor
        )
    }
}

/// Erased access to one binding. Instance pointers are already projected
/// onto the owning type.
trait Access: Send + Sync {
    unsafe fn get(&self, object: Option<NonNull<u8>>) -> AnyValue<'static>;
    unsafe fn set(&self, object: Option<NonNull<u8>>, value: &AnyValue<'_>) -> bool;
    unsafe fn compare(&self, lhs: Option<NonNull<u8>>, rhs: Option<NonNull<u8>>) -> bool;
    unsafe fn assign(&self, dst: Option<NonNull<u8>>, src: Option<NonNull<u8>>) -> bool;
    unsafe fn write(
        &self,
        object: Option<NonNull<u8>>,
        writer: &mut TextWriter<'_>,
    ) -> ReflectResult<()>;
    unsafe fn read(
        &self,
        object: Option<NonNull<u8>>,
        reader: &mut TextReader,
    ) -> ReflectResult<()>;
}

type Getter<C, V> = Box<dyn Fn(&C) -> V + Send + Sync>;
type Setter<C, V> = Box<dyn Fn(&mut C, V) + Send + Sync>;

struct InstanceAccess<C, V> {
    get: Getter<C, V>,
    set: Option<Setter<C, V>>,
}

impl<C: Reflect, V: FieldValue> Access for InstanceAccess<C, V> {
    unsafe fn get(&self, object: Option<NonNull<u8>>) -> AnyValue<'static> {
        match object {
            Some(ptr) => AnyValue::new((self.get)(ptr.cast::<C>().as_ref())),
            None => AnyValue::empty(),
        }
    }

    unsafe fn set(&self, object: Option<NonNull<u8>>, value: &AnyValue<'_>) -> bool {
        let (Some(setter), Some(ptr)) = (&self.set, object) else {
            return false;
        };
        let Some(value) = value.get::<V>() else {
            return false;
        };
        setter(ptr.cast::<C>().as_mut(), value.clone());
        true
    }

    unsafe fn compare(&self, lhs: Option<NonNull<u8>>, rhs: Option<NonNull<u8>>) -> bool {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => {
                (self.get)(lhs.cast::<C>().as_ref()) == (self.get)(rhs.cast::<C>().as_ref())
            }
            _ => false,
        }
    }

    unsafe fn assign(&self, dst: Option<NonNull<u8>>, src: Option<NonNull<u8>>) -> bool {
        let (Some(setter), Some(dst), Some(src)) = (&self.set, dst, src) else {
            return false;
        };
        let value = (self.get)(src.cast::<C>().as_ref());
        setter(dst.cast::<C>().as_mut(), value);
        true
    }

    unsafe fn write(
        &self,
        object: Option<NonNull<u8>>,
        writer: &mut TextWriter<'_>,
    ) -> ReflectResult<()> {
        match object {
            Some(ptr) => (self.get)(ptr.cast::<C>().as_ref()).write_text(writer),
            None => Ok(()),
        }
    }

    unsafe fn read(
        &self,
        object: Option<NonNull<u8>>,
        reader: &mut TextReader,
    ) -> ReflectResult<()> {
        let Some(ptr) = object else {
            return Err(ReflectError::NotWritable);
        };
        // Start from the current value so nested records keep unread fields
        let mut value = (self.get)(ptr.cast::<C>().as_ref());
        value.read_text(reader)?;
        if let Some(setter) = &self.set {
            setter(ptr.cast::<C>().as_mut(), value);
        }
        Ok(())
    }
}

struct StaticAccess<V> {
    get: Box<dyn Fn() -> V + Send + Sync>,
    set: Option<Box<dyn Fn(V) + Send + Sync>>,
}

impl<V: FieldValue> Access for StaticAccess<V> {
    unsafe fn get(&self, _object: Option<NonNull<u8>>) -> AnyValue<'static> {
        AnyValue::new((self.get)())
    }

    unsafe fn set(&self, _object: Option<NonNull<u8>>, value: &AnyValue<'_>) -> bool {
        match (&self.set, value.get::<V>()) {
            (Some(setter), Some(value)) => {
                setter(value.clone());
                true
            }
            _ => false,
        }
    }

    unsafe fn compare(&self, _lhs: Option<NonNull<u8>>, _rhs: Option<NonNull<u8>>) -> bool {
        // Every instance sees the same storage
        true
    }

    unsafe fn assign(&self, _dst: Option<NonNull<u8>>, _src: Option<NonNull<u8>>) -> bool {
        false
    }

    unsafe fn write(
        &self,
        _object: Option<NonNull<u8>>,
        writer: &mut TextWriter<'_>,
    ) -> ReflectResult<()> {
        (self.get)().write_text(writer)
    }

    unsafe fn read(
        &self,
        _object: Option<NonNull<u8>>,
        reader: &mut TextReader,
    ) -> ReflectResult<()> {
        let mut value = (self.get)();
        value.read_text(reader)?;
        if let Some(setter) = &self.set {
            setter(value);
        }
        Ok(())
    }
}

/// A named get/set binding on a type.
pub struct Property {
    name: String,
    kind: PropertyKind,
    owner: Option<&'static TypeData>,
    value_type: &'static TypeData,
    serializable: bool,
    access: Box<dyn Access>,
}

impl Property {
    fn instance<C: Reflect, V: FieldValue>(
        name: impl Into<String>,
        kind: PropertyKind,
        get: Getter<C, V>,
        set: Option<Setter<C, V>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            owner: Some(type_of::<C>()),
            value_type: type_of::<V>(),
            serializable: false,
            access: Box::new(InstanceAccess { get, set }),
        }
    }

    fn global<V: FieldValue>(
        name: impl Into<String>,
        kind: PropertyKind,
        get: Box<dyn Fn() -> V + Send + Sync>,
        set: Option<Box<dyn Fn(V) + Send + Sync>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            owner: None,
            value_type: type_of::<V>(),
            serializable: false,
            access: Box::new(StaticAccess { get, set }),
        }
    }

    // ============================================================================
    // Construction
    // ============================================================================

    /// Bind a struct field.
    pub fn member<C, V, G, M>(name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        C: Reflect,
        V: FieldValue,
        G: Fn(&C) -> &V + Send + Sync + 'static,
        M: Fn(&mut C) -> &mut V + Send + Sync + 'static,
    {
        Self::instance(
            name,
            PropertyKind::Member,
            Box::new(move |object: &C| get(object).clone()),
            Some(Box::new(move |object: &mut C, value: V| *get_mut(object) = value)),
        )
    }

    /// Bind a struct field that must not be written.
    pub fn readonly_member<C, V, G>(name: impl Into<String>, get: G) -> Self
    where
        C: Reflect,
        V: FieldValue,
        G: Fn(&C) -> &V + Send + Sync + 'static,
    {
        Self::instance(
            name,
            PropertyKind::ReadOnlyMember,
            Box::new(move |object: &C| get(object).clone()),
            None,
        )
    }

    /// Bind a getter/setter pair.
    pub fn accessor<C, V, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        C: Reflect,
        V: FieldValue,
        G: Fn(&C) -> V + Send + Sync + 'static,
        S: Fn(&mut C, V) + Send + Sync + 'static,
    {
        Self::instance(name, PropertyKind::Accessor, Box::new(get), Some(Box::new(set)))
    }

    /// Bind a getter only.
    pub fn getter<C, V, G>(name: impl Into<String>, get: G) -> Self
    where
        C: Reflect,
        V: FieldValue,
        G: Fn(&C) -> V + Send + Sync + 'static,
    {
        Self::instance(name, PropertyKind::GetOnly, Box::new(get), None)
    }

    /// Bind process-wide storage.
    pub fn static_member<V>(name: impl Into<String>, cell: &'static RwLock<V>) -> Self
    where
        V: FieldValue + Send + Sync,
    {
        Self::global(
            name,
            PropertyKind::StaticMember,
            Box::new(move || cell.read().clone()),
            Some(Box::new(move |value| *cell.write() = value)),
        )
    }

    /// Bind a process-wide constant.
    pub fn static_constant<V>(name: impl Into<String>, value: &'static V) -> Self
    where
        V: FieldValue + Sync,
    {
        Self::global(
            name,
            PropertyKind::StaticConstant,
            Box::new(move || value.clone()),
            None,
        )
    }

    /// Bind a static getter/setter pair.
    pub fn static_accessor<V, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        V: FieldValue,
        G: Fn() -> V + Send + Sync + 'static,
        S: Fn(V) + Send + Sync + 'static,
    {
        Self::global(
            name,
            PropertyKind::StaticAccessor,
            Box::new(get),
            Some(Box::new(set)),
        )
    }

    /// Bind a static getter only.
    pub fn static_getter<V, G>(name: impl Into<String>, get: G) -> Self
    where
        V: FieldValue,
        G: Fn() -> V + Send + Sync + 'static,
    {
        Self::global(name, PropertyKind::StaticGetOnly, Box::new(get), None)
    }

    /// Opt in to text serialization.
    pub fn serialized(mut self) -> Self {
        self.serializable = true;
        self
    }

    // ============================================================================
    // Introspection
    // ============================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Type the binding was built for, `None` for static bindings
    pub fn owner(&self) -> Option<&'static TypeData> {
        self.owner
    }

    pub fn value_type(&self) -> &'static TypeData {
        self.value_type
    }

    pub fn is_static(&self) -> bool {
        self.kind.is_static()
    }

    pub fn is_writable(&self) -> bool {
        self.kind.is_writable()
    }

    pub fn is_serializable(&self) -> bool {
        self.serializable
    }

    // ============================================================================
    // Access
    // ============================================================================

    fn locate(&self, instance: &AnyValue<'_>) -> Option<NonNull<u8>> {
        let owner = self.owner?;
        instance.type_data()?.project(instance.as_ptr()?, owner)
    }

    fn locate_mut(&self, instance: &mut AnyValue<'_>) -> Option<NonNull<u8>> {
        let owner = self.owner?;
        let ty = instance.type_data()?;
        ty.project_mut(instance.as_mut_ptr()?, owner)
    }

    /// Read the value from `instance`.
    pub fn get(&self, instance: &AnyValue<'_>) -> AnyValue<'static> {
        match self.locate(instance) {
            Some(ptr) => unsafe { self.access.get(Some(ptr)) },
            None => AnyValue::empty(),
        }
    }

    /// Read a static value, empty for instance bindings.
    pub fn get_static(&self) -> AnyValue<'static> {
        if !self.is_static() {
            return AnyValue::empty();
        }
        unsafe { self.access.get(None) }
    }

    /// Write `value` into `instance`.
    ///
    /// Returns false without changing anything if the binding is read-only,
    /// the instance is const or unrelated, or `value` has another type.
    pub fn set(&self, instance: &mut AnyValue<'_>, value: &AnyValue<'_>) -> bool {
        match self.locate_mut(instance) {
            Some(ptr) => unsafe { self.access.set(Some(ptr), value) },
            None => false,
        }
    }

    pub fn set_static(&self, value: &AnyValue<'_>) -> bool {
        if !self.is_static() {
            return false;
        }
        unsafe { self.access.set(None, value) }
    }

    /// Compare the bound values of two instances.
    pub fn compare(&self, lhs: &AnyValue<'_>, rhs: &AnyValue<'_>) -> bool {
        if self.is_static() {
            return unsafe { self.access.compare(None, None) };
        }
        unsafe { self.access.compare(self.locate(lhs), self.locate(rhs)) }
    }

    /// Copy the bound value from `src` into `dst`.
    pub fn assign(&self, dst: &mut AnyValue<'_>, src: &AnyValue<'_>) -> bool {
        if self.is_static() {
            return false;
        }
        let src = self.locate(src);
        let dst = self.locate_mut(dst);
        unsafe { self.access.assign(dst, src) }
    }

    /// Write the value of `instance` in text form.
    pub fn serialize(
        &self,
        instance: &AnyValue<'_>,
        writer: &mut TextWriter<'_>,
    ) -> ReflectResult<()> {
        let object = if self.is_static() { None } else { self.locate(instance) };
        unsafe { self.access.write(object, writer) }
    }

    /// Read a value in text form into `instance`.
    pub fn deserialize(
        &self,
        instance: &mut AnyValue<'_>,
        reader: &mut TextReader,
    ) -> ReflectResult<()> {
        let object = if self.is_static() { None } else { self.locate_mut(instance) };
        unsafe { self.access.read(object, reader) }
    }

    pub(crate) fn write_field(
        &self,
        ty: &TypeData,
        ptr: NonNull<u8>,
        writer: &mut TextWriter<'_>,
    ) -> ReflectResult<()> {
        let object = match self.owner {
            Some(owner) => ty.project(ptr, owner),
            None => None,
        };
        unsafe { self.access.write(object, writer) }
    }

    pub(crate) fn read_field(
        &self,
        ty: &TypeData,
        ptr: NonNull<u8>,
        reader: &mut TextReader,
    ) -> ReflectResult<()> {
        let object = match self.owner {
            Some(owner) => ty.project_mut(ptr, owner),
            None => None,
        };
        unsafe { self.access.read(object, reader) }
    }

    // ============================================================================
    // Typed helpers
    // ============================================================================

    pub fn get_from<C: Reflect>(&self, object: &C) -> AnyValue<'static> {
        self.get(&AnyValue::from_ref(object))
    }

    pub fn set_on<C: Reflect, V: Reflect>(&self, object: &mut C, value: V) -> bool {
        self.set(&mut AnyValue::from_mut(object), &AnyValue::new(value))
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("owner", &self.owner.map(TypeData::name))
            .field("value_type", &self.value_type.name())
            .field("serializable", &self.serializable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Lifecycle;
    use std::sync::atomic::{AtomicI32, Ordering};

    static STATIC_VALUE: AtomicI32 = AtomicI32::new(0);
    static MEMBER_STATIC: RwLock<i32> = RwLock::new(5);
    static CONSTANT_STATIC: i32 = 77;

    #[derive(Default, Clone, PartialEq, Debug)]
    struct Subject {
        value: i32,
        member: i32,
        constant: i32,
        label: String,
    }

    impl Subject {
        fn value(&self) -> i32 {
            self.value
        }

        fn set_value(&mut self, value: i32) {
            self.value = value;
        }

        fn only_get(&self) -> i32 {
            5
        }
    }

    impl Reflect for Subject {
        const TYPE_NAME: &'static str = "PropertySubject";

        fn lifecycle() -> Lifecycle {
            Lifecycle::builder::<Self>()
                .with_default()
                .with_copy()
                .with_eq()
                .build()
        }

        fn register(ty: &'static TypeData) {
            ty.add_property(Property::accessor("Value", Subject::value, Subject::set_value));
            ty.add_property(Property::getter("OnlyGet", Subject::only_get));
            ty.add_property(Property::static_accessor(
                "Static",
                || STATIC_VALUE.load(Ordering::SeqCst),
                |v| STATIC_VALUE.store(v, Ordering::SeqCst),
            ));
            ty.add_property(Property::static_getter("StaticGet", || 10i32));
            ty.add_property(Property::member(
                "m_Member",
                |s: &Subject| &s.member,
                |s: &mut Subject| &mut s.member,
            ));
            ty.add_property(Property::static_member("m_StaticValue", &MEMBER_STATIC));
            ty.add_property(Property::readonly_member("m_Constant", |s: &Subject| &s.constant));
            ty.add_property(Property::static_constant("m_ConstantStaticValue", &CONSTANT_STATIC));
            ty.add_property(
                Property::member("label", |s: &Subject| &s.label, |s: &mut Subject| &mut s.label)
                    .serialized(),
            );
        }
    }

    fn property(name: &str) -> std::sync::Arc<Property> {
        type_of::<Subject>().property(name).unwrap()
    }

    #[test]
    fn test_accessor_pair() {
        let mut subject = Subject::default();
        let value = property("Value");
        assert_eq!(value.kind(), PropertyKind::Accessor);

        assert!(value.set_on(&mut subject, 5i32));
        assert_eq!(subject.value, 5);
        assert_eq!(value.get_from(&subject).get::<i32>(), Some(&5));
    }

    #[test]
    fn test_get_only_never_writes() {
        let mut subject = Subject::default();
        let only_get = property("OnlyGet");
        assert!(!only_get.is_writable());
        for input in [0i32, 5, -1, i32::MAX] {
            assert!(!only_get.set_on(&mut subject, input));
            assert_eq!(only_get.get_from(&subject).get::<i32>(), Some(&5));
        }
    }

    #[test]
    fn test_static_accessor() {
        let status = property("Static");
        assert!(status.is_static());
        assert!(status.set_static(&AnyValue::new(5i32)));
        assert_eq!(status.get_static().get::<i32>(), Some(&5));

        // Instance forms do not apply to static bindings
        let subject = Subject::default();
        assert!(status.get_from(&subject).is_empty());
    }

    #[test]
    fn test_static_getter() {
        let getter = property("StaticGet");
        assert!(!getter.set_static(&AnyValue::new(1i32)));
        assert_eq!(getter.get_static().get::<i32>(), Some(&10));
    }

    #[test]
    fn test_member() {
        let mut subject = Subject::default();
        let member = property("m_Member");
        assert!(member.set_on(&mut subject, 5i32));
        assert_eq!(subject.member, 5);
        assert_eq!(member.get_from(&subject).get::<i32>(), Some(&5));
        assert!(member.get_static().is_empty());
    }

    #[test]
    fn test_static_member() {
        let member = property("m_StaticValue");
        assert!(member.set_static(&AnyValue::new(6i32)));
        assert_eq!(*MEMBER_STATIC.read(), 6);
        assert_eq!(member.get_static().get::<i32>(), Some(&6));
    }

    #[test]
    fn test_constant_member() {
        let mut subject = Subject {
            constant: 5,
            ..Subject::default()
        };
        let constant = property("m_Constant");
        assert!(!constant.set_on(&mut subject, 9i32));
        assert_eq!(constant.get_from(&subject).get::<i32>(), Some(&5));
    }

    #[test]
    fn test_constant_static() {
        let constant = property("m_ConstantStaticValue");
        assert_eq!(constant.kind(), PropertyKind::StaticConstant);
        assert!(!constant.set_static(&AnyValue::new(1i32)));
        assert_eq!(constant.get_static().get::<i32>(), Some(&77));
    }

    #[test]
    fn test_get_returns_independent_copy() {
        let mut subject = Subject {
            label: "before".to_string(),
            ..Subject::default()
        };
        let label = property("label");
        let copy = label.get_from(&subject);
        subject.label.push_str(" and after");
        assert_eq!(copy.get::<String>().unwrap(), "before");
        assert!(!copy.holds_reference());
    }

    #[test]
    fn test_set_rejects_wrong_type_and_const_instance() {
        let mut subject = Subject::default();
        let member = property("m_Member");
        assert!(!member.set_on(&mut subject, 5u32));
        assert_eq!(subject.member, 0);

        let mut borrowed = AnyValue::from_ref(&subject);
        assert!(!member.set(&mut borrowed, &AnyValue::new(3i32)));
    }

    #[test]
    fn test_compare_and_assign() {
        let member = property("m_Member");
        let mut lhs = Subject {
            member: 1,
            ..Subject::default()
        };
        let rhs = Subject {
            member: 2,
            ..Subject::default()
        };
        assert!(!member.compare(&AnyValue::from_ref(&lhs), &AnyValue::from_ref(&rhs)));

        assert!(member.assign(&mut AnyValue::from_mut(&mut lhs), &AnyValue::from_ref(&rhs)));
        assert_eq!(lhs.member, 2);
        assert!(member.compare(&AnyValue::from_ref(&lhs), &AnyValue::from_ref(&rhs)));

        let only_get = property("OnlyGet");
        assert!(!only_get.assign(&mut AnyValue::from_mut(&mut lhs), &AnyValue::from_ref(&rhs)));
    }

    #[test]
    fn test_unrelated_instance_gives_empty() {
        let member = property("m_Member");
        let other = 5i32;
        assert!(member.get(&AnyValue::from_ref(&other)).is_empty());
        assert!(member.get(&AnyValue::empty()).is_empty());
    }

    #[test]
    fn test_metadata() {
        let label = property("label");
        assert_eq!(label.name(), "label");
        assert_eq!(label.owner(), Some(type_of::<Subject>()));
        assert_eq!(label.value_type(), type_of::<String>());
        assert!(label.is_serializable());
        assert!(!property("m_Member").is_serializable());
        assert_eq!(property("m_StaticValue").owner(), None);
        assert!(format!("{:?}", label).contains("PropertySubject"));
    }
}
