//! Type-erased value container
//!
//! An [`AnyValue`] holds one payload together with the [`TypeData`] that
//! describes it. The payload is either owned (allocated through the type's
//! [`Lifecycle`](crate::Lifecycle)) or borrowed from the caller for `'a`.
//! Borrowed payloads can be const, in which case nothing writes through or
//! drops them.
//!
//! # Example
//!
//! ```ignore
//! use typemeta_core::AnyValue;
//!
//! let mut value = AnyValue::new(42i32);
//! assert_eq!(value.get::<i32>(), Some(&42));
//!
//! value.set(&String::from("retyped"));
//! assert_eq!(value.type_data().unwrap().name(), "String");
//! ```

use std::any::TypeId;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::{fatal, ReflectError, ReflectResult};
use crate::registry::{type_of, Reflect, TypeData};

/// A value of any registered type.
pub struct AnyValue<'a> {
    data: Option<NonNull<u8>>,
    ty: Option<&'static TypeData>,
    holds_reference: bool,
    is_const: bool,
    _borrow: PhantomData<&'a mut ()>,
}

impl AnyValue<'static> {
    /// Take ownership of `value`.
    pub fn new<T: Reflect>(value: T) -> Self {
        Self {
            data: Some(NonNull::from(Box::leak(Box::new(value))).cast()),
            ty: Some(type_of::<T>()),
            holds_reference: false,
            is_const: false,
            _borrow: PhantomData,
        }
    }

    /// Own a copy of `value`, fatal if `T` has no copy capability.
    pub fn copy_of<T: Reflect>(value: &T) -> Self {
        let ty = type_of::<T>();
        match unsafe { ty.lifecycle().copy(NonNull::from(value).cast()) } {
            Some(data) => Self::owned(ty, data),
            None => fatal(missing(ty, "copy")),
        }
    }

    /// Default-construct a value of `ty`, fatal if it has no default.
    pub fn construct(ty: &'static TypeData) -> Self {
        Self::try_construct(ty).unwrap_or_else(|err| fatal(err))
    }

    pub fn try_construct(ty: &'static TypeData) -> ReflectResult<Self> {
        ty.lifecycle()
            .construct()
            .map(|data| Self::owned(ty, data))
            .ok_or_else(|| missing(ty, "default"))
    }

    fn owned(ty: &'static TypeData, data: NonNull<u8>) -> Self {
        Self {
            data: Some(data),
            ty: Some(ty),
            holds_reference: false,
            is_const: false,
            _borrow: PhantomData,
        }
    }
}

impl<'a> AnyValue<'a> {
    /// A value with no type and no payload.
    pub const fn empty() -> Self {
        Self {
            data: None,
            ty: None,
            holds_reference: false,
            is_const: false,
            _borrow: PhantomData,
        }
    }

    /// Borrow `value` read-only.
    pub fn from_ref<T: Reflect>(value: &'a T) -> Self {
        Self {
            data: Some(NonNull::from(value).cast()),
            ty: Some(type_of::<T>()),
            holds_reference: true,
            is_const: true,
            _borrow: PhantomData,
        }
    }

    /// Borrow `value` mutably.
    pub fn from_mut<T: Reflect>(value: &'a mut T) -> Self {
        Self {
            data: Some(NonNull::from(value).cast()),
            ty: Some(type_of::<T>()),
            holds_reference: true,
            is_const: false,
            _borrow: PhantomData,
        }
    }

    // ============================================================================
    // Introspection
    // ============================================================================

    pub fn type_data(&self) -> Option<&'static TypeData> {
        self.ty
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// True if the payload is borrowed rather than owned
    pub fn holds_reference(&self) -> bool {
        self.holds_reference
    }

    /// Raw payload location
    pub fn as_ptr(&self) -> Option<NonNull<u8>> {
        self.data
    }

    /// Payload location for writing, `None` if const or empty
    pub fn as_mut_ptr(&mut self) -> Option<NonNull<u8>> {
        if self.is_const {
            None
        } else {
            self.data
        }
    }

    /// True if the payload is a `T`.
    pub fn is<T: Reflect>(&self) -> bool {
        self.ty.map(TypeData::type_id) == Some(TypeId::of::<T>())
    }

    // ============================================================================
    // Reading
    // ============================================================================

    pub fn get<T: Reflect>(&self) -> Option<&T> {
        if !self.is::<T>() {
            return None;
        }
        self.data.map(|ptr| unsafe { ptr.cast::<T>().as_ref() })
    }

    /// Mutable access, `None` for const values or a different type.
    pub fn get_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        if !self.is::<T>() {
            return None;
        }
        self.as_mut_ptr()
            .map(|ptr| unsafe { ptr.cast::<T>().as_mut() })
    }

    /// Reinterpret the payload as `T` without checking.
    ///
    /// # Safety
    ///
    /// The value must be non-empty and its payload must be a `T`.
    pub unsafe fn get_unchecked<T>(&self) -> &T {
        match self.data {
            Some(ptr) => ptr.cast::<T>().as_ref(),
            None => std::hint::unreachable_unchecked(),
        }
    }

    /// Move an owned `T` out, `None` if borrowed, empty or another type.
    pub fn into_inner<T: Reflect>(mut self) -> Option<T> {
        if self.holds_reference || !self.is::<T>() {
            return None;
        }
        let ptr = self.data.take()?;
        self.ty = None;
        Some(*unsafe { Box::from_raw(ptr.cast::<T>().as_ptr()) })
    }

    /// Turn into an owning value, copying a borrowed payload.
    pub fn into_owned(mut self) -> AnyValue<'static> {
        if !self.holds_reference {
            let owned = AnyValue {
                data: self.data.take(),
                ty: self.ty.take(),
                holds_reference: false,
                is_const: false,
                _borrow: PhantomData,
            };
            return owned;
        }
        self.duplicate()
    }

    /// Owning copy of this value, fatal if the type has no copy capability.
    pub fn duplicate(&self) -> AnyValue<'static> {
        match (self.ty, self.data) {
            (Some(ty), Some(data)) => match unsafe { ty.lifecycle().copy(data) } {
                Some(copy) => AnyValue::owned(ty, copy),
                None => fatal(missing(ty, "copy")),
            },
            _ => AnyValue::empty(),
        }
    }

    // ============================================================================
    // Assignment
    // ============================================================================

    /// Replace the contents with a copy of `rhs`.
    ///
    /// The result always owns its payload and is writable. Fatal if `rhs`
    /// has no copy capability.
    pub fn assign(&mut self, rhs: &AnyValue<'_>) {
        *self = rhs.duplicate();
    }

    /// Take over the state of `source`, leaving it empty.
    pub fn move_from(&mut self, source: &mut AnyValue<'a>) {
        *self = std::mem::take(source);
    }

    /// Move the contents out, leaving this value empty.
    pub fn take(&mut self) -> AnyValue<'a> {
        std::mem::take(self)
    }

    /// Assign from a typed value.
    ///
    /// With a matching type the payload is updated in place, which writes
    /// through to a mutable borrow. Otherwise the old payload is released
    /// (a borrow is simply dropped) and a copy of `value` is owned instead.
    /// Fatal if `T` has no copy capability.
    pub fn set<T: Reflect>(&mut self, value: &T) {
        let ty = type_of::<T>();
        let src = NonNull::from(value).cast::<u8>();

        if !self.is_const {
            if let (Some(current), Some(dst)) = (self.ty, self.data) {
                if std::ptr::eq(current, ty) && unsafe { ty.lifecycle().copy_assign(dst, src) } {
                    return;
                }
            }
        }

        let Some(data) = (unsafe { ty.lifecycle().copy(src) }) else {
            fatal(missing(ty, "copy"));
        };
        self.release();
        self.data = Some(data);
        self.ty = Some(ty);
    }

    /// Write `value` into a mutable payload of the same type.
    pub fn try_set<T: Reflect>(&mut self, value: T) -> ReflectResult<()> {
        match self.get_mut::<T>() {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ReflectError::NotWritable),
        }
    }

    /// Drop an owned payload and reset to empty.
    fn release(&mut self) {
        if let (Some(ty), Some(data)) = (self.ty, self.data) {
            if !self.holds_reference && !self.is_const {
                unsafe {
                    ty.lifecycle().destroy(data);
                }
            }
        }
        self.data = None;
        self.ty = None;
        self.holds_reference = false;
        self.is_const = false;
    }
}

fn missing(ty: &TypeData, capability: &'static str) -> ReflectError {
    ReflectError::MissingCapability {
        ty: ty.name().to_string(),
        capability,
    }
}

impl Default for AnyValue<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl Clone for AnyValue<'_> {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}

impl Drop for AnyValue<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl PartialEq for AnyValue<'_> {
    /// Payload equality, false across types or without an equality capability.
    fn eq(&self, other: &Self) -> bool {
        match (self.ty, other.ty, self.data, other.data) {
            (Some(a), Some(b), Some(lhs), Some(rhs)) if std::ptr::eq(a, b) => {
                unsafe { a.lifecycle().equals(lhs, rhs) }.unwrap_or(false)
            }
            (None, None, None, None) => true,
            _ => false,
        }
    }
}

impl std::fmt::Debug for AnyValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnyValue")
            .field("type", &self.ty.map(TypeData::name))
            .field("holds_reference", &self.holds_reference)
            .field("is_const", &self.is_const)
            .finish()
    }
}

/// Build an argument list of owned [`AnyValue`]s.
///
/// ```ignore
/// let args = args![5i32, 2.5f32, String::from("five")];
/// overloads.call(&mut object, &args);
/// ```
#[macro_export]
macro_rules! args {
    ($($value:expr),* $(,)?) => {
        [$($crate::AnyValue::new($value)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Lifecycle;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counted {
        drops: Rc<Cell<u32>>,
    }

    impl Clone for Counted {
        fn clone(&self) -> Self {
            Self {
                drops: Rc::clone(&self.drops),
            }
        }
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    impl Reflect for Counted {
        const TYPE_NAME: &'static str = "AnyCounted";

        fn lifecycle() -> Lifecycle {
            Lifecycle::builder::<Self>()
                .with_default()
                .with_copy()
                .build()
        }
    }

    struct MoveOnly(i32);

    impl Reflect for MoveOnly {
        const TYPE_NAME: &'static str = "AnyMoveOnly";

        fn lifecycle() -> Lifecycle {
            Lifecycle::of::<Self>()
        }
    }

    #[test]
    fn test_int_copy() {
        let value = 42i32;
        let any = AnyValue::copy_of(&value);
        assert_eq!(any.get::<i32>(), Some(&42));
        assert!(!any.holds_reference());
        assert!(!any.is_const());
        assert_eq!(any.type_data(), Some(type_of::<i32>()));
    }

    #[test]
    fn test_uint_float_and_string() {
        let u = AnyValue::new(42u32);
        let f = AnyValue::new(42.0f32);
        let s = AnyValue::new(String::from("Fourty two"));
        assert_eq!(u.get::<u32>(), Some(&42));
        assert_eq!(f.get::<f32>(), Some(&42.0));
        assert_eq!(s.get::<String>().map(String::as_str), Some("Fourty two"));
        assert!(s.get::<i32>().is_none());
        assert_eq!(unsafe { *u.get_unchecked::<u32>() }, 42);
    }

    #[test]
    fn test_reassignment_changes_type() {
        let mut any = AnyValue::new(1i32);
        any.set(&2i32);
        assert_eq!(any.get::<i32>(), Some(&2));

        any.set(&String::from("two"));
        assert!(any.is::<String>());
        assert_eq!(any.get::<String>().unwrap(), "two");
        assert!(any.get::<i32>().is_none());
    }

    #[test]
    fn test_any_to_any_assignment() {
        let source = AnyValue::new(7.5f64);
        let mut target = AnyValue::new(String::from("old"));
        target.assign(&source);

        assert_eq!(target.get::<f64>(), Some(&7.5));
        assert_eq!(source.get::<f64>(), Some(&7.5));
        assert!(!target.holds_reference());

        let borrowed_src = 9i32;
        let borrowed = AnyValue::from_ref(&borrowed_src);
        target.assign(&borrowed);
        assert!(!target.is_const());
        assert!(!target.holds_reference());
        assert_eq!(target.get::<i32>(), Some(&9));
    }

    #[test]
    fn test_borrowed_values_write_through() {
        let mut number = 10i32;
        {
            let mut any = AnyValue::from_mut(&mut number);
            assert!(any.holds_reference());
            any.set(&11i32);
            *any.get_mut::<i32>().unwrap() += 1;
        }
        assert_eq!(number, 12);
    }

    #[test]
    fn test_retyping_a_borrow_leaves_the_source() {
        let mut number = 10i32;
        {
            let mut any = AnyValue::from_mut(&mut number);
            any.set(&String::from("detached"));
            assert!(!any.holds_reference());
            assert_eq!(any.get::<String>().unwrap(), "detached");
        }
        assert_eq!(number, 10);
    }

    #[test]
    fn test_const_borrow_is_read_only() {
        let number = 3i32;
        let mut any = AnyValue::from_ref(&number);
        assert!(any.is_const());
        assert!(any.get_mut::<i32>().is_none());
        assert!(any.as_mut_ptr().is_none());
        assert!(any.try_set(4i32).is_err());

        any.set(&5i32);
        assert_eq!(any.get::<i32>(), Some(&5));
        assert!(!any.is_const());
        assert_eq!(number, 3);
    }

    #[test]
    fn test_move_leaves_source_empty() {
        let mut source = AnyValue::new(5u8);
        let ptr = source.as_ptr();
        let mut target = AnyValue::empty();
        target.move_from(&mut source);

        assert!(source.is_empty());
        assert!(source.type_data().is_none());
        assert_eq!(target.as_ptr(), ptr);
        assert_eq!(target.get::<u8>(), Some(&5));

        let taken = target.take();
        assert!(target.is_empty());
        assert_eq!(taken.get::<u8>(), Some(&5));
    }

    #[test]
    fn test_copies_are_independent() {
        let drops = Rc::new(Cell::new(0));
        let original = AnyValue::new(Counted {
            drops: Rc::clone(&drops),
        });
        let copy = original.clone();
        assert_ne!(original.as_ptr(), copy.as_ptr());

        drop(original);
        assert_eq!(drops.get(), 1);
        assert!(copy.get::<Counted>().is_some());
        drop(copy);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn test_borrow_is_not_dropped() {
        let drops = Rc::new(Cell::new(0));
        let value = Counted {
            drops: Rc::clone(&drops),
        };
        drop(AnyValue::from_ref(&value));
        assert_eq!(drops.get(), 0);
        drop(value);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_construct_from_type_data() {
        let any = AnyValue::construct(type_of::<String>());
        assert_eq!(any.get::<String>().map(String::len), Some(0));

        let err = AnyValue::try_construct(type_of::<MoveOnly>()).unwrap_err();
        assert!(matches!(err, ReflectError::MissingCapability { .. }));
    }

    #[test]
    fn test_move_only_types_fit() {
        let any = AnyValue::new(MoveOnly(8));
        let moved = any.into_inner::<MoveOnly>().unwrap();
        assert_eq!(moved.0, 8);
    }

    #[test]
    #[should_panic(expected = "copy")]
    fn test_copying_move_only_is_fatal() {
        let any = AnyValue::new(MoveOnly(1));
        let _ = any.clone();
    }

    #[test]
    fn test_equality_and_owned_conversion() {
        let number = 4i64;
        let borrowed = AnyValue::from_ref(&number);
        let owned = borrowed.clone().into_owned();
        assert_eq!(owned, AnyValue::new(4i64));
        assert_ne!(owned, AnyValue::new(4i32));
        assert_eq!(AnyValue::empty(), AnyValue::default());

        let copied = AnyValue::from_ref(&number).into_owned();
        assert!(!copied.holds_reference());
        assert!(!copied.is_const());
    }

    #[test]
    fn test_args_macro() {
        let args = crate::args![1i32, String::from("two")];
        assert_eq!(args.len(), 2);
        assert!(args[0].is::<i32>());
        assert!(args[1].is::<String>());
    }
}
