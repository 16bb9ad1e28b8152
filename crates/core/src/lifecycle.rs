//! Type-erased lifecycle table
//!
//! A [`Lifecycle`] is built once per registered type and decides which
//! construction, copy, move and destruction operations exist for it. Every
//! operation is total: when the capability is absent the heap form returns
//! `None` and the in-place form returns `false` without touching memory.
//!
//! Capabilities are probed through trait bounds on [`LifecycleBuilder`]:
//! `with_default` needs `T: Default`, `with_copy` needs `T: Clone` and
//! `with_eq` needs `T: PartialEq`. Moving and destroying are always
//! available for Rust types.
//!
//! All payload pointers handed to the operations must point at a live,
//! properly aligned `T` for the type the table was built for (or at
//! uninitialized storage of [`Lifecycle::layout`] for in-place targets).

use std::alloc::Layout;
use std::any::TypeId;
use std::marker::PhantomData;
use std::ptr::NonNull;

use bitflags::bitflags;

bitflags! {
    /// Lifecycle operations a type supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Default construction
        const DEFAULT = 1 << 0;
        /// Copy construction and copy assignment
        const COPY = 1 << 1;
        /// Move construction
        const MOVE = 1 << 2;
        /// Destruction
        const DESTRUCT = 1 << 3;
        /// Value equality
        const EQ = 1 << 4;
        /// The type dispatches behaviour dynamically
        const POLYMORPHIC = 1 << 5;
    }
}

type ConstructFn = fn() -> NonNull<u8>;
type ConstructInPlaceFn = unsafe fn(NonNull<u8>);
type CloneFn = unsafe fn(NonNull<u8>) -> NonNull<u8>;
type BinaryFn = unsafe fn(NonNull<u8>, NonNull<u8>);
type DropFn = unsafe fn(NonNull<u8>);
type EqFn = unsafe fn(NonNull<u8>, NonNull<u8>) -> bool;

/// Per-type table of lifecycle operations.
#[derive(Clone, Copy)]
pub struct Lifecycle {
    type_id: TypeId,
    type_name: &'static str,
    layout: Layout,
    caps: Capabilities,
    construct: Option<ConstructFn>,
    construct_in_place: Option<ConstructInPlaceFn>,
    copy: Option<CloneFn>,
    copy_in_place: Option<BinaryFn>,
    copy_assign: Option<BinaryFn>,
    move_construct: CloneFn,
    move_in_place: BinaryFn,
    destroy: DropFn,
    destructor: DropFn,
    eq: Option<EqFn>,
}

impl Lifecycle {
    /// Start a table for `T` with only move and destroy support.
    pub fn builder<T: 'static>() -> LifecycleBuilder<T> {
        LifecycleBuilder {
            table: Lifecycle {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                layout: Layout::new::<T>(),
                caps: Capabilities::MOVE | Capabilities::DESTRUCT,
                construct: None,
                construct_in_place: None,
                copy: None,
                copy_in_place: None,
                copy_assign: None,
                move_construct: move_boxed::<T> as CloneFn,
                move_in_place: move_in_place::<T> as BinaryFn,
                destroy: destroy_boxed::<T> as DropFn,
                destructor: drop_in_place::<T> as DropFn,
                eq: None,
            },
            _marker: PhantomData,
        }
    }

    /// Table for a type that can only be moved and dropped.
    pub fn of<T: 'static>() -> Self {
        Self::builder::<T>().build()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name as reported by the compiler
    pub fn rust_type_name(&self) -> &'static str {
        self.type_name
    }

    /// Size and alignment of the payload, for callers supplying storage
    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn has_default(&self) -> bool {
        self.caps.contains(Capabilities::DEFAULT)
    }

    pub fn has_copy(&self) -> bool {
        self.caps.contains(Capabilities::COPY)
    }

    pub fn has_move(&self) -> bool {
        self.caps.contains(Capabilities::MOVE)
    }

    pub fn has_destructor(&self) -> bool {
        self.caps.contains(Capabilities::DESTRUCT)
    }

    pub fn has_eq(&self) -> bool {
        self.caps.contains(Capabilities::EQ)
    }

    pub fn is_polymorphic(&self) -> bool {
        self.caps.contains(Capabilities::POLYMORPHIC)
    }

    // ============================================================================
    // Heap forms
    // ============================================================================

    /// Allocate a default-constructed payload.
    pub fn construct(&self) -> Option<NonNull<u8>> {
        self.construct.map(|f| f())
    }

    /// Allocate a copy of `src`.
    ///
    /// # Safety
    ///
    /// `src` must point at a live value of this table's type.
    pub unsafe fn copy(&self, src: NonNull<u8>) -> Option<NonNull<u8>> {
        self.copy.map(|f| f(src))
    }

    /// Allocate a new payload by moving out of `src`.
    ///
    /// # Safety
    ///
    /// `src` must point at a live value of this table's type. Afterwards it
    /// is logically uninitialized and must not be dropped again.
    pub unsafe fn move_construct(&self, src: NonNull<u8>) -> Option<NonNull<u8>> {
        Some((self.move_construct)(src))
    }

    /// Drop and free a payload returned by one of the heap forms.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`construct`](Self::construct),
    /// [`copy`](Self::copy) or [`move_construct`](Self::move_construct) of
    /// this table and must not be used afterwards.
    pub unsafe fn destroy(&self, ptr: NonNull<u8>) -> bool {
        (self.destroy)(ptr);
        true
    }

    // ============================================================================
    // In-place forms
    // ============================================================================

    /// Default-construct into caller storage.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of [`layout`](Self::layout) and must not
    /// hold a live value.
    pub unsafe fn construct_in_place(&self, dst: NonNull<u8>) -> bool {
        match self.construct_in_place {
            Some(f) => {
                f(dst);
                true
            }
            None => false,
        }
    }

    /// Copy-construct `src` into caller storage.
    ///
    /// # Safety
    ///
    /// As for [`construct_in_place`](Self::construct_in_place), and `src`
    /// must point at a live value.
    pub unsafe fn copy_in_place(&self, dst: NonNull<u8>, src: NonNull<u8>) -> bool {
        match self.copy_in_place {
            Some(f) => {
                f(dst, src);
                true
            }
            None => false,
        }
    }

    /// Overwrite the live value at `dst` with a copy of `src`.
    ///
    /// # Safety
    ///
    /// Both pointers must point at live values of this table's type.
    pub unsafe fn copy_assign(&self, dst: NonNull<u8>, src: NonNull<u8>) -> bool {
        match self.copy_assign {
            Some(f) => {
                f(dst, src);
                true
            }
            None => false,
        }
    }

    /// Move `src` into caller storage.
    ///
    /// # Safety
    ///
    /// `dst` as for [`construct_in_place`](Self::construct_in_place); `src`
    /// is left logically uninitialized.
    pub unsafe fn move_in_place(&self, dst: NonNull<u8>, src: NonNull<u8>) -> bool {
        (self.move_in_place)(dst, src);
        true
    }

    /// Run the destructor without freeing the storage.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a live value which is not used afterwards.
    pub unsafe fn destructor(&self, ptr: NonNull<u8>) -> bool {
        (self.destructor)(ptr);
        true
    }

    /// Compare two payloads, `None` if the type has no equality.
    ///
    /// # Safety
    ///
    /// Both pointers must point at live values of this table's type.
    pub unsafe fn equals(&self, lhs: NonNull<u8>, rhs: NonNull<u8>) -> Option<bool> {
        self.eq.map(|f| f(lhs, rhs))
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("type", &self.type_name)
            .field("size", &self.layout.size())
            .field("caps", &self.caps)
            .finish()
    }
}

/// Typed builder for a [`Lifecycle`].
pub struct LifecycleBuilder<T> {
    table: Lifecycle,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> LifecycleBuilder<T> {
    pub fn with_default(mut self) -> Self
    where
        T: Default,
    {
        self.table.caps |= Capabilities::DEFAULT;
        self.table.construct = Some(construct_boxed::<T> as ConstructFn);
        self.table.construct_in_place = Some(construct_in_place::<T> as ConstructInPlaceFn);
        self
    }

    pub fn with_copy(mut self) -> Self
    where
        T: Clone,
    {
        self.table.caps |= Capabilities::COPY;
        self.table.copy = Some(copy_boxed::<T> as CloneFn);
        self.table.copy_in_place = Some(copy_in_place::<T> as BinaryFn);
        self.table.copy_assign = Some(copy_assign::<T> as BinaryFn);
        self
    }

    pub fn with_eq(mut self) -> Self
    where
        T: PartialEq,
    {
        self.table.caps |= Capabilities::EQ;
        self.table.eq = Some(equals::<T> as EqFn);
        self
    }

    pub fn polymorphic(mut self) -> Self {
        self.table.caps |= Capabilities::POLYMORPHIC;
        self
    }

    pub fn build(self) -> Lifecycle {
        self.table
    }
}

fn construct_boxed<T: Default>() -> NonNull<u8> {
    NonNull::from(Box::leak(Box::new(T::default()))).cast()
}

unsafe fn construct_in_place<T: Default>(dst: NonNull<u8>) {
    dst.cast::<T>().as_ptr().write(T::default());
}

unsafe fn copy_boxed<T: Clone>(src: NonNull<u8>) -> NonNull<u8> {
    let value = src.cast::<T>().as_ref().clone();
    NonNull::from(Box::leak(Box::new(value))).cast()
}

unsafe fn copy_in_place<T: Clone>(dst: NonNull<u8>, src: NonNull<u8>) {
    let value = src.cast::<T>().as_ref().clone();
    dst.cast::<T>().as_ptr().write(value);
}

unsafe fn copy_assign<T: Clone>(dst: NonNull<u8>, src: NonNull<u8>) {
    if dst == src {
        return;
    }
    let value = src.cast::<T>().as_ref().clone();
    *dst.cast::<T>().as_ptr() = value;
}

unsafe fn move_boxed<T>(src: NonNull<u8>) -> NonNull<u8> {
    let value = src.cast::<T>().as_ptr().read();
    NonNull::from(Box::leak(Box::new(value))).cast()
}

unsafe fn move_in_place<T>(dst: NonNull<u8>, src: NonNull<u8>) {
    dst.cast::<T>()
        .as_ptr()
        .write(src.cast::<T>().as_ptr().read());
}

unsafe fn destroy_boxed<T>(ptr: NonNull<u8>) {
    drop(Box::from_raw(ptr.cast::<T>().as_ptr()));
}

unsafe fn drop_in_place<T>(ptr: NonNull<u8>) {
    std::ptr::drop_in_place(ptr.cast::<T>().as_ptr());
}

unsafe fn equals<T: PartialEq>(lhs: NonNull<u8>, rhs: NonNull<u8>) -> bool {
    lhs.cast::<T>().as_ref() == rhs.cast::<T>().as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::alloc::{alloc, dealloc};
    use std::rc::Rc;

    #[derive(Default, Clone, PartialEq, Debug)]
    struct Full {
        value: i32,
        name: String,
    }

    struct NoConstructors {
        #[allow(dead_code)]
        value: i32,
    }

    #[test]
    fn test_capabilities_follow_builder_bounds() {
        let full = Lifecycle::builder::<Full>()
            .with_default()
            .with_copy()
            .with_eq()
            .build();
        assert!(full.has_default());
        assert!(full.has_copy());
        assert!(full.has_move());
        assert!(full.has_destructor());
        assert!(full.has_eq());
        assert!(!full.is_polymorphic());

        let bare = Lifecycle::of::<NoConstructors>();
        assert!(!bare.has_default());
        assert!(!bare.has_copy());
        assert!(bare.has_move());
        assert!(bare.has_destructor());
        assert_eq!(bare.layout(), Layout::new::<NoConstructors>());
    }

    #[test]
    fn test_missing_capability_returns_sentinel() {
        let bare = Lifecycle::of::<NoConstructors>();
        assert!(bare.construct().is_none());

        let mut value = NoConstructors { value: 3 };
        let src = NonNull::from(&mut value).cast::<u8>();
        unsafe {
            assert!(bare.copy(src).is_none());
            assert!(!bare.construct_in_place(src));
            assert!(!bare.copy_assign(src, src));
            assert!(bare.equals(src, src).is_none());
        }
    }

    #[test]
    fn test_construct_and_copy_are_independent() {
        let table = Lifecycle::builder::<Full>()
            .with_default()
            .with_copy()
            .build();
        let first = table.construct().unwrap();
        unsafe {
            first.cast::<Full>().as_mut().value = 7;
            let second = table.copy(first).unwrap();
            assert_eq!(second.cast::<Full>().as_ref().value, 7);

            second.cast::<Full>().as_mut().value = 9;
            assert_eq!(first.cast::<Full>().as_ref().value, 7);

            assert!(table.destroy(first));
            assert_eq!(second.cast::<Full>().as_ref().value, 9);
            assert!(table.destroy(second));
        }
    }

    #[test]
    fn test_in_place_forms_use_caller_storage() {
        let table = Lifecycle::builder::<Full>()
            .with_default()
            .with_copy()
            .build();
        let layout = table.layout();
        unsafe {
            let storage = NonNull::new(alloc(layout)).unwrap();
            assert!(table.construct_in_place(storage));
            assert_eq!(storage.cast::<Full>().as_ref(), &Full::default());

            let source = Full {
                value: 42,
                name: "copied".to_string(),
            };
            assert!(table.copy_assign(storage, NonNull::from(&source).cast()));
            assert_eq!(storage.cast::<Full>().as_ref(), &source);

            assert!(table.destructor(storage));
            dealloc(storage.as_ptr(), layout);
        }
    }

    #[test]
    fn test_move_transfers_without_double_drop() {
        let tracker = Rc::new(());
        let table = Lifecycle::of::<Rc<()>>();

        let mut slot = std::mem::ManuallyDrop::new(Rc::clone(&tracker));
        let moved = unsafe { table.move_construct(NonNull::from(&mut *slot).cast()) }.unwrap();
        assert_eq!(Rc::strong_count(&tracker), 2);

        unsafe { table.destroy(moved) };
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_equality_slot() {
        let table = Lifecycle::builder::<i32>().with_eq().build();
        let (a, b, c) = (5, 5, 6);
        unsafe {
            assert_eq!(
                table.equals(NonNull::from(&a).cast(), NonNull::from(&b).cast()),
                Some(true)
            );
            assert_eq!(
                table.equals(NonNull::from(&a).cast(), NonNull::from(&c).cast()),
                Some(false)
            );
        }
    }

    #[test]
    fn test_polymorphic_flag() {
        let table = Lifecycle::builder::<Box<dyn Fn()>>().polymorphic().build();
        assert!(table.is_polymorphic());
        assert!(table.capabilities().contains(Capabilities::POLYMORPHIC));
    }
}
