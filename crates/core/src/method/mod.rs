//! Method bindings and overload resolution
//!
//! A [`Method`] wraps one Rust callable together with the registry records
//! of its receiver, arguments and return value. Methods sharing a name on a
//! type form a [`MethodOverloads`] set, which picks the overload to run from
//! the dynamic types of the arguments and the constness of the caller.
//!
//! Resolution is strict: argument types must be identical to the declared
//! parameter types, there is no numeric promotion. A non-const caller may
//! fall back to a const overload, a const caller never reaches a non-const
//! one. A failed resolution returns an empty [`AnyValue`].
//!
//! # Example
//!
//! ```ignore
//! use typemeta_core::{args, type_of, Method};
//!
//! ty.add_method(Method::new("Add", Counter::add));
//! ty.add_method(Method::new_const("Get", Counter::get));
//!
//! let set = type_of::<Counter>().method("Add").unwrap();
//! let result = set.invoke(&mut counter, &args![5i32]);
//! ```

mod callable;

use std::ptr::NonNull;
use std::sync::Arc;

use tracing::trace;

use crate::any::AnyValue;
use crate::error::{ReflectError, ReflectResult};
use crate::registry::{type_of, Reflect, TypeData};

pub use callable::{ConstCallable, InstanceCallable, StaticCallable};

/// How a method receives its object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// `&mut self`
    Mutable,
    /// `&self`
    Const,
    /// No receiver
    Static,
}

type Thunk =
    Box<dyn Fn(Option<NonNull<u8>>, &[AnyValue<'_>]) -> Option<AnyValue<'static>> + Send + Sync>;

fn thunk<F>(f: F) -> Thunk
where
    F: Fn(Option<NonNull<u8>>, &[AnyValue<'_>]) -> Option<AnyValue<'static>>
        + Send
        + Sync
        + 'static,
{
    Box::new(f)
}

/// A single callable bound to a name.
pub struct Method {
    name: String,
    receiver: Receiver,
    receiver_type: Option<&'static TypeData>,
    arguments: Vec<&'static TypeData>,
    return_type: &'static TypeData,
    thunk: Thunk,
}

impl Method {
    /// Bind a callable taking `&mut C`.
    pub fn new<C, M, F>(name: impl Into<String>, f: F) -> Self
    where
        C: Reflect,
        M: 'static,
        F: InstanceCallable<C, M>,
    {
        Self {
            name: name.into(),
            receiver: Receiver::Mutable,
            receiver_type: Some(type_of::<C>()),
            arguments: F::argument_types(),
            return_type: F::return_type(),
            // SAFETY: overload sets only pass writable pointers to `C`
            thunk: thunk(move |object, args| {
                let object = unsafe { object?.cast::<C>().as_mut() };
                InstanceCallable::<C, M>::call(&f, object, args)
            }),
        }
    }

    /// Bind a callable taking `&C`.
    pub fn new_const<C, M, F>(name: impl Into<String>, f: F) -> Self
    where
        C: Reflect,
        M: 'static,
        F: ConstCallable<C, M>,
    {
        Self {
            name: name.into(),
            receiver: Receiver::Const,
            receiver_type: Some(type_of::<C>()),
            arguments: F::argument_types(),
            return_type: F::return_type(),
            // SAFETY: overload sets only pass pointers to live `C` values
            thunk: thunk(move |object, args| {
                let object = unsafe { object?.cast::<C>().as_ref() };
                ConstCallable::<C, M>::call(&f, object, args)
            }),
        }
    }

    /// Bind a callable without a receiver.
    pub fn new_static<M, F>(name: impl Into<String>, f: F) -> Self
    where
        M: 'static,
        F: StaticCallable<M>,
    {
        Self {
            name: name.into(),
            receiver: Receiver::Static,
            receiver_type: None,
            arguments: F::argument_types(),
            return_type: F::return_type(),
            thunk: thunk(move |_, args| StaticCallable::<M>::call(&f, args)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Type of the receiver, `None` for static methods
    pub fn receiver_type(&self) -> Option<&'static TypeData> {
        self.receiver_type
    }

    pub fn is_static(&self) -> bool {
        self.receiver == Receiver::Static
    }

    pub fn is_const(&self) -> bool {
        self.receiver == Receiver::Const
    }

    pub fn argument_types(&self) -> &[&'static TypeData] {
        &self.arguments
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn return_type(&self) -> &'static TypeData {
        self.return_type
    }

    /// Argument count and every argument type match the declaration.
    pub fn accepts(&self, args: &[AnyValue<'_>]) -> bool {
        args.len() == self.arguments.len()
            && args
                .iter()
                .zip(&self.arguments)
                .all(|(arg, declared)| {
                    arg.type_data().is_some_and(|ty| std::ptr::eq(ty, *declared))
                })
    }

    fn same_signature(&self, other: &Method) -> bool {
        self.is_const() == other.is_const()
            && self.arguments.len() == other.arguments.len()
            && self
                .arguments
                .iter()
                .zip(&other.arguments)
                .all(|(a, b)| std::ptr::eq(*a, *b))
    }

    fn invoke(&self, object: Option<NonNull<u8>>, args: &[AnyValue<'_>]) -> AnyValue<'static> {
        (self.thunk)(object, args).unwrap_or_default()
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args: Vec<&str> = self.arguments.iter().map(|ty| ty.name()).collect();
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("arguments", &args)
            .field("return_type", &self.return_type.name())
            .finish()
    }
}

/// All overloads registered under one name on one type.
#[derive(Clone)]
pub struct MethodOverloads {
    name: String,
    owner: &'static TypeData,
    is_static: bool,
    methods: Vec<Arc<Method>>,
}

impl MethodOverloads {
    pub(crate) fn new(name: String, owner: &'static TypeData, is_static: bool) -> Self {
        Self {
            name,
            owner,
            is_static,
            methods: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, method: Method, validate: bool) -> ReflectResult<()> {
        if method.is_static() != self.is_static {
            return Err(ReflectError::MixedStaticness {
                ty: self.owner.name().to_string(),
                method: self.name.clone(),
            });
        }
        if validate && self.methods.iter().any(|m| m.same_signature(&method)) {
            return Err(ReflectError::DuplicateSignature {
                ty: self.owner.name().to_string(),
                method: self.name.clone(),
            });
        }
        self.methods.push(Arc::new(method));
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type the overloads were registered on
    pub fn owner(&self) -> &'static TypeData {
        self.owner
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn overloads(&self) -> &[Arc<Method>] {
        &self.methods
    }

    /// Pick the overload for `args` and the caller's constness.
    pub fn find(&self, args: &[AnyValue<'_>], is_const: bool) -> Option<&Arc<Method>> {
        if let [only] = self.methods.as_slice() {
            let constness_ok = only.is_const() == is_const || (!is_const && only.is_const());
            return (constness_ok && only.accepts(args)).then_some(only);
        }

        let mut exact = None;
        let mut const_fallback = None;
        for method in &self.methods {
            if !method.accepts(args) {
                continue;
            }
            if method.is_const() == is_const {
                exact = Some(method);
            } else if !is_const && method.is_const() && const_fallback.is_none() {
                const_fallback = Some(method);
            }
        }
        exact.or(const_fallback)
    }

    fn resolve(&self, args: &[AnyValue<'_>], is_const: bool) -> Option<&Arc<Method>> {
        let found = self.find(args, is_const);
        if found.is_none() {
            trace!(
                "No overload of {}::{} for {} argument(s), const caller: {}",
                self.owner.name(),
                self.name,
                args.len(),
                is_const
            );
        }
        found
    }

    /// Call an instance overload.
    ///
    /// The caller counts as const if `object` is a const value. Returns an
    /// empty value if no overload matches or the set is static.
    pub fn call(&self, object: &mut AnyValue<'_>, args: &[AnyValue<'_>]) -> AnyValue<'static> {
        if self.is_static {
            return AnyValue::empty();
        }
        let is_const = object.is_const();
        let Some(method) = self.resolve(args, is_const) else {
            return AnyValue::empty();
        };

        let Some(ty) = object.type_data() else {
            return AnyValue::empty();
        };
        let target = if is_const {
            object.as_ptr().and_then(|ptr| ty.project(ptr, self.owner))
        } else {
            object.as_mut_ptr().and_then(|ptr| ty.project_mut(ptr, self.owner))
        };
        match target {
            Some(ptr) => method.invoke(Some(ptr), args),
            None => AnyValue::empty(),
        }
    }

    /// Call an instance overload as a const caller.
    pub fn call_const(&self, object: &AnyValue<'_>, args: &[AnyValue<'_>]) -> AnyValue<'static> {
        if self.is_static {
            return AnyValue::empty();
        }
        let Some(method) = self.resolve(args, true) else {
            return AnyValue::empty();
        };
        let target = object
            .type_data()
            .zip(object.as_ptr())
            .and_then(|(ty, ptr)| ty.project(ptr, self.owner));
        match target {
            Some(ptr) => method.invoke(Some(ptr), args),
            None => AnyValue::empty(),
        }
    }

    /// Call a static overload, empty for instance sets.
    pub fn call_static(&self, args: &[AnyValue<'_>]) -> AnyValue<'static> {
        if !self.is_static {
            return AnyValue::empty();
        }
        match self.resolve(args, false) {
            Some(method) => method.invoke(None, args),
            None => AnyValue::empty(),
        }
    }

    pub fn invoke<C: Reflect>(&self, object: &mut C, args: &[AnyValue<'_>]) -> AnyValue<'static> {
        self.call(&mut AnyValue::from_mut(object), args)
    }

    pub fn invoke_const<C: Reflect>(&self, object: &C, args: &[AnyValue<'_>]) -> AnyValue<'static> {
        self.call_const(&AnyValue::from_ref(object), args)
    }
}

impl std::fmt::Debug for MethodOverloads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodOverloads")
            .field("name", &self.name)
            .field("owner", &self.owner.name())
            .field("is_static", &self.is_static)
            .field("overloads", &self.methods)
            .finish()
    }
}
