//! Arity adapters turning Rust callables into erased method thunks
//!
//! Each trait is implemented for closures and function items of up to six
//! arguments. The `Marker` parameter is the callable's signature as a
//! function pointer type and only serves to keep the impls apart.
//!
//! Arguments must be registered types and are cloned out of the caller's
//! [`AnyValue`]s. A call with the wrong number or types of arguments
//! yields `None`.

use crate::any::AnyValue;
use crate::registry::{type_of, Reflect, TypeData};

/// Callable with a `&mut C` receiver
pub trait InstanceCallable<C, Marker>: Send + Sync + 'static {
    fn argument_types() -> Vec<&'static TypeData>;
    fn return_type() -> &'static TypeData;
    fn call(&self, object: &mut C, args: &[AnyValue<'_>]) -> Option<AnyValue<'static>>;
}

/// Callable with a `&C` receiver
pub trait ConstCallable<C, Marker>: Send + Sync + 'static {
    fn argument_types() -> Vec<&'static TypeData>;
    fn return_type() -> &'static TypeData;
    fn call(&self, object: &C, args: &[AnyValue<'_>]) -> Option<AnyValue<'static>>;
}

/// Callable without a receiver
pub trait StaticCallable<Marker>: Send + Sync + 'static {
    fn argument_types() -> Vec<&'static TypeData>;
    fn return_type() -> &'static TypeData;
    fn call(&self, args: &[AnyValue<'_>]) -> Option<AnyValue<'static>>;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_callables {
    ($($arg:ident : $idx:tt),*) => {
        impl<C, R, F, $($arg,)*> InstanceCallable<C, fn($($arg),*) -> R> for F
        where
            C: Reflect,
            R: Reflect,
            F: Fn(&mut C, $($arg),*) -> R + Send + Sync + 'static,
            $($arg: Reflect + Clone,)*
        {
            fn argument_types() -> Vec<&'static TypeData> {
                vec![$(type_of::<$arg>()),*]
            }

            fn return_type() -> &'static TypeData {
                type_of::<R>()
            }

            fn call(&self, object: &mut C, args: &[AnyValue<'_>]) -> Option<AnyValue<'static>> {
                if args.len() != count!($($arg)*) {
                    return None;
                }
                Some(AnyValue::new((self)(object, $(args[$idx].get::<$arg>()?.clone()),*)))
            }
        }

        impl<C, R, F, $($arg,)*> ConstCallable<C, fn($($arg),*) -> R> for F
        where
            C: Reflect,
            R: Reflect,
            F: Fn(&C, $($arg),*) -> R + Send + Sync + 'static,
            $($arg: Reflect + Clone,)*
        {
            fn argument_types() -> Vec<&'static TypeData> {
                vec![$(type_of::<$arg>()),*]
            }

            fn return_type() -> &'static TypeData {
                type_of::<R>()
            }

            fn call(&self, object: &C, args: &[AnyValue<'_>]) -> Option<AnyValue<'static>> {
                if args.len() != count!($($arg)*) {
                    return None;
                }
                Some(AnyValue::new((self)(object, $(args[$idx].get::<$arg>()?.clone()),*)))
            }
        }

        impl<R, F, $($arg,)*> StaticCallable<fn($($arg),*) -> R> for F
        where
            R: Reflect,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: Reflect + Clone,)*
        {
            fn argument_types() -> Vec<&'static TypeData> {
                vec![$(type_of::<$arg>()),*]
            }

            fn return_type() -> &'static TypeData {
                type_of::<R>()
            }

            fn call(&self, args: &[AnyValue<'_>]) -> Option<AnyValue<'static>> {
                if args.len() != count!($($arg)*) {
                    return None;
                }
                Some(AnyValue::new((self)($(args[$idx].get::<$arg>()?.clone()),*)))
            }
        }
    };
}

impl_callables!();
impl_callables!(A0: 0);
impl_callables!(A0: 0, A1: 1);
impl_callables!(A0: 0, A1: 1, A2: 2);
impl_callables!(A0: 0, A1: 1, A2: 2, A3: 3);
impl_callables!(A0: 0, A1: 1, A2: 2, A3: 3, A4: 4);
impl_callables!(A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5);
