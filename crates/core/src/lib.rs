//! typemeta - runtime type reflection
//!
//! This crate describes Rust types at runtime: their names, how to build,
//! copy, compare and destroy them, their properties and their methods. On
//! top of that it offers:
//!
//! - [`AnyValue`] - a type-erased value that either owns its payload or
//!   borrows someone else's
//! - [`TypeData`] - the per-type record, looked up with [`type_of`] or
//!   [`find_type`]
//! - [`Property`] and [`MethodOverloads`] - name-based access to fields and
//!   overloaded methods
//! - [`TextWriter`] and [`TextReader`] - an indented text format for
//!   registered types
//!
//! # Example
//!
//! ```ignore
//! use typemeta_core::{args, type_of, AnyValue, Reflect};
//!
//! #[derive(Default, Clone, PartialEq, Reflect)]
//! #[reflect(default, clone, eq, register = "Counter::methods")]
//! struct Counter {
//!     #[reflect(serialize)]
//!     count: i32,
//! }
//!
//! impl Counter {
//!     fn methods(ty: &'static typemeta_core::TypeData) {
//!         ty.add_method(typemeta_core::Method::new("Add", |c: &mut Counter, n: i32| {
//!             c.count += n;
//!             c.count
//!         }));
//!     }
//! }
//!
//! let ty = type_of::<Counter>();
//! let mut counter = ty.construct();
//! let result = ty.method("Add").unwrap().call(&mut counter, &args![5]);
//! assert_eq!(result.get::<i32>(), Some(&5));
//! ```

// Allow the crate to refer to itself as `typemeta_core` for proc macro compatibility
extern crate self as typemeta_core;

pub mod any;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod method;
pub mod property;
pub mod registry;
pub mod serial;

pub use any::AnyValue;
pub use config::{ConfigError, ConfigResult, ReflectConfig};
pub use error::{ReflectError, ReflectResult};
pub use lifecycle::{Capabilities, Lifecycle, LifecycleBuilder};
pub use method::{Method, MethodOverloads, Receiver};
pub use property::{FieldValue, Property, PropertyKind};
pub use registry::{
    find_type, register, registered_type_count, registered_type_names, type_of, Reflect, TypeData,
};
pub use serial::{from_text, to_text, try_from_text, TextReader, TextValue, TextWriter};

// Re-export the derive macro
pub use typemeta_macros::Reflect;
