//! typemeta Proc Macros
//!
//! This crate provides `#[derive(Reflect)]`, which registers a struct with
//! the typemeta runtime: its name, capabilities, parent, properties and a
//! hook for methods. Use it through the `typemeta_core` re-export.
//!
//! # Example
//!
//! ```ignore
//! use typemeta_core::Reflect;
//!
//! #[derive(Default, Clone, PartialEq, Reflect)]
//! #[reflect(name = "Player", default, clone, eq, register = "Player::methods")]
//! #[reflect(property(name = "Alive", get = "Player::alive"))]
//! pub struct Player {
//!     #[reflect(parent)]
//!     entity: Entity,
//!
//!     #[reflect(serialize)]
//!     health: i32,
//!
//!     #[reflect(rename = "m_szName", serialize)]
//!     name: String,
//!
//!     #[reflect(skip)]
//!     cache: Vec<u8>,
//! }
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes
//!
//! - `#[reflect(name = "Name")]` - Registered name. Defaults to the struct name.
//! - `#[reflect(default)]` - Default constructor capability (`T: Default`).
//! - `#[reflect(clone)]` - Copy capability (`T: Clone`).
//! - `#[reflect(eq)]` - Equality capability (`T: PartialEq`).
//! - `#[reflect(polymorphic)]` - Mark the type as polymorphic.
//! - `#[reflect(register = "path")]` - Call `path(ty)` at the end of registration,
//!   typically to add methods.
//! - `#[reflect(property(name = "..", get = "..", set = "..", serialize))]` - Accessor
//!   property. Without `set` it is get-only. Repeatable.
//!
//! ## Field Attributes
//!
//! - `#[reflect(rename = "name")]` - Property name. Defaults to the field name.
//! - `#[reflect(serialize)]` - Include in text records.
//! - `#[reflect(readonly)]` - Bind without write access.
//! - `#[reflect(skip)]` - Do not bind.
//! - `#[reflect(parent)]` - The field embeds the parent type. At most one.
//!
//! Every bound field type must itself implement `Reflect`, `Clone`,
//! `PartialEq` and `TextValue`.

mod parse;
mod reflect;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for type registration
///
/// Generates a `Reflect` implementation whose `register` binds every field
/// that is not skipped, and a `TextValue` implementation so the type can
/// nest inside other text records.
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect::derive_reflect(input).into()
}
