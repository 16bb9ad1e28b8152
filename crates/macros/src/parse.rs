//! Attribute parsing for the Reflect derive macro

use darling::{FromDeriveInput, FromField, FromMeta};
use syn::{DeriveInput, Ident, Path, Type};

/// Parsed #[reflect(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(reflect), supports(struct_named))]
pub struct ReflectArgs {
    /// Struct identifier
    pub ident: Ident,

    pub generics: syn::Generics,

    /// Struct fields
    pub data: darling::ast::Data<(), ReflectFieldArgs>,

    /// Registered type name (defaults to the struct name)
    pub name: Option<String>,

    /// Capability flags, each requiring the matching std trait
    #[darling(default)]
    pub default: bool,
    #[darling(default)]
    pub clone: bool,
    #[darling(default)]
    pub eq: bool,
    #[darling(default)]
    pub polymorphic: bool,

    /// Function called with the type record after the fields are bound
    pub register: Option<Path>,

    /// Accessor-backed properties
    #[darling(multiple, rename = "property")]
    pub properties: Vec<AccessorArgs>,
}

/// `property(name = "...", get = "...", set = "...", serialize)`
#[derive(Debug, FromMeta)]
pub struct AccessorArgs {
    pub name: String,

    pub get: Path,

    /// Without a setter the property is get-only
    pub set: Option<Path>,

    #[darling(default)]
    pub serialize: bool,
}

/// Parsed #[reflect(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(reflect))]
pub struct ReflectFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// Property name (defaults to the field name)
    pub rename: Option<String>,

    /// Not bound as a property
    #[darling(default)]
    pub skip: bool,

    /// Written by the text serializer
    #[darling(default)]
    pub serialize: bool,

    /// Bound without write access
    #[darling(default)]
    pub readonly: bool,

    /// Embedded parent type
    #[darling(default)]
    pub parent: bool,
}

impl ReflectFieldArgs {
    /// Name the property is registered under
    pub fn property_name(&self) -> String {
        match (&self.rename, &self.ident) {
            (Some(name), _) => name.clone(),
            (None, Some(ident)) => ident.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Parse a DeriveInput into ReflectArgs
pub fn parse_reflect(input: &DeriveInput) -> darling::Result<ReflectArgs> {
    ReflectArgs::from_derive_input(input)
}
