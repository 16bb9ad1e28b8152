//! Reflect derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Ident};

use crate::parse::{parse_reflect, AccessorArgs, ReflectArgs, ReflectFieldArgs};

/// Generate the Reflect implementation
pub fn derive_reflect(input: DeriveInput) -> TokenStream {
    match parse_reflect(&input) {
        Ok(args) => generate_impl(args).unwrap_or_else(|e| e.write_errors()),
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: ReflectArgs) -> darling::Result<TokenStream> {
    let struct_name = &args.ident;

    if !args.generics.params.is_empty() {
        return Err(darling::Error::custom(
            "Reflect cannot be derived for generic types, implement it by hand",
        )
        .with_span(&args.generics));
    }

    let fields = match &args.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return Err(
                darling::Error::custom("Reflect can only be derived for structs")
                    .with_span(struct_name),
            )
        }
    };

    let type_name = args.name.clone().unwrap_or_else(|| struct_name.to_string());
    let lifecycle = generate_lifecycle(&args);
    let parent = generate_parent(fields)?;

    let field_properties: Vec<_> = fields
        .iter()
        .filter(|f| !f.skip && !f.parent)
        .map(generate_field_property)
        .collect::<darling::Result<_>>()?;

    let accessor_properties: Vec<_> = args
        .properties
        .iter()
        .map(generate_accessor_property)
        .collect();

    let hook = args.register.as_ref().map(|path| quote! { #path(ty); });

    Ok(quote! {
        impl ::typemeta_core::Reflect for #struct_name {
            const TYPE_NAME: &'static str = #type_name;

            fn lifecycle() -> ::typemeta_core::Lifecycle {
                #lifecycle
            }

            #[allow(unused_variables)]
            fn register(ty: &'static ::typemeta_core::TypeData) {
                #parent
                #(#field_properties)*
                #(#accessor_properties)*
                #hook
            }
        }

        impl ::typemeta_core::TextValue for #struct_name {
            fn write_text(
                &self,
                writer: &mut ::typemeta_core::TextWriter<'_>,
            ) -> ::typemeta_core::ReflectResult<()> {
                writer.write_record(self)
            }

            fn read_text(
                &mut self,
                reader: &mut ::typemeta_core::TextReader,
            ) -> ::typemeta_core::ReflectResult<()> {
                reader.try_read_record(self)
            }
        }
    })
}

fn generate_lifecycle(args: &ReflectArgs) -> TokenStream {
    let default = args.default.then(|| quote! { .with_default() });
    let clone = args.clone.then(|| quote! { .with_copy() });
    let eq = args.eq.then(|| quote! { .with_eq() });
    let polymorphic = args.polymorphic.then(|| quote! { .polymorphic() });

    quote! {
        ::typemeta_core::Lifecycle::builder::<Self>()
            #default
            #clone
            #eq
            #polymorphic
            .build()
    }
}

fn generate_parent(fields: &[ReflectFieldArgs]) -> darling::Result<TokenStream> {
    let mut parents = fields.iter().filter(|f| f.parent);

    let Some(parent) = parents.next() else {
        return Ok(TokenStream::new());
    };
    if let Some(extra) = parents.next() {
        return Err(darling::Error::custom("only one field can be marked `parent`")
            .with_span(&extra.ty));
    }

    let ident = field_ident(parent)?;
    let ty = &parent.ty;
    Ok(quote! {
        ty.set_parent::<Self, #ty, _, _>(
            |this: &Self| &this.#ident,
            |this: &mut Self| &mut this.#ident,
        );
    })
}

fn generate_field_property(field: &ReflectFieldArgs) -> darling::Result<TokenStream> {
    let ident = field_ident(field)?;
    let name = field.property_name();
    let serialized = field.serialize.then(|| quote! { .serialized() });

    let property = if field.readonly {
        quote! {
            ::typemeta_core::Property::readonly_member(#name, |this: &Self| &this.#ident)
        }
    } else {
        quote! {
            ::typemeta_core::Property::member(
                #name,
                |this: &Self| &this.#ident,
                |this: &mut Self| &mut this.#ident,
            )
        }
    };

    Ok(quote! {
        ty.add_property(#property #serialized);
    })
}

fn generate_accessor_property(accessor: &AccessorArgs) -> TokenStream {
    let name = &accessor.name;
    let get = &accessor.get;
    let serialized = accessor.serialize.then(|| quote! { .serialized() });

    let property = match &accessor.set {
        Some(set) => quote! { ::typemeta_core::Property::accessor(#name, #get, #set) },
        None => quote! { ::typemeta_core::Property::getter(#name, #get) },
    };

    quote! {
        ty.add_property(#property #serialized);
    }
}

fn field_ident(field: &ReflectFieldArgs) -> darling::Result<&Ident> {
    field
        .ident
        .as_ref()
        .ok_or_else(|| darling::Error::custom("Reflect fields must be named").with_span(&field.ty))
}
