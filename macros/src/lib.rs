//! Procedural macros for the ctrlcheck controller test harness.
//!
//! - `#[derive(Object)]`: Implements `ctrlcheck::Object` for your type, preserving generics
//!   and bounds. The object metadata is read from a field named `metadata`, or from the
//!   field tagged with `#[object(meta)]`. Types without such a field get the default
//!   implementation, which exposes no metadata (filters then treat them as unnamed).
//!
//! Usage:
//! ```rust,ignore
//! use ctrlcheck::{Object, ObjectMeta};
//!
//! #[derive(Debug, Object)]
//! struct Widget {
//!     metadata: ObjectMeta,
//!     replicas: u32,
//! }
//!
//! #[derive(Debug, Object)]
//! struct Gadget {
//!     #[object(meta)]
//!     meta: ObjectMeta,
//! }
//! ```
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(Object, attributes(object))]
pub fn derive_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = input.ident.clone();
    let generics = input.generics.clone();

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let meta_field = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let tagged = fields
                    .named
                    .iter()
                    .find(|field| field.attrs.iter().any(is_meta_attr));
                tagged
                    .or_else(|| {
                        fields
                            .named
                            .iter()
                            .find(|field| field.ident.as_ref().is_some_and(|i| i == "metadata"))
                    })
                    .and_then(|field| field.ident.clone())
            }
            _ => None,
        },
        // Enums and unions expose no metadata
        _ => None,
    };

    let meta_impl = match meta_field {
        Some(field) => quote! {
            fn meta(&self) -> ::std::option::Option<&ctrlcheck::ObjectMeta> {
                ::std::option::Option::Some(&self.#field)
            }
        },
        None => quote! {},
    };

    let expanded = quote! {
        impl #impl_generics ctrlcheck::Object for #ident #ty_generics #where_clause {
            #meta_impl
        }
    };
    TokenStream::from(expanded)
}

fn is_meta_attr(attr: &syn::Attribute) -> bool {
    if !attr.path().is_ident("object") {
        return false;
    }
    let mut found = false;
    let _ = attr.parse_nested_meta(|nested| {
        if nested.path.is_ident("meta") {
            found = true;
        }
        Ok(())
    });
    found
}
