//! # eki Derive Macros
//!
//! `#[derive(Model)]` implements `eki::Model` for a struct with named fields,
//! so the struct can be declared with `MetadataStore::declare`.
//!
//! Field types map as follows:
//!
//! - `String` is a string field.
//! - Integer types are int fields; `f32` and `f64` are number fields.
//! - `bool` is a bool field.
//! - chrono's `DateTime`, `NaiveDate` and `NaiveDateTime` are date fields.
//! - `Vec<T>` is an array of `T`.
//! - `Option<T>` is `T`, not required.  Every other field is required.
//! - Any other type is a nested model and must implement `eki::Model` itself.
//!
//! ```rust,ignore
//! use eki::{MetadataStore, Model};
//!
//! #[derive(Model)]
//! struct Address {
//!     street: String,
//!     zip: Option<String>,
//! }
//!
//! #[derive(Model)]
//! #[model(name = "Customer")]
//! struct CustomerForm {
//!     #[field(label = "Full name")]
//!     name: String,
//!     #[field(key = "years", source = "query")]
//!     age: Option<u32>,
//!     address: Address,
//! }
//!
//! let store = MetadataStore::new();
//! let class = store.declare::<CustomerForm>().unwrap();
//! assert_eq!(class.name(), "Customer");
//! assert!(store.is_model(&"Address".into()));
//! ```
//!
//! Struct attributes:
//!
//! - `#[model(name = "...")]` overrides the class name (default: the struct name).
//! - `#[model(extends = "Path")]` inherits from another derived model.
//!
//! Field attributes:
//!
//! - `#[field(name = "...")]` renames the property (default: the Rust field name).
//! - `#[field(key = "...")]` reads the value under another request key.
//! - `#[field(source = "query" | "params" | "body")]` reads only that bucket.
//! - `#[field(label = "...")]` overrides the label used in error messages.

#![recursion_limit = "128"]

extern crate proc_macro;
#[macro_use]
extern crate quote;
extern crate syn;

use proc_macro2::TokenStream;
use syn::spanned::Spanned;
use syn::{DeriveInput, parse_macro_input};

use derive_util::StructVisitor;

/// Derive the Model trait for structs with named fields.
#[proc_macro_derive(Model, attributes(model, field))]
pub fn derive_model(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ty_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let options = ModelOptions::parse(&input.attrs)?;
    let ds = match &input.data {
        syn::Data::Struct(ds) => ds,
        _ => {
            return Err(syn::Error::new(
                ty_name.span(),
                "Model can only be derived for structs",
            ));
        }
    };
    if !matches!(ds.fields, syn::Fields::Named(_)) {
        return Err(syn::Error::new(
            ty_name.span(),
            "Model can only be derived for structs with named fields",
        ));
    }
    let mut visitor = ModelStructVisitor;
    let ModelFields {
        descriptors,
        mut dependencies,
    } = visitor.visit_struct(ty_name, ds)?;

    let class = options.name.unwrap_or_else(|| ty_name.to_string());
    let parent_key = match &options.extends {
        Some(parent) => {
            dependencies.insert(0, syn::parse_quote!(#parent));
            quote! { Some(<#parent as eki::Model>::class_key()) }
        }
        None => quote! { None },
    };
    dependencies.retain(|ty| !is_self(ty, ty_name));

    Ok(quote! {
        impl #impl_generics eki::Model for #ty_name #ty_generics #where_clause {
            fn class_key() -> eki::ClassKey {
                eki::ClassKey::new(#class)
            }

            fn parent_key() -> Option<eki::ClassKey> {
                #parent_key
            }

            fn fields() -> Vec<eki::FieldDescriptor> {
                vec![#(#descriptors),*]
            }

            #[allow(unused_variables)]
            fn declare_dependencies(declarer: &mut eki::Declarer<'_>) -> Result<(), eki::DeclarationError> {
                #(declarer.declare::<#dependencies>()?;)*
                Ok(())
            }
        }
    })
}

/////////////////////////////////////////////// attributes ///////////////////////////////////////////////

#[derive(Default)]
struct ModelOptions {
    name: Option<String>,
    extends: Option<syn::Path>,
}

impl ModelOptions {
    fn parse(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for (key, value) in name_values(attrs, "model")? {
            match key.as_str() {
                "name" => options.name = Some(value.value()),
                "extends" => options.extends = Some(value.parse()?),
                _ => return Err(syn::Error::new(value.span(), format!("unknown model attribute {key}"))),
            }
        }
        Ok(options)
    }
}

#[derive(Default)]
struct FieldOptions {
    name: Option<String>,
    key: Option<String>,
    source: Option<TokenStream>,
    label: Option<String>,
}

impl FieldOptions {
    fn parse(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for (key, value) in name_values(attrs, "field")? {
            match key.as_str() {
                "name" => options.name = Some(value.value()),
                "key" => options.key = Some(value.value()),
                "label" => options.label = Some(value.value()),
                "source" => {
                    let source = match value.value().as_str() {
                        "query" => quote! { eki::Source::Query },
                        "params" => quote! { eki::Source::Params },
                        "body" => quote! { eki::Source::Body },
                        other => {
                            return Err(syn::Error::new(
                                value.span(),
                                format!("unknown source {other}; expected query, params or body"),
                            ));
                        }
                    };
                    options.source = Some(source);
                }
                _ => return Err(syn::Error::new(value.span(), format!("unknown field attribute {key}"))),
            }
        }
        Ok(options)
    }
}

/// Every `key = "value"` pair inside `#[ident(...)]` attributes.
fn name_values(attrs: &[syn::Attribute], ident: &str) -> syn::Result<Vec<(String, syn::LitStr)>> {
    let mut pairs = Vec::new();
    for attr in attrs.iter().filter(|a| a.path.is_ident(ident)) {
        let syn::Meta::List(list) = attr.parse_meta()? else {
            return Err(syn::Error::new(attr.span(), format!("expected #[{ident}(key = \"value\")]")));
        };
        for nested in list.nested.iter() {
            match nested {
                syn::NestedMeta::Meta(syn::Meta::NameValue(nv)) => {
                    let Some(key) = nv.path.get_ident() else {
                        return Err(syn::Error::new(nv.path.span(), "expected an identifier"));
                    };
                    let syn::Lit::Str(value) = &nv.lit else {
                        return Err(syn::Error::new(nv.lit.span(), "expected a string literal"));
                    };
                    pairs.push((key.to_string(), value.clone()));
                }
                other => {
                    return Err(syn::Error::new(other.span(), format!("expected #[{ident}(key = \"value\")]")));
                }
            }
        }
    }
    Ok(pairs)
}

////////////////////////////////////////////// ModelStructVisitor ////////////////////////////////////////////

struct ModelFields {
    descriptors: Vec<TokenStream>,
    dependencies: Vec<syn::Type>,
}

struct ModelStructVisitor;

impl StructVisitor for ModelStructVisitor {
    type Output = syn::Result<ModelFields>;

    fn visit_struct_named_fields(
        &mut self,
        _ty_name: &syn::Ident,
        _ds: &syn::DataStruct,
        fields: &syn::FieldsNamed,
    ) -> Self::Output {
        let mut descriptors = Vec::new();
        let mut dependencies = Vec::new();
        for field in fields.named.iter() {
            let Some(field_ident) = &field.ident else {
                continue;
            };
            let field_ident = field_ident.to_string();
            let field_ident = if let Some(field_ident) = field_ident.strip_prefix("r#") {
                field_ident.to_string()
            } else {
                field_ident.clone()
            };
            let options = FieldOptions::parse(&field.attrs)?;
            let field_ident = options.name.unwrap_or(field_ident);
            let (ty, required) = match option_inner(&field.ty) {
                Some(inner) => (inner, false),
                None => (&field.ty, true),
            };
            let field_type = field_type(ty, &mut dependencies)?;
            let mut descriptor = quote! { eki::FieldDescriptor::new(#field_ident, #field_type) };
            if required {
                descriptor = quote! { #descriptor.required() };
            }
            if let Some(label) = options.label {
                descriptor = quote! { #descriptor.label(#label) };
            }
            if let Some(key) = options.key {
                descriptor = quote! { #descriptor.key(#key) };
            }
            if let Some(source) = options.source {
                descriptor = quote! { #descriptor.source(#source) };
            }
            descriptors.push(descriptor);
        }
        Ok(ModelFields {
            descriptors,
            dependencies,
        })
    }
}

////////////////////////////////////////////////// types ///////////////////////////////////////////////////

fn last_segment(ty: &syn::Type) -> Option<&syn::PathSegment> {
    match ty {
        syn::Type::Path(tp) if tp.qself.is_none() => tp.path.segments.last(),
        _ => None,
    }
}

fn first_type_argument(segment: &syn::PathSegment) -> Option<&syn::Type> {
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let segment = last_segment(ty)?;
    if segment.ident != "Option" {
        return None;
    }
    first_type_argument(segment)
}

fn is_self(ty: &syn::Type, ty_name: &syn::Ident) -> bool {
    match last_segment(ty) {
        Some(segment) => segment.ident == "Self" || segment.ident == *ty_name,
        None => false,
    }
}

fn field_type(ty: &syn::Type, dependencies: &mut Vec<syn::Type>) -> syn::Result<TokenStream> {
    let Some(segment) = last_segment(ty) else {
        return Err(syn::Error::new(ty.span(), "unsupported field type"));
    };
    let name = segment.ident.to_string();
    let tokens = match name.as_str() {
        "String" => quote! { eki::FieldType::String },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { eki::FieldType::Int }
        }
        "f32" | "f64" => quote! { eki::FieldType::Number },
        "bool" => quote! { eki::FieldType::Bool },
        "DateTime" | "NaiveDate" | "NaiveDateTime" => quote! { eki::FieldType::Date },
        "Vec" | "Box" | "Option" => {
            let Some(inner) = first_type_argument(segment) else {
                return Err(syn::Error::new(ty.span(), format!("{name} needs a type argument")));
            };
            if name == "Option" {
                return Err(syn::Error::new(ty.span(), "Option is only supported as the outermost type"));
            }
            let inner = field_type(inner, dependencies)?;
            if name == "Vec" {
                quote! { eki::FieldType::array_of(#inner) }
            } else {
                inner
            }
        }
        _ => {
            dependencies.push(ty.clone());
            quote! { eki::FieldType::Model(<#ty as eki::Model>::class_key()) }
        }
    };
    Ok(tokens)
}
