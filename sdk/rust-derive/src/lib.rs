//! Proc macros for the SpaceSync SDK.
//!
//! Provides `#[derive(TableRow)]` and `#[derive(ReducerArgs)]`, which map
//! the fields of a product value positionally onto the fields of a struct.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

// ─── TableRow ─────────────────────────────────────────────────────────────────

/// Derive macro that implements `TableRow` for a struct.
///
/// Fields must appear in the same order as the table's columns, and each
/// field type must implement `FromValue`.
///
/// # Attributes
///
/// - `#[spacesync(table = "name")]` binds the struct to a table. Required.
///
/// # Example
///
/// ```ignore
/// #[derive(TableRow)]
/// #[spacesync(table = "message")]
/// pub struct Message {
///     pub sender: Identity,
///     pub sent: Timestamp,
///     pub text: String,
/// }
/// ```
#[proc_macro_derive(TableRow, attributes(spacesync))]
pub fn derive_table_row(input: TokenStream) -> TokenStream {
  let input = parse_macro_input!(input as DeriveInput);
  expand_table_row(&input)
    .unwrap_or_else(syn::Error::into_compile_error)
    .into()
}

fn expand_table_row(input: &DeriveInput) -> syn::Result<TokenStream2> {
  let name = &input.ident;
  let table = attribute_value(input, "table", "TableRow requires #[spacesync(table = \"name\")]")?;
  let from_fields = from_fields(input, quote!(row))?;
  let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

  Ok(quote! {
      impl #impl_generics ::spacesync_sdk::row::TableRow for #name #ty_generics #where_clause {
          const TABLE_NAME: &'static str = #table;

          fn from_row(
              row: &::spacesync_sdk::algebraic::ProductValue,
          ) -> ::spacesync_sdk::Result<Self> {
              ::std::result::Result::Ok(#from_fields)
          }
      }
  })
}

// ─── ReducerArgs ──────────────────────────────────────────────────────────────

/// Derive macro that implements `ReducerArgs` for a struct whose fields are
/// a reducer's parameters, in order.
///
/// # Attributes
///
/// - `#[spacesync(reducer = "name")]` binds the struct to a reducer. Required.
#[proc_macro_derive(ReducerArgs, attributes(spacesync))]
pub fn derive_reducer_args(input: TokenStream) -> TokenStream {
  let input = parse_macro_input!(input as DeriveInput);
  expand_reducer_args(&input)
    .unwrap_or_else(syn::Error::into_compile_error)
    .into()
}

fn expand_reducer_args(input: &DeriveInput) -> syn::Result<TokenStream2> {
  let name = &input.ident;
  let reducer = attribute_value(input, "reducer", "ReducerArgs requires #[spacesync(reducer = \"name\")]")?;
  let from_fields = from_fields(input, quote!(args))?;
  let idents = field_idents(input)?;
  let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

  Ok(quote! {
      impl #impl_generics ::spacesync_sdk::row::ReducerArgs for #name #ty_generics #where_clause {
          const REDUCER_NAME: &'static str = #reducer;

          fn to_args(&self) -> ::spacesync_sdk::algebraic::ProductValue {
              let elements: ::std::vec::Vec<::spacesync_sdk::algebraic::AlgebraicValue> = ::std::vec![
                  #( ::spacesync_sdk::algebraic::IntoValue::into_value(&self.#idents), )*
              ];
              ::spacesync_sdk::algebraic::ProductValue::new(elements)
          }

          fn from_args(
              args: &::spacesync_sdk::algebraic::ProductValue,
          ) -> ::spacesync_sdk::Result<Self> {
              ::std::result::Result::Ok(#from_fields)
          }
      }
  })
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Read `key = "..."` from the `#[spacesync(...)]` attributes.
fn attribute_value(input: &DeriveInput, key: &str, missing: &str) -> syn::Result<String> {
  let mut value = None;
  for attr in &input.attrs {
    if attr.path().is_ident("spacesync") {
      attr.parse_nested_meta(|meta| {
        if meta.path.is_ident(key) {
          let lit: syn::LitStr = meta.value()?.parse()?;
          value = Some(lit.value());
          Ok(())
        } else {
          // Keys meant for the other derive on the same struct.
          let _ = meta.value().and_then(|v| v.parse::<syn::LitStr>());
          Ok(())
        }
      })?;
    }
  }
  match value {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(syn::Error::new_spanned(&input.ident, missing)),
  }
}

fn field_idents(input: &DeriveInput) -> syn::Result<Vec<syn::Ident>> {
  match &input.data {
    Data::Struct(data) => match &data.fields {
      Fields::Named(fields) => Ok(fields.named.iter().filter_map(|f| f.ident.clone()).collect()),
      Fields::Unit => Ok(Vec::new()),
      Fields::Unnamed(_) => Err(syn::Error::new_spanned(
        &input.ident,
        "tuple structs are not supported, use named fields",
      )),
    },
    _ => Err(syn::Error::new_spanned(&input.ident, "only structs can be derived")),
  }
}

/// `Self { a: FromValue::from_value(src.field(0)?)?, ... }`
fn from_fields(input: &DeriveInput, source: TokenStream2) -> syn::Result<TokenStream2> {
  let Data::Struct(data) = &input.data else {
    return Err(syn::Error::new_spanned(&input.ident, "only structs can be derived"));
  };
  if let Fields::Unit = data.fields {
    return Ok(quote!({
        let _ = #source;
        Self
    }));
  }
  field_idents(input)?;

  let fields = data.fields.iter().enumerate().map(|(index, field)| {
    let ident = &field.ident;
    let ty = &field.ty;
    quote! {
        #ident: <#ty as ::spacesync_sdk::algebraic::FromValue>::from_value(#source.field(#index)?)?
    }
  });
  Ok(quote!(Self { #( #fields, )* }))
}
