use proc_macro::TokenStream;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::Token;
use syn::{parse_macro_input, ItemImpl, ItemTrait, Meta};

mod contract;
mod signature;
mod subject;

/// Declare a contract: a named set of operations a subject type must provide.
///
/// Usage:
/// ```ignore
/// #[contract]
/// pub trait Iterator {
///     const ITEM: &'static str = "u32";
///     fn next(&mut self) -> Option<u32>;
/// }
/// ```
///
/// The trait itself is not emitted. In its place the macro generates the
/// marker `Iterator` (implementing `conform::Contract`), `IteratorBinding<S>`,
/// `IteratorBindingBuilder<S>`, `IteratorVTable` and `IteratorHandle<'h>`.
/// `const` items become associated constants on the marker and never binding
/// fields. Pass `bindings_only` to skip the erased handle.
#[proc_macro_attribute]
pub fn contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    let metas = match Punctuated::<Meta, Token![,]>::parse_terminated.parse(attr) {
        Ok(metas) => metas,
        Err(err) => return err.to_compile_error().into(),
    };
    let input = parse_macro_input!(item as ItemTrait);
    contract::ContractOptions::from_metas(metas)
        .and_then(|options| contract::expand(options, input))
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Publish the non-generic `pub` methods of an inherent impl block as the
/// type's intrinsic members, so contract bindings can infer their defaults.
///
/// Usage:
/// ```ignore
/// #[subject]
/// impl SliceIter {
///     pub fn next(&mut self) -> Option<u32> { .. }
/// }
/// ```
///
/// Only one `#[subject]` block is allowed per type.
#[proc_macro_attribute]
pub fn subject(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[subject] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let input = parse_macro_input!(item as ItemImpl);
    subject::expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
