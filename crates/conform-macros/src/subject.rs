use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    parse_quote, FnArg, GenericParam, ImplItem, ImplItemFn, ItemImpl, LitStr, ReturnType,
    Signature, Type, Visibility,
};

use crate::signature;

struct Member {
    name: LitStr,
    ident: syn::Ident,
    /// The member's shape, or why it has none.
    shape: Result<TokenStream, &'static str>,
}

/// The function-pointer shape of a method, or why the method has no single
/// shape.
fn member_shape(sig: &Signature) -> Result<TokenStream, &'static str> {
    if sig.asyncness.is_some() {
        return Err("async");
    }
    if sig.variadic.is_some() {
        return Err("variadic");
    }
    if sig.generics.where_clause.is_some() {
        return Err("where clause");
    }
    let mut lifetimes = Vec::new();
    for param in &sig.generics.params {
        match param {
            GenericParam::Lifetime(lp) if lp.bounds.is_empty() => {
                lifetimes.push(lp.lifetime.clone())
            }
            _ => return Err("generic"),
        }
    }

    let mut inputs = Vec::new();
    for arg in &sig.inputs {
        let ty = match arg {
            FnArg::Receiver(receiver) => (*receiver.ty).clone(),
            FnArg::Typed(pat_type) => (*pat_type.ty).clone(),
        };
        if signature::contains_impl_trait(&ty) {
            return Err("impl Trait");
        }
        inputs.push(ty);
    }
    let mut output = sig.output.clone();
    if let ReturnType::Type(_, ty) = &output {
        if signature::contains_impl_trait(ty) {
            return Err("impl Trait");
        }
    }
    let receiver = inputs.first_mut().filter(|_| sig.receiver().is_some());
    if let Some(Type::Reference(receiver)) = receiver {
        if let Some((lifetime, tied)) =
            signature::tie_output_to_receiver(receiver.lifetime.as_ref(), &output)
        {
            if receiver.lifetime.as_ref() != Some(&lifetime) {
                receiver.lifetime = Some(lifetime.clone());
                lifetimes.push(lifetime);
            }
            output = tied;
        }
    }
    let used = signature::lifetimes_in(inputs.iter());
    if lifetimes.iter().any(|lifetime| !used.contains(lifetime)) {
        return Err("unconstrained lifetime");
    }

    let binder = if lifetimes.is_empty() {
        quote!()
    } else {
        quote!(for<#(#lifetimes),*>)
    };
    let unsafety = &sig.unsafety;
    let abi = &sig.abi;
    Ok(quote!(#binder #unsafety #abi fn(#(#inputs),*) #output))
}

fn member(method: &ImplItemFn) -> Member {
    let ident = method.sig.ident.clone();
    let name = LitStr::new(&ident.unraw().to_string(), ident.span());
    let shape = match method.vis {
        Visibility::Inherited => Err("private"),
        _ => member_shape(&method.sig),
    };
    Member { name, ident, shape }
}

pub(crate) fn expand(item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[subject] belongs on an inherent impl block; trait methods are not intrinsic members",
        ));
    }
    let mut generics = item.generics.clone();
    for param in &item.generics.params {
        match param {
            GenericParam::Lifetime(lp) => {
                return Err(syn::Error::new_spanned(
                    lp,
                    "subjects must be 'static; borrowed subject types are not supported",
                ))
            }
            GenericParam::Type(tp) => {
                let ident = &tp.ident;
                generics
                    .make_where_clause()
                    .predicates
                    .push(parse_quote!(#ident: 'static));
            }
            GenericParam::Const(_) => {}
        }
    }
    let (impl_generics, _, where_clause) = generics.split_for_impl();
    let self_ty: &Type = &item.self_ty;

    let members: Vec<Member> = item
        .items
        .iter()
        .filter_map(|impl_item| match impl_item {
            ImplItem::Fn(method) => Some(member(method)),
            _ => None,
        })
        .collect();
    let mut names = Vec::new();
    let mut bindings = Vec::new();
    for Member { name, ident, shape } in &members {
        match shape {
            Ok(shape) => {
                names.push(name);
                bindings.push(quote!(#name => slot.offer::<#shape>(Self::#ident),));
            }
            // Same name, no single shape: the name can never match.
            Err(reason) => {
                let found = LitStr::new(&format!("<no single shape: {reason}>"), name.span());
                bindings.push(quote!(#name => ::conform::Lookup::Mismatch { found: #found },));
            }
        }
    }

    Ok(quote! {
        #item

        impl #impl_generics ::conform::Subject for #self_ty #where_clause {
            const MEMBERS: &'static [&'static str] = &[#(#names),*];

            #[allow(unused_variables)]
            fn bind_member(
                name: &str,
                slot: &mut ::conform::MemberSlot<'_>,
            ) -> ::conform::Lookup {
                match name {
                    #(#bindings)*
                    _ => ::conform::Lookup::Absent,
                }
            }
        }

        impl #impl_generics ::conform::Normalize for #self_ty #where_clause {
            type Canonical = Self;
        }

        impl #impl_generics ::conform::Referent for #self_ty #where_clause {}

        impl #impl_generics ::conform::Reflect for #self_ty #where_clause {
            fn shape() -> ::conform::Shape {
                ::conform::Shape::named::<Self>()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(item: ItemImpl) -> Vec<(String, Result<String, &'static str>)> {
        item.items
            .iter()
            .filter_map(|impl_item| match impl_item {
                ImplItem::Fn(method) => Some(member(method)),
                _ => None,
            })
            .map(|member| (member.name.value(), member.shape.map(|s| s.to_string())))
            .collect()
    }

    #[test]
    fn publishes_only_single_shape_pub_methods() {
        let item: ItemImpl = parse_quote! {
            impl Sample {
                pub fn next(&mut self) -> Option<u32> { None }
                pub(crate) fn peek(&self) -> Option<&u32> { None }
                fn hidden(&self) {}
                pub fn generic<T>(&self, value: T) {}
                pub async fn later(&self) {}
                pub fn sink(&self, value: impl Into<u32>) {}
                pub fn fill<'a>(&mut self, buf: &'a mut [u8]) -> usize { 0 }
                pub fn dangling<'a>(&self) -> &'a str { "" }
                pub fn r#type(&self) -> u8 { 0 }
            }
        };
        let shapes = classify(item);
        let published: Vec<&str> = shapes
            .iter()
            .filter(|(_, shape)| shape.is_ok())
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(published, ["next", "peek", "fill", "type"]);

        let reasons: Vec<(&str, &str)> = shapes
            .iter()
            .filter_map(|(name, shape)| shape.as_ref().err().map(|why| (name.as_str(), *why)))
            .collect();
        assert_eq!(
            reasons,
            [
                ("hidden", "private"),
                ("generic", "generic"),
                ("later", "async"),
                ("sink", "impl Trait"),
                ("dangling", "unconstrained lifetime"),
            ]
        );
    }

    #[test]
    fn shape_keeps_receiver_and_binder() {
        let sig: Signature = parse_quote!(fn fill<'a>(&mut self, buf: &'a mut [u8]) -> usize);
        let shape = member_shape(&sig).unwrap();
        let expected = quote!(for<'a> fn(&mut Self, &'a mut [u8]) -> usize);
        assert_eq!(shape.to_string(), expected.to_string());
    }

    #[test]
    fn shape_ties_elided_output_to_receiver() {
        let sig: Signature = parse_quote!(fn lookup(&self, key: &str) -> &str);
        let shape = member_shape(&sig).unwrap();
        let expected = quote!(for<'__self> fn(&'__self Self, &str) -> &'__self str);
        assert_eq!(shape.to_string(), expected.to_string());

        let sig: Signature = parse_quote!(fn first<'a>(&'a mut self) -> Option<&'a u8>);
        let shape = member_shape(&sig).unwrap();
        let expected = quote!(for<'a> fn(&'a mut Self) -> Option<&'a u8>);
        assert_eq!(shape.to_string(), expected.to_string());
    }

    #[test]
    fn rejects_trait_impls() {
        let item: ItemImpl = parse_quote! {
            impl Clone for Sample {
                fn clone(&self) -> Self { Sample }
            }
        };
        assert!(expand(item).is_err());
    }
}
