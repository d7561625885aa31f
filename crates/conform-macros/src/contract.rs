use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{
    parse_quote, Attribute, FnArg, GenericParam, Ident, ItemTrait, Lifetime, LitStr, Meta, Pat,
    ReturnType, Token, TraitItem, TraitItemConst, TraitItemFn, Type,
};

use crate::signature;

/// Operation names that would collide with generated methods.
const RESERVED: &[&str] = &[
    "resolve",
    "builder",
    "natural",
    "empty",
    "build",
    "report",
    "is_complete",
    "direct",
    "indirect",
    "vtable",
    "mode",
    "supports",
];

/// Lifetime parameter of the generated handle.
const HANDLE_LIFETIME: &str = "h";

/// Lifetime of the erased context inside a thunk signature.
const CONTEXT_LIFETIME: &str = "'__context";

#[derive(Default)]
pub(crate) struct ContractOptions {
    bindings_only: bool,
}

impl ContractOptions {
    pub(crate) fn from_metas(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut options = Self::default();
        for meta in metas {
            match &meta {
                Meta::Path(path) if path.is_ident("bindings_only") => options.bindings_only = true,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unknown #[contract] option; expected `bindings_only`",
                    ))
                }
            }
        }
        Ok(options)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Shared,
    Exclusive,
    Value,
}

struct Operation {
    docs: Vec<Attribute>,
    name: Ident,
    access: Access,
    receiver_lifetime: Option<Lifetime>,
    lifetimes: Vec<Lifetime>,
    params: Vec<(Ident, Type)>,
    output: ReturnType,
}

impl Operation {
    fn parse(item: TraitItemFn) -> syn::Result<Self> {
        let sig = &item.sig;
        let name = sig.ident.clone();
        if RESERVED.contains(&name.to_string().as_str()) {
            return Err(syn::Error::new_spanned(
                &name,
                format!("`{name}` is reserved for generated binding and handle methods"),
            ));
        }
        if let Some(body) = &item.default {
            return Err(syn::Error::new_spanned(
                body,
                "contract operations are requirements only; implement them on the subject",
            ));
        }
        if sig.asyncness.is_some()
            || sig.constness.is_some()
            || sig.unsafety.is_some()
            || sig.abi.is_some()
            || sig.variadic.is_some()
        {
            return Err(syn::Error::new_spanned(
                sig,
                "contract operations must be plain safe `fn` signatures",
            ));
        }
        if let Some(where_clause) = &sig.generics.where_clause {
            return Err(syn::Error::new_spanned(
                where_clause,
                "contract operations cannot carry where clauses",
            ));
        }
        let mut lifetimes = Vec::new();
        for param in &sig.generics.params {
            match param {
                GenericParam::Lifetime(lp) => lifetimes.push(lp.lifetime.clone()),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "type and const parameters give an operation more than one shape",
                    ))
                }
            }
        }

        let mut inputs = sig.inputs.iter();
        let receiver = match inputs.next() {
            Some(FnArg::Receiver(receiver)) => receiver,
            _ => {
                return Err(syn::Error::new_spanned(
                    &name,
                    format!(
                        "operation `{name}` must take the subject as its receiver \
                         (`self`, `&self` or `&mut self`)"
                    ),
                ))
            }
        };
        if receiver.colon_token.is_some() {
            return Err(syn::Error::new_spanned(
                receiver,
                "typed receivers are not supported; use `self`, `&self` or `&mut self`",
            ));
        }
        let (access, mut receiver_lifetime) = match &receiver.reference {
            Some((_, lifetime)) if receiver.mutability.is_some() => {
                (Access::Exclusive, lifetime.clone())
            }
            Some((_, lifetime)) => (Access::Shared, lifetime.clone()),
            None => (Access::Value, None),
        };

        let mut params = Vec::new();
        for (index, arg) in inputs.enumerate() {
            let FnArg::Typed(pat_type) = arg else {
                return Err(syn::Error::new_spanned(arg, "unexpected second receiver"));
            };
            if signature::contains_impl_trait(&pat_type.ty) {
                return Err(syn::Error::new_spanned(
                    &pat_type.ty,
                    "`impl Trait` parameters give an operation more than one shape",
                ));
            }
            let ident = match &*pat_type.pat {
                Pat::Ident(pat) if pat.by_ref.is_none() && pat.subpat.is_none() => {
                    pat.ident.clone()
                }
                _ => format_ident!("arg{}", index),
            };
            params.push((ident, (*pat_type.ty).clone()));
        }

        let mut output = sig.output.clone();
        if access != Access::Value {
            if let Some((lifetime, tied)) =
                signature::tie_output_to_receiver(receiver_lifetime.as_ref(), &output)
            {
                if receiver_lifetime.as_ref() != Some(&lifetime) {
                    lifetimes.push(lifetime.clone());
                    receiver_lifetime = Some(lifetime);
                }
                output = tied;
            }
        }

        Ok(Self {
            docs: doc_attrs(&item.attrs),
            name,
            access,
            receiver_lifetime,
            lifetimes,
            params,
            output,
        })
    }

    fn output_type(&self) -> Option<&Type> {
        match &self.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(ty),
        }
    }

    /// Function-pointer shape of this operation with `Self` replaced by `subject`.
    fn binding_shape(&self, subject: &Type) -> syn::Result<TokenStream> {
        let receiver = self.receiver_for(subject);
        let params = self
            .params
            .iter()
            .map(|(_, ty)| signature::substitute_self(ty, subject))
            .collect::<syn::Result<Vec<_>>>()?;
        let output = match &self.output {
            ReturnType::Default => quote!(),
            ReturnType::Type(arrow, ty) => {
                let ty = signature::substitute_self(ty, subject)?;
                quote!(#arrow #ty)
            }
        };
        let binder = binder(&self.lifetimes);
        Ok(quote!(#binder fn(#receiver #(, #params)*) #output))
    }

    fn receiver_for(&self, subject: &Type) -> TokenStream {
        let lifetime = &self.receiver_lifetime;
        match self.access {
            Access::Shared => quote!(&#lifetime #subject),
            Access::Exclusive => quote!(&#lifetime mut #subject),
            Access::Value => quote!(#subject),
        }
    }

    /// Lifetimes the erased signature still needs once the receiver is gone.
    fn erased_lifetimes(&self) -> Vec<Lifetime> {
        let used = signature::lifetimes_in(self.params.iter().map(|(_, ty)| ty));
        self.lifetimes
            .iter()
            .filter(|lifetime| used.contains(lifetime))
            .cloned()
            .collect()
    }

    fn check_erasable(&self) -> syn::Result<()> {
        let mentions_self = self
            .params
            .iter()
            .map(|(_, ty)| ty)
            .chain(self.output_type())
            .any(signature::mentions_self);
        if mentions_self {
            return Err(syn::Error::new_spanned(
                &self.name,
                format!(
                    "`{}` mentions `Self` outside its receiver and cannot be rewritten to an \
                     erased context; declare the contract `#[contract(bindings_only)]`",
                    self.name
                ),
            ));
        }
        if self.output_type().is_some_and(signature::borrows) {
            return Err(syn::Error::new_spanned(
                &self.output,
                format!(
                    "`{}` returns a borrow, which an erased handle cannot tie to its subject; \
                     declare the contract `#[contract(bindings_only)]`",
                    self.name
                ),
            ));
        }
        if let Some(reserved) = self
            .lifetimes
            .iter()
            .find(|lt| lt.ident == HANDLE_LIFETIME || lt.to_string() == CONTEXT_LIFETIME)
        {
            return Err(syn::Error::new_spanned(
                reserved,
                format!("lifetime `{reserved}` is reserved for the erased handle"),
            ));
        }
        Ok(())
    }
}

struct DataRequirement {
    attrs: Vec<Attribute>,
    item: TraitItemConst,
}

impl DataRequirement {
    fn parse(item: TraitItemConst) -> syn::Result<Self> {
        if item.default.is_none() {
            return Err(syn::Error::new_spanned(
                &item,
                format!("data requirement `{}` needs a value", item.ident),
            ));
        }
        if !item.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &item.generics,
                "generic constants are not supported",
            ));
        }
        Ok(Self {
            attrs: item.attrs.clone(),
            item,
        })
    }
}

fn doc_attrs(attrs: &[Attribute]) -> Vec<Attribute> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .cloned()
        .collect()
}

fn binder(lifetimes: &[Lifetime]) -> TokenStream {
    if lifetimes.is_empty() {
        quote!()
    } else {
        quote!(for<#(#lifetimes),*>)
    }
}

fn method_generics(lifetimes: &[Lifetime]) -> TokenStream {
    if lifetimes.is_empty() {
        quote!()
    } else {
        quote!(<#(#lifetimes),*>)
    }
}

pub(crate) fn expand(options: ContractOptions, item: ItemTrait) -> syn::Result<TokenStream> {
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "a contract is resolved against one subject type and takes no generic parameters",
        ));
    }
    if !item.supertraits.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.supertraits,
            "contracts do not inherit; list every required operation",
        ));
    }
    if item.unsafety.is_some() || item.auto_token.is_some() {
        return Err(syn::Error::new_spanned(
            &item.ident,
            "contracts cannot be `unsafe` or `auto`",
        ));
    }

    let mut data = Vec::new();
    let mut operations = Vec::new();
    for trait_item in item.items {
        match trait_item {
            TraitItem::Const(item) => data.push(DataRequirement::parse(item)?),
            TraitItem::Fn(item) => operations.push(Operation::parse(item)?),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "contracts may only declare `const` data requirements and `fn` operations",
                ))
            }
        }
    }

    let vis = &item.vis;
    let contract = &item.ident;
    let contract_name = LitStr::new(&contract.to_string(), contract.span());
    let docs = doc_attrs(&item.attrs);

    let marker = expand_marker(vis, contract, &contract_name, &docs, &data, &operations);
    let binding = expand_binding(vis, contract, &contract_name, &operations)?;
    let handle = if options.bindings_only {
        quote!()
    } else {
        expand_handle(vis, contract, &contract_name, &operations)?
    };

    Ok(quote! {
        #marker
        #binding
        #handle
    })
}

fn expand_marker(
    vis: &syn::Visibility,
    contract: &Ident,
    contract_name: &LitStr,
    docs: &[Attribute],
    data: &[DataRequirement],
    operations: &[Operation],
) -> TokenStream {
    let consts = data.iter().map(|requirement| {
        let attrs = &requirement.attrs;
        let TraitItemConst {
            ident, ty, default, ..
        } = &requirement.item;
        let value = default.as_ref().map(|(_, expr)| expr);
        quote! {
            #(#attrs)*
            pub const #ident: #ty = #value;
        }
    });
    let requirements = operations.iter().map(|op| {
        let name = LitStr::new(&op.name.to_string(), op.name.span());
        let receiver = match op.access {
            Access::Shared => quote!(::conform::Receiver::Shared),
            Access::Exclusive => quote!(::conform::Receiver::Exclusive),
            Access::Value => quote!(::conform::Receiver::Value),
        };
        quote!(::conform::Requirement { name: #name, receiver: #receiver })
    });

    quote! {
        #(#docs)*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #vis struct #contract;

        impl #contract {
            #(#consts)*
        }

        impl ::conform::Contract for #contract {
            const NAME: &'static str = #contract_name;
            const REQUIREMENTS: &'static [::conform::Requirement] = &[#(#requirements),*];
        }
    }
}

fn expand_binding(
    vis: &syn::Visibility,
    contract: &Ident,
    contract_name: &LitStr,
    operations: &[Operation],
) -> syn::Result<TokenStream> {
    let binding = format_ident!("{}Binding", contract);
    let builder = format_ident!("{}BindingBuilder", contract);
    let subject: Type = parse_quote!(S);

    let names: Vec<&Ident> = operations.iter().map(|op| &op.name).collect();
    let name_lits: Vec<LitStr> = names
        .iter()
        .map(|name| LitStr::new(&name.to_string(), name.span()))
        .collect();
    let shapes = operations
        .iter()
        .map(|op| op.binding_shape(&subject))
        .collect::<syn::Result<Vec<_>>>()?;
    let field_docs: Vec<&Vec<Attribute>> = operations.iter().map(|op| &op.docs).collect();

    let forwarders = operations.iter().map(|op| -> syn::Result<TokenStream> {
        let name = &op.name;
        let docs = &op.docs;
        let generics = method_generics(&op.lifetimes);
        let receiver = op.receiver_for(&subject);
        let (param_names, param_types): (Vec<_>, Vec<_>) = op.params.iter().cloned().unzip();
        let param_types = param_types
            .iter()
            .map(|ty| signature::substitute_self(ty, &subject))
            .collect::<syn::Result<Vec<_>>>()?;
        let output = match &op.output {
            ReturnType::Default => quote!(),
            ReturnType::Type(arrow, ty) => {
                let ty = signature::substitute_self(ty, &subject)?;
                quote!(#arrow #ty)
            }
        };
        Ok(quote! {
            #(#docs)*
            pub fn #name #generics(self, subject: #receiver #(, #param_names: #param_types)*) #output {
                (self.#name)(subject #(, #param_names)*)
            }
        })
    });
    let forwarders = forwarders.collect::<syn::Result<Vec<_>>>()?;

    let binding_doc = format!(
        "Operations of [`{contract}`] realized for subject `S`. \
         Complete by construction; see [`{builder}`] for partial bindings."
    );
    let builder_doc = format!(
        "[`{binding}`] with every field optional. `natural()` fills fields from the \
         subject's own members; explicit setters always win."
    );

    Ok(quote! {
        #[doc = #binding_doc]
        #vis struct #binding<S> {
            #(
                #(#field_docs)*
                pub #names: #shapes,
            )*
            _subject: ::core::marker::PhantomData<fn(S) -> S>,
        }

        impl<S> ::core::clone::Clone for #binding<S> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<S> ::core::marker::Copy for #binding<S> {}

        impl<S> ::core::fmt::Debug for #binding<S> {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(::core::stringify!(#binding))
                    .field("subject", &::core::any::type_name::<S>())
                    .finish_non_exhaustive()
            }
        }

        impl<S: ::conform::Subject> #binding<S> {
            /// Default-construct the binding from the subject's own members.
            ///
            /// Fails with the first requirement, in declaration order, that the
            /// subject does not provide with exactly the required shape.
            pub fn resolve() -> ::core::result::Result<Self, ::conform::DefinitionError> {
                #builder::<S>::natural().build()
            }

            /// Start from the natural match and override fields explicitly.
            pub fn builder() -> #builder<S> {
                #builder::<S>::natural()
            }
        }

        #[allow(dead_code)]
        impl<S> #binding<S> {
            #(#forwarders)*
        }

        #[doc = #builder_doc]
        #vis struct #builder<S> {
            #( #names: ::core::option::Option<#shapes>, )*
            report: ::conform::ResolutionReport,
            _subject: ::core::marker::PhantomData<fn(S) -> S>,
        }

        impl<S> ::core::fmt::Debug for #builder<S> {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_struct(::core::stringify!(#builder))
                    .field("report", &self.report)
                    .finish_non_exhaustive()
            }
        }

        #[allow(dead_code)]
        impl<S: 'static> #builder<S> {
            /// A builder with no defaults; every field must be supplied.
            pub fn empty() -> Self {
                let mut report = ::conform::ResolutionReport::new(
                    #contract_name,
                    ::core::any::type_name::<S>(),
                );
                #( report.record::<#shapes>(#name_lits, ::conform::Outcome::Unset); )*
                Self {
                    #( #names: ::core::option::Option::None, )*
                    report,
                    _subject: ::core::marker::PhantomData,
                }
            }

            #(
                #(#field_docs)*
                pub fn #names(mut self, implementation: #shapes) -> Self {
                    self.#names = ::core::option::Option::Some(implementation);
                    self.report.record::<#shapes>(#name_lits, ::conform::Outcome::Explicit);
                    self
                }
            )*

            pub fn report(&self) -> &::conform::ResolutionReport {
                &self.report
            }

            pub fn is_complete(&self) -> bool {
                true #( && self.#names.is_some() )*
            }

            pub fn build(self) -> ::core::result::Result<#binding<S>, ::conform::DefinitionError> {
                #(
                    let #names = match self.#names {
                        ::core::option::Option::Some(implementation) => implementation,
                        ::core::option::Option::None => {
                            return ::core::result::Result::Err(self.report.unbound(#name_lits))
                        }
                    };
                )*
                ::core::result::Result::Ok(#binding {
                    #( #names, )*
                    _subject: ::core::marker::PhantomData,
                })
            }
        }

        impl<S: ::conform::Subject> #builder<S> {
            /// Fill every field from the subject member of the same name and
            /// exactly the same shape.
            pub fn natural() -> Self {
                let mut report = ::conform::ResolutionReport::new(
                    #contract_name,
                    <S as ::conform::Subject>::name(),
                );
                #(
                    let #names = ::conform::resolve::natural::<S, #shapes>(&mut report, #name_lits);
                )*
                Self {
                    #( #names, )*
                    report,
                    _subject: ::core::marker::PhantomData,
                }
            }
        }

        impl<S: 'static> ::core::convert::From<#binding<S>> for #builder<S> {
            fn from(binding: #binding<S>) -> Self {
                let mut builder = Self::empty();
                #( builder = builder.#names(binding.#names); )*
                builder
            }
        }
    })
}

fn expand_handle(
    vis: &syn::Visibility,
    contract: &Ident,
    contract_name: &LitStr,
    operations: &[Operation],
) -> syn::Result<TokenStream> {
    for op in operations {
        op.check_erasable()?;
    }
    let has_value = operations.iter().any(|op| op.access == Access::Value);
    let has_exclusive = operations.iter().any(|op| op.access == Access::Exclusive);
    if has_value && has_exclusive {
        return Err(syn::Error::new_spanned(
            contract,
            "contract mixes `self` and `&mut self` receivers, so no access mode can forward \
             every operation; declare it `#[contract(bindings_only)]`",
        ));
    }

    let builder = format_ident!("{}BindingBuilder", contract);
    let vtable = format_ident!("{}VTable", contract);
    let handle = format_ident!("{}Handle", contract);
    let handle_lifetime = Lifetime::new(&format!("'{HANDLE_LIFETIME}"), contract.span());
    let context_ty = if has_exclusive {
        quote!(::conform::ContextMut<#handle_lifetime>)
    } else {
        quote!(::conform::ContextRef<#handle_lifetime>)
    };

    let names: Vec<&Ident> = operations.iter().map(|op| &op.name).collect();
    let name_lits: Vec<LitStr> = names
        .iter()
        .map(|name| LitStr::new(&name.to_string(), name.span()))
        .collect();
    let thunk_types: Vec<TokenStream> = operations.iter().map(thunk_type).collect();
    let field_docs: Vec<&Vec<Attribute>> = operations.iter().map(|op| &op.docs).collect();
    let factory = Factory {
        vtable: &vtable,
        builder: &builder,
        operations,
        thunk_types: &thunk_types,
    };

    let dispatchers = operations.iter().zip(&name_lits).map(|(op, name_lit)| {
        let name = &op.name;
        let docs = &op.docs;
        let generics = method_generics(&op.erased_lifetimes());
        let (this, context) = match op.access {
            Access::Exclusive => (quote!(&mut self), quote!(self.context.reborrow())),
            Access::Shared if has_exclusive => (quote!(&self), quote!(self.context.shared())),
            Access::Shared | Access::Value => (quote!(&self), quote!(self.context)),
        };
        let (param_names, param_types): (Vec<_>, Vec<_>) = op.params.iter().cloned().unzip();
        let output = &op.output;
        quote! {
            #(#docs)*
            ///
            /// Panics if the handle was built without this operation; check
            /// [`Self::supports`] first when the operation is optional.
            pub fn #name #generics(#this #(, #param_names: #param_types)*) #output {
                match self.vtable.#name {
                    ::core::option::Option::Some(entry) => {
                        (entry.thunk)(#context, entry.target #(, #param_names)*)
                    }
                    ::core::option::Option::None => {
                        ::conform::erased::null_entry(#contract_name, #name_lit)
                    }
                }
            }
        }
    });

    let direct = if has_value {
        quote!()
    } else {
        let (subject_param, context) = if has_exclusive {
            (
                quote!(subject: &#handle_lifetime mut S),
                quote!(::conform::ContextMut::new(subject)),
            )
        } else {
            (
                quote!(subject: &#handle_lifetime S),
                quote!(::conform::ContextRef::new(subject)),
            )
        };
        let body = factory.body(context, quote!(::conform::AccessMode::Direct))?;
        quote! {
            /// Build a handle that forwards the subject pointer itself.
            pub fn direct<S: 'static>(
                #subject_param,
                binding: impl ::core::convert::Into<#builder<S>>,
            ) -> Self {
                #body
            }
        }
    };

    let indirect = if has_exclusive {
        quote!()
    } else {
        let body = factory.body(
            quote!(::conform::ContextRef::new(subject)),
            quote!(::conform::AccessMode::Indirect),
        )?;
        quote! {
            /// Build a handle that dereferences the context and forwards the
            /// subject by value.
            pub fn indirect<S: ::core::marker::Copy + 'static>(
                subject: &#handle_lifetime S,
                binding: impl ::core::convert::Into<#builder<S>>,
            ) -> Self {
                #body
            }
        }
    };

    let vtable_doc = format!(
        "Function-pointer table of [`{contract}`] over an erased context. \
         `None` marks an operation the handle was built without."
    );
    let handle_doc = format!(
        "Type-erased view of any subject satisfying [`{contract}`]. \
         Borrows the subject for `'{HANDLE_LIFETIME}` and never owns it."
    );

    Ok(quote! {
        #[doc = #vtable_doc]
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #vtable {
            #(
                #(#field_docs)*
                pub #names: ::core::option::Option<::conform::Entry<#thunk_types>>,
            )*
        }

        #[doc = #handle_doc]
        #[derive(Debug)]
        #vis struct #handle<#handle_lifetime> {
            context: #context_ty,
            vtable: #vtable,
            mode: ::conform::AccessMode,
        }

        #[allow(dead_code)]
        impl<#handle_lifetime> #handle<#handle_lifetime> {
            #direct
            #indirect

            pub fn vtable(&self) -> &#vtable {
                &self.vtable
            }

            pub fn mode(&self) -> ::conform::AccessMode {
                self.mode
            }

            /// Whether `operation` has a populated vtable entry.
            pub fn supports(&self, operation: &str) -> bool {
                match operation {
                    #( #name_lits => self.vtable.#names.is_some(), )*
                    _ => false,
                }
            }

            #(#dispatchers)*
        }
    })
}

/// Erased context a thunk of `op` receives, borrowed for `lifetime`.
fn context_of(op: &Operation, lifetime: &Lifetime) -> TokenStream {
    match op.access {
        Access::Exclusive => quote!(::conform::ContextMut<#lifetime>),
        Access::Shared | Access::Value => quote!(::conform::ContextRef<#lifetime>),
    }
}

fn context_lifetime() -> Lifetime {
    Lifetime::new(CONTEXT_LIFETIME, proc_macro2::Span::call_site())
}

fn thunk_type(op: &Operation) -> TokenStream {
    let lifetime = context_lifetime();
    let mut lifetimes = vec![lifetime.clone()];
    lifetimes.extend(op.erased_lifetimes());
    let binder = binder(&lifetimes);
    let context = context_of(op, &lifetime);
    let params = op.params.iter().map(|(_, ty)| ty);
    let output = &op.output;
    quote!(#binder fn(#context, ::conform::Target #(, #params)*) #output)
}

/// Shared pieces of the `direct` and `indirect` handle factories.
struct Factory<'a> {
    vtable: &'a Ident,
    builder: &'a Ident,
    operations: &'a [Operation],
    thunk_types: &'a [TokenStream],
}

impl Factory<'_> {
    fn body(&self, context: TokenStream, mode: TokenStream) -> syn::Result<TokenStream> {
        let (vtable, builder) = (self.vtable, self.builder);
        let subject: Type = parse_quote!(S);
        let lifetime = context_lifetime();
        let mut items = Vec::new();
        let mut entries = Vec::new();
        for (op, thunk_ty) in self.operations.iter().zip(self.thunk_types) {
            let name = &op.name;
            let alias = format_ident!("__conform_{}_impl", name);
            let thunk = format_ident!("__conform_{}", name);
            let shape = op.binding_shape(&subject)?;
            let generics = op.erased_lifetimes();
            let context_ty = context_of(op, &lifetime);
            let (param_names, param_types): (Vec<_>, Vec<_>) = op.params.iter().cloned().unzip();
            let output = &op.output;
            let (bound, reach) = match op.access {
                Access::Exclusive => (quote!('static), quote!(__context.into_mut::<S>())),
                Access::Shared => (quote!('static), quote!(__context.get::<S>())),
                Access::Value => (
                    quote!(::core::marker::Copy + 'static),
                    quote!(__context.get_copy::<S>()),
                ),
            };
            items.push(quote! {
                #[allow(non_camel_case_types)]
                type #alias<S> = #shape;

                fn #thunk<#lifetime, #(#generics,)* S: #bound>(
                    __context: #context_ty,
                    __target: ::conform::Target
                    #(, #param_names: #param_types)*
                ) #output {
                    let __implementation = __target.restore::<#alias<S>>();
                    __implementation(#reach #(, #param_names)*)
                }
            });
            entries.push(quote! {
                #name: parts.#name.map(|implementation| {
                    ::conform::Entry::new(
                        #thunk::<S> as #thunk_ty,
                        ::conform::Target::erase(implementation),
                    )
                }),
            });
        }
        Ok(quote! {
            #(#items)*
            let parts: #builder<S> = binding.into();
            let vtable = #vtable {
                #(#entries)*
            };
            Self {
                context: #context,
                vtable,
                mode: #mode,
            }
        })
    }
}
