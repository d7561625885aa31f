//! Shape inspection helpers shared by `#[contract]` and `#[subject]`.

use proc_macro2::Span;
use syn::visit::{self, Visit};
use syn::visit_mut::{self, VisitMut};
use syn::{
    Lifetime, ParenthesizedGenericArguments, Path, ReturnType, Type, TypeBareFn, TypeImplTrait,
    TypeReference,
};

/// Name given to a borrowed receiver that has to carry an output lifetime.
pub(crate) const SELF_LIFETIME: &str = "'__self";

#[derive(Default)]
struct Scan {
    mentions_self: bool,
    borrows: bool,
    impl_trait: bool,
    lifetimes: Vec<Lifetime>,
}

impl<'ast> Visit<'ast> for Scan {
    fn visit_path(&mut self, path: &'ast Path) {
        if path.segments.first().is_some_and(|seg| seg.ident == "Self") {
            self.mentions_self = true;
        }
        visit::visit_path(self, path);
    }

    fn visit_type_reference(&mut self, reference: &'ast TypeReference) {
        self.borrows = true;
        visit::visit_type_reference(self, reference);
    }

    fn visit_type_impl_trait(&mut self, impl_trait: &'ast TypeImplTrait) {
        self.impl_trait = true;
        visit::visit_type_impl_trait(self, impl_trait);
    }

    fn visit_lifetime(&mut self, lifetime: &'ast Lifetime) {
        self.borrows = true;
        if !self.lifetimes.contains(lifetime) {
            self.lifetimes.push(lifetime.clone());
        }
    }
}

fn scan(ty: &Type) -> Scan {
    let mut scan = Scan::default();
    scan.visit_type(ty);
    scan
}

pub(crate) fn mentions_self(ty: &Type) -> bool {
    scan(ty).mentions_self
}

/// True when the type holds a reference or names any lifetime.
pub(crate) fn borrows(ty: &Type) -> bool {
    scan(ty).borrows
}

pub(crate) fn contains_impl_trait(ty: &Type) -> bool {
    scan(ty).impl_trait
}

pub(crate) fn lifetimes_in<'a>(types: impl IntoIterator<Item = &'a Type>) -> Vec<Lifetime> {
    let mut scan = Scan::default();
    for ty in types {
        scan.visit_type(ty);
    }
    scan.lifetimes
}

struct SubstituteSelf<'a> {
    replacement: &'a Type,
    error: Option<syn::Error>,
}

impl VisitMut for SubstituteSelf<'_> {
    fn visit_type_mut(&mut self, ty: &mut Type) {
        if let Type::Path(type_path) = ty {
            if type_path.qself.is_none() && type_path.path.is_ident("Self") {
                *ty = self.replacement.clone();
                return;
            }
        }
        visit_mut::visit_type_mut(self, ty);
    }

    fn visit_path_mut(&mut self, path: &mut Path) {
        if self.error.is_none() && path.segments.first().is_some_and(|seg| seg.ident == "Self") {
            self.error = Some(syn::Error::new_spanned(
                &*path,
                "paths through `Self` cannot be resolved against a subject type",
            ));
        }
        visit_mut::visit_path_mut(self, path);
    }
}

/// Replace every bare `Self` in `ty` with `replacement`.
pub(crate) fn substitute_self(ty: &Type, replacement: &Type) -> syn::Result<Type> {
    let mut ty = ty.clone();
    let mut visitor = SubstituteSelf {
        replacement,
        error: None,
    };
    visitor.visit_type_mut(&mut ty);
    match visitor.error {
        Some(err) => Err(err),
        None => Ok(ty),
    }
}

struct NameElided<'a> {
    lifetime: &'a Lifetime,
    named: bool,
}

impl VisitMut for NameElided<'_> {
    fn visit_type_reference_mut(&mut self, reference: &mut TypeReference) {
        if reference.lifetime.is_none() {
            reference.lifetime = Some(self.lifetime.clone());
            self.named = true;
        }
        visit_mut::visit_type_reference_mut(self, reference);
    }

    fn visit_lifetime_mut(&mut self, lifetime: &mut Lifetime) {
        if lifetime.ident == "_" {
            *lifetime = self.lifetime.clone();
            self.named = true;
        }
    }

    // Nested fn signatures elide on their own.
    fn visit_type_bare_fn_mut(&mut self, _: &mut TypeBareFn) {}

    fn visit_parenthesized_generic_arguments_mut(&mut self, _: &mut ParenthesizedGenericArguments) {}
}

/// Inside a method, elided output lifetimes borrow from a `&self` receiver;
/// inside a `fn` pointer type they are an error. Spell the tie out.
///
/// Returns the receiver lifetime to use (the declared one, or
/// [`SELF_LIFETIME`] when the receiver had none) with the output rewritten
/// to it, or `None` when the output elides nothing.
pub(crate) fn tie_output_to_receiver(
    receiver: Option<&Lifetime>,
    output: &ReturnType,
) -> Option<(Lifetime, ReturnType)> {
    let ReturnType::Type(arrow, ty) = output else {
        return None;
    };
    let lifetime = match receiver {
        Some(lifetime) if lifetime.ident != "_" => lifetime.clone(),
        _ => Lifetime::new(SELF_LIFETIME, Span::call_site()),
    };
    let mut ty = (**ty).clone();
    let mut visitor = NameElided {
        lifetime: &lifetime,
        named: false,
    };
    visitor.visit_type_mut(&mut ty);
    visitor
        .named
        .then(|| (lifetime, ReturnType::Type(*arrow, Box::new(ty))))
}
