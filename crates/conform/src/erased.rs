//! Pieces every generated handle is built from: the erased subject borrow,
//! the erased implementation pointer and the entry pairing it with a thunk.
//!
//! Both erasures remember the `TypeId` they came from, so the thunks that
//! `#[contract]` expands into the caller's crate restore them with safe
//! calls and stay usable under `#![forbid(unsafe_code)]`.

use std::any::{type_name, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{size_of, transmute_copy};
use std::ptr::NonNull;

use serde::{Deserialize, Serialize};

/// How a handle forwards its subject to the bound implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// The context pointer itself is forwarded as `&S` or `&mut S`.
    Direct,
    /// The context is dereferenced and the value forwarded (`S: Copy`).
    Indirect,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Direct => f.write_str("direct"),
            AccessMode::Indirect => f.write_str("indirect"),
        }
    }
}

/// Erased shared borrow of the subject a handle views.
///
/// Remembers the subject's `TypeId`, so getting it back is checked and safe.
#[derive(Debug, Clone, Copy)]
pub struct ContextRef<'c> {
    subject: NonNull<()>,
    type_id: TypeId,
    _borrow: PhantomData<&'c ()>,
}

impl<'c> ContextRef<'c> {
    pub fn new<S: 'static>(subject: &'c S) -> Self {
        Self {
            subject: NonNull::from(subject).cast(),
            type_id: TypeId::of::<S>(),
            _borrow: PhantomData,
        }
    }

    pub fn as_ptr(self) -> *const () {
        self.subject.as_ptr()
    }

    /// The subject as `&S`. Panics if the context was built from another type.
    #[track_caller]
    pub fn get<S: 'static>(self) -> &'c S {
        check_type::<S>(self.type_id, "context");
        // SAFETY: the pointer came from a `&'c S` and the type was checked.
        unsafe { self.subject.cast::<S>().as_ref() }
    }

    #[track_caller]
    pub fn get_copy<S: Copy + 'static>(self) -> S {
        *self.get::<S>()
    }
}

/// Erased exclusive borrow of the subject a handle views.
///
/// Not `Copy`: each call reborrows it, so at most one `&mut S` is live.
#[derive(Debug)]
pub struct ContextMut<'c> {
    subject: NonNull<()>,
    type_id: TypeId,
    _borrow: PhantomData<&'c mut ()>,
}

impl<'c> ContextMut<'c> {
    pub fn new<S: 'static>(subject: &'c mut S) -> Self {
        Self {
            subject: NonNull::from(subject).cast(),
            type_id: TypeId::of::<S>(),
            _borrow: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *mut () {
        self.subject.as_ptr()
    }

    pub fn reborrow(&mut self) -> ContextMut<'_> {
        ContextMut {
            subject: self.subject,
            type_id: self.type_id,
            _borrow: PhantomData,
        }
    }

    pub fn shared(&self) -> ContextRef<'_> {
        ContextRef {
            subject: self.subject,
            type_id: self.type_id,
            _borrow: PhantomData,
        }
    }

    /// The subject as `&mut S`. Panics if the context was built from another type.
    #[track_caller]
    pub fn into_mut<S: 'static>(self) -> &'c mut S {
        check_type::<S>(self.type_id, "context");
        let mut subject = self.subject.cast::<S>();
        // SAFETY: the pointer came from a `&'c mut S`, the type was checked
        // and `self` was consumed, so no other borrow is handed out for `'c`.
        unsafe { subject.as_mut() }
    }
}

/// Erased pointer to a bound implementation.
///
/// Only pointer-sized `Copy` values (function pointers) can be erased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    implementation: *const (),
    type_id: TypeId,
}

impl Target {
    pub fn erase<F: Copy + 'static>(implementation: F) -> Self {
        const { assert!(size_of::<F>() == size_of::<*const ()>()) };
        Self {
            // SAFETY: sizes are equal and `F` is `Copy`, so this is a bit copy.
            implementation: unsafe { transmute_copy::<F, *const ()>(&implementation) },
            type_id: TypeId::of::<F>(),
        }
    }

    /// The implementation as `F`. Panics unless `F` is the erased type.
    #[track_caller]
    pub fn restore<F: Copy + 'static>(self) -> F {
        const { assert!(size_of::<F>() == size_of::<*const ()>()) };
        check_type::<F>(self.type_id, "target");
        // SAFETY: `F` is the exact type the bits were copied from.
        unsafe { transmute_copy::<*const (), F>(&self.implementation) }
    }

    pub fn as_ptr(self) -> *const () {
        self.implementation
    }
}

#[track_caller]
fn check_type<T: 'static>(erased: TypeId, what: &str) {
    if erased != TypeId::of::<T>() {
        type_mismatch(what, type_name::<T>());
    }
}

#[cold]
#[track_caller]
fn type_mismatch(what: &str, requested: &str) -> ! {
    panic!("erased {what} restored as `{requested}`, which it was not built from")
}

/// A thunk paired with the implementation it restores and calls.
#[derive(Clone, Copy)]
pub struct Entry<F> {
    pub thunk: F,
    pub target: Target,
}

impl<F> Entry<F> {
    pub fn new(thunk: F, target: Target) -> Self {
        Self { thunk, target }
    }
}

impl<F> fmt::Debug for Entry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("thunk", &type_name::<F>())
            .field("target", &self.target.as_ptr())
            .finish()
    }
}

/// Dispatch reached an operation the handle was built without.
#[cold]
#[track_caller]
pub fn null_entry(contract: &'static str, operation: &'static str) -> ! {
    panic!(
        "{contract}: operation `{operation}` has no vtable entry; \
         check `supports(\"{operation}\")` before dispatching"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(value: &u32) -> u32 {
        value * 2
    }

    #[test]
    fn target_round_trips_function_pointers() {
        let target = Target::erase(double as fn(&u32) -> u32);
        let restored = target.restore::<fn(&u32) -> u32>();
        assert_eq!(restored(&21), 42);
    }

    #[test]
    #[should_panic(expected = "erased target restored as")]
    fn target_refuses_other_function_types() {
        let target = Target::erase(double as fn(&u32) -> u32);
        let _ = target.restore::<fn(&u64) -> u32>();
    }

    #[test]
    fn context_reborrows_subject() {
        let mut value = 7u32;
        let mut context = ContextMut::new(&mut value);
        *context.reborrow().into_mut::<u32>() += 1;
        assert_eq!(context.shared().get_copy::<u32>(), 8);
        *context.into_mut::<u32>() += 1;
        assert_eq!(value, 9);
    }

    #[test]
    #[should_panic(expected = "erased context restored as `u64`")]
    fn context_refuses_other_subject_types() {
        let value = 7u32;
        ContextRef::new(&value).get::<u64>();
    }

    #[test]
    fn access_mode_display_matches_serde() {
        assert_eq!(AccessMode::Indirect.to_string(), "indirect");
        assert_eq!(
            serde_json::to_value(AccessMode::Direct).unwrap(),
            serde_json::json!("direct")
        );
    }

    #[test]
    #[should_panic(expected = "operation `next` has no vtable entry")]
    fn null_entry_panics_with_operation_name() {
        null_entry("Iterator", "next");
    }
}
