//! Type-level normalization: stripping wrapper layers down to a base type,
//! and removing exactly one reference layer.

/// Maps a type to its canonical base by stripping `&`, `&mut`, `Option`
/// and `Result` layers. Base types map to themselves.
pub trait Normalize {
    type Canonical: ?Sized;
}

pub type Canonical<T> = <T as Normalize>::Canonical;

impl<T: Normalize + ?Sized> Normalize for &T {
    type Canonical = T::Canonical;
}

impl<T: Normalize + ?Sized> Normalize for &mut T {
    type Canonical = T::Canonical;
}

impl<T: Normalize> Normalize for Option<T> {
    type Canonical = T::Canonical;
}

impl<T: Normalize, E> Normalize for Result<T, E> {
    type Canonical = T::Canonical;
}

/// Sized item types a single reference layer may point at.
///
/// Not implemented for references, slices or `str`, so `DerefOnce` is
/// unavailable for `&&T`, `&[T]` and `&str`.
pub trait Referent {}

/// Removes exactly one layer of single-item reference.
pub trait DerefOnce {
    type Target: ?Sized;
}

pub type Deref1<T> = <T as DerefOnce>::Target;

impl<T: Referent> DerefOnce for &T {
    type Target = T;
}

impl<T: Referent> DerefOnce for &mut T {
    type Target = T;
}

macro_rules! base {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Normalize for $ty {
                type Canonical = Self;
            }

            impl Referent for $ty {}
        )*
    };
}

base!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, String,
);

impl<T> Normalize for Vec<T> {
    type Canonical = Self;
}

impl<T> Referent for Vec<T> {}

impl<T: ?Sized> Normalize for Box<T> {
    type Canonical = Self;
}

impl<T: ?Sized> Referent for Box<T> {}

impl<T, const N: usize> Normalize for [T; N] {
    type Canonical = Self;
}

impl<T, const N: usize> Referent for [T; N] {}

impl<T> Normalize for [T] {
    type Canonical = Self;
}

impl Normalize for str {
    type Canonical = Self;
}

impl<T> Referent for Option<T> {}

impl<T, E> Referent for Result<T, E> {}

macro_rules! tuple {
    ($($name:ident),*) => {
        impl<$($name),*> Normalize for ($($name,)*) {
            type Canonical = Self;
        }

        impl<$($name),*> Referent for ($($name,)*) {}
    };
}

tuple!();
tuple!(A);
tuple!(A, B);
tuple!(A, B, C);
tuple!(A, B, C, D);
