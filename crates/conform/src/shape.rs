//! Runtime description of type shapes, mirroring the compile-time
//! normalizer so diagnostics can name and inspect the layers involved.

use std::any::type_name;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// A base type, identified by its type name.
    Named { name: String },
    Ref { mutable: bool, referent: Box<Shape> },
    Optional { inner: Box<Shape> },
    Fallible { ok: Box<Shape>, err: Box<Shape> },
    Slice { element: Box<Shape> },
    Str,
    Array { element: Box<Shape>, len: usize },
    Tuple { elements: Vec<Shape> },
}

impl Shape {
    pub fn of<T: Reflect + ?Sized>() -> Shape {
        T::shape()
    }

    pub fn named<T: ?Sized>() -> Shape {
        Shape::Named {
            name: type_name::<T>().to_string(),
        }
    }

    /// Strip every reference, `Option` and `Result` layer (keeping the `Ok`
    /// side) until a base shape remains.
    pub fn normalize(&self) -> &Shape {
        let mut shape = self;
        loop {
            shape = match shape {
                Shape::Ref { referent, .. } => referent,
                Shape::Optional { inner } => inner,
                Shape::Fallible { ok, .. } => ok,
                base => return base,
            };
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.normalize() == self
    }

    /// Remove exactly one reference layer from a reference to a sized item.
    pub fn deref_once(&self) -> Result<&Shape, DefinitionError> {
        match self {
            Shape::Ref { referent, .. }
                if !matches!(
                    **referent,
                    Shape::Ref { .. } | Shape::Slice { .. } | Shape::Str
                ) =>
            {
                Ok(referent)
            }
            _ => Err(DefinitionError::NotSingleReference {
                shape: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Named { name } => f.write_str(name),
            Shape::Ref { mutable, referent } => {
                let prefix = if *mutable { "&mut " } else { "&" };
                write!(f, "{prefix}{referent}")
            }
            Shape::Optional { inner } => write!(f, "Option<{inner}>"),
            Shape::Fallible { ok, err } => write!(f, "Result<{ok}, {err}>"),
            Shape::Slice { element } => write!(f, "[{element}]"),
            Shape::Str => f.write_str("str"),
            Shape::Array { element, len } => write!(f, "[{element}; {len}]"),
            Shape::Tuple { elements } => {
                f.write_str("(")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                if elements.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Types that can describe their own [`Shape`].
pub trait Reflect {
    fn shape() -> Shape;
}

macro_rules! reflect_named {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn shape() -> Shape {
                    Shape::Named { name: stringify!($ty).to_string() }
                }
            }
        )*
    };
}

reflect_named!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, String,
);

impl Reflect for str {
    fn shape() -> Shape {
        Shape::Str
    }
}

impl<T: Reflect> Reflect for [T] {
    fn shape() -> Shape {
        Shape::Slice {
            element: Box::new(T::shape()),
        }
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn shape() -> Shape {
        Shape::Array {
            element: Box::new(T::shape()),
            len: N,
        }
    }
}

impl<T: Reflect + ?Sized> Reflect for &T {
    fn shape() -> Shape {
        Shape::Ref {
            mutable: false,
            referent: Box::new(T::shape()),
        }
    }
}

impl<T: Reflect + ?Sized> Reflect for &mut T {
    fn shape() -> Shape {
        Shape::Ref {
            mutable: true,
            referent: Box::new(T::shape()),
        }
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn shape() -> Shape {
        Shape::Optional {
            inner: Box::new(T::shape()),
        }
    }
}

impl<T: Reflect, E: Reflect> Reflect for Result<T, E> {
    fn shape() -> Shape {
        Shape::Fallible {
            ok: Box::new(T::shape()),
            err: Box::new(E::shape()),
        }
    }
}

impl<T: ?Sized + 'static> Reflect for Box<T> {
    fn shape() -> Shape {
        Shape::named::<Box<T>>()
    }
}

impl<T: 'static> Reflect for Vec<T> {
    fn shape() -> Shape {
        Shape::named::<Vec<T>>()
    }
}

macro_rules! reflect_tuple {
    ($($name:ident),*) => {
        impl<$($name: Reflect),*> Reflect for ($($name,)*) {
            fn shape() -> Shape {
                Shape::Tuple { elements: vec![$($name::shape()),*] }
            }
        }
    };
}

reflect_tuple!();
reflect_tuple!(A);
reflect_tuple!(A, B);
reflect_tuple!(A, B, C);
reflect_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_nested_layers() {
        let shape = Shape::of::<&mut Option<Result<&u32, String>>>();
        assert_eq!(shape.to_string(), "&mut Option<Result<&u32, String>>");
        assert_eq!(shape.normalize(), &Shape::of::<u32>());
        assert_eq!(shape.normalize().normalize(), shape.normalize());
        assert!(shape.normalize().is_canonical());
        assert!(!shape.is_canonical());
    }

    #[test]
    fn deref_once_accepts_one_layer_only() {
        assert_eq!(
            Shape::of::<&(u8, bool)>().deref_once().unwrap(),
            &Shape::of::<(u8, bool)>()
        );
        assert_eq!(
            Shape::of::<&mut [u8; 4]>().deref_once().unwrap().to_string(),
            "[u8; 4]"
        );
        for shape in [
            Shape::of::<u32>(),
            Shape::of::<&&u32>(),
            Shape::of::<&[u8]>(),
            Shape::of::<&str>(),
            Shape::of::<Option<&u32>>(),
        ] {
            let err = shape.deref_once().unwrap_err();
            assert_eq!(
                err,
                DefinitionError::NotSingleReference {
                    shape: shape.to_string()
                }
            );
        }
    }

    #[test]
    fn display_tuples() {
        assert_eq!(Shape::of::<()>().to_string(), "()");
        assert_eq!(Shape::of::<(u8,)>().to_string(), "(u8,)");
        assert_eq!(Shape::of::<(u8, char)>().to_string(), "(u8, char)");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let value = serde_json::to_value(Shape::of::<&str>()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "kind": "ref", "mutable": false, "referent": { "kind": "str" } })
        );
    }
}
