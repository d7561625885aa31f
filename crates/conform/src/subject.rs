use std::any::{type_name, Any};

/// A type whose intrinsic members are visible to binding resolution.
///
/// Implemented by `#[subject]` on an inherent impl block; each published
/// method is offered under its own name and exact function-pointer shape.
pub trait Subject: 'static {
    /// Published member names, in declaration order.
    const MEMBERS: &'static [&'static str];

    /// Offer the member called `name` to `slot`.
    fn bind_member(name: &str, slot: &mut MemberSlot<'_>) -> Lookup;

    fn name() -> &'static str {
        type_name::<Self>()
    }

    fn has_member(name: &str) -> bool {
        Self::MEMBERS.contains(&name)
    }
}

/// Outcome of offering a member to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Bound,
    /// A member of that name exists with a different shape.
    Mismatch { found: &'static str },
    Absent,
}

/// Type-erased destination for one binding field.
///
/// The slot only accepts a value of the exact type it was created for; the
/// check is a `TypeId` comparison, so two shapes that merely coerce into one
/// another are a mismatch.
pub struct MemberSlot<'a> {
    target: &'a mut dyn Any,
    expected: &'static str,
}

impl<'a> MemberSlot<'a> {
    pub fn new<F: 'static>(target: &'a mut Option<F>) -> Self {
        Self {
            target,
            expected: type_name::<F>(),
        }
    }

    pub fn offer<F: 'static>(&mut self, value: F) -> Lookup {
        match self.target.downcast_mut::<Option<F>>() {
            Some(target) => {
                *target = Some(value);
                Lookup::Bound
            }
            None => Lookup::Mismatch {
                found: type_name::<F>(),
            },
        }
    }

    pub fn expected(&self) -> &'static str {
        self.expected
    }
}

impl std::fmt::Debug for MemberSlot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberSlot")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_binds_exact_shape_only() {
        let mut target: Option<fn(u32) -> u32> = None;
        let mut slot = MemberSlot::new(&mut target);
        assert_eq!(
            slot.offer::<fn(u64) -> u64>(|x| x),
            Lookup::Mismatch {
                found: type_name::<fn(u64) -> u64>()
            }
        );
        assert_eq!(slot.offer::<fn(u32) -> u32>(|x| x + 1), Lookup::Bound);
        assert_eq!(target.map(|f| f(1)), Some(2));
    }
}
