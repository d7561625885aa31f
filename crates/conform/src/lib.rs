//! Contracts over subject types.
//!
//! A `#[contract]` names the operations a subject must provide. For any
//! subject published with `#[subject]`, `<C>Binding::<S>::resolve()` builds
//! a record of function pointers from the subject's own members, matching
//! each requirement by name and exact shape. `<C>BindingBuilder` overrides
//! or supplies fields explicitly, and `<C>Handle` erases the subject type
//! behind a vtable so different subjects can be used through one type.
//!
//! ```ignore
//! use conform::{contract, subject};
//!
//! #[contract]
//! pub trait Counter {
//!     fn bump(&mut self, by: u32) -> u32;
//! }
//!
//! pub struct Tally(u32);
//!
//! #[subject]
//! impl Tally {
//!     pub fn bump(&mut self, by: u32) -> u32 {
//!         self.0 += by;
//!         self.0
//!     }
//! }
//!
//! let binding = CounterBinding::<Tally>::resolve()?;
//! let mut tally = Tally(0);
//! assert_eq!(binding.bump(&mut tally, 2), 2);
//! let mut handle = CounterHandle::direct(&mut tally, binding);
//! assert_eq!(handle.bump(3), 5);
//! ```

pub mod config;
mod contract;
mod error;
pub mod erased;
mod normalize;
pub mod resolve;
mod shape;
mod subject;
pub mod telemetry;

pub use conform_macros::{contract, subject};
pub use contract::{Contract, Receiver, Requirement};
pub use erased::{AccessMode, ContextMut, ContextRef, Entry, Target};
pub use error::DefinitionError;
pub use normalize::{Canonical, Deref1, DerefOnce, Normalize, Referent};
pub use resolve::{FieldResolution, Outcome, ResolutionReport};
pub use shape::{Reflect, Shape};
pub use subject::{Lookup, MemberSlot, Subject};
