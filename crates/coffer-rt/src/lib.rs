//! Runtime representation of box values for coffer.
//!
//! This crate contains:
//! - [`DescriptorTable`]: runtime type descriptors, indexed by [`TypeRef`]
//! - Structural type identity with a heap-backed [`Standard`] comparator and
//!   an allocation-free [`Bootstrap`] comparator
//! - [`BoxValue`] and the [`Matcher`] that resolves type assertions on it
//! - [`BoxLayout`], which replaces descriptors with small integer tags
//!
//! Nothing here depends on the checker. Descriptors are produced by lowering
//! checked types and are only read afterwards.

pub mod descriptor;
pub mod identity;
pub mod tagged;
pub mod value;

pub use descriptor::{
    ChanDir, Descriptor, DescriptorTable, FieldDesc, Kind, MethodDesc, Relocation, Shape,
    TableError, TypeRef,
};
pub use identity::{BOOTSTRAP_CAPACITY, Bootstrap, Comparator, IdentityError, Standard};
pub use tagged::{BoxLayout, EMPTY_TAG, LayoutError, TaggedBox};
pub use value::{AssertError, BoxValue, Data, Matcher, TypeAssertionError};

#[cfg(test)]
mod prop_tests;
