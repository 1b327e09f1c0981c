use std::fmt;

use crate::{Type, identical};

/// Returned when a box type would be built with no variants.
///
/// The checker never constructs an empty box from source; reaching this is a
/// bug in the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("box type constructed with no variants")]
pub struct EmptyBoxConstruction;

/// A closed, ordered set of variant types.
///
/// Frozen at construction: variants are validated and deduplicated by the
/// checker before they get here, and nothing can change them afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxType {
    variants: Vec<Type>,
}

impl BoxType {
    /// Build a box type.
    ///
    /// # Panics
    ///
    /// Panics if `variants` is empty.
    pub fn new(variants: Vec<Type>) -> Self {
        match Self::try_new(variants) {
            Ok(boxed) => boxed,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_new(variants: Vec<Type>) -> Result<Self, EmptyBoxConstruction> {
        if variants.is_empty() {
            return Err(EmptyBoxConstruction);
        }
        Ok(Self { variants })
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variant(&self, index: usize) -> Option<&Type> {
        self.variants.get(index)
    }

    /// Variants in declaration order.
    pub fn variants(&self) -> &[Type] {
        &self.variants
    }

    /// A box type is its own underlying type.
    pub fn underlying(&self) -> &BoxType {
        self
    }

    /// Index of the variant identical to `ty`.
    pub fn position(&self, ty: &Type) -> Option<usize> {
        self.variants.iter().position(|v| identical(v, ty))
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.position(ty).is_some()
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box {{ ")?;
        for (i, variant) in self.variants.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{variant}")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::{BasicKind, NamedId, NamedType};

    fn basic(kind: BasicKind) -> Type {
        Type::Basic(kind)
    }

    #[test]
    fn display_lists_variants_in_declaration_order() {
        let point = Type::Named(NamedType {
            id: NamedId(0),
            name: "Point".into(),
        });
        let boxed = BoxType::new(vec![basic(BasicKind::String), basic(BasicKind::Int), point]);
        insta::assert_snapshot!(boxed.to_string(), @"box { string; int; Point }");
        assert_eq!(boxed.len(), 3);
        assert_eq!(boxed.variant(1), Some(&basic(BasicKind::Int)));
        assert_eq!(boxed.variant(3), None);
        assert!(std::ptr::eq(boxed.underlying(), &boxed));
    }

    #[test]
    fn try_new_rejects_empty() {
        assert_eq!(BoxType::try_new(vec![]), Err(EmptyBoxConstruction));
    }

    #[test]
    #[should_panic(expected = "box type constructed with no variants")]
    fn new_panics_on_empty() {
        let _ = BoxType::new(vec![]);
    }

    #[test]
    fn frozen_box_types_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<BoxType>>();
    }

    proptest! {
        #[test]
        fn position_finds_every_variant(picks in proptest::sample::subsequence(BasicKind::ALL.to_vec(), 1..8)) {
            let variants: Vec<Type> = picks.iter().copied().map(Type::Basic).collect();
            let boxed = BoxType::new(variants.clone());
            for (i, v) in variants.iter().enumerate() {
                prop_assert_eq!(boxed.position(v), Some(i));
            }
            for kind in BasicKind::ALL {
                prop_assert_eq!(boxed.contains(&Type::Basic(kind)), picks.contains(&kind));
            }
        }
    }
}
