//! Tagged box layout.
//!
//! A [`BoxLayout`] numbers a box's variants once, when the layout is built.
//! Values packed with it carry a small integer tag instead of a descriptor,
//! and assertions against them are integer comparisons. Tag 0 is the zero
//! box; variants get contiguous tags from 1 in declaration order.

use thiserror::Error;

use crate::descriptor::{DescriptorTable, Shape, TypeRef};
use crate::identity::{Comparator, IdentityError};
use crate::value::{BoxValue, Data};

/// Tag of the zero box.
pub const EMPTY_TAG: u32 = 0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("type `{repr}` is not a box type")]
    NotABox { repr: String },
    #[error("type `{repr}` is not a variant of box `{box_repr}`")]
    NotAVariant { repr: String, box_repr: String },
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Variant numbering of one box type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxLayout {
    box_type: TypeRef,
    /// Descriptor of the variant with tag `i + 1`.
    variants: Vec<TypeRef>,
}

/// A box value whose type is a layout tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedBox<'v> {
    pub tag: u32,
    pub data: Data<'v>,
}

impl<'v> TaggedBox<'v> {
    pub const EMPTY: TaggedBox<'static> = TaggedBox {
        tag: EMPTY_TAG,
        data: Data::Zero,
    };

    pub fn is_empty(&self) -> bool {
        self.tag == EMPTY_TAG
    }

    /// The data if this box holds the variant tagged `tag`.
    pub fn assert(&self, tag: u32) -> Option<Data<'v>> {
        (tag != EMPTY_TAG && self.tag == tag).then_some(self.data)
    }
}

impl BoxLayout {
    /// Number the variants of the box type `box_type`.
    pub fn new(table: &DescriptorTable, box_type: TypeRef) -> Result<Self, LayoutError> {
        let descriptor = table.get(box_type).ok_or(IdentityError::UnknownType(box_type))?;
        let Shape::Box { variants } = &descriptor.shape else {
            return Err(LayoutError::NotABox {
                repr: descriptor.repr.clone(),
            });
        };
        Ok(Self {
            box_type,
            variants: variants.clone(),
        })
    }

    pub fn box_type(&self) -> TypeRef {
        self.box_type
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Descriptor of the variant tagged `tag`.
    pub fn variant(&self, tag: u32) -> Option<TypeRef> {
        let index = usize::try_from(tag.checked_sub(1)?).ok()?;
        self.variants.get(index).copied()
    }

    /// The tag of the variant identical to `ty`.
    pub fn tag_of<C: Comparator>(
        &self,
        comparator: &mut C,
        table: &DescriptorTable,
        ty: TypeRef,
    ) -> Result<u32, LayoutError> {
        for (tag, variant) in (1u32..).zip(&self.variants) {
            if comparator.identical(table, *variant, ty)? {
                return Ok(tag);
            }
        }
        Err(LayoutError::NotAVariant {
            repr: table.repr(ty).to_string(),
            box_repr: table.repr(self.box_type).to_string(),
        })
    }

    /// Replace a value's descriptor with its tag.
    pub fn pack<'v, C: Comparator>(
        &self,
        comparator: &mut C,
        table: &DescriptorTable,
        value: BoxValue<'v>,
    ) -> Result<TaggedBox<'v>, LayoutError> {
        let Some(held) = value.descriptor() else {
            return Ok(TaggedBox::EMPTY);
        };
        Ok(TaggedBox {
            tag: self.tag_of(comparator, table, held)?,
            data: value.data(),
        })
    }

    /// Recover the descriptor form of a tagged value. Unknown tags unpack to
    /// the zero box.
    pub fn unpack<'v>(&self, tagged: TaggedBox<'v>) -> BoxValue<'v> {
        match self.variant(tagged.tag) {
            Some(variant) => BoxValue::new(variant, tagged.data),
            None => BoxValue::EMPTY,
        }
    }
}
