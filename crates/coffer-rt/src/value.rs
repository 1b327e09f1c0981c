//! Box values and the tag matcher.
//!
//! A [`BoxValue`] is a type tag plus a data slot, laid out like an interface
//! value. The tag is a descriptor reference, or `None` for the zero box.
//! Assertions compare the tag with the asserted type through a
//! [`Comparator`], so a value built from one copy of a type descriptor
//! matches an assertion against another copy of the same type.

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::descriptor::{DescriptorTable, TypeRef};
use crate::identity::{Comparator, IdentityError, Standard};

// ---------------------------------------------------------------------------
// Data slot
// ---------------------------------------------------------------------------

/// The data slot of a box value.
///
/// Word-sized basic values are stored inline. Anything else is borrowed from
/// storage owned by the code that built the box.
#[derive(Clone, Copy)]
pub enum Data<'v> {
    Zero,
    /// Bits of a bool, integer or float value.
    Word(u64),
    Str(&'v str),
    Ref(&'v (dyn Any + 'static)),
}

impl<'v> Data<'v> {
    /// The data slot of the zero box.
    pub const ZERO: Data<'static> = Data::Zero;

    pub fn bool(b: bool) -> Self {
        Data::Word(u64::from(b))
    }

    pub fn int(n: i64) -> Self {
        Data::Word(n as u64)
    }

    pub fn uint(n: u64) -> Self {
        Data::Word(n)
    }

    pub fn float(f: f64) -> Self {
        Data::Word(f.to_bits())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Data::Zero)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Word(w) => Some(*w != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Data::Word(w) => Some(*w as i64),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Data::Word(w) => Some(*w),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Data::Word(w) => Some(f64::from_bits(*w)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'v str> {
        match self {
            Data::Str(s) => Some(*s),
            _ => None,
        }
    }

    /// The borrowed referent, if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&'v T> {
        match self {
            Data::Ref(r) => (*r).downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Data<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Zero => f.write_str("Zero"),
            Data::Word(w) => write!(f, "Word({w:#x})"),
            Data::Str(s) => write!(f, "Str({s:?})"),
            Data::Ref(r) => write!(f, "Ref({:p})", *r as *const dyn Any),
        }
    }
}

/// Words and strings compare by value, references by address.
impl PartialEq for Data<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Data::Zero, Data::Zero) => true,
            (Data::Word(a), Data::Word(b)) => a == b,
            (Data::Str(a), Data::Str(b)) => a == b,
            (Data::Ref(a), Data::Ref(b)) => std::ptr::addr_eq(*a, *b),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Box value
// ---------------------------------------------------------------------------

/// A box value: the descriptor of the variant it holds, and its data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxValue<'v> {
    descriptor: Option<TypeRef>,
    data: Data<'v>,
}

impl<'v> BoxValue<'v> {
    /// The zero box: holds no variant.
    pub const EMPTY: BoxValue<'static> = BoxValue {
        descriptor: None,
        data: Data::Zero,
    };

    pub fn new(descriptor: TypeRef, data: Data<'v>) -> Self {
        Self {
            descriptor: Some(descriptor),
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.descriptor.is_none()
    }

    pub fn descriptor(&self) -> Option<TypeRef> {
        self.descriptor
    }

    pub fn data(&self) -> Data<'v> {
        self.data
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single-value assertion named a type the box does not hold.
///
/// Carries the descriptors of both types, and their printed forms so the
/// error renders without the table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeAssertionError {
    #[error("box type assertion failed: value holds {concrete_repr}, not {asserted_repr}")]
    Mismatch {
        concrete: TypeRef,
        asserted: TypeRef,
        concrete_repr: String,
        asserted_repr: String,
    },
    #[error("box type assertion failed: value is empty, not {asserted_repr}")]
    Empty {
        asserted: TypeRef,
        asserted_repr: String,
    },
}

impl TypeAssertionError {
    fn mismatch(table: &DescriptorTable, concrete: TypeRef, asserted: TypeRef) -> Self {
        TypeAssertionError::Mismatch {
            concrete,
            asserted,
            concrete_repr: table.repr(concrete).to_string(),
            asserted_repr: table.repr(asserted).to_string(),
        }
    }

    fn empty(table: &DescriptorTable, asserted: TypeRef) -> Self {
        TypeAssertionError::Empty {
            asserted,
            asserted_repr: table.repr(asserted).to_string(),
        }
    }

    pub fn asserted(&self) -> TypeRef {
        match self {
            TypeAssertionError::Mismatch { asserted, .. }
            | TypeAssertionError::Empty { asserted, .. } => *asserted,
        }
    }

    /// The type the box actually held, if any.
    pub fn concrete(&self) -> Option<TypeRef> {
        match self {
            TypeAssertionError::Mismatch { concrete, .. } => Some(*concrete),
            TypeAssertionError::Empty { .. } => None,
        }
    }

    pub fn asserted_repr(&self) -> &str {
        match self {
            TypeAssertionError::Mismatch { asserted_repr, .. }
            | TypeAssertionError::Empty { asserted_repr, .. } => asserted_repr,
        }
    }

    pub fn concrete_repr(&self) -> Option<&str> {
        match self {
            TypeAssertionError::Mismatch { concrete_repr, .. } => Some(concrete_repr),
            TypeAssertionError::Empty { .. } => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssertError {
    #[error(transparent)]
    Failed(#[from] TypeAssertionError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Resolves type assertions on box values against one descriptor table.
#[derive(Debug)]
pub struct Matcher<'t, C = Standard> {
    table: &'t DescriptorTable,
    comparator: C,
}

impl<'t> Matcher<'t, Standard> {
    pub fn new(table: &'t DescriptorTable) -> Self {
        Self::with_comparator(table, Standard::new())
    }
}

impl<'t, C: Comparator> Matcher<'t, C> {
    pub fn with_comparator(table: &'t DescriptorTable, comparator: C) -> Self {
        Self { table, comparator }
    }

    pub fn table(&self) -> &'t DescriptorTable {
        self.table
    }

    /// `v, ok := b.(T)`: the data and true if `value` holds `target`,
    /// otherwise the zero data and false.
    pub fn assert_checked<'v>(
        &mut self,
        value: BoxValue<'v>,
        target: TypeRef,
    ) -> Result<(Data<'v>, bool), IdentityError> {
        let Some(held) = value.descriptor else {
            return Ok((Data::Zero, false));
        };
        if self.comparator.identical(self.table, held, target)? {
            Ok((value.data, true))
        } else {
            Ok((Data::Zero, false))
        }
    }

    /// `v := b.(T)`: the data if `value` holds `target`.
    ///
    /// Only a failed assertion allocates, to render the two type names.
    pub fn assert_single<'v>(
        &mut self,
        value: BoxValue<'v>,
        target: TypeRef,
    ) -> Result<Data<'v>, AssertError> {
        let Some(held) = value.descriptor else {
            return Err(TypeAssertionError::empty(self.table, target).into());
        };
        if self.comparator.identical(self.table, held, target)? {
            return Ok(value.data);
        }
        Err(TypeAssertionError::mismatch(self.table, held, target).into())
    }

    /// Like [`assert_single`](Self::assert_single), but a failed assertion
    /// is fatal.
    ///
    /// # Panics
    ///
    /// Panics with the assertion error if `value` does not hold `target`.
    pub fn must_assert<'v>(&mut self, value: BoxValue<'v>, target: TypeRef) -> Data<'v> {
        match self.assert_single(value, target) {
            Ok(data) => data,
            Err(err) => panic!("{err}"),
        }
    }
}
