//! Structural type identity over descriptors.
//!
//! Two descriptors are identical when they have the same kind and name and
//! their shapes match, recursively. Identity is decided with an explicit
//! worklist of descriptor pairs. Basic children are compared in place and
//! never queued.
//!
//! Every cycle in a descriptor table passes through a named descriptor:
//! lowering only reserves slots for named types, and
//! [`DescriptorTable::fill`] refuses anonymous descriptors. So only named
//! pairs are recorded as visited, and a named pair seen before is assumed
//! equal, which makes the comparison terminate on cyclic types.
//!
//! The worklist storage is the comparator's choice: [`Standard`] uses heap
//! collections, [`Bootstrap`] uses fixed-size arrays and never allocates, so
//! it can run before an allocator exists.

use std::collections::HashSet;

use thiserror::Error;

use crate::descriptor::{Descriptor, DescriptorTable, Shape, TypeRef};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    #[error("type identity comparison exceeded its capacity of {capacity} descriptor pairs")]
    CapacityExceeded { capacity: usize },
    #[error("type reference {0} is not in the descriptor table")]
    UnknownType(TypeRef),
}

/// Decides whether two descriptors denote the same type.
pub trait Comparator {
    fn identical(
        &mut self,
        table: &DescriptorTable,
        a: TypeRef,
        b: TypeRef,
    ) -> Result<bool, IdentityError>;
}

/// Storage for the pending and visited pairs of one comparison.
trait Worklist {
    fn reset(&mut self);
    fn push(&mut self, pair: (TypeRef, TypeRef)) -> Result<(), IdentityError>;
    fn pop(&mut self) -> Option<(TypeRef, TypeRef)>;
    /// Record `pair` as visited. Returns false if it already was.
    fn visit(&mut self, pair: (TypeRef, TypeRef)) -> Result<bool, IdentityError>;
}

fn resolve(table: &DescriptorTable, r: TypeRef) -> Result<&Descriptor, IdentityError> {
    table.get(r).ok_or(IdentityError::UnknownType(r))
}

fn compare<W: Worklist>(
    work: &mut W,
    table: &DescriptorTable,
    a: TypeRef,
    b: TypeRef,
) -> Result<bool, IdentityError> {
    work.reset();
    work.push((a, b))?;
    while let Some((a, b)) = work.pop() {
        if a == b {
            continue;
        }
        let da = resolve(table, a)?;
        let db = resolve(table, b)?;
        if da.kind != db.kind || da.name != db.name {
            return Ok(false);
        }
        if da.name.is_some() && !work.visit((a, b))? {
            continue;
        }
        if !same_shape(table, &da.shape, &db.shape, work)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Compare a pair of children. Basic leaves are decided here, anything
/// else is queued.
fn child<W: Worklist>(
    table: &DescriptorTable,
    a: TypeRef,
    b: TypeRef,
    work: &mut W,
) -> Result<bool, IdentityError> {
    if a == b {
        return Ok(true);
    }
    let da = resolve(table, a)?;
    let db = resolve(table, b)?;
    if da.kind != db.kind || da.name != db.name {
        return Ok(false);
    }
    match (&da.shape, &db.shape) {
        (Shape::Basic, Shape::Basic) => Ok(true),
        _ => {
            work.push((a, b))?;
            Ok(true)
        }
    }
}

/// Compare the non-reference parts of two shapes and their children
/// pairwise.
fn same_shape<W: Worklist>(
    table: &DescriptorTable,
    a: &Shape,
    b: &Shape,
    work: &mut W,
) -> Result<bool, IdentityError> {
    match (a, b) {
        (Shape::Basic, Shape::Basic) => Ok(true),
        (Shape::Array { len: la, elem: ea }, Shape::Array { len: lb, elem: eb }) => {
            Ok(la == lb && child(table, *ea, *eb, work)?)
        }
        (Shape::Chan { dir: da, elem: ea }, Shape::Chan { dir: db, elem: eb }) => {
            Ok(da == db && child(table, *ea, *eb, work)?)
        }
        (Shape::Pointer { elem: ea }, Shape::Pointer { elem: eb })
        | (Shape::Slice { elem: ea }, Shape::Slice { elem: eb }) => child(table, *ea, *eb, work),
        (Shape::Map { key: ka, value: va }, Shape::Map { key: kb, value: vb }) => {
            Ok(child(table, *ka, *kb, work)? && child(table, *va, *vb, work)?)
        }
        (
            Shape::Func {
                params: pa,
                results: ra,
                variadic: va,
            },
            Shape::Func {
                params: pb,
                results: rb,
                variadic: vb,
            },
        ) => {
            if va != vb || pa.len() != pb.len() || ra.len() != rb.len() {
                return Ok(false);
            }
            for (x, y) in pa.iter().zip(pb).chain(ra.iter().zip(rb)) {
                if !child(table, *x, *y, work)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Shape::Interface { methods: ma }, Shape::Interface { methods: mb }) => {
            if ma.len() != mb.len() {
                return Ok(false);
            }
            for (x, y) in ma.iter().zip(mb) {
                if x.name != y.name || !child(table, x.ty, y.ty, work)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Shape::Struct { fields: fa }, Shape::Struct { fields: fb }) => {
            if fa.len() != fb.len() {
                return Ok(false);
            }
            for (x, y) in fa.iter().zip(fb) {
                if x.name != y.name || x.embedded != y.embedded || x.tag != y.tag {
                    return Ok(false);
                }
                if !child(table, x.ty, y.ty, work)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Shape::Box { variants: va }, Shape::Box { variants: vb }) => {
            if va.len() != vb.len() {
                return Ok(false);
            }
            for (x, y) in va.iter().zip(vb) {
                if !child(table, *x, *y, work)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Standard comparator
// ---------------------------------------------------------------------------

/// Heap-backed comparator without a depth limit. Its buffers are reused
/// across comparisons.
#[derive(Debug, Default)]
pub struct Standard {
    pending: Vec<(TypeRef, TypeRef)>,
    visited: HashSet<(TypeRef, TypeRef)>,
}

impl Standard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Worklist for Standard {
    fn reset(&mut self) {
        self.pending.clear();
        self.visited.clear();
    }

    fn push(&mut self, pair: (TypeRef, TypeRef)) -> Result<(), IdentityError> {
        self.pending.push(pair);
        Ok(())
    }

    fn pop(&mut self) -> Option<(TypeRef, TypeRef)> {
        self.pending.pop()
    }

    fn visit(&mut self, pair: (TypeRef, TypeRef)) -> Result<bool, IdentityError> {
        Ok(self.visited.insert(pair))
    }
}

impl Comparator for Standard {
    fn identical(
        &mut self,
        table: &DescriptorTable,
        a: TypeRef,
        b: TypeRef,
    ) -> Result<bool, IdentityError> {
        compare(self, table, a, b)
    }
}

// ---------------------------------------------------------------------------
// Bootstrap comparator
// ---------------------------------------------------------------------------

/// Default number of pending and of visited pairs a [`Bootstrap`]
/// comparator can hold.
pub const BOOTSTRAP_CAPACITY: usize = 64;

/// Allocation-free comparator for use before the runtime is initialized.
///
/// Holds at most `N` pending pairs and `N` visited pairs. Pending pairs are
/// the compound children not yet compared; visited pairs are the named
/// types compared so far. Running out of either is reported as
/// [`IdentityError::CapacityExceeded`].
#[derive(Debug, Clone)]
pub struct Bootstrap<const N: usize = BOOTSTRAP_CAPACITY> {
    pending: [(TypeRef, TypeRef); N],
    pending_len: usize,
    visited: [(TypeRef, TypeRef); N],
    visited_len: usize,
}

impl<const N: usize> Bootstrap<N> {
    const EMPTY_PAIR: (TypeRef, TypeRef) = (TypeRef(0), TypeRef(0));

    pub const fn new() -> Self {
        Self {
            pending: [Self::EMPTY_PAIR; N],
            pending_len: 0,
            visited: [Self::EMPTY_PAIR; N],
            visited_len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for Bootstrap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Worklist for Bootstrap<N> {
    fn reset(&mut self) {
        self.pending_len = 0;
        self.visited_len = 0;
    }

    fn push(&mut self, pair: (TypeRef, TypeRef)) -> Result<(), IdentityError> {
        let slot = self
            .pending
            .get_mut(self.pending_len)
            .ok_or(IdentityError::CapacityExceeded { capacity: N })?;
        *slot = pair;
        self.pending_len += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<(TypeRef, TypeRef)> {
        self.pending_len = self.pending_len.checked_sub(1)?;
        Some(self.pending[self.pending_len])
    }

    fn visit(&mut self, pair: (TypeRef, TypeRef)) -> Result<bool, IdentityError> {
        if self.visited[..self.visited_len].contains(&pair) {
            return Ok(false);
        }
        let slot = self
            .visited
            .get_mut(self.visited_len)
            .ok_or(IdentityError::CapacityExceeded { capacity: N })?;
        *slot = pair;
        self.visited_len += 1;
        Ok(true)
    }
}

impl<const N: usize> Comparator for Bootstrap<N> {
    fn identical(
        &mut self,
        table: &DescriptorTable,
        a: TypeRef,
        b: TypeRef,
    ) -> Result<bool, IdentityError> {
        compare(self, table, a, b)
    }
}
