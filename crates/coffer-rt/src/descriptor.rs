//! Runtime type descriptors.
//!
//! Descriptors live in a [`DescriptorTable`] and refer to each other by
//! [`TypeRef`] index, so recursive types are plain cycles of indices. A slot
//! can be reserved before its descriptor is known, which is how a named type
//! that refers to itself is lowered.

use std::fmt;

use thiserror::Error;

/// Index of a descriptor in its [`DescriptorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(pub u32);

impl TypeRef {
    /// The reference `self` becomes after its table is appended at `base`.
    pub fn offset(self, base: u32) -> Option<TypeRef> {
        self.0.checked_add(base).map(TypeRef)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a runtime type. Every basic kind has its own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    Array,
    Chan,
    Func,
    Interface,
    Map,
    Pointer,
    Slice,
    Struct,
    Box,
}

impl Kind {
    pub fn is_basic(self) -> bool {
        !matches!(
            self,
            Kind::Array
                | Kind::Chan
                | Kind::Func
                | Kind::Interface
                | Kind::Map
                | Kind::Pointer
                | Kind::Slice
                | Kind::Struct
                | Kind::Box
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: String,
    pub ty: TypeRef,
    pub embedded: bool,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDesc {
    pub name: String,
    /// Descriptor of the method's function type.
    pub ty: TypeRef,
}

/// Kind-specific structure of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Basic,
    Array { len: u64, elem: TypeRef },
    Chan { dir: ChanDir, elem: TypeRef },
    Func {
        params: Vec<TypeRef>,
        results: Vec<TypeRef>,
        variadic: bool,
    },
    /// Methods sorted by name.
    Interface { methods: Vec<MethodDesc> },
    Map { key: TypeRef, value: TypeRef },
    Pointer { elem: TypeRef },
    Slice { elem: TypeRef },
    Struct { fields: Vec<FieldDesc> },
    Box { variants: Vec<TypeRef> },
}

/// A runtime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: Kind,
    /// Qualified name (`pkg.Name`) of a named type.
    pub name: Option<String>,
    /// How the type is printed in assertion failures.
    pub repr: String,
    pub shape: Shape,
}

impl Descriptor {
    pub fn basic(kind: Kind, repr: impl Into<String>) -> Self {
        Self {
            kind,
            name: None,
            repr: repr.into(),
            shape: Shape::Basic,
        }
    }

    /// Attach a qualified name, making this a named type.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.repr = name.clone();
        self.name = Some(name);
        self
    }

    /// Every descriptor this one refers to, in shape order.
    pub fn children(&self) -> Vec<TypeRef> {
        match &self.shape {
            Shape::Basic => Vec::new(),
            Shape::Array { elem, .. }
            | Shape::Chan { elem, .. }
            | Shape::Pointer { elem }
            | Shape::Slice { elem } => vec![*elem],
            Shape::Map { key, value } => vec![*key, *value],
            Shape::Func {
                params, results, ..
            } => params.iter().chain(results).copied().collect(),
            Shape::Interface { methods } => methods.iter().map(|m| m.ty).collect(),
            Shape::Struct { fields } => fields.iter().map(|f| f.ty).collect(),
            Shape::Box { variants } => variants.clone(),
        }
    }

    fn relocate(&mut self, base: u32) -> Result<(), TableError> {
        let mut overflow = None;
        let mut shift = |r: &mut TypeRef| match r.offset(base) {
            Some(moved) => *r = moved,
            None => overflow = Some(*r),
        };
        match &mut self.shape {
            Shape::Basic => {}
            Shape::Array { elem, .. }
            | Shape::Chan { elem, .. }
            | Shape::Pointer { elem }
            | Shape::Slice { elem } => shift(elem),
            Shape::Map { key, value } => {
                shift(key);
                shift(value);
            }
            Shape::Func {
                params, results, ..
            } => params.iter_mut().chain(results.iter_mut()).for_each(shift),
            Shape::Interface { methods } => methods.iter_mut().for_each(|m| shift(&mut m.ty)),
            Shape::Struct { fields } => fields.iter_mut().for_each(|f| shift(&mut f.ty)),
            Shape::Box { variants } => variants.iter_mut().for_each(shift),
        }
        match overflow {
            Some(r) => Err(TableError::Overflow { r, base }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    #[error("descriptor table is full: cannot add {extra} slots to {len}")]
    Full { len: usize, extra: usize },
    #[error("type reference {r} overflows when relocated by {base}")]
    Overflow { r: TypeRef, base: u32 },
}

/// Maps references of an appended table into the table it was appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    base: u32,
}

impl Relocation {
    /// `r` in the combined table, or `None` if it falls outside it.
    pub fn apply(self, r: TypeRef) -> Option<TypeRef> {
        r.offset(self.base)
    }
}

/// Every descriptor of a program, indexed by [`TypeRef`].
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    slots: Vec<Option<Descriptor>>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: Descriptor) -> TypeRef {
        let r = self.next_ref();
        self.slots.push(Some(descriptor));
        r
    }

    /// Reserve a slot to be filled later with [`fill`](Self::fill).
    pub fn reserve(&mut self) -> TypeRef {
        let r = self.next_ref();
        self.slots.push(None);
        r
    }

    /// Fill a reserved slot with a named descriptor. Returns false if `r` is
    /// not a reserved slot or `descriptor` has no name.
    ///
    /// Only named types may refer back to themselves, so every cycle in the
    /// table passes through a named descriptor.
    pub fn fill(&mut self, r: TypeRef, descriptor: Descriptor) -> bool {
        if descriptor.name.is_none() {
            return false;
        }
        match self.slots.get_mut(r.0 as usize) {
            Some(slot @ None) => {
                *slot = Some(descriptor);
                true
            }
            _ => false,
        }
    }

    /// The descriptor at `r`, if it exists and is filled.
    pub fn get(&self, r: TypeRef) -> Option<&Descriptor> {
        self.slots.get(r.0 as usize)?.as_ref()
    }

    /// Printable form of `r`, for messages.
    pub fn repr(&self, r: TypeRef) -> &str {
        self.get(r).map_or("<unknown type>", |d| d.repr.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reserved slots that were never filled.
    pub fn unfilled(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| TypeRef(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeRef, &Descriptor)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|d| (TypeRef(i as u32), d)))
    }

    /// Find the first descriptor carrying a qualified name.
    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.iter()
            .find(|(_, d)| d.name.as_deref() == Some(name))
            .map(|(r, _)| r)
    }

    /// Append every descriptor of `other`, as when linking a separately
    /// lowered module. Descriptors are copied, not merged: the same type
    /// appears twice and is only equal to itself through identity
    /// comparison.
    ///
    /// Fails, leaving `self` unchanged, if the combined table would not be
    /// addressable by a [`TypeRef`].
    pub fn append(&mut self, other: &DescriptorTable) -> Result<Relocation, TableError> {
        let full = TableError::Full {
            len: self.slots.len(),
            extra: other.slots.len(),
        };
        let base = u32::try_from(self.slots.len()).map_err(|_| full)?;
        let end = u32::try_from(other.slots.len())
            .ok()
            .and_then(|extra| base.checked_add(extra));
        if end.is_none() {
            return Err(full);
        }
        let mut moved = Vec::with_capacity(other.slots.len());
        for slot in &other.slots {
            moved.push(match slot {
                Some(d) => {
                    let mut d = d.clone();
                    d.relocate(base)?;
                    Some(d)
                }
                None => None,
            });
        }
        self.slots.extend(moved);
        Ok(Relocation { base })
    }

    fn next_ref(&self) -> TypeRef {
        TypeRef(self.slots.len() as u32)
    }
}
