//! Type representations for coffer.
//!
//! This crate defines the semantic types used by the checker. These are
//! distinct from syntactic type expressions (which live in `coffer-ast`).
//! Named types are referenced by [`NamedId`] and resolved through a
//! [`Universe`], so recursive type graphs never need recursive ownership.

mod box_type;
mod universe;

use std::fmt;
use std::sync::Arc;

pub use box_type::{BoxType, EmptyBoxConstruction};
pub use universe::{DeclHead, NamedInfo, NamedState, Universe};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a named (defined) type within a [`Universe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamedId(pub u32);

/// A reference to a named type. Identity is the id; the name is carried for
/// display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedType {
    pub id: NamedId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Basic types
// ---------------------------------------------------------------------------

/// Predeclared basic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicKind {
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
}

impl BasicKind {
    pub const ALL: [BasicKind; 17] = [
        BasicKind::Bool,
        BasicKind::Int,
        BasicKind::Int8,
        BasicKind::Int16,
        BasicKind::Int32,
        BasicKind::Int64,
        BasicKind::Uint,
        BasicKind::Uint8,
        BasicKind::Uint16,
        BasicKind::Uint32,
        BasicKind::Uint64,
        BasicKind::Uintptr,
        BasicKind::Float32,
        BasicKind::Float64,
        BasicKind::Complex64,
        BasicKind::Complex128,
        BasicKind::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::String => "string",
        }
    }

    /// Look up a predeclared type name. `byte` and `rune` are aliases.
    pub fn from_name(name: &str) -> Option<BasicKind> {
        match name {
            "byte" => Some(BasicKind::Uint8),
            "rune" => Some(BasicKind::Int32),
            _ => Self::ALL.into_iter().find(|kind| kind.name() == name),
        }
    }

    pub fn is_integer(self) -> bool {
        self.int_range().is_some()
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, BasicKind::Float32 | BasicKind::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, BasicKind::Complex64 | BasicKind::Complex128)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    /// Inclusive value range of an integer kind (64-bit platform).
    pub fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            BasicKind::Int8 => (i8::MIN as i128, i8::MAX as i128),
            BasicKind::Int16 => (i16::MIN as i128, i16::MAX as i128),
            BasicKind::Int32 => (i32::MIN as i128, i32::MAX as i128),
            BasicKind::Int | BasicKind::Int64 => (i64::MIN as i128, i64::MAX as i128),
            BasicKind::Uint8 => (0, u8::MAX as i128),
            BasicKind::Uint16 => (0, u16::MAX as i128),
            BasicKind::Uint32 => (0, u32::MAX as i128),
            BasicKind::Uint | BasicKind::Uint64 | BasicKind::Uintptr => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    /// Whether values of this kind fit in one machine word and can be stored
    /// inline in a box's data slot.
    pub fn is_word_sized(self) -> bool {
        !matches!(self, BasicKind::String | BasicKind::Complex128)
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of an untyped constant expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UntypedKind {
    Bool,
    Int,
    Rune,
    Float,
    String,
    Nil,
}

impl UntypedKind {
    /// The type an untyped constant takes when no context constrains it.
    pub fn default_type(self) -> Option<BasicKind> {
        match self {
            UntypedKind::Bool => Some(BasicKind::Bool),
            UntypedKind::Int => Some(BasicKind::Int),
            UntypedKind::Rune => Some(BasicKind::Int32),
            UntypedKind::Float => Some(BasicKind::Float64),
            UntypedKind::String => Some(BasicKind::String),
            UntypedKind::Nil => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, UntypedKind::Int | UntypedKind::Rune | UntypedKind::Float)
    }
}

// ---------------------------------------------------------------------------
// Constant values
// ---------------------------------------------------------------------------

/// Value of an untyped constant, where the checker knows it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(String),
}

/// Whether an untyped constant of `kind` (with optional known `value`) can be
/// represented by a value of the basic type `target`.
pub fn representable(kind: UntypedKind, value: Option<&ConstValue>, target: BasicKind) -> bool {
    match kind {
        UntypedKind::Bool => target == BasicKind::Bool,
        UntypedKind::String => target == BasicKind::String,
        UntypedKind::Nil => false,
        UntypedKind::Int | UntypedKind::Rune => {
            if target.is_float() || target.is_complex() {
                return true;
            }
            match (target.int_range(), value) {
                (Some((lo, hi)), Some(ConstValue::Int(v))) => (lo..=hi).contains(v),
                (Some(_), _) => true,
                (None, _) => false,
            }
        }
        UntypedKind::Float => {
            if target.is_float() || target.is_complex() {
                return true;
            }
            match (target.int_range(), value) {
                (Some((lo, hi)), Some(ConstValue::Float(v))) => {
                    v.fract() == 0.0 && *v >= lo as f64 && *v <= hi as f64
                }
                (Some((lo, hi)), Some(ConstValue::Int(v))) => (lo..=hi).contains(v),
                _ => false,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Composite types
// ---------------------------------------------------------------------------

/// Direction of a channel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub embedded: bool,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub sig: FuncType,
}

/// Interface type. Methods are kept sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    pub methods: Vec<Method>,
}

impl InterfaceType {
    pub fn new(mut methods: Vec<Method>) -> Self {
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        Self { methods }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A semantic type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Result of an earlier error. Accepted everywhere to avoid cascades.
    Invalid,
    Basic(BasicKind),
    Untyped(UntypedKind),
    Named(NamedType),
    Struct(StructType),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array(u64, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(ChanDir, Box<Type>),
    Func(FuncType),
    Interface(InterfaceType),
    /// A checked, frozen box type. Shared by every site that refers to it.
    Box(Arc<BoxType>),
    /// Multiple results of a call or a comma-ok form.
    Tuple(Vec<Type>),
}

impl Type {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Untyped(_))
    }

    pub fn named_id(&self) -> Option<NamedId> {
        match self {
            Type::Named(named) => Some(named.id),
            _ => None,
        }
    }

    pub fn as_basic(&self) -> Option<BasicKind> {
        match self {
            Type::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    /// The type a value of this type takes when stored in a variable without
    /// an explicit type.
    pub fn defaulted(&self) -> Type {
        match self {
            Type::Untyped(kind) => kind
                .default_type()
                .map(Type::Basic)
                .unwrap_or(Type::Invalid),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Invalid => write!(f, "invalid type"),
            Type::Basic(kind) => write!(f, "{kind}"),
            Type::Untyped(UntypedKind::Nil) => write!(f, "untyped nil"),
            Type::Untyped(kind) => match kind.default_type() {
                Some(BasicKind::Int32) => write!(f, "untyped rune"),
                Some(BasicKind::Float64) => write!(f, "untyped float"),
                Some(basic) => write!(f, "untyped {basic}"),
                None => write!(f, "untyped nil"),
            },
            Type::Named(named) => write!(f, "{}", named.name),
            Type::Struct(st) => {
                if st.fields.is_empty() {
                    return write!(f, "struct{{}}");
                }
                write!(f, "struct {{ ")?;
                for (i, field) in st.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                    if let Some(tag) = &field.tag {
                        write!(f, " {tag:?}")?;
                    }
                }
                write!(f, " }}")
            }
            Type::Pointer(elem) => write!(f, "*{elem}"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Array(len, elem) => write!(f, "[{len}]{elem}"),
            Type::Map(key, value) => write!(f, "map[{key}]{value}"),
            Type::Chan(ChanDir::Both, elem) => write!(f, "chan {elem}"),
            Type::Chan(ChanDir::Send, elem) => write!(f, "chan<- {elem}"),
            Type::Chan(ChanDir::Recv, elem) => write!(f, "<-chan {elem}"),
            Type::Func(func) => {
                write!(f, "func")?;
                write_signature(f, func)
            }
            Type::Interface(iface) => {
                if iface.methods.is_empty() {
                    return write!(f, "interface{{}}");
                }
                write!(f, "interface {{ ")?;
                for (i, method) in iface.methods.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", method.name)?;
                    write_signature(f, &method.sig)?;
                }
                write!(f, " }}")
            }
            Type::Box(boxed) => write!(f, "{boxed}"),
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_signature(f: &mut fmt::Formatter<'_>, func: &FuncType) -> fmt::Result {
    write!(f, "(")?;
    for (i, param) in func.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if func.variadic && i + 1 == func.params.len() {
            // variadic parameters are carried as slices
            match param {
                Type::Slice(elem) => write!(f, "...{elem}")?,
                other => write!(f, "...{other}")?,
            }
        } else {
            write!(f, "{param}")?;
        }
    }
    write!(f, ")")?;
    match func.results.as_slice() {
        [] => Ok(()),
        [single] => write!(f, " {single}"),
        many => {
            write!(f, " (")?;
            for (i, result) in many.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{result}")?;
            }
            write!(f, ")")
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Type identity.
///
/// Named types are identical only to themselves (by id), so the comparison
/// never follows a named type into its underlying type and terminates on
/// recursive type graphs. Box types are identical when they hold the same set
/// of variants, regardless of declaration order.
pub fn identical(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Invalid, Type::Invalid) => true,
        (Type::Basic(x), Type::Basic(y)) => x == y,
        (Type::Untyped(x), Type::Untyped(y)) => x == y,
        (Type::Named(x), Type::Named(y)) => x.id == y.id,
        (Type::Struct(x), Type::Struct(y)) => {
            x.fields.len() == y.fields.len()
                && x.fields.iter().zip(&y.fields).all(|(fx, fy)| {
                    fx.name == fy.name
                        && fx.embedded == fy.embedded
                        && fx.tag == fy.tag
                        && identical(&fx.ty, &fy.ty)
                })
        }
        (Type::Pointer(x), Type::Pointer(y)) | (Type::Slice(x), Type::Slice(y)) => {
            identical(x, y)
        }
        (Type::Array(lx, x), Type::Array(ly, y)) => lx == ly && identical(x, y),
        (Type::Map(kx, vx), Type::Map(ky, vy)) => identical(kx, ky) && identical(vx, vy),
        (Type::Chan(dx, x), Type::Chan(dy, y)) => dx == dy && identical(x, y),
        (Type::Func(x), Type::Func(y)) => identical_signatures(x, y),
        (Type::Interface(x), Type::Interface(y)) => {
            x.methods.len() == y.methods.len()
                && x.methods.iter().zip(&y.methods).all(|(mx, my)| {
                    mx.name == my.name && identical_signatures(&mx.sig, &my.sig)
                })
        }
        (Type::Box(x), Type::Box(y)) => {
            Arc::ptr_eq(x, y)
                || (x.len() == y.len() && x.variants().iter().all(|v| y.contains(v)))
        }
        (Type::Tuple(x), Type::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(ex, ey)| identical(ex, ey))
        }
        _ => false,
    }
}

fn identical_signatures(x: &FuncType, y: &FuncType) -> bool {
    x.variadic == y.variadic
        && x.params.len() == y.params.len()
        && x.results.len() == y.results.len()
        && x.params.iter().zip(&y.params).all(|(a, b)| identical(a, b))
        && x.results.iter().zip(&y.results).all(|(a, b)| identical(a, b))
}
