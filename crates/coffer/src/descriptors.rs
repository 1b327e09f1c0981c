//! Lowering of checked types into runtime descriptors.
//!
//! Each named type is lowered once per [`Descriptors`] and memoized by its
//! [`NamedId`]. Its slot is reserved before the underlying type is lowered,
//! so a named type reachable from its own underlying type (a struct holding
//! a pointer to itself, a box naming a struct that names the box) lowers to
//! a cycle of [`TypeRef`]s. Anonymous types are not shared: every occurrence
//! gets its own descriptor.

use std::collections::HashMap;

use coffer_rt::{
    ChanDir as RtChanDir, Descriptor, DescriptorTable, FieldDesc, Kind, MethodDesc, Shape,
    TypeRef,
};
use coffer_types::{BasicKind, ChanDir, FuncType, NamedId, NamedState, NamedType, Type, Universe};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    #[error("cannot lower an invalid type")]
    Invalid,
    #[error("cannot lower untyped constant type `{repr}`")]
    Untyped { repr: String },
    #[error("cannot lower multi-value type `{repr}`")]
    Tuple { repr: String },
    #[error("named type `{name}` is not resolved")]
    Unresolved { name: String },
}

/// A descriptor table under construction, with the named types already
/// lowered into it.
#[derive(Debug, Clone, Default)]
pub struct Descriptors {
    table: DescriptorTable,
    named: HashMap<NamedId, TypeRef>,
}

impl Descriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    pub fn into_table(self) -> DescriptorTable {
        self.table
    }

    /// The descriptor of a named type, if it has been lowered.
    pub fn named(&self, id: NamedId) -> Option<TypeRef> {
        self.named.get(&id).copied()
    }

    /// Lower `ty`, adding its descriptor and any it refers to.
    pub fn lower(&mut self, universe: &Universe, ty: &Type) -> Result<TypeRef, LowerError> {
        match ty {
            Type::Named(named) => self.lower_named(universe, named),
            other => {
                let descriptor = self.describe(universe, other)?;
                Ok(self.table.push(descriptor))
            }
        }
    }

    fn lower_named(&mut self, universe: &Universe, named: &NamedType) -> Result<TypeRef, LowerError> {
        if let Some(r) = self.named.get(&named.id) {
            return Ok(*r);
        }
        let qualified = universe
            .qualified_name(named.id)
            .unwrap_or_else(|| named.name.clone());
        let underlying = match universe.state(named.id) {
            Some(NamedState::Complete(underlying)) => underlying,
            _ => return Err(LowerError::Unresolved { name: qualified }),
        };

        let slot = self.table.reserve();
        self.named.insert(named.id, slot);
        let descriptor = match self.describe_named(universe, underlying, &qualified) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.named.remove(&named.id);
                return Err(err);
            }
        };
        self.table.fill(slot, descriptor);
        tracing::trace!(name = %qualified, slot = %slot, "lowered named type");
        Ok(slot)
    }

    /// The descriptor of a named type whose underlying type is `underlying`.
    fn describe_named(
        &mut self,
        universe: &Universe,
        underlying: &Type,
        qualified: &str,
    ) -> Result<Descriptor, LowerError> {
        match underlying {
            // `type A B`: A has B's structure but its own name.
            Type::Named(inner) => {
                let inner_ref = self.lower_named(universe, inner)?;
                let Some(inner_desc) = self.table.get(inner_ref).cloned() else {
                    return Err(LowerError::Unresolved {
                        name: universe
                            .qualified_name(inner.id)
                            .unwrap_or_else(|| inner.name.clone()),
                    });
                };
                Ok(inner_desc.named(qualified))
            }
            other => Ok(self.describe(universe, other)?.named(qualified)),
        }
    }

    /// Build the descriptor of an anonymous type, lowering its children.
    fn describe(&mut self, universe: &Universe, ty: &Type) -> Result<Descriptor, LowerError> {
        let (kind, shape) = match ty {
            Type::Invalid => return Err(LowerError::Invalid),
            Type::Untyped(_) => {
                return Err(LowerError::Untyped {
                    repr: ty.to_string(),
                });
            }
            Type::Tuple(_) => {
                return Err(LowerError::Tuple {
                    repr: ty.to_string(),
                });
            }
            Type::Named(_) => {
                let r = self.lower(universe, ty)?;
                return self
                    .table
                    .get(r)
                    .cloned()
                    .ok_or_else(|| LowerError::Unresolved {
                        name: ty.to_string(),
                    });
            }
            Type::Basic(kind) => return Ok(Descriptor::basic(basic_kind(*kind), kind.name())),
            Type::Pointer(elem) => (Kind::Pointer, Shape::Pointer {
                elem: self.lower(universe, elem)?,
            }),
            Type::Slice(elem) => (Kind::Slice, Shape::Slice {
                elem: self.lower(universe, elem)?,
            }),
            Type::Array(len, elem) => (Kind::Array, Shape::Array {
                len: *len,
                elem: self.lower(universe, elem)?,
            }),
            Type::Map(key, value) => (Kind::Map, Shape::Map {
                key: self.lower(universe, key)?,
                value: self.lower(universe, value)?,
            }),
            Type::Chan(dir, elem) => (Kind::Chan, Shape::Chan {
                dir: chan_dir(*dir),
                elem: self.lower(universe, elem)?,
            }),
            Type::Func(func) => (Kind::Func, self.func_shape(universe, func)?),
            Type::Struct(st) => {
                let mut fields = Vec::with_capacity(st.fields.len());
                for field in &st.fields {
                    fields.push(FieldDesc {
                        name: field.name.clone(),
                        ty: self.lower(universe, &field.ty)?,
                        embedded: field.embedded,
                        tag: field.tag.clone(),
                    });
                }
                (Kind::Struct, Shape::Struct { fields })
            }
            Type::Interface(iface) => {
                let mut methods = Vec::with_capacity(iface.methods.len());
                for method in &iface.methods {
                    let shape = self.func_shape(universe, &method.sig)?;
                    let ty = self.table.push(Descriptor {
                        kind: Kind::Func,
                        name: None,
                        repr: Type::Func(method.sig.clone()).to_string(),
                        shape,
                    });
                    methods.push(MethodDesc {
                        name: method.name.clone(),
                        ty,
                    });
                }
                (Kind::Interface, Shape::Interface { methods })
            }
            Type::Box(boxed) => {
                let mut variants = Vec::with_capacity(boxed.len());
                for variant in boxed.variants() {
                    variants.push(self.lower(universe, variant)?);
                }
                (Kind::Box, Shape::Box { variants })
            }
        };
        Ok(Descriptor {
            kind,
            name: None,
            repr: ty.to_string(),
            shape,
        })
    }

    fn func_shape(&mut self, universe: &Universe, func: &FuncType) -> Result<Shape, LowerError> {
        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            params.push(self.lower(universe, param)?);
        }
        let mut results = Vec::with_capacity(func.results.len());
        for result in &func.results {
            results.push(self.lower(universe, result)?);
        }
        Ok(Shape::Func {
            params,
            results,
            variadic: func.variadic,
        })
    }
}

/// Lower every type in `types` into one fresh table.
pub fn lower_types<'a>(
    universe: &Universe,
    types: impl IntoIterator<Item = &'a Type>,
) -> Result<(DescriptorTable, Vec<TypeRef>), LowerError> {
    let mut descriptors = Descriptors::new();
    let refs = types
        .into_iter()
        .map(|ty| descriptors.lower(universe, ty))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((descriptors.into_table(), refs))
}

fn basic_kind(kind: BasicKind) -> Kind {
    match kind {
        BasicKind::Bool => Kind::Bool,
        BasicKind::Int => Kind::Int,
        BasicKind::Int8 => Kind::Int8,
        BasicKind::Int16 => Kind::Int16,
        BasicKind::Int32 => Kind::Int32,
        BasicKind::Int64 => Kind::Int64,
        BasicKind::Uint => Kind::Uint,
        BasicKind::Uint8 => Kind::Uint8,
        BasicKind::Uint16 => Kind::Uint16,
        BasicKind::Uint32 => Kind::Uint32,
        BasicKind::Uint64 => Kind::Uint64,
        BasicKind::Uintptr => Kind::Uintptr,
        BasicKind::Float32 => Kind::Float32,
        BasicKind::Float64 => Kind::Float64,
        BasicKind::Complex64 => Kind::Complex64,
        BasicKind::Complex128 => Kind::Complex128,
        BasicKind::String => Kind::String,
    }
}

fn chan_dir(dir: ChanDir) -> RtChanDir {
    match dir {
        ChanDir::Both => RtChanDir::Both,
        ChanDir::Send => RtChanDir::Send,
        ChanDir::Recv => RtChanDir::Recv,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use coffer_rt::{Comparator, Standard};
    use coffer_types::{BoxType, Field, StructType};

    use super::*;

    fn int() -> Type {
        Type::Basic(BasicKind::Int)
    }

    fn string() -> Type {
        Type::Basic(BasicKind::String)
    }

    #[test]
    fn basic_types_keep_their_names() {
        let universe = Universe::new();
        let (table, refs) = lower_types(&universe, &[int(), string()]).unwrap();
        assert_eq!(table.repr(refs[0]), "int");
        assert_eq!(table.get(refs[1]).unwrap().kind, Kind::String);
        assert_eq!(table.get(refs[1]).unwrap().name, None);
    }

    #[test]
    fn named_types_are_qualified_and_memoized() {
        let mut universe = Universe::new();
        let celsius = universe.declare("Celsius", "main");
        universe.complete(celsius.id, Type::Basic(BasicKind::Float64));
        let named = Type::Named(celsius.clone());

        let mut descriptors = Descriptors::new();
        let first = descriptors.lower(&universe, &named).unwrap();
        let second = descriptors.lower(&universe, &named).unwrap();
        assert_eq!(first, second);
        assert_eq!(descriptors.named(celsius.id), Some(first));

        let desc = descriptors.table().get(first).unwrap();
        assert_eq!(desc.kind, Kind::Float64);
        assert_eq!(desc.name.as_deref(), Some("main.Celsius"));
        assert_eq!(desc.repr, "main.Celsius");
    }

    #[test]
    fn recursive_named_struct_lowers_to_a_cycle() {
        let mut universe = Universe::new();
        let node = universe.declare("Node", "main");
        universe.complete(
            node.id,
            Type::Struct(StructType {
                fields: vec![
                    Field {
                        name: "value".into(),
                        ty: int(),
                        embedded: false,
                        tag: None,
                    },
                    Field {
                        name: "next".into(),
                        ty: Type::Pointer(Box::new(Type::Named(node.clone()))),
                        embedded: false,
                        tag: Some("json:\"next\"".into()),
                    },
                ],
            }),
        );

        let mut descriptors = Descriptors::new();
        let r = descriptors.lower(&universe, &Type::Named(node)).unwrap();
        let table = descriptors.table();
        assert_eq!(table.unfilled().count(), 0);

        let Shape::Struct { fields } = &table.get(r).unwrap().shape else {
            panic!("expected a struct descriptor");
        };
        let Shape::Pointer { elem } = table.get(fields[1].ty).unwrap().shape else {
            panic!("expected a pointer descriptor");
        };
        assert_eq!(elem, r);
        assert_eq!(fields[1].tag.as_deref(), Some("json:\"next\""));
    }

    #[test]
    fn box_variants_keep_declaration_order() {
        let mut universe = Universe::new();
        let result = universe.declare("Result", "main");
        universe.complete(
            result.id,
            Type::Box(Arc::new(BoxType::new(vec![string(), int()]))),
        );

        let mut descriptors = Descriptors::new();
        let r = descriptors.lower(&universe, &Type::Named(result)).unwrap();
        let int_ref = descriptors.lower(&universe, &int()).unwrap();
        let table = descriptors.table();

        let desc = table.get(r).unwrap();
        assert_eq!(desc.kind, Kind::Box);
        let Shape::Box { variants } = &desc.shape else {
            panic!("expected a box descriptor");
        };
        assert_eq!(table.repr(variants[0]), "string");
        assert_ne!(variants[1], int_ref);
        assert_eq!(Standard::new().identical(table, variants[1], int_ref), Ok(true));
    }

    #[test]
    fn named_chain_takes_the_outer_name() {
        let mut universe = Universe::new();
        let inner = universe.declare("Inner", "lib");
        universe.complete(inner.id, Type::Slice(Box::new(int())));
        let outer = universe.declare("Outer", "lib");
        universe.complete(outer.id, Type::Named(inner));

        let (table, refs) = lower_types(&universe, &[Type::Named(outer)]).unwrap();
        let desc = table.get(refs[0]).unwrap();
        assert_eq!(desc.kind, Kind::Slice);
        assert_eq!(desc.repr, "lib.Outer");
    }

    #[test]
    fn unlowerable_types_are_errors() {
        let mut universe = Universe::new();
        let pending = universe.declare("Pending", "main");
        let cases = [
            (Type::Invalid, LowerError::Invalid),
            (
                Type::Untyped(coffer_types::UntypedKind::Float),
                LowerError::Untyped {
                    repr: "untyped float".into(),
                },
            ),
            (
                Type::Tuple(vec![int(), Type::Basic(BasicKind::Bool)]),
                LowerError::Tuple {
                    repr: "(int, bool)".into(),
                },
            ),
            (
                Type::Named(pending),
                LowerError::Unresolved {
                    name: "main.Pending".into(),
                },
            ),
        ];
        for (ty, expected) in cases {
            assert_eq!(lower_types(&universe, [&ty]).unwrap_err(), expected);
        }
    }

    #[test]
    fn failed_named_type_is_not_memoized() {
        let mut universe = Universe::new();
        let broken = universe.declare("Broken", "main");
        universe.complete(broken.id, Type::Slice(Box::new(Type::Invalid)));
        let named = Type::Named(broken.clone());

        let mut descriptors = Descriptors::new();
        assert_eq!(descriptors.lower(&universe, &named), Err(LowerError::Invalid));
        assert_eq!(descriptors.named(broken.id), None);
        assert_eq!(descriptors.lower(&universe, &named), Err(LowerError::Invalid));
    }
}
