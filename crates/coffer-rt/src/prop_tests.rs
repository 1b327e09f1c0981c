//! Property tests for runtime type identity.
//!
//! 1. Two separately lowered copies of a type are identical
//! 2. Identity of acyclic types agrees with structural equality
//! 3. Both comparators agree whenever the bootstrap one has room

use proptest::prelude::*;

use crate::descriptor::{Descriptor, DescriptorTable, FieldDesc, Kind, Shape, TypeRef};
use crate::identity::{Bootstrap, Comparator, IdentityError, Standard};
use crate::value::{BoxValue, Data, Matcher};

/// A type, as the generator sees it.
#[derive(Debug, Clone, PartialEq)]
enum Tree {
    Basic(Kind),
    Named(&'static str, Kind),
    Slice(Box<Tree>),
    Map(Box<Tree>, Box<Tree>),
    Func(Vec<Tree>, Vec<Tree>, bool),
    Struct(Vec<(&'static str, Tree)>),
    Box(Vec<Tree>),
}

fn lower(table: &mut DescriptorTable, tree: &Tree) -> TypeRef {
    let compound = |table: &mut DescriptorTable, kind: Kind, shape: Shape| {
        table.push(Descriptor {
            kind,
            name: None,
            repr: format!("{kind:?}"),
            shape,
        })
    };
    match tree {
        Tree::Basic(kind) => table.push(Descriptor::basic(*kind, format!("{kind:?}"))),
        Tree::Named(name, kind) => table.push(Descriptor::basic(*kind, "").named(*name)),
        Tree::Slice(elem) => {
            let elem = lower(table, elem);
            compound(table, Kind::Slice, Shape::Slice { elem })
        }
        Tree::Map(key, value) => {
            let key = lower(table, key);
            let value = lower(table, value);
            compound(table, Kind::Map, Shape::Map { key, value })
        }
        Tree::Func(params, results, variadic) => {
            let params = params.iter().map(|p| lower(table, p)).collect();
            let results = results.iter().map(|r| lower(table, r)).collect();
            compound(table, Kind::Func, Shape::Func {
                params,
                results,
                variadic: *variadic,
            })
        }
        Tree::Struct(fields) => {
            let fields = fields
                .iter()
                .map(|(name, ty)| FieldDesc {
                    name: (*name).to_string(),
                    ty: lower(table, ty),
                    embedded: false,
                    tag: None,
                })
                .collect();
            compound(table, Kind::Struct, Shape::Struct { fields })
        }
        Tree::Box(variants) => {
            let variants = variants.iter().map(|v| lower(table, v)).collect();
            compound(table, Kind::Box, Shape::Box { variants })
        }
    }
}

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop::sample::select(vec![
        Kind::Bool,
        Kind::Int,
        Kind::Uint8,
        Kind::Int32,
        Kind::Float64,
        Kind::String,
    ])
}

fn arb_tree() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        3 => arb_kind().prop_map(Tree::Basic),
        1 => (prop::sample::select(vec!["main.A", "main.B"]), arb_kind())
            .prop_map(|(name, kind)| Tree::Named(name, kind)),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|t| Tree::Slice(Box::new(t))),
            (inner.clone(), inner.clone()).prop_map(|(k, v)| Tree::Map(Box::new(k), Box::new(v))),
            (
                prop::collection::vec(inner.clone(), 0..3),
                prop::collection::vec(inner.clone(), 0..2),
                any::<bool>()
            )
                .prop_map(|(p, r, v)| Tree::Func(p, r, v)),
            prop::collection::vec(
                (prop::sample::select(vec!["x", "y"]), inner.clone()),
                0..3
            )
            .prop_map(Tree::Struct),
            prop::collection::vec(inner, 1..3).prop_map(Tree::Box),
        ]
    })
}

/// Run the bootstrap comparator, treating exhausted capacity as no answer.
fn bootstrap(table: &DescriptorTable, a: TypeRef, b: TypeRef) -> Option<bool> {
    match Bootstrap::<32>::new().identical(table, a, b) {
        Ok(same) => Some(same),
        Err(IdentityError::CapacityExceeded { .. }) => None,
        Err(err) => panic!("unexpected identity error: {err}"),
    }
}

proptest! {
    /// Lowering the same type twice yields identical descriptors, and a
    /// value built with one copy matches an assertion on the other.
    #[test]
    fn separate_copies_are_identical(tree in arb_tree()) {
        let mut table = DescriptorTable::new();
        let first = lower(&mut table, &tree);
        let second = lower(&mut table, &tree);

        prop_assert_eq!(Standard::new().identical(&table, first, second), Ok(true));
        prop_assert_ne!(bootstrap(&table, first, second), Some(false));

        let mut matcher = Matcher::new(&table);
        let value = BoxValue::new(first, Data::int(1));
        prop_assert_eq!(matcher.assert_checked(value, second), Ok((Data::int(1), true)));
    }

    /// For acyclic types, identity is structural equality, in both
    /// directions and with either comparator.
    #[test]
    fn identity_matches_structural_equality(a in arb_tree(), b in arb_tree()) {
        let mut table = DescriptorTable::new();
        let ra = lower(&mut table, &a);
        let rb = lower(&mut table, &b);

        let forward = Standard::new().identical(&table, ra, rb).unwrap();
        let backward = Standard::new().identical(&table, rb, ra).unwrap();
        prop_assert_eq!(forward, a == b);
        prop_assert_eq!(backward, forward);
        if let Some(same) = bootstrap(&table, ra, rb) {
            prop_assert_eq!(same, forward);
        }
    }
}
