//! Fixture builders for the coffer benchmarks.
//!
//! Modules are built as syntax trees directly so the benchmarks measure
//! checking, not parsing.

use coffer_ast::{
    BoxTypeExpr, CaseClause, CaseKind, DeclKind, ExprKind, FieldExpr, FileId, FuncDecl,
    Lit, Module, Param, Span, Spanned, StmtKind, TypeDecl, TypeExpr, TypeExprKind, TypeSwitch,
    VarDecl,
};
use coffer_check::exhaustive::{SwitchCase, SwitchClause};
use coffer_rt::{Descriptor, DescriptorTable, FieldDesc, Kind, Shape, TypeRef};
use coffer_types::{BasicKind, BoxType, Type};

fn span(start: usize) -> Span {
    let start = start as u32;
    Span::new(FileId(0), start, start + 1)
}

fn ident(name: impl Into<String>, at: usize) -> Spanned<String> {
    Spanned::new(name.into(), span(at))
}

fn ty(name: impl Into<String>, at: usize) -> TypeExpr {
    Spanned::new(TypeExprKind::Name(name.into()), span(at))
}

/// A module declaring `width` named structs, a box `Wide` over all of them
/// plus `int` and `string`, and a function switching over every variant.
pub fn wide_box_module(width: usize) -> Module {
    let mut module = Module::new(FileId(0), "bench");
    let mut variants = Vec::with_capacity(width + 2);
    for idx in 0..width {
        let name = format!("S{idx}");
        module.decls.push(Spanned::new(
            DeclKind::Type(TypeDecl {
                name: ident(&name, idx),
                alias: false,
                ty: Spanned::new(
                    TypeExprKind::Struct(vec![FieldExpr {
                        name: Some(ident("value", idx)),
                        ty: ty("int", idx),
                        tag: None,
                    }]),
                    span(idx),
                ),
            }),
            span(idx),
        ));
        variants.push(ty(name, idx));
    }
    variants.push(ty("int", width));
    variants.push(ty("string", width + 1));

    let mut variant_names: Vec<String> = (0..width).map(|idx| format!("S{idx}")).collect();
    variant_names.push("int".to_string());
    variant_names.push("string".to_string());

    module.decls.push(Spanned::new(
        DeclKind::Type(TypeDecl {
            name: ident("Wide", width),
            alias: false,
            ty: Spanned::new(TypeExprKind::Box(BoxTypeExpr { variants }), span(width)),
        }),
        span(width),
    ));

    let clauses = variant_names
        .iter()
        .enumerate()
        .map(|(idx, name)| CaseClause {
            kind: CaseKind::Types(vec![ty(name.as_str(), idx)]),
            body: Vec::new(),
            span: span(idx),
        })
        .collect();
    let body = vec![
        Spanned::new(
            StmtKind::Var(VarDecl {
                name: ident("n", 0),
                ty: Some(ty("Wide", 0)),
                value: Some(Spanned::new(ExprKind::Lit(Lit::Int(7)), span(0))),
            }),
            span(0),
        ),
        Spanned::new(
            StmtKind::TypeSwitch(TypeSwitch {
                binding: Some(ident("v", 0)),
                subject: Spanned::new(ExprKind::Name("w".to_string()), span(0)),
                clauses,
            }),
            span(0),
        ),
    ];
    module.decls.push(Spanned::new(
        DeclKind::Func(FuncDecl {
            name: ident("visit", 0),
            params: vec![Param {
                name: ident("w", 0),
                ty: ty("Wide", 0),
            }],
            results: Vec::new(),
            body,
        }),
        span(0),
    ));
    module
}

/// A box over the first `width` basic kinds. Widths past the number of
/// basic kinds are capped.
pub fn basic_box(width: usize) -> BoxType {
    let variants = BasicKind::ALL
        .iter()
        .take(width.max(1))
        .map(|kind| Type::Basic(*kind))
        .collect();
    BoxType::new(variants)
}

/// Clauses for a switch over `boxed`: every variant once, in reverse order,
/// and when `with_default` is set a trailing `default`.
pub fn switch_clauses(boxed: &BoxType, with_default: bool) -> Vec<SwitchClause> {
    let mut clauses: Vec<SwitchClause> = boxed
        .variants()
        .iter()
        .rev()
        .enumerate()
        .map(|(idx, variant)| {
            SwitchClause::Case(vec![SwitchCase {
                ty: variant.clone(),
                span: span(idx),
            }])
        })
        .collect();
    if with_default {
        clauses.push(SwitchClause::Default(span(clauses.len())));
    }
    clauses
}

/// Two independently built copies of a type nested `depth` levels deep,
/// alternating named structs, slices and boxes, in one table.
pub fn nested_copies(depth: usize) -> (DescriptorTable, TypeRef, TypeRef) {
    let mut table = DescriptorTable::new();
    let a = nested(&mut table, depth);
    let b = nested(&mut table, depth);
    (table, a, b)
}

fn nested(table: &mut DescriptorTable, depth: usize) -> TypeRef {
    let mut current = table.push(Descriptor::basic(Kind::String, "string"));
    for level in 0..depth {
        let int = table.push(Descriptor::basic(Kind::Int, "int"));
        let descriptor = match level % 3 {
            0 => Descriptor {
                kind: Kind::Struct,
                name: None,
                repr: String::new(),
                shape: Shape::Struct {
                    fields: vec![
                        FieldDesc {
                            name: "inner".to_string(),
                            ty: current,
                            embedded: false,
                            tag: None,
                        },
                        FieldDesc {
                            name: "count".to_string(),
                            ty: int,
                            embedded: false,
                            tag: None,
                        },
                    ],
                },
            }
            .named(format!("bench.Level{level}")),
            1 => Descriptor {
                kind: Kind::Slice,
                name: None,
                repr: format!("[]level{level}"),
                shape: Shape::Slice { elem: current },
            },
            _ => Descriptor {
                kind: Kind::Box,
                name: None,
                repr: format!("box{level}"),
                shape: Shape::Box {
                    variants: vec![int, current],
                },
            },
        };
        current = table.push(descriptor);
    }
    current
}

#[cfg(test)]
mod tests {
    use coffer_check::exhaustive::check_box_switch;
    use coffer_check::{CheckOptions, check_module};
    use coffer_rt::{Comparator, Standard};

    use super::*;

    #[test]
    fn wide_module_checks_cleanly() {
        let checked = check_module(&wide_box_module(6), CheckOptions::default());
        assert!(checked.diagnostics.is_empty(), "{:?}", checked.diagnostics);
        assert_eq!(checked.box_type("Wide").unwrap().len(), 8);
    }

    #[test]
    fn switch_fixture_is_exhaustive() {
        let boxed = basic_box(5);
        let clean = check_box_switch(&boxed, "B", &switch_clauses(&boxed, false), span(0));
        assert!(clean.is_clean());
        let with_default = check_box_switch(&boxed, "B", &switch_clauses(&boxed, true), span(0));
        assert_eq!(with_default.diagnostics.len(), 1);
    }

    #[test]
    fn nested_copies_are_identical() {
        let (table, a, b) = nested_copies(9);
        assert_ne!(a, b);
        assert_eq!(Standard::new().identical(&table, a, b), Ok(true));
    }
}
