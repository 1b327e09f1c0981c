//! The variant validator and box construction.

use std::sync::Arc;

use coffer_ast::{BoxTypeExpr, Span};
use coffer_types::{BoxType, DeclHead, NamedState, Type, Universe, identical};

use crate::trace::CheckAction;
use crate::{Category, CheckContext, Diagnostic, span_to_location};

/// Outcome of validating one box variant candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
    /// The candidate is already invalid; an earlier diagnostic covers it.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Anonymous composite, indirection or interface type.
    InvalidShape,
    /// A reference back into a declaration that is still being resolved,
    /// whose head is neither a struct nor a box.
    Recursive,
}

/// The rules a checker applies to box types.
///
/// Every front end that checks box types goes through one implementation of
/// this trait, so validation, construction and rendering cannot drift apart.
pub trait BoxSemantics {
    /// Decide whether `candidate` may be a variant.
    fn validate(&self, universe: &Universe, candidate: &Type) -> Verdict;

    /// Freeze a validated, deduplicated variant list.
    ///
    /// # Panics
    ///
    /// Panics if `variants` is empty.
    fn construct(&self, variants: Vec<Type>) -> BoxType {
        BoxType::new(variants)
    }

    fn display(&self, boxed: &BoxType) -> String {
        boxed.to_string()
    }
}

/// The shipped box rules: basic types and named types are permitted, named
/// structs and named boxes unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBox;

impl BoxSemantics for StandardBox {
    fn validate(&self, universe: &Universe, candidate: &Type) -> Verdict {
        let named = match candidate {
            Type::Invalid => return Verdict::Dropped,
            Type::Basic(_) => return Verdict::Accepted,
            Type::Named(named) => named,
            _ => return Verdict::Rejected(RejectReason::InvalidShape),
        };
        match universe.state(named.id) {
            Some(NamedState::Complete(underlying)) => match underlying {
                Type::Struct(_) | Type::Box(_) => Verdict::Accepted,
                // Underlying types never name another type, so this recursion
                // is at most one level deep.
                Type::Named(_) => Verdict::Rejected(RejectReason::Recursive),
                other => self.validate(universe, other),
            },
            Some(NamedState::InProgress(head)) => match head {
                DeclHead::Struct | DeclHead::Box => Verdict::Accepted,
                _ => Verdict::Rejected(RejectReason::Recursive),
            },
            Some(NamedState::Declared) | None => Verdict::Dropped,
        }
    }
}

const INVALID_VARIANT_REASON: &str = "only basic types and named types are permitted as box \
     variants; anonymous composite types and indirection/interface types are not permitted";

impl<S: BoxSemantics> CheckContext<S> {
    /// Validate a box type expression's variants and freeze the survivors.
    ///
    /// Every offending variant is reported. If none survives, the result is
    /// `Invalid` so later uses of the type do not cascade.
    pub(crate) fn resolve_box(&mut self, expr: &BoxTypeExpr, span: Span) -> Type {
        let mut survivors: Vec<Type> = Vec::new();
        let mut survivor_spans: Vec<Span> = Vec::new();

        for variant in &expr.variants {
            let ty = self.resolve_type_expr(variant);
            // The validator judges named types by their state, so make sure
            // a declaration reached for the first time is resolved.
            if let Type::Named(named) = &ty {
                self.resolve_named(named.id);
            }

            match self.semantics.validate(&self.universe, &ty) {
                Verdict::Accepted => {
                    if let Some(first) = survivors.iter().position(|v| identical(v, &ty)) {
                        self.push_step(
                            CheckAction::DuplicateVariant,
                            ty.to_string(),
                            "dropped repeated variant",
                            Some(variant.span),
                        );
                        self.push_error(
                            Diagnostic::error(
                                Category::DuplicateVariant,
                                format!("duplicate variant type {ty}"),
                            )
                            .at(span_to_location(variant.span))
                            .with_label(span_to_location(survivor_spans[first]), "first listed here")
                            .with_help(Category::DuplicateVariant.example_fix()),
                        );
                        continue;
                    }
                    self.push_step(
                        CheckAction::AcceptVariant,
                        ty.to_string(),
                        format!("variant {}", survivors.len()),
                        Some(variant.span),
                    );
                    survivors.push(ty);
                    survivor_spans.push(variant.span);
                }
                Verdict::Rejected(RejectReason::InvalidShape) => {
                    self.push_step(
                        CheckAction::RejectVariant,
                        ty.to_string(),
                        "invalid shape",
                        Some(variant.span),
                    );
                    self.push_error(
                        Diagnostic::error(
                            Category::InvalidVariantType,
                            format!("invalid variant {ty}: {INVALID_VARIANT_REASON}"),
                        )
                        .at(span_to_location(variant.span))
                        .with_help(Category::InvalidVariantType.example_fix()),
                    );
                }
                Verdict::Rejected(RejectReason::Recursive) => {
                    self.push_step(
                        CheckAction::RejectVariant,
                        ty.to_string(),
                        "recursive reference",
                        Some(variant.span),
                    );
                    self.push_error(
                        Diagnostic::error(
                            Category::InvalidRecursiveType,
                            format!("invalid recursive type {ty} in box variant list"),
                        )
                        .at(span_to_location(variant.span))
                        .with_help(Category::InvalidRecursiveType.example_fix()),
                    );
                }
                Verdict::Dropped => {
                    self.push_step(
                        CheckAction::DropVariant,
                        ty.to_string(),
                        "already invalid",
                        Some(variant.span),
                    );
                }
            }
        }

        if survivors.is_empty() && !expr.variants.is_empty() {
            tracing::debug!("box type has no valid variants");
            self.push_step(CheckAction::BuildBox, "box", "no valid variants", Some(span));
            return Type::Invalid;
        }

        let boxed = self.semantics.construct(survivors);
        let rendered = self.semantics.display(&boxed);
        self.push_step(CheckAction::BuildBox, rendered, "frozen", Some(span));
        Type::Box(Arc::new(boxed))
    }
}

#[cfg(test)]
mod tests {
    use coffer_types::{
        BasicKind, Field, FuncType, InterfaceType, NamedId, NamedType, StructType,
    };

    use super::*;

    fn named(universe: &mut Universe, name: &str, underlying: Type) -> Type {
        let ty = universe.declare(name, "main");
        universe.complete(ty.id, underlying);
        Type::Named(ty)
    }

    fn int() -> Type {
        Type::Basic(BasicKind::Int)
    }

    #[test]
    fn basic_types_are_accepted() {
        let universe = Universe::new();
        for kind in BasicKind::ALL {
            assert_eq!(
                StandardBox.validate(&universe, &Type::Basic(kind)),
                Verdict::Accepted
            );
        }
    }

    #[test]
    fn named_struct_is_accepted_but_anonymous_struct_is_not() {
        let mut universe = Universe::new();
        let point = Type::Struct(StructType {
            fields: vec![Field {
                name: "x".into(),
                ty: int(),
                embedded: false,
                tag: None,
            }],
        });
        let named_point = named(&mut universe, "Point", point.clone());
        assert_eq!(StandardBox.validate(&universe, &named_point), Verdict::Accepted);
        assert_eq!(
            StandardBox.validate(&universe, &point),
            Verdict::Rejected(RejectReason::InvalidShape)
        );
    }

    #[test]
    fn composites_are_rejected_through_names() {
        let mut universe = Universe::new();
        let composites = [
            Type::Slice(Box::new(int())),
            Type::Map(Box::new(int()), Box::new(int())),
            Type::Pointer(Box::new(int())),
            Type::Func(FuncType {
                params: vec![],
                results: vec![],
                variadic: false,
            }),
            Type::Interface(InterfaceType::new(vec![])),
        ];
        for (i, composite) in composites.into_iter().enumerate() {
            let alias = named(&mut universe, &format!("T{i}"), composite.clone());
            let rejected = Verdict::Rejected(RejectReason::InvalidShape);
            assert_eq!(StandardBox.validate(&universe, &composite), rejected);
            assert_eq!(StandardBox.validate(&universe, &alias), rejected);
        }
    }

    #[test]
    fn named_basic_is_accepted() {
        let mut universe = Universe::new();
        let celsius = named(&mut universe, "Celsius", Type::Basic(BasicKind::Float64));
        assert_eq!(StandardBox.validate(&universe, &celsius), Verdict::Accepted);
    }

    #[test]
    fn in_progress_declarations_are_judged_by_head() {
        let mut universe = Universe::new();
        let node = universe.declare("Node", "main");
        let list = universe.declare("List", "main");
        universe.begin(node.id, DeclHead::Box);
        universe.begin(list.id, DeclHead::Other);

        assert_eq!(
            StandardBox.validate(&universe, &Type::Named(node)),
            Verdict::Accepted
        );
        assert_eq!(
            StandardBox.validate(&universe, &Type::Named(list)),
            Verdict::Rejected(RejectReason::Recursive)
        );
    }

    #[test]
    fn invalid_and_unknown_candidates_are_dropped() {
        let universe = Universe::new();
        assert_eq!(StandardBox.validate(&universe, &Type::Invalid), Verdict::Dropped);
        let ghost = Type::Named(NamedType {
            id: NamedId(42),
            name: "Ghost".into(),
        });
        assert_eq!(StandardBox.validate(&universe, &ghost), Verdict::Dropped);
    }
}
