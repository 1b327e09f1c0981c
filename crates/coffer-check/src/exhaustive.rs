//! Exhaustiveness checking for type switches over box types.
//!
//! A switch over a box must name every variant exactly once and may not have
//! a `default` clause. Each clause is walked once against a per-variant
//! coverage table; all violations are collected in the same pass.

use coffer_ast::Span;
use coffer_types::{BoxType, Type};

use crate::{Category, Diagnostic, span_to_location};

/// One type listed in a `case` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub ty: Type,
    pub span: Span,
}

/// A clause of a type switch, with its case types already resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchClause {
    Case(Vec<SwitchCase>),
    Default(Span),
}

/// Result of checking a switch against its box type.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchReport {
    /// Variants no case covers, in declaration order.
    pub missing: Vec<Type>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SwitchReport {
    pub fn is_exhaustive(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Coverage {
    Uncovered,
    Covered(Span),
}

/// Check a type switch over `boxed`.
///
/// `box_name` is how the box is spelled in diagnostics (its declared name
/// when it has one). `switch_span` locates the missing-variant diagnostic.
pub fn check_box_switch(
    boxed: &BoxType,
    box_name: &str,
    clauses: &[SwitchClause],
    switch_span: Span,
) -> SwitchReport {
    let mut coverage = vec![Coverage::Uncovered; boxed.len()];
    let mut diagnostics = Vec::new();

    for clause in clauses {
        let cases = match clause {
            SwitchClause::Default(span) => {
                diagnostics.push(
                    Diagnostic::error(
                        Category::DefaultCaseNotAllowed,
                        format!("default case not allowed in type switch on box type {box_name}"),
                    )
                    .at(span_to_location(*span))
                    .with_help(Category::DefaultCaseNotAllowed.example_fix()),
                );
                continue;
            }
            SwitchClause::Case(cases) => cases,
        };

        for case in cases {
            if case.ty.is_invalid() {
                continue;
            }
            let Some(index) = boxed.position(&case.ty) else {
                diagnostics.push(
                    Diagnostic::error(
                        Category::ImpossibleCase,
                        format!(
                            "impossible type switch case: {box_name} cannot hold {}",
                            case.ty
                        ),
                    )
                    .at(span_to_location(case.span))
                    .with_help(Category::ImpossibleCase.example_fix()),
                );
                continue;
            };
            match coverage[index] {
                Coverage::Uncovered => coverage[index] = Coverage::Covered(case.span),
                Coverage::Covered(first) => diagnostics.push(
                    Diagnostic::error(
                        Category::DuplicateSwitchCase,
                        format!("duplicate case {} in type switch", case.ty),
                    )
                    .at(span_to_location(case.span))
                    .with_label(span_to_location(first), "previous case")
                    .with_help(Category::DuplicateSwitchCase.example_fix()),
                ),
            }
        }
    }

    let missing: Vec<Type> = boxed
        .variants()
        .iter()
        .zip(&coverage)
        .filter(|(_, state)| matches!(state, Coverage::Uncovered))
        .map(|(variant, _)| variant.clone())
        .collect();

    if !missing.is_empty() {
        let names = missing
            .iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if missing.len() == 1 { "case" } else { "cases" };
        diagnostics.push(
            Diagnostic::error(
                Category::NonExhaustiveSwitch,
                format!("non-exhaustive type switch on {box_name}: missing {noun} for {names}"),
            )
            .at(span_to_location(switch_span))
            .with_help(Category::NonExhaustiveSwitch.example_fix()),
        );
    }

    SwitchReport {
        missing,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use coffer_ast::FileId;
    use coffer_types::BasicKind;

    use super::*;

    fn span(start: u32) -> Span {
        Span::new(FileId(0), start, start + 1)
    }

    fn basic(kind: BasicKind) -> Type {
        Type::Basic(kind)
    }

    fn value_box() -> BoxType {
        BoxType::new(vec![
            basic(BasicKind::String),
            basic(BasicKind::Int),
            basic(BasicKind::Bool),
        ])
    }

    fn case(kind: BasicKind, at: u32) -> SwitchClause {
        SwitchClause::Case(vec![SwitchCase {
            ty: basic(kind),
            span: span(at),
        }])
    }

    fn categories(report: &SwitchReport) -> Vec<Category> {
        report.diagnostics.iter().map(|d| d.category).collect()
    }

    #[test]
    fn all_variants_once_is_clean() {
        let clauses = [
            case(BasicKind::Int, 1),
            case(BasicKind::Bool, 2),
            case(BasicKind::String, 3),
        ];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert!(report.is_exhaustive());
        assert!(report.is_clean());
    }

    #[test]
    fn missing_variant_is_reported_once() {
        let clauses = [case(BasicKind::String, 1), case(BasicKind::Int, 2)];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert_eq!(report.missing, vec![basic(BasicKind::Bool)]);
        assert_eq!(categories(&report), vec![Category::NonExhaustiveSwitch]);
        insta::assert_snapshot!(
            report.diagnostics[0].to_string(),
            @r"
        error[E0103]: non-exhaustive type switch on Value: missing case for bool
          help: Add a case for each missing variant.
        "
        );
    }

    #[test]
    fn missing_variants_are_listed_in_declaration_order() {
        let clauses = [case(BasicKind::Int, 1)];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert_eq!(
            report.missing,
            vec![basic(BasicKind::String), basic(BasicKind::Bool)]
        );
        assert!(report.diagnostics[0].message.ends_with("missing cases for string, bool"));
    }

    #[test]
    fn repeated_case_is_reported_once() {
        let clauses = [
            case(BasicKind::String, 1),
            case(BasicKind::String, 2),
            case(BasicKind::Int, 3),
            case(BasicKind::Bool, 4),
        ];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert!(report.is_exhaustive());
        assert_eq!(categories(&report), vec![Category::DuplicateSwitchCase]);
        let diag = &report.diagnostics[0];
        assert_eq!(diag.location, Some(span_to_location(span(2))));
        assert_eq!(diag.labels[0].location, span_to_location(span(1)));
        assert_eq!(
            diag.help.as_deref(),
            Some(Category::DuplicateSwitchCase.example_fix())
        );
    }

    #[test]
    fn repeat_within_one_clause_counts() {
        let clauses = [
            SwitchClause::Case(vec![
                SwitchCase {
                    ty: basic(BasicKind::Int),
                    span: span(1),
                },
                SwitchCase {
                    ty: basic(BasicKind::Int),
                    span: span(2),
                },
            ]),
            case(BasicKind::String, 3),
            case(BasicKind::Bool, 4),
        ];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert_eq!(categories(&report), vec![Category::DuplicateSwitchCase]);
    }

    #[test]
    fn default_is_rejected_even_when_exhaustive() {
        let clauses = [
            case(BasicKind::String, 1),
            case(BasicKind::Int, 2),
            case(BasicKind::Bool, 3),
            SwitchClause::Default(span(4)),
        ];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert_eq!(categories(&report), vec![Category::DefaultCaseNotAllowed]);
    }

    #[test]
    fn default_does_not_count_as_coverage() {
        let clauses = [
            case(BasicKind::String, 1),
            case(BasicKind::Int, 2),
            SwitchClause::Default(span(3)),
        ];
        let report = check_box_switch(&value_box(), "Status", &clauses, span(0));
        assert_eq!(
            categories(&report),
            vec![Category::DefaultCaseNotAllowed, Category::NonExhaustiveSwitch]
        );
        insta::assert_snapshot!(
            report.diagnostics[0].message,
            @"default case not allowed in type switch on box type Status"
        );
    }

    #[test]
    fn foreign_case_is_impossible() {
        let clauses = [
            case(BasicKind::String, 1),
            case(BasicKind::Int, 2),
            case(BasicKind::Bool, 3),
            case(BasicKind::Float64, 4),
        ];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert_eq!(categories(&report), vec![Category::ImpossibleCase]);
        assert!(report.diagnostics[0].message.contains("cannot hold float64"));
    }

    #[test]
    fn invalid_cases_are_skipped() {
        let clauses = [
            case(BasicKind::String, 1),
            case(BasicKind::Int, 2),
            case(BasicKind::Bool, 3),
            SwitchClause::Case(vec![SwitchCase {
                ty: Type::Invalid,
                span: span(4),
            }]),
        ];
        let report = check_box_switch(&value_box(), "Value", &clauses, span(0));
        assert!(report.is_clean());
    }
}
