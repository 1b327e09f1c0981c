//! Assignability into and out of box-typed locations.

use std::sync::Arc;

use coffer_ast::Span;
use coffer_types::{BoxType, ConstValue, Type, UntypedKind, identical, representable};

use crate::trace::CheckAction;
use crate::{BoxSemantics, Category, CheckContext, Diagnostic, span_to_location};

/// A checked expression: its type, plus its value when it is a constant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Operand {
    pub ty: Type,
    pub value: Option<ConstValue>,
    /// Name of the variable the operand reads, if it is a plain variable.
    pub var: Option<String>,
}

impl Operand {
    pub fn of(ty: Type) -> Self {
        Self {
            ty,
            value: None,
            var: None,
        }
    }

    pub fn constant(kind: UntypedKind, value: Option<ConstValue>) -> Self {
        Self {
            ty: Type::Untyped(kind),
            value,
            var: None,
        }
    }

    pub fn invalid() -> Self {
        Self::of(Type::Invalid)
    }
}

/// Where a value is being stored, for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignContext {
    Assignment,
    VariableDecl,
    Argument,
    Return,
    Conversion,
}

impl AssignContext {
    fn describe(self) -> &'static str {
        match self {
            AssignContext::Assignment => "assignment",
            AssignContext::VariableDecl => "variable declaration",
            AssignContext::Argument => "argument",
            AssignContext::Return => "return statement",
            AssignContext::Conversion => "conversion",
        }
    }
}

impl<S: BoxSemantics> CheckContext<S> {
    /// Render an operand the way diagnostics refer to it: `3.14 (untyped
    /// float constant)`, `b (variable of box type S)`, `value of type T`.
    pub(crate) fn describe_operand(&self, operand: &Operand) -> String {
        if let (Type::Untyped(_), Some(value)) = (&operand.ty, &operand.value) {
            return format!("{} ({} constant)", render_const(value), operand.ty);
        }
        if let Type::Untyped(UntypedKind::Nil) = operand.ty {
            return "nil".to_string();
        }
        let kind = if self.universe.box_of(&operand.ty).is_some() {
            "box type"
        } else {
            "type"
        };
        match &operand.var {
            Some(name) => format!("{name} (variable of {kind} {})", operand.ty),
            None => format!("value of {kind} {}", operand.ty),
        }
    }

    /// Check that `operand` can be stored in a location of type `target`.
    /// Reports a diagnostic and returns false if it cannot.
    pub(crate) fn check_assignable(
        &mut self,
        operand: &Operand,
        target: &Type,
        context: AssignContext,
        span: Span,
    ) -> bool {
        if self.is_invalid(&operand.ty) || self.is_invalid(target) {
            return true;
        }
        if let Some(boxed) = self.universe.box_of(target).cloned() {
            return self.assign_into_box(operand, target, &boxed, context, span);
        }

        if self.universe.box_of(&operand.ty).is_some() {
            // Boxes may flow into empty interfaces (e.g. to print them), but
            // never into a concrete location.
            if self.is_empty_interface(target) || identical(&operand.ty, target) {
                return true;
            }
            let desc = self.describe_operand(operand);
            self.push_error(
                Diagnostic::error(
                    Category::TypeMismatch,
                    format!(
                        "cannot use {desc} as {target} value in {}: box values must be unpacked first",
                        context.describe()
                    ),
                )
                .at(span_to_location(span))
                .with_help(Category::InvalidConversion.example_fix()),
            );
            return false;
        }

        if self.assignable(operand, target) {
            return true;
        }
        let desc = self.describe_operand(operand);
        self.push_error(
            Diagnostic::error(
                Category::TypeMismatch,
                format!("cannot use {desc} as {target} value in {}", context.describe()),
            )
            .at(span_to_location(span)),
        );
        false
    }

    /// Assignability between non-box types.
    pub(crate) fn assignable(&self, operand: &Operand, target: &Type) -> bool {
        let target_under = self.universe.underlying(target);
        if let Type::Untyped(kind) = operand.ty {
            return match target_under {
                Type::Interface(_) | Type::Invalid => true,
                Type::Basic(basic) => representable(kind, operand.value.as_ref(), *basic),
                Type::Pointer(_) | Type::Slice(_) | Type::Map(..) | Type::Chan(..) | Type::Func(_) => {
                    kind == UntypedKind::Nil
                }
                _ => false,
            };
        }
        if identical(&operand.ty, target) {
            return true;
        }
        // Method sets are not modelled, so any value satisfies an interface.
        if matches!(target_under, Type::Interface(_)) {
            return true;
        }
        // Identical underlying types, where at least one side is unnamed.
        let source_under = self.universe.underlying(&operand.ty);
        let either_unnamed =
            operand.ty.named_id().is_none() || target.named_id().is_none();
        either_unnamed
            && !matches!(source_under, Type::Basic(_))
            && identical(source_under, target_under)
    }

    fn is_empty_interface(&self, ty: &Type) -> bool {
        matches!(self.universe.underlying(ty), Type::Interface(iface) if iface.methods.is_empty())
    }

    /// A value may be stored in a box if its type is a variant, if it already
    /// has the same box type, or if it is an untyped constant that selects
    /// exactly one variant.
    fn assign_into_box(
        &mut self,
        operand: &Operand,
        target: &Type,
        boxed: &Arc<BoxType>,
        context: AssignContext,
        span: Span,
    ) -> bool {
        if identical(&operand.ty, target) {
            return true;
        }
        if let Some(index) = boxed.position(&operand.ty) {
            self.push_step(
                CheckAction::AssignVariant,
                operand.ty.to_string(),
                format!("variant {index} of {target}"),
                Some(span),
            );
            return true;
        }

        let desc = self.describe_operand(operand);
        let Type::Untyped(kind) = operand.ty else {
            return self.reject_assignment(&desc, target, boxed, context, span);
        };
        match self.constant_variant(kind, operand.value.as_ref(), boxed) {
            ConstantChoice::Unique(variant) => {
                self.push_step(
                    CheckAction::AssignVariant,
                    desc,
                    format!("stored as {variant} in {target}"),
                    Some(span),
                );
                true
            }
            ConstantChoice::None => self.reject_assignment(&desc, target, boxed, context, span),
            ConstantChoice::Ambiguous(candidates) => {
                let names = candidates
                    .iter()
                    .map(|ty| ty.to_string())
                    .collect::<Vec<_>>()
                    .join(" or ");
                self.push_step(CheckAction::RejectAssignment, desc.clone(), "ambiguous", Some(span));
                self.push_error(
                    Diagnostic::error(
                        Category::AmbiguousConstant,
                        format!("cannot use {desc} as {target} value in {}: could be {names}", context.describe()),
                    )
                    .at(span_to_location(span))
                    .with_help(Category::AmbiguousConstant.example_fix()),
                );
                false
            }
        }
    }

    fn reject_assignment(
        &mut self,
        desc: &str,
        target: &Type,
        boxed: &BoxType,
        context: AssignContext,
        span: Span,
    ) -> bool {
        self.push_step(
            CheckAction::RejectAssignment,
            desc,
            format!("not a variant of {target}"),
            Some(span),
        );
        let rendered = self.semantics.display(boxed);
        self.push_error(
            Diagnostic::error(
                Category::InvalidAssignment,
                format!("cannot use {desc} as {target} value in {}", context.describe()),
            )
            .at(span_to_location(span))
            .with_help(format!("{target} is {rendered}")),
        );
        false
    }

    /// Pick the variant an untyped constant is stored as. The constant's
    /// default type wins when it is a variant; otherwise exactly one variant
    /// must be able to represent it.
    fn constant_variant(
        &self,
        kind: UntypedKind,
        value: Option<&ConstValue>,
        boxed: &BoxType,
    ) -> ConstantChoice {
        if let Some(default) = kind.default_type() {
            let default = Type::Basic(default);
            if boxed.contains(&default) {
                return ConstantChoice::Unique(default);
            }
        }
        let candidates: Vec<Type> = boxed
            .variants()
            .iter()
            .filter(|variant| match self.universe.underlying(variant) {
                Type::Basic(basic) => representable(kind, value, *basic),
                _ => false,
            })
            .cloned()
            .collect();
        match candidates.len() {
            0 => ConstantChoice::None,
            1 => candidates
                .into_iter()
                .next()
                .map_or(ConstantChoice::None, ConstantChoice::Unique),
            _ => ConstantChoice::Ambiguous(candidates),
        }
    }
}

enum ConstantChoice {
    None,
    Unique(Type),
    Ambiguous(Vec<Type>),
}

/// Source-like rendering of a constant value.
pub(crate) fn render_const(value: &ConstValue) -> String {
    match value {
        ConstValue::Bool(b) => b.to_string(),
        ConstValue::Int(n) => n.to_string(),
        ConstValue::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.1}"),
        ConstValue::Float(f) => f.to_string(),
        ConstValue::String(s) => format!("{s:?}"),
    }
}
