//! Statement and expression checking.
//!
//! Only as much of the language is typed as box operations need: enough to
//! know the type of every operand that is stored in, converted from,
//! asserted on or switched over a box.

use coffer_ast::{
    BinOp, Block, CaseKind, DeclKind, Expr, ExprKind, Lit, Module, Span, Spanned, Stmt, StmtKind,
    TypeExpr, TypeSwitch, VarDecl,
};
use coffer_types::{BasicKind, ConstValue, FuncType, Type, UntypedKind, identical};

use crate::assign::{AssignContext, Operand};
use crate::exhaustive::{self, SwitchCase, SwitchClause};
use crate::trace::CheckAction;
use crate::{BoxSemantics, Category, CheckContext, Diagnostic, span_to_location};

// ---------------------------------------------------------------------------
// Declarations with bodies
// ---------------------------------------------------------------------------

impl<S: BoxSemantics> CheckContext<S> {
    /// Check package-level `var` declarations, in order.
    pub(crate) fn check_globals(&mut self, module: &Module) {
        for decl in &module.decls {
            let DeclKind::Var(var) = &decl.node else {
                continue;
            };
            if var.name.node != "_" && self.declared.get(&var.name.node) != Some(&var.name.span) {
                continue;
            }
            self.check_var_decl(var);
        }
    }

    /// Check every function body against its resolved signature.
    pub(crate) fn check_bodies(&mut self, module: &Module, signatures: &[FuncType]) {
        for (func, sig) in module.func_decls().zip(signatures) {
            let _span = tracing::debug_span!("check_func", name = %func.name.node).entered();
            self.results = sig.results.clone();
            // Parameters live in the function's outermost block.
            self.push_scope();
            for (param, ty) in func.params.iter().zip(&sig.params) {
                self.declare_local(&param.name.node, ty.clone(), param.name.span);
            }
            for stmt in &func.body {
                self.check_stmt(stmt);
            }
            self.pop_scope();
            self.results.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn check_block(&mut self, block: &Block) {
        self.push_scope();
        for stmt in block {
            self.check_stmt(stmt);
        }
        self.pop_scope();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.node {
            StmtKind::Var(var) => self.check_var_decl(var),
            StmtKind::Define { names, value } => self.check_define(names, value),
            StmtKind::Assign { target, value } => self.check_assign(target, value),
            StmtKind::Return(values) => self.check_return(values, stmt.span),
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let operand = self.check_value(cond);
                if !self.is_invalid(&operand.ty) && !self.is_boolean(&operand.ty) {
                    let desc = self.describe_operand(&operand);
                    self.push_error(
                        Diagnostic::error(
                            Category::TypeMismatch,
                            format!("non-boolean condition in if statement: {desc}"),
                        )
                        .at(span_to_location(cond.span)),
                    );
                }
                self.check_block(then_block);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::TypeSwitch(switch) => self.check_type_switch(switch, stmt.span),
        }
    }

    fn check_var_decl(&mut self, var: &VarDecl) {
        let declared = var.ty.as_ref().map(|ty| self.resolve_type_expr(ty));
        let ty = match (declared, &var.value) {
            (Some(ty), Some(value)) => {
                let operand = self.check_value(value);
                self.check_assignable(&operand, &ty, AssignContext::VariableDecl, value.span);
                ty
            }
            (Some(ty), None) => ty,
            (None, Some(value)) => {
                let operand = self.check_expr(value);
                self.infer_var_type(&operand, value)
            }
            (None, None) => Type::Invalid,
        };
        self.declare_local(&var.name.node, ty, var.name.span);
    }

    /// Type of a variable declared without a type, from its initializer.
    fn infer_var_type(&mut self, operand: &Operand, value: &Expr) -> Type {
        match &operand.ty {
            Type::Tuple(elems) => {
                self.push_error(
                    Diagnostic::error(
                        Category::ArityMismatch,
                        format!(
                            "assignment mismatch: 1 variable but {} returns {} values",
                            expr_label(value),
                            elems.len()
                        ),
                    )
                    .at(span_to_location(value.span)),
                );
                Type::Invalid
            }
            Type::Untyped(UntypedKind::Nil) => {
                self.push_error(
                    Diagnostic::error(
                        Category::TypeMismatch,
                        "use of untyped nil in variable declaration",
                    )
                    .at(span_to_location(value.span)),
                );
                Type::Invalid
            }
            ty => ty.defaulted(),
        }
    }

    fn check_define(&mut self, names: &[Spanned<String>], value: &Expr) {
        // `v, ok := b.(T)`
        if names.len() == 2 && matches!(value.node, ExprKind::TypeAssert { .. }) {
            let operand = self.check_expr(value);
            self.declare_local(&names[0].node, operand.ty, names[0].span);
            self.declare_local(&names[1].node, Type::Basic(BasicKind::Bool), names[1].span);
            return;
        }

        let operand = self.check_expr(value);
        let types = match (&operand.ty, names.len()) {
            (Type::Tuple(elems), n) if elems.len() == n => elems.clone(),
            (Type::Tuple(elems), n) => {
                self.push_error(
                    Diagnostic::error(
                        Category::ArityMismatch,
                        format!(
                            "assignment mismatch: {n} variable{} but {} returns {} value{}",
                            plural(n),
                            expr_label(value),
                            elems.len(),
                            plural(elems.len())
                        ),
                    )
                    .at(span_to_location(value.span)),
                );
                vec![Type::Invalid; n]
            }
            (_, 1) => vec![self.infer_var_type(&operand, value)],
            (_, n) => {
                self.push_error(
                    Diagnostic::error(
                        Category::ArityMismatch,
                        format!("assignment mismatch: {n} variables but 1 value"),
                    )
                    .at(span_to_location(value.span)),
                );
                vec![Type::Invalid; n]
            }
        };
        for (name, ty) in names.iter().zip(types) {
            self.declare_local(&name.node, ty, name.span);
        }
    }

    fn check_assign(&mut self, target: &Spanned<String>, value: &Expr) {
        let operand = self.check_value(value);
        if target.node == "_" {
            return;
        }
        let Some(ty) = self.lookup_var(&target.node).cloned() else {
            self.push_error(
                Diagnostic::error(Category::UndefinedName, format!("undefined: {}", target.node))
                    .at(span_to_location(target.span)),
            );
            return;
        };
        self.check_assignable(&operand, &ty, AssignContext::Assignment, value.span);
    }

    fn check_return(&mut self, values: &[Expr], span: Span) {
        let expected = self.results.clone();

        // `return f()` where f returns several values.
        if let [single] = values {
            if expected.len() > 1 {
                let operand = self.check_expr(single);
                match operand.ty {
                    Type::Tuple(elems) if elems.len() == expected.len() => {
                        for (elem, want) in elems.into_iter().zip(&expected) {
                            self.check_assignable(
                                &Operand::of(elem),
                                want,
                                AssignContext::Return,
                                single.span,
                            );
                        }
                    }
                    ty if ty.is_invalid() => {}
                    _ => self.return_count_mismatch(1, expected.len(), span),
                }
                return;
            }
        }

        if values.len() != expected.len() {
            for value in values {
                self.check_expr(value);
            }
            self.return_count_mismatch(values.len(), expected.len(), span);
            return;
        }
        for (value, want) in values.iter().zip(&expected) {
            let operand = self.check_value(value);
            self.check_assignable(&operand, want, AssignContext::Return, value.span);
        }
    }

    fn return_count_mismatch(&mut self, have: usize, want: usize, span: Span) {
        let message = if have > want {
            "too many return values"
        } else {
            "not enough return values"
        };
        self.push_error(
            Diagnostic::error(Category::ArityMismatch, message)
                .at(span_to_location(span))
                .with_help(format!("have {have} value{}, want {want}", plural(have))),
        );
    }

    fn check_type_switch(&mut self, switch: &TypeSwitch, span: Span) {
        let subject = self.check_value(&switch.subject);

        let mut clauses = Vec::with_capacity(switch.clauses.len());
        for clause in &switch.clauses {
            clauses.push(match &clause.kind {
                CaseKind::Default => SwitchClause::Default(clause.span),
                CaseKind::Types(types) => SwitchClause::Case(
                    types
                        .iter()
                        .map(|ty| SwitchCase {
                            ty: self.resolve_type_expr(ty),
                            span: ty.span,
                        })
                        .collect(),
                ),
            });
        }

        if let Some(boxed) = self.universe.box_of(&subject.ty).cloned() {
            let box_name = subject.ty.to_string();
            let _span = tracing::debug_span!("box_switch", subject = %box_name).entered();
            let report = exhaustive::check_box_switch(&boxed, &box_name, &clauses, span);
            tracing::debug!(
                missing = report.missing.len(),
                problems = report.diagnostics.len(),
                "checked box switch"
            );
            if report.is_clean() {
                self.push_step(
                    CheckAction::SwitchExhaustive,
                    box_name,
                    format!("{} variants covered", boxed.len()),
                    Some(span),
                );
            } else {
                self.push_step(
                    CheckAction::SwitchRejected,
                    box_name,
                    format!("{} problems", report.diagnostics.len()),
                    Some(span),
                );
            }
            for diag in report.diagnostics {
                self.push_error(diag);
            }
        } else if !self.is_invalid(&subject.ty) && !self.universe.is_interface(&subject.ty) {
            let desc = self.describe_operand(&subject);
            self.push_error(
                Diagnostic::error(
                    Category::TypeMismatch,
                    format!("{desc} is not an interface or box"),
                )
                .at(span_to_location(switch.subject.span)),
            );
        }

        for (clause, resolved) in switch.clauses.iter().zip(&clauses) {
            self.push_scope();
            if let Some(binding) = &switch.binding {
                let ty = match resolved {
                    SwitchClause::Case(cases) if cases.len() == 1 => cases[0].ty.clone(),
                    _ => subject.ty.clone(),
                };
                self.declare_local(&binding.node, ty, binding.span);
            }
            for stmt in &clause.body {
                self.check_stmt(stmt);
            }
            self.pop_scope();
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Check an expression that must produce exactly one value.
    pub(crate) fn check_value(&mut self, expr: &Expr) -> Operand {
        let operand = self.check_expr(expr);
        let Type::Tuple(elems) = &operand.ty else {
            return operand;
        };
        let message = if elems.is_empty() {
            format!("{} (no value) used as value", expr_label(expr))
        } else {
            format!(
                "multiple-value {} (value of type {}) in single-value context",
                expr_label(expr),
                operand.ty
            )
        };
        self.push_error(
            Diagnostic::error(Category::ArityMismatch, message).at(span_to_location(expr.span)),
        );
        Operand::invalid()
    }

    pub(crate) fn check_expr(&mut self, expr: &Expr) -> Operand {
        match &expr.node {
            ExprKind::Lit(lit) => literal(lit),
            ExprKind::Name(name) => {
                if let Some(ty) = self.lookup_var(name) {
                    return Operand {
                        ty: ty.clone(),
                        value: None,
                        var: Some(name.clone()),
                    };
                }
                if let Some(sig) = self.funcs.get(name) {
                    return Operand::of(Type::Func(sig.clone()));
                }
                self.push_error(
                    Diagnostic::error(Category::UndefinedName, format!("undefined: {name}"))
                        .at(span_to_location(expr.span)),
                );
                Operand::invalid()
            }
            ExprKind::Composite(ty) => Operand::of(self.resolve_type_expr(ty)),
            ExprKind::Call { func, args } => self.check_call(func, args),
            ExprKind::Convert { ty, value } => self.check_conversion(ty, value, expr.span),
            ExprKind::TypeAssert { value, ty } => self.check_type_assert(value, ty),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, expr.span),
        }
    }

    fn check_call(&mut self, func: &Spanned<String>, args: &[Expr]) -> Operand {
        let local = self.lookup_var(&func.node).cloned();
        let sig = match local {
            Some(Type::Func(sig)) => sig,
            Some(ty) if ty.is_invalid() => return self.check_args_only(args),
            Some(ty) => {
                self.push_error(
                    Diagnostic::error(
                        Category::TypeMismatch,
                        format!(
                            "invalid operation: cannot call non-function {} (variable of type {ty})",
                            func.node
                        ),
                    )
                    .at(span_to_location(func.span)),
                );
                return self.check_args_only(args);
            }
            None => match self.funcs.get(&func.node) {
                Some(sig) => sig.clone(),
                None if is_print_builtin(&func.node) => {
                    self.check_args_only(args);
                    return Operand::of(Type::Tuple(vec![]));
                }
                None => {
                    self.push_error(
                        Diagnostic::error(
                            Category::UndefinedName,
                            format!("undefined: {}", func.node),
                        )
                        .at(span_to_location(func.span)),
                    );
                    return self.check_args_only(args);
                }
            },
        };

        // `f(g())` where g returns exactly f's parameters.
        let operands: Vec<(Operand, Span)> = match args {
            [single] if sig.params.len() > 1 => {
                let operand = self.check_expr(single);
                match operand.ty {
                    Type::Tuple(elems) => elems
                        .into_iter()
                        .map(|ty| (Operand::of(ty), single.span))
                        .collect(),
                    _ => vec![(operand, single.span)],
                }
            }
            _ => args
                .iter()
                .map(|arg| (self.check_value(arg), arg.span))
                .collect(),
        };

        let fixed = if sig.variadic {
            sig.params.len().saturating_sub(1)
        } else {
            sig.params.len()
        };
        let count_ok = if sig.variadic {
            operands.len() >= fixed
        } else {
            operands.len() == fixed
        };
        if !count_ok {
            let message = if operands.len() < fixed {
                format!("not enough arguments in call to {}", func.node)
            } else {
                format!("too many arguments in call to {}", func.node)
            };
            self.push_error(
                Diagnostic::error(Category::ArityMismatch, message)
                    .at(span_to_location(func.span))
                    .with_help(format!("want {}", Type::Func(sig.clone()))),
            );
        } else {
            for (i, (operand, span)) in operands.iter().enumerate() {
                let param = match (&sig.params[..], sig.variadic) {
                    (params, true) if i >= fixed => match params.last() {
                        Some(Type::Slice(elem)) => elem.as_ref().clone(),
                        _ => Type::Invalid,
                    },
                    (params, _) => params[i].clone(),
                };
                self.check_assignable(operand, &param, AssignContext::Argument, *span);
            }
        }

        match sig.results.as_slice() {
            [single] => Operand::of(single.clone()),
            results => Operand::of(Type::Tuple(results.to_vec())),
        }
    }

    fn check_args_only(&mut self, args: &[Expr]) -> Operand {
        for arg in args {
            self.check_expr(arg);
        }
        Operand::invalid()
    }

    /// `T(x)`. Box values are never converted; they are unpacked through
    /// assertions or switches.
    fn check_conversion(&mut self, ty: &TypeExpr, value: &Expr, span: Span) -> Operand {
        let target = self.resolve_type_expr(ty);
        let operand = self.check_value(value);
        if self.is_invalid(&target) || self.is_invalid(&operand.ty) {
            return Operand::of(target);
        }

        if self.universe.box_of(&operand.ty).is_some() && !identical(&operand.ty, &target) {
            let desc = self.describe_operand(&operand);
            self.push_error(
                Diagnostic::error(
                    Category::InvalidConversion,
                    format!("cannot convert {desc} to type {target}"),
                )
                .at(span_to_location(span))
                .with_help(Category::InvalidConversion.example_fix()),
            );
        } else if self.universe.box_of(&target).is_some() {
            self.check_assignable(&operand, &target, AssignContext::Conversion, value.span);
        }
        Operand::of(target)
    }

    /// `x.(T)`. On a box, `T` must be one of its variants.
    fn check_type_assert(&mut self, value: &Expr, ty: &TypeExpr) -> Operand {
        let operand = self.check_value(value);
        let target = self.resolve_type_expr(ty);
        if self.is_invalid(&operand.ty) || target.is_invalid() {
            return Operand::of(target);
        }

        if let Some(boxed) = self.universe.box_of(&operand.ty).cloned() {
            match boxed.position(&target) {
                Some(index) => self.push_step(
                    CheckAction::AssertVariant,
                    target.to_string(),
                    format!("variant {index} of {}", operand.ty),
                    Some(ty.span),
                ),
                None => {
                    let desc = self.describe_operand(&operand);
                    self.push_error(
                        Diagnostic::error(
                            Category::ImpossibleAssertion,
                            format!(
                                "impossible type assertion: {desc} cannot hold {target}"
                            ),
                        )
                        .at(span_to_location(ty.span))
                        .with_help(format!(
                            "{} is {}",
                            operand.ty,
                            self.semantics.display(&boxed)
                        )),
                    );
                }
            }
        } else if !self.universe.is_interface(&operand.ty) {
            let desc = self.describe_operand(&operand);
            self.push_error(
                Diagnostic::error(
                    Category::TypeMismatch,
                    format!("invalid operation: {desc} is not an interface or box"),
                )
                .at(span_to_location(value.span)),
            );
        }
        Operand::of(target)
    }

    fn check_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, span: Span) -> Operand {
        let left = self.check_value(lhs);
        let right = self.check_value(rhs);
        if self.is_invalid(&left.ty) || self.is_invalid(&right.ty) {
            return Operand::invalid();
        }

        for operand in [&left, &right] {
            if self.universe.box_of(&operand.ty).is_some() {
                let desc = self.describe_operand(operand);
                self.push_error(
                    Diagnostic::error(
                        Category::TypeMismatch,
                        format!(
                            "invalid operation: operator {} not defined on {desc}",
                            op.symbol()
                        ),
                    )
                    .at(span_to_location(span))
                    .with_help(Category::InvalidConversion.example_fix()),
                );
                return Operand::invalid();
            }
        }

        match (&left.ty, &right.ty) {
            (Type::Untyped(a), Type::Untyped(b)) => {
                self.fold_untyped(op, (*a, left.value.as_ref()), (*b, right.value.as_ref()), span)
            }
            (Type::Untyped(_), typed) => {
                let typed = typed.clone();
                self.binary_with_constant(op, &left, &typed, span)
            }
            (typed, Type::Untyped(_)) => {
                let typed = typed.clone();
                self.binary_with_constant(op, &right, &typed, span)
            }
            (a, b) if !identical(a, b) => {
                self.push_error(
                    Diagnostic::error(
                        Category::TypeMismatch,
                        format!("invalid operation: mismatched types {a} and {b}"),
                    )
                    .at(span_to_location(span)),
                );
                Operand::invalid()
            }
            (ty, _) => {
                let ty = ty.clone();
                self.binary_typed(op, &ty, span)
            }
        }
    }

    fn binary_with_constant(
        &mut self,
        op: BinOp,
        constant: &Operand,
        typed: &Type,
        span: Span,
    ) -> Operand {
        if !self.assignable(constant, typed) {
            let desc = self.describe_operand(constant);
            self.push_error(
                Diagnostic::error(
                    Category::TypeMismatch,
                    format!("cannot convert {desc} to type {typed}"),
                )
                .at(span_to_location(span)),
            );
            return Operand::invalid();
        }
        self.binary_typed(op, typed, span)
    }

    /// Both operands have type `ty`.
    fn binary_typed(&mut self, op: BinOp, ty: &Type, span: Span) -> Operand {
        if op.is_comparison() {
            return Operand::constant(UntypedKind::Bool, None);
        }
        let basic = self.universe.underlying(ty).as_basic();
        let defined = match basic {
            Some(BasicKind::Bool) => op.is_logical(),
            Some(BasicKind::String) => op == BinOp::Add,
            Some(kind) if kind.is_integer() => !op.is_logical(),
            Some(kind) if kind.is_numeric() => !op.is_logical() && op != BinOp::Rem,
            _ => false,
        };
        if !defined {
            self.push_error(
                Diagnostic::error(
                    Category::TypeMismatch,
                    format!("invalid operation: operator {} not defined on {ty}", op.symbol()),
                )
                .at(span_to_location(span)),
            );
            return Operand::invalid();
        }
        Operand::of(ty.clone())
    }

    /// Both operands are untyped constants: fold when the values are known.
    fn fold_untyped(
        &mut self,
        op: BinOp,
        (lhs_kind, lhs): (UntypedKind, Option<&ConstValue>),
        (rhs_kind, rhs): (UntypedKind, Option<&ConstValue>),
        span: Span,
    ) -> Operand {
        let kind = match untyped_result(op, lhs_kind, rhs_kind) {
            Some(kind) => kind,
            None => {
                self.push_error(
                    Diagnostic::error(
                        Category::TypeMismatch,
                        format!(
                            "invalid operation: operator {} not defined on {} and {}",
                            op.symbol(),
                            Type::Untyped(lhs_kind),
                            Type::Untyped(rhs_kind)
                        ),
                    )
                    .at(span_to_location(span)),
                );
                return Operand::invalid();
            }
        };
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return Operand::constant(kind, None);
        };
        match fold(op, lhs, rhs) {
            Ok(value) => Operand::constant(kind, Some(value)),
            Err(FoldError::DivisionByZero) => {
                self.push_error(
                    Diagnostic::error(Category::TypeMismatch, "invalid operation: division by zero")
                        .at(span_to_location(span)),
                );
                Operand::invalid()
            }
            Err(FoldError::Overflow) => {
                self.push_error(
                    Diagnostic::error(Category::TypeMismatch, "constant overflow")
                        .at(span_to_location(span)),
                );
                Operand::invalid()
            }
            Err(FoldError::Undefined) => Operand::constant(kind, None),
        }
    }

    fn is_boolean(&self, ty: &Type) -> bool {
        matches!(
            self.universe.underlying(ty),
            Type::Basic(BasicKind::Bool) | Type::Untyped(UntypedKind::Bool)
        )
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

fn literal(lit: &Lit) -> Operand {
    match lit {
        Lit::Int(n) => Operand::constant(UntypedKind::Int, Some(ConstValue::Int(*n))),
        Lit::Float(f) => Operand::constant(UntypedKind::Float, Some(ConstValue::Float(*f))),
        Lit::Rune(c) => Operand::constant(
            UntypedKind::Rune,
            Some(ConstValue::Int(i128::from(u32::from(*c)))),
        ),
        Lit::String(s) => Operand::constant(UntypedKind::String, Some(ConstValue::String(s.clone()))),
        Lit::Bool(b) => Operand::constant(UntypedKind::Bool, Some(ConstValue::Bool(*b))),
        Lit::Nil => Operand::constant(UntypedKind::Nil, None),
    }
}

/// Kind of the result of `lhs op rhs` on untyped operands, or `None` if the
/// operator is not defined on them.
fn untyped_result(op: BinOp, lhs: UntypedKind, rhs: UntypedKind) -> Option<UntypedKind> {
    use UntypedKind::*;
    if lhs == Nil || rhs == Nil {
        return None;
    }
    if op.is_logical() {
        return (lhs == Bool && rhs == Bool).then_some(Bool);
    }
    if lhs.is_numeric() && rhs.is_numeric() {
        if op.is_comparison() {
            return Some(Bool);
        }
        let kind = if lhs == Float || rhs == Float {
            Float
        } else if lhs == Rune || rhs == Rune {
            Rune
        } else {
            Int
        };
        if kind == Float && op == BinOp::Rem {
            return None;
        }
        return Some(kind);
    }
    if lhs != rhs {
        return None;
    }
    match (lhs, op) {
        (_, op) if op.is_comparison() => {
            let ordered = lhs == String;
            (ordered || matches!(op, BinOp::Eq | BinOp::Ne)).then_some(Bool)
        }
        (String, BinOp::Add) => Some(String),
        _ => None,
    }
}

enum FoldError {
    DivisionByZero,
    Overflow,
    /// The values cannot be combined; the result is left unknown.
    Undefined,
}

fn fold(op: BinOp, lhs: &ConstValue, rhs: &ConstValue) -> Result<ConstValue, FoldError> {
    match (lhs, rhs) {
        (ConstValue::Int(a), ConstValue::Int(b)) => fold_int(op, *a, *b),
        (ConstValue::Int(_) | ConstValue::Float(_), ConstValue::Int(_) | ConstValue::Float(_)) => {
            fold_float(op, as_f64(lhs), as_f64(rhs))
        }
        (ConstValue::String(a), ConstValue::String(b)) => match op {
            BinOp::Add => Ok(ConstValue::String(format!("{a}{b}"))),
            op if op.is_comparison() => Ok(ConstValue::Bool(compare(op, a.cmp(b)))),
            _ => Err(FoldError::Undefined),
        },
        (ConstValue::Bool(a), ConstValue::Bool(b)) => match op {
            BinOp::And => Ok(ConstValue::Bool(*a && *b)),
            BinOp::Or => Ok(ConstValue::Bool(*a || *b)),
            BinOp::Eq => Ok(ConstValue::Bool(a == b)),
            BinOp::Ne => Ok(ConstValue::Bool(a != b)),
            _ => Err(FoldError::Undefined),
        },
        _ => Err(FoldError::Undefined),
    }
}

fn fold_int(op: BinOp, a: i128, b: i128) -> Result<ConstValue, FoldError> {
    let value = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div | BinOp::Rem if b == 0 => return Err(FoldError::DivisionByZero),
        BinOp::Div => a.checked_div(b),
        BinOp::Rem => a.checked_rem(b),
        op if op.is_comparison() => return Ok(ConstValue::Bool(compare(op, a.cmp(&b)))),
        _ => return Err(FoldError::Undefined),
    };
    value.map(ConstValue::Int).ok_or(FoldError::Overflow)
}

fn fold_float(op: BinOp, a: f64, b: f64) -> Result<ConstValue, FoldError> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div if b == 0.0 => return Err(FoldError::DivisionByZero),
        BinOp::Div => a / b,
        op if op.is_comparison() => {
            return a
                .partial_cmp(&b)
                .map(|ord| ConstValue::Bool(compare(op, ord)))
                .ok_or(FoldError::Undefined);
        }
        _ => return Err(FoldError::Undefined),
    };
    Ok(ConstValue::Float(value))
}

fn as_f64(value: &ConstValue) -> f64 {
    match value {
        ConstValue::Int(n) => *n as f64,
        ConstValue::Float(f) => *f,
        _ => f64::NAN,
    }
}

fn compare(op: BinOp, ord: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinOp::Eq => ord == Equal,
        BinOp::Ne => ord != Equal,
        BinOp::Lt => ord == Less,
        BinOp::Le => ord != Greater,
        BinOp::Gt => ord == Greater,
        BinOp::Ge => ord != Less,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_print_builtin(name: &str) -> bool {
    matches!(name, "println" | "print")
}

/// Short source-like label for an expression in diagnostics.
fn expr_label(expr: &Expr) -> String {
    match &expr.node {
        ExprKind::Name(name) => name.clone(),
        ExprKind::Call { func, .. } => format!("{}()", func.node),
        _ => "expression".to_string(),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
