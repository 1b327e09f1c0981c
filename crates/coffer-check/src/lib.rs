//! Box type checking for coffer.
//!
//! This crate implements:
//! - Lazy resolution of named type declarations with cycle detection
//! - The variant validator that decides which types may appear in a box
//! - Assignment, conversion and type assertion rules for box values
//! - Exhaustiveness checking of type switches over boxes
//!
//! Checking never stops at the first problem. Every violation becomes a
//! [`Diagnostic`] collected on the [`CheckContext`], and the rest of the
//! module is still checked so one pass reports everything it can.

pub mod exhaustive;
pub mod trace;

mod assign;
mod decls;
mod stmts;
mod validate;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use coffer_ast::{Module, Span, TypeExpr};
use coffer_types::{BoxType, FuncType, NamedId, Type, Universe};

pub use coffer_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};
pub use validate::{BoxSemantics, RejectReason, StandardBox, Verdict};

use crate::trace::{CheckAction, CheckStep};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for one checking run.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Record a [`CheckStep`] for every validator, assignment and switch
    /// decision.
    pub trace: bool,
    /// Package path used to qualify named types. Defaults to the module's
    /// own package.
    pub package_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Checked module
// ---------------------------------------------------------------------------

/// The result of checking a module: resolved types plus every diagnostic.
#[derive(Debug, Clone)]
pub struct CheckedModule {
    pub universe: Universe,
    pub diagnostics: Vec<Diagnostic>,
    pub trace: Vec<CheckStep>,
    /// Signatures of the module's functions.
    pub functions: BTreeMap<String, FuncType>,
    /// Every type name the module declares, mapped to the type it denotes.
    pub type_names: BTreeMap<String, Type>,
}

impl CheckedModule {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    /// The frozen box type behind a declared type name.
    pub fn box_type(&self, name: &str) -> Option<Arc<BoxType>> {
        let ty = self.type_names.get(name)?;
        self.universe.box_of(ty).cloned()
    }

    /// Serialize the check trace as pretty-printed JSON.
    pub fn trace_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.trace)
    }
}

/// Check a module with the standard box rules.
pub fn check_module(module: &Module, options: CheckOptions) -> CheckedModule {
    CheckContext::new(options).check_module(module)
}

// ---------------------------------------------------------------------------
// Checker context
// ---------------------------------------------------------------------------

/// What a module-level type name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeBinding {
    Named(NamedId),
    Alias,
}

/// Resolution state of a type alias.
#[derive(Debug, Clone)]
enum AliasSlot {
    Pending(TypeExpr),
    Resolving,
    Resolved(Type),
}

/// Syntax of a defined type, kept until the declaration is resolved.
#[derive(Debug, Clone)]
struct DeclSyntax {
    ty: TypeExpr,
    span: Span,
}

/// Mutable state of one checking run.
pub struct CheckContext<S: BoxSemantics = StandardBox> {
    semantics: S,
    options: CheckOptions,
    package: String,
    universe: Universe,
    type_bindings: HashMap<String, TypeBinding>,
    /// Type names in declaration order.
    type_order: Vec<String>,
    decl_syntax: HashMap<NamedId, DeclSyntax>,
    aliases: HashMap<String, AliasSlot>,
    /// Spans of module-level declarations, for duplicate detection.
    declared: HashMap<String, Span>,
    funcs: BTreeMap<String, FuncType>,
    globals: HashMap<String, Type>,
    scopes: Vec<HashMap<String, Type>>,
    /// Result types of the function whose body is being checked.
    results: Vec<Type>,
    errors: Vec<Diagnostic>,
    trace: Vec<CheckStep>,
}

impl CheckContext<StandardBox> {
    pub fn new(options: CheckOptions) -> Self {
        Self::with_semantics(StandardBox, options)
    }
}

impl<S: BoxSemantics> CheckContext<S> {
    /// Create a context that applies `semantics` to every box type.
    pub fn with_semantics(semantics: S, options: CheckOptions) -> Self {
        let mut ctx = Self {
            semantics,
            package: options.package_path.clone().unwrap_or_default(),
            options,
            universe: Universe::new(),
            type_bindings: HashMap::new(),
            type_order: Vec::new(),
            decl_syntax: HashMap::new(),
            aliases: HashMap::new(),
            declared: HashMap::new(),
            funcs: BTreeMap::new(),
            globals: HashMap::new(),
            scopes: Vec::new(),
            results: Vec::new(),
            errors: Vec::new(),
            trace: Vec::new(),
        };
        ctx.declare_predeclared();
        ctx
    }

    /// Check every declaration of `module` and hand back the results.
    pub fn check_module(mut self, module: &Module) -> CheckedModule {
        if self.options.package_path.is_none() {
            self.package = module.package.clone();
        }
        let _span = tracing::info_span!("check_module", package = %self.package).entered();

        self.collect_declarations(module);
        self.resolve_declarations();
        let signatures = self.check_signatures(module);
        self.check_globals(module);
        self.check_bodies(module, &signatures);

        tracing::debug!(
            named_types = self.universe.len(),
            functions = self.funcs.len(),
            errors = self.errors.len(),
            "module checked"
        );

        let type_names = self
            .type_order
            .iter()
            .filter_map(|name| self.type_named(name).map(|ty| (name.clone(), ty)))
            .collect();

        CheckedModule {
            universe: self.universe,
            diagnostics: self.errors,
            trace: self.trace,
            functions: self.funcs,
            type_names,
        }
    }

    /// Push a diagnostic error.
    pub fn push_error(&mut self, diag: Diagnostic) {
        self.errors.push(diag);
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(Diagnostic::is_error)
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn semantics(&self) -> &S {
        &self.semantics
    }

    /// Get the check trace (empty if tracing was not enabled).
    pub fn trace(&self) -> &[CheckStep] {
        &self.trace
    }

    fn push_step(
        &mut self,
        action: CheckAction,
        subject: impl Into<String>,
        detail: impl Into<String>,
        span: Option<Span>,
    ) {
        if self.options.trace {
            let step = self.trace.len() + 1;
            self.trace.push(CheckStep {
                step,
                action,
                subject: subject.into(),
                detail: detail.into(),
                span: span.map(|s| (s.start, s.end)),
            });
        }
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declare a local variable in the innermost scope. `_` is never bound.
    fn declare_local(&mut self, name: &str, ty: Type, span: Span) {
        if name == "_" {
            return;
        }
        let Some(scope) = self.scopes.last_mut() else {
            self.globals.insert(name.to_string(), ty);
            return;
        };
        if scope.contains_key(name) {
            self.push_error(
                Diagnostic::error(
                    Category::DuplicateDeclaration,
                    format!("{name} redeclared in this block"),
                )
                .at(span_to_location(span)),
            );
            return;
        }
        scope.insert(name.to_string(), ty);
    }

    /// True if `ty` is invalid or names a type whose declaration failed.
    fn is_invalid(&self, ty: &Type) -> bool {
        self.universe.underlying(ty).is_invalid()
    }

    fn lookup_var(&self, name: &str) -> Option<&Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn span_to_location(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}
