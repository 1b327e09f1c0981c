//! Error reporting and diagnostics for coffer.
//!
//! This crate provides structured diagnostics with source location tracking.
//! Diagnostics are created by the checker (`coffer-check`) and rendered here
//! for display. They are values, never control flow: the checker records
//! every problem it finds and keeps going, so one declaration can report
//! several independent errors.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Broad category for diagnostics. Each category owns one stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A referenced type, variable, or function is undefined.
    UndefinedName,
    /// A name is declared twice in the same scope.
    DuplicateDeclaration,
    /// Operand type does not match the expected type.
    TypeMismatch,
    /// Wrong number of arguments, results, or assignment targets.
    ArityMismatch,
    /// A box variant is an anonymous composite, indirection, or interface type.
    InvalidVariantType,
    /// The same resolved type is listed twice in one box.
    DuplicateVariant,
    /// A box type switch leaves a declared variant unhandled.
    NonExhaustiveSwitch,
    /// Two cases of a box type switch name the same variant.
    DuplicateSwitchCase,
    /// A box type switch contains a `default` clause.
    DefaultCaseNotAllowed,
    /// The assigned value's type is not one of the box's variants.
    InvalidAssignment,
    /// A box type switch case names a type that is not a variant.
    ImpossibleCase,
    /// A type assertion on a box names a type that is not a variant.
    ImpossibleAssertion,
    /// A box value is converted directly to another type.
    InvalidConversion,
    /// An untyped constant fits more than one box variant.
    AmbiguousConstant,
    /// A named type's definition depends on itself.
    InvalidRecursiveType,
}

impl Category {
    pub const ALL: [Category; 15] = [
        Category::UndefinedName,
        Category::DuplicateDeclaration,
        Category::TypeMismatch,
        Category::ArityMismatch,
        Category::InvalidVariantType,
        Category::DuplicateVariant,
        Category::NonExhaustiveSwitch,
        Category::DuplicateSwitchCase,
        Category::DefaultCaseNotAllowed,
        Category::InvalidAssignment,
        Category::ImpossibleCase,
        Category::ImpossibleAssertion,
        Category::InvalidConversion,
        Category::AmbiguousConstant,
        Category::InvalidRecursiveType,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::UndefinedName => "undefined_name",
            Category::DuplicateDeclaration => "duplicate_declaration",
            Category::TypeMismatch => "type_mismatch",
            Category::ArityMismatch => "arity_mismatch",
            Category::InvalidVariantType => "invalid_variant_type",
            Category::DuplicateVariant => "duplicate_variant",
            Category::NonExhaustiveSwitch => "non_exhaustive_switch",
            Category::DuplicateSwitchCase => "duplicate_switch_case",
            Category::DefaultCaseNotAllowed => "default_case_not_allowed",
            Category::InvalidAssignment => "invalid_assignment",
            Category::ImpossibleCase => "impossible_case",
            Category::ImpossibleAssertion => "impossible_assertion",
            Category::InvalidConversion => "invalid_conversion",
            Category::AmbiguousConstant => "ambiguous_constant",
            Category::InvalidRecursiveType => "invalid_recursive_type",
        }
    }

    /// Stable code. `E00xx` are general typing errors, `E01xx` box rules.
    pub fn code(self) -> &'static str {
        match self {
            Category::UndefinedName => "E0001",
            Category::DuplicateDeclaration => "E0002",
            Category::TypeMismatch => "E0003",
            Category::ArityMismatch => "E0004",
            Category::InvalidVariantType => "E0101",
            Category::DuplicateVariant => "E0102",
            Category::NonExhaustiveSwitch => "E0103",
            Category::DuplicateSwitchCase => "E0104",
            Category::DefaultCaseNotAllowed => "E0105",
            Category::InvalidAssignment => "E0106",
            Category::ImpossibleCase => "E0107",
            Category::ImpossibleAssertion => "E0108",
            Category::InvalidConversion => "E0109",
            Category::AmbiguousConstant => "E0110",
            Category::InvalidRecursiveType => "E0111",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::UndefinedName => "A referenced type, variable, or function is undefined.",
            Category::DuplicateDeclaration => "A name is declared more than once in one scope.",
            Category::TypeMismatch => "Operand type does not match the expected type.",
            Category::ArityMismatch => {
                "The number of values does not match the number of targets or parameters."
            }
            Category::InvalidVariantType => {
                "Only basic types and named types may be box variants."
            }
            Category::DuplicateVariant => "A box lists the same variant type twice.",
            Category::NonExhaustiveSwitch => {
                "A type switch over a box does not handle every variant."
            }
            Category::DuplicateSwitchCase => "A type switch over a box handles a variant twice.",
            Category::DefaultCaseNotAllowed => {
                "A type switch over a box must not have a default clause."
            }
            Category::InvalidAssignment => "The assigned type is not a variant of the box.",
            Category::ImpossibleCase => "A switch case names a type the box can never hold.",
            Category::ImpossibleAssertion => {
                "A type assertion names a type the box can never hold."
            }
            Category::InvalidConversion => "Box values cannot be converted to other types.",
            Category::AmbiguousConstant => {
                "An untyped constant could be stored as more than one box variant."
            }
            Category::InvalidRecursiveType => "A named type is defined in terms of itself.",
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::UndefinedName => "Declare the missing name or fix the spelling.",
            Category::DuplicateDeclaration => "Rename or remove one of the declarations.",
            Category::TypeMismatch => "Convert the operand or change the declared type.",
            Category::ArityMismatch => "Match the number of values to the number of targets.",
            Category::InvalidVariantType => {
                "Declare a named type for the composite and list the name instead."
            }
            Category::DuplicateVariant => "Remove the repeated variant.",
            Category::NonExhaustiveSwitch => "Add a case for each missing variant.",
            Category::DuplicateSwitchCase => "Merge the repeated cases into one.",
            Category::DefaultCaseNotAllowed => {
                "Replace the default clause with cases for the remaining variants."
            }
            Category::InvalidAssignment => {
                "Convert the value to one of the box's variants or add a variant."
            }
            Category::ImpossibleCase => "Remove the case or add the type as a variant.",
            Category::ImpossibleAssertion => "Assert one of the box's variant types instead.",
            Category::InvalidConversion => {
                "Unpack the value with `v, ok := b.(T)` or a type switch."
            }
            Category::AmbiguousConstant => "Convert the constant to the intended variant type.",
            Category::InvalidRecursiveType => {
                "Break the cycle through a pointer or a named struct field."
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Source locations (independent of coffer-ast's Span)
// ---------------------------------------------------------------------------

/// A source location for diagnostics.
///
/// Uses byte offsets. Callers convert from `coffer-ast` spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0101).
    pub code: Option<String>,
    pub severity: Severity,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Additional labeled spans (e.g., "first handled here").
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<DiagLabel>,
    /// Suggested fix, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagLabel {
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity,
            category,
            message: message.into(),
            location: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            location,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        if let Some(code) = &self.code {
            write!(f, "{prefix}[{code}]: {}", self.message)?;
        } else {
            write!(f, "{prefix}: {}", self.message)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }

    /// Whether any wrapped diagnostic has the given category.
    pub fn has_category(&self, category: Category) -> bool {
        self.0.iter().any(|d| d.category == category)
    }
}
