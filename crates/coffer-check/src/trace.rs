//! Structured trace of checker decisions.
//!
//! When [`CheckOptions::trace`](crate::CheckOptions::trace) is set, the
//! checker records one [`CheckStep`] per decision it makes about a box type:
//! which variants were accepted, which assignment chose which variant, and
//! what a type switch was missing. Tracing is off by default and costs
//! nothing when disabled.

use serde::Serialize;

/// A single recorded decision.
#[derive(Debug, Clone, Serialize)]
pub struct CheckStep {
    pub step: usize,
    pub action: CheckAction,
    /// Display form of the type or operand the decision is about.
    pub subject: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<(u32, u32)>,
}

/// What kind of decision a step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckAction {
    /// A type declaration's underlying type was resolved.
    ResolveType,
    AcceptVariant,
    RejectVariant,
    /// A variant that was already invalid was skipped silently.
    DropVariant,
    DuplicateVariant,
    /// A box type was frozen (or found to have no valid variants).
    BuildBox,
    /// A value was stored in a box as the named variant.
    AssignVariant,
    RejectAssignment,
    AssertVariant,
    SwitchExhaustive,
    SwitchRejected,
}
