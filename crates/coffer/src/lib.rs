//! Pipeline driver for coffer.
//!
//! Checks a parsed module, fails with its diagnostics if checking reported
//! errors, and otherwise lowers every declared type into a runtime
//! [`DescriptorTable`](coffer_rt::DescriptorTable) that box values and
//! assertions are resolved against.

mod compiler;
pub mod descriptors;

pub use compiler::{
    CompileError, CompileOptions, Compiled, check_module, compile_module, diagnostics_json,
    emit_diagnostics, render_diagnostics,
};
pub use descriptors::{Descriptors, LowerError, lower_types};
