use std::collections::BTreeMap;

use coffer_ast::Module;
use coffer_check::{CheckOptions, CheckedModule};
use coffer_diag::{Diagnostic, DiagnosticError};
use coffer_rt::{BoxLayout, DescriptorTable, LayoutError, Matcher, TypeRef};
use coffer_types::Type;

use crate::descriptors::{Descriptors, LowerError};

/// Options for one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub check: CheckOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("checking failed:\n{}", render_diagnostics(.0.diagnostics()))]
    Diagnostics(#[from] DiagnosticError),
    #[error("descriptor lowering failed for `{name}`: {source}")]
    Lower {
        name: String,
        #[source]
        source: LowerError,
    },
}

impl CompileError {
    /// The diagnostics that failed the compilation, if checking failed.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Diagnostics(err) => err.diagnostics(),
            CompileError::Lower { .. } => &[],
        }
    }
}

/// A checked module together with the runtime descriptors of its types.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub checked: CheckedModule,
    pub descriptors: Descriptors,
    /// Descriptor of every type name the module declares.
    pub types: BTreeMap<String, TypeRef>,
}

impl Compiled {
    pub fn table(&self) -> &DescriptorTable {
        self.descriptors.table()
    }

    /// Descriptor of a declared type name.
    pub fn type_ref(&self, name: &str) -> Option<TypeRef> {
        self.types.get(name).copied()
    }

    /// Lower one more type into this module's descriptor table.
    pub fn lower(&mut self, ty: &Type) -> Result<TypeRef, LowerError> {
        self.descriptors.lower(&self.checked.universe, ty)
    }

    /// A matcher over this module's descriptors.
    pub fn matcher(&self) -> Matcher<'_> {
        Matcher::new(self.descriptors.table())
    }

    /// The tagged layout of a declared box type.
    pub fn layout(&self, name: &str) -> Result<BoxLayout, LayoutError> {
        let Some(r) = self.type_ref(name) else {
            return Err(LayoutError::NotABox {
                repr: name.to_string(),
            });
        };
        BoxLayout::new(self.table(), r)
    }
}

/// Check a module. Always returns the checked module with every diagnostic,
/// whether or not checking succeeded.
pub fn check_module(module: &Module, options: &CompileOptions) -> CheckedModule {
    coffer_check::check_module(module, options.check.clone())
}

/// Check a module and lower its declared types to runtime descriptors.
///
/// Fails with every error diagnostic, in source order, if checking reported
/// any.
pub fn compile_module(module: &Module, options: &CompileOptions) -> Result<Compiled, CompileError> {
    let _span = tracing::info_span!("compile_module", package = %module.package).entered();

    let checked = check_module(module, options);
    let failing = failing_diagnostics(&checked.diagnostics);
    if !failing.is_empty() {
        tracing::debug!(count = failing.len(), "checking failed");
        return Err(DiagnosticError::multiple(failing).into());
    }

    let mut descriptors = Descriptors::new();
    let mut types = BTreeMap::new();
    for (name, ty) in &checked.type_names {
        let r = descriptors
            .lower(&checked.universe, ty)
            .map_err(|source| CompileError::Lower {
                name: name.clone(),
                source,
            })?;
        types.insert(name.clone(), r);
    }
    tracing::debug!(
        types = types.len(),
        descriptors = descriptors.table().len(),
        "descriptors lowered"
    );

    Ok(Compiled {
        checked,
        descriptors,
        types,
    })
}

/// Render diagnostics one per line, as they are printed to stderr.
pub fn render_diagnostics(diags: &[Diagnostic]) -> String {
    diags
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render diagnostics as a JSON array.
pub fn diagnostics_json(diags: &[Diagnostic]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(diags)
}

pub fn emit_diagnostics(diags: &[Diagnostic]) {
    for diag in diags {
        eprintln!("{diag}");
    }
}

/// Diagnostics that fail a compilation, ordered by source position.
/// Diagnostics without a location sort last.
fn failing_diagnostics(diags: &[Diagnostic]) -> Vec<Diagnostic> {
    let mut failing: Vec<Diagnostic> = diags
        .iter()
        .filter(|d| d.is_error())
        .cloned()
        .collect();
    failing.sort_by_key(|d| match d.location {
        Some(loc) => (0, loc.file_id, loc.start),
        None => (1, 0, 0),
    });
    failing
}

#[cfg(test)]
mod tests {
    use coffer_diag::{Category, SourceLocation};

    use super::*;

    fn at(start: u32) -> SourceLocation {
        SourceLocation {
            file_id: 0,
            start,
            end: start + 1,
        }
    }

    #[test]
    fn failing_diagnostics_are_sorted_by_position() {
        let diags = vec![
            Diagnostic::error(Category::UndefinedName, "undefined: x"),
            Diagnostic::error(Category::DuplicateVariant, "second").at(at(40)),
            Diagnostic::warning(Category::TypeMismatch, "odd").at(at(5)),
            Diagnostic::error(Category::InvalidVariantType, "first").at(at(12)),
        ];

        let failing = failing_diagnostics(&diags);
        let messages: Vec<_> = failing.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "undefined: x"]);
    }

    #[test]
    fn rendering_joins_lines() {
        let diags = vec![
            Diagnostic::error(Category::DuplicateVariant, "duplicate variant type int"),
            Diagnostic::error(Category::UndefinedName, "undefined: Foo").with_help("declare it"),
        ];
        insta::assert_snapshot!(render_diagnostics(&diags), @r"
        error[E0102]: duplicate variant type int
        error[E0001]: undefined: Foo
          help: declare it
        ");
    }
}
