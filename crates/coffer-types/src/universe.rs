use std::sync::Arc;

use crate::{BoxType, NamedId, NamedType, Type};

/// The head constructor of a declaration's type expression, recorded while
/// the declaration is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclHead {
    Basic,
    Struct,
    Box,
    /// Another named type (`type A B`).
    Named,
    /// Any other composite (slice, map, pointer, ...).
    Other,
}

/// Resolution state of a named type.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedState {
    Declared,
    InProgress(DeclHead),
    Complete(Type),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedInfo {
    pub name: String,
    /// Package path; empty for predeclared types.
    pub package: String,
    pub state: NamedState,
}

/// Table of the named types known to one checked module.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    named: Vec<NamedInfo>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new named type. Its underlying type is unknown until
    /// [`Universe::complete`] is called.
    pub fn declare(&mut self, name: impl Into<String>, package: impl Into<String>) -> NamedType {
        let id = NamedId(self.named.len() as u32);
        let name = name.into();
        self.named.push(NamedInfo {
            name: name.clone(),
            package: package.into(),
            state: NamedState::Declared,
        });
        NamedType { id, name }
    }

    pub fn begin(&mut self, id: NamedId, head: DeclHead) {
        if let Some(info) = self.named.get_mut(id.0 as usize) {
            info.state = NamedState::InProgress(head);
        }
    }

    pub fn complete(&mut self, id: NamedId, underlying: Type) {
        if let Some(info) = self.named.get_mut(id.0 as usize) {
            info.state = NamedState::Complete(underlying);
        }
    }

    pub fn get(&self, id: NamedId) -> Option<&NamedInfo> {
        self.named.get(id.0 as usize)
    }

    pub fn state(&self, id: NamedId) -> Option<&NamedState> {
        self.get(id).map(|info| &info.state)
    }

    pub fn named_type(&self, id: NamedId) -> Option<NamedType> {
        self.get(id).map(|info| NamedType {
            id,
            name: info.name.clone(),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<NamedId> {
        self.named
            .iter()
            .position(|info| info.name == name)
            .map(|idx| NamedId(idx as u32))
    }

    /// Underlying type of `ty`. Named types resolve through the table;
    /// unresolved names yield `Invalid`.
    pub fn underlying<'a>(&'a self, ty: &'a Type) -> &'a Type {
        match ty {
            Type::Named(named) => match self.state(named.id) {
                Some(NamedState::Complete(underlying)) => underlying,
                _ => &Type::Invalid,
            },
            other => other,
        }
    }

    /// The box type behind `ty`, if `ty` is a box or a named box.
    pub fn box_of<'a>(&'a self, ty: &'a Type) -> Option<&'a Arc<BoxType>> {
        match self.underlying(ty) {
            Type::Box(boxed) => Some(boxed),
            _ => None,
        }
    }

    pub fn is_interface(&self, ty: &Type) -> bool {
        matches!(self.underlying(ty), Type::Interface(_))
    }

    /// `package.Name`, or the bare name for predeclared types.
    pub fn qualified_name(&self, id: NamedId) -> Option<String> {
        self.get(id).map(|info| {
            if info.package.is_empty() {
                info.name.clone()
            } else {
                format!("{}.{}", info.package, info.name)
            }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (NamedId, &NamedInfo)> {
        self.named
            .iter()
            .enumerate()
            .map(|(idx, info)| (NamedId(idx as u32), info))
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }
}
