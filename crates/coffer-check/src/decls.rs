//! Declaration collection and lazy type resolution.
//!
//! Type declarations are registered in the [`Universe`] first and resolved on
//! demand, in whatever order references reach them. A declaration being
//! resolved is marked in progress with the head of its type expression, so a
//! reference back into it (directly or through other declarations) is seen
//! by the variant validator instead of recursing forever.
//!
//! [`Universe`]: coffer_types::Universe

use coffer_ast::{
    ChanDir as AstChanDir, DeclKind, FieldExpr, FuncTypeExpr, Module, Span, TypeExpr,
    TypeExprKind,
};
use coffer_types::{
    BasicKind, ChanDir, DeclHead, Field, FuncType, InterfaceType, Method, NamedId, NamedState,
    NamedType, StructType, Type,
};

use crate::trace::CheckAction;
use crate::{
    AliasSlot, BoxSemantics, Category, CheckContext, DeclSyntax, Diagnostic, TypeBinding,
    span_to_location,
};

impl<S: BoxSemantics> CheckContext<S> {
    /// Register the predeclared `error` and `any` types.
    pub(crate) fn declare_predeclared(&mut self) {
        let error = self.universe.declare("error", "");
        self.universe.complete(
            error.id,
            Type::Interface(InterfaceType::new(vec![Method {
                name: "Error".to_string(),
                sig: FuncType {
                    params: vec![],
                    results: vec![Type::Basic(BasicKind::String)],
                    variadic: false,
                },
            }])),
        );
        self.type_bindings
            .insert("error".to_string(), TypeBinding::Named(error.id));

        self.aliases.insert(
            "any".to_string(),
            AliasSlot::Resolved(Type::Interface(InterfaceType::new(vec![]))),
        );
        self.type_bindings
            .insert("any".to_string(), TypeBinding::Alias);
    }

    /// Register every module-level name. Type declarations are recorded but
    /// not resolved yet.
    pub(crate) fn collect_declarations(&mut self, module: &Module) {
        for decl in &module.decls {
            let name = match &decl.node {
                DeclKind::Type(def) => &def.name,
                DeclKind::Func(func) => &func.name,
                DeclKind::Var(var) => &var.name,
            };
            if name.node != "_" {
                if let Some(prev) = self.declared.get(&name.node).copied() {
                    self.push_error(
                        Diagnostic::error(
                            Category::DuplicateDeclaration,
                            format!("{} redeclared in this block", name.node),
                        )
                        .at(span_to_location(name.span))
                        .with_label(
                            span_to_location(prev),
                            format!("other declaration of {}", name.node),
                        ),
                    );
                    continue;
                }
                self.declared.insert(name.node.clone(), name.span);
            }

            let DeclKind::Type(def) = &decl.node else {
                continue;
            };
            if def.alias {
                self.aliases
                    .insert(def.name.node.clone(), AliasSlot::Pending(def.ty.clone()));
                self.type_bindings
                    .insert(def.name.node.clone(), TypeBinding::Alias);
            } else {
                let named = self.universe.declare(def.name.node.clone(), self.package.clone());
                self.decl_syntax.insert(
                    named.id,
                    DeclSyntax {
                        ty: def.ty.clone(),
                        span: def.name.span,
                    },
                );
                self.type_bindings
                    .insert(def.name.node.clone(), TypeBinding::Named(named.id));
            }
            self.type_order.push(def.name.node.clone());
        }
    }

    /// Resolve every declared type, in declaration order. Declarations that
    /// were already forced by an earlier reference are skipped.
    pub(crate) fn resolve_declarations(&mut self) {
        for name in self.type_order.clone() {
            match self.type_bindings.get(&name).copied() {
                Some(TypeBinding::Named(id)) => self.resolve_named(id),
                Some(TypeBinding::Alias) => {
                    let span = self.declared.get(&name).copied().unwrap_or_else(Span::synthetic);
                    self.resolve_alias(&name, span);
                }
                None => {}
            }
        }
    }

    /// Resolve a defined type's underlying type, unless it is already
    /// resolved or being resolved.
    pub(crate) fn resolve_named(&mut self, id: NamedId) {
        if !matches!(self.universe.state(id), Some(NamedState::Declared)) {
            return;
        }
        let Some(syntax) = self.decl_syntax.get(&id).cloned() else {
            return;
        };
        let name = self
            .universe
            .get(id)
            .map(|info| info.name.clone())
            .unwrap_or_default();

        let head = self.decl_head(&syntax.ty);
        tracing::trace!(name = %name, ?head, "resolving type declaration");
        self.universe.begin(id, head);

        let underlying = match self.resolve_type_expr(&syntax.ty) {
            // `type A B` takes B's underlying type, which must be resolved
            // first.
            Type::Named(other) => {
                self.resolve_named(other.id);
                match self.universe.state(other.id) {
                    Some(NamedState::Complete(underlying)) => underlying.clone(),
                    Some(NamedState::InProgress(_)) => {
                        self.push_error(
                            Diagnostic::error(
                                Category::InvalidRecursiveType,
                                format!("invalid recursive type {name}"),
                            )
                            .at(span_to_location(syntax.span))
                            .with_label(
                                span_to_location(syntax.ty.span),
                                format!("{name} refers to {}", other.name),
                            ),
                        );
                        Type::Invalid
                    }
                    _ => Type::Invalid,
                }
            }
            other => other,
        };

        self.push_step(
            CheckAction::ResolveType,
            name,
            underlying.to_string(),
            Some(syntax.span),
        );
        self.universe.complete(id, underlying);
    }

    fn decl_head(&self, expr: &TypeExpr) -> DeclHead {
        match &expr.node {
            TypeExprKind::Name(name) => {
                if !self.type_bindings.contains_key(name) && BasicKind::from_name(name).is_some() {
                    DeclHead::Basic
                } else {
                    DeclHead::Named
                }
            }
            TypeExprKind::Struct(_) => DeclHead::Struct,
            TypeExprKind::Box(_) => DeclHead::Box,
            _ => DeclHead::Other,
        }
    }

    // -----------------------------------------------------------------------
    // Type expressions
    // -----------------------------------------------------------------------

    /// Convert a syntactic type expression to a semantic type. Names of
    /// defined types are returned as references and are not forced.
    pub(crate) fn resolve_type_expr(&mut self, expr: &TypeExpr) -> Type {
        match &expr.node {
            TypeExprKind::Name(name) => self.resolve_type_name(name, expr.span),
            TypeExprKind::Pointer(elem) => Type::Pointer(Box::new(self.resolve_type_expr(elem))),
            TypeExprKind::Slice(elem) => Type::Slice(Box::new(self.resolve_type_expr(elem))),
            TypeExprKind::Array { len, elem } => {
                Type::Array(*len, Box::new(self.resolve_type_expr(elem)))
            }
            TypeExprKind::Map { key, value } => {
                let key = self.resolve_type_expr(key);
                let value = self.resolve_type_expr(value);
                Type::Map(Box::new(key), Box::new(value))
            }
            TypeExprKind::Chan { dir, elem } => {
                let dir = match dir {
                    AstChanDir::Both => ChanDir::Both,
                    AstChanDir::Send => ChanDir::Send,
                    AstChanDir::Recv => ChanDir::Recv,
                };
                Type::Chan(dir, Box::new(self.resolve_type_expr(elem)))
            }
            TypeExprKind::Func(func) => Type::Func(self.resolve_func_type(func)),
            TypeExprKind::Struct(fields) => self.resolve_struct(fields),
            TypeExprKind::Interface(methods) => {
                let methods = methods
                    .iter()
                    .map(|method| Method {
                        name: method.name.node.clone(),
                        sig: self.resolve_func_type(&method.sig),
                    })
                    .collect();
                Type::Interface(InterfaceType::new(methods))
            }
            TypeExprKind::Box(boxed) => self.resolve_box(boxed, expr.span),
        }
    }

    fn resolve_type_name(&mut self, name: &str, span: Span) -> Type {
        match self.type_bindings.get(name).copied() {
            Some(TypeBinding::Named(id)) => Type::Named(NamedType {
                id,
                name: name.to_string(),
            }),
            Some(TypeBinding::Alias) => self.resolve_alias(name, span),
            None => match BasicKind::from_name(name) {
                Some(kind) => Type::Basic(kind),
                None => {
                    self.push_error(
                        Diagnostic::error(Category::UndefinedName, format!("undefined: {name}"))
                            .at(span_to_location(span)),
                    );
                    Type::Invalid
                }
            },
        }
    }

    fn resolve_alias(&mut self, name: &str, span: Span) -> Type {
        let Some(slot) = self.aliases.get_mut(name) else {
            return Type::Invalid;
        };
        match std::mem::replace(slot, AliasSlot::Resolving) {
            AliasSlot::Resolved(ty) => {
                *slot = AliasSlot::Resolved(ty.clone());
                ty
            }
            AliasSlot::Resolving => {
                self.push_error(
                    Diagnostic::error(
                        Category::InvalidRecursiveType,
                        format!("invalid recursive type alias {name}"),
                    )
                    .at(span_to_location(span)),
                );
                Type::Invalid
            }
            AliasSlot::Pending(expr) => {
                let ty = self.resolve_type_expr(&expr);
                if let Some(slot) = self.aliases.get_mut(name) {
                    *slot = AliasSlot::Resolved(ty.clone());
                }
                ty
            }
        }
    }

    pub(crate) fn resolve_func_type(&mut self, func: &FuncTypeExpr) -> FuncType {
        let mut params: Vec<Type> = func
            .params
            .iter()
            .map(|param| self.resolve_type_expr(param))
            .collect();
        if func.variadic {
            if let Some(last) = params.pop() {
                params.push(Type::Slice(Box::new(last)));
            }
        }
        let results = func
            .results
            .iter()
            .map(|result| self.resolve_type_expr(result))
            .collect();
        FuncType {
            params,
            results,
            variadic: func.variadic,
        }
    }

    fn resolve_struct(&mut self, fields: &[FieldExpr]) -> Type {
        let fields = fields
            .iter()
            .map(|field| {
                let ty = self.resolve_type_expr(&field.ty);
                let (name, embedded) = match &field.name {
                    Some(name) => (name.node.clone(), false),
                    None => (embedded_field_name(&field.ty), true),
                };
                Field {
                    name,
                    ty,
                    embedded,
                    tag: field.tag.clone(),
                }
            })
            .collect();
        Type::Struct(StructType { fields })
    }

    /// The type a declared type name denotes, once resolved.
    pub(crate) fn type_named(&self, name: &str) -> Option<Type> {
        match self.type_bindings.get(name)? {
            TypeBinding::Named(id) => self.universe.named_type(*id).map(Type::Named),
            TypeBinding::Alias => match self.aliases.get(name)? {
                AliasSlot::Resolved(ty) => Some(ty.clone()),
                _ => None,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Function signatures
    // -----------------------------------------------------------------------

    /// Resolve every function signature. Returns one signature per function
    /// declaration, in order; only the first declaration of a name is
    /// registered for calls.
    pub(crate) fn check_signatures(&mut self, module: &Module) -> Vec<FuncType> {
        let mut signatures = Vec::new();
        for func in module.func_decls() {
            let params = func
                .params
                .iter()
                .map(|param| self.resolve_type_expr(&param.ty))
                .collect();
            let results = func
                .results
                .iter()
                .map(|result| self.resolve_type_expr(result))
                .collect();
            let sig = FuncType {
                params,
                results,
                variadic: false,
            };
            if self.declared.get(&func.name.node) == Some(&func.name.span) {
                self.funcs.insert(func.name.node.clone(), sig.clone());
            }
            signatures.push(sig);
        }
        signatures
    }
}

/// Field name of an embedded field: the type name, without any pointer.
fn embedded_field_name(expr: &TypeExpr) -> String {
    match &expr.node {
        TypeExprKind::Name(name) => name.clone(),
        TypeExprKind::Pointer(elem) => embedded_field_name(elem),
        _ => "_".to_string(),
    }
}
