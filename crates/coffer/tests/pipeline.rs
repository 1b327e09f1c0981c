//! End-to-end tests: check a module, lower its types, then build and
//! unpack box values against the lowered descriptors.

use coffer::{
    CompileOptions, Compiled, check_module, compile_module, diagnostics_json, emit_diagnostics,
};
use coffer_ast::*;
use coffer_check::Category;
use coffer_rt::{
    AssertError, Bootstrap, BoxValue, Comparator, Data, DescriptorTable, Matcher, Shape, Standard,
    TypeRef,
};
use coffer_types::{BasicKind, Type};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
        .with_test_writer()
        .try_init();
}

fn at(start: u32) -> Span {
    Span::new(FileId(0), start, start + 1)
}

fn sp<T>(node: T) -> Spanned<T> {
    Spanned::new(node, at(0))
}

fn ident(name: &str) -> Spanned<String> {
    sp(name.to_string())
}

fn ty(name: &str) -> TypeExpr {
    sp(TypeExprKind::Name(name.to_string()))
}

fn ty_at(name: &str, start: u32) -> TypeExpr {
    Spanned::new(TypeExprKind::Name(name.to_string()), at(start))
}

fn boxed(variants: Vec<TypeExpr>) -> TypeExpr {
    sp(TypeExprKind::Box(BoxTypeExpr { variants }))
}

fn struct_of(fields: &[(&str, &str)]) -> TypeExpr {
    sp(TypeExprKind::Struct(
        fields
            .iter()
            .map(|(name, field_ty)| FieldExpr {
                name: Some(ident(name)),
                ty: ty(field_ty),
                tag: None,
            })
            .collect(),
    ))
}

fn type_decl(name: &str, ty: TypeExpr) -> Decl {
    sp(DeclKind::Type(TypeDecl {
        name: ident(name),
        alias: false,
        ty,
    }))
}

fn func(name: &str, params: &[(&str, &str)], results: &[&str], body: Block) -> Decl {
    sp(DeclKind::Func(FuncDecl {
        name: ident(name),
        params: params
            .iter()
            .map(|(name, param_ty)| Param {
                name: ident(name),
                ty: ty(param_ty),
            })
            .collect(),
        results: results.iter().map(|result| ty(result)).collect(),
        body,
    }))
}

fn var(name: &str, var_ty: &str, value: Option<Expr>) -> Stmt {
    sp(StmtKind::Var(VarDecl {
        name: ident(name),
        ty: Some(ty(var_ty)),
        value,
    }))
}

fn define(names: &[&str], value: Expr) -> Stmt {
    sp(StmtKind::Define {
        names: names.iter().map(|name| ident(name)).collect(),
        value,
    })
}

fn assign(target: &str, value: Expr) -> Stmt {
    sp(StmtKind::Assign {
        target: ident(target),
        value,
    })
}

fn ret(values: Vec<Expr>) -> Stmt {
    sp(StmtKind::Return(values))
}

fn println(args: Vec<Expr>) -> Stmt {
    sp(StmtKind::Expr(call("println", args)))
}

fn switch(binding: &str, subject: Expr, clauses: Vec<CaseClause>) -> Stmt {
    sp(StmtKind::TypeSwitch(TypeSwitch {
        binding: Some(ident(binding)),
        subject,
        clauses,
    }))
}

fn case(type_name: &str, body: Block) -> CaseClause {
    CaseClause {
        kind: CaseKind::Types(vec![ty(type_name)]),
        body,
        span: at(0),
    }
}

fn default_case(body: Block) -> CaseClause {
    CaseClause {
        kind: CaseKind::Default,
        body,
        span: at(0),
    }
}

fn int(n: i128) -> Expr {
    sp(ExprKind::Lit(Lit::Int(n)))
}

fn string(value: &str) -> Expr {
    sp(ExprKind::Lit(Lit::String(value.to_string())))
}

fn name(n: &str) -> Expr {
    sp(ExprKind::Name(n.to_string()))
}

fn name_at(n: &str, start: u32) -> Expr {
    Spanned::new(ExprKind::Name(n.to_string()), at(start))
}

fn call(func: &str, args: Vec<Expr>) -> Expr {
    sp(ExprKind::Call {
        func: ident(func),
        args,
    })
}

fn module(decls: Vec<Decl>) -> Module {
    let mut module = Module::new(FileId(0), "main");
    module.decls = decls;
    module
}

fn compile(decls: Vec<Decl>) -> Compiled {
    init_tracing();
    match compile_module(&module(decls), &CompileOptions::default()) {
        Ok(compiled) => compiled,
        Err(err) => panic!("{err}"),
    }
}

fn categories_of(decls: Vec<Decl>) -> Vec<Category> {
    init_tracing();
    let err = compile_module(&module(decls), &CompileOptions::default())
        .expect_err("module should fail to compile");
    err.diagnostics().iter().map(|d| d.category).collect()
}

/// The variant descriptors of a box descriptor.
fn variants(table: &DescriptorTable, r: TypeRef) -> Vec<TypeRef> {
    match table.get(r).map(|d| &d.shape) {
        Some(Shape::Box { variants }) => variants.clone(),
        other => panic!("expected a box descriptor at {r}, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

fn divide_program() -> Vec<Decl> {
    vec![
        type_decl("Result", boxed(vec![ty("string"), ty("int")])),
        func(
            "divide",
            &[("a", "int"), ("b", "int")],
            &["Result"],
            vec![
                sp(StmtKind::If {
                    cond: sp(ExprKind::Binary {
                        op: BinOp::Eq,
                        lhs: Box::new(name("b")),
                        rhs: Box::new(int(0)),
                    }),
                    then_block: vec![ret(vec![string("division by zero")])],
                    else_block: None,
                }),
                ret(vec![sp(ExprKind::Binary {
                    op: BinOp::Div,
                    lhs: Box::new(name("a")),
                    rhs: Box::new(name("b")),
                })]),
            ],
        ),
        func(
            "main",
            &[],
            &[],
            vec![
                define(&["r"], call("divide", vec![int(10), int(2)])),
                switch("v", name("r"), vec![
                    case("int", vec![println(vec![name("v")])]),
                    case("string", vec![println(vec![name("v")])]),
                ]),
            ],
        ),
    ]
}

fn state_machine_program() -> Vec<Decl> {
    vec![
        type_decl("Idle", struct_of(&[])),
        type_decl("Loading", struct_of(&[("Progress", "int")])),
        type_decl("Success", struct_of(&[("Data", "string")])),
        type_decl("Error", struct_of(&[("Message", "string")])),
        type_decl(
            "State",
            boxed(vec![ty("Idle"), ty("Loading"), ty("Success"), ty("Error")]),
        ),
        func("processState", &[("s", "State")], &[], vec![switch(
            "state",
            name("s"),
            vec![
                case("Idle", vec![println(vec![string("idle")])]),
                case("Loading", vec![println(vec![name("state")])]),
                case("Success", vec![println(vec![name("state")])]),
                case("Error", vec![println(vec![name("state")])]),
            ],
        )]),
        func("main", &[], &[], vec![
            var(
                "current",
                "State",
                Some(sp(ExprKind::Composite(ty("Idle")))),
            ),
            assign("current", sp(ExprKind::Composite(ty("Loading")))),
            sp(StmtKind::Expr(call("processState", vec![name("current")]))),
        ]),
    ]
}

fn string_or_int() -> Decl {
    type_decl("StringOrInt", boxed(vec![ty("string"), ty("int")]))
}

// ---------------------------------------------------------------------------
// Working programs
// ---------------------------------------------------------------------------

#[test]
fn divide_round_trip() {
    let mut compiled = compile(divide_program());
    let result = compiled.type_ref("Result").unwrap();
    assert_eq!(compiled.table().repr(result), "main.Result");

    // `int` and `string` lowered on their own are copies of the variants.
    let int_ty = compiled.lower(&Type::Basic(BasicKind::Int)).unwrap();
    let string_ty = compiled.lower(&Type::Basic(BasicKind::String)).unwrap();
    let Ok([string_variant, int_variant]) =
        <[TypeRef; 2]>::try_from(variants(compiled.table(), result))
    else {
        panic!("Result should have two variants");
    };
    assert_ne!(int_variant, int_ty);

    // divide(10, 2) holds the int 5.
    let quotient = BoxValue::new(int_variant, Data::int(10 / 2));
    let mut matcher = compiled.matcher();
    assert_eq!(
        matcher.assert_checked(quotient, int_ty),
        Ok((Data::int(5), true))
    );
    assert_eq!(
        matcher.assert_checked(quotient, string_ty),
        Ok((Data::ZERO, false))
    );
    let err = matcher.assert_single(quotient, string_ty).unwrap_err();
    assert_eq!(
        err.to_string(),
        "box type assertion failed: value holds int, not string"
    );

    // divide(1, 0) holds the error message, so asking it for an int
    // yields the zero value and false.
    let failure = BoxValue::new(string_variant, Data::Str("division by zero"));
    assert_eq!(
        matcher.assert_checked(failure, int_ty),
        Ok((Data::ZERO, false))
    );
    let message = matcher.must_assert(failure, string_ty);
    assert_eq!(message.as_str(), Some("division by zero"));
    let err = matcher.assert_single(failure, int_ty).unwrap_err();
    let AssertError::Failed(failed) = err else {
        panic!("expected an assertion failure, got {err:?}");
    };
    assert_eq!(failed.concrete(), Some(string_variant));
    assert_eq!(failed.asserted(), int_ty);

    let layout = compiled.layout("Result").unwrap();
    let mut cmp = Standard::new();
    let tagged = layout.pack(&mut cmp, compiled.table(), quotient).unwrap();
    let int_tag = layout.tag_of(&mut cmp, compiled.table(), int_ty).unwrap();
    assert_eq!(int_tag, 2);
    assert_eq!(tagged.assert(int_tag).and_then(|d| d.as_int()), Some(5));
    assert_eq!(layout.unpack(tagged), quotient);
}

#[derive(Debug, PartialEq)]
struct Loading {
    progress: i64,
}

#[test]
fn state_machine_with_named_struct_variants() {
    let compiled = compile(state_machine_program());
    let table = compiled.table();
    let state = compiled.type_ref("State").unwrap();
    let loading = compiled.type_ref("Loading").unwrap();
    let success = compiled.type_ref("Success").unwrap();

    // Named variants are lowered once and shared with the box.
    let state_variants = variants(table, state);
    assert_eq!(state_variants[1], loading);
    assert_eq!(table.repr(state_variants[3]), "main.Error");

    let payload = Loading { progress: 25 };
    let value = BoxValue::new(loading, Data::Ref(&payload));
    let mut matcher = Matcher::with_comparator(table, Bootstrap::<16>::new());
    let data = matcher.assert_single(value, loading).unwrap();
    assert_eq!(data.downcast_ref::<Loading>(), Some(&payload));

    let err = matcher.assert_single(value, success).unwrap_err();
    assert_eq!(
        err.to_string(),
        "box type assertion failed: value holds main.Loading, not main.Success"
    );

    let layout = compiled.layout("State").unwrap();
    assert_eq!(layout.len(), 4);
    let tagged = layout
        .pack(&mut Bootstrap::<16>::new(), table, value)
        .unwrap();
    assert_eq!(tagged.tag, 2);
    assert!(compiled.layout("Loading").is_err());
}

#[test]
fn separately_compiled_copies_match() {
    let first = compile(divide_program());
    let second = compile(divide_program());

    let mut linked = first.table().clone();
    let relocation = linked.append(second.table()).unwrap();
    let ours = first.type_ref("Result").unwrap();
    let theirs = relocation
        .apply(second.type_ref("Result").unwrap())
        .unwrap();
    assert_ne!(ours, theirs);
    assert_eq!(Standard::new().identical(&linked, ours, theirs), Ok(true));
    assert_eq!(
        Bootstrap::<64>::new().identical(&linked, ours, theirs),
        Ok(true)
    );

    // A value built against one copy matches an assertion on the other.
    let our_int = variants(&linked, ours)[1];
    let their_int = variants(&linked, theirs)[1];
    let value = BoxValue::new(our_int, Data::int(-4));
    let mut matcher = Matcher::new(&linked);
    assert_eq!(
        matcher.assert_checked(value, their_int),
        Ok((Data::int(-4), true))
    );
}

#[test]
fn trace_is_exported_when_enabled() {
    init_tracing();
    let mut options = CompileOptions::default();
    options.check.trace = true;
    let compiled = compile_module(&module(divide_program()), &options).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&compiled.checked.trace_json().unwrap()).unwrap();
    let actions: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["action"].as_str().unwrap().to_string())
        .collect();
    assert!(actions.iter().any(|a| a == "switch_exhaustive"), "{actions:?}");
}

// ---------------------------------------------------------------------------
// Programs that must not compile
// ---------------------------------------------------------------------------

#[test]
#[allow(clippy::approx_constant)]
fn float_constant_is_not_a_variant() {
    init_tracing();
    let program = module(vec![string_or_int(), func("main", &[], &[], vec![
        var("s", "StringOrInt", None),
        assign("s", string("hello")),
        assign("s", int(42)),
        assign("s", sp(ExprKind::Lit(Lit::Float(3.14)))),
        println(vec![name("s")]),
    ])]);

    let checked = check_module(&program, &CompileOptions::default());
    assert_eq!(checked.diagnostics.len(), 1);

    let err = compile_module(&program, &CompileOptions::default()).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r"
    checking failed:
    error[E0106]: cannot use 3.14 (untyped float constant) as StringOrInt value in assignment
      help: StringOrInt is box { string; int }
    ");

    emit_diagnostics(err.diagnostics());
    let json: serde_json::Value =
        serde_json::from_str(&diagnostics_json(err.diagnostics()).unwrap()).unwrap();
    assert_eq!(json[0]["code"], "E0106");
    assert_eq!(json[0]["category"], "invalid_assignment");
}

#[test]
fn converting_a_box_does_not_compile() {
    init_tracing();
    let program = module(vec![string_or_int(), func("main", &[], &[], vec![
        var("b", "StringOrInt", Some(string("hello"))),
        var(
            "s",
            "string",
            Some(sp(ExprKind::Convert {
                ty: ty("string"),
                value: Box::new(name("b")),
            })),
        ),
        println(vec![name("s")]),
    ])]);
    let err = compile_module(&program, &CompileOptions::default()).unwrap_err();
    assert_eq!(err.diagnostics().len(), 1);
    insta::assert_snapshot!(
        err.diagnostics()[0].message,
        @"cannot convert b (variable of box type StringOrInt) to type string"
    );
}

#[test]
fn default_clause_does_not_compile() {
    let categories = categories_of(vec![
        type_decl("Status", boxed(vec![ty("string"), ty("int"), ty("bool")])),
        func("processStatus", &[("s", "Status")], &[], vec![switch(
            "val",
            name("s"),
            vec![
                case("string", vec![println(vec![name("val")])]),
                case("int", vec![println(vec![name("val")])]),
                default_case(vec![println(vec![string("other")])]),
            ],
        )]),
    ]);
    // The default clause does not cover bool.
    assert_eq!(categories, vec![
        Category::DefaultCaseNotAllowed,
        Category::NonExhaustiveSwitch,
    ]);
}

#[test]
fn missing_variant_does_not_compile() {
    init_tracing();
    let program = module(vec![
        type_decl("Value", boxed(vec![ty("string"), ty("int"), ty("bool")])),
        func("processValue", &[("v", "Value")], &[], vec![switch(
            "val",
            name("v"),
            vec![
                case("string", vec![println(vec![name("val")])]),
                case("int", vec![println(vec![name("val")])]),
            ],
        )]),
    ]);
    let err = compile_module(&program, &CompileOptions::default()).unwrap_err();
    insta::assert_snapshot!(
        err.diagnostics()[0].message,
        @"non-exhaustive type switch on Value: missing case for bool"
    );
}

#[test]
fn interface_variant_does_not_compile() {
    let categories = categories_of(vec![
        type_decl(
            "Stringer",
            sp(TypeExprKind::Interface(vec![MethodExpr {
                name: ident("String"),
                sig: FuncTypeExpr {
                    params: vec![],
                    results: vec![ty("string")],
                    variadic: false,
                },
            }])),
        ),
        type_decl(
            "Value",
            boxed(vec![ty("string"), ty("int"), ty("Stringer")]),
        ),
        func("main", &[], &[], vec![var("v", "Value", Some(string("hello")))]),
    ]);
    assert_eq!(categories, vec![Category::InvalidVariantType]);
}

#[test]
fn errors_are_reported_in_source_order() {
    init_tracing();
    // The body error comes first in the file but is found after the
    // declarations are resolved.
    let program = module(vec![
        func("show", &[], &[], vec![println(vec![name_at("missing", 10)])]),
        type_decl(
            "Bad",
            boxed(vec![
                ty_at("int", 80),
                Spanned::new(TypeExprKind::Slice(Box::new(ty_at("int", 92))), at(90)),
            ]),
        ),
    ]);

    let checked = check_module(&program, &CompileOptions::default());
    let found: Vec<_> = checked.diagnostics.iter().map(|d| d.category).collect();
    assert_eq!(found, vec![
        Category::InvalidVariantType,
        Category::UndefinedName,
    ]);

    let err = compile_module(&program, &CompileOptions::default()).unwrap_err();
    let reported: Vec<_> = err.diagnostics().iter().map(|d| d.category).collect();
    assert_eq!(reported, vec![
        Category::UndefinedName,
        Category::InvalidVariantType,
    ]);
}
