//! Constructs outside the supported subset surface as engine errors, never
//! as JavaScript exceptions.

mod common;

use common::*;
use jsse_core::EngineError;
use jsse_core::ast::*;
use std::rc::Rc;

fn assert_not_implemented(body: Vec<Statement>) {
    let (_, result) = run(body);
    assert!(
        matches!(result, Err(EngineError::NotImplemented(_))),
        "expected NotImplemented, got {result:?}"
    );
}

#[test]
fn calling_a_generator() {
    let generator = Rc::new(FunctionNode {
        name: Some("g".into()),
        kind: FunctionKind::Normal,
        params: vec![],
        body: FunctionBody::Block(vec![]),
        is_async: false,
        is_generator: true,
    });
    assert_not_implemented(vec![
        Statement::FunctionDeclaration(generator),
        expr(call(ident("g"), vec![])),
    ]);
}

#[test]
fn for_of_loops() {
    assert_not_implemented(vec![Statement::ForOf(ForOfStatement {
        left: ForInOfLeft::Variable(VarKind::Const, Pattern::Identifier("x".into())),
        right: array(vec![]),
        body: Box::new(Statement::Empty),
    })]);
}

#[test]
fn array_destructuring() {
    assert_not_implemented(vec![destructure(
        VarKind::Let,
        Pattern::Array(vec![Some(Pattern::Identifier("a".into()))]),
        array(vec![Some(num(1.0))]),
    )]);
}

#[test]
fn destructuring_assignment() {
    assert_not_implemented(vec![
        let_("a", None),
        expr(assign(object(vec![("a", ident("a"))]), object(vec![]))),
    ]);
}

#[test]
fn string_relational_comparison() {
    assert_not_implemented(vec![expr(bin(BinaryOp::Lt, string("a"), string("b")))]);
}

#[test]
fn getter_invocation() {
    let getter = Property {
        key: PropertyKey::Identifier("x".into()),
        value: function_expr(None, &[], vec![ret(num(1.0))]),
        kind: PropertyKind::Get,
    };
    assert_not_implemented(vec![
        const_("o", Expression::Object(vec![getter])),
        expr(member(ident("o"), "x")),
    ]);
}

#[test]
fn spread_elements() {
    assert_not_implemented(vec![expr(array(vec![Some(Expression::Spread(Box::new(
        array(vec![]),
    )))]))]);
}

#[test]
fn await_expressions() {
    assert_not_implemented(vec![expr(Expression::Await(Box::new(num(1.0))))]);
}

#[test]
fn bigint_arithmetic() {
    let big = |digits: &str| Expression::Literal(Literal::BigInt(format!("{digits}n")));
    assert_not_implemented(vec![expr(bin(BinaryOp::Add, big("1"), big("2")))]);
}

#[test]
fn object_to_primitive() {
    assert_not_implemented(vec![expr(bin(BinaryOp::Add, object(vec![]), num(1.0)))]);
}

#[test]
fn property_access_on_primitives() {
    assert_not_implemented(vec![expr(member(string("abc"), "length"))]);
}
