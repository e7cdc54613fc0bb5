//! Syntax tree builders shared by the integration tests.
#![allow(dead_code)]

use jsse_core::ast::*;
use jsse_core::types::JsValue;
use jsse_core::{Completion, EngineResult, ErrorKind, Runtime, evaluate};
use std::rc::Rc;

pub fn num(n: f64) -> Expression {
    Expression::Literal(Literal::Number(n))
}

pub fn string(s: &str) -> Expression {
    Expression::Literal(Literal::String(s.to_string()))
}

pub fn boolean(b: bool) -> Expression {
    Expression::Literal(Literal::Boolean(b))
}

pub fn ident(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

pub fn bin(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary(op, Box::new(left), Box::new(right))
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    Expression::Assign(AssignOp::Assign, Box::new(target), Box::new(value))
}

pub fn compound(op: AssignOp, target: Expression, value: Expression) -> Expression {
    Expression::Assign(op, Box::new(target), Box::new(value))
}

pub fn incr(target: Expression) -> Expression {
    Expression::Update(UpdateOp::Increment, false, Box::new(target))
}

pub fn call(callee: Expression, args: Vec<Expression>) -> Expression {
    Expression::Call(Box::new(callee), args)
}

pub fn new(callee: Expression, args: Vec<Expression>) -> Expression {
    Expression::New(Box::new(callee), args)
}

pub fn member(object: Expression, name: &str) -> Expression {
    Expression::Member(Box::new(object), MemberProperty::Dot(name.to_string()))
}

pub fn index(object: Expression, key: Expression) -> Expression {
    Expression::Member(Box::new(object), MemberProperty::Computed(Box::new(key)))
}

pub fn object(props: Vec<(&str, Expression)>) -> Expression {
    Expression::Object(
        props
            .into_iter()
            .map(|(key, value)| Property {
                key: PropertyKey::Identifier(key.to_string()),
                value,
                kind: PropertyKind::Init,
            })
            .collect(),
    )
}

pub fn array(elements: Vec<Option<Expression>>) -> Expression {
    Expression::Array(elements)
}

pub fn expr(e: Expression) -> Statement {
    Statement::Expression(e)
}

fn declare(kind: VarKind, name: &str, init: Option<Expression>) -> Statement {
    Statement::Variable(VariableDeclaration {
        kind,
        declarations: vec![VariableDeclarator {
            pattern: Pattern::Identifier(name.to_string()),
            init,
        }],
    })
}

pub fn var(name: &str, init: Option<Expression>) -> Statement {
    declare(VarKind::Var, name, init)
}

pub fn let_(name: &str, init: Option<Expression>) -> Statement {
    declare(VarKind::Let, name, init)
}

pub fn const_(name: &str, init: Expression) -> Statement {
    declare(VarKind::Const, name, Some(init))
}

pub fn destructure(kind: VarKind, pattern: Pattern, init: Expression) -> Statement {
    Statement::Variable(VariableDeclaration {
        kind,
        declarations: vec![VariableDeclarator {
            pattern,
            init: Some(init),
        }],
    })
}

pub fn block(body: Vec<Statement>) -> Statement {
    Statement::Block(body)
}

pub fn ret(value: Expression) -> Statement {
    Statement::Return(Some(value))
}

pub fn throw(value: Expression) -> Statement {
    Statement::Throw(value)
}

pub fn if_(test: Expression, consequent: Statement, alternate: Option<Statement>) -> Statement {
    Statement::If(IfStatement {
        test,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    })
}

pub fn params(names: &[&str]) -> Vec<Pattern> {
    names
        .iter()
        .map(|n| Pattern::Identifier(n.to_string()))
        .collect()
}

pub fn function_node(name: Option<&str>, params: Vec<Pattern>, body: Vec<Statement>) -> Rc<FunctionNode> {
    Rc::new(FunctionNode {
        name: name.map(str::to_string),
        kind: FunctionKind::Normal,
        params,
        body: FunctionBody::Block(body),
        is_async: false,
        is_generator: false,
    })
}

pub fn function_decl(name: &str, param_names: &[&str], body: Vec<Statement>) -> Statement {
    Statement::FunctionDeclaration(function_node(Some(name), params(param_names), body))
}

pub fn function_expr(name: Option<&str>, param_names: &[&str], body: Vec<Statement>) -> Expression {
    Expression::Function(function_node(name, params(param_names), body))
}

pub fn arrow(param_names: &[&str], body: Expression) -> Expression {
    Expression::ArrowFunction(Rc::new(FunctionNode {
        name: None,
        kind: FunctionKind::Arrow,
        params: params(param_names),
        body: FunctionBody::Expression(Box::new(body)),
        is_async: false,
        is_generator: false,
    }))
}

pub fn use_strict() -> Statement {
    expr(string("use strict"))
}

pub fn script(body: Vec<Statement>) -> Script {
    Script { body }
}

/// Routes engine logs to the test harness; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A runtime with one realm and a running script context.
pub fn runtime() -> Runtime {
    init_tracing();
    let mut rt = Runtime::new();
    let realm = rt.new_realm().expect("realm");
    rt.push_script_context(realm, false).expect("script context");
    rt
}

pub fn run(body: Vec<Statement>) -> (Runtime, EngineResult<Completion>) {
    let mut rt = runtime();
    let program = script(body);
    let result = evaluate(&mut rt, (&program).into());
    (rt, result)
}

/// Runs `body` and returns the script's completion value, failing the test
/// on anything but a normal completion.
pub fn eval_value(body: Vec<Statement>) -> (Runtime, JsValue) {
    let (rt, result) = run(body);
    match result {
        Ok(Completion::Normal(Some(value))) => (rt, value),
        other => panic!("expected a normal completion, got {other:?}"),
    }
}

/// Runs `body` and returns the kind of the native error it throws.
pub fn thrown_kind(body: Vec<Statement>) -> Option<ErrorKind> {
    let (rt, result) = run(body);
    match result {
        Ok(Completion::Throw(err)) => rt.error_kind_of(&err),
        other => panic!("expected a throw completion, got {other:?}"),
    }
}

pub fn property(rt: &Runtime, value: &JsValue, key: &str) -> JsValue {
    let obj = value.as_object().expect("object value");
    rt.get(obj, &key.into(), value).expect("property read")
}
