mod common;

use common::*;
use jsse_core::ast::*;
use jsse_core::types::JsValue;
use jsse_core::{Completion, ErrorKind};
use pretty_assertions::assert_eq;

fn for_let(name: &str, start: f64, end: f64, body: Statement) -> Statement {
    for_loop(VarKind::Let, name, start, end, body)
}

fn for_loop(kind: VarKind, name: &str, start: f64, end: f64, body: Statement) -> Statement {
    Statement::For(ForStatement {
        init: Some(ForInit::Variable(VariableDeclaration {
            kind,
            declarations: vec![VariableDeclarator {
                pattern: Pattern::Identifier(name.to_string()),
                init: Some(num(start)),
            }],
        })),
        test: Some(bin(BinaryOp::Lt, ident(name), num(end))),
        update: Some(incr(ident(name))),
        body: Box::new(body),
    })
}

fn append(target: &str, value: Expression) -> Statement {
    expr(compound(AssignOp::AddAssign, ident(target), value))
}

fn labeled(label: &str, body: Statement) -> Statement {
    Statement::Labeled(label.to_string(), Box::new(body))
}

fn for_in(kind: VarKind, name: &str, object: Expression, body: Statement) -> Statement {
    Statement::ForIn(ForInStatement {
        left: ForInOfLeft::Variable(kind, Pattern::Identifier(name.to_string())),
        right: object,
        body: Box::new(body),
    })
}

fn try_stmt(
    block: Vec<Statement>,
    handler: Option<(&str, Vec<Statement>)>,
    finalizer: Option<Vec<Statement>>,
) -> Statement {
    Statement::Try(TryStatement {
        block,
        handler: handler.map(|(param, body)| CatchClause {
            param: Some(Pattern::Identifier(param.to_string())),
            body,
        }),
        finalizer,
    })
}

fn case(test: Option<Expression>, consequent: Vec<Statement>) -> SwitchCase {
    SwitchCase { test, consequent }
}

#[test]
fn let_loops_capture_a_fresh_binding_per_iteration() {
    let (rt, value) = eval_value(vec![
        const_("fs", object(vec![])),
        for_let(
            "i",
            0.0,
            3.0,
            block(vec![expr(assign(index(ident("fs"), ident("i")), arrow(&[], ident("i"))))]),
        ),
        expr(array(vec![
            Some(call(index(ident("fs"), num(0.0)), vec![])),
            Some(call(index(ident("fs"), num(1.0)), vec![])),
            Some(call(index(ident("fs"), num(2.0)), vec![])),
        ])),
    ]);
    assert_eq!(property(&rt, &value, "0"), JsValue::number(0.0));
    assert_eq!(property(&rt, &value, "1"), JsValue::number(1.0));
    assert_eq!(property(&rt, &value, "2"), JsValue::number(2.0));
}

#[test]
fn var_loops_share_one_binding() {
    let (rt, value) = eval_value(vec![
        const_("fs", object(vec![])),
        for_loop(
            VarKind::Var,
            "j",
            0.0,
            3.0,
            block(vec![expr(assign(index(ident("fs"), ident("j")), arrow(&[], ident("j"))))]),
        ),
        expr(array(vec![
            Some(call(index(ident("fs"), num(0.0)), vec![])),
            Some(call(index(ident("fs"), num(2.0)), vec![])),
        ])),
    ]);
    assert_eq!(property(&rt, &value, "0"), JsValue::number(3.0));
    assert_eq!(property(&rt, &value, "1"), JsValue::number(3.0));
}

#[test]
fn loop_binding_is_not_visible_after_the_loop() {
    assert_eq!(
        thrown_kind(vec![
            for_let("k", 0.0, 1.0, Statement::Empty),
            expr(ident("k")),
        ]),
        Some(ErrorKind::ReferenceError)
    );
}

#[test]
fn labelled_break_and_continue() {
    let inner = for_let(
        "j",
        0.0,
        3.0,
        block(vec![
            if_(
                bin(BinaryOp::StrictEq, ident("j"), num(1.0)),
                Statement::Continue(Some("outer".into())),
                None,
            ),
            if_(
                bin(BinaryOp::StrictEq, ident("i"), num(2.0)),
                Statement::Break(Some("outer".into())),
                None,
            ),
            append("count", num(1.0)),
        ]),
    );
    let (_, value) = eval_value(vec![
        let_("count", Some(num(0.0))),
        labeled("outer", for_let("i", 0.0, 3.0, block(vec![inner]))),
        expr(ident("count")),
    ]);
    assert_eq!(value, JsValue::number(2.0));
}

#[test]
fn break_out_of_a_labelled_block() {
    let (_, value) = eval_value(vec![
        let_("x", Some(num(0.0))),
        labeled(
            "done",
            block(vec![
                expr(assign(ident("x"), num(1.0))),
                Statement::Break(Some("done".into())),
                expr(assign(ident("x"), num(2.0))),
            ]),
        ),
        expr(ident("x")),
    ]);
    assert_eq!(value, JsValue::number(1.0));
}

#[test]
fn while_loop_completion_value() {
    let (_, value) = eval_value(vec![
        let_("i", Some(num(0.0))),
        Statement::While(WhileStatement {
            test: bin(BinaryOp::Lt, ident("i"), num(3.0)),
            body: Box::new(block(vec![expr(incr(ident("i")))])),
        }),
    ]);
    assert_eq!(value, JsValue::number(2.0));
}

#[test]
fn do_while_break_keeps_the_last_value() {
    let (_, value) = eval_value(vec![Statement::DoWhile(DoWhileStatement {
        test: boolean(true),
        body: Box::new(block(vec![expr(num(1.0)), Statement::Break(None)])),
    })]);
    assert_eq!(value, JsValue::number(1.0));
}

#[test]
fn if_without_else_completes_with_undefined() {
    let (_, value) = eval_value(vec![expr(num(5.0)), if_(boolean(false), expr(num(1.0)), None)]);
    assert_eq!(value, JsValue::Undefined);
}

#[test]
fn block_scoped_shadowing() {
    let (_, value) = eval_value(vec![
        let_("x", Some(num(1.0))),
        block(vec![let_("x", Some(num(2.0)))]),
        expr(ident("x")),
    ]);
    assert_eq!(value, JsValue::number(1.0));
}

#[test]
fn try_catch_finally_runs_both_handlers() {
    let (_, value) = eval_value(vec![
        let_("log", Some(string(""))),
        try_stmt(
            vec![throw(string("e"))],
            Some(("err", vec![append("log", ident("err"))])),
            Some(vec![append("log", string("f"))]),
        ),
        expr(ident("log")),
    ]);
    assert_eq!(value, JsValue::string("ef"));
}

#[test]
fn catch_receives_engine_raised_errors() {
    let (_, value) = eval_value(vec![try_stmt(
        vec![expr(ident("missing"))],
        Some((
            "e",
            vec![expr(bin(BinaryOp::Instanceof, ident("e"), ident("ReferenceError")))],
        )),
        None,
    )]);
    assert_eq!(value, JsValue::Boolean(true));
}

#[test]
fn catch_parameter_is_scoped_to_the_handler() {
    assert_eq!(
        thrown_kind(vec![
            try_stmt(vec![throw(num(1.0))], Some(("e", vec![])), None),
            expr(ident("e")),
        ]),
        Some(ErrorKind::ReferenceError)
    );
}

#[test]
fn finally_return_wins_over_try_return() {
    let (rt, value) = eval_value(vec![
        function_decl(
            "overrides",
            &[],
            vec![try_stmt(vec![ret(num(1.0))], None, Some(vec![ret(num(2.0))]))],
        ),
        function_decl(
            "keeps",
            &[],
            vec![try_stmt(vec![ret(num(1.0))], None, Some(vec![expr(num(5.0))]))],
        ),
        expr(array(vec![
            Some(call(ident("overrides"), vec![])),
            Some(call(ident("keeps"), vec![])),
        ])),
    ]);
    assert_eq!(property(&rt, &value, "0"), JsValue::number(2.0));
    assert_eq!(property(&rt, &value, "1"), JsValue::number(1.0));
}

#[test]
fn uncaught_throw_is_a_throw_completion() {
    let (_, result) = run(vec![throw(num(7.0))]);
    assert_eq!(result.unwrap(), Completion::Throw(JsValue::number(7.0)));
}

#[test]
fn switch_falls_through_until_break() {
    let (_, value) = eval_value(vec![
        let_("r", Some(string(""))),
        Statement::Switch(SwitchStatement {
            discriminant: num(2.0),
            cases: vec![
                case(Some(num(1.0)), vec![append("r", string("a"))]),
                case(Some(num(2.0)), vec![append("r", string("b"))]),
                case(Some(num(3.0)), vec![append("r", string("c")), Statement::Break(None)]),
                case(None, vec![append("r", string("d"))]),
            ],
        }),
        expr(ident("r")),
    ]);
    assert_eq!(value, JsValue::string("bc"));
}

#[test]
fn switch_default_in_the_middle() {
    let (_, value) = eval_value(vec![
        let_("r", Some(string(""))),
        Statement::Switch(SwitchStatement {
            discriminant: num(9.0),
            cases: vec![
                case(Some(num(1.0)), vec![append("r", string("a"))]),
                case(None, vec![append("r", string("d"))]),
                case(Some(num(2.0)), vec![append("r", string("e"))]),
            ],
        }),
        expr(ident("r")),
    ]);
    assert_eq!(value, JsValue::string("de"));
}

#[test]
fn switch_uses_strict_equality() {
    let (_, value) = eval_value(vec![
        let_("r", Some(string("none"))),
        Statement::Switch(SwitchStatement {
            discriminant: string("1"),
            cases: vec![case(Some(num(1.0)), vec![expr(assign(ident("r"), string("hit")))])],
        }),
        expr(ident("r")),
    ]);
    assert_eq!(value, JsValue::string("none"));
}

#[test]
fn for_in_walks_own_then_inherited_enumerable_keys() {
    let (_, value) = eval_value(vec![
        function_decl(
            "F",
            &[],
            vec![expr(assign(member(Expression::This, "x"), num(1.0)))],
        ),
        expr(assign(member(member(ident("F"), "prototype"), "y"), num(2.0))),
        const_("inst", new(ident("F"), vec![])),
        let_("keys", Some(string(""))),
        for_in(VarKind::Var, "k", ident("inst"), append("keys", ident("k"))),
        expr(ident("keys")),
    ]);
    assert_eq!(value, JsValue::string("xy"));
}

#[test]
fn for_in_skips_keys_deleted_during_iteration() {
    let (_, value) = eval_value(vec![
        const_(
            "o",
            object(vec![("a", num(1.0)), ("b", num(2.0)), ("c", num(3.0))]),
        ),
        let_("keys", Some(string(""))),
        for_in(
            VarKind::Const,
            "k",
            ident("o"),
            block(vec![
                append("keys", ident("k")),
                expr(Expression::Delete(Box::new(member(ident("o"), "c")))),
            ]),
        ),
        expr(ident("keys")),
    ]);
    assert_eq!(value, JsValue::string("ab"));
}

#[test]
fn for_in_over_null_does_nothing() {
    let (_, value) = eval_value(vec![
        let_("n", Some(num(0.0))),
        for_in(
            VarKind::Var,
            "k",
            Expression::Literal(Literal::Null),
            append("n", num(1.0)),
        ),
        expr(ident("n")),
    ]);
    assert_eq!(value, JsValue::number(0.0));
}

#[test]
fn with_resolves_names_on_the_object() {
    let (rt, value) = eval_value(vec![
        const_("o", object(vec![("p", num(1.0))])),
        Statement::With(
            ident("o"),
            Box::new(block(vec![expr(assign(ident("p"), num(2.0)))])),
        ),
        expr(ident("o")),
    ]);
    assert_eq!(property(&rt, &value, "p"), JsValue::number(2.0));
}

#[test]
fn with_supplies_this_for_calls() {
    let (_, value) = eval_value(vec![
        const_(
            "o",
            object(vec![("f", function_expr(None, &[], vec![ret(Expression::This)]))]),
        ),
        let_("r", None),
        Statement::With(
            ident("o"),
            Box::new(expr(assign(ident("r"), call(ident("f"), vec![])))),
        ),
        expr(bin(BinaryOp::StrictEq, ident("r"), ident("o"))),
    ]);
    assert_eq!(value, JsValue::Boolean(true));
}
