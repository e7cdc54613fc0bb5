//! A tree-walking evaluator for ECMAScript syntax trees.
//!
//! The crate holds the runtime semantics only: values, completion records,
//! references, environment records, the ordinary object model, type
//! coercion and the statement/expression evaluator. Source text never
//! enters here; a host builds an [`ast::Script`] and hands it to
//! [`evaluate`].
//!
//! ```
//! use jsse_core::ast::{Expression, Literal, Script, Statement};
//! use jsse_core::{evaluate, Completion, Runtime};
//! use jsse_core::types::JsValue;
//!
//! let mut rt = Runtime::new();
//! let realm = rt.new_realm().unwrap();
//! rt.push_script_context(realm, false).unwrap();
//! let script = Script {
//!     body: vec![Statement::Expression(Expression::Literal(Literal::Number(42.0)))],
//! };
//! let completion = evaluate(&mut rt, (&script).into()).unwrap();
//! assert_eq!(completion, Completion::normal(JsValue::number(42.0)));
//! ```

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use interpreter::{
    Abrupt, Completion, EnvId, ErrorKind, ExecutionContext, JsResult, ObjectId, PropertyDescriptor,
    PropertyKey, Realm, RealmId, Reference, Runtime, RuntimeOptions,
};

/// A syntax node [`evaluate`] accepts as its root.
#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    Script(&'a ast::Script),
    Statement(&'a ast::Statement),
    Expression(&'a ast::Expression),
}

impl<'a> From<&'a ast::Script> for Node<'a> {
    fn from(script: &'a ast::Script) -> Self {
        Node::Script(script)
    }
}

impl<'a> From<&'a ast::Statement> for Node<'a> {
    fn from(stmt: &'a ast::Statement) -> Self {
        Node::Statement(stmt)
    }
}

impl<'a> From<&'a ast::Expression> for Node<'a> {
    fn from(expr: &'a ast::Expression) -> Self {
        Node::Expression(expr)
    }
}

/// Evaluates `node` on `runtime`.
///
/// The runtime must already have a running execution context; a script
/// runs in that context's realm. Exceptions thrown by the program come
/// back as `Ok(Completion::Throw(..))`. `Err` means the engine itself
/// failed or reached a construct it does not support.
pub fn evaluate(runtime: &mut Runtime, node: Node<'_>) -> EngineResult<Completion> {
    let result = match node {
        Node::Script(script) => runtime.eval_script(script),
        Node::Statement(stmt) => runtime.exec_statement(stmt),
        Node::Expression(expr) => match runtime.eval_expr_value(expr) {
            Ok(value) => Ok(Completion::normal(value)),
            Err(abrupt) => abrupt.into_completion(),
        },
    };
    if let Err(err) = &result {
        tracing::warn!(error = %err, "evaluation failed");
    }
    result
}
