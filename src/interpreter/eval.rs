use super::compare::{is_less_than, is_loosely_equal, is_strictly_equal};
use super::helpers::{
    Numeric, PreferredType, is_constructor, string_to_bigint, to_boolean, to_number, to_numeric,
    to_object, to_primitive, to_property_key, to_string, type_of,
};
use super::{
    ErrorKind, JsResult, PropertyDescriptor, PropertyKey, Reference, Runtime,
    ensure_sufficient_stack,
};
use crate::ast::{
    AssignOp, BinaryOp, Expression, Literal, LogicalOp, MemberProperty, Property, PropertyKind,
    TemplateLiteral, UnaryOp, UpdateOp,
};
use crate::error::EngineError;
use crate::types::{JsString, JsValue, number_ops};

fn bigint_arithmetic() -> EngineError {
    EngineError::NotImplemented("BigInt arithmetic")
}

impl Runtime {
    /// Evaluates an expression. Identifiers and member accesses produce a
    /// `JsValue::Reference`; use `eval_expr_value` when a plain value is
    /// wanted.
    pub(crate) fn eval_expr(&mut self, expr: &Expression) -> JsResult<JsValue> {
        ensure_sufficient_stack(|| self.eval_expr_node(expr))
    }

    fn eval_expr_node(&mut self, expr: &Expression) -> JsResult<JsValue> {
        match expr {
            Expression::Literal(lit) => self.eval_literal(lit),
            Expression::Identifier(name) => self.resolve_binding(name, None),
            Expression::This => self.resolve_this_binding(),
            Expression::Array(elements) => self.eval_array_literal(elements),
            Expression::Object(props) => self.eval_object_literal(props),
            Expression::Function(f) => Ok(JsValue::Object(
                self.instantiate_ordinary_function_expression(f, None)?,
            )),
            Expression::ArrowFunction(f) => Ok(JsValue::Object(
                self.instantiate_arrow_function_expression(f, None)?,
            )),
            Expression::Unary(op, operand) => self.eval_unary(*op, operand),
            Expression::Binary(op, left, right) => {
                let lval = self.eval_expr_value(left)?;
                let rval = self.eval_expr_value(right)?;
                self.eval_binary(*op, &lval, &rval)
            }
            Expression::Logical(op, left, right) => self.eval_logical(*op, left, right),
            Expression::Update(op, prefix, arg) => self.eval_update(*op, *prefix, arg),
            Expression::Assign(op, left, right) => self.eval_assign(*op, left, right),
            Expression::Conditional(test, consequent, alternate) => {
                let test_val = self.eval_expr_value(test)?;
                if to_boolean(&test_val) {
                    self.eval_expr_value(consequent)
                } else {
                    self.eval_expr_value(alternate)
                }
            }
            Expression::Call(callee, args) => self.eval_call(callee, args),
            Expression::New(callee, args) => self.eval_new(callee, args),
            Expression::Member(obj, prop) => self.eval_member(obj, prop),
            Expression::Spread(_) => Err(EngineError::NotImplemented("spread elements").into()),
            Expression::Yield(..) => Err(EngineError::NotImplemented("yield").into()),
            Expression::Await(_) => Err(EngineError::NotImplemented("await").into()),
            Expression::Template(template) => self.eval_template(template),
            Expression::Typeof(arg) => self.eval_typeof(arg),
            Expression::Void(arg) => {
                self.eval_expr_value(arg)?;
                Ok(JsValue::Undefined)
            }
            Expression::Delete(arg) => self.eval_delete(arg),
            Expression::Sequence(exprs) => {
                let mut value = JsValue::Undefined;
                for e in exprs {
                    value = self.eval_expr_value(e)?;
                }
                Ok(value)
            }
        }
    }

    pub(crate) fn eval_expr_value(&mut self, expr: &Expression) -> JsResult<JsValue> {
        let value = self.eval_expr(expr)?;
        self.get_value(value)
    }

    // §8.4.5 NamedEvaluation
    pub(crate) fn named_evaluation(
        &mut self,
        expr: &Expression,
        name: &PropertyKey,
    ) -> JsResult<JsValue> {
        match expr {
            Expression::Function(f) if expr.is_anonymous_function_definition() => Ok(
                JsValue::Object(self.instantiate_ordinary_function_expression(f, Some(name))?),
            ),
            Expression::ArrowFunction(f) => Ok(JsValue::Object(
                self.instantiate_arrow_function_expression(f, Some(name))?,
            )),
            _ => self.eval_expr_value(expr),
        }
    }

    /// Value of `expr`, named after `name` when it is an anonymous function
    /// definition.
    pub(crate) fn eval_expr_named(&mut self, expr: &Expression, name: &str) -> JsResult<JsValue> {
        if expr.is_anonymous_function_definition() {
            self.named_evaluation(expr, &name.into())
        } else {
            self.eval_expr_value(expr)
        }
    }

    fn eval_literal(&mut self, lit: &Literal) -> JsResult<JsValue> {
        Ok(match lit {
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::number(*n),
            Literal::String(s) => JsValue::string(s),
            Literal::BigInt(digits) => {
                let digits = JsString::from_str(digits.trim_end_matches('n'));
                let value = string_to_bigint(&digits).ok_or_else(|| {
                    EngineError::Assertion(format!("malformed BigInt literal {digits}"))
                })?;
                JsValue::bigint(value)
            }
        })
    }

    // §13.2.8 template literal evaluation
    fn eval_template(&mut self, template: &TemplateLiteral) -> JsResult<JsValue> {
        let mut out = JsString::from_str(template.quasis.first().map_or("", String::as_str));
        for (index, expr) in template.expressions.iter().enumerate() {
            let sub = self.eval_expr_value(expr)?;
            out = out.concat(&to_string(self, &sub)?);
            if let Some(quasi) = template.quasis.get(index + 1) {
                out = out.concat(&JsString::from_str(quasi));
            }
        }
        Ok(JsValue::String(out))
    }

    // §13.2.4.1 ArrayAccumulation
    fn eval_array_literal(&mut self, elements: &[Option<Expression>]) -> JsResult<JsValue> {
        let array = self.array_create(0)?;
        let mut next_index: u32 = 0;
        for element in elements {
            if let Some(expr) = element {
                let value = self.eval_expr_value(expr)?;
                self.create_data_property_or_throw(array, next_index.into(), value)?;
            }
            next_index += 1;
        }
        let receiver = JsValue::Object(array);
        let length = JsValue::number(f64::from(next_index));
        if !self.set(array, &"length".into(), length, &receiver)? {
            return Err(self.throw_error(ErrorKind::TypeError, "Cannot set array length"));
        }
        Ok(receiver)
    }

    fn eval_property_key(&mut self, key: &crate::ast::PropertyKey) -> JsResult<PropertyKey> {
        use crate::ast::PropertyKey as Key;
        Ok(match key {
            Key::Identifier(name) | Key::String(name) => name.as_str().into(),
            Key::Number(n) => number_ops::to_string(*n).as_str().into(),
            Key::Computed(expr) => {
                let value = self.eval_expr_value(expr)?;
                to_property_key(self, &value)?
            }
        })
    }

    // §13.2.5.4 PropertyDefinitionEvaluation
    fn eval_object_literal(&mut self, props: &[Property]) -> JsResult<JsValue> {
        let object_prototype = self.intrinsics()?.object_prototype;
        let obj = self.ordinary_object_create(Some(object_prototype));
        for prop in props {
            let key = self.eval_property_key(&prop.key)?;
            match prop.kind {
                PropertyKind::Init => {
                    let value = if prop.value.is_anonymous_function_definition() {
                        self.named_evaluation(&prop.value, &key)?
                    } else {
                        self.eval_expr_value(&prop.value)?
                    };
                    self.create_data_property_or_throw(obj, key, value)?;
                }
                PropertyKind::Get | PropertyKind::Set => {
                    let Expression::Function(code) = &prop.value else {
                        return Err(EngineError::Assertion(
                            "accessor property without a function body".to_string(),
                        )
                        .into());
                    };
                    let is_getter = prop.kind == PropertyKind::Get;
                    let prefix = if is_getter { "get" } else { "set" };
                    let closure =
                        JsValue::Object(self.define_accessor_function(code, &key, prefix)?);
                    let (mut get, mut set) = match self.get_own_property(obj, &key)? {
                        Some(PropertyDescriptor::Accessor { get, set, .. }) => (get, set),
                        _ => (JsValue::Undefined, JsValue::Undefined),
                    };
                    if is_getter {
                        get = closure;
                    } else {
                        set = closure;
                    }
                    self.define_property_or_throw(
                        obj,
                        key,
                        PropertyDescriptor::accessor(get, set, true, true),
                    )?;
                }
            }
        }
        Ok(JsValue::Object(obj))
    }

    // §13.3.2 property accessors
    fn eval_member(&mut self, obj: &Expression, prop: &MemberProperty) -> JsResult<JsValue> {
        let base = self.eval_expr_value(obj)?;
        let name = match prop {
            MemberProperty::Dot(name) => JsValue::string(name),
            MemberProperty::Computed(expr) => self.eval_expr_value(expr)?,
        };
        let strict = self.is_strict()?;
        Ok(JsValue::Reference(Box::new(Reference::Property {
            base,
            name,
            this_value: None,
            strict,
        })))
    }

    fn eval_arguments(&mut self, args: &[Expression]) -> JsResult<Vec<JsValue>> {
        args.iter().map(|arg| self.eval_expr_value(arg)).collect()
    }

    // §13.3.6.1 function calls, §13.3.6.2 EvaluateCall
    fn eval_call(&mut self, callee: &Expression, args: &[Expression]) -> JsResult<JsValue> {
        let reference = self.eval_expr(callee)?;
        let this_value = match &reference {
            JsValue::Reference(r) => match r.as_ref() {
                Reference::Property { .. } => r.this_value().unwrap_or(JsValue::Undefined),
                Reference::Environment { env, .. } => match self.with_base_object(*env)? {
                    Some(obj) => JsValue::Object(obj),
                    None => JsValue::Undefined,
                },
                Reference::Unresolvable { .. } => JsValue::Undefined,
            },
            _ => JsValue::Undefined,
        };
        let func = self.get_value(reference)?;
        let arg_list = self.eval_arguments(args)?;
        if !func.is_object() || !super::helpers::is_callable(self, &func)? {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                &format!("{} is not a function", describe_callee(callee)),
            ));
        }
        self.call(&func, &this_value, &arg_list)
    }

    // §13.3.5.1.1 EvaluateNew
    fn eval_new(&mut self, callee: &Expression, args: &[Expression]) -> JsResult<JsValue> {
        let constructor = self.eval_expr_value(callee)?;
        let arg_list = self.eval_arguments(args)?;
        if !is_constructor(self, &constructor)? {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                &format!("{} is not a constructor", describe_callee(callee)),
            ));
        }
        self.construct(&constructor, &arg_list, None)
    }

    // §13.5.3.1 typeof
    fn eval_typeof(&mut self, arg: &Expression) -> JsResult<JsValue> {
        let value = self.eval_expr(arg)?;
        if let JsValue::Reference(r) = &value
            && r.is_unresolvable()
        {
            return Ok(JsValue::string("undefined"));
        }
        let value = self.get_value(value)?;
        Ok(JsValue::string(type_of(self, &value)?))
    }

    // §13.5.1.2 delete
    fn eval_delete(&mut self, arg: &Expression) -> JsResult<JsValue> {
        let JsValue::Reference(reference) = self.eval_expr(arg)? else {
            return Ok(JsValue::Boolean(true));
        };
        match *reference {
            Reference::Unresolvable { .. } => Ok(JsValue::Boolean(true)),
            Reference::Property {
                base, name, strict, ..
            } => {
                let base_obj = to_object(self, &base)?;
                let key = to_property_key(self, &name)?;
                let deleted = self.delete(base_obj, &key)?;
                if !deleted && strict {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        &format!("Cannot delete property '{key}'"),
                    ));
                }
                Ok(JsValue::Boolean(deleted))
            }
            Reference::Environment { env, name, .. } => {
                Ok(JsValue::Boolean(self.delete_binding(env, &name)?))
            }
        }
    }

    // §13.5.4 - §13.5.7 unary operators
    fn eval_unary(&mut self, op: UnaryOp, operand: &Expression) -> JsResult<JsValue> {
        let value = self.eval_expr_value(operand)?;
        match op {
            UnaryOp::Plus => Ok(JsValue::number(to_number(self, &value)?)),
            UnaryOp::Not => Ok(JsValue::Boolean(!to_boolean(&value))),
            UnaryOp::Minus => match to_numeric(self, &value)? {
                Numeric::Number(n) => Ok(JsValue::number(number_ops::unary_minus(n))),
                Numeric::BigInt(_) => Err(bigint_arithmetic().into()),
            },
            UnaryOp::BitNot => match to_numeric(self, &value)? {
                Numeric::Number(n) => Ok(JsValue::number(number_ops::bitwise_not(n))),
                Numeric::BigInt(_) => Err(bigint_arithmetic().into()),
            },
        }
    }

    // §13.4 update expressions
    fn eval_update(&mut self, op: UpdateOp, prefix: bool, arg: &Expression) -> JsResult<JsValue> {
        let lhs = self.eval_expr(arg)?;
        let old = self.get_value(lhs.clone())?;
        let old = match to_numeric(self, &old)? {
            Numeric::Number(n) => n,
            Numeric::BigInt(_) => return Err(bigint_arithmetic().into()),
        };
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.put_value(&lhs, JsValue::number(new))?;
        Ok(JsValue::number(if prefix { new } else { old }))
    }

    // §13.15.2 assignment operators
    fn eval_assign(
        &mut self,
        op: AssignOp,
        left: &Expression,
        right: &Expression,
    ) -> JsResult<JsValue> {
        if matches!(left, Expression::Object(_) | Expression::Array(_)) {
            return Err(EngineError::NotImplemented("destructuring assignment").into());
        }
        let lref = self.eval_expr(left)?;
        let rval = match op {
            AssignOp::Assign => self.eval_assigned_value(left, right)?,
            AssignOp::LogicalAndAssign
            | AssignOp::LogicalOrAssign
            | AssignOp::NullishAssign => {
                let lval = self.get_value(lref.clone())?;
                let short_circuit = match op {
                    AssignOp::LogicalAndAssign => !to_boolean(&lval),
                    AssignOp::LogicalOrAssign => to_boolean(&lval),
                    _ => !lval.is_nullish(),
                };
                if short_circuit {
                    return Ok(lval);
                }
                self.eval_assigned_value(left, right)?
            }
            _ => {
                let lval = self.get_value(lref.clone())?;
                let rval = self.eval_expr_value(right)?;
                let binary = op.binary_op().ok_or_else(|| {
                    EngineError::Assertion("compound assignment without an operator".to_string())
                })?;
                self.eval_binary(binary, &lval, &rval)?
            }
        };
        self.put_value(&lref, rval.clone())?;
        Ok(rval)
    }

    fn eval_assigned_value(&mut self, left: &Expression, right: &Expression) -> JsResult<JsValue> {
        match left {
            Expression::Identifier(name) => self.eval_expr_named(right, name),
            _ => self.eval_expr_value(right),
        }
    }

    // §13.13 binary logical operators
    fn eval_logical(
        &mut self,
        op: LogicalOp,
        left: &Expression,
        right: &Expression,
    ) -> JsResult<JsValue> {
        let lval = self.eval_expr_value(left)?;
        let take_left = match op {
            LogicalOp::And => !to_boolean(&lval),
            LogicalOp::Or => to_boolean(&lval),
            LogicalOp::NullishCoalescing => !lval.is_nullish(),
        };
        if take_left {
            Ok(lval)
        } else {
            self.eval_expr_value(right)
        }
    }

    // §13.15.3 ApplyStringOrNumericBinaryOperator plus the relational and
    // equality operators.
    pub(crate) fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &JsValue,
        right: &JsValue,
    ) -> JsResult<JsValue> {
        let result = match op {
            BinaryOp::Add => {
                let lprim = to_primitive(left, PreferredType::Default)?;
                let rprim = to_primitive(right, PreferredType::Default)?;
                if lprim.is_string() || rprim.is_string() {
                    let ls = to_string(self, &lprim)?;
                    let rs = to_string(self, &rprim)?;
                    return Ok(JsValue::String(ls.concat(&rs)));
                }
                return self.eval_numeric(op, &lprim, &rprim);
            }
            BinaryOp::Eq => is_loosely_equal(self, left, right)?,
            BinaryOp::NotEq => !is_loosely_equal(self, left, right)?,
            BinaryOp::StrictEq => is_strictly_equal(left, right),
            BinaryOp::StrictNotEq => !is_strictly_equal(left, right),
            BinaryOp::Lt => is_less_than(self, left, right, true)? == Some(true),
            BinaryOp::Gt => is_less_than(self, right, left, false)? == Some(true),
            BinaryOp::LtEq => is_less_than(self, right, left, false)? == Some(false),
            BinaryOp::GtEq => is_less_than(self, left, right, true)? == Some(false),
            BinaryOp::In => {
                let JsValue::Object(obj) = right else {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        "Cannot use 'in' operator to search for a key in a non-object",
                    ));
                };
                let key = to_property_key(self, left)?;
                self.has_property(*obj, &key)?
            }
            BinaryOp::Instanceof => self.instanceof_operator(left, right)?,
            _ => return self.eval_numeric(op, left, right),
        };
        Ok(JsValue::Boolean(result))
    }

    fn eval_numeric(&mut self, op: BinaryOp, left: &JsValue, right: &JsValue) -> JsResult<JsValue> {
        let lnum = to_numeric(self, left)?;
        let rnum = to_numeric(self, right)?;
        let (x, y) = match (lnum, rnum) {
            (Numeric::Number(x), Numeric::Number(y)) => (x, y),
            (Numeric::BigInt(_), Numeric::BigInt(_)) => return Err(bigint_arithmetic().into()),
            _ => {
                return Err(self.throw_error(
                    ErrorKind::TypeError,
                    "Cannot mix BigInt and other types, use explicit conversions",
                ));
            }
        };
        let n = match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            BinaryOp::Mod => number_ops::remainder(x, y),
            BinaryOp::Exp => number_ops::exponentiate(x, y),
            BinaryOp::LShift => number_ops::left_shift(x, y),
            BinaryOp::RShift => number_ops::signed_right_shift(x, y),
            BinaryOp::URShift => number_ops::unsigned_right_shift(x, y),
            BinaryOp::BitAnd => number_ops::bitwise_and(x, y),
            BinaryOp::BitOr => number_ops::bitwise_or(x, y),
            BinaryOp::BitXor => number_ops::bitwise_xor(x, y),
            _ => {
                return Err(EngineError::Assertion(format!(
                    "{op:?} is not a numeric operator"
                ))
                .into());
            }
        };
        Ok(JsValue::number(n))
    }
}

fn describe_callee(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(name) => name.clone(),
        Expression::Member(obj, MemberProperty::Dot(prop)) => {
            format!("{}.{prop}", describe_callee(obj))
        }
        Expression::This => "this".to_string(),
        _ => "expression".to_string(),
    }
}
