//! §7.2 Testing and comparison operations.

use super::helpers::{PreferredType, string_to_bigint, to_number, to_primitive};
use super::{JsResult, Runtime};
use crate::error::EngineError;
use crate::types::{JsValue, number_ops};
use num_bigint::BigInt;
use std::mem::discriminant;

fn same_type(x: &JsValue, y: &JsValue) -> bool {
    discriminant(x) == discriminant(y)
}

// §7.2.10 SameValue
pub fn same_value(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(a.to_f64(), b.to_f64()),
        _ => same_type(x, y) && same_value_non_number(x, y),
    }
}

// §7.2.11 SameValueZero
pub fn same_value_zero(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => {
            number_ops::same_value_zero(a.to_f64(), b.to_f64())
        }
        _ => same_type(x, y) && same_value_non_number(x, y),
    }
}

// §7.2.12 SameValueNonNumber
pub fn same_value_non_number(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a.value == b.value,
        (JsValue::Object(a), JsValue::Object(b)) => a == b,
        _ => false,
    }
}

// §7.2.15 IsStrictlyEqual
pub fn is_strictly_equal(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::equal(a.to_f64(), b.to_f64()),
        _ => same_type(x, y) && same_value_non_number(x, y),
    }
}

fn bigint_equals_number(b: &BigInt, n: f64) -> bool {
    if !n.is_finite() || n.fract() != 0.0 {
        return false;
    }
    BigInt::parse_bytes(format!("{n:.0}").as_bytes(), 10).is_some_and(|m| m == *b)
}

// §7.2.14 IsLooselyEqual. Every step coerces one side and recurses.
pub fn is_loosely_equal(rt: &mut Runtime, x: &JsValue, y: &JsValue) -> JsResult<bool> {
    if same_type(x, y) {
        return Ok(is_strictly_equal(x, y));
    }
    match (x, y) {
        (JsValue::Null | JsValue::Undefined, JsValue::Null | JsValue::Undefined) => Ok(true),
        (JsValue::Number(_), JsValue::String(_)) => {
            let n = JsValue::number(to_number(rt, y)?);
            is_loosely_equal(rt, x, &n)
        }
        (JsValue::String(_), JsValue::Number(_)) => {
            let n = JsValue::number(to_number(rt, x)?);
            is_loosely_equal(rt, &n, y)
        }
        (JsValue::BigInt(_), JsValue::String(s)) => match string_to_bigint(s) {
            Some(n) => is_loosely_equal(rt, x, &JsValue::bigint(n)),
            None => Ok(false),
        },
        (JsValue::String(_), JsValue::BigInt(_)) => is_loosely_equal(rt, y, x),
        (JsValue::Boolean(_), _) => {
            let n = JsValue::number(to_number(rt, x)?);
            is_loosely_equal(rt, &n, y)
        }
        (_, JsValue::Boolean(_)) => {
            let n = JsValue::number(to_number(rt, y)?);
            is_loosely_equal(rt, x, &n)
        }
        (
            JsValue::String(_) | JsValue::Number(_) | JsValue::BigInt(_) | JsValue::Symbol(_),
            JsValue::Object(_),
        ) => {
            let p = to_primitive(y, PreferredType::Default)?;
            is_loosely_equal(rt, x, &p)
        }
        (
            JsValue::Object(_),
            JsValue::String(_) | JsValue::Number(_) | JsValue::BigInt(_) | JsValue::Symbol(_),
        ) => {
            let p = to_primitive(x, PreferredType::Default)?;
            is_loosely_equal(rt, &p, y)
        }
        (JsValue::BigInt(b), JsValue::Number(n)) | (JsValue::Number(n), JsValue::BigInt(b)) => {
            Ok(bigint_equals_number(&b.value, n.to_f64()))
        }
        _ => Ok(false),
    }
}

/// §7.2.13 IsLessThan. `None` stands for undefined (a NaN operand).
///
/// `left_first` decides which operand is converted to a primitive first.
pub fn is_less_than(
    rt: &mut Runtime,
    x: &JsValue,
    y: &JsValue,
    left_first: bool,
) -> JsResult<Option<bool>> {
    let (px, py) = if left_first {
        let px = to_primitive(x, PreferredType::Number)?;
        let py = to_primitive(y, PreferredType::Number)?;
        (px, py)
    } else {
        let py = to_primitive(y, PreferredType::Number)?;
        let px = to_primitive(x, PreferredType::Number)?;
        (px, py)
    };
    match (&px, &py) {
        (JsValue::String(_), JsValue::String(_)) => {
            Err(EngineError::NotImplemented("relational comparison of strings").into())
        }
        (JsValue::BigInt(_), _) | (_, JsValue::BigInt(_)) => {
            Err(EngineError::NotImplemented("relational comparison of BigInts").into())
        }
        _ => {
            let nx = to_number(rt, &px)?;
            let ny = to_number(rt, &py)?;
            Ok(number_ops::less_than(nx, ny))
        }
    }
}
