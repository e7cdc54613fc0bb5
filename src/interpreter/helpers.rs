//! §7.1 Type conversion.

use super::{ErrorKind, JsResult, ObjectId, ObjectKind, PropertyKey, Runtime};
use crate::error::{EngineError, EngineResult};
use crate::types::{JsBigInt, JsString, JsValue, number_ops};
use num_bigint::BigInt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredType {
    Default,
    Number,
    String,
}

/// Result of `ToNumeric`.
#[derive(Clone, Debug, PartialEq)]
pub enum Numeric {
    Number(f64),
    BigInt(JsBigInt),
}

impl Numeric {
    pub fn into_value(self) -> JsValue {
        match self {
            Numeric::Number(n) => JsValue::number(n),
            Numeric::BigInt(b) => JsValue::BigInt(b),
        }
    }
}

// §7.1.1 ToPrimitive
pub fn to_primitive(value: &JsValue, _hint: PreferredType) -> JsResult<JsValue> {
    match value {
        JsValue::Object(_) => Err(EngineError::NotImplemented("ToPrimitive on objects").into()),
        JsValue::Reference(_) => Err(EngineError::Assertion(
            "ToPrimitive applied to a Reference".to_string(),
        )
        .into()),
        _ => Ok(value.clone()),
    }
}

// §7.1.2 ToBoolean. A Number is falsy exactly when its payload is zero,
// which covers NaN since its payload is normalised to zero.
pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => n.payload() != 0.0,
        JsValue::String(s) => !s.is_empty(),
        JsValue::BigInt(b) => b.value != BigInt::from(0),
        JsValue::Symbol(_) | JsValue::Object(_) | JsValue::Reference(_) => true,
    }
}

// §7.1.3 ToNumeric
pub fn to_numeric(rt: &mut Runtime, value: &JsValue) -> JsResult<Numeric> {
    let primitive = to_primitive(value, PreferredType::Number)?;
    if let JsValue::BigInt(b) = primitive {
        return Ok(Numeric::BigInt(b));
    }
    Ok(Numeric::Number(to_number(rt, &primitive)?))
}

// §7.1.4 ToNumber
pub fn to_number(rt: &mut Runtime, value: &JsValue) -> JsResult<f64> {
    match value {
        JsValue::Undefined => Ok(f64::NAN),
        JsValue::Null => Ok(0.0),
        JsValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        JsValue::Number(n) => Ok(n.to_f64()),
        JsValue::String(s) => Ok(string_to_number(s)),
        JsValue::Symbol(_) => Err(rt.throw_error(
            ErrorKind::TypeError,
            "Cannot convert a Symbol value to a number",
        )),
        JsValue::BigInt(_) => Err(rt.throw_error(
            ErrorKind::TypeError,
            "Cannot convert a BigInt value to a number",
        )),
        JsValue::Object(_) | JsValue::Reference(_) => {
            let primitive = to_primitive(value, PreferredType::Number)?;
            to_number(rt, &primitive)
        }
    }
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

// §7.1.4.1.1 StringToNumber
pub(crate) fn string_to_number(s: &JsString) -> f64 {
    let text = s.to_rust_string();
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return parse_radix_digits(digits, radix).unwrap_or(f64::NAN);
        }
    }
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" && trimmed.len() - unsigned.len() <= 1 {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    // Rust's float grammar also accepts "inf" and "nan", which are not
    // numeric literals here.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
    })
}

// §7.1.14 StringToBigInt
pub(crate) fn string_to_bigint(s: &JsString) -> Option<BigInt> {
    let text = s.to_rust_string();
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return Some(BigInt::from(0));
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return BigInt::parse_bytes(digits.as_bytes(), radix);
        }
    }
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigInt::parse_bytes(trimmed.as_bytes(), 10)
}

// §7.1.17 ToString
pub fn to_string(rt: &mut Runtime, value: &JsValue) -> JsResult<JsString> {
    match value {
        JsValue::Undefined => Ok(JsString::from_str("undefined")),
        JsValue::Null => Ok(JsString::from_str("null")),
        JsValue::Boolean(b) => Ok(JsString::from_str(if *b { "true" } else { "false" })),
        JsValue::Number(n) => Ok(JsString::from_str(&number_ops::to_string(n.to_f64()))),
        JsValue::String(s) => Ok(s.clone()),
        JsValue::BigInt(b) => Ok(JsString::from_str(&b.value.to_string())),
        JsValue::Symbol(_) => Err(rt.throw_error(
            ErrorKind::TypeError,
            "Cannot convert a Symbol value to a string",
        )),
        JsValue::Object(_) | JsValue::Reference(_) => {
            let primitive = to_primitive(value, PreferredType::String)?;
            to_string(rt, &primitive)
        }
    }
}

// §7.1.18 ToObject
pub fn to_object(rt: &mut Runtime, value: &JsValue) -> JsResult<ObjectId> {
    match value {
        JsValue::Object(id) => Ok(*id),
        JsValue::Undefined | JsValue::Null => Err(rt.throw_error(
            ErrorKind::TypeError,
            &format!("Cannot convert {value} to object"),
        )),
        _ => Err(EngineError::NotImplemented("ToObject on primitive values").into()),
    }
}

// §7.1.19 ToPropertyKey
pub fn to_property_key(rt: &mut Runtime, value: &JsValue) -> JsResult<PropertyKey> {
    match to_primitive(value, PreferredType::String)? {
        JsValue::Symbol(sym) => Ok(PropertyKey::Symbol(sym)),
        other => Ok(PropertyKey::String(to_string(rt, &other)?)),
    }
}

// §7.1.6 ToInt32
pub fn to_int32(rt: &mut Runtime, value: &JsValue) -> JsResult<i32> {
    Ok(number_ops::to_int32(to_number(rt, value)?))
}

// §7.1.7 ToUint32
pub fn to_uint32(rt: &mut Runtime, value: &JsValue) -> JsResult<u32> {
    Ok(number_ops::to_uint32(to_number(rt, value)?))
}

// §7.2.3 IsCallable
pub fn is_callable(rt: &Runtime, value: &JsValue) -> EngineResult<bool> {
    match value {
        JsValue::Object(id) => Ok(rt.object(*id)?.is_callable()),
        _ => Ok(false),
    }
}

// §7.2.4 IsConstructor
pub fn is_constructor(rt: &Runtime, value: &JsValue) -> EngineResult<bool> {
    let JsValue::Object(id) = value else {
        return Ok(false);
    };
    Ok(match &rt.object(*id)?.kind {
        ObjectKind::Function(f) => f.is_constructor,
        ObjectKind::Builtin(_) => true,
        _ => false,
    })
}

// §13.5.3 the typeof operator
pub fn type_of(rt: &Runtime, value: &JsValue) -> EngineResult<&'static str> {
    Ok(match value {
        JsValue::Undefined => "undefined",
        JsValue::Null => "object",
        JsValue::Boolean(_) => "boolean",
        JsValue::Number(_) => "number",
        JsValue::String(_) => "string",
        JsValue::Symbol(_) => "symbol",
        JsValue::BigInt(_) => "bigint",
        JsValue::Object(_) if is_callable(rt, value)? => "function",
        JsValue::Object(_) => "object",
        JsValue::Reference(_) => {
            return Err(EngineError::Assertion(
                "typeof applied to an unresolved Reference".to_string(),
            ));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Abrupt;

    fn runtime() -> Runtime {
        let mut rt = Runtime::new();
        let realm = rt.new_realm().unwrap();
        rt.push_script_context(realm, false).unwrap();
        rt
    }

    #[test]
    fn to_boolean_table() {
        assert!(!to_boolean(&JsValue::Undefined));
        assert!(!to_boolean(&JsValue::Null));
        assert!(!to_boolean(&JsValue::number(0.0)));
        assert!(!to_boolean(&JsValue::number(-0.0)));
        assert!(!to_boolean(&JsValue::nan()));
        assert!(to_boolean(&JsValue::number(0.5)));
        assert!(!to_boolean(&JsValue::string("")));
        assert!(to_boolean(&JsValue::string("0")));
        assert!(!to_boolean(&JsValue::bigint(0)));
        assert!(to_boolean(&JsValue::bigint(-3)));
    }

    #[test]
    fn string_to_number_grammar() {
        let n = |s: &str| string_to_number(&JsString::from_str(s));
        assert_eq!(n("  42 "), 42.0);
        assert_eq!(n(""), 0.0);
        assert_eq!(n("\n\t"), 0.0);
        assert_eq!(n("0x1F"), 31.0);
        assert_eq!(n("0b101"), 5.0);
        assert_eq!(n("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(n("1e3"), 1000.0);
        assert_eq!(n(".5"), 0.5);
        assert!(n("inf").is_nan());
        assert!(n("nan").is_nan());
        assert!(n("12px").is_nan());
        assert!(n("0x").is_nan());
        assert!(n("-0x10").is_nan());
    }

    #[test]
    fn to_string_of_primitives() {
        let mut rt = runtime();
        let s = |rt: &mut Runtime, v: JsValue| to_string(rt, &v).unwrap().to_rust_string();
        assert_eq!(s(&mut rt, JsValue::number(1.5)), "1.5");
        assert_eq!(s(&mut rt, JsValue::number(-0.0)), "0");
        assert_eq!(s(&mut rt, JsValue::nan()), "NaN");
        assert_eq!(s(&mut rt, JsValue::Boolean(false)), "false");
        assert_eq!(s(&mut rt, JsValue::bigint(12)), "12");
        assert_eq!(s(&mut rt, JsValue::Null), "null");
    }

    #[test]
    fn symbols_do_not_convert() {
        let mut rt = runtime();
        let sym = JsValue::Symbol(rt.new_symbol(None));
        let Err(Abrupt::Throw(err)) = to_string(&mut rt, &sym) else {
            panic!("expected a TypeError");
        };
        assert_eq!(rt.error_kind_of(&err), Some(ErrorKind::TypeError));
        assert!(matches!(to_number(&mut rt, &sym), Err(Abrupt::Throw(_))));
        assert!(matches!(
            to_property_key(&mut rt, &sym),
            Ok(PropertyKey::Symbol(_))
        ));
    }

    #[test]
    fn object_coercions_are_explicit_gaps() {
        let mut rt = runtime();
        let obj = JsValue::Object(rt.ordinary_object_create(None));
        assert_eq!(
            to_number(&mut rt, &obj),
            Err(Abrupt::Internal(EngineError::NotImplemented(
                "ToPrimitive on objects"
            )))
        );
        assert!(matches!(
            to_object(&mut rt, &JsValue::number(1.0)),
            Err(Abrupt::Internal(EngineError::NotImplemented(_)))
        ));
        assert!(matches!(
            to_object(&mut rt, &JsValue::Undefined),
            Err(Abrupt::Throw(_))
        ));
    }

    #[test]
    fn int32_wraps() {
        let mut rt = runtime();
        assert_eq!(to_int32(&mut rt, &JsValue::number(4_294_967_295.0)).unwrap(), -1);
        assert_eq!(to_uint32(&mut rt, &JsValue::number(-1.0)).unwrap(), 4_294_967_295);
        assert_eq!(to_uint32(&mut rt, &JsValue::string("7")).unwrap(), 7);
    }

    #[test]
    fn string_to_bigint_grammar() {
        let b = |s: &str| string_to_bigint(&JsString::from_str(s));
        assert_eq!(b(" 10 "), Some(BigInt::from(10)));
        assert_eq!(b("-7"), Some(BigInt::from(-7)));
        assert_eq!(b("0x10"), Some(BigInt::from(16)));
        assert_eq!(b(""), Some(BigInt::from(0)));
        assert_eq!(b("1.5"), None);
        assert_eq!(b("-"), None);
    }
}
