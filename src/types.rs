use crate::interpreter::{ObjectId, Reference};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A language value, plus the Reference bookkeeping kind produced by
/// identifier and property evaluation.
///
/// `PartialEq` here is structural equality for host code and tests. Script
/// comparisons go through `IsStrictlyEqual`/`SameValue` instead.
#[derive(Clone, Debug, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(Number),
    String(JsString),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
    Object(ObjectId),
    Reference(Box<Reference>),
}

/// §6.1.6.1 Number value.
///
/// NaN is carried as a flag next to the payload. A NaN-flagged number
/// always has a payload of zero, so the payload alone never reads as NaN.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Number {
    value: f64,
    nan: bool,
}

impl Number {
    pub const NAN: Number = Number {
        value: 0.0,
        nan: true,
    };

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self::NAN
        } else {
            Number { value, nan: false }
        }
    }

    pub fn is_nan(self) -> bool {
        self.nan
    }

    /// The raw numeric payload, zero for NaN.
    pub fn payload(self) -> f64 {
        self.value
    }

    pub fn to_f64(self) -> f64 {
        if self.nan { f64::NAN } else { self.value }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::new(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&number_ops::to_string(self.to_f64()))
    }
}

// §6.1.4 String: a sequence of UTF-16 code units
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct JsString {
    pub code_units: Vec<u16>,
}

impl JsString {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self {
            code_units: s.encode_utf16().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.code_units.len()
    }

    pub fn to_rust_string(&self) -> String {
        String::from_utf16_lossy(&self.code_units)
    }

    pub fn concat(&self, other: &JsString) -> JsString {
        let mut code_units = Vec::with_capacity(self.len() + other.len());
        code_units.extend_from_slice(&self.code_units);
        code_units.extend_from_slice(&other.code_units);
        JsString { code_units }
    }

    /// Returns the index value if this string is a canonical array index
    /// (§6.1.7), i.e. an integer below 2^32 - 1 with no leading zeros.
    pub fn as_array_index(&self) -> Option<u32> {
        let units = &self.code_units;
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == u16::from(b'0') {
            return None;
        }
        let mut n: u64 = 0;
        for &u in units {
            if !(u16::from(b'0')..=u16::from(b'9')).contains(&u) {
                return None;
            }
            n = n * 10 + u64::from(u - u16::from(b'0'));
        }
        if n < u64::from(u32::MAX) {
            Some(n as u32)
        } else {
            None
        }
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString::from_str(s)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust_string())
    }
}

/// Symbols compare and hash by identity only.
#[derive(Clone, Debug)]
pub struct JsSymbol {
    pub id: u64,
    pub description: Option<JsString>,
}

impl PartialEq for JsSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for JsSymbol {}

impl Hash for JsSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JsBigInt {
    pub value: num_bigint::BigInt,
}

impl JsValue {
    pub fn undefined() -> Self {
        JsValue::Undefined
    }

    pub fn null() -> Self {
        JsValue::Null
    }

    pub fn boolean(b: bool) -> Self {
        JsValue::Boolean(b)
    }

    pub fn number(n: f64) -> Self {
        JsValue::Number(Number::new(n))
    }

    pub fn nan() -> Self {
        JsValue::Number(Number::NAN)
    }

    pub fn string(s: &str) -> Self {
        JsValue::String(JsString::from_str(s))
    }

    pub fn bigint(value: impl Into<num_bigint::BigInt>) -> Self {
        JsValue::BigInt(JsBigInt {
            value: value.into(),
        })
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JsValue::String(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JsValue::Reference(_))
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            JsValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(n.to_f64()),
            _ => None,
        }
    }

    /// Name of the value's type tag, as used in engine diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "Undefined",
            JsValue::Null => "Null",
            JsValue::Boolean(_) => "Boolean",
            JsValue::Number(_) => "Number",
            JsValue::String(_) => "String",
            JsValue::Symbol(_) => "Symbol",
            JsValue::BigInt(_) => "BigInt",
            JsValue::Object(_) => "Object",
            JsValue::Reference(_) => "Reference",
        }
    }
}

pub fn new_undefined_value() -> JsValue {
    JsValue::Undefined
}

pub fn new_null_value() -> JsValue {
    JsValue::Null
}

pub fn new_boolean_value(b: bool) -> JsValue {
    JsValue::Boolean(b)
}

pub fn new_number_value(n: f64) -> JsValue {
    JsValue::number(n)
}

pub fn new_string_value(s: &str) -> JsValue {
    JsValue::string(s)
}

// §6.1.6.1 Number type operations
pub mod number_ops {
    pub fn unary_minus(x: f64) -> f64 {
        if x.is_nan() { f64::NAN } else { -x }
    }

    pub fn bitwise_not(x: f64) -> f64 {
        f64::from(!to_int32(x))
    }

    // §6.1.6.1.3 Number::exponentiate
    pub fn exponentiate(base: f64, exp: f64) -> f64 {
        if exp.is_nan() {
            return f64::NAN;
        }
        if exp == 0.0 {
            return 1.0;
        }
        if (base == 1.0 || base == -1.0) && exp.is_infinite() {
            return f64::NAN;
        }
        base.powf(exp)
    }

    pub fn remainder(x: f64, y: f64) -> f64 {
        x % y
    }

    pub fn left_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shl(shift))
    }

    pub fn signed_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_int32(x).wrapping_shr(shift))
    }

    pub fn unsigned_right_shift(x: f64, y: f64) -> f64 {
        let shift = to_uint32(y) & 0x1F;
        f64::from(to_uint32(x).wrapping_shr(shift))
    }

    pub fn less_than(x: f64, y: f64) -> Option<bool> {
        if x.is_nan() || y.is_nan() {
            None
        } else {
            Some(x < y)
        }
    }

    pub fn equal(x: f64, y: f64) -> bool {
        if x.is_nan() || y.is_nan() {
            return false;
        }
        x == y
    }

    pub fn same_value(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        if x == 0.0 && y == 0.0 {
            return x.is_sign_positive() == y.is_sign_positive();
        }
        x == y
    }

    pub fn same_value_zero(x: f64, y: f64) -> bool {
        if x.is_nan() && y.is_nan() {
            return true;
        }
        x == y
    }

    pub fn bitwise_and(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) & to_int32(y))
    }

    pub fn bitwise_xor(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) ^ to_int32(y))
    }

    pub fn bitwise_or(x: f64, y: f64) -> f64 {
        f64::from(to_int32(x) | to_int32(y))
    }

    pub fn to_string(x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x == 0.0 {
            return "0".to_string();
        }
        if x.is_infinite() {
            return if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
        }
        let mut buf = ryu_js::Buffer::new();
        buf.format(x).to_string()
    }

    // §7.1.7 ToUint32
    pub fn to_uint32(x: f64) -> u32 {
        if !x.is_finite() || x == 0.0 {
            return 0;
        }
        x.trunc().rem_euclid(4_294_967_296.0) as u32
    }

    // §7.1.6 ToInt32
    pub fn to_int32(x: f64) -> i32 {
        to_uint32(x) as i32
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{b}"),
            JsValue::Number(n) => write!(f, "{n}"),
            JsValue::String(s) => write!(f, "{s}"),
            JsValue::Symbol(s) => {
                if let Some(desc) = &s.description {
                    write!(f, "Symbol({desc})")
                } else {
                    write!(f, "Symbol()")
                }
            }
            JsValue::BigInt(b) => write!(f, "{}n", b.value),
            JsValue::Object(_) => write!(f, "[object Object]"),
            JsValue::Reference(_) => write!(f, "[reference]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_normalised_to_zero_payload() {
        let n = Number::new(f64::NAN);
        assert!(n.is_nan());
        assert_eq!(n.payload(), 0.0);
        assert!(n.to_f64().is_nan());
        assert!(!Number::new(0.0).is_nan());
    }

    #[test]
    fn array_index_detection() {
        assert_eq!(JsString::from_str("0").as_array_index(), Some(0));
        assert_eq!(JsString::from_str("42").as_array_index(), Some(42));
        assert_eq!(JsString::from_str("042").as_array_index(), None);
        assert_eq!(JsString::from_str("-1").as_array_index(), None);
        assert_eq!(JsString::from_str("4294967294").as_array_index(), Some(4294967294));
        assert_eq!(JsString::from_str("4294967295").as_array_index(), None);
        assert_eq!(JsString::from_str("length").as_array_index(), None);
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = JsSymbol {
            id: 1,
            description: Some(JsString::from_str("x")),
        };
        let b = JsSymbol {
            id: 2,
            description: Some(JsString::from_str("x")),
        };
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn number_special_values() {
        assert_eq!(number_ops::to_string(f64::NAN), "NaN");
        assert_eq!(number_ops::to_string(0.0), "0");
        assert_eq!(number_ops::to_string(-0.0), "0");
        assert_eq!(number_ops::to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_ops::to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_ops::to_string(1.5), "1.5");
        assert_eq!(number_ops::to_string(100.0), "100");
    }

    #[test]
    fn number_same_value() {
        assert!(number_ops::same_value(f64::NAN, f64::NAN));
        assert!(!number_ops::same_value(0.0, -0.0));
        assert!(number_ops::same_value_zero(0.0, -0.0));
        assert!(!number_ops::equal(f64::NAN, f64::NAN));
    }

    #[test]
    fn to_int32_wraps() {
        assert_eq!(number_ops::to_int32(f64::NAN), 0);
        assert_eq!(number_ops::to_int32(f64::INFINITY), 0);
        assert_eq!(number_ops::to_int32(42.9), 42);
        assert_eq!(number_ops::to_int32(-42.9), -42);
        assert_eq!(number_ops::to_int32(4_294_967_296.0 + 5.0), 5);
        assert_eq!(number_ops::to_uint32(-1.0), 4_294_967_295);
    }

    #[test]
    fn shift_ops() {
        assert_eq!(number_ops::left_shift(1.0, 4.0), 16.0);
        assert_eq!(number_ops::signed_right_shift(-16.0, 2.0), -4.0);
        assert_eq!(number_ops::unsigned_right_shift(-1.0, 0.0), 4294967295.0);
    }

    #[test]
    fn display_values() {
        assert_eq!(format!("{}", JsValue::Undefined), "undefined");
        assert_eq!(format!("{}", JsValue::Boolean(true)), "true");
        assert_eq!(format!("{}", JsValue::number(42.0)), "42");
        assert_eq!(format!("{}", JsValue::string("hi")), "hi");
        assert_eq!(format!("{}", JsValue::bigint(7)), "7n");
    }
}
