use super::EnvId;
use crate::error::{EngineError, EngineResult};
use crate::types::{JsString, JsSymbol, JsValue};
use std::fmt;

/// §6.2.4 Completion Record.
///
/// `Normal(None)` stands for an empty/unused completion value.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    Normal(Option<JsValue>),
    Return(JsValue),
    Throw(JsValue),
    Break {
        target: Option<String>,
        value: Option<JsValue>,
    },
    Continue {
        target: Option<String>,
        value: Option<JsValue>,
    },
}

impl Completion {
    pub fn normal(value: JsValue) -> Self {
        Completion::Normal(Some(value))
    }

    pub fn unused() -> Self {
        Completion::Normal(None)
    }

    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    pub fn is_throw(&self) -> bool {
        matches!(self, Completion::Throw(_))
    }

    pub fn value(&self) -> Option<&JsValue> {
        match self {
            Completion::Normal(v) | Completion::Break { value: v, .. } => v.as_ref(),
            Completion::Continue { value: v, .. } => v.as_ref(),
            Completion::Return(v) | Completion::Throw(v) => Some(v),
        }
    }

    // §6.2.4.4 UpdateEmpty
    pub fn update_empty(self, value: Option<JsValue>) -> Completion {
        match self {
            Completion::Normal(None) => Completion::Normal(value),
            Completion::Break {
                target,
                value: None,
            } => Completion::Break { target, value },
            Completion::Continue {
                target,
                value: None,
            } => Completion::Continue { target, value },
            other => other,
        }
    }
}

/// A non-normal outcome of an abstract operation.
///
/// `Throw` is observable by script code. `Internal` is an engine defect
/// and is surfaced to the host as `Err(EngineError)`, never as a throw.
#[derive(Clone, Debug, PartialEq)]
pub enum Abrupt {
    Throw(JsValue),
    Internal(EngineError),
}

impl From<EngineError> for Abrupt {
    fn from(e: EngineError) -> Self {
        Abrupt::Internal(e)
    }
}

impl Abrupt {
    pub fn into_completion(self) -> EngineResult<Completion> {
        match self {
            Abrupt::Throw(value) => Ok(Completion::Throw(value)),
            Abrupt::Internal(e) => Err(e),
        }
    }
}

pub type JsResult<T> = Result<T, Abrupt>;

/// Native error constructors a realm provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    ReferenceError,
    SyntaxError,
    RangeError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::RangeError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::RangeError => "RangeError",
        }
    }
}

/// §6.2.5 Reference Record.
///
/// A reference names either an environment binding or an object property,
/// never both. An unresolvable reference names neither.
#[derive(Clone, Debug, PartialEq)]
pub enum Reference {
    Unresolvable {
        name: String,
        strict: bool,
    },
    Environment {
        env: EnvId,
        name: String,
        strict: bool,
    },
    Property {
        base: JsValue,
        name: JsValue,
        this_value: Option<JsValue>,
        strict: bool,
    },
}

impl Reference {
    pub fn is_strict(&self) -> bool {
        match self {
            Reference::Unresolvable { strict, .. }
            | Reference::Environment { strict, .. }
            | Reference::Property { strict, .. } => *strict,
        }
    }

    // §6.2.5.3 IsUnresolvableReference
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, Reference::Unresolvable { .. })
    }

    // §6.2.5.1 IsPropertyReference
    pub fn is_property_reference(&self) -> bool {
        matches!(self, Reference::Property { .. })
    }

    // §6.2.5.7 GetThisValue
    pub fn this_value(&self) -> Option<JsValue> {
        match self {
            Reference::Property {
                base, this_value, ..
            } => Some(this_value.clone().unwrap_or_else(|| base.clone())),
            _ => None,
        }
    }

    /// Binding name for identifier references.
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Reference::Unresolvable { name, .. } | Reference::Environment { name, .. } => {
                Some(name)
            }
            Reference::Property { .. } => None,
        }
    }
}

/// §6.1.7 property key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

impl PropertyKey {
    pub fn as_array_index(&self) -> Option<u32> {
        match self {
            PropertyKey::String(s) => s.as_array_index(),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.clone()),
            PropertyKey::Symbol(s) => JsValue::Symbol(s.clone()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from_str(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        PropertyKey::String(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(index: u32) -> Self {
        PropertyKey::String(JsString::from_str(&index.to_string()))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => match &s.description {
                Some(desc) => write!(f, "Symbol({desc})"),
                None => write!(f, "Symbol()"),
            },
        }
    }
}

/// §6.2.6 Property Descriptor, always complete.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyDescriptor {
    Data {
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: JsValue,
        set: JsValue,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor::Data {
            value,
            writable,
            enumerable,
            configurable,
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub fn accessor(get: JsValue, set: JsValue, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor::Accessor {
            get,
            set,
            enumerable,
            configurable,
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        matches!(self, PropertyDescriptor::Data { .. })
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        matches!(self, PropertyDescriptor::Accessor { .. })
    }

    pub fn enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { enumerable, .. }
            | PropertyDescriptor::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { configurable, .. }
            | PropertyDescriptor::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn value(&self) -> Option<&JsValue> {
        match self {
            PropertyDescriptor::Data { value, .. } => Some(value),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }

    pub fn writable(&self) -> Option<bool> {
        match self {
            PropertyDescriptor::Data { writable, .. } => Some(*writable),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }

    /// What applying a descriptor holding only `[[Value]]` turns `self` into.
    /// An accessor becomes a non-writable data property.
    pub fn with_value(&self, value: JsValue) -> Self {
        Self::data(
            value,
            self.writable().unwrap_or(false),
            self.enumerable(),
            self.configurable(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_empty_fills_only_missing_values() {
        let filled = Completion::unused().update_empty(Some(JsValue::number(1.0)));
        assert_eq!(filled, Completion::normal(JsValue::number(1.0)));

        let kept = Completion::normal(JsValue::number(2.0)).update_empty(Some(JsValue::Null));
        assert_eq!(kept, Completion::normal(JsValue::number(2.0)));

        let brk = Completion::Break {
            target: Some("outer".into()),
            value: None,
        }
        .update_empty(Some(JsValue::Boolean(true)));
        assert_eq!(brk.value(), Some(&JsValue::Boolean(true)));

        let thrown = Completion::Throw(JsValue::Null).update_empty(Some(JsValue::Undefined));
        assert_eq!(thrown, Completion::Throw(JsValue::Null));
    }

    #[test]
    fn abrupt_channels_stay_apart() {
        let thrown = Abrupt::Throw(JsValue::string("boom")).into_completion();
        assert_eq!(thrown, Ok(Completion::Throw(JsValue::string("boom"))));

        let internal = Abrupt::from(EngineError::NotImplemented("x")).into_completion();
        assert_eq!(internal, Err(EngineError::NotImplemented("x")));
    }

    #[test]
    fn property_reference_this_value_defaults_to_base() {
        let r = Reference::Property {
            base: JsValue::number(1.0),
            name: JsValue::string("x"),
            this_value: None,
            strict: false,
        };
        assert_eq!(r.this_value(), Some(JsValue::number(1.0)));
        assert!(r.is_property_reference());
        assert_eq!(r.binding_name(), None);
    }

    #[test]
    fn descriptor_accessors() {
        let d = PropertyDescriptor::data(JsValue::Null, false, true, false);
        assert!(d.is_data_descriptor());
        assert!(d.enumerable());
        assert!(!d.configurable());
        assert_eq!(d.writable(), Some(false));

        let a = PropertyDescriptor::accessor(JsValue::Undefined, JsValue::Undefined, false, true);
        assert!(a.is_accessor_descriptor());
        assert_eq!(a.value(), None);
    }
}
