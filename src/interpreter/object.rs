//! §10.1 Ordinary object internal methods, §10.4.2 Array exotic objects and
//! §10.4.4 Arguments exotic objects.

use super::compare::same_value;
use super::function::{BuiltinFunction, FunctionData};
use super::helpers::{to_number, to_uint32};
use super::{
    BindingState, EnvId, EnvironmentRecord, ErrorKind, JsResult, ObjectId, PropertyDescriptor,
    PropertyKey, Runtime,
};
use crate::error::{EngineError, EngineResult};
use crate::types::JsValue;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug)]
pub enum ObjectKind {
    Ordinary,
    Array,
    Error,
    /// `None` for unmapped arguments objects.
    Arguments(Option<ParameterMap>),
    Function(Box<FunctionData>),
    Builtin(BuiltinFunction),
}

/// The [[ParameterMap]] of a mapped arguments object: each mapped index
/// aliases a formal parameter binding of `env`.
#[derive(Clone, Debug)]
pub struct ParameterMap {
    pub env: EnvId,
    pub(crate) names: FxHashMap<PropertyKey, String>,
}

#[derive(Clone, Debug)]
pub struct ObjectData {
    pub prototype: Option<ObjectId>,
    pub extensible: bool,
    pub(crate) properties: FxHashMap<PropertyKey, PropertyDescriptor>,
    /// Insertion order of `properties`.
    pub(crate) keys: Vec<PropertyKey>,
    pub kind: ObjectKind,
}

impl ObjectData {
    pub fn new(prototype: Option<ObjectId>, kind: ObjectKind) -> Self {
        Self {
            prototype,
            extensible: true,
            properties: FxHashMap::default(),
            keys: Vec::new(),
            kind,
        }
    }

    pub fn property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    /// Stores `desc` without any validation.
    pub(crate) fn insert(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        if self.properties.insert(key.clone(), desc).is_none() {
            self.keys.push(key);
        }
    }

    pub(crate) fn remove(&mut self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let removed = self.properties.remove(key)?;
        self.keys.retain(|k| k != key);
        Some(removed)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_) | ObjectKind::Builtin(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array)
    }

    fn parameter_map(&self) -> Option<&ParameterMap> {
        match &self.kind {
            ObjectKind::Arguments(map) => map.as_ref(),
            _ => None,
        }
    }

    // §7.3.25 OrdinaryOwnPropertyKeys: integer indices ascending, then
    // strings, then symbols, each group in creation order.
    pub fn ordered_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = self
            .keys
            .iter()
            .filter_map(|k| k.as_array_index().map(|i| (i, k)))
            .collect();
        indices.sort_by_key(|(i, _)| *i);

        let mut ordered: Vec<PropertyKey> = indices.into_iter().map(|(_, k)| k.clone()).collect();
        ordered.extend(
            self.keys
                .iter()
                .filter(|k| matches!(k, PropertyKey::String(_)) && k.as_array_index().is_none())
                .cloned(),
        );
        ordered.extend(
            self.keys
                .iter()
                .filter(|k| matches!(k, PropertyKey::Symbol(_)))
                .cloned(),
        );
        ordered
    }
}

impl Runtime {
    // §10.1.12 OrdinaryObjectCreate
    pub fn ordinary_object_create(&mut self, prototype: Option<ObjectId>) -> ObjectId {
        self.alloc_object(ObjectData::new(prototype, ObjectKind::Ordinary))
    }

    // §10.4.2.2 ArrayCreate
    pub fn array_create(&mut self, length: u64) -> JsResult<ObjectId> {
        if length > u64::from(u32::MAX) {
            return Err(self.throw_error(ErrorKind::RangeError, "Invalid array length"));
        }
        let prototype = self.intrinsics()?.array_prototype;
        let mut data = ObjectData::new(Some(prototype), ObjectKind::Array);
        data.insert(
            "length".into(),
            PropertyDescriptor::data(JsValue::number(length as f64), true, false, false),
        );
        Ok(self.alloc_object(data))
    }

    /// Allocates a native error instance of the current realm.
    pub(crate) fn create_error_object(
        &mut self,
        kind: ErrorKind,
        message: &str,
    ) -> EngineResult<ObjectId> {
        let prototype = self.intrinsics()?.error_prototype(kind);
        let mut data = ObjectData::new(Some(prototype), ObjectKind::Error);
        if !message.is_empty() {
            data.insert(
                "message".into(),
                PropertyDescriptor::data(JsValue::string(message), true, false, true),
            );
        }
        Ok(self.alloc_object(data))
    }

    // §10.1.1 [[GetPrototypeOf]]
    pub fn get_prototype_of(&self, o: ObjectId) -> JsResult<Option<ObjectId>> {
        Ok(self.object(o)?.prototype)
    }

    // §10.1.2.1 OrdinarySetPrototypeOf
    pub fn set_prototype_of(&mut self, o: ObjectId, prototype: Option<ObjectId>) -> JsResult<bool> {
        let data = self.object(o)?;
        if data.prototype == prototype {
            return Ok(true);
        }
        if !data.extensible {
            return Ok(false);
        }
        let mut p = prototype;
        while let Some(current) = p {
            if current == o {
                return Ok(false);
            }
            p = self.object(current)?.prototype;
        }
        self.object_mut(o)?.prototype = prototype;
        Ok(true)
    }

    // §10.1.3 [[IsExtensible]]
    pub fn is_extensible(&self, o: ObjectId) -> JsResult<bool> {
        Ok(self.object(o)?.extensible)
    }

    // §10.1.4 [[PreventExtensions]]
    pub fn prevent_extensions(&mut self, o: ObjectId) -> JsResult<bool> {
        self.object_mut(o)?.extensible = false;
        Ok(true)
    }

    // §10.1.5 [[GetOwnProperty]], §10.4.4.1 for mapped arguments
    pub fn get_own_property(
        &self,
        o: ObjectId,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        let desc = self.object(o)?.property(key).cloned();
        match (desc, self.mapped_argument(o, key)?) {
            (
                Some(PropertyDescriptor::Data {
                    writable,
                    enumerable,
                    configurable,
                    ..
                }),
                Some(value),
            ) => Ok(Some(PropertyDescriptor::data(
                value,
                writable,
                enumerable,
                configurable,
            ))),
            (desc, _) => Ok(desc),
        }
    }

    /// The binding `key` aliases on a mapped arguments object.
    fn mapped_binding(
        &self,
        o: ObjectId,
        key: &PropertyKey,
    ) -> EngineResult<Option<(EnvId, String)>> {
        Ok(self
            .object(o)?
            .parameter_map()
            .and_then(|map| Some((map.env, map.names.get(key)?.clone()))))
    }

    /// Current value of the parameter `key` aliases, if it is mapped.
    fn mapped_argument(&self, o: ObjectId, key: &PropertyKey) -> EngineResult<Option<JsValue>> {
        let Some((env, name)) = self.mapped_binding(o, key)? else {
            return Ok(None);
        };
        let EnvironmentRecord::Declarative(record) = self.environment(env)? else {
            return Err(EngineError::Assertion(
                "parameter map outside a function environment".to_string(),
            ));
        };
        match record.binding(&name).map(|b| &b.state) {
            Some(BindingState::Initialized(value)) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    fn unmap_argument(&mut self, o: ObjectId, key: &PropertyKey) -> EngineResult<()> {
        if let ObjectKind::Arguments(Some(map)) = &mut self.object_mut(o)?.kind {
            map.names.remove(key);
        }
        Ok(())
    }

    // §10.1.6 [[DefineOwnProperty]], dispatching to §10.4.2.1 for arrays and
    // §10.4.4.2 for mapped arguments
    pub fn define_own_property(
        &mut self,
        o: ObjectId,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        if let Some((env, name)) = self.mapped_binding(o, &key)? {
            return self.arguments_define_own_property(o, key, desc, env, &name);
        }
        if !self.object(o)?.is_array() {
            return self.ordinary_define_own_property(o, key, desc);
        }
        if key == PropertyKey::from("length") {
            return self.array_set_length(o, desc);
        }
        let Some(index) = key.as_array_index() else {
            return self.ordinary_define_own_property(o, key, desc);
        };
        let (old_len, length_writable) = self.array_length(o)?;
        if f64::from(index) >= old_len && !length_writable {
            return Ok(false);
        }
        if !self.ordinary_define_own_property(o, key, desc)? {
            return Ok(false);
        }
        if f64::from(index) >= old_len {
            self.ordinary_define_own_property(
                o,
                "length".into(),
                PropertyDescriptor::data(
                    JsValue::number(f64::from(index) + 1.0),
                    length_writable,
                    false,
                    false,
                ),
            )?;
        }
        Ok(true)
    }

    // §10.4.4.2 steps 5 onwards, for an index that is still mapped
    fn arguments_define_own_property(
        &mut self,
        o: ObjectId,
        key: PropertyKey,
        desc: PropertyDescriptor,
        env: EnvId,
        name: &str,
    ) -> JsResult<bool> {
        if !self.ordinary_define_own_property(o, key.clone(), desc.clone())? {
            return Ok(false);
        }
        match desc {
            PropertyDescriptor::Accessor { .. } => self.unmap_argument(o, &key)?,
            PropertyDescriptor::Data {
                value, writable, ..
            } => {
                self.set_mutable_binding(env, name, value, false)?;
                if !writable {
                    self.unmap_argument(o, &key)?;
                }
            }
        }
        Ok(true)
    }

    fn array_length(&self, o: ObjectId) -> EngineResult<(f64, bool)> {
        match self.object(o)?.property(&"length".into()) {
            Some(PropertyDescriptor::Data {
                value: JsValue::Number(n),
                writable,
                ..
            }) => Ok((n.to_f64(), *writable)),
            _ => Err(EngineError::Assertion(
                "array without a numeric length property".to_string(),
            )),
        }
    }

    // §10.4.2.4 ArraySetLength
    fn array_set_length(&mut self, a: ObjectId, desc: PropertyDescriptor) -> JsResult<bool> {
        let PropertyDescriptor::Data {
            value,
            writable: new_writable,
            enumerable,
            configurable,
        } = desc
        else {
            return self.ordinary_define_own_property(a, "length".into(), desc);
        };
        let new_len = to_uint32(self, &value)?;
        let number_len = to_number(self, &value)?;
        if f64::from(new_len) != number_len {
            return Err(self.throw_error(ErrorKind::RangeError, "Invalid array length"));
        }
        let new_len_desc = |writable: bool, len: f64| {
            PropertyDescriptor::data(JsValue::number(len), writable, enumerable, configurable)
        };

        let (old_len, old_writable) = self.array_length(a)?;
        if f64::from(new_len) >= old_len {
            return self.ordinary_define_own_property(
                a,
                "length".into(),
                new_len_desc(new_writable, f64::from(new_len)),
            );
        }
        if !old_writable {
            return Ok(false);
        }
        if !self.ordinary_define_own_property(
            a,
            "length".into(),
            new_len_desc(true, f64::from(new_len)),
        )? {
            return Ok(false);
        }

        let mut doomed: Vec<u32> = self
            .object(a)?
            .keys
            .iter()
            .filter_map(PropertyKey::as_array_index)
            .filter(|&i| i >= new_len)
            .collect();
        doomed.sort_unstable_by(|x, y| y.cmp(x));
        for index in doomed {
            if !self.delete(a, &PropertyKey::from(index))? {
                self.ordinary_define_own_property(
                    a,
                    "length".into(),
                    new_len_desc(new_writable, f64::from(index) + 1.0),
                )?;
                return Ok(false);
            }
        }

        if !new_writable {
            self.ordinary_define_own_property(
                a,
                "length".into(),
                new_len_desc(false, f64::from(new_len)),
            )?;
        }
        tracing::trace!(new_len, "array truncated");
        Ok(true)
    }

    // §10.1.6.1 OrdinaryDefineOwnProperty
    pub fn ordinary_define_own_property(
        &mut self,
        o: ObjectId,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        let current = self.get_own_property(o, &key)?;
        let extensible = self.is_extensible(o)?;
        Ok(self.validate_and_apply_property_descriptor(Some(o), key, extensible, desc, current)?)
    }

    /// §10.1.6.3 ValidateAndApplyPropertyDescriptor. With `o == None` only
    /// the compatibility check runs.
    pub fn validate_and_apply_property_descriptor(
        &mut self,
        o: Option<ObjectId>,
        key: PropertyKey,
        extensible: bool,
        desc: PropertyDescriptor,
        current: Option<PropertyDescriptor>,
    ) -> EngineResult<bool> {
        match &current {
            None if !extensible => return Ok(false),
            None => {}
            Some(current) if !current.configurable() => {
                if desc.configurable() || desc.enumerable() != current.enumerable() {
                    return Ok(false);
                }
                match (current, &desc) {
                    (
                        PropertyDescriptor::Accessor { get, set, .. },
                        PropertyDescriptor::Accessor {
                            get: new_get,
                            set: new_set,
                            ..
                        },
                    ) => {
                        if !same_value(get, new_get) || !same_value(set, new_set) {
                            return Ok(false);
                        }
                    }
                    (
                        PropertyDescriptor::Data {
                            value,
                            writable: false,
                            ..
                        },
                        PropertyDescriptor::Data {
                            value: new_value,
                            writable: new_writable,
                            ..
                        },
                    ) => {
                        if *new_writable || !same_value(value, new_value) {
                            return Ok(false);
                        }
                    }
                    (PropertyDescriptor::Data { .. }, PropertyDescriptor::Data { .. }) => {}
                    _ => return Ok(false),
                }
            }
            Some(_) => {}
        }
        if let Some(o) = o {
            self.object_mut(o)?.insert(key, desc);
        }
        Ok(true)
    }

    // §10.1.7.1 OrdinaryHasProperty
    pub fn has_property(&self, o: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        let mut current = Some(o);
        while let Some(id) = current {
            let data = self.object(id)?;
            if data.property(key).is_some() {
                return Ok(true);
            }
            current = data.prototype;
        }
        Ok(false)
    }

    // §10.1.8.1 OrdinaryGet, §10.4.4.3 for mapped arguments
    pub fn get(&self, o: ObjectId, key: &PropertyKey, _receiver: &JsValue) -> JsResult<JsValue> {
        let mut current = o;
        loop {
            if let Some(value) = self.mapped_argument(current, key)? {
                return Ok(value);
            }
            let data = self.object(current)?;
            match data.property(key) {
                Some(PropertyDescriptor::Data { value, .. }) => return Ok(value.clone()),
                Some(PropertyDescriptor::Accessor { get, .. }) => {
                    if get.is_undefined() {
                        return Ok(JsValue::Undefined);
                    }
                    return Err(EngineError::NotImplemented("accessor property getter").into());
                }
                None => match data.prototype {
                    Some(parent) => current = parent,
                    None => return Ok(JsValue::Undefined),
                },
            }
        }
    }

    // §10.1.9.1 OrdinarySet, §10.1.9.2 OrdinarySetWithOwnDescriptor,
    // §10.4.4.4 for mapped arguments
    pub fn set(
        &mut self,
        o: ObjectId,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> JsResult<bool> {
        if *receiver == JsValue::Object(o) {
            if let Some((env, name)) = self.mapped_binding(o, key)? {
                self.set_mutable_binding(env, &name, value.clone(), false)?;
            }
        }
        let mut current = o;
        let own = loop {
            let data = self.object(current)?;
            if let Some(desc) = data.property(key) {
                break desc.clone();
            }
            match data.prototype {
                Some(parent) => current = parent,
                None => break PropertyDescriptor::data_default(JsValue::Undefined),
            }
        };

        match own {
            PropertyDescriptor::Data { writable, .. } => {
                if !writable {
                    return Ok(false);
                }
                let JsValue::Object(receiver_obj) = receiver else {
                    return Ok(false);
                };
                let receiver_obj = *receiver_obj;
                match self.get_own_property(receiver_obj, key)? {
                    Some(PropertyDescriptor::Accessor { .. }) => Ok(false),
                    Some(PropertyDescriptor::Data {
                        writable: false, ..
                    }) => Ok(false),
                    Some(PropertyDescriptor::Data {
                        enumerable,
                        configurable,
                        ..
                    }) => self.define_own_property(
                        receiver_obj,
                        key.clone(),
                        PropertyDescriptor::data(value, true, enumerable, configurable),
                    ),
                    None => self.create_data_property(receiver_obj, key.clone(), value),
                }
            }
            PropertyDescriptor::Accessor { set, .. } => {
                if set.is_undefined() {
                    return Ok(false);
                }
                Err(EngineError::NotImplemented("accessor property setter").into())
            }
        }
    }

    // §10.1.10.1 OrdinaryDelete, §10.4.4.5 for mapped arguments
    pub fn delete(&mut self, o: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        match self.get_own_property(o, key)? {
            None => Ok(true),
            Some(desc) if desc.configurable() => {
                self.object_mut(o)?.remove(key);
                self.unmap_argument(o, key)?;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    // §10.1.11 [[OwnPropertyKeys]]
    pub fn own_property_keys(&self, o: ObjectId) -> JsResult<Vec<PropertyKey>> {
        Ok(self.object(o)?.ordered_keys())
    }

    // §7.3.5 CreateDataProperty
    pub fn create_data_property(
        &mut self,
        o: ObjectId,
        key: PropertyKey,
        value: JsValue,
    ) -> JsResult<bool> {
        self.define_own_property(o, key, PropertyDescriptor::data_default(value))
    }

    // §7.3.7 CreateDataPropertyOrThrow
    pub fn create_data_property_or_throw(
        &mut self,
        o: ObjectId,
        key: PropertyKey,
        value: JsValue,
    ) -> JsResult<()> {
        let message = format!("Cannot define property '{key}'");
        if !self.create_data_property(o, key, value)? {
            return Err(self.throw_error(ErrorKind::TypeError, &message));
        }
        Ok(())
    }

    // §7.3.8 DefinePropertyOrThrow
    pub fn define_property_or_throw(
        &mut self,
        o: ObjectId,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<()> {
        let message = format!("Cannot redefine property: {key}");
        if !self.define_own_property(o, key, desc)? {
            return Err(self.throw_error(ErrorKind::TypeError, &message));
        }
        Ok(())
    }

    // §7.3.9 DeletePropertyOrThrow
    pub fn delete_property_or_throw(&mut self, o: ObjectId, key: &PropertyKey) -> JsResult<()> {
        if !self.delete(o, key)? {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                &format!("Cannot delete property '{key}'"),
            ));
        }
        Ok(())
    }

    // §7.3.12 HasOwnProperty
    pub fn has_own_property(&self, o: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        Ok(self.get_own_property(o, key)?.is_some())
    }
}
