//! §9.1 Environment Records.
//!
//! Records live in the runtime's environment arena and link to their outer
//! record by `EnvId`. Declarative records are plain data and can be driven
//! without a runtime; object and global records go through the object model,
//! so their operations are methods on `Runtime`.

use super::{Abrupt, EnvId, ErrorKind, JsResult, ObjectId, PropertyDescriptor, PropertyKey, Runtime};
use crate::error::{EngineError, EngineResult};
use crate::types::JsValue;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Clone, Debug, PartialEq)]
pub enum BindingState {
    Uninitialized,
    Initialized(JsValue),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub mutable: bool,
    pub deletable: bool,
    /// Immutable binding created with the strict flag: writes always throw.
    pub strict: bool,
    pub state: BindingState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThisBindingStatus {
    Lexical,
    Initialized,
    Uninitialized,
}

/// Extra state carried by a function environment (§9.1.1.3).
#[derive(Clone, Debug)]
pub struct FunctionEnvironmentFields {
    pub this_value: JsValue,
    pub this_binding_status: ThisBindingStatus,
    pub function_object: ObjectId,
    pub new_target: JsValue,
}

/// A language error a binding operation wants thrown. The runtime turns it
/// into an error object of the current realm.
#[derive(Debug)]
pub(crate) enum Fault {
    Throw(ErrorKind, String),
    Internal(EngineError),
}

impl From<EngineError> for Fault {
    fn from(e: EngineError) -> Self {
        Fault::Internal(e)
    }
}

// §9.1.1.1 Declarative Environment Records
#[derive(Clone, Debug, Default)]
pub struct DeclarativeEnvironment {
    pub(crate) bindings: FxHashMap<String, Binding>,
    pub outer: Option<EnvId>,
    pub function: Option<FunctionEnvironmentFields>,
}

impl DeclarativeEnvironment {
    pub fn new(outer: Option<EnvId>) -> Self {
        Self {
            bindings: FxHashMap::default(),
            outer,
            function: None,
        }
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn create_mutable_binding(&mut self, name: &str, deletable: bool) -> EngineResult<()> {
        self.create_binding(name, true, deletable, false)
    }

    pub fn create_immutable_binding(&mut self, name: &str, strict: bool) -> EngineResult<()> {
        self.create_binding(name, false, false, strict)
    }

    fn create_binding(
        &mut self,
        name: &str,
        mutable: bool,
        deletable: bool,
        strict: bool,
    ) -> EngineResult<()> {
        if self.bindings.contains_key(name) {
            return Err(EngineError::DuplicateBinding(name.to_string()));
        }
        self.bindings.insert(
            name.to_string(),
            Binding {
                mutable,
                deletable,
                strict,
                state: BindingState::Uninitialized,
            },
        );
        Ok(())
    }

    pub fn initialize_binding(&mut self, name: &str, value: JsValue) -> EngineResult<()> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| EngineError::MissingBinding(name.to_string()))?;
        if binding.state != BindingState::Uninitialized {
            return Err(EngineError::Assertion(format!(
                "binding '{name}' initialized twice"
            )));
        }
        binding.state = BindingState::Initialized(value);
        Ok(())
    }

    pub(crate) fn set_mutable_binding(
        &mut self,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> Result<(), Fault> {
        let Some(binding) = self.bindings.get_mut(name) else {
            if strict {
                return Err(Fault::Throw(
                    ErrorKind::ReferenceError,
                    format!("{name} is not defined"),
                ));
            }
            self.create_mutable_binding(name, true)?;
            self.initialize_binding(name, value)?;
            return Ok(());
        };
        let strict = strict || binding.strict;
        if binding.state == BindingState::Uninitialized {
            return Err(Fault::Throw(
                ErrorKind::ReferenceError,
                format!("Cannot access '{name}' before initialization"),
            ));
        }
        if binding.mutable {
            binding.state = BindingState::Initialized(value);
        } else if strict {
            return Err(Fault::Throw(
                ErrorKind::TypeError,
                "Assignment to constant variable.".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn get_binding_value(&self, name: &str) -> Result<JsValue, Fault> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| EngineError::MissingBinding(name.to_string()))?;
        match &binding.state {
            BindingState::Initialized(value) => Ok(value.clone()),
            BindingState::Uninitialized => Err(Fault::Throw(
                ErrorKind::ReferenceError,
                format!("Cannot access '{name}' before initialization"),
            )),
        }
    }

    pub fn delete_binding(&mut self, name: &str) -> EngineResult<bool> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| EngineError::MissingBinding(name.to_string()))?;
        if !binding.deletable {
            return Ok(false);
        }
        self.bindings.remove(name);
        Ok(true)
    }

    pub fn has_this_binding(&self) -> bool {
        self.function
            .as_ref()
            .is_some_and(|f| f.this_binding_status != ThisBindingStatus::Lexical)
    }
}

// §9.1.1.2 Object Environment Records
#[derive(Clone, Copy, Debug)]
pub struct ObjectEnvironment {
    pub binding_object: ObjectId,
    pub is_with: bool,
    pub outer: Option<EnvId>,
}

// §9.1.1.4 Global Environment Records
#[derive(Clone, Debug)]
pub struct GlobalEnvironment {
    pub object_record: ObjectEnvironment,
    pub declarative_record: DeclarativeEnvironment,
    pub global_this: ObjectId,
    pub var_names: FxHashSet<String>,
}

#[derive(Clone, Debug)]
pub enum EnvironmentRecord {
    Declarative(DeclarativeEnvironment),
    Object(ObjectEnvironment),
    Global(Box<GlobalEnvironment>),
}

impl EnvironmentRecord {
    pub fn outer(&self) -> Option<EnvId> {
        match self {
            EnvironmentRecord::Declarative(d) => d.outer,
            EnvironmentRecord::Object(o) => o.outer,
            EnvironmentRecord::Global(_) => None,
        }
    }
}

impl Runtime {
    pub(crate) fn raise(&mut self, fault: Fault) -> Abrupt {
        match fault {
            Fault::Throw(kind, message) => self.throw_error(kind, &message),
            Fault::Internal(e) => Abrupt::Internal(e),
        }
    }

    // §9.1.2.2 NewDeclarativeEnvironment
    pub fn new_declarative_environment(&mut self, outer: Option<EnvId>) -> EnvId {
        self.alloc_env(EnvironmentRecord::Declarative(DeclarativeEnvironment::new(
            outer,
        )))
    }

    // §9.1.2.3 NewObjectEnvironment
    pub fn new_object_environment(
        &mut self,
        binding_object: ObjectId,
        is_with: bool,
        outer: Option<EnvId>,
    ) -> EnvId {
        self.alloc_env(EnvironmentRecord::Object(ObjectEnvironment {
            binding_object,
            is_with,
            outer,
        }))
    }

    // §9.1.2.5 NewGlobalEnvironment
    pub fn new_global_environment(&mut self, global: ObjectId, this_value: ObjectId) -> EnvId {
        self.alloc_env(EnvironmentRecord::Global(Box::new(GlobalEnvironment {
            object_record: ObjectEnvironment {
                binding_object: global,
                is_with: false,
                outer: None,
            },
            declarative_record: DeclarativeEnvironment::new(None),
            global_this: this_value,
            var_names: FxHashSet::default(),
        })))
    }

    pub(crate) fn declarative_mut(&mut self, env: EnvId) -> EngineResult<&mut DeclarativeEnvironment> {
        match self.environment_mut(env)? {
            EnvironmentRecord::Declarative(d) => Ok(d),
            EnvironmentRecord::Global(g) => Ok(&mut g.declarative_record),
            EnvironmentRecord::Object(_) => Err(EngineError::Assertion(
                "expected a declarative environment record".to_string(),
            )),
        }
    }

    fn global_record(&self, env: EnvId) -> EngineResult<&GlobalEnvironment> {
        match self.environment(env)? {
            EnvironmentRecord::Global(g) => Ok(g),
            _ => Err(EngineError::Assertion(
                "expected a global environment record".to_string(),
            )),
        }
    }

    fn global_record_mut(&mut self, env: EnvId) -> EngineResult<&mut GlobalEnvironment> {
        match self.environment_mut(env)? {
            EnvironmentRecord::Global(g) => Ok(g),
            _ => Err(EngineError::Assertion(
                "expected a global environment record".to_string(),
            )),
        }
    }

    pub fn has_binding(&mut self, env: EnvId, name: &str) -> JsResult<bool> {
        match self.environment(env)? {
            EnvironmentRecord::Declarative(d) => Ok(d.has_binding(name)),
            EnvironmentRecord::Object(o) => {
                let record = *o;
                self.object_env_has_binding(record, name)
            }
            EnvironmentRecord::Global(g) => {
                if g.declarative_record.has_binding(name) {
                    return Ok(true);
                }
                let record = g.object_record;
                self.object_env_has_binding(record, name)
            }
        }
    }

    pub fn create_mutable_binding(
        &mut self,
        env: EnvId,
        name: &str,
        deletable: bool,
    ) -> JsResult<()> {
        match self.environment_mut(env)? {
            EnvironmentRecord::Declarative(d) => Ok(d.create_mutable_binding(name, deletable)?),
            EnvironmentRecord::Object(o) => {
                let record = *o;
                self.object_env_create_mutable_binding(record, name, deletable)
            }
            EnvironmentRecord::Global(g) => {
                if g.declarative_record.has_binding(name) {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        &format!("Identifier '{name}' has already been declared"),
                    ));
                }
                Ok(g.declarative_record.create_mutable_binding(name, deletable)?)
            }
        }
    }

    pub fn create_immutable_binding(
        &mut self,
        env: EnvId,
        name: &str,
        strict: bool,
    ) -> JsResult<()> {
        match self.environment_mut(env)? {
            EnvironmentRecord::Declarative(d) => Ok(d.create_immutable_binding(name, strict)?),
            EnvironmentRecord::Object(_) => Err(EngineError::Assertion(
                "object environment records have no immutable bindings".to_string(),
            )
            .into()),
            EnvironmentRecord::Global(g) => {
                if g.declarative_record.has_binding(name) {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        &format!("Identifier '{name}' has already been declared"),
                    ));
                }
                Ok(g.declarative_record.create_immutable_binding(name, strict)?)
            }
        }
    }

    pub fn initialize_binding(&mut self, env: EnvId, name: &str, value: JsValue) -> JsResult<()> {
        match self.environment_mut(env)? {
            EnvironmentRecord::Declarative(d) => Ok(d.initialize_binding(name, value)?),
            EnvironmentRecord::Object(o) => {
                let record = *o;
                self.object_env_set_mutable_binding(record, name, value, false)
            }
            EnvironmentRecord::Global(g) => {
                if g.declarative_record.has_binding(name) {
                    return Ok(g.declarative_record.initialize_binding(name, value)?);
                }
                let record = g.object_record;
                self.object_env_set_mutable_binding(record, name, value, false)
            }
        }
    }

    pub fn set_mutable_binding(
        &mut self,
        env: EnvId,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> JsResult<()> {
        let result = match self.environment_mut(env)? {
            EnvironmentRecord::Declarative(d) => d.set_mutable_binding(name, value, strict),
            EnvironmentRecord::Object(o) => {
                let record = *o;
                return self.object_env_set_mutable_binding(record, name, value, strict);
            }
            EnvironmentRecord::Global(g) => {
                if g.declarative_record.has_binding(name) {
                    g.declarative_record.set_mutable_binding(name, value, strict)
                } else {
                    let record = g.object_record;
                    return self.object_env_set_mutable_binding(record, name, value, strict);
                }
            }
        };
        result.map_err(|fault| self.raise(fault))
    }

    pub fn get_binding_value(&mut self, env: EnvId, name: &str, strict: bool) -> JsResult<JsValue> {
        let result = match self.environment(env)? {
            EnvironmentRecord::Declarative(d) => d.get_binding_value(name),
            EnvironmentRecord::Object(o) => {
                let record = *o;
                return self.object_env_get_binding_value(record, name, strict);
            }
            EnvironmentRecord::Global(g) => {
                if g.declarative_record.has_binding(name) {
                    g.declarative_record.get_binding_value(name)
                } else {
                    let record = g.object_record;
                    return self.object_env_get_binding_value(record, name, strict);
                }
            }
        };
        result.map_err(|fault| self.raise(fault))
    }

    pub fn delete_binding(&mut self, env: EnvId, name: &str) -> JsResult<bool> {
        match self.environment_mut(env)? {
            EnvironmentRecord::Declarative(d) => Ok(d.delete_binding(name)?),
            EnvironmentRecord::Object(o) => {
                let record = *o;
                self.delete(record.binding_object, &PropertyKey::from(name))
            }
            EnvironmentRecord::Global(g) => {
                if g.declarative_record.has_binding(name) {
                    return Ok(g.declarative_record.delete_binding(name)?);
                }
                let record = g.object_record;
                let key = PropertyKey::from(name);
                if !self.has_own_property(record.binding_object, &key)? {
                    return Ok(true);
                }
                let status = self.delete(record.binding_object, &key)?;
                if status {
                    self.global_record_mut(env)?.var_names.remove(name);
                }
                Ok(status)
            }
        }
    }

    pub fn has_this_binding(&self, env: EnvId) -> EngineResult<bool> {
        Ok(match self.environment(env)? {
            EnvironmentRecord::Declarative(d) => d.has_this_binding(),
            EnvironmentRecord::Object(_) => false,
            EnvironmentRecord::Global(_) => true,
        })
    }

    // §9.1.1.2.10 WithBaseObject
    pub fn with_base_object(&self, env: EnvId) -> EngineResult<Option<ObjectId>> {
        Ok(match self.environment(env)? {
            EnvironmentRecord::Object(o) if o.is_with => Some(o.binding_object),
            _ => None,
        })
    }

    // §9.1.1.3.4 GetThisBinding, §9.1.1.4.11 GetThisBinding
    pub fn get_this_binding(&mut self, env: EnvId) -> JsResult<JsValue> {
        match self.environment(env)? {
            EnvironmentRecord::Global(g) => Ok(JsValue::Object(g.global_this)),
            EnvironmentRecord::Declarative(DeclarativeEnvironment {
                function: Some(f), ..
            }) => match f.this_binding_status {
                ThisBindingStatus::Initialized => Ok(f.this_value.clone()),
                ThisBindingStatus::Uninitialized => Err(self.throw_error(
                    ErrorKind::ReferenceError,
                    "Must call super constructor before accessing 'this'",
                )),
                ThisBindingStatus::Lexical => Err(EngineError::Assertion(
                    "GetThisBinding on a lexical-this environment".to_string(),
                )
                .into()),
            },
            _ => Err(EngineError::Assertion(
                "GetThisBinding on an environment without a this binding".to_string(),
            )
            .into()),
        }
    }

    // §9.1.1.3.1 BindThisValue
    pub fn bind_this_value(&mut self, env: EnvId, value: JsValue) -> JsResult<()> {
        let Some(fields) = self.declarative_mut(env)?.function.as_mut() else {
            return Err(EngineError::Assertion(
                "BindThisValue on a non-function environment".to_string(),
            )
            .into());
        };
        match fields.this_binding_status {
            ThisBindingStatus::Lexical => Err(EngineError::Assertion(
                "BindThisValue on a lexical-this environment".to_string(),
            )
            .into()),
            ThisBindingStatus::Initialized => Err(self.throw_error(
                ErrorKind::ReferenceError,
                "Super constructor may only be called once",
            )),
            ThisBindingStatus::Uninitialized => {
                fields.this_value = value;
                fields.this_binding_status = ThisBindingStatus::Initialized;
                Ok(())
            }
        }
    }

    // §9.1.1.2.1 HasBinding. Unscopables are not consulted for `with` records
    // since the realm has no well-known symbols.
    fn object_env_has_binding(&mut self, record: ObjectEnvironment, name: &str) -> JsResult<bool> {
        self.has_property(record.binding_object, &PropertyKey::from(name))
    }

    // §9.1.1.2.2 CreateMutableBinding
    fn object_env_create_mutable_binding(
        &mut self,
        record: ObjectEnvironment,
        name: &str,
        deletable: bool,
    ) -> JsResult<()> {
        self.define_property_or_throw(
            record.binding_object,
            PropertyKey::from(name),
            PropertyDescriptor::data(JsValue::Undefined, true, true, deletable),
        )
    }

    // §9.1.1.2.5 SetMutableBinding
    fn object_env_set_mutable_binding(
        &mut self,
        record: ObjectEnvironment,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> JsResult<()> {
        let key = PropertyKey::from(name);
        let still_exists = self.has_property(record.binding_object, &key)?;
        if !still_exists && strict {
            return Err(self.throw_error(ErrorKind::ReferenceError, &format!("{name} is not defined")));
        }
        let receiver = JsValue::Object(record.binding_object);
        let succeeded = self.set(record.binding_object, &key, value, &receiver)?;
        if !succeeded && strict {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                &format!("Cannot assign to read only property '{name}'"),
            ));
        }
        Ok(())
    }

    // §9.1.1.2.6 GetBindingValue
    fn object_env_get_binding_value(
        &mut self,
        record: ObjectEnvironment,
        name: &str,
        strict: bool,
    ) -> JsResult<JsValue> {
        let key = PropertyKey::from(name);
        if !self.has_property(record.binding_object, &key)? {
            if strict {
                return Err(
                    self.throw_error(ErrorKind::ReferenceError, &format!("{name} is not defined"))
                );
            }
            return Ok(JsValue::Undefined);
        }
        let receiver = JsValue::Object(record.binding_object);
        self.get(record.binding_object, &key, &receiver)
    }

    // §9.1.1.4.12 HasVarDeclaration
    pub fn has_var_declaration(&self, env: EnvId, name: &str) -> EngineResult<bool> {
        Ok(self.global_record(env)?.var_names.contains(name))
    }

    // §9.1.1.4.13 HasLexicalDeclaration
    pub fn has_lexical_declaration(&self, env: EnvId, name: &str) -> EngineResult<bool> {
        Ok(self.global_record(env)?.declarative_record.has_binding(name))
    }

    // §9.1.1.4.14 HasRestrictedGlobalProperty
    pub fn has_restricted_global_property(&mut self, env: EnvId, name: &str) -> JsResult<bool> {
        let global = self.global_record(env)?.object_record.binding_object;
        match self.get_own_property(global, &PropertyKey::from(name))? {
            None => Ok(false),
            Some(desc) => Ok(!desc.configurable()),
        }
    }

    // §9.1.1.4.15 CanDeclareGlobalVar
    pub fn can_declare_global_var(&mut self, env: EnvId, name: &str) -> JsResult<bool> {
        let global = self.global_record(env)?.object_record.binding_object;
        if self.has_own_property(global, &PropertyKey::from(name))? {
            return Ok(true);
        }
        self.is_extensible(global)
    }

    // §9.1.1.4.16 CanDeclareGlobalFunction
    pub fn can_declare_global_function(&mut self, env: EnvId, name: &str) -> JsResult<bool> {
        let global = self.global_record(env)?.object_record.binding_object;
        match self.get_own_property(global, &PropertyKey::from(name))? {
            None => self.is_extensible(global),
            Some(desc) if desc.configurable() => Ok(true),
            Some(PropertyDescriptor::Data {
                writable,
                enumerable,
                ..
            }) => Ok(writable && enumerable),
            Some(PropertyDescriptor::Accessor { .. }) => Ok(false),
        }
    }

    // §9.1.1.4.17 CreateGlobalVarBinding
    pub fn create_global_var_binding(
        &mut self,
        env: EnvId,
        name: &str,
        deletable: bool,
    ) -> JsResult<()> {
        let record = self.global_record(env)?.object_record;
        let key = PropertyKey::from(name);
        let has_property = self.has_own_property(record.binding_object, &key)?;
        let extensible = self.is_extensible(record.binding_object)?;
        if !has_property && extensible {
            self.object_env_create_mutable_binding(record, name, deletable)?;
            self.object_env_set_mutable_binding(record, name, JsValue::Undefined, false)?;
        }
        self.global_record_mut(env)?
            .var_names
            .insert(name.to_string());
        Ok(())
    }

    // §9.1.1.4.18 CreateGlobalFunctionBinding
    pub fn create_global_function_binding(
        &mut self,
        env: EnvId,
        name: &str,
        value: JsValue,
        deletable: bool,
    ) -> JsResult<()> {
        let global = self.global_record(env)?.object_record.binding_object;
        let key = PropertyKey::from(name);
        let desc = match self.get_own_property(global, &key)? {
            None => PropertyDescriptor::data(value.clone(), true, true, deletable),
            Some(existing) if existing.configurable() => {
                PropertyDescriptor::data(value.clone(), true, true, deletable)
            }
            Some(existing) => existing.with_value(value.clone()),
        };
        self.define_property_or_throw(global, key.clone(), desc)?;
        let receiver = JsValue::Object(global);
        if !self.set(global, &key, value, &receiver)? {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                &format!("Cannot assign to read only property '{name}'"),
            ));
        }
        self.global_record_mut(env)?
            .var_names
            .insert(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::RealmId;

    fn setup() -> (Runtime, RealmId) {
        let mut rt = Runtime::new();
        let realm = rt.new_realm().unwrap();
        rt.push_script_context(realm, false).unwrap();
        (rt, realm)
    }

    fn thrown_kind(rt: &Runtime, result: JsResult<impl std::fmt::Debug>) -> Option<ErrorKind> {
        match result {
            Err(Abrupt::Throw(v)) => rt.error_kind_of(&v),
            other => panic!("expected a throw, got {other:?}"),
        }
    }

    #[test]
    fn uninitialized_binding_is_in_tdz() {
        let (mut rt, _) = setup();
        let env = rt.new_declarative_environment(None);
        rt.create_mutable_binding(env, "x", false).unwrap();
        let read = rt.get_binding_value(env, "x", true);
        assert_eq!(thrown_kind(&rt, read), Some(ErrorKind::ReferenceError));

        rt.initialize_binding(env, "x", JsValue::number(7.0)).unwrap();
        assert_eq!(rt.get_binding_value(env, "x", true).unwrap(), JsValue::number(7.0));
    }

    #[test]
    fn immutable_binding_tdz_then_value() {
        let (mut rt, _) = setup();
        let env = rt.new_declarative_environment(None);
        rt.create_immutable_binding(env, "c", true).unwrap();
        let read = rt_get(&mut rt, env, "c");
        assert_eq!(
            thrown_kind(&rt, read),
            Some(ErrorKind::ReferenceError)
        );
        rt.initialize_binding(env, "c", JsValue::Boolean(true)).unwrap();
        assert_eq!(rt_get(&mut rt, env, "c").unwrap(), JsValue::Boolean(true));
    }

    fn rt_get(rt: &mut Runtime, env: EnvId, name: &str) -> JsResult<JsValue> {
        rt.get_binding_value(env, name, false)
    }

    #[test]
    fn double_declaration_is_an_engine_error() {
        let (mut rt, _) = setup();
        let env = rt.new_declarative_environment(None);
        rt.create_mutable_binding(env, "x", false).unwrap();
        assert_eq!(
            rt.create_immutable_binding(env, "x", true),
            Err(Abrupt::Internal(EngineError::DuplicateBinding("x".into())))
        );
    }

    #[test]
    fn strict_immutable_binding_rejects_writes_in_sloppy_code() {
        let (mut rt, _) = setup();
        let env = rt.new_declarative_environment(None);
        rt.create_immutable_binding(env, "c", true).unwrap();
        rt.initialize_binding(env, "c", JsValue::number(1.0)).unwrap();
        let write = rt.set_mutable_binding(env, "c", JsValue::number(2.0), false);
        assert_eq!(thrown_kind(&rt, write), Some(ErrorKind::TypeError));
        assert_eq!(rt_get(&mut rt, env, "c").unwrap(), JsValue::number(1.0));
    }

    #[test]
    fn non_strict_immutable_binding_ignores_sloppy_writes() {
        let (mut rt, _) = setup();
        let env = rt.new_declarative_environment(None);
        rt.create_immutable_binding(env, "c", false).unwrap();
        rt.initialize_binding(env, "c", JsValue::number(1.0)).unwrap();
        rt.set_mutable_binding(env, "c", JsValue::number(2.0), false)
            .unwrap();
        assert_eq!(rt_get(&mut rt, env, "c").unwrap(), JsValue::number(1.0));

        let strict_write = rt.set_mutable_binding(env, "c", JsValue::number(3.0), true);
        assert_eq!(thrown_kind(&rt, strict_write), Some(ErrorKind::TypeError));
    }

    #[test]
    fn set_on_missing_binding_depends_on_strictness() {
        let (mut rt, _) = setup();
        let env = rt.new_declarative_environment(None);
        let strict_write = rt.set_mutable_binding(env, "y", JsValue::Null, true);
        assert_eq!(thrown_kind(&rt, strict_write), Some(ErrorKind::ReferenceError));

        rt.set_mutable_binding(env, "y", JsValue::Null, false).unwrap();
        assert_eq!(rt_get(&mut rt, env, "y").unwrap(), JsValue::Null);
        assert!(rt.delete_binding(env, "y").unwrap());
        assert!(!rt.has_binding(env, "y").unwrap());
    }

    #[test]
    fn non_deletable_binding_survives_delete() {
        let (mut rt, _) = setup();
        let env = rt.new_declarative_environment(None);
        rt.create_mutable_binding(env, "x", false).unwrap();
        assert!(!rt.delete_binding(env, "x").unwrap());
        assert!(rt.has_binding(env, "x").unwrap());
    }

    #[test]
    fn object_record_bindings_are_properties() {
        let (mut rt, realm) = setup();
        let proto = rt.realm(realm).unwrap().intrinsics.object_prototype;
        let obj = rt.ordinary_object_create(Some(proto));
        let env = rt.new_object_environment(obj, true, None);

        assert!(!rt.has_binding(env, "p").unwrap());
        assert_eq!(rt_get(&mut rt, env, "p").unwrap(), JsValue::Undefined);
        let strict_read = rt.get_binding_value(env, "p", true);
        assert_eq!(thrown_kind(&rt, strict_read), Some(ErrorKind::ReferenceError));

        rt.create_mutable_binding(env, "p", true).unwrap();
        rt.initialize_binding(env, "p", JsValue::number(3.0)).unwrap();
        assert_eq!(
            rt.get_own_property(obj, &"p".into()).unwrap(),
            Some(PropertyDescriptor::data(JsValue::number(3.0), true, true, true))
        );
        assert_eq!(rt.with_base_object(env).unwrap(), Some(obj));
        assert!(
            rt.create_immutable_binding(env, "q", true)
                .is_err_and(|e| matches!(e, Abrupt::Internal(_)))
        );
    }

    #[test]
    fn global_record_prefers_declarative_bindings() {
        let (mut rt, realm) = setup();
        let global_env = rt.realm(realm).unwrap().global_env;
        let global = rt.realm(realm).unwrap().global_object;

        rt.create_global_var_binding(global_env, "v", false).unwrap();
        assert!(rt.has_var_declaration(global_env, "v").unwrap());
        assert!(rt.has_own_property(global, &"v".into()).unwrap());

        rt.create_mutable_binding(global_env, "l", false).unwrap();
        assert!(rt.has_lexical_declaration(global_env, "l").unwrap());
        assert!(!rt.has_own_property(global, &"l".into()).unwrap());

        let redeclare = rt.create_mutable_binding(global_env, "l", false);
        assert_eq!(thrown_kind(&rt, redeclare), Some(ErrorKind::TypeError));

        rt.initialize_binding(global_env, "l", JsValue::number(1.0)).unwrap();
        rt.set_mutable_binding(global_env, "v", JsValue::number(2.0), true)
            .unwrap();
        assert_eq!(rt_get(&mut rt, global_env, "l").unwrap(), JsValue::number(1.0));
        assert_eq!(rt_get(&mut rt, global_env, "v").unwrap(), JsValue::number(2.0));
        assert_eq!(
            rt.get_this_binding(global_env).unwrap(),
            JsValue::Object(global)
        );
    }

    #[test]
    fn global_declaration_checks() {
        let (mut rt, realm) = setup();
        let global_env = rt.realm(realm).unwrap().global_env;
        assert!(rt.has_restricted_global_property(global_env, "undefined").unwrap());
        assert!(!rt.has_restricted_global_property(global_env, "nothing").unwrap());
        assert!(rt.can_declare_global_var(global_env, "fresh").unwrap());
        assert!(!rt.can_declare_global_function(global_env, "NaN").unwrap());
        assert!(rt.can_declare_global_function(global_env, "fresh").unwrap());

        rt.create_global_function_binding(global_env, "f", JsValue::Null, false)
            .unwrap();
        assert!(rt.has_var_declaration(global_env, "f").unwrap());
        assert!(!rt.delete_binding(global_env, "f").unwrap());
        assert!(rt.delete_binding(global_env, "missing").unwrap());
    }

    #[test]
    fn function_binding_keeps_non_configurable_attributes() {
        let (mut rt, realm) = setup();
        let global_env = rt.realm(realm).unwrap().global_env;
        let global = rt.realm(realm).unwrap().global_object;
        rt.define_property_or_throw(
            global,
            "pinned".into(),
            PropertyDescriptor::data(JsValue::Null, true, false, false),
        )
        .unwrap();

        rt.create_global_function_binding(global_env, "pinned", JsValue::number(1.0), true)
            .unwrap();
        assert_eq!(
            rt.get_own_property(global, &"pinned".into()).unwrap(),
            Some(PropertyDescriptor::data(JsValue::number(1.0), true, false, false))
        );

        rt.create_global_function_binding(global_env, "loose", JsValue::Null, true)
            .unwrap();
        assert_eq!(
            rt.get_own_property(global, &"loose".into()).unwrap(),
            Some(PropertyDescriptor::data(JsValue::Null, true, true, true))
        );
    }
}
