//! §6.2.5 Reference Record operations and §9.4 identifier resolution.

use super::helpers::{to_object, to_property_key};
use super::{EnvId, ErrorKind, JsResult, Reference, Runtime};
use crate::error::{EngineError, EngineResult};
use crate::types::JsValue;

impl Runtime {
    // §9.4.2 ResolveBinding
    pub fn resolve_binding(&mut self, name: &str, env: Option<EnvId>) -> JsResult<JsValue> {
        let env = match env {
            Some(env) => env,
            None => self.lexical_environment()?,
        };
        let strict = self.is_strict()?;
        let reference = self.get_identifier_reference(Some(env), name, strict)?;
        Ok(JsValue::Reference(Box::new(reference)))
    }

    // §9.1.2.1 GetIdentifierReference
    pub fn get_identifier_reference(
        &mut self,
        env: Option<EnvId>,
        name: &str,
        strict: bool,
    ) -> JsResult<Reference> {
        let mut current = env;
        while let Some(env) = current {
            if self.has_binding(env, name)? {
                tracing::trace!(name, "resolved binding");
                return Ok(Reference::Environment {
                    env,
                    name: name.to_string(),
                    strict,
                });
            }
            current = self.environment(env)?.outer();
        }
        Ok(Reference::Unresolvable {
            name: name.to_string(),
            strict,
        })
    }

    // §6.2.5.5 GetValue
    pub fn get_value(&mut self, value: JsValue) -> JsResult<JsValue> {
        let JsValue::Reference(reference) = value else {
            return Ok(value);
        };
        match *reference {
            Reference::Unresolvable { name, .. } => Err(self.throw_error(
                ErrorKind::ReferenceError,
                &format!("{name} is not defined"),
            )),
            Reference::Property {
                base,
                name,
                this_value,
                ..
            } => {
                let base_obj = to_object(self, &base)?;
                let key = to_property_key(self, &name)?;
                let receiver = this_value.unwrap_or(base);
                self.get(base_obj, &key, &receiver)
            }
            Reference::Environment { env, name, strict } => {
                self.get_binding_value(env, &name, strict)
            }
        }
    }

    // §6.2.5.6 PutValue
    pub fn put_value(&mut self, target: &JsValue, value: JsValue) -> JsResult<()> {
        let JsValue::Reference(reference) = target else {
            return Err(self.throw_error(
                ErrorKind::ReferenceError,
                "Invalid assignment target",
            ));
        };
        match reference.as_ref() {
            Reference::Unresolvable { name, strict } => {
                if *strict {
                    return Err(self.throw_error(
                        ErrorKind::ReferenceError,
                        &format!("{name} is not defined"),
                    ));
                }
                let realm = self.current_realm()?;
                let global = self.realm(realm)?.global_object;
                let receiver = JsValue::Object(global);
                self.set(global, &name.as_str().into(), value, &receiver)?;
                Ok(())
            }
            Reference::Property {
                base,
                name,
                this_value,
                strict,
            } => {
                let base_obj = to_object(self, base)?;
                let key = to_property_key(self, name)?;
                let receiver = this_value.clone().unwrap_or_else(|| base.clone());
                let succeeded = self.set(base_obj, &key, value, &receiver)?;
                if !succeeded && *strict {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        &format!("Cannot assign to read only property '{key}' of object"),
                    ));
                }
                Ok(())
            }
            Reference::Environment { env, name, strict } => {
                self.set_mutable_binding(*env, name, value, *strict)
            }
        }
    }

    // §6.2.5.8 InitializeReferencedBinding
    pub fn initialize_referenced_binding(&mut self, target: &JsValue, value: JsValue) -> JsResult<()> {
        match target {
            JsValue::Reference(reference) => match reference.as_ref() {
                Reference::Environment { env, name, .. } => {
                    self.initialize_binding(*env, name, value)
                }
                _ => Err(EngineError::Assertion(
                    "InitializeReferencedBinding on a non-environment reference".to_string(),
                )
                .into()),
            },
            _ => Err(EngineError::Assertion(
                "InitializeReferencedBinding on a non-reference".to_string(),
            )
            .into()),
        }
    }

    // §9.4.3 GetThisEnvironment
    pub fn get_this_environment(&self) -> EngineResult<EnvId> {
        let mut env = self.lexical_environment()?;
        loop {
            if self.has_this_binding(env)? {
                return Ok(env);
            }
            env = self.environment(env)?.outer().ok_or_else(|| {
                EngineError::Assertion("environment chain has no this binding".to_string())
            })?;
        }
    }

    // §9.4.4 ResolveThisBinding
    pub fn resolve_this_binding(&mut self) -> JsResult<JsValue> {
        let env = self.get_this_environment()?;
        self.get_this_binding(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Abrupt, RealmId};

    fn setup(strict: bool) -> (Runtime, RealmId) {
        let mut rt = Runtime::new();
        let realm = rt.new_realm().unwrap();
        rt.push_script_context(realm, strict).unwrap();
        (rt, realm)
    }

    #[test]
    fn resolution_walks_outward() {
        let (mut rt, realm) = setup(false);
        let global_env = rt.realm(realm).unwrap().global_env;
        let outer = rt.new_declarative_environment(Some(global_env));
        let inner = rt.new_declarative_environment(Some(outer));
        rt.create_mutable_binding(outer, "x", false).unwrap();
        rt.initialize_binding(outer, "x", JsValue::number(4.0)).unwrap();

        let reference = rt.get_identifier_reference(Some(inner), "x", false).unwrap();
        assert_eq!(
            reference,
            Reference::Environment {
                env: outer,
                name: "x".into(),
                strict: false
            }
        );
        let missing = rt.get_identifier_reference(Some(inner), "nope", true).unwrap();
        assert!(missing.is_unresolvable());

        let value = rt.get_value(JsValue::Reference(Box::new(reference))).unwrap();
        assert_eq!(value, JsValue::number(4.0));
    }

    #[test]
    fn unresolvable_reads_throw() {
        let (mut rt, _) = setup(true);
        let r = rt.resolve_binding("ghost", None).unwrap();
        let Err(Abrupt::Throw(err)) = rt.get_value(r) else {
            panic!("expected a ReferenceError");
        };
        assert_eq!(rt.error_kind_of(&err), Some(ErrorKind::ReferenceError));
    }

    #[test]
    fn sloppy_put_creates_global_property() {
        let (mut rt, realm) = setup(false);
        let r = rt.resolve_binding("a", None).unwrap();
        rt.put_value(&r, JsValue::number(5.0)).unwrap();
        let global = rt.realm(realm).unwrap().global_object;
        assert!(rt.has_own_property(global, &"a".into()).unwrap());
        let again = rt.resolve_binding("a", None).unwrap();
        assert_eq!(rt.get_value(again).unwrap(), JsValue::number(5.0));
    }

    #[test]
    fn strict_put_to_unresolvable_throws() {
        let (mut rt, _) = setup(true);
        let r = rt.resolve_binding("a", None).unwrap();
        assert!(matches!(
            rt.put_value(&r, JsValue::Null),
            Err(Abrupt::Throw(_))
        ));
    }

    #[test]
    fn property_references_read_and_write() {
        let (mut rt, _) = setup(true);
        let obj = rt.ordinary_object_create(None);
        let r = JsValue::Reference(Box::new(Reference::Property {
            base: JsValue::Object(obj),
            name: JsValue::string("p"),
            this_value: None,
            strict: true,
        }));
        rt.put_value(&r, JsValue::Boolean(true)).unwrap();
        assert_eq!(rt.get_value(r.clone()).unwrap(), JsValue::Boolean(true));

        rt.prevent_extensions(obj).unwrap();
        let q = JsValue::Reference(Box::new(Reference::Property {
            base: JsValue::Object(obj),
            name: JsValue::string("q"),
            this_value: None,
            strict: true,
        }));
        let Err(Abrupt::Throw(err)) = rt.put_value(&q, JsValue::Null) else {
            panic!("expected a TypeError");
        };
        assert_eq!(rt.error_kind_of(&err), Some(ErrorKind::TypeError));
    }

    #[test]
    fn global_this_resolution() {
        let (mut rt, realm) = setup(false);
        let global = rt.realm(realm).unwrap().global_object;
        assert_eq!(rt.resolve_this_binding().unwrap(), JsValue::Object(global));
    }
}
