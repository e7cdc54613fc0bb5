//! §10.2 ECMAScript function objects and §10.3 built-in function objects.

use super::analysis::{
    LexicalDeclaration, VarDeclaration, contains_expression, is_simple_parameter_list,
    lexically_scoped_declarations, parameter_names, var_declared_names, var_scoped_declarations,
};
use super::environment::{DeclarativeEnvironment, FunctionEnvironmentFields, ThisBindingStatus};
use super::helpers::{is_callable, to_object, to_string};
use super::{
    Abrupt, Completion, EnvId, EnvironmentRecord, ErrorKind, ExecutionContext, JsResult,
    ObjectData, ObjectId, ObjectKind, ParameterMap, PropertyDescriptor, PropertyKey, RealmId,
    Runtime,
};
use crate::ast::{FunctionBody, FunctionKind, FunctionNode, Pattern};
use crate::error::{EngineError, EngineResult};
use crate::types::JsValue;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// How `this` is bound when the function is called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThisMode {
    Lexical,
    Strict,
    Global,
}

/// Behaviour of a function object implemented by the engine itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinFunction {
    ErrorConstructor(ErrorKind),
}

/// Internal slots of an ECMAScript function object.
#[derive(Clone, Debug)]
pub struct FunctionData {
    pub code: Rc<FunctionNode>,
    pub environment: EnvId,
    pub private_environment: Option<EnvId>,
    pub realm: RealmId,
    pub this_mode: ThisMode,
    pub strict: bool,
    pub is_constructor: bool,
}

// §15.1.5 ExpectedArgumentCount
fn expected_argument_count(params: &[Pattern]) -> usize {
    params
        .iter()
        .take_while(|p| !matches!(p, Pattern::Assign(..) | Pattern::Rest(_)))
        .count()
}

impl Runtime {
    fn function_data(&self, f: ObjectId) -> EngineResult<FunctionData> {
        match &self.object(f)?.kind {
            ObjectKind::Function(data) => Ok(data.as_ref().clone()),
            _ => Err(EngineError::Assertion(
                "expected an ECMAScript function object".to_string(),
            )),
        }
    }

    // §10.3.4 CreateBuiltinFunction
    pub(crate) fn create_builtin_function(
        &mut self,
        realm: RealmId,
        builtin: BuiltinFunction,
        name: &str,
        length: u32,
    ) -> EngineResult<ObjectId> {
        let prototype = self.realm(realm)?.intrinsics.function_prototype;
        let mut data = ObjectData::new(Some(prototype), ObjectKind::Builtin(builtin));
        data.insert(
            "length".into(),
            PropertyDescriptor::data(JsValue::number(f64::from(length)), false, false, true),
        );
        data.insert(
            "name".into(),
            PropertyDescriptor::data(JsValue::string(name), false, false, true),
        );
        Ok(self.alloc_object(data))
    }

    // §10.2.3 OrdinaryFunctionCreate
    fn ordinary_function_create(
        &mut self,
        code: &Rc<FunctionNode>,
        env: EnvId,
        private_env: Option<EnvId>,
    ) -> JsResult<ObjectId> {
        let realm = self.current_realm()?;
        let prototype = self.realm(realm)?.intrinsics.function_prototype;
        let enclosing_strict = self.is_strict()?;
        let strict = super::analysis::is_strict_function(code, enclosing_strict);
        let this_mode = if code.kind == FunctionKind::Arrow {
            ThisMode::Lexical
        } else if strict {
            ThisMode::Strict
        } else {
            ThisMode::Global
        };
        let data = FunctionData {
            code: Rc::clone(code),
            environment: env,
            private_environment: private_env,
            realm,
            this_mode,
            strict,
            is_constructor: false,
        };
        let f = self.alloc_object(ObjectData::new(
            Some(prototype),
            ObjectKind::Function(Box::new(data)),
        ));
        let length = expected_argument_count(&code.params) as f64;
        self.define_property_or_throw(
            f,
            "length".into(),
            PropertyDescriptor::data(JsValue::number(length), false, false, true),
        )?;
        Ok(f)
    }

    // §10.2.5 MakeConstructor
    fn make_constructor(&mut self, f: ObjectId) -> JsResult<()> {
        if let ObjectKind::Function(data) = &mut self.object_mut(f)?.kind {
            data.is_constructor = true;
        }
        let object_prototype = self.intrinsics()?.object_prototype;
        let prototype = self.ordinary_object_create(Some(object_prototype));
        self.define_property_or_throw(
            prototype,
            "constructor".into(),
            PropertyDescriptor::data(JsValue::Object(f), true, false, true),
        )?;
        self.define_property_or_throw(
            f,
            "prototype".into(),
            PropertyDescriptor::data(JsValue::Object(prototype), true, false, false),
        )
    }

    // §10.2.9 SetFunctionName
    pub(crate) fn set_function_name(
        &mut self,
        f: ObjectId,
        name: &PropertyKey,
        prefix: Option<&str>,
    ) -> JsResult<()> {
        let name = match name {
            PropertyKey::String(s) => s.to_rust_string(),
            PropertyKey::Symbol(sym) => match &sym.description {
                Some(desc) => format!("[{desc}]"),
                None => String::new(),
            },
        };
        let name = match prefix {
            Some(prefix) => JsValue::string(&format!("{prefix} {name}")),
            None => JsValue::string(&name),
        };
        self.define_property_or_throw(
            f,
            "name".into(),
            PropertyDescriptor::data(name, false, false, true),
        )
    }

    fn can_construct(code: &FunctionNode) -> bool {
        code.kind == FunctionKind::Normal && !code.is_async && !code.is_generator
    }

    // §15.2.4 InstantiateOrdinaryFunctionObject
    pub(crate) fn instantiate_function_object(
        &mut self,
        code: &Rc<FunctionNode>,
        env: EnvId,
        private_env: Option<EnvId>,
    ) -> JsResult<ObjectId> {
        let f = self.ordinary_function_create(code, env, private_env)?;
        let name = code.name.as_deref().unwrap_or("default");
        self.set_function_name(f, &name.into(), None)?;
        if Self::can_construct(code) {
            self.make_constructor(f)?;
        }
        Ok(f)
    }

    // §15.2.5 InstantiateOrdinaryFunctionExpression
    pub(crate) fn instantiate_ordinary_function_expression(
        &mut self,
        code: &Rc<FunctionNode>,
        name: Option<&PropertyKey>,
    ) -> JsResult<ObjectId> {
        let scope = self.lexical_environment()?;
        let private_env = self.running_context()?.private_env;
        let Some(own_name) = code.name.as_deref().filter(|n| !n.is_empty()) else {
            let closure = self.ordinary_function_create(code, scope, private_env)?;
            let name = name.cloned().unwrap_or_else(|| "".into());
            self.set_function_name(closure, &name, None)?;
            if Self::can_construct(code) {
                self.make_constructor(closure)?;
            }
            return Ok(closure);
        };
        let func_env = self.new_declarative_environment(Some(scope));
        self.create_immutable_binding(func_env, own_name, false)?;
        let closure = self.ordinary_function_create(code, func_env, private_env)?;
        self.set_function_name(closure, &own_name.into(), None)?;
        if Self::can_construct(code) {
            self.make_constructor(closure)?;
        }
        self.initialize_binding(func_env, own_name, JsValue::Object(closure))?;
        Ok(closure)
    }

    // §15.3.4 InstantiateArrowFunctionExpression
    pub(crate) fn instantiate_arrow_function_expression(
        &mut self,
        code: &Rc<FunctionNode>,
        name: Option<&PropertyKey>,
    ) -> JsResult<ObjectId> {
        let scope = self.lexical_environment()?;
        let private_env = self.running_context()?.private_env;
        let closure = self.ordinary_function_create(code, scope, private_env)?;
        let name = name.cloned().unwrap_or_else(|| "".into());
        self.set_function_name(closure, &name, None)?;
        Ok(closure)
    }

    // §15.4.4 MethodDefinitionEvaluation for `get` and `set` accessors
    pub(crate) fn define_accessor_function(
        &mut self,
        code: &Rc<FunctionNode>,
        key: &PropertyKey,
        prefix: &str,
    ) -> JsResult<ObjectId> {
        let scope = self.lexical_environment()?;
        let private_env = self.running_context()?.private_env;
        let closure = self.ordinary_function_create(code, scope, private_env)?;
        self.set_function_name(closure, key, Some(prefix))?;
        Ok(closure)
    }

    // §9.1.2.4 NewFunctionEnvironment
    pub fn new_function_environment(&mut self, f: ObjectId, new_target: JsValue) -> EngineResult<EnvId> {
        let data = self.function_data(f)?;
        let this_binding_status = if data.this_mode == ThisMode::Lexical {
            ThisBindingStatus::Lexical
        } else {
            ThisBindingStatus::Uninitialized
        };
        let mut record = DeclarativeEnvironment::new(Some(data.environment));
        record.function = Some(FunctionEnvironmentFields {
            this_value: JsValue::Undefined,
            this_binding_status,
            function_object: f,
            new_target,
        });
        Ok(self.alloc_env(EnvironmentRecord::Declarative(record)))
    }

    // §7.3.14 Call
    pub fn call(&mut self, f: &JsValue, this_value: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        if !is_callable(self, f)? {
            return Err(self.throw_error(ErrorKind::TypeError, "value is not a function"));
        }
        let JsValue::Object(id) = f else {
            return Err(EngineError::Assertion("callable non-object".to_string()).into());
        };
        match self.object(*id)?.kind.clone() {
            ObjectKind::Builtin(builtin) => self.call_builtin(builtin, *id, args, None),
            ObjectKind::Function(data) => {
                tracing::debug!(
                    name = data.code.name.as_deref().unwrap_or(""),
                    args = args.len(),
                    "call"
                );
                self.ecmascript_function_call(*id, &data, this_value, args)
            }
            _ => Err(EngineError::Assertion("callable object without code".to_string()).into()),
        }
    }

    // §7.3.15 Construct
    pub fn construct(
        &mut self,
        f: &JsValue,
        args: &[JsValue],
        new_target: Option<&JsValue>,
    ) -> JsResult<JsValue> {
        let new_target = new_target.unwrap_or(f).clone();
        let JsValue::Object(id) = f else {
            return Err(self.throw_error(ErrorKind::TypeError, "value is not a constructor"));
        };
        match self.object(*id)?.kind.clone() {
            ObjectKind::Builtin(builtin) => self.call_builtin(builtin, *id, args, Some(&new_target)),
            ObjectKind::Function(data) if data.is_constructor => {
                tracing::debug!(
                    name = data.code.name.as_deref().unwrap_or(""),
                    args = args.len(),
                    "construct"
                );
                self.ecmascript_function_construct(*id, &data, args, &new_target)
            }
            _ => Err(self.throw_error(ErrorKind::TypeError, "value is not a constructor")),
        }
    }

    // §10.2.1 [[Call]]
    fn ecmascript_function_call(
        &mut self,
        f: ObjectId,
        data: &FunctionData,
        this_argument: &JsValue,
        args: &[JsValue],
    ) -> JsResult<JsValue> {
        if data.code.is_generator || data.code.is_async {
            return Err(EngineError::NotImplemented("generator and async function bodies").into());
        }
        self.prepare_for_ordinary_call(f, data, JsValue::Undefined)?;
        let result = self
            .ordinary_call_bind_this(data, this_argument)
            .and_then(|()| Ok(self.ordinary_call_evaluate_body(f, data, args)?));
        self.pop_execution_context();
        match result? {
            Completion::Return(value) => Ok(value),
            Completion::Normal(_) => Ok(JsValue::Undefined),
            Completion::Throw(value) => Err(Abrupt::Throw(value)),
            Completion::Break { .. } | Completion::Continue { .. } => Err(EngineError::Assertion(
                "break or continue escaped a function body".to_string(),
            )
            .into()),
        }
    }

    // §10.2.2 [[Construct]]
    fn ecmascript_function_construct(
        &mut self,
        f: ObjectId,
        data: &FunctionData,
        args: &[JsValue],
        new_target: &JsValue,
    ) -> JsResult<JsValue> {
        let prototype = self.get_prototype_from_constructor(new_target)?;
        let this_argument = JsValue::Object(self.ordinary_object_create(Some(prototype)));
        self.prepare_for_ordinary_call(f, data, new_target.clone())?;
        let result = self
            .ordinary_call_bind_this(data, &this_argument)
            .and_then(|()| Ok(self.ordinary_call_evaluate_body(f, data, args)?));
        self.pop_execution_context();
        match result? {
            Completion::Return(value @ JsValue::Object(_)) => Ok(value),
            Completion::Return(_) | Completion::Normal(_) => Ok(this_argument),
            Completion::Throw(value) => Err(Abrupt::Throw(value)),
            Completion::Break { .. } | Completion::Continue { .. } => Err(EngineError::Assertion(
                "break or continue escaped a constructor body".to_string(),
            )
            .into()),
        }
    }

    // §10.1.14 GetPrototypeFromConstructor, defaulting to %Object.prototype%
    fn get_prototype_from_constructor(&mut self, constructor: &JsValue) -> JsResult<ObjectId> {
        if let JsValue::Object(c) = constructor {
            let proto = self.get(*c, &"prototype".into(), constructor)?;
            if let JsValue::Object(p) = proto {
                return Ok(p);
            }
        }
        Ok(self.intrinsics()?.object_prototype)
    }

    // §10.2.1.1 PrepareForOrdinaryCall
    fn prepare_for_ordinary_call(
        &mut self,
        f: ObjectId,
        data: &FunctionData,
        new_target: JsValue,
    ) -> JsResult<()> {
        let local_env = self.new_function_environment(f, new_target)?;
        self.push_execution_context(ExecutionContext {
            realm: data.realm,
            function: Some(f),
            lexical_env: local_env,
            variable_env: local_env,
            private_env: data.private_environment,
            labels: Vec::new(),
            strict: data.strict,
        })
    }

    // §10.2.1.2 OrdinaryCallBindThis
    fn ordinary_call_bind_this(&mut self, data: &FunctionData, this_argument: &JsValue) -> JsResult<()> {
        let this_value = match data.this_mode {
            ThisMode::Lexical => return Ok(()),
            ThisMode::Strict => this_argument.clone(),
            ThisMode::Global if this_argument.is_nullish() => {
                let global_env = self.realm(data.realm)?.global_env;
                self.get_this_binding(global_env)?
            }
            ThisMode::Global => JsValue::Object(to_object(self, this_argument)?),
        };
        let local_env = self.lexical_environment()?;
        self.bind_this_value(local_env, this_value)
    }

    // §10.2.1.4 OrdinaryCallEvaluateBody
    fn ordinary_call_evaluate_body(
        &mut self,
        f: ObjectId,
        data: &FunctionData,
        args: &[JsValue],
    ) -> EngineResult<Completion> {
        js_try!(self.function_declaration_instantiation(f, data, args));
        match &data.code.body {
            FunctionBody::Block(statements) => self.exec_statements(statements),
            FunctionBody::Expression(expr) => {
                let value = js_try!(self.eval_expr_value(expr));
                Ok(Completion::Return(value))
            }
        }
    }

    // §10.2.11 FunctionDeclarationInstantiation
    fn function_declaration_instantiation(
        &mut self,
        f: ObjectId,
        data: &FunctionData,
        args: &[JsValue],
    ) -> JsResult<()> {
        let code = Rc::clone(&data.code);
        let strict = data.strict;
        let formals = &code.params;
        let body = code.statements();
        let callee_env = self.lexical_environment()?;

        let parameter_names = parameter_names(formals);
        let mut seen = FxHashSet::default();
        let has_duplicates = !parameter_names.iter().all(|n| seen.insert(n.as_str()));
        let simple_parameter_list = is_simple_parameter_list(formals);
        let has_parameter_expressions = contains_expression(formals);

        let var_names = var_declared_names(body);
        let var_declarations = var_scoped_declarations(body);
        let lexical_declarations = lexically_scoped_declarations(body, true);
        let lexical_names: Vec<String> = lexical_declarations
            .iter()
            .flat_map(LexicalDeclaration::bound_names)
            .collect();

        let mut function_names: Vec<String> = Vec::new();
        let mut functions_to_initialize: Vec<Rc<FunctionNode>> = Vec::new();
        for decl in var_declarations.iter().rev() {
            if let VarDeclaration::Function(func) = decl {
                let name = func.name.clone().unwrap_or_default();
                if !function_names.contains(&name) {
                    function_names.insert(0, name);
                    functions_to_initialize.insert(0, Rc::clone(func));
                }
            }
        }

        let arguments = "arguments".to_string();
        let arguments_object_needed = if data.this_mode == ThisMode::Lexical
            || parameter_names.contains(&arguments)
        {
            false
        } else {
            has_parameter_expressions
                || !(function_names.contains(&arguments) || lexical_names.contains(&arguments))
        };

        let env = if strict || !has_parameter_expressions {
            callee_env
        } else {
            let env = self.new_declarative_environment(Some(callee_env));
            self.set_lexical_environment(env)?;
            env
        };

        for name in &parameter_names {
            if !self.has_binding(env, name)? {
                self.create_mutable_binding(env, name, false)?;
                if has_duplicates {
                    self.initialize_binding(env, name, JsValue::Undefined)?;
                }
            }
        }

        let mut parameter_bindings = parameter_names.clone();
        if arguments_object_needed {
            let mapping = (!strict && simple_parameter_list)
                .then_some((parameter_names.as_slice(), env));
            let ao = self.create_arguments_object(f, args, mapping)?;
            if strict {
                self.create_immutable_binding(env, &arguments, false)?;
            } else {
                self.create_mutable_binding(env, &arguments, false)?;
            }
            self.initialize_binding(env, &arguments, JsValue::Object(ao))?;
            parameter_bindings.push(arguments);
        }

        let binding_env = if has_duplicates { None } else { Some(env) };
        self.bind_parameters(formals, args, binding_env)?;

        let var_env = if !has_parameter_expressions {
            let mut instantiated = parameter_bindings.clone();
            for name in &var_names {
                if !instantiated.contains(name) {
                    instantiated.push(name.clone());
                    self.create_mutable_binding(env, name, false)?;
                    self.initialize_binding(env, name, JsValue::Undefined)?;
                }
            }
            env
        } else {
            let var_env = self.new_declarative_environment(Some(env));
            self.running_context_mut()?.variable_env = var_env;
            let mut instantiated: Vec<String> = Vec::new();
            for name in &var_names {
                if instantiated.contains(name) {
                    continue;
                }
                instantiated.push(name.clone());
                self.create_mutable_binding(var_env, name, false)?;
                let initial = if !parameter_bindings.contains(name) || function_names.contains(name)
                {
                    JsValue::Undefined
                } else {
                    self.get_binding_value(env, name, false)?
                };
                self.initialize_binding(var_env, name, initial)?;
            }
            var_env
        };

        let lex_env = if strict {
            var_env
        } else {
            self.new_declarative_environment(Some(var_env))
        };
        self.set_lexical_environment(lex_env)?;

        for decl in &lexical_declarations {
            for name in decl.bound_names() {
                if decl.is_constant() {
                    self.create_immutable_binding(lex_env, &name, true)?;
                } else {
                    self.create_mutable_binding(lex_env, &name, false)?;
                }
            }
        }

        let private_env = self.running_context()?.private_env;
        for func in &functions_to_initialize {
            let name = func.name.clone().unwrap_or_default();
            let fo = self.instantiate_function_object(func, lex_env, private_env)?;
            self.set_mutable_binding(var_env, &name, JsValue::Object(fo), false)?;
        }
        Ok(())
    }

    /// IteratorBindingInitialization of a formal parameter list over the
    /// argument list.
    fn bind_parameters(
        &mut self,
        formals: &[Pattern],
        args: &[JsValue],
        env: Option<EnvId>,
    ) -> JsResult<()> {
        for (index, param) in formals.iter().enumerate() {
            if let Pattern::Rest(target) = param {
                let rest = self.create_array_from_list(args.get(index..).unwrap_or(&[]))?;
                return self.bind_pattern(target, JsValue::Object(rest), env);
            }
            let value = args.get(index).cloned().unwrap_or(JsValue::Undefined);
            self.bind_pattern(param, value, env)?;
        }
        Ok(())
    }

    // §7.3.17 CreateArrayFromList
    pub(crate) fn create_array_from_list(&mut self, elements: &[JsValue]) -> JsResult<ObjectId> {
        let array = self.array_create(0)?;
        for (index, value) in elements.iter().enumerate() {
            self.create_data_property_or_throw(
                array,
                PropertyKey::from(index as u32),
                value.clone(),
            )?;
        }
        Ok(array)
    }

    // §10.4.4.6 CreateUnmappedArgumentsObject, §10.4.4.7
    // CreateMappedArgumentsObject. A mapped object aliases each index below
    // `args.len()` to the last formal of that position's name in `env`.
    fn create_arguments_object(
        &mut self,
        f: ObjectId,
        args: &[JsValue],
        mapping: Option<(&[String], EnvId)>,
    ) -> JsResult<ObjectId> {
        let object_prototype = self.intrinsics()?.object_prototype;
        let obj = self.alloc_object(ObjectData::new(
            Some(object_prototype),
            ObjectKind::Arguments(None),
        ));
        for (index, value) in args.iter().enumerate() {
            self.create_data_property_or_throw(obj, PropertyKey::from(index as u32), value.clone())?;
        }
        self.define_property_or_throw(
            obj,
            "length".into(),
            PropertyDescriptor::data(JsValue::number(args.len() as f64), true, false, true),
        )?;
        let Some((parameter_names, env)) = mapping else {
            return Ok(obj);
        };

        let mut mapped_names = FxHashSet::default();
        let mut names = FxHashMap::default();
        for (index, name) in parameter_names.iter().enumerate().rev() {
            if mapped_names.insert(name.as_str()) && index < args.len() {
                names.insert(PropertyKey::from(index as u32), name.clone());
            }
        }
        tracing::trace!(mapped = names.len(), "mapped arguments object");
        self.object_mut(obj)?.kind = ObjectKind::Arguments(Some(ParameterMap { env, names }));
        self.define_property_or_throw(
            obj,
            "callee".into(),
            PropertyDescriptor::data(JsValue::Object(f), true, false, true),
        )?;
        Ok(obj)
    }

    // §20.5.1.1 NativeError ( message )
    fn call_builtin(
        &mut self,
        builtin: BuiltinFunction,
        _f: ObjectId,
        args: &[JsValue],
        new_target: Option<&JsValue>,
    ) -> JsResult<JsValue> {
        match builtin {
            BuiltinFunction::ErrorConstructor(kind) => {
                let obj = self.create_error_object(kind, "")?;
                if let Some(target) = new_target {
                    let prototype = match target {
                        JsValue::Object(c) => self.get(*c, &"prototype".into(), target)?,
                        _ => JsValue::Undefined,
                    };
                    if let JsValue::Object(p) = prototype {
                        self.object_mut(obj)?.prototype = Some(p);
                    }
                }
                let message = args.first().cloned().unwrap_or(JsValue::Undefined);
                if !message.is_undefined() {
                    let msg = to_string(self, &message)?;
                    self.define_property_or_throw(
                        obj,
                        "message".into(),
                        PropertyDescriptor::data(JsValue::String(msg), true, false, true),
                    )?;
                }
                Ok(JsValue::Object(obj))
            }
        }
    }

    // §7.3.21 OrdinaryHasInstance
    pub fn ordinary_has_instance(&mut self, c: &JsValue, o: &JsValue) -> JsResult<bool> {
        if !is_callable(self, c)? {
            return Ok(false);
        }
        let (JsValue::Object(c_id), JsValue::Object(o_id)) = (c, o) else {
            return Ok(false);
        };
        let JsValue::Object(prototype) = self.get(*c_id, &"prototype".into(), c)? else {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                "Function has non-object prototype in instanceof check",
            ));
        };
        let mut current = self.get_prototype_of(*o_id)?;
        while let Some(p) = current {
            if p == prototype {
                return Ok(true);
            }
            current = self.get_prototype_of(p)?;
        }
        Ok(false)
    }

    // §13.10.2 InstanceofOperator
    pub(crate) fn instanceof_operator(&mut self, value: &JsValue, target: &JsValue) -> JsResult<bool> {
        if !target.is_object() {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                "Right-hand side of 'instanceof' is not an object",
            ));
        }
        if !is_callable(self, target)? {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                "Right-hand side of 'instanceof' is not callable",
            ));
        }
        self.ordinary_has_instance(target, value)
    }
}
