use crate::error::{EngineError, EngineResult};
use crate::types::{JsString, JsSymbol, JsValue};

/// Unwraps a `JsResult` inside a routine returning `EngineResult<Completion>`,
/// turning a throw into `Completion::Throw` and an engine error into `Err`.
macro_rules! js_try {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(abrupt) => return abrupt.into_completion(),
        }
    };
}

/// Propagates any abrupt completion of a nested statement evaluation.
macro_rules! completion_try {
    ($e:expr) => {
        match $e? {
            $crate::interpreter::Completion::Normal(v) => v,
            abrupt => return Ok(abrupt),
        }
    };
}

pub mod analysis;
mod compare;
mod environment;
mod eval;
mod exec;
mod function;
mod helpers;
mod object;
mod reference;
pub mod types;

pub use environment::{
    Binding, BindingState, DeclarativeEnvironment, EnvironmentRecord, FunctionEnvironmentFields,
    GlobalEnvironment, ObjectEnvironment, ThisBindingStatus,
};
pub use function::{BuiltinFunction, FunctionData, ThisMode};
pub use compare::{
    is_less_than, is_loosely_equal, is_strictly_equal, same_value, same_value_non_number,
    same_value_zero,
};
pub use helpers::{
    Numeric, PreferredType, is_callable, is_constructor, to_boolean, to_int32, to_number,
    to_numeric, to_object, to_primitive, to_property_key, to_string, to_uint32, type_of,
};
pub use object::{ObjectData, ObjectKind, ParameterMap};
pub use types::{
    Abrupt, Completion, ErrorKind, JsResult, PropertyDescriptor, PropertyKey, Reference,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RealmId(usize);

#[derive(Clone, Debug)]
pub struct RuntimeOptions {
    /// Execution contexts allowed on the stack before a call throws a
    /// RangeError.
    pub max_stack_depth: usize,
}

/// Stack left before the evaluator grows onto a fresh segment.
const RED_ZONE: usize = 100 * 1024;

/// Size of each stack segment allocated by [`ensure_sufficient_stack`].
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f` with at least [`RED_ZONE`] bytes of native stack available.
///
/// Every script-level call nests several native frames, so the recursive
/// evaluator entry points go through here to keep `max_stack_depth` the
/// only limit a program can hit.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_stack_depth: 512,
        }
    }
}

/// Well-known intrinsic objects of one realm.
#[derive(Clone, Debug)]
pub struct Intrinsics {
    pub object_prototype: ObjectId,
    pub function_prototype: ObjectId,
    pub array_prototype: ObjectId,
    pub error_prototype: ObjectId,
    pub type_error_prototype: ObjectId,
    pub reference_error_prototype: ObjectId,
    pub syntax_error_prototype: ObjectId,
    pub range_error_prototype: ObjectId,
}

impl Intrinsics {
    pub fn error_prototype(&self, kind: ErrorKind) -> ObjectId {
        match kind {
            ErrorKind::Error => self.error_prototype,
            ErrorKind::TypeError => self.type_error_prototype,
            ErrorKind::ReferenceError => self.reference_error_prototype,
            ErrorKind::SyntaxError => self.syntax_error_prototype,
            ErrorKind::RangeError => self.range_error_prototype,
        }
    }
}

// §9.3 Realms
#[derive(Clone, Debug)]
pub struct Realm {
    pub intrinsics: Intrinsics,
    pub global_object: ObjectId,
    pub global_env: EnvId,
}

// §9.4 Execution Contexts
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub realm: RealmId,
    pub function: Option<ObjectId>,
    pub lexical_env: EnvId,
    pub variable_env: EnvId,
    pub private_env: Option<EnvId>,
    /// Label set handed to the next iteration statement.
    pub labels: Vec<String>,
    /// Whether the code running in this context is strict mode code.
    pub strict: bool,
}

/// Owner of every object, environment and realm of one program run, plus
/// the execution context stack.
pub struct Runtime {
    objects: Vec<ObjectData>,
    environments: Vec<EnvironmentRecord>,
    realms: Vec<Realm>,
    contexts: Vec<ExecutionContext>,
    next_symbol_id: u64,
    options: RuntimeOptions,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    pub fn with_options(options: RuntimeOptions) -> Self {
        Self {
            objects: Vec::new(),
            environments: Vec::new(),
            realms: Vec::new(),
            contexts: Vec::new(),
            next_symbol_id: 0,
            options,
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    // §9.3.1 CreateRealm, §9.3.3 SetDefaultGlobalBindings
    pub fn new_realm(&mut self) -> EngineResult<RealmId> {
        let object_prototype = self.alloc_object(ObjectData::new(None, ObjectKind::Ordinary));
        let function_prototype =
            self.alloc_object(ObjectData::new(Some(object_prototype), ObjectKind::Ordinary));
        let array_prototype =
            self.alloc_object(ObjectData::new(Some(object_prototype), ObjectKind::Ordinary));

        let error_prototype = self.create_error_prototype(object_prototype, ErrorKind::Error)?;
        let type_error_prototype =
            self.create_error_prototype(error_prototype, ErrorKind::TypeError)?;
        let reference_error_prototype =
            self.create_error_prototype(error_prototype, ErrorKind::ReferenceError)?;
        let syntax_error_prototype =
            self.create_error_prototype(error_prototype, ErrorKind::SyntaxError)?;
        let range_error_prototype =
            self.create_error_prototype(error_prototype, ErrorKind::RangeError)?;

        let intrinsics = Intrinsics {
            object_prototype,
            function_prototype,
            array_prototype,
            error_prototype,
            type_error_prototype,
            reference_error_prototype,
            syntax_error_prototype,
            range_error_prototype,
        };

        let global_object =
            self.alloc_object(ObjectData::new(Some(object_prototype), ObjectKind::Ordinary));
        let global_env = self.new_global_environment(global_object, global_object);

        let realm = RealmId(self.realms.len());
        self.realms.push(Realm {
            intrinsics: intrinsics.clone(),
            global_object,
            global_env,
        });

        let global = self.object_mut(global_object)?;
        global.insert(
            "globalThis".into(),
            PropertyDescriptor::data(JsValue::Object(global_object), true, false, true),
        );
        for (name, value) in [
            ("undefined", JsValue::Undefined),
            ("NaN", JsValue::nan()),
            ("Infinity", JsValue::number(f64::INFINITY)),
        ] {
            global.insert(name.into(), PropertyDescriptor::data(value, false, false, false));
        }

        for kind in ErrorKind::ALL {
            let prototype = intrinsics.error_prototype(kind);
            let ctor = self.create_builtin_function(
                realm,
                BuiltinFunction::ErrorConstructor(kind),
                kind.name(),
                1,
            )?;
            self.object_mut(ctor)?.insert(
                "prototype".into(),
                PropertyDescriptor::data(JsValue::Object(prototype), false, false, false),
            );
            self.object_mut(prototype)?.insert(
                "constructor".into(),
                PropertyDescriptor::data(JsValue::Object(ctor), true, false, true),
            );
            self.object_mut(global_object)?.insert(
                kind.name().into(),
                PropertyDescriptor::data(JsValue::Object(ctor), true, false, true),
            );
        }

        tracing::debug!(realm = realm.0, "created realm");
        Ok(realm)
    }

    fn create_error_prototype(
        &mut self,
        parent: ObjectId,
        kind: ErrorKind,
    ) -> EngineResult<ObjectId> {
        let proto = self.alloc_object(ObjectData::new(Some(parent), ObjectKind::Ordinary));
        let data = self.object_mut(proto)?;
        data.insert(
            "name".into(),
            PropertyDescriptor::data(JsValue::string(kind.name()), true, false, true),
        );
        data.insert(
            "message".into(),
            PropertyDescriptor::data(JsValue::string(""), true, false, true),
        );
        Ok(proto)
    }

    pub fn realm(&self, id: RealmId) -> EngineResult<&Realm> {
        self.realms
            .get(id.0)
            .ok_or_else(|| EngineError::Assertion(format!("unknown realm {}", id.0)))
    }

    pub fn current_realm(&self) -> EngineResult<RealmId> {
        Ok(self.running_context()?.realm)
    }

    pub(crate) fn intrinsics(&self) -> EngineResult<&Intrinsics> {
        let realm = self.current_realm()?;
        Ok(&self.realm(realm)?.intrinsics)
    }

    pub fn push_execution_context(&mut self, context: ExecutionContext) -> JsResult<()> {
        if self.contexts.len() >= self.options.max_stack_depth {
            return Err(self.throw_error(ErrorKind::RangeError, "Maximum call stack size exceeded"));
        }
        self.contexts.push(context);
        Ok(())
    }

    pub fn pop_execution_context(&mut self) -> Option<ExecutionContext> {
        self.contexts.pop()
    }

    /// Pushes a context evaluating global code of `realm`.
    pub fn push_script_context(&mut self, realm: RealmId, strict: bool) -> JsResult<()> {
        let global_env = self.realm(realm)?.global_env;
        self.push_execution_context(ExecutionContext {
            realm,
            function: None,
            lexical_env: global_env,
            variable_env: global_env,
            private_env: None,
            labels: Vec::new(),
            strict,
        })
    }

    pub fn running_context(&self) -> EngineResult<&ExecutionContext> {
        self.contexts.last().ok_or(EngineError::NoRunningContext)
    }

    pub(crate) fn running_context_mut(&mut self) -> EngineResult<&mut ExecutionContext> {
        self.contexts.last_mut().ok_or(EngineError::NoRunningContext)
    }

    pub fn context_depth(&self) -> usize {
        self.contexts.len()
    }

    pub(crate) fn is_strict(&self) -> EngineResult<bool> {
        Ok(self.running_context()?.strict)
    }

    pub(crate) fn lexical_environment(&self) -> EngineResult<EnvId> {
        Ok(self.running_context()?.lexical_env)
    }

    pub(crate) fn set_lexical_environment(&mut self, env: EnvId) -> EngineResult<()> {
        self.running_context_mut()?.lexical_env = env;
        Ok(())
    }

    pub(crate) fn alloc_object(&mut self, data: ObjectData) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(data);
        id
    }

    pub fn object(&self, id: ObjectId) -> EngineResult<&ObjectData> {
        self.objects.get(id.0).ok_or(EngineError::InvalidObject(id))
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> EngineResult<&mut ObjectData> {
        self.objects.get_mut(id.0).ok_or(EngineError::InvalidObject(id))
    }

    pub(crate) fn alloc_env(&mut self, record: EnvironmentRecord) -> EnvId {
        let id = EnvId(self.environments.len());
        self.environments.push(record);
        id
    }

    pub fn environment(&self, id: EnvId) -> EngineResult<&EnvironmentRecord> {
        self.environments
            .get(id.0)
            .ok_or(EngineError::InvalidEnvironment(id))
    }

    pub(crate) fn environment_mut(&mut self, id: EnvId) -> EngineResult<&mut EnvironmentRecord> {
        self.environments
            .get_mut(id.0)
            .ok_or(EngineError::InvalidEnvironment(id))
    }

    pub fn new_symbol(&mut self, description: Option<&str>) -> JsSymbol {
        self.next_symbol_id += 1;
        JsSymbol {
            id: self.next_symbol_id,
            description: description.map(JsString::from_str),
        }
    }

    /// Builds a native error object in the current realm and wraps it as a
    /// throw. Without a running context the failure is an engine error.
    pub(crate) fn throw_error(&mut self, kind: ErrorKind, message: &str) -> Abrupt {
        match self.create_error_object(kind, message) {
            Ok(obj) => Abrupt::Throw(JsValue::Object(obj)),
            Err(e) => Abrupt::Internal(e),
        }
    }

    /// Identifies which native error prototype `value` inherits from, if any.
    pub fn error_kind_of(&self, value: &JsValue) -> Option<ErrorKind> {
        let mut current = self.object(value.as_object()?).ok()?.prototype;
        while let Some(proto) = current {
            for realm in &self.realms {
                for kind in [
                    ErrorKind::TypeError,
                    ErrorKind::ReferenceError,
                    ErrorKind::SyntaxError,
                    ErrorKind::RangeError,
                    ErrorKind::Error,
                ] {
                    if realm.intrinsics.error_prototype(kind) == proto {
                        return Some(kind);
                    }
                }
            }
            current = self.object(proto).ok()?.prototype;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_with_realm() -> (Runtime, RealmId) {
        let mut rt = Runtime::new();
        let realm = rt.new_realm().unwrap();
        rt.push_script_context(realm, false).unwrap();
        (rt, realm)
    }

    #[test]
    fn new_realm_installs_default_globals() {
        let (mut rt, realm) = runtime_with_realm();
        let global = rt.realm(realm).unwrap().global_object;
        let undefined = rt.get_own_property(global, &"undefined".into()).unwrap();
        assert_eq!(
            undefined,
            Some(PropertyDescriptor::data(JsValue::Undefined, false, false, false))
        );
        let nan = rt.get(global, &"NaN".into(), &JsValue::Object(global)).unwrap();
        assert!(matches!(nan, JsValue::Number(n) if n.is_nan()));
        assert!(rt.has_property(global, &"TypeError".into()).unwrap());
    }

    #[test]
    fn thrown_errors_carry_their_kind() {
        let (mut rt, _) = runtime_with_realm();
        let Abrupt::Throw(err) = rt.throw_error(ErrorKind::ReferenceError, "x is not defined")
        else {
            panic!("expected a throw");
        };
        assert_eq!(rt.error_kind_of(&err), Some(ErrorKind::ReferenceError));
        let obj = err.as_object().unwrap();
        let message = rt.get(obj, &"message".into(), &err).unwrap();
        assert_eq!(message, JsValue::string("x is not defined"));
        let name = rt.get(obj, &"name".into(), &err).unwrap();
        assert_eq!(name, JsValue::string("ReferenceError"));
    }

    #[test]
    fn throw_without_context_is_an_engine_error() {
        let mut rt = Runtime::new();
        assert_eq!(
            rt.throw_error(ErrorKind::TypeError, "nope"),
            Abrupt::Internal(EngineError::NoRunningContext)
        );
    }

    #[test]
    fn stack_depth_limit_throws_range_error() {
        let mut rt = Runtime::with_options(RuntimeOptions { max_stack_depth: 2 });
        let realm = rt.new_realm().unwrap();
        rt.push_script_context(realm, false).unwrap();
        rt.push_script_context(realm, false).unwrap();
        let Err(Abrupt::Throw(err)) = rt.push_script_context(realm, false) else {
            panic!("expected a RangeError");
        };
        assert_eq!(rt.error_kind_of(&err), Some(ErrorKind::RangeError));
        assert_eq!(rt.context_depth(), 2);
    }
}
