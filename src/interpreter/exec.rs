use super::analysis::{
    LexicalDeclaration, VarDeclaration, bound_names, has_use_strict_directive,
    lexically_declared_names, lexically_scoped_declarations, var_declared_names,
    var_scoped_declarations,
};
use super::helpers::{to_boolean, to_object};
use super::{
    Completion, EnvId, ErrorKind, JsResult, ObjectId, PropertyKey, Runtime,
    ensure_sufficient_stack, is_strictly_equal,
};
use crate::ast::{
    DoWhileStatement, ForInOfLeft, ForInStatement, ForInit, ForStatement, IfStatement,
    ObjectPatternProperty, Pattern, Script, Statement, SwitchStatement, TryStatement, VarKind,
    VariableDeclaration, WhileStatement,
};
use crate::error::{EngineError, EngineResult};
use crate::types::{JsString, JsValue};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::mem;
use std::rc::Rc;

fn statement_kind(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Empty => "empty",
        Statement::Expression(_) => "expression",
        Statement::Block(_) => "block",
        Statement::Variable(_) => "variable",
        Statement::If(_) => "if",
        Statement::While(_) => "while",
        Statement::DoWhile(_) => "do-while",
        Statement::For(_) => "for",
        Statement::ForIn(_) => "for-in",
        Statement::ForOf(_) => "for-of",
        Statement::Return(_) => "return",
        Statement::Break(_) => "break",
        Statement::Continue(_) => "continue",
        Statement::Throw(_) => "throw",
        Statement::Try(_) => "try",
        Statement::Switch(_) => "switch",
        Statement::Labeled(..) => "labeled",
        Statement::With(..) => "with",
        Statement::Debugger => "debugger",
        Statement::FunctionDeclaration(_) => "function",
    }
}

// §14.7.1.1 LoopContinues
fn loop_continues(completion: &Completion, label_set: &[String]) -> bool {
    match completion {
        Completion::Normal(_) => true,
        Completion::Continue { target: None, .. } => true,
        Completion::Continue {
            target: Some(label),
            ..
        } => label_set.contains(label),
        _ => false,
    }
}

/// A loop or switch consumes an unlabelled `break`.
fn break_to_normal(completion: Completion) -> Completion {
    match completion {
        Completion::Break {
            target: None,
            value,
        } => Completion::Normal(Some(value.unwrap_or(JsValue::Undefined))),
        other => other,
    }
}

/// State of a §14.7.5.10 for-in iterator.
struct ForInIterator {
    object: Option<ObjectId>,
    object_was_visited: bool,
    visited: FxHashSet<PropertyKey>,
    remaining: VecDeque<PropertyKey>,
}

impl ForInIterator {
    fn new(object: ObjectId) -> Self {
        Self {
            object: Some(object),
            object_was_visited: false,
            visited: FxHashSet::default(),
            remaining: VecDeque::new(),
        }
    }
}

impl Runtime {
    pub(crate) fn exec_statements(&mut self, stmts: &[Statement]) -> EngineResult<Completion> {
        let mut last: Option<JsValue> = None;
        for stmt in stmts {
            match self.exec_statement(stmt)? {
                Completion::Normal(value) => {
                    if value.is_some() {
                        last = value;
                    }
                }
                abrupt => return Ok(abrupt.update_empty(last)),
            }
        }
        Ok(Completion::Normal(last))
    }

    pub(crate) fn exec_statement(&mut self, stmt: &Statement) -> EngineResult<Completion> {
        ensure_sufficient_stack(|| self.exec_statement_node(stmt))
    }

    fn exec_statement_node(&mut self, stmt: &Statement) -> EngineResult<Completion> {
        tracing::trace!(kind = statement_kind(stmt), "statement");
        let label_set = match stmt {
            Statement::Labeled(..) => Vec::new(),
            Statement::While(_)
            | Statement::DoWhile(_)
            | Statement::For(_)
            | Statement::ForIn(_)
            | Statement::ForOf(_) => mem::take(&mut self.running_context_mut()?.labels),
            _ => {
                self.running_context_mut()?.labels.clear();
                Vec::new()
            }
        };
        match stmt {
            Statement::Empty | Statement::Debugger | Statement::FunctionDeclaration(_) => {
                Ok(Completion::unused())
            }
            Statement::Expression(expr) => {
                let value = js_try!(self.eval_expr_value(expr));
                Ok(Completion::normal(value))
            }
            Statement::Block(body) => self.exec_block(body),
            Statement::Variable(decl) => self.exec_variable_declaration(decl),
            Statement::If(s) => self.exec_if(s),
            Statement::While(s) => Ok(break_to_normal(self.exec_while(s, &label_set)?)),
            Statement::DoWhile(s) => Ok(break_to_normal(self.exec_do_while(s, &label_set)?)),
            Statement::For(s) => Ok(break_to_normal(self.exec_for(s, &label_set)?)),
            Statement::ForIn(s) => Ok(break_to_normal(self.exec_for_in(s, &label_set)?)),
            Statement::ForOf(_) => Err(EngineError::NotImplemented("for-of")),
            Statement::Return(expr) => {
                let value = match expr {
                    Some(e) => js_try!(self.eval_expr_value(e)),
                    None => JsValue::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Break(label) => Ok(Completion::Break {
                target: label.clone(),
                value: None,
            }),
            Statement::Continue(label) => Ok(Completion::Continue {
                target: label.clone(),
                value: None,
            }),
            Statement::Throw(expr) => {
                let value = js_try!(self.eval_expr_value(expr));
                Ok(Completion::Throw(value))
            }
            Statement::Try(s) => self.exec_try(s),
            Statement::Switch(s) => Ok(break_to_normal(self.exec_switch(s)?)),
            Statement::Labeled(label, body) => self.exec_labeled(label, body),
            Statement::With(object, body) => self.exec_with(object, body),
        }
    }

    // §14.13.4 LabelledEvaluation
    fn exec_labeled(&mut self, label: &str, body: &Statement) -> EngineResult<Completion> {
        self.running_context_mut()?.labels.push(label.to_string());
        match self.exec_statement(body)? {
            Completion::Break {
                target: Some(target),
                value,
            } if target == label => Ok(Completion::Normal(value)),
            other => Ok(other),
        }
    }

    // §14.2.2 Block evaluation
    fn exec_block(&mut self, body: &[Statement]) -> EngineResult<Completion> {
        if body.is_empty() {
            return Ok(Completion::unused());
        }
        let old_env = self.lexical_environment()?;
        let block_env = self.new_declarative_environment(Some(old_env));
        let declarations = lexically_scoped_declarations(body, false);
        js_try!(self.block_declaration_instantiation(&declarations, block_env));
        self.set_lexical_environment(block_env)?;
        let result = self.exec_statements(body);
        self.set_lexical_environment(old_env)?;
        result
    }

    // §14.2.3 BlockDeclarationInstantiation
    fn block_declaration_instantiation(
        &mut self,
        declarations: &[LexicalDeclaration<'_>],
        env: EnvId,
    ) -> JsResult<()> {
        let private_env = self.running_context()?.private_env;
        let mut initialized: FxHashSet<String> = FxHashSet::default();
        for decl in declarations {
            for name in decl.bound_names() {
                if decl.is_constant() {
                    self.create_immutable_binding(env, &name, true)?;
                } else if !self.has_binding(env, &name)? {
                    self.create_mutable_binding(env, &name, false)?;
                }
            }
            if let LexicalDeclaration::Function(func) = decl {
                let name = func.name.clone().unwrap_or_default();
                let fo = JsValue::Object(self.instantiate_function_object(func, env, private_env)?);
                if initialized.insert(name.clone()) {
                    self.initialize_binding(env, &name, fo)?;
                } else {
                    self.set_mutable_binding(env, &name, fo, false)?;
                }
            }
        }
        Ok(())
    }

    // §14.3.1.2 and §14.3.2.1 declaration evaluation
    fn exec_variable_declaration(&mut self, decl: &VariableDeclaration) -> EngineResult<Completion> {
        for declarator in &decl.declarations {
            js_try!(self.bind_declarator(decl.kind, &declarator.pattern, declarator.init.as_ref()));
        }
        Ok(Completion::unused())
    }

    fn bind_declarator(
        &mut self,
        kind: VarKind,
        pattern: &Pattern,
        init: Option<&crate::ast::Expression>,
    ) -> JsResult<()> {
        match (pattern, init) {
            (Pattern::Identifier(_), None) if kind == VarKind::Var => Ok(()),
            (Pattern::Identifier(name), init) => {
                let lhs = self.resolve_binding(name, None)?;
                let value = match init {
                    Some(expr) => self.eval_expr_named(expr, name)?,
                    None => JsValue::Undefined,
                };
                if kind == VarKind::Var {
                    self.put_value(&lhs, value)
                } else {
                    self.initialize_referenced_binding(&lhs, value)
                }
            }
            (_, init) => {
                let Some(expr) = init else {
                    return Err(EngineError::Assertion(
                        "destructuring declaration without an initializer".to_string(),
                    )
                    .into());
                };
                let value = self.eval_expr_value(expr)?;
                let env = match kind {
                    VarKind::Var => None,
                    VarKind::Let | VarKind::Const => Some(self.lexical_environment()?),
                };
                self.bind_pattern(pattern, value, env)
            }
        }
    }

    /// §8.6.2 BindingInitialization. With no `env`, names are assigned
    /// through ordinary identifier resolution.
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: JsValue,
        env: Option<EnvId>,
    ) -> JsResult<()> {
        match pattern {
            Pattern::Identifier(name) => self.initialize_bound_name(name, value, env),
            Pattern::Assign(target, default) => {
                let value = if value.is_undefined() {
                    match target.as_ref() {
                        Pattern::Identifier(name) => self.eval_expr_named(default, name)?,
                        _ => self.eval_expr_value(default)?,
                    }
                } else {
                    value
                };
                self.bind_pattern(target, value, env)
            }
            Pattern::Object(properties) => self.bind_object_pattern(properties, value, env),
            Pattern::Array(_) => Err(EngineError::NotImplemented("array destructuring").into()),
            Pattern::Rest(_) => Err(EngineError::Assertion(
                "rest element outside a parameter or array pattern".to_string(),
            )
            .into()),
        }
    }

    // §8.6.3 InitializeBoundName
    fn initialize_bound_name(
        &mut self,
        name: &str,
        value: JsValue,
        env: Option<EnvId>,
    ) -> JsResult<()> {
        match env {
            Some(env) => self.initialize_binding(env, name, value),
            None => {
                let lhs = self.resolve_binding(name, None)?;
                self.put_value(&lhs, value)
            }
        }
    }

    // §14.3.3.1 PropertyBindingInitialization, §14.3.3.2 RestBindingInitialization
    fn bind_object_pattern(
        &mut self,
        properties: &[ObjectPatternProperty],
        value: JsValue,
        env: Option<EnvId>,
    ) -> JsResult<()> {
        if value.is_nullish() {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                &format!("Cannot destructure '{value}' as it is {value}."),
            ));
        }
        let source = to_object(self, &value)?;
        let mut excluded: Vec<PropertyKey> = Vec::new();
        for property in properties {
            match property {
                ObjectPatternProperty::Shorthand(name, default) => {
                    let key = PropertyKey::from(name.as_str());
                    let mut v = self.get(source, &key, &value)?;
                    if v.is_undefined()
                        && let Some(default) = default
                    {
                        v = self.eval_expr_named(default, name)?;
                    }
                    self.initialize_bound_name(name, v, env)?;
                    excluded.push(key);
                }
                ObjectPatternProperty::KeyValue(key, target) => {
                    let key = self.eval_pattern_key(key)?;
                    let v = self.get(source, &key, &value)?;
                    self.bind_pattern(target, v, env)?;
                    excluded.push(key);
                }
                ObjectPatternProperty::Rest(name) => {
                    let object_prototype = self.intrinsics()?.object_prototype;
                    let rest = self.ordinary_object_create(Some(object_prototype));
                    self.copy_data_properties(rest, source, &excluded)?;
                    self.initialize_bound_name(name, JsValue::Object(rest), env)?;
                }
            }
        }
        Ok(())
    }

    fn eval_pattern_key(&mut self, key: &crate::ast::PropertyKey) -> JsResult<PropertyKey> {
        use crate::ast::PropertyKey as Key;
        Ok(match key {
            Key::Identifier(name) | Key::String(name) => name.as_str().into(),
            Key::Number(n) => crate::types::number_ops::to_string(*n).as_str().into(),
            Key::Computed(expr) => {
                let value = self.eval_expr_value(expr)?;
                super::helpers::to_property_key(self, &value)?
            }
        })
    }

    // §7.3.25 CopyDataProperties
    fn copy_data_properties(
        &mut self,
        target: ObjectId,
        source: ObjectId,
        excluded: &[PropertyKey],
    ) -> JsResult<()> {
        for key in self.own_property_keys(source)? {
            if excluded.contains(&key) {
                continue;
            }
            if let Some(desc) = self.get_own_property(source, &key)?
                && desc.enumerable()
            {
                let value = self.get(source, &key, &JsValue::Object(source))?;
                self.create_data_property_or_throw(target, key, value)?;
            }
        }
        Ok(())
    }

    // §14.6.2 if statement
    fn exec_if(&mut self, s: &IfStatement) -> EngineResult<Completion> {
        let test = js_try!(self.eval_expr_value(&s.test));
        let completion = if to_boolean(&test) {
            self.exec_statement(&s.consequent)?
        } else if let Some(alternate) = &s.alternate {
            self.exec_statement(alternate)?
        } else {
            return Ok(Completion::normal(JsValue::Undefined));
        };
        Ok(completion.update_empty(Some(JsValue::Undefined)))
    }

    // §14.7.3.2 while loop
    fn exec_while(&mut self, w: &WhileStatement, label_set: &[String]) -> EngineResult<Completion> {
        let mut v = JsValue::Undefined;
        loop {
            let test = js_try!(self.eval_expr_value(&w.test));
            if !to_boolean(&test) {
                return Ok(Completion::normal(v));
            }
            let result = self.exec_statement(&w.body)?;
            if !loop_continues(&result, label_set) {
                return Ok(result.update_empty(Some(v)));
            }
            if let Some(value) = result.value() {
                v = value.clone();
            }
        }
    }

    // §14.7.2.2 do-while loop
    fn exec_do_while(
        &mut self,
        dw: &DoWhileStatement,
        label_set: &[String],
    ) -> EngineResult<Completion> {
        let mut v = JsValue::Undefined;
        loop {
            let result = self.exec_statement(&dw.body)?;
            if !loop_continues(&result, label_set) {
                return Ok(result.update_empty(Some(v)));
            }
            if let Some(value) = result.value() {
                v = value.clone();
            }
            let test = js_try!(self.eval_expr_value(&dw.test));
            if !to_boolean(&test) {
                return Ok(Completion::normal(v));
            }
        }
    }

    // §14.7.4.2 for loop
    fn exec_for(&mut self, f: &ForStatement, label_set: &[String]) -> EngineResult<Completion> {
        match &f.init {
            Some(ForInit::Variable(decl)) if decl.kind != VarKind::Var => {
                let old_env = self.lexical_environment()?;
                let loop_env = self.new_declarative_environment(Some(old_env));
                let is_const = decl.kind == VarKind::Const;
                let names: Vec<String> = decl
                    .declarations
                    .iter()
                    .flat_map(|d| bound_names(&d.pattern))
                    .collect();
                for name in &names {
                    let created = if is_const {
                        self.create_immutable_binding(loop_env, name, true)
                    } else {
                        self.create_mutable_binding(loop_env, name, false)
                    };
                    js_try!(created);
                }
                self.set_lexical_environment(loop_env)?;
                let init = self.exec_variable_declaration(decl);
                let result = match init {
                    Ok(Completion::Normal(_)) => {
                        let per_iteration = if is_const { Vec::new() } else { names };
                        self.for_body_evaluation(f, &per_iteration, label_set)
                    }
                    other => other,
                };
                self.set_lexical_environment(old_env)?;
                result
            }
            Some(ForInit::Variable(decl)) => {
                completion_try!(self.exec_variable_declaration(decl));
                self.for_body_evaluation(f, &[], label_set)
            }
            Some(ForInit::Expression(expr)) => {
                js_try!(self.eval_expr_value(expr));
                self.for_body_evaluation(f, &[], label_set)
            }
            None => self.for_body_evaluation(f, &[], label_set),
        }
    }

    // §14.7.4.3 ForBodyEvaluation
    fn for_body_evaluation(
        &mut self,
        f: &ForStatement,
        per_iteration: &[String],
        label_set: &[String],
    ) -> EngineResult<Completion> {
        let mut v = JsValue::Undefined;
        js_try!(self.create_per_iteration_environment(per_iteration));
        loop {
            if let Some(test) = &f.test {
                let test = js_try!(self.eval_expr_value(test));
                if !to_boolean(&test) {
                    return Ok(Completion::normal(v));
                }
            }
            let result = self.exec_statement(&f.body)?;
            if !loop_continues(&result, label_set) {
                return Ok(result.update_empty(Some(v)));
            }
            if let Some(value) = result.value() {
                v = value.clone();
            }
            js_try!(self.create_per_iteration_environment(per_iteration));
            if let Some(update) = &f.update {
                js_try!(self.eval_expr_value(update));
            }
        }
    }

    // §14.7.4.4 CreatePerIterationEnvironment
    fn create_per_iteration_environment(&mut self, bindings: &[String]) -> JsResult<()> {
        if bindings.is_empty() {
            return Ok(());
        }
        let last = self.lexical_environment()?;
        let outer = self.environment(last)?.outer().ok_or_else(|| {
            EngineError::Assertion("iteration environment has no outer environment".to_string())
        })?;
        let this_iteration = self.new_declarative_environment(Some(outer));
        for name in bindings {
            self.create_mutable_binding(this_iteration, name, false)?;
            let last_value = self.get_binding_value(last, name, true)?;
            self.initialize_binding(this_iteration, name, last_value)?;
        }
        tracing::debug!(bindings = bindings.len(), "per-iteration environment");
        self.set_lexical_environment(this_iteration)?;
        Ok(())
    }

    // §14.7.5.5 ForInOfLoopEvaluation for `for (... in ...)`
    fn exec_for_in(&mut self, fi: &ForInStatement, label_set: &[String]) -> EngineResult<Completion> {
        let old_env = self.lexical_environment()?;
        // §14.7.5.6 ForIn/OfHeadEvaluation
        let tdz_names = match &fi.left {
            ForInOfLeft::Variable(VarKind::Let | VarKind::Const, pattern) => bound_names(pattern),
            _ => Vec::new(),
        };
        if !tdz_names.is_empty() {
            let tdz = self.new_declarative_environment(Some(old_env));
            for name in &tdz_names {
                js_try!(self.create_mutable_binding(tdz, name, false));
            }
            self.set_lexical_environment(tdz)?;
        }
        let expr_value = self.eval_expr_value(&fi.right);
        self.set_lexical_environment(old_env)?;
        let expr_value = js_try!(expr_value);
        if expr_value.is_nullish() {
            return Ok(Completion::Break {
                target: None,
                value: None,
            });
        }
        let object = js_try!(to_object(self, &expr_value));
        let mut iterator = ForInIterator::new(object);

        // §14.7.5.7 ForIn/OfBodyEvaluation
        let mut v = JsValue::Undefined;
        loop {
            let Some(key) = js_try!(self.for_in_next(&mut iterator)) else {
                return Ok(Completion::normal(v));
            };
            let key = JsValue::String(key);
            let status = self.bind_for_in_left(&fi.left, key, old_env);
            if let Err(abrupt) = status {
                self.set_lexical_environment(old_env)?;
                return abrupt.into_completion();
            }
            let result = self.exec_statement(&fi.body);
            self.set_lexical_environment(old_env)?;
            let result = result?;
            if !loop_continues(&result, label_set) {
                return Ok(result.update_empty(Some(v)));
            }
            if let Some(value) = result.value() {
                v = value.clone();
            }
        }
    }

    fn bind_for_in_left(&mut self, left: &ForInOfLeft, value: JsValue, old_env: EnvId) -> JsResult<()> {
        match left {
            ForInOfLeft::Variable(VarKind::Var, pattern) => self.bind_pattern(pattern, value, None),
            ForInOfLeft::Variable(kind, pattern) => {
                // §14.7.5.4 ForDeclarationBindingInstantiation
                let iteration_env = self.new_declarative_environment(Some(old_env));
                for name in bound_names(pattern) {
                    if *kind == VarKind::Const {
                        self.create_immutable_binding(iteration_env, &name, true)?;
                    } else {
                        self.create_mutable_binding(iteration_env, &name, false)?;
                    }
                }
                self.set_lexical_environment(iteration_env)?;
                self.bind_pattern(pattern, value, Some(iteration_env))
            }
            ForInOfLeft::Pattern(Pattern::Identifier(name)) => {
                let lhs = self.resolve_binding(name, None)?;
                self.put_value(&lhs, value)
            }
            ForInOfLeft::Pattern(_) => {
                Err(EngineError::NotImplemented("destructuring assignment").into())
            }
        }
    }

    // §14.7.5.10.2.1 %ForInIteratorPrototype%.next
    fn for_in_next(&mut self, it: &mut ForInIterator) -> JsResult<Option<JsString>> {
        loop {
            let Some(object) = it.object else {
                return Ok(None);
            };
            if !it.object_was_visited {
                let keys = self.own_property_keys(object)?;
                it.remaining
                    .extend(keys.into_iter().filter(|k| matches!(k, PropertyKey::String(_))));
                it.object_was_visited = true;
            }
            while let Some(key) = it.remaining.pop_front() {
                if it.visited.contains(&key) {
                    continue;
                }
                if let Some(desc) = self.get_own_property(object, &key)? {
                    it.visited.insert(key.clone());
                    if desc.enumerable()
                        && let PropertyKey::String(s) = key
                    {
                        return Ok(Some(s));
                    }
                }
            }
            it.object = self.get_prototype_of(object)?;
            it.object_was_visited = false;
        }
    }

    // §14.12.4 switch statement
    fn exec_switch(&mut self, s: &SwitchStatement) -> EngineResult<Completion> {
        let switch_value = js_try!(self.eval_expr_value(&s.discriminant));
        let old_env = self.lexical_environment()?;
        let block_env = self.new_declarative_environment(Some(old_env));
        let declarations: Vec<LexicalDeclaration<'_>> = s
            .cases
            .iter()
            .flat_map(|case| lexically_scoped_declarations(&case.consequent, false))
            .collect();
        js_try!(self.block_declaration_instantiation(&declarations, block_env));
        self.set_lexical_environment(block_env)?;
        let result = self.case_block_evaluation(s, &switch_value);
        self.set_lexical_environment(old_env)?;
        result
    }

    // §14.12.2 CaseBlockEvaluation
    fn case_block_evaluation(
        &mut self,
        s: &SwitchStatement,
        input: &JsValue,
    ) -> EngineResult<Completion> {
        let mut start = None;
        for (index, case) in s.cases.iter().enumerate() {
            let Some(test) = &case.test else {
                continue;
            };
            let clause_value = js_try!(self.eval_expr_value(test));
            if is_strictly_equal(input, &clause_value) {
                start = Some(index);
                break;
            }
        }
        let start = match start.or_else(|| s.cases.iter().position(|c| c.test.is_none())) {
            Some(start) => start,
            None => return Ok(Completion::normal(JsValue::Undefined)),
        };
        let mut v = JsValue::Undefined;
        for case in &s.cases[start..] {
            let result = self.exec_statements(&case.consequent)?;
            if let Some(value) = result.value() {
                v = value.clone();
            }
            if result.is_abrupt() {
                return Ok(result.update_empty(Some(v)));
            }
        }
        Ok(Completion::normal(v))
    }

    // §14.15.3 try statement
    fn exec_try(&mut self, t: &TryStatement) -> EngineResult<Completion> {
        let block = self.exec_block(&t.block)?;
        let completion = match (&t.handler, block) {
            (Some(handler), Completion::Throw(thrown)) => {
                self.exec_catch(handler.param.as_ref(), &handler.body, thrown)?
            }
            (_, block) => block,
        };
        let completion = match &t.finalizer {
            Some(finalizer) => match self.exec_block(finalizer)? {
                Completion::Normal(_) => completion,
                abrupt => abrupt,
            },
            None => completion,
        };
        Ok(completion.update_empty(Some(JsValue::Undefined)))
    }

    // §14.15.2 CatchClauseEvaluation
    fn exec_catch(
        &mut self,
        param: Option<&Pattern>,
        body: &[Statement],
        thrown: JsValue,
    ) -> EngineResult<Completion> {
        let Some(param) = param else {
            return self.exec_block(body);
        };
        let old_env = self.lexical_environment()?;
        let catch_env = self.new_declarative_environment(Some(old_env));
        for name in bound_names(param) {
            js_try!(self.create_mutable_binding(catch_env, &name, false));
        }
        self.set_lexical_environment(catch_env)?;
        if let Err(abrupt) = self.bind_pattern(param, thrown, Some(catch_env)) {
            self.set_lexical_environment(old_env)?;
            return abrupt.into_completion();
        }
        let result = self.exec_block(body);
        self.set_lexical_environment(old_env)?;
        result
    }

    // §14.11.2 with statement
    fn exec_with(&mut self, object: &crate::ast::Expression, body: &Statement) -> EngineResult<Completion> {
        let value = js_try!(self.eval_expr_value(object));
        let obj = js_try!(to_object(self, &value));
        let old_env = self.lexical_environment()?;
        let with_env = self.new_object_environment(obj, true, Some(old_env));
        self.set_lexical_environment(with_env)?;
        let result = self.exec_statement(body);
        self.set_lexical_environment(old_env)?;
        Ok(result?.update_empty(Some(JsValue::Undefined)))
    }

    // §16.1.7 GlobalDeclarationInstantiation
    pub(crate) fn global_declaration_instantiation(
        &mut self,
        script: &Script,
        env: EnvId,
    ) -> JsResult<()> {
        let body = &script.body;
        let lex_names = lexically_declared_names(body, true);
        let var_names = var_declared_names(body);
        for name in &lex_names {
            if self.has_var_declaration(env, name)?
                || self.has_lexical_declaration(env, name)?
                || self.has_restricted_global_property(env, name)?
            {
                return Err(self.throw_error(
                    ErrorKind::SyntaxError,
                    &format!("Identifier '{name}' has already been declared"),
                ));
            }
        }
        for name in &var_names {
            if self.has_lexical_declaration(env, name)? {
                return Err(self.throw_error(
                    ErrorKind::SyntaxError,
                    &format!("Identifier '{name}' has already been declared"),
                ));
            }
        }

        let var_declarations = var_scoped_declarations(body);
        let mut functions_to_initialize = Vec::new();
        let mut declared_function_names: Vec<String> = Vec::new();
        for decl in var_declarations.iter().rev() {
            if let VarDeclaration::Function(func) = decl {
                let name = func.name.clone().unwrap_or_default();
                if declared_function_names.contains(&name) {
                    continue;
                }
                if !self.can_declare_global_function(env, &name)? {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        &format!("Cannot declare global function '{name}'"),
                    ));
                }
                declared_function_names.push(name);
                functions_to_initialize.insert(0, Rc::clone(func));
            }
        }

        let mut declared_var_names: Vec<String> = Vec::new();
        for decl in &var_declarations {
            let VarDeclaration::Binding(pattern) = decl else {
                continue;
            };
            for name in bound_names(pattern) {
                if declared_function_names.contains(&name) {
                    continue;
                }
                if !self.can_declare_global_var(env, &name)? {
                    return Err(self.throw_error(
                        ErrorKind::TypeError,
                        &format!("Cannot declare global variable '{name}'"),
                    ));
                }
                if !declared_var_names.contains(&name) {
                    declared_var_names.push(name);
                }
            }
        }

        for decl in lexically_scoped_declarations(body, true) {
            for name in decl.bound_names() {
                if decl.is_constant() {
                    self.create_immutable_binding(env, &name, true)?;
                } else {
                    self.create_mutable_binding(env, &name, false)?;
                }
            }
        }

        for func in &functions_to_initialize {
            let name = func.name.clone().unwrap_or_default();
            let fo = self.instantiate_function_object(func, env, None)?;
            self.create_global_function_binding(env, &name, JsValue::Object(fo), false)?;
        }
        for name in &declared_var_names {
            self.create_global_var_binding(env, name, false)?;
        }
        Ok(())
    }

    /// §16.1.6 ScriptEvaluation in the realm of the running context.
    pub fn eval_script(&mut self, script: &Script) -> EngineResult<Completion> {
        let realm = self.current_realm()?;
        let global_env = self.realm(realm)?.global_env;
        let strict = has_use_strict_directive(&script.body);
        js_try!(self.push_script_context(realm, strict));
        tracing::debug!(statements = script.body.len(), strict, "script start");
        let result = match self.global_declaration_instantiation(script, global_env) {
            Ok(()) => self.exec_statements(&script.body),
            Err(abrupt) => abrupt.into_completion(),
        };
        self.pop_execution_context();
        let result = match result? {
            Completion::Normal(None) => Completion::normal(JsValue::Undefined),
            other => other,
        };
        tracing::debug!(abrupt = result.is_abrupt(), "script end");
        Ok(result)
    }
}
