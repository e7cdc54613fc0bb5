//! Static semantics over the syntax tree: bound names, var- and
//! lexically-scoped declarations, directive prologues and parameter lists.
//!
//! Nothing here looks inside nested function bodies. Callers asking about a
//! function's own body pass that body's statement list.

use crate::ast::{
    Expression, ForInOfLeft, ForInit, FunctionNode, Literal, ObjectPatternProperty, Pattern,
    PropertyKey, Statement, VarKind,
};
use std::rc::Rc;

/// A declaration contributing to a var scope.
#[derive(Clone, Copy, Debug)]
pub enum VarDeclaration<'a> {
    Binding(&'a Pattern),
    Function(&'a Rc<FunctionNode>),
}

/// A declaration contributing to a lexical (block) scope.
#[derive(Clone, Copy, Debug)]
pub enum LexicalDeclaration<'a> {
    Binding { kind: VarKind, pattern: &'a Pattern },
    Function(&'a Rc<FunctionNode>),
}

impl LexicalDeclaration<'_> {
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            LexicalDeclaration::Binding {
                kind: VarKind::Const,
                ..
            }
        )
    }

    pub fn bound_names(&self) -> Vec<String> {
        match self {
            LexicalDeclaration::Binding { pattern, .. } => bound_names(pattern),
            LexicalDeclaration::Function(f) => f.name.iter().cloned().collect(),
        }
    }
}

impl VarDeclaration<'_> {
    pub fn bound_names(&self) -> Vec<String> {
        match self {
            VarDeclaration::Binding(pattern) => bound_names(pattern),
            VarDeclaration::Function(f) => f.name.iter().cloned().collect(),
        }
    }
}

// §8.2.1 BoundNames
pub fn bound_names(pattern: &Pattern) -> Vec<String> {
    let mut names = Vec::new();
    collect_bound_names(pattern, &mut names);
    names
}

fn collect_bound_names(pattern: &Pattern, names: &mut Vec<String>) {
    match pattern {
        Pattern::Identifier(name) => names.push(name.clone()),
        Pattern::Array(elements) => {
            for element in elements.iter().flatten() {
                collect_bound_names(element, names);
            }
        }
        Pattern::Object(properties) => {
            for property in properties {
                match property {
                    ObjectPatternProperty::KeyValue(_, value) => collect_bound_names(value, names),
                    ObjectPatternProperty::Shorthand(name, _) | ObjectPatternProperty::Rest(name) => {
                        names.push(name.clone())
                    }
                }
            }
        }
        Pattern::Assign(target, _) | Pattern::Rest(target) => collect_bound_names(target, names),
    }
}

/// Bound names of every parameter, in order, duplicates kept.
pub fn parameter_names(params: &[Pattern]) -> Vec<String> {
    let mut names = Vec::new();
    for param in params {
        collect_bound_names(param, &mut names);
    }
    names
}

// §15.1.3 IsSimpleParameterList
pub fn is_simple_parameter_list(params: &[Pattern]) -> bool {
    params.iter().all(|p| matches!(p, Pattern::Identifier(_)))
}

// §8.5.2 ContainsExpression
pub fn contains_expression(params: &[Pattern]) -> bool {
    params.iter().any(pattern_contains_expression)
}

fn pattern_contains_expression(pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Identifier(_) => false,
        Pattern::Assign(..) => true,
        Pattern::Rest(target) => pattern_contains_expression(target),
        Pattern::Array(elements) => elements.iter().flatten().any(pattern_contains_expression),
        Pattern::Object(properties) => properties.iter().any(|p| match p {
            ObjectPatternProperty::KeyValue(key, value) => {
                matches!(key, PropertyKey::Computed(_)) || pattern_contains_expression(value)
            }
            ObjectPatternProperty::Shorthand(_, default) => default.is_some(),
            ObjectPatternProperty::Rest(_) => false,
        }),
    }
}

// §11.2.1 Directive Prologues
pub fn has_use_strict_directive(body: &[Statement]) -> bool {
    body.iter()
        .map_while(|stmt| match stmt {
            Statement::Expression(Expression::Literal(Literal::String(s))) => Some(s),
            _ => None,
        })
        .any(|s| s == "use strict")
}

/// Whether code of `function` runs in strict mode given the strictness of
/// the code that contains it.
pub fn is_strict_function(function: &FunctionNode, enclosing_strict: bool) -> bool {
    enclosing_strict || has_use_strict_directive(function.statements())
}

// §8.2.7 VarScopedDeclarations / §8.2.10 TopLevelVarScopedDeclarations.
// Function declarations directly in `body` are var-scoped; ones nested in
// blocks are not.
pub fn var_scoped_declarations(body: &[Statement]) -> Vec<VarDeclaration<'_>> {
    let mut out = Vec::new();
    for stmt in body {
        collect_var_declarations(stmt, true, &mut out);
    }
    out
}

// §8.2.6 VarDeclaredNames
pub fn var_declared_names(body: &[Statement]) -> Vec<String> {
    var_scoped_declarations(body)
        .iter()
        .flat_map(VarDeclaration::bound_names)
        .collect()
}

fn collect_var_declarations<'a>(
    stmt: &'a Statement,
    top_level: bool,
    out: &mut Vec<VarDeclaration<'a>>,
) {
    let nested = |s: &'a Statement, out: &mut Vec<VarDeclaration<'a>>| {
        collect_var_declarations(s, false, out)
    };
    match stmt {
        Statement::Variable(decl) if decl.kind == VarKind::Var => {
            out.extend(decl.declarations.iter().map(|d| VarDeclaration::Binding(&d.pattern)));
        }
        Statement::FunctionDeclaration(f) if top_level => out.push(VarDeclaration::Function(f)),
        Statement::Labeled(_, body) => collect_var_declarations(body, top_level, out),
        Statement::Block(stmts) => stmts.iter().for_each(|s| nested(s, out)),
        Statement::If(s) => {
            nested(&s.consequent, out);
            if let Some(alternate) = &s.alternate {
                nested(alternate, out);
            }
        }
        Statement::While(s) => nested(&s.body, out),
        Statement::DoWhile(s) => nested(&s.body, out),
        Statement::For(s) => {
            if let Some(ForInit::Variable(decl)) = &s.init
                && decl.kind == VarKind::Var
            {
                out.extend(decl.declarations.iter().map(|d| VarDeclaration::Binding(&d.pattern)));
            }
            nested(&s.body, out);
        }
        Statement::ForIn(s) => {
            if let ForInOfLeft::Variable(VarKind::Var, pattern) = &s.left {
                out.push(VarDeclaration::Binding(pattern));
            }
            nested(&s.body, out);
        }
        Statement::ForOf(s) => {
            if let ForInOfLeft::Variable(VarKind::Var, pattern) = &s.left {
                out.push(VarDeclaration::Binding(pattern));
            }
            nested(&s.body, out);
        }
        Statement::Try(s) => {
            s.block.iter().for_each(|st| nested(st, out));
            if let Some(handler) = &s.handler {
                handler.body.iter().for_each(|st| nested(st, out));
            }
            if let Some(finalizer) = &s.finalizer {
                finalizer.iter().for_each(|st| nested(st, out));
            }
        }
        Statement::Switch(s) => {
            for case in &s.cases {
                case.consequent.iter().for_each(|st| nested(st, out));
            }
        }
        Statement::With(_, body) => nested(body, out),
        _ => {}
    }
}

// §8.2.5 LexicallyScopedDeclarations. At the top level of a script or
// function body, function declarations are var-scoped and left out.
pub fn lexically_scoped_declarations(
    body: &[Statement],
    top_level: bool,
) -> Vec<LexicalDeclaration<'_>> {
    let mut out = Vec::new();
    for stmt in body {
        collect_lexical_declaration(stmt, top_level, &mut out);
    }
    out
}

fn collect_lexical_declaration<'a>(
    stmt: &'a Statement,
    top_level: bool,
    out: &mut Vec<LexicalDeclaration<'a>>,
) {
    match stmt {
        Statement::Variable(decl) if decl.kind != VarKind::Var => {
            out.extend(decl.declarations.iter().map(|d| LexicalDeclaration::Binding {
                kind: decl.kind,
                pattern: &d.pattern,
            }));
        }
        Statement::FunctionDeclaration(f) if !top_level => {
            out.push(LexicalDeclaration::Function(f))
        }
        Statement::Labeled(_, body) => collect_lexical_declaration(body, top_level, out),
        _ => {}
    }
}

// §8.2.4 LexicallyDeclaredNames
pub fn lexically_declared_names(body: &[Statement], top_level: bool) -> Vec<String> {
    lexically_scoped_declarations(body, top_level)
        .iter()
        .flat_map(LexicalDeclaration::bound_names)
        .collect()
}
