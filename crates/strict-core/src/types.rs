// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The semantic model: types, members, methods, and bodies.
//!
//! One [`Type`] is materialized per `.strict` file. Declarations (imports,
//! implements, members, method signatures) are resolved eagerly when the
//! package loads; method bodies are kept as raw [`SourceLine`]s and parsed
//! into a [`Body`] on first access, then cached for the lifetime of the
//! program.
//!
//! All cross references between types use [`TypeId`] indices into the arena
//! owned by [`Program`](crate::package::Program), which keeps the
//! Type ↔ Method ↔ Body ↔ Expression graph free of ownership cycles.

use std::collections::HashMap;
use std::ops::Range;

use ecow::EcoString;

use crate::expression::{Branch, Expression, ExpressionKind};
use crate::package::{PackageId, TypeId};

/// A user-defined or built-in type, one per source file.
#[derive(Debug, Clone)]
pub struct Type {
    /// The type name, equal to the source filename without extension.
    pub name: EcoString,
    /// The package this type belongs to.
    pub package: PackageId,
    /// Packages imported by this type.
    pub imports: Vec<PackageId>,
    /// Implemented traits and base types, in declaration order.
    pub implements: Vec<TypeId>,
    /// Declared members, in declaration order.
    pub members: Vec<Member>,
    /// Defined methods, in declaration order.
    pub methods: Vec<Method>,
    /// Traits carry method signatures without bodies.
    ///
    /// Derived for user types: no members, no implements, and the name is
    /// not `Number`. Built-in types set this explicitly.
    pub is_trait: bool,
    /// Whether any member or method signature mentions the `Generic`
    /// placeholder, making this a template rather than a usable type.
    pub is_generic: bool,
    /// For instantiated generics, the template and implementation types.
    pub generic_origin: Option<GenericOrigin>,
    /// Lazily built `name → methods` union over implements and `Any`.
    pub(crate) available_methods: Option<HashMap<EcoString, Vec<MethodRef>>>,
}

impl Type {
    /// Creates an empty stub so forward references resolve before the
    /// type's own declarations are parsed.
    pub(crate) fn stub(name: impl Into<EcoString>, package: PackageId) -> Self {
        Self {
            name: name.into(),
            package,
            imports: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
            methods: Vec::new(),
            is_trait: false,
            is_generic: false,
            generic_origin: None,
            available_methods: None,
        }
    }

    /// Finds a member by name.
    #[must_use]
    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Index of a directly defined method by name, first match.
    #[must_use]
    pub fn find_method_index(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|method| method.name == name)
    }
}

/// Where an instantiated generic came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericOrigin {
    /// The generic template, e.g. `List`.
    pub generic: TypeId,
    /// The implementation types substituted into the template.
    pub arguments: Vec<TypeId>,
}

/// A `has` declaration.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: EcoString,
    /// The resolved member type (declared, aliased from the name, or
    /// inferred from the initializer).
    pub declared_type: TypeId,
    /// The parsed initializer expression, if one was written.
    pub initializer: Option<Expression>,
    /// Members of a `Mutable(…)` type can be reassigned.
    pub is_mutable: bool,
}

/// A method parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: EcoString,
    pub declared_type: TypeId,
    pub is_mutable: bool,
    /// Calls may omit arguments for parameters with a default value.
    pub default_value: Option<Expression>,
}

/// One line of a source file, kept for lazy body parsing and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number within the file.
    pub number: usize,
    /// The raw text including leading tabs.
    pub text: EcoString,
}

impl SourceLine {
    #[must_use]
    pub fn new(number: usize, text: impl Into<EcoString>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// Number of leading tab characters.
    #[must_use]
    pub fn tabs(&self) -> usize {
        self.text.chars().take_while(|&c| c == '\t').count()
    }

    /// The text with leading tabs stripped.
    #[must_use]
    pub fn content(&self) -> &str {
        self.text.trim_start_matches('\t')
    }
}

/// A method: signature plus a lazily parsed body.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: EcoString,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeId,
    /// Methods whose name starts uppercase are public.
    pub is_public: bool,
    /// Raw body lines, parsed on first access via
    /// [`Program::method_body`](crate::package::Program::method_body).
    pub(crate) lines: Vec<SourceLine>,
    /// One-shot cell filled by the first body access.
    pub(crate) body: Option<Body>,
}

impl Method {
    /// Number of parameters without a default value.
    #[must_use]
    pub fn required_parameters(&self) -> usize {
        self.parameters
            .iter()
            .filter(|parameter| parameter.default_value.is_none())
            .count()
    }

    /// The parsed body, if it has been accessed yet.
    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// The raw body lines.
    #[must_use]
    pub fn lines(&self) -> &[SourceLine] {
        &self.lines
    }

    /// Clones this method replacing every occurrence of a type in `env`,
    /// used when instantiating generics.
    pub(crate) fn clone_with_substitution(&self, env: &HashMap<TypeId, TypeId>) -> Self {
        let substitute = |ty: TypeId| env.get(&ty).copied().unwrap_or(ty);
        Self {
            name: self.name.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|parameter| Parameter {
                    name: parameter.name.clone(),
                    declared_type: substitute(parameter.declared_type),
                    is_mutable: parameter.is_mutable,
                    default_value: parameter.default_value.clone(),
                })
                .collect(),
            return_type: substitute(self.return_type),
            is_public: self.is_public,
            lines: self.lines.clone(),
            body: None,
        }
    }
}

/// A reference to a method defined on some type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// The type the method is defined on.
    pub owner: TypeId,
    /// Index into that type's `methods`.
    pub index: usize,
}

/// A variable binding inside a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: EcoString,
    pub variable_type: TypeId,
    pub is_mutable: bool,
}

/// Identifies a body within its method's body tree.
///
/// Ids are assigned in creation order while the body tree is parsed, so
/// the method's top body always comes first. Child bodies record their
/// enclosing body through [`Body::parent`]; the id indirection keeps the
/// owned tree free of reference cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(u32);

impl BodyId {
    #[must_use]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// An indentation-delimited scope of ordered expressions.
///
/// Bodies form a tree: `if` and `for` expressions own their child bodies,
/// and every child carries a `parent` back-link to its enclosing body.
/// Variables declared in a body are visible in its children; lookup walks
/// from the innermost scope outwards through the parent links.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// This body's id within its method.
    pub id: BodyId,
    /// The enclosing body, `None` for the method's top body.
    pub parent: Option<BodyId>,
    /// Indentation depth, 1 to 3 tabs.
    pub tabs: usize,
    /// 1-based file line numbers covered by this body.
    pub line_range: Range<usize>,
    /// Variables declared directly in this body.
    pub variables: Vec<Variable>,
    /// The parsed expressions, one per line (child bodies hang off their
    /// `if`/`for` expression).
    pub expressions: Vec<Expression>,
    /// The type of the body's value: the last expression, with `return`
    /// unwrapped.
    pub return_type: TypeId,
}

impl Body {
    /// The body with the given id in this body's subtree, including
    /// itself.
    #[must_use]
    pub fn find_body(&self, id: BodyId) -> Option<&Body> {
        if self.id == id {
            return Some(self);
        }
        self.expressions
            .iter()
            .find_map(|expression| find_body_in_expression(expression, id))
    }

    /// The nearest lexically enclosing binding of `name` as seen from the
    /// body `from`: that body's own variables first, then each enclosing
    /// body through the `parent` links.
    ///
    /// Call this on the method's top body, which owns the whole parent
    /// chain; `from` may be the top body's own id.
    #[must_use]
    pub fn find_variable(&self, from: BodyId, name: &str) -> Option<&Variable> {
        let mut current = self.find_body(from);
        while let Some(body) = current {
            if let Some(variable) = body
                .variables
                .iter()
                .find(|variable| variable.name == name)
            {
                return Some(variable);
            }
            current = body.parent.and_then(|parent| self.find_body(parent));
        }
        None
    }
}

/// Searches an expression's child bodies for `id`.
fn find_body_in_expression(expression: &Expression, id: BodyId) -> Option<&Body> {
    match &expression.kind {
        ExpressionKind::If {
            then, otherwise, ..
        } => {
            if let Branch::Body(body) = then {
                if let Some(found) = body.find_body(id) {
                    return Some(found);
                }
            }
            if let Some(Branch::Body(body)) = otherwise {
                return body.find_body(id);
            }
            None
        }
        ExpressionKind::For { body, .. } => body.find_body(id),
        _ => None,
    }
}

impl std::fmt::Display for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, expression) in self.expressions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for _ in 0..self.tabs {
                write!(f, "\t")?;
            }
            write!(f, "{expression}")?;
        }
        Ok(())
    }
}
