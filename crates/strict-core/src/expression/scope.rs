// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Variable scope tracking during body parsing.
//!
//! Scopes nest with bodies: method parameters form the outermost frame,
//! each body and loop pushes another. Lookup walks from the innermost
//! frame outwards, so `find_variable` always returns the nearest
//! lexically enclosing binding. Mutability travels with the binding; the
//! implicit loop variable `index` may never be shadowed.

use crate::error::ErrorKind;
use crate::types::Variable;

/// Stack of variable frames, innermost last.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScopeStack {
    frames: Vec<Frame>,
}

#[derive(Debug, Clone, Default)]
struct Frame {
    variables: Vec<Variable>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Enters a nested scope.
    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Leaves the current scope, returning the variables it declared.
    pub fn pop(&mut self) -> Vec<Variable> {
        self.frames
            .pop()
            .map(|frame| frame.variables)
            .unwrap_or_default()
    }

    /// Declares a variable in the current scope.
    ///
    /// Duplicates within one scope are rejected; shadowing an outer scope
    /// is allowed except for the loop variable `index`.
    pub fn define(&mut self, variable: Variable) -> Result<(), ErrorKind> {
        if variable.name == "index" && self.lookup(&variable.name).is_some() {
            return Err(ErrorKind::LoopIndexShadowed);
        }
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        if frame
            .variables
            .iter()
            .any(|existing| existing.name == variable.name)
        {
            return Err(ErrorKind::DuplicateVariable(variable.name));
        }
        frame.variables.push(variable);
        Ok(())
    }

    /// Finds the nearest enclosing binding of `name`.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.frames.iter().rev().find_map(|frame| {
            frame
                .variables
                .iter()
                .find(|variable| variable.name == name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::TypeId;

    fn variable(name: &str, is_mutable: bool) -> Variable {
        Variable {
            name: name.into(),
            variable_type: TypeId::from_raw(0),
            is_mutable,
        }
    }

    #[test]
    fn lookup_finds_nearest_enclosing_binding() {
        let mut scopes = ScopeStack::new();
        scopes.define(variable("x", false)).unwrap();
        scopes.push();
        scopes.define(variable("x", true)).unwrap();

        assert!(scopes.lookup("x").unwrap().is_mutable);
        scopes.pop();
        assert!(!scopes.lookup("x").unwrap().is_mutable);
    }

    #[test]
    fn duplicate_in_same_scope_is_rejected() {
        let mut scopes = ScopeStack::new();
        scopes.define(variable("x", false)).unwrap();
        assert_eq!(
            scopes.define(variable("x", false)),
            Err(ErrorKind::DuplicateVariable("x".into()))
        );
    }

    #[test]
    fn shadowing_outer_scopes_is_allowed() {
        let mut scopes = ScopeStack::new();
        scopes.define(variable("x", false)).unwrap();
        scopes.push();
        assert!(scopes.define(variable("x", false)).is_ok());
    }

    #[test]
    fn index_cannot_be_shadowed() {
        let mut scopes = ScopeStack::new();
        scopes.define(variable("index", false)).unwrap();
        scopes.push();
        assert_eq!(
            scopes.define(variable("index", false)),
            Err(ErrorKind::LoopIndexShadowed)
        );
    }

    #[test]
    fn pop_returns_declared_variables() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define(variable("a", false)).unwrap();
        scopes.define(variable("b", true)).unwrap();
        let declared = scopes.pop();
        assert_eq!(declared.len(), 2);
        assert_eq!(declared[0].name, "a");
    }

    #[test]
    fn lookup_misses_after_pop() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define(variable("inner", false)).unwrap();
        scopes.pop();
        assert!(scopes.lookup("inner").is_none());
    }
}
