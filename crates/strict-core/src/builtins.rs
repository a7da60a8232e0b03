// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Built-in types of the `Base` package.
//!
//! These are registered programmatically before any user package loads, so
//! every user type can resolve `Number`, `Text`, `List` and friends without
//! importing anything. Built-ins are privileged: they carry method
//! signatures without bodies (their semantics live in the virtual machine)
//! without being traits, and their signatures may mention `Any` where user
//! code could not.

use crate::package::{Program, TypeId};
use crate::types::{Member, Method, Parameter};

/// Names of all built-in types, in registration order.
pub const BASE_TYPE_NAMES: &[&str] = &[
    "Any",
    "Generic",
    "None",
    "Number",
    "Boolean",
    "Text",
    "Character",
    "List",
    "Mutable",
    "Range",
    "Log",
    "BinaryOperator",
];

fn parameter(name: &str, declared_type: TypeId) -> Parameter {
    Parameter {
        name: name.into(),
        declared_type,
        is_mutable: false,
        default_value: None,
    }
}

fn method(name: &str, parameters: Vec<Parameter>, return_type: TypeId) -> Method {
    let is_public = name.chars().next().is_some_and(char::is_uppercase);
    Method {
        name: name.into(),
        parameters,
        return_type,
        is_public,
        lines: Vec::new(),
        body: None,
    }
}

fn member(name: &str, declared_type: TypeId) -> Member {
    Member {
        name: name.into(),
        declared_type,
        initializer: None,
        is_mutable: false,
    }
}

/// Registers and fills the `Base` package of `program`.
pub(crate) fn install(program: &mut Program) {
    let base = program.base();
    for name in BASE_TYPE_NAMES {
        program
            .register_type(base, name)
            .expect("Base package starts empty");
    }

    let any = program.base_type("Any");
    let generic = program.base_type("Generic");
    let none = program.base_type("None");
    let number = program.base_type("Number");
    let boolean = program.base_type("Boolean");
    let text = program.base_type("Text");
    let character = program.base_type("Character");
    let list = program.base_type("List");
    let mutable = program.base_type("Mutable");
    let range = program.base_type("Range");
    let log = program.base_type("Log");
    let binary_operator = program.base_type("BinaryOperator");

    {
        let data = program.get_type_mut(any);
        data.is_trait = true;
        data.methods = vec![method("ToText", Vec::new(), text)];
    }
    program.get_type_mut(generic).is_trait = true;
    // None stays an empty non-trait unit type for missing return
    // declarations.
    {
        let data = program.get_type_mut(number);
        data.methods = ["+", "-", "*", "/", "%"]
            .iter()
            .map(|operator| method(operator, vec![parameter("other", number)], number))
            .chain(
                ["<", ">", "<=", ">="]
                    .iter()
                    .map(|operator| method(operator, vec![parameter("other", number)], boolean)),
            )
            .collect();
    }
    {
        let data = program.get_type_mut(boolean);
        data.methods = vec![
            method("and", vec![parameter("other", boolean)], boolean),
            method("or", vec![parameter("other", boolean)], boolean),
            method("not", Vec::new(), boolean),
        ];
    }
    {
        let data = program.get_type_mut(text);
        data.methods = vec![
            method("+", vec![parameter("other", text)], text),
            method("Length", Vec::new(), number),
        ];
    }
    {
        let data = program.get_type_mut(character);
        data.methods = vec![method("from", vec![parameter("number", number)], character)];
    }
    {
        let data = program.get_type_mut(list);
        data.is_generic = true;
        data.methods = vec![
            method("Length", Vec::new(), number),
            method("First", Vec::new(), generic),
            method("Contains", vec![parameter("generic", generic)], boolean),
            method("+", vec![parameter("other", list)], list),
        ];
    }
    {
        let data = program.get_type_mut(mutable);
        data.is_generic = true;
        data.methods = vec![method("from", vec![parameter("generic", generic)], mutable)];
    }
    {
        let data = program.get_type_mut(range);
        data.members = vec![member("start", number), member("end", number)];
        data.methods = vec![
            method(
                "from",
                vec![parameter("start", number), parameter("end", number)],
                range,
            ),
            method("Length", Vec::new(), number),
        ];
    }
    {
        let data = program.get_type_mut(log);
        data.methods = vec![method("Write", vec![parameter("text", text)], none)];
    }
    {
        let data = program.get_type_mut(binary_operator);
        data.is_trait = true;
        data.methods = vec![
            method("is", vec![parameter("other", any)], boolean),
            method("is not", vec![parameter("other", any)], boolean),
        ];
    }
}
