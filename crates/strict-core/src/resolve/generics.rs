// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Generic type instantiation.
//!
//! A generic template (a type whose members or signatures mention the
//! `Generic` placeholder) is instantiated by cloning it with every
//! placeholder replaced by the implementation type. Instantiations are
//! cached per `(template, implementation types)`, so requesting the same
//! combination twice yields the same [`TypeId`].
//!
//! Naming: `List` instantiations take the plural of their element type
//! (`Number` → `Numbers`); every other template is named
//! `Template(Argument, …)`. The substitution environment also maps the
//! template to the new instance, so self-referential signatures like
//! `+(other List) List` become `+(other Numbers) Numbers`.

use std::collections::HashMap;

use ecow::{EcoString, eco_format};

use crate::error::ErrorKind;
use crate::package::{Program, TypeId};
use crate::types::{GenericOrigin, Member};

/// Instantiates `generic` with the given implementation types, reusing a
/// cached instance when one exists.
pub(crate) fn instantiate(
    program: &mut Program,
    generic: TypeId,
    arguments: &[TypeId],
) -> Result<TypeId, ErrorKind> {
    if !program.get_type(generic).is_generic {
        return Err(ErrorKind::NotGeneric(program.get_type(generic).name.clone()));
    }
    if arguments.is_empty() {
        return Err(ErrorKind::GenericArgumentsRequired(
            program.get_type(generic).name.clone(),
        ));
    }
    let key = (generic, arguments.to_vec());
    if let Some(&instance) = program.generic_instances.get(&key) {
        return Ok(instance);
    }

    let name = instance_name(program, generic, arguments);
    let package = program.get_type(generic).package;
    let instance = program.register_type(package, &name)?;
    program.generic_instances.insert(key, instance);

    let mut env = HashMap::new();
    env.insert(program.base_type("Generic"), arguments[0]);
    env.insert(generic, instance);
    let substitute = |ty: TypeId| env.get(&ty).copied().unwrap_or(ty);

    let template = program.get_type(generic).clone();
    let data = program.get_type_mut(instance);
    data.implements = template.implements.iter().copied().map(substitute).collect();
    data.members = template
        .members
        .iter()
        .map(|member| Member {
            name: member.name.clone(),
            declared_type: substitute(member.declared_type),
            initializer: member.initializer.clone(),
            is_mutable: member.is_mutable,
        })
        .collect();
    data.methods = template
        .methods
        .iter()
        .map(|method| method.clone_with_substitution(&env))
        .collect();
    data.is_trait = template.is_trait;
    data.is_generic = false;
    data.generic_origin = Some(GenericOrigin {
        generic,
        arguments: arguments.to_vec(),
    });
    Ok(instance)
}

/// The name of an instantiation: plural element name for `List`,
/// `Template(Argument, …)` otherwise.
fn instance_name(program: &Program, generic: TypeId, arguments: &[TypeId]) -> EcoString {
    let template = program.get_type(generic);
    if template.name == "List" && template.package == program.base() {
        return pluralize(&program.get_type(arguments[0]).name);
    }
    let mut name = eco_format!("{}(", template.name);
    for (i, &argument) in arguments.iter().enumerate() {
        if i > 0 {
            name.push_str(", ");
        }
        name.push_str(&program.get_type(argument).name);
    }
    name.push(')');
    name
}

/// The English plural of a type name.
pub(crate) fn pluralize(name: &str) -> EcoString {
    if let Some(stem) = name.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return eco_format!("{stem}ies");
        }
    }
    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        return eco_format!("{name}es");
    }
    eco_format!("{name}s")
}

/// Singular spellings a plural name may have come from, most specific
/// first. Used to resolve names like `Numbers` to `List` of `Number`.
pub(crate) fn singular_candidates(name: &str) -> Vec<EcoString> {
    let mut candidates = Vec::new();
    if let Some(stem) = name.strip_suffix("ies") {
        candidates.push(eco_format!("{stem}y"));
    }
    if let Some(stem) = name.strip_suffix("es") {
        candidates.push(stem.into());
    }
    if let Some(stem) = name.strip_suffix('s') {
        candidates.push(stem.into());
    }
    candidates
}
