// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Type and method resolution.
//!
//! Two lookup surfaces: [`find_type`] resolves a name hierarchically
//! (current type, enclosing packages, imports, `Base`, dotted paths,
//! plural aliases) and [`find_method`] selects an overload from the
//! lazily built available-methods union of a type, its transitive
//! implements, and `Any`.
//!
//! Compatibility is directional: `A` is assignable to `B` when they are
//! equal, `B` is `Any`, `B` is a transitive implement of `A`, or an
//! allowed upcast applies (`Number → Text`, `Number`/`Text` → `List`).
//! `Mutable` wrappers delegate: lookup and compatibility see through them.

use std::collections::{HashMap, HashSet};

use ecow::{EcoString, eco_format};

use crate::error::ErrorKind;
use crate::package::{PackageId, Program, TypeId};
use crate::types::MethodRef;

pub(crate) mod declarations;
pub(crate) mod generics;

/// Finds a type by name, bubbling from the current context outwards.
///
/// Lookup order: the current type itself, the packages from `package` up
/// to the root, the current type's imports, and `Base`. Dotted names are
/// matched against fully-qualified package paths. A plural name resolves
/// to the `List` instantiation of its singular (`Numbers` → `List` of
/// `Number`), which may create the instantiation on demand.
pub fn find_type(
    program: &mut Program,
    package: PackageId,
    current: Option<TypeId>,
    name: &str,
) -> Option<TypeId> {
    if name.contains('.') {
        return find_qualified(program, name);
    }
    if let Some(current) = current {
        // `Value` names the type the surrounding code will run on.
        if program.get_type(current).name == name || name == "Value" {
            return Some(current);
        }
    }
    let mut enclosing = Some(package);
    while let Some(id) = enclosing {
        if let Some(found) = program.package(id).get_type(name) {
            return Some(found);
        }
        enclosing = program.package(id).parent;
    }
    if let Some(current) = current {
        let imports = program.get_type(current).imports.clone();
        for import in imports {
            if let Some(found) = program.package(import).get_type(name) {
                return Some(found);
            }
        }
    }
    if let Some(found) = program.package(program.base()).get_type(name) {
        return Some(found);
    }
    plural_alias(program, package, current, name)
}

/// Resolves a plural name to the `List` instantiation of its singular.
fn plural_alias(
    program: &mut Program,
    package: PackageId,
    current: Option<TypeId>,
    name: &str,
) -> Option<TypeId> {
    for singular in generics::singular_candidates(name) {
        if let Some(element) = find_type(program, package, current, &singular) {
            let list = program.base_type("List");
            if let Ok(instance) = generics::instantiate(program, list, &[element]) {
                return Some(instance);
            }
        }
    }
    None
}

/// Matches a dotted name against fully-qualified package paths.
fn find_qualified(program: &Program, name: &str) -> Option<TypeId> {
    let mut segments = name.split('.');
    let type_name = segments.next_back()?;
    let mut package = program.root();
    for segment in segments {
        package = program
            .package(package)
            .children()
            .iter()
            .copied()
            .find(|&child| program.package(child).name == segment)?;
    }
    program.package(package).get_type(type_name)
}

/// Resolves a type annotation, including generic forms like
/// `List(Number)`.
pub(crate) fn resolve_type_name(
    program: &mut Program,
    package: PackageId,
    current: Option<TypeId>,
    text: &str,
) -> Result<TypeId, ErrorKind> {
    if let Some((name, rest)) = text.split_once('(') {
        let inner = rest
            .strip_suffix(')')
            .ok_or_else(|| ErrorKind::TypeNotFound(text.into()))?;
        let generic = find_type(program, package, current, name)
            .ok_or_else(|| ErrorKind::TypeNotFound(name.into()))?;
        let mut arguments = Vec::new();
        for argument in inner.split(',') {
            arguments.push(resolve_type_name(program, package, current, argument.trim())?);
        }
        generics::instantiate(program, generic, &arguments)
    } else {
        find_type(program, package, current, text)
            .ok_or_else(|| ErrorKind::TypeNotFound(text.into()))
    }
}

/// The underlying data type of a `Mutable` wrapper, `None` for other
/// types.
#[must_use]
pub fn mutable_underlying(program: &Program, ty: TypeId) -> Option<TypeId> {
    let origin = program.get_type(ty).generic_origin.as_ref()?;
    (origin.generic == program.base_type("Mutable")).then(|| origin.arguments[0])
}

/// Sees through a `Mutable` wrapper.
#[must_use]
pub fn unwrap_mutable(program: &Program, ty: TypeId) -> TypeId {
    mutable_underlying(program, ty).unwrap_or(ty)
}

/// True when a value of `from` is assignable where `to` is expected.
#[must_use]
pub fn is_compatible(program: &Program, from: TypeId, to: TypeId) -> bool {
    if from == to {
        return true;
    }
    let from = unwrap_mutable(program, from);
    let to = unwrap_mutable(program, to);
    if from == to || to == program.base_type("Any") {
        return true;
    }
    if implements_transitively(program, from, to) {
        return true;
    }
    let number = program.base_type("Number");
    let text = program.base_type("Text");
    if from == number && to == text {
        return true;
    }
    // A single Number or Text upcasts to a list position.
    if from == number || from == text {
        let list = program.base_type("List");
        if to == list {
            return true;
        }
        if let Some(origin) = &program.get_type(to).generic_origin {
            return origin.generic == list && is_compatible(program, from, origin.arguments[0]);
        }
    }
    false
}

/// True when `target` appears in the transitive implements of `ty`.
fn implements_transitively(program: &Program, ty: TypeId, target: TypeId) -> bool {
    let mut visited = HashSet::new();
    let mut pending = vec![ty];
    while let Some(current) = pending.pop() {
        if !visited.insert(current) {
            continue;
        }
        for &implemented in &program.get_type(current).implements {
            if implemented == target {
                return true;
            }
            pending.push(implemented);
        }
    }
    false
}

/// The transitive `name → methods` union of a type, its implements, and
/// `Any`, built on first use and cached on the type.
pub fn available_methods(
    program: &mut Program,
    ty: TypeId,
) -> &HashMap<EcoString, Vec<MethodRef>> {
    if program.get_type(ty).available_methods.is_none() {
        let map = build_available_methods(program, ty);
        program.get_type_mut(ty).available_methods = Some(map);
    }
    program
        .get_type(ty)
        .available_methods
        .as_ref()
        .expect("cache was just filled")
}

fn build_available_methods(program: &Program, ty: TypeId) -> HashMap<EcoString, Vec<MethodRef>> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut pending = std::collections::VecDeque::from([ty]);
    // Mutable wrappers delegate to their underlying data type.
    if let Some(underlying) = mutable_underlying(program, ty) {
        pending.push_back(underlying);
    }
    while let Some(current) = pending.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        order.push(current);
        for &implemented in &program.get_type(current).implements {
            pending.push_back(implemented);
        }
    }
    let any = program.base_type("Any");
    if visited.insert(any) {
        order.push(any);
    }
    let mut map: HashMap<EcoString, Vec<MethodRef>> = HashMap::new();
    for owner in order {
        for (index, method) in program.get_type(owner).methods.iter().enumerate() {
            map.entry(method.name.clone())
                .or_default()
                .push(MethodRef { owner, index });
        }
    }
    map
}

/// A successfully resolved method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedCall {
    pub method: MethodRef,
    pub return_type: TypeId,
}

/// Selects the first overload of `name` on `ty` whose arity matches and
/// whose parameters accept `arguments` pairwise.
///
/// When no candidate fits, the error quotes the best match: the last
/// candidate seen, or the one whose arity matched but whose types did
/// not.
pub(crate) fn find_method(
    program: &mut Program,
    ty: TypeId,
    name: &str,
    arguments: &[TypeId],
) -> Result<ResolvedCall, ErrorKind> {
    let candidates = available_methods(program, ty)
        .get(name)
        .cloned()
        .unwrap_or_default();
    let Some(&last) = candidates.last() else {
        return Err(ErrorKind::MethodNotFound {
            name: name.into(),
            on: program.get_type(ty).name.clone(),
        });
    };
    let mut best = last;
    for candidate in candidates {
        let method = &program.get_type(candidate.owner).methods[candidate.index];
        if arguments.len() < method.required_parameters()
            || arguments.len() > method.parameters.len()
        {
            continue;
        }
        let compatible = method
            .parameters
            .iter()
            .zip(arguments)
            .all(|(parameter, &argument)| {
                is_compatible(program, argument, parameter.declared_type)
            });
        if compatible {
            return Ok(ResolvedCall {
                method: candidate,
                return_type: method.return_type,
            });
        }
        best = candidate;
    }
    Err(ErrorKind::ArgumentsDoNotMatchMethodParameters {
        arguments: render_argument_types(program, arguments),
        method: method_signature(program, best),
    })
}

/// Resolves a binary operator as a method on the left operand's type,
/// falling back to `BinaryOperator`.
pub(crate) fn find_binary_method(
    program: &mut Program,
    left: TypeId,
    operator: &str,
    right: TypeId,
) -> Result<ResolvedCall, ErrorKind> {
    let target = unwrap_mutable(program, left);
    match find_method(program, target, operator, &[right]) {
        Ok(resolved) => Ok(resolved),
        Err(ErrorKind::MethodNotFound { .. }) => {
            let fallback = program.base_type("BinaryOperator");
            find_method(program, fallback, operator, &[right]).map_err(|_| {
                ErrorKind::MethodNotFound {
                    name: operator.into(),
                    on: program.get_type(left).name.clone(),
                }
            })
        }
        Err(other) => Err(other),
    }
}

/// The element type produced when iterating `iterable`, `None` when the
/// type cannot be iterated.
#[must_use]
pub fn element_type(program: &Program, iterable: TypeId) -> Option<TypeId> {
    let iterable = unwrap_mutable(program, iterable);
    if iterable == program.base_type("Range") {
        return Some(program.base_type("Number"));
    }
    let origin = program.get_type(iterable).generic_origin.as_ref()?;
    (origin.generic == program.base_type("List")).then(|| origin.arguments[0])
}

/// Renders a method head for diagnostics, e.g.
/// `from(start Number, end Number)`.
pub(crate) fn method_signature(program: &Program, method: MethodRef) -> EcoString {
    let data = &program.get_type(method.owner).methods[method.index];
    let mut signature = eco_format!("{}.{}", program.get_type(method.owner).name, data.name);
    if !data.parameters.is_empty() {
        signature.push('(');
        for (i, parameter) in data.parameters.iter().enumerate() {
            if i > 0 {
                signature.push_str(", ");
            }
            signature.push_str(&eco_format!(
                "{} {}",
                parameter.name,
                program.get_type(parameter.declared_type).name
            ));
        }
        signature.push(')');
    }
    signature
}

fn render_argument_types(program: &Program, arguments: &[TypeId]) -> EcoString {
    let mut rendered = EcoString::from("(");
    for (i, &argument) in arguments.iter().enumerate() {
        if i > 0 {
            rendered.push_str(", ");
        }
        rendered.push_str(&program.get_type(argument).name);
    }
    rendered.push(')');
    rendered
}
