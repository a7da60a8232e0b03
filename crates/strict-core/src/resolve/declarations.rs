// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Resolution of raw declarations into the type arena.
//!
//! Runs after every type of a load has been registered as a stub, so
//! declarations may reference types in any order. Member and parameter
//! types resolve from an explicit annotation, from the name itself when it
//! spells a type (`number` → `Number`, `numbers` → `Numbers`), or from the
//! initializer's type.
//!
//! Trait completeness is checked in a second pass
//! ([`check_trait_contracts`]) once every type of the batch knows whether
//! it is a trait.

use ecow::EcoString;

use crate::error::{ErrorKind, ErrorScope, ParseError, Result};
use crate::expression::parser::ExpressionParser;
use crate::package::{Program, TypeId};
use crate::parse::signature::{RawParameter, parse_signature};
use crate::parse::{RawMethod, RawType};
use crate::resolve::{self, is_compatible, mutable_underlying, resolve_type_name};
use crate::types::{Member, Method, Parameter, SourceLine};

/// Cross-type checks deferred until a whole batch has resolved.
#[derive(Debug, Clone)]
pub(crate) struct PendingChecks {
    id: TypeId,
    implements: Vec<(TypeId, SourceLine)>,
}

/// Resolves `raw` into the stub registered as `id`.
pub(crate) fn resolve_type(
    program: &mut Program,
    id: TypeId,
    raw: RawType,
) -> Result<PendingChecks> {
    let scope = ErrorScope::new(raw.name.clone());
    resolve_imports(program, id, &raw, &scope)?;
    let implements = resolve_implements(program, id, &raw, &scope)?;
    for line in &raw.members {
        let member = resolve_member(program, id, line, &scope)?;
        program.get_type_mut(id).members.push(member);
    }
    for raw_method in &raw.methods {
        let method = resolve_method(program, id, raw_method, &scope)?;
        program.get_type_mut(id).methods.push(method);
    }
    derive_flags(program, id);
    check_local_contracts(program, id, &raw, &scope)?;
    Ok(PendingChecks { id, implements })
}

fn resolve_imports(
    program: &mut Program,
    id: TypeId,
    raw: &RawType,
    scope: &ErrorScope,
) -> Result<()> {
    let mut imports = Vec::new();
    for line in &raw.imports {
        let name = line
            .content()
            .strip_prefix("import")
            .map(str::trim_start)
            .unwrap_or_default();
        let package = program
            .find_package(name)
            .filter(|&found| found != program.root())
            .ok_or_else(|| {
                scope.at(line.number, &line.text, ErrorKind::PackageNotFound(name.into()))
            })?;
        imports.push(package);
    }
    program.get_type_mut(id).imports = imports;
    Ok(())
}

fn resolve_implements(
    program: &mut Program,
    id: TypeId,
    raw: &RawType,
    scope: &ErrorScope,
) -> Result<Vec<(TypeId, SourceLine)>> {
    let package = program.get_type(id).package;
    let mut implements = Vec::new();
    for line in &raw.implements {
        let name = line
            .content()
            .strip_prefix("implement")
            .map(str::trim_start)
            .unwrap_or_default();
        if name == "Any" {
            return Err(scope.at(line.number, &line.text, ErrorKind::ImplementAnyForbidden));
        }
        let implemented = resolve::find_type(program, package, Some(id), name)
            .ok_or_else(|| {
                scope.at(line.number, &line.text, ErrorKind::TypeNotFound(name.into()))
            })?;
        program.get_type_mut(id).implements.push(implemented);
        implements.push((implemented, line.clone()));
    }
    Ok(implements)
}

/// Resolves one `has` line.
fn resolve_member(
    program: &mut Program,
    id: TypeId,
    line: &SourceLine,
    scope: &ErrorScope,
) -> Result<Member> {
    let fail = |kind: ErrorKind| scope.at(line.number, &line.text, kind);
    let rest = line
        .content()
        .strip_prefix("has ")
        .ok_or_else(|| fail(ErrorKind::UnexpectedToken("has".into())))?;
    let (declaration, initializer_text) = match rest.split_once(" = ") {
        Some((declaration, initializer)) => (declaration, Some(initializer)),
        None => (rest, None),
    };
    let (name_text, type_text) = match declaration.split_once(' ') {
        Some((name, annotation)) => (name, Some(annotation)),
        None => (declaration, None),
    };
    if name_text.is_empty() || !name_text.chars().all(char::is_alphabetic) {
        return Err(fail(ErrorKind::InvalidParameter(name_text.into())));
    }
    let package = program.get_type(id).package;

    // A member may be named after its type directly: `has Log`.
    let (name, aliased) = if name_text.starts_with(char::is_uppercase) {
        let aliased = resolve::find_type(program, package, Some(id), name_text)
            .ok_or_else(|| fail(ErrorKind::TypeNotFound(name_text.into())))?;
        (lowercase_first(name_text), Some(aliased))
    } else {
        (
            EcoString::from(name_text),
            resolve::find_type(program, package, Some(id), &capitalize_first(name_text)),
        )
    };

    let initializer = match initializer_text {
        Some(text) => Some(
            ExpressionParser::for_declarations(program, id)
                .parse_member_initializer(line, text)?,
        ),
        None => None,
    };

    let declared_type = if let Some(text) = type_text {
        let resolved = resolve_type_name(program, package, Some(id), text).map_err(&fail)?;
        if let Some(initializer) = &initializer {
            if !is_compatible(program, initializer.return_type, resolved) {
                return Err(fail(ErrorKind::IncompatibleReassignment {
                    name: name.clone(),
                    expected: program.get_type(resolved).name.clone(),
                    found: program.get_type(initializer.return_type).name.clone(),
                }));
            }
        }
        resolved
    } else if let Some(aliased) = aliased {
        aliased
    } else if let Some(initializer) = &initializer {
        initializer.return_type
    } else {
        return Err(fail(ErrorKind::TypeNotFound(capitalize_first(name_text))));
    };

    let is_mutable = mutable_underlying(program, declared_type).is_some();
    Ok(Member {
        name,
        declared_type,
        initializer,
        is_mutable,
    })
}

fn resolve_method(
    program: &mut Program,
    id: TypeId,
    raw: &RawMethod,
    scope: &ErrorScope,
) -> Result<Method> {
    let signature = parse_signature(&raw.signature, scope)?;
    let line = &raw.signature;
    let fail = |kind: ErrorKind| scope.at(line.number, &line.text, kind);
    let package = program.get_type(id).package;
    let any = program.base_type("Any");

    let mut parameters: Vec<Parameter> = Vec::new();
    for raw_parameter in &signature.parameters {
        if parameters
            .iter()
            .any(|parameter| parameter.name == raw_parameter.name)
        {
            return Err(fail(ErrorKind::DuplicateVariable(raw_parameter.name.clone())));
        }
        let parameter = resolve_parameter(program, id, raw_parameter, &fail)?;
        if resolve::unwrap_mutable(program, parameter.declared_type) == any {
            return Err(fail(ErrorKind::ParameterTypeAnyForbidden(
                raw_parameter.name.clone(),
            )));
        }
        parameters.push(parameter);
    }

    let return_type = match &signature.return_text {
        Some(text) => {
            let resolved = resolve_type_name(program, package, Some(id), text).map_err(&fail)?;
            if resolved == any {
                return Err(fail(ErrorKind::ReturnTypeAnyForbidden));
            }
            resolved
        }
        None if signature.name == "from" => id,
        None => program.base_type("None"),
    };

    Ok(Method {
        name: signature.name.clone(),
        parameters,
        return_type,
        is_public: signature.is_public,
        lines: raw.lines.clone(),
        body: None,
    })
}

fn resolve_parameter(
    program: &mut Program,
    id: TypeId,
    raw: &RawParameter,
    fail: &impl Fn(ErrorKind) -> ParseError,
) -> Result<Parameter> {
    let package = program.get_type(id).package;
    let default_value = match &raw.default_text {
        Some(text) => Some(
            ExpressionParser::for_declarations(program, id)
                .parse_default_value(text)
                .map_err(|error| fail(error.kind))?,
        ),
        None => None,
    };
    let declared_type = if let Some(text) = &raw.type_text {
        let resolved = resolve_type_name(program, package, Some(id), text).map_err(fail)?;
        if let Some(default) = &default_value {
            if !is_compatible(program, default.return_type, resolved) {
                return Err(fail(ErrorKind::IncompatibleReassignment {
                    name: raw.name.clone(),
                    expected: program.get_type(resolved).name.clone(),
                    found: program.get_type(default.return_type).name.clone(),
                }));
            }
        }
        resolved
    } else if let Some(aliased) =
        resolve::find_type(program, package, Some(id), &capitalize_first(&raw.name))
    {
        aliased
    } else if let Some(default) = &default_value {
        default.return_type
    } else {
        return Err(fail(ErrorKind::TypeNotFound(capitalize_first(&raw.name))));
    };
    Ok(Parameter {
        name: raw.name.clone(),
        declared_type,
        is_mutable: raw.is_mutable,
        default_value,
    })
}

/// Derives the trait and generic flags once members and methods are in.
fn derive_flags(program: &mut Program, id: TypeId) {
    let generic = program.base_type("Generic");
    let data = program.get_type_mut(id);
    data.is_trait =
        data.implements.is_empty() && data.members.is_empty() && data.name != "Number";
    data.is_generic = data
        .members
        .iter()
        .any(|member| member.declared_type == generic)
        || data.methods.iter().any(|method| {
            method.return_type == generic
                || method
                    .parameters
                    .iter()
                    .any(|parameter| parameter.declared_type == generic)
        });
}

/// Checks the contracts that only need this type: body presence and the
/// minimum declaration rule.
fn check_local_contracts(
    program: &Program,
    id: TypeId,
    raw: &RawType,
    scope: &ErrorScope,
) -> Result<()> {
    let data = program.get_type(id);
    for (method, raw_method) in data.methods.iter().zip(&raw.methods) {
        let line = &raw_method.signature;
        if data.is_trait && !method.lines.is_empty() {
            return Err(scope.at(
                line.number,
                &line.text,
                ErrorKind::TraitMethodMustNotHaveBody(method.name.clone()),
            ));
        }
        if !data.is_trait && method.lines.is_empty() {
            return Err(scope.at(
                line.number,
                &line.text,
                ErrorKind::MethodMustHaveBody(method.name.clone()),
            ));
        }
    }
    if !data.is_trait
        && data.methods.is_empty()
        && data.members.len() + data.implements.len() < 2
    {
        return Err(scope.file(ErrorKind::IncompleteType));
    }
    Ok(())
}

/// Verifies that every implemented trait's methods (except `from`) exist
/// on the implementer. Run after the whole batch resolved so trait flags
/// are final.
pub(crate) fn check_trait_contracts(program: &Program, pending: &PendingChecks) -> Result<()> {
    let data = program.get_type(pending.id);
    let scope = ErrorScope::new(data.name.clone());
    for (implemented, line) in &pending.implements {
        let trait_data = program.get_type(*implemented);
        if !trait_data.is_trait {
            continue;
        }
        for method in &trait_data.methods {
            if method.name == "from" {
                continue;
            }
            if data.find_method_index(&method.name).is_none() {
                return Err(scope.at(
                    line.number,
                    &line.text,
                    ErrorKind::TraitMethodNotImplemented {
                        trait_name: trait_data.name.clone(),
                        method: method.name.clone(),
                    },
                ));
            }
        }
    }
    Ok(())
}

fn capitalize_first(name: &str) -> EcoString {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return EcoString::new();
    };
    let mut capitalized = EcoString::new();
    for c in first.to_uppercase() {
        capitalized.push(c);
    }
    capitalized.push_str(chars.as_str());
    capitalized
}

fn lowercase_first(name: &str) -> EcoString {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return EcoString::new();
    };
    let mut lowered = EcoString::new();
    for c in first.to_lowercase() {
        lowered.push(c);
    }
    lowered.push_str(chars.as_str());
    lowered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn program_with_package() -> (Program, crate::package::PackageId) {
        let mut program = Program::new();
        let package = program.add_package(program.root(), "Demo", "Demo".into());
        (program, package)
    }

    #[test]
    fn member_type_aliases_from_the_name() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(package, "Counter", "has number\nRun Number\n\tnumber")
            .unwrap();
        let data = program.get_type(id);
        assert_eq!(data.members.len(), 1);
        assert_eq!(data.members[0].name, "number");
        assert_eq!(data.members[0].declared_type, program.base_type("Number"));
    }

    #[test]
    fn plural_member_name_becomes_a_list() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(package, "Stats", "has numbers\nRun Number\n\tnumbers.Length")
            .unwrap();
        let member = &program.get_type(id).members[0];
        assert_eq!(program.get_type(member.declared_type).name, "Numbers");
    }

    #[test]
    fn member_type_inferred_from_initializer() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(package, "Counter", "has limit = 100\nRun Number\n\tlimit")
            .unwrap();
        let member = &program.get_type(id).members[0];
        assert_eq!(member.declared_type, program.base_type("Number"));
        assert!(member.initializer.is_some());
    }

    #[test]
    fn uppercase_member_names_its_own_type() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(package, "App", "has Log\nRun Number\n\t5")
            .unwrap();
        let member = &program.get_type(id).members[0];
        assert_eq!(member.name, "log");
        assert_eq!(member.declared_type, program.base_type("Log"));
    }

    #[test]
    fn mutable_typed_member_is_mutable() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(
                package,
                "Counter",
                "has counter Mutable(Number)\nRun Number\n\t5",
            )
            .unwrap();
        let member = &program.get_type(id).members[0];
        assert!(member.is_mutable);
    }

    #[test]
    fn from_defaults_to_the_owning_type() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(package, "Point", "has number\nfrom(number)\n\tnumber")
            .unwrap();
        let data = program.get_type(id);
        let from = &data.methods[data.find_method_index("from").unwrap()];
        assert_eq!(from.return_type, id);
    }

    #[test]
    fn missing_return_type_defaults_to_none() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(package, "Greeter", "has log\nGreet\n\tlog.Write(\"hi\")")
            .unwrap();
        let data = program.get_type(id);
        assert_eq!(data.methods[0].return_type, program.base_type("None"));
    }

    #[test]
    fn any_parameter_is_rejected() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_type_source(package, "Bad", "has number\nRun(value Any) Number\n\t5")
            .unwrap_err();
        assert_eq!(error.category(), ErrorCategory::SignatureError);
    }

    #[test]
    fn any_return_type_is_rejected() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_type_source(package, "Bad", "has number\nRun Any\n\t5")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::ReturnTypeAnyForbidden);
    }

    #[test]
    fn implement_any_is_rejected() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_type_source(package, "Bad", "implement Any\nhas number\nRun Number\n\t5")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::ImplementAnyForbidden);
    }

    #[test]
    fn unknown_import_is_rejected() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_type_source(package, "Bad", "import Missing\nhas number\nRun Number\n\t5")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::PackageNotFound("Missing".into()));
    }

    #[test]
    fn trait_is_derived_from_missing_members_and_implements() {
        let (mut program, package) = program_with_package();
        let id = program
            .add_type_source(package, "HasLength", "Length Number")
            .unwrap();
        assert!(program.get_type(id).is_trait);
    }

    #[test]
    fn trait_method_with_body_is_rejected() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_type_source(package, "HasLength", "Length Number\n\t5")
            .unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::TraitMethodMustNotHaveBody("Length".into())
        );
    }

    #[test]
    fn non_trait_method_without_body_is_rejected() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_type_source(package, "Counter", "has number\nRun Number")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::MethodMustHaveBody("Run".into()));
    }

    #[test]
    fn type_with_single_member_and_no_methods_is_incomplete() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_type_source(package, "Lonely", "has number")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::IncompleteType);
    }

    #[test]
    fn missing_trait_method_is_rejected() {
        let (mut program, package) = program_with_package();
        let error = program
            .add_types(
                package,
                &[
                    ("HasLength", "Length Number"),
                    ("Word", "implement HasLength\nhas text\nRun Number\n\t5"),
                ],
            )
            .unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::TraitMethodNotImplemented {
                trait_name: "HasLength".into(),
                method: "Length".into(),
            }
        );
        assert_eq!(error.category(), ErrorCategory::TraitContract);
    }

    #[test]
    fn implemented_trait_method_satisfies_the_contract() {
        let (mut program, package) = program_with_package();
        let ids = program
            .add_types(
                package,
                &[
                    ("HasLength", "Length Number"),
                    (
                        "Word",
                        "implement HasLength\nhas text\nLength Number\n\ttext.Length",
                    ),
                ],
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(!program.get_type(ids[1]).is_trait);
    }
}
