// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Method signature parsing.
//!
//! A method head is parsed without looking at its body: the name (a word,
//! a recognized operator, or the composite `is not`), the parameter list,
//! and the optional return type. Types mentioned here are kept as text and
//! resolved later against the type arena.

use ecow::EcoString;

use crate::error::{ErrorKind, ErrorScope, ParseError, Result};
use crate::limits;
use crate::types::SourceLine;

/// Operator tokens that may be used as method names.
const OPERATOR_NAMES: &[&str] = &[
    "+", "-", "*", "/", "%", "<", ">", "<=", ">=", "is", "is not", "and", "or", "not",
];

/// A parsed method head, types still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawSignature {
    pub name: EcoString,
    pub is_public: bool,
    pub parameters: Vec<RawParameter>,
    pub return_text: Option<EcoString>,
}

/// One parameter declaration, types still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawParameter {
    pub is_mutable: bool,
    pub name: EcoString,
    pub type_text: Option<EcoString>,
    pub default_text: Option<EcoString>,
}

/// Parses the head line of a method.
pub(crate) fn parse_signature(line: &SourceLine, scope: &ErrorScope) -> Result<RawSignature> {
    let content = line.content();
    let fail = |kind: ErrorKind| -> ParseError { scope.at(line.number, &line.text, kind) };

    let (name, rest) = split_name(content).ok_or_else(|| {
        fail(ErrorKind::InvalidMethodName(first_token(content).into()))
    })?;
    let is_public = name.chars().next().is_some_and(char::is_uppercase);

    let mut parameters = Vec::new();
    let mut return_text = None;
    if let Some(rest) = rest.strip_prefix('(') {
        let close = matching_paren(rest)
            .ok_or_else(|| fail(ErrorKind::InvalidMethodName(content.into())))?;
        let inside = &rest[..close];
        if inside.is_empty() {
            return Err(fail(ErrorKind::EmptyParameters));
        }
        for text in split_top_level(inside) {
            parameters.push(parse_parameter(text.trim(), &fail)?);
        }
        limits::check_parameter_count(parameters.len()).map_err(&fail)?;
        let after = &rest[close + 1..];
        if let Some(after) = after.strip_prefix(' ') {
            return_text = Some(after.into());
        } else if !after.is_empty() {
            return Err(fail(ErrorKind::InvalidMethodName(content.into())));
        }
    } else if let Some(rest) = rest.strip_prefix(' ') {
        return_text = Some(rest.into());
    } else if !rest.is_empty() {
        return Err(fail(ErrorKind::InvalidMethodName(first_token(content).into())));
    }

    Ok(RawSignature {
        name: name.into(),
        is_public,
        parameters,
        return_text,
    })
}

/// Splits the method name off the front of the line.
///
/// Returns `None` when the leading characters form neither a word nor a
/// recognized operator.
fn split_name(content: &str) -> Option<(&str, &str)> {
    if content.starts_with(char::is_alphabetic) {
        let end = content
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(content.len());
        let (word, rest) = content.split_at(end);
        // `is not` is the one two-word method name.
        if word == "is" {
            if let Some(after) = rest.strip_prefix(" not") {
                if after.is_empty() || after.starts_with('(') || after.starts_with(' ') {
                    return Some((&content[..6], after));
                }
            }
        }
        Some((word, rest))
    } else {
        let end = content
            .find(|c: char| !"+-*/%<>=".contains(c))
            .unwrap_or(content.len());
        if end == 0 {
            return None;
        }
        let (operator, rest) = content.split_at(end);
        OPERATOR_NAMES
            .contains(&operator)
            .then_some((operator, rest))
    }
}

fn parse_parameter(
    text: &str,
    fail: &impl Fn(ErrorKind) -> ParseError,
) -> Result<RawParameter> {
    if text.is_empty() {
        return Err(fail(ErrorKind::InvalidParameter(text.into())));
    }
    let (is_mutable, text) = match text.strip_prefix("mutable ") {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (declaration, default_text) = match text.split_once(" = ") {
        Some((declaration, default)) => (declaration, Some(EcoString::from(default))),
        None => (text, None),
    };
    let (name, type_text) = match declaration.split_once(' ') {
        Some((name, type_text)) => (name, Some(EcoString::from(type_text))),
        None => (declaration, None),
    };
    if name.is_empty() || !name.chars().all(char::is_alphabetic) {
        return Err(fail(ErrorKind::InvalidParameter(text.into())));
    }
    if !name.starts_with(char::is_lowercase) {
        return Err(fail(ErrorKind::ParameterMustStartLowercase(name.into())));
    }
    Ok(RawParameter {
        is_mutable,
        name: name.into(),
        type_text,
        default_text,
    })
}

/// Byte offset of the parenthesis closing the one already consumed.
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(offset),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Splits on commas outside nested parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (offset, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..offset]);
                start = offset + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn first_token(content: &str) -> &str {
    content.split([' ', '(']).next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<RawSignature> {
        parse_signature(&SourceLine::new(2, text), &ErrorScope::new("Counter"))
    }

    #[test]
    fn name_and_return_type() {
        let signature = parse("CountNumber Number").unwrap();
        assert_eq!(signature.name, "CountNumber");
        assert!(signature.is_public);
        assert!(signature.parameters.is_empty());
        assert_eq!(signature.return_text.as_deref(), Some("Number"));
    }

    #[test]
    fn name_only_defaults_return() {
        let signature = parse("Run").unwrap();
        assert_eq!(signature.name, "Run");
        assert_eq!(signature.return_text, None);
    }

    #[test]
    fn constructor_with_untyped_parameter() {
        let signature = parse("from(number)").unwrap();
        assert_eq!(signature.name, "from");
        assert!(!signature.is_public);
        assert_eq!(signature.parameters.len(), 1);
        assert_eq!(signature.parameters[0].name, "number");
        assert_eq!(signature.parameters[0].type_text, None);
    }

    #[test]
    fn operator_method_names() {
        let signature = parse("+(other) Number").unwrap();
        assert_eq!(signature.name, "+");
        assert_eq!(signature.return_text.as_deref(), Some("Number"));

        let signature = parse("is not(other) Boolean").unwrap();
        assert_eq!(signature.name, "is not");
        assert_eq!(signature.parameters.len(), 1);
    }

    #[test]
    fn typed_mutable_and_default_parameters() {
        let signature = parse("Add(mutable list, start Number, end = 10)").unwrap();
        assert_eq!(signature.parameters.len(), 3);
        assert!(signature.parameters[0].is_mutable);
        assert_eq!(signature.parameters[1].type_text.as_deref(), Some("Number"));
        assert_eq!(signature.parameters[2].default_text.as_deref(), Some("10"));
    }

    #[test]
    fn empty_parentheses_are_rejected() {
        let error = parse("Run()").unwrap_err();
        assert_eq!(error.kind, ErrorKind::EmptyParameters);
    }

    #[test]
    fn four_parameters_are_rejected() {
        let error = parse("Run(a, b, c, d)").unwrap_err();
        assert_eq!(error.kind, ErrorKind::TooManyParameters(4));
    }

    #[test]
    fn three_parameters_are_accepted() {
        assert!(parse("Run(a Number, b Number, c Number)").is_ok());
    }

    #[test]
    fn uppercase_parameter_is_rejected() {
        let error = parse("Run(Count Number)").unwrap_err();
        assert_eq!(
            error.kind,
            ErrorKind::ParameterMustStartLowercase("Count".into())
        );
    }

    #[test]
    fn digits_in_method_name_are_rejected() {
        let error = parse("Run5 Number").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidMethodName("Run5".into()));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let error = parse("**(other)").unwrap_err();
        assert!(matches!(error.kind, ErrorKind::InvalidMethodName(_)));
    }
}
