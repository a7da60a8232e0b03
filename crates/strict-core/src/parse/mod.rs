// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Line-oriented parsing of type source files.
//!
//! The language has no token stream at the file level: the first word of a
//! line determines what it declares, indentation is semantic, and the
//! declaration order `import` → `implement` → `has` → methods is fixed.
//! This module validates the whitespace rules and splits a file into its
//! raw declarations; resolving them against the type arena happens in
//! [`crate::resolve::declarations`], and method bodies stay unparsed until
//! first access.

use ecow::EcoString;

use crate::error::{ErrorKind, ErrorScope, Result};
use crate::limits;
use crate::types::SourceLine;

pub(crate) mod body;
pub(crate) mod signature;

/// A type file split into raw declarations, not yet resolved.
#[derive(Debug, Clone)]
pub(crate) struct RawType {
    pub name: EcoString,
    /// `import` lines, in order.
    pub imports: Vec<SourceLine>,
    /// `implement` lines, in order.
    pub implements: Vec<SourceLine>,
    /// `has` lines, in order.
    pub members: Vec<SourceLine>,
    /// Method signature lines with their raw body lines.
    pub methods: Vec<RawMethod>,
}

/// A method before signature parsing: its head line and body lines.
#[derive(Debug, Clone)]
pub(crate) struct RawMethod {
    pub signature: SourceLine,
    pub lines: Vec<SourceLine>,
}

/// The declaration sections of a type file, in their mandatory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Imports,
    Implements,
    Members,
    Methods,
}

/// Validates the whitespace rules for a single line.
///
/// Lines must be non-empty, at most 120 characters, free of leading or
/// trailing spaces, and indented with tabs only.
pub(crate) fn validate_line(line: &SourceLine) -> std::result::Result<(), ErrorKind> {
    if line.text.is_empty() {
        return Err(ErrorKind::EmptyLine);
    }
    limits::check_line_length(line.text.chars().count())?;
    if line.text.starts_with(' ') {
        return Err(ErrorKind::LeadingSpaces);
    }
    if line.content().starts_with(' ') {
        // Tabs followed by spaces is still space indentation.
        return Err(ErrorKind::LeadingSpaces);
    }
    if line.text.ends_with(' ') || line.text.ends_with('\t') {
        return Err(ErrorKind::TrailingWhitespace);
    }
    Ok(())
}

/// Splits `source` into validated raw declarations for a type named
/// `name`.
pub(crate) fn parse_type_declarations(name: &str, source: &str) -> Result<RawType> {
    let scope = ErrorScope::new(name);
    let lines = split_lines(source);
    scope_check(&scope, limits::check_line_count(lines.len()))?;

    let mut raw = RawType {
        name: name.into(),
        imports: Vec::new(),
        implements: Vec::new(),
        members: Vec::new(),
        methods: Vec::new(),
    };
    let mut section = Section::Imports;
    for line in lines {
        if let Err(kind) = validate_line(&line) {
            return Err(scope.at(line.number, &line.text, kind));
        }
        if line.tabs() > 0 {
            let Some(method) = raw.methods.last_mut() else {
                return Err(scope.at(
                    line.number,
                    &line.text,
                    ErrorKind::InvalidIndentation { tabs: line.tabs() },
                ));
            };
            method.lines.push(line);
            continue;
        }
        match first_word(line.content()) {
            "import" => {
                if section > Section::Imports {
                    return Err(scope.at(line.number, &line.text, ErrorKind::MisplacedImport));
                }
                raw.imports.push(line);
            }
            "implement" => {
                if section > Section::Implements {
                    return Err(scope.at(line.number, &line.text, ErrorKind::MisplacedImplement));
                }
                section = Section::Implements;
                raw.implements.push(line);
            }
            "has" => {
                if section > Section::Members {
                    return Err(scope.at(line.number, &line.text, ErrorKind::MisplacedMember));
                }
                section = Section::Members;
                let line_number = line.number;
                let line_text = line.text.clone();
                raw.members.push(line);
                if let Err(kind) = limits::check_member_count(raw.members.len()) {
                    return Err(scope.at(line_number, &line_text, kind));
                }
            }
            _ => {
                section = Section::Methods;
                raw.methods.push(RawMethod {
                    signature: line,
                    lines: Vec::new(),
                });
                if let Err(kind) = limits::check_method_count(raw.methods.len()) {
                    let signature = &raw.methods.last().expect("just pushed").signature;
                    return Err(scope.at(signature.number, &signature.text, kind));
                }
            }
        }
    }
    for method in &raw.methods {
        if let Err(kind) = limits::check_method_body_lines(method.lines.len()) {
            return Err(scope.at(method.signature.number, &method.signature.text, kind));
        }
    }
    Ok(raw)
}

/// Splits source text into numbered lines, accepting LF and CRLF endings
/// and ignoring a single trailing newline.
fn split_lines(source: &str) -> Vec<SourceLine> {
    let mut lines: Vec<SourceLine> = source
        .split('\n')
        .enumerate()
        .map(|(i, text)| SourceLine::new(i + 1, text.strip_suffix('\r').unwrap_or(text)))
        .collect();
    if lines.last().is_some_and(|line| line.text.is_empty()) {
        lines.pop();
    }
    lines
}

/// The first space-delimited word of a line.
fn first_word(content: &str) -> &str {
    content.split(' ').next().unwrap_or_default()
}

fn scope_check(scope: &ErrorScope, check: std::result::Result<(), ErrorKind>) -> Result<()> {
    check.map_err(|kind| scope.file(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn splits_declarations_into_sections() {
        let raw = parse_type_declarations(
            "Counter",
            "import Math\nimplement HasLength\nhas number\nLength Number\n\tnumber",
        )
        .unwrap();
        assert_eq!(raw.imports.len(), 1);
        assert_eq!(raw.implements.len(), 1);
        assert_eq!(raw.members.len(), 1);
        assert_eq!(raw.methods.len(), 1);
        assert_eq!(raw.methods[0].lines.len(), 1);
    }

    #[test]
    fn rejects_import_after_member() {
        let error =
            parse_type_declarations("Counter", "has number\nimport Math").unwrap_err();
        assert_eq!(error.kind, ErrorKind::MisplacedImport);
        assert_eq!(error.context.line_number, 2);
    }

    #[test]
    fn rejects_member_after_method() {
        let error = parse_type_declarations("Counter", "Length Number\n\t5\nhas number")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::MisplacedMember);
    }

    #[test]
    fn rejects_empty_lines() {
        let error = parse_type_declarations("Counter", "has number\n\nLength Number\n\t5")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::EmptyLine);
        assert_eq!(error.context.line_number, 2);
    }

    #[test]
    fn rejects_space_indentation() {
        let error =
            parse_type_declarations("Counter", "Length Number\n  5").unwrap_err();
        assert_eq!(error.kind, ErrorKind::LeadingSpaces);
    }

    #[test]
    fn rejects_tabs_followed_by_spaces() {
        let error =
            parse_type_declarations("Counter", "Length Number\n\t 5").unwrap_err();
        assert_eq!(error.kind, ErrorKind::LeadingSpaces);
    }

    #[test]
    fn rejects_trailing_whitespace() {
        let error = parse_type_declarations("Counter", "has number \nLength Number\n\t5")
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::TrailingWhitespace);
    }

    #[test]
    fn rejects_indented_line_before_any_method() {
        let error = parse_type_declarations("Counter", "\tnumber").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidIndentation { tabs: 1 });
    }

    #[test]
    fn accepts_crlf_line_endings() {
        let raw =
            parse_type_declarations("Counter", "has number\r\nLength Number\r\n\tnumber\r\n")
                .unwrap();
        assert_eq!(raw.members.len(), 1);
        assert_eq!(raw.methods[0].lines[0].text, "\tnumber");
    }

    #[test]
    fn line_longer_than_limit_is_rejected() {
        let too_long = "x".repeat(121);
        let error = parse_type_declarations("Counter", &too_long).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::LimitExceeded);
        assert_eq!(error.kind, ErrorKind::LineTooLong(121));
    }

    #[test]
    fn thirteen_body_lines_are_rejected() {
        let mut source = String::from("has number\nRun Number\n");
        for _ in 0..13 {
            source.push_str("\tnumber\n");
        }
        let error = parse_type_declarations("Counter", &source).unwrap_err();
        assert_eq!(error.kind, ErrorKind::MethodBodyTooLong(13));
    }

    #[test]
    fn twelve_body_lines_are_accepted() {
        let mut source = String::from("has number\nRun Number\n");
        for _ in 0..12 {
            source.push_str("\tnumber\n");
        }
        assert!(parse_type_declarations("Counter", &source).is_ok());
    }
}
