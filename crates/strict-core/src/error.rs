// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Error types for the Strict front-end.
//!
//! Every failure is a [`ParseError`]: a [`ErrorKind`] describing what went
//! wrong plus an [`ErrorContext`] locating it (type, line number, line text,
//! and the enclosing method if any). Parse errors are fatal for the file
//! they occur in; nothing is caught or retried inside the parser.
//!
//! Errors integrate with [`miette`] for rich reporting in consumers.

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ParseError>;

/// A parsing or resolution failure, fatal for the enclosing file.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
#[error("{kind}{context}")]
#[diagnostic(code(strict::parse))]
pub struct ParseError {
    /// What went wrong.
    #[source]
    pub kind: ErrorKind,
    /// Where it went wrong.
    pub context: ErrorContext,
}

impl ParseError {
    /// Creates an error from a kind and its source context.
    #[must_use]
    pub fn new(kind: ErrorKind, context: ErrorContext) -> Self {
        Self { kind, context }
    }

    /// The coarse category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

/// Source location attached to every error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Name of the type whose file was being parsed (empty for loader errors).
    pub type_name: EcoString,
    /// 1-based line number within the file, 0 when no line applies.
    pub line_number: usize,
    /// The offending line text.
    pub line_text: EcoString,
    /// The enclosing method, when the error occurred inside one.
    pub method_name: Option<EcoString>,
}

impl ErrorContext {
    /// Creates a context for a line of a type's source file.
    #[must_use]
    pub fn new(
        type_name: impl Into<EcoString>,
        line_number: usize,
        line_text: impl Into<EcoString>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            line_number,
            line_text: line_text.into(),
            method_name: None,
        }
    }

    /// Attaches the enclosing method name.
    #[must_use]
    pub fn in_method(mut self, method_name: impl Into<EcoString>) -> Self {
        self.method_name = Some(method_name.into());
        self
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.type_name.is_empty() {
            write!(f, " in {}", self.type_name)?;
        }
        if let Some(method) = &self.method_name {
            write!(f, ".{method}")?;
        }
        if self.line_number > 0 {
            write!(f, " at line {}: {}", self.line_number, self.line_text)?;
        }
        Ok(())
    }
}

/// The coarse error taxonomy.
///
/// Each [`ErrorKind`] collapses into exactly one category; consumers that
/// only care about the class of failure match on this instead of the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad indentation, stray whitespace, ordering violations.
    SyntaxError,
    /// Invalid method names, parameter or return type rules.
    SignatureError,
    /// Type, member, method, or variable not found.
    NameResolution,
    /// Argument, condition, branch, or iterator type mismatches.
    TypeError,
    /// A hard structural limit was exceeded.
    LimitExceeded,
    /// Trait body/implementation contract violations.
    TraitContract,
    /// Generic parameters could not be instantiated.
    GenericError,
    /// Assignment to a non-mutable target.
    ImmutableViolation,
}

/// Everything that can go wrong, one message template per kind.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    // --- Syntax ---
    #[error("empty lines are not allowed")]
    EmptyLine,
    #[error("line starts with spaces, indentation must use tabs")]
    LeadingSpaces,
    #[error("line has trailing whitespace")]
    TrailingWhitespace,
    #[error("unexpected indentation of {tabs} tabs")]
    InvalidIndentation { tabs: usize },
    #[error("import must come before implement, members and methods")]
    MisplacedImport,
    #[error("implement must come before members and methods")]
    MisplacedImplement,
    #[error("members must come before methods")]
    MisplacedMember,
    #[error("implement Any is implicit and must not be written")]
    ImplementAnyForbidden,
    #[error("else without a matching if")]
    UnexpectedElse,
    #[error("expected an indented block after this line")]
    MissingIndentedBlock,
    #[error("unterminated text literal")]
    UnterminatedText,
    #[error("invalid number literal \"{0}\"")]
    InvalidNumber(EcoString),
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unexpected token \"{0}\"")]
    UnexpectedToken(EcoString),
    #[error("lists must not be empty")]
    EmptyList,
    #[error("conditional expressions cannot be nested")]
    NestedConditional,
    #[error("the package path \"{0}\" is reserved")]
    ReservedPath(EcoString),
    #[error("\"{0}\" is not a .strict file")]
    NotStrictFile(EcoString),
    #[error("cannot read \"{0}\"")]
    FileUnreadable(EcoString),

    // --- Signature ---
    #[error("\"{0}\" is not a valid method name")]
    InvalidMethodName(EcoString),
    #[error("empty parentheses are not allowed, omit them instead")]
    EmptyParameters,
    #[error("parameter \"{0}\" must start with a lowercase letter")]
    ParameterMustStartLowercase(EcoString),
    #[error("parameter \"{0}\" must not be of type Any")]
    ParameterTypeAnyForbidden(EcoString),
    #[error("methods must not return Any")]
    ReturnTypeAnyForbidden,
    #[error("\"{0}\" is not a valid parameter declaration")]
    InvalidParameter(EcoString),

    // --- Name resolution ---
    #[error("type \"{0}\" not found")]
    TypeNotFound(EcoString),
    #[error("package \"{0}\" not found")]
    PackageNotFound(EcoString),
    #[error("\"{0}\" is not a known variable, parameter, member or type")]
    UnknownIdentifier(EcoString),
    #[error("no method \"{name}\" on {on}")]
    MethodNotFound { name: EcoString, on: EcoString },
    #[error("no member \"{name}\" on {on}")]
    MemberNotFound { name: EcoString, on: EcoString },
    #[error("type \"{0}\" already exists in this package")]
    TypeAlreadyExists(EcoString),
    #[error("the loop variable index cannot be shadowed")]
    LoopIndexShadowed,

    // --- Type errors ---
    #[error("arguments {arguments} do not match {method}")]
    ArgumentsDoNotMatchMethodParameters {
        arguments: EcoString,
        method: EcoString,
    },
    #[error("cannot assign {found} to \"{name}\" of type {expected}")]
    IncompatibleReassignment {
        name: EcoString,
        expected: EcoString,
        found: EcoString,
    },
    #[error("if condition must be Boolean, found {0}")]
    ConditionMustBeBoolean(EcoString),
    #[error("conditional branches differ, then is {then} but else is {otherwise}")]
    ConditionalBranchMismatch {
        then: EcoString,
        otherwise: EcoString,
    },
    #[error("list elements must share a type, expected {expected} but found {found}")]
    ListElementTypeMismatch {
        expected: EcoString,
        found: EcoString,
    },
    #[error("{0} is not iterable")]
    NotIterable(EcoString),
    #[error("loop variable \"{name}\" of type {expected} cannot hold {found}")]
    LoopVariableMismatch {
        name: EcoString,
        expected: EcoString,
        found: EcoString,
    },
    #[error("body returns {found} which is not assignable to {expected}")]
    ReturnTypeMismatch {
        found: EcoString,
        expected: EcoString,
    },

    // --- Limits ---
    #[error("type has {0} members, the maximum is 50")]
    TooManyMembers(usize),
    #[error("type has {0} lines, the maximum is 256")]
    TooManyLines(usize),
    #[error("type has {0} methods, the maximum is 15")]
    TooManyMethods(usize),
    #[error("line is {0} characters long, the maximum is 120")]
    LineTooLong(usize),
    #[error("expression nests {0} levels deep, the maximum is 5")]
    NestingTooDeep(usize),
    #[error("method body has {0} lines, the maximum is 12")]
    MethodBodyTooLong(usize),
    #[error("method has {0} parameters, the maximum is 3")]
    TooManyParameters(usize),

    // --- Trait contract ---
    #[error("trait method \"{0}\" must not have a body")]
    TraitMethodMustNotHaveBody(EcoString),
    #[error("method \"{0}\" must have a body")]
    MethodMustHaveBody(EcoString),
    #[error("trait {trait_name} requires a \"{method}\" method")]
    TraitMethodNotImplemented {
        trait_name: EcoString,
        method: EcoString,
    },
    #[error("type needs at least one method, or two members or implements")]
    IncompleteType,

    // --- Generics ---
    #[error("\"{0}\" is not a generic type")]
    NotGeneric(EcoString),
    #[error("generic type \"{0}\" needs implementation types")]
    GenericArgumentsRequired(EcoString),

    // --- Immutability ---
    #[error("\"{0}\" is immutable and cannot be reassigned")]
    ImmutableReassignment(EcoString),
    #[error("variable \"{0}\" is already declared in this scope")]
    DuplicateVariable(EcoString),
    #[error("loop variable \"{0}\" exists but is not mutable")]
    ImmutableLoopVariable(EcoString),
}

impl ErrorKind {
    /// Collapses this kind into its taxonomy category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            EmptyLine | LeadingSpaces | TrailingWhitespace | InvalidIndentation { .. }
            | MisplacedImport | MisplacedImplement | MisplacedMember | ImplementAnyForbidden
            | UnexpectedElse | MissingIndentedBlock | UnterminatedText | InvalidNumber(_)
            | UnexpectedCharacter(_) | UnexpectedToken(_) | EmptyList | NestedConditional
            | ReservedPath(_) | NotStrictFile(_) | FileUnreadable(_) => ErrorCategory::SyntaxError,
            InvalidMethodName(_) | EmptyParameters | ParameterMustStartLowercase(_)
            | ParameterTypeAnyForbidden(_) | ReturnTypeAnyForbidden | InvalidParameter(_) => {
                ErrorCategory::SignatureError
            }
            TypeNotFound(_) | PackageNotFound(_) | UnknownIdentifier(_)
            | MethodNotFound { .. } | MemberNotFound { .. } | TypeAlreadyExists(_)
            | LoopIndexShadowed => ErrorCategory::NameResolution,
            ArgumentsDoNotMatchMethodParameters { .. } | IncompatibleReassignment { .. }
            | ConditionMustBeBoolean(_) | ConditionalBranchMismatch { .. }
            | ListElementTypeMismatch { .. } | NotIterable(_) | LoopVariableMismatch { .. }
            | ReturnTypeMismatch { .. } => ErrorCategory::TypeError,
            TooManyMembers(_) | TooManyLines(_) | TooManyMethods(_) | LineTooLong(_)
            | NestingTooDeep(_) | MethodBodyTooLong(_) | TooManyParameters(_) => {
                ErrorCategory::LimitExceeded
            }
            TraitMethodMustNotHaveBody(_) | MethodMustHaveBody(_)
            | TraitMethodNotImplemented { .. } | IncompleteType => ErrorCategory::TraitContract,
            NotGeneric(_) | GenericArgumentsRequired(_) => ErrorCategory::GenericError,
            ImmutableReassignment(_) | DuplicateVariable(_) | ImmutableLoopVariable(_) => {
                ErrorCategory::ImmutableViolation
            }
        }
    }
}

/// Shared context for raising errors while parsing one type's source.
///
/// Parsing code carries one of these instead of threading the type and
/// method names through every call.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorScope {
    pub type_name: EcoString,
    pub method_name: Option<EcoString>,
}

impl ErrorScope {
    pub fn new(type_name: impl Into<EcoString>) -> Self {
        Self {
            type_name: type_name.into(),
            method_name: None,
        }
    }

    pub fn in_method(type_name: impl Into<EcoString>, method_name: impl Into<EcoString>) -> Self {
        Self {
            type_name: type_name.into(),
            method_name: Some(method_name.into()),
        }
    }

    /// Raises `kind` at the given line.
    pub fn at(&self, line_number: usize, line_text: &str, kind: ErrorKind) -> ParseError {
        let mut context = ErrorContext::new(self.type_name.clone(), line_number, line_text);
        context.method_name = self.method_name.clone();
        ParseError::new(kind, context)
    }

    /// Raises `kind` with no particular line, for file level failures.
    pub fn file(&self, kind: ErrorKind) -> ParseError {
        self.at(0, "", kind)
    }
}
