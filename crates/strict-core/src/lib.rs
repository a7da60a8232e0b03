// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Strict language front-end.
//!
//! This crate takes `.strict` source trees to fully typed, method-resolved
//! programs ready for a code generator:
//! - Package and type loading (directory tree → package tree, one type per
//!   file, parallel per-file parsing)
//! - Line-oriented declaration parsing (`import` → `implement` → `has` →
//!   methods, indentation-significant, no token stream at the file level)
//! - Lazy per-method body parsing: a Shunting-Yard expression parser that
//!   builds a typed expression tree, resolves calls against the trait
//!   network, and instantiates generic types on demand
//!
//! Code generation, execution, and validation walk the finished tree
//! through two surfaces: [`loader::load_package`] and
//! [`package::Program::method_body`].

mod builtins;
pub mod error;
pub mod expression;
pub mod limits;
pub mod loader;
pub mod package;
pub(crate) mod parse;
pub mod resolve;
pub mod types;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::error::{ErrorCategory, ErrorContext, ErrorKind, ParseError, Result};
    pub use crate::expression::{Branch, Expression, ExpressionKind};
    pub use crate::loader::load_package;
    pub use crate::package::{Package, PackageId, Program, TypeId};
    pub use crate::types::{Body, BodyId, Member, Method, Parameter, Type, Variable};
}
