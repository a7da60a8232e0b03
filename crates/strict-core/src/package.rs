// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The context tree: program root, packages, and the type arena.
//!
//! [`Program`] owns every [`Package`] and [`Type`] in flat arenas addressed
//! by [`PackageId`] and [`TypeId`]. Packages form a tree rooted at an
//! unnamed root context; directly beneath it live the built-in `Base`
//! package and the user packages created by the loader. Name lookup is
//! hierarchical: a name that does not resolve in a package bubbles up to
//! its parent.
//!
//! After loading, the arena is only mutated by lazy caches: method bodies
//! parsed on first access, available-method unions, and generic
//! instantiations.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use ecow::EcoString;

use crate::builtins;
use crate::error::{ErrorContext, ErrorKind, ErrorScope, ParseError, Result};
use crate::expression::parser::ExpressionParser;
use crate::parse;
use crate::resolve;
use crate::types::{Body, SourceLine, Type};

/// Index of a package in the program's package arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageId(u32);

impl PackageId {
    #[must_use]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a type in the program's type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    #[must_use]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A namespace rooted at a directory, holding types by name.
#[derive(Debug, Clone)]
pub struct Package {
    /// The package name, equal to the folder name (empty for the root).
    pub name: EcoString,
    /// The parent package, `None` only for the root context.
    pub parent: Option<PackageId>,
    /// The folder this package was loaded from (empty for `Base`).
    pub folder: Utf8PathBuf,
    children: Vec<PackageId>,
    types: HashMap<EcoString, TypeId>,
}

impl Package {
    fn new(name: impl Into<EcoString>, parent: Option<PackageId>, folder: Utf8PathBuf) -> Self {
        Self {
            name: name.into(),
            parent,
            folder,
            children: Vec::new(),
            types: HashMap::new(),
        }
    }

    /// Looks up a type by exact name, `None` if absent.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<TypeId> {
        self.types.get(name).copied()
    }

    /// Child packages in creation order.
    #[must_use]
    pub fn children(&self) -> &[PackageId] {
        &self.children
    }

    /// Iterates over all types registered in this package.
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types.values().copied()
    }
}

/// The root of everything: arenas for packages and types plus the
/// generic instantiation cache.
#[derive(Debug)]
pub struct Program {
    packages: Vec<Package>,
    types: Vec<Type>,
    root: PackageId,
    base: PackageId,
    main: PackageId,
    pub(crate) generic_instances: HashMap<(TypeId, Vec<TypeId>), TypeId>,
}

impl Program {
    /// Creates a program holding only the root context and the `Base`
    /// package with its built-in types.
    #[must_use]
    pub fn new() -> Self {
        let root = PackageId::from_raw(0);
        let mut program = Self {
            packages: vec![Package::new("", None, Utf8PathBuf::new())],
            types: Vec::new(),
            root,
            base: root,
            main: root,
            generic_instances: HashMap::new(),
        };
        program.base = program.add_package(root, "Base", Utf8PathBuf::new());
        program.main = program.base;
        builtins::install(&mut program);
        program
    }

    /// The unnamed root context.
    #[must_use]
    pub fn root(&self) -> PackageId {
        self.root
    }

    /// The built-in `Base` package.
    #[must_use]
    pub fn base(&self) -> PackageId {
        self.base
    }

    /// The package the program was loaded from, `Base` until a load.
    #[must_use]
    pub fn main_package(&self) -> PackageId {
        self.main
    }

    pub(crate) fn set_main_package(&mut self, package: PackageId) {
        self.main = package;
    }

    /// Borrows a package.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this program.
    #[must_use]
    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    /// Borrows a type.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this program.
    #[must_use]
    pub fn get_type(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub(crate) fn get_type_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.index()]
    }

    /// A built-in type from the `Base` package.
    ///
    /// # Panics
    /// Panics if `name` is not a built-in, which would be a bug in this
    /// crate rather than in user code.
    #[must_use]
    pub fn base_type(&self, name: &str) -> TypeId {
        self.package(self.base)
            .get_type(name)
            .unwrap_or_else(|| panic!("built-in type {name} must exist"))
    }

    /// Creates a child package.
    pub fn add_package(
        &mut self,
        parent: PackageId,
        name: impl Into<EcoString>,
        folder: Utf8PathBuf,
    ) -> PackageId {
        let id = PackageId::from_raw(u32::try_from(self.packages.len()).expect("package count"));
        self.packages
            .push(Package::new(name, Some(parent), folder));
        self.packages[parent.index()].children.push(id);
        id
    }

    /// Finds a package by name anywhere beneath the root.
    #[must_use]
    pub fn find_package(&self, name: &str) -> Option<PackageId> {
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if self.package(id).name == name {
                return Some(id);
            }
            pending.extend_from_slice(self.package(id).children());
        }
        None
    }

    /// Registers an empty type stub so forward references resolve before
    /// the type's declarations are parsed. Duplicate names are rejected.
    pub(crate) fn register_type(
        &mut self,
        package: PackageId,
        name: &str,
    ) -> std::result::Result<TypeId, ErrorKind> {
        if self.packages[package.index()].types.contains_key(name) {
            return Err(ErrorKind::TypeAlreadyExists(name.into()));
        }
        let id = TypeId::from_raw(u32::try_from(self.types.len()).expect("type count"));
        self.types.push(Type::stub(name, package));
        self.packages[package.index()]
            .types
            .insert(name.into(), id);
        Ok(id)
    }

    /// The dotted package path from the root, e.g. `Base` or `Game.Logic`.
    #[must_use]
    pub fn package_path(&self, id: PackageId) -> EcoString {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(package_id) = current {
            let package = self.package(package_id);
            if !package.name.is_empty() {
                segments.push(package.name.clone());
            }
            current = package.parent;
        }
        segments.reverse();
        let mut path = EcoString::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                path.push('.');
            }
            path.push_str(segment);
        }
        path
    }

    /// The fully-qualified type name, e.g. `Base.Number`.
    #[must_use]
    pub fn qualified_name(&self, id: TypeId) -> EcoString {
        let ty = self.get_type(id);
        let path = self.package_path(ty.package);
        if path.is_empty() {
            ty.name.clone()
        } else {
            let mut name = path;
            name.push('.');
            name.push_str(&ty.name);
            name
        }
    }

    /// Parses `source` as one type into `package`.
    ///
    /// Forward references to types added in the same call are not possible
    /// here; use [`Program::add_types`] for a batch with cross references.
    pub fn add_type_source(
        &mut self,
        package: PackageId,
        name: &str,
        source: &str,
    ) -> Result<TypeId> {
        Ok(self.add_types(package, &[(name, source)])?[0])
    }

    /// Parses a batch of `(name, source)` pairs into `package`.
    ///
    /// All names are registered before any declaration is resolved, so the
    /// sources may reference each other in any order.
    pub fn add_types(&mut self, package: PackageId, sources: &[(&str, &str)]) -> Result<Vec<TypeId>> {
        let mut ids = Vec::with_capacity(sources.len());
        for (name, _) in sources {
            let id = self
                .register_type(package, name)
                .map_err(|kind| ParseError::new(kind, ErrorContext::new(*name, 0, "")))?;
            ids.push(id);
        }
        let mut declarations = Vec::with_capacity(sources.len());
        for (name, source) in sources {
            declarations.push(parse::parse_type_declarations(name, source)?);
        }
        let mut pending = Vec::with_capacity(ids.len());
        for (id, raw) in ids.iter().zip(declarations) {
            pending.push(resolve::declarations::resolve_type(self, *id, raw)?);
        }
        for checks in &pending {
            resolve::declarations::check_trait_contracts(self, checks)?;
        }
        Ok(ids)
    }

    /// The parsed body of a method, parsing it on first access.
    ///
    /// # Panics
    /// Panics if `method` is out of bounds for the type.
    pub fn method_body(&mut self, ty: TypeId, method: usize) -> Result<&Body> {
        if self.get_type(ty).methods[method].body.is_none() {
            let body = self.parse_method_body(ty, method)?;
            self.types[ty.index()].methods[method].body = Some(body);
        }
        Ok(self.types[ty.index()].methods[method]
            .body
            .as_ref()
            .expect("body was just parsed"))
    }

    fn parse_method_body(&mut self, ty: TypeId, method: usize) -> Result<Body> {
        let (lines, method_name, return_type) = {
            let data = &self.get_type(ty).methods[method];
            (data.lines.clone(), data.name.clone(), data.return_type)
        };
        let scope = ErrorScope::in_method(self.get_type(ty).name.clone(), method_name.clone());
        if lines.is_empty() {
            return Err(scope.file(ErrorKind::MethodMustHaveBody(method_name)));
        }
        let pre = parse::body::pre_parse(&lines, 1, &scope)?;
        let body = ExpressionParser::for_method(self, ty, method).parse_body(&pre)?;
        let none = self.base_type("None");
        if return_type != none && !resolve::is_compatible(self, body.return_type, return_type) {
            let last = last_line(&lines);
            return Err(scope.at(
                last.number,
                last.content(),
                ErrorKind::ReturnTypeMismatch {
                    found: self.get_type(body.return_type).name.clone(),
                    expected: self.get_type(return_type).name.clone(),
                },
            ));
        }
        Ok(body)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

fn last_line(lines: &[SourceLine]) -> &SourceLine {
    lines.last().expect("bodies have at least one line")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_program_has_base_beneath_root() {
        let program = Program::new();
        let base = program.base();
        assert_eq!(program.package(base).name, "Base");
        assert_eq!(program.package(base).parent, Some(program.root()));
        assert!(program.package(base).get_type("Number").is_some());
    }

    #[test]
    fn register_type_rejects_duplicates() {
        let mut program = Program::new();
        let package = program.add_package(program.root(), "Demo", Utf8PathBuf::new());
        program.register_type(package, "Counter").unwrap();
        assert_eq!(
            program.register_type(package, "Counter"),
            Err(ErrorKind::TypeAlreadyExists("Counter".into()))
        );
    }

    #[test]
    fn qualified_names_use_dotted_package_paths() {
        let program = Program::new();
        let number = program.base_type("Number");
        assert_eq!(program.qualified_name(number), "Base.Number");
    }

    #[test]
    fn find_package_searches_the_tree() {
        let mut program = Program::new();
        let outer = program.add_package(program.root(), "Outer", Utf8PathBuf::new());
        let inner = program.add_package(outer, "Inner", Utf8PathBuf::new());
        assert_eq!(program.find_package("Inner"), Some(inner));
        assert_eq!(program.find_package("Missing"), None);
    }
}
