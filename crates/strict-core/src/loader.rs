// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Package loading: directory discovery and parallel file parsing.
//!
//! [`load_package`] walks a directory tree, creates a child package per
//! folder, and materializes every `.strict` file as a type in its
//! package. Loading runs in three phases:
//!
//! 1. **Discover & register.** Every file becomes a type stub before any
//!    parsing, so forward references resolve regardless of file order.
//! 2. **Parse declarations in parallel.** One task per file (scoped
//!    threads); file reads are the only suspension points. Within a file,
//!    parsing is sequential.
//! 3. **Resolve sequentially.** Declarations are resolved against the
//!    fully registered arena, then trait contracts are checked across the
//!    whole load. Method bodies stay unparsed until first access.
//!
//! The upstream `strict-lang/Strict` checkout is reserved and never
//! scanned.

use std::fs;
use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use ecow::EcoString;
use tracing::{debug, instrument};

use crate::error::{ErrorContext, ErrorKind, ParseError, Result};
use crate::package::{PackageId, Program, TypeId};
use crate::parse::{self, RawType};
use crate::resolve;

/// The upstream language checkout, never loaded as a user package.
const RESERVED_PATH: &str = "strict-lang/Strict";

/// Loads the directory tree at `root` into a fresh program.
///
/// Returns the program with the loaded package as its main package; every
/// `.strict` file beneath `root` is a registered, declaration-resolved
/// type whose method bodies parse lazily on first access.
pub fn load_package(root: impl AsRef<Utf8Path>) -> Result<Program> {
    let mut program = Program::new();
    let package = load_into(&mut program, root.as_ref())?;
    program.set_main_package(package);
    Ok(program)
}

/// Loads `root` as a new top-level package of an existing program.
#[instrument(skip(program), fields(root = %root))]
pub fn load_into(program: &mut Program, root: &Utf8Path) -> Result<PackageId> {
    if root.as_str().ends_with(RESERVED_PATH) {
        return Err(file_error(ErrorKind::ReservedPath(root.as_str().into())));
    }
    let name = root.file_name().unwrap_or("Main");
    let package = program.add_package(program.root(), name, root.to_owned());

    let mut files = Vec::new();
    discover(program, package, root, &mut files)?;
    debug!(files = files.len(), "discovered source files");

    let mut registered: Vec<(TypeId, Utf8PathBuf, EcoString)> = Vec::with_capacity(files.len());
    for (file_package, path) in files {
        let type_name: EcoString = path.file_stem().unwrap_or_default().into();
        let id = program
            .register_type(file_package, &type_name)
            .map_err(|kind| ParseError::new(kind, ErrorContext::new(type_name.clone(), 0, "")))?;
        registered.push((id, path, type_name));
    }

    let declarations = parse_files(&registered)?;
    debug!(types = registered.len(), "parsed declarations");

    let mut pending = Vec::with_capacity(registered.len());
    for ((id, _, _), raw) in registered.iter().zip(declarations) {
        pending.push(resolve::declarations::resolve_type(program, *id, raw)?);
    }
    for checks in &pending {
        resolve::declarations::check_trait_contracts(program, checks)?;
    }
    Ok(package)
}

/// Walks the folder tree, creating a child package per directory and
/// collecting every source file with its package.
fn discover(
    program: &mut Program,
    package: PackageId,
    folder: &Utf8Path,
    files: &mut Vec<(PackageId, Utf8PathBuf)>,
) -> Result<()> {
    let mut entries = Vec::new();
    let listing = folder
        .read_dir_utf8()
        .map_err(|_| file_error(ErrorKind::FileUnreadable(folder.as_str().into())))?;
    for entry in listing {
        let entry =
            entry.map_err(|_| file_error(ErrorKind::FileUnreadable(folder.as_str().into())))?;
        entries.push(entry.into_path());
    }
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if path.as_str().ends_with(RESERVED_PATH) {
                continue;
            }
            let name = path.file_name().unwrap_or_default();
            let child = program.add_package(package, name, path.clone());
            discover(program, child, &path, files)?;
        } else {
            if path.extension() != Some("strict") {
                return Err(file_error(ErrorKind::NotStrictFile(path.as_str().into())));
            }
            files.push((package, path));
        }
    }
    Ok(())
}

/// Parses every file's declarations, one task per file.
fn parse_files(registered: &[(TypeId, Utf8PathBuf, EcoString)]) -> Result<Vec<RawType>> {
    thread::scope(|tasks| {
        let handles: Vec<_> = registered
            .iter()
            .map(|(_, path, name)| tasks.spawn(move || read_and_parse(path, name)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("parse tasks do not panic"))
            .collect()
    })
}

fn read_and_parse(path: &Utf8Path, name: &str) -> Result<RawType> {
    let source = fs::read_to_string(path).map_err(|_| {
        ParseError::new(
            ErrorKind::FileUnreadable(path.as_str().into()),
            ErrorContext::new(name, 0, ""),
        )
    })?;
    parse::parse_type_declarations(name, &source)
}

fn file_error(kind: ErrorKind) -> ParseError {
    ParseError::new(kind, ErrorContext::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> Utf8PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("{prefix}_{}_{}", std::process::id(), nanos));
        Utf8PathBuf::from_path_buf(path).expect("utf-8 temp dir")
    }

    fn write_file(path: &Utf8Path, content: &str) {
        fs::write(path, content).expect("write test file");
    }

    #[test]
    fn loads_types_from_nested_folders() {
        let root = unique_temp_dir("strict_loader_nested").join("Game");
        let logic = root.join("Logic");
        fs::create_dir_all(&logic).expect("create dirs");
        write_file(
            &root.join("Counter.strict"),
            "has number\nRun Number\n\tnumber",
        );
        write_file(
            &logic.join("Rules.strict"),
            "has number\nCheck Number\n\tnumber",
        );

        let program = load_package(&root).unwrap();
        let game = program.main_package();
        assert_eq!(program.package(game).name, "Game");
        assert!(program.package(game).get_type("Counter").is_some());
        let logic_package = program.find_package("Logic").unwrap();
        assert!(program.package(logic_package).get_type("Rules").is_some());

        let _ = fs::remove_dir_all(root.parent().unwrap());
    }

    #[test]
    fn forward_references_resolve_regardless_of_file_order() {
        let root = unique_temp_dir("strict_loader_forward").join("App");
        fs::create_dir_all(&root).expect("create dirs");
        // "Alpha" sorts before "Zeta" yet references it.
        write_file(
            &root.join("Alpha.strict"),
            "has zeta Zeta\nhas number\nRun Number\n\tnumber",
        );
        write_file(
            &root.join("Zeta.strict"),
            "has number\nCurrent Number\n\tnumber",
        );

        let program = load_package(&root).unwrap();
        let app = program.main_package();
        let alpha = program.package(app).get_type("Alpha").unwrap();
        let zeta = program.package(app).get_type("Zeta").unwrap();
        assert_eq!(program.get_type(alpha).members[0].declared_type, zeta);

        let _ = fs::remove_dir_all(root.parent().unwrap());
    }

    #[test]
    fn non_strict_files_are_rejected() {
        let root = unique_temp_dir("strict_loader_extension").join("App");
        fs::create_dir_all(&root).expect("create dirs");
        write_file(&root.join("README.md"), "hello");

        let error = load_package(&root).unwrap_err();
        assert!(matches!(error.kind, ErrorKind::NotStrictFile(_)));

        let _ = fs::remove_dir_all(root.parent().unwrap());
    }

    #[test]
    fn reserved_checkout_path_is_refused() {
        let root = unique_temp_dir("strict_loader_reserved")
            .join("strict-lang")
            .join("Strict");
        fs::create_dir_all(&root).expect("create dirs");

        let error = load_package(&root).unwrap_err();
        assert!(matches!(error.kind, ErrorKind::ReservedPath(_)));

        let _ = fs::remove_dir_all(root.parent().unwrap().parent().unwrap());
    }

    #[test]
    fn reserved_subfolders_are_skipped() {
        let root = unique_temp_dir("strict_loader_skip").join("App");
        let reserved = root.join("strict-lang").join("Strict");
        fs::create_dir_all(&reserved).expect("create dirs");
        write_file(&reserved.join("ignored.txt"), "ignored");
        write_file(
            &root.join("Counter.strict"),
            "has number\nRun Number\n\tnumber",
        );

        let program = load_package(&root).unwrap();
        assert!(
            program
                .package(program.main_package())
                .get_type("Counter")
                .is_some()
        );

        let _ = fs::remove_dir_all(root.parent().unwrap());
    }

    #[test]
    fn parse_errors_carry_the_type_and_line() {
        let root = unique_temp_dir("strict_loader_error").join("App");
        fs::create_dir_all(&root).expect("create dirs");
        write_file(&root.join("Broken.strict"), "has number\n\nRun Number\n\t5");

        let error = load_package(&root).unwrap_err();
        assert_eq!(error.kind, ErrorKind::EmptyLine);
        assert_eq!(error.context.type_name, "Broken");
        assert_eq!(error.context.line_number, 2);

        let _ = fs::remove_dir_all(root.parent().unwrap());
    }
}
