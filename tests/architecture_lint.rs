//! Architecture enforcement tests.
//!
//! The crate is layered `cli → store → backend → core`. These tests read the
//! sources and fail when a module reaches upward, or when a command handler
//! bypasses the `StateStore` interface to talk to a backend directly.
//!
//! # Test Categories
//!
//! 1. **Layering** - `core` and `backend` never import `store` or `cli`
//! 2. **Store Interface** - Command handlers use `StateStore` only
//! 3. **Error Discipline** - No `unwrap()`/`expect()` outside tests

use std::fs;
use std::path::{Path, PathBuf};

/// Every `.rs` file under `dir`, recursively.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap_or_else(|_| panic!("Failed to read {}", dir.display())) {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().is_some_and(|e| e == "rs") {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// File contents up to the unit test module, if any.
fn non_test_source(path: &Path) -> String {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    match content.find("#[cfg(test)]") {
        Some(pos) => content[..pos].to_string(),
        None => content,
    }
}

/// Lines of `source` that are code, not comments.
fn code_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(i, line)| (i + 1, line))
}

fn assert_no_imports(dir: &str, forbidden: &[&str]) {
    let mut violations = Vec::new();

    for path in rust_files(Path::new(dir)) {
        let source = non_test_source(&path);
        for (line_no, line) in code_lines(&source) {
            for pattern in forbidden {
                if line.contains(pattern) {
                    violations.push(format!("{}:{}: {}", path.display(), line_no, line.trim()));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Layering violations in {}:\n{}",
        dir,
        violations.join("\n")
    );
}

// =============================================================================
// Layering
// =============================================================================

#[test]
fn core_does_not_reach_upward() {
    assert_no_imports("src/core", &["crate::store", "crate::cli"]);
}

#[test]
fn backend_does_not_reach_upward() {
    assert_no_imports("src/backend", &["crate::store", "crate::cli"]);
}

#[test]
fn store_does_not_depend_on_cli() {
    assert_no_imports("src/store", &["crate::cli"]);
}

// =============================================================================
// Store Interface
// =============================================================================

/// Command handlers get a configured store and must go through
/// `StateStore`, never through a backend.
#[test]
fn commands_use_the_store_interface() {
    assert_no_imports("src/cli/commands", &["crate::backend", "KvBackend"]);
}

#[test]
fn every_command_file_is_dispatched() {
    let dir = Path::new("src/cli/commands");
    let dispatch = fs::read_to_string(dir.join("mod.rs")).expect("Failed to read mod.rs");

    for path in rust_files(dir) {
        let stem = path.file_stem().unwrap().to_str().unwrap();
        if stem == "mod" {
            continue;
        }
        assert!(
            dispatch.contains(&format!("mod {};", stem)),
            "{} is not declared in commands/mod.rs",
            path.display()
        );
        assert!(
            dispatch.contains(&format!("{}::", stem)),
            "{} is never dispatched",
            path.display()
        );
    }
}

// =============================================================================
// Error Discipline
// =============================================================================

#[test]
fn library_code_propagates_errors() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src")) {
        let source = non_test_source(&path);
        for (line_no, line) in code_lines(&source) {
            if line.contains(".unwrap()") || line.contains(".expect(") {
                violations.push(format!("{}:{}: {}", path.display(), line_no, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "unwrap()/expect() outside tests:\n{}",
        violations.join("\n")
    );
}
