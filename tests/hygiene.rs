//! Hygiene: source-level budgets for panics and silently dropped errors.
//!
//! Scans `src/` (test files excluded). Budgets only ever go down; adding a
//! hit means removing one elsewhere first.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::Path;

struct SourceFile {
    path: String,
    content: String,
}

fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect(Path::new(env!("CARGO_MANIFEST_DIR")).join("src").as_path(), &mut files);
    files
}

fn collect(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out);
            continue;
        }
        let path_str = path.to_string_lossy().to_string();
        if path.extension().is_none_or(|e| e != "rs") || path_str.ends_with("_test.rs") {
            continue;
        }
        if let Ok(content) = fs::read_to_string(&path) {
            out.push(SourceFile { path: path_str, content });
        }
    }
}

/// Assert `pattern` appears on at most `max` lines across `src/`.
fn within_budget(pattern: &str, max: usize) {
    let hits: Vec<(String, usize)> = source_files()
        .into_iter()
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            (count > 0).then_some((file.path, count))
        })
        .collect();
    let count: usize = hits.iter().map(|(_, c)| c).sum();
    let listing = hits
        .iter()
        .map(|(path, count)| format!("  {path}: {count}"))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(count <= max, "`{pattern}` budget exceeded: found {count}, max {max}.\n{listing}");
}

// =============================================================================
// PANICS
// =============================================================================

#[test]
fn unwrap_budget() {
    within_budget(".unwrap()", 0);
}

#[test]
fn expect_budget() {
    within_budget(".expect(", 0);
}

#[test]
fn panic_budget() {
    within_budget("panic!(", 0);
}

#[test]
fn unreachable_budget() {
    within_budget("unreachable!(", 0);
}

#[test]
fn todo_budget() {
    within_budget("todo!(", 0);
}

#[test]
fn unimplemented_budget() {
    within_budget("unimplemented!(", 0);
}

// =============================================================================
// SILENT LOSS
// =============================================================================

#[test]
fn silent_discard_budget() {
    within_budget("let _ =", 0);
}

/// Env lookups, header decoding and best-effort error-body parsing.
#[test]
fn dot_ok_budget() {
    within_budget(".ok()", 4);
}

#[test]
fn allow_dead_code_budget() {
    within_budget("#[allow(dead_code)]", 0);
}
