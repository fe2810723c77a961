//! Integration Test: Cancellable Waits
//!
//! **Policy**: every pause in production code must wake up when its run is
//! cancelled. Blocking sleeps are forbidden outright; async sleeps must either
//! go through `CancellationToken::sleep` or race `cancelled()` in the same
//! `select!`.
//!
//! Test modules (everything after `#[cfg(test)]`) are exempt.

use std::fs;
use std::path::Path;

use architectural_enforcement::{production_lines, workspace_root, PRODUCTION_DIRS};

/// Lines either side of a sleep searched for the racing `cancelled()` arm
const SELECT_WINDOW: usize = 5;

#[test]
fn test_no_blocking_sleep_in_production_code() {
    let violations = scan(|lines, idx| {
        let code = lines[idx];
        code.contains("thread::sleep(")
    });

    report(&violations, "blocking sleep", &[
        "Use CancellationToken::sleep so the pause ends when the run is cancelled.",
    ]);
}

#[test]
fn test_async_sleeps_race_cancellation() {
    let violations = scan(|lines, idx| {
        let code = lines[idx];
        let sleeps = code.contains("::sleep(") || code.contains("::sleep_until(");
        sleeps && !code.contains("thread::sleep(") && !races_cancellation(lines, idx)
    });

    report(&violations, "uncancellable sleep", &[
        "token.sleep(duration).await",
        "tokio::select! { () = token.cancelled() => ..., () = tokio::time::sleep(d) => ... }",
    ]);
}

#[test]
fn test_production_dirs_exist() {
    let root = workspace_root();
    for dir in PRODUCTION_DIRS {
        assert!(root.join(dir).is_dir(), "missing source directory {dir}");
    }
}

fn races_cancellation(lines: &[&str], idx: usize) -> bool {
    let start = idx.saturating_sub(SELECT_WINDOW);
    let end = (idx + SELECT_WINDOW + 1).min(lines.len());
    lines[start..end].iter().any(|l| l.contains("cancelled()"))
}

fn scan(is_violation: impl Fn(&[&str], usize) -> bool) -> Vec<String> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for entry in walkdir::WalkDir::new(root.join(dir))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        {
            check_file(entry.path(), &root, &is_violation, &mut violations);
        }
    }
    violations
}

fn check_file(
    path: &Path,
    root: &Path,
    is_violation: &impl Fn(&[&str], usize) -> bool,
    violations: &mut Vec<String>,
) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines = production_lines(&content);

    for idx in 0..lines.len() {
        if is_violation(&lines, idx) {
            let shown = path.strip_prefix(root).unwrap_or(path);
            violations.push(format!("{}:{} - {}", shown.display(), idx + 1, lines[idx].trim()));
        }
    }
}

fn report(violations: &[String], what: &str, fixes: &[&str]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\nFound {what} in production code:\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    eprintln!("\nAcceptable forms:");
    for fix in fixes {
        eprintln!("  {fix}");
    }

    panic!("{} {what} violation(s)", violations.len());
}
