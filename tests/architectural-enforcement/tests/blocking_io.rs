//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code in production MUST NOT block its worker thread on
//! I/O. Use `tokio::fs`, `tokio::net` and `tokio::process` instead of their
//! `std` counterparts.
//!
//! Blocking calls are tolerated in plain `fn`s that run before the pipeline
//! starts (configuration loading, argument parsing), unless they sit inside an
//! `async` block. Test modules are exempt.

use std::fs;
use std::path::Path;

use architectural_enforcement::{production_lines, workspace_root, PRODUCTION_DIRS};

#[test]
fn test_no_blocking_io_in_async_code() {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for entry in walkdir::WalkDir::new(root.join(dir))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        {
            check_file(entry.path(), &root, &mut violations);
        }
    }

    if violations.is_empty() {
        return;
    }

    eprintln!("\nFound blocking I/O in async production code:\n");
    for violation in &violations {
        eprintln!("  {violation}");
    }
    eprintln!("\nForbidden in async code:");
    eprintln!("  std::fs::*, std::net::*, std::process::Command, reqwest::blocking");
    eprintln!("  std::io::stdin(), std::io::stdout()");
    eprintln!("\nUse instead:");
    eprintln!("  tokio::fs::write(path, contents).await");
    eprintln!("  tokio::io::stdin() with AsyncBufReadExt");
    eprintln!("  tokio::process::Command::output().await");

    panic!("{} blocking I/O violation(s)", violations.len());
}

fn check_file(path: &Path, root: &Path, violations: &mut Vec<String>) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines = production_lines(&content);

    for (idx, code) in lines.iter().enumerate() {
        let Some(kind) = blocking_call(code) else {
            continue;
        };
        if enclosing_context(&lines, idx) == Context::Sync {
            continue;
        }
        let shown = path.strip_prefix(root).unwrap_or(path);
        violations.push(format!("{}:{} - {kind}: {}", shown.display(), idx + 1, code.trim()));
    }
}

/// What kind of blocking call `code` makes, if any
fn blocking_call(code: &str) -> Option<&'static str> {
    let console = (code.contains("io::stdin()") || code.contains("io::stdout()"))
        && !code.contains("tokio::io::");

    if code.contains("std::fs::") || code.contains("use std::fs") {
        Some("blocking file I/O")
    } else if code.contains("std::net::") || code.contains("use std::net") {
        Some("blocking network I/O")
    } else if code.contains("std::process::Command") {
        Some("blocking process I/O")
    } else if code.contains("reqwest::blocking") {
        Some("blocking HTTP client")
    } else if console {
        Some("blocking console I/O")
    } else {
        None
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Context {
    /// Inside a plain `fn`
    Sync,
    /// Inside an `async fn` or `async` block
    Async,
    /// Module level
    Item,
}

/// Nearest enclosing function or async block, found by scanning upwards
fn enclosing_context(lines: &[&str], idx: usize) -> Context {
    for line in lines[..=idx].iter().rev() {
        let trimmed = line.trim();
        if trimmed.contains("async move {") || trimmed.ends_with("async {") {
            return Context::Async;
        }
        if trimmed.starts_with("fn ") || trimmed.contains(" fn ") {
            if trimmed.contains("async fn ") {
                return Context::Async;
            }
            return Context::Sync;
        }
        if trimmed.starts_with("mod ") || (trimmed.starts_with("impl") && trimmed.ends_with('{')) {
            return Context::Item;
        }
    }
    Context::Item
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_fn_is_flagged() {
        let code = [
            "    async fn save(&self) {",
            "        std::fs::write(&self.path, json)?;",
            "    }",
        ];
        assert_eq!(blocking_call(code[1]), Some("blocking file I/O"));
        assert_eq!(enclosing_context(&code, 1), Context::Async);
    }

    #[test]
    fn test_plain_fn_is_tolerated() {
        let code = [
            "pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ForgeConfig> {",
            "    let text = std::fs::read_to_string(path)?;",
        ];
        assert_eq!(enclosing_context(&code, 1), Context::Sync);
    }

    #[test]
    fn test_async_block_inside_plain_fn_is_flagged() {
        let code = [
            "fn watch(canceller: RunCanceller) {",
            "    tokio::spawn(async move {",
            "        let _ = std::fs::read(\"x\");",
        ];
        assert_eq!(enclosing_context(&code, 2), Context::Async);
    }

    #[test]
    fn test_tokio_console_is_allowed() {
        assert_eq!(
            blocking_call("let lines = BufReader::new(tokio::io::stdin()).lines();"),
            None
        );
        assert_eq!(blocking_call("let out = io::stdout().lock();"), Some("blocking console I/O"));
    }

    #[test]
    fn test_module_level_import_is_flagged() {
        let code = ["use std::fs;", "", "async fn run() {}"];
        assert_eq!(blocking_call(code[0]), Some("blocking file I/O"));
        assert_eq!(enclosing_context(&code, 0), Context::Item);
    }
}
