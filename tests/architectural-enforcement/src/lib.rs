//! Architectural Enforcement Integration Tests
//!
//! Source-level checks over the workspace's production code. The helpers here
//! locate the sources and strip what the checks should not see; the checks
//! themselves live under `tests/`.

use std::path::PathBuf;

/// Source trees treated as production code, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["forge/core/src", "forge/cli/src"];

/// Workspace root, two levels above this package
#[must_use]
pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Lines of `content` before its test module, with `//` comments removed
///
/// Line numbers are preserved, so index `i` is line `i + 1` of the file.
#[must_use]
pub fn production_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|line| {
            if line.trim_start().starts_with("//") {
                ""
            } else {
                line.split(" // ").next().unwrap_or(line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// tokio::time::sleep(x)\nlet y = 1; // sleep(z)\n#[cfg(test)]\nmod tests {}";
        let lines = production_lines(source);
        assert_eq!(lines, vec!["fn a() {}", "", "let y = 1;"]);
    }
}
