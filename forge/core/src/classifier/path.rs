//! File path inference
//!
//! An ordered table of structural rules. The first rule whose matcher fires
//! on the code body names the file; when none fire, the block lands in its
//! category directory under a positional name.

use once_cell::sync::Lazy;
use regex::Regex;

use super::language::Category;

/// How a matching rule turns a capture into a path
#[derive(Clone, Copy, Debug)]
enum PathBuilder {
    /// `tests/test_<n>.<ext>`
    NumberedTest,
    /// `config/config.<ext>`
    Config,
    /// `<dir>/<lowercased name>.<ext>`, or no directory when `dir` is empty
    Lowercased(&'static str),
    /// `<dir>/<name as written>.<ext>`
    AsCased(&'static str),
}

struct PathRule {
    name: &'static str,
    matcher: Regex,
    builder: PathBuilder,
}

impl PathRule {
    fn new(name: &'static str, pattern: &str, builder: PathBuilder) -> Self {
        Self {
            name,
            matcher: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("invalid path rule {name}: {e}")),
            builder,
        }
    }

    fn apply(&self, code: &str, extension: &str, index: usize) -> Option<String> {
        let captures = self.matcher.captures(code)?;
        let captured = captures.get(1).map_or("", |m| m.as_str());

        let path = match self.builder {
            PathBuilder::NumberedTest => format!("tests/test_{}.{extension}", index + 1),
            PathBuilder::Config => format!("config/config.{extension}"),
            PathBuilder::Lowercased(dir) => join(dir, &captured.to_lowercase(), extension),
            PathBuilder::AsCased(dir) => join(dir, captured, extension),
        };
        Some(path)
    }
}

fn join(dir: &str, stem: &str, extension: &str) -> String {
    if dir.is_empty() {
        format!("{stem}.{extension}")
    } else {
        format!("{dir}/{stem}.{extension}")
    }
}

static RULES: Lazy<Vec<PathRule>> = Lazy::new(|| {
    vec![
        PathRule::new(
            "test",
            r"(?m)\b(?:describe|it|test)\s*\(\s*['`]|\bdef\s+test_\w*\s*\(|#\[test\]|^\s*import\s+pytest\b|@Test\b|\bunittest\b|\bexpect\s*\(",
            PathBuilder::NumberedTest,
        ),
        PathRule::new(
            "config",
            r"(?i)\b(?:config|configuration|settings)\b\s*[:=({]|module\.exports\s*=",
            PathBuilder::Config,
        ),
        PathRule::new(
            "model",
            r"\b(?:class|interface|type|struct)\s+(\w+Model)\b",
            PathBuilder::Lowercased("models"),
        ),
        PathRule::new(
            "service",
            r"\b(?:class|interface|struct|function|const|let|var)\s+(\w+Service)\b",
            PathBuilder::Lowercased("services"),
        ),
        PathRule::new(
            "component",
            r"\b(?:function|const|let|var)\s+(\w+Component)\b",
            PathBuilder::AsCased("components"),
        ),
        PathRule::new("class", r"\bclass\s+(\w+)", PathBuilder::Lowercased("")),
        PathRule::new(
            "declaration",
            r"(?m)^(?:export\s+)?(?:default\s+)?(?:async\s+)?(?:function\*?|const|let|var)\s+(\w+)",
            PathBuilder::Lowercased(""),
        ),
    ]
});

/// Derive a relative file path for a code block
///
/// `index` is the block's zero-based position in its response and only
/// feeds the numbered names, so paths may repeat across runs.
#[must_use]
pub fn file_path(code: &str, category: Category, extension: &str, index: usize) -> String {
    for rule in RULES.iter() {
        if let Some(path) = rule.apply(code, extension, index) {
            tracing::trace!(rule = rule.name, path = %path, "File path rule matched");
            return path;
        }
    }
    format!("{}/file_{}.{extension}", category.directory(), index + 1)
}
