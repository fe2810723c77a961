//! Complexity and design-pattern heuristics
//!
//! Both are keyword searches over the code body. They are cheap and they are
//! allowed to be wrong.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How much structure a block of code shows, weakest to strongest signal
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Short code with no structural markers
    Basic,
    /// Async code, classes, or over 50 lines
    Intermediate,
    /// Generics, interfaces, or over 100 lines
    Advanced,
    /// Decorators, named patterns, or over 200 lines
    Enterprise,
}

impl Complexity {
    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Design patterns the classifier can recognise, in reporting order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DesignPattern {
    /// Object creation behind a factory
    Factory,
    /// Interchangeable algorithms
    Strategy,
    /// Subscriptions and event emitters
    Observer,
    /// Single shared instance
    Singleton,
    /// Data access behind a repository
    Repository,
    /// Wrapping behaviour
    Decorator,
    /// Interface translation
    Adapter,
    /// Step-wise construction
    Builder,
    /// Actions as objects
    Command,
    /// Simplified front to a subsystem
    Facade,
}

impl DesignPattern {
    /// Every pattern, in reporting order
    pub const ALL: [DesignPattern; 10] = [
        Self::Factory,
        Self::Strategy,
        Self::Observer,
        Self::Singleton,
        Self::Repository,
        Self::Decorator,
        Self::Adapter,
        Self::Builder,
        Self::Command,
        Self::Facade,
    ];

    /// Display name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Factory => "Factory",
            Self::Strategy => "Strategy",
            Self::Observer => "Observer",
            Self::Singleton => "Singleton",
            Self::Repository => "Repository",
            Self::Decorator => "Decorator",
            Self::Adapter => "Adapter",
            Self::Builder => "Builder",
            Self::Command => "Command",
            Self::Facade => "Facade",
        }
    }

    fn matcher(self) -> &'static Regex {
        &PATTERN_MATCHERS[self as usize]
    }
}

impl std::fmt::Display for DesignPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}

// Indexed by `DesignPattern as usize`.
static PATTERN_MATCHERS: Lazy<[Regex; 10]> = Lazy::new(|| {
    [
        regex(r"(?i)factory"),
        regex(r"(?i)strategy"),
        regex(r"(?i)observer|subscribe\s*\(|addEventListener|EventEmitter|\.emit\s*\(|\.on\s*\("),
        regex(r"(?i)singleton|getInstance\s*\("),
        regex(r"(?i)repository"),
        regex(r"(?i)decorator"),
        regex(r"(?i)adapter"),
        regex(r"(?i)builder|\.build\s*\(\s*\)"),
        regex(r"(?i)\bcommand\b|\bexecute\s*\("),
        regex(r"(?i)facade"),
    ]
});

static ASYNC_MARKER: Lazy<Regex> =
    Lazy::new(|| regex(r"\basync\b|\bawait\b|\bPromise\b|\.then\s*\("));
static CLASS_MARKER: Lazy<Regex> =
    Lazy::new(|| regex(r"\bclass\s+\w+(?:\s+(?:extends|implements)\s+[\w.,\s<>]+?)?\s*\{"));
static INTERFACE_MARKER: Lazy<Regex> = Lazy::new(|| regex(r"\binterface\s+\w+"));
static GENERIC_MARKER: Lazy<Regex> =
    Lazy::new(|| regex(r"\w<[A-Z]\w*(?:\[\])?(?:\s*,\s*[A-Z]\w*(?:\[\])?)*>"));
static DECORATOR_MARKER: Lazy<Regex> = Lazy::new(|| regex(r"(?m)^\s*@[A-Za-z_]\w*"));
static PATTERN_KEYWORD: Lazy<Regex> =
    Lazy::new(|| regex(r"Factory|Strategy|Observer|Singleton|Repository"));

/// Count source lines the same way for every heuristic
#[must_use]
pub fn line_count(code: &str) -> usize {
    if code.is_empty() {
        0
    } else {
        code.split('\n').count()
    }
}

/// Classify how structurally complex a block of code looks
///
/// The strongest tier whose signal is present wins.
#[must_use]
pub fn complexity(code: &str) -> Complexity {
    let lines = line_count(code);

    if lines > 200 || DECORATOR_MARKER.is_match(code) || PATTERN_KEYWORD.is_match(code) {
        Complexity::Enterprise
    } else if lines > 100 || GENERIC_MARKER.is_match(code) || INTERFACE_MARKER.is_match(code) {
        Complexity::Advanced
    } else if lines > 50 || ASYNC_MARKER.is_match(code) || CLASS_MARKER.is_match(code) {
        Complexity::Intermediate
    } else {
        Complexity::Basic
    }
}

/// Every design pattern the code mentions, in [`DesignPattern::ALL`] order
#[must_use]
pub fn patterns(code: &str) -> Vec<DesignPattern> {
    DesignPattern::ALL
        .into_iter()
        .filter(|pattern| pattern.matcher().is_match(code))
        .collect()
}
