//! Content Classification
//!
//! Turns a free-form backend response into discrete [`CodeArtifact`]s. Each
//! fenced code block becomes one artifact with a language profile, a
//! complexity tier, the design patterns it mentions and a plausible file path.
//!
//! # Heuristics, not parsing
//!
//! Nothing here understands the languages involved. Every decision is a
//! keyword or shape match, and every input maps to some output: unknown tags
//! become `{txt, other}`, unmatched files land in a numbered fallback path.
//!
//! ```
//! use forge_core::classifier::{parse, Category, Complexity};
//!
//! let artifacts = parse("```python\nclass UserModel:\n    pass\n```");
//! assert_eq!(artifacts.len(), 1);
//! assert_eq!(artifacts[0].file_path, "models/usermodel.py");
//! assert_eq!(artifacts[0].category, Category::Backend);
//! assert_eq!(artifacts[0].complexity, Complexity::Basic);
//! ```

mod heuristics;
mod language;
mod path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use heuristics::{complexity, line_count, patterns, Complexity, DesignPattern};
pub use language::{language_profile, Category, LanguageProfile, LANGUAGE_TABLE, UNKNOWN_PROFILE};
pub use path::file_path;

/// Language assumed for fences without a tag
pub const DEFAULT_LANGUAGE: &str = "text";

static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```([^\n`]*)\r?\n([\s\S]*?)```")
        .unwrap_or_else(|e| panic!("invalid fence pattern: {e}"))
});

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+")
        .unwrap_or_else(|e| panic!("invalid blank-line pattern: {e}"))
});

/// One fenced region of a response, before classification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlock {
    /// Fence tag, or [`DEFAULT_LANGUAGE`]
    pub language: String,
    /// Body with surrounding whitespace trimmed
    pub code: String,
}

/// A classified code block destined to become one file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeArtifact {
    /// Position of the block within its response
    pub index: usize,
    /// Fence tag as written, or `text`
    pub language: String,
    /// Trimmed code body
    pub raw_code: String,
    /// Inferred relative path
    pub file_path: String,
    /// Extension from the language table
    pub extension: String,
    /// Category from the language table
    pub category: Category,
    /// Complexity tier
    pub complexity: Complexity,
    /// Patterns mentioned, in catalog order
    pub patterns: Vec<DesignPattern>,
}

impl CodeArtifact {
    /// Classify one block at position `index`
    #[must_use]
    pub fn classify(block: &CodeBlock, index: usize) -> Self {
        let profile = language_profile(&block.language);
        let path = file_path(&block.code, profile.category, profile.extension, index);

        Self {
            index,
            language: block.language.clone(),
            raw_code: block.code.clone(),
            file_path: path,
            extension: profile.extension.to_string(),
            category: profile.category,
            complexity: complexity(&block.code),
            patterns: patterns(&block.code),
        }
    }

    /// Final path segment of [`Self::file_path`]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.file_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.file_path)
    }

    /// Number of lines in the code body
    #[must_use]
    pub fn line_count(&self) -> usize {
        line_count(&self.raw_code)
    }
}

/// Every fenced block in document order
#[must_use]
pub fn extract_blocks(raw: &str) -> Vec<CodeBlock> {
    FENCE
        .captures_iter(raw)
        .map(|captures| CodeBlock {
            language: fence_tag(captures.get(1).map_or("", |m| m.as_str())).to_string(),
            code: captures
                .get(2)
                .map_or("", |m| m.as_str())
                .trim()
                .to_string(),
        })
        .collect()
}

/// First word of a fence info string, so `c++ title=main.cpp` gives `c++`
fn fence_tag(info: &str) -> &str {
    info.split_whitespace().next().unwrap_or(DEFAULT_LANGUAGE)
}

/// Parse a response into classified artifacts, in document order
///
/// A response with no fences yields no artifacts; its text is still usable
/// as [`narration`].
#[must_use]
pub fn parse(raw: &str) -> Vec<CodeArtifact> {
    let artifacts: Vec<_> = extract_blocks(raw)
        .iter()
        .enumerate()
        .map(|(index, block)| CodeArtifact::classify(block, index))
        .collect();

    tracing::debug!(artifacts = artifacts.len(), "Classified response");
    artifacts
}

/// The prose around the code: fences removed, blank-line runs collapsed
#[must_use]
pub fn narration(raw: &str) -> String {
    let stripped = FENCE.replace_all(raw, "");
    BLANK_RUNS
        .replace_all(&stripped, "\n\n")
        .trim()
        .to_string()
}
