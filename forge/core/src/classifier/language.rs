//! Language tag lookup
//!
//! Maps the tag on a code fence to a file extension and a [`Category`].

use serde::{Deserialize, Serialize};

/// Broad role of a generated file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// UI code and markup
    Frontend,
    /// Server-side and general-purpose code
    Backend,
    /// Stylesheets
    Styling,
    /// Configuration and data files
    Config,
    /// Schemas and queries
    Database,
    /// Prose documentation
    Docs,
    /// Build, deploy and shell tooling
    Devops,
    /// Test suites
    Testing,
    /// Anything unrecognised
    Other,
}

impl Category {
    /// Directory used when no structural rule names the file
    #[must_use]
    pub fn directory(self) -> &'static str {
        match self {
            Self::Frontend => "src",
            Self::Backend => "server",
            Self::Styling => "styles",
            Self::Config => "config",
            Self::Database => "database",
            Self::Docs => "docs",
            Self::Devops => "deploy",
            Self::Testing => "tests",
            Self::Other => "misc",
        }
    }

    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Styling => "styling",
            Self::Config => "config",
            Self::Database => "database",
            Self::Docs => "docs",
            Self::Devops => "devops",
            Self::Testing => "testing",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension and category for a language tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanguageProfile {
    /// File extension without the leading dot
    pub extension: &'static str,
    /// Category of files in this language
    pub category: Category,
}

/// Returned for tags missing from [`LANGUAGE_TABLE`]
pub const UNKNOWN_PROFILE: LanguageProfile = LanguageProfile {
    extension: "txt",
    category: Category::Other,
};

const fn profile(extension: &'static str, category: Category) -> LanguageProfile {
    LanguageProfile {
        extension,
        category,
    }
}

/// Known language tags, matched case-insensitively
pub const LANGUAGE_TABLE: &[(&str, LanguageProfile)] = &[
    ("javascript", profile("js", Category::Frontend)),
    ("js", profile("js", Category::Frontend)),
    ("jsx", profile("jsx", Category::Frontend)),
    ("typescript", profile("ts", Category::Frontend)),
    ("ts", profile("ts", Category::Frontend)),
    ("tsx", profile("tsx", Category::Frontend)),
    ("vue", profile("vue", Category::Frontend)),
    ("svelte", profile("svelte", Category::Frontend)),
    ("html", profile("html", Category::Frontend)),
    ("css", profile("css", Category::Styling)),
    ("scss", profile("scss", Category::Styling)),
    ("sass", profile("sass", Category::Styling)),
    ("less", profile("less", Category::Styling)),
    ("python", profile("py", Category::Backend)),
    ("py", profile("py", Category::Backend)),
    ("java", profile("java", Category::Backend)),
    ("kotlin", profile("kt", Category::Backend)),
    ("go", profile("go", Category::Backend)),
    ("rust", profile("rs", Category::Backend)),
    ("rs", profile("rs", Category::Backend)),
    ("php", profile("php", Category::Backend)),
    ("ruby", profile("rb", Category::Backend)),
    ("csharp", profile("cs", Category::Backend)),
    ("cs", profile("cs", Category::Backend)),
    ("cpp", profile("cpp", Category::Backend)),
    ("c++", profile("cpp", Category::Backend)),
    ("c", profile("c", Category::Backend)),
    ("swift", profile("swift", Category::Backend)),
    ("sql", profile("sql", Category::Database)),
    ("prisma", profile("prisma", Category::Database)),
    ("graphql", profile("graphql", Category::Database)),
    ("json", profile("json", Category::Config)),
    ("yaml", profile("yml", Category::Config)),
    ("yml", profile("yml", Category::Config)),
    ("toml", profile("toml", Category::Config)),
    ("ini", profile("ini", Category::Config)),
    ("env", profile("env", Category::Config)),
    ("xml", profile("xml", Category::Config)),
    ("markdown", profile("md", Category::Docs)),
    ("md", profile("md", Category::Docs)),
    ("dockerfile", profile("dockerfile", Category::Devops)),
    ("docker", profile("dockerfile", Category::Devops)),
    ("bash", profile("sh", Category::Devops)),
    ("sh", profile("sh", Category::Devops)),
    ("shell", profile("sh", Category::Devops)),
    ("powershell", profile("ps1", Category::Devops)),
    ("makefile", profile("mk", Category::Devops)),
    ("gherkin", profile("feature", Category::Testing)),
    ("feature", profile("feature", Category::Testing)),
    ("cucumber", profile("feature", Category::Testing)),
    ("robot", profile("robot", Category::Testing)),
];

/// Look up the profile for a fence tag; unknown tags map to `{txt, other}`
#[must_use]
pub fn language_profile(tag: &str) -> LanguageProfile {
    let tag = tag.trim();
    LANGUAGE_TABLE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(tag))
        .map_or(UNKNOWN_PROFILE, |(_, profile)| *profile)
}
