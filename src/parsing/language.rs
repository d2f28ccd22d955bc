//! Language detection and enumeration.
//!
//! Detection is extension-based only. The extension map is authoritative:
//! an extension outside it yields no language and, downstream, empty
//! extraction output rather than an error.

use serde::{Deserialize, Serialize};

/// Supported programming languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    JavaScript,
    TypeScript,
    Go,
    Python,
    Rust,
    /// C and C++ share one tag; the registry picks the grammar per
    /// extension (`.c`/`.h` use the C grammar, the rest C++).
    Cpp,
    Java,
    CSharp,
    Zig,
    Php,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" => Some(Language::JavaScript),
            "ts" | "tsx" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            "py" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "cpp" | "cc" | "cxx" | "c" | "h" | "hpp" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "cs" => Some(Language::CSharp),
            "zig" => Some(Language::Zig),
            "php" | "phtml" => Some(Language::Php),
            _ => None,
        }
    }

    /// Detect language from file path.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Lowercase tag used in scope records and cache keys.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::CSharp => "csharp",
            Language::Zig => "zig",
            Language::Php => "php",
        }
    }

    /// Get default file extensions for this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::JavaScript => &["js", "jsx"],
            Language::TypeScript => &["ts", "tsx"],
            Language::Go => &["go"],
            Language::Python => &["py"],
            Language::Rust => &["rs"],
            Language::Cpp => &["cpp", "cc", "cxx", "c", "h", "hpp"],
            Language::Java => &["java"],
            Language::CSharp => &["cs"],
            Language::Zig => &["zig"],
            Language::Php => &["php", "phtml"],
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Go => "Go",
            Language::Python => "Python",
            Language::Rust => "Rust",
            Language::Cpp => "C/C++",
            Language::Java => "Java",
            Language::CSharp => "C#",
            Language::Zig => "Zig",
            Language::Php => "PHP",
        }
    }

    pub fn all() -> &'static [Language] {
        &[
            Language::JavaScript,
            Language::TypeScript,
            Language::Go,
            Language::Python,
            Language::Rust,
            Language::Cpp,
            Language::Java,
            Language::CSharp,
            Language::Zig,
            Language::Php,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Language tag for a filename extension, or `"unknown"`.
pub fn detect_language_tag(ext: &str) -> &'static str {
    Language::from_extension(ext)
        .map(|l| l.tag())
        .unwrap_or("unknown")
}
