use crate::error::{ExtractorError, Result};
use std::path::Path;

/// Source language of an annotated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Go,
    Python,
    JavaScript,
    TypeScript,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "go" => Language::Go,
            "py" | "pyw" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "mts" | "cts" => Language::TypeScript,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Parse a configured language name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "rust" => Some(Language::Rust),
            "go" | "golang" => Some(Language::Go),
            "python" => Some(Language::Python),
            "javascript" | "js" => Some(Language::JavaScript),
            "typescript" | "ts" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Unknown => "unknown",
        }
    }

    /// Check if this language can be parsed
    pub fn supports_ast(self) -> bool {
        !matches!(self, Language::Unknown)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Rust => Ok(tree_sitter_rust::LANGUAGE.into()),
            Language::Go => Ok(tree_sitter_go::LANGUAGE.into()),
            Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Unknown => Err(ExtractorError::unsupported_language(self.as_str())),
        }
    }

    /// Node kinds tree-sitter uses for comments
    pub fn comment_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["line_comment", "block_comment"],
            Language::Go | Language::Python | Language::JavaScript | Language::TypeScript => {
                &["comment"]
            }
            Language::Unknown => &[],
        }
    }

    /// Whether a trimmed source line is (part of) a comment
    pub fn is_comment_line(self, line: &str) -> bool {
        match self {
            Language::Python => line.starts_with('#'),
            Language::Rust | Language::Go | Language::JavaScript | Language::TypeScript => {
                line.starts_with("//") || line.starts_with("/*") || line.starts_with('*')
            }
            Language::Unknown => false,
        }
    }

    /// Whether a trimmed line is an attribute or decorator sitting between a
    /// comment block and its declaration
    pub fn is_attribute_line(self, line: &str) -> bool {
        match self {
            Language::Rust => line.starts_with("#[") || line.starts_with("#!["),
            Language::Python | Language::JavaScript | Language::TypeScript => line.starts_with('@'),
            Language::Go | Language::Unknown => false,
        }
    }

    /// Whether the language has `/* ... */` block comments
    pub fn has_block_comments(self) -> bool {
        matches!(
            self,
            Language::Rust | Language::Go | Language::JavaScript | Language::TypeScript
        )
    }
}
