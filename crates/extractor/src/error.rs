use thiserror::Error;

/// Result type for extractor operations
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Errors that can occur while extracting functions from source
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The source could not be parsed, or its tree contains syntax errors
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    /// Unsupported language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tree-sitter error
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

impl ExtractorError {
    /// Create a parse error
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitter(msg.into())
    }
}
