use std::path::PathBuf;
use thiserror::Error;

/// Result type for threat-model operations
pub type Result<T> = std::result::Result<T, ThreatSpecError>;

/// Errors that can occur while assembling or loading a threat model
#[derive(Error, Debug)]
pub enum ThreatSpecError {
    /// Failed to read an input file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialized model is not valid JSON or does not match the document shape
    #[error("Malformed model document: {0}")]
    Json(#[from] serde_json::Error),

    /// Serialized model parsed but violates a structural rule
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// The source-function extractor rejected a file
    #[error("Failed to extract functions from {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A built-in line pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ThreatSpecError {
    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid model error
    pub fn invalid_model(msg: impl Into<String>) -> Self {
        Self::InvalidModel(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Wrap an extractor failure
    pub fn extraction(
        path: impl Into<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Extraction {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
