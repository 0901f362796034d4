use crate::model::{Call, Source};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::Path;

/// A function-like declaration and the comment text attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Bare name (`drive`)
    pub name: String,

    /// Name including its enclosing scopes (`api::Car::drive`, `pkg.(*T).Save`)
    pub qualified_name: String,

    pub file_path: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Comment text with comment markers removed, one comment line per text line
    pub comment: String,
}

impl FunctionRecord {
    #[must_use]
    pub fn to_source(&self) -> Source {
        Source {
            function: self.qualified_name.clone(),
            file: self.file_path.clone(),
            line: self.start_line,
        }
    }

    /// `file:start:end:name`
    #[must_use]
    pub fn location(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.file_path, self.start_line, self.end_line, self.name
        )
    }
}

/// Everything the reader needs from one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFile {
    pub file_path: String,

    /// File-scope comment text, scanned for aliases only
    pub file_comment: String,

    /// Declarations in document order
    pub functions: Vec<FunctionRecord>,

    /// Call-flow edges between functions of this file
    pub calls: Vec<Call>,
}

/// Locates function declarations and their comments in a source file.
///
/// The reader never looks at source code itself; language support lives entirely
/// behind this trait.
pub trait SourceExtractor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether `path` is a source file this extractor understands
    fn supports(&self, path: &Path) -> bool;

    /// Extract declarations and comments from `content`, read from `path`
    fn extract(&mut self, path: &Path, content: &str) -> Result<ExtractedFile, Self::Error>;
}

/// Extractor for runs that only read annotation files and serialized models
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtractor;

impl SourceExtractor for NoExtractor {
    type Error = Infallible;

    fn supports(&self, _path: &Path) -> bool {
        false
    }

    fn extract(&mut self, path: &Path, _content: &str) -> Result<ExtractedFile, Self::Error> {
        Ok(ExtractedFile {
            file_path: path.display().to_string(),
            ..Default::default()
        })
    }
}
