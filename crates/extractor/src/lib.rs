//! # ThreatSpec Extractor
//!
//! Tree-sitter backed [`SourceExtractor`] for Rust, Go, Python, JavaScript and
//! TypeScript.
//!
//! For each source file it reports every function-like declaration with the
//! comment block written above it (plus the docstring in Python), the text of
//! every comment in the file, and the calls between functions of that file.
//!
//! ```text
//! Source Code
//!     │
//!     ├──> Language Detection (from extension)
//!     ├──> Tree-sitter Parsing → AST (syntax errors are fatal by default)
//!     ├──> Declarations
//!     │    ├─> qualified names (`mod::Type::fn`, `pkg.(*T).Fn`, `Class.method`)
//!     │    └─> comment block above each declaration, markers stripped
//!     └──> Call flow (same-file callees, deduplicated in a petgraph DiGraph)
//! ```

mod analyzer;
mod callflow;
mod comments;
mod config;
mod error;
mod language;

pub use analyzer::FunctionAnalyzer;
pub use callflow::CallGraph;
pub use comments::strip_markers;
pub use config::ExtractorConfig;
pub use error::{ExtractorError, Result};
pub use language::Language;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use threatspec_core::{ExtractedFile, SourceExtractor};

/// Extractor holding one parser per language seen so far
pub struct TreeSitterExtractor {
    config: ExtractorConfig,
    analyzers: HashMap<Language, FunctionAnalyzer>,
}

impl TreeSitterExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        config.validate().map_err(ExtractorError::invalid_config)?;
        Ok(Self {
            config,
            analyzers: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Language a path will be read as, if it is read at all
    pub fn language_for(&self, path: &Path) -> Option<Language> {
        let language = Language::from_path(path);
        self.config.allows(language).then_some(language)
    }

    /// Extract from in-memory source of a known language
    pub fn extract_str(
        &mut self,
        content: &str,
        file_path: &str,
        language: Language,
    ) -> Result<ExtractedFile> {
        let analyzer = match self.analyzers.entry(language) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(FunctionAnalyzer::new(language)?),
        };
        let extracted = analyzer.analyze(content, file_path, &self.config)?;
        log::debug!(
            "{file_path}: {} {} functions, {} calls",
            extracted.functions.len(),
            language.as_str(),
            extracted.calls.len()
        );
        Ok(extracted)
    }
}

impl Default for TreeSitterExtractor {
    fn default() -> Self {
        Self {
            config: ExtractorConfig::default(),
            analyzers: HashMap::new(),
        }
    }
}

impl SourceExtractor for TreeSitterExtractor {
    type Error = ExtractorError;

    fn supports(&self, path: &Path) -> bool {
        self.language_for(path).is_some()
    }

    fn extract(&mut self, path: &Path, content: &str) -> Result<ExtractedFile> {
        let language = self
            .language_for(path)
            .ok_or_else(|| ExtractorError::unsupported_language(path.display().to_string()))?;
        self.extract_str(content, &path.display().to_string(), language)
    }
}
