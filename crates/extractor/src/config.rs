use crate::language::Language;
use serde::{Deserialize, Serialize};

/// Configuration for source extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Languages to read (empty = all supported languages)
    pub supported_languages: Vec<String>,

    /// Record caller -> callee edges between functions of the same file
    pub include_callflow: bool,

    /// Extract what can be extracted from files with syntax errors instead of failing
    pub skip_on_syntax_error: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            supported_languages: vec![],
            include_callflow: true,
            skip_on_syntax_error: false,
        }
    }
}

impl ExtractorConfig {
    /// Restrict extraction to the named languages
    pub fn for_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported_languages: languages.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Whether files of `language` should be read
    pub fn allows(&self, language: Language) -> bool {
        language.supports_ast()
            && (self.supported_languages.is_empty()
                || self
                    .supported_languages
                    .iter()
                    .any(|name| Language::from_name(name) == Some(language)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for name in &self.supported_languages {
            if Language::from_name(name).is_none() {
                return Err(format!("unknown language '{name}'"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_everything_parsable() {
        let config = ExtractorConfig::default();
        assert!(config.allows(Language::Go));
        assert!(config.allows(Language::TypeScript));
        assert!(!config.allows(Language::Unknown));
        assert!(config.include_callflow);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn language_filter() {
        let config = ExtractorConfig::for_languages(["go", "Python"]);
        assert!(config.allows(Language::Go));
        assert!(config.allows(Language::Python));
        assert!(!config.allows(Language::Rust));
    }

    #[test]
    fn unknown_language_is_invalid() {
        let config = ExtractorConfig::for_languages(["go", "fortran"]);
        assert_eq!(config.validate(), Err("unknown language 'fortran'".to_string()));
    }
}
