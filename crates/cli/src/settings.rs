use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use threatspec_extractor::ExtractorConfig;

/// Settings file picked up from the working directory when `--config` is not given
pub const DEFAULT_SETTINGS_FILE: &str = "threatspec.toml";

/// Environment fallback for the active project name
pub const PROJECT_ENV: &str = "THREATSPEC_PROJECT";

pub const DEFAULT_PROJECT: &str = "default";

/// Optional `threatspec.toml` contents; command-line flags win over every key
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub project: Option<String>,
    pub min_coverage: Option<f64>,
    pub warn: Option<bool>,
    /// Source languages to read (empty = all)
    pub languages: Vec<String>,
    pub callflow: Option<bool>,
}

impl Settings {
    /// Read `explicit`, or the default file when it exists, or nothing
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_SETTINGS_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        let settings = Self::from_toml(&text)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Active project: flag, then settings file, then environment, then `default`
    pub fn project(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.project.clone())
            .or_else(|| env::var(PROJECT_ENV).ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string())
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            supported_languages: self.languages.clone(),
            include_callflow: self.callflow.unwrap_or(true),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_all_keys() {
        let settings = Settings::from_toml(
            r#"
project = "payments"
min_coverage = 85.0
warn = true
languages = ["go", "python"]
callflow = false
"#,
        )
        .unwrap();

        assert_eq!(settings.project(None), "payments");
        assert_eq!(settings.project(Some("cli")), "cli");
        assert_eq!(settings.min_coverage, Some(85.0));
        assert_eq!(settings.warn, Some(true));

        let extractor = settings.extractor_config();
        assert_eq!(extractor.supported_languages, vec!["go", "python"]);
        assert!(!extractor.include_callflow);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Settings::from_toml("colour = \"blue\"\n").is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/threatspec.toml"))).is_err());
    }
}
