//! Per-function coverage profiles.
//!
//! Two line shapes are understood:
//!
//! ```text
//! store/db.go:42:        Save            87.5%
//! store/db.go	42	Save	87.5
//! ```
//!
//! Everything else (headers, `total:` lines, blank lines) is ignored.

use crate::error::Result;
use crate::model::Source;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

const COLON_PATTERN: &str = r"^(.+?):(\d+):\s+(\S+)\s+(\d+(?:\.\d+)?)%\s*$";
const TAB_PATTERN: &str = r"^([^\t]+)\t(\d+)\t([^\t]+)\t(\d+(?:\.\d+)?)%?\s*$";

/// Function location a coverage figure belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub file: String,
    /// 1-indexed start line
    pub line: usize,
    pub function: String,
}

impl LocationKey {
    pub fn new(file: impl Into<String>, line: usize, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Key built from the qualified name of an annotation source
    #[must_use]
    pub fn from_source(source: &Source) -> Self {
        Self::new(source.file.clone(), source.line, source.function.clone())
    }

    /// Key built from the last name segment of an annotation source
    #[must_use]
    pub fn from_source_short(source: &Source) -> Self {
        Self::new(source.file.clone(), source.line, source.short_function())
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.function)
    }
}

/// Location -> percentage mapping parsed from a profile
#[derive(Debug, Clone, Default)]
pub struct CoverageProfile {
    entries: HashMap<LocationKey, f64>,
}

impl CoverageProfile {
    /// Parse profile text. Lines in neither format are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let colon = Regex::new(COLON_PATTERN)?;
        let tab = Regex::new(TAB_PATTERN)?;

        let mut entries = HashMap::new();
        for line in text.lines() {
            let Some(caps) = tab.captures(line).or_else(|| colon.captures(line)) else {
                continue;
            };

            let line_no = caps[2].parse::<usize>().ok().filter(|n| *n > 0);
            let percent = caps[4].parse::<f64>().ok();
            let (Some(line_no), Some(percent)) = (line_no, percent) else {
                log::debug!("Ignoring coverage line: {line}");
                continue;
            };

            let key = LocationKey::new(caps[1].trim(), line_no, caps[3].trim());
            entries.insert(key, percent);
        }

        log::debug!("Parsed {} coverage entries", entries.len());
        Ok(Self { entries })
    }

    #[must_use]
    pub fn get(&self, key: &LocationKey) -> Option<f64> {
        self.entries.get(key).copied()
    }

    /// Coverage for an annotation source, trying the qualified name before the short one
    #[must_use]
    pub fn lookup(&self, source: &Source) -> Option<f64> {
        self.get(&LocationKey::from_source(source))
            .or_else(|| self.get(&LocationKey::from_source_short(source)))
    }

    pub fn insert(&mut self, key: LocationKey, percent: f64) {
        self.entries.insert(key, percent);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_go_cover_output() {
        let text = "\
github.com/acme/shop/store/db.go:12:\t\tOpen\t\t100.0%
github.com/acme/shop/store/db.go:42:\t\tSave\t\t87.5%
total:\t\t\t\t\t(statements)\t\t91.2%
";
        let profile = CoverageProfile::parse(text).unwrap();
        assert_eq!(profile.len(), 2);
        assert_eq!(
            profile.get(&LocationKey::new("github.com/acme/shop/store/db.go", 42, "Save")),
            Some(87.5)
        );
    }

    #[test]
    fn parses_tab_format_with_and_without_percent() {
        let text = "src/auth.rs\t7\tlogin\t50.0%\nsrc/auth.rs\t120\tlogout\t75\n";
        let profile = CoverageProfile::parse(text).unwrap();
        assert_eq!(profile.get(&LocationKey::new("src/auth.rs", 7, "login")), Some(50.0));
        assert_eq!(profile.get(&LocationKey::new("src/auth.rs", 120, "logout")), Some(75.0));
    }

    #[test]
    fn rejects_zero_line_and_noise() {
        let text = "mode: set\nfoo.go:0:\tBar\t10.0%\n\nnot a coverage line\n";
        let profile = CoverageProfile::parse(text).unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn lookup_falls_back_to_short_name() {
        let mut profile = CoverageProfile::default();
        profile.insert(LocationKey::new("foo.go", 10, "Bar"), 90.0);

        let source = Source {
            function: "foo.Bar".to_string(),
            file: "foo.go".to_string(),
            line: 10,
        };
        assert_eq!(profile.lookup(&source), Some(90.0));

        profile.insert(LocationKey::new("foo.go", 10, "foo.Bar"), 40.0);
        assert_eq!(profile.lookup(&source), Some(40.0));
    }

    #[test]
    fn key_display() {
        assert_eq!(LocationKey::new("a.go", 3, "Run").to_string(), "a.go:3:Run");
    }
}
