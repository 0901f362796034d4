use serde::{Deserialize, Serialize};

/// Default minimum coverage for mitigating functions, in percent
pub const DEFAULT_MIN_COVERAGE: f64 = 100.0;

/// Settings for the unmitigated-exposure and coverage checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Mitigating functions covered below this percentage are reported
    pub min_coverage: f64,

    /// Report unmitigated exposures without failing the run
    pub warn_only: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
            warn_only: false,
        }
    }
}

impl CheckConfig {
    /// Report findings but never fail
    pub fn warn_only() -> Self {
        Self {
            warn_only: true,
            ..Default::default()
        }
    }

    /// Parse a user-supplied threshold such as `"85"` or `"92.5"`
    pub fn parse_min_coverage(raw: &str) -> Result<f64, String> {
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Bad coverage value: {raw}"))?;
        if !value.is_finite() {
            return Err(format!("Bad coverage value: {raw}"));
        }
        Ok(value)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.min_coverage) {
            return Err(format!(
                "min_coverage ({}) must be between 0 and 100",
                self.min_coverage
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requires_full_coverage() {
        let config = CheckConfig::default();
        assert_eq!(config.min_coverage, 100.0);
        assert!(!config.warn_only);
        assert!(config.validate().is_ok());
        assert!(CheckConfig::warn_only().warn_only);
    }

    #[test]
    fn threshold_bounds() {
        let config = CheckConfig {
            min_coverage: 120.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(CheckConfig::parse_min_coverage(" 92.5 "), Ok(92.5));
        assert!(CheckConfig::parse_min_coverage("lots").is_err());
        assert!(CheckConfig::parse_min_coverage("NaN").is_err());
    }
}
