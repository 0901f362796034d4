//! Cross-reference analysis over an assembled model.

use crate::coverage::{CoverageProfile, LocationKey};
use crate::id::Id;
use crate::model::{Exposure, Mitigation};
use std::collections::HashSet;
use std::fmt;

/// Exposures that no mitigation covers, in input order.
///
/// An exposure is covered when some mitigation names the same component and the
/// same threat. Boundaries are not compared.
pub fn unmitigated<'a, E, M>(exposures: E, mitigations: M) -> Vec<&'a Exposure>
where
    E: IntoIterator<Item = &'a Exposure>,
    M: IntoIterator<Item = &'a Mitigation>,
{
    let covered: HashSet<(&Id, &Id)> = mitigations
        .into_iter()
        .map(|m| (&m.component, &m.threat))
        .collect();

    exposures
        .into_iter()
        .filter(|e| !covered.contains(&(&e.component, &e.threat)))
        .collect()
}

/// A coverage warning for one mitigating function
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageFinding {
    /// The profile has no entry for the function
    Missing { location: LocationKey },
    /// The function is covered below the configured minimum
    BelowThreshold {
        location: LocationKey,
        coverage: f64,
        minimum: f64,
    },
}

impl CoverageFinding {
    #[must_use]
    pub fn location(&self) -> &LocationKey {
        match self {
            Self::Missing { location } | Self::BelowThreshold { location, .. } => location,
        }
    }
}

impl fmt::Display for CoverageFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { location } => {
                write!(f, "No coverage information for mitigation function {location}")
            }
            Self::BelowThreshold {
                location,
                coverage,
                minimum,
            } => write!(
                f,
                "Coverage {coverage:.1} < {minimum:.1} for mitigation function {location}"
            ),
        }
    }
}

/// Join mitigation sources against a coverage profile.
///
/// Mitigations without a source are not checked. Findings are warnings; the caller
/// decides what to do with them.
pub fn check_coverage<'a, M>(
    mitigations: M,
    profile: &CoverageProfile,
    minimum: f64,
) -> Vec<CoverageFinding>
where
    M: IntoIterator<Item = &'a Mitigation>,
{
    let mut findings = Vec::new();
    for mitigation in mitigations {
        let Some(source) = mitigation.source.as_ref() else {
            continue;
        };

        let location = LocationKey::from_source_short(source);
        match profile.lookup(source) {
            None => findings.push(CoverageFinding::Missing { location }),
            Some(coverage) if coverage < minimum => findings.push(CoverageFinding::BelowThreshold {
                location,
                coverage,
                minimum,
            }),
            Some(_) => {}
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::normalize;
    use crate::model::Source;
    use pretty_assertions::assert_eq;

    fn source(function: &str, line: usize) -> Option<Source> {
        Some(Source {
            function: function.to_string(),
            file: "foo.go".to_string(),
            line,
        })
    }

    fn exposure(boundary: Option<&str>, component: &str, threat: &str) -> Exposure {
        Exposure {
            text: "weak".to_string(),
            boundary: boundary.map(normalize),
            component: normalize(component),
            threat: normalize(threat),
            reference: None,
            source: None,
        }
    }

    fn mitigation(boundary: Option<&str>, component: &str, threat: &str) -> Mitigation {
        Mitigation {
            text: "control".to_string(),
            boundary: boundary.map(normalize),
            component: normalize(component),
            threat: normalize(threat),
            reference: None,
            source: source("foo.Guard", 20),
        }
    }

    #[test]
    fn boundary_does_not_affect_matching() {
        let exposures = vec![exposure(Some("Internet"), "Database", "SQL Injection")];
        let mitigations = vec![mitigation(Some("Intranet"), "Database", "SQL Injection")];
        assert!(unmitigated(&exposures, &mitigations).is_empty());
    }

    #[test]
    fn unmatched_exposures_keep_input_order() {
        let exposures = vec![
            exposure(None, "Web", "XSS"),
            exposure(None, "Database", "SQL Injection"),
            exposure(None, "Web", "CSRF"),
        ];
        let mitigations = vec![mitigation(None, "Database", "SQL Injection")];

        let open = unmitigated(&exposures, &mitigations);
        let threats: Vec<_> = open.iter().map(|e| e.threat.as_str()).collect();
        assert_eq!(threats, vec!["@xss", "@csrf"]);
    }

    #[test]
    fn component_and_threat_must_both_match() {
        let exposures = vec![exposure(None, "Web", "XSS")];
        let mitigations = vec![
            mitigation(None, "Web", "CSRF"),
            mitigation(None, "Api", "XSS"),
        ];
        assert_eq!(unmitigated(&exposures, &mitigations).len(), 1);
    }

    #[test]
    fn coverage_findings() {
        let mut profile = CoverageProfile::default();
        profile.insert(LocationKey::new("foo.go", 20, "Guard"), 60.0);

        let mut unsourced = mitigation(None, "Web", "XSS");
        unsourced.source = None;
        let mut untested = mitigation(None, "Web", "XSS");
        untested.source = source("foo.Other", 40);
        let mitigations = vec![mitigation(None, "Web", "XSS"), unsourced, untested];

        let findings = check_coverage(&mitigations, &profile, 100.0);
        assert_eq!(
            findings,
            vec![
                CoverageFinding::BelowThreshold {
                    location: LocationKey::new("foo.go", 20, "Guard"),
                    coverage: 60.0,
                    minimum: 100.0,
                },
                CoverageFinding::Missing {
                    location: LocationKey::new("foo.go", 40, "Other"),
                },
            ]
        );
        assert_eq!(
            findings[0].to_string(),
            "Coverage 60.0 < 100.0 for mitigation function foo.go:20:Guard"
        );
        assert!(check_coverage(&mitigations[..1], &profile, 50.0).is_empty());
    }
}
