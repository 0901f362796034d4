use crate::error::{Result, ThreatSpecError};
use crate::id::Id;
use crate::model::Model;

/// Structural checks on a deserialized model.
///
/// Every identifier must be `@`-shaped, every relation must point at registered
/// components and threats (and a registered boundary when it names one), and the
/// document must carry a name. The first violation is reported.
pub fn validate(model: &Model) -> Result<()> {
    if model.metadata.name.trim().is_empty() {
        return Err(ThreatSpecError::invalid_model("metadata name is empty"));
    }

    check_keys("boundary", model.boundaries.keys())?;
    check_keys("component", model.components.keys())?;
    check_keys("threat", model.threats.keys())?;

    for relation in model.relations() {
        let kind = relation.record.kind().as_str();
        let context = || format!("{kind} {} in project '{}'", relation.id, relation.project);

        if !relation.id.is_well_formed() {
            return Err(ThreatSpecError::invalid_model(format!(
                "malformed identifier for {}",
                context()
            )));
        }

        let component = relation.record.component();
        if !model.components.contains_key(component) {
            return Err(ThreatSpecError::invalid_model(format!(
                "{} references unknown component {component}",
                context()
            )));
        }

        let threat = relation.record.threat();
        if !model.threats.contains_key(threat) {
            return Err(ThreatSpecError::invalid_model(format!(
                "{} references unknown threat {threat}",
                context()
            )));
        }

        if let Some(boundary) = relation.record.boundary() {
            if !model.boundaries.contains_key(boundary) {
                return Err(ThreatSpecError::invalid_model(format!(
                    "{} references unknown boundary {boundary}",
                    context()
                )));
            }
        }
    }

    Ok(())
}

fn check_keys<'a>(what: &str, ids: impl Iterator<Item = &'a Id>) -> Result<()> {
    for id in ids {
        if !id.is_well_formed() {
            return Err(ThreatSpecError::invalid_model(format!(
                "malformed {what} identifier '{id}'"
            )));
        }
    }
    Ok(())
}
