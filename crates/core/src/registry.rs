//! Create-or-get registration on the model.
//!
//! Boundaries, components and threats are shared by every project and keep the
//! display name they were first registered with. Relation records are appended
//! per project and never merged.

use crate::grammar::{AliasClass, AliasStatement, RelationStatement, Statement};
use crate::id::{normalize, relation_id, Id};
use crate::model::{
    Acceptance, Boundary, Component, Exposure, Mitigation, Model, Project, RelationKind, Source,
    Threat, Transfer,
};
use std::collections::BTreeMap;

impl Model {
    /// Register a boundary, deriving the identifier from `name` unless one is given.
    ///
    /// An empty name registers nothing and returns the empty identifier.
    pub fn add_boundary(&mut self, id: Option<Id>, name: &str) -> Id {
        create_or_get(&mut self.boundaries, id, name, |name| Boundary {
            name: name.to_string(),
            description: None,
        })
    }

    pub fn add_component(&mut self, id: Option<Id>, name: &str) -> Id {
        create_or_get(&mut self.components, id, name, |name| Component {
            name: name.to_string(),
            description: None,
        })
    }

    pub fn add_threat(&mut self, id: Option<Id>, name: &str) -> Id {
        create_or_get(&mut self.threats, id, name, |name| Threat {
            name: name.to_string(),
            reference: None,
        })
    }

    /// Bind the alias identifier to its display text in the alias's category
    pub fn add_alias(&mut self, alias: &AliasStatement) -> Id {
        let id = Some(alias.id.clone());
        match alias.class {
            AliasClass::Boundary => self.add_boundary(id, &alias.text),
            AliasClass::Component => self.add_component(id, &alias.text),
            AliasClass::Threat => self.add_threat(id, &alias.text),
        }
    }

    pub fn add_mitigation(&mut self, project: &str, id: Id, record: Mitigation) {
        append(&mut self.project_mut(project).mitigations, id, record);
    }

    pub fn add_exposure(&mut self, project: &str, id: Id, record: Exposure) {
        append(&mut self.project_mut(project).exposures, id, record);
    }

    pub fn add_transfer(&mut self, project: &str, id: Id, record: Transfer) {
        append(&mut self.project_mut(project).transfers, id, record);
    }

    pub fn add_acceptance(&mut self, project: &str, id: Id, record: Acceptance) {
        append(&mut self.project_mut(project).acceptances, id, record);
    }

    /// Register everything a parsed statement names and file its record.
    ///
    /// Returns the alias identifier for aliases and the relation identifier otherwise.
    pub fn register(&mut self, project: &str, statement: &Statement, source: Option<&Source>) -> Id {
        match statement {
            Statement::Alias(alias) => self.add_alias(alias),
            Statement::Mitigation(fields) => {
                self.register_relation(project, RelationKind::Mitigation, fields, source)
            }
            Statement::Exposure(fields) => {
                self.register_relation(project, RelationKind::Exposure, fields, source)
            }
            Statement::Transfer(fields) => {
                self.register_relation(project, RelationKind::Transfer, fields, source)
            }
            Statement::Acceptance(fields) => {
                self.register_relation(project, RelationKind::Acceptance, fields, source)
            }
        }
    }

    fn register_relation(
        &mut self,
        project: &str,
        kind: RelationKind,
        fields: &RelationStatement,
        source: Option<&Source>,
    ) -> Id {
        let id = relation_id(&fields.text);
        let boundary = fields
            .boundary
            .as_deref()
            .map(|name| self.add_boundary(None, name))
            .filter(|id| !id.is_empty());
        let component = self.add_component(None, &fields.component);
        let threat = self.add_threat(None, &fields.threat);

        let text = fields.text.clone();
        let reference = fields.reference.clone();
        let source = source.cloned();

        match kind {
            RelationKind::Mitigation => self.add_mitigation(
                project,
                id.clone(),
                Mitigation {
                    text,
                    boundary,
                    component,
                    threat,
                    reference,
                    source,
                },
            ),
            RelationKind::Exposure => self.add_exposure(
                project,
                id.clone(),
                Exposure {
                    text,
                    boundary,
                    component,
                    threat,
                    reference,
                    source,
                },
            ),
            RelationKind::Transfer => self.add_transfer(
                project,
                id.clone(),
                Transfer {
                    text,
                    boundary,
                    component,
                    threat,
                    reference,
                    source,
                },
            ),
            RelationKind::Acceptance => self.add_acceptance(
                project,
                id.clone(),
                Acceptance {
                    text,
                    boundary,
                    component,
                    threat,
                    reference,
                    source,
                },
            ),
        }

        log::debug!("{} {id} filed under project '{project}'", kind.as_str());
        id
    }

    fn project_mut(&mut self, project: &str) -> &mut Project {
        self.projects.entry(project.to_string()).or_default()
    }
}

fn create_or_get<T>(
    map: &mut BTreeMap<Id, T>,
    id: Option<Id>,
    name: &str,
    make: impl FnOnce(&str) -> T,
) -> Id {
    if name.is_empty() {
        return Id::empty();
    }

    let id = id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| normalize(name));
    map.entry(id.clone()).or_insert_with(|| make(name));
    id
}

fn append<T>(map: &mut BTreeMap<Id, Vec<T>>, id: Id, record: T) {
    map.entry(id).or_default().push(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_line;
    use pretty_assertions::assert_eq;

    fn source(function: &str, line: usize) -> Source {
        Source {
            function: function.to_string(),
            file: "main.go".to_string(),
            line,
        }
    }

    #[test]
    fn first_writer_wins() {
        let mut model = Model::new("demo");
        let id = model.add_component(None, "Web Server");
        assert_eq!(id.as_str(), "@web_server");

        let again = model.add_component(Some(Id::new_unchecked("@web_server")), "Other Name");
        assert_eq!(again, id);
        assert_eq!(model.components[&id].name, "Web Server");
        assert_eq!(model.components.len(), 1);
    }

    #[test]
    fn empty_boundary_registers_nothing() {
        let mut model = Model::new("demo");
        let id = model.add_boundary(None, "");
        assert!(id.is_empty());
        assert!(model.boundaries.is_empty());
    }

    #[test]
    fn alias_forces_identifier() {
        let mut model = Model::new("demo");
        let Some(Statement::Alias(alias)) = parse_line("alias threat @sqli to SQL Injection") else {
            panic!("expected alias");
        };
        let id = model.add_alias(&alias);
        assert_eq!(id.as_str(), "@sqli");
        assert_eq!(model.threats[&id].name, "SQL Injection");
        assert!(!model.threats.contains_key(&normalize("SQL Injection")));
    }

    #[test]
    fn same_relation_text_accumulates() {
        let mut model = Model::new("demo");
        let stmt = parse_line("mitigates Database against SQLi with prepared statements").unwrap();
        let first = model.register("demo", &stmt, Some(&source("pkg.A", 3)));
        let second = model.register("demo", &stmt, Some(&source("pkg.B", 9)));
        assert_eq!(first, second);

        let records = &model.projects["demo"].mitigations[&first];
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source.as_ref().unwrap().function, "pkg.A");
        assert_eq!(records[1].source.as_ref().unwrap().function, "pkg.B");
    }

    #[test]
    fn relation_without_boundary_creates_no_boundary_node() {
        let mut model = Model::new("demo");
        let stmt = parse_line("exposes Database to SQL Injection with string concatenation").unwrap();
        let id = model.register("demo", &stmt, None);

        let exposure = &model.projects["demo"].exposures[&id][0];
        assert_eq!(exposure.boundary, None);
        assert!(model.boundaries.is_empty());
        assert!(model.components.contains_key(&exposure.component));
        assert!(model.threats.contains_key(&exposure.threat));
    }

    #[test]
    fn relation_with_boundary_registers_it() {
        let mut model = Model::new("demo");
        let stmt = parse_line("transfers DoS to Internet:CDN with provider scrubbing (SLA 4.2)").unwrap();
        let id = model.register("demo", &stmt, None);

        let transfer = &model.projects["demo"].transfers[&id][0];
        assert_eq!(transfer.boundary.as_ref().unwrap().as_str(), "@internet");
        assert_eq!(transfer.reference.as_deref(), Some("SLA 4.2"));
        assert_eq!(model.boundaries[&normalize("Internet")].name, "Internet");
    }

    #[test]
    fn appending_to_unknown_project_creates_it() {
        let mut model = Model::new("demo");
        let stmt = parse_line("accepts Spoofing to Kiosk with physical controls").unwrap();
        model.register("other", &stmt, None);
        assert_eq!(model.projects["other"].acceptances.len(), 1);
        assert_eq!(model.projects["demo"].record_count(), 0);
    }
}
