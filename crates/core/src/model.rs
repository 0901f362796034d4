use crate::error::Result;
use crate::id::Id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Document name written into model metadata
pub const MODEL_NAME: &str = "ThreatSpec";

/// Document version written into model metadata
pub const MODEL_VERSION: &str = "0.1";

/// The four relation kinds a project records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Mitigation,
    Exposure,
    Transfer,
    Acceptance,
}

impl RelationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mitigation => "mitigation",
            Self::Exposure => "exposure",
            Self::Transfer => "transfer",
            Self::Acceptance => "acceptance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    /// Unix seconds
    pub created: i64,
    /// Unix seconds
    pub updated: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Boundary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Threat {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Function an annotation was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
    /// Qualified function name
    pub function: String,
    pub file: String,
    /// 1-indexed start line of the function
    pub line: usize,
}

impl Source {
    /// Last segment of the qualified name (`pkg.(*T).Name` -> `Name`, `api::Car::drive` -> `drive`)
    #[must_use]
    pub fn short_function(&self) -> &str {
        self.function
            .rsplit(|c: char| c == '.' || c == ':')
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.function)
    }
}

/// Read access shared by the four relation record types
pub trait Relation {
    fn kind(&self) -> RelationKind;
    fn text(&self) -> &str;
    fn boundary(&self) -> Option<&Id>;
    fn component(&self) -> &Id;
    fn threat(&self) -> &Id;
    fn reference(&self) -> Option<&str>;
    fn source(&self) -> Option<&Source>;
}

// Each record type stores its description under its own JSON key
// (`mitigation`, `exposure`, ...), so the structs are stamped out per kind.
macro_rules! relation_record {
    ($(#[$doc:meta])* $name:ident, $kind:expr, $key:tt) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            #[serde(rename = $key)]
            pub text: String,
            /// `null` when the statement named no boundary
            #[serde(with = "optional_id")]
            pub boundary: Option<Id>,
            pub component: Id,
            pub threat: Id,
            /// Always written, `null` when the statement carried no note
            #[serde(default)]
            pub reference: Option<String>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub source: Option<Source>,
        }

        impl Relation for $name {
            fn kind(&self) -> RelationKind {
                $kind
            }
            fn text(&self) -> &str {
                &self.text
            }
            fn boundary(&self) -> Option<&Id> {
                self.boundary.as_ref()
            }
            fn component(&self) -> &Id {
                &self.component
            }
            fn threat(&self) -> &Id {
                &self.threat
            }
            fn reference(&self) -> Option<&str> {
                self.reference.as_deref()
            }
            fn source(&self) -> Option<&Source> {
                self.source.as_ref()
            }
        }
    };
}

relation_record!(
    /// A component is defended against a threat by a described control
    Mitigation,
    RelationKind::Mitigation,
    "mitigation"
);
relation_record!(
    /// A component is exposed to a threat through a described weakness
    Exposure,
    RelationKind::Exposure,
    "exposure"
);
relation_record!(
    /// Responsibility for a threat against a component is shifted elsewhere
    Transfer,
    RelationKind::Transfer,
    "transfer"
);
relation_record!(
    /// A threat against a component is knowingly tolerated
    Acceptance,
    RelationKind::Acceptance,
    "acceptance"
);

/// Relation lists of one project, keyed by relation identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub mitigations: BTreeMap<Id, Vec<Mitigation>>,
    pub exposures: BTreeMap<Id, Vec<Exposure>>,
    pub transfers: BTreeMap<Id, Vec<Transfer>>,
    pub acceptances: BTreeMap<Id, Vec<Acceptance>>,
}

impl Project {
    /// Total number of relation records of every kind
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.mitigations.values().map(Vec::len).sum::<usize>()
            + self.exposures.values().map(Vec::len).sum::<usize>()
            + self.transfers.values().map(Vec::len).sum::<usize>()
            + self.acceptances.values().map(Vec::len).sum::<usize>()
    }
}

/// Caller -> callee edge between extracted functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Call {
    pub source: String,
    pub destination: String,
}

/// A relation record together with where it is filed
#[derive(Clone, Copy)]
pub struct RelationRef<'a> {
    pub project: &'a str,
    pub id: &'a Id,
    pub record: &'a dyn Relation,
}

/// Root threat-model document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Model {
    pub metadata: Metadata,
    pub boundaries: BTreeMap<Id, Boundary>,
    pub components: BTreeMap<Id, Component>,
    pub threats: BTreeMap<Id, Threat>,
    pub projects: BTreeMap<String, Project>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callflow: Vec<Call>,
}

impl Model {
    /// Empty model holding one empty project
    pub fn new(project: impl Into<String>) -> Self {
        let now = unix_now();
        let mut projects = BTreeMap::new();
        projects.insert(project.into(), Project::default());

        Self {
            metadata: Metadata {
                name: MODEL_NAME.to_string(),
                version: MODEL_VERSION.to_string(),
                created: now,
                updated: now,
            },
            boundaries: BTreeMap::new(),
            components: BTreeMap::new(),
            threats: BTreeMap::new(),
            projects,
            callflow: Vec::new(),
        }
    }

    /// Strictly deserialize and validate a serialized model
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        crate::validate::validate(&model)?;
        Ok(model)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Refresh the `updated` timestamp
    pub fn touch(&mut self) {
        self.metadata.updated = unix_now();
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    /// Every mitigation across all projects, in key order
    pub fn mitigations(&self) -> impl Iterator<Item = &Mitigation> {
        self.projects
            .values()
            .flat_map(|p| p.mitigations.values().flatten())
    }

    /// Every exposure across all projects, in key order
    pub fn exposures(&self) -> impl Iterator<Item = &Exposure> {
        self.projects
            .values()
            .flat_map(|p| p.exposures.values().flatten())
    }

    /// Every relation record of every kind, grouped by project then kind
    #[must_use]
    pub fn relations(&self) -> Vec<RelationRef<'_>> {
        let mut out = Vec::new();
        for (name, project) in &self.projects {
            push_refs(&mut out, name, &project.mitigations);
            push_refs(&mut out, name, &project.exposures);
            push_refs(&mut out, name, &project.transfers);
            push_refs(&mut out, name, &project.acceptances);
        }
        out
    }

    /// Display name of a boundary, empty when unset or unknown
    #[must_use]
    pub fn boundary_name(&self, id: Option<&Id>) -> &str {
        id.and_then(|id| self.boundaries.get(id))
            .map_or("", |b| b.name.as_str())
    }

    #[must_use]
    pub fn component_name<'a>(&'a self, id: &'a Id) -> &'a str {
        self.components.get(id).map_or(id.as_str(), |c| c.name.as_str())
    }

    #[must_use]
    pub fn threat_name<'a>(&'a self, id: &'a Id) -> &'a str {
        self.threats.get(id).map_or(id.as_str(), |t| t.name.as_str())
    }
}

fn push_refs<'a, R: Relation>(
    out: &mut Vec<RelationRef<'a>>,
    project: &'a str,
    map: &'a BTreeMap<Id, Vec<R>>,
) {
    for (id, records) in map {
        for record in records {
            out.push(RelationRef {
                project,
                id,
                record,
            });
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// `Option<Id>` as `null`, reading an empty string back as unset too
mod optional_id {
    use crate::id::Id;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Id>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(id) => serializer.serialize_str(id.as_str()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Id>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()).map(Id::new_unchecked))
    }
}
