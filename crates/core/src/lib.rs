//! # ThreatSpec Core
//!
//! Turns threat-modeling sentences written in code comments into a deduplicated
//! threat model, and cross-references what that model says.
//!
//! ## Architecture
//!
//! ```text
//! Inputs (in order)
//!     │
//!     ├──> *.threatspec ─> every line against all five grammars
//!     ├──> *.json       ─> replaces the whole model
//!     └──> source files ─> SourceExtractor
//!                            ├─> file comment: aliases only
//!                            └─> function comments: relations + Source
//!     │
//!     ├──> Registry (first-writer-wins dictionaries, append-only relations)
//!     │
//!     └──> Analysis
//!          ├─> unmitigated exposures (component + threat)
//!          └─> coverage cross-check of mitigating functions
//! ```
//!
//! ## Example
//!
//! ```rust
//! use threatspec_core::{unmitigated, AnnotationReader, NoExtractor};
//!
//! let mut reader = AnnotationReader::new("shop", NoExtractor);
//! reader.read_annotations(
//!     "exposes Database to SQL Injection with string concatenation\n\
//!      mitigates Database against SQL Injection with bound parameters",
//! );
//!
//! let model = reader.model();
//! assert!(unmitigated(model.exposures(), model.mitigations()).is_empty());
//! ```

mod analysis;
mod config;
mod coverage;
mod error;
mod extract;
pub mod grammar;
mod id;
mod model;
mod reader;
mod registry;
mod validate;

pub use analysis::{check_coverage, unmitigated, CoverageFinding};
pub use config::{CheckConfig, DEFAULT_MIN_COVERAGE};
pub use coverage::{CoverageProfile, LocationKey};
pub use error::{Result, ThreatSpecError};
pub use extract::{ExtractedFile, FunctionRecord, NoExtractor, SourceExtractor};
pub use grammar::{AliasClass, AliasStatement, RelationStatement, Statement};
pub use id::{normalize, relation_id, Id};
pub use model::{
    Acceptance, Boundary, Call, Component, Exposure, Metadata, Mitigation, Model, Project,
    Relation, RelationKind, RelationRef, Source, Threat, Transfer, MODEL_NAME, MODEL_VERSION,
};
pub use reader::{AnnotationReader, InputKind, ANNOTATION_EXTENSION, MODEL_EXTENSION};
pub use validate::validate;
