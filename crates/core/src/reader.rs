use crate::error::{Result, ThreatSpecError};
use crate::extract::{ExtractedFile, SourceExtractor};
use crate::grammar::{parse_alias, parse_line, parse_relation};
use crate::model::Model;
use std::fs;
use std::path::Path;

/// File extension of standalone annotation files
pub const ANNOTATION_EXTENSION: &str = "threatspec";

/// File extension of serialized models
pub const MODEL_EXTENSION: &str = "json";

/// How an input file is consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Source code: per-function comments via the extractor
    Source,
    /// Line-oriented annotation file
    Annotations,
    /// Previously serialized model; replaces the current one
    Model,
}

impl InputKind {
    /// Classify by extension; `None` means the file is not an input
    pub fn classify<E: SourceExtractor>(path: &Path, extractor: &E) -> Option<Self> {
        let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        if ext.eq_ignore_ascii_case(ANNOTATION_EXTENSION) {
            Some(Self::Annotations)
        } else if ext.eq_ignore_ascii_case(MODEL_EXTENSION) {
            Some(Self::Model)
        } else if extractor.supports(path) {
            Some(Self::Source)
        } else {
            None
        }
    }
}

/// Feeds annotation inputs, in order, into one model for one active project
pub struct AnnotationReader<E> {
    extractor: E,
    project: String,
    model: Model,
}

impl<E: SourceExtractor> AnnotationReader<E> {
    pub fn new(project: impl Into<String>, extractor: E) -> Self {
        let project = project.into();
        let model = Model::new(project.clone());
        Self {
            extractor,
            project,
            model,
        }
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn into_model(self) -> Model {
        self.model
    }

    /// Read every path in order, stopping at the first failure
    pub fn read_paths<I, P>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.read_path(path.as_ref())?;
        }
        Ok(())
    }

    /// Read one file according to its kind. Returns `None` for skipped files.
    pub fn read_path(&mut self, path: &Path) -> Result<Option<InputKind>> {
        let Some(kind) = InputKind::classify(path, &self.extractor) else {
            log::debug!("Skipping {}: not an annotation input", path.display());
            return Ok(None);
        };

        let content = fs::read_to_string(path).map_err(|err| ThreatSpecError::io(path, err))?;
        match kind {
            InputKind::Source => {
                let extracted = self
                    .extractor
                    .extract(path, &content)
                    .map_err(|err| ThreatSpecError::extraction(path, err))?;
                let count = self.read_extracted(&extracted);
                log::debug!(
                    "{}: {} functions, {count} statements",
                    path.display(),
                    extracted.functions.len()
                );
            }
            InputKind::Annotations => {
                let count = self.read_annotations(&content);
                log::debug!("{}: {count} statements", path.display());
            }
            InputKind::Model => {
                self.load_model(&content)?;
                log::debug!("{}: replaced model", path.display());
            }
        }
        Ok(Some(kind))
    }

    /// Source-comment mode. File-scope comments contribute aliases only and are
    /// applied before any function comment; function comments contribute relations
    /// tagged with the function as their source.
    pub fn read_extracted(&mut self, file: &ExtractedFile) -> usize {
        let mut count = 0;

        for line in file.file_comment.lines() {
            if let Some(alias) = parse_alias(line) {
                self.model.add_alias(&alias);
                count += 1;
            }
        }

        for function in &file.functions {
            let source = function.to_source();
            for line in function.comment.lines() {
                if let Some(statement) = parse_relation(line) {
                    self.model.register(&self.project, &statement, Some(&source));
                    count += 1;
                }
            }
        }

        for call in &file.calls {
            if !self.model.callflow.contains(call) {
                self.model.callflow.push(call.clone());
            }
        }

        count
    }

    /// Standalone-annotation mode: every line against every grammar, no source
    pub fn read_annotations(&mut self, text: &str) -> usize {
        let mut count = 0;
        for line in text.lines() {
            if let Some(statement) = parse_line(line) {
                self.model.register(&self.project, &statement, None);
                count += 1;
            }
        }
        count
    }

    /// Serialized-model mode: the loaded document replaces everything read so far
    pub fn load_model(&mut self, json: &str) -> Result<()> {
        self.model = Model::from_json(json)?;
        Ok(())
    }
}
