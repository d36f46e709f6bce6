//! Flow-step document load/save.
//!
//! The demo binary edits the `instruction` field of a flow-step JSON
//! document. The same document carries the reference catalog that the
//! picker offers and the validity sweep checks against.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{CatalogEntry, CatalogRegistry};
use crate::template::{RefKind, TokenRef};

/// Failure loading or saving a flow-step file.
#[derive(Debug, Error)]
pub enum FlowFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed flow-step JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One catalog entry as stored in the flow-step file.
///
/// The first four keys mirror the token wire format; `icon` exists only
/// in the catalog and never travels inside raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    #[serde(rename = "type")]
    kind: RefKind,
    path: String,
    title: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
}

impl ReferenceEntry {
    /// Create a catalog entry for a referent.
    pub fn new(kind: RefKind, path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            title: title.into(),
            mime_type: None,
            icon: None,
        }
    }

    /// Attach a media type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Attach a display icon.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Which external registry resolves this entry.
    #[must_use]
    pub const fn kind(&self) -> RefKind {
        self.kind
    }

    /// Opaque referent id.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Display label shown in the picker and on inserted tokens.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Media type of the referent, if recorded.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Display icon, if the catalog carries one.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// The token inserted when this entry is picked.
    #[must_use]
    pub fn token(&self) -> TokenRef {
        let token = TokenRef::new(self.kind, self.path.clone(), self.title.clone());
        match &self.mime_type {
            Some(mime_type) => token.with_mime_type(mime_type.clone()),
            None => token,
        }
    }
}

/// A flow-step document: a titled instruction plus its reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    title: String,
    instruction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<ReferenceEntry>,
}

impl FlowStep {
    /// Create a document with an empty catalog.
    pub fn new(title: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            instruction: instruction.into(),
            references: Vec::new(),
        }
    }

    /// A small self-contained document used when no file exists yet.
    #[must_use]
    pub fn starter() -> Self {
        let mut step = Self::new("Untitled step", "");
        step.push_reference(
            ReferenceEntry::new(RefKind::NodeOutput, "step-1|output", "Step 1 output")
                .with_icon("\u{26a1}"),
        );
        step.push_reference(
            ReferenceEntry::new(RefKind::Asset, "asset-roadmap", "Roadmap.png")
                .with_mime_type("image/png")
                .with_icon("\u{1f5bc}"),
        );
        step.push_reference(
            ReferenceEntry::new(RefKind::Tool, "tool-web-search", "Web search")
                .with_icon("\u{1f50d}"),
        );
        step
    }

    /// Read and parse a flow-step file.
    pub fn load(path: &Path) -> Result<Self, FlowFileError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the document back as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), FlowFileError> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(path, content)?;
        Ok(())
    }

    /// Display title of the step.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The instruction text the session edits.
    #[must_use]
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Replace the instruction text before saving.
    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.instruction = instruction.into();
    }

    /// The reference catalog stored alongside the instruction.
    #[must_use]
    pub fn references(&self) -> &[ReferenceEntry] {
        &self.references
    }

    /// Add a catalog entry.
    pub fn push_reference(&mut self, entry: ReferenceEntry) {
        self.references.push(entry);
    }

    /// Build the registry the picker and validity sweep consume.
    #[must_use]
    pub fn registry(&self) -> CatalogRegistry {
        let entries = self
            .references
            .iter()
            .map(|entry| CatalogEntry::new(entry.token(), entry.icon.clone()))
            .collect();
        CatalogRegistry::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ReferenceRegistry;
    use tempfile::tempdir;

    fn sample_json() -> &'static str {
        r#"{
  "title": "Draft the announcement",
  "instruction": "Summarize {{\"type\":\"node-output-reference\",\"path\":\"step-1|output\",\"title\":\"Step 1 output\"}} briefly.",
  "references": [
    {
      "type": "node-output-reference",
      "path": "step-1|output",
      "title": "Step 1 output"
    },
    {
      "type": "asset-reference",
      "path": "asset-roadmap",
      "title": "Roadmap.png",
      "mimeType": "image/png",
      "icon": "P"
    }
  ]
}"#
    }

    // --- Loading ---

    #[test]
    fn test_load_parses_document_and_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("step.json");
        fs::write(&path, sample_json()).unwrap();

        let step = FlowStep::load(&path).unwrap();
        assert_eq!(step.title(), "Draft the announcement");
        assert!(step.instruction().starts_with("Summarize "));
        assert_eq!(step.references().len(), 2);

        let asset = &step.references()[1];
        assert_eq!(asset.kind(), RefKind::Asset);
        assert_eq!(asset.mime_type(), Some("image/png"));
        assert_eq!(asset.icon(), Some("P"));
        assert_eq!(step.references()[0].icon(), None);
    }

    #[test]
    fn test_load_missing_references_defaults_to_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("step.json");
        fs::write(&path, r#"{"title":"t","instruction":"hello"}"#).unwrap();

        let step = FlowStep::load(&path).unwrap();
        assert_eq!(step.instruction(), "hello");
        assert!(step.references().is_empty());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        match FlowStep::load(&path) {
            Err(FlowFileError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("step.json");
        fs::write(&path, "{ not json").unwrap();
        match FlowStep::load(&path) {
            Err(FlowFileError::Json(_)) => {}
            other => panic!("expected json error, got {other:?}"),
        }
    }

    // --- Saving ---

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("step.json");

        let mut step = FlowStep::new("Review", "Look at this.");
        step.push_reference(
            ReferenceEntry::new(RefKind::Tool, "tool-web-search", "Web search").with_icon("S"),
        );
        step.save(&path).unwrap();

        let loaded = FlowStep::load(&path).unwrap();
        assert_eq!(loaded, step);
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[test]
    fn test_save_omits_empty_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("step.json");
        FlowStep::new("t", "plain").save(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("references"));
    }

    #[test]
    fn test_set_instruction_feeds_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("step.json");
        let mut step = FlowStep::new("t", "before");
        step.set_instruction("after");
        step.save(&path).unwrap();
        assert_eq!(FlowStep::load(&path).unwrap().instruction(), "after");
    }

    // --- Catalog conversion ---

    #[test]
    fn test_registry_serves_catalog_metadata() {
        let mut step = FlowStep::new("t", "");
        step.push_reference(
            ReferenceEntry::new(RefKind::Asset, "asset-roadmap", "Roadmap.png")
                .with_mime_type("image/png")
                .with_icon("P"),
        );
        let registry = step.registry();

        assert!(registry.resolves(RefKind::Asset, "asset-roadmap"));
        assert!(!registry.resolves(RefKind::Tool, "asset-roadmap"));
        let metadata = registry.metadata(RefKind::Asset, "asset-roadmap").unwrap();
        assert_eq!(metadata.icon(), Some("P"));
        assert_eq!(metadata.display_kind(), "Asset");

        let token = step.references()[0].token();
        assert_eq!(token.mime_type(), Some("image/png"));
        assert_eq!(registry.icon_for(&token).as_deref(), Some("P"));
    }

    #[test]
    fn test_starter_catalog_resolves_itself() {
        let step = FlowStep::starter();
        assert!(step.instruction().is_empty());
        let registry = step.registry();
        for entry in step.references() {
            assert!(registry.resolves(entry.kind(), entry.path()));
        }
    }
}
