//! Read-only reference metadata lookup.
//!
//! The editing core never interprets a token's `path`; an external
//! registry owns the mapping from `(kind, path)` to the object it names.
//! This module defines the narrow lookup surface the core consumes
//! (cosmetic metadata plus resolvability) and one in-memory
//! implementation backed by a flow-step reference catalog.

use crate::template::{RefKind, TokenRef};

/// Human-facing label for a reference kind.
#[must_use]
pub const fn kind_label(kind: RefKind) -> &'static str {
    match kind {
        RefKind::NodeOutput => "Node output",
        RefKind::Asset => "Asset",
        RefKind::Tool => "Tool",
    }
}

/// Cosmetic metadata for one reference. Absence of a registry entry (or
/// of the icon inside one) only degrades the rendering, never the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMetadata {
    icon: Option<String>,
    display_kind: String,
}

impl RefMetadata {
    #[must_use]
    pub fn new(icon: Option<String>, display_kind: impl Into<String>) -> Self {
        Self {
            icon,
            display_kind: display_kind.into(),
        }
    }

    /// Icon glyph, if the registry carries one.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Display label for the reference's kind.
    #[must_use]
    pub fn display_kind(&self) -> &str {
        &self.display_kind
    }
}

/// Metadata lookup the editing core consults for rendering and validity.
pub trait ReferenceRegistry {
    /// Cosmetic metadata for `(kind, path)`, or `None` when the registry
    /// does not know the reference.
    fn metadata(&self, kind: RefKind, path: &str) -> Option<RefMetadata>;

    /// Whether `path` currently resolves for `kind`.
    fn resolves(&self, kind: RefKind, path: &str) -> bool;

    /// Icon for a token, used when projecting it into an island.
    fn icon_for(&self, token: &TokenRef) -> Option<String> {
        self.metadata(token.kind(), token.path())
            .and_then(|metadata| metadata.icon)
    }
}

/// One insertable reference the catalog advertises: the token to insert
/// plus its icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    token: TokenRef,
    icon: Option<String>,
}

impl CatalogEntry {
    #[must_use]
    pub const fn new(token: TokenRef, icon: Option<String>) -> Self {
        Self { token, icon }
    }

    /// The token this entry inserts.
    #[must_use]
    pub const fn token(&self) -> &TokenRef {
        &self.token
    }

    /// Icon glyph shown next to the entry.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }
}

/// In-memory registry backed by an ordered catalog of entries, the shape
/// the flow-step file's `references` array loads into. Order is
/// preserved for picker listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRegistry {
    entries: Vec<CatalogEntry>,
}

impl CatalogRegistry {
    #[must_use]
    pub const fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// All entries, in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn find(&self, kind: RefKind, path: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| entry.token.kind() == kind && entry.token.path() == path)
    }
}

impl ReferenceRegistry for CatalogRegistry {
    fn metadata(&self, kind: RefKind, path: &str) -> Option<RefMetadata> {
        self.find(kind, path)
            .map(|entry| RefMetadata::new(entry.icon.clone(), kind_label(kind)))
    }

    fn resolves(&self, kind: RefKind, path: &str) -> bool {
        self.find(kind, path).is_some()
    }
}
