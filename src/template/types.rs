//! Token and segment types for reference-aware text.

use serde::{Deserialize, Serialize};

/// The kind of external object a token refers to.
///
/// The kind decides which external registry resolves the token's path;
/// the core never interprets the path itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefKind {
    /// Output port of another graph node.
    #[serde(rename = "node-output-reference")]
    NodeOutput,
    /// An attached asset (file, image, document).
    #[serde(rename = "asset-reference")]
    Asset,
    /// An invocable tool.
    #[serde(rename = "tool-reference")]
    Tool,
}

impl RefKind {
    /// The wire-format discriminator string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NodeOutput => "node-output-reference",
            Self::Asset => "asset-reference",
            Self::Tool => "tool-reference",
        }
    }
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single inline reference as embedded in raw text.
///
/// Serde field order is the canonical key order of the wire format;
/// [`TokenRef::encode`] emits keys in exactly this order so serialized
/// tokens diff deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    #[serde(rename = "type")]
    kind: RefKind,
    path: String,
    title: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    invalid: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl TokenRef {
    /// Create a token for a referent the registry has already identified.
    pub fn new(kind: RefKind, path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            title: title.into(),
            mime_type: None,
            invalid: false,
        }
    }

    /// Attach a media type, recorded at insertion time for icon selection.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Which external registry resolves this token.
    #[must_use]
    pub const fn kind(&self) -> RefKind {
        self.kind
    }

    /// Opaque referent id, meaningful only to the external registry.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Display label, captured when the token was created.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Media type of the referent, if one was recorded.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Whether the referent no longer resolves.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Replace the display label (used when a referent is renamed).
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Flag or clear the unresolved-referent state.
    pub const fn set_invalid(&mut self, invalid: bool) {
        self.invalid = invalid;
    }

    /// Canonical wire encoding, `{{"type":...,"path":...,"title":...}}`.
    ///
    /// Built as preamble + JSON title + postamble so the three rendered
    /// spans of an island concatenate to exactly this string.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = self.preamble();
        out.push_str(&self.title_json());
        out.push_str(&self.postamble());
        out
    }

    /// Everything in the encoding before the JSON-encoded title.
    #[must_use]
    pub fn preamble(&self) -> String {
        format!(
            "{{{{\"type\":\"{}\",\"path\":{},\"title\":",
            self.kind.as_str(),
            json_string(&self.path)
        )
    }

    /// The display title as a JSON string, quotes included.
    #[must_use]
    pub fn title_json(&self) -> String {
        json_string(&self.title)
    }

    /// Everything in the encoding after the JSON-encoded title.
    #[must_use]
    pub fn postamble(&self) -> String {
        let mut out = String::new();
        if let Some(mime_type) = &self.mime_type {
            out.push_str(",\"mimeType\":");
            out.push_str(&json_string(mime_type));
        }
        if self.invalid {
            out.push_str(",\"invalid\":true");
        }
        out.push_str("}}");
        out
    }
}

/// JSON-encode a string, quotes and escapes included. Infallible.
fn json_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// One run of parsed raw text: literal characters or an inline token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain user-authored text, emitted verbatim.
    Literal(String),
    /// An atomic inline reference.
    Token(TokenRef),
}

impl Segment {
    /// True for literal text.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// True for an inline token.
    #[must_use]
    pub const fn is_token(&self) -> bool {
        matches!(self, Self::Token(_))
    }

    /// The literal text, if this is a literal segment.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(text) => Some(text),
            Self::Token(_) => None,
        }
    }

    /// The token, if this is a token segment.
    #[must_use]
    pub const fn as_token(&self) -> Option<&TokenRef> {
        match self {
            Self::Token(token) => Some(token),
            Self::Literal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- RefKind ---

    #[test]
    fn test_kind_strings_match_wire_format() {
        assert_eq!(RefKind::NodeOutput.as_str(), "node-output-reference");
        assert_eq!(RefKind::Asset.as_str(), "asset-reference");
        assert_eq!(RefKind::Tool.as_str(), "tool-reference");
    }

    #[test]
    fn test_kind_serde_round_trip() {
        for kind in [RefKind::NodeOutput, RefKind::Asset, RefKind::Tool] {
            let json = serde_json::to_string(&kind).expect("serialize");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: RefKind = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, kind);
        }
    }

    // --- TokenRef encoding ---

    #[test]
    fn test_encode_fixed_key_order() {
        let token = TokenRef::new(RefKind::Asset, "a1", "Photo");
        assert_eq!(
            token.encode(),
            r#"{{"type":"asset-reference","path":"a1","title":"Photo"}}"#
        );
    }

    #[test]
    fn test_encode_matches_serde_derive() {
        let token = TokenRef::new(RefKind::Tool, "search-tool", "Search").with_mime_type("text/plain");
        let derived = serde_json::to_string(&token).expect("serialize");
        assert_eq!(token.encode(), format!("{{{derived}}}"));
    }

    #[test]
    fn test_encode_is_preamble_title_postamble() {
        let mut token = TokenRef::new(RefKind::NodeOutput, "node-7|out", "Result \"A\"");
        token.set_invalid(true);
        let spans = format!("{}{}{}", token.preamble(), token.title_json(), token.postamble());
        assert_eq!(spans, token.encode());
    }

    #[test]
    fn test_encode_escapes_json_strings() {
        let token = TokenRef::new(RefKind::Asset, "a\\b", "say \"hi\"\n");
        let encoded = token.encode();
        let inner: TokenRef =
            serde_json::from_str(&encoded[1..encoded.len() - 1]).expect("inner json parses");
        assert_eq!(inner, token);
    }

    #[test]
    fn test_invalid_serialized_only_when_set() {
        let mut token = TokenRef::new(RefKind::Asset, "a1", "Photo");
        assert!(!token.encode().contains("invalid"));
        token.set_invalid(true);
        assert!(token.encode().ends_with(",\"invalid\":true}}"));
    }

    #[test]
    fn test_mime_type_serialized_after_title() {
        let token = TokenRef::new(RefKind::Asset, "a1", "Photo").with_mime_type("image/png");
        assert_eq!(
            token.encode(),
            r#"{{"type":"asset-reference","path":"a1","title":"Photo","mimeType":"image/png"}}"#
        );
    }

    // --- Segment ---

    #[test]
    fn test_segment_accessors() {
        let literal = Segment::Literal("hello".to_string());
        let token = Segment::Token(TokenRef::new(RefKind::Tool, "t1", "Search"));
        assert!(literal.is_literal());
        assert!(!literal.is_token());
        assert_eq!(literal.as_literal(), Some("hello"));
        assert!(literal.as_token().is_none());
        assert!(token.is_token());
        assert_eq!(token.as_token().map(TokenRef::title), Some("Search"));
    }
}
