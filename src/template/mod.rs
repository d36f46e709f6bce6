//! Reference-aware text templates.
//!
//! Raw text may embed inline references as double-brace wrapped JSON
//! objects. This module parses such text into ordered literal/token
//! segments and serializes segments back to the canonical raw string:
//!
//! - [`Template::parse`]: raw text → segments, infallible and fail-open
//! - [`Template::raw`]: segments → canonical raw text
//! - [`Template::transform`]: rewrite tokens in place, e.g. after a rename
//!
//! The raw string is the persisted configuration value; segments are a
//! transient view derived on demand.

mod parser;
mod types;

pub use types::{RefKind, Segment, TokenRef};

/// An ordered run of literal and token segments parsed from raw text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse raw text into segments.
    ///
    /// Never fails: a `{{...}}` span that does not decode to a complete
    /// token stays literal text, so malformed braces never destroy
    /// user-authored prose.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: parser::split_segments(raw),
        }
    }

    /// Segments in document order. Adjacent literals are always merged.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the source text was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Tokens in document order.
    pub fn tokens(&self) -> impl Iterator<Item = &TokenRef> {
        self.segments.iter().filter_map(Segment::as_token)
    }

    /// Number of token segments.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }

    /// Serialize back to canonical raw text.
    ///
    /// Literals emit verbatim; tokens emit their fixed-key-order encoding,
    /// so re-parsing the result yields a value-equal segment sequence.
    #[must_use]
    pub fn raw(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(token) => out.push_str(&token.encode()),
            }
        }
        out
    }

    /// Rewrite every token through `f`, leaving literal text untouched.
    ///
    /// Used when a referent changes identity elsewhere (a rename, a
    /// validity sweep) without disturbing the surrounding prose.
    pub fn transform<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut TokenRef),
    {
        for segment in &mut self.segments {
            if let Segment::Token(token) = segment {
                f(token);
            }
        }
    }
}
