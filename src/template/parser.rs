//! Raw-text scanning into literal and token segments.
//!
//! The grammar fails open: any `{{...}}` span that does not decode to a
//! complete token is re-emitted verbatim as literal text. Malformed braces
//! never destroy user-authored text and scanning never errors.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Segment, TokenRef};

/// Candidate token span: double-brace wrapped, non-nested, shortest match.
/// `.` stays within a line, so a span never crosses a newline.
static TOKEN_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?P<json>\{.*?\})\}").expect("token span pattern is valid"));

/// Split raw text into an ordered run of literal and token segments.
///
/// Adjacent literals are merged before returning, so the result never
/// contains two consecutive `Literal` entries.
pub(super) fn split_segments(raw: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in TOKEN_SPAN.captures_iter(raw) {
        let Some(span) = caps.get(0) else { continue };
        if span.start() > cursor {
            segments.push(Segment::Literal(raw[cursor..span.start()].to_string()));
        }
        match decode_span(&caps) {
            Some(token) => segments.push(Segment::Token(token)),
            None => segments.push(Segment::Literal(span.as_str().to_string())),
        }
        cursor = span.end();
    }

    if cursor < raw.len() {
        segments.push(Segment::Literal(raw[cursor..].to_string()));
    }

    merge_adjacent_literals(segments)
}

/// Decode one candidate span, or `None` when it must stay literal.
///
/// Acceptance requires `type`, `path`, and `title` to be present, `type`
/// to be a known kind, and `path` to be non-empty (a reference without a
/// referent id is unusable and stays text).
fn decode_span(caps: &regex::Captures<'_>) -> Option<TokenRef> {
    let json = caps.name("json")?.as_str();
    let token: TokenRef = serde_json::from_str(json).ok()?;
    if token.path().is_empty() {
        return None;
    }
    Some(token)
}

fn merge_adjacent_literals(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let (Some(Segment::Literal(previous)), Segment::Literal(text)) =
            (merged.last_mut(), &segment)
        {
            previous.push_str(text);
        } else {
            merged.push(segment);
        }
    }
    merged
}
