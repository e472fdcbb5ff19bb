//! Structured hints embedded in NetBox device comments.
//!
//! A device comment may carry one machine-readable line among its free text:
//!
//! ```text
//! Core router, rack 4.
//! `{"cnames": ["gw", "r1"]}`
//! ```
//!
//! The line must start with `` `{ `` and end with `` }` `` once surrounding
//! whitespace is trimmed. The backticks are stripped and the rest is decoded as
//! JSON. Lines that fail to decode are ignored.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Known fields of an embedded comment tag. Unknown keys are ignored.
#[derive(Debug, Default)]
struct CommentTag {
    cnames: Option<Vec<String>>,
}

impl CommentTag {
    /// Decode the known fields of a tag object. A field of the wrong type
    /// counts as absent.
    fn from_object(object: &Map<String, Value>) -> Self {
        let cnames = object
            .get("cnames")
            .and_then(|value| Vec::<String>::deserialize(value).ok());
        Self { cnames }
    }
}

/// Decode a single comment line, returning `None` if it is not a tag.
fn parse_tag_line(line: &str) -> Option<CommentTag> {
    let line = line.trim();
    if !line.starts_with("`{") || !line.ends_with("}`") {
        return None;
    }

    // Both delimiters are single-byte backticks.
    let body = &line[1..line.len() - 1];

    // A repeated key keeps its last value.
    let object: Map<String, Value> = serde_json::from_str(body).ok()?;
    Some(CommentTag::from_object(&object))
}

/// Extract the alternate names declared in a device comment.
///
/// When several lines declare `cnames`, the last one wins.
pub fn extract_cnames(comment: Option<&str>) -> Option<Vec<String>> {
    comment?
        .split('\n')
        .filter_map(parse_tag_line)
        .filter_map(|tag| tag.cnames)
        .last()
}
