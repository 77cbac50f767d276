//! Placeholder extraction.
//!
//! Placeholders are found by a plain scan of the template text, independent of
//! SQL tokenization: users write them inside string literals too.

use super::error::{PlaceholderError, PlaceholderResult};
use std::ops::Range;

pub const OPEN_DELIMITER: &str = "{{";
pub const CLOSE_DELIMITER: &str = "}}";

/// A `{{path}}` occurrence in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpan {
    /// Byte offset of the opening delimiter
    pub start: usize,
    /// Byte offset just past the closing delimiter
    pub end: usize,
    /// Dotted variable path, surrounding whitespace trimmed
    pub path: String,
}

impl PlaceholderSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Find every placeholder in `template`, ordered by position.
///
/// A stray closing delimiter outside a placeholder is ordinary text.
pub fn extract_placeholders(template: &str) -> PlaceholderResult<Vec<PlaceholderSpan>> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some(found) = template[cursor..].find(OPEN_DELIMITER) {
        let start = cursor + found;
        let inner_start = start + OPEN_DELIMITER.len();
        let rest = &template[inner_start..];

        let close = rest.find(CLOSE_DELIMITER);
        let nested = rest.find(OPEN_DELIMITER);
        let close = match (close, nested) {
            (Some(close), Some(nested)) if nested < close => {
                return Err(PlaceholderError::malformed(
                    template,
                    inner_start + nested,
                    "nested placeholder",
                ));
            }
            (Some(close), _) => close,
            (None, _) => {
                return Err(PlaceholderError::malformed(
                    template,
                    start,
                    "unterminated placeholder",
                ));
            }
        };

        let raw = &rest[..close];
        let path = raw.trim();
        validate_path(template, start, path)?;

        let end = inner_start + close + CLOSE_DELIMITER.len();
        spans.push(PlaceholderSpan {
            start,
            end,
            path: path.to_string(),
        });
        cursor = end;
    }

    Ok(spans)
}

fn validate_path(template: &str, start: usize, path: &str) -> PlaceholderResult<()> {
    if path.is_empty() {
        return Err(PlaceholderError::malformed(template, start, "empty placeholder"));
    }
    if path.split('.').any(|segment| segment.is_empty()) {
        return Err(PlaceholderError::malformed(template, start, "empty path segment"));
    }
    if path.chars().any(|c| c.is_whitespace() || c == '{' || c == '}') {
        return Err(PlaceholderError::malformed(
            template,
            start,
            "invalid character in path",
        ));
    }
    Ok(())
}
