//! Template error types.

use thiserror::Error;

/// Errors raised while extracting or resolving template placeholders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    #[error("Malformed placeholder at offset {offset} (line {line}): {reason}")]
    MalformedPlaceholder {
        offset: usize,
        line: u32,
        reason: &'static str,
    },

    #[error("Path not found in context: {path}")]
    PathNotFound { path: String },

    #[error("Path does not resolve to a scalar value: {path}")]
    PathNotScalar { path: String },
}

impl PlaceholderError {
    /// Build a `MalformedPlaceholder` for `offset` within `template`.
    pub(crate) fn malformed(template: &str, offset: usize, reason: &'static str) -> Self {
        let newlines = template.as_bytes()[..offset]
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        PlaceholderError::MalformedPlaceholder {
            offset,
            line: 1 + newlines as u32,
            reason,
        }
    }
}

/// Result type for template operations.
pub type PlaceholderResult<T> = Result<T, PlaceholderError>;
