//! Lexer error types.

use thiserror::Error;

/// Errors raised while tokenizing SQL text.
///
/// Every variant carries the 1-based line where the problem was detected so
/// the caller can point the user at it. Unterminated constructs are detected
/// at end of input, so they also carry the line where they open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unterminated block comment at end of input on line {line} (opened on line {start_line})")]
    UnterminatedComment { line: u32, start_line: u32 },

    #[error("Unterminated quoted literal at end of input on line {line} (opened on line {start_line})")]
    UnterminatedLiteral { line: u32, start_line: u32 },

    #[error("Invalid UTF-8 byte sequence at offset {offset} (line {line})")]
    InvalidByteSequence { line: u32, offset: usize },

    #[error("Expected {expected} on line {line}, found {found}")]
    UnexpectedToken {
        line: u32,
        expected: String,
        found: String,
    },
}

impl LexError {
    /// Line where the error was detected.
    pub fn line(&self) -> u32 {
        match self {
            LexError::UnterminatedComment { line, .. }
            | LexError::UnterminatedLiteral { line, .. }
            | LexError::InvalidByteSequence { line, .. }
            | LexError::UnexpectedToken { line, .. } => *line,
        }
    }
}

/// Result type for lexer operations.
pub type LexResult<T> = Result<T, LexError>;
