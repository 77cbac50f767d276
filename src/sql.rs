// SQL module - lexing and statement classification

pub mod error;
pub mod lexer;
pub mod statement;
pub mod token;

pub use error::{LexError, LexResult};
pub use lexer::Lexer;
pub use statement::*;
pub use token::*;
