// Template module - placeholder extraction and context resolution

pub mod context;
pub mod error;
pub mod placeholder;
pub mod value;

pub use context::{resolve, Context};
pub use error::{PlaceholderError, PlaceholderResult};
pub use placeholder::{extract_placeholders, PlaceholderSpan, CLOSE_DELIMITER, OPEN_DELIMITER};
pub use value::Value;
