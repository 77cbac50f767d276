//! Templated-SQL safety layer shared by SQL-speaking connectors.
//!
//! A connector hands a query template and the run context to an
//! [`Escaper`](escape::Escaper), gets back SQL plus ordered bind values, and
//! uses [`classify`](sql::classify) to choose between a row-returning query
//! and a row-count exec.

pub mod action;
pub mod config;
pub mod dialect;
pub mod escape;
pub mod sql;
pub mod template;

pub use action::{affected_rows_message, ActionError, ActionTemplate, ExecPath, Mode, PreparedQuery};
pub use config::{ConfigError, EscaperConfig};
pub use dialect::{DialectId, DialectPolicy, PlaceholderStyle};
pub use escape::{escape, EscapeError, EscapeMode, EscapeResult, Escaper, UnsafeMissing};
pub use sql::{classify, LexError, Lexer, StatementKind};
pub use template::{extract_placeholders, resolve, Context, PlaceholderError, PlaceholderSpan, Value};
