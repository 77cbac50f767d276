//! SQL action templates as stored with a workflow.
//!
//! An action carries a mode (`gui`, `sql` or `sql-safe`), a raw query
//! template and the run context. [`ActionTemplate::prepare`] turns it into
//! SQL ready for the database client, together with the execution path
//! (row-returning query or row-count exec).

use crate::escape::{EscapeError, EscapeMode, Escaper};
use crate::sql::{classify_with_dialect, StatementKind};
use crate::template::{Context, Value};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const FIELD_MODE: &str = "mode";
pub const FIELD_QUERY: &str = "query";
pub const FIELD_CONTEXT: &str = "context";
pub const FIELD_SQL: &str = "sql";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Missing {0} field in action options")]
    MissingField(&'static str),

    #[error("Field {field} must be {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Invalid mode: {0} (expected gui, sql or sql-safe)")]
    InvalidMode(String),

    #[error(transparent)]
    Escape(#[from] EscapeError),
}

pub type ActionResult<T> = Result<T, ActionError>;

/// Query authoring mode of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "gui")]
    Gui,
    #[default]
    #[serde(rename = "sql")]
    Sql,
    #[serde(rename = "sql-safe")]
    SqlSafe,
}

impl Mode {
    pub fn is_safe_mode(&self) -> bool {
        *self == Mode::SqlSafe
    }

    /// Only `sql-safe` binds parameters; the other modes inline values.
    pub fn escape_mode(&self) -> EscapeMode {
        match self {
            Mode::SqlSafe => EscapeMode::Safe,
            Mode::Gui | Mode::Sql => EscapeMode::Unsafe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Gui => "gui",
            Mode::Sql => "sql",
            Mode::SqlSafe => "sql-safe",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gui" => Ok(Mode::Gui),
            "sql" => Ok(Mode::Sql),
            "sql-safe" => Ok(Mode::SqlSafe),
            other => Err(ActionError::InvalidMode(other.to_string())),
        }
    }
}

/// Which database client call runs the prepared SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecPath {
    /// Row-returning query
    Query,
    /// Row-count exec
    Exec,
}

impl fmt::Display for ExecPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecPath::Query => f.write_str("query"),
            ExecPath::Exec => f.write_str("exec"),
        }
    }
}

/// SQL ready to hand to a database client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedQuery {
    pub sql: String,
    pub params: Vec<Value>,
    pub kind: StatementKind,
    pub mode: Mode,
}

impl PreparedQuery {
    pub fn exec_path(&self) -> ExecPath {
        if self.kind.is_read() {
            ExecPath::Query
        } else {
            ExecPath::Exec
        }
    }
}

/// Message reported on the exec path.
pub fn affected_rows_message(rows: u64) -> String {
    format!("Affected {} rows.", rows)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionTemplate {
    pub mode: Mode,
    pub raw_query: String,
    pub context: Context,
}

impl ActionTemplate {
    pub fn new(mode: Mode, raw_query: impl Into<String>, context: Context) -> Self {
        Self {
            mode,
            raw_query: raw_query.into(),
            context,
        }
    }

    /// Decode mode, query and context from raw action options.
    pub fn from_options(options: &JsonValue) -> ActionResult<Self> {
        let mode = match options.get(FIELD_MODE) {
            None => return Err(ActionError::MissingField(FIELD_MODE)),
            Some(JsonValue::String(s)) => s.parse()?,
            Some(_) => {
                return Err(ActionError::FieldType {
                    field: FIELD_MODE,
                    expected: "a string",
                })
            }
        };
        let mut template = ActionTemplate {
            mode,
            ..Default::default()
        };
        template.set_raw_query_and_context(options)?;
        Ok(template)
    }

    /// Read the raw query and context out of the untouched action options.
    ///
    /// `query` is either the template string itself or an object holding it
    /// under `sql`.
    pub fn set_raw_query_and_context(&mut self, options: &JsonValue) -> ActionResult<()> {
        if !options.is_object() {
            return Err(ActionError::FieldType {
                field: "options",
                expected: "an object",
            });
        }

        self.raw_query = match options.get(FIELD_QUERY) {
            None => return Err(ActionError::MissingField(FIELD_QUERY)),
            Some(JsonValue::String(query)) => query.clone(),
            Some(JsonValue::Object(query)) => match query.get(FIELD_SQL) {
                None => return Err(ActionError::MissingField("query.sql")),
                Some(JsonValue::String(sql)) => sql.clone(),
                Some(_) => {
                    return Err(ActionError::FieldType {
                        field: "query.sql",
                        expected: "a string",
                    })
                }
            },
            Some(_) => {
                return Err(ActionError::FieldType {
                    field: FIELD_QUERY,
                    expected: "a string or an object",
                })
            }
        };

        self.context = match options.get(FIELD_CONTEXT) {
            None => return Err(ActionError::MissingField(FIELD_CONTEXT)),
            Some(JsonValue::Object(map)) => Context::from(map.clone()),
            Some(_) => {
                return Err(ActionError::FieldType {
                    field: FIELD_CONTEXT,
                    expected: "an object",
                })
            }
        };

        Ok(())
    }

    pub fn is_safe_mode(&self) -> bool {
        self.mode.is_safe_mode()
    }

    /// Escape the raw query for the escaper's dialect and classify the result.
    pub fn prepare(&self, escaper: &Escaper) -> ActionResult<PreparedQuery> {
        let escaped = escaper.escape(&self.raw_query, &self.context, self.mode.escape_mode())?;
        let kind = classify_with_dialect(&escaped.rewritten_sql, *escaper.dialect());
        debug!(
            "prepared {} statement in {} mode with {} parameter(s)",
            kind,
            self.mode,
            escaped.bind_values.len()
        );
        Ok(PreparedQuery {
            sql: escaped.rewritten_sql,
            params: escaped.bind_values,
            kind,
            mode: self.mode,
        })
    }
}
