//! Run context: the nested key-value data available when a workflow runs.

use super::error::{PlaceholderError, PlaceholderResult};
use super::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Immutable nested mapping that placeholders resolve against.
///
/// Dotted paths walk objects by key and arrays by numeric index, so
/// `trigger.body.items.0.sku` reaches into a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, JsonValue>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object. Any other JSON value is rejected.
    pub fn from_json(json: JsonValue) -> Option<Self> {
        match json {
            JsonValue::Object(map) => Some(Context(map)),
            _ => None,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Walk `path` and return whatever JSON sits there, scalar or not.
    pub fn lookup(&self, path: &str) -> PlaceholderResult<&JsonValue> {
        let not_found = || PlaceholderError::PathNotFound {
            path: path.to_string(),
        };
        let mut segments = path.split('.');
        let first = segments.next().ok_or_else(not_found)?;
        let mut current = self.0.get(first).ok_or_else(not_found)?;
        for segment in segments {
            current = match current {
                JsonValue::Object(map) => map.get(segment),
                JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// Resolve `path` to a scalar value.
    pub fn resolve(&self, path: &str) -> PlaceholderResult<Value> {
        let json = self.lookup(path)?;
        Value::from_json(json).ok_or_else(|| PlaceholderError::PathNotScalar {
            path: path.to_string(),
        })
    }
}

impl From<Map<String, JsonValue>> for Context {
    fn from(map: Map<String, JsonValue>) -> Self {
        Context(map)
    }
}

/// Resolve a dotted `path` against `ctx`.
pub fn resolve(path: &str, ctx: &Context) -> PlaceholderResult<Value> {
    ctx.resolve(path)
}
