//! Cursor field values and row access.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

/// A primitive sort-key value stored in a cursor and bound into SQL.
///
/// Pagination boundaries are always primitive: there is no null and no
/// nested structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
   /// Boolean value
   Bool(bool),
   /// Integer or floating point value
   Number(Number),
   /// Text value
   String(String),
}

impl FieldValue {
   /// Convert a JSON value, returning `None` for null, arrays and objects.
   pub fn from_json(value: JsonValue) -> Option<Self> {
      match value {
         JsonValue::Bool(b) => Some(FieldValue::Bool(b)),
         JsonValue::Number(n) => Some(FieldValue::Number(n)),
         JsonValue::String(s) => Some(FieldValue::String(s)),
         JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
      }
   }

   /// Convert into a JSON value.
   pub fn to_json(&self) -> JsonValue {
      match self {
         FieldValue::Bool(b) => JsonValue::Bool(*b),
         FieldValue::Number(n) => JsonValue::Number(n.clone()),
         FieldValue::String(s) => JsonValue::String(s.clone()),
      }
   }

   /// Whether two values bind as the same SQL parameter.
   ///
   /// Numbers compare by numeric value, so `1` and `1.0` match. Two integers
   /// compare exactly, so distinct integers beyond 2^53 stay distinct.
   pub(crate) fn binds_same(&self, other: &Self) -> bool {
      match (self, other) {
         (FieldValue::Number(a), FieldValue::Number(b)) if a.is_f64() || b.is_f64() => {
            a.as_f64().is_some_and(|a| Some(a) == b.as_f64())
         }
         _ => self == other,
      }
   }
}

/// Textual form used by drivers that only accept string bindings.
///
/// Booleans render as `1`/`0`.
impl fmt::Display for FieldValue {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         FieldValue::Bool(true) => f.write_str("1"),
         FieldValue::Bool(false) => f.write_str("0"),
         FieldValue::Number(n) => write!(f, "{n}"),
         FieldValue::String(s) => f.write_str(s),
      }
   }
}

impl From<bool> for FieldValue {
   fn from(value: bool) -> Self {
      FieldValue::Bool(value)
   }
}

impl From<i64> for FieldValue {
   fn from(value: i64) -> Self {
      FieldValue::Number(value.into())
   }
}

impl From<i32> for FieldValue {
   fn from(value: i32) -> Self {
      FieldValue::Number(value.into())
   }
}

impl From<u64> for FieldValue {
   fn from(value: u64) -> Self {
      FieldValue::Number(value.into())
   }
}

impl From<&str> for FieldValue {
   fn from(value: &str) -> Self {
      FieldValue::String(value.to_string())
   }
}

impl From<String> for FieldValue {
   fn from(value: String) -> Self {
      FieldValue::String(value)
   }
}

/// A result row the pagination engine can read sort-key values from.
///
/// Implemented for the usual JSON row shapes. Typed rows can implement it by
/// matching on the alias:
///
/// ```
/// use serde_json::{Value, json};
/// use sql_cursor_pagination::Node;
///
/// struct User {
///    id: i64,
///    email: String,
/// }
///
/// impl Node for User {
///    fn field(&self, alias: &str) -> Option<Value> {
///       match alias {
///          "id" => Some(json!(self.id)),
///          "email" => Some(json!(self.email)),
///          _ => None,
///       }
///    }
/// }
/// ```
pub trait Node {
   /// Value stored under `alias`, or `None` when the row has no such field.
   fn field(&self, alias: &str) -> Option<JsonValue>;
}

impl Node for IndexMap<String, JsonValue> {
   fn field(&self, alias: &str) -> Option<JsonValue> {
      self.get(alias).cloned()
   }
}

impl Node for HashMap<String, JsonValue> {
   fn field(&self, alias: &str) -> Option<JsonValue> {
      self.get(alias).cloned()
   }
}

impl Node for Map<String, JsonValue> {
   fn field(&self, alias: &str) -> Option<JsonValue> {
      self.get(alias).cloned()
   }
}

/// Only objects carry fields; any other JSON value has none.
impl Node for JsonValue {
   fn field(&self, alias: &str) -> Option<JsonValue> {
      self.as_object().and_then(|obj| obj.get(alias).cloned())
   }
}
