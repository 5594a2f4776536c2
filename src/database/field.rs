//! Normalized column metadata
//!
//! Each engine reports columns in its own shape (`DESC`, `PRAGMA
//! table_info`, `information_schema.columns`). Adapters map those rows onto
//! [`FieldDescriptor`] using the tolerant lookups below; primary key
//! detection stays in each adapter.

use crate::database::types::{ConversionUtils, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Column name key spellings across engines
pub const NAME_KEYS: &[&str] = &["field", "Field", "name", "column_name"];
/// Column type key spellings across engines
pub const TYPE_KEYS: &[&str] = &["type", "Type", "data_type"];
/// Nullability key spellings across engines
pub const NULL_KEYS: &[&str] = &["null", "Null", "is_nullable"];
/// Default value key spellings across engines
pub const DEFAULT_KEYS: &[&str] = &["default", "Default", "dflt_value", "column_default"];

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub nullable: bool,
    /// `None` when the engine reports no default
    pub default: Option<String>,
    pub is_primary_key: bool,
}

impl FieldDescriptor {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, field_type: T) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            nullable: true,
            default: None,
            is_primary_key: false,
        }
    }
}

/// First non-null value stored under any of `keys`
pub fn lookup<'r>(row: &'r Row, keys: &[&str]) -> Option<&'r JsonValue> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .find(|value| !value.is_null())
}

/// Text form of a scalar; `None` for NULL
pub fn text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Text stored under any of `keys`
pub fn lookup_text(row: &Row, keys: &[&str]) -> Option<String> {
    lookup(row, keys).and_then(text)
}

/// Integer stored under `key`, accepting numeric strings
pub fn lookup_int(row: &Row, key: &str) -> Option<i64> {
    match row.get(key)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Boolean stored under `key`; numbers are true when non-zero, unknown
/// strings are false
pub fn lookup_flag(row: &Row, key: &str) -> bool {
    match row.get(key) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Number(n)) => n.as_i64().map(|i| i != 0).unwrap_or(false),
        Some(JsonValue::String(s)) => ConversionUtils::parse_bool_string(s).unwrap_or(false),
        _ => false,
    }
}

/// Strip one level of single quotes from a literal default (`'x'` → `x`)
pub fn unquote_literal(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].replace("''", "'")
    } else {
        trimmed.to_string()
    }
}
