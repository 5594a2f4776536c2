//! Unified SQL value type
//!
//! `SqlValue` is what callers hand to the query builder (inlined as an
//! escaped literal or bound as a parameter) and to the native drivers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// A domain object that knows how to present itself as a plain SQL value
///
/// The builder unwraps these before rendering, so wrapper types such as
/// identifiers or timestamps can be used directly in data and where maps.
pub trait Insertable: fmt::Debug + Send + Sync {
    fn value(&self) -> SqlValue;
}

/// Generic SQL value for literal rendering and parameter binding
#[derive(Clone, Debug)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Decimal(rust_decimal::Decimal),
    String(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    /// A list of values; renders as an `IN (...)` list inside where trees
    Array(Vec<SqlValue>),
    /// A domain object unwrapped through [`Insertable::value`]
    Object(Arc<dyn Insertable>),
}

impl SqlValue {
    /// Wrap a domain object
    pub fn insertable<T: Insertable + 'static>(value: T) -> Self {
        SqlValue::Object(Arc::new(value))
    }

    /// Check if this value is NULL (after unwrapping domain objects)
    pub fn is_null(&self) -> bool {
        matches!(self.resolved(), SqlValue::Null)
    }

    /// Unwrap domain objects until a plain value remains
    pub fn resolved(&self) -> SqlValue {
        let mut value = self.clone();
        while let SqlValue::Object(object) = value {
            value = object.value();
        }
        value
    }

    /// Plain text form, as used inside quoted literals
    ///
    /// Returns `None` for NULL.
    pub fn as_text(&self) -> Option<String> {
        match self.resolved() {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Double(f) => Some(f.to_string()),
            SqlValue::Decimal(d) => Some(d.to_string()),
            SqlValue::String(s) => Some(s),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(&b).into_owned()),
            SqlValue::Json(j) => Some(j.to_string()),
            SqlValue::Uuid(id) => Some(id.to_string()),
            SqlValue::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            SqlValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            SqlValue::Timestamp(ts) => Some(ts.to_rfc3339()),
            SqlValue::Array(values) => Some(
                JsonValue::Array(values.iter().map(SqlValue::to_json).collect()).to_string(),
            ),
            SqlValue::Object(_) => None,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self.resolved() {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(b) => JsonValue::Bool(b),
            SqlValue::Int(i) => JsonValue::Number(i.into()),
            SqlValue::Double(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Decimal(d) => JsonValue::String(d.to_string()),
            SqlValue::String(s) => JsonValue::String(s),
            SqlValue::Bytes(bytes) => JsonValue::String(base64_encode(&bytes)),
            SqlValue::Json(j) => j,
            other @ (SqlValue::Uuid(_)
            | SqlValue::Date(_)
            | SqlValue::DateTime(_)
            | SqlValue::Timestamp(_)) => other.as_text().map(JsonValue::String).unwrap_or_default(),
            SqlValue::Array(values) => JsonValue::Array(values.iter().map(|v| v.to_json()).collect()),
            SqlValue::Object(_) => JsonValue::Null,
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self.resolved(), other.resolved()) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::Int(a), SqlValue::Int(b)) => a == b,
            (SqlValue::Double(a), SqlValue::Double(b)) => a == b,
            (SqlValue::Decimal(a), SqlValue::Decimal(b)) => a == b,
            (SqlValue::String(a), SqlValue::String(b)) => a == b,
            (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a == b,
            (SqlValue::Json(a), SqlValue::Json(b)) => a == b,
            (SqlValue::Uuid(a), SqlValue::Uuid(b)) => a == b,
            (SqlValue::Date(a), SqlValue::Date(b)) => a == b,
            (SqlValue::DateTime(a), SqlValue::DateTime(b)) => a == b,
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a == b,
            (SqlValue::Array(a), SqlValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

// From trait implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::String(s)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::String(s.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(s: &String) -> Self {
        SqlValue::String(s.clone())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        SqlValue::Json(v)
    }
}

impl From<rust_decimal::Decimal> for SqlValue {
    fn from(d: rust_decimal::Decimal) -> Self {
        SqlValue::Decimal(d)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => SqlValue::Null,
        }
    }
}

// Lists for `IN (...)`; `Vec<u8>` stays a byte string
macro_rules! impl_from_list {
    ($($t:ty),*) => {
        $(
            impl From<Vec<$t>> for SqlValue {
                fn from(values: Vec<$t>) -> Self {
                    SqlValue::Array(values.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

impl_from_list!(SqlValue, String, &str, i32, i64, u32, f64, bool, uuid::Uuid);

// Domain objects shipped with the toolkit keep their type so drivers can
// bind them natively
impl Insertable for uuid::Uuid {
    fn value(&self) -> SqlValue {
        SqlValue::Uuid(*self)
    }
}

impl Insertable for NaiveDate {
    fn value(&self) -> SqlValue {
        SqlValue::Date(*self)
    }
}

impl Insertable for NaiveDateTime {
    fn value(&self) -> SqlValue {
        SqlValue::DateTime(*self)
    }
}

impl Insertable for DateTime<Utc> {
    fn value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }
}

impl From<uuid::Uuid> for SqlValue {
    fn from(id: uuid::Uuid) -> Self {
        SqlValue::Uuid(id)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(date: NaiveDate) -> Self {
        SqlValue::Date(date)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(dt: NaiveDateTime) -> Self {
        SqlValue::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(ts: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(ts)
    }
}
