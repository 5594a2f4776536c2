//! Row conversion trait and shared helpers
//!
//! Each native driver turns its rows into ordered `column -> JSON` maps so
//! the facade hands back one row shape regardless of dialect.

use super::Row;
use serde_json::Value as JsonValue;

/// Trait for dialect-specific row decoding
pub trait TypeConverter: Send + Sync {
    /// The driver's native row type
    type NativeRow;

    /// Decode every column of a row, preserving column order
    fn row_to_map(&self, row: &Self::NativeRow) -> Result<Row, sqlx::Error>;
}

/// Common conversion utilities used by all converters
pub struct ConversionUtils;

impl ConversionUtils {
    /// Binary payloads that are valid UTF-8 come back as text, anything else base64
    pub fn bytes_to_json(bytes: Vec<u8>) -> JsonValue {
        match String::from_utf8(bytes) {
            Ok(text) => JsonValue::String(text),
            Err(err) => {
                use base64::Engine;
                JsonValue::String(base64::engine::general_purpose::STANDARD.encode(err.as_bytes()))
            }
        }
    }

    pub fn float_to_json(value: f64) -> JsonValue {
        serde_json::Number::from_f64(value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }

    /// Boolean spelled the way engines report flags in metadata
    /// (`YES`/`NO`, `t`/`f`, `1`/`0`, ...), `None` for anything else
    pub fn parse_bool_string(s: &str) -> Option<bool> {
        const TRUE: &[&str] = &["true", "t", "yes", "y", "1"];
        const FALSE: &[&str] = &["false", "f", "no", "n", "0"];

        let s = s.trim();
        if TRUE.iter().any(|t| s.eq_ignore_ascii_case(t)) {
            Some(true)
        } else if FALSE.iter().any(|f| s.eq_ignore_ascii_case(f)) {
            Some(false)
        } else {
            None
        }
    }
}
