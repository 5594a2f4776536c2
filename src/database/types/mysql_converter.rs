//! MySQL-specific row decoding and parameter binding

use super::converter::{ConversionUtils, TypeConverter};
use super::value::SqlValue;
use super::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>;

/// MySQL type converter
#[derive(Clone, Default)]
pub struct MySqlTypeConverter;

impl MySqlTypeConverter {
    pub fn new() -> Self {
        MySqlTypeConverter
    }

    fn extract_value(
        row: &MySqlRow,
        index: usize,
        type_name: &str,
    ) -> Result<JsonValue, sqlx::Error> {
        let upper = type_name.to_uppercase();

        let value = match upper.as_str() {
            "BOOLEAN" => JsonValue::Bool(row.try_get::<bool, _>(index)?),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                JsonValue::from(row.try_get_unchecked::<i64, _>(index)?)
            }
            t if t.ends_with("UNSIGNED") => {
                JsonValue::from(row.try_get_unchecked::<u64, _>(index)?)
            }
            "FLOAT" => ConversionUtils::float_to_json(row.try_get::<f32, _>(index)? as f64),
            "DOUBLE" => ConversionUtils::float_to_json(row.try_get::<f64, _>(index)?),
            "DECIMAL" => JsonValue::String(row.try_get::<rust_decimal::Decimal, _>(index)?.to_string()),
            "DATETIME" => JsonValue::String(
                row.try_get::<NaiveDateTime, _>(index)?
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            ),
            "TIMESTAMP" => JsonValue::String(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
            "DATE" => JsonValue::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
            "TIME" => match row.try_get::<NaiveTime, _>(index) {
                Ok(time) => JsonValue::String(time.to_string()),
                // Durations outside a day only decode as text
                Err(_) => JsonValue::String(row.try_get_unchecked::<String, _>(index)?),
            },
            "JSON" => row.try_get::<JsonValue, _>(index)?,
            "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
                ConversionUtils::bytes_to_json(row.try_get_unchecked::<Vec<u8>, _>(index)?)
            }
            _ => match row.try_get_unchecked::<String, _>(index) {
                Ok(text) => JsonValue::String(text),
                Err(_) => {
                    ConversionUtils::bytes_to_json(row.try_get_unchecked::<Vec<u8>, _>(index)?)
                }
            },
        };

        Ok(value)
    }

    /// Bind a SqlValue to a MySQL query
    pub fn bind_param(query: MySqlQuery<'_>, value: SqlValue) -> MySqlQuery<'_> {
        match value.resolved() {
            SqlValue::Null => query.bind(None::<Vec<u8>>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Double(f) => query.bind(f),
            SqlValue::Decimal(d) => query.bind(d),
            SqlValue::String(s) => query.bind(s),
            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(j),
            // Native Uuid encodes as BINARY(16); CHAR(36) columns are the common case
            SqlValue::Uuid(id) => query.bind(id.hyphenated().to_string()),
            SqlValue::Date(date) => query.bind(date),
            SqlValue::DateTime(dt) => query.bind(dt),
            SqlValue::Timestamp(ts) => query.bind(ts),
            // No native arrays, store as JSON text
            SqlValue::Array(values) => {
                query.bind(JsonValue::Array(values.iter().map(SqlValue::to_json).collect()))
            }
            SqlValue::Object(_) => query.bind(None::<Vec<u8>>),
        }
    }
}

impl TypeConverter for MySqlTypeConverter {
    type NativeRow = MySqlRow;

    fn row_to_map(&self, row: &MySqlRow) -> Result<Row, sqlx::Error> {
        let mut map = Row::with_capacity(row.columns().len());

        for (index, column) in row.columns().iter().enumerate() {
            let is_null = row.try_get_raw(index)?.is_null();
            let value = if is_null {
                JsonValue::Null
            } else {
                Self::extract_value(row, index, column.type_info().name())?
            };

            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }
}
