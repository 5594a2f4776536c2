//! PostgreSQL-specific row decoding and parameter binding

use super::converter::{ConversionUtils, TypeConverter};
use super::value::SqlValue;
use super::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

/// PostgreSQL type converter
#[derive(Clone, Default)]
pub struct PostgresTypeConverter;

impl PostgresTypeConverter {
    pub fn new() -> Self {
        PostgresTypeConverter
    }

    fn extract_value(row: &PgRow, index: usize, type_name: &str) -> Result<JsonValue, sqlx::Error> {
        let value = match type_name {
            "BOOL" => JsonValue::Bool(row.try_get::<bool, _>(index)?),
            "INT2" => JsonValue::from(row.try_get::<i16, _>(index)?),
            "INT4" => JsonValue::from(row.try_get::<i32, _>(index)?),
            "INT8" => JsonValue::from(row.try_get::<i64, _>(index)?),
            "FLOAT4" => ConversionUtils::float_to_json(row.try_get::<f32, _>(index)? as f64),
            "FLOAT8" => ConversionUtils::float_to_json(row.try_get::<f64, _>(index)?),
            "NUMERIC" => {
                JsonValue::String(row.try_get::<rust_decimal::Decimal, _>(index)?.to_string())
            }
            "UUID" => JsonValue::String(row.try_get::<sqlx::types::Uuid, _>(index)?.to_string()),
            "JSON" | "JSONB" => row.try_get::<JsonValue, _>(index)?,
            "TIMESTAMPTZ" => JsonValue::String(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
            "TIMESTAMP" => JsonValue::String(
                row.try_get::<NaiveDateTime, _>(index)?
                    .format("%Y-%m-%d %H:%M:%S%.f")
                    .to_string(),
            ),
            "DATE" => JsonValue::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
            "TIME" => JsonValue::String(row.try_get::<NaiveTime, _>(index)?.to_string()),
            "BYTEA" => ConversionUtils::bytes_to_json(row.try_get::<Vec<u8>, _>(index)?),
            // Text types plus catalog domains (sql_identifier, yes_or_no, ...)
            // whose wire format is text
            _ => match row.try_get_unchecked::<String, _>(index) {
                Ok(text) => JsonValue::String(text),
                Err(err) => {
                    log::warn!(
                        "Unable to decode column {} of type {}: {}",
                        index,
                        type_name,
                        err
                    );
                    JsonValue::Null
                }
            },
        };

        Ok(value)
    }

    /// Bind a SqlValue to a PostgreSQL query
    pub fn bind_param(query: PgQuery<'_>, value: SqlValue) -> PgQuery<'_> {
        match value.resolved() {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Double(f) => query.bind(f),
            SqlValue::Decimal(d) => query.bind(d),
            SqlValue::String(s) => query.bind(s),
            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(sqlx::types::Json(j)),
            SqlValue::Uuid(id) => query.bind(id),
            SqlValue::Date(date) => query.bind(date),
            SqlValue::DateTime(dt) => query.bind(dt),
            SqlValue::Timestamp(ts) => query.bind(ts),
            SqlValue::Array(values) => query.bind(sqlx::types::Json(JsonValue::Array(
                values.iter().map(SqlValue::to_json).collect(),
            ))),
            SqlValue::Object(_) => query.bind(None::<String>),
        }
    }
}

impl TypeConverter for PostgresTypeConverter {
    type NativeRow = PgRow;

    fn row_to_map(&self, row: &PgRow) -> Result<Row, sqlx::Error> {
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
