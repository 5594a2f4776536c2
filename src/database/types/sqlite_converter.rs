//! SQLite-specific row decoding and parameter binding

use super::converter::{ConversionUtils, TypeConverter};
use super::value::SqlValue;
use super::Row;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

/// SQLite type converter
#[derive(Clone, Default)]
pub struct SqliteTypeConverter;

/// SQLite type affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqliteAffinity {
    Text,
    Numeric,
    Integer,
    Real,
    Blob,
}

impl SqliteTypeConverter {
    pub fn new() -> Self {
        SqliteTypeConverter
    }

    /// Determine the SQLite type affinity (https://www.sqlite.org/datatype3.html)
    fn get_type_affinity(type_name: &str) -> SqliteAffinity {
        let upper = type_name.to_uppercase();

        if upper.contains("INT") || upper == "BOOLEAN" {
            SqliteAffinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            SqliteAffinity::Text
        } else if upper.contains("BLOB") || upper.is_empty() {
            SqliteAffinity::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            SqliteAffinity::Real
        } else {
            SqliteAffinity::Numeric
        }
    }

    fn extract_by_affinity(
        row: &SqliteRow,
        index: usize,
        affinity: SqliteAffinity,
    ) -> Result<JsonValue, sqlx::Error> {
        Ok(match affinity {
            SqliteAffinity::Integer => JsonValue::from(row.try_get_unchecked::<i64, _>(index)?),
            SqliteAffinity::Real => {
                ConversionUtils::float_to_json(row.try_get_unchecked::<f64, _>(index)?)
            }
            SqliteAffinity::Text => JsonValue::String(row.try_get_unchecked::<String, _>(index)?),
            SqliteAffinity::Blob => {
                ConversionUtils::bytes_to_json(row.try_get_unchecked::<Vec<u8>, _>(index)?)
            }
            SqliteAffinity::Numeric => {
                if let Ok(val) = row.try_get_unchecked::<i64, _>(index) {
                    JsonValue::from(val)
                } else if let Ok(val) = row.try_get_unchecked::<f64, _>(index) {
                    ConversionUtils::float_to_json(val)
                } else {
                    JsonValue::String(row.try_get_unchecked::<String, _>(index)?)
                }
            }
        })
    }

    /// Bind a SqlValue to a SQLite query
    pub fn bind_param<'q>(query: SqliteQuery<'q>, value: SqlValue) -> SqliteQuery<'q> {
        match value.resolved() {
            SqlValue::Null => query.bind(None::<i64>),
            // SQLite stores bools as integers
            SqlValue::Bool(b) => query.bind(i64::from(b)),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Double(f) => query.bind(f),
            // No native decimal, store as text to keep precision
            SqlValue::Decimal(d) => query.bind(d.to_string()),
            SqlValue::String(s) => query.bind(s),
            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(j.to_string()),
            // Stored as the same text an inline literal would produce
            other @ (SqlValue::Uuid(_)
            | SqlValue::Date(_)
            | SqlValue::DateTime(_)
            | SqlValue::Timestamp(_)) => query.bind(other.as_text()),
            SqlValue::Array(values) => {
                let json_array =
                    JsonValue::Array(values.iter().map(SqlValue::to_json).collect());
                query.bind(json_array.to_string())
            }
            SqlValue::Object(_) => query.bind(None::<i64>),
        }
    }
}

impl TypeConverter for SqliteTypeConverter {
    type NativeRow = SqliteRow;

    fn row_to_map(&self, row: &SqliteRow) -> Result<Row, sqlx::Error> {
        let mut map = Row::with_capacity(row.columns().len());

        for (index, column) in row.columns().iter().enumerate() {
            // Decode by the storage class of the value itself; declared
            // column types are only hints in SQLite
            let storage_class = {
                let raw = row.try_get_raw(index)?;
                if raw.is_null() {
                    None
                } else {
                    Some(raw.type_info().name().to_string())
                }
            };

            let value = match storage_class {
                None => JsonValue::Null,
                Some(type_name) => {
                    Self::extract_by_affinity(row, index, Self::get_type_affinity(&type_name))?
                }
            };

            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_affinity() {
        assert_eq!(
            SqliteTypeConverter::get_type_affinity("INTEGER"),
            SqliteAffinity::Integer
        );
        assert_eq!(
            SqliteTypeConverter::get_type_affinity("varchar(40)"),
            SqliteAffinity::Text
        );
        assert_eq!(
            SqliteTypeConverter::get_type_affinity("DOUBLE PRECISION"),
            SqliteAffinity::Real
        );
        assert_eq!(SqliteTypeConverter::get_type_affinity(""), SqliteAffinity::Blob);
        assert_eq!(
            SqliteTypeConverter::get_type_affinity("DECIMAL(10,2)"),
            SqliteAffinity::Numeric
        );
    }
}
