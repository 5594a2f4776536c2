//! Value and row types shared by the query builder and the native drivers

pub mod converter;
pub mod mysql_converter;
pub mod postgres_converter;
pub mod sqlite_converter;
pub mod value;

pub use converter::{ConversionUtils, TypeConverter};
pub use mysql_converter::MySqlTypeConverter;
pub use postgres_converter::PostgresTypeConverter;
pub use sqlite_converter::SqliteTypeConverter;
pub use value::{Insertable, SqlValue};

/// One result row: column name to value, in the engine's column order
pub type Row = indexmap::IndexMap<String, serde_json::Value>;
