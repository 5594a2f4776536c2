//! SQLite adapter

use crate::database::adapter::{DriverAdapter, NativeConnection, NativeResult, QueryResult};
use crate::database::config::ConnectionParams;
use crate::database::facade::Database;
use crate::database::field::{self, FieldDescriptor};
use crate::database::params::Params;
use crate::database::types::{Row, SqlValue, SqliteTypeConverter, TypeConverter};
use crate::error::{Error, Result};
use crate::query_builder::{DatabaseBackend, SqlDialect};
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::str::FromStr;

/// SQLite adapter
#[derive(Debug, Default, Clone)]
pub struct SqliteAdapter;

impl SqliteAdapter {
    pub fn new() -> Self {
        SqliteAdapter
    }

    fn connect_options(params: &ConnectionParams) -> Result<SqliteConnectOptions> {
        let options = if params.database == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                Error::database_connection(format!("Invalid SQLite options: {}", e))
            })?
        } else {
            SqliteConnectOptions::new()
                .filename(&params.database)
                .create_if_missing(true)
        };

        Ok(options.log_statements(log::LevelFilter::Debug))
    }

    /// Map `PRAGMA table_info` rows onto field descriptors
    ///
    /// `pk` holds the 1-based position in the primary key (0 when not part
    /// of it). Key columns count as not nullable even though SQLite only
    /// sets `notnull` when declared.
    pub fn normalize_fields(rows: &[Row]) -> Vec<FieldDescriptor> {
        rows.iter()
            .map(|row| {
                let is_primary_key = field::lookup_int(row, "pk").unwrap_or(0) >= 1;
                let not_null = field::lookup_flag(row, "notnull");
                let default = field::lookup_text(row, field::DEFAULT_KEYS)
                    .filter(|value| !value.eq_ignore_ascii_case("NULL"))
                    .map(|value| field::unquote_literal(&value));

                FieldDescriptor {
                    name: field::lookup_text(row, field::NAME_KEYS).unwrap_or_default(),
                    field_type: field::lookup_text(row, field::TYPE_KEYS).unwrap_or_default(),
                    nullable: !not_null && !is_primary_key,
                    default,
                    is_primary_key,
                }
            })
            .collect()
    }
}

#[async_trait]
impl DriverAdapter for SqliteAdapter {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn dialect(&self) -> &'static dyn SqlDialect {
        DatabaseBackend::SQLite.dialect()
    }

    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn NativeConnection>> {
        let conn = Self::connect_options(params)?
            .connect()
            .await
            .map_err(|e| Error::database_connection(format!("Failed to connect to SQLite: {}", e)))?;

        log::info!("Opened SQLite database {}", params.database);

        Ok(Box::new(SqliteHandle {
            conn,
            converter: SqliteTypeConverter::new(),
            in_transaction: false,
        }))
    }

    async fn list_tables(&self, database: &Database, _params: &ConnectionParams) -> Result<Vec<String>> {
        let rows = database
            .fetch_rows(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                Params::None,
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| field::lookup_text(row, &["name"]))
            .collect())
    }

    async fn describe_table(&self, database: &Database, table: &str) -> Result<Vec<FieldDescriptor>> {
        let sql = format!("PRAGMA table_info({})", self.dialect().quote_identifier(table));
        let rows = database.fetch_rows(&sql, Params::None).await?;
        Ok(Self::normalize_fields(&rows))
    }
}

/// Open SQLite connection
pub struct SqliteHandle {
    conn: SqliteConnection,
    converter: SqliteTypeConverter,
    in_transaction: bool,
}

impl SqliteHandle {
    fn query<'q>(
        sql: &'q str,
        values: Vec<SqlValue>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        values
            .into_iter()
            .fold(sqlx::query(sql), SqliteTypeConverter::bind_param)
    }
}

#[async_trait]
impl NativeConnection for SqliteHandle {
    fn dialect(&self) -> &'static dyn SqlDialect {
        DatabaseBackend::SQLite.dialect()
    }

    async fn fetch_all(&mut self, sql: &str, values: Vec<SqlValue>) -> NativeResult<Vec<Row>> {
        let rows = Self::query(sql, values).fetch_all(&mut self.conn).await?;
        rows.iter()
            .map(|row| self.converter.row_to_map(row).map_err(Into::into))
            .collect()
    }

    async fn execute(&mut self, sql: &str, values: Vec<SqlValue>) -> NativeResult<QueryResult> {
        let result = Self::query(sql, values).execute(&mut self.conn).await?;
        Ok(QueryResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn execute_batch(&mut self, sql: &str) -> NativeResult<u64> {
        let result = sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    async fn last_insert_id(&mut self) -> NativeResult<Option<i64>> {
        let id: i64 = sqlx::query_scalar("SELECT last_insert_rowid()")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(Some(id))
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn set_in_transaction(&mut self, active: bool) {
        self.in_transaction = active;
    }

    async fn close(self: Box<Self>) -> NativeResult<()> {
        self.conn.close().await?;
        Ok(())
    }
}
