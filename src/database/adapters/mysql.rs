//! MySQL/MariaDB adapter

use crate::database::adapter::{DriverAdapter, NativeConnection, NativeResult, QueryResult};
use crate::database::config::ConnectionParams;
use crate::database::facade::Database;
use crate::database::field::{self, FieldDescriptor};
use crate::database::params::Params;
use crate::database::types::{MySqlTypeConverter, Row, SqlValue, TypeConverter};
use crate::error::{Error, Result};
use crate::query_builder::{DatabaseBackend, SqlDialect};
use async_trait::async_trait;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection, MySqlConnection};

/// MySQL/MariaDB adapter
#[derive(Debug, Default, Clone)]
pub struct MySqlAdapter;

impl MySqlAdapter {
    pub fn new() -> Self {
        MySqlAdapter
    }

    fn connect_options(params: &ConnectionParams) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(params.host())
            .port(params.port().unwrap_or(3306))
            .database(&params.database)
            .charset("utf8mb4");

        if let Some(username) = &params.username {
            options = options.username(username);
        }
        if let Some(password) = &params.password {
            options = options.password(password);
        }

        options.log_statements(log::LevelFilter::Debug)
    }

    /// Map `DESC table` rows onto field descriptors
    ///
    /// A column is a key column when it is auto-incremented or reported
    /// under `Key = PRI`.
    pub fn normalize_fields(rows: &[Row]) -> Vec<FieldDescriptor> {
        rows.iter()
            .map(|row| {
                let extra = field::lookup_text(row, &["Extra", "extra"]).unwrap_or_default();
                let key = field::lookup_text(row, &["Key", "key"]).unwrap_or_default();
                let nullable = field::lookup_text(row, field::NULL_KEYS)
                    .map(|value| value.eq_ignore_ascii_case("YES"))
                    .unwrap_or(false);

                FieldDescriptor {
                    name: field::lookup_text(row, field::NAME_KEYS).unwrap_or_default(),
                    field_type: field::lookup_text(row, field::TYPE_KEYS).unwrap_or_default(),
                    nullable,
                    default: field::lookup_text(row, field::DEFAULT_KEYS),
                    is_primary_key: extra.to_ascii_lowercase().contains("auto_increment")
                        || key.eq_ignore_ascii_case("PRI"),
                }
            })
            .collect()
    }

    /// Pull table names out of `SHOW TABLES` rows
    ///
    /// The column is named `Tables_in_<database>`; the first column is used
    /// when the name differs (case folding on some servers).
    pub fn table_names(rows: &[Row], database: &str) -> Vec<String> {
        let column = format!("Tables_in_{}", database);
        rows.iter()
            .filter_map(|row| {
                row.get(&column)
                    .or_else(|| row.values().next())
                    .and_then(field::text)
            })
            .collect()
    }
}

#[async_trait]
impl DriverAdapter for MySqlAdapter {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn dialect(&self) -> &'static dyn SqlDialect {
        DatabaseBackend::MySQL.dialect()
    }

    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn NativeConnection>> {
        let conn = Self::connect_options(params)
            .connect()
            .await
            .map_err(|e| Error::database_connection(format!("Failed to connect to MySQL: {}", e)))?;

        log::info!(
            "Connected to MySQL database {} on {}:{}",
            params.database,
            params.host(),
            params.port().unwrap_or(3306)
        );

        Ok(Box::new(MySqlHandle {
            conn,
            converter: MySqlTypeConverter::new(),
            in_transaction: false,
        }))
    }

    async fn list_tables(&self, database: &Database, params: &ConnectionParams) -> Result<Vec<String>> {
        let rows = database.fetch_rows("SHOW TABLES", Params::None).await?;
        Ok(Self::table_names(&rows, &params.database))
    }

    async fn describe_table(&self, database: &Database, table: &str) -> Result<Vec<FieldDescriptor>> {
        let sql = format!("DESC {}", self.dialect().quote_identifier(table));
        let rows = database.fetch_rows(&sql, Params::None).await?;
        Ok(Self::normalize_fields(&rows))
    }
}

/// Open MySQL connection
pub struct MySqlHandle {
    conn: MySqlConnection,
    converter: MySqlTypeConverter,
    in_transaction: bool,
}

impl MySqlHandle {
    fn query(
        sql: &str,
        values: Vec<SqlValue>,
    ) -> sqlx::query::Query<'_, sqlx::MySql, sqlx::mysql::MySqlArguments> {
        values
            .into_iter()
            .fold(sqlx::query(sql), MySqlTypeConverter::bind_param)
    }
}

#[async_trait]
impl NativeConnection for MySqlHandle {
    fn dialect(&self) -> &'static dyn SqlDialect {
        DatabaseBackend::MySQL.dialect()
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
            last_insert_id: i64::try_from(result.last_insert_id()).ok(),
        })
    }

    async fn execute_batch(&mut self, sql: &str) -> NativeResult<u64> {
        let result = sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    async fn last_insert_id(&mut self) -> NativeResult<Option<i64>> {
        let id: u64 = sqlx::query_scalar("SELECT LAST_INSERT_ID()")
            .fetch_one(&mut self.conn)
            .await?;
        Ok(i64::try_from(id).ok())
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
