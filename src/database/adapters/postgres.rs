//! PostgreSQL adapter

use crate::database::adapter::{DriverAdapter, NativeConnection, NativeResult, QueryResult};
use crate::database::config::ConnectionParams;
use crate::database::facade::Database;
use crate::database::field::{self, FieldDescriptor};
use crate::database::params::Params;
use crate::database::types::{PostgresTypeConverter, Row, SqlValue, TypeConverter};
use crate::error::{Error, Result};
use crate::query_builder::{DatabaseBackend, SqlDialect};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection, PgConnection};

/// Session setting carrying the actor marker
pub const ACTOR_CONTEXT_SETTING: &str = "bifrost.system_identifier";

const SQLSTATE_OBJECT_NOT_IN_PREREQUISITE_STATE: &str = "55000";

/// Savepoint guarding the `lastval()` lookup inside an open transaction
const LASTVAL_SAVEPOINT: &str = "bifrost_lastval";

const DESCRIBE_SQL: &str = r#"SELECT c.column_name::text AS "field",
       c.data_type::text AS "type",
       c.is_nullable::text AS "null",
       c.column_default::text AS "default",
       EXISTS (
           SELECT 1 FROM information_schema.table_constraints tc
           JOIN information_schema.key_column_usage kcu
             ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
            AND tc.table_name = kcu.table_name
           WHERE tc.table_schema = c.table_schema
             AND tc.table_name = c.table_name
             AND kcu.column_name = c.column_name
             AND tc.constraint_type = 'PRIMARY KEY'
       ) AS "pk"
FROM information_schema.columns c
WHERE c.table_schema = current_schema() AND c.table_name = $1
ORDER BY c.ordinal_position"#;

/// PostgreSQL adapter
#[derive(Debug, Default, Clone)]
pub struct PostgresAdapter;

impl PostgresAdapter {
    pub fn new() -> Self {
        PostgresAdapter
    }

    fn connect_options(params: &ConnectionParams) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(params.host())
            .port(params.port().unwrap_or(5432))
            .database(&params.database);

        if let Some(username) = &params.username {
            options = options.username(username);
        }
        if let Some(password) = &params.password {
            options = options.password(password);
        }

        options.log_statements(log::LevelFilter::Debug)
    }

    /// Normalize a `column_default` expression
    ///
    /// Literal defaults come back with a cast (`'draft'::character varying`);
    /// the literal is returned unquoted. Other expressions are kept as-is.
    pub fn normalize_default(value: &str) -> Option<String> {
        let value = value.trim();
        if value.starts_with('\'') {
            if let Some(end) = value.rfind("'::") {
                return Some(field::unquote_literal(&value[..=end]));
            }
            return Some(field::unquote_literal(value));
        }
        // `NULL` or a cast of it, not expressions such as `NULLIF(...)`
        let is_null = value
            .get(..4)
            .is_some_and(|head| head.eq_ignore_ascii_case("NULL"))
            && (value.len() == 4 || value[4..].starts_with("::"));
        if is_null {
            return None;
        }
        Some(value.to_string())
    }

    /// Map `information_schema.columns` rows onto field descriptors
    ///
    /// Primary key membership comes from the boolean `pk` subquery.
    pub fn normalize_fields(rows: &[Row]) -> Vec<FieldDescriptor> {
        rows.iter()
            .map(|row| FieldDescriptor {
                name: field::lookup_text(row, field::NAME_KEYS).unwrap_or_default(),
                field_type: field::lookup_text(row, field::TYPE_KEYS).unwrap_or_default(),
                nullable: field::lookup_text(row, field::NULL_KEYS)
                    .map(|value| value.eq_ignore_ascii_case("YES"))
                    .unwrap_or(false),
                default: field::lookup_text(row, field::DEFAULT_KEYS)
                    .and_then(|value| Self::normalize_default(&value)),
                is_primary_key: field::lookup_flag(row, "pk"),
            })
            .collect()
    }
}

#[async_trait]
impl DriverAdapter for PostgresAdapter {
    fn name(&self) -> &'static str {
        "pgsql"
    }

    fn dialect(&self) -> &'static dyn SqlDialect {
        DatabaseBackend::Postgres.dialect()
    }

    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn NativeConnection>> {
        let conn = Self::connect_options(params).connect().await.map_err(|e| {
            Error::database_connection(format!("Failed to connect to PostgreSQL: {}", e))
        })?;

        log::info!(
            "Connected to PostgreSQL database {} on {}:{}",
            params.database,
            params.host(),
            params.port().unwrap_or(5432)
        );

        Ok(Box::new(PostgresHandle {
            conn,
            converter: PostgresTypeConverter::new(),
            in_transaction: false,
        }))
    }

    async fn list_tables(&self, database: &Database, _params: &ConnectionParams) -> Result<Vec<String>> {
        let rows = database
            .fetch_rows(
                "SELECT table_name::text AS table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema()",
                Params::None,
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| field::lookup_text(row, &["table_name"]))
            .collect())
    }

    async fn describe_table(&self, database: &Database, table: &str) -> Result<Vec<FieldDescriptor>> {
        let rows = database
            .fetch_rows(DESCRIBE_SQL, Params::positional(vec![table]))
            .await?;
        Ok(Self::normalize_fields(&rows))
    }

    async fn set_actor_context(
        &self,
        connection: &mut dyn NativeConnection,
        data: &JsonValue,
    ) -> Result<bool> {
        let payload = serde_json::to_string(data)?;
        connection
            .fetch_all(
                "SELECT set_config($1, $2, false)",
                vec![
                    SqlValue::from(ACTOR_CONTEXT_SETTING),
                    SqlValue::from(payload),
                ],
            )
            .await
            .map_err(|e| Error::database_query(e.to_string()))?;
        Ok(true)
    }

    async fn get_actor_context(
        &self,
        connection: &mut dyn NativeConnection,
    ) -> Result<Option<JsonValue>> {
        let rows = connection
            .fetch_all(
                "SELECT current_setting($1, true) AS value",
                vec![SqlValue::from(ACTOR_CONTEXT_SETTING)],
            )
            .await
            .map_err(|e| Error::database_query(e.to_string()))?;

        match rows.first().and_then(|row| field::lookup_text(row, &["value"])) {
            Some(text) if !text.is_empty() => Ok(Some(serde_json::from_str(&text)?)),
            _ => Ok(None),
        }
    }
}

/// Open PostgreSQL connection
pub struct PostgresHandle {
    conn: PgConnection,
    converter: PostgresTypeConverter,
    in_transaction: bool,
}

impl PostgresHandle {
    fn query(
        sql: &str,
        values: Vec<SqlValue>,
    ) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        values
            .into_iter()
            .fold(sqlx::query(sql), PostgresTypeConverter::bind_param)
    }
}

#[async_trait]
impl NativeConnection for PostgresHandle {
    fn dialect(&self) -> &'static dyn SqlDialect {
        DatabaseBackend::Postgres.dialect()
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
            last_insert_id: None,
        })
    }

    async fn execute_batch(&mut self, sql: &str) -> NativeResult<u64> {
        let result = sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql)).await?;
        Ok(result.rows_affected())
    }

    /// Value most recently obtained from any sequence in this session
    ///
    /// A failing `lastval()` would abort an open transaction, so the lookup
    /// runs under a savepoint that is rolled back when no value is defined.
    async fn last_insert_id(&mut self) -> NativeResult<Option<i64>> {
        let guarded = self.in_transaction;
        if guarded {
            sqlx::Executor::execute(
                &mut self.conn,
                sqlx::raw_sql(&format!("SAVEPOINT {}", LASTVAL_SAVEPOINT)),
            )
                .await?;
        }

        let outcome = sqlx::query_scalar::<_, i64>("SELECT lastval()")
            .fetch_one(&mut self.conn)
            .await;

        let release = match &outcome {
            Ok(_) => format!("RELEASE SAVEPOINT {}", LASTVAL_SAVEPOINT),
            Err(_) => format!(
                "ROLLBACK TO SAVEPOINT {0}; RELEASE SAVEPOINT {0}",
                LASTVAL_SAVEPOINT
            ),
        };
        if guarded {
            sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(&release)).await?;
        }

        match outcome {
            Ok(id) => Ok(Some(id)),
            // lastval is not yet defined in this session
            Err(sqlx::Error::Database(e))
                if e.code().as_deref() == Some(SQLSTATE_OBJECT_NOT_IN_PREREQUISITE_STATE) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
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
