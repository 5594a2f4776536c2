//! Database facade
//!
//! [`Database`] is what application code talks to. It is cheap to clone;
//! every facade opened for the same `(database name, driver)` pair shares
//! one native connection through the [`ConnectionRegistry`], so a
//! transaction begun through one facade is visible through the others.
//!
//! Native failures never leak: they are logged and re-raised as
//! [`Error::DatabaseQuery`] carrying the driver's message.

use crate::database::adapter::{DriverAdapter, NativeError};
use crate::database::config::{ConnectionParams, DatabasesConfig};
use crate::database::field::{self, FieldDescriptor};
use crate::database::params::{self, Params};
use crate::database::registry::{cache_key, AdapterRegistry, ConnectionRegistry, SharedConnection};
use crate::database::types::{Row, SqlValue};
use crate::error::{Error, Result};
use crate::query_builder::{
    DeleteQuery, ExistsQuery, Filter, InsertData, InsertQuery, RenderMode, SelectQuery, SqlDialect,
    Statement, UpdateQuery,
};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// What a raw statement produced, classified by its leading verb
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows of a `SELECT`
    Rows(Vec<Row>),
    /// Affected-row count of any other statement
    Affected(u64),
    /// First column of the first row of an `INSERT/UPDATE/DELETE ... RETURNING`
    Returned(Option<JsonValue>),
}

impl QueryOutcome {
    /// Rows, or an empty list for statements that return none
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutcome::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub fn affected(&self) -> Option<u64> {
        match self {
            QueryOutcome::Affected(count) => Some(*count),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

fn leading_verb(sql: &str) -> Verb {
    let word: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    match word.as_str() {
        "SELECT" => Verb::Select,
        "INSERT" => Verb::Insert,
        "UPDATE" => Verb::Update,
        "DELETE" => Verb::Delete,
        _ => Verb::Other,
    }
}

fn has_returning_clause(sql: &str, dialect: &dyn SqlDialect) -> bool {
    params::has_keyword(sql, "RETURNING", dialect)
}

/// Facade over one logical database
#[derive(Clone)]
pub struct Database {
    name: Option<String>,
    key: String,
    params: ConnectionParams,
    adapter: Arc<dyn DriverAdapter>,
    connection: SharedConnection,
    render_mode: RenderMode,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("key", &self.key)
            .field("driver", &self.adapter.name())
            .field("render_mode", &self.render_mode)
            .finish()
    }
}

impl Database {
    /// Open the facade for `name` (`None` selects the default database)
    ///
    /// Configuration problems surface here as [`Error::Config`]; the native
    /// connection is opened on first use of the cache key and reused after.
    pub async fn open(
        name: Option<&str>,
        config: &DatabasesConfig,
        adapters: &AdapterRegistry,
        connections: &ConnectionRegistry,
    ) -> Result<Self> {
        let params = config.resolve(name)?;
        Self::open_with_params(name, params, adapters, connections).await
    }

    /// Open the facade with explicit connection parameters
    pub async fn open_with_params(
        name: Option<&str>,
        params: ConnectionParams,
        adapters: &AdapterRegistry,
        connections: &ConnectionRegistry,
    ) -> Result<Self> {
        params.validate()?;
        let adapter = adapters.get(&params.driver())?;
        let key = cache_key(name, adapter.name());
        let connection = connections
            .get_or_connect(&key, adapter.as_ref(), &params)
            .await?;

        Ok(Self {
            name: name.map(str::to_string),
            key,
            params,
            adapter,
            connection,
            render_mode: RenderMode::Inline,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Connection cache key (`name:driver`)
    pub fn cache_key(&self) -> &str {
        &self.key
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Driver identifier of the active dialect
    pub fn driver(&self) -> &'static str {
        self.adapter.name()
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.adapter.dialect()
    }

    /// Whether inserts can report values through `RETURNING`
    pub fn has_returning(&self) -> bool {
        self.adapter.has_returning()
    }

    /// Render builder values as bound parameters instead of inline literals
    pub fn with_bound_parameters(mut self) -> Self {
        self.render_mode = RenderMode::Bind;
        self
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Whether both facades use the same native connection
    pub fn shares_connection_with(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.connection, &other.connection)
    }

    fn translate(&self, sql: &str, err: NativeError) -> Error {
        log::error!("Database error on {} while executing `{}`: {}", self.key, sql, err);
        Error::database_query(err.to_string())
    }

    /// Start a transaction on the shared connection
    pub async fn begin(&self) -> Result<bool> {
        let mut conn = self.connection.lock().await;
        conn.begin().await.map_err(|e| self.translate("BEGIN", e))?;
        log::debug!("Transaction started on {}", self.key);
        Ok(true)
    }

    /// Commit the open transaction
    pub async fn save(&self) -> Result<bool> {
        let mut conn = self.connection.lock().await;
        conn.commit().await.map_err(|e| self.translate("COMMIT", e))?;
        log::debug!("Transaction committed on {}", self.key);
        Ok(true)
    }

    /// Roll back the open transaction
    pub async fn rollback(&self) -> Result<bool> {
        let mut conn = self.connection.lock().await;
        conn.rollback()
            .await
            .map_err(|e| self.translate("ROLLBACK", e))?;
        log::debug!("Transaction rolled back on {}", self.key);
        Ok(true)
    }

    pub async fn in_transaction(&self) -> bool {
        self.connection.lock().await.in_transaction()
    }

    /// Run any statement and classify the result by its leading verb
    ///
    /// `SELECT` yields rows; `INSERT/UPDATE/DELETE` yield the affected-row
    /// count, or the returned scalar when the statement has a `RETURNING`
    /// clause; anything else yields its affected-row count.
    pub async fn execute_query(&self, sql: &str, params: Params) -> Result<QueryOutcome> {
        match leading_verb(sql) {
            Verb::Select => Ok(QueryOutcome::Rows(self.fetch_rows(sql, params).await?)),
            Verb::Insert | Verb::Update | Verb::Delete if has_returning_clause(sql, self.dialect()) => {
                let rows = self.fetch_rows(sql, params).await?;
                let value = rows
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_iter().next())
                    .map(|(_, value)| value);
                Ok(QueryOutcome::Returned(value))
            }
            _ => Ok(QueryOutcome::Affected(self.execute(sql, params).await?)),
        }
    }

    /// Run a statement and return its rows regardless of the verb
    pub async fn fetch_rows(&self, sql: &str, params: Params) -> Result<Vec<Row>> {
        let prepared = params::prepare(sql, params, self.dialect())?;
        log::debug!(
            "{}: {} ({} parameters)",
            self.key,
            prepared.sql,
            prepared.values.len()
        );

        let mut conn = self.connection.lock().await;
        conn.fetch_all(&prepared.sql, prepared.values)
            .await
            .map_err(|e| self.translate(&prepared.sql, e))
    }

    async fn execute(&self, sql: &str, params: Params) -> Result<u64> {
        let prepared = params::prepare(sql, params, self.dialect())?;
        log::debug!(
            "{}: {} ({} parameters)",
            self.key,
            prepared.sql,
            prepared.values.len()
        );

        let mut conn = self.connection.lock().await;
        conn.execute(&prepared.sql, prepared.values)
            .await
            .map(|result| result.rows_affected)
            .map_err(|e| self.translate(&prepared.sql, e))
    }

    fn render<S: Statement>(&self, statement: &S, params: Params) -> Result<(String, Params)> {
        let rendered = statement.render(self.dialect(), self.render_mode);
        let params = params.with_named(rendered.params)?;
        Ok((rendered.sql, params))
    }

    /// Insert one row
    ///
    /// With a non-empty `returning` on a dialect that supports it, the
    /// returned scalar is the result. Otherwise the clause is dropped and
    /// the engine's last generated identifier is returned.
    pub async fn insert(
        &self,
        table: &str,
        data: InsertData,
        returning: &str,
    ) -> Result<Option<JsonValue>> {
        self.insert_with(table, data, returning, Params::None).await
    }

    /// Insert one row, binding `params` to the data's placeholder columns
    ///
    /// Positional values are matched to placeholder columns in order.
    pub async fn insert_with(
        &self,
        table: &str,
        data: InsertData,
        returning: &str,
        params: Params,
    ) -> Result<Option<JsonValue>> {
        let returning = if self.has_returning() { returning.trim() } else { "" };
        let params = params.name_positional(&data.placeholder_columns())?;
        let query = InsertQuery::new(table, data).returning(returning);
        let (sql, params) = self.render(&query, params)?;

        if !returning.is_empty() {
            return match self.execute_query(&sql, params).await? {
                QueryOutcome::Returned(value) => Ok(value),
                _ => Ok(None),
            };
        }

        let prepared = params::prepare(&sql, params, self.dialect())?;
        log::debug!(
            "{}: {} ({} parameters)",
            self.key,
            prepared.sql,
            prepared.values.len()
        );

        // Same lock for the insert and the id lookup so no other statement
        // can run in between
        let mut conn = self.connection.lock().await;
        let result = conn
            .execute(&prepared.sql, prepared.values)
            .await
            .map_err(|e| self.translate(&prepared.sql, e))?;
        let id = match result.last_insert_id {
            Some(id) => Some(id),
            None => conn
                .last_insert_id()
                .await
                .map_err(|e| self.translate("last insert id", e))?,
        };

        Ok(id.map(JsonValue::from))
    }

    /// Update rows matching `filter`; returns the affected-row count
    pub async fn update<F: Into<Filter>>(
        &self,
        table: &str,
        data: IndexMap<String, SqlValue>,
        filter: F,
    ) -> Result<u64> {
        let query = UpdateQuery::new(table).data(data).filter(filter);
        let (sql, params) = self.render(&query, Params::None)?;
        self.execute(&sql, params).await
    }

    /// Delete rows matching `filter`; returns the affected-row count
    pub async fn delete<F: Into<Filter>>(&self, table: &str, filter: F) -> Result<u64> {
        let query = DeleteQuery::new(table).filter(filter);
        let (sql, params) = self.render(&query, Params::None)?;
        self.execute(&sql, params).await
    }

    pub async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>> {
        let (sql, params) = self.render(query, Params::None)?;
        self.fetch_rows(&sql, params).await
    }

    /// Whether any row of `table` matches `filter`
    pub async fn exists<F: Into<Filter>>(&self, table: &str, filter: F) -> Result<bool> {
        let query = ExistsQuery::new(table).filter(filter);
        let (sql, params) = self.render(&query, Params::None)?;
        let rows = self.fetch_rows(&sql, params).await?;

        Ok(rows.first().is_some_and(|row| {
            field::lookup_flag(row, ExistsQuery::COLUMN) || field::lookup_flag(row, "EXISTS")
        }))
    }

    pub async fn get_tables(&self) -> Result<Vec<String>> {
        self.adapter.list_tables(self, &self.params).await
    }

    /// Column metadata of `table`; empty when the table does not exist
    pub async fn get_det_table(&self, table: &str) -> Result<Vec<FieldDescriptor>> {
        if !self.exist_table(table).await? {
            return Ok(Vec::new());
        }
        self.adapter.describe_table(self, table).await
    }

    pub async fn exist_table(&self, table: &str) -> Result<bool> {
        Ok(self.get_tables().await?.iter().any(|name| name == table))
    }

    pub async fn exist_field(&self, table: &str, field: &str) -> Result<bool> {
        Ok(self
            .get_det_table(table)
            .await?
            .iter()
            .any(|descriptor| descriptor.name == field))
    }

    /// Store an actor marker on the session
    ///
    /// `false` means the dialect cannot carry one.
    pub async fn set_actor_context(&self, data: &JsonValue) -> Result<bool> {
        let mut conn = self.connection.lock().await;
        self.adapter.set_actor_context(conn.as_mut(), data).await
    }

    pub async fn get_actor_context(&self) -> Result<Option<JsonValue>> {
        let mut conn = self.connection.lock().await;
        self.adapter.get_actor_context(conn.as_mut()).await
    }
}

/// Entry point holding configuration and registries
#[derive(Clone)]
pub struct DatabaseManager {
    config: Arc<DatabasesConfig>,
    adapters: Arc<AdapterRegistry>,
    connections: Arc<ConnectionRegistry>,
}

impl DatabaseManager {
    /// Manager with the built-in adapters and its own connection cache
    pub fn new(config: DatabasesConfig) -> Self {
        Self::from_parts(
            config,
            AdapterRegistry::new(),
            Arc::new(ConnectionRegistry::new()),
        )
    }

    /// Manager using the process-wide connection cache
    pub fn shared(config: DatabasesConfig) -> Self {
        Self::from_parts(config, AdapterRegistry::new(), ConnectionRegistry::global())
    }

    pub fn from_parts(
        config: DatabasesConfig,
        adapters: AdapterRegistry,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            adapters: Arc::new(adapters),
            connections,
        }
    }

    /// Load configuration from `base_dir` and build a manager
    pub fn load<P: AsRef<std::path::Path>>(base_dir: P) -> Result<Self> {
        Ok(Self::new(DatabasesConfig::load_with_base_dir(base_dir)?))
    }

    pub fn config(&self) -> &DatabasesConfig {
        &self.config
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Open the facade for a named database (`None` for the default)
    pub async fn database(&self, name: Option<&str>) -> Result<Database> {
        Database::open(name, &self.config, &self.adapters, &self.connections).await
    }

    /// Close every cached connection not in use
    pub async fn close(&self) -> usize {
        self.connections.close_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::DatabaseBackend;

    #[test]
    fn test_leading_verb() {
        assert_eq!(leading_verb("select 1"), Verb::Select);
        assert_eq!(leading_verb("  \n INSERT INTO t VALUES (1)"), Verb::Insert);
        assert_eq!(leading_verb("Update t SET a = 1"), Verb::Update);
        assert_eq!(leading_verb("DELETE FROM t"), Verb::Delete);
        assert_eq!(leading_verb("CREATE TABLE t (a int)"), Verb::Other);
        assert_eq!(leading_verb("SELECTED"), Verb::Other);
    }

    #[test]
    fn test_returning_detection() {
        let pg = DatabaseBackend::Postgres.dialect();
        let mysql = DatabaseBackend::MySQL.dialect();
        assert!(has_returning_clause("INSERT INTO t (a) VALUES (1) returning id", pg));
        assert!(!has_returning_clause("INSERT INTO t (a) VALUES (1)", pg));
        assert!(!has_returning_clause("UPDATE items SET note = 'Returning' WHERE id = 1", pg));
        assert!(!has_returning_clause("UPDATE t SET \"returning\" = 1 -- returning id", pg));
        assert!(!has_returning_clause("DELETE FROM t /* RETURNING * */ WHERE id = 1", pg));
        assert!(!has_returning_clause("UPDATE t SET a = 1 WHERE returning_id = 2", pg));
        assert!(!has_returning_clause("UPDATE t SET note = 'it\\'s returning' WHERE id = 1", mysql));
        assert!(has_returning_clause("DELETE FROM t WHERE id = 1\nRETURNING id", pg));
    }

    #[test]
    fn test_outcome_helpers() {
        assert_eq!(QueryOutcome::Affected(3).affected(), Some(3));
        assert!(QueryOutcome::Affected(3).into_rows().is_empty());
        assert_eq!(QueryOutcome::Rows(vec![Row::new()]).into_rows().len(), 1);
    }
}
