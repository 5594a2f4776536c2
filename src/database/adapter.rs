//! Driver adapter and native connection traits
//!
//! A [`DriverAdapter`] knows how to open a native connection for one engine
//! and how to read that engine's catalog. A [`NativeConnection`] is the
//! open handle itself; the facade shares one per cache key and serializes
//! access to it.

use crate::database::config::ConnectionParams;
use crate::database::facade::Database;
use crate::database::field::FieldDescriptor;
use crate::database::types::{Row, SqlValue};
use crate::error::Result;
use crate::query_builder::SqlDialect;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// Result type for native driver calls
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Failure reported by a native connection
///
/// Never crosses the facade; it is translated into
/// [`Error::DatabaseQuery`](crate::error::Error::DatabaseQuery) there.
#[derive(thiserror::Error, Debug)]
pub enum NativeError {
    #[error(transparent)]
    Driver(#[from] sqlx::Error),

    /// Misuse of the handle, such as committing without a transaction
    #[error("{0}")]
    State(String),
}

/// Result of a statement that returns no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryResult {
    /// Number of rows affected by the statement
    pub rows_affected: u64,
    /// Identifier generated by the statement, when the driver reports one
    pub last_insert_id: Option<i64>,
}

/// An open connection to one engine
#[async_trait]
pub trait NativeConnection: Send {
    fn dialect(&self) -> &'static dyn SqlDialect;

    /// Run a statement and decode every row it returns
    async fn fetch_all(&mut self, sql: &str, values: Vec<SqlValue>) -> NativeResult<Vec<Row>>;

    /// Run a statement that returns no rows
    async fn execute(&mut self, sql: &str, values: Vec<SqlValue>) -> NativeResult<QueryResult>;

    /// Run one or more statements without parameters
    async fn execute_batch(&mut self, sql: &str) -> NativeResult<u64>;

    /// Identifier generated by the most recent insert on this connection
    async fn last_insert_id(&mut self) -> NativeResult<Option<i64>>;

    fn in_transaction(&self) -> bool;

    fn set_in_transaction(&mut self, active: bool);

    async fn begin(&mut self) -> NativeResult<()> {
        if self.in_transaction() {
            return Err(NativeError::State(
                "There is already an active transaction".to_string(),
            ));
        }
        let statement = self.dialect().begin_statement();
        self.execute_batch(statement).await?;
        self.set_in_transaction(true);
        Ok(())
    }

    async fn commit(&mut self) -> NativeResult<()> {
        if !self.in_transaction() {
            return Err(NativeError::State("There is no active transaction".to_string()));
        }
        // The flag is cleared even if COMMIT fails; the engine has ended the
        // transaction either way
        self.set_in_transaction(false);
        self.execute_batch("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> NativeResult<()> {
        if !self.in_transaction() {
            return Err(NativeError::State("There is no active transaction".to_string()));
        }
        self.set_in_transaction(false);
        self.execute_batch("ROLLBACK").await?;
        Ok(())
    }

    /// Close the connection gracefully
    async fn close(self: Box<Self>) -> NativeResult<()>;
}

/// Per-engine connection and catalog logic
#[async_trait]
pub trait DriverAdapter: Send + Sync {
    /// Driver identifier (`sqlite`, `mysql`, `pgsql`)
    fn name(&self) -> &'static str;

    fn dialect(&self) -> &'static dyn SqlDialect;

    /// Whether inserts report generated values through `RETURNING`
    fn has_returning(&self) -> bool {
        self.dialect().supports_returning()
    }

    /// Open a native connection
    async fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn NativeConnection>>;

    /// Names of the tables in the connected database
    async fn list_tables(&self, database: &Database, params: &ConnectionParams) -> Result<Vec<String>>;

    /// Normalized column metadata of `table`, in column order
    async fn describe_table(&self, database: &Database, table: &str) -> Result<Vec<FieldDescriptor>>;

    /// Store an actor marker for the session
    ///
    /// Returns `false` when the engine has no session variables to carry
    /// it; that is a capability gap, not a failure.
    async fn set_actor_context(
        &self,
        _connection: &mut dyn NativeConnection,
        _data: &JsonValue,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Read the actor marker back
    async fn get_actor_context(
        &self,
        _connection: &mut dyn NativeConnection,
    ) -> Result<Option<JsonValue>> {
        Ok(None)
    }
}
