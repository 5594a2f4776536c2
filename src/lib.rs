//! Bifrost DB - driver-agnostic data access for the Bifrost web toolkit
//!
//! Bifrost DB provides one API over SQLite, MySQL and PostgreSQL with:
//! - Dialect-aware SQL generation with nested AND/OR condition trees
//! - One cached native connection per logical database and driver
//! - Transactions shared by every facade on the same connection
//! - Schema introspection normalized across engines

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod database;
pub mod error;
pub mod query_builder;
pub mod transaction;

// Command-line inspection tool
#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for public API
pub use database::{
    ConnectionParams, Database, DatabaseManager, DatabasesConfig, FieldDescriptor, Params,
    QueryArgs, QueryOutcome, QueryOutput, Row, SqlValue,
};
pub use error::{Error, Result};
pub use query_builder::{Filter, InsertData, SelectQuery, Where};

pub mod prelude {
    pub use crate::database::{
        ConnectionParams, Database, DatabaseManager, DatabasesConfig, FieldDescriptor, Insertable,
        Params, QueryArgs, QueryOutcome, QueryOutput, Row, SqlValue,
    };
    pub use crate::error::{Error, Result};
    pub use crate::query_builder::{
        DeleteQuery, Field, Fields, Filter, InsertData, InsertQuery, SelectQuery, UpdateQuery,
        Where,
    };
    pub use crate::transaction::{HttpStatus, Outcome, TransactionScope};
}
