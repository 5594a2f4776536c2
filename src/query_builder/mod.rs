//! Dialect-aware SQL generation
//!
//! Builds SELECT/INSERT/UPDATE/DELETE text from declarative descriptors.
//! Values are inlined as escaped literals by default; [`RenderMode::Bind`]
//! produces the same clause layout with named placeholders instead.

pub mod core;
pub mod dialects;
pub mod where_tree;
pub mod writer;

pub use self::core::{
    DeleteQuery, ExistsQuery, Field, Fields, InsertData, InsertEntry, InsertQuery, SelectQuery,
    Statement, UpdateQuery,
};
pub use dialects::{DatabaseBackend, MySQLDialect, PostgresDialect, SQLiteDialect, SqlDialect};
pub use where_tree::{Comparator, Filter, LogicalOperator, Where, WhereNode};
pub use writer::{RenderMode, RenderedSql, SqlWriter};
