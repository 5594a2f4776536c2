//! Driver-agnostic database access
//!
//! Adapters for SQLite, MySQL and PostgreSQL sit behind one facade that
//! builds SQL, caches native connections, runs transactions and reads
//! schema metadata.

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod facade;
pub mod field;
pub mod params;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use adapter::{DriverAdapter, NativeConnection, NativeError, NativeResult, QueryResult};
pub use adapters::{MySqlAdapter, PostgresAdapter, SqliteAdapter};
pub use config::{ConnectionParams, DatabasesConfig};
pub use dispatch::{QueryArgs, QueryOutput};
pub use facade::{Database, DatabaseManager, QueryOutcome};
pub use field::FieldDescriptor;
pub use params::Params;
pub use registry::{cache_key, AdapterRegistry, ConnectionRegistry, SharedConnection};
pub use types::{Insertable, Row, SqlValue};
