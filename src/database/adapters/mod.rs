//! Dialect adapters for the supported engines

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::{MySqlAdapter, MySqlHandle};
pub use postgres::{PostgresAdapter, PostgresHandle};
pub use sqlite::{SqliteAdapter, SqliteHandle};
