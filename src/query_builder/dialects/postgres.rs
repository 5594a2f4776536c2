//! PostgreSQL dialect

use super::{quote_parts, DatabaseBackend, SqlDialect};

/// PostgreSQL dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "pgsql"
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_parts(identifier, '"')
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn supports_returning(&self) -> bool {
        true
    }
}
