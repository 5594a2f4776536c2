//! SQLite dialect

use super::{quote_parts, DatabaseBackend, SqlDialect};

/// SQLite dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct SQLiteDialect;

impl SqlDialect for SQLiteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::SQLite
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_parts(identifier, '"')
    }

    // No boolean type, booleans are stored as integers
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_quoting() {
        let dialect = SQLiteDialect;
        assert_eq!(dialect.quote_identifier("users"), "\"users\"");
        assert_eq!(dialect.quote_identifier("u.name"), "\"u\".\"name\"");
        assert_eq!(dialect.quote_literal("it's"), "'it''s'");
        assert_eq!(dialect.boolean_literal(true), "1");
        assert_eq!(dialect.placeholder(3), "?");
    }
}
