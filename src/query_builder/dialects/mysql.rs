//! MySQL/MariaDB dialect

use super::{quote_parts, DatabaseBackend, SqlDialect};

/// MySQL/MariaDB dialect
#[derive(Debug, Default, Clone, Copy)]
pub struct MySQLDialect;

impl SqlDialect for MySQLDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySQL
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        quote_parts(identifier, '`')
    }

    // Backslash is an escape character unless NO_BACKSLASH_ESCAPES is set
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn begin_statement(&self) -> &'static str {
        "START TRANSACTION"
    }

    fn backslash_escapes(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_quoting() {
        let dialect = MySQLDialect;
        assert_eq!(dialect.quote_identifier("users"), "`users`");
        assert_eq!(dialect.quote_literal("a\\'b"), "'a\\\\''b'");
        assert_eq!(dialect.boolean_literal(false), "FALSE");
        assert_eq!(dialect.begin_statement(), "START TRANSACTION");
    }
}
