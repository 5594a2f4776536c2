//! SQL dialects for the query builder
//!
//! A dialect knows how the engine quotes identifiers and literals, which
//! placeholder syntax its driver expects and whether `INSERT ... RETURNING`
//! is available. Statement layout itself is shared by all dialects.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MySQLDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SQLiteDialect;

/// Database backends with a built-in dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackend {
    SQLite,
    MySQL,
    Postgres,
}

static SQLITE: SQLiteDialect = SQLiteDialect;
static MYSQL: MySQLDialect = MySQLDialect;
static POSTGRES: PostgresDialect = PostgresDialect;

impl DatabaseBackend {
    /// Resolve a driver identifier (`sqlite`, `mysql`, `pgsql`)
    pub fn from_driver(driver: &str) -> Option<Self> {
        match driver.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(DatabaseBackend::SQLite),
            "mysql" | "mariadb" => Some(DatabaseBackend::MySQL),
            "pgsql" | "postgres" | "postgresql" => Some(DatabaseBackend::Postgres),
            _ => None,
        }
    }

    /// The shared dialect instance for this backend
    pub fn dialect(self) -> &'static dyn SqlDialect {
        match self {
            DatabaseBackend::SQLite => &SQLITE,
            DatabaseBackend::MySQL => &MYSQL,
            DatabaseBackend::Postgres => &POSTGRES,
        }
    }
}

/// Trait for database-specific SQL generation
pub trait SqlDialect: Send + Sync {
    /// Driver identifier of this dialect
    fn name(&self) -> &'static str;

    fn backend(&self) -> DatabaseBackend;

    /// Quote an identifier (table name, column name) for this database
    fn quote_identifier(&self, identifier: &str) -> String;

    /// Quote a string literal, escaping embedded quotes
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Literal used for boolean values
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Generate a parameter placeholder for the given 1-based position
    fn placeholder(&self, position: usize) -> String;

    /// Whether `INSERT ... RETURNING` is used for generated values
    fn supports_returning(&self) -> bool {
        false
    }

    /// Statement opening a transaction
    fn begin_statement(&self) -> &'static str {
        "BEGIN"
    }

    /// Whether a backslash starts an escape sequence inside string literals
    fn backslash_escapes(&self) -> bool {
        false
    }
}

/// Quote each dot-separated part of an identifier with `quote`
pub(crate) fn quote_parts(identifier: &str, quote: char) -> String {
    let doubled = format!("{}{}", quote, quote);
    identifier
        .split('.')
        .map(|part| {
            format!(
                "{}{}{}",
                quote,
                part.replace(quote, &doubled),
                quote
            )
        })
        .collect::<Vec<_>>()
        .join(".")
}
