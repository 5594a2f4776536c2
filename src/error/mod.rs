use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the data-access layer
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database connection error: {0}")]
    DatabaseConnection(String),

    /// Every failure reported by a native driver while running a statement
    /// ends up here, carrying the driver's own message.
    #[error("An error occurred while executing the database query: {0}")]
    DatabaseQuery(String),

    #[error("{message}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    // Database error constructors
    pub fn database_connection(msg: impl Into<String>) -> Self {
        Self::DatabaseConnection(msg.into())
    }

    pub fn database_query(msg: impl Into<String>) -> Self {
        Self::DatabaseQuery(msg.into())
    }

    // Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this is the uniform database execution error
    pub fn is_database_error(&self) -> bool {
        match self {
            Error::DatabaseQuery(_) => true,
            Error::WithContext { source, .. } => source.is_database_error(),
            _ => false,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Json(_) => "E_JSON",
            Error::Io(_) => "E_IO",
            Error::Config(_) => "E_CONFIG",
            Error::InvalidInput(_) => "E_INVALID_INPUT",
            Error::DatabaseConnection(_) => "E_DB_CONNECTION",
            Error::DatabaseQuery(_) => "E_DB_QUERY",
            Error::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::WithContext { source, .. } => source.status_code(),
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_is_server_fault() {
        let err = Error::database_query("syntax error at or near \"SELEC\"");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "E_DB_QUERY");
        assert!(err.is_database_error());
        assert!(err.to_string().contains("SELEC"));
    }

    #[test]
    fn test_context_keeps_classification() {
        let err = Error::database_query("boom").with_context("while listing tables");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error_code(), "E_DB_QUERY");
        assert!(err.is_database_error());
        assert_eq!(err.to_string(), "while listing tables");
    }

    #[test]
    fn test_invalid_input_is_client_fault() {
        assert_eq!(Error::invalid_input("no table").status_code(), 400);
        assert!(!Error::config("missing host").is_database_error());
    }
}
