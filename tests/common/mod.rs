#![allow(dead_code)]

use bifrost_db::{ConnectionParams, Database, DatabaseManager, DatabasesConfig, Params};

pub const SCHEMA: &str = "CREATE TABLE items (
    id INTEGER PRIMARY KEY,
    note TEXT DEFAULT 'x',
    qty INT NOT NULL DEFAULT 0
)";

/// Manager with one named in-memory SQLite database and its own cache
pub fn memory_manager(name: &str) -> DatabaseManager {
    let config = DatabasesConfig::new().with_database(name, ConnectionParams::sqlite(":memory:"));
    DatabaseManager::new(config)
}

/// In-memory SQLite database with the `items` table created
pub async fn seeded(name: &str) -> (DatabaseManager, Database) {
    let manager = memory_manager(name);
    let db = manager.database(Some(name)).await.unwrap();
    db.execute_query(SCHEMA, Params::None).await.unwrap();
    (manager, db)
}

/// Connection parameters from a `key=value;` environment variable
///
/// Returns `None` when the variable is unset so server tests can skip.
pub fn server_params(var: &str, driver: &str) -> Option<ConnectionParams> {
    let raw = std::env::var(var).ok()?;
    let mut params = ConnectionParams {
        driver: Some(driver.to_string()),
        ..Default::default()
    };

    for pair in raw.split(';').filter(|pair| !pair.trim().is_empty()) {
        let (key, value) = pair.split_once('=')?;
        let value = value.trim().to_string();
        match key.trim() {
            "host" => params.host = Some(value),
            "port" => params.port = value.parse().ok(),
            "database" | "dbname" => params.database = value,
            "username" | "user" => params.username = Some(value),
            "password" => params.password = Some(value),
            _ => {}
        }
    }

    Some(params)
}
