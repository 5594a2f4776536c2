//! Database configuration structures and loading
//!
//! Connection settings live in `config.toml` under a default `[database]`
//! section and any number of named `[databases.<name>]` sections. An
//! environment-specific `config.<env>.toml` is merged on top, and `DB_*`
//! environment variables override the default section last.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Driver used when a section does not name one
pub const DEFAULT_DRIVER: &str = "pgsql";

/// Connection parameters for one logical database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConnectionParams {
    /// Dialect identifier (`sqlite`, `mysql`, `pgsql`)
    #[serde(default)]
    pub driver: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Database name, or the file path for SQLite (`:memory:` allowed)
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionParams {
    /// Parameters for a SQLite database file
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            driver: Some("sqlite".to_string()),
            database: path.into(),
            ..Default::default()
        }
    }

    /// Parameters for a client/server engine
    pub fn server(
        driver: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            driver: Some(driver.into()),
            host: Some(host.into()),
            port: None,
            database: database.into(),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Lowercased driver name, defaulting to `pgsql`
    pub fn driver(&self) -> String {
        self.driver
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_DRIVER.to_string())
    }

    /// Explicit port, or the engine's standard one
    pub fn port(&self) -> Option<u16> {
        self.port.or_else(|| match self.driver().as_str() {
            "mysql" => Some(3306),
            "pgsql" => Some(5432),
            _ => None,
        })
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("localhost")
    }

    /// Check that everything the driver needs to connect is present
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(Error::config(format!(
                "database name is required for driver '{}'",
                self.driver()
            )));
        }

        if self.driver() != "sqlite"
            && self.host.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(Error::config(format!(
                "host is required for driver '{}'",
                self.driver()
            )));
        }

        Ok(())
    }
}

/// All configured databases
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabasesConfig {
    /// The database used when no name is given
    #[serde(default)]
    pub database: Option<ConnectionParams>,

    /// Named databases
    #[serde(default)]
    pub databases: HashMap<String, ConnectionParams>,
}

impl DatabasesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default database
    pub fn with_default(mut self, params: ConnectionParams) -> Self {
        self.database = Some(params);
        self
    }

    /// Add a named database
    pub fn with_database(mut self, name: impl Into<String>, params: ConnectionParams) -> Self {
        self.databases.insert(name.into(), params);
        self
    }

    /// Resolve and validate the parameters for a logical database
    ///
    /// `None` selects the default `[database]` section.
    pub fn resolve(&self, name: Option<&str>) -> Result<ConnectionParams> {
        let params = match name {
            None => self
                .database
                .clone()
                .ok_or_else(|| Error::config("no default database is configured"))?,
            Some(name) => self
                .databases
                .get(name)
                .cloned()
                .ok_or_else(|| {
                    Error::config(format!(
                        "database '{}' is not configured. Configured databases: {}",
                        name,
                        self.list_names().join(", ")
                    ))
                })?,
        };

        params.validate()?;
        Ok(params)
    }

    /// Named databases, sorted
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.keys().cloned().collect();
        names.sort();
        names
    }

    /// Load from the current directory
    pub fn load() -> Result<Self> {
        Self::load_with_base_dir(".")
    }

    /// Load `config.toml` and `config.<env>.toml` from a base directory,
    /// then apply `DB_*` environment overrides
    pub fn load_with_base_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let environment = detect_environment();

        let base_config_path = base_dir.join("config.toml");
        let mut merged_value = if base_config_path.exists() {
            load_toml_value(&base_config_path)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let env_config_path = base_dir.join(format!("config.{}.toml", environment));
        if env_config_path.exists() {
            log::debug!(
                "Loading environment-specific config from: {}",
                env_config_path.display()
            );
            let env_value = load_toml_value(&env_config_path)?;
            merged_value = serde_toml_merge::merge(merged_value, env_value).map_err(|e| {
                Error::config(format!("Failed to merge configuration files: {}", e))
            })?;
        }

        let mut config = Self::from_toml_value(merged_value)?;
        config.apply_env_overrides_with(|key| env::var(key).ok());

        log::info!(
            "Database configuration loaded (environment: {}, named databases: {})",
            environment,
            config.databases.len()
        );

        Ok(config)
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse configuration: {}", e)))?;
        Self::from_toml_value(value)
    }

    fn from_toml_value(value: toml::Value) -> Result<Self> {
        // Go through JSON so unrelated application sections are ignored
        let json_value = serde_json::to_value(&value).map_err(|e| {
            Error::config(format!("Failed to convert merged configuration: {}", e))
        })?;

        serde_json::from_value(json_value).map_err(|e| {
            Error::config(format!("Failed to deserialize database configuration: {}", e))
        })
    }

    /// Apply `DB_DRIVER`, `DB_HOST`, `DB_PORT`, `DB_DATABASE`, `DB_USERNAME`
    /// and `DB_PASSWORD` to the default section
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let driver = lookup("DB_DRIVER");
        let host = lookup("DB_HOST");
        let port = lookup("DB_PORT");
        let database = lookup("DB_DATABASE");
        let username = lookup("DB_USERNAME");
        let password = lookup("DB_PASSWORD");

        if driver.is_none()
            && host.is_none()
            && port.is_none()
            && database.is_none()
            && username.is_none()
            && password.is_none()
        {
            return;
        }

        let params = self.database.get_or_insert_with(ConnectionParams::default);

        if driver.is_some() {
            params.driver = driver;
        }
        if host.is_some() {
            params.host = host;
        }
        if let Some(port) = port {
            match port.parse() {
                Ok(port) => params.port = Some(port),
                Err(_) => log::warn!("Ignoring invalid DB_PORT value '{}'", port),
            }
        }
        if let Some(database) = database {
            params.database = database;
        }
        if username.is_some() {
            params.username = username;
        }
        if password.is_some() {
            params.password = password;
        }
    }
}

/// Current application environment from `APP_ENV`
pub fn detect_environment() -> String {
    env::var("APP_ENV")
        .ok()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "development".to_string())
}

fn load_toml_value(path: &Path) -> Result<toml::Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        let context = format!("Failed to read config file '{}': {}", path.display(), e);
        Error::from(e).with_context(context)
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::config(format!(
            "Failed to parse config file '{}': {}. Check TOML syntax.",
            path.display(),
            e
        ))
    })
}
