//! Adapter and connection registries
//!
//! [`AdapterRegistry`] maps driver identifiers to adapter instances so new
//! engines can be plugged in without touching the facade.
//! [`ConnectionRegistry`] caches one native connection per
//! `(database name, driver)` pair; concurrent first use of a key opens a
//! single connection.

use crate::database::adapter::{DriverAdapter, NativeConnection};
use crate::database::adapters::{MySqlAdapter, PostgresAdapter, SqliteAdapter};
use crate::database::config::ConnectionParams;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// A native connection shared by every facade opened for the same key
pub type SharedConnection = Arc<Mutex<Box<dyn NativeConnection>>>;

/// Cache key segment used when no database name is given
pub const DEFAULT_DATABASE_KEY: &str = "__default__";

/// Build the cache key for a logical database and driver
pub fn cache_key(name: Option<&str>, driver: &str) -> String {
    format!("{}:{}", name.unwrap_or(DEFAULT_DATABASE_KEY), driver)
}

/// Registry of driver adapters keyed by driver identifier
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn DriverAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Create a registry with the SQLite, MySQL and PostgreSQL adapters
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(SqliteAdapter::new()));
        registry.register(Arc::new(MySqlAdapter::new()));
        registry.register(Arc::new(PostgresAdapter::new()));
        registry
    }

    /// Register an adapter under its own name, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn DriverAdapter>) {
        self.adapters
            .insert(adapter.name().to_ascii_lowercase(), adapter);
    }

    /// Look up the adapter for a driver identifier (case-insensitive)
    pub fn get(&self, driver: &str) -> Result<Arc<dyn DriverAdapter>> {
        self.adapters
            .get(&driver.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                Error::config(format!(
                    "Unsupported database driver '{}'. Available drivers: {}",
                    driver,
                    self.names().join(", ")
                ))
            })
    }

    /// Registered driver identifiers, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_CONNECTIONS: Lazy<Arc<ConnectionRegistry>> =
    Lazy::new(|| Arc::new(ConnectionRegistry::new()));

/// Cache of open native connections
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Arc<OnceCell<SharedConnection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry whose connections live until process exit
    pub fn global() -> Arc<ConnectionRegistry> {
        GLOBAL_CONNECTIONS.clone()
    }

    /// Return the cached connection for `key`, opening it on first use
    ///
    /// A failed open leaves the key empty so a later call can retry.
    pub async fn get_or_connect(
        &self,
        key: &str,
        adapter: &dyn DriverAdapter,
        params: &ConnectionParams,
    ) -> Result<SharedConnection> {
        let cell = {
            let mut connections = self.connections.lock().await;
            connections
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(connection) = cell.get() {
            log::debug!("Reusing cached connection {}", key);
            return Ok(connection.clone());
        }

        let connection = cell
            .get_or_try_init(|| async {
                let native = adapter.connect(params).await?;
                log::info!("Cached new connection {}", key);
                Ok::<_, Error>(Arc::new(Mutex::new(native)))
            })
            .await?;

        Ok(connection.clone())
    }

    /// Whether a live connection is cached for `key`
    pub async fn contains(&self, key: &str) -> bool {
        let connections = self.connections.lock().await;
        connections
            .get(key)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    /// Number of live cached connections
    pub async fn len(&self) -> usize {
        let connections = self.connections.lock().await;
        connections
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Empty the cache and close every connection no facade still holds
    ///
    /// Connections still referenced elsewhere are released when their last
    /// holder drops them. Returns the number closed here.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<(String, Arc<OnceCell<SharedConnection>>)> = {
            let mut connections = self.connections.lock().await;
            connections.drain().collect()
        };

        let mut closed = 0;
        for (key, cell) in drained {
            let shared = match Arc::try_unwrap(cell).ok().and_then(OnceCell::into_inner) {
                Some(shared) => shared,
                None => continue,
            };

            match Arc::try_unwrap(shared) {
                Ok(mutex) => {
                    if let Err(e) = mutex.into_inner().close().await {
                        log::warn!("Failed to close connection {}: {}", key, e);
                    }
                    closed += 1;
                }
                Err(_) => log::debug!("Connection {} still in use, released from cache", key),
            }
        }

        closed
    }
}
