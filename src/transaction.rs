//! Request-scoped transactions
//!
//! Request middleware opens a transaction before the handler runs and,
//! once the response is known, commits it when the response signals
//! success or rolls it back otherwise.
//!
//! ```no_run
//! # use bifrost_db::{Database, transaction::{HttpStatus, TransactionScope}};
//! # async fn handle(db: Database) -> bifrost_db::Result<()> {
//! let scope = TransactionScope::new(db);
//! scope.before().await?;
//! // ... run the handler ...
//! scope.after(&HttpStatus(201)).await?;
//! # Ok(())
//! # }
//! ```

use crate::database::Database;
use crate::error::Result;
use std::future::Future;

/// Anything that can tell whether the work it describes succeeded
pub trait Outcome {
    fn is_success(&self) -> bool;
}

impl<T, E> Outcome for std::result::Result<T, E> {
    fn is_success(&self) -> bool {
        self.is_ok()
    }
}

impl Outcome for bool {
    fn is_success(&self) -> bool {
        *self
    }
}

/// HTTP response status; 2xx counts as success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpStatus(pub u16);

impl Outcome for HttpStatus {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }
}

/// Transaction bracketing one unit of work on a database
#[derive(Debug, Clone)]
pub struct TransactionScope {
    database: Database,
}

impl TransactionScope {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Begin the transaction
    pub async fn before(&self) -> Result<()> {
        self.database.begin().await?;
        Ok(())
    }

    /// Commit on success, roll back otherwise
    ///
    /// Returns `true` when the transaction was committed.
    pub async fn after<O: Outcome + ?Sized>(&self, outcome: &O) -> Result<bool> {
        if outcome.is_success() {
            self.database.save().await?;
            Ok(true)
        } else {
            self.database.rollback().await?;
            Ok(false)
        }
    }

    /// Run `work` inside the transaction
    ///
    /// A failed rollback is logged and the work's own error is returned.
    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.before().await?;
        let result = work.await;
        let settled = self.after(&result).await;

        match settled {
            Ok(_) => result,
            Err(e) if result.is_err() => {
                log::warn!("Rollback failed on {}: {}", self.database.cache_key(), e);
                result
            }
            Err(e) => Err(e),
        }
    }
}
