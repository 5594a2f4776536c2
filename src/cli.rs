//! Schema and query inspection from the command line
//!
//! Reads the same `config.toml` the application uses and prints JSON.

use crate::database::{Database, DatabaseManager, Params, QueryOutcome};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bifrost-db")]
#[command(about = "Inspect databases configured for a Bifrost application")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: DbCommand,

    /// Directory holding config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Named database (defaults to the [database] section)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// List tables
    Tables,

    /// Describe table columns
    Describe {
        /// Table name to describe
        table: String,
    },

    /// Check whether a table has rows
    Exists {
        table: String,

        /// SQL condition rows must match
        #[arg(long = "where")]
        filter: Option<String>,
    },

    /// Run a raw SQL statement
    Query {
        sql: String,
    },
}

/// Execute the parsed command and print its JSON result
pub async fn run(cli: Cli) -> Result<()> {
    let base_dir = match cli.config {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let manager = DatabaseManager::load(&base_dir)
        .with_context(|| format!("Failed to load configuration from {}", base_dir.display()))?;
    let db = manager.database(cli.database.as_deref()).await?;

    let output = execute(&db, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    manager.close().await;
    Ok(())
}

async fn execute(db: &Database, command: DbCommand) -> Result<serde_json::Value> {
    let value = match command {
        DbCommand::Tables => json!(db.get_tables().await?),
        DbCommand::Describe { table } => {
            if !db.exist_table(&table).await? {
                anyhow::bail!("Table '{}' not found", table);
            }
            json!(db.get_det_table(&table).await?)
        }
        DbCommand::Exists { table, filter } => {
            json!(db.exists(&table, filter.unwrap_or_default()).await?)
        }
        DbCommand::Query { sql } => match db.execute_query(&sql, Params::None).await? {
            QueryOutcome::Rows(rows) => json!(rows),
            QueryOutcome::Affected(count) => json!({ "affected": count }),
            QueryOutcome::Returned(value) => json!({ "returned": value }),
        },
    };

    Ok(value)
}
