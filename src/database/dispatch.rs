//! Generalized query dispatcher
//!
//! [`Database::query`] picks one operation from whichever argument group
//! is populated. The first match wins, in this order: existence check, raw
//! query, select, insert, update, delete.

use crate::database::facade::{Database, QueryOutcome};
use crate::database::params::Params;
use crate::database::types::{Row, SqlValue};
use crate::error::{Error, Result};
use crate::query_builder::{Fields, Filter, InsertData, SelectQuery};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// Arguments of [`Database::query`]
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    /// Fields to select; selects from `from`
    pub select: Option<Fields>,
    /// Data to insert into `into`
    pub insert: Option<InsertData>,
    /// Table to update with `set`
    pub update: Option<String>,
    /// Table to delete from
    pub delete: Option<String>,
    pub into: Option<String>,
    pub from: Option<String>,
    pub set: Option<IndexMap<String, SqlValue>>,
    pub filter: Option<Filter>,
    pub join: Vec<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub having: Option<Filter>,
    pub group: Option<String>,
    pub returning: Option<String>,
    /// Raw SQL, run as-is with `params`
    pub query: Option<String>,
    pub params: Params,
    /// Return only the first row of a select or raw query
    pub return_first: bool,
    /// Check whether `from` has rows matching `filter`
    pub exists: bool,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw SQL with parameters
    pub fn raw<S: Into<String>>(sql: S, params: Params) -> Self {
        Self {
            query: Some(sql.into()),
            params,
            ..Default::default()
        }
    }

    pub fn select<F: Into<Fields>, S: Into<String>>(fields: F, from: S) -> Self {
        Self {
            select: Some(fields.into()),
            from: Some(from.into()),
            ..Default::default()
        }
    }

    pub fn insert<S: Into<String>>(data: InsertData, into: S) -> Self {
        Self {
            insert: Some(data),
            into: Some(into.into()),
            ..Default::default()
        }
    }

    pub fn update<S: Into<String>>(table: S, set: IndexMap<String, SqlValue>) -> Self {
        Self {
            update: Some(table.into()),
            set: Some(set),
            ..Default::default()
        }
    }

    pub fn delete<S: Into<String>>(table: S) -> Self {
        Self {
            delete: Some(table.into()),
            ..Default::default()
        }
    }

    pub fn exists<S: Into<String>>(from: S) -> Self {
        Self {
            exists: true,
            from: Some(from.into()),
            ..Default::default()
        }
    }

    pub fn filter<F: Into<Filter>>(mut self, filter: F) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn join<S: Into<String>>(mut self, join: S) -> Self {
        self.join.push(join.into());
        self
    }

    pub fn order<S: Into<String>>(mut self, order: S) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn limit<S: ToString>(mut self, limit: S) -> Self {
        self.limit = Some(limit.to_string());
        self
    }

    pub fn group<S: Into<String>>(mut self, group: S) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn having<F: Into<Filter>>(mut self, having: F) -> Self {
        self.having = Some(having.into());
        self
    }

    pub fn returning<S: Into<String>>(mut self, returning: S) -> Self {
        self.returning = Some(returning.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn first(mut self) -> Self {
        self.return_first = true;
        self
    }
}

/// Result of [`Database::query`]
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Exists(bool),
    Rows(Vec<Row>),
    /// First row of a select or raw query when `return_first` is set
    First(Option<Row>),
    /// Non-select raw statement result
    Outcome(QueryOutcome),
    /// Returned value or generated identifier of an insert
    Inserted(Option<JsonValue>),
    /// Affected rows of an update or delete
    Affected(u64),
    /// No argument group was populated
    NotDispatched,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn required_table<'a>(table: &'a Option<String>, operation: &str, argument: &str) -> Result<&'a str> {
    non_empty(table).ok_or_else(|| {
        Error::invalid_input(format!("{} requires a table in `{}`", operation, argument))
    })
}

fn rows_output(rows: Vec<Row>, return_first: bool) -> QueryOutput {
    if return_first {
        QueryOutput::First(rows.into_iter().next())
    } else {
        QueryOutput::Rows(rows)
    }
}

impl Database {
    /// Run whichever operation the populated arguments describe
    pub async fn query(&self, args: QueryArgs) -> Result<QueryOutput> {
        let filter = args.filter.unwrap_or_default();

        if args.exists {
            if let Some(from) = non_empty(&args.from) {
                return Ok(QueryOutput::Exists(self.exists(from, filter).await?));
            }
        }

        if let Some(sql) = non_empty(&args.query) {
            return Ok(match self.execute_query(sql, args.params).await? {
                QueryOutcome::Rows(rows) => rows_output(rows, args.return_first),
                other => QueryOutput::Outcome(other),
            });
        }

        if let Some(fields) = args.select {
            let table = required_table(&args.from, "select", "from")?;
            let mut query = SelectQuery::new(table).fields(fields).filter(filter);
            query.joins = args.join;
            query.group = args.group.unwrap_or_default();
            query.having = args.having.unwrap_or_default();
            query.order = args.order.unwrap_or_default();
            query.limit = args.limit.unwrap_or_default();

            let rows = self.select(&query).await?;
            return Ok(rows_output(rows, args.return_first));
        }

        if let Some(data) = args.insert.filter(|data| !data.is_empty()) {
            let table = required_table(&args.into, "insert", "into")?;
            let returning = args.returning.unwrap_or_default();
            let value = self
                .insert_with(table, data, &returning, args.params)
                .await?;
            return Ok(QueryOutput::Inserted(value));
        }

        if let Some(table) = non_empty(&args.update) {
            let data = args.set.unwrap_or_default();
            if data.is_empty() {
                return Err(Error::invalid_input("update requires data in `set`"));
            }
            return Ok(QueryOutput::Affected(self.update(table, data, filter).await?));
        }

        if let Some(table) = non_empty(&args.delete) {
            return Ok(QueryOutput::Affected(self.delete(table, filter).await?));
        }

        Ok(QueryOutput::NotDispatched)
    }
}
