//! Statement descriptors for SELECT, INSERT, UPDATE, DELETE and EXISTS
//!
//! Table names, field expressions, joins, grouping and ordering are caller
//! supplied SQL and pass through unchanged. Only values are escaped (or
//! bound, see [`RenderMode`]).

use super::dialects::SqlDialect;
use super::where_tree::Filter;
use super::writer::{RenderMode, RenderedSql, SqlWriter};
use crate::database::types::SqlValue;
use indexmap::IndexMap;

/// Common rendering entry points for all statement kinds
pub trait Statement {
    fn write(&self, writer: &mut SqlWriter<'_>);

    fn render(&self, dialect: &dyn SqlDialect, mode: RenderMode) -> RenderedSql {
        let mut writer = SqlWriter::new(dialect, mode);
        self.write(&mut writer);
        writer.finish()
    }

    /// SQL text with every value inlined as an escaped literal
    fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        self.render(dialect, RenderMode::Inline).sql
    }
}

fn write_clause(writer: &mut SqlWriter<'_>, keyword: &str, text: &str) {
    if !text.trim().is_empty() {
        writer.push(" ");
        writer.push(keyword);
        writer.push(" ");
        writer.push(text);
    }
}

fn write_filter(writer: &mut SqlWriter<'_>, keyword: &str, filter: &Filter) {
    if !filter.is_empty() {
        writer.push(" ");
        writer.push(keyword);
        writer.push(" ");
        filter.write(writer);
    }
}

/// One entry of a select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub expr: String,
    pub alias: Option<String>,
}

impl Field {
    pub fn new<S: Into<String>>(expr: S) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn aliased<S: Into<String>, A: Into<String>>(expr: S, alias: A) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }
}

/// Select list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fields {
    #[default]
    All,
    /// Select list text used as-is
    Raw(String),
    List(Vec<Field>),
}

impl Fields {
    fn to_sql(&self) -> String {
        match self {
            Fields::All => "*".to_string(),
            Fields::Raw(sql) if sql.trim().is_empty() => "*".to_string(),
            Fields::Raw(sql) => sql.clone(),
            Fields::List(fields) if fields.is_empty() => "*".to_string(),
            Fields::List(fields) => fields
                .iter()
                .map(|field| match &field.alias {
                    Some(alias) => format!("{} AS {}", field.expr, alias),
                    None => field.expr.clone(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<&str> for Fields {
    fn from(sql: &str) -> Self {
        Fields::Raw(sql.to_string())
    }
}

impl From<String> for Fields {
    fn from(sql: String) -> Self {
        Fields::Raw(sql)
    }
}

impl From<Vec<Field>> for Fields {
    fn from(fields: Vec<Field>) -> Self {
        Fields::List(fields)
    }
}

impl From<Vec<&str>> for Fields {
    fn from(exprs: Vec<&str>) -> Self {
        Fields::List(exprs.into_iter().map(Field::new).collect())
    }
}

/// SELECT descriptor
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub table: String,
    pub fields: Fields,
    pub joins: Vec<String>,
    pub filter: Filter,
    pub group: String,
    pub having: Filter,
    pub order: String,
    pub limit: String,
}

impl SelectQuery {
    pub fn new<S: Into<String>>(table: S) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn fields<F: Into<Fields>>(mut self, fields: F) -> Self {
        self.fields = fields.into();
        self
    }

    /// Append a join fragment (`LEFT JOIN t ON ...`), used verbatim
    pub fn join<S: Into<String>>(mut self, join: S) -> Self {
        self.joins.push(join.into());
        self
    }

    pub fn filter<F: Into<Filter>>(mut self, filter: F) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn group_by<S: Into<String>>(mut self, group: S) -> Self {
        self.group = group.into();
        self
    }

    pub fn having<F: Into<Filter>>(mut self, having: F) -> Self {
        self.having = having.into();
        self
    }

    pub fn order_by<S: Into<String>>(mut self, order: S) -> Self {
        self.order = order.into();
        self
    }

    /// LIMIT clause text, e.g. `10` or `10 OFFSET 20`
    pub fn limit<S: ToString>(mut self, limit: S) -> Self {
        self.limit = limit.to_string();
        self
    }

    /// Limit to one page; pages start at 1
    pub fn paginate(mut self, page: u64, per_page: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.limit = format!("{} OFFSET {}", per_page, offset);
        self
    }
}

impl Statement for SelectQuery {
    fn write(&self, writer: &mut SqlWriter<'_>) {
        writer.push("SELECT ");
        writer.push(&self.fields.to_sql());
        writer.push(" FROM ");
        writer.push(&self.table);

        let joins: Vec<&str> = self
            .joins
            .iter()
            .map(|join| join.trim())
            .filter(|join| !join.is_empty())
            .collect();
        if !joins.is_empty() {
            writer.push(" ");
            writer.push(&joins.join(" "));
        }

        write_filter(writer, "WHERE", &self.filter);
        write_clause(writer, "GROUP BY", &self.group);
        write_filter(writer, "HAVING", &self.having);
        write_clause(writer, "ORDER BY", &self.order);
        write_clause(writer, "LIMIT", &self.limit);
    }
}

/// One entry of an insert data list
#[derive(Debug, Clone)]
pub enum InsertEntry {
    /// Column bound through a `:column` placeholder at execution time
    Placeholder(String),
    /// Column with a value rendered by the builder
    Value(String, SqlValue),
}

impl InsertEntry {
    pub fn column(&self) -> &str {
        match self {
            InsertEntry::Placeholder(column) | InsertEntry::Value(column, _) => column,
        }
    }
}

/// Ordered insert data
#[derive(Debug, Clone, Default)]
pub struct InsertData {
    pub entries: Vec<InsertEntry>,
}

impl InsertData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholder<S: Into<String>>(mut self, column: S) -> Self {
        self.entries.push(InsertEntry::Placeholder(column.into()));
        self
    }

    pub fn value<S: Into<String>, V: Into<SqlValue>>(mut self, column: S, value: V) -> Self {
        self.entries
            .push(InsertEntry::Value(column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Columns that expect a bound value at execution time
    pub fn placeholder_columns(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                InsertEntry::Placeholder(column) => Some(column.as_str()),
                InsertEntry::Value(..) => None,
            })
            .collect()
    }
}

impl From<IndexMap<String, SqlValue>> for InsertData {
    fn from(map: IndexMap<String, SqlValue>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(column, value)| InsertEntry::Value(column, value))
                .collect(),
        }
    }
}

/// INSERT descriptor
#[derive(Debug, Clone, Default)]
pub struct InsertQuery {
    pub table: String,
    pub data: InsertData,
    pub returning: String,
}

impl InsertQuery {
    pub fn new<S: Into<String>>(table: S, data: InsertData) -> Self {
        Self {
            table: table.into(),
            data,
            returning: String::new(),
        }
    }

    pub fn returning<S: Into<String>>(mut self, returning: S) -> Self {
        self.returning = returning.into();
        self
    }
}

impl Statement for InsertQuery {
    fn write(&self, writer: &mut SqlWriter<'_>) {
        writer.push("INSERT INTO ");
        writer.push(&self.table);
        writer.push(" (");
        let columns: Vec<&str> = self.data.entries.iter().map(InsertEntry::column).collect();
        writer.push(&columns.join(", "));
        writer.push(") VALUES (");

        for (index, entry) in self.data.entries.iter().enumerate() {
            if index > 0 {
                writer.push(", ");
            }
            match entry {
                InsertEntry::Placeholder(column) => {
                    writer.push(":");
                    writer.push(column);
                }
                InsertEntry::Value(_, value) => writer.push_value(value),
            }
        }
        writer.push(")");

        write_clause(writer, "RETURNING", &self.returning);
    }
}

/// UPDATE descriptor; every value is rendered by the builder
#[derive(Debug, Clone, Default)]
pub struct UpdateQuery {
    pub table: String,
    pub data: IndexMap<String, SqlValue>,
    pub filter: Filter,
}

impl UpdateQuery {
    pub fn new<S: Into<String>>(table: S) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn set<S: Into<String>, V: Into<SqlValue>>(mut self, column: S, value: V) -> Self {
        self.data.insert(column.into(), value.into());
        self
    }

    pub fn data(mut self, data: IndexMap<String, SqlValue>) -> Self {
        self.data = data;
        self
    }

    pub fn filter<F: Into<Filter>>(mut self, filter: F) -> Self {
        self.filter = filter.into();
        self
    }
}

impl Statement for UpdateQuery {
    fn write(&self, writer: &mut SqlWriter<'_>) {
        writer.push("UPDATE ");
        writer.push(&self.table);
        writer.push(" SET ");
        for (index, (column, value)) in self.data.iter().enumerate() {
            if index > 0 {
                writer.push(", ");
            }
            writer.push(column);
            writer.push(" = ");
            writer.push_value(value);
        }
        write_filter(writer, "WHERE", &self.filter);
    }
}

/// DELETE descriptor
#[derive(Debug, Clone, Default)]
pub struct DeleteQuery {
    pub table: String,
    pub filter: Filter,
}

impl DeleteQuery {
    pub fn new<S: Into<String>>(table: S) -> Self {
        Self {
            table: table.into(),
            filter: Filter::default(),
        }
    }

    pub fn filter<F: Into<Filter>>(mut self, filter: F) -> Self {
        self.filter = filter.into();
        self
    }
}

impl Statement for DeleteQuery {
    fn write(&self, writer: &mut SqlWriter<'_>) {
        writer.push("DELETE FROM ");
        writer.push(&self.table);
        write_filter(writer, "WHERE", &self.filter);
    }
}

/// Scalar existence probe, answering in a column named `exists`
#[derive(Debug, Clone, Default)]
pub struct ExistsQuery {
    pub table: String,
    pub filter: Filter,
}

impl ExistsQuery {
    pub const COLUMN: &'static str = "exists";

    pub fn new<S: Into<String>>(table: S) -> Self {
        Self {
            table: table.into(),
            filter: Filter::default(),
        }
    }

    pub fn filter<F: Into<Filter>>(mut self, filter: F) -> Self {
        self.filter = filter.into();
        self
    }
}

impl Statement for ExistsQuery {
    fn write(&self, writer: &mut SqlWriter<'_>) {
        writer.push("SELECT EXISTS(SELECT 1 FROM ");
        writer.push(&self.table);
        write_filter(writer, "WHERE", &self.filter);
        writer.push(") AS ");
        let alias = writer.dialect().quote_identifier(Self::COLUMN);
        writer.push(&alias);
    }
}
