//! Nested AND/OR condition trees
//!
//! ```
//! use bifrost_db::query_builder::{Where, DatabaseBackend};
//!
//! let filter = Where::new()
//!     .eq("active", 1)
//!     .or(Where::new().eq("a", 1).eq("b", 2));
//! assert_eq!(
//!     filter.to_sql(DatabaseBackend::Postgres.dialect()),
//!     "active = 1 AND (a = 1 OR b = 2)"
//! );
//! ```

use super::dialects::SqlDialect;
use super::writer::{RenderMode, SqlWriter};
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use serde_json::Value as JsonValue;

/// Keyword joining sibling conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    fn separator(self) -> &'static str {
        match self {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        }
    }
}

/// Comparison used by a leaf condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl Comparator {
    fn as_sql(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Like => "LIKE",
        }
    }
}

/// One entry of a where tree
#[derive(Debug, Clone)]
pub enum WhereNode {
    /// Trusted SQL fragment, passed through verbatim
    Raw(String),
    Condition {
        column: String,
        comparator: Comparator,
        value: SqlValue,
    },
    Group(Where),
}

impl WhereNode {
    fn is_empty(&self) -> bool {
        match self {
            WhereNode::Raw(fragment) => fragment.trim().is_empty(),
            WhereNode::Condition { .. } => false,
            WhereNode::Group(group) => group.is_empty(),
        }
    }
}

/// A group of conditions joined by one logical operator
#[derive(Debug, Clone, Default)]
pub struct Where {
    pub operator: LogicalOperator,
    pub nodes: Vec<WhereNode>,
}

impl Where {
    /// Conditions joined by AND
    pub fn new() -> Self {
        Self::default()
    }

    /// Conditions joined by OR
    pub fn any() -> Self {
        Self {
            operator: LogicalOperator::Or,
            nodes: Vec::new(),
        }
    }

    /// True when nothing would render: no nodes, or only blank fragments
    /// and groups that are themselves empty
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(WhereNode::is_empty)
    }

    pub fn condition<S: Into<String>, V: Into<SqlValue>>(
        mut self,
        column: S,
        comparator: Comparator,
        value: V,
    ) -> Self {
        self.nodes.push(WhereNode::Condition {
            column: column.into(),
            comparator,
            value: value.into(),
        });
        self
    }

    /// `column = value`; NULL renders `IS NULL`, a list renders `IN (...)`
    pub fn eq<S: Into<String>, V: Into<SqlValue>>(self, column: S, value: V) -> Self {
        self.condition(column, Comparator::Eq, value)
    }

    /// `column != value`; NULL renders `IS NOT NULL`, a list renders `NOT IN (...)`
    pub fn ne<S: Into<String>, V: Into<SqlValue>>(self, column: S, value: V) -> Self {
        self.condition(column, Comparator::Ne, value)
    }

    pub fn gt<S: Into<String>, V: Into<SqlValue>>(self, column: S, value: V) -> Self {
        self.condition(column, Comparator::Gt, value)
    }

    pub fn ge<S: Into<String>, V: Into<SqlValue>>(self, column: S, value: V) -> Self {
        self.condition(column, Comparator::Ge, value)
    }

    pub fn lt<S: Into<String>, V: Into<SqlValue>>(self, column: S, value: V) -> Self {
        self.condition(column, Comparator::Lt, value)
    }

    pub fn le<S: Into<String>, V: Into<SqlValue>>(self, column: S, value: V) -> Self {
        self.condition(column, Comparator::Le, value)
    }

    pub fn like<S: Into<String>, V: Into<SqlValue>>(self, column: S, pattern: V) -> Self {
        self.condition(column, Comparator::Like, pattern)
    }

    pub fn is_null<S: Into<String>>(self, column: S) -> Self {
        self.condition(column, Comparator::Eq, SqlValue::Null)
    }

    pub fn is_not_null<S: Into<String>>(self, column: S) -> Self {
        self.condition(column, Comparator::Ne, SqlValue::Null)
    }

    /// Append a trusted SQL fragment without any escaping
    pub fn raw<S: Into<String>>(mut self, fragment: S) -> Self {
        self.nodes.push(WhereNode::Raw(fragment.into()));
        self
    }

    /// Nest the conditions of `group` joined by AND
    pub fn and(self, group: Where) -> Self {
        self.group(Where {
            operator: LogicalOperator::And,
            nodes: group.nodes,
        })
    }

    /// Nest the conditions of `group` joined by OR
    pub fn or(self, group: Where) -> Self {
        self.group(Where {
            operator: LogicalOperator::Or,
            nodes: group.nodes,
        })
    }

    /// Nest a group keeping its own operator
    pub fn group(mut self, group: Where) -> Self {
        self.nodes.push(WhereNode::Group(group));
        self
    }

    /// Render with values inlined as literals
    pub fn to_sql(&self, dialect: &dyn SqlDialect) -> String {
        let mut writer = SqlWriter::new(dialect, RenderMode::Inline);
        self.write(&mut writer);
        writer.finish().sql
    }

    /// Render into `writer`; an empty tree writes nothing
    pub fn write(&self, writer: &mut SqlWriter<'_>) {
        let mut first = true;
        for node in &self.nodes {
            if node.is_empty() {
                continue;
            }
            if !first {
                writer.push(self.operator.separator());
            }
            first = false;

            match node {
                WhereNode::Raw(fragment) => writer.push(fragment),
                WhereNode::Condition {
                    column,
                    comparator,
                    value,
                } => write_condition(writer, column, *comparator, value),
                WhereNode::Group(group) => {
                    writer.push("(");
                    group.write(writer);
                    writer.push(")");
                }
            }
        }
    }
}

fn write_condition(writer: &mut SqlWriter<'_>, column: &str, comparator: Comparator, value: &SqlValue) {
    let value = value.resolved();
    writer.push(column);

    match (&value, comparator) {
        (SqlValue::Null, Comparator::Ne) => writer.push(" IS NOT NULL"),
        (SqlValue::Null, _) => writer.push(" IS NULL"),
        (SqlValue::Array(items), Comparator::Eq | Comparator::Ne) => {
            writer.push(if comparator == Comparator::Ne {
                " NOT IN ("
            } else {
                " IN ("
            });
            if items.is_empty() {
                // Keeps the statement valid and matches nothing useful
                writer.push_value(&SqlValue::String(String::new()));
            }
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    writer.push(", ");
                }
                writer.push_list_item(item);
            }
            writer.push(")");
        }
        _ => {
            writer.push(" ");
            writer.push(comparator.as_sql());
            writer.push(" ");
            writer.push_value(&value);
        }
    }
}

/// A WHERE/HAVING argument: trusted SQL text or a condition tree
#[derive(Debug, Clone)]
pub enum Filter {
    Sql(String),
    Tree(Where),
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Sql(sql) => sql.trim().is_empty(),
            Filter::Tree(tree) => tree.is_empty(),
        }
    }

    pub fn write(&self, writer: &mut SqlWriter<'_>) {
        match self {
            Filter::Sql(sql) => writer.push(sql),
            Filter::Tree(tree) => tree.write(writer),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Sql(String::new())
    }
}

impl From<&str> for Filter {
    fn from(sql: &str) -> Self {
        Filter::Sql(sql.to_string())
    }
}

impl From<String> for Filter {
    fn from(sql: String) -> Self {
        Filter::Sql(sql)
    }
}

impl From<Where> for Filter {
    fn from(tree: Where) -> Self {
        Filter::Tree(tree)
    }
}

impl TryFrom<&JsonValue> for Where {
    type Error = Error;

    /// Build a tree from a JSON condition map
    ///
    /// Object keys are columns, except `AND`/`OR` which nest a group.
    /// Arrays mix raw SQL strings with condition objects.
    fn try_from(value: &JsonValue) -> Result<Self> {
        let mut tree = Where::new();
        append_json(&mut tree, value)?;
        Ok(tree)
    }
}

fn append_json(tree: &mut Where, value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::Object(map) => {
            for (key, entry) in map {
                match key.to_ascii_uppercase().as_str() {
                    "AND" | "OR" => {
                        let mut group = if key.eq_ignore_ascii_case("or") {
                            Where::any()
                        } else {
                            Where::new()
                        };
                        append_json(&mut group, entry)?;
                        tree.nodes.push(WhereNode::Group(group));
                    }
                    _ => tree.nodes.push(WhereNode::Condition {
                        column: key.clone(),
                        comparator: Comparator::Eq,
                        value: SqlValue::from(json_scalar(entry)),
                    }),
                }
            }
            Ok(())
        }
        JsonValue::Array(items) => {
            for item in items {
                match item {
                    JsonValue::String(fragment) => tree.nodes.push(WhereNode::Raw(fragment.clone())),
                    other => append_json(tree, other)?,
                }
            }
            Ok(())
        }
        JsonValue::String(fragment) => {
            tree.nodes.push(WhereNode::Raw(fragment.clone()));
            Ok(())
        }
        other => Err(Error::invalid_input(format!(
            "Unsupported where condition: {}",
            other
        ))),
    }
}

// JSON scalars become typed values so numbers render bare
fn json_scalar(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Int(i),
            None => SqlValue::Double(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => SqlValue::String(s.clone()),
        JsonValue::Array(items) => SqlValue::Array(items.iter().map(json_scalar).collect()),
        JsonValue::Object(_) => SqlValue::Json(value.clone()),
    }
}
