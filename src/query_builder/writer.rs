//! SQL text accumulation with inline or bound value rendering

use super::dialects::SqlDialect;
use crate::database::types::SqlValue;
use indexmap::IndexMap;

/// How values reach the generated SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Values are escaped and inlined as literals (legacy, injection-prone
    /// if callers bypass the builder's quoting)
    #[default]
    Inline,
    /// Values become named `:__pN` placeholders collected alongside the SQL
    Bind,
}

/// SQL text plus the values referenced by its named placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: IndexMap<String, SqlValue>,
}

/// Accumulates SQL text for one statement
pub struct SqlWriter<'d> {
    dialect: &'d dyn SqlDialect,
    mode: RenderMode,
    sql: String,
    params: IndexMap<String, SqlValue>,
}

impl<'d> SqlWriter<'d> {
    pub fn new(dialect: &'d dyn SqlDialect, mode: RenderMode) -> Self {
        Self {
            dialect,
            mode,
            sql: String::new(),
            params: IndexMap::new(),
        }
    }

    pub fn dialect(&self) -> &'d dyn SqlDialect {
        self.dialect
    }

    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Append a value in the writer's render mode
    ///
    /// NULL is always written inline so `IS NULL` style comparisons and
    /// `SET col = NULL` keep working without a typed parameter.
    pub fn push_value(&mut self, value: &SqlValue) {
        let value = value.resolved();
        if self.mode == RenderMode::Inline || value.is_null() {
            let literal = self.literal(&value);
            self.sql.push_str(&literal);
        } else {
            let name = format!("__p{}", self.params.len() + 1);
            self.sql.push(':');
            self.sql.push_str(&name);
            self.params.insert(name, value);
        }
    }

    /// Append an `IN (...)` list member
    ///
    /// Inline lists quote every member as text; bound lists keep the
    /// member's own type so typed columns compare without casts.
    pub fn push_list_item(&mut self, value: &SqlValue) {
        match self.mode {
            RenderMode::Inline => match value.as_text() {
                Some(text) => self.push_value(&SqlValue::String(text)),
                None => self.push_value(&SqlValue::Null),
            },
            RenderMode::Bind => self.push_value(value),
        }
    }

    /// Render a value as an escaped literal for this dialect
    pub fn literal(&self, value: &SqlValue) -> String {
        match value.resolved() {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => self.dialect.boolean_literal(b).to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Double(f) if f.is_finite() => f.to_string(),
            SqlValue::Double(_) => "NULL".to_string(),
            SqlValue::Decimal(d) => d.to_string(),
            other => match other.as_text() {
                Some(text) => self.dialect.quote_literal(&text),
                None => "NULL".to_string(),
            },
        }
    }

    pub fn finish(self) -> RenderedSql {
        RenderedSql {
            sql: self.sql,
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::dialects::DatabaseBackend;

    #[test]
    fn test_inline_literals() {
        let writer = SqlWriter::new(DatabaseBackend::Postgres.dialect(), RenderMode::Inline);
        assert_eq!(writer.literal(&SqlValue::Null), "NULL");
        assert_eq!(writer.literal(&SqlValue::from(42)), "42");
        assert_eq!(writer.literal(&SqlValue::from(1.5)), "1.5");
        assert_eq!(writer.literal(&SqlValue::from("O'Brien")), "'O''Brien'");
        assert_eq!(writer.literal(&SqlValue::from(true)), "TRUE");
        assert_eq!(writer.literal(&SqlValue::Double(f64::NAN)), "NULL");
    }

    #[test]
    fn test_bind_mode_collects_values() {
        let mut writer = SqlWriter::new(DatabaseBackend::SQLite.dialect(), RenderMode::Bind);
        writer.push("a = ");
        writer.push_value(&SqlValue::from("x"));
        writer.push(" AND b = ");
        writer.push_value(&SqlValue::Null);
        writer.push(" AND c = ");
        writer.push_value(&SqlValue::from(7));

        let rendered = writer.finish();
        assert_eq!(rendered.sql, "a = :__p1 AND b = NULL AND c = :__p2");
        assert_eq!(rendered.params.len(), 2);
        assert_eq!(rendered.params["__p2"], SqlValue::Int(7));
    }

    #[test]
    fn test_list_items_per_mode() {
        let id = uuid::Uuid::nil();
        let dialect = DatabaseBackend::Postgres.dialect();

        let mut writer = SqlWriter::new(dialect, RenderMode::Inline);
        writer.push_list_item(&SqlValue::from(3));
        writer.push(", ");
        writer.push_list_item(&SqlValue::from(id));
        assert_eq!(
            writer.finish().sql,
            "'3', '00000000-0000-0000-0000-000000000000'"
        );

        let mut writer = SqlWriter::new(dialect, RenderMode::Bind);
        writer.push_list_item(&SqlValue::from(3));
        writer.push(", ");
        writer.push_list_item(&SqlValue::from(id));
        let rendered = writer.finish();
        assert_eq!(rendered.sql, ":__p1, :__p2");
        assert_eq!(rendered.params["__p1"], SqlValue::Int(3));
        assert_eq!(rendered.params["__p2"], SqlValue::Uuid(id));
    }
}
