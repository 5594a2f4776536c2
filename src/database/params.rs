//! Statement parameters and placeholder rewriting
//!
//! Callers write named `:name` tokens (or positional `?`) and the
//! statement is rewritten to the placeholder style of the target driver
//! before it is sent: `$1, $2, ...` for PostgreSQL, `?` elsewhere.

use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use crate::query_builder::SqlDialect;
use indexmap::IndexMap;

/// Values accompanying a statement
#[derive(Debug, Clone, Default)]
pub enum Params {
    #[default]
    None,
    /// Values for `?` placeholders, in order
    Positional(Vec<SqlValue>),
    /// Values for `:name` placeholders
    Named(IndexMap<String, SqlValue>),
}

impl Params {
    /// Start an empty named parameter set
    pub fn named() -> Self {
        Params::Named(IndexMap::new())
    }

    /// Add a named value; a leading `:` in the name is ignored
    pub fn bind<S: AsRef<str>, V: Into<SqlValue>>(self, name: S, value: V) -> Self {
        let name = name.as_ref().trim_start_matches(':').to_string();
        match self {
            Params::Named(mut map) => {
                map.insert(name, value.into());
                Params::Named(map)
            }
            _ => {
                let mut map = IndexMap::new();
                map.insert(name, value.into());
                Params::Named(map)
            }
        }
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(values) => values.is_empty(),
            Params::Named(map) => map.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::None => 0,
            Params::Positional(values) => values.len(),
            Params::Named(map) => map.len(),
        }
    }

    /// Give positional values the names of `names`, in order
    pub fn name_positional(self, names: &[&str]) -> Result<Params> {
        match self {
            Params::Positional(values) => {
                if values.len() != names.len() {
                    return Err(Error::invalid_input(format!(
                        "Expected {} parameter values, got {}",
                        names.len(),
                        values.len()
                    )));
                }
                Ok(Params::Named(
                    names
                        .iter()
                        .map(|name| name.to_string())
                        .zip(values)
                        .collect(),
                ))
            }
            other => Ok(other),
        }
    }

    /// Add builder-generated named values to the caller's parameters
    pub fn with_named(self, extra: IndexMap<String, SqlValue>) -> Result<Params> {
        if extra.is_empty() {
            return Ok(self);
        }
        match self {
            Params::None => Ok(Params::Named(extra)),
            Params::Named(mut map) => {
                map.extend(extra);
                Ok(Params::Named(map))
            }
            Params::Positional(values) if values.is_empty() => Ok(Params::Named(extra)),
            Params::Positional(_) => Err(Error::invalid_input(
                "Positional parameters cannot be combined with bound values",
            )),
        }
    }

    fn lookup(&self, name: &str) -> Option<&SqlValue> {
        match self {
            Params::Named(map) => map.get(name).or_else(|| map.get(&format!(":{}", name))),
            _ => None,
        }
    }
}

impl From<Vec<SqlValue>> for Params {
    fn from(values: Vec<SqlValue>) -> Self {
        Params::Positional(values)
    }
}

impl From<IndexMap<String, SqlValue>> for Params {
    fn from(map: IndexMap<String, SqlValue>) -> Self {
        Params::Named(map)
    }
}

/// Statement text in driver placeholder style, with values in bind order
#[derive(Debug, Clone)]
pub struct PreparedSql {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Rewrite placeholders for `dialect` and order the values to bind
///
/// Named tokens inside string literals, quoted identifiers and comments are
/// left alone, as are `::type` casts. A name used twice is bound twice.
pub fn prepare(sql: &str, params: Params, dialect: &dyn SqlDialect) -> Result<PreparedSql> {
    let named = matches!(params, Params::Named(_));
    let positional = matches!(params, Params::Positional(_));
    if !named && !(positional && dialect.placeholder(1) != "?") {
        let values = match params {
            Params::Positional(values) => values,
            _ => Vec::new(),
        };
        return Ok(PreparedSql {
            sql: sql.to_string(),
            values,
        });
    }

    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut values = Vec::new();
    let mut position = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                let end = skip_quoted(&chars, i, c, c == '\'' && dialect.backslash_escapes());
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = skip_line_comment(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = skip_block_comment(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if named && chars.get(i + 1).is_some_and(|&ch| ch.is_ascii_alphabetic() || ch == '_') => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = params.lookup(&name).cloned().ok_or_else(|| {
                    Error::database_query(format!("No value bound for parameter :{}", name))
                })?;
                position += 1;
                out.push_str(&dialect.placeholder(position));
                values.push(value);
                i = end;
            }
            '?' if positional => {
                position += 1;
                out.push_str(&dialect.placeholder(position));
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    if let Params::Positional(positional_values) = params {
        values = positional_values;
    }

    Ok(PreparedSql { sql: out, values })
}

/// Whether `keyword` appears as a whole word in the statement text itself
///
/// Matching is case-insensitive and ignores string literals, quoted
/// identifiers and comments.
pub fn has_keyword(sql: &str, keyword: &str, dialect: &dyn SqlDialect) -> bool {
    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                i = skip_quoted(&chars, i, c, c == '\'' && dialect.backslash_escapes());
            }
            '-' if chars.get(i + 1) == Some(&'-') => i = skip_line_comment(&chars, i),
            '/' if chars.get(i + 1) == Some(&'*') => i = skip_block_comment(&chars, i),
            c if c.is_alphanumeric() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word.eq_ignore_ascii_case(keyword) {
                    return true;
                }
            }
            _ => i += 1,
        }
    }
    false
}

// Index of the newline ending a `--` comment (or the end of input)
fn skip_line_comment(chars: &[char], start: usize) -> usize {
    chars[start..]
        .iter()
        .position(|&ch| ch == '\n')
        .map(|offset| start + offset)
        .unwrap_or(chars.len())
}

// Index just past the `*/` closing a block comment (or the end of input)
fn skip_block_comment(chars: &[char], start: usize) -> usize {
    let mut end = start + 2;
    while end < chars.len() && !(chars[end] == '*' && chars.get(end + 1) == Some(&'/')) {
        end += 1;
    }
    (end + 2).min(chars.len())
}

// Index just past the closing quote (or the end of input)
fn skip_quoted(chars: &[char], start: usize, quote: char, backslash_escapes: bool) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        if backslash_escapes && c == '\\' {
            i += 2;
            continue;
        }
        if c == quote {
            // Doubled quote is an escaped quote
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::DatabaseBackend;

    #[test]
    fn test_named_to_postgres() {
        let params = Params::named().bind("name", "x").bind(":id", 5);
        let prepared = prepare(
            "UPDATE t SET name = :name WHERE id = :id AND note != ':name' AND created::date = now()::date",
            params,
            DatabaseBackend::Postgres.dialect(),
        )
        .unwrap();

        assert_eq!(
            prepared.sql,
            "UPDATE t SET name = $1 WHERE id = $2 AND note != ':name' AND created::date = now()::date"
        );
        assert_eq!(prepared.values, vec![SqlValue::from("x"), SqlValue::from(5)]);
    }

    #[test]
    fn test_named_repeated_and_question_marks() {
        let params = Params::named().bind("v", 1);
        let prepared = prepare(
            "SELECT * FROM t WHERE a = :v OR b = :v -- :ignored\n",
            params,
            DatabaseBackend::SQLite.dialect(),
        )
        .unwrap();
        assert_eq!(prepared.sql, "SELECT * FROM t WHERE a = ? OR b = ? -- :ignored\n");
        assert_eq!(prepared.values.len(), 2);
    }

    #[test]
    fn test_positional_rewritten_only_for_postgres() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = '?'";
        let prepared = prepare(
            sql,
            Params::positional(vec![1, 2]),
            DatabaseBackend::Postgres.dialect(),
        )
        .unwrap();
        assert_eq!(prepared.sql, "SELECT * FROM t WHERE a = $1 AND b = '?'");

        let prepared = prepare(
            sql,
            Params::positional(vec![1]),
            DatabaseBackend::MySQL.dialect(),
        )
        .unwrap();
        assert_eq!(prepared.sql, sql);
        assert_eq!(prepared.values.len(), 1);
    }

    #[test]
    fn test_mysql_backslash_escapes() {
        let prepared = prepare(
            r"SELECT 'it\'s :not' AS a, :yes AS b",
            Params::named().bind("yes", 1),
            DatabaseBackend::MySQL.dialect(),
        )
        .unwrap();
        assert_eq!(prepared.sql, r"SELECT 'it\'s :not' AS a, ? AS b");
    }

    #[test]
    fn test_missing_value_is_query_error() {
        let err = prepare(
            "SELECT :missing",
            Params::named(),
            DatabaseBackend::SQLite.dialect(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DatabaseQuery(_)));
    }

    #[test]
    fn test_without_params_sql_is_untouched() {
        let sql = "INSERT INTO t (a) VALUES (:a)";
        let prepared = prepare(sql, Params::None, DatabaseBackend::Postgres.dialect()).unwrap();
        assert_eq!(prepared.sql, sql);
        assert!(prepared.values.is_empty());
    }

    #[test]
    fn test_name_positional_and_merge() {
        let params = Params::positional(vec!["2024-01-01"])
            .name_positional(&["created_at"])
            .unwrap();
        let mut extra = IndexMap::new();
        extra.insert("__p1".to_string(), SqlValue::from("x"));
        let merged = params.with_named(extra).unwrap();
        assert_eq!(merged.len(), 2);

        let mut extra = IndexMap::new();
        extra.insert("__p1".to_string(), SqlValue::from("x"));
        assert!(Params::positional(vec![1]).with_named(extra).is_err());
        assert!(Params::positional(vec![1, 2]).name_positional(&["a"]).is_err());
    }
}
