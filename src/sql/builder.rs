//! Builds SELECT, INSERT, UPDATE, DELETE text with positional parameters.

use crate::error::AppError;
use crate::schema::ProjectionMap;
use crate::store::{Selection, Values};
use serde_json::Value;

/// Quote identifier (safe: names come from the analyzed schema or the payload keys).
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) {
        self.params.push(v);
    }

    fn push_args(&mut self, args: &[String]) {
        for a in args {
            self.push_param(Value::String(a.clone()));
        }
    }
}

/// `LEFT OUTER JOIN <table> ON <source>.<column>=<table>.<foreign_column>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    pub column: String,
    pub foreign_column: String,
}

/// A SELECT under construction: source table and joins, scoping, caller selection and clause fragments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub joins: Vec<Join>,
    pub distinct: bool,
    /// Caller projection; None selects everything.
    pub projection: Option<Vec<String>>,
    pub projection_map: Option<ProjectionMap>,
    /// Scoping predicates, AND-ed together.
    pub where_parts: Vec<String>,
    pub selection: Selection,
    pub group_by: Option<String>,
    pub having: Option<String>,
    pub sort_order: Option<String>,
    pub limit: Option<String>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        SelectQuery {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn append_where(&mut self, predicate: impl Into<String>) {
        self.where_parts.push(predicate.into());
    }

    /// Source table and joins with every identifier quoted.
    pub fn from_clause(&self) -> String {
        let source = quote_ident(&self.table);
        let mut out = source.clone();
        for j in &self.joins {
            let foreign = quote_ident(&j.table);
            out.push_str(&format!(
                " LEFT OUTER JOIN {f} ON {s}.{c}={f}.{k}",
                f = foreign,
                s = source,
                c = quote_ident(&j.column),
                k = quote_ident(&j.foreign_column)
            ));
        }
        out
    }

    fn column_list(&self) -> String {
        match (&self.projection, &self.projection_map) {
            (None, None) => "*".to_string(),
            (None, Some(map)) => map.values().cloned().collect::<Vec<_>>().join(", "),
            (Some(cols), map) => cols
                .iter()
                .map(|c| {
                    map.as_ref()
                        .and_then(|m| m.get(c))
                        .cloned()
                        .unwrap_or_else(|| c.clone())
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn to_sql(&self) -> QueryBuf {
        let mut q = QueryBuf::new();
        let scoped = self.selection.scoped(&self.where_parts);
        let where_clause = scoped
            .clause
            .map(|c| format!(" WHERE {}", c))
            .unwrap_or_default();
        q.push_args(&scoped.args);

        let clause = |kw: &str, v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| format!(" {} {}", kw, s))
                .unwrap_or_default()
        };
        q.sql = format!(
            "SELECT {}{} FROM {}{}{}{}{}{}",
            if self.distinct { "DISTINCT " } else { "" },
            self.column_list(),
            self.from_clause(),
            where_clause,
            clause("GROUP BY", &self.group_by),
            clause("HAVING", &self.having),
            clause("ORDER BY", &self.sort_order),
            clause("LIMIT", &self.limit),
        );
        q
    }
}

/// INSERT one row. No values inserts a row of defaults.
pub fn insert(table: &str, values: &Values) -> QueryBuf {
    let mut q = QueryBuf::new();
    if values.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
        return q;
    }
    let mut cols = Vec::with_capacity(values.len());
    for (k, v) in values {
        cols.push(quote_ident(k));
        q.push_param(v.clone());
    }
    let placeholders = vec!["?"; cols.len()].join(", ");
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        cols.join(", "),
        placeholders
    );
    q
}

/// UPDATE rows matching `selection`. Values are bound before selection args.
pub fn update(table: &str, values: &Values, selection: &Selection) -> Result<QueryBuf, AppError> {
    if values.is_empty() {
        return Err(AppError::BadRequest("update requires at least one value".into()));
    }
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(values.len());
    for (k, v) in values {
        sets.push(format!("{} = ?", quote_ident(k)));
        q.push_param(v.clone());
    }
    q.push_args(&selection.args);
    let where_clause = selection
        .clause
        .as_deref()
        .map(|c| format!(" WHERE {}", c))
        .unwrap_or_default();
    q.sql = format!("UPDATE {} SET {}{}", quote_ident(table), sets.join(", "), where_clause);
    Ok(q)
}

/// DELETE rows matching `selection`; all rows when it is empty.
pub fn delete(table: &str, selection: &Selection) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_args(&selection.args);
    let where_clause = selection
        .clause
        .as_deref()
        .map(|c| format!(" WHERE {}", c))
        .unwrap_or_default();
    q.sql = format!("DELETE FROM {}{}", quote_ident(table), where_clause);
    q
}
