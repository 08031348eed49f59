//! Turns a routed request into a [`SelectQuery`]: source tables, scoping, modifiers.

use crate::error::AppError;
use crate::schema::SchemaAnalyzer;
use crate::service::RouteTarget;
use crate::sql::{Join, SelectQuery};
use crate::store::Selection;
use regex::Regex;
use std::sync::OnceLock;

fn limit_shape() -> &'static Regex {
    static LIMIT_SHAPE: OnceLock<Regex> = OnceLock::new();
    LIMIT_SHAPE.get_or_init(|| Regex::new(r"^\s*\d+\s*(,\s*\d+\s*)?$").expect("limit pattern"))
}

/// Caller-side query inputs that are not part of the URI.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryRequest {
    pub projection: Option<Vec<String>>,
    pub selection: Selection,
    pub sort_order: Option<String>,
}

pub trait QueryBuilder: Send + Sync {
    fn build(
        &self,
        target: &RouteTarget,
        request: &QueryRequest,
        schema: &SchemaAnalyzer,
    ) -> Result<SelectQuery, AppError>;
}

/// Scopes to the addressed item or parent, joins `expand` targets and passes modifiers through.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScopedQueryBuilder;

impl QueryBuilder for ScopedQueryBuilder {
    fn build(
        &self,
        target: &RouteTarget,
        request: &QueryRequest,
        schema: &SchemaAnalyzer,
    ) -> Result<SelectQuery, AppError> {
        let params = &target.uri.params;
        let table = &target.table;
        let mut query = SelectQuery::new(table.as_str());

        for name in params.expand() {
            let links = schema.foreign_links(table);
            let Some(link) = links.iter().find(|l| l.table.eq_ignore_ascii_case(name)) else {
                tracing::warn!(table = %table, expand = %name, "expand target is not a foreign table; skipped");
                continue;
            };
            let foreign = schema.require(&link.table)?;
            if query.joins.iter().any(|j| j.table == foreign.name) {
                continue;
            }
            let key = link
                .to_column
                .clone()
                .unwrap_or_else(|| foreign.key_column().to_string());
            query.joins.push(Join {
                table: foreign.name.clone(),
                column: link.column.clone(),
                foreign_column: key,
            });
            let map = schema.projection_map(table, &foreign.name)?;
            query
                .projection_map
                .get_or_insert_with(Default::default)
                .extend(map);
        }

        let qualifier = if query.joins.is_empty() { None } else { Some(table.as_str()) };
        for predicate in target.scoping_predicates(qualifier) {
            query.append_where(predicate);
        }

        if let Some(limit) = params.limit() {
            if !limit_shape().is_match(limit) {
                return Err(AppError::BadRequest(format!("invalid limit '{}'", limit)));
            }
        }

        query.distinct = params.distinct();
        query.group_by = params.group_by().map(String::from);
        query.having = params.having().map(String::from);
        query.limit = params.limit().map(String::from);
        query.projection = request.projection.clone();
        query.selection = request.selection.clone();
        query.sort_order = request.sort_order.clone();
        Ok(query)
    }
}
