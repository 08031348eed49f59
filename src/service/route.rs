//! Resolve a resource URI against the schema: target table, item id, parent scope, notification URI.

use crate::config::ProviderConfig;
use crate::error::AppError;
use crate::schema::SchemaAnalyzer;
use crate::sql::quote_ident;
use crate::uri::{ParentBinding, ResourceUri};
use regex::Regex;
use std::sync::OnceLock;

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
}

/// Where a request lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTarget {
    /// Table (or view) name as declared in the schema.
    pub table: String,
    pub item_id: Option<String>,
    pub parent: Option<ParentBinding>,
    pub uri: ResourceUri,
    /// Containing collection, views mapped to their base table.
    pub notification_uri: ResourceUri,
}

impl RouteTarget {
    pub fn resolve(uri: &ResourceUri, schema: &SchemaAnalyzer, config: &ProviderConfig) -> Result<Self, AppError> {
        let path = &uri.path;
        let segment = path
            .item_dir_id()
            .ok_or_else(|| AppError::MalformedPath("path names no table".into()))?;
        let table = schema.require(segment)?;

        let parent = path.parent_binding();
        if let Some(p) = &parent {
            if !identifier().is_match(&p.parent_column_name) {
                return Err(AppError::MalformedPath(format!(
                    "'{}' is not a valid parent name",
                    p.parent_column_name
                )));
            }
        }

        let base = config
            .base_table_of(&table.name)
            .or_else(|| table.base_table());
        let collection = path.collection();
        let notify_path = match base {
            Some(base) => collection.with_terminal_table(base),
            None => collection,
        };

        Ok(RouteTarget {
            table: table.name.clone(),
            item_id: path.item_id().map(String::from),
            parent,
            uri: uri.clone(),
            notification_uri: uri.with_path(notify_path),
        })
    }

    /// Scoping predicates: `_id=<id>` (bare) for an item, `<parent>_id='<id>'` (quoted) for a parent scope.
    /// With `qualifier`, each column is prefixed by the quoted qualifier.
    pub fn scoping_predicates(&self, qualifier: Option<&str>) -> Vec<String> {
        let prefix = qualifier.map(|q| format!("{}.", quote_ident(q))).unwrap_or_default();
        let mut out = Vec::new();
        if let Some(id) = &self.item_id {
            out.push(format!("{}_id={}", prefix, id));
        }
        if let Some(p) = &self.parent {
            out.push(format!("{}{}_id='{}'", prefix, p.parent_column_name, p.parent_id));
        }
        out
    }

    /// URI of the collection this request addresses (trailing id removed).
    pub fn collection_uri(&self) -> ResourceUri {
        self.uri.with_path(self.uri.path.collection())
    }
}
