//! Reads the live catalog once and answers table, column, relationship and constraint questions.

use crate::error::AppError;
use crate::schema::catalog::{CatalogKind, IndexOrigin};
use crate::schema::model::{Column, Constraint, ForeignLink, ProjectionMap, Table, TableConstraint};
use crate::store::DatabaseHandle;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::OnceLock;

/// Engine or framework bookkeeping tables, never routed.
const SYSTEM_TABLES: &[&str] = &["android_metadata", "_sqlx_migrations"];

fn view_source() -> &'static Regex {
    static VIEW_SOURCE: OnceLock<Regex> = OnceLock::new();
    VIEW_SOURCE.get_or_init(|| Regex::new(r#"(?is)\bFROM\s+["`\[]?([A-Za-z_][A-Za-z0-9_]*)"#).expect("view source pattern"))
}

fn is_system_table(name: &str, excluded: &[String]) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("sqlite_")
        || SYSTEM_TABLES.contains(&lower.as_str())
        || excluded.iter().any(|e| e.eq_ignore_ascii_case(name))
}

/// First table named after FROM in a view's DDL.
fn view_base_table(sql: &str) -> Option<String> {
    view_source()
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Immutable snapshot of the user schema. Safe to share across tasks.
#[derive(Clone, Debug)]
pub struct SchemaAnalyzer {
    tables: BTreeMap<String, Table>,
    engine_version: String,
}

impl SchemaAnalyzer {
    /// Introspect `db`, skipping system tables and `excluded`.
    pub async fn analyze(db: &dyn DatabaseHandle, excluded: &[String]) -> Result<Self, AppError> {
        let catalog = db.catalog().await?;
        let mut tables = Vec::new();
        for entry in catalog.into_iter().filter(|e| !is_system_table(&e.name, excluded)) {
            let meta = db.table_columns(&entry.name).await?;
            let columns = meta
                .iter()
                .map(|c| Column::new(&c.name, c.decl_type.as_deref()))
                .collect();
            let mut table = Table::new(&entry.name, columns);

            let mut pk: Vec<_> = meta.iter().filter(|c| c.pk_position > 0).collect();
            pk.sort_by_key(|c| c.pk_position);
            if !pk.is_empty() {
                table = table.with_constraint(TableConstraint::PrimaryKey {
                    columns: pk.into_iter().map(|c| c.name.clone()).collect(),
                });
            }

            match entry.kind {
                CatalogKind::View => {
                    let base = entry.sql.as_deref().and_then(view_base_table);
                    table = table.as_view_of(base.as_deref());
                }
                CatalogKind::Table => {
                    for idx in db.table_indexes(&entry.name).await? {
                        if idx.unique && idx.origin == IndexOrigin::UniqueConstraint {
                            table = table.with_constraint(TableConstraint::Unique(Constraint::new(idx.columns)));
                        }
                    }
                    for fk in db.table_foreign_keys(&entry.name).await? {
                        table = table.with_constraint(TableConstraint::ForeignKey(ForeignLink {
                            column: fk.from,
                            table: fk.table,
                            to_column: fk.to,
                            declared: true,
                        }));
                    }
                }
            }
            tables.push(table);
        }

        let engine_version = db.engine_version().await?;
        let analyzer = Self::from_tables(tables, engine_version);
        tracing::info!(
            tables = analyzer.table_names().len(),
            views = analyzer.view_names().len(),
            engine_version = %analyzer.engine_version,
            "schema analyzed"
        );
        Ok(analyzer)
    }

    /// Build from already-typed tables. Adds `<table>_id` links that the tables do not declare.
    pub fn from_tables(tables: Vec<Table>, engine_version: impl Into<String>) -> Self {
        let names: Vec<String> = tables
            .iter()
            .filter(|t| !t.is_view())
            .map(|t| t.name.clone())
            .collect();
        let mut by_name = BTreeMap::new();
        for mut table in tables {
            if !table.is_view() {
                let inferred = inferred_links(&table, &names);
                table
                    .constraints
                    .extend(inferred.into_iter().map(TableConstraint::ForeignKey));
            }
            by_name.insert(table.name.clone(), table);
        }
        SchemaAnalyzer {
            tables: by_name,
            engine_version: engine_version.into(),
        }
    }

    /// Lookup by name; exact spelling first, then ASCII case-insensitive.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).or_else(|| {
            self.tables
                .values()
                .find(|t| t.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn require(&self, name: &str) -> Result<&Table, AppError> {
        self.table(name)
            .ok_or_else(|| AppError::NotFound(format!("table '{}'", name)))
    }

    /// User-defined tables, views excluded.
    pub fn table_names(&self) -> BTreeSet<String> {
        self.tables
            .values()
            .filter(|t| !t.is_view())
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn view_names(&self) -> BTreeSet<String> {
        self.tables
            .values()
            .filter(|t| t.is_view())
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn columns(&self, table: &str) -> Result<&[Column], AppError> {
        Ok(&self.require(table)?.columns)
    }

    pub fn foreign_links(&self, table: &str) -> Vec<&ForeignLink> {
        self.table(table)
            .map(|t| t.foreign_links().collect())
            .unwrap_or_default()
    }

    /// Tables referenced from `table`, declared or by `<table>_id` naming. Empty for unknown tables.
    pub fn foreign_tables(&self, table: &str) -> BTreeSet<String> {
        self.foreign_links(table)
            .into_iter()
            .map(|l| l.table.clone())
            .collect()
    }

    /// Every column of both tables as `alias_col -> alias.col AS alias_col`.
    pub fn projection_map(&self, table_a: &str, table_b: &str) -> Result<ProjectionMap, AppError> {
        let mut map = ProjectionMap::new();
        for name in [table_a, table_b] {
            let table = self.require(name)?;
            for column in &table.columns {
                let alias = format!("{}_{}", table.name, column.name);
                let expr = format!("{}.{} AS {}", table.name, column.name, alias);
                map.insert(alias, expr);
            }
        }
        Ok(map)
    }

    /// Declared UNIQUE constraints. Empty for unknown tables.
    pub fn unique_constraints(&self, table: &str) -> HashSet<Constraint> {
        self.table(table)
            .map(|t| t.unique_constraints().cloned().collect())
            .unwrap_or_default()
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }
}

fn inferred_links(table: &Table, names: &[String]) -> Vec<ForeignLink> {
    let mut links = Vec::new();
    for column in &table.columns {
        let lower = column.name.to_ascii_lowercase();
        let Some(prefix) = lower.strip_suffix("_id") else {
            continue;
        };
        let Some(target) = names.iter().find(|n| n.eq_ignore_ascii_case(prefix)) else {
            continue;
        };
        let already = table
            .foreign_links()
            .any(|l| l.column.eq_ignore_ascii_case(&column.name));
        if !already {
            links.push(ForeignLink {
                column: column.name.clone(),
                table: target.clone(),
                to_column: None,
                declared: false,
            });
        }
    }
    links
}
