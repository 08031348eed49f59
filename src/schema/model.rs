//! Typed schema model built once by the analyzer.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// Qualified alias (`t_id`) to select expression (`t.id AS t_id`).
pub type ProjectionMap = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_: Option<&str>) -> Self {
        Column {
            name: name.into(),
            type_: type_.map(String::from),
        }
    }
}

/// Unique constraint over one or more columns. Equality ignores column order.
#[derive(Clone, Debug, Serialize)]
pub struct Constraint {
    pub columns: Vec<String>,
}

impl Constraint {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    fn column_set(&self) -> BTreeSet<&str> {
        self.columns.iter().map(String::as_str).collect()
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.column_set() == other.column_set()
    }
}

impl Eq for Constraint {}

impl Hash for Constraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.column_set().hash(state);
    }
}

/// A reference from one of our columns to another table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignLink {
    pub column: String,
    pub table: String,
    pub to_column: Option<String>,
    /// Declared in the DDL, as opposed to inferred from a `<table>_id` column name.
    pub declared: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableConstraint {
    PrimaryKey { columns: Vec<String> },
    ForeignKey(ForeignLink),
    Unique(Constraint),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableKind {
    Table,
    View { base_table: Option<String> },
}

#[derive(Clone, Debug)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub constraints: Vec<TableConstraint>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Table {
            name: name.into(),
            kind: TableKind::Table,
            columns,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn as_view_of(mut self, base_table: Option<&str>) -> Self {
        self.kind = TableKind::View {
            base_table: base_table.map(String::from),
        };
        self
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View { .. })
    }

    pub fn base_table(&self) -> Option<&str> {
        match &self.kind {
            TableKind::View { base_table } => base_table.as_deref(),
            TableKind::Table => None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&[String]> {
        self.constraints.iter().find_map(|c| match c {
            TableConstraint::PrimaryKey { columns } => Some(columns.as_slice()),
            _ => None,
        })
    }

    pub fn foreign_links(&self) -> impl Iterator<Item = &ForeignLink> {
        self.constraints.iter().filter_map(|c| match c {
            TableConstraint::ForeignKey(link) => Some(link),
            _ => None,
        })
    }

    pub fn unique_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter_map(|c| match c {
            TableConstraint::Unique(u) => Some(u),
            _ => None,
        })
    }

    /// Column other tables join against: single-column primary key, else `_id`, else `id`.
    pub fn key_column(&self) -> &str {
        if let Some([pk]) = self.primary_key() {
            return pk;
        }
        ["_id", "id"]
            .into_iter()
            .find_map(|k| self.column(k).map(|c| c.name.as_str()))
            .unwrap_or("_id")
    }
}
