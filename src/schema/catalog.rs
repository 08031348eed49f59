//! Raw catalog rows as reported by the database, before typing.

/// Kind of a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogKind {
    Table,
    View,
}

/// One row of the schema catalog (e.g. `sqlite_master`).
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub name: String,
    pub kind: CatalogKind,
    /// Declaring DDL, when the engine keeps it.
    pub sql: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub name: String,
    /// Declared type; None when the column was declared without one.
    pub decl_type: Option<String>,
    pub not_null: bool,
    /// 1-based position in the primary key, 0 when not part of it.
    pub pk_position: u32,
}

/// How an index came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexOrigin {
    /// `CREATE INDEX`.
    Created,
    /// `UNIQUE` column or table constraint.
    UniqueConstraint,
    /// `PRIMARY KEY` constraint.
    PrimaryKey,
}

impl IndexOrigin {
    /// Map SQLite's `pragma_index_list.origin` code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "u" => IndexOrigin::UniqueConstraint,
            "pk" => IndexOrigin::PrimaryKey,
            _ => IndexOrigin::Created,
        }
    }
}

#[derive(Clone, Debug)]
pub struct IndexMeta {
    pub name: String,
    pub unique: bool,
    pub origin: IndexOrigin,
    /// Indexed columns in index order.
    pub columns: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ForeignKeyMeta {
    pub from: String,
    pub table: String,
    /// Referenced column; None when the declaration relies on the target's primary key.
    pub to: Option<String>,
}
