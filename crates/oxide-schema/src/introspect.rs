//! Database introspection interface.
//!
//! An introspector reads the live catalog of a database and reports plain
//! [`TableSchema`] records. Turning those records into a [`SchemaAst`] is
//! shared by every backend, see
//! [`SchemaAstBuilder::from_table_schemas`](crate::builder::SchemaAstBuilder::from_table_schemas).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::builder::SchemaAstBuilder;
use crate::error::Result;
use crate::graph::SchemaAst;

/// A column as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Declared SQL type, as the catalog spells it.
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Auto-incrementing.
    pub auto_increment: bool,
    /// Single-column UNIQUE constraint.
    pub unique: bool,
    /// Default expression text.
    pub default: Option<String>,
    /// Column comment.
    pub comment: Option<String>,
}

impl ColumnSchema {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            ..<Self as Default>::default()
        }
    }

    /// Marks the column as primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }
}

/// An index as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// UNIQUE index.
    pub unique: bool,
    /// Index method, when the catalog reports one.
    pub kind: Option<String>,
    /// Partial index predicate.
    pub where_clause: Option<String>,
}

/// A foreign key as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Constraint name, if the catalog keeps one.
    pub name: Option<String>,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// ON DELETE action as spelled by the catalog.
    pub on_delete: Option<String>,
    /// ON UPDATE action as spelled by the catalog.
    pub on_update: Option<String>,
}

/// A table as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in catalog order.
    pub columns: Vec<ColumnSchema>,
    /// Secondary indexes.
    pub indexes: Vec<IndexSchema>,
    /// Foreign keys.
    pub foreign_keys: Vec<ForeignKeySchema>,
    /// Table comment.
    pub comment: Option<String>,
}

impl TableSchema {
    /// Creates an empty table record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            comment: None,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeySchema) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }
}

/// Reads the current schema of a database.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Names of all user tables.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Catalog record for one table, `None` if it does not exist.
    async fn table_schema(&self, name: &str) -> Result<Option<TableSchema>>;

    /// Returns `true` if the table exists.
    async fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.table_names().await?.iter().any(|t| t == name))
    }

    /// Builds a graph of the whole database.
    async fn introspect(&self) -> Result<SchemaAst> {
        let mut tables = Vec::new();
        for name in self.table_names().await? {
            if let Some(table) = self.table_schema(&name).await? {
                tables.push(table);
            }
        }
        SchemaAstBuilder::new().from_table_schemas(&tables)
    }
}

/// Introspector over a fixed list of table records.
///
/// Useful for tests and for comparing against a schema snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticIntrospector {
    tables: Vec<TableSchema>,
}

impl StaticIntrospector {
    /// Creates an introspector reporting the given tables.
    #[must_use]
    pub const fn new(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl SchemaIntrospector for StaticIntrospector {
    async fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn table_schema(&self, name: &str) -> Result<Option<TableSchema>> {
        Ok(self.tables.iter().find(|t| t.name == name).cloned())
    }
}
