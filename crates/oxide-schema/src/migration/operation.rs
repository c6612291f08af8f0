//! Migration operations.
//!
//! Every schema change a migration can express is one variant of
//! [`MigrationOperation`]. Operations carry declarative definitions
//! ([`TableDefinition`], [`ColumnDefinition`]...) rather than graph nodes,
//! so they can be serialized into a migration file and replayed later.

use serde::{Deserialize, Serialize};

use crate::graph::{ColumnNode, IndexNode, ReferentialAction, RelationshipNode, TableNode};
use crate::types::{CanonicalType, DefaultValue};

/// Declarative column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub column_type: CanonicalType,
    /// Whether the column accepts NULL.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Inline primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Auto-incrementing.
    #[serde(default)]
    pub auto_increment: bool,
    /// UNIQUE constraint.
    #[serde(default)]
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl ColumnDefinition {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: CanonicalType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default: None,
            comment: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the column as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }
}

impl From<&ColumnNode> for ColumnDefinition {
    fn from(column: &ColumnNode) -> Self {
        Self {
            name: column.name.clone(),
            column_type: column.column_type.clone(),
            nullable: column.nullable,
            primary_key: column.is_primary_key,
            auto_increment: column.is_auto_increment,
            unique: column.is_unique,
            default: column.default_value.clone(),
            comment: column.comment.clone(),
        }
    }
}

/// Declarative index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    /// Index name.
    pub name: String,
    /// Indexed columns.
    pub columns: Vec<String>,
    /// UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Index method.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Partial index predicate.
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
}

impl From<&IndexNode> for IndexDefinition {
    fn from(index: &IndexNode) -> Self {
        Self {
            name: index.name.clone(),
            columns: index.columns.clone(),
            unique: index.unique,
            kind: index.kind.clone(),
            where_clause: index.where_clause.clone(),
        }
    }
}

/// Named UNIQUE constraint over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Constrained columns.
    pub columns: Vec<String>,
}

/// Declarative foreign key definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDefinition {
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_columns: Vec<String>,
    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: ReferentialAction,
    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: ReferentialAction,
}

impl From<&RelationshipNode> for ForeignKeyDefinition {
    fn from(rel: &RelationshipNode) -> Self {
        Self {
            name: rel.name.clone(),
            columns: rel.from.columns.clone(),
            referenced_table: rel.to.table.clone(),
            referenced_columns: rel.to.columns.clone(),
            on_delete: rel.effective_on_delete(),
            on_update: rel.effective_on_update(),
        }
    }
}

/// Declarative table definition, as produced by
/// [`TableBuilder`](super::TableBuilder).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Primary key columns.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Indexes created together with the table.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    /// Table-level UNIQUE constraints.
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Foreign keys declared inline.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Emit `IF NOT EXISTS`.
    #[serde(default)]
    pub if_not_exists: bool,
}

impl TableDefinition {
    /// Creates an empty definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            comment: None,
            if_not_exists: false,
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl From<&TableNode> for TableDefinition {
    /// Snapshot of a table node. Foreign keys live on the graph, not on
    /// the node, so they are left empty.
    fn from(table: &TableNode) -> Self {
        let mut columns: Vec<ColumnDefinition> =
            table.columns().iter().map(ColumnDefinition::from).collect();
        if table.primary_key.len() > 1 {
            for column in &mut columns {
                column.primary_key = false;
            }
        }
        Self {
            name: table.name.clone(),
            columns,
            primary_key: table.primary_key.clone(),
            indexes: table.indexes.iter().map(IndexDefinition::from).collect(),
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            comment: table.comment.clone(),
            if_not_exists: false,
        }
    }
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MigrationOperation {
    /// Create a table.
    CreateTable {
        /// Table definition.
        table: TableDefinition,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        table: String,
        /// Emit `IF EXISTS`.
        #[serde(default)]
        if_exists: bool,
        /// Dropped definition, kept for reversal.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        definition: Option<TableDefinition>,
    },

    /// Rename a table.
    RenameTable {
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },

    /// Add a column.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnDefinition,
    },

    /// Drop a column.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Dropped definition, kept for reversal.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        definition: Option<ColumnDefinition>,
    },

    /// Rename a column.
    RenameColumn {
        /// Table name.
        table: String,
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },

    /// Change a column to a new definition.
    AlterColumn {
        /// Table name.
        table: String,
        /// Target definition.
        column: ColumnDefinition,
        /// Definition before the change, kept for reversal.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous: Option<ColumnDefinition>,
    },

    /// Create an index.
    CreateIndex {
        /// Table name.
        table: String,
        /// Index definition.
        index: IndexDefinition,
    },

    /// Drop an index.
    DropIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
        /// Dropped definition, kept for reversal.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        definition: Option<IndexDefinition>,
    },

    /// Add a foreign key constraint.
    AddForeignKey {
        /// Table name.
        table: String,
        /// Foreign key definition.
        foreign_key: ForeignKeyDefinition,
    },

    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
        /// Dropped definition, kept for reversal.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        definition: Option<ForeignKeyDefinition>,
    },

    /// Raw SQL, executed verbatim.
    Raw {
        /// SQL text.
        sql: String,
    },
}

impl MigrationOperation {
    // Convenience constructors

    /// Creates a CreateTable operation.
    #[must_use]
    pub const fn create_table(table: TableDefinition) -> Self {
        Self::CreateTable { table }
    }

    /// Creates a DropTable operation.
    #[must_use]
    pub fn drop_table(table: impl Into<String>) -> Self {
        Self::DropTable {
            table: table.into(),
            if_exists: false,
            definition: None,
        }
    }

    /// Creates a RenameTable operation.
    #[must_use]
    pub fn rename_table(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::RenameTable {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates an AddColumn operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnDefinition) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a DropColumn operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            column: column.into(),
            definition: None,
        }
    }

    /// Creates a RenameColumn operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::RenameColumn {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates an AlterColumn operation.
    #[must_use]
    pub fn alter_column(table: impl Into<String>, column: ColumnDefinition) -> Self {
        Self::AlterColumn {
            table: table.into(),
            column,
            previous: None,
        }
    }

    /// Creates a CreateIndex operation.
    #[must_use]
    pub fn create_index(table: impl Into<String>, index: IndexDefinition) -> Self {
        Self::CreateIndex {
            table: table.into(),
            index,
        }
    }

    /// Creates a DropIndex operation.
    #[must_use]
    pub fn drop_index(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropIndex {
            table: table.into(),
            name: name.into(),
            definition: None,
        }
    }

    /// Creates an AddForeignKey operation.
    #[must_use]
    pub fn add_foreign_key(table: impl Into<String>, foreign_key: ForeignKeyDefinition) -> Self {
        Self::AddForeignKey {
            table: table.into(),
            foreign_key,
        }
    }

    /// Creates a DropForeignKey operation.
    #[must_use]
    pub fn drop_foreign_key(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropForeignKey {
            table: table.into(),
            name: name.into(),
            definition: None,
        }
    }

    /// Creates a Raw operation.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw { sql: sql.into() }
    }

    /// Operation tag as serialized (`"createTable"`, `"raw"`...).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "createTable",
            Self::DropTable { .. } => "dropTable",
            Self::RenameTable { .. } => "renameTable",
            Self::AddColumn { .. } => "addColumn",
            Self::DropColumn { .. } => "dropColumn",
            Self::RenameColumn { .. } => "renameColumn",
            Self::AlterColumn { .. } => "alterColumn",
            Self::CreateIndex { .. } => "createIndex",
            Self::DropIndex { .. } => "dropIndex",
            Self::AddForeignKey { .. } => "addForeignKey",
            Self::DropForeignKey { .. } => "dropForeignKey",
            Self::Raw { .. } => "raw",
        }
    }

    /// Table the operation applies to. `None` for raw SQL.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table } => Some(&table.name),
            Self::RenameTable { from, .. } => Some(from),
            Self::DropTable { table, .. }
            | Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::AlterColumn { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. } => Some(table),
            Self::Raw { .. } => None,
        }
    }

    /// Returns `true` for operations that remove schema objects.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropTable { .. }
                | Self::DropColumn { .. }
                | Self::DropIndex { .. }
                | Self::DropForeignKey { .. }
        )
    }

    /// Returns the operation that undoes this one, if it can be derived.
    ///
    /// Drops need the dropped definition, alterations need the previous
    /// definition, and raw SQL is never reversible.
    #[must_use]
    pub fn reverse(&self) -> Option<Self> {
        match self {
            Self::CreateTable { table } => Some(Self::DropTable {
                table: table.name.clone(),
                if_exists: false,
                definition: Some(table.clone()),
            }),
            Self::DropTable { definition, .. } => definition
                .as_ref()
                .map(|table| Self::create_table(table.clone())),
            Self::RenameTable { from, to } => Some(Self::rename_table(to, from)),
            Self::AddColumn { table, column } => Some(Self::DropColumn {
                table: table.clone(),
                column: column.name.clone(),
                definition: Some(column.clone()),
            }),
            Self::DropColumn {
                table, definition, ..
            } => definition
                .as_ref()
                .map(|column| Self::add_column(table, column.clone())),
            Self::RenameColumn { table, from, to } => Some(Self::rename_column(table, to, from)),
            Self::AlterColumn {
                table,
                column,
                previous,
            } => previous.as_ref().map(|previous| Self::AlterColumn {
                table: table.clone(),
                column: previous.clone(),
                previous: Some(column.clone()),
            }),
            Self::CreateIndex { table, index } => Some(Self::DropIndex {
                table: table.clone(),
                name: index.name.clone(),
                definition: Some(index.clone()),
            }),
            Self::DropIndex {
                table, definition, ..
            } => definition
                .as_ref()
                .map(|index| Self::create_index(table, index.clone())),
            Self::AddForeignKey { table, foreign_key } => Some(Self::DropForeignKey {
                table: table.clone(),
                name: foreign_key.name.clone(),
                definition: Some(foreign_key.clone()),
            }),
            Self::DropForeignKey {
                table, definition, ..
            } => definition
                .as_ref()
                .map(|fk| Self::add_foreign_key(table, fk.clone())),
            Self::Raw { .. } => None,
        }
    }

    /// Returns `true` if [`MigrationOperation::reverse`] yields an inverse.
    #[must_use]
    pub fn is_reversible(&self) -> bool {
        self.reverse().is_some()
    }

    /// One-line human description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table {}", table.name),
            Self::DropTable { table, .. } => format!("Drop table {table}"),
            Self::RenameTable { from, to } => format!("Rename table {from} to {to}"),
            Self::AddColumn { table, column } => {
                format!("Add column {} to {table}", column.name)
            }
            Self::DropColumn { table, column, .. } => format!("Drop column {column} from {table}"),
            Self::RenameColumn { table, from, to } => {
                format!("Rename column {table}.{from} to {to}")
            }
            Self::AlterColumn { table, column, .. } => {
                format!("Alter column {table}.{}", column.name)
            }
            Self::CreateIndex { table, index } => {
                format!("Create index {} on {table}", index.name)
            }
            Self::DropIndex { table, name, .. } => format!("Drop index {name} on {table}"),
            Self::AddForeignKey { table, foreign_key } => {
                format!("Add foreign key {} on {table}", foreign_key.name)
            }
            Self::DropForeignKey { table, name, .. } => {
                format!("Drop foreign key {name} on {table}")
            }
            Self::Raw { sql } => {
                let preview: String = sql.chars().take(50).collect();
                if preview.len() < sql.len() {
                    format!("Run SQL: {preview}...")
                } else {
                    format!("Run SQL: {preview}")
                }
            }
        }
    }
}

/// Inverse of a list of operations, in reverse order.
///
/// Returns `None` if any operation cannot be reversed.
#[must_use]
pub fn reverse_operations(operations: &[MigrationOperation]) -> Option<Vec<MigrationOperation>> {
    operations.iter().rev().map(MigrationOperation::reverse).collect()
}
