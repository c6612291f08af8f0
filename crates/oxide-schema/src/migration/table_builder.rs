//! Fluent builders for table definitions and table alterations.

use crate::graph::ReferentialAction;
use crate::types::{CanonicalType, DefaultValue, TypeCategory, TypeSize, DEFAULT_STRING_LENGTH};

use super::operation::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, MigrationOperation, TableDefinition,
    UniqueConstraint,
};

fn default_name(prefix: &str, table: &str, columns: &[String]) -> String {
    format!("{prefix}_{table}_{}", columns.join("_"))
}

pub(crate) fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| (*c).to_string()).collect()
}

// ================================================================
// Options
// ================================================================

/// Options for creating an index.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Explicit name. Defaults to `idx_<table>_<columns>`.
    pub name: Option<String>,
    /// UNIQUE index.
    pub unique: bool,
    /// Index method.
    pub kind: Option<String>,
    /// Partial index predicate.
    pub where_clause: Option<String>,
}

impl IndexOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index method.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets a partial index predicate.
    #[must_use]
    pub fn with_where(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause = Some(predicate.into());
        self
    }

    pub(crate) fn into_definition(self, table: &str, columns: Vec<String>) -> IndexDefinition {
        IndexDefinition {
            name: self
                .name
                .unwrap_or_else(|| default_name("idx", table, &columns)),
            columns,
            unique: self.unique,
            kind: self.kind,
            where_clause: self.where_clause,
        }
    }
}

/// Options for creating a foreign key.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyOptions {
    /// Explicit name. Defaults to `fk_<table>_<columns>`.
    pub name: Option<String>,
    /// ON DELETE action, `NO ACTION` when unset.
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action, `NO ACTION` when unset.
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeyOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub(crate) fn into_definition(
        self,
        table: &str,
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> ForeignKeyDefinition {
        ForeignKeyDefinition {
            name: self
                .name
                .unwrap_or_else(|| default_name("fk", table, &columns)),
            columns,
            referenced_table: referenced_table.into(),
            referenced_columns,
            on_delete: self.on_delete.unwrap_or_default(),
            on_update: self.on_update.unwrap_or_default(),
        }
    }
}

// ================================================================
// Column builder
// ================================================================

/// Modifies a column just added to a [`TableBuilder`].
#[derive(Debug)]
pub struct ColumnBuilder<'a> {
    column: &'a mut ColumnDefinition,
}

impl ColumnBuilder<'_> {
    /// Sets the column as NOT NULL.
    pub const fn not_null(&mut self) -> &mut Self {
        self.column.nullable = false;
        self
    }

    /// Sets the column as nullable.
    pub const fn nullable(&mut self) -> &mut Self {
        self.column.nullable = true;
        self
    }

    /// Adds a UNIQUE constraint.
    pub const fn unique(&mut self) -> &mut Self {
        self.column.unique = true;
        self
    }

    /// Marks the column as the primary key.
    pub const fn primary_key(&mut self) -> &mut Self {
        self.column.primary_key = true;
        self.column.nullable = false;
        self
    }

    /// Makes the column auto-increment.
    pub const fn auto_increment(&mut self) -> &mut Self {
        self.column.auto_increment = true;
        self
    }

    /// Adds the `UNSIGNED` modifier.
    pub const fn unsigned(&mut self) -> &mut Self {
        self.column.column_type.unsigned = true;
        self
    }

    /// Sets the default value.
    pub fn default(&mut self, value: DefaultValue) -> &mut Self {
        self.column.default = Some(value);
        self
    }

    /// Defaults the column to the current timestamp.
    pub fn default_now(&mut self) -> &mut Self {
        self.default(DefaultValue::expression("CURRENT_TIMESTAMP"))
    }

    /// Sets the column comment.
    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.column.comment = Some(comment.into());
        self
    }
}

// ================================================================
// Table builder
// ================================================================

/// Builds a [`TableDefinition`] for a CREATE TABLE operation.
///
/// ```
/// use oxide_schema::migration::TableBuilder;
///
/// let mut t = TableBuilder::new("users");
/// t.id();
/// t.string("email", 255).not_null().unique();
/// t.timestamps();
/// let table = t.build();
/// assert_eq!(table.columns.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct TableBuilder {
    table: TableDefinition,
}

impl TableBuilder {
    /// Starts a table definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: TableDefinition::new(name),
        }
    }

    /// Adds a column of any type.
    pub fn column(
        &mut self,
        name: impl Into<String>,
        column_type: CanonicalType,
    ) -> ColumnBuilder<'_> {
        let name = name.into();
        self.table.columns.retain(|c| c.name != name);
        self.table
            .columns
            .push(ColumnDefinition::new(name, column_type));
        let index = self.table.columns.len() - 1;
        ColumnBuilder {
            column: &mut self.table.columns[index],
        }
    }

    /// Auto-incrementing integer primary key named `id`.
    pub fn id(&mut self) -> ColumnBuilder<'_> {
        self.table.primary_key = vec!["id".to_string()];
        let mut column = self.column("id", CanonicalType::integer());
        column.primary_key().auto_increment();
        column
    }

    /// Auto-incrementing 64-bit primary key named `id`.
    pub fn big_id(&mut self) -> ColumnBuilder<'_> {
        self.table.primary_key = vec!["id".to_string()];
        let mut column = self.column("id", CanonicalType::big_integer());
        column.primary_key().auto_increment();
        column
    }

    /// 32-bit integer.
    pub fn integer(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::integer())
    }

    /// 8-bit integer.
    pub fn tiny_integer(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::integer().with_size(TypeSize::Tiny))
    }

    /// 16-bit integer.
    pub fn small_integer(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::integer().with_size(TypeSize::Small))
    }

    /// 64-bit integer.
    pub fn big_integer(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::big_integer())
    }

    /// Single-precision float.
    pub fn float(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::new(TypeCategory::Float))
    }

    /// Double-precision float.
    pub fn double(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(
            name,
            CanonicalType::new(TypeCategory::Float).with_size(TypeSize::Big),
        )
    }

    /// Exact decimal.
    pub fn decimal(
        &mut self,
        name: impl Into<String>,
        precision: u32,
        scale: u32,
    ) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::decimal(precision, scale))
    }

    /// Variable-length string.
    pub fn string(&mut self, name: impl Into<String>, length: u32) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::string(Some(length)))
    }

    /// Fixed-length string. Stored as a string with a length, like
    /// `VARCHAR`.
    pub fn char(&mut self, name: impl Into<String>, length: u32) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::string(Some(length)))
    }

    /// Unbounded text.
    pub fn text(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::text())
    }

    /// Boolean.
    pub fn boolean(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::new(TypeCategory::Boolean))
    }

    /// Calendar date.
    pub fn date(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::new(TypeCategory::Date))
    }

    /// Time of day.
    pub fn time(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::new(TypeCategory::Time))
    }

    /// Timestamp without time zone.
    pub fn timestamp(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::timestamp(false))
    }

    /// Timestamp with time zone.
    pub fn timestamp_tz(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::timestamp(true))
    }

    /// JSON document.
    pub fn json(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::new(TypeCategory::Json))
    }

    /// Binary JSON. Same canonical type as [`TableBuilder::json`]; the
    /// PostgreSQL rendering is already `JSONB`.
    pub fn jsonb(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.json(name)
    }

    /// UUID.
    pub fn uuid(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::new(TypeCategory::Uuid))
    }

    /// Binary blob.
    pub fn blob(&mut self, name: impl Into<String>) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::new(TypeCategory::Blob))
    }

    /// Embedding vector with a fixed dimension count.
    pub fn vector(&mut self, name: impl Into<String>, dimensions: u32) -> ColumnBuilder<'_> {
        self.column(name, CanonicalType::vector(dimensions))
    }

    /// `created_at` timestamp defaulting to now.
    pub fn created_at(&mut self) -> ColumnBuilder<'_> {
        let mut column = self.timestamp("created_at");
        column.not_null().default_now();
        column
    }

    /// `updated_at` timestamp defaulting to now.
    pub fn updated_at(&mut self) -> ColumnBuilder<'_> {
        let mut column = self.timestamp("updated_at");
        column.not_null().default_now();
        column
    }

    /// Both `created_at` and `updated_at`.
    pub fn timestamps(&mut self) -> &mut Self {
        self.created_at();
        self.updated_at();
        self
    }

    /// Composite primary key.
    pub fn primary(&mut self, columns: &[&str]) -> &mut Self {
        self.table.primary_key = owned(columns);
        for column in &mut self.table.columns {
            column.primary_key = false;
        }
        self
    }

    /// Adds an index; unnamed indexes are called `idx_<table>_<columns>`.
    pub fn index(&mut self, columns: &[&str], options: IndexOptions) -> &mut Self {
        let index = options.into_definition(&self.table.name, owned(columns));
        self.table.indexes.push(index);
        self
    }

    /// Adds a UNIQUE constraint named `uq_<table>_<columns>` unless a
    /// name is given.
    pub fn unique(&mut self, columns: &[&str], name: Option<&str>) -> &mut Self {
        let columns = owned(columns);
        let name = name.map_or_else(
            || default_name("uq", &self.table.name, &columns),
            str::to_string,
        );
        self.table
            .unique_constraints
            .push(UniqueConstraint { name, columns });
        self
    }

    /// Adds a foreign key; actions default to `NO ACTION`.
    pub fn foreign_key(
        &mut self,
        columns: &[&str],
        referenced_table: &str,
        referenced_columns: &[&str],
        options: ForeignKeyOptions,
    ) -> &mut Self {
        let fk = options.into_definition(
            &self.table.name,
            owned(columns),
            referenced_table,
            owned(referenced_columns),
        );
        self.table.foreign_keys.push(fk);
        self
    }

    /// Sets the table comment.
    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.table.comment = Some(comment.into());
        self
    }

    /// Emits `IF NOT EXISTS`.
    pub const fn if_not_exists(&mut self) -> &mut Self {
        self.table.if_not_exists = true;
        self
    }

    /// Finishes the definition.
    ///
    /// Columns marked as primary key become the key when none was set
    /// explicitly.
    #[must_use]
    pub fn build(mut self) -> TableDefinition {
        if self.table.primary_key.is_empty() {
            self.table.primary_key = self
                .table
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect();
        }
        self.table
    }
}

// ================================================================
// Alter table builder
// ================================================================

/// Records alterations of an existing table.
///
/// Every call becomes its own top-level operation, in call order.
#[derive(Debug, Clone)]
pub struct AlterTableBuilder {
    table: String,
    operations: Vec<MigrationOperation>,
}

impl AlterTableBuilder {
    /// Starts recording alterations of `table`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operations: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn add_column(&mut self, column: ColumnDefinition) -> &mut Self {
        self.operations
            .push(MigrationOperation::add_column(&self.table, column));
        self
    }

    /// Adds a nullable string column with the default length.
    pub fn add_string(&mut self, name: impl Into<String>) -> &mut Self {
        self.add_column(ColumnDefinition::new(
            name,
            CanonicalType::string(Some(DEFAULT_STRING_LENGTH)),
        ))
    }

    /// Drops a column.
    pub fn drop_column(&mut self, name: impl Into<String>) -> &mut Self {
        self.operations
            .push(MigrationOperation::drop_column(&self.table, name));
        self
    }

    /// Renames a column.
    pub fn rename_column(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.operations
            .push(MigrationOperation::rename_column(&self.table, from, to));
        self
    }

    /// Changes a column to a new definition.
    pub fn alter_column(&mut self, column: ColumnDefinition) -> &mut Self {
        self.operations
            .push(MigrationOperation::alter_column(&self.table, column));
        self
    }

    /// Creates an index.
    pub fn create_index(&mut self, columns: &[&str], options: IndexOptions) -> &mut Self {
        let index = options.into_definition(&self.table, owned(columns));
        self.operations
            .push(MigrationOperation::create_index(&self.table, index));
        self
    }

    /// Drops an index.
    pub fn drop_index(&mut self, name: impl Into<String>) -> &mut Self {
        self.operations
            .push(MigrationOperation::drop_index(&self.table, name));
        self
    }

    /// Adds a foreign key.
    pub fn add_foreign_key(
        &mut self,
        columns: &[&str],
        referenced_table: &str,
        referenced_columns: &[&str],
        options: ForeignKeyOptions,
    ) -> &mut Self {
        let fk = options.into_definition(
            &self.table,
            owned(columns),
            referenced_table,
            owned(referenced_columns),
        );
        self.operations
            .push(MigrationOperation::add_foreign_key(&self.table, fk));
        self
    }

    /// Drops a foreign key.
    pub fn drop_foreign_key(&mut self, name: impl Into<String>) -> &mut Self {
        self.operations
            .push(MigrationOperation::drop_foreign_key(&self.table, name));
        self
    }

    /// Recorded operations, in call order.
    #[must_use]
    pub fn into_operations(self) -> Vec<MigrationOperation> {
        self.operations
    }
}
