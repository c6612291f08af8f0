//! Append-only operation recorder.

use super::operation::{ColumnDefinition, MigrationOperation};
use super::table_builder::{
    owned, AlterTableBuilder, ForeignKeyOptions, IndexOptions, TableBuilder,
};

/// Records migration operations without executing them.
///
/// Operations are kept in call order and never reordered or removed.
#[derive(Debug, Clone, Default)]
pub struct OperationRecorder {
    operations: Vec<MigrationOperation>,
}

impl OperationRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation and returns it.
    pub fn record(&mut self, operation: MigrationOperation) -> &MigrationOperation {
        self.operations.push(operation);
        &self.operations[self.operations.len() - 1]
    }

    /// Appends several operations.
    pub fn record_all(&mut self, operations: impl IntoIterator<Item = MigrationOperation>) {
        self.operations.extend(operations);
    }

    /// Copy of the recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<MigrationOperation> {
        self.operations.clone()
    }

    /// Number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Consumes the recorder.
    #[must_use]
    pub fn into_operations(self) -> Vec<MigrationOperation> {
        self.operations
    }

    /// Records a CREATE TABLE built by `build`.
    pub fn create_table(
        &mut self,
        name: impl Into<String>,
        build: impl FnOnce(&mut TableBuilder),
    ) -> &MigrationOperation {
        self.record(table_operation(name, build))
    }

    /// Records a DROP TABLE.
    pub fn drop_table(&mut self, name: impl Into<String>) -> &MigrationOperation {
        self.record(MigrationOperation::drop_table(name))
    }

    /// Records a table rename.
    pub fn rename_table(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> &MigrationOperation {
        self.record(MigrationOperation::rename_table(from, to))
    }

    /// Records the alterations made in `build`, one operation per call.
    pub fn alter_table(
        &mut self,
        name: impl Into<String>,
        build: impl FnOnce(&mut AlterTableBuilder),
    ) -> &[MigrationOperation] {
        let start = self.operations.len();
        self.record_all(alter_operations(name, build));
        &self.operations[start..]
    }

    /// Records a column addition.
    pub fn add_column(
        &mut self,
        table: impl Into<String>,
        column: ColumnDefinition,
    ) -> &MigrationOperation {
        self.record(MigrationOperation::add_column(table, column))
    }

    /// Records a column drop.
    pub fn drop_column(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> &MigrationOperation {
        self.record(MigrationOperation::drop_column(table, column))
    }

    /// Records a column rename.
    pub fn rename_column(
        &mut self,
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> &MigrationOperation {
        self.record(MigrationOperation::rename_column(table, from, to))
    }

    /// Records a column change.
    pub fn alter_column(
        &mut self,
        table: impl Into<String>,
        column: ColumnDefinition,
    ) -> &MigrationOperation {
        self.record(MigrationOperation::alter_column(table, column))
    }

    /// Records an index creation; unnamed indexes are called
    /// `idx_<table>_<columns>`.
    pub fn create_index(
        &mut self,
        table: &str,
        columns: &[&str],
        options: IndexOptions,
    ) -> &MigrationOperation {
        self.record(index_operation(table, columns, options))
    }

    /// Records an index drop.
    pub fn drop_index(
        &mut self,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> &MigrationOperation {
        self.record(MigrationOperation::drop_index(table, name))
    }

    /// Records a foreign key; unset actions default to `NO ACTION`.
    pub fn add_foreign_key(
        &mut self,
        table: &str,
        columns: &[&str],
        referenced_table: &str,
        referenced_columns: &[&str],
        options: ForeignKeyOptions,
    ) -> &MigrationOperation {
        self.record(foreign_key_operation(
            table,
            columns,
            referenced_table,
            referenced_columns,
            options,
        ))
    }

    /// Records a foreign key drop.
    pub fn drop_foreign_key(
        &mut self,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> &MigrationOperation {
        self.record(MigrationOperation::drop_foreign_key(table, name))
    }

    /// Records raw SQL.
    pub fn raw(&mut self, sql: impl Into<String>) -> &MigrationOperation {
        self.record(MigrationOperation::raw(sql))
    }
}

pub(crate) fn table_operation(
    name: impl Into<String>,
    build: impl FnOnce(&mut TableBuilder),
) -> MigrationOperation {
    let mut builder = TableBuilder::new(name);
    build(&mut builder);
    MigrationOperation::create_table(builder.build())
}

pub(crate) fn alter_operations(
    name: impl Into<String>,
    build: impl FnOnce(&mut AlterTableBuilder),
) -> Vec<MigrationOperation> {
    let mut builder = AlterTableBuilder::new(name);
    build(&mut builder);
    builder.into_operations()
}

pub(crate) fn index_operation(
    table: &str,
    columns: &[&str],
    options: IndexOptions,
) -> MigrationOperation {
    MigrationOperation::create_index(table, options.into_definition(table, owned(columns)))
}

pub(crate) fn foreign_key_operation(
    table: &str,
    columns: &[&str],
    referenced_table: &str,
    referenced_columns: &[&str],
    options: ForeignKeyOptions,
) -> MigrationOperation {
    let fk = options.into_definition(
        table,
        owned(columns),
        referenced_table,
        owned(referenced_columns),
    );
    MigrationOperation::add_foreign_key(table, fk)
}
