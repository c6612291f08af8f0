//! Migration builder: records operations and optionally applies them.

use tracing::{debug, info};

use crate::error::Result;

use super::generator::{operation_to_sql, SchemaGenerator, SqlExecutor};
use super::operation::{ColumnDefinition, MigrationOperation};
use super::recorder::{
    alter_operations, foreign_key_operation, index_operation, table_operation, OperationRecorder,
};
use super::table_builder::{AlterTableBuilder, ForeignKeyOptions, IndexOptions, TableBuilder};

/// How a [`MigrationBuilder`] treats recorded operations.
pub enum ExecutionMode {
    /// Record only. Used for dry runs and for writing migration files.
    Record,
    /// Record, then translate and execute each operation immediately.
    Live {
        /// Translates operations to SQL.
        generator: Box<dyn SchemaGenerator>,
        /// Runs the generated SQL.
        executor: Box<dyn SqlExecutor>,
    },
}

impl std::fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record => f.write_str("Record"),
            Self::Live { generator, .. } => f
                .debug_struct("Live")
                .field("generator", &generator.name())
                .finish_non_exhaustive(),
        }
    }
}

/// Records migration operations and, in live mode, executes them in
/// recording order.
///
/// A failing statement stops execution and is returned to the caller;
/// earlier statements stay applied.
#[derive(Debug)]
pub struct MigrationBuilder {
    recorder: OperationRecorder,
    mode: ExecutionMode,
    executed: Vec<String>,
}

impl MigrationBuilder {
    /// Creates a builder with the given mode.
    #[must_use]
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            recorder: OperationRecorder::new(),
            mode,
            executed: Vec::new(),
        }
    }

    /// Record-only builder.
    #[must_use]
    pub fn dry_run() -> Self {
        Self::new(ExecutionMode::Record)
    }

    /// Builder that applies every operation.
    #[must_use]
    pub fn live(
        generator: impl SchemaGenerator + 'static,
        executor: impl SqlExecutor + 'static,
    ) -> Self {
        Self::new(ExecutionMode::Live {
            generator: Box::new(generator),
            executor: Box::new(executor),
        })
    }

    /// Builder from optional collaborators. Falls back to record-only when
    /// `dry_run` is set or either collaborator is missing.
    #[must_use]
    pub fn from_parts(
        generator: Option<Box<dyn SchemaGenerator>>,
        executor: Option<Box<dyn SqlExecutor>>,
        dry_run: bool,
    ) -> Self {
        match (generator, executor) {
            (Some(generator), Some(executor)) if !dry_run => {
                Self::new(ExecutionMode::Live {
                    generator,
                    executor,
                })
            }
            _ => Self::dry_run(),
        }
    }

    /// Returns `true` if operations are executed.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self.mode, ExecutionMode::Live { .. })
    }

    /// Copy of the recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<MigrationOperation> {
        self.recorder.operations()
    }

    /// Statements executed so far.
    #[must_use]
    pub fn executed_sql(&self) -> &[String] {
        &self.executed
    }

    /// Consumes the builder, returning its recorder.
    #[must_use]
    pub fn into_recorder(self) -> OperationRecorder {
        self.recorder
    }

    /// Records an operation and, in live mode, executes it.
    ///
    /// # Errors
    ///
    /// Returns the executor's error for the first failing statement.
    pub async fn apply(&mut self, operation: MigrationOperation) -> Result<()> {
        let operation = self.recorder.record(operation).clone();

        let ExecutionMode::Live {
            generator,
            executor,
        } = &self.mode
        else {
            debug!(operation = %operation.description(), "Recorded operation");
            return Ok(());
        };

        let statements = operation_to_sql(generator.as_ref(), &operation);
        if statements.is_empty() {
            debug!(
                operation = %operation.description(),
                generator = generator.name(),
                "No SQL for operation, skipping"
            );
            return Ok(());
        }

        info!(operation = %operation.description(), "Applying operation");
        for sql in statements {
            debug!(sql = %sql, "Executing SQL");
            executor.run(&sql).await?;
            self.executed.push(sql);
        }
        Ok(())
    }

    /// Applies several operations in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing operation.
    pub async fn apply_all(
        &mut self,
        operations: impl IntoIterator<Item = MigrationOperation>,
    ) -> Result<()> {
        for operation in operations {
            self.apply(operation).await?;
        }
        Ok(())
    }

    /// Creates a table built by `build`.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn create_table(
        &mut self,
        name: impl Into<String>,
        build: impl FnOnce(&mut TableBuilder),
    ) -> Result<()> {
        self.apply(table_operation(name, build)).await
    }

    /// Drops a table.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn drop_table(&mut self, name: impl Into<String>) -> Result<()> {
        self.apply(MigrationOperation::drop_table(name)).await
    }

    /// Renames a table.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn rename_table(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<()> {
        self.apply(MigrationOperation::rename_table(from, to)).await
    }

    /// Applies the alterations made in `build`, one operation per call.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn alter_table(
        &mut self,
        name: impl Into<String>,
        build: impl FnOnce(&mut AlterTableBuilder),
    ) -> Result<()> {
        self.apply_all(alter_operations(name, build)).await
    }

    /// Adds a column.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn add_column(
        &mut self,
        table: impl Into<String>,
        column: ColumnDefinition,
    ) -> Result<()> {
        self.apply(MigrationOperation::add_column(table, column)).await
    }

    /// Drops a column.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn drop_column(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Result<()> {
        self.apply(MigrationOperation::drop_column(table, column)).await
    }

    /// Renames a column.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn rename_column(
        &mut self,
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<()> {
        self.apply(MigrationOperation::rename_column(table, from, to))
            .await
    }

    /// Changes a column.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn alter_column(
        &mut self,
        table: impl Into<String>,
        column: ColumnDefinition,
    ) -> Result<()> {
        self.apply(MigrationOperation::alter_column(table, column)).await
    }

    /// Creates an index.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn create_index(
        &mut self,
        table: &str,
        columns: &[&str],
        options: IndexOptions,
    ) -> Result<()> {
        self.apply(index_operation(table, columns, options)).await
    }

    /// Drops an index.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn drop_index(
        &mut self,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<()> {
        self.apply(MigrationOperation::drop_index(table, name)).await
    }

    /// Adds a foreign key.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn add_foreign_key(
        &mut self,
        table: &str,
        columns: &[&str],
        referenced_table: &str,
        referenced_columns: &[&str],
        options: ForeignKeyOptions,
    ) -> Result<()> {
        self.apply(foreign_key_operation(
            table,
            columns,
            referenced_table,
            referenced_columns,
            options,
        ))
        .await
    }

    /// Drops a foreign key.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn drop_foreign_key(
        &mut self,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<()> {
        self.apply(MigrationOperation::drop_foreign_key(table, name))
            .await
    }

    /// Records raw SQL and, in live mode, runs it verbatim.
    ///
    /// # Errors
    ///
    /// Propagates execution errors.
    pub async fn raw(&mut self, sql: impl Into<String>) -> Result<()> {
        self.apply(MigrationOperation::raw(sql)).await
    }
}
