//! Migration recording, planning and execution.
//!
//! - [`OperationRecorder`] collects [`MigrationOperation`]s without side
//!   effects.
//! - [`MigrationBuilder`] records the same operations and, in live mode,
//!   translates each one through a [`SchemaGenerator`] and runs it on a
//!   [`SqlExecutor`] in recording order.
//! - [`plan_migration`] turns a [`SchemaDiffResult`](crate::diff::SchemaDiffResult)
//!   into an ordered operation list.

pub mod builder;
pub mod dialect;
pub mod generator;
pub mod operation;
pub mod plan;
pub mod recorder;
pub mod table_builder;

pub use builder::{ExecutionMode, MigrationBuilder};
pub use dialect::{PostgresGenerator, SqliteGenerator};
pub use generator::{operation_to_sql, ExecResult, SchemaGenerator, SqlExecutor};
pub use operation::{
    reverse_operations, ColumnDefinition, ForeignKeyDefinition, IndexDefinition,
    MigrationOperation, TableDefinition, UniqueConstraint,
};
pub use plan::plan_migration;
pub use recorder::OperationRecorder;
pub use table_builder::{
    AlterTableBuilder, ColumnBuilder, ForeignKeyOptions, IndexOptions, TableBuilder,
};
