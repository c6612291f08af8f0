//! Schema graph, structural diff and migration recording for ORM entities.
//!
//! `oxide-schema` keeps entity definitions and live database schemas
//! consistent:
//! - Entities and database catalogs both become a dialect-neutral
//!   [`SchemaAst`](graph::SchemaAst) graph of tables, columns, indexes and
//!   relationships
//! - Two graphs are compared by the [`SchemaDiffer`](diff::SchemaDiffer)
//! - Differences are classified as drift with a severity
//! - Migrations are recorded as typed operations and, optionally, applied
//!   through a dialect-specific SQL generator
//!
//! # Architecture
//!
//! - **Types** - Canonical column types and SQL type parsing/rendering
//! - **Graph** - `SchemaAst` with cycle detection, topological order,
//!   validation and relation-type inference
//! - **Builder** - Builds graphs from entity metadata or catalog records
//! - **Diff** / **Drift** - Structural comparison and drift classification
//! - **Migration** - Operation recorder, table builders, planner, SQL
//!   generators and the live/dry-run migration builder
//! - **Sync** - Entity-to-database, database-to-entity and bidirectional
//!   comparison with conflict detection
//!
//! # Example
//!
//! ```rust
//! use oxide_schema::prelude::*;
//!
//! let mut recorder = OperationRecorder::new();
//! recorder.create_table("users", |t| {
//!     t.id();
//!     t.string("email", 255).not_null().unique();
//!     t.timestamps();
//! });
//! recorder.create_index("users", &["email"], IndexOptions::new());
//!
//! let operations = recorder.operations();
//! assert_eq!(operations.len(), 2);
//! let sql = operation_to_sql(&SqliteGenerator::new(), &operations[1]);
//! assert_eq!(sql, vec!["CREATE INDEX \"idx_users_email\" ON \"users\" (\"email\")"]);
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the entity graph
//! oxide-schema graph entities.json
//!
//! # Compare entities with a database
//! oxide-schema --database-url sqlite:app.db drift entities.json
//!
//! # Apply the planned migration
//! oxide-schema plan entities.json --apply
//! ```

pub mod builder;
pub mod diff;
pub mod drift;
pub mod entity;
pub mod error;
pub mod graph;
pub mod introspect;
pub mod migration;
pub mod sqlite;
pub mod sync;
pub mod types;

pub use error::{Result, SchemaError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::{BuilderOptions, SchemaAstBuilder};
    pub use crate::diff::{DiffAction, DiffOptions, SchemaDiffResult, SchemaDiffer};
    pub use crate::drift::{DriftDetector, DriftOptions, DriftReport, DriftStatus, Severity};
    pub use crate::entity::{
        load_entities, EntityMeta, FieldMeta, FieldOptions, NamingStrategy, RelationMeta,
        SnakeCaseNamingStrategy,
    };
    pub use crate::error::{Result, SchemaError};
    pub use crate::graph::{
        ColumnNode, IndexNode, ReferentialAction, RelationType, RelationshipNode, SchemaAst,
        TableNode,
    };
    pub use crate::introspect::{SchemaIntrospector, StaticIntrospector, TableSchema};
    pub use crate::migration::{
        operation_to_sql, plan_migration, ExecutionMode, ForeignKeyOptions, IndexOptions,
        MigrationBuilder, MigrationOperation, OperationRecorder, PostgresGenerator,
        SchemaGenerator, SqlExecutor, SqliteGenerator,
    };
    pub use crate::sqlite::{SqliteExecutor, SqliteIntrospector};
    pub use crate::sync::{SchemaSync, SchemaSyncResult, SyncDirection, SyncOptions};
    pub use crate::types::{CanonicalType, DefaultValue, Dialect, HostType, TypeCategory};
}
