//! Error types for the schema engine.

/// Errors that can occur while building, comparing or applying schemas.
///
/// Graph-integrity problems (dangling foreign keys, cycles, duplicate
/// index names) are not reported through this type; see
/// [`ValidationError`](crate::graph::ValidationError).
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A SQL type string could not be parsed.
    #[error("Invalid SQL type '{input}': {reason}")]
    InvalidType {
        /// The offending type string.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A table with the same name is already part of the graph.
    #[error("Table '{0}' already exists in the schema")]
    DuplicateTable(String),

    /// A referenced table is not part of the graph.
    #[error("Table '{0}' does not exist in the schema")]
    UnknownTable(String),

    /// A referenced column is not part of its table.
    #[error("Column '{column}' does not exist in table '{table}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column with the same name already exists in the table.
    #[error("Column '{column}' already exists in table '{table}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A relationship with the same name is already part of the graph.
    #[error("Relationship '{0}' already exists in the schema")]
    DuplicateRelationship(String),

    /// Database error raised by a collaborator.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (reading entity definition files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The introspector returned data that cannot be turned into a graph.
    #[error("Introspection failed: {0}")]
    Introspection(String),

    /// A migration statement was rejected by the executor.
    #[error("Execution failed: {0}")]
    Execution(String),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
