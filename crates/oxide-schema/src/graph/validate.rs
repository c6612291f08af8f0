//! Soft integrity checks.

use std::collections::HashSet;

use serde::Serialize;

use super::SchemaAst;

/// A graph-integrity problem found by [`SchemaAst::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationError {
    /// A relationship points at a table that is not in the graph.
    #[error("Relationship '{relationship}' references missing table '{table}'")]
    MissingFkTarget {
        /// Relationship name.
        relationship: String,
        /// Missing target table.
        table: String,
    },

    /// Tables that depend on each other in a loop.
    #[error("Circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency {
        /// Tables on the cycle, in traversal order.
        cycle: Vec<String>,
    },

    /// Two indexes of one table share a name.
    #[error("Duplicate index '{index}' on table '{table}'")]
    DuplicateIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },
}

impl ValidationError {
    /// Short machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingFkTarget { .. } => "missing_fk_target",
            Self::CircularDependency { .. } => "circular_dependency",
            Self::DuplicateIndex { .. } => "duplicate_index",
        }
    }
}

impl SchemaAst {
    /// Checks graph integrity without failing.
    ///
    /// Reports dangling relationship targets, one error per dependency
    /// cycle, and index names repeated within a table.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for rel in self.relationships() {
            if !self.has_table(&rel.to.table) {
                errors.push(ValidationError::MissingFkTarget {
                    relationship: rel.name.clone(),
                    table: rel.to.table.clone(),
                });
            }
        }

        errors.extend(
            self.detect_circular_dependencies()
                .into_iter()
                .map(|cycle| ValidationError::CircularDependency { cycle }),
        );

        for table in self.tables() {
            let mut seen = HashSet::new();
            let mut reported = HashSet::new();
            for index in &table.indexes {
                if !seen.insert(index.name.as_str()) && reported.insert(index.name.as_str()) {
                    errors.push(ValidationError::DuplicateIndex {
                        table: table.name.clone(),
                        index: index.name.clone(),
                    });
                }
            }
        }

        errors
    }

    /// Returns `true` if [`SchemaAst::validate`] reports nothing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{blog, fk};
    use super::super::IndexNode;
    use super::*;

    #[test]
    fn test_valid_graph() {
        assert!(blog().validate().is_empty());
        assert!(blog().is_valid());
    }

    #[test]
    fn test_missing_fk_target() {
        let mut schema = blog();
        schema
            .add_relationship(fk("fk_posts_title", "posts", "title", "titles", "id"))
            .unwrap();
        let errors = schema.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), "missing_fk_target");
        assert_eq!(
            errors[0].to_string(),
            "Relationship 'fk_posts_title' references missing table 'titles'"
        );
    }

    #[test]
    fn test_cycle_reported() {
        let mut schema = blog();
        schema
            .add_relationship(fk("fk_users_email", "users", "email", "comments", "id"))
            .unwrap();
        let errors = schema.validate();
        assert!(errors.iter().any(|e| e.kind() == "circular_dependency"));
    }

    #[test]
    fn test_duplicate_index_reported_once() {
        let mut schema = blog();
        for _ in 0..2 {
            schema
                .add_index("users", IndexNode::new("idx_users_email", vec!["email".into()]))
                .unwrap();
        }
        let errors = schema.validate();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicateIndex {
                table: "users".to_string(),
                index: "idx_users_email".to_string(),
            }]
        );
    }

    #[test]
    fn test_same_index_name_on_different_tables_is_fine() {
        let mut schema = blog();
        schema
            .add_index("posts", IndexNode::new("idx_users_email", vec!["title".into()]))
            .unwrap();
        assert!(schema.is_valid());
    }
}
