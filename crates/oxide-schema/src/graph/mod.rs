//! The schema graph.
//!
//! A [`SchemaAst`] is an arena of tables, each owning its columns and
//! indexes, plus a flat list of relationships between tables. Links are
//! stored by name on both sides and every mutating method updates both
//! sides together.
//!
//! Graphs are cheap, disposable values: they are built fresh from entity
//! metadata or from database introspection, compared, and thrown away.

mod algo;
mod json;
mod node;
mod validate;

pub use json::{ColumnJson, IndexJson, RelationshipJson, SchemaJson, TableJson};
pub use node::{
    ColumnNode, Endpoint, IndexNode, ReferentialAction, RelationType, RelationshipNode, TableNode,
};
pub use validate::ValidationError;

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SchemaError};

/// Node counts of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchemaStats {
    /// Number of tables.
    pub tables: usize,
    /// Number of columns across all tables.
    pub columns: usize,
    /// Number of indexes across all tables.
    pub indexes: usize,
    /// Number of relationships.
    pub relationships: usize,
}

/// Schema graph: tables, their columns and indexes, and relationships.
#[derive(Debug, Default, PartialEq)]
pub struct SchemaAst {
    tables: Vec<TableNode>,
    relationships: Vec<RelationshipNode>,
}

impl SchemaAst {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ================================================================
    // Tables
    // ================================================================

    /// Adds a table to the graph.
    ///
    /// Any relationship links the table carried are reset; relationships
    /// already in the graph that target this table are linked to it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateTable`] if the name is taken.
    pub fn add_table(&mut self, table: TableNode) -> Result<&mut TableNode> {
        if self.has_table(&table.name) {
            return Err(SchemaError::DuplicateTable(table.name));
        }
        let mut table = table.detached_with_indexes();
        let name = table.name.clone();
        for rel in self.relationships.iter().filter(|r| r.to.table == name) {
            table.incoming.push(rel.name.clone());
            for column in &rel.to.columns {
                if let Some(col) = table.column_mut(column) {
                    col.referenced_by.push(rel.name.clone());
                }
            }
        }
        debug!(table = %table.name, columns = table.columns().len(), "Added table");
        self.tables.push(table);
        let last = self.tables.len() - 1;
        Ok(&mut self.tables[last])
    }

    /// Removes a table together with every relationship that starts or
    /// ends at it. The table's indexes go with it.
    ///
    /// Returns `None`, leaving the graph untouched, if there is no such table.
    pub fn remove_table(&mut self, name: &str) -> Option<TableNode> {
        let position = self.tables.iter().position(|t| t.name == name)?;
        let doomed: Vec<String> = self
            .relationships
            .iter()
            .filter(|r| r.from.table == name || r.to.table == name)
            .map(|r| r.name.clone())
            .collect();
        for rel in &doomed {
            self.remove_relationship(rel);
        }
        debug!(table = %name, relationships = doomed.len(), "Removed table");
        Some(self.tables.remove(position))
    }

    /// Looks up a table.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Looks up a table for modification.
    ///
    /// Columns can be added through the returned node; relationship links
    /// must go through [`SchemaAst::add_relationship`].
    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableNode> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Returns `true` if the graph has a table with this name.
    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Tables in insertion order.
    #[must_use]
    pub fn tables(&self) -> &[TableNode] {
        &self.tables
    }

    /// Table names in insertion order.
    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    // ================================================================
    // Relationships
    // ================================================================

    /// Adds a relationship and links it to its endpoints.
    ///
    /// The target table does not have to exist yet; a dangling target is
    /// reported by [`SchemaAst::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateRelationship`] if the name is taken,
    /// [`SchemaError::UnknownTable`] if the source table is missing and
    /// [`SchemaError::UnknownColumn`] if a source column is missing.
    pub fn add_relationship(&mut self, relationship: RelationshipNode) -> Result<()> {
        if self.relationship(&relationship.name).is_some() {
            return Err(SchemaError::DuplicateRelationship(relationship.name));
        }
        let source = self
            .table(&relationship.from.table)
            .ok_or_else(|| SchemaError::UnknownTable(relationship.from.table.clone()))?;
        if let Some(missing) = relationship
            .from
            .columns
            .iter()
            .find(|c| !source.has_column(c))
        {
            return Err(SchemaError::UnknownColumn {
                table: relationship.from.table.clone(),
                column: missing.clone(),
            });
        }

        let name = relationship.name.clone();
        if let Some(source) = self.table_mut(&relationship.from.table) {
            source.outgoing.push(name.clone());
            for column in &relationship.from.columns {
                if let Some(col) = source.column_mut(column) {
                    col.references = Some(name.clone());
                }
            }
        }
        if let Some(target) = self.table_mut(&relationship.to.table) {
            target.incoming.push(name.clone());
            for column in &relationship.to.columns {
                if let Some(col) = target.column_mut(column) {
                    col.referenced_by.push(name.clone());
                }
            }
        }
        debug!(relationship = %name, path = %relationship.path(), "Added relationship");
        self.relationships.push(relationship);
        Ok(())
    }

    /// Removes a relationship and unlinks it from both endpoints.
    pub fn remove_relationship(&mut self, name: &str) -> Option<RelationshipNode> {
        let position = self.relationships.iter().position(|r| r.name == name)?;
        let rel = self.relationships.remove(position);
        if let Some(source) = self.table_mut(&rel.from.table) {
            source.outgoing.retain(|r| r != name);
            for column in &rel.from.columns {
                if let Some(col) = source.column_mut(column) {
                    if col.references.as_deref() == Some(name) {
                        col.references = None;
                    }
                }
            }
        }
        if let Some(target) = self.table_mut(&rel.to.table) {
            target.incoming.retain(|r| r != name);
            for column in &rel.to.columns {
                if let Some(col) = target.column_mut(column) {
                    col.referenced_by.retain(|r| r != name);
                }
            }
        }
        Some(rel)
    }

    /// Looks up a relationship by name.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&RelationshipNode> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// All relationships in insertion order.
    #[must_use]
    pub fn relationships(&self) -> &[RelationshipNode] {
        &self.relationships
    }

    // ================================================================
    // Indexes
    // ================================================================

    /// Adds an index to the table it names.
    ///
    /// Duplicate names are accepted here and reported by
    /// [`SchemaAst::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTable`] if the table is missing.
    pub fn add_index(&mut self, table: &str, mut index: IndexNode) -> Result<()> {
        let owner = self
            .table_mut(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))?;
        index.table = owner.name.clone();
        owner.indexes.push(index);
        Ok(())
    }

    /// All indexes, table by table.
    #[must_use]
    pub fn indexes(&self) -> Vec<&IndexNode> {
        self.tables.iter().flat_map(|t| t.indexes.iter()).collect()
    }

    /// Looks up an index by name across all tables.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexNode> {
        self.tables.iter().find_map(|t| t.index(name))
    }

    // ================================================================
    // Whole-graph helpers
    // ================================================================

    /// Node counts.
    #[must_use]
    pub fn stats(&self) -> SchemaStats {
        SchemaStats {
            tables: self.tables.len(),
            columns: self.tables.iter().map(|t| t.columns().len()).sum(),
            indexes: self.tables.iter().map(|t| t.indexes.len()).sum(),
            relationships: self.relationships.len(),
        }
    }

    /// Re-infers the cardinality of every relationship from the graph shape.
    pub fn infer_relation_types(&mut self) {
        let inferred: Vec<(usize, RelationType)> = self
            .relationships
            .iter()
            .enumerate()
            .map(|(i, r)| (i, self.infer_relation_type(r)))
            .collect();
        for (i, relation_type) in inferred {
            self.relationships[i].relation_type = relation_type;
        }
    }
}

impl TableNode {
    fn detached_with_indexes(self) -> Self {
        let mut table = self.detached();
        table.indexes = self
            .indexes
            .into_iter()
            .map(|mut i| {
                i.table.clone_from(&table.name);
                i
            })
            .collect();
        table
    }
}

impl Clone for SchemaAst {
    /// Rebuilds the graph: tables and columns first, then relationships and
    /// indexes re-resolved by name. Relationships whose endpoints are not
    /// both present are left out of the copy.
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        for table in &self.tables {
            copy.tables.push(table.detached());
        }
        for rel in &self.relationships {
            if copy.has_table(&rel.from.table) && copy.has_table(&rel.to.table) {
                // Endpoints were checked above; a failure means the source
                // graph already held an inconsistent link, which is dropped.
                copy.add_relationship(rel.clone()).ok();
            }
        }
        for (table, copied) in self.tables.iter().zip(copy.tables.iter_mut()) {
            copied.indexes.clone_from(&table.indexes);
        }
        copy
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::types::CanonicalType;

    /// users <- posts <- comments, comments -> users.
    pub(crate) fn blog() -> SchemaAst {
        let mut schema = SchemaAst::new();
        schema
            .add_table(
                TableNode::new("users")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap()
                    .with_column(ColumnNode::new("email", CanonicalType::string(None)).unique())
                    .unwrap(),
            )
            .unwrap();
        schema
            .add_table(
                TableNode::new("posts")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap()
                    .with_column(ColumnNode::new("author_id", CanonicalType::integer()))
                    .unwrap()
                    .with_column(ColumnNode::new("title", CanonicalType::string(Some(200))))
                    .unwrap(),
            )
            .unwrap();
        schema
            .add_table(
                TableNode::new("comments")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap()
                    .with_column(ColumnNode::new("post_id", CanonicalType::integer()))
                    .unwrap()
                    .with_column(ColumnNode::new("user_id", CanonicalType::integer()))
                    .unwrap()
                    .with_column(ColumnNode::new("body", CanonicalType::text()))
                    .unwrap(),
            )
            .unwrap();
        schema
            .add_relationship(fk("fk_posts_author_id", "posts", "author_id", "users", "id"))
            .unwrap();
        schema
            .add_relationship(fk("fk_comments_post_id", "comments", "post_id", "posts", "id"))
            .unwrap();
        schema
            .add_relationship(fk("fk_comments_user_id", "comments", "user_id", "users", "id"))
            .unwrap();
        schema
            .add_index("users", IndexNode::new("idx_users_email", vec!["email".into()]).unique())
            .unwrap();
        schema
            .add_index("posts", IndexNode::new("idx_posts_title", vec!["title".into()]))
            .unwrap();
        schema
    }

    pub(crate) fn fk(
        name: &str,
        from_table: &str,
        from_column: &str,
        to_table: &str,
        to_column: &str,
    ) -> RelationshipNode {
        RelationshipNode::new(
            name,
            Endpoint::new(from_table, vec![from_column.to_string()]),
            Endpoint::new(to_table, vec![to_column.to_string()]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{blog, fk};
    use super::*;
    use crate::types::CanonicalType;

    #[test]
    fn test_add_table_duplicate() {
        let mut schema = blog();
        let err = schema.add_table(TableNode::new("users")).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateTable(name) if name == "users"));
    }

    #[test]
    fn test_relationship_links_both_sides() {
        let schema = blog();
        let posts = schema.table("posts").unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(posts.outgoing, vec!["fk_posts_author_id"]);
        assert_eq!(
            posts.column("author_id").unwrap().references.as_deref(),
            Some("fk_posts_author_id")
        );
        assert_eq!(users.incoming, vec!["fk_posts_author_id", "fk_comments_user_id"]);
        assert_eq!(
            users.column("id").unwrap().referenced_by,
            vec!["fk_posts_author_id", "fk_comments_user_id"]
        );
    }

    #[test]
    fn test_add_relationship_errors() {
        let mut schema = blog();
        let err = schema
            .add_relationship(fk("fk_posts_author_id", "posts", "author_id", "users", "id"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateRelationship(_)));

        let err = schema
            .add_relationship(fk("fk_x", "missing", "a", "users", "id"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTable(t) if t == "missing"));

        let err = schema
            .add_relationship(fk("fk_y", "posts", "nope", "users", "id"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
        assert_eq!(schema.relationships().len(), 3);
    }

    #[test]
    fn test_dangling_target_is_linked_when_table_arrives() {
        let mut schema = SchemaAst::new();
        schema
            .add_table(
                TableNode::new("posts")
                    .with_column(ColumnNode::new("author_id", CanonicalType::integer()))
                    .unwrap(),
            )
            .unwrap();
        schema
            .add_relationship(fk("fk_posts_author_id", "posts", "author_id", "users", "id"))
            .unwrap();
        schema
            .add_table(
                TableNode::new("users")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap(),
            )
            .unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(users.incoming, vec!["fk_posts_author_id"]);
        assert_eq!(users.column("id").unwrap().referenced_by, vec!["fk_posts_author_id"]);
    }

    #[test]
    fn test_remove_table_cascades() {
        let mut schema = blog();
        let removed = schema.remove_table("posts").unwrap();
        assert_eq!(removed.name, "posts");
        assert_eq!(removed.indexes.len(), 1);
        assert!(schema.relationship("fk_posts_author_id").is_none());
        assert!(schema.relationship("fk_comments_post_id").is_none());
        assert!(schema.relationship("fk_comments_user_id").is_some());
        assert!(schema.index("idx_posts_title").is_none());

        let users = schema.table("users").unwrap();
        assert_eq!(users.incoming, vec!["fk_comments_user_id"]);
        let comments = schema.table("comments").unwrap();
        assert!(comments.column("post_id").unwrap().references.is_none());
        assert_eq!(comments.outgoing, vec!["fk_comments_user_id"]);
    }

    #[test]
    fn test_remove_missing_table_is_noop() {
        let mut schema = blog();
        assert!(schema.remove_table("ghosts").is_none());
        assert_eq!(schema.stats().relationships, 3);
    }

    #[test]
    fn test_add_index_unknown_table() {
        let mut schema = blog();
        let err = schema
            .add_index("ghosts", IndexNode::new("idx", vec!["a".into()]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTable(_)));
        assert_eq!(schema.index("idx_users_email").unwrap().table, "users");
    }

    #[test]
    fn test_clone_is_independent() {
        let original = blog();
        let mut copy = original.clone();
        assert_eq!(copy.stats(), original.stats());
        assert_eq!(copy.table_names(), original.table_names());
        assert_eq!(copy, original);

        copy.remove_table("users");
        copy.table_mut("posts")
            .unwrap()
            .add_column(ColumnNode::new("slug", CanonicalType::string(None)))
            .unwrap();
        assert!(original.has_table("users"));
        assert!(!original.table("posts").unwrap().has_column("slug"));
        assert_eq!(original.stats().relationships, 3);
    }

    #[test]
    fn test_clone_drops_dangling_relationships() {
        let mut schema = SchemaAst::new();
        schema
            .add_table(
                TableNode::new("posts")
                    .with_column(ColumnNode::new("author_id", CanonicalType::integer()))
                    .unwrap(),
            )
            .unwrap();
        schema
            .add_relationship(fk("fk_posts_author_id", "posts", "author_id", "users", "id"))
            .unwrap();
        let copy = schema.clone();
        assert_eq!(copy.stats().relationships, 0);
        assert!(copy.table("posts").unwrap().outgoing.is_empty());
    }

    #[test]
    fn test_stats() {
        let stats = blog().stats();
        assert_eq!(
            stats,
            SchemaStats {
                tables: 3,
                columns: 9,
                indexes: 2,
                relationships: 3,
            }
        );
    }
}
