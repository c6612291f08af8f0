//! Plain serializable shape of a graph.

use serde::{Deserialize, Serialize};

use super::node::{
    ColumnNode, IndexNode, ReferentialAction, RelationType, RelationshipNode, TableNode,
};
use super::SchemaAst;
use crate::types::{CanonicalType, DefaultValue};

/// Serializable view of a [`SchemaAst`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaJson {
    /// Tables in insertion order.
    pub tables: Vec<TableJson>,
    /// Relationships in insertion order.
    pub relationships: Vec<RelationshipJson>,
}

/// Serializable table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableJson {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnJson>,
    /// Primary key column names.
    pub primary_key: Vec<String>,
    /// Owned indexes.
    pub indexes: Vec<IndexJson>,
    /// Table comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Serializable column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ColumnJson {
    /// Column name.
    pub name: String,
    /// Canonical type.
    #[serde(rename = "type")]
    pub column_type: CanonicalType,
    /// Nullability.
    pub nullable: bool,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Auto-incrementing.
    pub auto_increment: bool,
    /// UNIQUE constraint.
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Serializable index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexJson {
    /// Index name.
    pub name: String,
    /// Indexed columns.
    pub columns: Vec<String>,
    /// UNIQUE index.
    pub unique: bool,
    /// Index method.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Partial index predicate.
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
}

/// Serializable relationship, endpoints written as one path string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipJson {
    /// Relationship name.
    pub name: String,
    /// Cardinality.
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    /// `"posts.author_id -> users.id"`.
    pub path: String,
    /// Junction table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    /// ON DELETE action, defaults applied.
    pub on_delete: ReferentialAction,
    /// ON UPDATE action, defaults applied.
    pub on_update: ReferentialAction,
}

impl From<&ColumnNode> for ColumnJson {
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

impl From<&IndexNode> for IndexJson {
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

impl From<&TableNode> for TableJson {
    fn from(table: &TableNode) -> Self {
        Self {
            name: table.name.clone(),
            columns: table.columns().iter().map(ColumnJson::from).collect(),
            primary_key: table.primary_key.clone(),
            indexes: table.indexes.iter().map(IndexJson::from).collect(),
            comment: table.comment.clone(),
        }
    }
}

impl From<&RelationshipNode> for RelationshipJson {
    fn from(rel: &RelationshipNode) -> Self {
        Self {
            name: rel.name.clone(),
            relation_type: rel.relation_type,
            path: rel.path(),
            through: rel.through.clone(),
            on_delete: rel.effective_on_delete(),
            on_update: rel.effective_on_update(),
        }
    }
}

impl SchemaAst {
    /// Plain, diff-friendly view of the graph.
    #[must_use]
    pub fn to_json(&self) -> SchemaJson {
        SchemaJson {
            tables: self.tables().iter().map(TableJson::from).collect(),
            relationships: self
                .relationships()
                .iter()
                .map(RelationshipJson::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::blog;
    use serde_json::json;

    #[test]
    fn test_to_json_shape() {
        let value = serde_json::to_value(blog().to_json()).unwrap();
        assert_eq!(value["tables"][0]["name"], "users");
        assert_eq!(value["tables"][0]["primaryKey"], json!(["id"]));
        assert_eq!(value["tables"][0]["columns"][0]["type"]["category"], "integer");
        assert_eq!(value["tables"][0]["indexes"][0]["unique"], true);
        assert_eq!(
            value["relationships"][0],
            json!({
                "name": "fk_posts_author_id",
                "type": "many_to_one",
                "path": "posts.author_id -> users.id",
                "onDelete": "NO ACTION",
                "onUpdate": "NO ACTION",
            })
        );
    }

    #[test]
    fn test_to_json_is_stable() {
        let a = serde_json::to_string(&blog().to_json()).unwrap();
        let b = serde_json::to_string(&blog().clone().to_json()).unwrap();
        assert_eq!(a, b);
    }
}
