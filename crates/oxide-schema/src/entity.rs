//! Entity metadata consumed by the graph builder.
//!
//! These types describe what an ORM entity declares: its fields, its
//! relations and its composite indexes. They are plain data; reading them
//! out of decorators or macros happens elsewhere. They deserialize from
//! JSON so definitions can also be loaded from a file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::ReferentialAction;
use crate::types::{DefaultValue, HostType};

/// Index flag on a single field: `true` or an explicit index name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldIndex {
    /// Index the field under the default name.
    Flag(bool),
    /// Index the field under the given name.
    Named(String),
}

/// Column options declared on an entity field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldOptions {
    /// Explicit column name, bypassing the naming strategy.
    pub column_name: Option<String>,
    /// Explicit SQL column type hint (e.g. `"varchar"`, `"jsonb"`).
    pub column_type: Option<String>,
    /// Maximum length for strings and binaries.
    pub length: Option<u32>,
    /// Decimal precision.
    pub precision: Option<u32>,
    /// Decimal scale.
    pub scale: Option<u32>,
    /// Unsigned numeric column.
    pub unsigned: bool,
    /// Whether the column accepts NULL. Defaults to nullable, except for the id.
    pub nullable: Option<bool>,
    /// UNIQUE constraint on the column.
    pub unique: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Overrides auto-increment detection for the id field.
    pub auto_increment: Option<bool>,
    /// Field-level index declaration.
    pub index: Option<FieldIndex>,
    /// Column comment.
    pub comment: Option<String>,
    /// Virtual fields have no backing column.
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
}

/// A single entity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    /// Field name as declared on the entity.
    pub name: String,
    /// Declared host type.
    #[serde(default)]
    pub host_type: Option<HostType>,
    /// Column options.
    #[serde(flatten)]
    pub options: FieldOptions,
}

impl FieldMeta {
    /// Creates a field with default options.
    #[must_use]
    pub fn new(name: impl Into<String>, host_type: HostType) -> Self {
        Self {
            name: name.into(),
            host_type: Some(host_type),
            options: FieldOptions::default(),
        }
    }

    /// Replaces the field options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }
}

/// Relation cardinality, seen from the declaring entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// One-to-one.
    #[serde(rename = "11")]
    OneToOne,
    /// Many-to-one (the declaring side holds the foreign key).
    #[serde(rename = "m1")]
    ManyToOne,
    /// One-to-many (inverse side).
    #[serde(rename = "1m")]
    OneToMany,
    /// Many-to-many through a junction table.
    #[serde(rename = "mm")]
    ManyToMany,
}

/// A local → foreign field pair of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePair {
    /// Field on the declaring entity.
    pub local: String,
    /// Field on the target entity.
    pub foreign: String,
}

/// A relation declared on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationMeta {
    /// Relation name (property name on the entity).
    pub name: String,
    /// Cardinality.
    pub cardinality: Cardinality,
    /// Name of the target entity.
    pub entity: String,
    /// Local/foreign field pairs.
    #[serde(default)]
    pub references: Vec<ReferencePair>,
    /// Junction entity for many-to-many relations.
    #[serde(default)]
    pub through: Option<String>,
    /// ON DELETE action; the builder default applies when absent.
    #[serde(default)]
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action; the builder default applies when absent.
    #[serde(default)]
    pub on_update: Option<ReferentialAction>,
}

impl RelationMeta {
    /// Returns `true` if this side of the relation owns the foreign key.
    #[must_use]
    pub fn is_owning_side(&self) -> bool {
        match self.cardinality {
            Cardinality::ManyToOne => true,
            Cardinality::OneToOne => !self.references.is_empty(),
            Cardinality::OneToMany | Cardinality::ManyToMany => false,
        }
    }
}

/// A class-level (usually composite) index declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeIndex {
    /// Explicit index name.
    #[serde(default)]
    pub name: Option<String>,
    /// Field names covered by the index.
    pub columns: Vec<String>,
    /// UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Index method (`btree`, `hash`, `gin`...).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Partial index predicate.
    #[serde(default, rename = "where")]
    pub where_clause: Option<String>,
}

/// Everything an entity declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    /// Entity (class) name.
    pub name: String,
    /// Explicit table name, bypassing the naming strategy.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Name of the id field, `id` when the definition leaves it out.
    #[serde(default = "default_id")]
    pub id: Option<String>,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
    /// Relations in declaration order.
    #[serde(default)]
    pub relations: Vec<RelationMeta>,
    /// Class-level index declarations.
    #[serde(default)]
    pub indexes: Vec<CompositeIndex>,
    /// Table comment.
    #[serde(default)]
    pub comment: Option<String>,
}

#[allow(clippy::unnecessary_wraps)]
fn default_id() -> Option<String> {
    Some("id".to_string())
}

impl EntityMeta {
    /// Creates an entity with an `id` field name and no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            id: Some("id".to_string()),
            fields: Vec::new(),
            relations: Vec::new(),
            indexes: Vec::new(),
            comment: None,
        }
    }

    /// Sets an explicit table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a relation.
    #[must_use]
    pub fn relation(mut self, relation: RelationMeta) -> Self {
        self.relations.push(relation);
        self
    }

    /// Adds a class-level index.
    #[must_use]
    pub fn index(mut self, index: CompositeIndex) -> Self {
        self.indexes.push(index);
        self
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Reads a JSON array of [`EntityMeta`] from a file.
///
/// # Errors
///
/// Returns an IO error if the file cannot be read and a serialization
/// error if it is not a valid entity list.
pub fn load_entities(path: impl AsRef<Path>) -> Result<Vec<EntityMeta>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

// ================================================================
// Naming strategies
// ================================================================

/// Converts entity and field identifiers into table and column names.
pub trait NamingStrategy: Send + Sync {
    /// Table name for an entity.
    fn table_name(&self, entity: &str) -> String;

    /// Column name for a field.
    fn column_name(&self, field: &str) -> String;
}

/// Keeps identifiers exactly as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNamingStrategy;

impl NamingStrategy for DefaultNamingStrategy {
    fn table_name(&self, entity: &str) -> String {
        entity.to_string()
    }

    fn column_name(&self, field: &str) -> String {
        field.to_string()
    }
}

/// Converts `camelCase`/`PascalCase` identifiers to `snake_case`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseNamingStrategy;

impl SnakeCaseNamingStrategy {
    fn to_snake_case(name: &str) -> String {
        let chars: Vec<char> = name.chars().collect();
        let mut out = String::with_capacity(name.len() + 4);
        for (i, &c) in chars.iter().enumerate() {
            if c.is_uppercase() {
                let prev_lower =
                    i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_numeric());
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let prev_upper = i > 0 && chars[i - 1].is_uppercase();
                if i > 0 && (prev_lower || (prev_upper && next_lower)) && !out.ends_with('_') {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl NamingStrategy for SnakeCaseNamingStrategy {
    fn table_name(&self, entity: &str) -> String {
        Self::to_snake_case(entity)
    }

    fn column_name(&self, field: &str) -> String {
        Self::to_snake_case(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_naming() {
        let naming = SnakeCaseNamingStrategy;
        assert_eq!(naming.table_name("UserProfile"), "user_profile");
        assert_eq!(naming.column_name("createdAt"), "created_at");
        assert_eq!(naming.column_name("HTTPStatus"), "http_status");
        assert_eq!(naming.column_name("already_snake"), "already_snake");
        assert_eq!(naming.column_name("address2Line"), "address2_line");
    }

    #[test]
    fn test_default_naming_is_identity() {
        let naming = DefaultNamingStrategy;
        assert_eq!(naming.table_name("UserProfile"), "UserProfile");
        assert_eq!(naming.column_name("createdAt"), "createdAt");
    }

    #[test]
    fn test_owning_side() {
        let mut rel = RelationMeta {
            name: "profile".to_string(),
            cardinality: Cardinality::OneToOne,
            entity: "Profile".to_string(),
            references: vec![],
            through: None,
            on_delete: None,
            on_update: None,
        };
        assert!(!rel.is_owning_side());
        rel.references.push(ReferencePair {
            local: "profileId".to_string(),
            foreign: "id".to_string(),
        });
        assert!(rel.is_owning_side());
        rel.cardinality = Cardinality::OneToMany;
        assert!(!rel.is_owning_side());
    }

    #[test]
    fn test_deserialize_entity_json() {
        let json = r#"{
            "name": "Post",
            "tableName": "posts",
            "id": "id",
            "fields": [
                {"name": "id", "hostType": "number"},
                {"name": "title", "hostType": "string", "length": 120, "index": true},
                {"name": "publishedAt", "hostType": "date", "default": {"expression": "now()"}},
                {"name": "score", "hostType": "number", "virtual": true}
            ],
            "relations": [
                {"name": "author", "cardinality": "m1", "entity": "User",
                 "references": [{"local": "authorId", "foreign": "id"}], "onDelete": "CASCADE"}
            ],
            "indexes": [{"columns": ["title", "publishedAt"], "unique": true}]
        }"#;
        let entity: EntityMeta = serde_json::from_str(json).unwrap();
        assert_eq!(entity.table_name.as_deref(), Some("posts"));
        assert_eq!(entity.fields.len(), 4);
        assert_eq!(entity.fields[1].options.length, Some(120));
        assert_eq!(entity.fields[1].options.index, Some(FieldIndex::Flag(true)));
        assert!(entity.fields[3].options.is_virtual);
        assert_eq!(
            entity.fields[2].options.default,
            Some(DefaultValue::expression("now()"))
        );
        assert_eq!(entity.relations[0].on_delete, Some(ReferentialAction::Cascade));
        assert!(entity.indexes[0].unique);
    }

    #[test]
    fn test_deserialize_entity_without_id_uses_default() {
        let json = r#"{
            "name": "Tag",
            "fields": [
                {"name": "id", "hostType": "number"},
                {"name": "label", "hostType": "string"}
            ]
        }"#;
        let entity: EntityMeta = serde_json::from_str(json).unwrap();
        assert_eq!(entity.id.as_deref(), Some("id"));

        let graph = crate::builder::SchemaAstBuilder::new()
            .from_entities(&[entity])
            .unwrap();
        let id = graph.table("Tag").unwrap().column("id").unwrap();
        assert!(id.is_primary_key);

        let explicit: EntityMeta =
            serde_json::from_str(r#"{"name": "Tag", "id": "tagId"}"#).unwrap();
        assert_eq!(explicit.id.as_deref(), Some("tagId"));
    }
}
