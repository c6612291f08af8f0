//! Graph node types.
//!
//! Nodes reference each other by name rather than by pointer: a column
//! records the name of its table and of the relationships it takes part in,
//! and a table records the names of its incoming and outgoing relationships.
//! [`SchemaAst`](super::SchemaAst) keeps both sides of every link in step.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::types::{CanonicalType, DefaultValue};

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// One-to-one.
    OneToOne,
    /// One-to-many.
    OneToMany,
    /// Many-to-one.
    ManyToOne,
    /// Many-to-many.
    ManyToMany,
}

impl RelationType {
    /// Returns the cardinality seen from the other end.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::OneToOne => Self::OneToOne,
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::ManyToMany => Self::ManyToMany,
        }
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// No action (the SQL default).
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
    /// Restrict deletion/update.
    #[serde(rename = "RESTRICT")]
    Restrict,
    /// Cascade deletion/update.
    #[serde(rename = "CASCADE")]
    Cascade,
    /// Set to NULL.
    #[serde(rename = "SET NULL")]
    SetNull,
    /// Set to default value.
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL keyword(s) for this action.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses the spelling used by database catalogs (`"SET NULL"`,
    /// `"cascade"`...). Unknown spellings map to `NoAction`.
    #[must_use]
    pub fn from_sql(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "RESTRICT" => Self::Restrict,
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "SET DEFAULT" => Self::SetDefault,
            _ => Self::NoAction,
        }
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ColumnNode {
    /// Column name, unique within its table.
    pub name: String,
    /// Canonical column type.
    pub column_type: CanonicalType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Part of the primary key.
    pub is_primary_key: bool,
    /// Auto-incrementing.
    pub is_auto_increment: bool,
    /// UNIQUE constraint.
    pub is_unique: bool,
    /// Default value.
    pub default_value: Option<DefaultValue>,
    /// Column comment.
    pub comment: Option<String>,
    /// Owning table. Set when the column is added to a table.
    pub table: String,
    /// Relationship for which this column is a source.
    pub references: Option<String>,
    /// Relationships for which this column is a target.
    pub referenced_by: Vec<String>,
}

impl ColumnNode {
    /// Creates a nullable column with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: CanonicalType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            is_primary_key: false,
            is_auto_increment: false,
            is_unique: false,
            default_value: None,
            comment: None,
            table: String::new(),
            references: None,
            referenced_by: Vec::new(),
        }
    }

    /// Marks the column as primary key (implies NOT NULL).
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets nullability.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Adds a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns `true` if the column is the source of a foreign key.
    #[must_use]
    pub fn is_foreign_key(&self) -> bool {
        self.references.is_some()
    }

    /// Copy of the column without any graph links.
    pub(crate) fn detached(&self) -> Self {
        Self {
            table: String::new(),
            references: None,
            referenced_by: Vec::new(),
            ..self.clone()
        }
    }
}

/// An index owned by a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexNode {
    /// Index name, expected to be unique within its table.
    pub name: String,
    /// Owning table. Set when the index is added to the graph.
    pub table: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// UNIQUE index.
    pub unique: bool,
    /// Index method (`btree`, `hash`, `gin`...). `None` means the default.
    pub kind: Option<String>,
    /// Partial index predicate.
    pub where_clause: Option<String>,
    /// Where the index came from (`"entity"`, `"database"`...).
    pub source: Option<String>,
    /// Synchronization marker set by tooling.
    pub sync_status: Option<String>,
}

impl IndexNode {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            table: String::new(),
            columns,
            unique: false,
            kind: None,
            where_clause: None,
            source: None,
            sync_status: None,
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index method.
    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Sets the partial index predicate.
    #[must_use]
    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause = Some(predicate.into());
        self
    }
}

/// One end of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Table name.
    pub table: String,
    /// Column names, in declaration order.
    pub columns: Vec<String>,
}

impl Endpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// `table.col1,col2` path.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}.{}", self.table, self.columns.join(","))
    }

    /// Same as [`Endpoint::path`] but with the columns sorted.
    #[must_use]
    pub fn sorted_path(&self) -> String {
        let mut columns = self.columns.clone();
        columns.sort();
        format!("{}.{}", self.table, columns.join(","))
    }
}

/// A foreign-key relationship between two tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipNode {
    /// Relationship name, unique across the graph.
    pub name: String,
    /// Cardinality seen from the source table.
    pub relation_type: RelationType,
    /// Source (referencing) end.
    pub from: Endpoint,
    /// Target (referenced) end.
    pub to: Endpoint,
    /// Junction table for many-to-many relationships.
    pub through: Option<String>,
    /// ON DELETE action. `None` means the database default.
    pub on_delete: Option<ReferentialAction>,
    /// ON UPDATE action. `None` means the database default.
    pub on_update: Option<ReferentialAction>,
    /// Confidence score for inferred relationships.
    pub confidence: Option<f64>,
    /// Where the relationship came from.
    pub source: Option<String>,
}

impl RelationshipNode {
    /// Creates a many-to-one relationship with default actions.
    #[must_use]
    pub fn new(name: impl Into<String>, from: Endpoint, to: Endpoint) -> Self {
        Self {
            name: name.into(),
            relation_type: RelationType::ManyToOne,
            from,
            to,
            through: None,
            on_delete: None,
            on_update: None,
            confidence: None,
            source: None,
        }
    }

    /// Sets the cardinality.
    #[must_use]
    pub const fn relation_type(mut self, relation_type: RelationType) -> Self {
        self.relation_type = relation_type;
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// ON DELETE action with the default applied.
    #[must_use]
    pub fn effective_on_delete(&self) -> ReferentialAction {
        self.on_delete.unwrap_or_default()
    }

    /// ON UPDATE action with the default applied.
    #[must_use]
    pub fn effective_on_update(&self) -> ReferentialAction {
        self.on_update.unwrap_or_default()
    }

    /// Name-independent key: `from.sorted_cols->to.sorted_cols`.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}->{}", self.from.sorted_path(), self.to.sorted_path())
    }

    /// `"posts.author_id -> users.id"`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{} -> {}", self.from.path(), self.to.path())
    }

    pub(crate) fn is_self_referencing(&self) -> bool {
        self.from.table == self.to.table
    }
}

/// A table and the columns and indexes it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNode {
    /// Table name.
    pub name: String,
    columns: Vec<ColumnNode>,
    /// Primary key column names.
    pub primary_key: Vec<String>,
    /// Indexes owned by the table.
    pub indexes: Vec<IndexNode>,
    /// Relationships targeting this table.
    pub incoming: Vec<String>,
    /// Relationships declared by this table.
    pub outgoing: Vec<String>,
    /// Table comment.
    pub comment: Option<String>,
}

impl TableNode {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            comment: None,
        }
    }

    /// Adds a column and returns the table, for chained construction.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateColumn`] if the name is taken.
    pub fn with_column(mut self, column: ColumnNode) -> Result<Self> {
        self.add_column(column)?;
        Ok(self)
    }

    /// Adds a column at the end of the table.
    ///
    /// Primary key columns are appended to [`TableNode::primary_key`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateColumn`] if the name is taken.
    pub fn add_column(&mut self, mut column: ColumnNode) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(SchemaError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name,
            });
        }
        column.table.clone_from(&self.name);
        if column.is_primary_key && !self.primary_key.contains(&column.name) {
            self.primary_key.push(column.name.clone());
        }
        self.columns.push(column);
        Ok(())
    }

    /// Columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnNode] {
        &self.columns
    }

    /// Looks up a column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnNode> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut ColumnNode> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Returns `true` if the table has a column with this name.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Looks up an owned index.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexNode> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Copy of the table with its columns and indexes but no relationship links.
    pub(crate) fn detached(&self) -> Self {
        Self {
            name: self.name.clone(),
            columns: self.columns.iter().map(ColumnNode::detached).collect(),
            primary_key: self.primary_key.clone(),
            indexes: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            comment: self.comment.clone(),
        }
    }
}
