//! Builds schema graphs from entity metadata and from catalog records.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::entity::{
    Cardinality, DefaultNamingStrategy, EntityMeta, FieldIndex, NamingStrategy, RelationMeta,
};
use crate::error::Result;
use crate::graph::{
    ColumnNode, Endpoint, IndexNode, ReferentialAction, RelationType, RelationshipNode,
    SchemaAst, TableNode,
};
use crate::introspect::TableSchema;
use crate::types::{
    field_options_to_canonical, sql_to_canonical, CanonicalType, DefaultValue, TypeCategory,
};

/// Defaults applied while building from entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderOptions {
    /// ON DELETE action for relations that do not declare one.
    pub default_on_delete: Option<ReferentialAction>,
    /// ON UPDATE action for relations that do not declare one.
    pub default_on_update: Option<ReferentialAction>,
}

impl BuilderOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default ON DELETE action.
    #[must_use]
    pub const fn with_on_delete(mut self, action: ReferentialAction) -> Self {
        self.default_on_delete = Some(action);
        self
    }

    /// Sets the default ON UPDATE action.
    #[must_use]
    pub const fn with_on_update(mut self, action: ReferentialAction) -> Self {
        self.default_on_update = Some(action);
        self
    }
}

/// Resolved table and column names of one entity.
struct EntityNames {
    table: String,
    columns: HashMap<String, String>,
}

impl EntityNames {
    fn column(&self, field: &str, naming: &dyn NamingStrategy) -> String {
        self.columns
            .get(field)
            .cloned()
            .unwrap_or_else(|| naming.column_name(field))
    }
}

/// Builds [`SchemaAst`] graphs.
pub struct SchemaAstBuilder {
    naming: Box<dyn NamingStrategy>,
    options: BuilderOptions,
}

impl Default for SchemaAstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaAstBuilder {
    /// Creates a builder that keeps identifiers as declared.
    #[must_use]
    pub fn new() -> Self {
        Self {
            naming: Box::new(DefaultNamingStrategy),
            options: BuilderOptions::default(),
        }
    }

    /// Uses a different naming strategy.
    #[must_use]
    pub fn with_naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    /// Uses custom options.
    #[must_use]
    pub fn with_options(mut self, options: BuilderOptions) -> Self {
        self.options = options;
        self
    }

    // ================================================================
    // From entities
    // ================================================================

    /// Builds a graph from entity metadata.
    ///
    /// Runs three passes over the whole entity list: tables and columns,
    /// then owning-side relationships, then indexes. Later passes resolve
    /// tables and columns created by earlier ones.
    ///
    /// # Errors
    ///
    /// Propagates malformed column type hints and graph errors such as
    /// two entities mapping to the same table.
    pub fn from_entities(&self, entities: &[EntityMeta]) -> Result<SchemaAst> {
        let mut schema = SchemaAst::new();
        let mut names: HashMap<&str, EntityNames> = HashMap::new();

        for entity in entities {
            let resolved = self.build_table(&mut schema, entity)?;
            names.insert(entity.name.as_str(), resolved);
        }
        debug!(tables = schema.tables().len(), "Pass 1: tables and columns");

        for entity in entities {
            let Some(owner) = names.get(entity.name.as_str()) else {
                continue;
            };
            for relation in &entity.relations {
                self.build_relationship(&mut schema, owner, relation, &names)?;
            }
        }
        debug!(
            relationships = schema.relationships().len(),
            "Pass 2: relationships"
        );

        for entity in entities {
            let Some(owner) = names.get(entity.name.as_str()) else {
                continue;
            };
            self.build_indexes(&mut schema, entity, owner)?;
        }
        debug!(indexes = schema.indexes().len(), "Pass 3: indexes");

        info!(
            entities = entities.len(),
            tables = schema.tables().len(),
            "Built schema graph from entities"
        );
        Ok(schema)
    }

    fn build_table(&self, schema: &mut SchemaAst, entity: &EntityMeta) -> Result<EntityNames> {
        let table_name = entity
            .table_name
            .clone()
            .unwrap_or_else(|| self.naming.table_name(&entity.name));
        let mut table = TableNode::new(&table_name);
        table.comment.clone_from(&entity.comment);
        let mut columns = HashMap::new();

        for field in entity.fields.iter().filter(|f| !f.options.is_virtual) {
            let options = &field.options;
            let column_name = options
                .column_name
                .clone()
                .unwrap_or_else(|| self.naming.column_name(&field.name));
            let column_type = field_options_to_canonical(options, field.host_type)?;
            let is_pk = entity.id.as_deref() == Some(field.name.as_str());
            let auto_increment = options
                .auto_increment
                .unwrap_or(is_pk && column_type.category == TypeCategory::Integer);

            let mut column = ColumnNode::new(&column_name, column_type)
                .nullable(options.nullable.unwrap_or(!is_pk));
            if is_pk {
                column = column.primary_key();
            }
            column.is_auto_increment = auto_increment;
            column.is_unique = options.unique;
            column.default_value.clone_from(&options.default);
            column.comment.clone_from(&options.comment);

            table.add_column(column)?;
            columns.insert(field.name.clone(), column_name);
        }

        schema.add_table(table)?;
        Ok(EntityNames {
            table: table_name,
            columns,
        })
    }

    fn build_relationship(
        &self,
        schema: &mut SchemaAst,
        owner: &EntityNames,
        relation: &RelationMeta,
        names: &HashMap<&str, EntityNames>,
    ) -> Result<()> {
        if !relation.is_owning_side() {
            return Ok(());
        }
        if relation.references.is_empty() {
            warn!(
                table = %owner.table,
                relation = %relation.name,
                "Relation has no join columns, skipping"
            );
            return Ok(());
        }

        let target = names.get(relation.entity.as_str());
        let target_table = target.map_or_else(
            || self.naming.table_name(&relation.entity),
            |t| t.table.clone(),
        );
        let naming = self.naming.as_ref();
        let local: Vec<String> = relation
            .references
            .iter()
            .map(|r| owner.column(&r.local, naming))
            .collect();
        let foreign: Vec<String> = relation
            .references
            .iter()
            .map(|r| {
                target.map_or_else(
                    || naming.column_name(&r.foreign),
                    |t| t.column(&r.foreign, naming),
                )
            })
            .collect();

        // Join columns not declared as fields are created from the column
        // they point at.
        for (local_column, foreign_column) in local.iter().zip(&foreign) {
            let exists = schema
                .table(&owner.table)
                .is_some_and(|t| t.has_column(local_column));
            if exists {
                continue;
            }
            let column_type = schema
                .table(&target_table)
                .and_then(|t| t.column(foreign_column))
                .map_or_else(CanonicalType::integer, |c| c.column_type.clone());
            debug!(table = %owner.table, column = %local_column, "Adding join column");
            if let Some(table) = schema.table_mut(&owner.table) {
                table.add_column(ColumnNode::new(local_column, column_type))?;
            }
        }

        let relation_type = match relation.cardinality {
            Cardinality::OneToOne => RelationType::OneToOne,
            _ => RelationType::ManyToOne,
        };
        let mut relationship = RelationshipNode::new(
            format!("fk_{}_{}", owner.table, local.join("_")),
            Endpoint::new(&owner.table, local),
            Endpoint::new(target_table, foreign),
        )
        .relation_type(relation_type);
        relationship.on_delete = relation.on_delete.or(self.options.default_on_delete);
        relationship.on_update = relation.on_update.or(self.options.default_on_update);
        relationship.through = relation
            .through
            .as_ref()
            .map(|t| {
                names
                    .get(t.as_str())
                    .map_or_else(|| self.naming.table_name(t), |n| n.table.clone())
            });
        relationship.source = Some("entity".to_string());

        schema.add_relationship(relationship)
    }

    fn build_indexes(
        &self,
        schema: &mut SchemaAst,
        entity: &EntityMeta,
        owner: &EntityNames,
    ) -> Result<()> {
        let naming = self.naming.as_ref();

        for field in entity.fields.iter().filter(|f| !f.options.is_virtual) {
            let column = owner.column(&field.name, naming);
            let name = match &field.options.index {
                Some(FieldIndex::Flag(true)) => format!("idx_{}_{}", owner.table, column),
                Some(FieldIndex::Named(name)) => name.clone(),
                Some(FieldIndex::Flag(false)) | None => continue,
            };
            let mut index = IndexNode::new(name, vec![column]);
            index.source = Some("entity".to_string());
            schema.add_index(&owner.table, index)?;
        }

        for declared in &entity.indexes {
            let columns: Vec<String> = declared
                .columns
                .iter()
                .map(|c| owner.column(c, naming))
                .collect();
            let name = declared
                .name
                .clone()
                .unwrap_or_else(|| format!("idx_{}_{}", owner.table, columns.join("_")));
            let mut index = IndexNode::new(name, columns);
            index.unique = declared.unique;
            index.kind.clone_from(&declared.kind);
            index.where_clause.clone_from(&declared.where_clause);
            index.source = Some("entity".to_string());
            schema.add_index(&owner.table, index)?;
        }
        Ok(())
    }

    // ================================================================
    // From catalog records
    // ================================================================

    /// Builds a graph from introspected table records.
    ///
    /// Foreign keys become relationships once every table exists, named
    /// `fk_<table>_<columns>` when the catalog has no constraint name, and
    /// their cardinality is inferred from the resulting graph.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidType`](crate::SchemaError::InvalidType)
    /// for unparsable column types and graph errors for inconsistent records.
    pub fn from_table_schemas(&self, tables: &[TableSchema]) -> Result<SchemaAst> {
        let mut schema = SchemaAst::new();

        for record in tables {
            let mut table = TableNode::new(&record.name);
            table.comment.clone_from(&record.comment);
            for col in &record.columns {
                let mut column = ColumnNode::new(&col.name, sql_to_canonical(&col.data_type)?)
                    .nullable(col.nullable);
                if col.primary_key {
                    column = column.primary_key();
                }
                column.is_auto_increment = col.auto_increment;
                column.is_unique = col.unique;
                column.default_value = col.default.as_ref().map(DefaultValue::expression);
                column.comment.clone_from(&col.comment);
                table.add_column(column)?;
            }
            for idx in &record.indexes {
                let mut index = IndexNode::new(&idx.name, idx.columns.clone());
                index.unique = idx.unique;
                index.kind.clone_from(&idx.kind);
                index.where_clause.clone_from(&idx.where_clause);
                index.source = Some("database".to_string());
                table.indexes.push(index);
            }
            schema.add_table(table)?;
        }

        for record in tables {
            for fk in &record.foreign_keys {
                let name = fk
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("fk_{}_{}", record.name, fk.columns.join("_")));
                let mut relationship = RelationshipNode::new(
                    name,
                    Endpoint::new(&record.name, fk.columns.clone()),
                    Endpoint::new(&fk.referenced_table, fk.referenced_columns.clone()),
                );
                relationship.on_delete = fk.on_delete.as_deref().map(ReferentialAction::from_sql);
                relationship.on_update = fk.on_update.as_deref().map(ReferentialAction::from_sql);
                relationship.source = Some("database".to_string());
                schema.add_relationship(relationship)?;
            }
        }

        schema.infer_relation_types();
        debug!(tables = tables.len(), "Built schema graph from catalog");
        Ok(schema)
    }
}
