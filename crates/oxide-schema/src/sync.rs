//! Schema synchronization between entities and a database.
//!
//! The same differ serves every direction; only the argument order
//! changes. In bidirectional mode a column that both sides want to alter
//! is a conflict: it is removed from both diffs and reported separately.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

use crate::builder::SchemaAstBuilder;
use crate::diff::{ColumnDiff, DiffAction, DiffCounts, DiffOptions, SchemaDiffResult, SchemaDiffer};
use crate::entity::EntityMeta;
use crate::error::Result;
use crate::graph::SchemaAst;
use crate::introspect::SchemaIntrospector;
use crate::types::{canonical_to_sql, Dialect};

/// Which side is the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// Entities are desired; the database is brought in line.
    #[default]
    EntityToDb,
    /// The database is desired; entities are brought in line.
    DbToEntity,
    /// Both diffs are computed and conflicting columns set aside.
    Bidirectional,
}

impl SyncDirection {
    /// Kebab-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntityToDb => "entity-to-db",
            Self::DbToEntity => "db-to-entity",
            Self::Bidirectional => "bidirectional",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entity-to-db" => Ok(Self::EntityToDb),
            "db-to-entity" => Ok(Self::DbToEntity),
            "bidirectional" => Ok(Self::Bidirectional),
            other => Err(format!(
                "unknown sync direction '{other}' \
                 (expected entity-to-db, db-to-entity or bidirectional)"
            )),
        }
    }
}

/// Options for [`SchemaSync`].
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Direction.
    pub direction: SyncDirection,
    /// Strip every drop from the returned diffs.
    pub safe_mode: bool,
    /// Options passed to the differ.
    pub diff: DiffOptions,
}

impl SyncOptions {
    /// Creates default options: entity-to-db, safe mode off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the direction.
    #[must_use]
    pub const fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Enables safe mode.
    #[must_use]
    pub const fn with_safe_mode(mut self) -> Self {
        self.safe_mode = true;
        self
    }

    /// Sets the differ options.
    #[must_use]
    pub fn with_diff_options(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }
}

/// A column both sides want to change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// What applying the entities to the database would change.
    pub entity_to_db: ColumnDiff,
    /// What applying the database to the entities would change.
    pub db_to_entity: ColumnDiff,
    /// Human-readable description.
    pub description: String,
}

/// Created/dropped/altered counts per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCounts {
    /// Entity-to-database counts.
    pub entity_to_db: DiffCounts,
    /// Database-to-entity counts.
    pub db_to_entity: DiffCounts,
}

/// Outcome of a sync run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSyncResult {
    /// Direction the run used.
    pub direction: SyncDirection,
    /// Changes that bring the database in line with the entities.
    pub entity_to_db: Option<SchemaDiffResult>,
    /// Changes that bring the entities in line with the database.
    pub db_to_entity: Option<SchemaDiffResult>,
    /// Columns needing manual resolution.
    pub conflicts: Vec<SyncConflict>,
    /// Human-readable summary.
    pub summary: String,
    /// Counts per direction.
    pub counts: SyncCounts,
}

impl SchemaSyncResult {
    /// Returns `true` if nothing needs to change and nothing conflicts.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.conflicts.is_empty()
            && [&self.entity_to_db, &self.db_to_entity]
                .into_iter()
                .flatten()
                .all(|diff| !diff.has_differences)
    }
}

/// Compares entity definitions with a live database.
pub struct SchemaSync<I> {
    introspector: I,
    builder: SchemaAstBuilder,
    options: SyncOptions,
}

impl<I: SchemaIntrospector> SchemaSync<I> {
    /// Creates a sync with default options.
    #[must_use]
    pub fn new(introspector: I) -> Self {
        Self {
            introspector,
            builder: SchemaAstBuilder::new(),
            options: SyncOptions::default(),
        }
    }

    /// Uses custom options.
    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses a custom graph builder for the entities.
    #[must_use]
    pub fn with_builder(mut self, builder: SchemaAstBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Builds the entity graph, introspects the database and compares them.
    ///
    /// # Errors
    ///
    /// Propagates graph-building and introspection errors.
    pub async fn sync(&self, entities: &[EntityMeta]) -> Result<SchemaSyncResult> {
        let entity_graph = self.builder.from_entities(entities)?;
        let db_graph = self.introspector.introspect().await?;
        Ok(self.sync_graphs(&entity_graph, &db_graph))
    }

    /// Compares two already-built graphs.
    #[must_use]
    pub fn sync_graphs(&self, entity_graph: &SchemaAst, db_graph: &SchemaAst) -> SchemaSyncResult {
        let differ = SchemaDiffer::with_options(self.options.diff.clone());
        let direction = self.options.direction;
        info!(direction = %direction, safe_mode = self.options.safe_mode, "Synchronizing schema");

        let (mut entity_to_db, mut db_to_entity) = match direction {
            SyncDirection::EntityToDb => (Some(differ.diff(entity_graph, db_graph)), None),
            SyncDirection::DbToEntity => (None, Some(differ.diff(db_graph, entity_graph))),
            SyncDirection::Bidirectional => (
                Some(differ.diff(entity_graph, db_graph)),
                Some(differ.diff(db_graph, entity_graph)),
            ),
        };

        let mut conflicts = Vec::new();
        if let (Some(forward), Some(backward)) = (&mut entity_to_db, &mut db_to_entity) {
            conflicts = detect_conflicts(forward, backward, self.options.diff.ignore_case);
            if !conflicts.is_empty() {
                warn!(conflicts = conflicts.len(), "Columns changed on both sides");
            }
        }

        if self.options.safe_mode {
            for diff in [&mut entity_to_db, &mut db_to_entity].into_iter().flatten() {
                diff.remove_destructive();
            }
        }

        let counts = SyncCounts {
            entity_to_db: entity_to_db
                .as_ref()
                .map(SchemaDiffResult::counts)
                .unwrap_or_default(),
            db_to_entity: db_to_entity
                .as_ref()
                .map(SchemaDiffResult::counts)
                .unwrap_or_default(),
        };
        let summary = render_summary(
            direction,
            entity_to_db.as_ref(),
            db_to_entity.as_ref(),
            &conflicts,
        );
        info!(
            direction = %direction,
            conflicts = conflicts.len(),
            "Schema sync finished"
        );

        SchemaSyncResult {
            direction,
            entity_to_db,
            db_to_entity,
            conflicts,
            summary,
            counts,
        }
    }
}

fn conflict_key(diff: &ColumnDiff, ignore_case: bool) -> String {
    if ignore_case {
        diff.key().to_lowercase()
    } else {
        diff.key()
    }
}

/// Pulls out the column alterations present in both diffs.
fn detect_conflicts(
    forward: &mut SchemaDiffResult,
    backward: &mut SchemaDiffResult,
    ignore_case: bool,
) -> Vec<SyncConflict> {
    let backward_alters: HashMap<String, &ColumnDiff> = backward
        .column_diffs
        .iter()
        .filter(|c| c.action == DiffAction::Alter)
        .map(|c| (conflict_key(c, ignore_case), c))
        .collect();

    let conflicts: Vec<SyncConflict> = forward
        .column_diffs
        .iter()
        .filter(|c| c.action == DiffAction::Alter)
        .filter_map(|entity_to_db| {
            let db_to_entity = backward_alters.get(&conflict_key(entity_to_db, ignore_case))?;
            Some(SyncConflict {
                table: entity_to_db.table.clone(),
                column: entity_to_db.column.clone(),
                description: describe_conflict(entity_to_db, db_to_entity),
                entity_to_db: entity_to_db.clone(),
                db_to_entity: (*db_to_entity).clone(),
            })
        })
        .collect();

    if conflicts.is_empty() {
        return conflicts;
    }

    let keys: Vec<String> = conflicts
        .iter()
        .map(|c| conflict_key(&c.entity_to_db, ignore_case))
        .collect();
    let keep = |c: &ColumnDiff| {
        c.action != DiffAction::Alter || !keys.contains(&conflict_key(c, ignore_case))
    };
    forward.retain_column_diffs(keep);
    backward.retain_column_diffs(keep);
    conflicts
}

fn describe_conflict(entity_to_db: &ColumnDiff, db_to_entity: &ColumnDiff) -> String {
    let render = |diff: &ColumnDiff| {
        diff.expected.as_ref().map_or_else(
            || "?".to_string(),
            |c| canonical_to_sql(&c.column_type, Dialect::Postgres),
        )
    };
    format!(
        "{}: entities declare {}, database has {}",
        entity_to_db.key(),
        render(entity_to_db),
        render(db_to_entity)
    )
}

fn render_summary(
    direction: SyncDirection,
    entity_to_db: Option<&SchemaDiffResult>,
    db_to_entity: Option<&SchemaDiffResult>,
    conflicts: &[SyncConflict],
) -> String {
    let mut out = format!("Direction: {direction}\n");
    for (label, diff) in [
        ("Entities -> database", entity_to_db),
        ("Database -> entities", db_to_entity),
    ] {
        let Some(diff) = diff else { continue };
        out.push_str(label);
        out.push_str(":\n");
        for line in diff.summary().lines() {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
    }
    if !conflicts.is_empty() {
        out.push_str(&format!("Conflicts ({}):\n", conflicts.len()));
        for conflict in conflicts {
            out.push_str("  ");
            out.push_str(&conflict.description);
            out.push('\n');
        }
    }
    out
}
