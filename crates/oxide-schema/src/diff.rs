//! Structural differ.
//!
//! Compares two [`SchemaAst`] graphs. The first argument is the desired
//! (expected) schema, the second the current (actual) one; every diff
//! entry describes what would have to happen to the actual schema for it
//! to match the desired one.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::graph::{ColumnNode, IndexNode, RelationshipNode, SchemaAst, TableNode};
use crate::types::{are_types_equal, is_breaking_type_change};

/// Options for the differ.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Compare table, column and index names case-insensitively.
    pub ignore_case: bool,
    /// Tables left out of the comparison.
    pub exclude_tables: Vec<String>,
    /// Compare indexes.
    pub compare_indexes: bool,
    /// Compare relationships.
    pub compare_relationships: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffOptions {
    /// Creates default options: case-sensitive, indexes and relationships compared.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ignore_case: false,
            exclude_tables: Vec::new(),
            compare_indexes: true,
            compare_relationships: true,
        }
    }

    /// Enables case-insensitive name matching.
    #[must_use]
    pub const fn with_ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Excludes tables from the comparison.
    #[must_use]
    pub fn with_excluded_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tables.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Sets whether indexes are compared.
    #[must_use]
    pub const fn with_indexes(mut self, enabled: bool) -> Self {
        self.compare_indexes = enabled;
        self
    }

    /// Sets whether relationships are compared.
    #[must_use]
    pub const fn with_relationships(mut self, enabled: bool) -> Self {
        self.compare_relationships = enabled;
        self
    }
}

/// What has to happen to an element of the actual schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    /// Present only in the desired schema.
    Create,
    /// Present only in the actual schema.
    Drop,
    /// Present in both, but different.
    Alter,
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Drop => "drop",
            Self::Alter => "alter",
        })
    }
}

/// Column property that differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnChangeKind {
    /// Column type.
    Type,
    /// Nullability.
    Nullable,
    /// UNIQUE constraint.
    Unique,
    /// Auto-increment flag.
    AutoIncrement,
    /// Default value, after normalization.
    Default,
}

/// A column-level difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDiff {
    /// Table name (as spelled in the desired schema when present in both).
    pub table: String,
    /// Column name.
    pub column: String,
    /// Required action.
    pub action: DiffAction,
    /// Column in the desired schema.
    pub expected: Option<ColumnNode>,
    /// Column in the actual schema.
    pub actual: Option<ColumnNode>,
    /// Differing properties, for alterations.
    pub changes: Vec<ColumnChangeKind>,
    /// Applying the change could lose data.
    pub is_breaking: bool,
}

impl ColumnDiff {
    /// `table.column`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}.{}", self.table, self.column)
    }
}

/// An index-level difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDiff {
    /// Table name.
    pub table: String,
    /// Index name.
    pub index: String,
    /// Required action.
    pub action: DiffAction,
    /// Index in the desired schema.
    pub expected: Option<IndexNode>,
    /// Index in the actual schema.
    pub actual: Option<IndexNode>,
}

/// A relationship-level difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDiff {
    /// Relationship name, from the desired schema when available.
    pub name: String,
    /// Required action.
    pub action: DiffAction,
    /// Relationship in the desired schema.
    pub expected: Option<RelationshipNode>,
    /// Relationship in the actual schema.
    pub actual: Option<RelationshipNode>,
}

impl RelationshipDiff {
    /// Source table of the relationship.
    #[must_use]
    pub fn table(&self) -> &str {
        self.expected
            .as_ref()
            .or(self.actual.as_ref())
            .map_or("", |r| r.from.table.as_str())
    }
}

/// Alterations of one table present in both schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDiff {
    /// Table name.
    pub table: String,
    /// Column differences.
    pub columns: Vec<ColumnDiff>,
    /// Index differences.
    pub indexes: Vec<IndexDiff>,
}

impl TableDiff {
    /// Returns `true` if the table has no differences left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.indexes.is_empty()
    }
}

/// Created/dropped/altered counts of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiffCounts {
    /// Tables, columns, indexes and relationships to create.
    pub created: usize,
    /// Tables, columns, indexes and relationships to drop.
    pub dropped: usize,
    /// Columns, indexes and relationships to alter.
    pub altered: usize,
}

/// Result of comparing two schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiffResult {
    /// Tables to create, dependencies first.
    pub tables_to_create: Vec<TableNode>,
    /// Tables to drop, dependents first.
    pub tables_to_drop: Vec<TableNode>,
    /// Per-table alterations.
    pub table_diffs: Vec<TableDiff>,
    /// All column differences.
    pub column_diffs: Vec<ColumnDiff>,
    /// All index differences.
    pub index_diffs: Vec<IndexDiff>,
    /// Relationship differences.
    pub relationship_diffs: Vec<RelationshipDiff>,
    /// Anything differs at all.
    pub has_differences: bool,
    /// A table drop or a breaking column change is present.
    pub has_breaking_changes: bool,
}

impl SchemaDiffResult {
    fn empty() -> Self {
        Self {
            tables_to_create: Vec::new(),
            tables_to_drop: Vec::new(),
            table_diffs: Vec::new(),
            column_diffs: Vec::new(),
            index_diffs: Vec::new(),
            relationship_diffs: Vec::new(),
            has_differences: false,
            has_breaking_changes: false,
        }
    }

    /// Recomputes the aggregate flags and drops empty table diffs.
    pub fn refresh(&mut self) {
        self.table_diffs.retain(|t| !t.is_empty());
        self.has_differences = !self.tables_to_create.is_empty()
            || !self.tables_to_drop.is_empty()
            || !self.column_diffs.is_empty()
            || !self.index_diffs.is_empty()
            || !self.relationship_diffs.is_empty();
        self.has_breaking_changes =
            !self.tables_to_drop.is_empty() || self.column_diffs.iter().any(|c| c.is_breaking);
    }

    /// Keeps only the column differences matching `keep`, in both the flat
    /// list and the per-table diffs.
    pub fn retain_column_diffs(&mut self, mut keep: impl FnMut(&ColumnDiff) -> bool) {
        self.column_diffs.retain(|c| keep(c));
        for table in &mut self.table_diffs {
            table.columns.retain(|c| keep(c));
        }
        self.refresh();
    }

    /// Removes every drop: tables, columns, indexes and relationships.
    pub fn remove_destructive(&mut self) {
        self.tables_to_drop.clear();
        self.index_diffs.retain(|i| i.action != DiffAction::Drop);
        for table in &mut self.table_diffs {
            table.indexes.retain(|i| i.action != DiffAction::Drop);
        }
        self.relationship_diffs.retain(|r| r.action != DiffAction::Drop);
        self.retain_column_diffs(|c| c.action != DiffAction::Drop);
    }

    /// Counts per action.
    #[must_use]
    pub fn counts(&self) -> DiffCounts {
        let mut counts = DiffCounts {
            created: self.tables_to_create.len(),
            dropped: self.tables_to_drop.len(),
            altered: 0,
        };
        let actions = self
            .column_diffs
            .iter()
            .map(|c| c.action)
            .chain(self.index_diffs.iter().map(|i| i.action))
            .chain(self.relationship_diffs.iter().map(|r| r.action));
        for action in actions {
            match action {
                DiffAction::Create => counts.created += 1,
                DiffAction::Drop => counts.dropped += 1,
                DiffAction::Alter => counts.altered += 1,
            }
        }
        counts
    }

    /// One-paragraph human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.has_differences {
            return "Schemas are identical.".to_string();
        }
        let count = |action: DiffAction| {
            (
                self.column_diffs.iter().filter(|c| c.action == action).count(),
                self.index_diffs.iter().filter(|i| i.action == action).count(),
                self.relationship_diffs
                    .iter()
                    .filter(|r| r.action == action)
                    .count(),
            )
        };
        let mut lines = Vec::new();
        if !self.tables_to_create.is_empty() {
            let names: Vec<&str> = self.tables_to_create.iter().map(|t| t.name.as_str()).collect();
            lines.push(format!("Tables to create: {}", names.join(", ")));
        }
        if !self.tables_to_drop.is_empty() {
            let names: Vec<&str> = self.tables_to_drop.iter().map(|t| t.name.as_str()).collect();
            lines.push(format!("Tables to drop: {}", names.join(", ")));
        }
        for (label, action) in [
            ("added", DiffAction::Create),
            ("dropped", DiffAction::Drop),
            ("altered", DiffAction::Alter),
        ] {
            let (columns, indexes, relationships) = count(action);
            if columns + indexes + relationships > 0 {
                lines.push(format!(
                    "Columns {label}: {columns}, indexes {label}: {indexes}, \
                     relationships {label}: {relationships}"
                ));
            }
        }
        if self.has_breaking_changes {
            lines.push("WARNING: contains breaking changes".to_string());
        }
        lines.join("\n")
    }
}

/// Compares schema graphs.
#[derive(Debug, Clone, Default)]
pub struct SchemaDiffer {
    options: DiffOptions,
}

impl SchemaDiffer {
    /// Creates a differ with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a differ with custom options.
    #[must_use]
    pub const fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &DiffOptions {
        &self.options
    }

    fn key(&self, name: &str) -> String {
        if self.options.ignore_case {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn is_excluded(&self, table: &str) -> bool {
        let key = self.key(table);
        self.options.exclude_tables.iter().any(|t| self.key(t) == key)
    }

    fn tables_by_key<'a>(&self, schema: &'a SchemaAst) -> HashMap<String, &'a TableNode> {
        schema
            .tables()
            .iter()
            .filter(|t| !self.is_excluded(&t.name))
            .map(|t| (self.key(&t.name), t))
            .collect()
    }

    /// Compares `source` (desired) against `target` (actual).
    #[must_use]
    pub fn diff(&self, source: &SchemaAst, target: &SchemaAst) -> SchemaDiffResult {
        let source_tables = self.tables_by_key(source);
        let target_tables = self.tables_by_key(target);
        let mut result = SchemaDiffResult::empty();

        for name in source.create_order() {
            let key = self.key(&name);
            if let Some(table) = source_tables.get(&key) {
                if !target_tables.contains_key(&key) {
                    result.tables_to_create.push((*table).clone());
                }
            }
        }
        for name in target.drop_order() {
            let key = self.key(&name);
            if let Some(table) = target_tables.get(&key) {
                if !source_tables.contains_key(&key) {
                    result.tables_to_drop.push((*table).clone());
                }
            }
        }

        for table in source.tables() {
            let key = self.key(&table.name);
            let (Some(expected), Some(actual)) = (source_tables.get(&key), target_tables.get(&key))
            else {
                continue;
            };
            let table_diff = self.diff_table(expected, actual);
            if !table_diff.is_empty() {
                result.column_diffs.extend(table_diff.columns.iter().cloned());
                result.index_diffs.extend(table_diff.indexes.iter().cloned());
                result.table_diffs.push(table_diff);
            }
        }

        if self.options.compare_relationships {
            result.relationship_diffs = self.diff_relationships(source, target);
        }

        result.refresh();
        result
    }

    fn diff_table(&self, expected: &TableNode, actual: &TableNode) -> TableDiff {
        let mut columns = Vec::new();
        let actual_columns: HashMap<String, &ColumnNode> = actual
            .columns()
            .iter()
            .map(|c| (self.key(&c.name), c))
            .collect();
        let mut matched = HashSet::new();

        for column in expected.columns() {
            let key = self.key(&column.name);
            match actual_columns.get(&key) {
                None => columns.push(ColumnDiff {
                    table: expected.name.clone(),
                    column: column.name.clone(),
                    action: DiffAction::Create,
                    expected: Some(column.clone()),
                    actual: None,
                    changes: Vec::new(),
                    is_breaking: false,
                }),
                Some(current) => {
                    matched.insert(key);
                    let changes = column_changes(column, current);
                    if changes.is_empty() {
                        continue;
                    }
                    let is_breaking = changes.contains(&ColumnChangeKind::Type)
                        && is_breaking_type_change(&current.column_type, &column.column_type);
                    columns.push(ColumnDiff {
                        table: expected.name.clone(),
                        column: column.name.clone(),
                        action: DiffAction::Alter,
                        expected: Some(column.clone()),
                        actual: Some((*current).clone()),
                        changes,
                        is_breaking,
                    });
                }
            }
        }

        for column in actual.columns() {
            if !matched.contains(&self.key(&column.name)) {
                columns.push(ColumnDiff {
                    table: expected.name.clone(),
                    column: column.name.clone(),
                    action: DiffAction::Drop,
                    expected: None,
                    actual: Some(column.clone()),
                    changes: Vec::new(),
                    is_breaking: true,
                });
            }
        }

        let indexes = if self.options.compare_indexes {
            self.diff_indexes(expected, actual)
        } else {
            Vec::new()
        };

        TableDiff {
            table: expected.name.clone(),
            columns,
            indexes,
        }
    }

    fn diff_indexes(&self, expected: &TableNode, actual: &TableNode) -> Vec<IndexDiff> {
        let mut diffs = Vec::new();
        let actual_indexes: HashMap<String, &IndexNode> = actual
            .indexes
            .iter()
            .map(|i| (self.key(&i.name), i))
            .collect();
        let expected_keys: HashSet<String> =
            expected.indexes.iter().map(|i| self.key(&i.name)).collect();

        for index in &expected.indexes {
            let entry = match actual_indexes.get(&self.key(&index.name)) {
                None => Some((DiffAction::Create, None)),
                Some(current) if !self.same_index(index, current) => {
                    Some((DiffAction::Alter, Some((*current).clone())))
                }
                Some(_) => None,
            };
            if let Some((action, actual)) = entry {
                diffs.push(IndexDiff {
                    table: expected.name.clone(),
                    index: index.name.clone(),
                    action,
                    expected: Some(index.clone()),
                    actual,
                });
            }
        }
        for index in &actual.indexes {
            if !expected_keys.contains(&self.key(&index.name)) {
                diffs.push(IndexDiff {
                    table: expected.name.clone(),
                    index: index.name.clone(),
                    action: DiffAction::Drop,
                    expected: None,
                    actual: Some(index.clone()),
                });
            }
        }
        diffs
    }

    fn same_index(&self, a: &IndexNode, b: &IndexNode) -> bool {
        let columns = |index: &IndexNode| {
            let mut cols: Vec<String> = index.columns.iter().map(|c| self.key(c)).collect();
            cols.sort();
            cols
        };
        let kind = |index: &IndexNode| {
            index
                .kind
                .as_deref()
                .map_or_else(|| "btree".to_string(), str::to_lowercase)
        };
        a.unique == b.unique && columns(a) == columns(b) && kind(a) == kind(b)
    }

    fn relationship_key(&self, rel: &RelationshipNode) -> String {
        self.key(&rel.signature())
    }

    fn relationship_in_scope(&self, rel: &RelationshipNode) -> bool {
        !self.is_excluded(&rel.from.table) && !self.is_excluded(&rel.to.table)
    }

    fn diff_relationships(&self, source: &SchemaAst, target: &SchemaAst) -> Vec<RelationshipDiff> {
        let mut diffs = Vec::new();
        let actual: HashMap<String, &RelationshipNode> = target
            .relationships()
            .iter()
            .filter(|r| self.relationship_in_scope(r))
            .map(|r| (self.relationship_key(r), r))
            .collect();
        let mut matched = HashSet::new();

        for rel in source
            .relationships()
            .iter()
            .filter(|r| self.relationship_in_scope(r))
        {
            let key = self.relationship_key(rel);
            match actual.get(&key) {
                None => diffs.push(RelationshipDiff {
                    name: rel.name.clone(),
                    action: DiffAction::Create,
                    expected: Some(rel.clone()),
                    actual: None,
                }),
                Some(current) => {
                    matched.insert(key);
                    if rel.effective_on_delete() != current.effective_on_delete()
                        || rel.effective_on_update() != current.effective_on_update()
                    {
                        diffs.push(RelationshipDiff {
                            name: rel.name.clone(),
                            action: DiffAction::Alter,
                            expected: Some(rel.clone()),
                            actual: Some((*current).clone()),
                        });
                    }
                }
            }
        }

        for rel in target
            .relationships()
            .iter()
            .filter(|r| self.relationship_in_scope(r))
        {
            if !matched.contains(&self.relationship_key(rel)) {
                diffs.push(RelationshipDiff {
                    name: rel.name.clone(),
                    action: DiffAction::Drop,
                    expected: None,
                    actual: Some(rel.clone()),
                });
            }
        }
        diffs
    }
}

fn default_key(column: &ColumnNode) -> Option<String> {
    column
        .default_value
        .as_ref()
        .map(crate::types::DefaultValue::normalized)
        .filter(|v| !v.eq_ignore_ascii_case("null"))
}

fn column_changes(expected: &ColumnNode, actual: &ColumnNode) -> Vec<ColumnChangeKind> {
    let mut changes = Vec::new();
    if !are_types_equal(&expected.column_type, &actual.column_type) {
        changes.push(ColumnChangeKind::Type);
    }
    if expected.nullable != actual.nullable {
        changes.push(ColumnChangeKind::Nullable);
    }
    if expected.is_unique != actual.is_unique {
        changes.push(ColumnChangeKind::Unique);
    }
    if expected.is_auto_increment != actual.is_auto_increment {
        changes.push(ColumnChangeKind::AutoIncrement);
    }
    if default_key(expected) != default_key(actual) {
        changes.push(ColumnChangeKind::Default);
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{blog, fk};
    use crate::graph::{ReferentialAction, TableNode};
    use crate::types::{CanonicalType, DefaultValue};

    fn alter_column(schema: &mut SchemaAst, table: &str, column: ColumnNode) {
        let node = schema.table(table).unwrap();
        let mut rebuilt = TableNode::new(table);
        for existing in node.columns() {
            if existing.name == column.name {
                rebuilt.add_column(column.clone()).unwrap();
            } else {
                rebuilt.add_column(existing.clone()).unwrap();
            }
        }
        rebuilt.indexes.clone_from(&node.indexes);
        let relationships: Vec<RelationshipNode> = schema
            .relationships()
            .iter()
            .filter(|r| r.from.table == table || r.to.table == table)
            .cloned()
            .collect();
        schema.remove_table(table);
        schema.add_table(rebuilt).unwrap();
        for rel in relationships {
            schema.add_relationship(rel).unwrap();
        }
    }

    #[test]
    fn test_identical_graphs() {
        let a = blog();
        let result = SchemaDiffer::new().diff(&a, &a);
        assert!(!result.has_differences);
        assert!(!result.has_breaking_changes);

        let result = SchemaDiffer::new().diff(&a, &a.clone());
        assert!(!result.has_differences);
        assert_eq!(result.summary(), "Schemas are identical.");
    }

    #[test]
    fn test_tables_to_create_and_drop_are_ordered() {
        let desired = blog();
        let empty = SchemaAst::new();

        let result = SchemaDiffer::new().diff(&desired, &empty);
        let created: Vec<&str> = result.tables_to_create.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(created, vec!["users", "posts", "comments"]);
        assert_eq!(result.relationship_diffs.len(), 3);
        assert!(!result.has_breaking_changes);

        let result = SchemaDiffer::new().diff(&empty, &desired);
        let dropped: Vec<&str> = result.tables_to_drop.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(dropped, vec!["comments", "posts", "users"]);
        assert!(result.has_breaking_changes);
    }

    #[test]
    fn test_column_add_and_drop() {
        let desired = blog();
        let mut actual = blog();
        actual
            .table_mut("users")
            .unwrap()
            .add_column(ColumnNode::new("legacy", CanonicalType::integer()))
            .unwrap();
        actual
            .table_mut("posts")
            .unwrap()
            .add_column(ColumnNode::new("slug", CanonicalType::string(None)))
            .unwrap();

        let result = SchemaDiffer::new().diff(&actual, &desired);
        assert_eq!(result.column_diffs.len(), 2);
        assert!(result.column_diffs.iter().all(|c| c.action == DiffAction::Create));
        assert!(!result.has_breaking_changes);

        let result = SchemaDiffer::new().diff(&desired, &actual);
        assert_eq!(result.column_diffs.len(), 2);
        assert!(result
            .column_diffs
            .iter()
            .all(|c| c.action == DiffAction::Drop && c.is_breaking));
        assert!(result.has_breaking_changes);
        assert_eq!(result.table_diffs.len(), 2);
    }

    #[test]
    fn test_breaking_type_change_direction() {
        let mut desired = blog();
        alter_column(
            &mut desired,
            "posts",
            ColumnNode::new("title", CanonicalType::string(Some(100))),
        );
        let actual = blog();

        // actual VARCHAR(200) -> desired VARCHAR(100) truncates
        let result = SchemaDiffer::new().diff(&desired, &actual);
        assert_eq!(result.column_diffs.len(), 1);
        let diff = &result.column_diffs[0];
        assert_eq!(diff.action, DiffAction::Alter);
        assert_eq!(diff.changes, vec![ColumnChangeKind::Type]);
        assert!(diff.is_breaking);
        assert!(result.has_breaking_changes);

        // the other way round only widens
        let result = SchemaDiffer::new().diff(&actual, &desired);
        assert!(!result.column_diffs[0].is_breaking);
        assert!(!result.has_breaking_changes);
        assert!(result.has_differences);
    }

    #[test]
    fn test_default_normalization() {
        let mut desired = blog();
        alter_column(
            &mut desired,
            "posts",
            ColumnNode::new("title", CanonicalType::string(Some(200)))
                .default(DefaultValue::expression("now()")),
        );
        let mut actual = blog();
        alter_column(
            &mut actual,
            "posts",
            ColumnNode::new("title", CanonicalType::string(Some(200)))
                .default(DefaultValue::expression("CURRENT_TIMESTAMP")),
        );
        assert!(!SchemaDiffer::new().diff(&desired, &actual).has_differences);

        let mut other = blog();
        alter_column(
            &mut other,
            "posts",
            ColumnNode::new("title", CanonicalType::string(Some(200)))
                .default(DefaultValue::String("draft".to_string())),
        );
        let result = SchemaDiffer::new().diff(&desired, &other);
        assert_eq!(result.column_diffs[0].changes, vec![ColumnChangeKind::Default]);
        assert!(!result.column_diffs[0].is_breaking);
    }

    #[test]
    fn test_nullable_and_unique_changes() {
        let mut desired = blog();
        alter_column(
            &mut desired,
            "users",
            ColumnNode::new("email", CanonicalType::string(None)).not_null(),
        );
        let result = SchemaDiffer::new().diff(&desired, &blog());
        assert_eq!(
            result.column_diffs[0].changes,
            vec![ColumnChangeKind::Nullable, ColumnChangeKind::Unique]
        );
    }

    #[test]
    fn test_index_diffs() {
        let desired = blog();
        let mut actual = blog();
        let users = actual.table_mut("users").unwrap();
        users.indexes[0].unique = false;
        let posts = actual.table_mut("posts").unwrap();
        posts.indexes.clear();
        actual
            .add_index("comments", IndexNode::new("idx_comments_body", vec!["body".into()]))
            .unwrap();

        let result = SchemaDiffer::new().diff(&desired, &actual);
        let summary: Vec<(&str, DiffAction)> = result
            .index_diffs
            .iter()
            .map(|i| (i.index.as_str(), i.action))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("idx_users_email", DiffAction::Alter),
                ("idx_posts_title", DiffAction::Create),
                ("idx_comments_body", DiffAction::Drop),
            ]
        );

        let result = SchemaDiffer::with_options(DiffOptions::new().with_indexes(false))
            .diff(&desired, &actual);
        assert!(!result.has_differences);
    }

    #[test]
    fn test_index_column_order_and_default_kind() {
        let mut desired = blog();
        desired
            .add_index(
                "comments",
                IndexNode::new("idx_c", vec!["post_id".into(), "user_id".into()]).kind("BTREE"),
            )
            .unwrap();
        let mut actual = blog();
        actual
            .add_index(
                "comments",
                IndexNode::new("idx_c", vec!["user_id".into(), "post_id".into()]),
            )
            .unwrap();
        assert!(!SchemaDiffer::new().diff(&desired, &actual).has_differences);
    }

    #[test]
    fn test_relationships_matched_by_signature() {
        let desired = blog();
        let mut actual = blog();
        let mut renamed = actual.remove_relationship("fk_posts_author_id").unwrap();
        renamed.name = "posts_author_fkey".to_string();
        renamed.on_delete = Some(ReferentialAction::NoAction);
        actual.add_relationship(renamed).unwrap();
        assert!(!SchemaDiffer::new().diff(&desired, &actual).has_differences);

        let mut cascading = blog();
        let mut rel = cascading.remove_relationship("fk_comments_post_id").unwrap();
        rel.on_delete = Some(ReferentialAction::Cascade);
        cascading.add_relationship(rel).unwrap();
        let result = SchemaDiffer::new().diff(&cascading, &desired);
        assert_eq!(result.relationship_diffs.len(), 1);
        assert_eq!(result.relationship_diffs[0].action, DiffAction::Alter);
        assert_eq!(result.relationship_diffs[0].table(), "comments");
    }

    #[test]
    fn test_relationship_create_and_drop() {
        let desired = blog();
        let mut actual = blog();
        actual.remove_relationship("fk_comments_user_id");
        actual
            .add_relationship(fk("fk_posts_title", "posts", "title", "users", "email"))
            .unwrap();
        let result = SchemaDiffer::new().diff(&desired, &actual);
        let actions: Vec<(&str, DiffAction)> = result
            .relationship_diffs
            .iter()
            .map(|r| (r.name.as_str(), r.action))
            .collect();
        assert_eq!(
            actions,
            vec![
                ("fk_comments_user_id", DiffAction::Create),
                ("fk_posts_title", DiffAction::Drop),
            ]
        );
        assert!(!result.has_breaking_changes);
    }

    #[test]
    fn test_ignore_case_and_exclusions() {
        let desired = blog();
        let mut actual = SchemaAst::new();
        for table in blog().tables() {
            let mut upper = TableNode::new(table.name.to_uppercase());
            for column in table.columns() {
                let mut column = column.clone();
                column.name = column.name.to_uppercase();
                upper.add_column(column).unwrap();
            }
            actual.add_table(upper).unwrap();
        }

        let options = DiffOptions::new()
            .with_ignore_case()
            .with_indexes(false)
            .with_relationships(false);
        assert!(!SchemaDiffer::with_options(options).diff(&desired, &actual).has_differences);

        let result = SchemaDiffer::new().diff(&desired, &actual);
        assert_eq!(result.tables_to_create.len(), 3);
        assert_eq!(result.tables_to_drop.len(), 3);

        let options = DiffOptions::new().with_excluded_tables(["comments"]);
        let mut partial = blog();
        partial.remove_table("comments");
        assert!(!SchemaDiffer::with_options(options).diff(&desired, &partial).has_differences);
    }

    #[test]
    fn test_remove_destructive_and_counts() {
        let desired = SchemaAst::new();
        let mut result = SchemaDiffer::new().diff(&desired, &blog());
        assert_eq!(
            result.counts(),
            DiffCounts {
                created: 0,
                dropped: 6,
                altered: 0,
            }
        );
        result.remove_destructive();
        assert!(!result.has_differences);
        assert!(!result.has_breaking_changes);
    }
}
