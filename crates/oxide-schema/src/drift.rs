//! Drift detection.
//!
//! Drift is any difference between the schema entities describe and the
//! schema a database actually has. The detector runs the differ with the
//! entity graph as the expected side and turns every diff entry into one
//! [`Drift`] with a fixed severity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::diff::{
    ColumnChangeKind, ColumnDiff, DiffAction, DiffOptions, IndexDiff, RelationshipDiff,
    SchemaDiffResult, SchemaDiffer,
};
use crate::error::Result;
use crate::graph::{ColumnNode, IndexNode, RelationshipNode, SchemaAst};
use crate::introspect::SchemaIntrospector;
use crate::types::{canonical_to_sql, Dialect};

/// Kind of drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    /// Table expected but absent.
    MissingTable,
    /// Table present but not expected.
    UnexpectedTable,
    /// Column expected but absent.
    MissingColumn,
    /// Column present but not expected.
    UnexpectedColumn,
    /// Column types differ.
    TypeMismatch,
    /// Nullability differs.
    NullableMismatch,
    /// UNIQUE constraint differs.
    UniqueMismatch,
    /// Auto-increment differs.
    AutoIncrementMismatch,
    /// Default values differ.
    DefaultMismatch,
    /// Index expected but absent.
    MissingIndex,
    /// Index present but not expected.
    UnexpectedIndex,
    /// Index definitions differ.
    IndexMismatch,
    /// Foreign key expected but absent.
    MissingForeignKey,
    /// Foreign key present but not expected.
    UnexpectedForeignKey,
    /// Foreign key actions differ.
    ForeignKeyMismatch,
}

impl DriftType {
    /// Snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingTable => "missing_table",
            Self::UnexpectedTable => "unexpected_table",
            Self::MissingColumn => "missing_column",
            Self::UnexpectedColumn => "unexpected_column",
            Self::TypeMismatch => "type_mismatch",
            Self::NullableMismatch => "nullable_mismatch",
            Self::UniqueMismatch => "unique_mismatch",
            Self::AutoIncrementMismatch => "auto_increment_mismatch",
            Self::DefaultMismatch => "default_mismatch",
            Self::MissingIndex => "missing_index",
            Self::UnexpectedIndex => "unexpected_index",
            Self::IndexMismatch => "index_mismatch",
            Self::MissingForeignKey => "missing_foreign_key",
            Self::UnexpectedForeignKey => "unexpected_foreign_key",
            Self::ForeignKeyMismatch => "foreign_key_mismatch",
        }
    }
}

impl fmt::Display for DriftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How serious a drift is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth knowing.
    Info,
    /// Should be looked at.
    Warning,
    /// Application likely broken.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

/// One detected discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Drift {
    /// Kind of drift.
    #[serde(rename = "type")]
    pub drift_type: DriftType,
    /// Severity.
    pub severity: Severity,
    /// Table concerned.
    pub table: String,
    /// Column concerned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Index concerned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Relationship concerned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    /// What the entities expect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// What the database has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    /// Human-readable description.
    pub details: String,
    /// Suggested fix.
    pub suggestion: String,
}

impl Drift {
    fn new(drift_type: DriftType, severity: Severity, table: impl Into<String>) -> Self {
        Self {
            drift_type,
            severity,
            table: table.into(),
            column: None,
            index: None,
            relationship: None,
            expected: None,
            actual: None,
            details: String::new(),
            suggestion: String::new(),
        }
    }

    fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    fn values(mut self, expected: Option<String>, actual: Option<String>) -> Self {
        self.expected = expected;
        self.actual = actual;
        self
    }

    fn describe(mut self, details: String, suggestion: &str) -> Self {
        self.details = details;
        self.suggestion = suggestion.to_string();
        self
    }
}

/// Overall drift status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    /// No drift.
    InSync,
    /// Drift without critical entries.
    Drifted,
    /// At least one critical drift.
    Critical,
}

/// Drift counts per severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DriftSummary {
    /// Critical drifts.
    pub critical: usize,
    /// Warnings.
    pub warning: usize,
    /// Informational drifts.
    pub info: usize,
    /// All drifts.
    pub total: usize,
}

/// Result of a drift check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    /// Overall status.
    pub status: DriftStatus,
    /// Detected drifts, in diff order.
    pub drifts: Vec<Drift>,
    /// Counts per severity.
    pub summary: DriftSummary,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
}

impl DriftReport {
    /// Builds a report from a list of drifts.
    #[must_use]
    pub fn new(drifts: Vec<Drift>) -> Self {
        let count = |severity: Severity| drifts.iter().filter(|d| d.severity == severity).count();
        let summary = DriftSummary {
            critical: count(Severity::Critical),
            warning: count(Severity::Warning),
            info: count(Severity::Info),
            total: drifts.len(),
        };
        let status = if summary.critical > 0 {
            DriftStatus::Critical
        } else if summary.total > 0 {
            DriftStatus::Drifted
        } else {
            DriftStatus::InSync
        };
        Self {
            status,
            drifts,
            summary,
            checked_at: Utc::now(),
        }
    }

    /// Returns `true` if no drift was found.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.status == DriftStatus::InSync
    }

    /// Drifts of the given severity.
    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Drift> {
        self.drifts.iter().filter(move |d| d.severity == severity)
    }

    /// Multi-line report grouped by severity, most severe first.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let status = match self.status {
            DriftStatus::InSync => "IN SYNC",
            DriftStatus::Drifted => "DRIFTED",
            DriftStatus::Critical => "CRITICAL",
        };
        out.push_str(&format!(
            "Schema drift report ({})\nStatus: {status}\n",
            self.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!(
            "Critical: {}, Warning: {}, Info: {}\n",
            self.summary.critical, self.summary.warning, self.summary.info
        ));

        for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
            let drifts: Vec<&Drift> = self.by_severity(severity).collect();
            if drifts.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{}:\n", severity.to_string().to_uppercase()));
            for drift in drifts {
                out.push_str(&format!("  [{}] {}\n", drift.drift_type, drift.details));
                if let (Some(expected), Some(actual)) = (&drift.expected, &drift.actual) {
                    out.push_str(&format!("      expected: {expected}, actual: {actual}\n"));
                }
                out.push_str(&format!("      fix: {}\n", drift.suggestion));
            }
        }
        out
    }
}

/// Drift detector options.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct DriftOptions {
    /// Report type mismatches.
    pub check_types: bool,
    /// Report nullability mismatches.
    pub check_nullable: bool,
    /// Report index drift.
    pub check_indexes: bool,
    /// Report foreign key drift.
    pub check_foreign_keys: bool,
    /// Report default value mismatches.
    pub check_defaults: bool,
    /// Dialect used to render types in reports.
    pub dialect: Dialect,
    /// Options passed to the differ.
    pub diff: DiffOptions,
}

impl Default for DriftOptions {
    fn default() -> Self {
        Self {
            check_types: true,
            check_nullable: true,
            check_indexes: true,
            check_foreign_keys: true,
            check_defaults: true,
            dialect: Dialect::default(),
            diff: DiffOptions::default(),
        }
    }
}

impl DriftOptions {
    /// Creates options with every check enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders types for the given dialect.
    #[must_use]
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Disables default value checks.
    #[must_use]
    pub const fn without_defaults(mut self) -> Self {
        self.check_defaults = false;
        self
    }

    /// Disables index checks.
    #[must_use]
    pub const fn without_indexes(mut self) -> Self {
        self.check_indexes = false;
        self
    }

    /// Disables foreign key checks.
    #[must_use]
    pub const fn without_foreign_keys(mut self) -> Self {
        self.check_foreign_keys = false;
        self
    }

    /// Uses custom differ options.
    #[must_use]
    pub fn with_diff_options(mut self, diff: DiffOptions) -> Self {
        self.diff = diff;
        self
    }
}

/// Classifies schema differences as drift.
#[derive(Debug, Clone, Default)]
pub struct DriftDetector {
    options: DriftOptions,
}

impl DriftDetector {
    /// Creates a detector with every check enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detector with custom options.
    #[must_use]
    pub const fn with_options(options: DriftOptions) -> Self {
        Self { options }
    }

    /// Compares the expected schema with the actual one.
    #[must_use]
    pub fn detect(&self, expected: &SchemaAst, actual: &SchemaAst) -> DriftReport {
        let diff_options = self
            .options
            .diff
            .clone()
            .with_indexes(self.options.diff.compare_indexes && self.options.check_indexes)
            .with_relationships(
                self.options.diff.compare_relationships && self.options.check_foreign_keys,
            );
        let diff = SchemaDiffer::with_options(diff_options).diff(expected, actual);
        self.from_diff(&diff)
    }

    /// Introspects the database and compares it with the expected schema.
    ///
    /// # Errors
    ///
    /// Propagates introspection errors.
    pub async fn detect_database(
        &self,
        expected: &SchemaAst,
        introspector: &dyn SchemaIntrospector,
    ) -> Result<DriftReport> {
        let actual = introspector.introspect().await?;
        let report = self.detect(expected, &actual);
        info!(
            critical = report.summary.critical,
            warning = report.summary.warning,
            info = report.summary.info,
            "Drift check finished"
        );
        Ok(report)
    }

    /// Turns an existing diff into a report.
    #[must_use]
    pub fn from_diff(&self, diff: &SchemaDiffResult) -> DriftReport {
        let mut drifts = Vec::new();

        for table in &diff.tables_to_create {
            drifts.push(
                Drift::new(DriftType::MissingTable, Severity::Critical, &table.name).describe(
                    format!("Table '{}' is missing from the database", table.name),
                    "Create the table with a migration",
                ),
            );
        }
        for table in &diff.tables_to_drop {
            drifts.push(
                Drift::new(DriftType::UnexpectedTable, Severity::Warning, &table.name).describe(
                    format!("Table '{}' exists but no entity maps to it", table.name),
                    "Drop the table or add an entity for it",
                ),
            );
        }
        drifts.extend(diff.column_diffs.iter().filter_map(|c| self.column_drift(c)));
        if self.options.check_indexes {
            drifts.extend(diff.index_diffs.iter().map(index_drift));
        }
        if self.options.check_foreign_keys {
            drifts.extend(diff.relationship_diffs.iter().map(relationship_drift));
        }

        debug!(drifts = drifts.len(), "Classified schema differences");
        DriftReport::new(drifts)
    }

    fn render_type(&self, column: Option<&ColumnNode>) -> Option<String> {
        column.map(|c| canonical_to_sql(&c.column_type, self.options.dialect))
    }

    fn column_drift(&self, diff: &ColumnDiff) -> Option<Drift> {
        let key = diff.key();
        let base = |drift_type, severity| {
            Drift::new(drift_type, severity, &diff.table).column(&diff.column)
        };

        match diff.action {
            DiffAction::Create => Some(
                base(DriftType::MissingColumn, Severity::Critical)
                    .values(self.render_type(diff.expected.as_ref()), None)
                    .describe(
                        format!("Column '{key}' is missing from the database"),
                        "Add the column with a migration",
                    ),
            ),
            DiffAction::Drop => Some(
                base(DriftType::UnexpectedColumn, Severity::Warning)
                    .values(None, self.render_type(diff.actual.as_ref()))
                    .describe(
                        format!("Column '{key}' exists but is not declared on the entity"),
                        "Drop the column or declare it on the entity",
                    ),
            ),
            DiffAction::Alter => {
                let (expected, actual) = (diff.expected.as_ref()?, diff.actual.as_ref()?);
                let change = diff.changes.iter().copied().find(|change| match change {
                    ColumnChangeKind::Type => self.options.check_types,
                    ColumnChangeKind::Nullable => self.options.check_nullable,
                    ColumnChangeKind::Default => self.options.check_defaults,
                    ColumnChangeKind::Unique | ColumnChangeKind::AutoIncrement => true,
                })?;
                let drift = match change {
                    ColumnChangeKind::Type => {
                        let severity = if diff.is_breaking {
                            Severity::Critical
                        } else {
                            Severity::Warning
                        };
                        base(DriftType::TypeMismatch, severity)
                            .values(
                                self.render_type(Some(expected)),
                                self.render_type(Some(actual)),
                            )
                            .describe(
                                format!("Column '{key}' has a different type"),
                                if diff.is_breaking {
                                    "Migrate the column type; existing data may not fit"
                                } else {
                                    "Migrate the column type"
                                },
                            )
                    }
                    ColumnChangeKind::Nullable => {
                        base(DriftType::NullableMismatch, Severity::Warning)
                            .values(
                                Some(nullability(expected.nullable)),
                                Some(nullability(actual.nullable)),
                            )
                            .describe(
                                format!("Column '{key}' has a different nullability"),
                                "Alter the column's NULL constraint",
                            )
                    }
                    ColumnChangeKind::Unique => base(DriftType::UniqueMismatch, Severity::Warning)
                        .values(
                            Some(expected.is_unique.to_string()),
                            Some(actual.is_unique.to_string()),
                        )
                        .describe(
                            format!("Column '{key}' has a different UNIQUE constraint"),
                            "Add or drop the UNIQUE constraint",
                        ),
                    ColumnChangeKind::AutoIncrement => {
                        base(DriftType::AutoIncrementMismatch, Severity::Warning)
                            .values(
                                Some(expected.is_auto_increment.to_string()),
                                Some(actual.is_auto_increment.to_string()),
                            )
                            .describe(
                                format!("Column '{key}' has a different auto-increment setting"),
                                "Recreate the column with the expected auto-increment setting",
                            )
                    }
                    ColumnChangeKind::Default => base(DriftType::DefaultMismatch, Severity::Info)
                        .values(default_text(expected), default_text(actual))
                        .describe(
                            format!("Column '{key}' has a different default value"),
                            "Alter the column default",
                        ),
                };
                Some(drift)
            }
        }
    }
}

fn nullability(nullable: bool) -> String {
    if nullable { "NULL" } else { "NOT NULL" }.to_string()
}

fn default_text(column: &ColumnNode) -> Option<String> {
    Some(
        column
            .default_value
            .as_ref()
            .map_or_else(|| "none".to_string(), crate::types::DefaultValue::to_sql),
    )
}

fn index_signature(index: &IndexNode) -> String {
    format!(
        "{}({}){}",
        if index.unique { "UNIQUE " } else { "" },
        index.columns.join(", "),
        index
            .kind
            .as_ref()
            .map_or_else(String::new, |k| format!(" USING {k}"))
    )
}

fn index_drift(diff: &IndexDiff) -> Drift {
    let (drift_type, severity, details, suggestion) = match diff.action {
        DiffAction::Create => (
            DriftType::MissingIndex,
            Severity::Warning,
            format!("Index '{}' on '{}' is missing", diff.index, diff.table),
            "Create the index",
        ),
        DiffAction::Drop => (
            DriftType::UnexpectedIndex,
            Severity::Info,
            format!("Index '{}' on '{}' is not declared", diff.index, diff.table),
            "Drop the index or declare it on the entity",
        ),
        DiffAction::Alter => (
            DriftType::IndexMismatch,
            Severity::Warning,
            format!("Index '{}' on '{}' has a different definition", diff.index, diff.table),
            "Recreate the index",
        ),
    };
    let mut drift = Drift::new(drift_type, severity, &diff.table)
        .values(
            diff.expected.as_ref().map(index_signature),
            diff.actual.as_ref().map(index_signature),
        )
        .describe(details, suggestion);
    drift.index = Some(diff.index.clone());
    drift
}

fn relationship_signature(rel: &RelationshipNode) -> String {
    format!(
        "{} ON DELETE {} ON UPDATE {}",
        rel.path(),
        rel.effective_on_delete().as_sql(),
        rel.effective_on_update().as_sql()
    )
}

fn relationship_drift(diff: &RelationshipDiff) -> Drift {
    let (drift_type, severity, details, suggestion) = match diff.action {
        DiffAction::Create => (
            DriftType::MissingForeignKey,
            Severity::Warning,
            format!("Foreign key '{}' is missing", diff.name),
            "Add the foreign key constraint",
        ),
        DiffAction::Drop => (
            DriftType::UnexpectedForeignKey,
            Severity::Info,
            format!("Foreign key '{}' is not declared by any relation", diff.name),
            "Drop the constraint or declare the relation",
        ),
        DiffAction::Alter => (
            DriftType::ForeignKeyMismatch,
            Severity::Warning,
            format!("Foreign key '{}' has different referential actions", diff.name),
            "Recreate the constraint with the expected actions",
        ),
    };
    let mut drift = Drift::new(drift_type, severity, diff.table())
        .values(
            diff.expected.as_ref().map(relationship_signature),
            diff.actual.as_ref().map(relationship_signature),
        )
        .describe(details, suggestion);
    drift.relationship = Some(diff.name.clone());
    drift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::blog;
    use crate::graph::{ColumnNode, ReferentialAction, TableNode};
    use crate::introspect::{ColumnSchema, StaticIntrospector, TableSchema};
    use crate::types::{CanonicalType, DefaultValue};

    fn priced(price: CanonicalType) -> SchemaAst {
        let mut schema = SchemaAst::new();
        schema
            .add_table(
                TableNode::new("products")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap()
                    .with_column(ColumnNode::new("price", price))
                    .unwrap(),
            )
            .unwrap();
        schema
    }

    #[test]
    fn test_in_sync() {
        let report = DriftDetector::new().detect(&blog(), &blog());
        assert_eq!(report.status, DriftStatus::InSync);
        assert!(report.is_in_sync());
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn test_decimal_type_mismatch_rendering() {
        let expected = priced(CanonicalType::decimal(10, 2));
        let actual = priced(CanonicalType::decimal(12, 4));
        let report = DriftDetector::new().detect(&expected, &actual);

        assert_eq!(report.drifts.len(), 1);
        let drift = &report.drifts[0];
        assert_eq!(drift.drift_type, DriftType::TypeMismatch);
        assert_eq!(drift.expected.as_deref(), Some("DECIMAL(10, 2)"));
        assert_eq!(drift.actual.as_deref(), Some("DECIMAL(12, 4)"));
        assert_eq!(drift.severity, Severity::Critical);
        assert_eq!(drift.column.as_deref(), Some("price"));
        assert_eq!(report.status, DriftStatus::Critical);
    }

    #[test]
    fn test_widening_type_is_a_warning() {
        let expected = priced(CanonicalType::decimal(12, 4));
        let actual = priced(CanonicalType::decimal(10, 2));
        let report = DriftDetector::new().detect(&expected, &actual);
        assert_eq!(report.drifts[0].severity, Severity::Warning);
        assert_eq!(report.status, DriftStatus::Drifted);
    }

    #[test]
    fn test_dialect_rendering() {
        let expected = priced(CanonicalType::integer().unsigned());
        let actual = priced(CanonicalType::big_integer());
        let report = DriftDetector::with_options(DriftOptions::new().with_dialect(Dialect::Mysql))
            .detect(&expected, &actual);
        assert_eq!(report.drifts[0].expected.as_deref(), Some("INTEGER UNSIGNED"));
        assert_eq!(report.drifts[0].actual.as_deref(), Some("BIGINT"));
    }

    #[test]
    fn test_table_and_column_severities() {
        let mut expected = blog();
        expected
            .table_mut("users")
            .unwrap()
            .add_column(ColumnNode::new("age", CanonicalType::integer()))
            .unwrap();
        let mut actual = blog();
        actual.remove_table("comments");
        actual
            .add_table(
                TableNode::new("audit_log")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()))
                    .unwrap(),
            )
            .unwrap();
        actual
            .table_mut("posts")
            .unwrap()
            .add_column(ColumnNode::new("legacy", CanonicalType::text()))
            .unwrap();

        let report = DriftDetector::new().detect(&expected, &actual);
        let kinds: Vec<(DriftType, Severity)> = report
            .drifts
            .iter()
            .map(|d| (d.drift_type, d.severity))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (DriftType::MissingTable, Severity::Critical),
                (DriftType::UnexpectedTable, Severity::Warning),
                (DriftType::MissingColumn, Severity::Critical),
                (DriftType::UnexpectedColumn, Severity::Warning),
                (DriftType::MissingForeignKey, Severity::Warning),
                (DriftType::MissingForeignKey, Severity::Warning),
            ]
        );
        assert_eq!(report.summary.critical, 2);
        assert_eq!(report.summary.warning, 4);
    }

    #[test]
    fn test_one_drift_per_column_by_priority() {
        let expected = priced(CanonicalType::decimal(10, 2));
        let mut actual = SchemaAst::new();
        actual
            .add_table(
                TableNode::new("products")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap()
                    .with_column(
                        ColumnNode::new("price", CanonicalType::decimal(12, 2))
                            .not_null()
                            .default(DefaultValue::Integer(0)),
                    )
                    .unwrap(),
            )
            .unwrap();

        let report = DriftDetector::new().detect(&expected, &actual);
        assert_eq!(report.drifts.len(), 1);
        assert_eq!(report.drifts[0].drift_type, DriftType::TypeMismatch);

        let options = DriftOptions {
            check_types: false,
            ..DriftOptions::default()
        };
        let report = DriftDetector::with_options(options).detect(&expected, &actual);
        assert_eq!(report.drifts[0].drift_type, DriftType::NullableMismatch);
        assert_eq!(report.drifts[0].expected.as_deref(), Some("NULL"));
        assert_eq!(report.drifts[0].actual.as_deref(), Some("NOT NULL"));

        let options = DriftOptions {
            check_types: false,
            check_nullable: false,
            ..DriftOptions::default()
        };
        let report = DriftDetector::with_options(options).detect(&expected, &actual);
        assert_eq!(report.drifts[0].drift_type, DriftType::DefaultMismatch);
        assert_eq!(report.drifts[0].severity, Severity::Info);

        let options = DriftOptions {
            check_types: false,
            check_nullable: false,
            ..DriftOptions::default()
        }
        .without_defaults();
        let report = DriftDetector::with_options(options).detect(&expected, &actual);
        assert!(report.is_in_sync());
    }

    #[test]
    fn test_index_and_foreign_key_drift() {
        let expected = blog();
        let mut actual = blog();
        actual.table_mut("posts").unwrap().indexes.clear();
        let mut rel = actual.remove_relationship("fk_comments_post_id").unwrap();
        rel.on_delete = Some(ReferentialAction::Cascade);
        actual.add_relationship(rel).unwrap();

        let report = DriftDetector::new().detect(&expected, &actual);
        let kinds: Vec<DriftType> = report.drifts.iter().map(|d| d.drift_type).collect();
        assert_eq!(kinds, vec![DriftType::MissingIndex, DriftType::ForeignKeyMismatch]);
        assert_eq!(report.drifts[1].table, "comments");
        assert_eq!(
            report.drifts[1].actual.as_deref(),
            Some("comments.post_id -> posts.id ON DELETE CASCADE ON UPDATE NO ACTION")
        );

        let report = DriftDetector::with_options(
            DriftOptions::new().without_indexes().without_foreign_keys(),
        )
        .detect(&expected, &actual);
        assert!(report.is_in_sync());
    }

    #[test]
    fn test_render_groups_by_severity() {
        let expected = priced(CanonicalType::decimal(10, 2));
        let mut actual = priced(CanonicalType::decimal(12, 4));
        actual
            .add_index("products", IndexNode::new("idx_products_price", vec!["price".into()]))
            .unwrap();
        let text = DriftDetector::new().detect(&expected, &actual).render();
        assert!(text.contains("Status: CRITICAL"));
        assert!(text.contains(
            "CRITICAL:\n  [type_mismatch] Column 'products.price' has a different type"
        ));
        assert!(text.contains("expected: DECIMAL(10, 2), actual: DECIMAL(12, 4)"));
        assert!(text.contains("INFO:\n  [unexpected_index]"));
        assert!(!text.contains("WARNING:"));
    }

    #[tokio::test]
    async fn test_detect_database() {
        let introspector = StaticIntrospector::new(vec![TableSchema::new("products")
            .column(ColumnSchema::new("id", "INTEGER").primary_key())
            .column(ColumnSchema::new("price", "NUMERIC(12,4)"))]);
        let expected = priced(CanonicalType::decimal(10, 2));
        let report = DriftDetector::new()
            .detect_database(&expected, &introspector)
            .await
            .unwrap();
        assert_eq!(report.drifts.len(), 1);
        assert_eq!(report.drifts[0].actual.as_deref(), Some("DECIMAL(12, 4)"));
    }
}
