//! Turns a schema diff into an ordered list of migration operations.

use std::collections::HashSet;

use tracing::debug;

use crate::diff::{DiffAction, SchemaDiffResult};

use super::operation::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, MigrationOperation, TableDefinition,
};

/// Plans the operations that move the actual schema of `diff` to the
/// desired one.
///
/// Order: drop foreign keys, drop indexes, create tables (dependencies
/// first), add and alter columns, drop columns, drop tables (dependents
/// first), create indexes, add foreign keys. Foreign keys declared by a
/// table being created are folded into its CREATE TABLE, and constraints
/// of tables being dropped are not dropped separately.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn plan_migration(diff: &SchemaDiffResult) -> Vec<MigrationOperation> {
    let created: HashSet<&str> = diff
        .tables_to_create
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    let dropped: HashSet<&str> = diff.tables_to_drop.iter().map(|t| t.name.as_str()).collect();

    let mut operations = Vec::new();

    // Drop foreign keys.
    for rel in &diff.relationship_diffs {
        if !matches!(rel.action, DiffAction::Drop | DiffAction::Alter) {
            continue;
        }
        let Some(actual) = &rel.actual else { continue };
        if dropped.contains(actual.from.table.as_str()) {
            continue;
        }
        operations.push(MigrationOperation::DropForeignKey {
            table: actual.from.table.clone(),
            name: actual.name.clone(),
            definition: Some(ForeignKeyDefinition::from(actual)),
        });
    }

    // Drop indexes.
    for index in &diff.index_diffs {
        if !matches!(index.action, DiffAction::Drop | DiffAction::Alter) {
            continue;
        }
        let Some(actual) = &index.actual else { continue };
        operations.push(MigrationOperation::DropIndex {
            table: index.table.clone(),
            name: actual.name.clone(),
            definition: Some(IndexDefinition::from(actual)),
        });
    }

    // Create tables, with their outgoing foreign keys inline.
    for table in &diff.tables_to_create {
        let mut definition = TableDefinition::from(table);
        definition.foreign_keys = diff
            .relationship_diffs
            .iter()
            .filter(|r| r.action == DiffAction::Create)
            .filter_map(|r| r.expected.as_ref())
            .filter(|rel| rel.from.table == table.name)
            .map(ForeignKeyDefinition::from)
            .collect();
        operations.push(MigrationOperation::create_table(definition));
    }

    // Add and alter columns.
    for column in &diff.column_diffs {
        match (column.action, &column.expected) {
            (DiffAction::Create, Some(expected)) => operations.push(MigrationOperation::add_column(
                &column.table,
                ColumnDefinition::from(expected),
            )),
            (DiffAction::Alter, Some(expected)) => {
                operations.push(MigrationOperation::AlterColumn {
                    table: column.table.clone(),
                    column: ColumnDefinition::from(expected),
                    previous: column.actual.as_ref().map(ColumnDefinition::from),
                });
            }
            _ => {}
        }
    }

    // Drop columns.
    for column in &diff.column_diffs {
        if column.action == DiffAction::Drop {
            operations.push(MigrationOperation::DropColumn {
                table: column.table.clone(),
                column: column.column.clone(),
                definition: column.actual.as_ref().map(ColumnDefinition::from),
            });
        }
    }

    // Drop tables.
    for table in &diff.tables_to_drop {
        operations.push(MigrationOperation::DropTable {
            table: table.name.clone(),
            if_exists: false,
            definition: Some(TableDefinition::from(table)),
        });
    }

    // Create indexes.
    for index in &diff.index_diffs {
        if !matches!(index.action, DiffAction::Create | DiffAction::Alter) {
            continue;
        }
        if let Some(expected) = &index.expected {
            operations.push(MigrationOperation::create_index(
                &index.table,
                IndexDefinition::from(expected),
            ));
        }
    }

    // Add foreign keys on existing tables.
    for rel in &diff.relationship_diffs {
        if !matches!(rel.action, DiffAction::Create | DiffAction::Alter) {
            continue;
        }
        let Some(expected) = &rel.expected else { continue };
        if rel.action == DiffAction::Create && created.contains(expected.from.table.as_str()) {
            continue;
        }
        operations.push(MigrationOperation::add_foreign_key(
            &expected.from.table,
            ForeignKeyDefinition::from(expected),
        ));
    }

    debug!(operations = operations.len(), "Planned migration");
    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SchemaDiffer;
    use crate::graph::fixtures::{blog, fk};
    use crate::graph::{ColumnNode, IndexNode, ReferentialAction, SchemaAst, TableNode};
    use crate::types::CanonicalType;

    fn kinds(ops: &[MigrationOperation]) -> Vec<&'static str> {
        ops.iter().map(MigrationOperation::kind).collect()
    }

    #[test]
    fn test_plan_from_empty_database() {
        let diff = SchemaDiffer::new().diff(&blog(), &SchemaAst::new());
        let ops = plan_migration(&diff);

        assert_eq!(kinds(&ops), vec!["createTable", "createTable", "createTable"]);
        let MigrationOperation::CreateTable { table } = &ops[2] else {
            panic!("expected createTable");
        };
        assert_eq!(table.name, "comments");
        let mut names: Vec<&str> = table.foreign_keys.iter().map(|f| f.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["fk_comments_post_id", "fk_comments_user_id"]);

        let MigrationOperation::CreateTable { table } = &ops[0] else {
            panic!("expected createTable");
        };
        assert_eq!(table.name, "users");
        assert_eq!(table.indexes.len(), 1);
    }

    #[test]
    fn test_plan_drop_everything() {
        let diff = SchemaDiffer::new().diff(&SchemaAst::new(), &blog());
        let ops = plan_migration(&diff);
        assert_eq!(kinds(&ops), vec!["dropTable", "dropTable", "dropTable"]);
        assert!(matches!(
            &ops[0],
            MigrationOperation::DropTable { table, .. } if table == "comments"
        ));
        assert!(ops.iter().all(MigrationOperation::is_reversible));
    }

    #[test]
    fn test_plan_phases_in_order() {
        let mut desired = blog();
        desired
            .table_mut("users")
            .unwrap()
            .add_column(ColumnNode::new("age", CanonicalType::integer()))
            .unwrap();
        desired
            .add_table(
                TableNode::new("tags")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap(),
            )
            .unwrap();
        desired
            .add_index("comments", IndexNode::new("idx_comments_post_id", vec!["post_id".into()]))
            .unwrap();
        let mut rel = desired.remove_relationship("fk_posts_author_id").unwrap();
        rel.on_delete = Some(ReferentialAction::Cascade);
        desired.add_relationship(rel).unwrap();

        let mut actual = blog();
        actual
            .table_mut("posts")
            .unwrap()
            .add_column(ColumnNode::new("legacy", CanonicalType::text()))
            .unwrap();
        actual.table_mut("posts").unwrap().indexes.clear();
        actual
            .add_table(
                TableNode::new("audit")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()))
                    .unwrap(),
            )
            .unwrap();

        let diff = SchemaDiffer::new().diff(&desired, &actual);
        let ops = plan_migration(&diff);
        assert_eq!(
            kinds(&ops),
            vec![
                "dropForeignKey",
                "createTable",
                "addColumn",
                "dropColumn",
                "dropTable",
                "createIndex",
                "createIndex",
                "addForeignKey",
            ]
        );
        assert!(matches!(
            &ops[7],
            MigrationOperation::AddForeignKey { foreign_key, .. }
                if foreign_key.on_delete == ReferentialAction::Cascade
        ));
    }

    #[test]
    fn test_plan_alter_column_keeps_previous() {
        let desired = blog();
        let mut actual = SchemaAst::new();
        for table in blog().tables() {
            let mut rebuilt = TableNode::new(&table.name);
            for column in table.columns() {
                let mut column = column.clone();
                if column.name == "title" {
                    column.column_type = CanonicalType::text();
                }
                rebuilt.add_column(column).unwrap();
            }
            rebuilt.indexes.clone_from(&table.indexes);
            actual.add_table(rebuilt).unwrap();
        }
        for rel in blog().relationships() {
            actual.add_relationship(rel.clone()).unwrap();
        }

        let ops = plan_migration(&SchemaDiffer::new().diff(&desired, &actual));
        assert_eq!(ops.len(), 1);
        let MigrationOperation::AlterColumn {
            table,
            column,
            previous,
        } = &ops[0]
        else {
            panic!("expected alterColumn");
        };
        assert_eq!(table, "posts");
        assert_eq!(column.column_type, CanonicalType::string(Some(200)));
        assert_eq!(previous.as_ref().unwrap().column_type, CanonicalType::text());
    }

    #[test]
    fn test_new_table_referencing_existing_one() {
        let mut desired = blog();
        desired
            .add_table(
                TableNode::new("likes")
                    .with_column(ColumnNode::new("id", CanonicalType::integer()).primary_key())
                    .unwrap()
                    .with_column(ColumnNode::new("user_id", CanonicalType::integer()))
                    .unwrap(),
            )
            .unwrap();
        desired
            .add_relationship(fk("fk_likes_user_id", "likes", "user_id", "users", "id"))
            .unwrap();

        let ops = plan_migration(&SchemaDiffer::new().diff(&desired, &blog()));
        assert_eq!(kinds(&ops), vec!["createTable"]);
        let MigrationOperation::CreateTable { table } = &ops[0] else {
            panic!("expected createTable");
        };
        assert_eq!(table.foreign_keys[0].referenced_table, "users");
    }
}
