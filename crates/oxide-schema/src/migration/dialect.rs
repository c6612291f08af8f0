//! Schema generators for concrete databases.

use crate::types::{are_types_equal, canonical_to_sql, CanonicalType, Dialect};

use super::generator::SchemaGenerator;
use super::operation::{ColumnDefinition, ForeignKeyDefinition};

// ================================================================
// SQLite
// ================================================================

/// SQLite schema generator.
///
/// SQLite keeps the declared type text of a column verbatim, so types are
/// declared with their portable spelling (`VARCHAR(255)`, `DECIMAL(10, 2)`,
/// `TIMESTAMPTZ`) and read back unchanged by introspection. The only
/// exception is an auto-increment primary key, which SQLite requires to be
/// declared `INTEGER`.
///
/// SQLite cannot alter a column or add/drop a foreign key on an existing
/// table without recreating it; those operations produce no SQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGenerator;

impl SqliteGenerator {
    /// Creates a new SQLite generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaGenerator for SqliteGenerator {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_sql(&self, column_type: &CanonicalType) -> String {
        canonical_to_sql(column_type, Dialect::Postgres)
    }

    fn column_type_sql(&self, column: &ColumnDefinition, primary_key: bool) -> String {
        if primary_key && column.auto_increment {
            "INTEGER".to_string()
        } else {
            self.type_sql(&column.column_type)
        }
    }

    fn auto_increment_keyword(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn alter_column_sql(
        &self,
        _table: &str,
        _column: &ColumnDefinition,
        _previous: Option<&ColumnDefinition>,
    ) -> Vec<String> {
        Vec::new()
    }

    fn add_foreign_key_sql(
        &self,
        _table: &str,
        _foreign_key: &ForeignKeyDefinition,
    ) -> Option<String> {
        None
    }

    fn drop_foreign_key_sql(&self, _table: &str, _name: &str) -> Option<String> {
        None
    }
}

// ================================================================
// PostgreSQL
// ================================================================

/// PostgreSQL schema generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresGenerator;

impl PostgresGenerator {
    /// Creates a new PostgreSQL generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn unique_constraint_name(table: &str, column: &str) -> String {
        format!("uq_{table}_{column}")
    }
}

impl SchemaGenerator for PostgresGenerator {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn type_sql(&self, column_type: &CanonicalType) -> String {
        canonical_to_sql(column_type, Dialect::Postgres)
    }

    fn auto_increment_keyword(&self) -> &'static str {
        "GENERATED BY DEFAULT AS IDENTITY"
    }

    fn alter_column_sql(
        &self,
        table: &str,
        column: &ColumnDefinition,
        previous: Option<&ColumnDefinition>,
    ) -> Vec<String> {
        let table_name = self.quote_identifier(table);
        let name = self.quote_identifier(&column.name);
        let prefix = format!("ALTER TABLE {table_name} ALTER COLUMN {name}");
        let mut statements = Vec::new();

        let type_changed =
            previous.is_none_or(|p| !are_types_equal(&p.column_type, &column.column_type));
        if type_changed {
            let ty = self.type_sql(&column.column_type);
            statements.push(format!("{prefix} TYPE {ty} USING {name}::{ty}"));
        }

        if previous.is_none_or(|p| p.nullable != column.nullable) {
            let action = if column.nullable { "DROP" } else { "SET" };
            statements.push(format!("{prefix} {action} NOT NULL"));
        }

        let default_changed = previous.is_none_or(|p| {
            p.default.as_ref().map(crate::types::DefaultValue::normalized)
                != column.default.as_ref().map(crate::types::DefaultValue::normalized)
        });
        if default_changed {
            match &column.default {
                Some(default) => {
                    statements.push(format!("{prefix} SET DEFAULT {}", default.to_sql()));
                }
                None => statements.push(format!("{prefix} DROP DEFAULT")),
            }
        }

        if let Some(previous) = previous {
            if previous.unique != column.unique {
                let constraint =
                    self.quote_identifier(&Self::unique_constraint_name(table, &column.name));
                if column.unique {
                    statements.push(format!(
                        "ALTER TABLE {table_name} ADD CONSTRAINT {constraint} UNIQUE ({name})"
                    ));
                } else {
                    statements.push(format!(
                        "ALTER TABLE {table_name} DROP CONSTRAINT IF EXISTS {constraint}"
                    ));
                }
            }
        }

        statements
    }

    fn add_foreign_key_sql(
        &self,
        table: &str,
        foreign_key: &ForeignKeyDefinition,
    ) -> Option<String> {
        Some(format!(
            "ALTER TABLE {} ADD {}",
            self.quote_identifier(table),
            self.foreign_key_definition_sql(foreign_key)
        ))
    }

    fn drop_foreign_key_sql(&self, table: &str, name: &str) -> Option<String> {
        Some(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferentialAction;
    use crate::migration::generator::operation_to_sql;
    use crate::migration::operation::MigrationOperation;
    use crate::migration::recorder::{foreign_key_operation, table_operation};
    use crate::migration::table_builder::{ForeignKeyOptions, IndexOptions};
    use crate::types::DefaultValue;

    fn posts() -> MigrationOperation {
        table_operation("posts", |t| {
            t.id();
            t.integer("user_id").not_null();
            t.string("title", 200).not_null();
            t.boolean("published").default(DefaultValue::Boolean(false));
            t.index(&["title"], IndexOptions::new());
            t.foreign_key(
                &["user_id"],
                "users",
                &["id"],
                ForeignKeyOptions::new().with_on_delete(ReferentialAction::Cascade),
            );
        })
    }

    #[test]
    fn test_sqlite_create_table() {
        let sql = operation_to_sql(&SqliteGenerator::new(), &posts());
        assert_eq!(sql.len(), 2);
        assert_eq!(
            sql[0],
            "CREATE TABLE \"posts\" (\n  \
             \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n  \
             \"user_id\" INTEGER NOT NULL,\n  \
             \"title\" VARCHAR(200) NOT NULL,\n  \
             \"published\" BOOLEAN DEFAULT FALSE,\n  \
             CONSTRAINT \"fk_posts_user_id\" FOREIGN KEY (\"user_id\") \
             REFERENCES \"users\" (\"id\") ON DELETE CASCADE ON UPDATE NO ACTION\n)"
        );
        assert_eq!(sql[1], "CREATE INDEX \"idx_posts_title\" ON \"posts\" (\"title\")");
    }

    #[test]
    fn test_sqlite_big_id_is_declared_integer() {
        let op = table_operation("events", |t| {
            t.big_id();
        });
        let sql = operation_to_sql(&SqliteGenerator::new(), &op);
        assert!(sql[0].contains("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"));

        let sql = operation_to_sql(&PostgresGenerator::new(), &op);
        assert!(sql[0].contains("\"id\" BIGINT PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY"));
    }

    #[test]
    fn test_composite_primary_key() {
        let op = table_operation("post_tags", |t| {
            t.integer("post_id").not_null();
            t.integer("tag_id").not_null();
            t.primary(&["post_id", "tag_id"]);
            t.unique(&["tag_id", "post_id"], None);
        });
        let sql = &operation_to_sql(&SqliteGenerator::new(), &op)[0];
        assert!(sql.contains("PRIMARY KEY (\"post_id\", \"tag_id\")"));
        assert!(sql.contains(
            "CONSTRAINT \"uq_post_tags_tag_id_post_id\" UNIQUE (\"tag_id\", \"post_id\")"
        ));
    }

    #[test]
    fn test_sqlite_unsupported_operations_produce_nothing() {
        let generator = SqliteGenerator::new();
        let alter = MigrationOperation::alter_column(
            "users",
            ColumnDefinition::new("age", CanonicalType::big_integer()),
        );
        assert!(operation_to_sql(&generator, &alter).is_empty());
        let fk = foreign_key_operation(
            "posts",
            &["user_id"],
            "users",
            &["id"],
            ForeignKeyOptions::new(),
        );
        assert!(operation_to_sql(&generator, &fk).is_empty());
        let drop = MigrationOperation::drop_foreign_key("posts", "fk_posts_user_id");
        assert!(operation_to_sql(&generator, &drop).is_empty());
    }

    #[test]
    fn test_simple_statements() {
        let generator = SqliteGenerator::new();
        let cases = vec![
            (MigrationOperation::drop_table("users"), "DROP TABLE \"users\""),
            (
                MigrationOperation::rename_table("people", "users"),
                "ALTER TABLE \"people\" RENAME TO \"users\"",
            ),
            (
                MigrationOperation::add_column(
                    "users",
                    ColumnDefinition::new("age", CanonicalType::integer())
                        .not_null()
                        .default(DefaultValue::Integer(0)),
                ),
                "ALTER TABLE \"users\" ADD COLUMN \"age\" INTEGER NOT NULL DEFAULT 0",
            ),
            (
                MigrationOperation::drop_column("users", "age"),
                "ALTER TABLE \"users\" DROP COLUMN \"age\"",
            ),
            (
                MigrationOperation::rename_column("users", "mail", "email"),
                "ALTER TABLE \"users\" RENAME COLUMN \"mail\" TO \"email\"",
            ),
            (
                MigrationOperation::drop_index("users", "idx_users_email"),
                "DROP INDEX \"idx_users_email\"",
            ),
            (MigrationOperation::raw("VACUUM"), "VACUUM"),
        ];
        for (op, expected) in cases {
            assert_eq!(operation_to_sql(&generator, &op), vec![expected.to_string()]);
        }
    }

    #[test]
    fn test_partial_unique_index() {
        let generator = PostgresGenerator::new();
        let op = MigrationOperation::create_index(
            "users",
            IndexOptions::new()
                .with_unique()
                .with_where("deleted_at IS NULL")
                .into_definition("users", vec!["email".to_string()]),
        );
        assert_eq!(
            operation_to_sql(&generator, &op),
            vec![
                "CREATE UNIQUE INDEX \"idx_users_email\" ON \"users\" (\"email\") \
                 WHERE deleted_at IS NULL"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_postgres_alter_column() {
        let generator = PostgresGenerator::new();
        let previous = ColumnDefinition::new("age", CanonicalType::integer());
        let target = ColumnDefinition::new("age", CanonicalType::big_integer())
            .not_null()
            .unique();
        let op = MigrationOperation::AlterColumn {
            table: "users".to_string(),
            column: target,
            previous: Some(previous),
        };
        assert_eq!(
            operation_to_sql(&generator, &op),
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"age\" TYPE BIGINT USING \"age\"::BIGINT",
                "ALTER TABLE \"users\" ALTER COLUMN \"age\" SET NOT NULL",
                "ALTER TABLE \"users\" ADD CONSTRAINT \"uq_users_age\" UNIQUE (\"age\")",
            ]
        );
    }

    #[test]
    fn test_postgres_alter_column_without_previous() {
        let generator = PostgresGenerator::new();
        let op = MigrationOperation::alter_column(
            "users",
            ColumnDefinition::new("status", CanonicalType::string(Some(20)))
                .default(DefaultValue::String("active".to_string())),
        );
        assert_eq!(
            operation_to_sql(&generator, &op),
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"status\" \
                 TYPE VARCHAR(20) USING \"status\"::VARCHAR(20)",
                "ALTER TABLE \"users\" ALTER COLUMN \"status\" DROP NOT NULL",
                "ALTER TABLE \"users\" ALTER COLUMN \"status\" SET DEFAULT 'active'",
            ]
        );
    }

    #[test]
    fn test_postgres_foreign_keys() {
        let generator = PostgresGenerator::new();
        let add = foreign_key_operation(
            "posts",
            &["user_id"],
            "users",
            &["id"],
            ForeignKeyOptions::new(),
        );
        assert_eq!(
            operation_to_sql(&generator, &add),
            vec![
                "ALTER TABLE \"posts\" ADD CONSTRAINT \"fk_posts_user_id\" \
                 FOREIGN KEY (\"user_id\") REFERENCES \"users\" (\"id\") \
                 ON DELETE NO ACTION ON UPDATE NO ACTION"
                    .to_string()
            ]
        );
        let drop = MigrationOperation::drop_foreign_key("posts", "fk_posts_user_id");
        assert_eq!(
            operation_to_sql(&generator, &drop),
            vec!["ALTER TABLE \"posts\" DROP CONSTRAINT \"fk_posts_user_id\"".to_string()]
        );
    }
}
