//! SQLite collaborators built on `sqlx`.
//!
//! [`SqliteIntrospector`] reads the catalog through `sqlite_master` and the
//! `pragma_*` table-valued functions; [`SqliteExecutor`] runs generated
//! statements on the same pool.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::Result;
use crate::introspect::{
    ColumnSchema, ForeignKeySchema, IndexSchema, SchemaIntrospector, TableSchema,
};
use crate::migration::{ExecResult, SqlExecutor};

/// Opens a pool on `url`, creating the database file if needed.
///
/// # Errors
///
/// Returns an error if the URL is malformed or the database cannot be
/// opened.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

// ================================================================
// Introspection
// ================================================================

type TableInfoRow = (i64, String, String, i64, Option<String>, i64);
type IndexListRow = (i64, String, i64, String, i64);
type IndexInfoRow = (i64, i64, Option<String>);
type ForeignKeyRow = (i64, i64, String, String, Option<String>, String, String);

/// Reads the schema of a SQLite database.
///
/// An `INTEGER PRIMARY KEY AUTOINCREMENT` column is an alias of the 64-bit
/// rowid and is reported as `BIGINT` with auto-increment set. Single-column
/// UNIQUE constraints are folded into their column; the indexes SQLite
/// creates for primary keys and UNIQUE constraints are not listed.
#[derive(Debug, Clone)]
pub struct SqliteIntrospector {
    pool: SqlitePool,
}

impl SqliteIntrospector {
    /// Creates an introspector over a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn columns(&self, table: &str, table_sql: &str) -> Result<Vec<ColumnSchema>> {
        let rows: Vec<TableInfoRow> = sqlx::query_as(
            r#"SELECT cid, name, type, "notnull", dflt_value, pk
               FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let pk_columns = rows.iter().filter(|row| row.5 > 0).count();
        let autoincrement = table_sql.to_uppercase().contains("AUTOINCREMENT");

        let columns = rows
            .into_iter()
            .map(|(_, name, declared, notnull, default, pk)| {
                let primary_key = pk > 0;
                let rowid_alias = primary_key
                    && pk_columns == 1
                    && autoincrement
                    && declared.eq_ignore_ascii_case("INTEGER");
                let data_type = if rowid_alias {
                    "BIGINT".to_string()
                } else if declared.trim().is_empty() {
                    "BLOB".to_string()
                } else {
                    declared
                };
                ColumnSchema {
                    name,
                    data_type,
                    nullable: notnull == 0 && !primary_key,
                    primary_key,
                    auto_increment: rowid_alias,
                    unique: false,
                    default,
                    comment: None,
                }
            })
            .collect();
        Ok(columns)
    }

    async fn index_columns(&self, index: &str) -> Result<Vec<String>> {
        let rows: Vec<IndexInfoRow> =
            sqlx::query_as("SELECT seqno, cid, name FROM pragma_index_info(?) ORDER BY seqno")
                .bind(index)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().filter_map(|(_, _, name)| name).collect())
    }

    async fn index_predicate(&self, index: &str) -> Result<Option<String>> {
        let sql: Option<Option<String>> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'index' AND name = ?")
                .bind(index)
                .fetch_optional(&self.pool)
                .await?;
        Ok(sql.flatten().and_then(|sql| partial_predicate(&sql)))
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT name, pk FROM pragma_table_info(?) WHERE pk > 0")
                .bind(table)
                .fetch_all(&self.pool)
                .await?;
        rows.sort_by_key(|row| row.1);
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeySchema>> {
        let rows: Vec<ForeignKeyRow> = sqlx::query_as(
            r#"SELECT id, seq, "table", "from", "to", on_update, on_delete
               FROM pragma_foreign_key_list(?) ORDER BY id, seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: BTreeMap<i64, ForeignKeySchema> = BTreeMap::new();
        let mut implicit: Vec<i64> = Vec::new();
        for (id, _, referenced, from, to, on_update, on_delete) in rows {
            let entry = grouped.entry(id).or_insert_with(|| ForeignKeySchema {
                name: None,
                columns: Vec::new(),
                referenced_table: referenced,
                referenced_columns: Vec::new(),
                on_delete: Some(on_delete),
                on_update: Some(on_update),
            });
            entry.columns.push(from);
            match to {
                Some(to) => entry.referenced_columns.push(to),
                None => implicit.push(id),
            }
        }

        // `REFERENCES t` without columns targets the primary key of `t`.
        for id in implicit {
            if let Some(entry) = grouped.get_mut(&id) {
                if entry.referenced_columns.is_empty() {
                    entry.referenced_columns =
                        self.primary_key_columns(&entry.referenced_table).await?;
                }
            }
        }

        Ok(grouped.into_values().collect())
    }
}

#[async_trait]
impl SchemaIntrospector for SqliteIntrospector {
    async fn table_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn table_schema(&self, name: &str) -> Result<Option<TableSchema>> {
        let table_sql: Option<Option<String>> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        let Some(table_sql) = table_sql else {
            return Ok(None);
        };
        let table_sql = table_sql.unwrap_or_default();

        let mut columns = self.columns(name, &table_sql).await?;

        let listed: Vec<IndexListRow> = sqlx::query_as(
            "SELECT seq, name, \"unique\", origin, partial FROM pragma_index_list(?) ORDER BY name",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let mut indexes = Vec::new();
        for (_, index_name, unique, origin, partial) in listed {
            let index_columns = self.index_columns(&index_name).await?;
            match origin.as_str() {
                "pk" => {}
                "u" => {
                    if let [only] = index_columns.as_slice() {
                        if let Some(column) = columns.iter_mut().find(|c| &c.name == only) {
                            column.unique = true;
                        }
                    }
                }
                _ => {
                    let where_clause = if partial == 0 {
                        None
                    } else {
                        self.index_predicate(&index_name).await?
                    };
                    indexes.push(IndexSchema {
                        name: index_name,
                        columns: index_columns,
                        unique: unique != 0,
                        kind: None,
                        where_clause,
                    });
                }
            }
        }

        let foreign_keys = self.foreign_keys(name).await?;
        debug!(
            table = %name,
            columns = columns.len(),
            indexes = indexes.len(),
            foreign_keys = foreign_keys.len(),
            "Introspected table"
        );

        Ok(Some(TableSchema {
            name: name.to_string(),
            columns,
            indexes,
            foreign_keys,
            comment: None,
        }))
    }
}

/// Predicate of a `CREATE INDEX ... WHERE ...` statement.
fn partial_predicate(sql: &str) -> Option<String> {
    let position = sql.to_uppercase().rfind(" WHERE ")?;
    let predicate = sql[position + " WHERE ".len()..].trim();
    (!predicate.is_empty()).then(|| predicate.to_string())
}

// ================================================================
// Execution
// ================================================================

/// Runs statements on a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Creates an executor over a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    async fn run(&self, sql: &str) -> Result<ExecResult> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SchemaDiffer;
    use crate::drift::{DriftDetector, DriftType};
    use crate::graph::fixtures::blog;
    use crate::graph::{ReferentialAction, SchemaAst};
    use crate::migration::{plan_migration, MigrationBuilder, SqliteGenerator};
    use crate::types::CanonicalType;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    async fn exec(pool: &SqlitePool, sql: &str) {
        sqlx::query(sql).execute(pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_table_names_skip_internal_tables() {
        let pool = create_test_pool().await;
        exec(&pool, "CREATE TABLE b (id INTEGER PRIMARY KEY AUTOINCREMENT)").await;
        exec(&pool, "CREATE TABLE a (id INTEGER)").await;

        let introspector = SqliteIntrospector::new(pool);
        assert_eq!(introspector.table_names().await.unwrap(), vec!["a", "b"]);
        assert!(introspector.table_exists("b").await.unwrap());
        assert!(!introspector.table_exists("sqlite_sequence").await.unwrap());
        assert!(introspector.table_schema("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_columns() {
        let pool = create_test_pool().await;
        exec(
            &pool,
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                status TEXT DEFAULT 'active',
                score DECIMAL(10, 2),
                raw
            )",
        )
        .await;

        let table = SqliteIntrospector::new(pool)
            .table_schema("users")
            .await
            .unwrap()
            .unwrap();

        let id = &table.columns[0];
        assert_eq!(id.data_type, "BIGINT");
        assert!(id.primary_key && id.auto_increment && !id.nullable);

        let email = &table.columns[1];
        assert_eq!(email.data_type, "VARCHAR(255)");
        assert!(email.unique && !email.nullable);

        let status = &table.columns[2];
        assert!(status.nullable);
        assert_eq!(status.default.as_deref(), Some("'active'"));

        assert_eq!(table.columns[3].data_type, "DECIMAL(10, 2)");
        assert_eq!(table.columns[4].data_type, "BLOB");
        assert!(table.indexes.is_empty());
    }

    #[tokio::test]
    async fn test_plain_integer_key_keeps_declared_type() {
        let pool = create_test_pool().await;
        exec(&pool, "CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT)").await;

        let table = SqliteIntrospector::new(pool)
            .table_schema("tags")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(table.columns[0].data_type, "INTEGER");
        assert!(!table.columns[0].auto_increment);
    }

    #[tokio::test]
    async fn test_indexes_and_foreign_keys() {
        let pool = create_test_pool().await;
        exec(&pool, "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT)").await;
        exec(
            &pool,
            "CREATE TABLE posts (
                id INTEGER PRIMARY KEY,
                author_id INTEGER REFERENCES users (id) ON DELETE CASCADE,
                editor_id INTEGER REFERENCES users,
                title TEXT,
                deleted INTEGER
            )",
        )
        .await;
        exec(&pool, "CREATE UNIQUE INDEX idx_users_email ON users (email)").await;
        exec(
            &pool,
            "CREATE INDEX idx_posts_title ON posts (title, author_id) WHERE deleted = 0",
        )
        .await;

        let introspector = SqliteIntrospector::new(pool);
        let users = introspector.table_schema("users").await.unwrap().unwrap();
        assert_eq!(users.indexes.len(), 1);
        assert!(users.indexes[0].unique);
        assert!(!users.columns[1].unique);

        let posts = introspector.table_schema("posts").await.unwrap().unwrap();
        let index = &posts.indexes[0];
        assert_eq!(index.columns, vec!["title", "author_id"]);
        assert_eq!(index.where_clause.as_deref(), Some("deleted = 0"));

        assert_eq!(posts.foreign_keys.len(), 2);
        let author = posts
            .foreign_keys
            .iter()
            .find(|fk| fk.columns == vec!["author_id"])
            .unwrap();
        assert_eq!(author.referenced_table, "users");
        assert_eq!(author.on_delete.as_deref(), Some("CASCADE"));
        let editor = posts
            .foreign_keys
            .iter()
            .find(|fk| fk.columns == vec!["editor_id"])
            .unwrap();
        assert_eq!(editor.referenced_columns, vec!["id"]);

        let graph = introspector.introspect().await.unwrap();
        let rel = graph.relationship("fk_posts_author_id").unwrap();
        assert_eq!(rel.on_delete, Some(ReferentialAction::Cascade));
        assert_eq!(
            graph.table("posts").unwrap().column("author_id").unwrap().column_type,
            CanonicalType::integer()
        );
    }

    #[test]
    fn test_partial_predicate() {
        assert_eq!(
            partial_predicate("CREATE INDEX i ON t (a) where a > 1").as_deref(),
            Some("a > 1")
        );
        assert_eq!(partial_predicate("CREATE INDEX i ON t (a)"), None);
    }

    #[tokio::test]
    async fn test_executor_reports_rows_affected() {
        let pool = create_test_pool().await;
        let executor = SqliteExecutor::new(pool);
        executor.run("CREATE TABLE t (v INTEGER)").await.unwrap();
        executor.run("INSERT INTO t (v) VALUES (1), (2)").await.unwrap();
        let result = executor.run("UPDATE t SET v = v + 1").await.unwrap();
        assert_eq!(result.rows_affected, 2);
        assert!(executor.run("SELEC nonsense").await.is_err());
    }

    #[tokio::test]
    async fn test_applied_plan_matches_desired_graph() {
        let pool = create_test_pool().await;
        let introspector = SqliteIntrospector::new(pool.clone());
        let desired = blog();

        let before = introspector.introspect().await.unwrap();
        let diff = SchemaDiffer::new().diff(&desired, &before);
        let mut builder = MigrationBuilder::live(SqliteGenerator::new(), SqliteExecutor::new(pool));
        builder.apply_all(plan_migration(&diff)).await.unwrap();
        assert_eq!(builder.executed_sql().len(), 5);

        let report = DriftDetector::new()
            .detect_database(&desired, &introspector)
            .await
            .unwrap();
        assert!(report.is_in_sync(), "{}", report.render());

        let after: SchemaAst = introspector.introspect().await.unwrap();
        assert!(!SchemaDiffer::new().diff(&desired, &after).has_differences);
    }

    #[tokio::test]
    async fn test_drift_against_hand_written_schema() {
        let pool = create_test_pool().await;
        exec(&pool, "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT)").await;

        let report = DriftDetector::new()
            .detect_database(&blog(), &SqliteIntrospector::new(pool))
            .await
            .unwrap();
        assert!(!report.is_in_sync());
        assert!(report
            .drifts
            .iter()
            .any(|d| d.drift_type == DriftType::MissingTable && d.table == "posts"));
        assert!(report.drifts.iter().any(|d| {
            d.drift_type == DriftType::TypeMismatch && d.column.as_deref() == Some("email")
        }));
    }
}
