//! SQL generation and execution interfaces.
//!
//! A [`SchemaGenerator`] knows how to spell every operation for one
//! database; a [`SqlExecutor`] runs the resulting statements.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::CanonicalType;

use super::operation::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, MigrationOperation, TableDefinition,
};

/// Outcome of one executed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    /// Rows affected, as reported by the driver.
    pub rows_affected: u64,
}

/// Runs SQL statements.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executes one statement.
    async fn run(&self, sql: &str) -> Result<ExecResult>;
}

/// Database-specific SQL generation for migration operations.
///
/// The provided methods produce ANSI-style SQL with double-quoted
/// identifiers; implementations override what their database spells
/// differently. Methods returning `Option` or `Vec` may produce no SQL
/// when the database cannot express the change.
pub trait SchemaGenerator: Send + Sync {
    /// Generator name.
    fn name(&self) -> &'static str;

    /// SQL type for a canonical type.
    fn type_sql(&self, column_type: &CanonicalType) -> String;

    /// Keyword(s) that make a primary key column auto-increment.
    fn auto_increment_keyword(&self) -> &'static str;

    /// Statements changing a column to `column`. `previous` is the
    /// definition before the change, when known.
    fn alter_column_sql(
        &self,
        table: &str,
        column: &ColumnDefinition,
        previous: Option<&ColumnDefinition>,
    ) -> Vec<String>;

    /// Statement adding a foreign key to an existing table.
    fn add_foreign_key_sql(&self, table: &str, foreign_key: &ForeignKeyDefinition)
        -> Option<String>;

    /// Statement dropping a foreign key.
    fn drop_foreign_key_sql(&self, table: &str, name: &str) -> Option<String>;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Comma-separated quoted identifiers.
    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Declared type of a column inside a column definition.
    fn column_type_sql(&self, column: &ColumnDefinition, _primary_key: bool) -> String {
        self.type_sql(&column.column_type)
    }

    /// Column definition. `inline_primary_key` is false when the table
    /// declares a composite key.
    fn column_definition_sql(&self, column: &ColumnDefinition, inline_primary_key: bool) -> String {
        let primary_key = column.primary_key && inline_primary_key;
        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.column_type_sql(column, primary_key),
        ];

        if primary_key {
            parts.push("PRIMARY KEY".to_string());
            if column.auto_increment {
                parts.push(self.auto_increment_keyword().to_string());
            }
        }

        if !column.nullable && !primary_key {
            parts.push("NOT NULL".to_string());
        }

        if column.unique && !primary_key {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", default.to_sql()));
        }

        parts.join(" ")
    }

    /// Inline `CONSTRAINT ... FOREIGN KEY` clause.
    fn foreign_key_definition_sql(&self, foreign_key: &ForeignKeyDefinition) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            self.quote_identifier(&foreign_key.name),
            self.quote_list(&foreign_key.columns),
            self.quote_identifier(&foreign_key.referenced_table),
            self.quote_list(&foreign_key.referenced_columns),
            foreign_key.on_delete.as_sql(),
            foreign_key.on_update.as_sql()
        )
    }

    /// CREATE TABLE statement, without the table's indexes.
    fn create_table_sql(&self, table: &TableDefinition) -> String {
        let composite = table.primary_key.len() > 1;
        let mut items: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition_sql(c, !composite))
            .collect();

        let inline = table
            .columns
            .iter()
            .any(|c| c.primary_key && table.primary_key.contains(&c.name));
        if composite || (!table.primary_key.is_empty() && !inline) {
            items.push(format!("PRIMARY KEY ({})", self.quote_list(&table.primary_key)));
        }
        for unique in &table.unique_constraints {
            items.push(format!(
                "CONSTRAINT {} UNIQUE ({})",
                self.quote_identifier(&unique.name),
                self.quote_list(&unique.columns)
            ));
        }
        for foreign_key in &table.foreign_keys {
            items.push(self.foreign_key_definition_sql(foreign_key));
        }

        let mut sql = String::from("CREATE TABLE ");
        if table.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.quote_identifier(&table.name));
        sql.push_str(" (\n  ");
        sql.push_str(&items.join(",\n  "));
        sql.push_str("\n)");
        sql
    }

    /// DROP TABLE statement.
    fn drop_table_sql(&self, table: &str, if_exists: bool) -> String {
        let mut sql = String::from("DROP TABLE ");
        if if_exists {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&self.quote_identifier(table));
        sql
    }

    /// Table rename statement.
    fn rename_table_sql(&self, from: &str, to: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(from),
            self.quote_identifier(to)
        )
    }

    /// ADD COLUMN statement.
    fn add_column_sql(&self, table: &str, column: &ColumnDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition_sql(column, true)
        )
    }

    /// DROP COLUMN statement.
    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Column rename statement.
    fn rename_column_sql(&self, table: &str, from: &str, to: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_identifier(table),
            self.quote_identifier(from),
            self.quote_identifier(to)
        )
    }

    /// CREATE INDEX statement.
    fn create_index_sql(&self, table: &str, index: &IndexDefinition) -> String {
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.quote_identifier(table));
        sql.push_str(" (");
        sql.push_str(&self.quote_list(&index.columns));
        sql.push(')');

        if let Some(predicate) = &index.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql
    }

    /// DROP INDEX statement.
    fn drop_index_sql(&self, _table: &str, name: &str) -> String {
        format!("DROP INDEX {}", self.quote_identifier(name))
    }
}

/// Translates one operation into the statements that apply it.
///
/// An empty list means the generator cannot express the operation; callers
/// skip it. Raw SQL is passed through verbatim.
#[must_use]
pub fn operation_to_sql(
    generator: &dyn SchemaGenerator,
    operation: &MigrationOperation,
) -> Vec<String> {
    match operation {
        MigrationOperation::CreateTable { table } => {
            let mut statements = vec![generator.create_table_sql(table)];
            statements.extend(
                table
                    .indexes
                    .iter()
                    .map(|index| generator.create_index_sql(&table.name, index)),
            );
            statements
        }
        MigrationOperation::DropTable {
            table, if_exists, ..
        } => vec![generator.drop_table_sql(table, *if_exists)],
        MigrationOperation::RenameTable { from, to } => vec![generator.rename_table_sql(from, to)],
        MigrationOperation::AddColumn { table, column } => {
            vec![generator.add_column_sql(table, column)]
        }
        MigrationOperation::DropColumn { table, column, .. } => {
            vec![generator.drop_column_sql(table, column)]
        }
        MigrationOperation::RenameColumn { table, from, to } => {
            vec![generator.rename_column_sql(table, from, to)]
        }
        MigrationOperation::AlterColumn {
            table,
            column,
            previous,
        } => generator.alter_column_sql(table, column, previous.as_ref()),
        MigrationOperation::CreateIndex { table, index } => {
            vec![generator.create_index_sql(table, index)]
        }
        MigrationOperation::DropIndex { table, name, .. } => {
            vec![generator.drop_index_sql(table, name)]
        }
        MigrationOperation::AddForeignKey { table, foreign_key } => generator
            .add_foreign_key_sql(table, foreign_key)
            .into_iter()
            .collect(),
        MigrationOperation::DropForeignKey { table, name, .. } => generator
            .drop_foreign_key_sql(table, name)
            .into_iter()
            .collect(),
        MigrationOperation::Raw { sql } => vec![sql.clone()],
    }
}
