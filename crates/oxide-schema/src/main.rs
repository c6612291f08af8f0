//! oxide-schema CLI
//!
//! Command-line tool for inspecting entity schemas and keeping a SQLite
//! database in line with them.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_schema::migration::reverse_operations;
use oxide_schema::prelude::*;
use oxide_schema::sqlite::connect;

/// Schema graph, drift detection and migrations for ORM entities.
#[derive(Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database_url: String,

    /// Convert entity and field names to snake_case.
    #[arg(long)]
    snake_case: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema graph built from entity definitions.
    Graph {
        /// Entity definitions (JSON).
        entities: PathBuf,
    },

    /// Compare entity definitions with the database.
    Drift {
        /// Entity definitions (JSON).
        entities: PathBuf,

        /// Ignore index differences.
        #[arg(long)]
        no_indexes: bool,

        /// Ignore foreign key differences.
        #[arg(long)]
        no_foreign_keys: bool,

        /// Ignore default value differences.
        #[arg(long)]
        no_defaults: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compare entities and database in one or both directions.
    Sync {
        /// Entity definitions (JSON).
        entities: PathBuf,

        /// entity-to-db, db-to-entity or bidirectional.
        #[arg(short = 'D', long, default_value = "entity-to-db")]
        direction: SyncDirection,

        /// Leave out every drop.
        #[arg(long)]
        safe: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Plan the migration that brings the database in line with the entities.
    Plan {
        /// Entity definitions (JSON).
        entities: PathBuf,

        /// SQL dialect used to print statements.
        #[arg(long, value_enum, default_value_t = GeneratorKind::Sqlite)]
        dialect: GeneratorKind,

        /// Leave out every drop.
        #[arg(long)]
        safe: bool,

        /// Print the inverse operations instead.
        #[arg(short, long)]
        reverse: bool,

        /// Execute the plan on the database.
        #[arg(long)]
        apply: bool,

        /// Record operations without executing them.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GeneratorKind {
    Sqlite,
    Postgres,
}

impl GeneratorKind {
    fn generator(self) -> Box<dyn SchemaGenerator> {
        match self {
            Self::Sqlite => Box::new(SqliteGenerator::new()),
            Self::Postgres => Box::new(PostgresGenerator::new()),
        }
    }
}

fn schema_builder(snake_case: bool) -> SchemaAstBuilder {
    if snake_case {
        SchemaAstBuilder::new().with_naming(SnakeCaseNamingStrategy)
    } else {
        SchemaAstBuilder::new()
    }
}

fn entity_graph(path: &Path, snake_case: bool) -> anyhow::Result<SchemaAst> {
    let entities = load_entities(path)?;
    let graph = schema_builder(snake_case).from_entities(&entities)?;
    info!(
        entities = entities.len(),
        tables = graph.tables().len(),
        "Loaded entities from {}",
        path.display()
    );
    Ok(graph)
}

fn print_operations(generator: &dyn SchemaGenerator, operations: &[MigrationOperation]) {
    for operation in operations {
        println!("-- {}", operation.description());
        let statements = operation_to_sql(generator, operation);
        if statements.is_empty() {
            println!("-- (not supported by {})", generator.name());
        }
        for statement in statements {
            println!("{statement};");
        }
    }
}

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Graph { entities } => {
            let graph = entity_graph(&entities, cli.snake_case)?;

            println!("{}", serde_json::to_string_pretty(&graph.to_json())?);

            let stats = graph.stats();
            println!(
                "\n{} tables, {} columns, {} indexes, {} relationships",
                stats.tables, stats.columns, stats.indexes, stats.relationships
            );

            for cycle in graph.detect_circular_dependencies() {
                warn!("Circular dependency: {}", cycle.join(" -> "));
            }
            println!("Create order: {}", graph.create_order().join(", "));

            let errors = graph.validate();
            if errors.is_empty() {
                info!("Schema graph is valid.");
            } else {
                println!("\nValidation errors:");
                for error in &errors {
                    println!("  [{}] {}", error.kind(), error);
                }
            }
        }

        Commands::Drift {
            entities,
            no_indexes,
            no_foreign_keys,
            no_defaults,
            json,
        } => {
            let expected = entity_graph(&entities, cli.snake_case)?;
            let pool = connect(&cli.database_url).await?;

            let mut options = DriftOptions::new().with_dialect(Dialect::Sqlite);
            if no_indexes {
                options = options.without_indexes();
            }
            if no_foreign_keys {
                options = options.without_foreign_keys();
            }
            if no_defaults {
                options = options.without_defaults();
            }

            let report = DriftDetector::with_options(options)
                .detect_database(&expected, &SqliteIntrospector::new(pool))
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.render());
            }
        }

        Commands::Sync {
            entities,
            direction,
            safe,
            json,
        } => {
            let entities = load_entities(&entities)?;
            let pool = connect(&cli.database_url).await?;

            let mut options = SyncOptions::new().with_direction(direction);
            if safe {
                options = options.with_safe_mode();
            }
            let result = SchemaSync::new(SqliteIntrospector::new(pool))
                .with_builder(schema_builder(cli.snake_case))
                .with_options(options)
                .sync(&entities)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.summary);
            }
        }

        Commands::Plan {
            entities,
            dialect,
            safe,
            reverse,
            apply,
            dry_run,
        } => {
            let desired = entity_graph(&entities, cli.snake_case)?;
            let pool = connect(&cli.database_url).await?;
            let actual = SqliteIntrospector::new(pool.clone()).introspect().await?;

            if desired.has_circular_dependencies() {
                warn!("Entities have circular dependencies; table order is not guaranteed.");
            }

            let mut diff = SchemaDiffer::new().diff(&desired, &actual);
            if safe {
                diff.remove_destructive();
            }
            let operations = plan_migration(&diff);
            if operations.is_empty() {
                info!("Database is up to date.");
                return Ok(());
            }
            if diff.has_breaking_changes {
                warn!("Plan contains breaking changes.");
            }

            let generator = dialect.generator();
            if reverse {
                match reverse_operations(&operations) {
                    Some(inverse) => print_operations(generator.as_ref(), &inverse),
                    None => warn!("Plan is not reversible."),
                }
            } else {
                print_operations(generator.as_ref(), &operations);
            }

            if apply {
                if dialect != GeneratorKind::Sqlite {
                    anyhow::bail!("--apply only supports the sqlite dialect");
                }
                if dry_run {
                    info!("Dry run mode - operations are recorded but not executed.");
                }
                let mut builder = MigrationBuilder::from_parts(
                    Some(generator),
                    Some(Box::new(SqliteExecutor::new(pool))),
                    dry_run,
                );
                builder.apply_all(operations).await?;
                info!(
                    operations = builder.operations().len(),
                    statements = builder.executed_sql().len(),
                    "Migration finished"
                );
            }
        }
    }

    Ok(())
}
