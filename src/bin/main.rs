//! reportsource CLI - inspect report datasources and run log cleanup
//!
//! Usage:
//!   reportsource list [--course <id>]
//!   reportsource describe <datasource> [--course <id>] [--db <file>] [--inline]
//!   reportsource cleanup [--db <file>] [--retention-days <n>]
//!
//! Examples:
//!   reportsource describe participants --course 2
//!   reportsource describe activity_progress --course 2 --db moodle.db --inline
//!   reportsource cleanup --db moodle.db --retention-days 60

use clap::{Parser, Subcommand};
use reportsource::cleanup::{CleanupTask, SqliteLogStore};
use reportsource::config::Settings;
use reportsource::datasources;
use reportsource::metadata::{CatalogSnapshot, SqliteCatalog};
use reportsource::report::{ReportContext, ReportError};
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Host tables whose columns entities may look at.
const CATALOG_TABLES: [&str; 1] = ["user"];

#[derive(Parser)]
#[command(name = "reportsource")]
#[command(about = "Report datasources for learning analytics")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $REPORTSOURCE_CONFIG, ./reportsource.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List shipped datasources and their default columns
    List {
        /// Course used for datasources that need one
        #[arg(long)]
        course: Option<i64>,
    },

    /// Compose a datasource's default report and print its SQL
    Describe {
        /// Datasource name
        datasource: String,

        /// Restrict to one course
        #[arg(long)]
        course: Option<i64>,

        /// SQLite database to read the schema catalog from
        #[arg(long)]
        db: Option<PathBuf>,

        /// Render parameter values inline instead of placeholders
        #[arg(long)]
        inline: bool,
    },

    /// Delete aged rows from the log table
    Cleanup {
        /// SQLite database holding the log table
        #[arg(long)]
        db: Option<PathBuf>,

        /// Override the configured retention
        #[arg(long)]
        retention_days: Option<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.logging.level);

    match cli.command {
        Commands::List { course } => cmd_list(&settings, course),
        Commands::Describe {
            datasource,
            course,
            db,
            inline,
        } => cmd_describe(&settings, &datasource, course, db, inline),
        Commands::Cleanup { db, retention_days } => cmd_cleanup(&settings, db, retention_days),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn database_path(settings: &Settings, db: Option<PathBuf>) -> Result<Option<PathBuf>, String> {
    match db {
        Some(path) => Ok(Some(path)),
        None => settings.database.resolved_path().map_err(|e| e.to_string()),
    }
}

fn snapshot(settings: &Settings, db: Option<PathBuf>) -> Result<CatalogSnapshot, String> {
    let prefix = &settings.report.table_prefix;
    let captured = match database_path(settings, db)? {
        Some(path) => {
            let conn = Connection::open(&path)
                .map_err(|e| format!("cannot open '{}': {}", path.display(), e))?;
            let captured = SqliteCatalog::new(&conn, prefix)
                .and_then(|catalog| CatalogSnapshot::capture(&catalog, prefix, &CATALOG_TABLES));
            captured
        }
        None => CatalogSnapshot::capture(&settings.static_catalog(), prefix, &CATALOG_TABLES),
    };
    captured.map_err(|e| e.to_string())
}

fn report_context(settings: &Settings, catalog: CatalogSnapshot, course: Option<i64>) -> ReportContext {
    let ctx = ReportContext::new(catalog).with_table_prefix(&settings.report.table_prefix);
    match course {
        Some(id) => ctx.with_course(id),
        None => ctx,
    }
}

fn cmd_list(settings: &Settings, course: Option<i64>) -> ExitCode {
    let catalog = match snapshot(settings, None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = report_context(settings, catalog, course);

    for ds in datasources::all() {
        println!("{} - {}", ds.name(), ds.label());
        match ds.initialise(&ctx) {
            Ok(composed) => {
                for column in composed.get_default_columns() {
                    println!("  {:<28} {}", column.id().to_string(), column.label());
                }
            }
            Err(ReportError::Configuration(e)) => println!("  ({})", e),
            Err(e) => {
                eprintln!("Error initialising '{}': {}", ds.name(), e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn cmd_describe(
    settings: &Settings,
    name: &str,
    course: Option<i64>,
    db: Option<PathBuf>,
    inline: bool,
) -> ExitCode {
    let Some(ds) = datasources::by_name(name) else {
        eprintln!("Unknown datasource '{}'", name);
        eprintln!(
            "Available: {}",
            datasources::all()
                .iter()
                .map(|d| d.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        return ExitCode::FAILURE;
    };

    let catalog = match snapshot(settings, db) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = report_context(settings, catalog, course);

    let composed = match ds.initialise(&ctx) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error initialising '{}': {}", name, e);
            return ExitCode::FAILURE;
        }
    };
    let report = match composed.compose_default() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error composing '{}': {}", name, e);
            return ExitCode::FAILURE;
        }
    };

    println!("-- Datasource: {} ({})", composed.name(), ds.label());
    println!("-- Columns:");
    for column in &report.columns {
        let formatter = column.formatter().map(|f| f.name()).unwrap_or("-");
        println!(
            "--   {:<28} {:?} {}",
            column.id().to_string(),
            column.column_type(),
            formatter
        );
    }
    if let Some(action) = composed.bulk_action() {
        println!("-- Bulk action: {} -> {}", action.identifier, action.path);
    }
    println!();

    if inline {
        println!("{}", report.query.to_sql_inlined());
    } else {
        println!("{}", report.query.to_sql());
        let params: serde_json::Map<String, serde_json::Value> = report
            .query
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or_default()))
            .collect();
        match serde_json::to_string_pretty(&params) {
            Ok(json) => println!("-- Parameters:\n{}", json),
            Err(e) => eprintln!("Error encoding parameters: {}", e),
        }
    }
    ExitCode::SUCCESS
}

fn cmd_cleanup(settings: &Settings, db: Option<PathBuf>, retention_days: Option<u32>) -> ExitCode {
    let path = match database_path(settings, db) {
        Ok(Some(p)) => p,
        Ok(None) => {
            eprintln!("No database given: pass --db or set [database] path");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error resolving database path: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut cleanup = settings.cleanup_settings();
    if let Some(days) = retention_days {
        cleanup.retention_days = days;
    }

    let result = SqliteLogStore::open(&path, &settings.log_table(), &settings.cleanup.timestamp_column)
        .and_then(|mut store| {
            let task = CleanupTask::new(cleanup)?;
            task.execute(&mut store)
        });

    match result {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error encoding report: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Cleanup failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
