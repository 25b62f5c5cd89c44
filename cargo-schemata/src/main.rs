//! Cargo subcommand for schemata migrations and schema snapshots.
//!
//! This binary provides the `cargo schemata` command. Migrations are read from a directory of
//! `<version>_<name>.sql` files and applied to the database named by an environment variable,
//! both configured in `Cargo.toml`:
//!
//! ```toml
//! [package.metadata.schemata]
//! migrations_dir = "migrations"
//! schema_dir = "schema"
//! database_url_env = "DATABASE_URL"
//! ```

use std::path::PathBuf;

use cargo_metadata::camino::Utf8Path;
use cargo_metadata::MetadataCommand;
use clap::Parser;
use schemata::{Migration, Migrator};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "cargo")]
#[command(bin_name = "cargo")]
struct Cargo {
    #[command(subcommand)]
    command: CargoCommands,
}

#[derive(clap::Subcommand)]
enum CargoCommands {
    /// Run schemata migrations and schema snapshots
    Schemata(SchemataArgs),
}

#[derive(clap::Args)]
struct SchemataArgs {
    /// Database URL, overriding the configured environment variable
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create the database if needed and run pending migrations
    Migrate {
        /// Directory of `<version>_<name>.sql` files
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Write a snapshot of the database schema
    Dump {
        /// Snapshot directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Create the database if needed and load a schema snapshot into it
    Load {
        /// Snapshot directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show the migrations recorded in the ledger
    Status,
}

#[derive(Debug, Deserialize)]
struct SchemataConfig {
    /// Directory of migration files, relative to the package (default: "migrations")
    #[serde(default = "default_migrations_dir")]
    migrations_dir: String,
    /// Snapshot directory, relative to the package (default: "schema")
    #[serde(default = "default_schema_dir")]
    schema_dir: String,
    /// Environment variable for database URL (default: "DATABASE_URL")
    #[serde(default = "default_database_url_env")]
    database_url_env: String,
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_schema_dir() -> String {
    "schema".to_string()
}

fn default_database_url_env() -> String {
    "DATABASE_URL".to_string()
}

impl SchemataConfig {
    /// Read `[package.metadata.schemata]`; the section is optional.
    fn from_metadata(metadata: &serde_json::Value) -> Result<Self, String> {
        let section = metadata
            .get("schemata")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        serde_json::from_value(section).map_err(|e| format!("Invalid schemata config: {}", e))
    }
}

fn resolve(package_dir: &Utf8Path, flag: Option<PathBuf>, configured: &str) -> PathBuf {
    flag.unwrap_or_else(|| package_dir.join(configured).into_std_path_buf())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Cargo {
        command: CargoCommands::Schemata(args),
    } = Cargo::parse();

    let metadata = MetadataCommand::new().no_deps().exec()?;
    let root_package = metadata
        .root_package()
        .ok_or("No root package found. Are you in a Cargo project directory?")?;
    let config = SchemataConfig::from_metadata(&root_package.metadata)?;

    let package_dir = root_package
        .manifest_path
        .parent()
        .ok_or("Could not determine package directory")?;

    let database_url = match args.database_url {
        Some(url) => url,
        None => std::env::var(&config.database_url_env)
            .map_err(|_| format!("Environment variable {} not set", config.database_url_env))?,
    };
    let migrator = Migrator::new(database_url);

    match args.command {
        Commands::Migrate { dir } => {
            let dir = resolve(package_dir, dir, &config.migrations_dir);
            let migrations: Vec<Box<dyn Migration>> = schemata::source::read_dir(&dir)?
                .into_iter()
                .map(Into::into)
                .collect();
            let report = migrator.migrate(&migrations)?;
            if report.migrations_run.is_empty() {
                println!("Database is up to date.");
            } else {
                println!("Applied {} migration(s).", report.migrations_run.len());
            }
        }
        Commands::Dump { dir } => {
            let dir = resolve(package_dir, dir, &config.schema_dir);
            let report = migrator.dump_schema(&dir)?;
            println!(
                "Dumped {} table(s) and {} ledger entr{} to {}",
                report.tables.len(),
                report.ledger_entries,
                if report.ledger_entries == 1 { "y" } else { "ies" },
                dir.display()
            );
        }
        Commands::Load { dir } => {
            let dir = resolve(package_dir, dir, &config.schema_dir);
            let report = migrator.load_schema(&dir)?;
            if report.files.is_empty() {
                println!("No snapshot in {}, nothing loaded.", dir.display());
            } else {
                println!("Loaded {} file(s) from {}", report.files.len(), dir.display());
            }
        }
        Commands::Status => {
            let entries = migrator.status()?;
            if entries.is_empty() {
                println!("No migrations applied.");
            } else {
                println!("Applied migrations ({}):", entries.len());
                for entry in entries {
                    println!("  v{}: {}", entry.version, entry.applied_at);
                }
            }
        }
    }

    Ok(())
}
