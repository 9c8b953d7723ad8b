//! modeldb CLI
//!
//! Command-line tools for inspecting and maintaining modeldb databases.
//!
//! # Commands
//!
//! - `inspect` - List tables with their kind and row count
//! - `schema` - Print stored table definitions
//! - `query` - Run a read-only SQL query
//! - `exec` - Execute SQL statements
//! - `verify` - Run the engine's integrity and foreign key checks

mod commands;

use clap::{Parser, Subcommand};
use commands::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// modeldb command-line database tools.
#[derive(Parser)]
#[command(name = "modeldb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory or `.db` file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables with their kind and row count
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print stored table definitions
    Schema {
        /// Only this table
        table: Option<String>,
    },

    /// Run a SQL query and print its rows
    Query {
        /// The query
        sql: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Execute SQL statements
    Exec {
        /// One or more statements separated by `;`
        sql: String,
    },

    /// Run the engine's integrity and foreign key checks
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Database path required for inspect")?;
            commands::inspect::run(&path, format)?;
        }
        Commands::Schema { table } => {
            let path = cli.path.ok_or("Database path required for schema")?;
            commands::schema::run(&path, table.as_deref())?;
        }
        Commands::Query { sql, format } => {
            let path = cli.path.ok_or("Database path required for query")?;
            commands::query::run(&path, &sql, format)?;
        }
        Commands::Exec { sql } => {
            let path = cli.path.ok_or("Database path required for exec")?;
            commands::exec::run(&path, &sql)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Database path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Version => {
            println!("modeldb CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("modeldb Core v{}", modeldb_core::VERSION);
        }
    }

    Ok(())
}
